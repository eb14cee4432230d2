//! Content module - post models and rich text processing

mod post;
pub mod richtext;

pub use post::{ContentSection, Cursor, Page, PostDetail, PostSummary};
pub use richtext::RichTextNode;
