//! Helper functions for dates and URLs used by the controllers and templates

mod date;
mod url;

pub use date::*;
pub use url::*;
