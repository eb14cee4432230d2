//! Post and Page models

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::richtext::{self, RichTextNode};

/// A post as shown in the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Slug of the post
    pub uid: String,

    /// Raw publication date reported by the content source
    pub first_publication_date: Option<DateTime<FixedOffset>>,

    /// Localized date for display, filled in by the listing
    #[serde(default)]
    pub display_date: String,

    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    #[cfg(test)]
    pub fn new(uid: &str, title: &str) -> Self {
        Self {
            uid: uid.to_string(),
            first_publication_date: None,
            display_date: String::new(),
            title: title.to_string(),
            subtitle: String::new(),
            author: String::new(),
        }
    }
}

/// A fully resolved post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub uid: String,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub content: Vec<ContentSection>,
}

impl PostDetail {
    /// Number of whitespace separated words across every section body
    pub fn word_count(&self) -> usize {
        self.content.iter().map(ContentSection::word_count).sum()
    }
}

/// One headed section of a post body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub heading: String,
    pub body: Vec<RichTextNode>,
}

impl ContentSection {
    pub fn word_count(&self) -> usize {
        richtext::as_text(&self.body).split_whitespace().count()
    }
}

/// Opaque continuation token pointing at the next page of results
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of listing results
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    /// Results in the order the source returned them
    pub results: Vec<PostSummary>,
    /// `None` once there is nothing left to fetch
    pub next_cursor: Option<Cursor>,
}

impl Page {
    pub fn new(results: Vec<PostSummary>, next_cursor: Option<Cursor>) -> Self {
        Self {
            results,
            next_cursor,
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::richtext::TextBlock;

    fn section(text: &str) -> ContentSection {
        ContentSection {
            heading: "Heading".to_string(),
            body: vec![RichTextNode::Paragraph(TextBlock::plain(text))],
        }
    }

    #[test]
    fn test_word_count_sums_sections() {
        let post = PostDetail {
            uid: "a".to_string(),
            first_publication_date: None,
            title: String::new(),
            subtitle: String::new(),
            author: String::new(),
            banner_url: String::new(),
            content: vec![section("one two  three"), section("\tfour\nfive ")],
        };
        assert_eq!(post.word_count(), 5);
    }

    #[test]
    fn test_empty_section_has_no_words() {
        assert_eq!(section("   ").word_count(), 0);
        let empty = ContentSection {
            heading: String::new(),
            body: Vec::new(),
        };
        assert_eq!(empty.word_count(), 0);
    }

    #[test]
    fn test_page_is_last() {
        assert!(Page::default().is_last());
        assert!(!Page::new(Vec::new(), Some(Cursor::new("next"))).is_last());
    }
}
