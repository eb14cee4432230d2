//! Structured rich text as delivered by the content source
//!
//! A body is a flat list of blocks. Text blocks carry spans (bold, italic,
//! links, labels) addressed by character offsets into the block text.
//! Unrecognised block or span types deserialize into `Unknown` and are
//! skipped when rendering.

use serde::{Deserialize, Serialize};

/// A single block of rich text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RichTextNode {
    #[serde(rename = "heading1")]
    Heading1(TextBlock),
    #[serde(rename = "heading2")]
    Heading2(TextBlock),
    #[serde(rename = "heading3")]
    Heading3(TextBlock),
    #[serde(rename = "heading4")]
    Heading4(TextBlock),
    #[serde(rename = "heading5")]
    Heading5(TextBlock),
    #[serde(rename = "heading6")]
    Heading6(TextBlock),
    #[serde(rename = "paragraph")]
    Paragraph(TextBlock),
    #[serde(rename = "preformatted")]
    Preformatted(TextBlock),
    #[serde(rename = "list-item")]
    ListItem(TextBlock),
    #[serde(rename = "o-list-item")]
    OrderedListItem(TextBlock),
    #[serde(rename = "image")]
    Image(ImageBlock),
    #[serde(rename = "embed")]
    Embed(EmbedBlock),
    #[serde(other)]
    Unknown,
}

impl RichTextNode {
    /// The text block behind this node, if it carries text
    pub fn text_block(&self) -> Option<&TextBlock> {
        match self {
            RichTextNode::Heading1(block)
            | RichTextNode::Heading2(block)
            | RichTextNode::Heading3(block)
            | RichTextNode::Heading4(block)
            | RichTextNode::Heading5(block)
            | RichTextNode::Heading6(block)
            | RichTextNode::Paragraph(block)
            | RichTextNode::Preformatted(block)
            | RichTextNode::ListItem(block)
            | RichTextNode::OrderedListItem(block) => Some(block),
            RichTextNode::Image(_) | RichTextNode::Embed(_) | RichTextNode::Unknown => None,
        }
    }

    fn list_kind(&self) -> Option<ListKind> {
        match self {
            RichTextNode::ListItem(_) => Some(ListKind::Unordered),
            RichTextNode::OrderedListItem(_) => Some(ListKind::Ordered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

/// Text with inline spans
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
}

impl TextBlock {
    pub fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            spans: Vec::new(),
        }
    }
}

/// Inline formatting over `[start, end)` character offsets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(flatten)]
    pub kind: SpanKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SpanKind {
    #[serde(rename = "strong")]
    Strong,
    #[serde(rename = "em")]
    Em,
    #[serde(rename = "hyperlink")]
    Hyperlink { data: LinkData },
    #[serde(rename = "label")]
    Label { data: LabelData },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkData {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelData {
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmbedBlock {
    #[serde(default)]
    pub oembed: Oembed,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Oembed {
    #[serde(default)]
    pub embed_url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub provider_name: Option<String>,
    /// Provider supplied markup, passed through as-is
    #[serde(default)]
    pub html: Option<String>,
}

/// Concatenate the text of every textual block, separated by a space
pub fn as_text(nodes: &[RichTextNode]) -> String {
    nodes
        .iter()
        .filter_map(RichTextNode::text_block)
        .map(|block| block.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render blocks to HTML
///
/// Text is escaped here, so the output can be injected into a page
/// without further processing. Consecutive list items share one list.
pub fn as_html(nodes: &[RichTextNode]) -> String {
    let mut html = String::new();
    let mut open_list: Option<ListKind> = None;

    for node in nodes {
        let kind = node.list_kind();
        if open_list != kind {
            if let Some(list) = open_list.take() {
                html.push_str(&format!("</{}>", list.tag()));
            }
            if let Some(list) = kind {
                html.push_str(&format!("<{}>", list.tag()));
                open_list = Some(list);
            }
        }

        match node {
            RichTextNode::Heading1(block) => push_element(&mut html, "h1", block),
            RichTextNode::Heading2(block) => push_element(&mut html, "h2", block),
            RichTextNode::Heading3(block) => push_element(&mut html, "h3", block),
            RichTextNode::Heading4(block) => push_element(&mut html, "h4", block),
            RichTextNode::Heading5(block) => push_element(&mut html, "h5", block),
            RichTextNode::Heading6(block) => push_element(&mut html, "h6", block),
            RichTextNode::Paragraph(block) => push_element(&mut html, "p", block),
            RichTextNode::Preformatted(block) => push_element(&mut html, "pre", block),
            RichTextNode::ListItem(block) | RichTextNode::OrderedListItem(block) => {
                push_element(&mut html, "li", block)
            }
            RichTextNode::Image(image) => {
                html.push_str(&format!(
                    r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                    html_escape(&image.url),
                    html_escape(image.alt.as_deref().unwrap_or(""))
                ));
            }
            RichTextNode::Embed(embed) => html.push_str(&render_embed(&embed.oembed)),
            RichTextNode::Unknown => {
                tracing::debug!("Skipping rich text block of unknown type");
            }
        }
    }

    if let Some(list) = open_list {
        html.push_str(&format!("</{}>", list.tag()));
    }

    html
}

fn push_element(html: &mut String, tag: &str, block: &TextBlock) {
    html.push('<');
    html.push_str(tag);
    html.push('>');
    html.push_str(&render_spans(block));
    html.push_str("</");
    html.push_str(tag);
    html.push('>');
}

fn render_embed(oembed: &Oembed) -> String {
    let inner = match &oembed.html {
        Some(markup) => markup.clone(),
        None => format!(
            r#"<a href="{0}">{0}</a>"#,
            html_escape(&safe_url(&oembed.embed_url))
        ),
    };
    format!(
        r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
        html_escape(&oembed.embed_url),
        html_escape(&oembed.kind),
        html_escape(oembed.provider_name.as_deref().unwrap_or("")),
        inner
    )
}

/// Render the text of a block with its spans applied
///
/// Span offsets count UTF-16 code units, so a character outside the BMP
/// takes two positions. Overlapping spans are split so the output is
/// always well nested.
fn render_spans(block: &TextBlock) -> String {
    let chars: Vec<char> = block.text.chars().collect();

    // UTF-16 position before each char, plus the end of the text
    let mut positions = Vec::with_capacity(chars.len() + 1);
    let mut len = 0;
    for c in &chars {
        positions.push(len);
        len += c.len_utf16();
    }
    positions.push(len);

    let mut spans: Vec<&Span> = block
        .spans
        .iter()
        .filter(|span| span.start < span.end && span.start < len)
        .collect();
    // Outer spans first when two start at the same offset
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let ends_at = |span: &Span, at: usize| span.end.min(len) <= at;

    let mut out = String::with_capacity(block.text.len());
    let mut open: Vec<&Span> = Vec::new();
    let mut next = 0;

    for (i, &at) in positions.iter().enumerate() {
        if open.iter().any(|span| ends_at(*span, at)) {
            let mut reopen = Vec::new();
            while let Some(span) = open.pop() {
                out.push_str(closing_tag(&span.kind));
                if !ends_at(span, at) {
                    reopen.push(span);
                }
                if !open.iter().any(|span| ends_at(*span, at)) {
                    break;
                }
            }
            for span in reopen.into_iter().rev() {
                out.push_str(&opening_tag(&span.kind));
                open.push(span);
            }
        }

        if i == chars.len() {
            break;
        }

        // A start inside a surrogate pair opens at the next char
        while next < spans.len() && spans[next].start <= at {
            let span = spans[next];
            next += 1;
            if ends_at(span, at) {
                continue;
            }
            out.push_str(&opening_tag(&span.kind));
            open.push(span);
        }

        match chars[i] {
            '\n' => out.push_str("<br />"),
            c => push_escaped(&mut out, c),
        }
    }

    out
}

fn opening_tag(kind: &SpanKind) -> String {
    match kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink { data } => {
            let href = html_escape(&safe_url(&data.url));
            match &data.target {
                Some(target) => format!(
                    r#"<a href="{}" target="{}" rel="noopener">"#,
                    href,
                    html_escape(target)
                ),
                None => format!(r#"<a href="{}">"#, href),
            }
        }
        SpanKind::Label { data } => format!(r#"<span class="{}">"#, html_escape(&data.label)),
        SpanKind::Unknown => "<span>".to_string(),
    }
}

fn closing_tag(kind: &SpanKind) -> &'static str {
    match kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink { .. } => "</a>",
        SpanKind::Label { .. } | SpanKind::Unknown => "</span>",
    }
}

/// Only allow link schemes that cannot execute script
fn safe_url(url: &str) -> String {
    let trimmed = url.trim();
    let lower = trimmed.to_ascii_lowercase();
    let allowed = ["http://", "https://", "mailto:", "tel:", "/", "#"];
    if allowed.iter().any(|prefix| lower.starts_with(prefix)) {
        trimmed.to_string()
    } else {
        "#".to_string()
    }
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        c => out.push(c),
    }
}

/// Simple HTML escaping
fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        push_escaped(&mut out, c);
    }
    out
}
