//! Prismic REST API client

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{ContentSource, SourceError};
use crate::config::PrismicConfig;
use crate::content::richtext::{self, RichTextNode};
use crate::content::{ContentSection, Cursor, Page, PostDetail, PostSummary};
use crate::helpers::parse_publication_date;

/// How long a discovered master ref is reused before asking again
const REF_TTL: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("spacetraveling/", env!("CARGO_PKG_VERSION"));

/// Client for a Prismic repository's v2 API
pub struct PrismicClient {
    client: Client,
    endpoint: Url,
    access_token: Option<String>,
    document_type: String,
    enumerate_page_size: usize,
    master_ref: RwLock<Option<(String, Instant)>>,
}

impl PrismicClient {
    pub fn new(config: &PrismicConfig) -> Result<Self, SourceError> {
        let endpoint = Url::parse(config.endpoint.trim())
            .map_err(|_| SourceError::InvalidEndpoint(config.endpoint.clone()))?;
        if endpoint.cannot_be_a_base() || !matches!(endpoint.scheme(), "http" | "https") {
            return Err(SourceError::InvalidEndpoint(config.endpoint.clone()));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(|source| SourceError::Http {
                url: endpoint.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            endpoint,
            access_token: config.access_token.clone(),
            document_type: config.document_type.clone(),
            enumerate_page_size: config.enumerate_page_size.max(1),
            master_ref: RwLock::new(None),
        })
    }

    /// Current master ref, cached for a short while
    async fn master_ref(&self) -> Result<String, SourceError> {
        if let Some((reference, fetched_at)) = self.master_ref.read().await.as_ref() {
            if fetched_at.elapsed() < REF_TTL {
                return Ok(reference.clone());
            }
        }

        let mut url = self.endpoint.clone();
        self.attach_token(&mut url);
        let info: ApiInfo = self.get_json(url).await?;
        let reference = info
            .refs
            .into_iter()
            .find(|r| r.is_master)
            .map(|r| r.reference)
            .ok_or(SourceError::MissingMasterRef)?;

        tracing::debug!("Using master ref {}", reference);
        *self.master_ref.write().await = Some((reference.clone(), Instant::now()));
        Ok(reference)
    }

    /// Build a `documents/search` URL for the given predicate
    fn search_url(
        &self,
        reference: &str,
        predicate: &str,
        page_size: usize,
        fetch: Option<&str>,
    ) -> Result<Url, SourceError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(["documents", "search"]);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("ref", reference)
                .append_pair("q", &format!("[{}]", predicate))
                .append_pair("pageSize", &page_size.to_string());
            if let Some(fetch) = fetch {
                query.append_pair("fetch", fetch);
            }
        }
        self.attach_token(&mut url);
        Ok(url)
    }

    fn type_predicate(&self) -> String {
        format!(r#"[at(document.type,"{}")]"#, self.document_type)
    }

    /// Resolve a cursor to a URL on the configured API host
    fn cursor_url(&self, cursor: &Cursor) -> Result<Url, SourceError> {
        let mut url = Url::parse(cursor.as_str())
            .map_err(|_| SourceError::ForeignCursor(cursor.to_string()))?;
        let same_origin = url.scheme() == self.endpoint.scheme()
            && url.host_str() == self.endpoint.host_str()
            && url.port_or_known_default() == self.endpoint.port_or_known_default();
        if !same_origin {
            return Err(SourceError::ForeignCursor(redact(&url)));
        }
        self.attach_token(&mut url);
        Ok(url)
    }

    fn attach_token(&self, url: &mut Url) {
        if let Some(token) = &self.access_token {
            if !url.query_pairs().any(|(key, _)| key == "access_token") {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }
    }

    async fn search(&self, url: Url) -> Result<SearchResponse, SourceError> {
        self.get_json(url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SourceError> {
        let shown = redact(&url);
        tracing::debug!("GET {}", shown);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: shown.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { url: shown, status });
        }

        let body = response.bytes().await.map_err(|source| SourceError::Http {
            url: shown.clone(),
            source,
        })?;
        serde_json::from_slice(&body).map_err(|source| SourceError::Decode { url: shown, source })
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn query_posts_page(&self, page_size: usize) -> Result<Page, SourceError> {
        let reference = self.master_ref().await?;
        let fetch = format!(
            "{0}.title,{0}.subtitle,{0}.author",
            self.document_type
        );
        let url = self.search_url(
            &reference,
            &self.type_predicate(),
            page_size.max(1),
            Some(&fetch),
        )?;
        Ok(self.search(url).await?.into_page())
    }

    async fn fetch_page(&self, cursor: &Cursor) -> Result<Page, SourceError> {
        let url = self.cursor_url(cursor)?;
        Ok(self.search(url).await?.into_page())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<PostDetail>, SourceError> {
        if slug.is_empty() || slug.contains(['"', '\\']) {
            return Ok(None);
        }

        let reference = self.master_ref().await?;
        let predicate = format!(r#"[at(my.{}.uid,"{}")]"#, self.document_type, slug);
        let url = self.search_url(&reference, &predicate, 1, None)?;
        let response = self.search(url).await?;

        Ok(response
            .results
            .into_iter()
            .next()
            .and_then(ApiDocument::into_detail))
    }

    async fn list_all_slugs(&self) -> Result<Vec<String>, SourceError> {
        let reference = self.master_ref().await?;
        let fetch = format!("{}.title", self.document_type);
        let mut url = self.search_url(
            &reference,
            &self.type_predicate(),
            self.enumerate_page_size,
            Some(&fetch),
        )?;

        let mut slugs = Vec::new();
        loop {
            let response = self.search(url).await?;
            slugs.extend(response.results.into_iter().filter_map(|doc| doc.uid));

            match response.next_page {
                Some(next) => url = self.cursor_url(&Cursor::new(next))?,
                None => break,
            }
        }

        tracing::debug!("Enumerated {} slugs", slugs.len());
        Ok(slugs)
    }
}

/// Strip the query string so tokens never reach the logs
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

/// `GET /api/v2`
#[derive(Debug, Deserialize)]
struct ApiInfo {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master: bool,
}

/// `GET /api/v2/documents/search`
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ApiDocument>,
    #[serde(default)]
    next_page: Option<String>,
}

impl SearchResponse {
    fn into_page(self) -> Page {
        let results = self
            .results
            .into_iter()
            .filter_map(ApiDocument::into_summary)
            .collect();
        let next_cursor = self
            .next_page
            .filter(|next| !next.is_empty())
            .map(Cursor::new);
        Page::new(results, next_cursor)
    }
}

#[derive(Debug, Deserialize)]
struct ApiDocument {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    first_publication_date: Option<String>,
    #[serde(default)]
    data: DocumentData,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentData {
    #[serde(default)]
    title: Value,
    #[serde(default)]
    subtitle: Value,
    #[serde(default)]
    author: Value,
    #[serde(default)]
    banner: Option<ImageField>,
    #[serde(default)]
    content: Vec<ApiSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageField {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSection {
    #[serde(default)]
    heading: Value,
    #[serde(default)]
    body: Vec<RichTextNode>,
}

impl ApiDocument {
    fn into_summary(self) -> Option<PostSummary> {
        let Some(uid) = self.uid else {
            tracing::debug!("Skipping document without uid");
            return None;
        };
        Some(PostSummary {
            uid,
            first_publication_date: self
                .first_publication_date
                .as_deref()
                .and_then(parse_publication_date),
            display_date: String::new(),
            title: text_field(&self.data.title),
            subtitle: text_field(&self.data.subtitle),
            author: text_field(&self.data.author),
        })
    }

    fn into_detail(self) -> Option<PostDetail> {
        let uid = self.uid?;
        let data = self.data;
        Some(PostDetail {
            uid,
            first_publication_date: self
                .first_publication_date
                .as_deref()
                .and_then(parse_publication_date),
            title: text_field(&data.title),
            subtitle: text_field(&data.subtitle),
            author: text_field(&data.author),
            banner_url: data.banner.and_then(|b| b.url).unwrap_or_default(),
            content: data
                .content
                .into_iter()
                .map(|section| ContentSection {
                    heading: text_field(&section.heading),
                    body: section.body,
                })
                .collect(),
        })
    }
}

/// Read a field that is either plain text or a rich text array
fn text_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) => serde_json::from_value::<Vec<RichTextNode>>(value.clone())
            .map(|nodes| richtext::as_text(&nodes))
            .unwrap_or_default(),
        _ => String::new(),
    }
}
