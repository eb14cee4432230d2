//! HTTP server rendering pages at request time

mod resolver;

pub use resolver::{PostResolver, Resolution};

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::SiteConfig;
use crate::detail::{DetailController, DetailState};
use crate::helpers::DateFormatter;
use crate::listing::{ListingController, LoadOutcome};
use crate::source::ContentSource;
use crate::templates::TemplateRenderer;
use crate::Blog;

/// Server state
pub struct AppState {
    config: SiteConfig,
    source: Arc<dyn ContentSource>,
    renderer: Arc<TemplateRenderer>,
    formatter: DateFormatter,
    detail: DetailController,
    resolver: PostResolver,
}

impl AppState {
    pub fn new(config: SiteConfig, source: Arc<dyn ContentSource>) -> Result<Self> {
        let renderer = Arc::new(TemplateRenderer::new(&config)?);
        let formatter = DateFormatter::from_config(&config)?;
        let detail =
            DetailController::new(renderer.clone(), formatter.clone(), config.words_per_minute);
        let resolver = PostResolver::new(
            source.clone(),
            Duration::from_millis(config.server.fallback_wait_ms),
            Duration::from_millis(config.server.lookup_timeout_ms),
        );

        Ok(Self {
            config,
            source,
            renderer,
            formatter,
            detail,
            resolver,
        })
    }

    pub fn resolver(&self) -> &PostResolver {
        &self.resolver
    }
}

/// Build the router serving listing and post pages, with static files
/// from `public_dir` as fallback
pub fn router(state: Arc<AppState>, public_dir: PathBuf) -> Router {
    let pagination = state.config.pagination_dir.trim_matches('/').to_string();

    Router::new()
        .route("/", get(index_handler))
        .route(&format!("/{}/:page", pagination), get(listing_handler))
        .route(&format!("/{}/:page/", pagination), get(listing_handler))
        .route("/post/:slug", get(post_handler))
        .route("/post/:slug/", get(post_handler))
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(
    blog: &Blog,
    source: Arc<dyn ContentSource>,
    ip: &str,
    port: u16,
) -> Result<()> {
    let state = Arc::new(AppState::new(blog.config.clone(), source.clone())?);

    if blog.config.server.prerender {
        tracing::info!("Resolving posts before accepting requests...");
        let slugs = source.list_all_slugs().await?;
        let ready = state.resolver().warm(&slugs).await?;
        tracing::info!("{} posts ready", ready);
    }

    let app = router(state, blog.public_dir.clone());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    listing_response(&state, 1).await
}

async fn listing_handler(
    State(state): State<Arc<AppState>>,
    Path(page): Path<String>,
) -> Response {
    match page.parse::<usize>() {
        Ok(page) if page >= 1 => listing_response(&state, page).await,
        _ => not_found(&state),
    }
}

/// Rebuild the list as it looks after `page - 1` load-more steps
async fn listing_response(state: &AppState, page: usize) -> Response {
    let seed = match state.source.query_posts_page(state.config.per_page).await {
        Ok(seed) => seed,
        Err(e) => return bad_gateway(state, &e.to_string()),
    };
    let listing =
        ListingController::initialize(state.source.clone(), state.formatter.clone(), seed);

    for _ in 1..page {
        match listing.load_more().await {
            Ok(LoadOutcome::Appended(_)) => {}
            Ok(LoadOutcome::Exhausted) | Ok(LoadOutcome::Discarded) => return not_found(state),
            Err(e) => return bad_gateway(state, &e.to_string()),
        }
    }

    html_response(
        StatusCode::OK,
        listing
            .snapshot()
            .await
            .render(&state.config, &state.renderer),
    )
}

async fn post_handler(State(state): State<Arc<AppState>>, Path(slug): Path<String>) -> Response {
    let detail_state = match state.resolver.resolve(&slug).await {
        Resolution::Ready(post) => DetailState::Ready(post),
        Resolution::NotFound => DetailState::NotFound,
        Resolution::Loading => DetailState::Loading,
        Resolution::Failed(message) => return bad_gateway(&state, &message),
    };

    let status = match detail_state {
        DetailState::Ready(_) => StatusCode::OK,
        DetailState::Loading => StatusCode::ACCEPTED,
        DetailState::NotFound => StatusCode::NOT_FOUND,
    };
    html_response(status, state.detail.render_state(&detail_state))
}

fn not_found(state: &AppState) -> Response {
    html_response(StatusCode::NOT_FOUND, state.renderer.not_found_page())
}

fn bad_gateway(state: &AppState, message: &str) -> Response {
    tracing::warn!("Content source error: {}", message);
    html_response(
        StatusCode::BAD_GATEWAY,
        state.renderer.error_page("O conteúdo está temporariamente indisponível."),
    )
}

fn html_response(status: StatusCode, rendered: Result<String>) -> Response {
    match rendered {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render page: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{detail, summary, MemorySource};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(source: MemorySource) -> Router {
        let mut config = SiteConfig::default();
        config.server.fallback_wait_ms = 1000;
        let state = Arc::new(AppState::new(config, Arc::new(source)).unwrap());
        router(state, PathBuf::from("/nonexistent"))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn two_pages() -> MemorySource {
        MemorySource::with_pages(vec![vec![summary("p1")], vec![summary("p2")]])
            .with_post(detail("p1", "one two three four five"))
    }

    #[tokio::test]
    async fn test_index_shows_first_page() {
        let (status, body) = get(app(two_pages()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post p1"));
        assert!(!body.contains("Post p2"));
        assert!(body.contains("05 jan 2022"));
        assert!(body.contains("Carregar mais posts"));
    }

    #[tokio::test]
    async fn test_second_listing_page_accumulates() {
        let (status, body) = get(app(two_pages()), "/page/2/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.find("Post p1").unwrap() < body.find("Post p2").unwrap());
        assert!(!body.contains("Carregar mais posts"));
    }

    #[tokio::test]
    async fn test_listing_page_past_end() {
        let (status, _) = get(app(two_pages()), "/page/3").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get(app(two_pages()), "/page/zero").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_listing_fetch_failure() {
        let source = two_pages();
        source.fail_cursor("c1");
        let (status, body) = get(app(source), "/page/2/").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("temporariamente indisponível"));
    }

    #[tokio::test]
    async fn test_post_page() {
        let (status, body) = get(app(two_pages()), "/post/p1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h1>Post p1</h1>"));
        assert!(body.contains("1 min"));
    }

    #[tokio::test]
    async fn test_missing_post_is_not_found() {
        let (status, body) = get(app(two_pages()), "/post/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Post não encontrado"));
    }

    #[tokio::test]
    async fn test_slow_post_shows_loading() {
        let source = two_pages().with_delay(Duration::from_millis(300));
        let mut config = SiteConfig::default();
        config.server.fallback_wait_ms = 5;
        let state = Arc::new(AppState::new(config, Arc::new(source)).unwrap());
        let app = router(state, PathBuf::from("/nonexistent"));

        let (status, body) = get(app, "/post/p1").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body.contains("Carregando..."));
    }

    #[tokio::test]
    async fn test_hung_post_is_bad_gateway() {
        let source = two_pages().with_delay(Duration::from_secs(24 * 60 * 60));
        let mut config = SiteConfig::default();
        config.server.fallback_wait_ms = 1000;
        config.server.lookup_timeout_ms = 20;
        let state = Arc::new(AppState::new(config, Arc::new(source)).unwrap());
        let app = router(state, PathBuf::from("/nonexistent"));

        let (status, body) = get(app, "/post/p1").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body.contains("Carregando..."));
    }

    #[tokio::test]
    async fn test_broken_post_is_bad_gateway() {
        let (status, _) = get(app(two_pages()), "/post/broken").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
