//! List site content

use anyhow::Result;
use std::sync::Arc;

use crate::content::PostSummary;
use crate::helpers::DateFormatter;
use crate::listing::{ListingController, LoadOutcome};
use crate::source::ContentSource;
use crate::Blog;

/// List site content by type
pub async fn run(blog: &Blog, content_type: &str) -> Result<()> {
    let source = blog.source()?;

    match content_type {
        "post" | "posts" => {
            let formatter = DateFormatter::from_config(&blog.config)?;
            let posts = collect_posts(source, formatter, blog.config.per_page).await?;
            println!("Posts ({}):", posts.len());
            for post in posts {
                println!("  {} - {} [{}]", post.display_date, post.title, post.uid);
            }
        }
        "slug" | "slugs" => {
            let slugs = source.list_all_slugs().await?;
            println!("Slugs ({}):", slugs.len());
            for slug in slugs {
                println!("  {}", slug);
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: post, slug", content_type);
        }
    }

    Ok(())
}

/// Follow the listing until the source has no more pages
pub async fn collect_posts(
    source: Arc<dyn ContentSource>,
    formatter: DateFormatter,
    per_page: usize,
) -> Result<Vec<PostSummary>> {
    let seed = source.query_posts_page(per_page).await?;
    let listing = ListingController::initialize(source, formatter, seed);

    while let LoadOutcome::Appended(_) = listing.load_more().await? {}

    Ok(listing.posts().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{summary, MemorySource};

    #[tokio::test]
    async fn test_collect_posts_follows_every_page() {
        let source = Arc::new(MemorySource::with_pages(vec![
            vec![summary("a"), summary("b")],
            vec![summary("c")],
            vec![summary("d")],
        ]));
        let formatter = DateFormatter::new("dd MMM yyyy", "pt_BR", "UTC").unwrap();

        let posts = collect_posts(source, formatter, 2).await.unwrap();
        let uids: Vec<_> = posts.iter().map(|p| p.uid.as_str()).collect();
        assert_eq!(uids, vec!["a", "b", "c", "d"]);
        assert!(posts.iter().all(|p| p.display_date == "05 jan 2022"));
    }
}
