//! Generate static files

use anyhow::Result;

use crate::generator::Generator;
use crate::Blog;

/// Fetch everything from the content source and write the site
pub async fn run(blog: &Blog) -> Result<()> {
    let start = std::time::Instant::now();

    let source = blog.source()?;
    let generator = Generator::new(blog, source)?;
    let stats = generator.generate().await?;

    tracing::info!(
        "Generated {} listing pages and {} posts ({} skipped) in {:.2}s",
        stats.listing_pages,
        stats.post_pages,
        stats.skipped,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
