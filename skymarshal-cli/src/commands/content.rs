use crate::util::{CliContext, SpinnerReporter};
use anyhow::Result;
use skymarshal_graph::cache::{ProfileCache, PROFILE_CACHE_FILE};

pub async fn load(limit: Option<usize>, force: bool, hydrate: bool) -> Result<()> {
    let ctx = CliContext::init()?;
    let (handle, did) = ctx.require_login().await?;

    let reporter = SpinnerReporter::new();
    let items = ctx
        .store
        .ensure_loaded(&handle, &did, None, limit, force, &reporter)
        .await?;
    if hydrate {
        ctx.store.hydrate(&handle, false, &reporter).await?;
    }
    reporter.finish();

    // Mirror the export into the durable post cache so the analysis tools
    // can work offline.
    match ProfileCache::open(&ctx.storage_root.join(PROFILE_CACHE_FILE)) {
        Ok(cache) => {
            if let Err(error) = cache.upsert_posts(&handle, &items) {
                tracing::warn!("could not cache posts: {error}");
            }
        }
        Err(error) => tracing::warn!("post cache unavailable: {error}"),
    }

    let summary = ctx.store.summary(&handle).await;
    println!("Loaded {} items for @{handle}:", items.len());
    println!("  posts:   {}", summary.posts);
    println!("  replies: {}", summary.replies);
    println!("  likes:   {}", summary.likes);
    println!("  reposts: {}", summary.reposts);
    println!("  total:   {}", summary.total);
    Ok(())
}

pub async fn summary() -> Result<()> {
    let ctx = CliContext::init()?;
    let (handle, did) = ctx.require_login().await?;
    let reporter = SpinnerReporter::new();
    ctx.store
        .ensure_loaded(&handle, &did, None, None, false, &reporter)
        .await?;
    reporter.finish();

    let summary = ctx.store.summary(&handle).await;
    println!("@{handle}");
    println!("  posts:   {}", summary.posts);
    println!("  replies: {}", summary.replies);
    println!("  likes:   {}", summary.likes);
    println!("  reposts: {}", summary.reposts);
    println!("  total:   {}", summary.total);
    Ok(())
}

pub async fn stats() -> Result<()> {
    let ctx = CliContext::init()?;
    let stats = ctx.client.limiter().stats().await;
    println!("Rate limit window:");
    println!("  points used:      {}", stats.points_used);
    println!("  points remaining: {}", stats.points_remaining);
    println!("  ceiling:          {}", stats.max_points);
    println!("  requests:         {}", stats.requests_in_window);
    Ok(())
}
