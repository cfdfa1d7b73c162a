use crate::util::{CliContext, SpinnerReporter};
use anyhow::Result;
use clap::Args;
use skymarshal_common::syntax::validate_handle;
use skymarshal_graph::cache::{ProfileCache, PROFILE_CACHE_FILE};
use skymarshal_graph::{FetchMode, FetchOptions, GraphAnalytics, NetworkFetcher};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct NetworkArgs {
    /// Handle to analyze; defaults to the logged-in account
    pub handle: Option<String>,

    /// Fetch mode: fast, balanced, detailed
    #[arg(short, long, default_value = "balanced")]
    pub mode: String,

    #[arg(long, default_value_t = 500)]
    pub max_followers: usize,

    #[arg(long, default_value_t = 500)]
    pub max_following: usize,

    /// Skip community detection and centrality metrics
    #[arg(long)]
    pub no_analytics: bool,

    /// Write the full snapshot to this JSON file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn network(args: NetworkArgs) -> Result<()> {
    let ctx = CliContext::init()?;
    let (own_handle, _did) = ctx.require_login().await?;
    let handle = match args.handle {
        Some(handle) => validate_handle(&handle)?,
        None => own_handle,
    };
    let mode: FetchMode = args.mode.parse()?;

    let settings = ctx.settings.settings();
    let cache = Arc::new(ProfileCache::open(
        &ctx.storage_root.join(PROFILE_CACHE_FILE),
    )?);
    let mut fetcher = NetworkFetcher::new(Arc::clone(&ctx.client))
        .with_cache(cache, settings.profile_cache_ttl_days)
        .with_workers(settings.network_workers);
    if !args.no_analytics {
        fetcher = fetcher.with_analytics(GraphAnalytics::default());
    }

    let options = FetchOptions {
        max_followers: Some(args.max_followers),
        max_following: Some(args.max_following),
        mode,
        ..FetchOptions::default()
    };
    let reporter = Arc::new(SpinnerReporter::new());
    let snapshot = fetcher
        .fetch_network(&handle, &options, reporter.clone())
        .await?;
    reporter.finish();

    let metadata = &snapshot.metadata;
    println!("Network around @{handle}:");
    println!("  nodes:        {}", metadata.node_count);
    println!(
        "  edges:        {} ({} follows, {} orbit)",
        metadata.edge_count, metadata.follow_edge_count, metadata.orbit_edge_count
    );
    let mutuals = snapshot
        .nodes
        .iter()
        .filter(|node| node.relationship == skymarshal_graph::types::Relationship::Mutual)
        .count();
    println!("  mutuals:      {mutuals}");
    if let Some(metrics) = &metadata.graph_metrics {
        println!("  clusters:     {}", metrics.cluster_count);
        println!("  density:      {:.4}", metrics.density);
        if let Some(modularity) = metrics.modularity {
            println!("  modularity:   {modularity:.4}");
        }
    }
    if !metadata.top_interconnected.is_empty() {
        println!("  most interconnected:");
        for entry in metadata.top_interconnected.iter().take(10) {
            println!(
                "    @{}: {} orbit, {} mutual",
                entry.handle, entry.orbit_connections, entry.mutual_connections
            );
        }
    }

    if let Some(path) = args.output {
        std::fs::write(&path, serde_json::to_vec_pretty(&snapshot)?)?;
        println!("Snapshot written to {}", path.display());
    }
    Ok(())
}
