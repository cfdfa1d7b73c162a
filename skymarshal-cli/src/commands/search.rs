use crate::util::{truncate_text, CliContext, SpinnerReporter};
use anyhow::Result;
use clap::Args;
use skymarshal_core::models::{ContentTypeFilter, SearchFilters, SortMode};
use skymarshal_core::search::{
    apply_engagement_preset, resolve_subject_handles, EngagementPreset, SearchEngine,
};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Build the filters through interactive prompts instead of flags
    #[arg(short, long)]
    pub interactive: bool,

    /// Keywords; supports "exact phrase", \bword\b, -excluded, +required
    #[arg(short, long)]
    pub keyword: Vec<String>,

    /// Content type: all, posts, replies, reposts, likes
    #[arg(short = 't', long, default_value = "all")]
    pub content_type: String,

    /// Inclusive start date (YYYY-MM-DD or ISO8601)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Inclusive end date (YYYY-MM-DD or ISO8601)
    #[arg(long)]
    pub end_date: Option<String>,

    #[arg(long)]
    pub min_likes: Option<u64>,
    #[arg(long)]
    pub max_likes: Option<u64>,
    #[arg(long)]
    pub min_reposts: Option<u64>,
    #[arg(long)]
    pub max_reposts: Option<u64>,
    #[arg(long)]
    pub min_replies: Option<u64>,
    #[arg(long)]
    pub max_replies: Option<u64>,
    #[arg(long)]
    pub min_engagement: Option<f64>,
    #[arg(long)]
    pub max_engagement: Option<f64>,

    /// Engagement preset: dead, bombers, mid, bangers, viral
    #[arg(long)]
    pub preset: Option<String>,

    /// Keep only likes/reposts whose subject URI contains this substring
    #[arg(long)]
    pub subject_contains: Option<String>,

    /// Keep only likes/reposts whose subject handle contains this substring
    #[arg(long)]
    pub subject_handle: Option<String>,

    /// Sort: newest, oldest, engagement_desc, engagement_asc, likes_desc,
    /// replies_desc, reposts_desc
    #[arg(long, default_value = "newest")]
    pub sort: String,

    #[arg(long, default_value_t = 25)]
    pub limit: usize,
}

fn parse_content_type(value: &str) -> ContentTypeFilter {
    match value.to_lowercase().as_str() {
        "posts" | "post" => ContentTypeFilter::Posts,
        "replies" | "reply" | "comments" => ContentTypeFilter::Replies,
        "reposts" | "repost" => ContentTypeFilter::Reposts,
        "likes" | "like" => ContentTypeFilter::Likes,
        _ => ContentTypeFilter::All,
    }
}

fn parse_sort(value: &str) -> SortMode {
    match value.to_lowercase().as_str() {
        "oldest" => SortMode::Oldest,
        "engagement_desc" => SortMode::EngagementDesc,
        "engagement_asc" => SortMode::EngagementAsc,
        "likes_desc" => SortMode::LikesDesc,
        "replies_desc" => SortMode::RepliesDesc,
        "reposts_desc" => SortMode::RepostsDesc,
        _ => SortMode::Newest,
    }
}

fn parse_preset(value: &str) -> Option<EngagementPreset> {
    match value.to_lowercase().as_str() {
        "dead" => Some(EngagementPreset::Dead),
        "bombers" => Some(EngagementPreset::Bombers),
        "mid" => Some(EngagementPreset::Mid),
        "bangers" => Some(EngagementPreset::Bangers),
        "viral" => Some(EngagementPreset::Viral),
        _ => None,
    }
}

/// Interactive filter builder mirroring the flag set: content type,
/// keywords, then either an engagement preset or custom thresholds.
fn build_filters_interactively(avg_likes: f64) -> Result<SearchFilters> {
    use dialoguer::{Confirm, Input, Select};

    let mut filters = SearchFilters::default();

    let type_choice = Select::new()
        .with_prompt("Content type")
        .items(&[
            "All content",
            "Original posts only",
            "Replies/comments only",
            "Reposts only",
            "Likes only",
        ])
        .default(0)
        .interact()?;
    filters.content_type = match type_choice {
        1 => ContentTypeFilter::Posts,
        2 => ContentTypeFilter::Replies,
        3 => ContentTypeFilter::Reposts,
        4 => ContentTypeFilter::Likes,
        _ => ContentTypeFilter::All,
    };

    if Confirm::new()
        .with_prompt("Add keyword filters?")
        .default(false)
        .interact()?
    {
        let raw: String = Input::new()
            .with_prompt("Enter keywords (comma separated)")
            .allow_empty(true)
            .interact_text()?;
        let keywords: Vec<String> = raw
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect();
        if !keywords.is_empty() {
            filters.keywords = Some(keywords);
        }
    }

    if Confirm::new()
        .with_prompt("Add engagement filters?")
        .default(false)
        .interact()?
    {
        let style = Select::new()
            .with_prompt("Choose filter type")
            .items(&["Quick presets", "Custom thresholds"])
            .default(0)
            .interact()?;
        if style == 0 {
            let preset_choice = Select::new()
                .with_prompt("Select preset")
                .items(&[
                    "Dead Threads (0 likes, 0 engagement)",
                    "Bombers (below half your average)",
                    "Mid (around your average)",
                    "Bangers (twice your average or more)",
                    "Viral (2000+ likes)",
                ])
                .default(0)
                .interact()?;
            let preset = [
                EngagementPreset::Dead,
                EngagementPreset::Bombers,
                EngagementPreset::Mid,
                EngagementPreset::Bangers,
                EngagementPreset::Viral,
            ][preset_choice];
            apply_engagement_preset(&mut filters, preset, avg_likes);
        } else {
            let min: String = Input::new()
                .with_prompt("Minimum likes")
                .default("0".to_string())
                .interact_text()?;
            let max: String = Input::new()
                .with_prompt("Maximum likes")
                .default("999999".to_string())
                .interact_text()?;
            filters.min_likes = min.trim().parse().unwrap_or(0);
            filters.max_likes = max.trim().parse().unwrap_or(u64::MAX);
        }
    }

    if Confirm::new()
        .with_prompt("Add date range filters?")
        .default(false)
        .interact()?
    {
        let start: String = Input::new()
            .with_prompt("Start date (YYYY-MM-DD, blank to skip)")
            .allow_empty(true)
            .interact_text()?;
        let end: String = Input::new()
            .with_prompt("End date (YYYY-MM-DD, blank to skip)")
            .allow_empty(true)
            .interact_text()?;
        filters.start_date = (!start.trim().is_empty()).then(|| start.trim().to_string());
        filters.end_date = (!end.trim().is_empty()).then(|| end.trim().to_string());
    }

    filters.limit = Some(50);
    Ok(filters)
}

pub async fn search(args: SearchArgs) -> Result<()> {
    let ctx = CliContext::init()?;
    let (handle, did) = ctx.require_login().await?;

    let reporter = SpinnerReporter::new();
    let items = ctx
        .store
        .ensure_loaded(&handle, &did, None, None, false, &reporter)
        .await?;

    if args.interactive {
        reporter.finish();
        let avg_likes = ctx.store.avg_likes_per_post(&handle).await;
        let filters = build_filters_interactively(avg_likes)?;
        return run_search(&ctx, &handle, &items, filters).await;
    }

    let mut filters = SearchFilters {
        content_type: parse_content_type(&args.content_type),
        start_date: args.start_date,
        end_date: args.end_date,
        subject_contains: args.subject_contains,
        subject_handle_contains: args.subject_handle,
        sort: parse_sort(&args.sort),
        limit: Some(args.limit),
        ..SearchFilters::default()
    };
    if !args.keyword.is_empty() {
        filters.keywords = Some(args.keyword);
    }
    if let Some(min) = args.min_likes {
        filters.min_likes = min;
    }
    if let Some(max) = args.max_likes {
        filters.max_likes = max;
    }
    if let Some(min) = args.min_reposts {
        filters.min_reposts = min;
    }
    if let Some(max) = args.max_reposts {
        filters.max_reposts = max;
    }
    if let Some(min) = args.min_replies {
        filters.min_replies = min;
    }
    if let Some(max) = args.max_replies {
        filters.max_replies = max;
    }
    if let Some(min) = args.min_engagement {
        filters.min_engagement = min;
    }
    if let Some(max) = args.max_engagement {
        filters.max_engagement = max;
    }
    if let Some(preset) = args.preset.as_deref().and_then(parse_preset) {
        let avg_likes = ctx.store.avg_likes_per_post(&handle).await;
        apply_engagement_preset(&mut filters, preset, avg_likes);
    }
    reporter.finish();

    run_search(&ctx, &handle, &items, filters).await
}

async fn run_search(
    ctx: &CliContext,
    handle: &str,
    items: &[skymarshal_core::models::ContentItem],
    filters: SearchFilters,
) -> Result<()> {
    let did_to_handle = if filters.subject_handle_contains.is_some() {
        resolve_subject_handles(&ctx.client, items).await?
    } else {
        Default::default()
    };

    let reporter = SpinnerReporter::new();
    let engine = SearchEngine::new(ctx.settings.settings().clone());
    let (results, total) = engine.search_with_handles(items, &filters, &did_to_handle, &reporter);
    reporter.finish();

    if results.is_empty() {
        println!("No matches ({total} total).");
        return Ok(());
    }
    println!("Showing {} of {total} matches for @{handle}:", results.len());
    for (index, item) in results.iter().enumerate() {
        let date = item.created_at.as_deref().unwrap_or("unknown date");
        let text = item
            .text
            .as_deref()
            .map(|text| truncate_text(text, 70))
            .unwrap_or_else(|| {
                item.extra
                    .subject_uri
                    .as_deref()
                    .map(|uri| format!("→ {uri}"))
                    .unwrap_or_default()
            });
        println!(
            "{:>3}. [{}] {} | ♥{} ↻{} 💬{} | {}",
            index + 1,
            item.kind.as_str(),
            date,
            item.like_count,
            item.repost_count,
            item.reply_count,
            text,
        );
        println!("     {}", item.uri);
    }
    Ok(())
}
