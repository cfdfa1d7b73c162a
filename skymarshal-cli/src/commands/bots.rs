use crate::util::{CliContext, SpinnerReporter};
use anyhow::Result;
use clap::Args;
use skymarshal_common::progress::ProgressReporter;
use skymarshal_common::syntax::validate_handle;
use skymarshal_core::models::Profile;
use skymarshal_graph::bots::BotDetector;

#[derive(Args, Debug)]
pub struct BotsArgs {
    /// Account whose followers to scan; defaults to the logged-in account
    pub handle: Option<String>,

    /// Maximum followers to scan
    #[arg(long, default_value_t = 500)]
    pub max_followers: usize,

    /// Number of suspects to report
    #[arg(long, default_value_t = 20)]
    pub top: usize,
}

/// Scan an account's followers for bot/spam indicators based on
/// follower/following ratios.
pub async fn bots(args: BotsArgs) -> Result<()> {
    let ctx = CliContext::init()?;
    let (own_handle, _did) = ctx.require_login().await?;
    let handle = match args.handle {
        Some(handle) => validate_handle(&handle)?,
        None => own_handle,
    };

    let reporter = SpinnerReporter::new();
    reporter.report("Fetching followers", 0, 1);
    let followers = ctx
        .client
        .get_all_followers(&handle, Some(args.max_followers))
        .await?;

    let mut profiles: Vec<Profile> = Vec::new();
    let handles: Vec<String> = followers
        .iter()
        .map(|follower| follower.handle.clone())
        .collect();
    let total = handles.len();
    for (index, batch) in handles.chunks(25).enumerate() {
        match ctx.client.get_profiles(batch).await {
            Ok(views) => profiles.extend(views.iter().map(Profile::from)),
            Err(error) => tracing::warn!("profile batch failed: {error}"),
        }
        reporter.report("Hydrating follower profiles", ((index + 1) * 25).min(total), total);
    }
    reporter.finish();

    let suspects = BotDetector::default().analyze_indicators(&profiles, args.top);
    if suspects.is_empty() {
        println!("No suspicious accounts detected among {total} followers.");
        return Ok(());
    }
    println!(
        "Potential bot indicators among followers of @{handle} ({} of {total} scanned):",
        suspects.len()
    );
    for (index, suspect) in suspects.iter().enumerate() {
        println!(
            "{:>3}. @{} | ratio {:.3} | followers {} / following {} | {:?}",
            index + 1,
            suspect.profile.handle,
            suspect.ratio,
            suspect.profile.followers_count,
            suspect.profile.following_count,
            suspect.bot_probability,
        );
    }
    Ok(())
}
