use crate::util::{CliContext, SpinnerReporter};
use anyhow::Result;
use dialoguer::Confirm;
use skymarshal_common::progress::ProgressReporter;
use skymarshal_common::syntax::validate_handle;

pub async fn delete(uris: Vec<String>, yes: bool) -> Result<()> {
    if uris.is_empty() {
        anyhow::bail!("no URIs supplied");
    }
    let ctx = CliContext::init()?;
    let (handle, _did) = ctx.require_login().await?;

    if !yes {
        println!("About to permanently delete {} record(s):", uris.len());
        for uri in &uris {
            println!("  {uri}");
        }
        if !Confirm::new()
            .with_prompt("Delete these records?")
            .default(false)
            .interact()?
        {
            println!("Aborted.");
            return Ok(());
        }
    }

    let reporter = SpinnerReporter::new();
    let result = ctx.deletion.delete_records_by_uri(&uris, &reporter).await?;
    reporter.finish();

    let failed: Vec<&str> = result.errors.iter().map(|e| e.uri.as_str()).collect();
    let removed: Vec<String> = uris
        .iter()
        .filter(|uri| !failed.contains(&uri.as_str()))
        .cloned()
        .collect();
    ctx.store.remove_uris(&handle, &removed).await;

    println!("Deleted {} record(s).", result.deleted);
    if !result.errors.is_empty() {
        println!("{} failed:", result.errors.len());
        for error in &result.errors {
            println!("  {}: {}", error.uri, error.message);
        }
    }
    Ok(())
}

pub async fn unfollow(handle: &str) -> Result<()> {
    let ctx = CliContext::init()?;
    ctx.require_login().await?;

    let normalized = validate_handle(handle)?;
    let profile = ctx.client.get_profile(&normalized).await?;
    let reporter = SpinnerReporter::new();
    reporter.report("Looking up follow record", 0, 1);
    ctx.deletion.unfollow(&profile.did).await?;
    reporter.finish();
    println!("Unfollowed @{normalized}.");
    Ok(())
}
