use crate::util::CliContext;
use anyhow::Result;
use dialoguer::{Input, Select};
use skymarshal_core::models::{FetchOrder, UserSettings};

fn show(settings: &UserSettings) {
    println!("Current settings:");
    println!(
        "  1. Default download limit (per category): {}",
        settings.download_limit_default
    );
    println!(
        "  2. Default categories to fetch:           {}",
        settings.default_categories.join(",")
    );
    println!(
        "  3. API page size (listRecords):           {}",
        settings.records_page_size
    );
    println!(
        "  4. Engagement update batch size:          {}",
        settings.hydrate_batch_size
    );
    println!(
        "  5. Parallel category workers:             {}",
        settings.category_workers
    );
    println!(
        "  6. High engagement threshold:             {}",
        settings.high_engagement_threshold
    );
    println!(
        "  7. Use subject engagement for reposts:    {}",
        if settings.use_subject_engagement_for_reposts {
            "on"
        } else {
            "off"
        }
    );
    println!(
        "  8. Fetch order (newest|oldest):           {}",
        match settings.fetch_order {
            FetchOrder::Newest => "newest",
            FetchOrder::Oldest => "oldest",
        }
    );
    println!(
        "  9. Network worker pool size:              {}",
        settings.network_workers
    );
}

pub async fn settings() -> Result<()> {
    let mut ctx = CliContext::init()?;
    loop {
        let current = ctx.settings.settings().clone();
        show(&current);

        let choice = Select::new()
            .with_prompt("Edit which setting?")
            .items(&[
                "Download limit",
                "Default categories",
                "Records page size",
                "Hydrate batch size",
                "Category workers",
                "High engagement threshold",
                "Use subject engagement for reposts",
                "Fetch order",
                "Network workers",
                "Done",
            ])
            .default(9)
            .interact()?;

        let mut updated = current.clone();
        match choice {
            0 => updated.download_limit_default = prompt_number("Download limit")?,
            1 => {
                let value: String = Input::new()
                    .with_prompt("Categories (comma separated: posts,likes,reposts)")
                    .with_initial_text(current.default_categories.join(","))
                    .interact_text()?;
                updated.default_categories =
                    value.split(',').map(|part| part.trim().to_string()).collect();
            }
            2 => updated.records_page_size = prompt_number("Page size (1-100)")?,
            3 => updated.hydrate_batch_size = prompt_number("Batch size (1-25)")?,
            4 => updated.category_workers = prompt_number("Workers")?,
            5 => {
                let value: String = Input::new()
                    .with_prompt("High engagement threshold")
                    .interact_text()?;
                updated.high_engagement_threshold = value.trim().parse()?;
            }
            6 => {
                updated.use_subject_engagement_for_reposts =
                    !current.use_subject_engagement_for_reposts;
            }
            7 => {
                updated.fetch_order = match current.fetch_order {
                    FetchOrder::Newest => FetchOrder::Oldest,
                    FetchOrder::Oldest => FetchOrder::Newest,
                };
            }
            8 => updated.network_workers = prompt_number("Network workers")?,
            _ => break,
        }

        match ctx.settings.update(updated) {
            Ok(()) => println!("Saved."),
            Err(error) => eprintln!("Invalid value: {error}"),
        }
        println!();
    }
    Ok(())
}

fn prompt_number(prompt: &str) -> Result<usize> {
    let value: String = Input::new().with_prompt(prompt).interact_text()?;
    Ok(value.trim().parse()?)
}
