use std::process;

fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    if let Err(err) = skymarshal_cli::run() {
        if is_interrupted(&err) {
            process::exit(130);
        }
        eprintln!("ERROR: {}", err);
        let mut source = err.source();
        if source.is_some() {
            eprintln!("\nError details:");
            while let Some(err) = source {
                eprintln!("  - {}", err);
                source = err.source();
            }
        }
        process::exit(1);
    }
}

/// A prompt aborted with ctrl-c surfaces as an interrupted IO error; the
/// conventional exit status for that is 130.
fn is_interrupted(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .map(|io| io.kind() == std::io::ErrorKind::Interrupted)
            .unwrap_or(false)
            || cause.to_string().to_lowercase().contains("interrupted")
    })
}
