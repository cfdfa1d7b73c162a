pub mod commands;
pub mod util;

use anyhow::Result;
use clap::Parser;

pub fn run() -> Result<()> {
    let cli = commands::Cli::parse();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(commands::execute(cli))
}
