use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;

use args::{Cli, Commands};
use cli::commands::{builtins, edicts, functions, inspect};
use cli::load_config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;
    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Commands::Inspect { path, role } => {
            inspect::inspect_file(path, role.into(), config, &mut stdout)
        }
        Commands::Functions { path, role } => {
            functions::list_file(path, role.into(), config, &mut stdout)
        }
        Commands::Edicts { path, lump } => edicts::edicts_file(path, lump.as_deref(), config, &mut stdout),
        Commands::Builtins { output } => builtins::write_header(output.as_deref(), &mut stdout),
    }
}
