use anyhow::Result;
use clap::Parser;
use srcremap::cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("srcremap=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = cli.context();

    match cli.command {
        Commands::Apply(args) => srcremap::core::apply::run(args, &ctx),
        Commands::Init(args) => srcremap::infra::config::init(args, &ctx),
        Commands::Completions(args) => srcremap::completion::run(args, &ctx),
    }
}
