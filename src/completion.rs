//! Shell completion generation using clap_complete.

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{generate, generate_to};
use std::{fs, io};

use crate::cli::{AppContext, Cli, CompletionsArgs};

pub fn run(args: CompletionsArgs, _ctx: &AppContext) -> Result<()> {
    let mut cmd = Cli::command();

    match args.out_dir {
        Some(dir) if !args.stdout => {
            fs::create_dir_all(&dir).context("create --out-dir")?;
            let path = generate_to(args.shell, &mut cmd, "srcremap", &dir)
                .context("generate completion file")?;
            eprintln!("Wrote completion to {}", path.display());
        }
        _ => generate(args.shell, &mut cmd, "srcremap", &mut io::stdout()),
    }

    Ok(())
}
