use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::loader::ProjectType;
use crate::infra::io::DEFAULT_CHUNK_SIZE;

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory containing the CSV mapping files
    pub csv_dir: Option<PathBuf>,

    /// Root of the source tree to rewrite
    pub src_dir: Option<PathBuf>,

    /// Output directory; cleared and recreated on every apply
    pub out_dir: Option<PathBuf>,

    /// Default project type when --project-type is not given
    pub project_type: Option<ProjectType>,

    /// Read buffer size for source files, in bytes
    pub read_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            csv_dir: None,
            src_dir: None,
            out_dir: None,
            project_type: None,
            read_buffer_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

pub fn load_config() -> Result<Config> {
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    let config_paths = ["srcremap.toml", ".srcremap.toml"];

    for path in &config_paths {
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
            break;
        }
    }

    // Add environment variables with SRCREMAP_ prefix
    builder = builder.add_source(config::Environment::with_prefix("SRCREMAP"));

    let cfg = builder.build().context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(args: InitArgs, ctx: &AppContext) -> Result<()> {
    let config_path = args.path.join("srcremap.toml");

    if config_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
