//! The apply task: validates directories, loads mappings in parallel and
//! rewrites the source tree into a mirrored output directory.
//!
//! Two concurrent phases run on the shared rayon pool. First the mapping
//! loaders, each owning its own table; only after all of them have finished
//! is the frozen [`MappingStore`] built. Then one rewrite task per input
//! file, all sharing the store read-only. A failing file is logged and
//! counted, the remaining files still run; the task itself fails afterwards
//! so a partial output directory is never mistaken for a good one.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::cli::{AppContext, ApplyArgs};
use crate::core::loader::{self, CsvMappingLoader, ProjectType};
use crate::core::rewrite::Rewriter;
use crate::core::store::MappingStore;
use crate::infra::config::load_config;
use crate::infra::io::ChunkedReader;
use crate::infra::walk::mirror_entries;

const FIELDS_CSV: &str = "fields.csv";
const METHODS_CSV: &str = "methods.csv";
const PARAMS_CSV: &str = "params.csv";

pub fn run(args: ApplyArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config().unwrap_or_default();
    let read_buffer_size = config.read_buffer_size;

    let csv_dir = args
        .csv_dir
        .or(config.csv_dir)
        .context("no CSV directory given (--csv-dir or srcremap.toml)")?;
    let src_dir = args
        .src_dir
        .or(config.src_dir)
        .context("no source directory given (--src-dir or srcremap.toml)")?;
    let out_dir = args
        .out_dir
        .or(config.out_dir)
        .context("no output directory given (--out-dir or srcremap.toml)")?;
    let project_type = args
        .project_type
        .or(config.project_type)
        .unwrap_or(ProjectType::Joined);

    check_directory(&csv_dir, "CSV")?;
    check_directory(&src_dir, "Source")?;

    // None of the three directories may contain another
    check_disjoint(&src_dir, &out_dir)?;
    check_disjoint(&csv_dir, &out_dir)?;
    check_disjoint(&csv_dir, &src_dir)?;

    let (dirs, files) = mirror_entries(&src_dir)?;

    if ctx.dry_run {
        if !ctx.quiet {
            println!("{}", "DRY RUN: Would apply mappings:".yellow());
            println!("  CSV directory:    {}", csv_dir.display());
            println!(
                "  Source directory: {} ({} files, {} directories)",
                src_dir.display(),
                files.len(),
                dirs.len()
            );
            println!("  Output directory: {}", out_dir.display());
            println!("  Project type:     {project_type:?}");
        }
        return Ok(());
    }

    reset_output_directory(&out_dir)?;

    let store = load_mapping_store(&csv_dir, project_type)?;

    // Mirror the directory tree before any file task runs
    for dir in &dirs {
        let target = mirror_path(dir, &src_dir, &out_dir)?;
        fs::create_dir_all(&target)
            .with_context(|| format!("creating output directory {}", target.display()))?;
    }

    let progress = if ctx.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    };

    let failures: usize = files
        .par_iter()
        .map(|file| {
            let result = process_file(file, &src_dir, &out_dir, &store, read_buffer_size);
            progress.inc(1);

            match result {
                Ok(()) => 0,
                Err(err) => {
                    let chain = format!("{err:#}");
                    error!(file = %file.display(), error = %chain, "failed processing file");
                    1
                }
            }
        })
        .sum();

    progress.finish_and_clear();

    if failures > 0 {
        bail!(
            "{failures} of {} files failed; the output directory is incomplete",
            files.len()
        );
    }

    if !ctx.quiet {
        println!(
            "{} Rewrote {} files into {}",
            "✓".green(),
            files.len(),
            out_dir.display()
        );
    }
    Ok(())
}

fn check_directory(directory: &Path, description: &str) -> Result<()> {
    if !directory.is_dir() {
        bail!(
            "{description} directory '{}' does not exist",
            directory.display()
        );
    }
    Ok(())
}

/// Fails when one path is the other or contains the other, after resolving
/// symlinks as far as the filesystem allows.
fn check_disjoint(a: &Path, b: &Path) -> Result<()> {
    let real_a = resolve_for_overlap(a);
    let real_b = resolve_for_overlap(b);

    if real_a.starts_with(&real_b) || real_b.starts_with(&real_a) {
        bail!(
            "directories '{}' and '{}' overlap",
            a.display(),
            b.display()
        );
    }
    Ok(())
}

/// Canonicalizes `path`, falling back to resolving its parent when the path
/// itself does not exist yet (the output directory usually does not).
fn resolve_for_overlap(path: &Path) -> PathBuf {
    if let Ok(real) = path.canonicalize() {
        return real;
    }

    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => match parent.canonicalize() {
            Ok(real_parent) => real_parent.join(name),
            Err(_) => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

fn reset_output_directory(out_dir: &Path) -> Result<()> {
    if out_dir.exists() {
        if !out_dir.is_dir() {
            bail!("output path '{}' is not a directory", out_dir.display());
        }
        info!(dir = %out_dir.display(), "output directory already exists; clearing it");
        fs::remove_dir_all(out_dir)
            .with_context(|| format!("clearing output directory {}", out_dir.display()))?;
    } else {
        info!(dir = %out_dir.display(), "output directory does not exist; creating it");
    }

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))
}

/// Runs the loaders for the mapping files that exist in parallel and builds
/// the frozen store. At least one of the three files has to be present; a
/// failing loader fails the whole task, since an incomplete store would
/// silently produce wrong output.
fn load_mapping_store(csv_dir: &Path, project_type: ProjectType) -> Result<MappingStore> {
    let fields_path = csv_dir.join(FIELDS_CSV);
    let methods_path = csv_dir.join(METHODS_CSV);
    let params_path = csv_dir.join(PARAMS_CSV);

    if !fields_path.is_file() && !methods_path.is_file() && !params_path.is_file() {
        bail!(
            "did not find any of the mapping files {FIELDS_CSV}, {METHODS_CSV}, {PARAMS_CSV} in '{}'",
            csv_dir.display()
        );
    }

    let (fields, (methods, params)) = rayon::join(
        || load_if_present(&loader::FIELD, &fields_path, project_type),
        || {
            rayon::join(
                || load_if_present(&loader::METHOD, &methods_path, project_type),
                || load_if_present(&loader::PARAM, &params_path, project_type),
            )
        },
    );

    Ok(MappingStore::new(fields?, methods?, params?))
}

fn load_if_present<T>(
    loader: &CsvMappingLoader<T>,
    path: &Path,
    project_type: ProjectType,
) -> Result<HashMap<String, T>> {
    let mut map = HashMap::new();

    if !path.is_file() {
        return Ok(map);
    }

    info!(file = %path.display(), "loading mappings");
    loader
        .load_mapping(path, project_type, |key, value| {
            if map.contains_key(&key) {
                warn!(%key, file = %path.display(), "duplicate mapping key; keeping the later row");
            }
            map.insert(key, value);
        })
        .with_context(|| format!("loading mappings from {}", path.display()))?;

    Ok(map)
}

fn process_file(
    file: &Path,
    src_dir: &Path,
    out_dir: &Path,
    store: &MappingStore,
    buffer_size: usize,
) -> Result<()> {
    let target = mirror_path(file, src_dir, out_dir)?;
    let input = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let output =
        File::create(&target).with_context(|| format!("creating {}", target.display()))?;

    let mut reader = ChunkedReader::new(input, buffer_size);
    let mut writer = BufWriter::new(output);
    let mut rewriter = Rewriter::new(&mut writer, store);

    while let Some(chunk) = reader
        .next_chunk()
        .with_context(|| format!("reading {}", file.display()))?
    {
        rewriter
            .append(&chunk)
            .with_context(|| format!("rewriting {}", file.display()))?;
    }
    rewriter
        .finish()
        .with_context(|| format!("rewriting {}", file.display()))?;

    Ok(())
}

fn mirror_path(path: &Path, current_parent: &Path, new_parent: &Path) -> Result<PathBuf> {
    let relative = path.strip_prefix(current_parent).with_context(|| {
        format!(
            "path '{}' is not under '{}'",
            path.display(),
            current_parent.display()
        )
    })?;
    Ok(new_parent.join(relative))
}
