//! **srcremap** - CLI that rewrites an obfuscated source tree using CSV name mappings
//!
//! Replaces `field_…`/`func_…`/`p_…` identifiers with readable names and injects
//! wrapped `/** … */` documentation blocks above field and method declarations.
//! Streaming rewriter with parallel per-file execution on a rayon pool.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core processing pipeline - mapping ingestion and streaming rewrite
pub mod core {
    /// Comment defanging, unicode-escape decoding and identifier validation
    pub mod sanitize;
    pub use sanitize::{escape_comment_content, is_valid_identifier, unescape_unicode_escapes};

    /// Hand-rolled RFC4180-style tabular reader over chunked character input
    pub mod csv;
    pub use csv::{ChunkSource, CsvError, CsvReader, DataType};

    /// CSV mapping loaders with per-category row transforms
    pub mod loader;
    pub use loader::{CsvMappingLoader, MappingLoadError, ProjectType, FIELD, METHOD, PARAM};

    /// Frozen rename/documentation lookup shared by the rewrite workers
    pub mod store;
    pub use store::{MappingStore, MappingWithDoc};

    /// Paragraph reflowing for injected documentation blocks
    pub mod wrap;
    pub use wrap::{TextWrapper, WrapError};

    /// Chunk-fed identifier rewriter with cross-boundary match handling
    pub mod rewrite;
    pub use rewrite::{RewriteError, Rewriter};

    /// The apply task: directory mirroring, parallel load and rewrite
    pub mod apply;
    pub use apply::run as apply_run;
}

/// Infrastructure - Configuration and I/O plumbing (lean architecture)
pub mod infra {
    /// Configuration management with TOML support
    pub mod config;
    pub use config::{load_config, Config};

    /// Chunked UTF-8 reading that never splits a character
    pub mod io;
    pub use io::ChunkedReader;

    /// Deterministic source-tree walking for mirroring
    pub mod walk;
    pub use walk::mirror_entries;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use crate::core::{apply_run, MappingStore, ProjectType, Rewriter};
pub use crate::infra::{load_config, Config};
