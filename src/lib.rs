//! Review analytics over delimited product-review exports.
//!
//! A loaded file goes through [`schema::normalize`] (canonical column
//! names), then [`cleaning::clean`] (typed and derived columns), and is then
//! read by the aggregations in [`statistics`], assembled by [`report::Report`].

use color_eyre::Result;
use std::path::Path;
use tracing_subscriber::EnvFilter;

pub mod cleaning;
pub mod config;
pub mod emoji;
pub mod error_display;
pub mod report;
pub mod schema;
pub mod source;
pub mod statistics;
pub mod table;

pub use reviewlens_cli as cli;

pub use cli::{Args, CompressionFormat, DelimitedFormat, OutputFormat};
pub use config::{AnalysisConfig, AppConfig, ConfigManager};
pub use report::Report;
pub use source::OpenOptions;
pub use statistics::Insight;
pub use table::{ReviewTable, Selection, Stage};

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "reviewlens";

/// Load, normalize and clean a review file.
pub fn analyze_file(path: &Path, options: &OpenOptions) -> Result<ReviewTable> {
    let raw = source::load(path, options)?;
    let normalized = schema::normalize(raw)?;
    cleaning::clean(normalized)
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `debug`.
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "reviewlens=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber may already be installed (tests, embedding callers)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
