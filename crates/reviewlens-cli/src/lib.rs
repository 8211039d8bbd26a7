//! Shared CLI definitions for reviewlens.
//!
//! Used by the main application and by the build script (manpage).

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// Delimited text layout, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimitedFormat {
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// Pipe-separated values
    Psv,
}

impl DelimitedFormat {
    /// Detect the layout from a path, looking through a compression suffix
    /// (`reviews.tsv.gz` is TSV). Returns None for unknown extensions.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        if CompressionFormat::from_extension(path).is_some() {
            return path
                .file_stem()
                .map(Path::new)
                .and_then(Self::from_path);
        }
        Self::from_extension(ext)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "psv" => Some(Self::Psv),
            _ => None,
        }
    }

    pub fn delimiter(&self) -> u8 {
        match self {
            Self::Csv => b',',
            Self::Tsv => b'\t',
            Self::Psv => b'|',
        }
    }
}

/// Compression format for data files
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Gzip compression (.gz) - Most common, good balance of speed and compression
    Gzip,
    /// Zstandard compression (.zst) - Modern, fast compression with good ratios
    Zstd,
    /// Bzip2 compression (.bz2) - Good compression ratio, slower than gzip
    Bzip2,
    /// XZ compression (.xz) - Excellent compression ratio, slower than bzip2
    Xz,
}

impl CompressionFormat {
    /// Detect compression format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => Self::from_name(ext),
            None => None,
        }
    }

    /// Parse a format from an extension or config name ("gz", "gzip", "zst", ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "gz" | "gzip" => Some(Self::Gzip),
            "zst" | "zstd" => Some(Self::Zstd),
            "bz2" | "bz" | "bzip2" => Some(Self::Bzip2),
            "xz" => Some(Self::Xz),
            _ => None,
        }
    }

    /// Get file extension for this compression format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zstd => "zst",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
        }
    }
}

/// How the analysis report is written to stdout
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned plain-text sections
    Text,
    /// A single JSON document
    Json,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Command-line arguments for reviewlens
#[derive(Clone, Parser, Debug)]
#[command(
    name = "reviewlens",
    version,
    about = "Product review analytics from delimited review exports"
)]
pub struct Args {
    /// Path to the review file (csv, tsv or psv, optionally compressed).
    /// Not required with --generate-config
    #[arg(required_unless_present = "generate_config", value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Restrict per-user sections to this reviewer (default: the overall view)
    #[arg(long = "user", value_name = "NAME")]
    pub user: Option<String>,

    /// Output format for the report
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Skip this many rows when reading a file
    #[arg(long = "skip-rows")]
    pub skip_rows: Option<usize>,

    /// Specify that the file has no header
    #[arg(long = "no-header")]
    pub no_header: Option<bool>,

    /// Specify the delimiter to use when reading a delimited text file
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Specify the compression format explicitly (gzip, zstd, bzip2, xz)
    /// If not specified, compression is auto-detected from file extension.
    #[arg(long = "compression", value_enum)]
    pub compression: Option<CompressionFormat>,

    /// Write the normalized and cleaned table to this CSV path
    #[arg(long = "export-clean", value_name = "PATH")]
    pub export_clean: Option<PathBuf>,

    /// Print the reviewer selection list and exit
    #[arg(long = "list-users", action)]
    pub list_users: bool,

    /// Enable debug logging on stderr
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Generate default configuration file at ~/.config/reviewlens/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_compression_detection() {
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv.gz")),
            Some(CompressionFormat::Gzip)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv.zst")),
            Some(CompressionFormat::Zstd)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv.bz2")),
            Some(CompressionFormat::Bzip2)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv.xz")),
            Some(CompressionFormat::Xz)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv")),
            None
        );
        assert_eq!(CompressionFormat::from_extension(Path::new("file")), None);
        assert_eq!(
            CompressionFormat::from_name("gzip"),
            Some(CompressionFormat::Gzip)
        );
    }

    #[test]
    fn test_delimited_format_from_path() {
        assert_eq!(
            DelimitedFormat::from_path(Path::new("reviews.csv")),
            Some(DelimitedFormat::Csv)
        );
        assert_eq!(
            DelimitedFormat::from_path(Path::new("reviews.TSV")),
            Some(DelimitedFormat::Tsv)
        );
        assert_eq!(
            DelimitedFormat::from_path(Path::new("reviews.psv.gz")),
            Some(DelimitedFormat::Psv)
        );
        assert_eq!(DelimitedFormat::from_path(Path::new("reviews.gz")), None);
        assert_eq!(DelimitedFormat::from_path(Path::new("noext")), None);
        assert_eq!(DelimitedFormat::Tsv.delimiter(), b'\t');
    }

    #[test]
    fn test_args_parse() {
        Args::command().debug_assert();
        let args = Args::parse_from(["reviewlens", "reviews.csv", "--user", "Manav", "--format", "json"]);
        assert_eq!(args.path, Some(PathBuf::from("reviews.csv")));
        assert_eq!(args.user.as_deref(), Some("Manav"));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert!(!args.list_users);
    }

    #[test]
    fn test_generate_config_without_path() {
        let args = Args::parse_from(["reviewlens", "--generate-config", "--force"]);
        assert!(args.path.is_none());
        assert!(args.generate_config);
        assert!(args.force);
    }
}
