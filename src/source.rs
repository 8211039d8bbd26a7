//! Reading a delimited review export into a raw frame.
//!
//! Every column is read as text; the cleaner owns all type coercion.

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use polars::prelude::*;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;
use tracing::{debug, info};

use crate::cli::{CompressionFormat, DelimitedFormat};
use crate::config::AppConfig;
use crate::Args;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct OpenOptions {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub skip_rows: Option<usize>,
    pub compression: Option<CompressionFormat>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = Some(skip_rows);
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    pub fn with_compression(mut self, compression: CompressionFormat) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Create OpenOptions from CLI args and config, with CLI args taking precedence
    pub fn from_args_and_config(args: &Args, config: &AppConfig) -> Self {
        let loading = &config.file_loading;
        Self {
            delimiter: args.delimiter.or(loading.delimiter),
            has_header: match args.no_header {
                Some(no_header) => Some(!no_header),
                None => loading.has_header,
            },
            skip_rows: args.skip_rows.or(loading.skip_rows),
            compression: args.compression.or_else(|| {
                loading
                    .compression
                    .as_deref()
                    .and_then(CompressionFormat::from_name)
            }),
        }
    }

    /// Delimiter to parse with: explicit option, then extension, then comma.
    pub fn delimiter_for(&self, path: &Path) -> u8 {
        self.delimiter
            .or_else(|| DelimitedFormat::from_path(path).map(|f| f.delimiter()))
            .unwrap_or(b',')
    }
}

/// Read the whole file, decompressing when the options or extension say so.
pub fn read_bytes(path: &Path, compression: Option<CompressionFormat>) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut reader: Box<dyn Read> = match compression {
        None => Box::new(BufReader::new(file)),
        Some(CompressionFormat::Gzip) => {
            Box::new(flate2::read::MultiGzDecoder::new(BufReader::new(file)))
        }
        Some(CompressionFormat::Zstd) => Box::new(zstd::stream::read::Decoder::new(file)?),
        Some(CompressionFormat::Bzip2) => {
            Box::new(bzip2::read::BzDecoder::new(BufReader::new(file)))
        }
        Some(CompressionFormat::Xz) => Box::new(xz2::read::XzDecoder::new(BufReader::new(file))),
    };
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Parse delimited bytes into an all-text frame.
pub fn parse_delimited(bytes: Vec<u8>, delimiter: u8, options: &OpenOptions) -> Result<DataFrame> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(eyre!("File is empty"));
    }
    let read_options = CsvReadOptions::default()
        .with_has_header(options.has_header.unwrap_or(true))
        .with_skip_rows(options.skip_rows.unwrap_or(0))
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_separator(delimiter));
    let df = CsvReader::new(Cursor::new(bytes))
        .with_options(read_options)
        .finish()?;
    Ok(df)
}

/// Load a review export from disk.
pub fn load(path: &Path, options: &OpenOptions) -> Result<DataFrame> {
    let compression = options
        .compression
        .or_else(|| CompressionFormat::from_extension(path));
    let delimiter = options.delimiter_for(path);
    debug!(path = %path.display(), ?compression, delimiter = %(delimiter as char), "loading");

    let bytes = read_bytes(path, compression)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    let df = parse_delimited(bytes, delimiter, options)
        .wrap_err_with(|| format!("Failed to parse {}", path.display()))?;

    info!(rows = df.height(), columns = df.width(), "loaded reviews");
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_every_column_as_text() {
        let bytes = b"rating,rating_count\n4.1,\"24,269\"\n5,12\n".to_vec();
        let df = parse_delimited(bytes, b',', &OpenOptions::new()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("rating").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("rating_count").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn parse_honors_delimiter() {
        let bytes = b"user\treview\nann\tgood\n".to_vec();
        let df = parse_delimited(bytes, b'\t', &OpenOptions::new()).unwrap();
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn empty_input_is_a_load_error() {
        assert!(parse_delimited(Vec::new(), b',', &OpenOptions::new()).is_err());
        assert!(parse_delimited(b"\n\n".to_vec(), b',', &OpenOptions::new()).is_err());
    }

    #[test]
    fn delimiter_resolution() {
        let opts = OpenOptions::new();
        assert_eq!(opts.delimiter_for(Path::new("a.tsv")), b'\t');
        assert_eq!(opts.delimiter_for(Path::new("a.psv.gz")), b'|');
        assert_eq!(opts.delimiter_for(Path::new("a.txt")), b',');
        let opts = OpenOptions::new().with_delimiter(b';');
        assert_eq!(opts.delimiter_for(Path::new("a.tsv")), b';');
    }

    #[test]
    fn args_override_config() {
        use clap::Parser;
        let mut config = AppConfig::default();
        config.file_loading.delimiter = Some(b';');
        config.file_loading.compression = Some("gzip".to_string());
        config.file_loading.skip_rows = Some(2);

        let args = Args::parse_from(["reviewlens", "r.csv", "--skip-rows", "1", "--no-header", "true"]);
        let opts = OpenOptions::from_args_and_config(&args, &config);
        assert_eq!(opts.delimiter, Some(b';'));
        assert_eq!(opts.skip_rows, Some(1));
        assert_eq!(opts.has_header, Some(false));
        assert_eq!(opts.compression, Some(CompressionFormat::Gzip));
    }
}
