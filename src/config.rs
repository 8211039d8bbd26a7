use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::{CompressionFormat, OutputFormat};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub skip_rows: Option<usize>,
    pub compression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub overall_label: String,
    pub top_products: usize,
    pub tone_product_cap: usize,
    pub top_words: usize,
    pub discount_slices: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: String,
    pub pretty_json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            file_loading: FileLoadingConfig::default(),
            analysis: AnalysisConfig::default(),
            output: OutputConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            overall_label: "Overall".to_string(),
            top_products: crate::statistics::TOP_PRODUCTS,
            tone_product_cap: crate::statistics::TONE_PRODUCT_CAP,
            top_words: 20,
            discount_slices: 5,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            pretty_json: true,
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        Self::load_with(&ConfigManager::new(app_name)?)
    }

    /// Load configuration using a specific config directory
    pub fn load_with(config_manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        config.merge(Self::load_user_config(config_manager)?);
        config.validate()?;
        Ok(config)
    }

    /// Load user configuration from <config_dir>/config.toml
    fn load_user_config(config_manager: &ConfigManager) -> Result<AppConfig> {
        let config_path = config_manager.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.file_loading.merge(other.file_loading);
        self.analysis.merge(other.analysis);
        self.output.merge(other.output);
        self.debug.merge(other.debug);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        let analysis = &self.analysis;
        if analysis.overall_label.is_empty() {
            return Err(eyre!("overall_label must not be empty"));
        }
        for (name, value) in [
            ("top_products", analysis.top_products),
            ("tone_product_cap", analysis.tone_product_cap),
            ("top_words", analysis.top_words),
            ("discount_slices", analysis.discount_slices),
        ] {
            if value == 0 {
                return Err(eyre!("{} must be greater than 0", name));
            }
        }

        if let Some(compression) = &self.file_loading.compression {
            if CompressionFormat::from_name(compression).is_none() {
                return Err(eyre!(
                    "Invalid compression: {}. Must be 'gzip', 'zstd', 'bzip2' or 'xz'",
                    compression
                ));
            }
        }

        if OutputFormat::from_name(&self.output.format).is_none() {
            return Err(eyre!(
                "Invalid output format: {}. Must be 'text' or 'json'",
                self.output.format
            ));
        }

        Ok(())
    }

    /// The configured output format; validation guarantees it parses.
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_name(&self.output.format).unwrap_or(OutputFormat::Text)
    }
}

// Merge implementations for each config section
impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.has_header.is_some() {
            self.has_header = other.has_header;
        }
        if other.skip_rows.is_some() {
            self.skip_rows = other.skip_rows;
        }
        if other.compression.is_some() {
            self.compression = other.compression;
        }
    }
}

impl AnalysisConfig {
    pub fn merge(&mut self, other: Self) {
        let default = AnalysisConfig::default();
        if other.overall_label != default.overall_label {
            self.overall_label = other.overall_label;
        }
        if other.top_products != default.top_products {
            self.top_products = other.top_products;
        }
        if other.tone_product_cap != default.tone_product_cap {
            self.tone_product_cap = other.tone_product_cap;
        }
        if other.top_words != default.top_words {
            self.top_words = other.top_words;
        }
        if other.discount_slices != default.discount_slices {
            self.discount_slices = other.discount_slices;
        }
    }
}

impl OutputConfig {
    pub fn merge(&mut self, other: Self) {
        let default = OutputConfig::default();
        if other.format != default.format {
            self.format = other.format;
        }
        if other.pretty_json != default.pretty_json {
            self.pretty_json = other.pretty_json;
        }
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        if other.enabled {
            self.enabled = true;
        }
    }
}

// Default configuration template
const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");
