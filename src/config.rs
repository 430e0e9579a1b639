//! Runtime configuration.
//!
//! Configuration is read from an explicit TOML file, or from `qrgen.toml` in
//! the working directory, and falls back to defaults. Environment variables
//! are applied last:
//!
//! | Variable | Overrides |
//! |---|---|
//! | `QRGEN_LOG` | `logging.level` |
//! | `QRGEN_DEBOUNCE_MS` | `preview.debounce_ms` |
//! | `QRGEN_MAX_UPLOAD_BYTES` | `logo.max_upload_bytes` |
//!
//! ```toml
//! [compiler]
//! minScale = 0.05
//! maxScale = 0.4
//! hideDotsThreshold = 0.25
//!
//! [preview]
//! debounce_ms = 200
//!
//! [export]
//! format = "svg"
//! size = 2048
//!
//! [logging]
//! level = "debug"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compiler::{LogoPolicy, OptionsCompiler};
use crate::error::ConfigError;
use crate::export::ExportConfig;
use crate::logo::DEFAULT_MAX_UPLOAD_BYTES;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "qrgen.toml";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Logo sizing rules used by the compiler.
    pub compiler: LogoPolicy,
    pub preview: PreviewOptions,
    /// Defaults for exports.
    pub export: ExportConfig,
    pub logo: LogoOptions,
    pub logging: LoggingOptions,
}

impl StudioConfig {
    /// Loads from `explicit_path`, else a discovered file, else defaults,
    /// then applies environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file() {
            tracing::info!("using configuration file {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("no {CONFIG_FILE_NAME} found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    fn discover_file() -> Option<PathBuf> {
        let path = env::current_dir().ok()?.join(CONFIG_FILE_NAME);
        path.is_file().then_some(path)
    }

    /// Reads a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Applies overrides from `lookup`, usually the process environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("QRGEN_LOG") {
            self.logging.level = level;
        }
        if let Some(ms) = lookup("QRGEN_DEBOUNCE_MS").and_then(|v| v.parse().ok()) {
            self.preview.debounce_ms = ms;
        }
        if let Some(bytes) = lookup("QRGEN_MAX_UPLOAD_BYTES").and_then(|v| v.parse().ok()) {
            self.logo.max_upload_bytes = bytes;
        }
    }

    /// A compiler using the configured [`LogoPolicy`].
    pub fn options_compiler(&self) -> OptionsCompiler {
        OptionsCompiler::new(self.compiler)
    }
}

/// Live preview settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewOptions {
    /// Quiet period before an edit reaches the engine.
    pub debounce_ms: u64,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self { debounce_ms: 120 }
    }
}

impl PreviewOptions {
    /// The debounce delay handed to the live preview.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Logo upload limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoOptions {
    pub max_upload_bytes: u64,
}

impl Default for LogoOptions {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// An `EnvFilter` directive such as `info` or `qrgen=debug`.
    pub level: String,
    /// Use ANSI colors on stderr.
    pub color: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".into(),
            color: true,
        }
    }
}
