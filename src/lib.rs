//! qrgen: styled QR code generation
//!
//! This crate turns a declarative [`QRSettings`] value into rendered QR codes
//! with styled modules, gradients, and an optional rounded logo, and carries
//! the settings through shareable URLs.
//!
//! # Example
//!
//! ```
//! use qrgen::{compile, CompileOverrides, ExportFormat, QRSettings, RasterEngine, RenderEngine};
//!
//! let settings = QRSettings::default().with_text("https://example.com/menu");
//!
//! // Settings compile into the options an engine understands
//! let options = compile(&settings, CompileOverrides::default().with_size(256));
//! assert_eq!(options.width, 256);
//!
//! let engine = RasterEngine::from_options(&options);
//! let png = engine.raw_data(ExportFormat::Png).unwrap();
//! assert_eq!(&png[1..4], b"PNG");
//! ```
//!
//! # Sessions and Sharing
//!
//! [`SettingsStore`] owns the settings of one editing session. It keeps the
//! error correction level high enough for a logo, tracks which logo result is
//! current, and round-trips through the `?config=` query parameter:
//!
//! ```
//! use qrgen::{SettingsStore, QRSettings};
//! use url::Url;
//!
//! let mut store = SettingsStore::default();
//! store.update(|s| s.text = "hello".into());
//!
//! let link = store.share_url(&Url::parse("https://qr.example/").unwrap()).unwrap();
//!
//! let mut restored = SettingsStore::new(QRSettings::default());
//! assert!(restored.hydrate_from_search(link.query().unwrap()));
//! assert_eq!(restored.settings().text, "hello");
//! ```

pub mod color;
pub mod compiler;
pub mod config;
#[cfg(feature = "runtime")]
pub mod debounce;
pub mod engine;
pub mod error;
pub mod export;
#[cfg(feature = "clap")]
pub mod logging;
pub mod logo;
pub mod preset;
pub mod preview;
pub mod settings;
pub mod store;
pub mod url_state;

#[cfg(feature = "tsify")]
mod wasm;

pub use compiler::{
    CompileOverrides, Fill, LogoPolicy, OptionsCompiler, RenderOptions, compile,
};
pub use config::StudioConfig;
pub use engine::{RasterEngine, RenderEngine};
pub use error::{ConfigError, ExportError, LogoError, RenderError};
pub use export::{ExportArtifact, ExportConfig, ExportFormat, export_qr};
pub use preset::{PRESETS, Preset};
pub use preview::PreviewDriver;
pub use settings::{
    CornerDotStyle, CornerSquareStyle, CrossOrigin, DotStyle, ErrorCorrection, GradientConfig,
    GradientType, LogoConfig, LogoMode, QRSettings,
};
pub use store::{Notice, NoticeTone, SettingsStore};

#[cfg(feature = "tsify")]
pub use wasm::{
    compile_options, decode_settings_from_search_js, describe_contrast_js,
    encode_settings_to_url_js, round_corners_js,
};
