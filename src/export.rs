//! File and clipboard export.
//!
//! Exports always go through a transient engine built for the requested size,
//! so the live preview is never resized.
//!
//! ```
//! use qrgen::export::{export_qr, ExportConfig, ExportFormat};
//! use qrgen::QRSettings;
//!
//! let config = ExportConfig::new(ExportFormat::Svg).with_size(512).with_file_name("ticket");
//! let artifact = export_qr(&QRSettings::default(), &config).unwrap();
//!
//! assert_eq!(artifact.file_name, "ticket.svg");
//! assert_eq!(artifact.mime_type, "image/svg+xml");
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::compiler::{CompileOverrides, OptionsCompiler};
use crate::engine::{RasterEngine, RenderEngine};
use crate::error::ExportError;
use crate::logo::to_data_url;
use crate::settings::QRSettings;
use crate::url_state;

/// Export size bounds, in pixels.
pub const EXPORT_SIZE_RANGE: (u32, u32) = (64, 4096);

/// File name used when none is given.
pub const DEFAULT_FILE_NAME: &str = "qr-code";

// ============================================================================
// Formats
// ============================================================================

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    Svg,
}

impl ExportFormat {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
            Self::Svg => "svg",
        }
    }

    /// MIME type of the encoded bytes.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Svg => "image/svg+xml",
        }
    }

    /// Only PNG exports keep a transparent background.
    pub fn supports_transparency(self) -> bool {
        self == Self::Png
    }
}

/// Named export sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SizePreset {
    Small,
    Medium,
    Large,
}

impl SizePreset {
    /// Edge length in pixels.
    pub fn pixels(self) -> u32 {
        match self {
            Self::Small => 512,
            Self::Medium => 1024,
            Self::Large => 2048,
        }
    }
}

// ============================================================================
// ExportConfig
// ============================================================================

/// What to export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ExportConfig {
    pub format: ExportFormat,
    /// Edge length in pixels. Clamped to [`EXPORT_SIZE_RANGE`].
    pub size: u32,
    /// Ignored unless the format is PNG.
    pub transparent: bool,
    /// Base name; the format's extension is appended.
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            size: SizePreset::Medium.pixels(),
            transparent: true,
            file_name: DEFAULT_FILE_NAME.into(),
        }
    }
}

impl ExportConfig {
    /// Defaults for `format`, opaque unless the format keeps alpha.
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            transparent: format.supports_transparency(),
            ..Self::default()
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// The size actually rendered.
    pub fn effective_size(&self) -> u32 {
        self.size.clamp(EXPORT_SIZE_RANGE.0, EXPORT_SIZE_RANGE.1)
    }

    /// Whether the background is actually left transparent.
    pub fn effective_transparent(&self) -> bool {
        self.transparent && self.format.supports_transparency()
    }

    /// File name with the format's extension.
    pub fn resolved_file_name(&self) -> String {
        let base = self.file_name.trim();
        let base = if base.is_empty() { DEFAULT_FILE_NAME } else { base };
        let ext = self.format.extension();
        match base.rsplit_once('.') {
            Some((_, existing)) if existing.eq_ignore_ascii_case(ext) => base.to_string(),
            _ => format!("{base}.{ext}"),
        }
    }

    fn overrides(&self) -> CompileOverrides {
        CompileOverrides::default()
            .with_size(self.effective_size())
            .with_transparent(self.effective_transparent())
    }
}

// ============================================================================
// Artifacts
// ============================================================================

/// An encoded export ready to be saved or handed to a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Writes the artifact into `dir` under its file name.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        info!(path = %path.display(), bytes = self.bytes.len(), "saved export");
        Ok(path)
    }

    /// The artifact as a base64 data URL.
    pub fn to_data_url(&self) -> String {
        to_data_url(self.mime_type, &self.bytes)
    }
}

/// Renders `settings` as described by `config` with the default compiler.
pub fn export_qr(settings: &QRSettings, config: &ExportConfig) -> Result<ExportArtifact, ExportError> {
    export_qr_with(&OptionsCompiler::default(), settings, config)
}

/// Renders `settings` as described by `config`.
pub fn export_qr_with(
    compiler: &OptionsCompiler,
    settings: &QRSettings,
    config: &ExportConfig,
) -> Result<ExportArtifact, ExportError> {
    let options = compiler.compile(settings, config.overrides());
    let engine = RasterEngine::from_options(&options);
    let bytes = engine.raw_data(config.format)?;

    Ok(ExportArtifact {
        file_name: config.resolved_file_name(),
        mime_type: config.format.mime_type(),
        bytes,
    })
}

// ============================================================================
// Clipboard
// ============================================================================

/// A system clipboard.
pub trait ClipboardSink {
    /// Whether images can be written; text is always supported.
    fn supports_images(&self) -> bool;

    fn write_image(&mut self, mime_type: &str, bytes: &[u8]) -> Result<(), ExportError>;

    fn write_text(&mut self, text: &str) -> Result<(), ExportError>;
}

/// How a QR image reached the clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardOutcome {
    Image,
    /// Written as a `data:image/png;base64,...` string.
    DataUrl,
}

/// Copies a PNG rendering to the clipboard.
///
/// Falls back to a data URL when the clipboard cannot take images. The
/// format in `config` is ignored.
pub fn copy_to_clipboard(
    settings: &QRSettings,
    config: &ExportConfig,
    clipboard: &mut impl ClipboardSink,
) -> Result<ClipboardOutcome, ExportError> {
    let config = ExportConfig {
        format: ExportFormat::Png,
        ..config.clone()
    };
    let artifact = export_qr(settings, &config)?;

    if clipboard.supports_images() {
        match clipboard.write_image(artifact.mime_type, &artifact.bytes) {
            Ok(()) => return Ok(ClipboardOutcome::Image),
            Err(e) => warn!("image clipboard write failed, falling back to text: {e}"),
        }
    }

    clipboard.write_text(&artifact.to_data_url())?;
    Ok(ClipboardOutcome::DataUrl)
}

/// Copies the shareable link for `settings` to the clipboard.
pub fn copy_share_link(
    settings: &QRSettings,
    location: &Url,
    clipboard: &mut impl ClipboardSink,
) -> Result<Url, ExportError> {
    let url = url_state::encode_settings_to_url(settings, location).ok_or(ExportError::ShareLink)?;
    clipboard.write_text(url.as_str())?;
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;

    #[derive(Default)]
    struct MemoryClipboard {
        images: bool,
        reject_images: bool,
        image: Option<(String, Vec<u8>)>,
        text: Option<String>,
    }

    impl ClipboardSink for MemoryClipboard {
        fn supports_images(&self) -> bool {
            self.images
        }

        fn write_image(&mut self, mime_type: &str, bytes: &[u8]) -> Result<(), ExportError> {
            if self.reject_images {
                return Err(ExportError::Clipboard("permission denied".into()));
            }
            self.image = Some((mime_type.to_string(), bytes.to_vec()));
            Ok(())
        }

        fn write_text(&mut self, text: &str) -> Result<(), ExportError> {
            self.text = Some(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn format_metadata() {
        assert_eq!(ExportFormat::Jpeg.extension(), "jpeg");
        assert_eq!(ExportFormat::Webp.mime_type(), "image/webp");
        assert!(ExportFormat::Png.supports_transparency());
        assert!(!ExportFormat::Svg.supports_transparency());
    }

    #[test]
    fn file_names_get_one_extension() {
        let config = ExportConfig::new(ExportFormat::Png);
        assert_eq!(config.resolved_file_name(), "qr-code.png");
        assert_eq!(config.clone().with_file_name("  ").resolved_file_name(), "qr-code.png");
        assert_eq!(config.clone().with_file_name("menu.PNG").resolved_file_name(), "menu.PNG");
        assert_eq!(config.with_file_name("v1.2").resolved_file_name(), "v1.2.png");
    }

    #[test]
    fn transparency_only_for_png() {
        let jpeg = ExportConfig::new(ExportFormat::Jpeg).with_transparent(true);
        assert!(!jpeg.effective_transparent());
        assert!(ExportConfig::new(ExportFormat::Png).effective_transparent());
    }

    #[test]
    fn size_is_clamped() {
        assert_eq!(ExportConfig::default().with_size(10).effective_size(), 64);
        assert_eq!(ExportConfig::default().with_size(100_000).effective_size(), 4096);
    }

    #[test]
    fn export_renders_at_requested_size() {
        let config = ExportConfig::new(ExportFormat::Png).with_size(512);
        let artifact = export_qr(&QRSettings::default(), &config).unwrap();

        let img = image::load_from_memory_with_format(&artifact.bytes, ImageFormat::Png).unwrap();
        assert_eq!((img.width(), img.height()), (512, 512));
        assert_eq!(img.to_rgba8().get_pixel(0, 0)[3], 0, "PNG export defaults to transparent");
    }

    #[test]
    fn jpeg_export_is_opaque() {
        let mut settings = QRSettings::default();
        settings.transparent_background = true;
        let config = ExportConfig::new(ExportFormat::Jpeg).with_size(256);

        let artifact = export_qr(&settings, &config).unwrap();
        assert_eq!(artifact.file_name, "qr-code.jpeg");
        let img = image::load_from_memory(&artifact.bytes).unwrap().to_rgb8();
        let corner = img.get_pixel(0, 0);
        assert!(corner.0.iter().all(|&c| c > 240));
    }

    #[test]
    fn save_in_writes_file() {
        let dir = std::env::temp_dir().join(format!("qrgen-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let artifact = export_qr(&QRSettings::default(), &ExportConfig::new(ExportFormat::Svg)).unwrap();
        let path = artifact.save_in(&dir).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), artifact.bytes);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn clipboard_prefers_images() {
        let mut clipboard = MemoryClipboard {
            images: true,
            ..Default::default()
        };
        let outcome = copy_to_clipboard(&QRSettings::default(), &ExportConfig::default(), &mut clipboard).unwrap();

        assert_eq!(outcome, ClipboardOutcome::Image);
        assert_eq!(clipboard.image.unwrap().0, "image/png");
        assert!(clipboard.text.is_none());
    }

    #[test]
    fn clipboard_falls_back_to_data_url() {
        for clipboard in [
            MemoryClipboard::default(),
            MemoryClipboard {
                images: true,
                reject_images: true,
                ..Default::default()
            },
        ] {
            let mut clipboard = clipboard;
            let config = ExportConfig::new(ExportFormat::Svg).with_size(128);
            let outcome = copy_to_clipboard(&QRSettings::default(), &config, &mut clipboard).unwrap();

            assert_eq!(outcome, ClipboardOutcome::DataUrl);
            assert!(clipboard.text.unwrap().starts_with("data:image/png;base64,"));
        }
    }

    #[test]
    fn share_link_is_copied() {
        let mut clipboard = MemoryClipboard::default();
        let location = Url::parse("https://studio.example/").unwrap();
        let url = copy_share_link(&QRSettings::default(), &location, &mut clipboard).unwrap();

        assert_eq!(clipboard.text.as_deref(), Some(url.as_str()));
        assert!(url_state::decode_settings_from_url(&url).is_some());
    }
}
