//! Serializable QR styling settings.
//!
//! [`QRSettings`] is the single configuration record behind a studio session.
//! It is never mutated in place by the studio: every change produces a new
//! value (see [`SettingsStore`](crate::SettingsStore)).
//!
//! # JSON Format
//!
//! ```json
//! {
//!   "text": "https://example.com",
//!   "size": 320,
//!   "margin": 16,
//!   "ecc": "M",
//!   "dotStyle": "rounded",
//!   "cornerSquareStyle": "extra-rounded",
//!   "cornerDotStyle": "dot",
//!   "foregroundColor": "#1f5bff",
//!   "backgroundColor": "#ffffff",
//!   "gradient": { "enabled": true, "type": "linear", "rotation": 35.0, "start": "#7b5cff", "end": "#00d8ff" },
//!   "transparentBackground": false,
//!   "presetKey": "liquid-lavender",
//!   "logo": { "mode": "none", "crossOrigin": "anonymous", "scale": 0.22, "cornerRadius": 18.0 }
//! }
//! ```
//!
//! Missing fields, including missing fields of the nested `gradient` and
//! `logo` objects, are filled from [`QRSettings::default`] on deserialization.
//!
//! ```
//! use qrgen::{ErrorCorrection, QRSettings};
//!
//! let settings = QRSettings::from_json(r#"{ "text": "hello", "logo": { "scale": 0.3 } }"#).unwrap();
//! assert_eq!(settings.text, "hello");
//! assert_eq!(settings.ecc, ErrorCorrection::M);
//! assert_eq!(settings.logo.scale, 0.3);
//! assert_eq!(settings.logo.corner_radius, 18.0);
//! ```

use serde::{Deserialize, Serialize};

/// Size bounds applied by [`QRSettings::clamped`], in pixels.
pub const SIZE_RANGE: (u32, u32) = (100, 2000);

/// Largest margin accepted by [`QRSettings::clamped`], in pixels. The margin
/// is also held to a quarter of the size.
pub const MAX_MARGIN: u32 = 64;

// ============================================================================
// Enumerations
// ============================================================================

/// QR error correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ErrorCorrection {
    /// ~7% recovery.
    L,
    /// ~15% recovery.
    #[default]
    M,
    /// ~25% recovery.
    Q,
    /// ~30% recovery.
    H,
}

/// Shape used for data modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum DotStyle {
    Square,
    Dots,
    #[default]
    Rounded,
    ExtraRounded,
    Classy,
    ClassyRounded,
}

/// Shape of the outer ring of each finder pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CornerSquareStyle {
    Square,
    Dot,
    #[default]
    ExtraRounded,
}

/// Shape of the inner dot of each finder pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CornerDotStyle {
    Square,
    #[default]
    Dot,
}

/// Gradient geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub enum GradientType {
    #[default]
    Linear,
    Radial,
}

/// Where the logo comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub enum LogoMode {
    #[default]
    None,
    /// A local file embedded as a data URL. Cannot be shared through links.
    Upload,
    /// A remote URL reference.
    External,
}

/// Cross-origin policy passed to the engine when it loads the logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub enum CrossOrigin {
    #[default]
    Anonymous,
    UseCredentials,
    None,
}

// ============================================================================
// GradientConfig
// ============================================================================

/// Two-stop gradient applied to dots and finder patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub struct GradientConfig {
    pub enabled: bool,

    #[serde(rename = "type")]
    pub kind: GradientType,

    /// Rotation in degrees. Converted to radians by the compiler.
    pub rotation: f32,

    /// Color at offset 0.
    pub start: String,

    /// Color at offset 1.
    pub end: String,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: GradientType::Linear,
            rotation: 35.0,
            start: "#7b5cff".into(),
            end: "#00d8ff".into(),
        }
    }
}

// ============================================================================
// LogoConfig
// ============================================================================

/// Logo embedded at the center of the code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub struct LogoConfig {
    pub mode: LogoMode,

    /// The uploaded image as a data URL (upload mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data_url: Option<String>,

    /// The rounded-corner version of the current source, if processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_data_url: Option<String>,

    /// Remote image reference (external mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,

    pub cross_origin: CrossOrigin,

    /// Fraction of the code width covered by the logo (0.0-1.0).
    pub scale: f32,

    /// Corner radius as a percentage of the shorter image side (0-100).
    pub corner_radius: f32,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            mode: LogoMode::None,
            raw_data_url: None,
            processed_data_url: None,
            external_url: None,
            cross_origin: CrossOrigin::Anonymous,
            scale: 0.22,
            corner_radius: 18.0,
        }
    }
}

impl LogoConfig {
    /// Returns the unprocessed source for the current mode, if any.
    ///
    /// Empty strings count as absent.
    pub fn source(&self) -> Option<&str> {
        let source = match self.mode {
            LogoMode::None => None,
            LogoMode::Upload => self.raw_data_url.as_deref(),
            LogoMode::External => self.external_url.as_deref(),
        };
        source.filter(|s| !s.is_empty())
    }

    /// Returns true if the mode has a usable source.
    pub fn has_source(&self) -> bool {
        self.source().is_some()
    }
}

// ============================================================================
// QRSettings
// ============================================================================

/// The full styling configuration of a QR code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
#[cfg_attr(feature = "tsify", tsify(into_wasm_abi, from_wasm_abi))]
pub struct QRSettings {
    /// Payload to encode.
    pub text: String,

    /// Output width and height in pixels.
    pub size: u32,

    /// Quiet zone in pixels.
    pub margin: u32,

    pub ecc: ErrorCorrection,

    pub dot_style: DotStyle,

    pub corner_square_style: CornerSquareStyle,

    pub corner_dot_style: CornerDotStyle,

    pub foreground_color: String,

    pub background_color: String,

    pub gradient: GradientConfig,

    pub transparent_background: bool,

    /// Key of the last applied preset. Cleared by any hand edit.
    pub preset_key: Option<String>,

    pub logo: LogoConfig,
}

impl Default for QRSettings {
    fn default() -> Self {
        Self {
            text: "https://example.com".into(),
            size: 320,
            margin: 16,
            ecc: ErrorCorrection::M,
            dot_style: DotStyle::Rounded,
            corner_square_style: CornerSquareStyle::ExtraRounded,
            corner_dot_style: CornerDotStyle::Dot,
            foreground_color: "#1f5bff".into(),
            background_color: "#ffffff".into(),
            gradient: GradientConfig::default(),
            transparent_background: false,
            preset_key: Some("liquid-lavender".into()),
            logo: LogoConfig::default(),
        }
    }
}

impl QRSettings {
    /// Creates the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the payload.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Sets the error correction level.
    pub fn with_ecc(mut self, ecc: ErrorCorrection) -> Self {
        self.ecc = ecc;
        self
    }

    /// Sets the gradient configuration.
    pub fn with_gradient(mut self, gradient: GradientConfig) -> Self {
        self.gradient = gradient;
        self
    }

    /// Sets the logo configuration.
    pub fn with_logo(mut self, logo: LogoConfig) -> Self {
        self.logo = logo;
        self
    }

    /// The payload handed to the encoder. Empty text becomes a single space.
    pub fn encodable_text(&self) -> &str {
        if self.text.is_empty() { " " } else { &self.text }
    }

    /// Returns a copy with every numeric field pulled into its valid range.
    pub fn clamped(&self) -> Self {
        let mut next = self.clone();
        next.size = next.size.clamp(SIZE_RANGE.0, SIZE_RANGE.1);
        next.margin = next.margin.min(MAX_MARGIN).min(next.size / 4);
        next.gradient.rotation = next.gradient.rotation.rem_euclid(360.0);
        next.logo.scale = clamp_unit(next.logo.scale, 0.0, 1.0);
        next.logo.corner_radius = clamp_unit(next.logo.corner_radius, 0.0, 100.0);
        next
    }

    /// Serializes the settings to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the settings to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes settings, healing missing fields from the defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Clamps, mapping NaN to the lower bound.
fn clamp_unit(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() { min } else { value.clamp(min, max) }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_serialization_roundtrip() {
        let settings = QRSettings::new()
            .with_text("héllo wörld")
            .with_ecc(ErrorCorrection::Q)
            .with_logo(LogoConfig {
                mode: LogoMode::External,
                external_url: Some("https://example.com/logo.png".into()),
                ..LogoConfig::default()
            });

        let json = settings.to_json().unwrap();
        let restored = QRSettings::from_json(&json).unwrap();
        assert_eq!(restored, settings);
    }

    #[test]
    fn json_uses_camel_case_and_kebab_enums() {
        let json = QRSettings::default().to_json_pretty().unwrap();

        assert!(json.contains("\"foregroundColor\""));
        assert!(json.contains("\"transparentBackground\""));
        assert!(json.contains("\"presetKey\""));
        assert!(json.contains("\"cornerRadius\""));
        assert!(json.contains("\"extra-rounded\""));
        assert!(json.contains("\"type\": \"linear\""));
        assert!(!json.contains("rawDataUrl"));
    }

    #[test]
    fn empty_object_deserializes_to_defaults() {
        let settings = QRSettings::from_json("{}").unwrap();
        assert_eq!(settings, QRSettings::default());
    }

    #[test]
    fn partial_nested_objects_are_healed() {
        let json = r##"{ "gradient": { "enabled": false }, "logo": { "mode": "external" }, "unknown": 1 }"##;
        let settings = QRSettings::from_json(json).unwrap();

        assert!(!settings.gradient.enabled);
        assert_eq!(settings.gradient.start, "#7b5cff");
        assert_eq!(settings.logo.mode, LogoMode::External);
        assert_eq!(settings.logo.scale, 0.22);
    }

    #[test]
    fn null_preset_key_is_accepted() {
        let settings = QRSettings::from_json(r#"{ "presetKey": null }"#).unwrap();
        assert!(settings.preset_key.is_none());
    }

    #[test]
    fn empty_text_is_replaced_by_space() {
        let settings = QRSettings::new().with_text("");
        assert_eq!(settings.encodable_text(), " ");
        assert_eq!(QRSettings::new().encodable_text(), "https://example.com");
    }

    #[test]
    fn clamped_pulls_fields_into_range() {
        let mut settings = QRSettings::new();
        settings.size = 10;
        settings.margin = 500;
        settings.gradient.rotation = -90.0;
        settings.logo.scale = 3.0;
        settings.logo.corner_radius = f32::NAN;

        let clamped = settings.clamped();
        assert_eq!(clamped.size, 100);
        assert_eq!(clamped.margin, 25);
        assert_eq!(clamped.gradient.rotation, 270.0);
        assert_eq!(clamped.logo.scale, 1.0);
        assert_eq!(clamped.logo.corner_radius, 0.0);

        settings.size = 1000;
        assert_eq!(settings.clamped().margin, 64);
    }

    #[test]
    fn logo_source_follows_mode() {
        let mut logo = LogoConfig {
            raw_data_url: Some("data:image/png;base64,AAAA".into()),
            external_url: Some(String::new()),
            ..LogoConfig::default()
        };
        assert_eq!(logo.source(), None);

        logo.mode = LogoMode::Upload;
        assert_eq!(logo.source(), Some("data:image/png;base64,AAAA"));

        logo.mode = LogoMode::External;
        assert!(!logo.has_source(), "empty external URL is not a source");
    }
}
