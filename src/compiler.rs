//! Compiles [`QRSettings`] into declarative render options.
//!
//! [`RenderOptions`] mirrors the option object of the browser styling engine
//! (`qr-code-styling`) field for field, so its JSON form can be handed to the
//! engine as-is. The native [`RasterEngine`](crate::RasterEngine) consumes the
//! same structure.
//!
//! # Example
//!
//! ```
//! use qrgen::{compile, CompileOverrides, Fill, QRSettings};
//!
//! let mut settings = QRSettings::default();
//! settings.gradient.enabled = false;
//! settings.foreground_color = "#000000".into();
//!
//! let options = compile(&settings, CompileOverrides::default());
//! assert_eq!(options.dots_options.fill, Fill::solid("#000000"));
//!
//! let json = serde_json::to_value(&options).unwrap();
//! assert_eq!(json["dotsOptions"]["color"], "#000000");
//! assert!(json["dotsOptions"].get("gradient").is_none());
//! ```

use serde::{Deserialize, Serialize};

use crate::settings::{
    CornerDotStyle, CornerSquareStyle, CrossOrigin, DotStyle, ErrorCorrection, GradientConfig,
    GradientType, LogoConfig, LogoMode, QRSettings,
};

/// Logo scale above which the logo is considered risky without ECC `H`.
pub const RISKY_LOGO_SCALE: f32 = 0.26;

// ============================================================================
// Fill
// ============================================================================

/// One stop of a gradient descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub struct ColorStop {
    pub offset: f32,
    pub color: String,
}

/// Gradient descriptor in the engine's format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub struct GradientDescriptor {
    #[serde(rename = "type")]
    pub kind: GradientType,

    /// Rotation in radians.
    pub rotation: f32,

    pub color_stops: Vec<ColorStop>,
}

impl From<&GradientConfig> for GradientDescriptor {
    fn from(gradient: &GradientConfig) -> Self {
        Self {
            kind: gradient.kind,
            rotation: gradient.rotation.to_radians(),
            color_stops: vec![
                ColorStop {
                    offset: 0.0,
                    color: gradient.start.clone(),
                },
                ColorStop {
                    offset: 1.0,
                    color: gradient.end.clone(),
                },
            ],
        }
    }
}

/// Paint for dots and finder patterns: a flat color or a gradient, never both.
///
/// Serializes flattened into its parent, producing either a `color` key or a
/// `gradient` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub enum Fill {
    Gradient { gradient: GradientDescriptor },
    Solid { color: String },
}

impl Fill {
    /// Creates a flat fill.
    pub fn solid(color: impl Into<String>) -> Self {
        Self::Solid {
            color: color.into(),
        }
    }

    /// Resolves the fill for the given settings.
    pub fn resolve(gradient: &GradientConfig, foreground: &str) -> Self {
        if gradient.enabled {
            Self::Gradient {
                gradient: gradient.into(),
            }
        } else {
            Self::solid(foreground)
        }
    }

    /// Returns the gradient descriptor, if this is a gradient fill.
    pub fn gradient(&self) -> Option<&GradientDescriptor> {
        match self {
            Self::Gradient { gradient } => Some(gradient),
            Self::Solid { .. } => None,
        }
    }

    /// Returns the flat color, if this is a solid fill.
    pub fn color(&self) -> Option<&str> {
        match self {
            Self::Solid { color } => Some(color),
            Self::Gradient { .. } => None,
        }
    }
}

// ============================================================================
// Element Options
// ============================================================================

/// Options for the data modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub struct DotsOptions {
    #[serde(rename = "type")]
    pub style: DotStyle,
    #[serde(flatten)]
    pub fill: Fill,
}

/// Options for the outer ring of the finder patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub struct CornersSquareOptions {
    #[serde(rename = "type")]
    pub style: CornerSquareStyle,
    #[serde(flatten)]
    pub fill: Fill,
}

/// Options for the inner dot of the finder patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub struct CornersDotOptions {
    #[serde(rename = "type")]
    pub style: CornerDotStyle,
    #[serde(flatten)]
    pub fill: Fill,
}

/// The token the engine interprets as "no background".
pub const TRANSPARENT: &str = "transparent";

/// Background paint. `color` is either a hex color or [`TRANSPARENT`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub struct BackgroundOptions {
    pub color: String,
}

impl BackgroundOptions {
    /// Returns true if the background is the transparent sentinel.
    pub fn is_transparent(&self) -> bool {
        self.color == TRANSPARENT
    }
}

/// Logo placement options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub struct ImageOptions {
    /// Whether modules beneath the logo are left out.
    pub hide_background_dots: bool,

    /// Logo size as a fraction of the code width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_origin: Option<CrossOrigin>,
}

/// Encoder options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub struct QrOptions {
    pub error_correction_level: ErrorCorrection,
}

/// Output kind requested from the browser engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub enum DrawType {
    #[default]
    Svg,
}

// ============================================================================
// RenderOptions
// ============================================================================

/// Complete, declarative render options for one QR code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
#[cfg_attr(feature = "tsify", tsify(into_wasm_abi, from_wasm_abi))]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    #[serde(rename = "type")]
    pub draw_type: DrawType,
    pub data: String,
    pub margin: u32,
    pub qr_options: QrOptions,
    pub dots_options: DotsOptions,
    pub corners_square_options: CornersSquareOptions,
    pub corners_dot_options: CornersDotOptions,
    pub background_options: BackgroundOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub image_options: ImageOptions,
}

// ============================================================================
// LogoPolicy
// ============================================================================

/// Logo sizing rules.
///
/// The logo scale is clamped into `min_scale..=max_scale`. Modules beneath
/// the logo are hidden once the clamped scale reaches `hide_dots_threshold`;
/// the decision is a step function, so it never hides dots for a smaller
/// logo while showing them for a larger one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct LogoPolicy {
    pub min_scale: f32,
    pub max_scale: f32,
    pub hide_dots_threshold: f32,
}

impl Default for LogoPolicy {
    fn default() -> Self {
        Self {
            min_scale: 0.05,
            max_scale: 0.5,
            hide_dots_threshold: 0.3,
        }
    }
}

impl LogoPolicy {
    /// Clamps a logo scale into the safe range.
    pub fn clamp_scale(&self, scale: f32) -> f32 {
        if scale.is_nan() {
            return self.min_scale;
        }
        scale.clamp(self.min_scale, self.max_scale.max(self.min_scale))
    }

    /// Whether modules beneath a logo of the given scale are hidden.
    pub fn hides_dots(&self, scale: f32) -> bool {
        self.clamp_scale(scale) >= self.hide_dots_threshold
    }
}

// ============================================================================
// OptionsCompiler
// ============================================================================

/// Export-time overrides applied on top of the settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileOverrides {
    /// Output size replacing `settings.size`.
    pub size: Option<u32>,
    /// Transparency replacing `settings.transparent_background`.
    pub transparent: Option<bool>,
}

impl CompileOverrides {
    /// Renders at `size` pixels instead of `settings.size`.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Forces the background transparent or opaque.
    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = Some(transparent);
        self
    }
}

/// Turns settings into render options under a given [`LogoPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionsCompiler {
    pub policy: LogoPolicy,
}

impl OptionsCompiler {
    /// Creates a compiler applying `policy` to logos.
    pub fn new(policy: LogoPolicy) -> Self {
        Self { policy }
    }

    /// Compiles the settings. Pure: never touches `settings` or does I/O.
    pub fn compile(&self, settings: &QRSettings, overrides: CompileOverrides) -> RenderOptions {
        let size = overrides.size.unwrap_or(settings.size);
        let transparent = overrides
            .transparent
            .unwrap_or(settings.transparent_background);

        let fill = Fill::resolve(&settings.gradient, &settings.foreground_color);

        let background_options = BackgroundOptions {
            color: if transparent {
                TRANSPARENT.to_string()
            } else {
                settings.background_color.clone()
            },
        };

        let image = resolve_image(&settings.logo).map(str::to_string);
        let image_options = self.image_options(&settings.logo, image.is_some());

        tracing::trace!(size, transparent, has_image = image.is_some(), "compiled render options");

        RenderOptions {
            width: size,
            height: size,
            draw_type: DrawType::Svg,
            data: settings.encodable_text().to_string(),
            margin: settings.margin,
            qr_options: QrOptions {
                error_correction_level: settings.ecc,
            },
            dots_options: DotsOptions {
                style: settings.dot_style,
                fill: fill.clone(),
            },
            corners_square_options: CornersSquareOptions {
                style: settings.corner_square_style,
                fill: fill.clone(),
            },
            corners_dot_options: CornersDotOptions {
                style: settings.corner_dot_style,
                fill,
            },
            background_options,
            image,
            image_options,
        }
    }

    fn image_options(&self, logo: &LogoConfig, has_image: bool) -> ImageOptions {
        if !has_image {
            return ImageOptions {
                hide_background_dots: false,
                image_size: None,
                margin: None,
                cross_origin: None,
            };
        }

        ImageOptions {
            hide_background_dots: self.policy.hides_dots(logo.scale),
            image_size: Some(self.policy.clamp_scale(logo.scale)),
            margin: Some(0),
            cross_origin: match logo.cross_origin {
                CrossOrigin::None => None,
                other => Some(other),
            },
        }
    }
}

/// Compiles settings with the default [`LogoPolicy`].
pub fn compile(settings: &QRSettings, overrides: CompileOverrides) -> RenderOptions {
    OptionsCompiler::default().compile(settings, overrides)
}

/// Picks the image the engine should draw: the processed version when
/// available, else the raw source of the current mode.
pub fn resolve_image(logo: &LogoConfig) -> Option<&str> {
    let processed = logo.processed_data_url.as_deref().filter(|s| !s.is_empty());
    match logo.mode {
        LogoMode::None => None,
        LogoMode::Upload | LogoMode::External => processed.or_else(|| logo.source()),
    }
}

/// Returns true if the settings would draw a logo.
pub fn supports_logo(settings: &QRSettings) -> bool {
    resolve_image(&settings.logo).is_some()
}

/// Returns true if the logo is large enough to threaten scannability
/// without the highest error correction level.
pub fn is_logo_coverage_risky(settings: &QRSettings) -> bool {
    supports_logo(settings)
        && settings.logo.scale > RISKY_LOGO_SCALE
        && settings.ecc != ErrorCorrection::H
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_settings() -> QRSettings {
        let mut settings = QRSettings::default();
        settings.foreground_color = "#000000".into();
        settings.background_color = "#FFFFFF".into();
        settings.gradient.enabled = false;
        settings
    }

    fn with_upload_logo(scale: f32) -> QRSettings {
        let mut settings = QRSettings::default();
        settings.logo.mode = LogoMode::Upload;
        settings.logo.raw_data_url = Some("data:image/png;base64,AAAA".into());
        settings.logo.scale = scale;
        settings
    }

    #[test]
    fn solid_fill_has_color_and_no_gradient() {
        let options = compile(&solid_settings(), CompileOverrides::default());
        let json = serde_json::to_value(&options).unwrap();

        for key in ["dotsOptions", "cornersSquareOptions", "cornersDotOptions"] {
            assert_eq!(json[key]["color"], "#000000", "{key}");
            assert!(json[key].get("gradient").is_none(), "{key}");
        }
    }

    #[test]
    fn gradient_fill_has_gradient_and_no_color() {
        let mut settings = QRSettings::default();
        settings.gradient.rotation = 180.0;
        settings.gradient.kind = GradientType::Radial;

        let options = compile(&settings, CompileOverrides::default());
        let json = serde_json::to_value(&options).unwrap();

        for key in ["dotsOptions", "cornersSquareOptions", "cornersDotOptions"] {
            assert!(json[key].get("color").is_none(), "{key}");
            assert_eq!(json[key]["gradient"]["type"], "radial", "{key}");
            assert_eq!(json[key]["gradient"]["colorStops"][0]["offset"], 0.0);
            assert_eq!(json[key]["gradient"]["colorStops"][1]["color"], "#00d8ff");
        }

        let gradient = options.dots_options.fill.gradient().unwrap();
        assert!((gradient.rotation - std::f32::consts::PI).abs() < 1e-5);
        assert_eq!(options.corners_dot_options.fill, options.dots_options.fill);
    }

    #[test]
    fn transparent_override_wins_over_background_color() {
        let options = compile(
            &solid_settings(),
            CompileOverrides::default().with_transparent(true),
        );
        assert!(options.background_options.is_transparent());

        let opaque = compile(&solid_settings(), CompileOverrides::default());
        assert_eq!(opaque.background_options.color, "#FFFFFF");
    }

    #[test]
    fn size_override_sets_both_dimensions() {
        let options = compile(&solid_settings(), CompileOverrides::default().with_size(1024));
        assert_eq!((options.width, options.height), (1024, 1024));

        let default = compile(&solid_settings(), CompileOverrides::default());
        assert_eq!(default.width, 320);
    }

    #[test]
    fn empty_text_becomes_space() {
        let settings = QRSettings::default().with_text("");
        assert_eq!(compile(&settings, CompileOverrides::default()).data, " ");
    }

    #[test]
    fn no_logo_omits_image() {
        let options = compile(&QRSettings::default(), CompileOverrides::default());
        let json = serde_json::to_value(&options).unwrap();

        assert!(json.get("image").is_none());
        assert_eq!(json["imageOptions"], serde_json::json!({ "hideBackgroundDots": false }));
    }

    #[test]
    fn processed_logo_preferred_over_raw() {
        let mut settings = with_upload_logo(0.2);
        assert_eq!(resolve_image(&settings.logo), Some("data:image/png;base64,AAAA"));

        settings.logo.processed_data_url = Some("data:image/png;base64,BBBB".into());
        assert_eq!(resolve_image(&settings.logo), Some("data:image/png;base64,BBBB"));

        settings.logo.mode = LogoMode::None;
        assert_eq!(resolve_image(&settings.logo), None);
    }

    #[test]
    fn external_logo_uses_url() {
        let mut settings = QRSettings::default();
        settings.logo.mode = LogoMode::External;
        settings.logo.external_url = Some("https://example.com/logo.png".into());
        settings.logo.cross_origin = CrossOrigin::None;

        let options = compile(&settings, CompileOverrides::default());
        assert_eq!(options.image.as_deref(), Some("https://example.com/logo.png"));
        assert_eq!(options.image_options.cross_origin, None);
        assert_eq!(options.image_options.margin, Some(0));
    }

    #[test]
    fn logo_scale_is_clamped() {
        let small = compile(&with_upload_logo(0.0), CompileOverrides::default());
        assert_eq!(small.image_options.image_size, Some(0.05));

        let large = compile(&with_upload_logo(0.9), CompileOverrides::default());
        assert_eq!(large.image_options.image_size, Some(0.5));
    }

    #[test]
    fn hide_dots_is_monotonic_in_scale() {
        let policy = LogoPolicy::default();
        let scales: Vec<f32> = (0..=100).map(|i| i as f32 / 100.0).collect();

        for pair in scales.windows(2) {
            let (smaller, larger) = (pair[0], pair[1]);
            assert!(
                !policy.hides_dots(smaller) || policy.hides_dots(larger),
                "hides at {smaller} but not at {larger}"
            );
        }
        assert!(!policy.hides_dots(0.1));
        assert!(policy.hides_dots(0.45));
    }

    #[test]
    fn risky_logo_detection() {
        assert!(!is_logo_coverage_risky(&with_upload_logo(0.2)));
        assert!(is_logo_coverage_risky(&with_upload_logo(0.3)));
        assert!(!is_logo_coverage_risky(
            &with_upload_logo(0.3).with_ecc(ErrorCorrection::H)
        ));
        assert!(!is_logo_coverage_risky(&QRSettings::default()));
    }

    #[test]
    fn compile_does_not_mutate_settings() {
        let settings = with_upload_logo(0.4);
        let before = settings.clone();
        let _ = compile(&settings, CompileOverrides::default().with_size(64));
        assert_eq!(settings, before);
    }

    #[test]
    fn render_options_json_roundtrip() {
        let options = compile(&with_upload_logo(0.35), CompileOverrides::default());
        let json = serde_json::to_string(&options).unwrap();
        let restored: RenderOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, options);
    }
}
