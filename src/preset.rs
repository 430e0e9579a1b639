//! Named style presets.
//!
//! A preset overwrites the color, gradient and shape fields of the settings
//! and records its key in [`QRSettings::preset_key`]. Payload, geometry, ECC
//! and logo are left as they are.
//!
//! ```
//! use qrgen::preset::{apply_preset, find_preset};
//! use qrgen::QRSettings;
//!
//! let preset = find_preset("mono-glaze").unwrap();
//! let settings = apply_preset(&QRSettings::default().with_text("hi"), preset);
//!
//! assert_eq!(settings.preset_key.as_deref(), Some("mono-glaze"));
//! assert_eq!(settings.text, "hi");
//! assert!(!settings.gradient.enabled);
//! ```

use serde::Serialize;

use crate::settings::{
    CornerDotStyle, CornerSquareStyle, DotStyle, GradientConfig, GradientType, QRSettings,
};

/// Gradient part of a preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PresetGradient {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: GradientType,
    pub rotation: f32,
    pub start: &'static str,
    pub end: &'static str,
}

/// A named bundle of style fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub foreground_color: &'static str,
    pub background_color: &'static str,
    pub gradient: PresetGradient,
    pub dot_style: DotStyle,
    pub corner_square_style: CornerSquareStyle,
    pub corner_dot_style: CornerDotStyle,
    pub transparent_background: bool,
}

/// Built-in presets, in display order.
pub const PRESETS: &[Preset] = &[
    Preset {
        key: "liquid-lavender",
        name: "Liquid Lavender",
        description: "Signature violet-to-cyan gradient with frosted glass backdrop.",
        foreground_color: "#1f5bff",
        background_color: "#f7f8ff",
        gradient: PresetGradient {
            enabled: true,
            kind: GradientType::Linear,
            rotation: 35.0,
            start: "#7b5cff",
            end: "#00d8ff",
        },
        dot_style: DotStyle::Rounded,
        corner_square_style: CornerSquareStyle::ExtraRounded,
        corner_dot_style: CornerDotStyle::Dot,
        transparent_background: false,
    },
    Preset {
        key: "sunset-glass",
        name: "Sunset Glass",
        description: "Warm coral glow with soft midnight backdrop.",
        foreground_color: "#ff7b88",
        background_color: "#0a0f1f",
        gradient: PresetGradient {
            enabled: true,
            kind: GradientType::Radial,
            rotation: 90.0,
            start: "#ff7b88",
            end: "#ffc46b",
        },
        dot_style: DotStyle::Dots,
        corner_square_style: CornerSquareStyle::Square,
        corner_dot_style: CornerDotStyle::Square,
        transparent_background: false,
    },
    Preset {
        key: "mono-glaze",
        name: "Mono Glaze",
        description: "High-contrast monochrome for maximum readability.",
        foreground_color: "#0b1120",
        background_color: "#ffffff",
        gradient: PresetGradient {
            enabled: false,
            kind: GradientType::Linear,
            rotation: 0.0,
            start: "#0b1120",
            end: "#0b1120",
        },
        dot_style: DotStyle::Square,
        corner_square_style: CornerSquareStyle::Square,
        corner_dot_style: CornerDotStyle::Square,
        transparent_background: false,
    },
    Preset {
        key: "midnight-glow",
        name: "Midnight Glow",
        description: "Electric teal with subtle vignette for dark mode.",
        foreground_color: "#1ef2d3",
        background_color: "#020617",
        gradient: PresetGradient {
            enabled: true,
            kind: GradientType::Linear,
            rotation: 120.0,
            start: "#1ef2d3",
            end: "#338bff",
        },
        dot_style: DotStyle::Rounded,
        corner_square_style: CornerSquareStyle::Square,
        corner_dot_style: CornerDotStyle::Dot,
        transparent_background: false,
    },
];

/// Looks up a preset by key.
pub fn find_preset(key: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|preset| preset.key == key)
}

/// Returns a copy of `base` with the preset's style fields applied.
pub fn apply_preset(base: &QRSettings, preset: &Preset) -> QRSettings {
    QRSettings {
        foreground_color: preset.foreground_color.into(),
        background_color: preset.background_color.into(),
        gradient: GradientConfig {
            enabled: preset.gradient.enabled,
            kind: preset.gradient.kind,
            rotation: preset.gradient.rotation,
            start: preset.gradient.start.into(),
            end: preset.gradient.end.into(),
        },
        dot_style: preset.dot_style,
        corner_square_style: preset.corner_square_style,
        corner_dot_style: preset.corner_dot_style,
        transparent_background: preset.transparent_background,
        preset_key: Some(preset.key.into()),
        ..base.clone()
    }
}

/// Returns the preset whose style fields `settings` matches exactly, if any.
pub fn matching_preset(settings: &QRSettings) -> Option<&'static Preset> {
    PRESETS.iter().find(|preset| {
        let applied = apply_preset(settings, preset);
        QRSettings {
            preset_key: settings.preset_key.clone(),
            ..applied
        } == *settings
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{ErrorCorrection, LogoConfig, LogoMode};

    #[test]
    fn keys_are_unique() {
        for (i, a) in PRESETS.iter().enumerate() {
            assert!(PRESETS[i + 1..].iter().all(|b| b.key != a.key), "duplicate {}", a.key);
        }
    }

    #[test]
    fn apply_keeps_payload_geometry_and_logo() {
        let base = QRSettings {
            text: "payload".into(),
            size: 640,
            ecc: ErrorCorrection::H,
            logo: LogoConfig {
                mode: LogoMode::External,
                external_url: Some("https://example.com/a.png".into()),
                ..LogoConfig::default()
            },
            ..QRSettings::default()
        };

        let preset = find_preset("sunset-glass").unwrap();
        let applied = apply_preset(&base, preset);

        assert_eq!(applied.text, "payload");
        assert_eq!(applied.size, 640);
        assert_eq!(applied.ecc, ErrorCorrection::H);
        assert_eq!(applied.logo, base.logo);
        assert_eq!(applied.background_color, "#0a0f1f");
        assert_eq!(applied.gradient.kind, GradientType::Radial);
        assert_eq!(applied.dot_style, DotStyle::Dots);
        assert_eq!(applied.preset_key.as_deref(), Some("sunset-glass"));
    }

    #[test]
    fn matching_preset_detects_exact_application() {
        let applied = apply_preset(&QRSettings::default(), find_preset("midnight-glow").unwrap());
        assert_eq!(matching_preset(&applied).map(|p| p.key), Some("midnight-glow"));

        let mut edited = applied;
        edited.foreground_color = "#000000".into();
        assert!(matching_preset(&edited).is_none());
    }

    #[test]
    fn dot_eyes_keep_a_square_frame() {
        let preset = find_preset("midnight-glow").unwrap();
        assert_eq!(preset.corner_square_style, CornerSquareStyle::Square);
        assert_eq!(preset.corner_dot_style, CornerDotStyle::Dot);
    }

    #[test]
    fn unknown_key_is_none() {
        assert!(find_preset("neon").is_none());
    }
}
