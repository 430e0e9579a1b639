//! Hex color parsing and WCAG contrast helpers.

use std::str::FromStr;

use palette::{LinSrgb, Srgb};

/// Parses a `#rgb` or `#rrggbb` hex color. The leading `#` is optional.
pub fn parse_hex(hex: &str) -> Option<Srgb<u8>> {
    Srgb::<u8>::from_str(hex.trim()).ok()
}

/// Parses a hex color, falling back to black when it is malformed.
pub fn hex_to_rgb(hex: &str) -> Srgb<u8> {
    parse_hex(hex).unwrap_or_else(|| Srgb::<u8>::new(0, 0, 0))
}

/// WCAG relative luminance of a hex color (0.0 for black, 1.0 for white).
pub fn relative_luminance(hex: &str) -> f32 {
    let linear: LinSrgb = hex_to_rgb(hex).into_format::<f32>().into_linear();
    0.2126 * linear.red + 0.7152 * linear.green + 0.0722 * linear.blue
}

/// WCAG contrast ratio between two colors, always >= 1.0.
pub fn contrast_ratio(foreground: &str, background: &str) -> f32 {
    let fg = relative_luminance(foreground) + 0.05;
    let bg = relative_luminance(background) + 0.05;
    if fg > bg { fg / bg } else { bg / fg }
}

/// Coarse contrast rating used for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContrastLevel {
    Excellent,
    Good,
    Low,
}

impl ContrastLevel {
    /// A short human-readable description.
    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent contrast",
            Self::Good => "Good contrast",
            Self::Low => "Low contrast - consider adjusting colors",
        }
    }
}

/// A contrast ratio together with its rating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContrastReport {
    pub ratio: f32,
    pub level: ContrastLevel,
}

/// Rates the contrast between foreground and background.
///
/// ```
/// use qrgen::color::{describe_contrast, ContrastLevel};
///
/// let report = describe_contrast("#000000", "#ffffff");
/// assert_eq!(report.level, ContrastLevel::Excellent);
/// assert!((report.ratio - 21.0).abs() < 0.01);
/// ```
pub fn describe_contrast(foreground: &str, background: &str) -> ContrastReport {
    let ratio = contrast_ratio(foreground, background);
    let level = if ratio >= 4.5 {
        ContrastLevel::Excellent
    } else if ratio >= 3.0 {
        ContrastLevel::Good
    } else {
        ContrastLevel::Low
    };
    ContrastReport { ratio, level }
}
