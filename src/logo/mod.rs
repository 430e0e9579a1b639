//! Logo loading and corner rounding.
//!
//! Logo personalization is best-effort: [`with_rounded_corners`] never fails,
//! it falls back to the unprocessed source so QR generation is never blocked
//! by a logo that cannot be loaded.
//!
//! # Sources
//!
//! - `data:` URLs, base64 or percent-encoded, raster or SVG
//! - local file paths (optionally `file://`)
//! - `http(s)` URLs are recognized but not fetched; they fail with
//!   [`LogoError::RemoteSource`] and take the fallback path
//!
//! # Example
//!
//! ```
//! use qrgen::logo::{round_corners, to_data_url};
//! use image::{ImageFormat, Rgba, RgbaImage};
//! use std::io::Cursor;
//!
//! let img = RgbaImage::from_pixel(20, 20, Rgba([0, 128, 255, 255]));
//! let mut png = Vec::new();
//! img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();
//!
//! let rounded = round_corners(&to_data_url("image/png", &png), 50.0).unwrap();
//! assert!(rounded.starts_with("data:image/png;base64,"));
//! ```

mod data_url;
mod svg;

pub use data_url::{DataUrl, is_data_url, to_data_url};
pub use svg::{looks_like_svg, render_svg, render_svg_natural};
pub(crate) use svg::pixmap_to_rgba_image;

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbaImage};
use resvg::tiny_skia::{FillRule, Mask, Path as SkPath, PathBuilder, Transform};
use tracing::{debug, warn};

use crate::error::LogoError;

/// Default upload size cap (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Edge length of emoji logos, in pixels.
pub const EMOJI_LOGO_SIZE: u32 = 100;

// ============================================================================
// Loading
// ============================================================================

/// Returns true if `source` is an `http(s)` URL.
pub fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().get(..8).unwrap_or("").to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Loads a logo from a data URL or local path into RGBA pixels.
pub fn load_logo_image(source: &str) -> Result<RgbaImage, LogoError> {
    let source = source.trim();
    let img = if is_data_url(source) {
        let data = DataUrl::parse(source)?;
        decode_image_bytes(&data.bytes, data.is_svg())?
    } else if is_remote(source) {
        return Err(LogoError::RemoteSource(source.to_string()));
    } else {
        let path = source.strip_prefix("file://").unwrap_or(source);
        let bytes = std::fs::read(path)?;
        decode_image_bytes(&bytes, false)?
    };

    if img.width() == 0 || img.height() == 0 {
        return Err(LogoError::Empty);
    }
    Ok(img)
}

fn decode_image_bytes(bytes: &[u8], declared_svg: bool) -> Result<RgbaImage, LogoError> {
    if declared_svg || looks_like_svg(bytes) {
        return render_svg_natural(bytes)
            .ok_or_else(|| LogoError::Unsupported("SVG could not be rendered".into()));
    }
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Reads an uploaded logo file into a data URL.
///
/// The file must be a recognizable raster image or SVG no larger than
/// `max_bytes`.
pub fn read_logo_file(path: &Path, max_bytes: u64) -> Result<String, LogoError> {
    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(LogoError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let bytes = std::fs::read(path)?;
    let mime = if looks_like_svg(&bytes) {
        "image/svg+xml"
    } else {
        image::guess_format(&bytes)
            .map_err(|_| LogoError::Unsupported(format!("{} is not an image", path.display())))?
            .to_mime_type()
    };

    debug!(path = %path.display(), size, mime, "read logo file");
    Ok(to_data_url(mime, &bytes))
}

/// Encodes pixels as a PNG data URL.
pub fn encode_png_data_url(img: &RgbaImage) -> Result<String, LogoError> {
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(to_data_url("image/png", &png))
}

// ============================================================================
// Corner Rounding
// ============================================================================

/// Corner radius in pixels for an image, given a percentage of its shorter side.
pub fn corner_radius_px(width: u32, height: u32, radius_percent: f32) -> f32 {
    let percent = if radius_percent.is_nan() {
        0.0
    } else {
        radius_percent.clamp(0.0, 100.0)
    };
    width.min(height) as f32 * percent / 100.0
}

/// Clips an image to a rounded rectangle.
///
/// A radius of zero returns an unchanged copy.
pub fn round_image(img: &RgbaImage, radius_percent: f32) -> Result<RgbaImage, LogoError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(LogoError::Empty);
    }

    let radius = corner_radius_px(width, height, radius_percent);
    if radius <= 0.0 {
        return Ok(img.clone());
    }

    let path = rounded_rect_path(width as f32, height as f32, radius).ok_or(LogoError::Empty)?;
    let mut mask = Mask::new(width, height).ok_or(LogoError::Empty)?;
    mask.fill_path(&path, FillRule::Winding, true, Transform::identity());

    let mut out = img.clone();
    for (pixel, &coverage) in out.pixels_mut().zip(mask.data()) {
        pixel[3] = ((pixel[3] as u16 * coverage as u16 + 127) / 255) as u8;
    }
    Ok(out)
}

/// Rounded rectangle with quadratic corners, radius capped at half of each side.
fn rounded_rect_path(width: f32, height: f32, radius: f32) -> Option<SkPath> {
    let r = radius.min(width / 2.0).min(height / 2.0);
    let mut pb = PathBuilder::new();
    pb.move_to(r, 0.0);
    pb.line_to(width - r, 0.0);
    pb.quad_to(width, 0.0, width, r);
    pb.line_to(width, height - r);
    pb.quad_to(width, height, width - r, height);
    pb.line_to(r, height);
    pb.quad_to(0.0, height, 0.0, height - r);
    pb.line_to(0.0, r);
    pb.quad_to(0.0, 0.0, r, 0.0);
    pb.close();
    pb.finish()
}

/// Loads `source`, rounds its corners and returns a PNG data URL.
pub fn round_corners(source: &str, radius_percent: f32) -> Result<String, LogoError> {
    let img = load_logo_image(source)?;
    let rounded = round_image(&img, radius_percent)?;
    encode_png_data_url(&rounded)
}

/// Best-effort [`round_corners`].
///
/// Returns `None` without a source. On failure, logs and returns the
/// original source unchanged.
pub fn with_rounded_corners(source: Option<&str>, radius_percent: f32) -> Option<String> {
    let source = source.filter(|s| !s.is_empty())?;
    match round_corners(source, radius_percent) {
        Ok(processed) => Some(processed),
        Err(e) => {
            warn!("unable to apply rounded corners: {e}");
            Some(source.to_string())
        }
    }
}

/// Runs [`with_rounded_corners`] on the blocking pool.
#[cfg(feature = "runtime")]
pub async fn process_logo(source: String, radius_percent: f32) -> Option<String> {
    let fallback = source.clone();
    match tokio::task::spawn_blocking(move || with_rounded_corners(Some(&source), radius_percent))
        .await
    {
        Ok(processed) => processed,
        Err(e) => {
            warn!("logo processing task failed: {e}");
            Some(fallback).filter(|s| !s.is_empty())
        }
    }
}

/// Renders an emoji as a square PNG logo.
///
/// Returns `None` if the emoji is not in the Twemoji set.
#[cfg(feature = "twemoji")]
pub fn emoji_logo(emoji: &str) -> Option<String> {
    use twemoji_assets::svg::SvgTwemojiAsset;

    let asset = SvgTwemojiAsset::from_emoji(emoji)?;
    let img = render_svg(asset.as_ref(), EMOJI_LOGO_SIZE)?;
    encode_png_data_url(&img).ok()
}

// ============================================================================
// Tests
// ============================================================================
