//! Native engine rendering with tiny-skia.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use resvg::tiny_skia::{
    Color, FillRule, GradientStop, LinearGradient, Paint, PathBuilder, Pixmap, Point,
    RadialGradient, Shader, SpreadMode, Transform,
};
use tracing::{debug, warn};

use super::layout::{Geometry, Matrix, PathSink, Shape, layout};
use super::{RenderEngine, svg};
use crate::color::hex_to_rgb;
use crate::compiler::{Fill, RenderOptions};
use crate::error::RenderError;
use crate::export::ExportFormat;
use crate::logo::{self, encode_png_data_url, is_data_url, is_remote, pixmap_to_rgba_image};
use crate::settings::GradientType;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Renders [`RenderOptions`] to pixels or SVG without a browser.
///
/// The logo referenced by `image` is decoded when the options change, not on
/// every render. Logos that cannot be loaded locally (remote URLs, corrupt
/// data) are left out of raster output.
#[derive(Debug, Clone)]
pub struct RasterEngine {
    options: RenderOptions,
    logo: Option<RgbaImage>,
}

impl RasterEngine {
    /// Lays out the current options.
    pub fn geometry(&self) -> Result<Geometry, RenderError> {
        let matrix = Matrix::encode(&self.options)?;
        layout(&self.options, &matrix, self.logo.as_ref().map(RgbaImage::dimensions))
    }

    /// Renders the current options to straight-alpha pixels.
    pub fn render(&self) -> Result<RgbaImage, RenderError> {
        let geometry = self.geometry()?;
        let mut pixmap =
            Pixmap::new(geometry.width, geometry.height).ok_or(RenderError::TooSmall {
                size: geometry.width.min(geometry.height),
                margin: self.options.margin,
                modules: geometry.modules,
            })?;

        let background = &self.options.background_options;
        if !background.is_transparent() {
            pixmap.fill(skia_color(&background.color));
        }

        // Dots first, then finder rings and their centers on top.
        let options = &self.options;
        fill_shapes(&mut pixmap, &geometry, &geometry.dots, &options.dots_options.fill, FillRule::Winding);
        fill_shapes(
            &mut pixmap,
            &geometry,
            &geometry.corner_squares,
            &options.corners_square_options.fill,
            FillRule::EvenOdd,
        );
        fill_shapes(
            &mut pixmap,
            &geometry,
            &geometry.corner_dots,
            &options.corners_dot_options.fill,
            FillRule::Winding,
        );

        // The logo is composited last, over the modules.
        let mut img = pixmap_to_rgba_image(&pixmap);
        if let (Some(logo), Some(placement)) = (&self.logo, geometry.logo) {
            let scaled = imageops::resize(logo, placement.width, placement.height, FilterType::Lanczos3);
            composite_over(&mut img, &scaled, placement.x as i32, placement.y as i32);
        }

        debug!(
            width = geometry.width,
            modules = geometry.modules,
            module_px = geometry.module_px,
            dots = geometry.dots.len(),
            "rendered QR code"
        );
        Ok(img)
    }

    /// Writes the current options as an SVG document.
    pub fn render_svg(&self) -> Result<String, RenderError> {
        let source = self.options.image.as_deref();
        let href = match (source, &self.logo) {
            (Some(src), _) if is_data_url(src) || is_remote(src) => Some(src.to_string()),
            (Some(_), Some(loaded)) => encode_png_data_url(loaded).ok(),
            _ => None,
        };

        let matrix = Matrix::encode(&self.options)?;
        let logo_size = match (&self.logo, &href) {
            (Some(loaded), _) => Some(loaded.dimensions()),
            // Unloaded remote logos are placed as squares; the viewer keeps their aspect.
            (None, Some(_)) => Some((1, 1)),
            (None, None) => None,
        };
        let geometry = layout(&self.options, &matrix, logo_size)?;
        Ok(svg::write_svg(&self.options, &geometry, href.as_deref()))
    }

    fn load_logo(options: &RenderOptions) -> Option<RgbaImage> {
        let source = options.image.as_deref()?;
        match logo::load_logo_image(source) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("logo left out of native render: {e}");
                None
            }
        }
    }
}

impl RenderEngine for RasterEngine {
    fn from_options(options: &RenderOptions) -> Self {
        Self {
            logo: Self::load_logo(options),
            options: options.clone(),
        }
    }

    fn update(&mut self, options: &RenderOptions) {
        if options.image != self.options.image {
            self.logo = Self::load_logo(options);
        }
        self.options = options.clone();
    }

    fn options(&self) -> &RenderOptions {
        &self.options
    }

    fn raw_data(&self, format: ExportFormat) -> Result<Vec<u8>, RenderError> {
        if format == ExportFormat::Svg {
            return Ok(self.render_svg()?.into_bytes());
        }

        // Raster formats share one render; JPEG drops alpha.
        let img = self.render()?;
        let mut bytes = Vec::new();
        let mut cursor = Cursor::new(&mut bytes);
        match format {
            ExportFormat::Png => img.write_to(&mut cursor, ImageFormat::Png)?,
            ExportFormat::Webp => img.write_to(&mut cursor, ImageFormat::WebP)?,
            ExportFormat::Jpeg => DynamicImage::ImageRgba8(flatten(&img))
                .to_rgb8()
                .write_to(&mut cursor, ImageFormat::Jpeg)?,
            ExportFormat::Svg => {}
        }
        Ok(bytes)
    }
}

// ============================================================================
// Painting
// ============================================================================

impl PathSink for PathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        PathBuilder::move_to(self, x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        PathBuilder::line_to(self, x, y);
    }

    fn cubic_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        PathBuilder::cubic_to(self, x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        PathBuilder::close(self);
    }
}

fn fill_shapes(pixmap: &mut Pixmap, geometry: &Geometry, shapes: &[Shape], fill: &Fill, rule: FillRule) {
    let mut pb = PathBuilder::new();
    for shape in shapes {
        shape.trace(&mut pb);
    }
    let Some(path) = pb.finish() else {
        return;
    };

    let paint = Paint {
        shader: shader_for(fill, geometry),
        anti_alias: true,
        ..Paint::default()
    };
    pixmap.fill_path(&path, &paint, rule, Transform::identity(), None);
}

/// Gradients span the matrix, centered on the canvas.
fn shader_for(fill: &Fill, geometry: &Geometry) -> Shader<'static> {
    let gradient = match fill {
        Fill::Solid { color } => return Shader::SolidColor(skia_color(color)),
        Fill::Gradient { gradient } => gradient,
    };

    let stops: Vec<GradientStop> = gradient
        .color_stops
        .iter()
        .map(|stop| GradientStop::new(stop.offset, skia_color(&stop.color)))
        .collect();
    let fallback = gradient
        .color_stops
        .first()
        .map(|stop| skia_color(&stop.color))
        .unwrap_or(Color::BLACK);

    // Linear gradients run along `rotation` through the center.
    let (cx, cy) = geometry.center();
    let half = geometry.matrix_px() / 2.0;
    let shader = match gradient.kind {
        GradientType::Linear => {
            let (sin, cos) = gradient.rotation.sin_cos();
            LinearGradient::new(
                Point::from_xy(cx - half * cos, cy - half * sin),
                Point::from_xy(cx + half * cos, cy + half * sin),
                stops,
                SpreadMode::Pad,
                Transform::identity(),
            )
        }
        GradientType::Radial => RadialGradient::new(
            Point::from_xy(cx, cy),
            Point::from_xy(cx, cy),
            half,
            stops,
            SpreadMode::Pad,
            Transform::identity(),
        ),
    };
    shader.unwrap_or(Shader::SolidColor(fallback))
}

fn skia_color(hex: &str) -> Color {
    let rgb = hex_to_rgb(hex);
    Color::from_rgba8(rgb.red, rgb.green, rgb.blue, 255)
}

// ============================================================================
// Compositing
// ============================================================================

/// Draws `src` over `dest` with its top-left corner at (`x`, `y`).
///
/// Pixels falling outside `dest` are clipped.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32) {
    let (dest_w, dest_h) = (dest.width() as i64, dest.height() as i64);
    for (sx, sy, pixel) in src.enumerate_pixels() {
        let dx = x as i64 + sx as i64;
        let dy = y as i64 + sy as i64;
        if dx < 0 || dy < 0 || dx >= dest_w || dy >= dest_h {
            continue;
        }
        let target = dest.get_pixel_mut(dx as u32, dy as u32);
        *target = source_over(*pixel, *target);
    }
}

fn source_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |s: u8, d: u8| {
        let out = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        out.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

/// Composites onto opaque white, for formats without alpha.
fn flatten(img: &RgbaImage) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(img.width(), img.height(), WHITE);
    composite_over(&mut canvas, img, 0, 0);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileOverrides, compile};
    use crate::settings::{DotStyle, LogoConfig, LogoMode, QRSettings};

    fn solid_settings() -> QRSettings {
        let mut settings = QRSettings::default();
        settings.gradient.enabled = false;
        settings.foreground_color = "#000000".into();
        settings.background_color = "#ffffff".into();
        settings
    }

    fn engine(settings: &QRSettings, overrides: CompileOverrides) -> RasterEngine {
        RasterEngine::from_options(&compile(settings, overrides))
    }

    #[test]
    fn renders_requested_size_with_background() {
        let img = engine(&solid_settings(), CompileOverrides::default()).render().unwrap();
        assert_eq!(img.dimensions(), (320, 320));
        assert_eq!(img.get_pixel(1, 1).0, [255, 255, 255, 255]);
    }

    #[test]
    fn finder_corner_is_foreground() {
        let mut settings = solid_settings();
        settings.dot_style = DotStyle::Square;
        settings.corner_square_style = crate::settings::CornerSquareStyle::Square;
        let engine = engine(&settings, CompileOverrides::default());
        let geometry = engine.geometry().unwrap();
        let img = engine.render().unwrap();

        let (ox, oy) = geometry.origin;
        let half = geometry.module_px / 2;
        let corner = img.get_pixel(ox as u32 + half, oy as u32 + half);
        assert_eq!(corner.0, [0, 0, 0, 255]);

        // Second ring of the finder is light.
        let ring = img.get_pixel(ox as u32 + geometry.module_px + half, oy as u32 + geometry.module_px + half);
        assert_eq!(ring.0, [255, 255, 255, 255]);
    }

    #[test]
    fn transparent_background_leaves_alpha() {
        let img = engine(&solid_settings(), CompileOverrides::default().with_transparent(true))
            .render()
            .unwrap();
        assert_eq!(img.get_pixel(1, 1)[3], 0);
    }

    #[test]
    fn update_replaces_options() {
        let mut engine = engine(&solid_settings(), CompileOverrides::default());
        let bigger = compile(&solid_settings(), CompileOverrides::default().with_size(500));
        engine.update(&bigger);

        assert_eq!(engine.options().width, 500);
        assert_eq!(engine.render().unwrap().width(), 500);
    }

    #[test]
    fn encodes_every_format() {
        let engine = engine(&QRSettings::default(), CompileOverrides::default());

        let png = engine.raw_data(ExportFormat::Png).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);

        let jpeg = engine.raw_data(ExportFormat::Jpeg).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);

        let webp = engine.raw_data(ExportFormat::Webp).unwrap();
        assert_eq!(image::guess_format(&webp).unwrap(), ImageFormat::WebP);

        let svg = String::from_utf8(engine.raw_data(ExportFormat::Svg).unwrap()).unwrap();
        assert!(svg.starts_with("<svg"));
    }

    #[test]
    fn logo_is_drawn_at_center() {
        let logo = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let settings = solid_settings().with_logo(LogoConfig {
            mode: LogoMode::Upload,
            raw_data_url: Some(encode_png_data_url(&logo).unwrap()),
            scale: 0.3,
            ..LogoConfig::default()
        });
        let img = engine(&settings, CompileOverrides::default()).render().unwrap();
        assert_eq!(img.get_pixel(160, 160).0, [255, 0, 0, 255]);
    }

    #[test]
    fn unloadable_logo_is_skipped() {
        let settings = solid_settings().with_logo(LogoConfig {
            mode: LogoMode::External,
            external_url: Some("https://example.com/logo.png".into()),
            ..LogoConfig::default()
        });
        let engine = engine(&settings, CompileOverrides::default());
        assert!(engine.geometry().unwrap().logo.is_none());
        assert!(engine.render().is_ok());
    }

    #[test]
    fn oversized_payload_fails_to_encode() {
        let settings = solid_settings().with_text("x".repeat(5000));
        assert!(matches!(
            engine(&settings, CompileOverrides::default()).render(),
            Err(RenderError::Encode(_))
        ));
    }

    #[test]
    fn composite_blends_and_clips() {
        let mut dest = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let opaque = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        composite_over(&mut dest, &opaque, 8, 8);
        assert_eq!(dest.get_pixel(9, 9).0, [0, 0, 255, 255]);
        assert_eq!(dest.get_pixel(7, 7).0, [255, 0, 0, 255]);

        let translucent = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 128]));
        composite_over(&mut dest, &translucent, 0, 0);
        let mixed = dest.get_pixel(0, 0);
        assert!(mixed[0] > 0 && mixed[2] > 0);
        assert_eq!(mixed[3], 255);
    }

    #[test]
    fn flatten_removes_alpha() {
        let clear = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        assert_eq!(flatten(&clear).get_pixel(0, 0).0, [255, 255, 255, 255]);
    }
}
