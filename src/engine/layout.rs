//! Resolution-independent layout of a styled QR code.

use qrcode::{Color, QrCode};

use crate::compiler::RenderOptions;
use crate::error::RenderError;
use crate::settings::{CornerDotStyle, CornerSquareStyle, DotStyle};

/// Edge length of a finder pattern, in modules.
const FINDER: u32 = 7;

// ============================================================================
// Matrix
// ============================================================================

/// The module matrix of an encoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    width: u32,
    dark: Vec<bool>,
}

impl Matrix {
    /// Encodes `data` at the options' error correction level.
    pub fn encode(options: &RenderOptions) -> Result<Self, RenderError> {
        let code = QrCode::with_error_correction_level(
            options.data.as_bytes(),
            options.qr_options.error_correction_level.into(),
        )?;
        Ok(Self::from_code(&code))
    }

    pub fn from_code(code: &QrCode) -> Self {
        let dark = code.to_colors().into_iter().map(|c| c == Color::Dark).collect();
        Self {
            width: code.width() as u32,
            dark,
        }
    }

    /// Modules per side.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns false outside the matrix.
    pub fn is_dark(&self, x: i64, y: i64) -> bool {
        let w = self.width as i64;
        if x < 0 || y < 0 || x >= w || y >= w {
            return false;
        }
        self.dark[(y * w + x) as usize]
    }

    /// Returns true if the module belongs to one of the three finder patterns.
    pub fn is_finder(&self, x: u32, y: u32) -> bool {
        let far = self.width.saturating_sub(FINDER);
        (x < FINDER && y < FINDER) || (x >= far && y < FINDER) || (x < FINDER && y >= far)
    }
}

// ============================================================================
// Shapes
// ============================================================================

/// A filled primitive in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Rectangle with per-corner radii: top-left, top-right, bottom-right, bottom-left.
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        radii: [f32; 4],
    },
    Circle { cx: f32, cy: f32, r: f32 },
}

/// Receives path segments from [`Shape::trace`].
pub trait PathSink {
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    fn cubic_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32);
    fn close(&mut self);
}

/// Control point distance for a quarter circle drawn as a cubic.
const KAPPA: f32 = 0.552_284_8;

impl Shape {
    /// Emits the outline as one closed subpath.
    pub fn trace(&self, sink: &mut impl PathSink) {
        match *self {
            Shape::Rect { x, y, w, h, radii } => {
                // Clockwise from the top edge, one arc per rounded corner.
                let cap = w.min(h) / 2.0;
                let [tl, tr, br, bl] = radii.map(|r| r.clamp(0.0, cap));
                let k = |r: f32| r * (1.0 - KAPPA);
                let (right, bottom) = (x + w, y + h);

                sink.move_to(x + tl, y);
                sink.line_to(right - tr, y);
                if tr > 0.0 {
                    sink.cubic_to(right - k(tr), y, right, y + k(tr), right, y + tr);
                }
                sink.line_to(right, bottom - br);
                if br > 0.0 {
                    sink.cubic_to(right, bottom - k(br), right - k(br), bottom, right - br, bottom);
                }
                sink.line_to(x + bl, bottom);
                if bl > 0.0 {
                    sink.cubic_to(x + k(bl), bottom, x, bottom - k(bl), x, bottom - bl);
                }
                sink.line_to(x, y + tl);
                if tl > 0.0 {
                    sink.cubic_to(x, y + k(tl), x + k(tl), y, x + tl, y);
                }
                sink.close();
            }
            Shape::Circle { cx, cy, r } => {
                let c = r * KAPPA;
                sink.move_to(cx + r, cy);
                sink.cubic_to(cx + r, cy + c, cx + c, cy + r, cx, cy + r);
                sink.cubic_to(cx - c, cy + r, cx - r, cy + c, cx - r, cy);
                sink.cubic_to(cx - r, cy - c, cx - c, cy - r, cx, cy - r);
                sink.cubic_to(cx + c, cy - r, cx + r, cy - c, cx + r, cy);
                sink.close();
            }
        }
    }

    fn rect(x: f32, y: f32, size: f32, radius: f32) -> Self {
        Self::Rect {
            x,
            y,
            w: size,
            h: size,
            radii: [radius; 4],
        }
    }

    fn circle(x: f32, y: f32, size: f32) -> Self {
        Self::Circle {
            cx: x + size / 2.0,
            cy: y + size / 2.0,
            r: size / 2.0,
        }
    }
}

/// Where the logo is placed, in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl LogoBox {
    fn overlaps(&self, x: f32, y: f32, size: f32) -> bool {
        let (lx, ly) = (self.x as f32, self.y as f32);
        x < lx + self.width as f32 && x + size > lx && y < ly + self.height as f32 && y + size > ly
    }
}

/// Everything needed to draw one code.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    /// Modules per side.
    pub modules: u32,
    /// Edge length of one module in pixels.
    pub module_px: u32,
    /// Top-left corner of the matrix.
    pub origin: (f32, f32),
    pub dots: Vec<Shape>,
    /// Finder rings, drawn with the even-odd rule.
    pub corner_squares: Vec<Shape>,
    pub corner_dots: Vec<Shape>,
    pub logo: Option<LogoBox>,
}

impl Geometry {
    /// Edge length of the matrix in pixels.
    pub fn matrix_px(&self) -> f32 {
        (self.modules * self.module_px) as f32
    }

    /// Center of the canvas.
    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }
}

// ============================================================================
// Layout
// ============================================================================

/// Lays out the code described by `options`.
///
/// `logo_size` is the natural size of the logo, if one will be drawn. The
/// module size is the largest whole pixel count that fits inside the margin.
pub fn layout(
    options: &RenderOptions,
    matrix: &Matrix,
    logo_size: Option<(u32, u32)>,
) -> Result<Geometry, RenderError> {
    let modules = matrix.width();
    let (width, height) = (options.width, options.height);
    let drawable = width.min(height).saturating_sub(options.margin.saturating_mul(2));
    let module_px = drawable / modules.max(1);
    if module_px == 0 {
        return Err(RenderError::TooSmall {
            size: width.min(height),
            margin: options.margin,
            modules,
        });
    }

    // Center the matrix; leftover pixels from rounding go to the margin.
    let matrix_px = modules * module_px;
    let origin = (
        ((width - matrix_px) / 2) as f32,
        ((height - matrix_px) / 2) as f32,
    );

    let logo = logo_size.and_then(|(w, h)| {
        let fraction = options.image_options.image_size?;
        fit_logo(width, height, matrix_px, fraction, w, h)
    });
    let hidden = logo.filter(|_| options.image_options.hide_background_dots);

    // A module is drawn if dark, outside the finders, and not under the logo.

    let s = module_px as f32;
    let cell = |x: u32, y: u32| (origin.0 + x as f32 * s, origin.1 + y as f32 * s);
    let visible = |x: i64, y: i64| {
        if !matrix.is_dark(x, y) || matrix.is_finder(x as u32, y as u32) {
            return false;
        }
        let (px, py) = cell(x as u32, y as u32);
        !hidden.is_some_and(|b| b.overlaps(px, py, s))
    };

    let mut dots = Vec::new();
    for y in 0..modules {
        for x in 0..modules {
            let (xi, yi) = (x as i64, y as i64);
            if !visible(xi, yi) {
                continue;
            }
            // Rounded styles only round corners facing empty cells.
            let neighbors = Neighbors {
                north: visible(xi, yi - 1),
                east: visible(xi + 1, yi),
                south: visible(xi, yi + 1),
                west: visible(xi - 1, yi),
            };
            let (px, py) = cell(x, y);
            dots.push(dot_shape(options.dots_options.style, px, py, s, neighbors));
        }
    }

    // Finders: top-left, top-right, bottom-left.
    let far = modules - FINDER;
    let mut corner_squares = Vec::with_capacity(6);
    let mut corner_dots = Vec::with_capacity(3);
    for (fx, fy) in [(0, 0), (far, 0), (0, far)] {
        let (px, py) = cell(fx, fy);
        corner_squares.extend(finder_ring(options.corners_square_options.style, px, py, s));
        corner_dots.push(finder_dot(
            options.corners_dot_options.style,
            px + 2.0 * s,
            py + 2.0 * s,
            s,
        ));
    }

    Ok(Geometry {
        width,
        height,
        modules,
        module_px,
        origin,
        dots,
        corner_squares,
        corner_dots,
        logo,
    })
}

/// Scales a logo to fit a square of `fraction` of the matrix, centered.
fn fit_logo(
    width: u32,
    height: u32,
    matrix_px: u32,
    fraction: f32,
    logo_w: u32,
    logo_h: u32,
) -> Option<LogoBox> {
    if logo_w == 0 || logo_h == 0 || fraction.is_nan() || fraction <= 0.0 {
        return None;
    }
    // Keep the aspect ratio inside the bounding square.
    let bound = matrix_px as f32 * fraction;
    let scale = (bound / logo_w as f32).min(bound / logo_h as f32);
    let w = ((logo_w as f32 * scale).round() as u32).clamp(1, width);
    let h = ((logo_h as f32 * scale).round() as u32).clamp(1, height);
    Some(LogoBox {
        x: (width - w) / 2,
        y: (height - h) / 2,
        width: w,
        height: h,
    })
}

// ============================================================================
// Module Shapes
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Neighbors {
    north: bool,
    east: bool,
    south: bool,
    west: bool,
}

impl Neighbors {
    /// Corners with no neighbor on either adjoining side: tl, tr, br, bl.
    fn free_corners(self) -> [bool; 4] {
        [
            !self.north && !self.west,
            !self.north && !self.east,
            !self.south && !self.east,
            !self.south && !self.west,
        ]
    }
}

fn dot_shape(style: DotStyle, x: f32, y: f32, s: f32, neighbors: Neighbors) -> Shape {
    // Radius per corner (tl, tr, br, bl) when that corner is free.
    let radii = match style {
        DotStyle::Square => return Shape::rect(x, y, s, 0.0),
        DotStyle::Dots => return Shape::circle(x, y, s),
        DotStyle::Rounded => [0.35 * s; 4],
        DotStyle::ExtraRounded => [0.5 * s; 4],
        DotStyle::Classy => [0.5 * s, 0.0, 0.5 * s, 0.0],
        DotStyle::ClassyRounded => [0.5 * s, 0.25 * s, 0.5 * s, 0.25 * s],
    };

    let free = neighbors.free_corners();
    Shape::Rect {
        x,
        y,
        w: s,
        h: s,
        radii: std::array::from_fn(|i| if free[i] { radii[i] } else { 0.0 }),
    }
}

/// Outer ring of a finder pattern as an outline plus a hole.
fn finder_ring(style: CornerSquareStyle, x: f32, y: f32, s: f32) -> [Shape; 2] {
    let outer = FINDER as f32 * s;
    let inner = outer - 2.0 * s;
    match style {
        CornerSquareStyle::Square => [
            Shape::rect(x, y, outer, 0.0),
            Shape::rect(x + s, y + s, inner, 0.0),
        ],
        CornerSquareStyle::Dot => [
            Shape::circle(x, y, outer),
            Shape::circle(x + s, y + s, inner),
        ],
        CornerSquareStyle::ExtraRounded => [
            Shape::rect(x, y, outer, 2.5 * s),
            Shape::rect(x + s, y + s, inner, 1.5 * s),
        ],
    }
}

fn finder_dot(style: CornerDotStyle, x: f32, y: f32, s: f32) -> Shape {
    match style {
        CornerDotStyle::Square => Shape::rect(x, y, 3.0 * s, 0.0),
        CornerDotStyle::Dot => Shape::circle(x, y, 3.0 * s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileOverrides, compile};
    use crate::settings::{LogoConfig, LogoMode, QRSettings};

    fn options(settings: &QRSettings) -> RenderOptions {
        compile(settings, CompileOverrides::default())
    }

    #[test]
    fn matrix_marks_finders() {
        let matrix = Matrix::encode(&options(&QRSettings::default())).unwrap();
        let w = matrix.width();
        assert!(matrix.is_finder(0, 0));
        assert!(matrix.is_finder(w - 1, 0));
        assert!(matrix.is_finder(0, w - 1));
        assert!(!matrix.is_finder(w - 1, w - 1));
        // The top-left finder's corner module is always dark.
        assert!(matrix.is_dark(0, 0));
        assert!(!matrix.is_dark(-1, 0));
    }

    #[test]
    fn module_size_fills_drawable_area() {
        let opts = options(&QRSettings::default());
        let matrix = Matrix::encode(&opts).unwrap();
        let geometry = layout(&opts, &matrix, None).unwrap();

        let expected = (320 - 2 * 16) / matrix.width();
        assert_eq!(geometry.module_px, expected);
        assert_eq!(geometry.corner_squares.len(), 6);
        assert_eq!(geometry.corner_dots.len(), 3);
        assert!(geometry.matrix_px() <= 288.0);
    }

    #[test]
    fn too_small_is_an_error() {
        let mut opts = options(&QRSettings::default());
        opts.width = 40;
        opts.height = 40;
        let matrix = Matrix::encode(&opts).unwrap();

        assert!(matches!(
            layout(&opts, &matrix, None),
            Err(RenderError::TooSmall { size: 40, .. })
        ));
    }

    #[test]
    fn isolated_rounded_module_has_all_corners_rounded() {
        let lone = Neighbors {
            north: false,
            east: false,
            south: false,
            west: false,
        };
        let Shape::Rect { radii, .. } = dot_shape(DotStyle::ExtraRounded, 0.0, 0.0, 10.0, lone)
        else {
            panic!("expected a rect");
        };
        assert_eq!(radii, [5.0; 4]);

        let joined = Neighbors { east: true, ..lone };
        let Shape::Rect { radii, .. } = dot_shape(DotStyle::ExtraRounded, 0.0, 0.0, 10.0, joined)
        else {
            panic!("expected a rect");
        };
        assert_eq!(radii, [5.0, 0.0, 0.0, 5.0]);
    }

    #[test]
    fn logo_hides_overlapping_modules_only_when_requested() {
        let logo = LogoConfig {
            mode: LogoMode::External,
            external_url: Some("https://example.com/logo.png".into()),
            scale: 0.4,
            ..LogoConfig::default()
        };
        let settings = QRSettings::default().with_logo(logo);
        let mut opts = options(&settings);
        let matrix = Matrix::encode(&opts).unwrap();

        assert!(opts.image_options.hide_background_dots);
        let hiding = layout(&opts, &matrix, Some((100, 50))).unwrap();
        let logo_box = hiding.logo.unwrap();
        assert_eq!(logo_box.width, logo_box.height * 2);

        opts.image_options.hide_background_dots = false;
        let showing = layout(&opts, &matrix, Some((100, 50))).unwrap();
        assert!(showing.dots.len() > hiding.dots.len());

        let s = hiding.module_px as f32;
        for dot in &hiding.dots {
            if let Shape::Rect { x, y, .. } = *dot {
                assert!(!logo_box.overlaps(x, y, s));
            }
        }
    }

    #[test]
    fn no_logo_without_image_size() {
        let opts = options(&QRSettings::default());
        let matrix = Matrix::encode(&opts).unwrap();
        let geometry = layout(&opts, &matrix, Some((10, 10))).unwrap();
        assert!(geometry.logo.is_none());
    }
}
