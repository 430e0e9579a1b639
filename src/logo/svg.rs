//! SVG rasterization using resvg.

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};

/// Largest edge, in pixels, an SVG logo is rasterized at.
pub const MAX_SVG_EDGE: u32 = 1024;

/// Rasterizes SVG markup at its intrinsic size, capped at [`MAX_SVG_EDGE`].
///
/// Returns `None` if the SVG cannot be parsed or has no area.
pub fn render_svg_natural(svg_data: &[u8]) -> Option<RgbaImage> {
    let tree = Tree::from_data(svg_data, &Options::default()).ok()?;
    let size = tree.size();
    let longest = size.width().max(size.height()).ceil() as u32;
    render_tree(&tree, longest.clamp(1, MAX_SVG_EDGE))
}

/// Rasterizes SVG markup so that its longer side is `size` pixels.
///
/// Returns `None` if the SVG cannot be parsed or rendered.
pub fn render_svg(svg_data: &str, size: u32) -> Option<RgbaImage> {
    let tree = Tree::from_str(svg_data, &Options::default()).ok()?;
    render_tree(&tree, size)
}

/// Returns true if the bytes look like SVG markup.
pub fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

fn render_tree(tree: &Tree, size: u32) -> Option<RgbaImage> {
    let svg_size = tree.size();
    let scale = (size as f32) / svg_size.width().max(svg_size.height());
    let width = (svg_size.width() * scale).ceil() as u32;
    let height = (svg_size.height() * scale).ceil() as u32;

    let mut pixmap = Pixmap::new(width, height)?;
    resvg::render(tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    Some(pixmap_to_rgba_image(&pixmap))
}

/// Converts a premultiplied tiny-skia pixmap into a straight-alpha image.
pub(crate) fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    img
}
