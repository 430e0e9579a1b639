//! SVG document output.

use std::fmt::Write;

use super::layout::{Geometry, PathSink, Shape};
use crate::compiler::{Fill, RenderOptions};
use crate::settings::GradientType;

/// Collects path segments as SVG path data.
#[derive(Default)]
struct PathData(String);

impl PathSink for PathData {
    fn move_to(&mut self, x: f32, y: f32) {
        let _ = write!(self.0, "M{} {}", num(x), num(y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let _ = write!(self.0, "L{} {}", num(x), num(y));
    }

    fn cubic_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let _ = write!(
            self.0,
            "C{} {} {} {} {} {}",
            num(x1),
            num(y1),
            num(x2),
            num(y2),
            num(x),
            num(y)
        );
    }

    fn close(&mut self) {
        self.0.push('Z');
    }
}

/// Rounds to two decimals and drops trailing zeros.
fn num(v: f32) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        rounded.to_string()
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub(super) fn write_svg(options: &RenderOptions, geometry: &Geometry, logo_href: Option<&str>) -> String {
    let (w, h) = (geometry.width, geometry.height);
    let mut doc = String::new();
    let _ = write!(
        doc,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );

    let layers = [
        ("dots", &geometry.dots, &options.dots_options.fill, "nonzero"),
        (
            "corners-square",
            &geometry.corner_squares,
            &options.corners_square_options.fill,
            "evenodd",
        ),
        (
            "corners-dot",
            &geometry.corner_dots,
            &options.corners_dot_options.fill,
            "nonzero",
        ),
    ];

    let gradients: Vec<String> = layers
        .iter()
        .filter_map(|(id, _, fill, _)| gradient_def(id, fill, geometry))
        .collect();
    if !gradients.is_empty() {
        doc.push_str("<defs>");
        for def in gradients {
            doc.push_str(&def);
        }
        doc.push_str("</defs>");
    }

    let background = &options.background_options;
    if !background.is_transparent() {
        let _ = write!(
            doc,
            r#"<rect width="{w}" height="{h}" fill="{}"/>"#,
            escape_attr(&background.color)
        );
    }

    for (id, shapes, fill, rule) in layers {
        write_layer(&mut doc, id, shapes, fill, rule);
    }

    if let (Some(href), Some(placement)) = (logo_href, geometry.logo) {
        let _ = write!(
            doc,
            r#"<image href="{}" x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="xMidYMid meet"/>"#,
            escape_attr(href),
            placement.x,
            placement.y,
            placement.width,
            placement.height
        );
    }

    doc.push_str("</svg>");
    doc
}

fn write_layer(doc: &mut String, id: &str, shapes: &[Shape], fill: &Fill, rule: &str) {
    if shapes.is_empty() {
        return;
    }
    let mut data = PathData::default();
    for shape in shapes {
        shape.trace(&mut data);
    }
    let paint = match fill {
        Fill::Solid { color } => escape_attr(color),
        Fill::Gradient { .. } => format!("url(#{id}-fill)"),
    };
    let _ = write!(
        doc,
        r#"<path class="{id}" fill="{paint}" fill-rule="{rule}" d="{}"/>"#,
        data.0
    );
}

fn gradient_def(id: &str, fill: &Fill, geometry: &Geometry) -> Option<String> {
    let gradient = fill.gradient()?;
    let (cx, cy) = geometry.center();
    let half = geometry.matrix_px() / 2.0;

    let mut def = match gradient.kind {
        GradientType::Linear => {
            let (sin, cos) = gradient.rotation.sin_cos();
            format!(
                r#"<linearGradient id="{id}-fill" gradientUnits="userSpaceOnUse" x1="{}" y1="{}" x2="{}" y2="{}">"#,
                num(cx - half * cos),
                num(cy - half * sin),
                num(cx + half * cos),
                num(cy + half * sin)
            )
        }
        GradientType::Radial => format!(
            r#"<radialGradient id="{id}-fill" gradientUnits="userSpaceOnUse" cx="{}" cy="{}" r="{}">"#,
            num(cx),
            num(cy),
            num(half)
        ),
    };
    for stop in &gradient.color_stops {
        let _ = write!(
            def,
            r#"<stop offset="{}" stop-color="{}"/>"#,
            num(stop.offset),
            escape_attr(&stop.color)
        );
    }
    def.push_str(match gradient.kind {
        GradientType::Linear => "</linearGradient>",
        GradientType::Radial => "</radialGradient>",
    });
    Some(def)
}

#[cfg(test)]
mod tests {
    use super::super::{RasterEngine, RenderEngine};
    use super::*;
    use crate::compiler::{CompileOverrides, compile};
    use crate::settings::{GradientType, QRSettings};
    use resvg::usvg::{Options, Tree};

    fn svg_for(settings: &QRSettings, overrides: CompileOverrides) -> String {
        RasterEngine::from_options(&compile(settings, overrides))
            .render_svg()
            .unwrap()
    }

    #[test]
    fn gradient_fill_references_defs() {
        let svg = svg_for(&QRSettings::default(), CompileOverrides::default());
        assert!(svg.contains(r#"<linearGradient id="dots-fill""#));
        assert!(svg.contains(r#"fill="url(#dots-fill)""#));
        assert!(svg.contains(r##"stop-color="#7b5cff""##));
    }

    #[test]
    fn solid_fill_has_no_defs() {
        let mut settings = QRSettings::default();
        settings.gradient.enabled = false;
        settings.foreground_color = "#000000".into();
        let svg = svg_for(&settings, CompileOverrides::default());

        assert!(!svg.contains("<defs>"));
        assert!(svg.contains(r##"fill="#000000""##));
    }

    #[test]
    fn radial_gradient_and_transparent_background() {
        let mut settings = QRSettings::default();
        settings.gradient.kind = GradientType::Radial;
        let svg = svg_for(&settings, CompileOverrides::default().with_transparent(true));

        assert!(svg.contains("<radialGradient"));
        assert!(!svg.contains("<rect"));
    }

    #[test]
    fn output_is_valid_svg() {
        let svg = svg_for(&QRSettings::default(), CompileOverrides::default().with_size(400));
        let tree = Tree::from_str(&svg, &Options::default()).unwrap();
        assert_eq!(tree.size().width(), 400.0);
    }

    #[test]
    fn attribute_values_are_escaped() {
        assert_eq!(escape_attr(r#"a"<b>&"#), "a&quot;&lt;b&gt;&amp;");
        assert_eq!(num(1.0 / 3.0), "0.33");
        assert_eq!(num(16.0), "16");
    }
}
