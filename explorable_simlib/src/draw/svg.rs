//! SVG rendering of a recorded display list.

use super::recording::PaintOp;
use kurbo::{Affine, BezPath};
use std::fmt::Write;

fn transformed(path: &BezPath, transform: Affine) -> String {
    (transform * path.clone()).to_svg()
}

fn filter_attr(filter: &Option<String>) -> String {
    match filter {
        Some(f) => format!(" style=\"filter: {}\"", escape(f)),
        None => String::new(),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Builds a standalone SVG document of `width × height` device pixels.
pub fn document(width: u32, height: u32, ops: &[PaintOp]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
    );
    for op in ops {
        let _ = match op {
            PaintOp::Clear { color: Some(color) } => writeln!(
                out,
                "  <rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" fill=\"{color}\"/>"
            ),
            PaintOp::Clear { color: None } => Ok(()),
            PaintOp::Fill {
                path,
                transform,
                color,
                filter,
            } => writeln!(
                out,
                "  <path d=\"{}\" fill=\"{}\"{}/>",
                transformed(path, *transform),
                color,
                filter_attr(filter)
            ),
            PaintOp::Stroke {
                path,
                transform,
                color,
                width: line_width,
                filter,
            } => {
                // Stroke width scales with the transform, as on a canvas
                let scale = transform.determinant().abs().sqrt();
                writeln!(
                    out,
                    "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"{}/>",
                    transformed(path, *transform),
                    color,
                    line_width * scale,
                    filter_attr(filter)
                )
            }
        };
    }
    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::Color;

    #[test]
    fn test_empty_document() {
        let svg = document(4, 3, &[]);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("viewBox=\"0 0 4 3\""));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn test_ops_become_elements() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((1.0, 0.0));

        let ops = vec![
            PaintOp::Clear {
                color: Some(Color::WHITE),
            },
            PaintOp::Stroke {
                path,
                transform: Affine::translate((10.0, 0.0)),
                color: Color::BLACK,
                width: 2.0,
                filter: Some("blur(2px)".to_string()),
            },
        ];
        let svg = document(20, 20, &ops);

        assert!(svg.contains("fill=\"rgb(255, 255, 255)\""));
        // Path translated by the recorded transform
        assert!(svg.contains("d=\"M10"));
        assert!(svg.contains("stroke-width=\"2\""));
        assert!(svg.contains("filter: blur(2px)"));
    }
}
