//! Display-list raster surface.
//!
//! `RecordingSurface` implements [`RasterSurface`] without touching pixels:
//! every paint is recorded together with the transform and paint state in
//! effect at the time. The list since the last `clear()` is the surface's
//! content, which the headless runner exports and tests compare.

use super::color::Color;
use super::surface::RasterSurface;
use super::svg;
use crate::error::DrawError;
use kurbo::{Affine, BezPath, PathEl, Point};

/// Paint state carried by `save()`/`restore()`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintState {
    pub transform: Affine,
    pub fill: Color,
    pub stroke: Color,
    pub line_width: f64,
    pub filter: Option<String>,
}

impl Default for PaintState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
            filter: None,
        }
    }
}

/// One recorded paint operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintOp {
    Clear {
        color: Option<Color>,
    },
    Fill {
        path: BezPath,
        transform: Affine,
        color: Color,
        filter: Option<String>,
    },
    Stroke {
        path: BezPath,
        transform: Affine,
        color: Color,
        width: f64,
        filter: Option<String>,
    },
}

/// Raster surface that records paint operations instead of rasterizing.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    state: PaintState,
    stack: Vec<PaintState>,
    ops: Vec<PaintOp>,
}

impl RecordingSurface {
    pub fn new(pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            width: pixel_width,
            height: pixel_height,
            state: PaintState::default(),
            stack: Vec::new(),
            ops: Vec::new(),
        }
    }

    /// Operations painted since the last clear.
    pub fn ops(&self) -> &[PaintOp] {
        &self.ops
    }

    /// Number of `save()` calls not yet restored.
    pub fn save_depth(&self) -> usize {
        self.stack.len()
    }

    /// The current transform and paint state.
    pub fn state(&self) -> &PaintState {
        &self.state
    }

    /// Renders the current content as an SVG document.
    pub fn to_svg(&self) -> String {
        svg::document(self.width, self.height, &self.ops)
    }

    fn check_path(path: &BezPath) -> Result<(), DrawError> {
        let finite = |p: &Point| p.x.is_finite() && p.y.is_finite();
        let ok = path.elements().iter().all(|el| match el {
            PathEl::MoveTo(p) | PathEl::LineTo(p) => finite(p),
            PathEl::QuadTo(p1, p2) => finite(p1) && finite(p2),
            PathEl::CurveTo(p1, p2, p3) => finite(p1) && finite(p2) && finite(p3),
            PathEl::ClosePath => true,
        });
        if ok {
            Ok(())
        } else {
            Err(DrawError::NonFinite("path"))
        }
    }
}

impl RasterSurface for RecordingSurface {
    fn pixel_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, pixel_width: u32, pixel_height: u32) {
        self.width = pixel_width;
        self.height = pixel_height;
        self.state = PaintState::default();
        self.stack.clear();
        self.ops.clear();
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) -> Result<(), DrawError> {
        self.state = self.stack.pop().ok_or(DrawError::UnbalancedRestore)?;
        Ok(())
    }

    fn concat_transform(&mut self, transform: Affine) -> Result<(), DrawError> {
        if !transform.as_coeffs().iter().all(|c| c.is_finite()) {
            return Err(DrawError::NonFinite("transform"));
        }
        self.state.transform = self.state.transform * transform;
        Ok(())
    }

    fn set_fill(&mut self, color: Color) {
        self.state.fill = color;
    }

    fn set_stroke(&mut self, color: Color, width: f64) {
        self.state.stroke = color;
        self.state.line_width = width;
    }

    fn set_filter(&mut self, filter: &str) {
        self.state.filter = Some(filter.to_string());
    }

    fn fill_path(&mut self, path: &BezPath) -> Result<(), DrawError> {
        Self::check_path(path)?;
        self.ops.push(PaintOp::Fill {
            path: path.clone(),
            transform: self.state.transform,
            color: self.state.fill,
            filter: self.state.filter.clone(),
        });
        Ok(())
    }

    fn stroke_path(&mut self, path: &BezPath) -> Result<(), DrawError> {
        Self::check_path(path)?;
        if !self.state.line_width.is_finite() {
            return Err(DrawError::NonFinite("line width"));
        }
        self.ops.push(PaintOp::Stroke {
            path: path.clone(),
            transform: self.state.transform,
            color: self.state.stroke,
            width: self.state.line_width,
            filter: self.state.filter.clone(),
        });
        Ok(())
    }

    fn clear(&mut self, color: Option<Color>) -> Result<(), DrawError> {
        // Everything painted so far is covered
        self.ops.clear();
        self.ops.push(PaintOp::Clear { color });
        Ok(())
    }
}
