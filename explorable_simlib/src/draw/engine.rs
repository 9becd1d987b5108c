//! Drawing Engine
//! ==============
//!
//! A declarative, chainable shape builder over a [`RasterSurface`].
//!
//! All geometry is given in normalized units:
//! - positions and translations span `0..1` of the surface on each axis
//! - radii, square sides and SVG path coordinates are fractions of the
//!   surface height, so circles stay round on any aspect ratio
//! - rectangle half extents are fractions of width and height respectively
//!
//! Nothing touches the surface until `draw()`. The transform chain is stored
//! as recorded calls and folded into one pixel-space affine inside `draw()`,
//! right-multiplied in call order. Each draw is wrapped in `save()`/`restore()`
//! so transform and paint state never leak into the next one.

use super::color::Color;
use super::surface::{RasterSurface, SurfaceContext};
use super::transform::Transform2;
use crate::error::DrawError;
use kurbo::{Affine, BezPath, Circle, Ellipse, Point, Rect, Shape as _, Vec2};

/// Default radius / half size for shapes built without one.
pub const DEFAULT_SIZE: f64 = 0.02;

/// Default arrowhead size, as a fraction of the shorter surface side.
pub const DEFAULT_ARROW_HEAD: f64 = 0.02;

/// Default stroke width in CSS pixels.
pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;

/// Flattening tolerance in device pixels.
const TOLERANCE: f64 = 0.1;

/// Shape primitive with its normalized parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle { radius: f64 },
    Ellipse { rx: f64, ry: f64 },
    /// Open arc from `start` to `end` (radians, clockwise in screen space)
    Arc { start: f64, end: f64, radius: f64 },
    Square { half: f64 },
    Rectangle { half_width: f64, half_height: f64 },
    /// SVG path data, coordinates in height units
    Svg { path: String },
    /// Line from `from` to `to` (normalized points) with a filled arrowhead
    Vector {
        from: (f64, f64),
        to: (f64, f64),
        head: f64,
    },
}

/// One recorded transform call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformOp {
    /// Normalized offset (fractions of width / height)
    Translate(f64, f64),
    Scale(f64, f64),
    Rotate(f64),
}

/// Stroke paint: color plus width in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}

/// Everything needed to paint one shape, independent of surface size.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub shape: Shape,
    pub transforms: Vec<TransformOp>,
    pub fill: Option<Color>,
    pub stroke: Option<Stroke>,
    pub filter: Option<String>,
}

impl DrawCommand {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            transforms: Vec::new(),
            fill: None,
            stroke: None,
            filter: None,
        }
    }

    /// Folds the recorded transform calls into one pixel-space transform.
    pub fn pixel_transform(&self, surface: &SurfaceContext) -> Transform2 {
        self.transforms
            .iter()
            .fold(Transform2::identity(), |acc, op| match *op {
                TransformOp::Translate(dx, dy) => {
                    acc.translate(dx * surface.width(), dy * surface.height())
                }
                TransformOp::Scale(sx, sy) => acc.scale(sx, sy),
                TransformOp::Rotate(radians) => acc.rotate(radians),
            })
    }

    /// Builds the shape outline in pixel units, centered on the local origin.
    fn outline(&self, surface: &SurfaceContext) -> Result<BezPath, DrawError> {
        let h = surface.height();
        let path = match &self.shape {
            Shape::Circle { radius } => Circle::new(Point::ORIGIN, radius * h).to_path(TOLERANCE),
            Shape::Ellipse { rx, ry } => {
                Ellipse::new(Point::ORIGIN, Vec2::new(rx * h, ry * h), 0.0).to_path(TOLERANCE)
            }
            Shape::Arc { start, end, radius } => kurbo::Arc {
                center: Point::ORIGIN,
                radii: Vec2::new(radius * h, radius * h),
                start_angle: *start,
                sweep_angle: end - start,
                x_rotation: 0.0,
            }
            .to_path(TOLERANCE),
            Shape::Square { half } => {
                Rect::new(-half * h, -half * h, half * h, half * h).to_path(TOLERANCE)
            }
            Shape::Rectangle {
                half_width,
                half_height,
            } => {
                let w = surface.width();
                Rect::new(-half_width * w, -half_height * h, half_width * w, half_height * h)
                    .to_path(TOLERANCE)
            }
            Shape::Svg { path } => {
                let parsed = BezPath::from_svg(path).map_err(|e| DrawError::InvalidPath {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                Affine::scale(h) * parsed
            }
            Shape::Vector { from, to, .. } => {
                let mut line = BezPath::new();
                line.move_to(to_pixels(*from, surface));
                line.line_to(to_pixels(*to, surface));
                line
            }
        };
        Ok(path)
    }
}

fn to_pixels(p: (f64, f64), surface: &SurfaceContext) -> Point {
    Point::new(p.0 * surface.width(), p.1 * surface.height())
}

/// Filled arrowhead for a vector, in pixel units.
///
/// An equilateral triangle of circumradius `r = head × min(W, H)` pointing
/// along the line. Its center sits `r` behind `to`, so the tip lands on `to`.
/// A zero-length vector points along +x.
pub fn arrow_head(
    from: (f64, f64),
    to: (f64, f64),
    head: f64,
    surface: &SurfaceContext,
) -> BezPath {
    let start = to_pixels(from, surface);
    let tip = to_pixels(to, surface);
    let delta = tip - start;
    let angle = if delta.hypot2() > 0.0 { delta.atan2() } else { 0.0 };

    let r = head * surface.min_side();
    let center = tip - Vec2::from_angle(angle) * r;
    let third = std::f64::consts::TAU / 3.0;

    let mut path = BezPath::new();
    path.move_to(tip);
    path.line_to(center + Vec2::from_angle(angle + third) * r);
    path.line_to(center + Vec2::from_angle(angle - third) * r);
    path.close_path();
    path
}

/// Per-frame drawing engine bound to one surface.
pub struct DrawingEngine<'a> {
    surface: &'a mut dyn RasterSurface,
    context: SurfaceContext,
}

impl<'a> DrawingEngine<'a> {
    pub fn new(surface: &'a mut dyn RasterSurface, context: SurfaceContext) -> Self {
        Self { surface, context }
    }

    /// Metrics of the surface this engine paints on.
    pub fn context(&self) -> &SurfaceContext {
        &self.context
    }

    /// Clears the whole surface, painting it with `color` if given.
    pub fn clear(&mut self, color: Option<Color>) -> Result<(), DrawError> {
        self.surface.clear(color)
    }

    pub fn circle(&mut self, radius: impl Into<Option<f64>>) -> ShapeBuilder<'_, 'a> {
        let radius = radius.into().unwrap_or(DEFAULT_SIZE);
        self.shape(Shape::Circle { radius })
    }

    pub fn ellipse(
        &mut self,
        rx: impl Into<Option<f64>>,
        ry: impl Into<Option<f64>>,
    ) -> ShapeBuilder<'_, 'a> {
        let rx = rx.into().unwrap_or(DEFAULT_SIZE);
        let ry = ry.into().unwrap_or(rx);
        self.shape(Shape::Ellipse { rx, ry })
    }

    pub fn arc(
        &mut self,
        start: f64,
        end: f64,
        radius: impl Into<Option<f64>>,
    ) -> ShapeBuilder<'_, 'a> {
        let radius = radius.into().unwrap_or(DEFAULT_SIZE);
        self.shape(Shape::Arc { start, end, radius })
    }

    pub fn square(&mut self, half: impl Into<Option<f64>>) -> ShapeBuilder<'_, 'a> {
        let half = half.into().unwrap_or(DEFAULT_SIZE);
        self.shape(Shape::Square { half })
    }

    pub fn rectangle(
        &mut self,
        half_width: impl Into<Option<f64>>,
        half_height: impl Into<Option<f64>>,
    ) -> ShapeBuilder<'_, 'a> {
        let half_width = half_width.into().unwrap_or(DEFAULT_SIZE);
        let half_height = half_height.into().unwrap_or(half_width);
        self.shape(Shape::Rectangle {
            half_width,
            half_height,
        })
    }

    /// Arbitrary path from SVG path data. Parsed (and rejected) at `draw()`.
    pub fn svg(&mut self, path: impl Into<String>) -> ShapeBuilder<'_, 'a> {
        self.shape(Shape::Svg { path: path.into() })
    }

    pub fn vector(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        head: impl Into<Option<f64>>,
    ) -> ShapeBuilder<'_, 'a> {
        let head = head.into().unwrap_or(DEFAULT_ARROW_HEAD);
        self.shape(Shape::Vector { from, to, head })
    }

    /// Starts a builder for any shape.
    pub fn shape(&mut self, shape: Shape) -> ShapeBuilder<'_, 'a> {
        ShapeBuilder {
            engine: self,
            command: DrawCommand::new(shape),
        }
    }

    /// Paints a command inside a `save()`/`restore()` pair.
    ///
    /// The surface is restored even when painting fails; the paint error wins.
    pub fn commit(&mut self, command: &DrawCommand) -> Result<(), DrawError> {
        self.surface.save();
        let painted = self.paint(command);
        let restored = self.surface.restore();
        painted.and(restored)
    }

    fn paint(&mut self, command: &DrawCommand) -> Result<(), DrawError> {
        let transform = command.pixel_transform(&self.context);
        if !transform.is_finite() {
            return Err(DrawError::NonFinite("transform"));
        }
        self.surface.concat_transform(transform.to_affine())?;
        if let Some(filter) = &command.filter {
            self.surface.set_filter(filter);
        }

        let ratio = self.context.device_pixel_ratio;
        let outline = command.outline(&self.context)?;

        if let Shape::Vector { from, to, head } = &command.shape {
            // Line takes the stroke, head takes the fill (falling back to the line color)
            let line = command.stroke.unwrap_or(Stroke {
                color: command.fill.unwrap_or(Color::BLACK),
                width: DEFAULT_STROKE_WIDTH,
            });
            self.surface.set_stroke(line.color, line.width * ratio);
            self.surface.stroke_path(&outline)?;
            self.surface.set_fill(command.fill.unwrap_or(line.color));
            return self
                .surface
                .fill_path(&arrow_head(*from, *to, *head, &self.context));
        }

        if let Some(fill) = command.fill {
            self.surface.set_fill(fill);
            self.surface.fill_path(&outline)?;
        }
        match command.stroke {
            Some(stroke) => {
                self.surface.set_stroke(stroke.color, stroke.width * ratio);
                self.surface.stroke_path(&outline)
            }
            None if command.fill.is_none() => {
                // Never silently invisible
                self.surface.set_stroke(Color::BLACK, DEFAULT_STROKE_WIDTH * ratio);
                self.surface.stroke_path(&outline)
            }
            None => Ok(()),
        }
    }
}

/// Chainable builder for one shape; nothing is painted until [`ShapeBuilder::draw`].
#[must_use = "shapes are only painted by draw()"]
pub struct ShapeBuilder<'e, 'a> {
    engine: &'e mut DrawingEngine<'a>,
    command: DrawCommand,
}

impl<'e, 'a> ShapeBuilder<'e, 'a> {
    /// Moves the shape by a normalized offset.
    pub fn translate(mut self, dx: f64, dy: f64) -> Self {
        self.command.transforms.push(TransformOp::Translate(dx, dy));
        self
    }

    /// Scales the shape; `sy` defaults to `sx`.
    pub fn scale(mut self, sx: f64, sy: impl Into<Option<f64>>) -> Self {
        let sy = sy.into().unwrap_or(sx);
        self.command.transforms.push(TransformOp::Scale(sx, sy));
        self
    }

    pub fn rotate(mut self, radians: f64) -> Self {
        self.command.transforms.push(TransformOp::Rotate(radians));
        self
    }

    pub fn fill(mut self, color: Color) -> Self {
        self.command.fill = Some(color);
        self
    }

    /// Sets the stroke; `width` is in CSS pixels and defaults to 1.
    pub fn stroke(mut self, color: Color, width: impl Into<Option<f64>>) -> Self {
        self.command.stroke = Some(Stroke {
            color,
            width: width.into().unwrap_or(DEFAULT_STROKE_WIDTH),
        });
        self
    }

    /// Applies a CSS filter string (e.g. `"blur(2px)"`).
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.command.filter = Some(filter.into());
        self
    }

    /// The command built so far.
    pub fn command(&self) -> &DrawCommand {
        &self.command
    }

    /// Commits the shape to the surface.
    pub fn draw(self) -> Result<(), DrawError> {
        self.engine.commit(&self.command)
    }
}
