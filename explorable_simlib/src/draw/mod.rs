//! Drawing: colors, transforms, raster surfaces and the shape engine.

pub mod color;
pub mod engine;
pub mod recording;
pub mod surface;
pub mod svg;
pub mod transform;

pub use color::Color;
pub use engine::{
    arrow_head, DrawCommand, DrawingEngine, Shape, ShapeBuilder, Stroke, TransformOp,
    DEFAULT_ARROW_HEAD, DEFAULT_SIZE, DEFAULT_STROKE_WIDTH,
};
pub use recording::{PaintOp, PaintState, RecordingSurface};
pub use surface::{RasterSurface, SurfaceContext};
pub use transform::Transform2;
