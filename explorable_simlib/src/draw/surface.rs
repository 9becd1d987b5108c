//! Raster surface abstraction and per-frame surface metrics.

use super::color::Color;
use crate::error::DrawError;
use kurbo::{Affine, BezPath};
use serde::{Deserialize, Serialize};

/// Pixel metrics of a mounted surface, read-only to simulations.
///
/// Derived from the container's CSS size and the host's device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceContext {
    /// Backing store width in device pixels
    pub pixel_width: u32,
    /// Backing store height in device pixels
    pub pixel_height: u32,
    /// `pixel_width / pixel_height` (1.0 for an empty surface)
    pub aspect_ratio: f64,
    /// Device pixels per CSS pixel
    pub device_pixel_ratio: f64,
}

impl SurfaceContext {
    /// Metrics for a backing store of the given device-pixel size.
    pub fn new(pixel_width: u32, pixel_height: u32, device_pixel_ratio: f64) -> Self {
        let aspect_ratio = if pixel_height == 0 {
            1.0
        } else {
            pixel_width as f64 / pixel_height as f64
        };
        Self {
            pixel_width,
            pixel_height,
            aspect_ratio,
            device_pixel_ratio,
        }
    }

    /// Metrics for a container of `css_width × css_height` at `device_pixel_ratio`.
    ///
    /// Backing pixels are `round(css × ratio)`; negative or non-finite sizes
    /// collapse to zero.
    pub fn for_container(css_width: f64, css_height: f64, device_pixel_ratio: f64) -> Self {
        let to_pixels = |css: f64| {
            let px = (css * device_pixel_ratio).round();
            if px.is_finite() && px > 0.0 {
                px as u32
            } else {
                0
            }
        };
        Self::new(to_pixels(css_width), to_pixels(css_height), device_pixel_ratio)
    }

    pub fn width(&self) -> f64 {
        self.pixel_width as f64
    }

    pub fn height(&self) -> f64 {
        self.pixel_height as f64
    }

    /// The shorter side in pixels.
    pub fn min_side(&self) -> f64 {
        self.width().min(self.height())
    }
}

/// Primitive 2D raster API the drawing engine commits to.
///
/// Modelled on a canvas 2D context: a current transform and paint state
/// that `save()`/`restore()` push and pop. Surfaces raise errors instead of
/// silently dropping bad input (non-finite geometry, unbalanced restore).
pub trait RasterSurface {
    /// Backing store size in device pixels.
    fn pixel_size(&self) -> (u32, u32);

    /// Resizes the backing store (clears it and resets state).
    fn resize(&mut self, pixel_width: u32, pixel_height: u32);

    /// Pushes the current transform and paint state.
    fn save(&mut self);

    /// Pops the state pushed by the matching `save()`.
    fn restore(&mut self) -> Result<(), DrawError>;

    /// Multiplies `transform` onto the current transform.
    fn concat_transform(&mut self, transform: Affine) -> Result<(), DrawError>;

    fn set_fill(&mut self, color: Color);

    /// Sets the stroke color and line width (device pixels).
    fn set_stroke(&mut self, color: Color, width: f64);

    /// Sets a CSS filter string applied to subsequent paints.
    fn set_filter(&mut self, filter: &str);

    /// Fills a path under the current transform.
    fn fill_path(&mut self, path: &BezPath) -> Result<(), DrawError>;

    /// Strokes a path under the current transform.
    fn stroke_path(&mut self, path: &BezPath) -> Result<(), DrawError>;

    /// Clears the whole surface, optionally painting it with `color`.
    ///
    /// Ignores the current transform.
    fn clear(&mut self, color: Option<Color>) -> Result<(), DrawError>;
}
