//! 2D affine transforms composed in call order.

use kurbo::Affine;
use nalgebra::{Matrix3, Point2};

/// A 2×3 affine transform, stored as a homogeneous 3×3 matrix.
///
/// Every mutator right-multiplies, so `a.translate(..).rotate(..)` maps a
/// point by rotating it first, then translating: the same nesting a canvas
/// transform stack produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2 {
    matrix: Matrix3<f64>,
}

impl Transform2 {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    pub fn from_translation(dx: f64, dy: f64) -> Self {
        Self {
            matrix: Matrix3::new_translation(&nalgebra::Vector2::new(dx, dy)),
        }
    }

    pub fn from_scale(sx: f64, sy: f64) -> Self {
        Self {
            matrix: Matrix3::new_nonuniform_scaling(&nalgebra::Vector2::new(sx, sy)),
        }
    }

    pub fn from_rotation(radians: f64) -> Self {
        Self {
            matrix: Matrix3::new_rotation(radians),
        }
    }

    /// Right-multiplies `other` onto this transform.
    pub fn then(self, other: Transform2) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    pub fn translate(self, dx: f64, dy: f64) -> Self {
        self.then(Self::from_translation(dx, dy))
    }

    pub fn scale(self, sx: f64, sy: f64) -> Self {
        self.then(Self::from_scale(sx, sy))
    }

    pub fn rotate(self, radians: f64) -> Self {
        self.then(Self::from_rotation(radians))
    }

    /// Maps a point through the transform.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.matrix.transform_point(&Point2::new(x, y));
        (p.x, p.y)
    }

    /// Returns true if every coefficient is finite.
    pub fn is_finite(&self) -> bool {
        self.matrix.iter().all(|v| v.is_finite())
    }

    /// The six affine coefficients `[a, b, c, d, e, f]` in canvas order.
    pub fn coefficients(&self) -> [f64; 6] {
        let m = &self.matrix;
        [m[(0, 0)], m[(1, 0)], m[(0, 1)], m[(1, 1)], m[(0, 2)], m[(1, 2)]]
    }

    /// Converts into the path-geometry affine used by raster surfaces.
    pub fn to_affine(&self) -> Affine {
        Affine::new(self.coefficients())
    }
}

impl Default for Transform2 {
    fn default() -> Self {
        Self::identity()
    }
}
