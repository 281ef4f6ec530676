use crate::math::Vector;
use nalgebra as na;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// A 2D rotation stored as sine/cosine pair
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Rot {
    /// Sine of the angle
    pub s: f32,
    /// Cosine of the angle
    pub c: f32,
}

impl Rot {
    /// Creates a rotation from an angle in radians
    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self { s, c }
    }

    /// The identity rotation
    #[inline]
    pub fn identity() -> Self {
        Self { s: 0.0, c: 1.0 }
    }

    /// Returns the angle in radians, in the range [-PI, PI]
    #[inline]
    pub fn angle(&self) -> f32 {
        self.s.atan2(self.c)
    }

    /// Rotates a vector
    #[inline]
    pub fn rotate(&self, v: Vector) -> Vector {
        Vector::new(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Rotates a vector by the inverse of this rotation
    #[inline]
    pub fn inv_rotate(&self, v: Vector) -> Vector {
        Vector::new(self.c * v.x + self.s * v.y, -self.s * v.x + self.c * v.y)
    }

    /// Convert to a nalgebra unit complex number
    #[inline]
    pub fn to_nalgebra(&self) -> na::UnitComplex<f32> {
        na::UnitComplex::new(self.angle())
    }
}

impl Default for Rot {
    fn default() -> Self {
        Self::identity()
    }
}

/// Position and rotation of a body in world space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Transform {
    /// Position of the body origin
    pub position: Vector,

    /// Rotation about the body origin
    pub rotation: Rot,
}

impl Transform {
    /// Creates a new transform
    #[inline]
    pub fn new(position: Vector, angle: f32) -> Self {
        Self {
            position,
            rotation: Rot::from_angle(angle),
        }
    }

    /// Creates a new identity transform
    #[inline]
    pub fn identity() -> Self {
        Self {
            position: Vector::zero(),
            rotation: Rot::identity(),
        }
    }

    /// Creates a new transform from just a position
    #[inline]
    pub fn from_position(position: Vector) -> Self {
        Self {
            position,
            rotation: Rot::identity(),
        }
    }

    /// Transforms a point from local space to world space
    #[inline]
    pub fn transform_point(&self, point: Vector) -> Vector {
        self.rotation.rotate(point) + self.position
    }

    /// Transforms a point from world space to local space
    #[inline]
    pub fn inverse_transform_point(&self, point: Vector) -> Vector {
        self.rotation.inv_rotate(point - self.position)
    }

    /// Convert to a nalgebra isometry
    pub fn to_nalgebra(&self) -> na::Isometry2<f32> {
        na::Isometry2::from_parts(
            na::Translation2::new(self.position.x, self.position.y),
            self.rotation.to_nalgebra(),
        )
    }
}
