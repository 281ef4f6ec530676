mod vector;
mod transform;
mod aabb;

pub use vector::{Vector, Point};
pub use transform::{Transform, Rot};
pub use aabb::Aabb;

/// Tolerance for lengths and areas treated as zero
pub const EPSILON: f32 = 1.0e-6;

/// Returns true if the value is approximately zero
#[inline]
pub fn approx_zero(a: f32) -> bool {
    a.abs() < EPSILON
}

/// Clamps a value between a minimum and maximum value
#[inline]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}
