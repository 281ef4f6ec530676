use crate::error::EngineError;
use crate::math::{Aabb, Point};
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// A closed polygon outline authored in pixels.
///
/// The outline does not need to be convex; the solver works with its convex
/// hull once the owning actor is attached to a scene.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Creates a polygon from at least three points
    pub fn new(points: &[Point]) -> Result<Self> {
        if points.len() < 3 {
            return Err(EngineError::Precondition(format!(
                "a polygon needs at least 3 points, got {}",
                points.len()
            )));
        }

        if points.iter().any(|p| !p.is_finite()) {
            return Err(EngineError::Precondition(
                "polygon points must be finite".to_string(),
            ));
        }

        Ok(Self {
            points: points.to_vec(),
        })
    }

    /// Returns the outline points
    pub fn get_points(&self) -> &[Point] {
        &self.points
    }

    /// Returns the bounding box of the outline
    pub fn bounds(&self) -> Aabb {
        // At least three points are guaranteed by construction
        Aabb::from_points(&self.points).unwrap_or_else(Aabb::empty)
    }

    /// Returns a copy with every point multiplied by `factor`
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            points: self.points.iter().map(|p| *p * factor).collect(),
        }
    }
}
