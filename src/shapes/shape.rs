use crate::error::EngineError;
use crate::math::{Aabb, Point, Vector};
use crate::shapes::{ConvexShape, Polygon};
use crate::Result;

use std::sync::Arc;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// An immutable shape description.
///
/// Shapes are authored in the actor's local frame. Actors author them in
/// pixels; `to_meters` converts them with the scene scale when a body is built.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Shape {
    /// Closed outline of at least three points
    Polygon(Polygon),

    /// Axis-aligned rectangle with its lower-left corner at `(x, y)`
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },

    /// Circle around `center`
    Circle {
        center: Point,
        radius: f32,
    },

    /// Several shapes attached to the same body
    Compound(Vec<Shape>),
}

/// Lazily produces the shape of an actor
pub type ShapeSupplier = Arc<dyn Fn() -> Shape + Send + Sync>;

impl Shape {
    /// Creates a rectangle, rejecting non-positive extents
    pub fn rect(x: f32, y: f32, width: f32, height: f32) -> Result<Self> {
        if !(width > 0.0 && height > 0.0) || !x.is_finite() || !y.is_finite() {
            return Err(EngineError::Precondition(format!(
                "rectangle needs finite position and positive extent, got {}x{}",
                width, height
            )));
        }

        Ok(Shape::Rect { x, y, width, height })
    }

    /// Creates a circle, rejecting non-positive radii
    pub fn circle(center: Point, radius: f32) -> Result<Self> {
        if !(radius > 0.0) || !center.is_finite() {
            return Err(EngineError::Precondition(format!(
                "circle needs a finite center and positive radius, got {}",
                radius
            )));
        }

        Ok(Shape::Circle { center, radius })
    }

    /// Creates a polygon from at least three points
    pub fn polygon(points: &[Point]) -> Result<Self> {
        Polygon::new(points).map(Shape::Polygon)
    }

    /// Creates a compound of one or more shapes
    pub fn compound(shapes: Vec<Shape>) -> Result<Self> {
        if shapes.is_empty() {
            return Err(EngineError::Precondition(
                "a compound shape needs at least one part".to_string(),
            ));
        }

        Ok(Shape::Compound(shapes))
    }

    /// Returns the shape type name
    pub fn shape_type(&self) -> &'static str {
        match self {
            Shape::Polygon(_) => "Polygon",
            Shape::Rect { .. } => "Rect",
            Shape::Circle { .. } => "Circle",
            Shape::Compound(_) => "Compound",
        }
    }

    /// Returns a copy with every length multiplied by `factor`
    pub fn scaled(&self, factor: f32) -> Self {
        match self {
            Shape::Polygon(polygon) => Shape::Polygon(polygon.scaled(factor)),
            Shape::Rect { x, y, width, height } => Shape::Rect {
                x: x * factor,
                y: y * factor,
                width: width * factor,
                height: height * factor,
            },
            Shape::Circle { center, radius } => Shape::Circle {
                center: *center * factor,
                radius: radius * factor,
            },
            Shape::Compound(parts) => {
                Shape::Compound(parts.iter().map(|part| part.scaled(factor)).collect())
            }
        }
    }

    /// Converts a pixel-authored shape to metres
    pub fn to_meters(&self, pixels_per_meter: f32) -> Self {
        self.scaled(1.0 / pixels_per_meter)
    }

    /// Converts a shape in metres back to pixels
    pub fn to_pixels(&self, pixels_per_meter: f32) -> Self {
        self.scaled(pixels_per_meter)
    }

    /// Returns the bounding box of the shape in its local frame
    pub fn local_bounds(&self) -> Aabb {
        match self {
            Shape::Polygon(polygon) => polygon.bounds(),
            Shape::Rect { x, y, width, height } => {
                Aabb::new(Vector::new(*x, *y), Vector::new(x + width, y + height))
            }
            Shape::Circle { center, radius } => {
                Aabb::from_center_half_extents(*center, Vector::new(*radius, *radius))
            }
            Shape::Compound(parts) => parts
                .iter()
                .fold(Aabb::empty(), |acc, part| acc.union(&part.local_bounds())),
        }
    }

    /// Flattens the shape into the convex parts the solver attaches as fixtures
    pub fn convex_parts(&self) -> Result<Vec<ConvexShape>> {
        let mut parts = Vec::new();
        self.collect_convex_parts(&mut parts)?;
        Ok(parts)
    }

    fn collect_convex_parts(&self, parts: &mut Vec<ConvexShape>) -> Result<()> {
        match self {
            Shape::Polygon(polygon) => {
                parts.push(ConvexShape::polygon_hull(polygon.get_points())?);
            }
            Shape::Rect { x, y, width, height } => {
                let corners = [
                    Vector::new(*x, *y),
                    Vector::new(x + width, *y),
                    Vector::new(x + width, y + height),
                    Vector::new(*x, y + height),
                ];
                parts.push(ConvexShape::polygon_hull(&corners)?);
            }
            Shape::Circle { center, radius } => {
                parts.push(ConvexShape::circle(*center, *radius));
            }
            Shape::Compound(children) => {
                for child in children {
                    child.collect_convex_parts(parts)?;
                }
            }
        }

        Ok(())
    }

    /// Rebuilds a descriptor from the convex parts of a live body
    pub fn from_convex_parts(parts: &[ConvexShape]) -> Self {
        match parts {
            [single] => single.to_shape(),
            _ => Shape::Compound(parts.iter().map(ConvexShape::to_shape).collect()),
        }
    }
}
