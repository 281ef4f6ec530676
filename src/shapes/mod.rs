mod shape;
mod polygon;
mod convex;

pub use self::shape::{Shape, ShapeSupplier};
pub use self::polygon::Polygon;
pub use self::convex::{ConvexShape, ConvexPolygon, MassData};
