use crate::error::EngineError;
use crate::math::{Aabb, Point, Transform, Vector};
use crate::shapes::{Polygon, Shape};
use crate::Result;

/// Mass properties of a shape or body.
///
/// `inertia` is the rotational inertia about the body origin, matching what
/// the solver reports through `RigidBody::get_mass_data`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MassData {
    /// Mass in kilograms
    pub mass: f32,

    /// Center of mass relative to the body origin
    pub center: Vector,

    /// Rotational inertia about the body origin
    pub inertia: f32,
}

/// A convex polygon with counter-clockwise vertices and outward edge normals
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolygon {
    vertices: Vec<Point>,
    normals: Vec<Vector>,
    centroid: Point,
}

impl ConvexPolygon {
    /// Returns the counter-clockwise vertices
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Returns the outward normal of each edge `vertices[i] -> vertices[i + 1]`
    pub fn normals(&self) -> &[Vector] {
        &self.normals
    }

    /// Returns the area centroid
    pub fn centroid(&self) -> Point {
        self.centroid
    }
}

/// The convex primitive a fixture is built from (metres, body-local)
#[derive(Debug, Clone, PartialEq)]
pub enum ConvexShape {
    Circle {
        center: Point,
        radius: f32,
    },
    Polygon(ConvexPolygon),
}

impl ConvexShape {
    /// Creates a circle primitive
    pub fn circle(center: Point, radius: f32) -> Self {
        ConvexShape::Circle { center, radius }
    }

    /// Creates a convex polygon from the hull of the given points
    pub fn polygon_hull(points: &[Point]) -> Result<Self> {
        let hull = convex_hull(points);

        if hull.len() < 3 {
            return Err(EngineError::Precondition(format!(
                "polygon is degenerate: its convex hull has {} points",
                hull.len()
            )));
        }

        let count = hull.len();
        let normals = (0..count)
            .map(|i| {
                let edge = hull[(i + 1) % count] - hull[i];
                Vector::new(edge.y, -edge.x).normalize()
            })
            .collect();

        let centroid = polygon_centroid(&hull);

        Ok(ConvexShape::Polygon(ConvexPolygon {
            vertices: hull,
            normals,
            centroid,
        }))
    }

    /// Computes mass properties for the given density
    pub fn compute_mass(&self, density: f32) -> MassData {
        match self {
            ConvexShape::Circle { center, radius } => {
                let mass = density * std::f32::consts::PI * radius * radius;
                MassData {
                    mass,
                    center: *center,
                    inertia: mass * (0.5 * radius * radius + center.dot(center)),
                }
            }
            ConvexShape::Polygon(polygon) => polygon_mass(&polygon.vertices, density),
        }
    }

    /// Computes the world-space bounding box under `transform`
    pub fn compute_aabb(&self, transform: &Transform) -> Aabb {
        match self {
            ConvexShape::Circle { center, radius } => {
                let p = transform.transform_point(*center);
                Aabb::from_center_half_extents(p, Vector::new(*radius, *radius))
            }
            ConvexShape::Polygon(polygon) => {
                let mut aabb = Aabb::empty();
                for vertex in &polygon.vertices {
                    aabb.expand_to_include_point(transform.transform_point(*vertex));
                }
                aabb
            }
        }
    }

    /// Tests whether a world-space point lies inside the shape
    pub fn test_point(&self, transform: &Transform, point: Point) -> bool {
        let local = transform.inverse_transform_point(point);

        match self {
            ConvexShape::Circle { center, radius } => {
                local.distance_squared(center) <= radius * radius
            }
            ConvexShape::Polygon(polygon) => polygon
                .vertices
                .iter()
                .zip(&polygon.normals)
                .all(|(vertex, normal)| normal.dot(&(local - *vertex)) <= 0.0),
        }
    }

    /// Converts the primitive back into a shape descriptor
    pub fn to_shape(&self) -> Shape {
        match self {
            ConvexShape::Circle { center, radius } => Shape::Circle {
                center: *center,
                radius: *radius,
            },
            ConvexShape::Polygon(polygon) => match Polygon::new(&polygon.vertices) {
                Ok(outline) => Shape::Polygon(outline),
                // Hull construction guarantees three vertices
                Err(_) => Shape::Compound(Vec::new()),
            },
        }
    }
}

/// Andrew's monotone chain. Returns the hull counter-clockwise without
/// collinear points.
fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted: Vec<Point> = points.to_vec();
    sorted.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    sorted.dedup_by(|a, b| a.distance_squared(b) < crate::math::EPSILON * crate::math::EPSILON);

    if sorted.len() < 3 {
        return sorted;
    }

    let turn = |o: Point, a: Point, b: Point| (a - o).cross(&(b - o));
    let mut hull: Vec<Point> = Vec::with_capacity(sorted.len() * 2);

    // Lower hull
    for &p in &sorted {
        while hull.len() >= 2 && turn(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    // Upper hull
    let lower_len = hull.len() + 1;
    for &p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len && turn(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    hull.pop();
    hull
}

fn polygon_centroid(vertices: &[Point]) -> Point {
    let mass = polygon_mass(vertices, 1.0);
    mass.center
}

fn polygon_mass(vertices: &[Point], density: f32) -> MassData {
    let count = vertices.len();
    let reference = vertices[0];

    let mut center = Vector::zero();
    let mut area = 0.0;
    let mut inertia = 0.0;
    const INV3: f32 = 1.0 / 3.0;

    for i in 0..count {
        let e1 = vertices[i] - reference;
        let e2 = vertices[(i + 1) % count] - reference;

        let d = e1.cross(&e2);
        let triangle_area = 0.5 * d;
        area += triangle_area;

        // Area weighted centroid
        center += (e1 + e2) * (triangle_area * INV3);

        let int_x2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
        let int_y2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
        inertia += (0.25 * INV3 * d) * (int_x2 + int_y2);
    }

    let mass = density * area;
    if area > crate::math::EPSILON {
        center /= area;
    }
    let world_center = center + reference;

    // Inertia about the reference point, shifted to the centroid and then to the origin
    let inertia = density * inertia + mass * (world_center.dot(&world_center) - center.dot(&center));

    MassData {
        mass,
        center: world_center,
        inertia,
    }
}
