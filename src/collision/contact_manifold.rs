use crate::math::{Point, Transform, Vector};

/// Which frame a manifold's reference geometry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifoldType {
    /// Circle against circle: `local_point` is circle A's center
    Circles,

    /// Reference face on shape A
    FaceA,

    /// Reference face on shape B
    FaceB,
}

/// A single contact point stored in the incident shape's frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManifoldPoint {
    /// Circles/FaceA: point on B in B's frame. FaceB: point on A in A's frame.
    pub local_point: Point,
}

/// Contact geometry between two convex shapes, kept in body-local
/// coordinates so position correction can re-evaluate it as bodies move.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactManifold {
    /// The kind of reference geometry
    pub manifold_type: ManifoldType,

    /// Reference face normal (unused for circles)
    pub local_normal: Vector,

    /// Reference point on the reference shape
    pub local_point: Point,

    /// Up to two contact points
    pub points: Vec<ManifoldPoint>,

    /// Radius of shape A (zero for polygons)
    pub radius_a: f32,

    /// Radius of shape B (zero for polygons)
    pub radius_b: f32,
}

impl ContactManifold {
    pub(crate) fn new(manifold_type: ManifoldType, local_normal: Vector, local_point: Point, radius_a: f32, radius_b: f32) -> Self {
        Self {
            manifold_type,
            local_normal,
            local_point,
            points: Vec::with_capacity(2),
            radius_a,
            radius_b,
        }
    }

    /// Returns the number of contact points
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the shapes touch
    pub fn is_touching(&self) -> bool {
        !self.points.is_empty()
    }

    /// Evaluates the manifold in world space
    pub fn world_manifold(&self, xf_a: &Transform, xf_b: &Transform) -> WorldManifold {
        let mut result = WorldManifold {
            normal: Vector::new(1.0, 0.0),
            points: Vec::with_capacity(self.points.len()),
        };

        if self.points.is_empty() {
            return result;
        }

        match self.manifold_type {
            ManifoldType::Circles => {
                let point_a = xf_a.transform_point(self.local_point);
                let point_b = xf_b.transform_point(self.points[0].local_point);

                if point_a.distance_squared(&point_b) > f32::EPSILON * f32::EPSILON {
                    result.normal = (point_b - point_a).normalize();
                }

                let c_a = point_a + result.normal * self.radius_a;
                let c_b = point_b - result.normal * self.radius_b;
                result.points.push(WorldPoint {
                    point: (c_a + c_b) * 0.5,
                    separation: (c_b - c_a).dot(&result.normal),
                });
            }
            ManifoldType::FaceA => {
                result.normal = xf_a.rotation.rotate(self.local_normal);
                let plane_point = xf_a.transform_point(self.local_point);

                for mp in &self.points {
                    let clip_point = xf_b.transform_point(mp.local_point);
                    let c_a = clip_point
                        + result.normal * (self.radius_a - (clip_point - plane_point).dot(&result.normal));
                    let c_b = clip_point - result.normal * self.radius_b;
                    result.points.push(WorldPoint {
                        point: (c_a + c_b) * 0.5,
                        separation: (c_b - c_a).dot(&result.normal),
                    });
                }
            }
            ManifoldType::FaceB => {
                let normal = xf_b.rotation.rotate(self.local_normal);
                let plane_point = xf_b.transform_point(self.local_point);

                for mp in &self.points {
                    let clip_point = xf_a.transform_point(mp.local_point);
                    let c_b = clip_point
                        + normal * (self.radius_b - (clip_point - plane_point).dot(&normal));
                    let c_a = clip_point - normal * self.radius_a;
                    result.points.push(WorldPoint {
                        point: (c_a + c_b) * 0.5,
                        separation: (c_a - c_b).dot(&normal),
                    });
                }

                // Always report the normal from A to B
                result.normal = -normal;
            }
        }

        result
    }

    /// Evaluates contact point `index` for position correction. Returns the
    /// normal from A to B, the contact point and the current separation.
    pub(crate) fn position_point(&self, xf_a: &Transform, xf_b: &Transform, index: usize) -> (Vector, Point, f32) {
        let total_radius = self.radius_a + self.radius_b;

        match self.manifold_type {
            ManifoldType::Circles => {
                let point_a = xf_a.transform_point(self.local_point);
                let point_b = xf_b.transform_point(self.points[0].local_point);
                let normal = (point_b - point_a).normalize();
                let point = (point_a + point_b) * 0.5;
                let separation = (point_b - point_a).dot(&normal) - total_radius;
                (normal, point, separation)
            }
            ManifoldType::FaceA => {
                let normal = xf_a.rotation.rotate(self.local_normal);
                let plane_point = xf_a.transform_point(self.local_point);
                let clip_point = xf_b.transform_point(self.points[index].local_point);
                let separation = (clip_point - plane_point).dot(&normal) - total_radius;
                (normal, clip_point, separation)
            }
            ManifoldType::FaceB => {
                let normal = xf_b.rotation.rotate(self.local_normal);
                let plane_point = xf_b.transform_point(self.local_point);
                let clip_point = xf_a.transform_point(self.points[index].local_point);
                let separation = (clip_point - plane_point).dot(&normal) - total_radius;
                (-normal, clip_point, separation)
            }
        }
    }
}

/// A contact point in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPoint {
    /// Midpoint between the two surfaces
    pub point: Point,

    /// Negative when the shapes overlap
    pub separation: f32,
}

/// A manifold evaluated in world space
#[derive(Debug, Clone, PartialEq)]
pub struct WorldManifold {
    /// Unit normal pointing from A to B
    pub normal: Vector,

    /// Up to two contact points
    pub points: Vec<WorldPoint>,
}
