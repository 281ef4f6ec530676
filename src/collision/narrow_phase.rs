use crate::collision::contact_manifold::{ContactManifold, ManifoldPoint, ManifoldType};
use crate::math::{Point, Transform, Vector};
use crate::shapes::{ConvexPolygon, ConvexShape};

/// Tolerance that prefers face A over face B when both separate equally
const FACE_TOLERANCE: f32 = 0.1 * 0.005;

/// Computes the contact manifold of two convex shapes.
///
/// Returns `None` when the shapes do not touch. The manifold normal points
/// from `shape_a` to `shape_b`.
pub fn collide(shape_a: &ConvexShape, xf_a: &Transform, shape_b: &ConvexShape, xf_b: &Transform) -> Option<ContactManifold> {
    match (shape_a, shape_b) {
        (
            ConvexShape::Circle { center: ca, radius: ra },
            ConvexShape::Circle { center: cb, radius: rb },
        ) => collide_circles(*ca, *ra, xf_a, *cb, *rb, xf_b),
        (ConvexShape::Polygon(poly), ConvexShape::Circle { center, radius }) => {
            collide_polygon_and_circle(poly, xf_a, *center, *radius, xf_b)
        }
        (ConvexShape::Circle { center, radius }, ConvexShape::Polygon(poly)) => {
            // Swap roles, then flip the manifold back
            let manifold = collide_polygon_and_circle(poly, xf_b, *center, *radius, xf_a)?;
            Some(flip_circle_manifold(manifold))
        }
        (ConvexShape::Polygon(a), ConvexShape::Polygon(b)) => collide_polygons(a, xf_a, b, xf_b),
    }
}

fn collide_circles(center_a: Point, radius_a: f32, xf_a: &Transform, center_b: Point, radius_b: f32, xf_b: &Transform) -> Option<ContactManifold> {
    let p_a = xf_a.transform_point(center_a);
    let p_b = xf_b.transform_point(center_b);

    let radius = radius_a + radius_b;
    if p_a.distance_squared(&p_b) > radius * radius {
        return None;
    }

    let mut manifold = ContactManifold::new(ManifoldType::Circles, Vector::zero(), center_a, radius_a, radius_b);
    manifold.points.push(ManifoldPoint { local_point: center_b });
    Some(manifold)
}

fn collide_polygon_and_circle(polygon: &ConvexPolygon, xf_a: &Transform, center: Point, radius: f32, xf_b: &Transform) -> Option<ContactManifold> {
    // Circle center in the polygon's frame
    let c = xf_a.inverse_transform_point(xf_b.transform_point(center));

    let vertices = polygon.vertices();
    let normals = polygon.normals();
    let count = vertices.len();

    let mut normal_index = 0;
    let mut separation = f32::MIN;
    for i in 0..count {
        let s = normals[i].dot(&(c - vertices[i]));
        if s > radius {
            return None;
        }
        if s > separation {
            separation = s;
            normal_index = i;
        }
    }

    let v1 = vertices[normal_index];
    let v2 = vertices[(normal_index + 1) % count];

    let (local_normal, local_point) = if separation < f32::EPSILON {
        // Center inside the polygon
        (normals[normal_index], (v1 + v2) * 0.5)
    } else {
        let u1 = (c - v1).dot(&(v2 - v1));
        let u2 = (c - v2).dot(&(v1 - v2));

        if u1 <= 0.0 {
            if c.distance_squared(&v1) > radius * radius {
                return None;
            }
            ((c - v1).normalize(), v1)
        } else if u2 <= 0.0 {
            if c.distance_squared(&v2) > radius * radius {
                return None;
            }
            ((c - v2).normalize(), v2)
        } else {
            let face_center = (v1 + v2) * 0.5;
            if (c - face_center).dot(&normals[normal_index]) > radius {
                return None;
            }
            (normals[normal_index], face_center)
        }
    };

    let mut manifold = ContactManifold::new(ManifoldType::FaceA, local_normal, local_point, 0.0, radius);
    manifold.points.push(ManifoldPoint { local_point: center });
    Some(manifold)
}

/// Turns a polygon(B)-circle(A) manifold computed with swapped roles into
/// one whose reference face lives on B.
fn flip_circle_manifold(manifold: ContactManifold) -> ContactManifold {
    let mut flipped = ContactManifold::new(
        ManifoldType::FaceB,
        manifold.local_normal,
        manifold.local_point,
        manifold.radius_b,
        manifold.radius_a,
    );
    flipped.points = manifold.points;
    flipped
}

/// Finds the edge of `poly1` with the largest separation from `poly2`
fn find_max_separation(poly1: &ConvexPolygon, xf1: &Transform, poly2: &ConvexPolygon, xf2: &Transform) -> (usize, f32) {
    let others: Vec<Point> = poly2.vertices().iter().map(|v| xf2.transform_point(*v)).collect();

    let mut best_index = 0;
    let mut max_separation = f32::MIN;

    for (i, (vertex, normal)) in poly1.vertices().iter().zip(poly1.normals()).enumerate() {
        let n = xf1.rotation.rotate(*normal);
        let v = xf1.transform_point(*vertex);

        let si = others
            .iter()
            .map(|other| n.dot(&(*other - v)))
            .fold(f32::MAX, f32::min);

        if si > max_separation {
            max_separation = si;
            best_index = i;
        }
    }

    (best_index, max_separation)
}

/// Returns the world-space edge of `poly2` most anti-parallel to edge `edge1` of `poly1`
fn find_incident_edge(poly1: &ConvexPolygon, xf1: &Transform, edge1: usize, poly2: &ConvexPolygon, xf2: &Transform) -> [Point; 2] {
    let normal1 = xf1.rotation.rotate(poly1.normals()[edge1]);

    let mut index = 0;
    let mut min_dot = f32::MAX;
    for (i, normal) in poly2.normals().iter().enumerate() {
        let dot = normal1.dot(&xf2.rotation.rotate(*normal));
        if dot < min_dot {
            min_dot = dot;
            index = i;
        }
    }

    let count = poly2.vertices().len();
    [
        xf2.transform_point(poly2.vertices()[index]),
        xf2.transform_point(poly2.vertices()[(index + 1) % count]),
    ]
}

/// Sutherland-Hodgman clipping of a segment against the half plane `normal · p <= offset`
fn clip_segment_to_line(input: &[Point; 2], normal: Vector, offset: f32) -> Vec<Point> {
    let mut output = Vec::with_capacity(2);

    let distance0 = normal.dot(&input[0]) - offset;
    let distance1 = normal.dot(&input[1]) - offset;

    if distance0 <= 0.0 {
        output.push(input[0]);
    }
    if distance1 <= 0.0 {
        output.push(input[1]);
    }

    if distance0 * distance1 < 0.0 {
        let interp = distance0 / (distance0 - distance1);
        output.push(input[0] + (input[1] - input[0]) * interp);
    }

    output
}

fn collide_polygons(poly_a: &ConvexPolygon, xf_a: &Transform, poly_b: &ConvexPolygon, xf_b: &Transform) -> Option<ContactManifold> {
    let total_radius = 0.0;

    let (edge_a, separation_a) = find_max_separation(poly_a, xf_a, poly_b, xf_b);
    if separation_a > total_radius {
        return None;
    }

    let (edge_b, separation_b) = find_max_separation(poly_b, xf_b, poly_a, xf_a);
    if separation_b > total_radius {
        return None;
    }

    let (poly1, xf1, poly2, xf2, edge1, manifold_type) = if separation_b > separation_a + FACE_TOLERANCE {
        (poly_b, xf_b, poly_a, xf_a, edge_b, ManifoldType::FaceB)
    } else {
        (poly_a, xf_a, poly_b, xf_b, edge_a, ManifoldType::FaceA)
    };

    let incident = find_incident_edge(poly1, xf1, edge1, poly2, xf2);

    let count1 = poly1.vertices().len();
    let v11 = poly1.vertices()[edge1];
    let v12 = poly1.vertices()[(edge1 + 1) % count1];

    let local_tangent = (v12 - v11).normalize();
    let local_normal = local_tangent.cross_scalar(1.0);
    let plane_point = (v11 + v12) * 0.5;

    let tangent = xf1.rotation.rotate(local_tangent);
    let normal = tangent.cross_scalar(1.0);

    let v11 = xf1.transform_point(v11);
    let v12 = xf1.transform_point(v12);

    let front_offset = normal.dot(&v11);
    let side_offset1 = -tangent.dot(&v11) + total_radius;
    let side_offset2 = tangent.dot(&v12) + total_radius;

    let clip1 = clip_segment_to_line(&incident, -tangent, side_offset1);
    if clip1.len() < 2 {
        return None;
    }

    let clip2 = clip_segment_to_line(&[clip1[0], clip1[1]], tangent, side_offset2);
    if clip2.len() < 2 {
        return None;
    }

    let mut manifold = ContactManifold::new(manifold_type, local_normal, plane_point, 0.0, 0.0);

    for point in clip2.iter().take(2) {
        let separation = normal.dot(point) - front_offset;
        if separation <= total_radius {
            manifold.points.push(ManifoldPoint {
                local_point: xf2.inverse_transform_point(*point),
            });
        }
    }

    if manifold.points.is_empty() {
        None
    } else {
        Some(manifold)
    }
}
