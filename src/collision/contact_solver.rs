use crate::collision::collision_pair::Contact;
use crate::collision::contact_manifold::ContactManifold;
use crate::core::SimulationConfig;
use crate::math::{clamp, Point, Rot, Transform, Vector};

/// Per-step copy of the state of a body the solver works on
#[derive(Debug, Clone, Copy)]
pub struct SolverBody {
    /// Center of mass in world space
    pub center: Point,

    /// Rotation angle
    pub angle: f32,

    /// Linear velocity
    pub linear_velocity: Vector,

    /// Angular velocity
    pub angular_velocity: f32,

    /// Inverse mass (zero for static and kinematic bodies)
    pub inv_mass: f32,

    /// Inverse rotational inertia about the center of mass
    pub inv_inertia: f32,

    /// Center of mass in body coordinates
    pub local_center: Vector,
}

impl SolverBody {
    /// Returns the body transform implied by the current center and angle
    pub fn transform(&self) -> Transform {
        let rotation = Rot::from_angle(self.angle);
        Transform {
            position: self.center - rotation.rotate(self.local_center),
            rotation,
        }
    }

    /// Velocity of a point at offset `r` from the center of mass
    fn point_velocity(&self, r: Vector) -> Vector {
        self.linear_velocity + Vector::cross_scalar_left(self.angular_velocity, r)
    }
}

/// Trait for contact constraint solvers
pub trait ContactSolver {
    /// Builds constraints for the given contacts. Each entry carries the
    /// solver body indices of fixture A and fixture B.
    fn prepare(&mut self, contacts: &[(usize, usize, &Contact)], bodies: &[SolverBody]);

    /// Runs one velocity iteration
    fn solve_velocity(&mut self, bodies: &mut [SolverBody]);

    /// Runs one position iteration. Returns true once every contact is
    /// within tolerance.
    fn solve_position(&mut self, bodies: &mut [SolverBody]) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct VelocityPoint {
    r_a: Vector,
    r_b: Vector,
    normal_impulse: f32,
    tangent_impulse: f32,
    normal_mass: f32,
    tangent_mass: f32,
    velocity_bias: f32,
}

#[derive(Debug, Clone)]
struct ContactConstraint {
    index_a: usize,
    index_b: usize,
    normal: Vector,
    friction: f32,
    points: Vec<VelocityPoint>,
    manifold: ContactManifold,
}

/// Sequential impulse contact solver with pseudo-position correction
#[derive(Debug)]
pub struct SequentialImpulseSolver {
    /// Bias factor for position correction (Baumgarte stabilization)
    baumgarte: f32,

    /// Penetration allowed before correction kicks in
    linear_slop: f32,

    /// Largest correction applied in one iteration
    max_linear_correction: f32,

    /// Relative approach speed below which contacts do not bounce
    restitution_threshold: f32,

    constraints: Vec<ContactConstraint>,
}

impl SequentialImpulseSolver {
    /// Creates a solver using the tolerances of `config`
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            baumgarte: config.baumgarte,
            linear_slop: config.linear_slop,
            max_linear_correction: config.max_linear_correction,
            restitution_threshold: config.restitution_threshold,
            constraints: Vec::new(),
        }
    }

    /// Returns the number of active contact constraints
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}

impl ContactSolver for SequentialImpulseSolver {
    fn prepare(&mut self, contacts: &[(usize, usize, &Contact)], bodies: &[SolverBody]) {
        self.constraints.clear();

        for (index_a, index_b, contact) in contacts {
            let manifold = match &contact.manifold {
                Some(manifold) if !contact.is_sensor => manifold,
                _ => continue,
            };

            let body_a = &bodies[*index_a];
            let body_b = &bodies[*index_b];

            let world = manifold.world_manifold(&body_a.transform(), &body_b.transform());
            let normal = world.normal;
            let tangent = normal.cross_scalar(1.0);

            let points = world
                .points
                .iter()
                .map(|wp| {
                    let r_a = wp.point - body_a.center;
                    let r_b = wp.point - body_b.center;

                    let rn_a = r_a.cross(&normal);
                    let rn_b = r_b.cross(&normal);
                    let k_normal = body_a.inv_mass
                        + body_b.inv_mass
                        + body_a.inv_inertia * rn_a * rn_a
                        + body_b.inv_inertia * rn_b * rn_b;

                    let rt_a = r_a.cross(&tangent);
                    let rt_b = r_b.cross(&tangent);
                    let k_tangent = body_a.inv_mass
                        + body_b.inv_mass
                        + body_a.inv_inertia * rt_a * rt_a
                        + body_b.inv_inertia * rt_b * rt_b;

                    let relative = body_b.point_velocity(r_b) - body_a.point_velocity(r_a);
                    let approach = normal.dot(&relative);
                    let velocity_bias = if approach < -self.restitution_threshold {
                        -contact.restitution * approach
                    } else {
                        0.0
                    };

                    VelocityPoint {
                        r_a,
                        r_b,
                        normal_impulse: 0.0,
                        tangent_impulse: 0.0,
                        normal_mass: if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 },
                        tangent_mass: if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 },
                        velocity_bias,
                    }
                })
                .collect();

            self.constraints.push(ContactConstraint {
                index_a: *index_a,
                index_b: *index_b,
                normal,
                friction: contact.friction,
                points,
                manifold: manifold.clone(),
            });
        }
    }

    fn solve_velocity(&mut self, bodies: &mut [SolverBody]) {
        for constraint in &mut self.constraints {
            let mut a = bodies[constraint.index_a];
            let mut b = bodies[constraint.index_b];

            let normal = constraint.normal;
            let tangent = normal.cross_scalar(1.0);

            // Friction first so the normal impulse is the last word
            for point in &mut constraint.points {
                let dv = b.point_velocity(point.r_b) - a.point_velocity(point.r_a);
                let lambda = point.tangent_mass * -dv.dot(&tangent);

                let max_friction = constraint.friction * point.normal_impulse;
                let new_impulse = clamp(point.tangent_impulse + lambda, -max_friction, max_friction);
                let lambda = new_impulse - point.tangent_impulse;
                point.tangent_impulse = new_impulse;

                apply_impulse(&mut a, &mut b, point, tangent * lambda);
            }

            for point in &mut constraint.points {
                let dv = b.point_velocity(point.r_b) - a.point_velocity(point.r_a);
                let lambda = -point.normal_mass * (dv.dot(&normal) - point.velocity_bias);

                let new_impulse = (point.normal_impulse + lambda).max(0.0);
                let lambda = new_impulse - point.normal_impulse;
                point.normal_impulse = new_impulse;

                apply_impulse(&mut a, &mut b, point, normal * lambda);
            }

            bodies[constraint.index_a] = a;
            bodies[constraint.index_b] = b;
        }
    }

    fn solve_position(&mut self, bodies: &mut [SolverBody]) -> bool {
        let mut min_separation = 0.0_f32;

        for constraint in &self.constraints {
            let mut a = bodies[constraint.index_a];
            let mut b = bodies[constraint.index_b];

            for index in 0..constraint.manifold.point_count() {
                let (normal, point, separation) =
                    constraint.manifold.position_point(&a.transform(), &b.transform(), index);

                let r_a = point - a.center;
                let r_b = point - b.center;
                min_separation = min_separation.min(separation);

                let correction = clamp(
                    self.baumgarte * (separation + self.linear_slop),
                    -self.max_linear_correction,
                    0.0,
                );

                let rn_a = r_a.cross(&normal);
                let rn_b = r_b.cross(&normal);
                let k = a.inv_mass + b.inv_mass + a.inv_inertia * rn_a * rn_a + b.inv_inertia * rn_b * rn_b;
                let impulse = if k > 0.0 { -correction / k } else { 0.0 };
                let p = normal * impulse;

                a.center -= p * a.inv_mass;
                a.angle -= a.inv_inertia * r_a.cross(&p);
                b.center += p * b.inv_mass;
                b.angle += b.inv_inertia * r_b.cross(&p);
            }

            bodies[constraint.index_a] = a;
            bodies[constraint.index_b] = b;
        }

        min_separation >= -3.0 * self.linear_slop
    }
}

fn apply_impulse(a: &mut SolverBody, b: &mut SolverBody, point: &VelocityPoint, impulse: Vector) {
    a.linear_velocity -= impulse * a.inv_mass;
    a.angular_velocity -= a.inv_inertia * point.r_a.cross(&impulse);
    b.linear_velocity += impulse * b.inv_mass;
    b.angular_velocity += b.inv_inertia * point.r_b.cross(&impulse);
}
