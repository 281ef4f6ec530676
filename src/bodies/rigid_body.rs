use crate::bodies::{body_flags::BodyFlags, Fixture, ForceType, RigidBodyType};
use crate::math::{Aabb, Point, Rot, Transform, Vector, EPSILON};
use crate::shapes::MassData;

/// A 2D rigid body for physics simulation
#[derive(Debug, Clone)]
pub struct RigidBody {
    /// Position of the body origin and its rotation
    transform: Transform,

    /// Unwrapped rotation angle in radians
    angle: f32,

    /// Center of mass in body coordinates
    local_center: Vector,

    /// Center of mass in world coordinates
    world_center: Point,

    /// Linear velocity of the center of mass
    linear_velocity: Vector,

    /// Angular velocity in radians per second
    angular_velocity: f32,

    /// Attached shapes
    fixtures: Vec<Fixture>,

    /// The body's type (dynamic, kinematic, or static)
    body_type: RigidBodyType,

    /// The body's mass
    mass: f32,

    /// Inverse of the body's mass
    inv_mass: f32,

    /// Rotational inertia about the center of mass
    inertia: f32,

    /// Inverse of the rotational inertia
    inv_inertia: f32,

    /// Multiplier applied to world gravity
    gravity_scale: f32,

    /// The body's linear damping
    linear_damping: f32,

    /// The body's angular damping
    angular_damping: f32,

    /// The body's flags
    flags: BodyFlags,

    /// How long the body has been resting
    sleep_time: f32,

    /// Force accumulated for the next step
    force: Vector,

    /// Torque accumulated for the next step
    torque: f32,
}

impl RigidBody {
    /// Creates a body without fixtures at the given origin and angle
    pub fn new(position: Point, angle: f32, body_type: RigidBodyType) -> Self {
        let mut flags = BodyFlags::CAN_SLEEP | BodyFlags::ACTIVE;
        if body_type != RigidBodyType::Static {
            flags.insert(BodyFlags::AWAKE);
        }

        let mut body = Self {
            transform: Transform::new(position, angle),
            angle,
            local_center: Vector::zero(),
            world_center: position,
            linear_velocity: Vector::zero(),
            angular_velocity: 0.0,
            fixtures: Vec::new(),
            body_type,
            mass: 0.0,
            inv_mass: 0.0,
            inertia: 0.0,
            inv_inertia: 0.0,
            gravity_scale: 1.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            flags,
            sleep_time: 0.0,
            force: Vector::zero(),
            torque: 0.0,
        };

        body.reset_mass_data();
        body
    }

    /// Creates a new dynamic body at the given position
    pub fn new_dynamic(position: Point) -> Self {
        Self::new(position, 0.0, RigidBodyType::Dynamic)
    }

    /// Creates a new static body at the given position
    pub fn new_static(position: Point) -> Self {
        Self::new(position, 0.0, RigidBodyType::Static)
    }

    /// Attaches a fixture and recomputes the mass data if it has density
    pub fn add_fixture(&mut self, fixture: Fixture) -> usize {
        let has_density = fixture.get_density() > 0.0;
        self.fixtures.push(fixture);

        if has_density {
            self.reset_mass_data();
        }

        self.fixtures.len() - 1
    }

    /// Returns the attached fixtures
    pub fn get_fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    /// Returns the attached fixtures for modification.
    ///
    /// Call `reset_mass_data` after changing densities.
    pub fn get_fixtures_mut(&mut self) -> &mut [Fixture] {
        &mut self.fixtures
    }

    /// Returns the body's transform
    pub fn get_transform(&self) -> Transform {
        self.transform
    }

    /// Moves the body origin to `position` and rotates it to `angle`
    pub fn set_transform(&mut self, position: Point, angle: f32) {
        self.angle = angle;
        self.transform = Transform::new(position, angle);
        self.world_center = self.transform.transform_point(self.local_center);
    }

    /// Returns the position of the body origin
    pub fn get_position(&self) -> Point {
        self.transform.position
    }

    /// Returns the rotation angle in radians
    pub fn get_angle(&self) -> f32 {
        self.angle
    }

    /// Returns the center of mass in world coordinates
    pub fn get_world_center(&self) -> Point {
        self.world_center
    }

    /// Returns the center of mass in body coordinates
    pub fn get_local_center(&self) -> Vector {
        self.local_center
    }

    /// Returns the body's linear velocity
    pub fn get_linear_velocity(&self) -> Vector {
        self.linear_velocity
    }

    /// Sets the body's linear velocity. Static bodies ignore this.
    pub fn set_linear_velocity(&mut self, velocity: Vector) {
        if self.body_type == RigidBodyType::Static {
            return;
        }

        if velocity.length_squared() > 0.0 {
            self.set_awake(true);
        }

        self.linear_velocity = velocity;
    }

    /// Returns the body's angular velocity
    pub fn get_angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Sets the body's angular velocity. Static bodies ignore this.
    pub fn set_angular_velocity(&mut self, velocity: f32) {
        if self.body_type == RigidBodyType::Static {
            return;
        }

        if velocity != 0.0 {
            self.set_awake(true);
        }

        self.angular_velocity = velocity;
    }

    /// Returns the body's type
    pub fn get_body_type(&self) -> RigidBodyType {
        self.body_type
    }

    /// Changes the body's type, recomputing mass and waking the body
    pub fn set_body_type(&mut self, body_type: RigidBodyType) {
        if self.body_type == body_type {
            return;
        }

        self.body_type = body_type;
        self.reset_mass_data();

        if body_type == RigidBodyType::Static {
            self.linear_velocity = Vector::zero();
            self.angular_velocity = 0.0;
            self.flags.remove(BodyFlags::AWAKE);
        } else {
            self.set_awake(true);
        }

        self.force = Vector::zero();
        self.torque = 0.0;
    }

    /// Returns the body's mass
    pub fn get_mass(&self) -> f32 {
        self.mass
    }

    /// Returns the inverse mass (zero for non-dynamic bodies)
    pub fn get_inverse_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Returns the rotational inertia about the body origin
    pub fn get_inertia(&self) -> f32 {
        self.inertia + self.mass * self.local_center.dot(&self.local_center)
    }

    /// Returns the inverse rotational inertia about the center of mass
    pub fn get_inverse_inertia(&self) -> f32 {
        self.inv_inertia
    }

    /// Returns mass, local center and inertia about the origin
    pub fn get_mass_data(&self) -> MassData {
        MassData {
            mass: self.mass,
            center: self.local_center,
            inertia: self.get_inertia(),
        }
    }

    /// Overrides the mass properties computed from the fixtures.
    ///
    /// Only dynamic bodies accept this. A non-positive mass becomes 1. The
    /// inertia is interpreted about the body origin; if shifting it to the
    /// new center of mass would leave it non-positive, the previous inertia
    /// about the center of mass is kept.
    pub fn set_mass_data(&mut self, data: &MassData) {
        if self.body_type != RigidBodyType::Dynamic {
            return;
        }

        self.mass = if data.mass > 0.0 { data.mass } else { 1.0 };
        self.inv_mass = 1.0 / self.mass;

        if data.inertia > 0.0 && !self.is_fixed_rotation() {
            let central = data.inertia - self.mass * data.center.dot(&data.center);
            if central > EPSILON {
                self.inertia = central;
            }
            self.inv_inertia = if self.inertia > 0.0 { 1.0 / self.inertia } else { 0.0 };
        } else {
            self.inertia = 0.0;
            self.inv_inertia = 0.0;
        }

        self.move_center(data.center);
    }

    /// Recomputes the mass properties from the fixtures
    pub fn reset_mass_data(&mut self) {
        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inertia = 0.0;
        self.inv_inertia = 0.0;

        if self.body_type != RigidBodyType::Dynamic {
            self.local_center = Vector::zero();
            self.world_center = self.transform.position;
            return;
        }

        let mut center = Vector::zero();
        let mut inertia = 0.0;

        for fixture in self.fixtures.iter().filter(|f| f.get_density() > 0.0) {
            let data = fixture.compute_mass();
            self.mass += data.mass;
            center += data.center * data.mass;
            inertia += data.inertia;
        }

        if self.mass > 0.0 {
            self.inv_mass = 1.0 / self.mass;
            center *= self.inv_mass;
        } else {
            // Dynamic bodies always move
            self.mass = 1.0;
            self.inv_mass = 1.0;
        }

        if inertia > 0.0 && !self.is_fixed_rotation() {
            self.inertia = inertia - self.mass * center.dot(&center);
            self.inv_inertia = if self.inertia > 0.0 { 1.0 / self.inertia } else { 0.0 };
        }

        self.move_center(center);
    }

    /// Moves the center of mass, keeping the velocity of the origin
    fn move_center(&mut self, local_center: Vector) {
        let old_center = self.world_center;
        self.local_center = local_center;
        self.world_center = self.transform.transform_point(local_center);

        let shift = self.world_center - old_center;
        self.linear_velocity += Vector::cross_scalar_left(self.angular_velocity, shift);
    }

    /// Returns the gravity multiplier
    pub fn get_gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    /// Sets the gravity multiplier
    pub fn set_gravity_scale(&mut self, scale: f32) {
        self.gravity_scale = scale;
    }

    /// Sets the body's linear damping
    pub fn set_linear_damping(&mut self, damping: f32) {
        self.linear_damping = damping.max(0.0);
    }

    /// Returns the body's linear damping
    pub fn get_linear_damping(&self) -> f32 {
        self.linear_damping
    }

    /// Sets the body's angular damping
    pub fn set_angular_damping(&mut self, damping: f32) {
        self.angular_damping = damping.max(0.0);
    }

    /// Returns the body's angular damping
    pub fn get_angular_damping(&self) -> f32 {
        self.angular_damping
    }

    /// Returns whether the body is simulated this step
    pub fn is_awake(&self) -> bool {
        self.flags.contains(BodyFlags::AWAKE)
    }

    /// Wakes the body or puts it to sleep. Sleeping clears velocity and
    /// accumulated forces. Static bodies never wake.
    pub fn set_awake(&mut self, awake: bool) {
        if awake {
            if self.body_type == RigidBodyType::Static {
                return;
            }
            if !self.is_awake() {
                self.flags.insert(BodyFlags::AWAKE);
                self.sleep_time = 0.0;
            }
        } else {
            self.flags.remove(BodyFlags::AWAKE);
            self.sleep_time = 0.0;
            self.linear_velocity = Vector::zero();
            self.angular_velocity = 0.0;
            self.force = Vector::zero();
            self.torque = 0.0;
        }
    }

    /// Returns whether the body can sleep
    pub fn can_sleep(&self) -> bool {
        self.flags.contains(BodyFlags::CAN_SLEEP)
    }

    /// Sets whether the body can sleep
    pub fn set_can_sleep(&mut self, can_sleep: bool) {
        self.flags.set(BodyFlags::CAN_SLEEP, can_sleep);
        if !can_sleep {
            self.set_awake(true);
        }
    }

    /// Returns whether the body takes part in the simulation
    pub fn is_active(&self) -> bool {
        self.flags.contains(BodyFlags::ACTIVE)
    }

    /// Includes or excludes the body from the simulation
    pub fn set_active(&mut self, active: bool) {
        self.flags.set(BodyFlags::ACTIVE, active);
    }

    /// Returns whether rotation is locked
    pub fn is_fixed_rotation(&self) -> bool {
        self.flags.contains(BodyFlags::FIXED_ROTATION)
    }

    /// Locks or unlocks rotation
    pub fn set_fixed_rotation(&mut self, fixed: bool) {
        if self.is_fixed_rotation() == fixed {
            return;
        }

        self.flags.set(BodyFlags::FIXED_ROTATION, fixed);
        self.angular_velocity = 0.0;
        self.reset_mass_data();
    }

    /// Returns the time the body has been resting
    pub fn get_sleep_time(&self) -> f32 {
        self.sleep_time
    }

    /// Advances the resting timer and returns it. Moving bodies reset it.
    pub(crate) fn update_sleep_time(&mut self, dt: f32, linear_tolerance: f32, angular_tolerance: f32) -> f32 {
        let moving = self.angular_velocity * self.angular_velocity > angular_tolerance * angular_tolerance
            || self.linear_velocity.length_squared() > linear_tolerance * linear_tolerance;

        if !self.can_sleep() || moving {
            self.sleep_time = 0.0;
        } else {
            self.sleep_time += dt;
        }

        self.sleep_time
    }

    /// Applies a force, torque or impulse. Only dynamic bodies respond; the
    /// body is woken.
    pub fn apply(&mut self, force: ForceType) {
        if self.body_type != RigidBodyType::Dynamic {
            return;
        }

        self.set_awake(true);

        match force {
            ForceType::Force(f) => {
                self.force += f;
            }
            ForceType::ForceAtPoint { force, point } => {
                self.force += force;
                self.torque += (point - self.world_center).cross(&force);
            }
            ForceType::Torque(torque) => {
                self.torque += torque;
            }
            ForceType::ImpulseAtPoint { impulse, point } => {
                self.linear_velocity += impulse * self.inv_mass;
                self.angular_velocity += self.inv_inertia * (point - self.world_center).cross(&impulse);
            }
            ForceType::AngularImpulse(impulse) => {
                self.angular_velocity += self.inv_inertia * impulse;
            }
        }
    }

    /// Applies a force at the center of mass
    pub fn apply_force(&mut self, force: Vector) {
        self.apply(ForceType::Force(force));
    }

    /// Applies a force at a world point
    pub fn apply_force_at_point(&mut self, force: Vector, point: Point) {
        self.apply(ForceType::ForceAtPoint { force, point });
    }

    /// Applies a torque
    pub fn apply_torque(&mut self, torque: f32) {
        self.apply(ForceType::Torque(torque));
    }

    /// Applies an impulse at a world point
    pub fn apply_linear_impulse(&mut self, impulse: Vector, point: Point) {
        self.apply(ForceType::ImpulseAtPoint { impulse, point });
    }

    /// Applies an angular impulse
    pub fn apply_angular_impulse(&mut self, impulse: f32) {
        self.apply(ForceType::AngularImpulse(impulse));
    }

    /// Returns the force accumulated for the next step
    pub fn get_force(&self) -> Vector {
        self.force
    }

    /// Returns the torque accumulated for the next step
    pub fn get_torque(&self) -> f32 {
        self.torque
    }

    /// Replaces the torque accumulated for the next step
    pub fn set_torque(&mut self, torque: f32) {
        self.torque = torque;
    }

    /// Clears accumulated force and torque
    pub fn clear_forces(&mut self) {
        self.force = Vector::zero();
        self.torque = 0.0;
    }

    /// Integrates gravity, forces and damping into the velocities
    pub fn integrate_velocities(&mut self, dt: f32, gravity: Vector) {
        if self.body_type != RigidBodyType::Dynamic || !self.is_awake() || !self.is_active() {
            return;
        }

        self.linear_velocity += (gravity * self.gravity_scale + self.force * self.inv_mass) * dt;
        self.angular_velocity += self.inv_inertia * self.torque * dt;

        self.linear_velocity *= 1.0 / (1.0 + dt * self.linear_damping);
        self.angular_velocity *= 1.0 / (1.0 + dt * self.angular_damping);
    }

    /// Writes back the solver state of the center of mass
    pub(crate) fn synchronize(&mut self, center: Point, angle: f32, linear_velocity: Vector, angular_velocity: f32) {
        self.world_center = center;
        self.angle = angle;
        self.linear_velocity = linear_velocity;
        self.angular_velocity = angular_velocity;

        let rotation = Rot::from_angle(angle);
        self.transform = Transform {
            position: center - rotation.rotate(self.local_center),
            rotation,
        };
    }

    /// Returns the union of the fixture AABBs, or a point box without fixtures
    pub fn compute_aabb(&self) -> Aabb {
        if self.fixtures.is_empty() {
            return Aabb::new(self.transform.position, self.transform.position);
        }

        self.fixtures
            .iter()
            .fold(Aabb::empty(), |acc, f| acc.union(&f.compute_aabb(&self.transform)))
    }

    /// Tests whether a world point lies inside any fixture
    pub fn test_point(&self, point: Point) -> bool {
        self.fixtures
            .iter()
            .any(|f| f.test_point(&self.transform, point))
    }
}
