use crate::bodies::{Fixture, Material, RigidBody};
use crate::math::{Aabb, Point, Transform, Vector};
use crate::physics::PhysicsType;
use crate::shapes::{ConvexShape, Shape, ShapeSupplier};
use crate::Result;

use std::fmt;
use std::sync::Arc;

/// Everything needed to (re)build a body.
///
/// Detached actors keep their physics settings here; attaching builds a body
/// from it, detaching captures a new snapshot from the live body.
#[derive(Clone)]
pub struct ProxyData {
    /// Position of the body origin in metres
    pub position: Point,

    /// Rotation in radians
    pub rotation: f32,

    /// Linear velocity in m/s
    pub velocity: Vector,

    /// Angular velocity in rad/s
    pub angular_velocity: f32,

    /// Game-level type
    pub physics_type: PhysicsType,

    /// Density applied to every fixture
    pub density: f32,

    /// Friction applied to every fixture
    pub friction: f32,

    /// Restitution applied to every fixture
    pub restitution: f32,

    /// Gravity multiplier
    pub gravity_scale: f32,

    /// Whether rotation is locked
    pub rotation_locked: bool,

    /// Whether every fixture is a sensor
    pub sensor: bool,

    /// Torque accumulated for the next step
    pub torque: f32,

    /// Mass replacing the one derived from density, if set
    pub mass: Option<f32>,

    /// Scale of the scene the actor was created for, or last part of
    pub pixels_per_meter: f32,

    shape: ShapeSupplier,
}

impl ProxyData {
    /// Creates fresh settings: static, at rest, density 10, friction 0.5,
    /// restitution 0.5. Shape queries use `pixels_per_meter` until the actor
    /// joins a world.
    pub fn new(shape: ShapeSupplier, pixels_per_meter: f32) -> Self {
        let material = Material::default();

        Self {
            position: Vector::zero(),
            rotation: 0.0,
            velocity: Vector::zero(),
            angular_velocity: 0.0,
            physics_type: PhysicsType::Static,
            density: material.density,
            friction: material.friction,
            restitution: material.restitution,
            gravity_scale: 1.0,
            rotation_locked: false,
            sensor: false,
            torque: 0.0,
            mass: None,
            pixels_per_meter,
            shape,
        }
    }

    /// Returns the shape supplier
    pub fn shape_supplier(&self) -> &ShapeSupplier {
        &self.shape
    }

    /// Produces the shape in pixels
    pub fn shape(&self) -> Shape {
        (self.shape)()
    }

    /// Returns the transform of the body origin
    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.rotation)
    }

    /// Returns the material applied to every fixture
    pub fn material(&self) -> Material {
        Material::new(self.density, self.friction, self.restitution)
    }

    fn convex_parts(&self, pixels_per_meter: f32) -> Result<Vec<ConvexShape>> {
        self.shape().to_meters(pixels_per_meter).convex_parts()
    }

    /// Builds a body with one fixture per convex part of the shape
    pub fn build_body(&self, pixels_per_meter: f32) -> Result<RigidBody> {
        let mut body = RigidBody::new(self.position, self.rotation, self.physics_type.body_type());
        let material = self.material();
        let filter = self.physics_type.filter();

        for part in self.convex_parts(pixels_per_meter)? {
            let mut fixture = Fixture::new(part, material);
            fixture.set_sensor(self.sensor);
            fixture.set_filter(filter);
            body.add_fixture(fixture);
        }

        body.set_fixed_rotation(self.rotation_locked);
        body.set_gravity_scale(self.gravity_scale);

        if let Some(mass) = self.mass {
            let mut data = body.get_mass_data();
            data.mass = mass;
            body.set_mass_data(&data);
        }

        body.set_linear_velocity(self.velocity);
        body.set_angular_velocity(self.angular_velocity);
        body.set_torque(self.torque);

        Ok(body)
    }

    /// Captures the state of a live body. The shape becomes a fixed
    /// snapshot of its fixtures, converted back to pixels.
    pub fn from_body(body: &RigidBody, physics_type: PhysicsType, pixels_per_meter: f32) -> Self {
        let fixtures = body.get_fixtures();
        let material = fixtures
            .first()
            .map(Fixture::get_material)
            .unwrap_or_default();

        let parts: Vec<ConvexShape> = fixtures.iter().map(|f| f.get_shape().clone()).collect();
        let shape = Shape::from_convex_parts(&parts).to_pixels(pixels_per_meter);

        // Keep an explicit mass only if it differs from the density-derived one
        let derived: f32 = fixtures.iter().map(|f| f.compute_mass().mass).sum();
        let mass = if body.get_body_type().is_dynamic() && (body.get_mass() - derived).abs() > 1e-4 {
            Some(body.get_mass())
        } else {
            None
        };

        Self {
            position: body.get_position(),
            rotation: body.get_angle(),
            velocity: body.get_linear_velocity(),
            angular_velocity: body.get_angular_velocity(),
            physics_type,
            density: material.density,
            friction: material.friction,
            restitution: material.restitution,
            gravity_scale: body.get_gravity_scale(),
            rotation_locked: body.is_fixed_rotation(),
            sensor: fixtures.first().map_or(false, Fixture::is_sensor),
            torque: body.get_torque(),
            mass,
            pixels_per_meter,
            shape: Arc::new(move || shape.clone()),
        }
    }

    /// Tests whether a world point in metres lies inside the shape placed at
    /// the proxy transform
    pub fn contains(&self, point: Point) -> bool {
        let transform = self.transform();
        self.convex_parts(self.pixels_per_meter)
            .map(|parts| parts.iter().any(|part| part.test_point(&transform, point)))
            .unwrap_or(false)
    }

    /// Returns the world bounds of the shape placed at the proxy transform
    pub fn bounds(&self) -> Aabb {
        let transform = self.transform();
        self.convex_parts(self.pixels_per_meter)
            .map(|parts| {
                parts
                    .iter()
                    .fold(Aabb::empty(), |acc, part| acc.union(&part.compute_aabb(&transform)))
            })
            .unwrap_or_else(|_| Aabb::new(self.position, self.position))
    }

    /// Returns the mass the body would get, derived from density unless
    /// overridden
    pub fn effective_mass(&self) -> f32 {
        if let Some(mass) = self.mass {
            return mass;
        }

        self.convex_parts(self.pixels_per_meter)
            .map(|parts| parts.iter().map(|p| p.compute_mass(self.density).mass).sum())
            .unwrap_or(0.0)
    }
}

impl fmt::Debug for ProxyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyData")
            .field("position", &self.position)
            .field("rotation", &self.rotation)
            .field("velocity", &self.velocity)
            .field("angular_velocity", &self.angular_velocity)
            .field("physics_type", &self.physics_type)
            .field("density", &self.density)
            .field("friction", &self.friction)
            .field("restitution", &self.restitution)
            .field("gravity_scale", &self.gravity_scale)
            .field("rotation_locked", &self.rotation_locked)
            .field("sensor", &self.sensor)
            .field("mass", &self.mass)
            .finish_non_exhaustive()
    }
}
