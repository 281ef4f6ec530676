use crate::bodies::Material;
use crate::collision::Filter;
use crate::core::BodyHandle;
use crate::math::{Aabb, Point, Transform};
use crate::shapes::{ConvexShape, MassData};

/// Addresses one fixture of one body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureRef {
    /// The owning body
    pub body: BodyHandle,

    /// Index of the fixture within its body
    pub index: usize,
}

impl FixtureRef {
    /// Creates a new fixture reference
    pub fn new(body: BodyHandle, index: usize) -> Self {
        Self { body, index }
    }
}

/// A convex shape attached to a body together with its surface properties
#[derive(Debug, Clone)]
pub struct Fixture {
    shape: ConvexShape,
    material: Material,
    sensor: bool,
    filter: Filter,
}

impl Fixture {
    /// Creates a new solid fixture
    pub fn new(shape: ConvexShape, material: Material) -> Self {
        Self {
            shape,
            material,
            sensor: false,
            filter: Filter::default(),
        }
    }

    /// Returns the shape in body-local metres
    pub fn get_shape(&self) -> &ConvexShape {
        &self.shape
    }

    /// Returns the material
    pub fn get_material(&self) -> Material {
        self.material
    }

    /// Returns the density
    pub fn get_density(&self) -> f32 {
        self.material.density
    }

    /// Sets the density. The owning body must reset its mass data afterwards.
    pub fn set_density(&mut self, density: f32) {
        self.material.density = density;
    }

    /// Returns the friction coefficient
    pub fn get_friction(&self) -> f32 {
        self.material.friction
    }

    /// Sets the friction coefficient
    pub fn set_friction(&mut self, friction: f32) {
        self.material.friction = friction;
    }

    /// Returns the restitution
    pub fn get_restitution(&self) -> f32 {
        self.material.restitution
    }

    /// Sets the restitution
    pub fn set_restitution(&mut self, restitution: f32) {
        self.material.restitution = restitution;
    }

    /// Returns whether the fixture only reports overlaps
    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    /// Sets whether the fixture only reports overlaps
    pub fn set_sensor(&mut self, sensor: bool) {
        self.sensor = sensor;
    }

    /// Returns the collision filter
    pub fn get_filter(&self) -> Filter {
        self.filter
    }

    /// Sets the collision filter
    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// Returns the mass properties of the fixture about the body origin
    pub fn compute_mass(&self) -> MassData {
        self.shape.compute_mass(self.material.density)
    }

    /// Returns the world AABB of the fixture. Convex primitives have a
    /// single child, so this is the AABB at child index 0.
    pub fn compute_aabb(&self, transform: &Transform) -> Aabb {
        self.shape.compute_aabb(transform)
    }

    /// Tests whether a world point lies inside the fixture
    pub fn test_point(&self, transform: &Transform, point: Point) -> bool {
        self.shape.test_point(transform, point)
    }
}
