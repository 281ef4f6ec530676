#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Surface and mass properties of a fixture
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Material {
    /// Density in kg/m^2
    pub density: f32,

    /// Coulomb friction coefficient
    pub friction: f32,

    /// Coefficient of restitution (bounciness)
    pub restitution: f32,
}

impl Material {
    /// Creates a new material with the specified properties
    pub fn new(density: f32, friction: f32, restitution: f32) -> Self {
        Self {
            density,
            friction,
            restitution,
        }
    }

    /// Friction used for a contact between two materials
    pub fn mix_friction(a: f32, b: f32) -> f32 {
        (a * b).sqrt()
    }

    /// Restitution used for a contact between two materials
    pub fn mix_restitution(a: f32, b: f32) -> f32 {
        a.max(b)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: 10.0,
            friction: 0.5,
            restitution: 0.5,
        }
    }
}
