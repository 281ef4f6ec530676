//! Game-facing physics: the per-actor handler, its pre-attachment proxy
//! and the world handler that owns the solver.

pub mod proxy;
pub mod handler;
pub mod world_handler;

pub use self::proxy::ProxyData;
pub use self::handler::{BodyHandler, PhysicsHandler};
pub use self::world_handler::{ActorContact, ActorEntry, ContactListener, WorldHandler};

use crate::bodies::RigidBodyType;
use crate::collision::{Category, Filter};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// How an actor takes part in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum PhysicsType {
    /// Never moves; other bodies collide with it
    #[default]
    Static,

    /// Moved by gravity, forces and collisions
    Dynamic,

    /// Moved only by its velocity; pushes dynamic bodies
    Kinematic,

    /// Takes no part in collisions: a static sensor without gravity
    Passive,
}

impl PhysicsType {
    /// Native solver type used for this physics type
    pub fn body_type(self) -> RigidBodyType {
        match self {
            PhysicsType::Static | PhysicsType::Passive => RigidBodyType::Static,
            PhysicsType::Dynamic => RigidBodyType::Dynamic,
            PhysicsType::Kinematic => RigidBodyType::Kinematic,
        }
    }

    /// Collision category of fixtures of this type
    pub fn category(self) -> Category {
        match self {
            PhysicsType::Static | PhysicsType::Passive => Category::PASSIVE,
            PhysicsType::Dynamic | PhysicsType::Kinematic => Category::DYNAMIC_OR_KINEMATIC,
        }
    }

    /// Categories fixtures of this type collide with
    pub fn mask(self) -> Category {
        match self {
            PhysicsType::Passive => Category::empty(),
            _ => Category::ALL,
        }
    }

    /// Full collision filter of fixtures of this type
    pub fn filter(self) -> Filter {
        Filter::new(self.category(), self.mask())
    }

    /// Returns true if fixtures of this type only report overlaps
    pub fn is_sensor(self) -> bool {
        self == PhysicsType::Passive
    }

    /// Gravity scale applied when switching to this type
    pub fn gravity_scale(self) -> f32 {
        if self == PhysicsType::Passive {
            0.0
        } else {
            1.0
        }
    }
}
