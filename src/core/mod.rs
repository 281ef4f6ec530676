pub mod world;
pub mod config;
pub mod storage;
pub mod events;
mod island;

pub use self::world::PhysicsWorld;
pub use self::config::SimulationConfig;
pub use self::storage::{BodyStorage, Storage};
pub use self::events::{EventQueue, CollisionEvent, CollisionEventType, BodyEvent, BodyEventType};

use crate::math::{Point, Vector};

/// A unique identifier for a body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub(crate) u32);

impl BodyHandle {
    /// Returns the raw id of the handle
    pub fn id(&self) -> u32 {
        self.0
    }
}

/// A contact point between two bodies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// The position of the contact point in world space
    pub position: Point,

    /// The contact normal, pointing from fixture A to fixture B
    pub normal: Vector,

    /// Negative while the shapes overlap
    pub separation: f32,
}
