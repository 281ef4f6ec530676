mod rigid_body;
mod material;
mod body_type;
mod fixture;

pub use self::rigid_body::RigidBody;
pub use self::material::Material;
pub use self::body_type::RigidBodyType;
pub use self::fixture::{Fixture, FixtureRef};

use crate::math::{Point, Vector};

/// Ways to push a body around
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForceType {
    /// Force applied at the center of mass
    Force(Vector),

    /// Force applied at a world point (can cause torque)
    ForceAtPoint {
        /// The force to apply
        force: Vector,

        /// The point to apply the force at, in world space
        point: Point,
    },

    /// Torque around the center of mass
    Torque(f32),

    /// Impulse applied at a world point (instantaneous change in velocity)
    ImpulseAtPoint {
        /// The impulse to apply
        impulse: Vector,

        /// The point to apply the impulse at, in world space
        point: Point,
    },

    /// Angular impulse (instantaneous change in angular velocity)
    AngularImpulse(f32),
}

/// Flags for controlling body behavior
pub mod body_flags {
    use bitflags::bitflags;

    bitflags! {
        /// Flags for controlling the behavior of rigid bodies
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct BodyFlags: u32 {
            /// Body is being simulated
            const AWAKE = 0x01;

            /// Body may fall asleep after resting long enough
            const CAN_SLEEP = 0x02;

            /// Body takes part in the simulation at all
            const ACTIVE = 0x04;

            /// Body never rotates
            const FIXED_ROTATION = 0x08;
        }
    }
}
