#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Native solver type of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum RigidBodyType {
    /// Zero mass, zero velocity, never moved by the solver
    Static,

    /// Zero mass, moved only by its velocity
    Kinematic,

    /// Positive mass, moved by forces and contacts
    Dynamic,
}

impl RigidBodyType {
    /// Returns true for bodies the solver moves on its own
    pub fn is_dynamic(self) -> bool {
        self == RigidBodyType::Dynamic
    }
}
