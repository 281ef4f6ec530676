pub mod math;
pub mod core;
pub mod bodies;
pub mod shapes;
pub mod collision;
pub mod physics;
pub mod actor;
pub mod frame;
pub mod ticker;
pub mod config;
pub mod scene;
pub mod game;

/// Re-export common types for easier usage
pub use crate::actor::{Actor, ActorId, Color, RenderState};
pub use crate::config::EngineConfig;
pub use crate::core::{PhysicsWorld, SimulationConfig};
pub use crate::frame::{FrameContext, FrameCoordinator, FrameLoop, FrameTask};
pub use crate::game::Game;
pub use crate::math::{Point, Vector};
pub use crate::physics::{PhysicsType, ProxyData, WorldHandler};
pub use crate::scene::{RenderItem, Scene};
pub use crate::shapes::{Polygon, Shape, ShapeSupplier};
pub use crate::ticker::{Ticker, TickerManager};

/// Error types for the engine
pub mod error {
    use std::any::Any;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum EngineError {
        #[error("Precondition violated: {0}")]
        Precondition(String),

        #[error("The physics world is being stepped and cannot be modified right now")]
        ConcurrentMutation,

        #[error("Lifecycle error: {0}")]
        Lifecycle(String),

        #[error("The ticker is not registered")]
        NotRegistered,

        #[error("Resource error: {0}")]
        Resource(String),

        #[error("Resource not found: {0}")]
        ResourceNotFound(String),

        #[error("Frame aborted by worker {worker}: {message}")]
        FrameAborted { worker: String, message: String },
    }

    /// Extracts a readable message from a caught panic
    pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
        if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic".to_string()
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, error::EngineError>;

/// Engine version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
