//! Frame loop: a dedicated world-stepping thread plus per-frame tasks, all
//! started together and awaited before the next frame.

pub mod worker;
pub mod world_thread;
pub mod coordinator;

pub use self::worker::{FrameJob, FrameWorker};
pub use self::world_thread::WorldStepper;
pub use self::coordinator::{FrameContext, FrameCoordinator, FrameLoop, FrameTask};
