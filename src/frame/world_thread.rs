use crate::error::EngineError;
use crate::frame::worker::FrameWorker;
use crate::physics::WorldHandler;
use crate::Result;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

static NEXT_PHYSICS_THREAD: AtomicUsize = AtomicUsize::new(1);

/// Advances a world by a fixed delta each time it runs
#[derive(Debug)]
pub struct WorldStepper {
    world: Arc<WorldHandler>,
    delta_seconds: f32,
    velocity_iterations: u32,
    position_iterations: u32,
}

impl WorldStepper {
    /// Creates a stepper with 6 velocity and 3 position iterations
    pub fn new(world: Arc<WorldHandler>) -> Self {
        Self::with_iterations(world, 6, 3)
    }

    /// Creates a stepper with custom iteration counts
    pub fn with_iterations(world: Arc<WorldHandler>, velocity_iterations: u32, position_iterations: u32) -> Self {
        Self {
            world,
            delta_seconds: 0.0,
            velocity_iterations,
            position_iterations,
        }
    }

    /// Sets the delta of the next step in milliseconds
    pub fn set_delta_millis(&mut self, millis: f32) -> Result<()> {
        if !(millis >= 0.0) || !millis.is_finite() {
            return Err(EngineError::Precondition(format!("step delta must be >= 0 ms, got {}", millis)));
        }
        self.delta_seconds = millis / 1000.0;
        Ok(())
    }

    /// Returns the delta of the next step in seconds
    pub fn get_delta_seconds(&self) -> f32 {
        self.delta_seconds
    }

    /// Returns the velocity iterations per step
    pub fn get_velocity_iterations(&self) -> u32 {
        self.velocity_iterations
    }

    /// Returns the position iterations per step
    pub fn get_position_iterations(&self) -> u32 {
        self.position_iterations
    }

    /// Returns the stepped world
    pub fn world(&self) -> &Arc<WorldHandler> {
        &self.world
    }

    /// Steps the world once
    pub fn run_one_frame(&self) -> Result<()> {
        self.world
            .step(self.delta_seconds, self.velocity_iterations, self.position_iterations)
    }

    /// Spawns the dedicated `physics-thread-#n` worker that runs `stepper`
    pub fn spawn_worker(stepper: Arc<Mutex<WorldStepper>>) -> Result<FrameWorker> {
        let index = NEXT_PHYSICS_THREAD.fetch_add(1, Ordering::Relaxed);

        FrameWorker::spawn(
            format!("physics-thread-#{}", index),
            Box::new(move || -> anyhow::Result<()> {
                let stepper = stepper.lock().unwrap_or_else(PoisonError::into_inner);
                stepper.run_one_frame()?;
                Ok(())
            }),
        )
    }
}
