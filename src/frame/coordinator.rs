use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::frame::worker::FrameWorker;
use crate::frame::world_thread::WorldStepper;
use crate::physics::WorldHandler;
use crate::Result;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, trace};

/// What a frame task sees of the current frame
#[derive(Debug, Clone)]
pub struct FrameContext {
    /// Number of the frame, starting at 1
    pub frame: u64,

    /// Delta fed into the world step, in seconds
    pub delta_seconds: f32,

    /// World being stepped concurrently. Mutations from a task must go
    /// through `WorldHandler::defer`.
    pub world: Arc<WorldHandler>,
}

/// Work run once per frame, in parallel with the world step
pub trait FrameTask: Send {
    /// Name of the worker thread running the task
    fn name(&self) -> &str;

    /// Per-frame logic. An error aborts the current frame.
    fn frame_logic(&mut self, context: &FrameContext) -> anyhow::Result<()>;
}

/// Drives frames: measures real time, steps the world on its own thread and
/// runs every frame task in parallel with it.
pub struct FrameCoordinator {
    world: Arc<WorldHandler>,
    stepper: Arc<Mutex<WorldStepper>>,
    step_worker: FrameWorker,
    tasks: Vec<FrameWorker>,
    context: Arc<Mutex<FrameContext>>,
    max_delta: Duration,
    last_frame: Option<Instant>,
    frame: u64,
}

impl FrameCoordinator {
    /// Creates a coordinator stepping `world` with the iteration counts and
    /// delta clamp of `config`
    pub fn new(world: Arc<WorldHandler>, config: &EngineConfig) -> Result<Self> {
        let max_delta = Duration::try_from_secs_f32(config.max_delta_seconds)
            .ok()
            .filter(|delta| !delta.is_zero())
            .ok_or_else(|| {
                EngineError::Precondition(format!(
                    "max delta must be positive and finite, got {}",
                    config.max_delta_seconds
                ))
            })?;

        let stepper = Arc::new(Mutex::new(WorldStepper::with_iterations(
            Arc::clone(&world),
            config.velocity_iterations,
            config.position_iterations,
        )));
        let step_worker = WorldStepper::spawn_worker(Arc::clone(&stepper))?;

        let context = Arc::new(Mutex::new(FrameContext {
            frame: 0,
            delta_seconds: 0.0,
            world: Arc::clone(&world),
        }));

        debug!(worker = step_worker.name(), "frame coordinator created");

        Ok(Self {
            world,
            stepper,
            step_worker,
            tasks: Vec::new(),
            context,
            max_delta,
            last_frame: None,
            frame: 0,
        })
    }

    /// Adds a task run in parallel with every following world step
    pub fn add_task<T>(&mut self, task: T) -> Result<()>
    where
        T: FrameTask + 'static,
    {
        let name = task.name().to_string();
        let task = Arc::new(Mutex::new(task));
        let context = Arc::clone(&self.context);

        let worker = FrameWorker::spawn(
            name,
            Box::new(move || {
                let context = context.lock().unwrap_or_else(PoisonError::into_inner).clone();
                task.lock().unwrap_or_else(PoisonError::into_inner).frame_logic(&context)
            }),
        )?;

        self.tasks.push(worker);
        Ok(())
    }

    /// Returns the number of frame tasks
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Returns the number of frames run so far
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Returns the world being stepped
    pub fn world(&self) -> &Arc<WorldHandler> {
        &self.world
    }

    /// Returns the largest delta fed into one step
    pub fn max_delta(&self) -> Duration {
        self.max_delta
    }

    /// Name of the thread stepping the world
    pub fn step_worker_name(&self) -> &str {
        self.step_worker.name()
    }

    /// Runs one frame with the real time elapsed since the previous frame,
    /// clamped to the max delta. Returns the delta used.
    pub fn run_frame(&mut self) -> Result<Duration> {
        let now = Instant::now();
        let delta = match self.last_frame {
            Some(last) => now.duration_since(last).min(self.max_delta),
            None => Duration::ZERO,
        };
        self.last_frame = Some(now);

        self.run_frame_with_delta(delta)?;
        Ok(delta)
    }

    /// Runs one frame with a caller-supplied delta, clamped to the max delta.
    ///
    /// Every worker runs to completion even if one fails; the first failure
    /// is returned after all of them finished.
    pub fn run_frame_with_delta(&mut self, delta: Duration) -> Result<()> {
        let delta = delta.min(self.max_delta);
        self.frame += 1;

        self.stepper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_delta_millis(delta.as_secs_f32() * 1000.0)?;

        {
            let mut context = self.context.lock().unwrap_or_else(PoisonError::into_inner);
            context.frame = self.frame;
            context.delta_seconds = delta.as_secs_f32();
        }

        self.step_worker.start();
        for task in &self.tasks {
            task.start();
        }

        let mut failure = self.step_worker.wait().err();
        for task in &self.tasks {
            if let Err(e) = task.wait() {
                failure.get_or_insert(e);
            }
        }

        self.world.drain_deferred();

        match failure {
            Some(e) => {
                error!(frame = self.frame, error = %e, "frame aborted");
                Err(e)
            }
            None => {
                trace!(frame = self.frame, delta_ms = delta.as_secs_f32() * 1000.0, "frame finished");
                Ok(())
            }
        }
    }

    /// Runs `count` frames back to back, stopping at the first failure
    pub fn run_frames(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.run_frame()?;
        }
        Ok(())
    }

    /// Moves the coordinator onto its own thread, running frames at
    /// `target_fps` until the loop is stopped
    pub fn spawn_loop(self, target_fps: u32) -> Result<FrameLoop> {
        if target_fps == 0 {
            return Err(EngineError::Precondition("target fps must be positive".to_string()));
        }

        let period = Duration::from_secs_f64(1.0 / f64::from(target_fps));
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("frame-loop".to_string())
            .spawn(move || {
                let mut coordinator = self;
                let mut next = Instant::now();

                info!(target_fps, "frame loop started");
                while !thread_stop.load(Ordering::SeqCst) {
                    // Failed frames are logged by the coordinator; the next
                    // frame starts from the post-abort state
                    let _ = coordinator.run_frame();

                    next += period;
                    let now = Instant::now();
                    if next > now {
                        thread::sleep(next - now);
                    } else {
                        next = now;
                    }
                }
                info!(frames = coordinator.frame_count(), "frame loop stopped");

                coordinator
            })
            .map_err(|e| EngineError::Resource(format!("failed to spawn frame loop: {}", e)))?;

        Ok(FrameLoop {
            stop,
            thread: Some(thread),
        })
    }

    /// Stops every worker thread after its current frame
    pub fn shutdown(&mut self) {
        self.step_worker.shutdown();
        for task in &mut self.tasks {
            task.shutdown();
        }
        debug!(frames = self.frame, "frame coordinator shut down");
    }
}

impl std::fmt::Debug for FrameCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCoordinator")
            .field("step_worker", &self.step_worker)
            .field("tasks", &self.tasks)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

/// A frame coordinator running on its own thread
#[derive(Debug)]
pub struct FrameLoop {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<FrameCoordinator>>,
}

impl FrameLoop {
    /// Asks the loop to stop after the current frame
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Stops the loop and hands the coordinator back
    pub fn join(mut self) -> Result<FrameCoordinator> {
        self.stop();
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| EngineError::Resource("the frame loop thread panicked".to_string())),
            None => Err(EngineError::Lifecycle("the frame loop was already joined".to_string())),
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
