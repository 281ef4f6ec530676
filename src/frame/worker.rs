use crate::error::{panic_message, EngineError};
use crate::Result;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{debug, trace};

/// Work run by a frame worker once per frame
pub type FrameJob = Box<dyn FnMut() -> anyhow::Result<()> + Send>;

#[derive(Default)]
struct WorkerState {
    start_requested: bool,
    running: bool,
    outcome: Option<std::result::Result<(), String>>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<WorkerState>,
    signal: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, WorkerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, WorkerState>) -> MutexGuard<'a, WorkerState> {
        self.signal.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }
}

/// A dedicated thread that runs its job each time it is started.
///
/// The thread blocks on the start signal, runs the job once and publishes the
/// outcome. It never starts itself.
pub struct FrameWorker {
    name: String,
    shared: Arc<Shared>,
    thread: Option<thread::JoinHandle<()>>,
}

impl FrameWorker {
    /// Spawns the worker thread
    pub fn spawn(name: impl Into<String>, mut job: FrameJob) -> Result<Self> {
        let name = name.into();
        let shared = Arc::new(Shared {
            state: Mutex::new(WorkerState::default()),
            signal: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let thread_name = name.clone();
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                loop {
                    {
                        let mut state = thread_shared.lock();
                        while !state.start_requested && !state.shutdown {
                            state = thread_shared.wait(state);
                        }

                        if state.shutdown {
                            break;
                        }

                        state.start_requested = false;
                        state.running = true;
                    }

                    let outcome = match catch_unwind(AssertUnwindSafe(|| job())) {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => Err(format!("{:#}", e)),
                        Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
                    };
                    trace!(worker = %thread_name, ok = outcome.is_ok(), "frame job finished");

                    let mut state = thread_shared.lock();
                    state.running = false;
                    state.outcome = Some(outcome);
                    thread_shared.signal.notify_all();
                }

                debug!(worker = %thread_name, "frame worker stopped");
            })
            .map_err(|e| EngineError::Resource(format!("failed to spawn worker thread {}: {}", name, e)))?;

        Ok(Self {
            name,
            shared,
            thread: Some(thread),
        })
    }

    /// Returns the worker (and thread) name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signals the worker to run its job once
    pub fn start(&self) {
        let mut state = self.shared.lock();
        state.start_requested = true;
        state.outcome = None;
        self.shared.signal.notify_all();
    }

    /// Blocks until the started job has finished and returns its outcome
    pub fn wait(&self) -> Result<()> {
        let mut state = self.shared.lock();
        loop {
            if let Some(outcome) = state.outcome.take() {
                return outcome.map_err(|message| EngineError::FrameAborted {
                    worker: self.name.clone(),
                    message,
                });
            }

            if state.shutdown && !state.running {
                return Err(EngineError::Resource(format!("worker {} is shut down", self.name)));
            }

            if !state.start_requested && !state.running {
                return Ok(());
            }

            state = self.shared.wait(state);
        }
    }

    /// Runs the job once and waits for it
    pub fn run(&self) -> Result<()> {
        self.start();
        self.wait()
    }

    /// Stops the thread after its current job and joins it
    pub fn shutdown(&mut self) {
        {
            let mut state = self.shared.lock();
            state.shutdown = true;
            self.shared.signal.notify_all();
        }

        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    /// Returns true until `shutdown` has been called
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }
}

impl Drop for FrameWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FrameWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWorker")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn job_runs_once_per_start() {
        let count = Arc::new(AtomicUsize::new(0));
        let job_count = Arc::clone(&count);
        let worker = FrameWorker::spawn("counter", Box::new(move || -> anyhow::Result<()> {
            job_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();

        for _ in 0..5 {
            worker.run().unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn panics_become_frame_errors() {
        let worker = FrameWorker::spawn("panicky", Box::new(|| -> anyhow::Result<()> { panic!("boom") })).unwrap();

        match worker.run() {
            Err(EngineError::FrameAborted { worker, message }) => {
                assert_eq!(worker, "panicky");
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // The thread survives the panic
        assert!(matches!(worker.run(), Err(EngineError::FrameAborted { .. })));
    }
}
