use alpha2d::error::EngineError;
use alpha2d::math::Vector;
use alpha2d::{Actor, EngineConfig, FrameContext, FrameCoordinator, FrameTask, PhysicsType, Scene};
use approx::assert_relative_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn metric_scene() -> Scene {
    Scene::with_name(
        "frame-test",
        EngineConfig {
            pixels_per_meter: 1.0,
            ticker_pool_size: 1,
            ..EngineConfig::default()
        },
    )
    .unwrap()
}

/// Records what every frame looked like from a task thread
struct Recorder {
    name: String,
    frames: Arc<Mutex<Vec<(u64, f32)>>>,
    thread_names: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn new(name: &str) -> (Self, Arc<Mutex<Vec<(u64, f32)>>>, Arc<Mutex<Vec<String>>>) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let thread_names = Arc::new(Mutex::new(Vec::new()));
        let recorder = Self {
            name: name.to_string(),
            frames: Arc::clone(&frames),
            thread_names: Arc::clone(&thread_names),
        };
        (recorder, frames, thread_names)
    }
}

impl FrameTask for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn frame_logic(&mut self, context: &FrameContext) -> anyhow::Result<()> {
        self.frames.lock().unwrap().push((context.frame, context.delta_seconds));
        let current = thread::current().name().unwrap_or_default().to_string();
        self.thread_names.lock().unwrap().push(current);
        Ok(())
    }
}

/// Fails on the frames listed in `failing`
struct Flaky {
    failing: Vec<u64>,
}

impl FrameTask for Flaky {
    fn name(&self) -> &str {
        "flaky-task"
    }

    fn frame_logic(&mut self, context: &FrameContext) -> anyhow::Result<()> {
        if self.failing.contains(&context.frame) {
            anyhow::bail!("frame {} refused", context.frame);
        }
        Ok(())
    }
}

/// Queues one world mutation per frame
struct Pusher {
    actor: Actor,
    applied: Arc<AtomicUsize>,
}

impl FrameTask for Pusher {
    fn name(&self) -> &str {
        "pusher-task"
    }

    fn frame_logic(&mut self, context: &FrameContext) -> anyhow::Result<()> {
        let actor = self.actor.clone();
        let applied = Arc::clone(&self.applied);
        context.world.defer(move || {
            if actor.move_by(Vector::new(1.0, 0.0)).is_ok() {
                applied.fetch_add(1, Ordering::SeqCst);
            }
        });
        Ok(())
    }
}

#[test]
fn test_tasks_run_on_their_own_threads() {
    let scene = metric_scene();
    let mut coordinator = scene.frame_coordinator().unwrap();
    assert!(coordinator.step_worker_name().starts_with("physics-thread-#"));

    let (recorder, frames, thread_names) = Recorder::new("recorder-task");
    coordinator.add_task(recorder).unwrap();
    assert_eq!(coordinator.task_count(), 1);

    coordinator.run_frames(3).unwrap();
    assert_eq!(coordinator.frame_count(), 3);

    let frames = frames.lock().unwrap();
    assert_eq!(frames.iter().map(|(frame, _)| *frame).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(thread_names.lock().unwrap().iter().all(|name| name == "recorder-task"));

    coordinator.shutdown();
}

#[test]
fn test_first_frame_has_no_delta() {
    let scene = metric_scene();
    let mut coordinator = scene.frame_coordinator().unwrap();

    assert_eq!(coordinator.run_frame().unwrap(), Duration::ZERO);
    thread::sleep(Duration::from_millis(5));
    let delta = coordinator.run_frame().unwrap();
    assert!(delta > Duration::ZERO);
    assert!(delta <= coordinator.max_delta());
}

#[test]
fn test_delta_is_clamped() {
    let scene = metric_scene();
    let mut coordinator = scene.frame_coordinator().unwrap();
    let (recorder, frames, _) = Recorder::new("clamp-task");
    coordinator.add_task(recorder).unwrap();

    coordinator.run_frame_with_delta(Duration::from_secs(2)).unwrap();
    coordinator.run_frame_with_delta(Duration::from_millis(10)).unwrap();

    let frames = frames.lock().unwrap();
    assert_relative_eq!(frames[0].1, 1.0 / 30.0, epsilon = 1e-5);
    assert_relative_eq!(frames[1].1, 0.01, epsilon = 1e-5);
}

#[test]
fn test_failing_task_aborts_only_its_frame() {
    let scene = metric_scene();
    let ball = Actor::circle(&scene, 0.5).unwrap();
    ball.set_type(PhysicsType::Dynamic).unwrap();
    ball.set_position(Vector::new(0.0, 10.0)).unwrap();
    scene.add(&ball).unwrap();

    let mut coordinator = scene.frame_coordinator().unwrap();
    coordinator.add_task(Flaky { failing: vec![2] }).unwrap();

    let step = Duration::from_millis(16);
    coordinator.run_frame_with_delta(step).unwrap();

    match coordinator.run_frame_with_delta(step) {
        Err(EngineError::FrameAborted { worker, message }) => {
            assert_eq!(worker, "flaky-task");
            assert!(message.contains("frame 2 refused"));
        }
        other => panic!("expected an aborted frame, got {:?}", other),
    }

    // The world step of the aborted frame still ran; the next frame is fine
    coordinator.run_frame_with_delta(step).unwrap();
    assert_eq!(coordinator.frame_count(), 3);
    assert!(ball.get_position().unwrap().y < 10.0);
}

#[test]
fn test_panicking_task_is_reported() {
    struct Panicker;

    impl FrameTask for Panicker {
        fn name(&self) -> &str {
            "panicking-task"
        }

        fn frame_logic(&mut self, _context: &FrameContext) -> anyhow::Result<()> {
            panic!("boom");
        }
    }

    let scene = metric_scene();
    let mut coordinator = scene.frame_coordinator().unwrap();
    coordinator.add_task(Panicker).unwrap();

    let err = coordinator.run_frame_with_delta(Duration::from_millis(16)).unwrap_err();
    assert!(matches!(err, EngineError::FrameAborted { ref message, .. } if message.contains("boom")));

    // The worker thread survived the panic
    assert!(coordinator.run_frame_with_delta(Duration::from_millis(16)).is_err());
}

#[test]
fn test_deferred_mutations_apply_after_the_step() {
    let scene = metric_scene();
    let wall = Actor::rect(&scene, 1.0, 1.0).unwrap();
    scene.add(&wall).unwrap();

    let applied = Arc::new(AtomicUsize::new(0));
    let mut coordinator = scene.frame_coordinator().unwrap();
    coordinator
        .add_task(Pusher {
            actor: wall.clone(),
            applied: Arc::clone(&applied),
        })
        .unwrap();

    for _ in 0..4 {
        coordinator.run_frame_with_delta(Duration::from_millis(16)).unwrap();
    }

    assert_eq!(applied.load(Ordering::SeqCst), 4);
    assert_eq!(scene.world_handler().deferred_count(), 0);
    assert_relative_eq!(wall.get_position().unwrap().x, 4.0, epsilon = 1e-5);
}

#[test]
fn test_max_delta_must_be_positive_and_finite() {
    let scene = metric_scene();

    for max_delta_seconds in [0.0, -1.0, f32::NAN, f32::INFINITY] {
        let config = EngineConfig {
            max_delta_seconds,
            ..EngineConfig::default()
        };
        let result = FrameCoordinator::new(Arc::clone(scene.world_handler()), &config);
        assert!(
            matches!(result, Err(EngineError::Precondition(_))),
            "max delta {} was accepted",
            max_delta_seconds
        );
    }
}

#[test]
fn test_frame_loop_runs_until_joined() {
    let scene = metric_scene();
    let mut coordinator = scene.frame_coordinator().unwrap();
    let (recorder, frames, _) = Recorder::new("loop-task");
    coordinator.add_task(recorder).unwrap();

    assert!(matches!(
        scene.frame_coordinator().unwrap().spawn_loop(0),
        Err(EngineError::Precondition(_))
    ));

    let frame_loop = coordinator.spawn_loop(100).unwrap();
    thread::sleep(Duration::from_millis(200));
    let mut coordinator = frame_loop.join().unwrap();

    let count = coordinator.frame_count();
    assert!(count >= 5, "expected frames at 100 fps, got {}", count);
    assert_eq!(frames.lock().unwrap().len() as u64, count);
    coordinator.shutdown();
}

#[test]
fn test_frames_step_the_world() {
    let scene = metric_scene();
    let ball = Actor::circle(&scene, 0.5).unwrap();
    ball.set_type(PhysicsType::Dynamic).unwrap();
    scene.add(&ball).unwrap();

    let mut coordinator = scene.frame_coordinator().unwrap();
    for _ in 0..30 {
        coordinator.run_frame_with_delta(Duration::from_secs_f32(1.0 / 30.0)).unwrap();
    }

    // One second of free fall
    assert_relative_eq!(ball.get_velocity().unwrap().y, -9.81, epsilon = 1e-2);
}
