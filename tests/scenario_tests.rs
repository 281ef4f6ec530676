use alpha2d::core::CollisionEventType;
use alpha2d::error::EngineError;
use alpha2d::math::Vector;
use alpha2d::{Actor, EngineConfig, PhysicsType, Scene};
use approx::assert_abs_diff_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

const DT: f32 = 0.016;

fn metric_scene(name: &str) -> Scene {
    Scene::with_name(
        name,
        EngineConfig {
            pixels_per_meter: 1.0,
            ticker_pool_size: 1,
            ..EngineConfig::default()
        },
    )
    .unwrap()
}

fn floor(scene: &Scene) -> Actor {
    let floor = Actor::rect(scene, 10.0, 0.1).unwrap();
    floor.set_type(PhysicsType::Static).unwrap();
    scene.add(&floor).unwrap();
    floor
}

fn dynamic_box(scene: &Scene, position: Vector) -> Actor {
    let actor = Actor::rect(scene, 1.0, 1.0).unwrap();
    actor.set_type(PhysicsType::Dynamic).unwrap();
    actor.set_position(position).unwrap();
    scene.add(&actor).unwrap();
    actor
}

#[test]
fn test_box_on_floor_is_grounded() {
    let scene = metric_scene("ground");
    floor(&scene);
    let crate_box = dynamic_box(&scene, Vector::new(4.5, 0.1));

    assert!(crate_box.is_grounded().unwrap());

    crate_box.move_by(Vector::new(0.0, 5.0)).unwrap();
    scene.step(DT).unwrap();
    assert!(!crate_box.is_grounded().unwrap());
}

#[test]
fn test_box_lands_and_becomes_grounded() {
    let scene = metric_scene("landing");
    floor(&scene);
    let crate_box = dynamic_box(&scene, Vector::new(4.5, 2.0));

    let mut grounded_after = None;
    for step in 0..120 {
        scene.step(DT).unwrap();
        if crate_box.is_grounded().unwrap() {
            grounded_after = Some(step);
            break;
        }
    }
    assert!(grounded_after.is_some(), "the box never reached the floor");
}

#[test]
fn test_passive_actor_stops_falling() {
    let scene = metric_scene("passive");
    let ball = Actor::circle(&scene, 0.5).unwrap();
    ball.set_type(PhysicsType::Dynamic).unwrap();
    ball.set_position(Vector::new(0.0, 50.0)).unwrap();
    scene.add(&ball).unwrap();

    for _ in 0..10 {
        scene.step(DT).unwrap();
    }
    assert!(ball.get_velocity().unwrap().y < 0.0);

    ball.set_type(PhysicsType::Passive).unwrap();
    let y = ball.get_position().unwrap().y;
    for _ in 0..60 {
        scene.step(DT).unwrap();
    }
    assert!((ball.get_position().unwrap().y - y).abs() < 1e-4);
}

#[test]
fn test_polygon_needs_three_points() {
    let scene = metric_scene("polygon");
    let two = [Vector::new(0.0, 0.0), Vector::new(1.0, 0.0)];
    assert!(matches!(Actor::polygon(&scene, &two), Err(EngineError::Precondition(_))));

    let three = [Vector::new(0.0, 0.0), Vector::new(1.0, 0.0), Vector::new(0.5, 1.0)];
    assert!(Actor::polygon(&scene, &three).is_ok());
}

#[test]
fn test_mutation_during_step_is_rejected() {
    let scene = metric_scene("concurrent");
    floor(&scene);
    // Overlaps the floor so the first step reports a contact
    dynamic_box(&scene, Vector::new(4.5, 0.05));

    let wall = Actor::rect(&scene, 1.0, 1.0).unwrap();
    wall.set_position(Vector::new(20.0, 20.0)).unwrap();
    scene.add(&wall).unwrap();

    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let mut gate = Some((entered_tx, release_rx));

    let world = Arc::clone(scene.world_handler());
    world.set_contact_listener(move |contact| {
        if contact.event_type != CollisionEventType::Begin {
            return;
        }
        // Park the step until the main thread has tried to mutate
        if let Some((entered, release)) = gate.take() {
            let _ = entered.send(());
            let _ = release.recv();
        }
    });

    let stepper = {
        let world = Arc::clone(&world);
        thread::spawn(move || world.step(DT, 6, 3))
    };

    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(world.is_stepping());
    assert!(matches!(wall.move_by(Vector::new(1.0, 0.0)), Err(EngineError::ConcurrentMutation)));
    assert!(matches!(wall.get_position(), Err(EngineError::ConcurrentMutation)));

    release_tx.send(()).unwrap();
    stepper.join().unwrap().unwrap();

    assert!(!world.is_stepping());
    assert_eq!(wall.get_position().unwrap(), Vector::new(20.0, 20.0));
}

#[test]
fn test_listener_defers_its_mutations() {
    let scene = metric_scene("listener");
    floor(&scene);
    let crate_box = dynamic_box(&scene, Vector::new(4.5, 0.05));

    let rejected = Arc::new(AtomicUsize::new(0));
    let applied = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    {
        let world = Arc::clone(scene.world_handler());
        let rejected = Arc::clone(&rejected);
        let applied = Arc::clone(&applied);
        let seen = Arc::clone(&seen);

        scene.world_handler().set_contact_listener(move |contact| {
            if contact.event_type != CollisionEventType::Begin {
                return;
            }

            let actors: Vec<Actor> = [&contact.actor_a, &contact.actor_b].into_iter().flatten().cloned().collect();
            seen.lock().unwrap().extend(actors.iter().map(Actor::id));

            for actor in actors {
                // Direct mutation fails fast instead of deadlocking
                if matches!(actor.move_by(Vector::new(0.0, 3.0)), Err(EngineError::ConcurrentMutation)) {
                    rejected.fetch_add(1, Ordering::SeqCst);
                }

                let applied = Arc::clone(&applied);
                world.run_after_step(move || {
                    if actor.get_type().ok() == Some(PhysicsType::Dynamic) && actor.move_by(Vector::new(0.0, 3.0)).is_ok() {
                        applied.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });
    }

    scene.step(DT).unwrap();

    assert_eq!(seen.lock().unwrap().len(), 2);
    assert_eq!(rejected.load(Ordering::SeqCst), 2);
    assert_eq!(applied.load(Ordering::SeqCst), 1);
    assert!(crate_box.get_position().unwrap().y > 2.5);
    assert_eq!(scene.world_handler().deferred_count(), 0);
}

#[test]
fn test_detached_actor_rematerialises_in_a_new_scene() {
    let first = metric_scene("first");
    let actor = dynamic_box(&first, Vector::new(3.0, 4.0));
    actor.set_rotation(0.5).unwrap();
    actor.set_velocity(Vector::new(1.0, 0.0)).unwrap();
    actor.set_density(2.5).unwrap();

    let snapshot = first.remove(&actor).unwrap();
    assert!(!actor.is_attached());
    assert_eq!(first.world_handler().body_count().unwrap(), 0);
    assert_abs_diff_eq!(snapshot.density, 2.5, epsilon = 1e-5);

    // The detached actor answers from its snapshot
    let proxy = actor.get_proxy_data().unwrap();
    assert_abs_diff_eq!(proxy.position.x, 3.0, epsilon = 1e-5);

    let second = metric_scene("second");
    second.add(&actor).unwrap();

    let position = actor.get_position().unwrap();
    let velocity = actor.get_velocity().unwrap();
    assert_abs_diff_eq!(position.x, 3.0, epsilon = 1e-5);
    assert_abs_diff_eq!(position.y, 4.0, epsilon = 1e-5);
    assert_abs_diff_eq!(velocity.x, 1.0, epsilon = 1e-5);
    assert_abs_diff_eq!(velocity.y, 0.0, epsilon = 1e-5);
    assert_abs_diff_eq!(actor.get_rotation().unwrap(), 0.5, epsilon = 1e-5);
    assert_abs_diff_eq!(actor.get_density().unwrap(), 2.5, epsilon = 1e-5);
    assert_abs_diff_eq!(actor.get_mass().unwrap(), 2.5, epsilon = 1e-4);
    assert_eq!(actor.get_type().unwrap(), PhysicsType::Dynamic);
}

#[test]
fn test_stack_keeps_reverse_map_consistent() {
    let scene = metric_scene("stack");
    floor(&scene);

    let boxes: Vec<Actor> = (0..4)
        .map(|i| dynamic_box(&scene, Vector::new(4.5, 0.2 + i as f32 * 1.1)))
        .collect();

    for step in 0..180 {
        scene.step(DT).unwrap();

        // Churn one actor through the scene now and then
        if step % 60 == 30 {
            let snapshot = scene.remove(&boxes[3]).unwrap();
            assert!(scene.world_handler().is_consistent().unwrap());
            assert_eq!(snapshot.physics_type, PhysicsType::Dynamic);
            scene.add(&boxes[3]).unwrap();
        }
        assert!(scene.world_handler().is_consistent().unwrap());
    }

    // The bottom box rests on the floor
    assert!(boxes[0].is_grounded().unwrap());
    assert_eq!(scene.actor_count(), 5);
}

// Runs one step on another thread so a hang fails the test instead of
// stalling the suite
fn step_with_timeout(scene: &Scene) -> alpha2d::Result<()> {
    let world = Arc::clone(scene.world_handler());
    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = done_tx.send(world.step(DT, 6, 3));
    });
    done_rx.recv_timeout(Duration::from_secs(5)).expect("the step never returned")
}

#[test]
fn test_listener_can_clear_itself() {
    let scene = metric_scene("self-clearing");
    floor(&scene);
    dynamic_box(&scene, Vector::new(4.5, 0.05));

    let calls = Arc::new(AtomicUsize::new(0));
    {
        let world = Arc::clone(scene.world_handler());
        let calls = Arc::clone(&calls);
        scene.world_handler().set_contact_listener(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            world.clear_contact_listener();
        });
    }

    step_with_timeout(&scene).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!scene.world_handler().has_contact_listener());

    // A new contact reaches nobody
    dynamic_box(&scene, Vector::new(1.5, 0.05));
    step_with_timeout(&scene).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_listener_can_replace_itself() {
    let scene = metric_scene("self-replacing");
    floor(&scene);
    dynamic_box(&scene, Vector::new(4.5, 0.05));

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    {
        let world = Arc::clone(scene.world_handler());
        let first = Arc::clone(&first);
        let second = Arc::clone(&second);
        scene.world_handler().set_contact_listener(move |contact| {
            if contact.event_type != CollisionEventType::Begin {
                return;
            }
            first.fetch_add(1, Ordering::SeqCst);

            let second = Arc::clone(&second);
            world.set_contact_listener(move |contact| {
                if contact.event_type == CollisionEventType::Begin {
                    second.fetch_add(1, Ordering::SeqCst);
                }
            });
        });
    }

    step_with_timeout(&scene).unwrap();
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 0);
    assert!(scene.world_handler().has_contact_listener());

    // The replacement handles the next contact
    dynamic_box(&scene, Vector::new(1.5, 0.05));
    step_with_timeout(&scene).unwrap();
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert!(second.load(Ordering::SeqCst) >= 1);
}
