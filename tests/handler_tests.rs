use alpha2d::error::EngineError;
use alpha2d::math::Vector;
use alpha2d::{Actor, EngineConfig, PhysicsType, Scene};
use approx::{assert_abs_diff_eq, assert_relative_eq};
use std::sync::Arc;
use std::thread;

// One pixel per metre keeps shapes metric
fn metric_scene() -> Scene {
    Scene::with_name(
        "handler-test",
        EngineConfig {
            pixels_per_meter: 1.0,
            ticker_pool_size: 1,
            ..EngineConfig::default()
        },
    )
    .unwrap()
}

#[test]
fn test_proxy_keeps_settings_until_attached() {
    let scene = metric_scene();
    let actor = Actor::rect(&scene, 2.0, 1.0).unwrap();
    assert!(!actor.is_attached());

    actor.set_type(PhysicsType::Dynamic).unwrap();
    actor.set_position(Vector::new(3.0, 4.0)).unwrap();
    actor.set_velocity(Vector::new(1.0, 0.0)).unwrap();
    actor.set_density(4.0).unwrap();
    actor.set_friction(0.2).unwrap();
    actor.set_rotation_locked(true).unwrap();

    // Forces on a detached actor are accepted and dropped
    actor.apply_force(Vector::new(10.0, 0.0)).unwrap();
    actor.apply_impulse(Vector::new(1.0, 0.0), Vector::zero()).unwrap();

    scene.add(&actor).unwrap();
    assert!(actor.is_attached());

    assert_eq!(actor.get_position().unwrap(), Vector::new(3.0, 4.0));
    assert_eq!(actor.get_velocity().unwrap(), Vector::new(1.0, 0.0));
    assert_eq!(actor.get_type().unwrap(), PhysicsType::Dynamic);
    assert_relative_eq!(actor.get_density().unwrap(), 4.0);
    assert_relative_eq!(actor.get_friction().unwrap(), 0.2);
    assert!(actor.is_rotation_locked().unwrap());
    assert_relative_eq!(actor.get_mass().unwrap(), 8.0, epsilon = 1e-4);
}

#[test]
fn test_proxy_mass_follows_density() {
    let scene = metric_scene();
    let actor = Actor::rect(&scene, 2.0, 3.0).unwrap();
    actor.set_density(1.0).unwrap();
    assert_relative_eq!(actor.get_mass().unwrap(), 6.0, epsilon = 1e-5);

    actor.set_mass(5.0).unwrap();
    assert_relative_eq!(actor.get_mass().unwrap(), 5.0);
}

#[test]
fn test_invalid_arguments_are_rejected() {
    let scene = metric_scene();
    let actor = Actor::rect(&scene, 1.0, 1.0).unwrap();
    assert!(matches!(actor.set_density(-1.0), Err(EngineError::Precondition(_))));
    assert!(matches!(actor.set_friction(f32::NAN), Err(EngineError::Precondition(_))));
    assert!(matches!(actor.set_mass(0.0), Err(EngineError::Precondition(_))));
    assert!(matches!(actor.move_by(Vector::new(f32::INFINITY, 0.0)), Err(EngineError::Precondition(_))));

    assert!(matches!(Actor::rect(&scene, 0.0, 1.0), Err(EngineError::Precondition(_))));
    assert!(matches!(Actor::circle(&scene, -1.0), Err(EngineError::Precondition(_))));
}

#[test]
fn test_material_applies_to_every_fixture() {
    let scene = metric_scene();

    // An arrow made of two disjoint boxes yields two fixtures
    let actor = Actor::from_shape(&scene, 
        alpha2d::Shape::compound(vec![
            alpha2d::Shape::rect(0.0, 0.0, 1.0, 1.0).unwrap(),
            alpha2d::Shape::rect(2.0, 0.0, 1.0, 1.0).unwrap(),
        ])
        .unwrap(),
    );
    scene.add(&actor).unwrap();

    actor.set_restitution(0.9).unwrap();
    actor.set_friction(0.1).unwrap();

    let body = actor.body_handle().unwrap();
    scene
        .world_handler()
        .with_world(|world| {
            let fixtures = world.get_body(body).unwrap().get_fixtures();
            assert_eq!(fixtures.len(), 2);
            for fixture in fixtures {
                assert_relative_eq!(fixture.get_material().restitution, 0.9);
                assert_relative_eq!(fixture.get_material().friction, 0.1);
            }
        })
        .unwrap();
}

#[test]
fn test_set_type_is_idempotent() {
    let scene = metric_scene();
    let actor = Actor::rect(&scene, 1.0, 1.0).unwrap();
    actor.set_type(PhysicsType::Dynamic).unwrap();
    scene.add(&actor).unwrap();

    actor.set_velocity(Vector::new(2.0, 0.0)).unwrap();
    actor.set_gravity_scale(0.5).unwrap();

    // Same type again: nothing is reset
    actor.set_type(PhysicsType::Dynamic).unwrap();
    assert_eq!(actor.get_velocity().unwrap(), Vector::new(2.0, 0.0));
    assert_relative_eq!(actor.get_gravity_scale().unwrap(), 0.5);
}

#[test]
fn test_passive_actor_is_a_weightless_sensor() {
    let scene = metric_scene();
    let actor = Actor::circle(&scene, 0.5).unwrap();
    actor.set_type(PhysicsType::Dynamic).unwrap();
    scene.add(&actor).unwrap();

    actor.set_type(PhysicsType::Passive).unwrap();
    assert_eq!(actor.get_type().unwrap(), PhysicsType::Passive);
    assert!(actor.is_sensor().unwrap());
    assert_eq!(actor.get_gravity_scale().unwrap(), 0.0);

    let body = actor.body_handle().unwrap();
    scene
        .world_handler()
        .with_world(|world| {
            let fixture = &world.get_body(body).unwrap().get_fixtures()[0];
            assert!(fixture.get_filter().mask.is_empty());
        })
        .unwrap();

    // Back to solid
    actor.set_type(PhysicsType::Static).unwrap();
    assert!(!actor.is_sensor().unwrap());
    assert_eq!(actor.get_gravity_scale().unwrap(), 1.0);
}

#[test]
fn test_ground_test_needs_a_dynamic_attached_actor() {
    let scene = metric_scene();
    let actor = Actor::rect(&scene, 1.0, 1.0).unwrap();
    actor.set_type(PhysicsType::Dynamic).unwrap();
    actor.set_position(Vector::new(5.0, 5.0)).unwrap();
    assert!(matches!(actor.is_grounded(), Err(EngineError::Lifecycle(_))));

    let wall = Actor::rect(&scene, 1.0, 1.0).unwrap();
    scene.add(&wall).unwrap();
    assert!(matches!(wall.is_grounded(), Err(EngineError::Precondition(_))));

    // Nothing below the actor, far from the wall
    scene.add(&actor).unwrap();
    assert!(!actor.is_grounded().unwrap());

    // Overlapping a static actor counts as standing on it
    actor.set_position(Vector::zero()).unwrap();
    assert!(actor.is_grounded().unwrap());
}

#[test]
fn test_ground_test_ignores_non_static_actors() {
    let scene = metric_scene();

    let platform = Actor::rect(&scene, 4.0, 1.0).unwrap();
    platform.set_type(PhysicsType::Kinematic).unwrap();
    scene.add(&platform).unwrap();

    let player = Actor::rect(&scene, 1.0, 1.0).unwrap();
    player.set_type(PhysicsType::Dynamic).unwrap();
    player.set_position(Vector::new(1.5, 1.0)).unwrap();
    scene.add(&player).unwrap();

    assert!(!player.is_grounded().unwrap());

    platform.set_type(PhysicsType::Static).unwrap();
    assert!(player.is_grounded().unwrap());
}

#[test]
fn test_reverse_map_tracks_scene_membership() {
    let scene = metric_scene();
    let world = scene.world_handler();

    let actors: Vec<Actor> = (0..5)
        .map(|i| {
            let actor = Actor::rect(&scene, 1.0, 1.0).unwrap();
            actor.set_position(Vector::new(i as f32 * 2.0, 0.0)).unwrap();
            actor
        })
        .collect();

    for actor in &actors {
        scene.add(actor).unwrap();
        assert!(world.is_consistent().unwrap());
    }
    assert_eq!(world.body_count().unwrap(), 5);

    for actor in &actors {
        let body = actor.body_handle().unwrap();
        let found = world.lookup_actor(body).unwrap().unwrap();
        assert_eq!(found, *actor);
    }

    let removed = actors[2].body_handle().unwrap();
    scene.remove(&actors[2]).unwrap();
    assert!(!actors[2].is_attached());
    assert!(world.lookup_actor(removed).unwrap().is_none());
    assert!(world.is_consistent().unwrap());
    assert_eq!(world.body_count().unwrap(), 4);

    // Removing twice is a lifecycle error
    assert!(matches!(scene.remove(&actors[2]), Err(EngineError::Lifecycle(_))));
}

#[test]
fn test_actor_cannot_join_two_scenes() {
    let first = metric_scene();
    let second = metric_scene();
    let actor = Actor::circle(&first, 1.0).unwrap();

    first.add(&actor).unwrap();
    assert!(matches!(second.add(&actor), Err(EngineError::Lifecycle(_))));
    assert_eq!(second.world_handler().body_count().unwrap(), 0);
}

#[test]
fn test_contains_uses_the_actual_shape() {
    let scene = metric_scene();
    let ball = Actor::circle(&scene, 1.0).unwrap();
    ball.set_position(Vector::new(5.0, 5.0)).unwrap();

    assert!(ball.contains(Vector::new(5.5, 5.5)).unwrap());
    scene.add(&ball).unwrap();

    assert!(ball.contains(Vector::new(5.5, 5.5)).unwrap());
    // Inside the AABB, outside the circle
    assert!(!ball.contains(Vector::new(5.9, 5.9)).unwrap());

    let hits = scene.actors_at(Vector::new(5.0, 5.0)).unwrap();
    assert_eq!(hits.len(), 1);
    assert!(scene.actors_at(Vector::new(5.9, 5.9)).unwrap().is_empty());
}

#[test]
fn test_detached_actor_measures_at_its_scene_scale() {
    let scene = Scene::with_name(
        "scaled",
        EngineConfig {
            pixels_per_meter: 60.0,
            ticker_pool_size: 1,
            ..EngineConfig::default()
        },
    )
    .unwrap();

    // 60 px at 60 px/m: a one metre radius
    let ball = Actor::circle(&scene, 60.0).unwrap();
    ball.set_type(PhysicsType::Dynamic).unwrap();

    let inside = Vector::new(0.9, 0.0);
    let outside = Vector::new(1.5, 0.0);
    let detached = (
        ball.contains(inside).unwrap(),
        ball.contains(outside).unwrap(),
        ball.get_mass().unwrap(),
        ball.get_center().unwrap(),
    );
    assert!(detached.0);
    assert!(!detached.1);
    assert_relative_eq!(detached.2, 10.0 * std::f32::consts::PI, epsilon = 1e-3);

    scene.add(&ball).unwrap();
    assert_eq!(ball.contains(inside).unwrap(), detached.0);
    assert_eq!(ball.contains(outside).unwrap(), detached.1);
    assert_relative_eq!(ball.get_mass().unwrap(), detached.2, epsilon = 1e-3);
    assert_abs_diff_eq!(ball.get_center().unwrap().x, detached.3.x, epsilon = 1e-5);
    assert_abs_diff_eq!(ball.get_center().unwrap().y, detached.3.y, epsilon = 1e-5);
}

#[test]
fn test_center_depends_on_type() {
    let scene = metric_scene();
    let actor = Actor::rect(&scene, 2.0, 4.0).unwrap();
    actor.set_position(Vector::new(1.0, 1.0)).unwrap();
    scene.add(&actor).unwrap();

    // Static: center of the bounds
    let center = actor.get_center().unwrap();
    assert_abs_diff_eq!(center.x, 2.0, epsilon = 1e-5);
    assert_abs_diff_eq!(center.y, 3.0, epsilon = 1e-5);

    // Dynamic: center of mass, which coincides for a uniform box
    actor.set_type(PhysicsType::Dynamic).unwrap();
    let center = actor.get_center().unwrap();
    assert_abs_diff_eq!(center.x, 2.0, epsilon = 1e-5);
    assert_abs_diff_eq!(center.y, 3.0, epsilon = 1e-5);
}

#[test]
fn test_static_actor_ignores_velocity() {
    let scene = metric_scene();
    let wall = Actor::rect(&scene, 1.0, 1.0).unwrap();
    scene.add(&wall).unwrap();

    wall.set_velocity(Vector::new(5.0, 0.0)).unwrap();
    assert!(wall.get_velocity().unwrap().is_zero());

    // Moving a static actor is explicit
    wall.move_by(Vector::new(1.0, 0.0)).unwrap();
    assert_eq!(wall.get_position().unwrap(), Vector::new(1.0, 0.0));
}

#[test]
fn test_reset_movement_stops_the_body() {
    let scene = metric_scene();
    let actor = Actor::rect(&scene, 1.0, 1.0).unwrap();
    actor.set_type(PhysicsType::Dynamic).unwrap();
    scene.add(&actor).unwrap();

    actor.set_velocity(Vector::new(3.0, 1.0)).unwrap();
    actor.set_angular_velocity(2.0).unwrap();
    actor.reset_movement().unwrap();

    assert!(actor.get_velocity().unwrap().is_zero());
    assert_eq!(actor.get_angular_velocity().unwrap(), 0.0);
}

#[test]
fn test_set_mass_overrides_density() {
    let scene = metric_scene();
    let actor = Actor::rect(&scene, 1.0, 1.0).unwrap();
    actor.set_type(PhysicsType::Dynamic).unwrap();
    scene.add(&actor).unwrap();

    actor.set_mass(12.0).unwrap();
    assert_relative_eq!(actor.get_mass().unwrap(), 12.0);

    // Density recomputes the mass from the shape
    actor.set_density(3.0).unwrap();
    assert_relative_eq!(actor.get_mass().unwrap(), 3.0, epsilon = 1e-5);
}

#[test]
fn test_render_items_follow_layers() {
    let scene = metric_scene();
    let back = Actor::rect(&scene, 1.0, 1.0).unwrap();
    let front = Actor::rect(&scene, 1.0, 1.0).unwrap();
    let middle = Actor::circle(&scene, 1.0).unwrap();

    front.set_layer(2);
    middle.set_layer(1);
    back.set_color(alpha2d::Color::BLUE);

    scene.add(&front).unwrap();
    scene.add(&back).unwrap();
    scene.add(&middle).unwrap();

    let order: Vec<_> = scene.render_items().unwrap().into_iter().map(|item| item.id).collect();
    assert_eq!(order, vec![back.id(), middle.id(), front.id()]);
    assert_eq!(back.get_color(), alpha2d::Color::BLUE);
}

#[test]
fn test_release_body_clears_both_maps() {
    let scene = metric_scene();
    let world = scene.world_handler();

    let first = Actor::rect(&scene, 1.0, 1.0).unwrap();
    let second = Actor::rect(&scene, 1.0, 1.0).unwrap();
    second.set_position(Vector::new(3.0, 0.0)).unwrap();
    scene.add(&first).unwrap();
    scene.add(&second).unwrap();

    let body = first.body_handle().unwrap();
    world.release_body(body).unwrap();
    assert!(world.lookup_actor(body).unwrap().is_none());
    assert_eq!(world.body_count().unwrap(), 1);
    assert!(world.is_consistent().unwrap());

    // The two-call form reaches the same state
    let body = second.body_handle().unwrap();
    world.remove_all_internal_references(body).unwrap();
    world.destroy_body(body).unwrap();
    assert_eq!(world.body_count().unwrap(), 0);
    assert!(world.is_consistent().unwrap());
}

#[test]
fn test_reverse_map_stays_consistent_under_churn() {
    let scene = Arc::new(metric_scene());
    let actor = Actor::rect(&scene, 1.0, 1.0).unwrap();

    let churn = {
        let scene = Arc::clone(&scene);
        thread::spawn(move || {
            for _ in 0..500 {
                scene.add(&actor).unwrap();
                scene.remove(&actor).unwrap();
            }
        })
    };

    // Removal never shows a body without its reverse-map entry
    while !churn.is_finished() {
        assert!(scene.world_handler().is_consistent().unwrap());
    }
    churn.join().unwrap();
    assert_eq!(scene.world_handler().body_count().unwrap(), 0);
}
