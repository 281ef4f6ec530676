use alpha2d::bodies::{Fixture, Material, RigidBody, RigidBodyType};
use alpha2d::collision::{Category, Filter};
use alpha2d::core::{BodyEventType, BodyHandle, CollisionEventType, PhysicsWorld, SimulationConfig};
use alpha2d::error::EngineError;
use alpha2d::math::{Aabb, Vector};
use alpha2d::shapes::{ConvexShape, Shape};
use approx::{assert_abs_diff_eq, assert_relative_eq};

const DT: f32 = 1.0 / 60.0;

fn box_part(width: f32, height: f32) -> ConvexShape {
    Shape::rect(-width / 2.0, -height / 2.0, width, height)
        .unwrap()
        .convex_parts()
        .unwrap()
        .remove(0)
}

fn add_box(world: &mut PhysicsWorld, position: Vector, size: Vector, body_type: RigidBodyType, material: Material) -> BodyHandle {
    let mut body = RigidBody::new(position, 0.0, body_type);
    body.add_fixture(Fixture::new(box_part(size.x, size.y), material));
    world.add_body(body)
}

fn add_ground(world: &mut PhysicsWorld) -> BodyHandle {
    add_box(world, Vector::new(0.0, -0.5), Vector::new(20.0, 1.0), RigidBodyType::Static, Material::new(1.0, 0.5, 0.0))
}

#[test]
fn test_rigid_body_creation() {
    let mut body = RigidBody::new_dynamic(Vector::new(0.0, 10.0));
    body.add_fixture(Fixture::new(box_part(2.0, 1.0), Material::new(3.0, 0.5, 0.0)));

    assert_eq!(body.get_position(), Vector::new(0.0, 10.0));
    assert_eq!(body.get_body_type(), RigidBodyType::Dynamic);
    assert!(body.get_linear_velocity().is_zero());
    assert_eq!(body.get_angular_velocity(), 0.0);
    assert!(body.is_awake());

    // Mass comes from density times area
    assert_relative_eq!(body.get_mass(), 6.0, epsilon = 1e-4);
    assert_relative_eq!(body.get_inverse_mass(), 1.0 / 6.0, epsilon = 1e-5);

    // Static bodies have no mass and start asleep
    let mut ground = RigidBody::new_static(Vector::zero());
    ground.add_fixture(Fixture::new(box_part(2.0, 1.0), Material::default()));
    assert_eq!(ground.get_mass(), 0.0);
    assert_eq!(ground.get_inverse_mass(), 0.0);
    assert!(!ground.is_awake());
}

#[test]
fn test_gravity_simulation() {
    let mut world = PhysicsWorld::new();
    let handle = add_box(&mut world, Vector::new(0.0, 10.0), Vector::new(1.0, 1.0), RigidBodyType::Dynamic, Material::default());

    for _ in 0..60 {
        world.step(DT, 6, 3);
    }

    let body = world.get_body(handle).unwrap();
    assert_relative_eq!(body.get_linear_velocity().y, -9.81, epsilon = 1e-3);

    // Semi-implicit Euler falls slightly further than the closed form
    let expected = 10.0 - 0.5 * 9.81;
    assert_abs_diff_eq!(body.get_position().y, expected, epsilon = 0.1);
    assert_relative_eq!(world.get_time(), 1.0, epsilon = 1e-4);
}

#[test]
fn test_gravity_scale() {
    let mut world = PhysicsWorld::new();
    let handle = add_box(&mut world, Vector::new(0.0, 10.0), Vector::new(1.0, 1.0), RigidBodyType::Dynamic, Material::default());
    world.get_body_mut(handle).unwrap().set_gravity_scale(0.0);

    for _ in 0..30 {
        world.step(DT, 6, 3);
    }

    assert_eq!(world.get_body(handle).unwrap().get_position(), Vector::new(0.0, 10.0));
}

#[test]
fn test_box_comes_to_rest_on_ground() {
    let mut world = PhysicsWorld::new();
    add_ground(&mut world);
    let handle = add_box(&mut world, Vector::new(0.0, 2.0), Vector::new(1.0, 1.0), RigidBodyType::Dynamic, Material::new(1.0, 0.5, 0.0));

    for _ in 0..240 {
        world.step(DT, 8, 3);
    }

    let body = world.get_body(handle).unwrap();
    // Resting on the ground top at y = 0, within the allowed slop
    assert_abs_diff_eq!(body.get_position().y, 0.5, epsilon = 0.02);
    assert_abs_diff_eq!(body.get_angle(), 0.0, epsilon = 1e-3);
    assert!(!body.is_awake(), "a resting box falls asleep");
    assert_eq!(world.contact_count(), 1);
}

#[test]
fn test_sleeping_body_wakes_on_impulse() {
    let mut world = PhysicsWorld::new();
    add_ground(&mut world);
    let handle = add_box(&mut world, Vector::new(0.0, 0.5), Vector::new(1.0, 1.0), RigidBodyType::Dynamic, Material::new(1.0, 0.5, 0.0));

    let mut slept = false;
    for _ in 0..120 {
        world.step(DT, 6, 3);
        if fell_asleep(&world, handle) {
            slept = true;
            break;
        }
    }
    assert!(slept, "expected a sleep event within two seconds");

    let body = world.get_body_mut(handle).unwrap();
    body.apply_linear_impulse(Vector::new(0.0, 5.0), body.get_world_center());
    assert!(body.is_awake());
    assert_relative_eq!(body.get_linear_velocity().y, 5.0, epsilon = 1e-4);
}

fn fell_asleep(world: &PhysicsWorld, handle: BodyHandle) -> bool {
    world
        .get_events()
        .get_body_events_of_type(BodyEventType::Sleep)
        .iter()
        .any(|event| event.body == handle)
}

#[test]
fn test_restitution_bounces() {
    let mut world = PhysicsWorld::new();
    add_ground(&mut world);

    let mut ball = RigidBody::new_dynamic(Vector::new(0.0, 3.0));
    ball.add_fixture(Fixture::new(ConvexShape::circle(Vector::zero(), 0.25), Material::new(1.0, 0.0, 1.0)));
    let handle = world.add_body(ball);

    let mut bounced = false;
    for _ in 0..120 {
        world.step(DT, 8, 3);
        if world.get_body(handle).unwrap().get_linear_velocity().y > 3.0 {
            bounced = true;
            break;
        }
    }
    assert!(bounced, "an elastic ball bounces back up");
}

#[test]
fn test_static_bodies_ignore_velocity_and_forces() {
    let mut body = RigidBody::new_static(Vector::zero());
    body.add_fixture(Fixture::new(box_part(1.0, 1.0), Material::default()));

    body.set_linear_velocity(Vector::new(1.0, 0.0));
    body.apply_force(Vector::new(10.0, 0.0));
    assert!(body.get_linear_velocity().is_zero());
    assert!(body.get_force().is_zero());
}

#[test]
fn test_body_type_change_resets_mass() {
    let mut body = RigidBody::new_dynamic(Vector::zero());
    body.add_fixture(Fixture::new(box_part(1.0, 1.0), Material::new(2.0, 0.5, 0.5)));
    body.set_linear_velocity(Vector::new(3.0, 0.0));
    assert_relative_eq!(body.get_mass(), 2.0, epsilon = 1e-5);

    body.set_body_type(RigidBodyType::Static);
    assert_eq!(body.get_mass(), 0.0);
    assert!(body.get_linear_velocity().is_zero());

    body.set_body_type(RigidBodyType::Dynamic);
    assert_relative_eq!(body.get_mass(), 2.0, epsilon = 1e-5);
    assert!(body.is_awake());
}

#[test]
fn test_set_mass_data_keeps_center() {
    let mut body = RigidBody::new_dynamic(Vector::zero());
    body.add_fixture(Fixture::new(box_part(2.0, 2.0), Material::new(1.0, 0.5, 0.5)));

    let mut data = body.get_mass_data();
    data.mass = 10.0;
    body.set_mass_data(&data);

    assert_relative_eq!(body.get_mass(), 10.0);
    assert_relative_eq!(body.get_inverse_mass(), 0.1);
    assert_eq!(body.get_local_center(), data.center);
    // Reported inertia is preserved
    assert_relative_eq!(body.get_inertia(), data.inertia, epsilon = 1e-4);
}

#[test]
fn test_fixed_rotation() {
    let mut body = RigidBody::new_dynamic(Vector::zero());
    body.add_fixture(Fixture::new(box_part(1.0, 1.0), Material::default()));
    body.set_fixed_rotation(true);

    body.apply_angular_impulse(5.0);
    assert_eq!(body.get_angular_velocity(), 0.0);
    assert_eq!(body.get_inverse_inertia(), 0.0);
}

#[test]
fn test_collision_events() {
    let mut world = PhysicsWorld::new();
    let ground = add_ground(&mut world);
    let falling = add_box(&mut world, Vector::new(0.0, 1.0), Vector::new(1.0, 1.0), RigidBodyType::Dynamic, Material::new(1.0, 0.5, 0.0));

    let mut begin_seen = 0;
    for _ in 0..120 {
        let mut events = Vec::new();
        world.step_with_listener(DT, 6, 3, |event| events.push(event.clone()));

        for event in events.iter().filter(|e| e.event_type == CollisionEventType::Begin) {
            assert!(!event.is_sensor);
            assert!(event.body_a() == ground || event.body_b() == ground);
            assert!(event.body_a() == falling || event.body_b() == falling);
            assert!(!event.contacts.is_empty());
            begin_seen += 1;
        }
    }
    assert_eq!(begin_seen, 1, "resting contact begins exactly once");

    // Lifting the box ends the contact
    let body = world.get_body_mut(falling).unwrap();
    body.set_transform(Vector::new(0.0, 5.0), 0.0);
    body.set_awake(true);
    world.step(DT, 6, 3);
    let ended = world.get_events().get_collision_events_of_type(CollisionEventType::End);
    assert_eq!(ended.len(), 1);
    assert_eq!(world.contact_count(), 0);
}

#[test]
fn test_sensor_reports_without_response() {
    let mut world = PhysicsWorld::new();

    let mut sensor = RigidBody::new_static(Vector::new(0.0, 0.0));
    let mut fixture = Fixture::new(box_part(4.0, 1.0), Material::default());
    fixture.set_sensor(true);
    sensor.add_fixture(fixture);
    world.add_body(sensor);

    let falling = add_box(&mut world, Vector::new(0.0, 2.0), Vector::new(0.5, 0.5), RigidBodyType::Dynamic, Material::default());

    let mut sensor_begin = false;
    for _ in 0..60 {
        world.step(DT, 6, 3);
        sensor_begin |= world
            .get_events()
            .get_collision_events_of_type(CollisionEventType::Begin)
            .iter()
            .any(|e| e.is_sensor);
    }

    assert!(sensor_begin);
    // The box fell straight through
    assert!(world.get_body(falling).unwrap().get_position().y < -1.0);
}

#[test]
fn test_empty_mask_never_collides() {
    let mut world = PhysicsWorld::new();
    let ground = add_ground(&mut world);
    world.get_body_mut(ground).unwrap().get_fixtures_mut()[0]
        .set_filter(Filter::new(Category::PASSIVE, Category::empty()));

    let falling = add_box(&mut world, Vector::new(0.0, 1.0), Vector::new(1.0, 1.0), RigidBodyType::Dynamic, Material::default());

    for _ in 0..60 {
        world.step(DT, 6, 3);
        assert!(world.get_events().get_collision_events_of_type(CollisionEventType::Begin).is_empty());
    }
    assert!(world.get_body(falling).unwrap().get_position().y < 0.0);
}

#[test]
fn test_remove_body_purges_contacts() {
    let mut world = PhysicsWorld::new();
    add_ground(&mut world);
    let resting = add_box(&mut world, Vector::new(0.0, 0.5), Vector::new(1.0, 1.0), RigidBodyType::Dynamic, Material::default());

    world.step(DT, 6, 3);
    assert_eq!(world.contact_count(), 1);

    world.remove_body(resting).unwrap();
    assert_eq!(world.contact_count(), 0);
    assert!(!world.contains_body(resting));
    assert!(matches!(world.remove_body(resting), Err(EngineError::ResourceNotFound(_))));

    // No end event for a removed body
    world.step(DT, 6, 3);
    assert!(world.get_events().get_collision_events_of_type(CollisionEventType::End).is_empty());
}

#[test]
fn test_spatial_queries() {
    let mut world = PhysicsWorld::new();
    let ground = add_ground(&mut world);
    let crate_body = add_box(&mut world, Vector::new(5.0, 5.0), Vector::new(1.0, 1.0), RigidBodyType::Dynamic, Material::default());

    let hits = world.aabb_query(&Aabb::new(Vector::new(4.9, 4.9), Vector::new(5.1, 5.1)));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].body, crate_body);

    let hits = world.aabb_query(&Aabb::new(Vector::new(-100.0, -100.0), Vector::new(100.0, 100.0)));
    assert_eq!(hits.len(), 2);

    assert_eq!(world.point_query(Vector::new(0.0, -0.5)), vec![ground]);
    assert!(world.point_query(Vector::new(0.0, 3.0)).is_empty());
}

#[test]
fn test_kinematic_body_pushes_dynamic() {
    let mut world = PhysicsWorld::with_config(SimulationConfig {
        gravity: Vector::zero(),
        ..SimulationConfig::default()
    });

    let pusher = add_box(&mut world, Vector::new(0.0, 0.0), Vector::new(1.0, 1.0), RigidBodyType::Kinematic, Material::default());
    let pushed = add_box(&mut world, Vector::new(1.2, 0.0), Vector::new(1.0, 1.0), RigidBodyType::Dynamic, Material::new(1.0, 0.0, 0.0));
    world.get_body_mut(pusher).unwrap().set_linear_velocity(Vector::new(2.0, 0.0));

    for _ in 0..60 {
        world.step(DT, 8, 3);
    }

    let pusher_x = world.get_body(pusher).unwrap().get_position().x;
    let pushed_x = world.get_body(pushed).unwrap().get_position().x;

    // The kinematic body is unaffected by the contact
    assert_relative_eq!(pusher_x, 2.0, epsilon = 1e-3);
    assert!(pushed_x > pusher_x + 0.9);
}
