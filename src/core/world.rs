use crate::bodies::{FixtureRef, Material, RigidBody, RigidBodyType};
use crate::collision::{
    collide, BroadPhase, BruteForceBroadPhase, CollisionPair, Contact, ContactSolver,
    SequentialImpulseSolver, SolverBody,
};
use crate::core::events::{BodyEventType, CollisionEventType};
use crate::core::island::IslandBuilder;
use crate::core::storage::Storage;
use crate::core::{
    BodyEvent, BodyHandle, BodyStorage, CollisionEvent, ContactPoint, EventQueue, SimulationConfig,
};
use crate::error::EngineError;
use crate::math::{Aabb, Point, Vector};
use crate::Result;

use std::collections::{HashMap, HashSet};

/// The 2D rigid-body world: owns every body and advances them in time
pub struct PhysicsWorld {
    /// All rigid bodies in the world
    bodies: BodyStorage<RigidBody>,

    /// Configuration for the simulation
    config: SimulationConfig,

    /// Events produced by the last step and by body changes since
    events: EventQueue,

    /// Fixture AABBs of the last collide phase
    broad_phase: BruteForceBroadPhase,

    /// Pairs that were touching at the end of the last step
    touching: HashSet<CollisionPair>,

    /// The total elapsed simulation time
    time: f32,
}

impl PhysicsWorld {
    /// Creates a new physics world with default settings
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    /// Creates a new physics world with the given configuration
    pub fn with_config(config: SimulationConfig) -> Self {
        Self {
            bodies: BodyStorage::new(),
            config,
            events: EventQueue::new(),
            broad_phase: BruteForceBroadPhase::new(),
            touching: HashSet::new(),
            time: 0.0,
        }
    }

    /// Returns the current simulation time
    pub fn get_time(&self) -> f32 {
        self.time
    }

    /// Sets the gravity for the simulation
    pub fn set_gravity(&mut self, gravity: Vector) {
        self.config.gravity = gravity;
    }

    /// Gets the current gravity
    pub fn get_gravity(&self) -> Vector {
        self.config.gravity
    }

    /// Returns a reference to the simulation configuration
    pub fn get_config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Returns a mutable reference to the simulation configuration
    pub fn get_config_mut(&mut self) -> &mut SimulationConfig {
        &mut self.config
    }

    /// Adds a rigid body to the world and returns its handle
    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        let handle = self.bodies.add(body);

        self.events.add_body_event(BodyEvent {
            event_type: BodyEventType::Added,
            body: handle,
        });

        handle
    }

    /// Removes a rigid body from the world
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<RigidBody> {
        self.bodies.get_body(handle)?;
        self.purge_contacts(handle);

        let removed = self.bodies.remove(handle).ok_or_else(|| {
            EngineError::ResourceNotFound(format!("Body with handle {:?} not found", handle))
        })?;

        self.events.add_body_event(BodyEvent {
            event_type: BodyEventType::Removed,
            body: handle,
        });

        Ok(removed)
    }

    /// Forgets every contact involving `handle` without reporting it
    pub fn purge_contacts(&mut self, handle: BodyHandle) {
        self.touching.retain(|pair| !pair.involves_body(handle));
    }

    /// Gets a body by its handle
    pub fn get_body(&self, handle: BodyHandle) -> Result<&RigidBody> {
        self.bodies.get_body(handle)
    }

    /// Gets a mutable reference to a body by its handle
    pub fn get_body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody> {
        self.bodies.get_body_mut(handle)
    }

    /// Returns whether the handle refers to a live body
    pub fn contains_body(&self, handle: BodyHandle) -> bool {
        self.bodies.get(handle).is_some()
    }

    /// Returns the handles of all bodies, sorted
    pub fn get_body_handles(&self) -> Vec<BodyHandle> {
        self.bodies.handles()
    }

    /// Returns the number of bodies in the world
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Returns the number of fixture pairs currently touching
    pub fn contact_count(&self) -> usize {
        self.touching.len()
    }

    /// Returns the event queue
    pub fn get_events(&self) -> &EventQueue {
        &self.events
    }

    /// Returns the event queue for draining
    pub fn get_events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Returns every fixture whose current AABB overlaps `aabb`, in
    /// unspecified order
    pub fn aabb_query(&self, aabb: &Aabb) -> Vec<FixtureRef> {
        let mut hits = Vec::new();

        for (handle, body) in self.bodies.iter() {
            let transform = body.get_transform();
            for (index, fixture) in body.get_fixtures().iter().enumerate() {
                if fixture.compute_aabb(&transform).intersects(aabb) {
                    hits.push(FixtureRef::new(handle, index));
                }
            }
        }

        hits
    }

    /// Returns the bodies that contain `point`
    pub fn point_query(&self, point: Point) -> Vec<BodyHandle> {
        self.bodies
            .iter()
            .filter(|(_, body)| body.test_point(point))
            .map(|(handle, _)| handle)
            .collect()
    }

    /// Advances the world by `dt` seconds
    pub fn step(&mut self, dt: f32, velocity_iterations: u32, position_iterations: u32) {
        self.step_with_listener(dt, velocity_iterations, position_iterations, |_| {});
    }

    /// Advances the world by `dt` seconds, handing every begin/end contact
    /// event to `listener` while the step is in progress
    pub fn step_with_listener<F>(&mut self, dt: f32, velocity_iterations: u32, position_iterations: u32, mut listener: F)
    where
        F: FnMut(&CollisionEvent),
    {
        self.events.clear();

        let contacts = self.update_contacts(&mut listener);

        if dt > 0.0 {
            self.solve(dt, velocity_iterations, position_iterations, &contacts);
            self.update_sleep(dt, &contacts);
            self.time += dt;
        }

        for (_, body) in self.bodies.iter_mut() {
            body.clear_forces();
        }
    }

    /// Finds touching pairs, reports begin/end events and wakes bodies
    /// touched by awake ones
    fn update_contacts<F>(&mut self, listener: &mut F) -> Vec<Contact>
    where
        F: FnMut(&CollisionEvent),
    {
        let mut proxies: Vec<(FixtureRef, Aabb)> = Vec::new();
        for (handle, body) in self.bodies.iter().filter(|(_, b)| b.is_active()) {
            let transform = body.get_transform();
            for (index, fixture) in body.get_fixtures().iter().enumerate() {
                proxies.push((FixtureRef::new(handle, index), fixture.compute_aabb(&transform)));
            }
        }
        proxies.sort_by_key(|(fixture, _)| *fixture);
        self.broad_phase.update(proxies);

        let mut current = HashSet::new();
        let mut contacts = Vec::new();

        for pair in self.broad_phase.get_collision_pairs() {
            let (body_a, body_b) = match (self.bodies.get(pair.fixture_a.body), self.bodies.get(pair.fixture_b.body)) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };

            if !body_a.get_body_type().is_dynamic() && !body_b.get_body_type().is_dynamic() {
                continue;
            }

            let fixture_a = &body_a.get_fixtures()[pair.fixture_a.index];
            let fixture_b = &body_b.get_fixtures()[pair.fixture_b.index];

            if !fixture_a.get_filter().should_collide(&fixture_b.get_filter()) {
                continue;
            }

            // Resting pairs keep their state until one side wakes up
            if !body_a.is_awake() && !body_b.is_awake() {
                if self.touching.contains(&pair) {
                    current.insert(pair);
                }
                continue;
            }

            let manifold = match collide(
                fixture_a.get_shape(),
                &body_a.get_transform(),
                fixture_b.get_shape(),
                &body_b.get_transform(),
            ) {
                Some(manifold) => manifold,
                None => continue,
            };

            let is_sensor = fixture_a.is_sensor() || fixture_b.is_sensor();
            current.insert(pair);
            contacts.push(Contact {
                pair,
                manifold: if is_sensor { None } else { Some(manifold) },
                friction: Material::mix_friction(fixture_a.get_friction(), fixture_b.get_friction()),
                restitution: Material::mix_restitution(fixture_a.get_restitution(), fixture_b.get_restitution()),
                is_sensor,
            });
        }

        for contact in contacts.iter().filter(|c| !self.touching.contains(&c.pair)) {
            let event = CollisionEvent {
                event_type: CollisionEventType::Begin,
                fixture_a: contact.pair.fixture_a,
                fixture_b: contact.pair.fixture_b,
                is_sensor: contact.is_sensor,
                contacts: self.contact_points(contact),
            };
            listener(&event);
            self.events.add_collision_event(event);
        }

        let mut ended: Vec<CollisionPair> = self.touching.difference(&current).copied().collect();
        ended.sort();
        for pair in ended {
            let is_sensor = self.is_sensor_pair(&pair);
            let event = CollisionEvent {
                event_type: CollisionEventType::End,
                fixture_a: pair.fixture_a,
                fixture_b: pair.fixture_b,
                is_sensor,
                contacts: Vec::new(),
            };
            listener(&event);
            self.events.add_collision_event(event);
        }

        self.touching = current;

        for contact in contacts.iter().filter(|c| !c.is_sensor) {
            let a = contact.pair.fixture_a.body;
            let b = contact.pair.fixture_b.body;
            let awake_a = self.bodies.get(a).map_or(false, RigidBody::is_awake);
            let awake_b = self.bodies.get(b).map_or(false, RigidBody::is_awake);

            if awake_a != awake_b {
                let sleeper = if awake_a { b } else { a };
                if let Some(body) = self.bodies.get_mut(sleeper) {
                    body.set_awake(true);
                }
            }
        }

        contacts
    }

    fn contact_points(&self, contact: &Contact) -> Vec<ContactPoint> {
        let manifold = match &contact.manifold {
            Some(manifold) => manifold,
            None => return Vec::new(),
        };

        match (self.bodies.get(contact.pair.fixture_a.body), self.bodies.get(contact.pair.fixture_b.body)) {
            (Some(a), Some(b)) => {
                let world = manifold.world_manifold(&a.get_transform(), &b.get_transform());
                world
                    .points
                    .iter()
                    .map(|p| ContactPoint {
                        position: p.point,
                        normal: world.normal,
                        separation: p.separation,
                    })
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    fn is_sensor_pair(&self, pair: &CollisionPair) -> bool {
        let sensor = |fixture: FixtureRef| {
            self.bodies
                .get(fixture.body)
                .and_then(|body| body.get_fixtures().get(fixture.index))
                .map_or(false, |f| f.is_sensor())
        };

        sensor(pair.fixture_a) || sensor(pair.fixture_b)
    }

    fn solve(&mut self, dt: f32, velocity_iterations: u32, position_iterations: u32, contacts: &[Contact]) {
        let gravity = self.config.gravity;
        for (_, body) in self.bodies.iter_mut() {
            body.integrate_velocities(dt, gravity);
        }

        let handles: Vec<BodyHandle> = self
            .bodies
            .handles()
            .into_iter()
            .filter(|h| self.bodies.get(*h).map_or(false, RigidBody::is_active))
            .collect();

        let mut index: HashMap<BodyHandle, usize> = HashMap::with_capacity(handles.len());
        let mut solver_bodies: Vec<SolverBody> = Vec::with_capacity(handles.len());

        for handle in &handles {
            if let Some(body) = self.bodies.get(*handle) {
                index.insert(*handle, solver_bodies.len());
                solver_bodies.push(SolverBody {
                    center: body.get_world_center(),
                    angle: body.get_angle(),
                    linear_velocity: body.get_linear_velocity(),
                    angular_velocity: body.get_angular_velocity(),
                    inv_mass: body.get_inverse_mass(),
                    inv_inertia: body.get_inverse_inertia(),
                    local_center: body.get_local_center(),
                });
            }
        }

        let entries: Vec<(usize, usize, &Contact)> = contacts
            .iter()
            .filter_map(|contact| {
                let a = index.get(&contact.pair.fixture_a.body)?;
                let b = index.get(&contact.pair.fixture_b.body)?;
                Some((*a, *b, contact))
            })
            .collect();

        let mut solver = SequentialImpulseSolver::new(&self.config);
        solver.prepare(&entries, &solver_bodies);

        for _ in 0..velocity_iterations {
            solver.solve_velocity(&mut solver_bodies);
        }

        let moving: Vec<bool> = handles
            .iter()
            .map(|h| {
                self.bodies
                    .get(*h)
                    .map_or(false, |b| b.get_body_type() != RigidBodyType::Static && b.is_awake())
            })
            .collect();

        let max_translation = self.config.max_translation;
        let max_rotation = self.config.max_rotation;

        for (body, _) in solver_bodies.iter_mut().zip(&moving).filter(|(_, m)| **m) {
            let translation = body.linear_velocity * dt;
            if translation.length_squared() > max_translation * max_translation {
                body.linear_velocity *= max_translation / translation.length();
            }

            let rotation = body.angular_velocity * dt;
            if rotation * rotation > max_rotation * max_rotation {
                body.angular_velocity *= max_rotation / rotation.abs();
            }

            body.center += body.linear_velocity * dt;
            body.angle += body.angular_velocity * dt;
        }

        for _ in 0..position_iterations {
            if solver.solve_position(&mut solver_bodies) {
                break;
            }
        }

        for ((handle, state), moving) in handles.iter().zip(&solver_bodies).zip(&moving) {
            if !moving {
                continue;
            }
            if let Some(body) = self.bodies.get_mut(*handle) {
                body.synchronize(state.center, state.angle, state.linear_velocity, state.angular_velocity);
            }
        }
    }

    fn update_sleep(&mut self, dt: f32, contacts: &[Contact]) {
        if !self.config.allow_sleeping {
            return;
        }

        let simulated = |body: &RigidBody| {
            body.get_body_type() != RigidBodyType::Static && body.is_awake() && body.is_active()
        };

        let mut builder = IslandBuilder::new();
        for (handle, body) in self.bodies.iter() {
            if simulated(body) {
                builder.add_body(handle);
            }
        }

        for contact in contacts.iter().filter(|c| !c.is_sensor) {
            let a = contact.pair.fixture_a.body;
            let b = contact.pair.fixture_b.body;
            let both = self.bodies.get(a).map_or(false, simulated) && self.bodies.get(b).map_or(false, simulated);
            if both {
                builder.add_connection(a, b);
            }
        }

        let linear_tolerance = self.config.linear_sleep_tolerance;
        let angular_tolerance = self.config.angular_sleep_tolerance;

        for island in builder.build() {
            let mut min_sleep_time = f32::MAX;
            for handle in &island.bodies {
                if let Some(body) = self.bodies.get_mut(*handle) {
                    let rest = body.update_sleep_time(dt, linear_tolerance, angular_tolerance);
                    min_sleep_time = min_sleep_time.min(rest);
                }
            }

            if min_sleep_time >= self.config.time_to_sleep {
                for handle in &island.bodies {
                    if let Some(body) = self.bodies.get_mut(*handle) {
                        body.set_awake(false);
                    }
                    self.events.add_body_event(BodyEvent {
                        event_type: BodyEventType::Sleep,
                        body: *handle,
                    });
                }
            }
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
