use crate::actor::{Actor, ActorId, ActorInner};
use crate::bodies::FixtureRef;
use crate::core::{BodyHandle, CollisionEventType, ContactPoint, PhysicsWorld, SimulationConfig};
use crate::error::EngineError;
use crate::math::{Aabb, Vector};
use crate::physics::{PhysicsType, ProxyData};
use crate::Result;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, trace, warn};

/// A request queued while the world was stepping
pub type DeferredRequest = Box<dyn FnOnce() + Send>;

/// Receives begin/end contacts between actors while the world steps
pub type ContactListener = Box<dyn FnMut(&ActorContact) + Send>;

/// Reverse-map entry of a body created through the world handler
#[derive(Debug, Clone)]
pub struct ActorEntry {
    /// Id of the owning actor
    pub id: ActorId,

    /// Game-level type of the actor
    pub physics_type: PhysicsType,

    actor: Weak<ActorInner>,
}

impl ActorEntry {
    /// Returns the owning actor if it is still alive
    pub fn actor(&self) -> Option<Actor> {
        self.actor.upgrade().map(Actor::from_inner)
    }
}

/// A contact between two actors, reported during a world step.
///
/// Mutating either actor from the listener fails with
/// `EngineError::ConcurrentMutation`; use `WorldHandler::run_after_step`.
#[derive(Debug, Clone)]
pub struct ActorContact {
    /// Whether the actors started or stopped touching
    pub event_type: CollisionEventType,

    /// Actor owning fixture A
    pub actor_a: Option<Actor>,

    /// Actor owning fixture B
    pub actor_b: Option<Actor>,

    /// Whether either fixture is a sensor
    pub is_sensor: bool,

    /// Contact points, normal pointing from A to B (empty for end events)
    pub contacts: Vec<ContactPoint>,
}

struct WorldState {
    world: PhysicsWorld,
    actors: HashMap<BodyHandle, ActorEntry>,
}

impl WorldState {
    fn purge(&mut self, body: BodyHandle) {
        self.actors.remove(&body);
        self.world.purge_contacts(body);
    }

    fn destroy(&mut self, body: BodyHandle) -> Result<()> {
        if self.actors.remove(&body).is_some() {
            warn!(body = body.id(), "destroying a body that is still mapped to an actor");
        }
        self.world.remove_body(body).map(|_| ())
    }
}

// The step takes the listener out of the slot while it runs, so the listener
// may replace or clear itself. `replaced` tells the step not to put it back.
#[derive(Default)]
struct ListenerSlot {
    listener: Option<ContactListener>,
    replaced: bool,
}

/// Resets the stepping flag even if the solver or a listener panics
struct StepGuard<'a> {
    handler: &'a WorldHandler,
}

impl Drop for StepGuard<'_> {
    fn drop(&mut self) {
        let _queue = self.handler.lock_deferred();
        self.handler.stepping.store(false, Ordering::SeqCst);
    }
}

/// Owns the physics world and everything that maps it back to actors.
///
/// Every world-touching operation goes through the internal lock. While a
/// step runs, all of them fail fast with `ConcurrentMutation` instead of
/// blocking, so contact listeners cannot deadlock. Listener management does
/// not touch the world and stays available during a step.
pub struct WorldHandler {
    state: Mutex<WorldState>,
    stepping: AtomicBool,
    deferred: Mutex<Vec<DeferredRequest>>,
    contact_listener: Mutex<ListenerSlot>,
    pixels_per_meter: f32,
}

impl WorldHandler {
    /// Creates a handler around a fresh world
    pub fn new(pixels_per_meter: f32, config: SimulationConfig) -> Self {
        Self {
            state: Mutex::new(WorldState {
                world: PhysicsWorld::with_config(config),
                actors: HashMap::new(),
            }),
            stepping: AtomicBool::new(false),
            deferred: Mutex::new(Vec::new()),
            contact_listener: Mutex::new(ListenerSlot::default()),
            pixels_per_meter,
        }
    }

    /// Returns the scene scale used to convert shapes to metres
    pub fn pixels_per_meter(&self) -> f32 {
        self.pixels_per_meter
    }

    /// Returns true while a world step is in progress
    pub fn is_stepping(&self) -> bool {
        self.stepping.load(Ordering::SeqCst)
    }

    /// Fails with `ConcurrentMutation` while a world step is in progress
    pub fn assert_no_world_step(&self) -> Result<()> {
        if self.is_stepping() {
            return Err(EngineError::ConcurrentMutation);
        }
        Ok(())
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, WorldState>> {
        self.assert_no_world_step()?;
        Ok(self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn lock_deferred(&self) -> MutexGuard<'_, Vec<DeferredRequest>> {
        self.deferred.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listener(&self) -> MutexGuard<'_, ListenerSlot> {
        self.contact_listener.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with exclusive access to the world and the reverse map
    pub(crate) fn with_state<R>(
        &self,
        f: impl FnOnce(&mut PhysicsWorld, &mut HashMap<BodyHandle, ActorEntry>) -> Result<R>,
    ) -> Result<R> {
        let mut state = self.lock_state()?;
        let WorldState { world, actors } = &mut *state;
        f(world, actors)
    }

    /// Runs `f` with exclusive access to the world
    pub fn with_world<R>(&self, f: impl FnOnce(&mut PhysicsWorld) -> R) -> Result<R> {
        self.with_state(|world, _| Ok(f(world)))
    }

    /// Builds a body from `proxy` and registers it for `actor`
    pub fn create_body(&self, actor: &Actor, proxy: &ProxyData) -> Result<BodyHandle> {
        let body = proxy.build_body(self.pixels_per_meter)?;

        self.with_state(|world, actors| {
            let handle = world.add_body(body);
            actors.insert(handle, ActorEntry {
                id: actor.id(),
                physics_type: proxy.physics_type,
                actor: actor.downgrade(),
            });

            debug!(actor = %actor.id(), body = handle.id(), physics_type = ?proxy.physics_type, "body created");
            Ok(handle)
        })
    }

    /// Maps an existing body to `actor`
    pub fn register(&self, body: BodyHandle, actor: &Actor, physics_type: PhysicsType) -> Result<()> {
        self.with_state(|world, actors| {
            world.get_body(body)?;

            if actors.contains_key(&body) {
                return Err(EngineError::Lifecycle(format!(
                    "body {} is already registered",
                    body.id()
                )));
            }

            actors.insert(body, ActorEntry {
                id: actor.id(),
                physics_type,
                actor: actor.downgrade(),
            });
            Ok(())
        })
    }

    /// Returns the actor mapped to `body`, if any
    pub fn lookup_actor(&self, body: BodyHandle) -> Result<Option<Actor>> {
        self.with_state(|_, actors| Ok(actors.get(&body).and_then(ActorEntry::actor)))
    }

    /// Returns the physics type recorded for `body`, if any
    pub fn lookup_type(&self, body: BodyHandle) -> Result<Option<PhysicsType>> {
        self.with_state(|_, actors| Ok(actors.get(&body).map(|entry| entry.physics_type)))
    }

    /// Purges every reference the handler keeps to `body`. Must precede
    /// `destroy_body`.
    pub fn remove_all_internal_references(&self, body: BodyHandle) -> Result<()> {
        self.lock_state()?.purge(body);
        Ok(())
    }

    /// Removes `body` from the world
    pub fn destroy_body(&self, body: BodyHandle) -> Result<()> {
        self.lock_state()?.destroy(body)
    }

    /// Purges every reference to `body` and removes it from the world under
    /// a single lock, so no one observes a body missing from the reverse map
    pub fn release_body(&self, body: BodyHandle) -> Result<()> {
        let mut state = self.lock_state()?;
        state.purge(body);
        state.destroy(body)?;
        debug!(body = body.id(), "body released");
        Ok(())
    }

    /// Returns the fixtures whose AABB overlaps `aabb`, in unspecified order
    pub fn aabb_query(&self, aabb: &Aabb) -> Result<Vec<FixtureRef>> {
        self.with_state(|world, _| Ok(world.aabb_query(aabb)))
    }

    /// Advances the world by `dt` seconds.
    ///
    /// The contact listener runs inside the step; if it installs or clears
    /// a listener, that change wins over the running one. Deferred requests
    /// run once the step has finished and the world lock is released.
    pub fn step(&self, dt: f32, velocity_iterations: u32, position_iterations: u32) -> Result<()> {
        {
            let mut state = self.lock_state()?;
            self.stepping.store(true, Ordering::SeqCst);
            let _guard = StepGuard { handler: self };

            let WorldState { world, actors } = &mut *state;
            let mut listener = {
                let mut slot = self.lock_listener();
                slot.replaced = false;
                slot.listener.take()
            };

            world.step_with_listener(dt, velocity_iterations, position_iterations, |event| {
                if let Some(listener) = listener.as_mut() {
                    let lookup = |body: BodyHandle| actors.get(&body).and_then(ActorEntry::actor);
                    listener(&ActorContact {
                        event_type: event.event_type,
                        actor_a: lookup(event.body_a()),
                        actor_b: lookup(event.body_b()),
                        is_sensor: event.is_sensor,
                        contacts: event.contacts.clone(),
                    });
                }
            });

            let mut slot = self.lock_listener();
            if !slot.replaced {
                slot.listener = listener;
            }
            drop(slot);

            trace!(dt, bodies = world.body_count(), "world stepped");
        }

        self.drain_deferred();
        Ok(())
    }

    /// Runs `request` now, or after the current step if one is running
    pub fn run_after_step<F>(&self, request: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut queue = self.lock_deferred();
            if self.is_stepping() {
                queue.push(Box::new(request));
                return;
            }
        }

        request();
    }

    /// Queues `request` to run once the current or next step has finished.
    /// Frame tasks use this since a step may begin at any moment.
    pub fn defer<F>(&self, request: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.lock_deferred().push(Box::new(request));
    }

    /// Runs every queued request in submission order
    pub fn drain_deferred(&self) {
        let requests: Vec<DeferredRequest> = std::mem::take(&mut *self.lock_deferred());

        if !requests.is_empty() {
            debug!(count = requests.len(), "running deferred world requests");
        }

        for request in requests {
            request();
        }
    }

    /// Returns the number of queued requests
    pub fn deferred_count(&self) -> usize {
        self.lock_deferred().len()
    }

    /// Installs the contact listener, replacing any previous one. Safe to
    /// call from the listener itself; the new one sees the next step.
    pub fn set_contact_listener<F>(&self, listener: F)
    where
        F: FnMut(&ActorContact) + Send + 'static,
    {
        let mut slot = self.lock_listener();
        slot.listener = Some(Box::new(listener));
        slot.replaced = true;
    }

    /// Removes the contact listener
    pub fn clear_contact_listener(&self) {
        let mut slot = self.lock_listener();
        slot.listener = None;
        slot.replaced = true;
    }

    /// Returns true if a contact listener is installed
    pub fn has_contact_listener(&self) -> bool {
        self.lock_listener().listener.is_some()
    }

    /// Sets world gravity in m/s^2
    pub fn set_gravity(&self, gravity: Vector) -> Result<()> {
        self.with_world(|world| world.set_gravity(gravity))
    }

    /// Returns world gravity in m/s^2
    pub fn get_gravity(&self) -> Result<Vector> {
        self.with_world(|world| world.get_gravity())
    }

    /// Returns the number of bodies in the world
    pub fn body_count(&self) -> Result<usize> {
        self.with_world(|world| world.body_count())
    }

    /// Returns the number of entries in the reverse map
    pub fn actor_count(&self) -> Result<usize> {
        self.with_state(|_, actors| Ok(actors.len()))
    }

    /// Checks that every world body is mapped and every mapping has a body
    pub fn is_consistent(&self) -> Result<bool> {
        self.with_state(|world, actors| {
            let bodies = world.get_body_handles();
            Ok(bodies.len() == actors.len() && bodies.iter().all(|body| actors.contains_key(body)))
        })
    }
}

impl std::fmt::Debug for WorldHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldHandler")
            .field("pixels_per_meter", &self.pixels_per_meter)
            .field("stepping", &self.is_stepping())
            .finish_non_exhaustive()
    }
}
