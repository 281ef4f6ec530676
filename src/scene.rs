use crate::actor::{Actor, ActorId, RenderState};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::frame::FrameCoordinator;
use crate::math::{Aabb, Point, Vector};
use crate::physics::{ProxyData, WorldHandler};
use crate::shapes::Shape;
use crate::ticker::TickerManager;
use crate::Result;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

/// What the renderer needs to draw one actor
#[derive(Debug, Clone)]
pub struct RenderItem {
    /// Actor being drawn
    pub id: ActorId,

    /// Position of the actor origin in metres
    pub position: Point,

    /// Rotation in radians
    pub rotation: f32,

    /// Shape in pixels, relative to the actor origin
    pub shape: Shape,

    /// Colour, visibility and layer
    pub render: RenderState,
}

/// A set of actors sharing one physics world and one ticker manager
pub struct Scene {
    name: String,
    config: EngineConfig,
    world: Arc<WorldHandler>,
    actors: RwLock<Vec<Actor>>,
    tickers: Arc<TickerManager>,
}

impl Scene {
    /// Creates an empty scene
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_name("scene", config)
    }

    /// Creates an empty scene; its ticker threads are named after it
    pub fn with_name(name: impl Into<String>, config: EngineConfig) -> Result<Self> {
        let name = name.into();

        if !(config.pixels_per_meter > 0.0) || !config.pixels_per_meter.is_finite() {
            return Err(EngineError::Precondition(format!(
                "pixels per meter must be positive, got {}",
                config.pixels_per_meter
            )));
        }

        let world = Arc::new(WorldHandler::new(config.pixels_per_meter, config.simulation_config()));
        let tickers = Arc::new(TickerManager::with_name(name.clone(), config.ticker_pool_size)?);

        info!(scene = %name, pixels_per_meter = config.pixels_per_meter, "scene created");

        Ok(Self {
            name,
            config,
            world,
            actors: RwLock::new(Vec::new()),
            tickers,
        })
    }

    /// Returns the scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration the scene was created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the scale between shapes (pixels) and bodies (metres)
    pub fn pixels_per_meter(&self) -> f32 {
        self.config.pixels_per_meter
    }

    /// Returns the world handler owning every body of the scene
    pub fn world_handler(&self) -> &Arc<WorldHandler> {
        &self.world
    }

    /// Returns the ticker manager of the scene
    pub fn ticker_manager(&self) -> &Arc<TickerManager> {
        &self.tickers
    }

    fn read_actors(&self) -> RwLockReadGuard<'_, Vec<Actor>> {
        self.actors.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_actors(&self) -> RwLockWriteGuard<'_, Vec<Actor>> {
        self.actors.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gives `actor` a body in this scene's world and appends it to the draw
    /// order
    pub fn add(&self, actor: &Actor) -> Result<()> {
        actor.attach(&self.world)?;
        self.write_actors().push(actor.clone());
        debug!(scene = %self.name, actor = %actor.id(), "actor added");
        Ok(())
    }

    /// Destroys the body of `actor`, leaving it detached with a snapshot of
    /// its physics state
    pub fn remove(&self, actor: &Actor) -> Result<ProxyData> {
        if !self.contains(actor) {
            return Err(EngineError::Lifecycle(format!("{} is not part of scene {}", actor.id(), self.name)));
        }

        let snapshot = actor.detach()?;
        self.write_actors().retain(|a| !a.ptr_eq(actor));
        debug!(scene = %self.name, actor = %actor.id(), "actor removed");
        Ok(snapshot)
    }

    /// Returns true if `actor` was added to this scene
    pub fn contains(&self, actor: &Actor) -> bool {
        self.read_actors().iter().any(|a| a.ptr_eq(actor))
    }

    /// Returns the actors in insertion order
    pub fn actors(&self) -> Vec<Actor> {
        self.read_actors().clone()
    }

    /// Returns the number of actors in the scene
    pub fn actor_count(&self) -> usize {
        self.read_actors().len()
    }

    /// Finds an actor of this scene by id
    pub fn find_actor(&self, id: ActorId) -> Option<Actor> {
        self.read_actors().iter().find(|a| a.id() == id).cloned()
    }

    /// Returns the actors containing a world point in metres
    pub fn actors_at(&self, point: Point) -> Result<Vec<Actor>> {
        let probe = Aabb::new(point, point);
        let hits = self.world.aabb_query(&probe)?;

        let mut found: Vec<Actor> = Vec::new();
        for fixture in hits {
            if let Some(actor) = self.world.lookup_actor(fixture.body)? {
                if !found.iter().any(|a| a.ptr_eq(&actor)) && actor.contains(point)? {
                    found.push(actor);
                }
            }
        }
        Ok(found)
    }

    /// Returns every actor's transform, shape and render state, ordered by
    /// layer, then insertion
    pub fn render_items(&self) -> Result<Vec<RenderItem>> {
        let actors = self.actors();
        let mut items = Vec::with_capacity(actors.len());

        for actor in &actors {
            items.push(RenderItem {
                id: actor.id(),
                position: actor.get_position()?,
                rotation: actor.get_rotation()?,
                shape: actor.shape(),
                render: actor.render_state(),
            });
        }

        items.sort_by_key(|item| item.render.layer);
        Ok(items)
    }

    /// Sets world gravity in m/s^2
    pub fn set_gravity(&self, gravity: Vector) -> Result<()> {
        self.world.set_gravity(gravity)
    }

    /// Returns world gravity in m/s^2
    pub fn get_gravity(&self) -> Result<Vector> {
        self.world.get_gravity()
    }

    /// Steps the world once on the calling thread with the configured
    /// iteration counts
    pub fn step(&self, dt: f32) -> Result<()> {
        if !(dt >= 0.0) || !dt.is_finite() {
            return Err(EngineError::Precondition(format!("step delta must be >= 0, got {}", dt)));
        }
        self.world
            .step(dt, self.config.velocity_iterations, self.config.position_iterations)
    }

    /// Creates a frame coordinator stepping this scene's world
    pub fn frame_coordinator(&self) -> Result<FrameCoordinator> {
        FrameCoordinator::new(Arc::clone(&self.world), &self.config)
    }

    /// Stops every ticker of the scene and tears the ticker pool down
    pub fn shutdown(&self) {
        self.tickers.shutdown();
        info!(scene = %self.name, "scene shut down");
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("actors", &self.actor_count())
            .field("world", &self.world)
            .finish_non_exhaustive()
    }
}
