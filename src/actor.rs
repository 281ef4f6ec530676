use crate::core::BodyHandle;
use crate::error::EngineError;
use crate::math::{Point, Vector};
use crate::physics::{BodyHandler, PhysicsHandler, PhysicsType, ProxyData, WorldHandler};
use crate::scene::Scene;
use crate::shapes::{Shape, ShapeSupplier};
use crate::Result;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

use tracing::debug;

static NEXT_ACTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique actor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u64);

impl ActorId {
    fn next() -> Self {
        Self(NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// RGBA colour, 8 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel, 255 is opaque
    pub a: u8,
}

impl Color {
    /// Opaque white, the default fill
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Opaque black
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// Mid gray
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    /// Pure red
    pub const RED: Color = Color::rgb(255, 0, 0);
    /// Pure green
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    /// Pure blue
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    /// Pure yellow
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    /// Orange
    pub const ORANGE: Color = Color::rgb(255, 165, 0);

    /// Opaque colour
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Colour with alpha
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// Presentation state handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct RenderState {
    /// Fill colour
    pub color: Color,

    /// Whether the actor is drawn at all
    pub visible: bool,

    /// Draw layer; higher layers are drawn later
    pub layer: i32,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            color: Color::default(),
            visible: true,
            layer: 0,
        }
    }
}

pub(crate) struct ActorInner {
    id: ActorId,
    shape: ShapeSupplier,
    handler: RwLock<PhysicsHandler>,
    render: RwLock<RenderState>,
}

/// A game entity: a shape, a transform and a physics handler.
///
/// Cloning is cheap and yields another handle to the same actor. The actor
/// starts detached; adding it to a scene gives it a body.
#[derive(Clone)]
pub struct Actor {
    inner: Arc<ActorInner>,
}

impl Actor {
    /// Creates a detached actor for `scene`, producing its shape (in pixels)
    /// from `shape`. Until it is added, shape queries use the scene's scale.
    pub fn new(scene: &Scene, shape: ShapeSupplier) -> Self {
        let proxy = ProxyData::new(shape.clone(), scene.pixels_per_meter());

        Self {
            inner: Arc::new(ActorInner {
                id: ActorId::next(),
                shape,
                handler: RwLock::new(PhysicsHandler::Proxy(proxy)),
                render: RwLock::new(RenderState::default()),
            }),
        }
    }

    /// Creates an actor from a fixed shape
    pub fn from_shape(scene: &Scene, shape: Shape) -> Self {
        Self::new(scene, Arc::new(move || shape.clone()))
    }

    /// Rectangle with its lower-left corner at the actor origin
    pub fn rect(scene: &Scene, width: f32, height: f32) -> Result<Self> {
        Ok(Self::from_shape(scene, Shape::rect(0.0, 0.0, width, height)?))
    }

    /// Circle centred on the actor origin
    pub fn circle(scene: &Scene, radius: f32) -> Result<Self> {
        Ok(Self::from_shape(scene, Shape::circle(Vector::zero(), radius)?))
    }

    /// Polygon in actor-local pixel coordinates; needs at least 3 points
    pub fn polygon(scene: &Scene, points: &[Point]) -> Result<Self> {
        Ok(Self::from_shape(scene, Shape::polygon(points)?))
    }

    pub(crate) fn from_inner(inner: Arc<ActorInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ActorInner> {
        Arc::downgrade(&self.inner)
    }

    /// Returns the actor id
    pub fn id(&self) -> ActorId {
        self.inner.id
    }

    /// Produces the current shape in pixels
    pub fn shape(&self) -> Shape {
        (self.inner.shape)()
    }

    /// Returns the shape supplier
    pub fn shape_supplier(&self) -> &ShapeSupplier {
        &self.inner.shape
    }

    /// Returns true if both handles point to the same actor
    pub fn ptr_eq(&self, other: &Actor) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn read_handler(&self) -> RwLockReadGuard<'_, PhysicsHandler> {
        self.inner.handler.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_handler(&self) -> RwLockWriteGuard<'_, PhysicsHandler> {
        self.inner.handler.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_render(&self) -> RwLockReadGuard<'_, RenderState> {
        self.inner.render.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_render(&self) -> RwLockWriteGuard<'_, RenderState> {
        self.inner.render.write().unwrap_or_else(PoisonError::into_inner)
    }

    // The actor lock is never held while the world lock is taken: a
    // body-backed handler is cloned out and the lock released first.
    fn with_handler<R>(&self, f: impl FnOnce(&PhysicsHandler) -> Result<R>) -> Result<R> {
        let handler = self.read_handler();
        match &*handler {
            PhysicsHandler::Body(body) => {
                let body = PhysicsHandler::Body(body.clone());
                drop(handler);
                f(&body)
            }
            PhysicsHandler::Proxy(_) => f(&handler),
        }
    }

    fn with_handler_mut<R>(&self, f: impl FnOnce(&mut PhysicsHandler) -> Result<R>) -> Result<R> {
        let mut handler = self.write_handler();
        match &*handler {
            PhysicsHandler::Body(body) => {
                let mut body = PhysicsHandler::Body(body.clone());
                drop(handler);
                f(&mut body)
            }
            PhysicsHandler::Proxy(_) => f(&mut handler),
        }
    }

    /// Returns true while the actor has a body in a world
    pub fn is_attached(&self) -> bool {
        self.read_handler().is_body()
    }

    /// Returns the body backing the actor, if attached
    pub fn body_handle(&self) -> Option<BodyHandle> {
        self.read_handler().body_handler().map(BodyHandler::body)
    }

    /// Returns the world handler owning the body, if attached
    pub fn world_handler(&self) -> Option<Arc<WorldHandler>> {
        self.read_handler().body_handler().map(|body| body.world().clone())
    }

    /// Builds a body in `world` from the current proxy data
    pub(crate) fn attach(&self, world: &Arc<WorldHandler>) -> Result<BodyHandle> {
        let proxy = match &*self.read_handler() {
            PhysicsHandler::Body(_) => {
                return Err(EngineError::Lifecycle(format!("{} is already part of a scene", self.id())));
            }
            PhysicsHandler::Proxy(proxy) => proxy.clone(),
        };

        let body = world.create_body(self, &proxy)?;

        let mut handler = self.write_handler();
        if handler.is_body() {
            drop(handler);
            world.release_body(body)?;
            return Err(EngineError::Lifecycle(format!("{} is already part of a scene", self.id())));
        }

        *handler = PhysicsHandler::Body(BodyHandler::new(world.clone(), body));
        debug!(actor = %self.id(), body = body.id(), "actor attached");
        Ok(body)
    }

    /// Destroys the body, keeping a snapshot of its state for reattachment
    pub(crate) fn detach(&self) -> Result<ProxyData> {
        let mut body = match &*self.read_handler() {
            PhysicsHandler::Body(body) => PhysicsHandler::Body(body.clone()),
            PhysicsHandler::Proxy(_) => {
                return Err(EngineError::Lifecycle(format!("{} is not part of a scene", self.id())));
            }
        };

        let snapshot = body.get_proxy_data()?;
        body.kill_body()?;

        *self.write_handler() = PhysicsHandler::Proxy(snapshot.clone());
        debug!(actor = %self.id(), "actor detached");
        Ok(snapshot)
    }

    /// Returns the render state
    pub fn render_state(&self) -> RenderState {
        *self.read_render()
    }

    /// Returns the fill colour
    pub fn get_color(&self) -> Color {
        self.read_render().color
    }

    /// Sets the fill colour
    pub fn set_color(&self, color: Color) {
        self.write_render().color = color;
    }

    /// Returns whether the actor is drawn
    pub fn is_visible(&self) -> bool {
        self.read_render().visible
    }

    /// Shows or hides the actor
    pub fn set_visible(&self, visible: bool) {
        self.write_render().visible = visible;
    }

    /// Returns the draw layer
    pub fn get_layer(&self) -> i32 {
        self.read_render().layer
    }

    /// Sets the draw layer
    pub fn set_layer(&self, layer: i32) {
        self.write_render().layer = layer;
    }

    /// Moves the actor origin by `delta` metres
    pub fn move_by(&self, delta: Vector) -> Result<()> {
        self.with_handler_mut(|h| h.move_by(delta))
    }

    /// Moves the actor origin to `position`
    pub fn set_position(&self, position: Point) -> Result<()> {
        let current = self.get_position()?;
        self.move_by(position - current)
    }

    /// Returns the position of the actor origin in metres
    pub fn get_position(&self) -> Result<Point> {
        self.with_handler(|h| h.get_position())
    }

    /// Returns the center of mass of dynamic actors, the bounds center of all others
    pub fn get_center(&self) -> Result<Point> {
        self.with_handler(|h| h.get_center())
    }

    /// Rotates the actor about its origin by `delta` radians
    pub fn rotate_by(&self, delta: f32) -> Result<()> {
        self.with_handler_mut(|h| h.rotate_by(delta))
    }

    /// Sets the absolute rotation in radians
    pub fn set_rotation(&self, rotation: f32) -> Result<()> {
        let current = self.get_rotation()?;
        self.rotate_by(rotation - current)
    }

    /// Returns the rotation in radians
    pub fn get_rotation(&self) -> Result<f32> {
        self.with_handler(|h| h.get_rotation())
    }

    /// Sets the density of every fixture
    pub fn set_density(&self, density: f32) -> Result<()> {
        self.with_handler_mut(|h| h.set_density(density))
    }

    /// Returns the density
    pub fn get_density(&self) -> Result<f32> {
        self.with_handler(|h| h.get_density())
    }

    /// Sets the friction of every fixture
    pub fn set_friction(&self, friction: f32) -> Result<()> {
        self.with_handler_mut(|h| h.set_friction(friction))
    }

    /// Returns the friction
    pub fn get_friction(&self) -> Result<f32> {
        self.with_handler(|h| h.get_friction())
    }

    /// Sets the restitution of every fixture
    pub fn set_restitution(&self, restitution: f32) -> Result<()> {
        self.with_handler_mut(|h| h.set_restitution(restitution))
    }

    /// Returns the restitution
    pub fn get_restitution(&self) -> Result<f32> {
        self.with_handler(|h| h.get_restitution())
    }

    /// Overrides the mass derived from density
    pub fn set_mass(&self, mass: f32) -> Result<()> {
        self.with_handler_mut(|h| h.set_mass(mass))
    }

    /// Returns the mass in kilograms
    pub fn get_mass(&self) -> Result<f32> {
        self.with_handler(|h| h.get_mass())
    }

    /// Applies a force in newtons at the center of mass
    pub fn apply_force(&self, force: Vector) -> Result<()> {
        self.with_handler_mut(|h| h.apply_force(force))
    }

    /// Applies a force at a world point
    pub fn apply_force_at(&self, force: Vector, point: Point) -> Result<()> {
        self.with_handler_mut(|h| h.apply_force_at(force, point))
    }

    /// Applies an impulse at a world point
    pub fn apply_impulse(&self, impulse: Vector, point: Point) -> Result<()> {
        self.with_handler_mut(|h| h.apply_impulse(impulse, point))
    }

    /// Applies a torque for the next step
    pub fn apply_torque(&self, torque: f32) -> Result<()> {
        self.with_handler_mut(|h| h.apply_torque(torque))
    }

    /// Applies an angular impulse
    pub fn apply_rotation_impulse(&self, impulse: f32) -> Result<()> {
        self.with_handler_mut(|h| h.apply_rotation_impulse(impulse))
    }

    /// Sets the linear velocity in m/s
    pub fn set_velocity(&self, velocity: Vector) -> Result<()> {
        self.with_handler_mut(|h| h.set_velocity(velocity))
    }

    /// Returns the linear velocity in m/s
    pub fn get_velocity(&self) -> Result<Vector> {
        self.with_handler(|h| h.get_velocity())
    }

    /// Stops all linear and angular motion
    pub fn reset_movement(&self) -> Result<()> {
        self.with_handler_mut(|h| h.reset_movement())
    }

    /// Sets the angular velocity in rad/s
    pub fn set_angular_velocity(&self, velocity: f32) -> Result<()> {
        self.with_handler_mut(|h| h.set_angular_velocity(velocity))
    }

    /// Returns the angular velocity in rad/s
    pub fn get_angular_velocity(&self) -> Result<f32> {
        self.with_handler(|h| h.get_angular_velocity())
    }

    /// Replaces the torque accumulated for the next step
    pub fn set_torque(&self, torque: f32) -> Result<()> {
        self.with_handler_mut(|h| h.set_torque(torque))
    }

    /// Returns the torque accumulated for the next step
    pub fn get_torque(&self) -> Result<f32> {
        self.with_handler(|h| h.get_torque())
    }

    /// Switches the physics type; setting the current type is a no-op
    pub fn set_type(&self, physics_type: PhysicsType) -> Result<()> {
        self.with_handler_mut(|h| h.set_type(physics_type))
    }

    /// Returns the physics type
    pub fn get_type(&self) -> Result<PhysicsType> {
        self.with_handler(|h| h.get_type())
    }

    /// Turns every fixture into a sensor or back
    pub fn set_sensor(&self, sensor: bool) -> Result<()> {
        self.with_handler_mut(|h| h.set_sensor(sensor))
    }

    /// Returns whether the fixtures are sensors
    pub fn is_sensor(&self) -> Result<bool> {
        self.with_handler(|h| h.is_sensor())
    }

    /// Locks or unlocks rotation
    pub fn set_rotation_locked(&self, locked: bool) -> Result<()> {
        self.with_handler_mut(|h| h.set_rotation_locked(locked))
    }

    /// Returns whether rotation is locked
    pub fn is_rotation_locked(&self) -> Result<bool> {
        self.with_handler(|h| h.is_rotation_locked())
    }

    /// Sets the gravity multiplier
    pub fn set_gravity_scale(&self, scale: f32) -> Result<()> {
        self.with_handler_mut(|h| h.set_gravity_scale(scale))
    }

    /// Returns the gravity multiplier
    pub fn get_gravity_scale(&self) -> Result<f32> {
        self.with_handler(|h| h.get_gravity_scale())
    }

    /// Tests whether a world point in metres lies inside the actor
    pub fn contains(&self, point: Point) -> Result<bool> {
        self.with_handler(|h| h.contains(point))
    }

    /// Returns true if a static actor lies directly below. Only defined for
    /// dynamic actors that are part of a scene.
    pub fn is_grounded(&self) -> Result<bool> {
        self.with_handler(|h| h.is_grounded())
    }

    /// Returns a snapshot sufficient to rebuild the body
    pub fn get_proxy_data(&self) -> Result<ProxyData> {
        self.with_handler(|h| h.get_proxy_data())
    }
}

impl PartialEq for Actor {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Actor {}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id())
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}
