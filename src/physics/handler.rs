use crate::bodies::{Material, RigidBody};
use crate::core::{BodyHandle, PhysicsWorld};
use crate::error::EngineError;
use crate::math::{Aabb, Point, Vector};
use crate::physics::{ActorEntry, PhysicsType, ProxyData, WorldHandler};
use crate::Result;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

/// Half width of the probe used by `is_grounded`, in metres
const GROUND_PROBE_EPSILON: f32 = 0.0001;

/// Handler of an actor whose body lives in a world
#[derive(Clone)]
pub struct BodyHandler {
    world: Arc<WorldHandler>,
    body: BodyHandle,
}

impl BodyHandler {
    /// Wraps a body created through `world`
    pub fn new(world: Arc<WorldHandler>, body: BodyHandle) -> Self {
        Self { world, body }
    }

    /// Returns the body handle
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Returns the owning world handler
    pub fn world(&self) -> &Arc<WorldHandler> {
        &self.world
    }

    fn with_body<R>(&self, f: impl FnOnce(&mut RigidBody) -> R) -> Result<R> {
        self.world.with_state(|world, _| Ok(f(world.get_body_mut(self.body)?)))
    }

    fn with_body_and_type<R>(
        &self,
        f: impl FnOnce(&mut PhysicsWorld, &mut HashMap<BodyHandle, ActorEntry>, PhysicsType) -> Result<R>,
    ) -> Result<R> {
        let body = self.body;
        self.world.with_state(|world, actors| {
            world.get_body(body)?;
            let physics_type = actors
                .get(&body)
                .map(|entry| entry.physics_type)
                .ok_or_else(|| EngineError::Lifecycle(format!("body {} is not mapped to an actor", body.id())))?;
            f(world, actors, physics_type)
        })
    }
}

impl std::fmt::Debug for BodyHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyHandler").field("body", &self.body).finish()
    }
}

/// Per-actor physics adapter: pending settings before attachment, a live
/// body afterwards.
///
/// Every operation on a body-backed handler fails with
/// `EngineError::ConcurrentMutation` while the world is stepping.
#[derive(Debug, Clone)]
pub enum PhysicsHandler {
    /// Not part of a world yet
    Proxy(ProxyData),

    /// Backed by a live body
    Body(BodyHandler),
}

fn require_finite(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() {
        return Err(EngineError::Precondition(format!("{} must be finite, got {}", name, value)));
    }
    Ok(())
}

fn require_finite_vector(name: &str, value: Vector) -> Result<()> {
    if !value.is_finite() {
        return Err(EngineError::Precondition(format!("{} must be finite, got {}", name, value)));
    }
    Ok(())
}

fn require_non_negative(name: &str, value: f32) -> Result<()> {
    if !(value >= 0.0) || !value.is_finite() {
        return Err(EngineError::Precondition(format!("{} must be a finite value >= 0, got {}", name, value)));
    }
    Ok(())
}

fn first_material(body: &RigidBody) -> Material {
    body.get_fixtures()
        .first()
        .map(|f| f.get_material())
        .unwrap_or_default()
}

impl PhysicsHandler {
    /// Returns true once the handler is backed by a body
    pub fn is_body(&self) -> bool {
        matches!(self, PhysicsHandler::Body(_))
    }

    /// Returns the body-backed handler, if any
    pub fn body_handler(&self) -> Option<&BodyHandler> {
        match self {
            PhysicsHandler::Body(handler) => Some(handler),
            PhysicsHandler::Proxy(_) => None,
        }
    }

    /// Moves the actor by `delta` metres and wakes its body
    pub fn move_by(&mut self, delta: Vector) -> Result<()> {
        require_finite_vector("delta", delta)?;

        match self {
            PhysicsHandler::Proxy(proxy) => {
                proxy.position += delta;
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| {
                let position = body.get_position();
                body.set_transform(position + delta, body.get_angle());
                body.set_awake(true);
            }),
        }
    }

    /// Returns the position of the body origin
    pub fn get_position(&self) -> Result<Point> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.position),
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.get_position()),
        }
    }

    /// Returns the center of mass of dynamic actors, the AABB center of all
    /// others
    pub fn get_center(&self) -> Result<Point> {
        match self {
            PhysicsHandler::Proxy(proxy) => {
                if proxy.physics_type == PhysicsType::Dynamic {
                    let body = proxy.build_body(proxy.pixels_per_meter)?;
                    Ok(body.get_world_center())
                } else {
                    Ok(proxy.bounds().center())
                }
            }
            PhysicsHandler::Body(handler) => handler.with_body_and_type(|world, _, physics_type| {
                let body = world.get_body(handler.body)?;
                if physics_type == PhysicsType::Dynamic {
                    Ok(body.get_world_center())
                } else {
                    Ok(body.compute_aabb().center())
                }
            }),
        }
    }

    /// Rotates the actor about its origin by `delta` radians
    pub fn rotate_by(&mut self, delta: f32) -> Result<()> {
        require_finite("rotation", delta)?;

        match self {
            PhysicsHandler::Proxy(proxy) => {
                proxy.rotation += delta;
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| {
                let position = body.get_position();
                body.set_transform(position, body.get_angle() + delta);
                body.set_awake(true);
            }),
        }
    }

    /// Returns the rotation in radians
    pub fn get_rotation(&self) -> Result<f32> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.rotation),
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.get_angle()),
        }
    }

    /// Sets the density of every fixture and recomputes the mass
    pub fn set_density(&mut self, density: f32) -> Result<()> {
        require_non_negative("density", density)?;

        match self {
            PhysicsHandler::Proxy(proxy) => {
                proxy.density = density;
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| {
                for fixture in body.get_fixtures_mut() {
                    fixture.set_density(density);
                }
                body.reset_mass_data();
            }),
        }
    }

    /// Returns the density of the first fixture
    pub fn get_density(&self) -> Result<f32> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.density),
            PhysicsHandler::Body(handler) => handler.with_body(|body| first_material(body).density),
        }
    }

    /// Sets the friction of every fixture
    pub fn set_friction(&mut self, friction: f32) -> Result<()> {
        require_non_negative("friction", friction)?;

        match self {
            PhysicsHandler::Proxy(proxy) => {
                proxy.friction = friction;
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| {
                for fixture in body.get_fixtures_mut() {
                    fixture.set_friction(friction);
                }
            }),
        }
    }

    /// Returns the friction of the first fixture
    pub fn get_friction(&self) -> Result<f32> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.friction),
            PhysicsHandler::Body(handler) => handler.with_body(|body| first_material(body).friction),
        }
    }

    /// Sets the restitution of every fixture
    pub fn set_restitution(&mut self, restitution: f32) -> Result<()> {
        require_non_negative("restitution", restitution)?;

        match self {
            PhysicsHandler::Proxy(proxy) => {
                proxy.restitution = restitution;
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| {
                for fixture in body.get_fixtures_mut() {
                    fixture.set_restitution(restitution);
                }
            }),
        }
    }

    /// Returns the restitution of the first fixture
    pub fn get_restitution(&self) -> Result<f32> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.restitution),
            PhysicsHandler::Body(handler) => handler.with_body(|body| first_material(body).restitution),
        }
    }

    /// Replaces the mass, keeping center of mass and reported inertia
    pub fn set_mass(&mut self, mass: f32) -> Result<()> {
        if !(mass > 0.0) || !mass.is_finite() {
            return Err(EngineError::Precondition(format!("mass must be positive, got {}", mass)));
        }

        match self {
            PhysicsHandler::Proxy(proxy) => {
                proxy.mass = Some(mass);
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| {
                let mut data = body.get_mass_data();
                data.mass = mass;
                body.set_mass_data(&data);
            }),
        }
    }

    /// Returns the mass in kilograms
    pub fn get_mass(&self) -> Result<f32> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.effective_mass()),
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.get_mass()),
        }
    }

    /// Applies a force at the center of mass for the next step
    pub fn apply_force(&mut self, force: Vector) -> Result<()> {
        require_finite_vector("force", force)?;

        match self {
            PhysicsHandler::Proxy(_) => {
                debug!("force on a detached actor ignored");
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.apply_force(force)),
        }
    }

    /// Applies a force at a world point for the next step
    pub fn apply_force_at(&mut self, force: Vector, point: Point) -> Result<()> {
        require_finite_vector("force", force)?;
        require_finite_vector("point", point)?;

        match self {
            PhysicsHandler::Proxy(_) => {
                debug!("force on a detached actor ignored");
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.apply_force_at_point(force, point)),
        }
    }

    /// Applies an impulse at a world point
    pub fn apply_impulse(&mut self, impulse: Vector, point: Point) -> Result<()> {
        require_finite_vector("impulse", impulse)?;
        require_finite_vector("point", point)?;

        match self {
            PhysicsHandler::Proxy(_) => {
                debug!("impulse on a detached actor ignored");
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.apply_linear_impulse(impulse, point)),
        }
    }

    /// Applies a torque for the next step
    pub fn apply_torque(&mut self, torque: f32) -> Result<()> {
        require_finite("torque", torque)?;

        match self {
            PhysicsHandler::Proxy(_) => {
                debug!("torque on a detached actor ignored");
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.apply_torque(torque)),
        }
    }

    /// Applies an angular impulse
    pub fn apply_rotation_impulse(&mut self, impulse: f32) -> Result<()> {
        require_finite("rotation impulse", impulse)?;

        match self {
            PhysicsHandler::Proxy(_) => {
                debug!("rotation impulse on a detached actor ignored");
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.apply_angular_impulse(impulse)),
        }
    }

    /// Sets the linear velocity in m/s
    pub fn set_velocity(&mut self, velocity: Vector) -> Result<()> {
        require_finite_vector("velocity", velocity)?;

        match self {
            PhysicsHandler::Proxy(proxy) => {
                proxy.velocity = velocity;
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.set_linear_velocity(velocity)),
        }
    }

    /// Returns the linear velocity in m/s
    pub fn get_velocity(&self) -> Result<Vector> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.velocity),
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.get_linear_velocity()),
        }
    }

    /// Zeroes linear and angular velocity
    pub fn reset_movement(&mut self) -> Result<()> {
        match self {
            PhysicsHandler::Proxy(proxy) => {
                proxy.velocity = Vector::zero();
                proxy.angular_velocity = 0.0;
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| {
                body.set_linear_velocity(Vector::zero());
                body.set_angular_velocity(0.0);
            }),
        }
    }

    /// Sets the angular velocity in rad/s
    pub fn set_angular_velocity(&mut self, velocity: f32) -> Result<()> {
        require_finite("angular velocity", velocity)?;

        match self {
            PhysicsHandler::Proxy(proxy) => {
                proxy.angular_velocity = velocity;
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.set_angular_velocity(velocity)),
        }
    }

    /// Returns the angular velocity in rad/s
    pub fn get_angular_velocity(&self) -> Result<f32> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.angular_velocity),
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.get_angular_velocity()),
        }
    }

    /// Replaces the torque accumulated for the next step
    pub fn set_torque(&mut self, torque: f32) -> Result<()> {
        require_finite("torque", torque)?;

        match self {
            PhysicsHandler::Proxy(proxy) => {
                proxy.torque = torque;
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.set_torque(torque)),
        }
    }

    /// Returns the torque accumulated for the next step
    pub fn get_torque(&self) -> Result<f32> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.torque),
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.get_torque()),
        }
    }

    /// Changes the physics type.
    ///
    /// Passive actors become static sensors without gravity that collide
    /// with nothing; every other type is solid with gravity scale 1.
    pub fn set_type(&mut self, physics_type: PhysicsType) -> Result<()> {
        match self {
            PhysicsHandler::Proxy(proxy) => {
                if proxy.physics_type != physics_type {
                    proxy.physics_type = physics_type;
                    proxy.sensor = physics_type.is_sensor();
                    proxy.gravity_scale = physics_type.gravity_scale();
                }
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body_and_type(|world, actors, current| {
                if current == physics_type {
                    return Ok(());
                }

                let body = world.get_body_mut(handler.body)?;
                body.set_body_type(physics_type.body_type());
                body.set_active(true);

                let filter = physics_type.filter();
                for fixture in body.get_fixtures_mut() {
                    fixture.set_sensor(physics_type.is_sensor());
                    fixture.set_filter(filter);
                }
                body.set_gravity_scale(physics_type.gravity_scale());

                if let Some(entry) = actors.get_mut(&handler.body) {
                    entry.physics_type = physics_type;
                }

                debug!(body = handler.body.id(), from = ?current, to = ?physics_type, "physics type changed");
                Ok(())
            }),
        }
    }

    /// Returns the physics type
    pub fn get_type(&self) -> Result<PhysicsType> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.physics_type),
            PhysicsHandler::Body(handler) => handler.with_body_and_type(|_, _, physics_type| Ok(physics_type)),
        }
    }

    /// Makes every fixture a sensor or solid
    pub fn set_sensor(&mut self, sensor: bool) -> Result<()> {
        match self {
            PhysicsHandler::Proxy(proxy) => {
                proxy.sensor = sensor;
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| {
                for fixture in body.get_fixtures_mut() {
                    fixture.set_sensor(sensor);
                }
            }),
        }
    }

    /// Returns whether the first fixture is a sensor
    pub fn is_sensor(&self) -> Result<bool> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.sensor),
            PhysicsHandler::Body(handler) => {
                handler.with_body(|body| body.get_fixtures().first().map_or(false, |f| f.is_sensor()))
            }
        }
    }

    /// Locks or unlocks rotation
    pub fn set_rotation_locked(&mut self, locked: bool) -> Result<()> {
        match self {
            PhysicsHandler::Proxy(proxy) => {
                proxy.rotation_locked = locked;
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.set_fixed_rotation(locked)),
        }
    }

    /// Returns whether rotation is locked
    pub fn is_rotation_locked(&self) -> Result<bool> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.rotation_locked),
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.is_fixed_rotation()),
        }
    }

    /// Sets the gravity multiplier
    pub fn set_gravity_scale(&mut self, scale: f32) -> Result<()> {
        require_finite("gravity scale", scale)?;

        match self {
            PhysicsHandler::Proxy(proxy) => {
                proxy.gravity_scale = scale;
                Ok(())
            }
            PhysicsHandler::Body(handler) => handler.with_body(|body| {
                body.set_gravity_scale(scale);
                body.set_awake(true);
            }),
        }
    }

    /// Returns the gravity multiplier
    pub fn get_gravity_scale(&self) -> Result<f32> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.gravity_scale),
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.get_gravity_scale()),
        }
    }

    /// Tests whether a world point in metres lies inside the actor
    pub fn contains(&self, point: Point) -> Result<bool> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.contains(point)),
            PhysicsHandler::Body(handler) => handler.with_body(|body| body.test_point(point)),
        }
    }

    /// Returns true if a static actor lies directly below this dynamic one
    pub fn is_grounded(&self) -> Result<bool> {
        match self {
            PhysicsHandler::Proxy(_) => Err(EngineError::Lifecycle(
                "the ground test needs an actor that is part of a scene".to_string(),
            )),
            PhysicsHandler::Body(handler) => handler.with_body_and_type(|world, actors, physics_type| {
                if physics_type != PhysicsType::Dynamic {
                    return Err(EngineError::Precondition(format!(
                        "the ground test is only defined for dynamic actors, this one is {:?}",
                        physics_type
                    )));
                }

                let bounds = world.get_body(handler.body)?.compute_aabb();
                let center_x = bounds.center().x;
                let probe = Aabb::new(
                    Vector::new(center_x - GROUND_PROBE_EPSILON, bounds.min.y),
                    Vector::new(center_x + GROUND_PROBE_EPSILON, bounds.min.y + 2.0 * GROUND_PROBE_EPSILON),
                );

                Ok(world.aabb_query(&probe).iter().any(|fixture| {
                    actors
                        .get(&fixture.body)
                        .map_or(false, |entry| entry.physics_type == PhysicsType::Static)
                }))
            }),
        }
    }

    /// Purges the body from the reverse map and destroys it under one world
    /// lock
    pub fn kill_body(&mut self) -> Result<()> {
        match self {
            PhysicsHandler::Proxy(_) => Ok(()),
            PhysicsHandler::Body(handler) => handler.world.release_body(handler.body),
        }
    }

    /// Returns a snapshot sufficient to rebuild the body
    pub fn get_proxy_data(&self) -> Result<ProxyData> {
        match self {
            PhysicsHandler::Proxy(proxy) => Ok(proxy.clone()),
            PhysicsHandler::Body(handler) => {
                let pixels_per_meter = handler.world.pixels_per_meter();
                handler.with_body_and_type(|world, _, physics_type| {
                    let body = world.get_body(handler.body)?;
                    Ok(ProxyData::from_body(body, physics_type, pixels_per_meter))
                })
            }
        }
    }
}
