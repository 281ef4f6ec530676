use crate::math::Vector;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Configuration parameters for the physics simulation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SimulationConfig {
    /// World gravity in m/s^2
    pub gravity: Vector,

    /// Default number of velocity iterations per step
    pub velocity_iterations: u32,

    /// Default number of position iterations per step
    pub position_iterations: u32,

    /// Whether resting bodies may fall asleep
    pub allow_sleeping: bool,

    /// Linear speed below which a body counts as resting
    pub linear_sleep_tolerance: f32,

    /// Angular speed below which a body counts as resting
    pub angular_sleep_tolerance: f32,

    /// Time a body must rest before it falls asleep
    pub time_to_sleep: f32,

    /// Penetration allowed before position correction kicks in
    pub linear_slop: f32,

    /// Fraction of the penetration corrected per position iteration
    pub baumgarte: f32,

    /// Largest position correction applied in one iteration
    pub max_linear_correction: f32,

    /// Approach speed below which contacts do not bounce
    pub restitution_threshold: f32,

    /// Largest distance a body may travel in one step
    pub max_translation: f32,

    /// Largest angle a body may turn in one step
    pub max_rotation: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gravity: Vector::new(0.0, -9.81),
            velocity_iterations: 6,
            position_iterations: 3,
            allow_sleeping: true,
            linear_sleep_tolerance: 0.01,
            angular_sleep_tolerance: 2.0_f32.to_radians(),
            time_to_sleep: 0.5,
            linear_slop: 0.005,
            baumgarte: 0.2,
            max_linear_correction: 0.2,
            restitution_threshold: 1.0,
            max_translation: 2.0,
            max_rotation: 0.5 * std::f32::consts::PI,
        }
    }
}
