use crate::core::SimulationConfig;
use crate::math::Vector;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Scene-level settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct EngineConfig {
    /// Scale between authored shapes (pixels) and the solver (metres)
    pub pixels_per_meter: f32,

    /// Number of worker threads running tickers
    pub ticker_pool_size: usize,

    /// Velocity iterations per world step
    pub velocity_iterations: u32,

    /// Position iterations per world step
    pub position_iterations: u32,

    /// Upper bound for the real time fed into one world step, in seconds
    pub max_delta_seconds: f32,

    /// World gravity in m/s^2
    pub gravity: Vector,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pixels_per_meter: 30.0,
            ticker_pool_size: 10,
            velocity_iterations: 6,
            position_iterations: 3,
            max_delta_seconds: 1.0 / 30.0,
            gravity: Vector::new(0.0, -9.81),
        }
    }
}

impl EngineConfig {
    /// Solver settings derived from this configuration
    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            gravity: self.gravity,
            velocity_iterations: self.velocity_iterations,
            position_iterations: self.position_iterations,
            ..SimulationConfig::default()
        }
    }

    /// Parses a configuration from JSON; missing fields take their defaults
    #[cfg(feature = "serialize")]
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| crate::error::EngineError::Precondition(format!("invalid engine config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulation_config_carries_iterations_and_gravity() {
        let config = EngineConfig {
            velocity_iterations: 8,
            position_iterations: 2,
            gravity: Vector::new(0.0, -1.0),
            ..EngineConfig::default()
        };

        let sim = config.simulation_config();
        assert_eq!(sim.velocity_iterations, 8);
        assert_eq!(sim.position_iterations, 2);
        assert_eq!(sim.gravity, Vector::new(0.0, -1.0));
        assert_eq!(sim.linear_slop, SimulationConfig::default().linear_slop);
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn json_overrides_only_given_fields() {
        let config = EngineConfig::from_json_str(r#"{ "pixels_per_meter": 64.0 }"#).unwrap();
        assert_eq!(config.pixels_per_meter, 64.0);
        assert_eq!(config.ticker_pool_size, 10);
    }
}
