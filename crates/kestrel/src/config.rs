//! World configuration.
//!
//! Everything tunable about a running world lives in one serde document so a
//! scene can be reproduced from a JSON file. Missing sections and fields fall
//! back to the defaults below.
//!
//! ```json
//! {
//!   "time":    { "seconds_per_day": 86400, "days_per_year": 365.24, "offset": 43200 },
//!   "physics": { "gravity": [0, 0, -9.81], "ground": [50, 50, 0.5] },
//!   "sun":     { "latitude": 0.9 }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Length of a simulated day in seconds.
pub const SECONDS_PER_DAY: f64 = 86_400.0;
/// Length of a simulated year in days.
pub const DAYS_PER_YEAR: f64 = 365.24;
/// Earth's axial tilt in radians.
pub const AXIAL_TILT: f32 = 0.409;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub time: TimeConfig,
    pub physics: PhysicsConfig,
    pub sun: SunConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    pub seconds_per_day: f64,
    pub days_per_year: f64,
    /// Seconds after midnight of day zero at which the clock starts.
    pub offset: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            seconds_per_day: SECONDS_PER_DAY,
            days_per_year: DAYS_PER_YEAR,
            offset: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity in m/s², Z up.
    pub gravity: [f32; 3],
    /// Solver step in seconds.
    pub fixed_timestep: f32,
    /// Longest frame the solver will try to catch up on.
    pub max_frame_dt: f32,
    /// Half extents of a static ground box at the origin. `null` disables it.
    pub ground: Option<[f32; 3]>,
    /// Emit wireframe boxes for every body during `draw`.
    pub debug_draw: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, 0.0, -9.81],
            fixed_timestep: 1.0 / 60.0,
            max_frame_dt: 0.25,
            ground: None,
            debug_draw: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SunConfig {
    /// Observer latitude in radians.
    pub latitude: f32,
    pub tilt: f32,
}

impl Default for SunConfig {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            tilt: AXIAL_TILT,
        }
    }
}

impl WorldConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        log::info!("loaded world config from {}", path.display());
        Ok(config)
    }

    pub fn to_json_string(&self) -> String {
        // Plain data with string keys always serializes.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("time.seconds_per_day", self.time.seconds_per_day)?;
        positive("time.days_per_year", self.time.days_per_year)?;
        positive("physics.fixed_timestep", self.physics.fixed_timestep as f64)?;
        positive("physics.max_frame_dt", self.physics.max_frame_dt as f64)?;
        if let Some(ground) = self.physics.ground {
            if ground.iter().any(|e| *e <= 0.0 || !e.is_finite()) {
                return Err(ConfigError::Invalid {
                    field: "physics.ground",
                    reason: format!("half extents must be positive, got {ground:?}"),
                });
            }
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be a positive number, got {value}"),
        })
    }
}
