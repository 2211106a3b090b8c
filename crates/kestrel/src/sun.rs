//! Day/night sun direction.
//!
//! The sun starts straight below the horizon plane and is carried around by
//! three rotations: the seasonal declination (axial tilt swinging over the
//! year), the daily spin about the polar axis, and the observer's latitude.
//! Angles are applied clockwise when looking down the rotation axis.
//!
//! ```text
//!        +Z (zenith)            days fraction   direction (equator, no tilt)
//!         │   +Y (north)        0.00            ( 0, 0, -1)  midnight
//!         │  /                  0.25            ( 1, 0,  0)  sunrise, east
//!         │ /                   0.50            ( 0, 0,  1)  noon
//!         └──────── +X (east)   0.75            (-1, 0,  0)  sunset, west
//! ```
//!
//! At year fraction zero the declination is at its southern extreme, so the
//! clock starts at the December solstice.

use std::any::Any;
use std::f64::consts::{FRAC_PI_2, TAU};

use glam::{DQuat, DVec3};

use crate::config::SunConfig;
use crate::ecs::{Capabilities, Capability, Component};
use crate::math::Vec3;
use crate::render::{Renderer, Visual};
use crate::time::TimeComponent;

/// Unit vector pointing from the ground towards the sun.
///
/// `days` and `years` are the clock's running totals; only their fractional
/// parts matter. `latitude` and `tilt` are in radians.
pub fn sun_direction(days: f64, years: f64, latitude: f32, tilt: f32) -> Vec3 {
    let day_angle = days.fract() * TAU;
    let year_angle = years.fract() * TAU;
    let declination = -FRAC_PI_2 + tilt as f64 * year_angle.cos();

    let v = DVec3::NEG_Z;
    let v = DQuat::from_rotation_x(declination) * v;
    let v = DQuat::from_rotation_z(-day_angle) * v;
    let v = DQuat::from_rotation_x(FRAC_PI_2 - latitude as f64) * v;
    DVec3::new(-v.x, -v.y, v.z).normalize().as_vec3()
}

/// The world's light source.
///
/// Serves two systems at once: the time system attaches the clock, and the
/// visual system reads the direction each frame.
#[derive(Debug)]
pub struct SunComponent {
    time: TimeComponent,
    latitude: f32,
    tilt: f32,
}

impl SunComponent {
    pub fn new(latitude: f32, tilt: f32) -> Self {
        Self {
            time: TimeComponent::new(),
            latitude,
            tilt,
        }
    }

    pub fn from_config(config: &SunConfig) -> Self {
        Self::new(config.latitude, config.tilt)
    }

    pub fn time(&self) -> &TimeComponent {
        &self.time
    }

    pub fn direction(&self) -> Vec3 {
        sun_direction(self.time.days(), self.time.years(), self.latitude, self.tilt)
    }
}

impl Component for SunComponent {
    fn capabilities(&self) -> Capabilities {
        Capabilities::of(&[Capability::Visual, Capability::Time])
    }

    fn as_visual(&self) -> Option<&dyn Visual> {
        Some(self)
    }

    fn as_visual_mut(&mut self) -> Option<&mut dyn Visual> {
        Some(self)
    }

    fn view_mut(&mut self, capability: Capability) -> Option<&mut dyn Any> {
        let view: &mut dyn Any = match capability {
            Capability::Time => &mut self.time,
            _ => self,
        };
        Some(view)
    }
}

impl Visual for SunComponent {
    // Lighting is fed by the visual system before models are drawn.
    fn render(&self, _renderer: &mut dyn Renderer) {}

    fn sun_direction(&self) -> Option<Vec3> {
        Some(self.direction())
    }
}
