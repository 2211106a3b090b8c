//! # Time — Simulated Clock and Frame Timing
//!
//! Two different clocks live here:
//!
//! - [`Clock`] is *simulated* time. The [`TimeSystem`] owns it and advances
//!   it by the `dt` handed to [`World::update`](crate::ecs::World::update).
//!   Every registered [`TimeComponent`] receives a handle to the same clock
//!   and reads days and years through it.
//! - [`FrameClock`] is *wall-clock* time. The frame loop samples it once per
//!   frame to produce that `dt`.
//!
//! ## Derived quantities
//!
//! ```text
//! days  = (elapsed + offset) / seconds_per_day
//! years = days / days_per_year
//! ```
//!
//! The fractional part of `days` is the time of day: `0.5` is noon, `0.75`
//! is 18:00.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::config::TimeConfig;
use crate::ecs::{Capabilities, Capability, Component, ComponentRef, ComponentSet, System};

struct ClockState {
    elapsed: Cell<f64>,
    seconds_per_day: Cell<f64>,
    days_per_year: Cell<f64>,
    offset: Cell<f64>,
}

/// Shared handle to the simulated clock.
#[derive(Clone)]
pub struct Clock(Rc<ClockState>);

impl Clock {
    pub fn new(config: &TimeConfig) -> Self {
        Self(Rc::new(ClockState {
            elapsed: Cell::new(0.0),
            seconds_per_day: Cell::new(config.seconds_per_day),
            days_per_year: Cell::new(config.days_per_year),
            offset: Cell::new(config.offset),
        }))
    }

    /// Simulated seconds accumulated since the world started.
    pub fn elapsed(&self) -> f64 {
        self.0.elapsed.get()
    }

    pub fn days(&self) -> f64 {
        (self.elapsed() + self.offset()) / self.seconds_per_day()
    }

    pub fn years(&self) -> f64 {
        self.days() / self.days_per_year()
    }

    pub fn seconds_per_day(&self) -> f64 {
        self.0.seconds_per_day.get()
    }

    pub fn days_per_year(&self) -> f64 {
        self.0.days_per_year.get()
    }

    pub fn offset(&self) -> f64 {
        self.0.offset.get()
    }

    /// # Panics
    ///
    /// Panics unless `seconds` is positive.
    pub fn set_seconds_per_day(&self, seconds: f64) {
        assert!(seconds > 0.0, "seconds_per_day must be positive, got {seconds}");
        self.0.seconds_per_day.set(seconds);
    }

    /// # Panics
    ///
    /// Panics unless `days` is positive.
    pub fn set_days_per_year(&self, days: f64) {
        assert!(days > 0.0, "days_per_year must be positive, got {days}");
        self.0.days_per_year.set(days);
    }

    pub fn set_offset(&self, offset: f64) {
        self.0.offset.set(offset);
    }

    pub(crate) fn advance(&self, dt: f64) {
        self.0.elapsed.set(self.elapsed() + dt);
    }

    pub fn ptr_eq(&self, other: &Clock) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("elapsed", &self.elapsed())
            .field("days", &self.days())
            .finish()
    }
}

/// Read access to the simulated clock for one component.
///
/// Until the component is registered with a [`TimeSystem`] it is unattached
/// and reports zero for everything.
#[derive(Debug, Default)]
pub struct TimeComponent {
    clock: Option<Clock>,
}

impl TimeComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach(&mut self, clock: Clock) {
        self.clock = Some(clock);
    }

    pub(crate) fn detach(&mut self) {
        self.clock = None;
    }

    pub fn is_attached(&self) -> bool {
        self.clock.is_some()
    }

    /// Simulated seconds since the world started.
    pub fn time(&self) -> f64 {
        self.clock.as_ref().map_or(0.0, Clock::elapsed)
    }

    pub fn days(&self) -> f64 {
        self.clock.as_ref().map_or(0.0, Clock::days)
    }

    pub fn years(&self) -> f64 {
        self.clock.as_ref().map_or(0.0, Clock::years)
    }
}

impl Component for TimeComponent {
    fn capabilities(&self) -> Capabilities {
        Capabilities::from(Capability::Time)
    }
}

fn time_view<'a>(component: &'a mut (dyn Component + 'static)) -> Option<&'a mut TimeComponent> {
    component.view_mut(Capability::Time)?.downcast_mut()
}

/// Owns the simulated clock and hands it to every `Time` component.
pub struct TimeSystem {
    clock: Clock,
    components: ComponentSet,
}

impl TimeSystem {
    pub fn new(config: &TimeConfig) -> Self {
        Self {
            clock: Clock::new(config),
            components: ComponentSet::new(),
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed()
    }

    pub fn days(&self) -> f64 {
        self.clock.days()
    }

    pub fn years(&self) -> f64 {
        self.clock.years()
    }
}

impl System for TimeSystem {
    fn name(&self) -> &'static str {
        "time"
    }

    fn capability(&self) -> Capability {
        Capability::Time
    }

    /// # Panics
    ///
    /// Panics if the component declares `Time` but exposes no
    /// [`TimeComponent`] view.
    fn add(&mut self, component: ComponentRef) {
        {
            let mut inner = component.borrow_mut();
            let Some(time) = time_view(&mut *inner) else {
                panic!("component {:?} declares Time but has no time view", component.id());
            };
            time.attach(self.clock.clone());
        }
        self.components.insert(component);
    }

    fn update(&mut self, dt: f64) {
        let evicted = self.components.evict(|c| {
            if let Some(time) = time_view(&mut *c.borrow_mut()) {
                time.detach();
            }
        });
        if evicted > 0 {
            log::trace!("time: evicted {evicted} component(s)");
        }
        self.clock.advance(dt);
    }

    fn len(&self) -> usize {
        self.components.len()
    }
}

/// Wall-clock frame timer for the driving loop.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    startup: Instant,
    frame_start: Instant,
    delta: Duration,
    frame_count: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            startup: now,
            frame_start: now,
            delta: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Call once at the start of each frame. Returns the seconds since the
    /// previous call.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        self.delta = now - self.frame_start;
        self.frame_start = now;
        self.frame_count += 1;
        self.delta.as_secs_f64()
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_secs(&self) -> f64 {
        self.delta.as_secs_f64()
    }

    /// Wall-clock time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.frame_start - self.startup
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Estimated FPS based on the last frame's delta.
    pub fn fps(&self) -> f64 {
        let secs = self.delta.as_secs_f64();
        if secs > 0.0 { 1.0 / secs } else { 0.0 }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
