//! # Capabilities — Which Systems Manage a Component
//!
//! Every component declares, once and for all at construction, the set of
//! capabilities it serves. The [`World`](super::World) routes a component to
//! each system whose capability is in that set. Membership is a bit test, not
//! a type cast, so one object can serve several systems at once (a physics
//! body is both `Physics` and `Transform`).
//!
//! ```text
//! Capabilities (u8)
//! ┌───┬───┬───┬──────────┬──────────┬──────┬─────────┬────────┐
//! │ - │ - │ - │ Behavior │ Transform│ Time │ Physics │ Visual │
//! └───┴───┴───┴──────────┴──────────┴──────┴─────────┴────────┘
//! ```

use std::fmt;

/// A tag identifying which system (or contract) a component participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Drawn by the visual system.
    Visual,
    /// Owns a rigid body in the physics system.
    Physics,
    /// Receives the simulation clock from the time system.
    Time,
    /// Exposes position, orientation and scale to siblings.
    Transform,
    /// Runs per-tick logic during the entity sweep.
    Behavior,
}

impl Capability {
    /// All capabilities, in bit order.
    pub const ALL: [Capability; 5] = [
        Capability::Visual,
        Capability::Physics,
        Capability::Time,
        Capability::Transform,
        Capability::Behavior,
    ];

    const fn bit(self) -> u8 {
        match self {
            Capability::Visual => 1 << 0,
            Capability::Physics => 1 << 1,
            Capability::Time => 1 << 2,
            Capability::Transform => 1 << 3,
            Capability::Behavior => 1 << 4,
        }
    }
}

/// A small copyable set of [`Capability`] tags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    /// The empty set.
    pub const NONE: Self = Self(0);

    /// Build a set from a slice of tags.
    pub const fn of(tags: &[Capability]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < tags.len() {
            bits |= tags[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// Return a copy of this set with `tag` added.
    pub const fn with(self, tag: Capability) -> Self {
        Self(self.0 | tag.bit())
    }

    pub const fn contains(self, tag: Capability) -> bool {
        self.0 & tag.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the tags in this set, in bit order.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl From<Capability> for Capabilities {
    fn from(tag: Capability) -> Self {
        Self(tag.bit())
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
