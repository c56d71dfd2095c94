//! The [`Brain`] trait – one control strategy per mechanism.
//!
//! ```text
//! Unconfigured ──configure──▶ Configured ──disable──▶ Disabled
//!                                                      │  ▲
//!                                                      └──┘ disable (no-op)
//! ```

use synthsim_hal::{DriverSet, Mechanism, StimulusSet};
use synthsim_types::SimError;
use tracing::debug;

use crate::behavior::{Behavior, BehaviorContext};
use crate::context::SimContext;
use crate::input::{Controls, InputSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrainState {
    Unconfigured,
    Configured,
    Disabled,
}

/// Read-only view of a layer handed to [`Brain::configure`].
pub struct MechanismView<'a> {
    pub mechanism: &'a Mechanism,
    pub drivers: &'a DriverSet,
    pub stimuli: &'a StimulusSet,
}

/// Per-tick access handed to [`Brain::update`].
pub struct BrainIo<'a> {
    pub drivers: &'a mut DriverSet,
    pub stimuli: &'a StimulusSet,
    pub input: &'a dyn InputSource,
    pub context: &'a SimContext,
    pub dt: f32,
}

pub trait Brain {
    fn name(&self) -> &str;

    fn state(&self) -> BrainState;

    /// Build behaviors and bind resources for the mechanism in `view`.
    fn configure(&mut self, view: MechanismView<'_>, ctx: &mut SimContext) -> Result<(), SimError>;

    /// Run behaviors in registration order, then brain-level logic.
    fn update(&mut self, io: BrainIo<'_>);

    /// Drop behaviors and release bindings.  Must be idempotent.
    fn disable(&mut self, ctx: &mut SimContext);

    /// Driver keys this brain writes commands to while configured.
    fn claimed_drivers(&self) -> Vec<String>;
}

/// Ordered behaviors with exclusive driver claims.
#[derive(Default)]
pub struct BehaviorSet {
    behaviors: Vec<Box<dyn Behavior>>,
    claimed: Vec<String>,
}

impl BehaviorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `behavior`.
    ///
    /// # Errors
    ///
    /// [`SimError::DriverAlreadyClaimed`] when one of its drivers is already
    /// commanded by an earlier behavior; the set is left unchanged.
    pub fn push(&mut self, behavior: Box<dyn Behavior>) -> Result<(), SimError> {
        let wanted = behavior.drivers();
        if let Some(taken) = wanted.iter().find(|k| self.claimed.contains(k)) {
            return Err(SimError::DriverAlreadyClaimed(taken.clone()));
        }
        debug!(behavior = behavior.name(), drivers = wanted.len(), "behavior registered");
        self.claimed.extend(wanted);
        self.behaviors.push(behavior);
        Ok(())
    }

    pub fn update_all(&mut self, drivers: &mut DriverSet, controls: &dyn Controls, dt: f32) {
        let mut ctx = BehaviorContext {
            drivers,
            controls,
            dt,
        };
        for behavior in &mut self.behaviors {
            behavior.update(&mut ctx);
        }
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// Driver keys claimed by the registered behaviors.
    pub fn claimed(&self) -> &[String] {
        &self.claimed
    }

    pub fn names(&self) -> Vec<&str> {
        self.behaviors.iter().map(|b| b.name()).collect()
    }

    pub fn clear(&mut self) {
        self.behaviors.clear();
        self.claimed.clear();
    }
}
