//! Session-wide state shared by every brain.
//!
//! Owned by [`SimulationSystem`][crate::system::SimulationSystem] and passed
//! by reference, never reached through a global.

use std::collections::{BTreeMap, HashMap};

use synthsim_hal::{DriverTuning, Preferences};
use synthsim_types::SimError;
use tracing::{debug, info};

use crate::input::InputScheme;

#[derive(Debug, Default)]
pub struct SimContext {
    pub preferences: Preferences,
    pub tuning: DriverTuning,
    schemes: BTreeMap<String, InputScheme>,
    bindings: HashMap<usize, String>,
    next_index: usize,
}

impl SimContext {
    pub fn new(preferences: Preferences, tuning: DriverTuning) -> Self {
        Self {
            preferences,
            tuning,
            ..Self::default()
        }
    }

    /// Add or replace a scheme under its own name.
    pub fn add_scheme(&mut self, scheme: InputScheme) {
        info!(scheme = %scheme.name, controller = scheme.controller, "input scheme registered");
        self.schemes.insert(scheme.name.clone(), scheme);
    }

    pub fn scheme(&self, name: &str) -> Option<&InputScheme> {
        self.schemes.get(name)
    }

    pub fn scheme_names(&self) -> impl Iterator<Item = &str> {
        self.schemes.keys().map(String::as_str)
    }

    /// Allocate a brain index bound to scheme `name`.
    ///
    /// # Errors
    ///
    /// [`SimError::Config`] if no scheme of that name is registered.
    pub fn bind_scheme(&mut self, name: &str) -> Result<usize, SimError> {
        if !self.schemes.contains_key(name) {
            return Err(SimError::Config(format!("unknown input scheme '{name}'")));
        }
        let index = self.next_index;
        self.next_index += 1;
        self.bindings.insert(index, name.to_string());
        debug!(index, scheme = name, "brain index bound");
        Ok(index)
    }

    /// Release a brain index.  Returns `false` if it was not bound.
    pub fn unbind(&mut self, index: usize) -> bool {
        self.bindings.remove(&index).is_some()
    }

    /// Scheme bound to brain `index`.
    pub fn scheme_for(&self, index: usize) -> Option<&InputScheme> {
        self.bindings.get(&index).and_then(|name| self.schemes.get(name))
    }

    pub fn bound_count(&self) -> usize {
        self.bindings.len()
    }
}
