//! [`SimulationSystem`] – registry of simulation layers, ticked by the host.
//!
//! Layers are keyed by mechanism id and always ticked in id order, so a run
//! is reproducible regardless of registration order.
//!
//! # Example
//!
//! ```rust
//! use synthsim_hal::sim::{SimMechanismBuilder, SimWorld};
//! use synthsim_runtime::{InputBrain, InputScheme, InputState, SimulationSystem};
//!
//! let mut world = SimWorld::new();
//! let robot = SimMechanismBuilder::new("robot")
//!     .with_wheel(-0.3)
//!     .with_wheel(0.3)
//!     .build(&mut world);
//!
//! let mut system = SimulationSystem::default();
//! system.context_mut().add_scheme(InputScheme::gamepad("pad", 0));
//! system.register_mechanism(robot);
//! system.set_brain("robot", Box::new(InputBrain::new("pad"))).unwrap();
//!
//! system.update(0.02, &InputState::new());
//! world.step(0.02);
//! ```

use std::collections::BTreeMap;

use synthsim_hal::{Mechanism, Route};
use synthsim_types::{SimError, Value, ValueType};
use tracing::{info, warn};

use crate::brain::Brain;
use crate::context::SimContext;
use crate::input::InputSource;
use crate::layer::SimulationLayer;

#[derive(Default)]
pub struct SimulationSystem {
    layers: BTreeMap<String, SimulationLayer>,
    context: SimContext,
}

impl SimulationSystem {
    pub fn new(context: SimContext) -> Self {
        Self {
            layers: BTreeMap::new(),
            context,
        }
    }

    pub fn context(&self) -> &SimContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut SimContext {
        &mut self.context
    }

    /// Create a layer for `mechanism`.  Returns `false` (and keeps the
    /// existing layer) when the id is already registered.
    pub fn register_mechanism(&mut self, mechanism: Mechanism) -> bool {
        let id = mechanism.id.as_str().to_string();
        if self.layers.contains_key(&id) {
            info!(mechanism = %id, "mechanism already registered");
            return false;
        }
        let layer = SimulationLayer::new(mechanism, &self.context);
        self.layers.insert(id, layer);
        true
    }

    /// Disable the layer's brain and drop the layer.
    pub fn unregister_mechanism(&mut self, id: &str) -> bool {
        match self.layers.remove(id) {
            Some(mut layer) => {
                layer.shutdown(&mut self.context);
                info!(mechanism = %id, "mechanism unregistered");
                true
            }
            None => false,
        }
    }

    pub fn layer(&self, id: &str) -> Option<&SimulationLayer> {
        self.layers.get(id)
    }

    pub fn layer_mut(&mut self, id: &str) -> Option<&mut SimulationLayer> {
        self.layers.get_mut(id)
    }

    /// Registered mechanism ids in tick order.
    pub fn mechanism_ids(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Attach `brain` to mechanism `id`, replacing any previous brain.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownMechanism`] if `id` is not registered, or the
    /// brain's configure error.  Other mechanisms are unaffected either way.
    pub fn set_brain(&mut self, id: &str, brain: Box<dyn Brain>) -> Result<(), SimError> {
        let Some(layer) = self.layers.get_mut(id) else {
            warn!(mechanism = %id, brain = brain.name(), "set_brain on unknown mechanism");
            return Err(SimError::UnknownMechanism(id.to_string()));
        };
        layer.set_brain(brain, &mut self.context)
    }

    pub fn connect(&mut self, id: &str, route: Route) -> Result<(), SimError> {
        self.layers
            .get_mut(id)
            .ok_or_else(|| SimError::UnknownMechanism(id.to_string()))?
            .connect(route)
    }

    /// Tick every layer once.
    pub fn update(&mut self, dt: f32, input: &dyn InputSource) {
        for layer in self.layers.values_mut() {
            layer.update(dt, input, &self.context);
        }
    }

    /// Toggle subsystem gravity and push the new force ceilings into every
    /// driver immediately.
    pub fn set_subsystem_gravity(&mut self, enabled: bool) {
        if self.context.preferences.set_subsystem_gravity(enabled) {
            info!(enabled, "subsystem gravity changed");
        }
        for layer in self.layers.values_mut() {
            layer.sync_preferences();
        }
    }

    pub fn sensor_value(&self, id: &str, key: &str) -> Option<Value> {
        self.layers.get(id)?.sensor_value(key)
    }

    pub fn sensor_type(&self, id: &str, key: &str) -> Option<ValueType> {
        self.layers.get(id)?.sensor_type(key)
    }

    /// Disable every brain.  Layers stay registered.
    pub fn shutdown(&mut self) {
        for layer in self.layers.values_mut() {
            layer.shutdown(&mut self.context);
        }
        info!(layers = self.layers.len(), "simulation system shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::BrainState;
    use crate::input::{InputScheme, InputState};
    use crate::input_brain::InputBrain;
    use synthsim_hal::sim::{SimJoint, SimMechanismBuilder, SimWorld};
    use synthsim_hal::{DriverTuning, Preferences};
    use synthsim_types::{StimulusId, StimulusKind};

    fn system_with(world: &mut SimWorld, names: &[&str]) -> SimulationSystem {
        let mut system = SimulationSystem::new(SimContext::new(
            Preferences::default(),
            DriverTuning::default(),
        ));
        system.context_mut().add_scheme(InputScheme::gamepad("pad", 0));
        for name in names {
            let mechanism = SimMechanismBuilder::new(*name)
                .with_hinge("arm")
                .with_wheel(-0.3)
                .with_wheel(0.3)
                .with_chassis()
                .build(world);
            assert!(system.register_mechanism(mechanism));
        }
        system
    }

    #[test]
    fn register_is_idempotent_and_ordered() {
        let mut world = SimWorld::new();
        let mut system = system_with(&mut world, &["zeta", "alpha"]);
        let again = SimMechanismBuilder::new("alpha").build(&mut world);
        assert!(!system.register_mechanism(again));
        assert_eq!(system.mechanism_ids().collect::<Vec<_>>(), vec!["alpha", "zeta"]);
        // The original layer survives the duplicate registration.
        assert_eq!(system.layer("alpha").unwrap().drivers().len(), 3);
    }

    #[test]
    fn set_brain_on_unknown_mechanism_errors() {
        let mut world = SimWorld::new();
        let mut system = system_with(&mut world, &["robot"]);
        let err = system
            .set_brain("ghost", Box::new(InputBrain::new("pad")))
            .unwrap_err();
        assert_eq!(err, SimError::UnknownMechanism("ghost".into()));
        system.set_brain("robot", Box::new(InputBrain::new("pad"))).unwrap();
    }

    #[test]
    fn unregister_disables_brain_first() {
        let mut world = SimWorld::new();
        let mut system = system_with(&mut world, &["robot"]);
        system.set_brain("robot", Box::new(InputBrain::new("pad"))).unwrap();
        assert_eq!(system.context().bound_count(), 1);
        assert!(system.unregister_mechanism("robot"));
        assert!(!system.unregister_mechanism("robot"));
        assert_eq!(system.context().bound_count(), 0);
    }

    #[test]
    fn gravity_toggle_reaches_every_motor() {
        let mut world = SimWorld::new();
        let mut system = system_with(&mut world, &["a", "b"]);
        let tuning = DriverTuning::default();

        system.set_subsystem_gravity(true);
        for i in 0..6 {
            let joint: std::rc::Rc<std::cell::RefCell<SimJoint>> = world.joint(i).unwrap();
            assert_eq!(joint.borrow().max_force(), tuning.subsystem_gravity_force);
        }
        system.set_subsystem_gravity(false);
        for i in 0..6 {
            assert_eq!(world.joint(i).unwrap().borrow().max_force(), tuning.max_force);
        }
    }

    #[test]
    fn chassis_telemetry_by_identity_key() {
        let mut world = SimWorld::new();
        let mut system = system_with(&mut world, &["robot"]);
        let key = StimulusId::new(
            StimulusKind::Chassis,
            Some("chassis".to_string()),
            "robot-chassis",
        )
        .key();
        system.update(0.02, &InputState::new());
        assert_eq!(system.sensor_type("robot", &key), Some(ValueType::Triple));
        assert_eq!(system.sensor_value("robot", &key), Some(Value::Triple(0.0, 0.0, 0.0)));
        assert!(system.sensor_value("nobody", &key).is_none());
    }

    #[test]
    fn shutdown_disables_every_brain() {
        let mut world = SimWorld::new();
        let mut system = system_with(&mut world, &["a", "b"]);
        system.set_brain("a", Box::new(InputBrain::new("pad"))).unwrap();
        system.set_brain("b", Box::new(InputBrain::new("pad"))).unwrap();
        system.shutdown();
        system.shutdown();
        assert_eq!(system.context().bound_count(), 0);
        assert!(system.layer("a").unwrap().brain_state().is_none());
        assert_ne!(system.layer("b").unwrap().brain_state(), Some(BrainState::Configured));
    }
}
