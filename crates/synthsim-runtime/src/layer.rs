//! One mechanism's slice of the simulation.
//!
//! A [`SimulationLayer`] owns the drivers and stimuli classified from its
//! mechanism, the user's sensor → actuator routes, and at most one brain.
//!
//! Tick order:
//!
//! 1. brain update (behaviors write commands),
//! 2. routes (into drivers no brain behavior claims),
//! 3. every driver applies its command,
//! 4. every stimulus samples the new state.

use synthsim_hal::{
    Driver, DriverSet, Mechanism, Route, RouteTable, Stimulus, StimulusSet, classify,
};
use synthsim_types::{SimError, Value, ValueType};
use tracing::{debug, info, warn};

use crate::brain::{Brain, BrainIo, BrainState, MechanismView};
use crate::context::SimContext;
use crate::input::InputSource;

pub struct SimulationLayer {
    mechanism: Mechanism,
    drivers: DriverSet,
    stimuli: StimulusSet,
    routes: RouteTable,
    brain: Option<Box<dyn Brain>>,
}

impl SimulationLayer {
    /// Classify `mechanism` using the context's tuning and preferences.
    pub fn new(mechanism: Mechanism, ctx: &SimContext) -> Self {
        let classification = classify(&mechanism, &ctx.tuning, &ctx.preferences);
        info!(
            mechanism = %mechanism.id,
            drivers = classification.drivers.len(),
            stimuli = classification.stimuli.len(),
            "simulation layer created"
        );
        Self {
            mechanism,
            drivers: classification.drivers,
            stimuli: classification.stimuli,
            routes: RouteTable::new(),
            brain: None,
        }
    }

    pub fn mechanism(&self) -> &Mechanism {
        &self.mechanism
    }

    pub fn drivers(&self) -> &DriverSet {
        &self.drivers
    }

    pub fn stimuli(&self) -> &StimulusSet {
        &self.stimuli
    }

    pub fn stimuli_mut(&mut self) -> &mut StimulusSet {
        &mut self.stimuli
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn driver(&self, key: &str) -> Option<&dyn Driver> {
        self.drivers.get(key)
    }

    pub fn stimulus(&self, key: &str) -> Option<&dyn Stimulus> {
        self.stimuli.get(key)
    }

    pub fn brain_name(&self) -> Option<&str> {
        self.brain.as_ref().map(|b| b.name())
    }

    pub fn brain_state(&self) -> Option<BrainState> {
        self.brain.as_ref().map(|b| b.state())
    }

    /// Replace the brain.  The previous brain is disabled and dropped first.
    ///
    /// # Errors
    ///
    /// Whatever the new brain's `configure` returns, or
    /// [`SimError::DriverAlreadyClaimed`] when the brain claims a driver that
    /// is already fed by a route.  The layer is then left without a brain.
    pub fn set_brain(
        &mut self,
        mut brain: Box<dyn Brain>,
        ctx: &mut SimContext,
    ) -> Result<(), SimError> {
        self.clear_brain(ctx);
        let view = MechanismView {
            mechanism: &self.mechanism,
            drivers: &self.drivers,
            stimuli: &self.stimuli,
        };
        let configured = brain.configure(view, ctx).and_then(|()| {
            let claimed = brain.claimed_drivers();
            match self.routes.consumers().find(|c| claimed.iter().any(|k| k.as_str() == *c)) {
                Some(routed) => Err(SimError::DriverAlreadyClaimed(routed.to_string())),
                None => Ok(()),
            }
        });
        match configured {
            Ok(()) => {
                info!(mechanism = %self.mechanism.id, brain = brain.name(), "brain attached");
                self.brain = Some(brain);
                Ok(())
            }
            Err(e) => {
                warn!(
                    mechanism = %self.mechanism.id,
                    brain = brain.name(),
                    error = %e,
                    "brain configure failed"
                );
                brain.disable(ctx);
                Err(e)
            }
        }
    }

    /// Disable and drop the current brain, if any.
    pub fn clear_brain(&mut self, ctx: &mut SimContext) {
        if let Some(mut old) = self.brain.take() {
            old.disable(ctx);
            debug!(mechanism = %self.mechanism.id, brain = old.name(), "brain dropped");
        }
    }

    /// Validate and add a sensor → actuator route.
    ///
    /// # Errors
    ///
    /// [`SimError::DriverAlreadyClaimed`] when the current brain commands the
    /// consumer, otherwise the route table's validation errors.
    pub fn connect(&mut self, route: Route) -> Result<(), SimError> {
        if let Some(brain) = &self.brain
            && brain.claimed_drivers().contains(&route.consumer)
        {
            return Err(SimError::DriverAlreadyClaimed(route.consumer));
        }
        self.routes.connect(route, &self.stimuli, &self.drivers)
    }

    pub fn disconnect(&mut self, consumer: &str) -> usize {
        self.routes.disconnect(consumer)
    }

    pub fn update(&mut self, dt: f32, input: &dyn InputSource, ctx: &SimContext) {
        if let Some(brain) = self.brain.as_mut() {
            brain.update(BrainIo {
                drivers: &mut self.drivers,
                stimuli: &self.stimuli,
                input,
                context: ctx,
                dt,
            });
        }
        self.routes.apply(&self.stimuli, &mut self.drivers);
        self.drivers.update_all(dt);
        self.stimuli.update_all(dt);
    }

    /// Push preference changes into every driver now.
    pub fn sync_preferences(&mut self) {
        self.drivers.sync_preferences();
    }

    pub fn sensor_value(&self, key: &str) -> Option<Value> {
        self.stimuli.get(key).map(|s| s.supplier_value())
    }

    pub fn sensor_type(&self, key: &str) -> Option<ValueType> {
        self.stimuli.get(key).map(|s| s.supplier_type())
    }

    pub fn shutdown(&mut self, ctx: &mut SimContext) {
        self.clear_brain(ctx);
        self.routes = RouteTable::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputScheme, InputState};
    use crate::input_brain::InputBrain;
    use synthsim_hal::sim::{SimMechanismBuilder, SimWorld};
    use synthsim_types::{DriverId, DriverKind, StimulusId, StimulusKind};

    fn layer_with_scheme() -> (SimWorld, SimulationLayer, SimContext) {
        let mut world = SimWorld::new();
        let mechanism = SimMechanismBuilder::new("bot")
            .with_hinge("arm")
            .with_wheel(-0.3)
            .with_wheel(0.3)
            .build(&mut world);
        let mut ctx = SimContext::default();
        ctx.add_scheme(InputScheme::gamepad("pad", 0));
        let layer = SimulationLayer::new(mechanism, &ctx);
        (world, layer, ctx)
    }

    fn arm_keys(layer: &SimulationLayer) -> (String, String) {
        let joint = &layer.mechanism().joints[0].joint;
        (
            DriverId::new(DriverKind::Hinge, joint.name.clone(), joint.guid.clone()).key(),
            StimulusId::new(StimulusKind::Hinge, joint.name.clone(), joint.guid.clone()).key(),
        )
    }

    #[test]
    fn tick_moves_joint_and_updates_sensor() {
        let (_world, mut layer, mut ctx) = layer_with_scheme();
        layer.set_brain(Box::new(InputBrain::new("pad")), &mut ctx).unwrap();
        let (driver_key, sensor_key) = arm_keys(&layer);

        let mut input = InputState::new();
        input.set_axis(0, "dpad_y", 1.0);
        layer.update(0.02, &input, &ctx);

        assert_eq!(layer.driver(&driver_key).unwrap().command(), 1.0);
        let Some(Value::Pair(_, velocity)) = layer.sensor_value(&sensor_key) else {
            panic!("hinge sensor should supply a pair");
        };
        // 60 rad/s² for one 20 ms tick.
        assert!((velocity - 1.2).abs() < 1e-4);
        assert_eq!(layer.sensor_type(&sensor_key), Some(ValueType::Pair));
    }

    #[test]
    fn replacing_brain_disables_previous() {
        let (_world, mut layer, mut ctx) = layer_with_scheme();
        layer.set_brain(Box::new(InputBrain::new("pad")), &mut ctx).unwrap();
        assert_eq!(ctx.bound_count(), 1);
        layer.set_brain(Box::new(InputBrain::new("pad")), &mut ctx).unwrap();
        assert_eq!(ctx.bound_count(), 1);
        assert_eq!(layer.brain_state(), Some(BrainState::Configured));
    }

    #[test]
    fn failed_configure_leaves_no_brain() {
        let (_world, mut layer, mut ctx) = layer_with_scheme();
        layer.set_brain(Box::new(InputBrain::new("pad")), &mut ctx).unwrap();
        assert!(layer.set_brain(Box::new(InputBrain::new("missing")), &mut ctx).is_err());
        assert!(layer.brain_name().is_none());
        assert_eq!(ctx.bound_count(), 0);
    }

    #[test]
    fn route_into_brain_driver_is_rejected() {
        let (_world, mut layer, mut ctx) = layer_with_scheme();
        layer.set_brain(Box::new(InputBrain::new("pad")), &mut ctx).unwrap();
        let (driver_key, sensor_key) = arm_keys(&layer);
        let route = Route::new(&sensor_key, &driver_key).with_component(0);

        assert_eq!(
            layer.connect(route.clone()),
            Err(SimError::DriverAlreadyClaimed(driver_key.clone()))
        );
        assert!(layer.routes().is_empty());

        let mut input = InputState::new();
        input.set_axis(0, "dpad_y", 1.0);
        layer.update(0.02, &input, &ctx);
        assert_eq!(layer.driver(&driver_key).unwrap().command(), 1.0);

        // With the route in place first, the brain is the one refused.
        layer.clear_brain(&mut ctx);
        layer.connect(route).unwrap();
        assert_eq!(
            layer.set_brain(Box::new(InputBrain::new("pad")), &mut ctx),
            Err(SimError::DriverAlreadyClaimed(driver_key))
        );
        assert!(layer.brain_name().is_none());
        assert_eq!(ctx.bound_count(), 0);
    }

    #[test]
    fn route_drives_unclaimed_driver() {
        let (world, mut layer, ctx) = layer_with_scheme();
        let (driver_key, sensor_key) = arm_keys(&layer);
        layer
            .connect(Route::new(&sensor_key, &driver_key).with_component(0))
            .unwrap();

        world.joint(0).unwrap().borrow_mut().set_position(0.5);
        let input = InputState::new();
        // First tick samples the new position, second routes it.
        layer.update(0.02, &input, &ctx);
        layer.update(0.02, &input, &ctx);
        assert_eq!(layer.driver(&driver_key).unwrap().command(), 0.5);

        assert_eq!(layer.disconnect(&driver_key), 1);
        assert!(layer.routes().is_empty());
    }

    #[test]
    fn shutdown_disables_brain() {
        let (_world, mut layer, mut ctx) = layer_with_scheme();
        layer.set_brain(Box::new(InputBrain::new("pad")), &mut ctx).unwrap();
        layer.shutdown(&mut ctx);
        layer.shutdown(&mut ctx);
        assert!(layer.brain_state().is_none());
        assert_eq!(ctx.bound_count(), 0);
    }
}
