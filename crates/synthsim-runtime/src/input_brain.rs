//! Local control from a named input scheme.

use glam::Vec3;
use synthsim_hal::physics::SharedBody;
use synthsim_types::{SequentialJoint, SimError};
use tracing::{debug, info};

use crate::behavior::{DrivetrainBehavior, GamepieceBehavior, JointBehavior};
use crate::brain::{BehaviorSet, Brain, BrainIo, BrainState, MechanismView};
use crate::context::SimContext;
use crate::edge::EdgeTrigger;
use crate::input::{Controls, NoControls, SchemeControls};

/// Upward impulse applied to the root body by the `unstick` button.
pub const DEFAULT_UNSTICK_IMPULSE: f32 = 150.0;

/// Brain that reads an [`InputScheme`][crate::input::InputScheme] and
/// drives the mechanism through a drivetrain, one behavior per sequenceable
/// joint, and a gamepiece behavior.
pub struct InputBrain {
    scheme: String,
    state: BrainState,
    index: Option<usize>,
    behaviors: BehaviorSet,
    root_body: Option<SharedBody>,
    unstick: EdgeTrigger,
    unstick_impulse: f32,
}

impl InputBrain {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            state: BrainState::Unconfigured,
            index: None,
            behaviors: BehaviorSet::new(),
            root_body: None,
            unstick: EdgeTrigger::new(),
            unstick_impulse: DEFAULT_UNSTICK_IMPULSE,
        }
    }

    pub fn with_unstick_impulse(mut self, impulse: f32) -> Self {
        self.unstick_impulse = impulse;
        self
    }

    /// Brain index bound in the context while configured.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn behaviors(&self) -> &BehaviorSet {
        &self.behaviors
    }
}

impl Brain for InputBrain {
    fn name(&self) -> &str {
        "input"
    }

    fn state(&self) -> BrainState {
        self.state
    }

    fn configure(&mut self, view: MechanismView<'_>, ctx: &mut SimContext) -> Result<(), SimError> {
        match self.state {
            BrainState::Configured => return Ok(()),
            BrainState::Disabled => {
                return Err(SimError::Config("input brain was disabled".to_string()));
            }
            BrainState::Unconfigured => {}
        }

        let mechanism = view.mechanism;
        let index = ctx.bind_scheme(&self.scheme)?;

        if mechanism.controllable {
            let sequential = ctx.preferences.sequential(&mechanism.name);
            let built = self.build_behaviors(&view, sequential);
            if let Err(e) = built {
                self.behaviors.clear();
                ctx.unbind(index);
                return Err(e);
            }
        } else {
            info!(mechanism = %mechanism.id, "mechanism is not controllable; no behaviors");
        }

        self.index = Some(index);
        self.root_body = mechanism.root_body.clone();
        self.state = BrainState::Configured;
        info!(
            mechanism = %mechanism.id,
            scheme = %self.scheme,
            index,
            behaviors = self.behaviors.len(),
            "input brain configured"
        );
        Ok(())
    }

    fn update(&mut self, io: BrainIo<'_>) {
        if self.state != BrainState::Configured {
            return;
        }
        let scheme = self.index.and_then(|i| io.context.scheme_for(i));
        let unstick = match scheme {
            Some(scheme) => {
                let controls = SchemeControls {
                    scheme,
                    source: io.input,
                };
                self.behaviors.update_all(io.drivers, &controls, io.dt);
                controls.button("unstick")
            }
            None => {
                self.behaviors.update_all(io.drivers, &NoControls, io.dt);
                false
            }
        };

        if self.unstick.poll(unstick) {
            if let Some(body) = &self.root_body {
                body.borrow_mut().apply_impulse(Vec3::Y * self.unstick_impulse);
                debug!(impulse = self.unstick_impulse, "unstick impulse applied");
            }
        }
    }

    fn disable(&mut self, ctx: &mut SimContext) {
        if self.state == BrainState::Disabled {
            return;
        }
        self.behaviors.clear();
        if let Some(index) = self.index.take() {
            ctx.unbind(index);
        }
        self.root_body = None;
        self.unstick.reset();
        self.state = BrainState::Disabled;
        info!(scheme = %self.scheme, "input brain disabled");
    }
    fn claimed_drivers(&self) -> Vec<String> {
        self.behaviors.claimed().to_vec()
    }
}

impl InputBrain {
    fn build_behaviors(
        &mut self,
        view: &MechanismView<'_>,
        sequential: &[SequentialJoint],
    ) -> Result<(), SimError> {
        if let Some(drive) = DrivetrainBehavior::from_mechanism(view.mechanism, view.drivers) {
            self.behaviors.push(Box::new(drive))?;
        }
        for joint in JointBehavior::for_mechanism(view.mechanism, view.drivers, sequential) {
            self.behaviors.push(Box::new(joint))?;
        }
        if let Some(gamepiece) = GamepieceBehavior::from_mechanism(view.mechanism, view.drivers) {
            self.behaviors.push(Box::new(gamepiece))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputScheme, InputState};
    use synthsim_hal::sim::{SimMechanismBuilder, SimWorld};
    use synthsim_hal::{Classification, DriverTuning, Mechanism, classify};

    fn setup(controllable: bool) -> (SimWorld, Mechanism, Classification, SimContext) {
        let mut world = SimWorld::new();
        let mut builder = SimMechanismBuilder::new("bot")
            .with_hinge("arm")
            .with_wheel(-0.3)
            .with_wheel(0.3)
            .with_chassis()
            .with_assembly();
        if !controllable {
            builder = builder.uncontrollable();
        }
        let mechanism = builder.build(&mut world);
        let mut ctx = SimContext::default();
        ctx.add_scheme(InputScheme::gamepad("pad", 0));
        let c = classify(&mechanism, &DriverTuning::default(), &ctx.preferences);
        (world, mechanism, c, ctx)
    }

    fn view<'a>(mechanism: &'a Mechanism, c: &'a Classification) -> MechanismView<'a> {
        MechanismView {
            mechanism,
            drivers: &c.drivers,
            stimuli: &c.stimuli,
        }
    }

    #[test]
    fn configure_binds_scheme_and_builds_behaviors() {
        let (_world, mechanism, c, mut ctx) = setup(true);
        let mut brain = InputBrain::new("pad");
        assert_eq!(brain.state(), BrainState::Unconfigured);
        brain.configure(view(&mechanism, &c), &mut ctx).unwrap();
        assert_eq!(brain.state(), BrainState::Configured);
        assert_eq!(ctx.bound_count(), 1);
        let names = brain.behaviors().names();
        assert_eq!(names.len(), 3);
        assert_eq!(names[0], "drivetrain");
        assert!(names[1].starts_with("joint 0"));
        assert_eq!(names[2], "gamepiece");
        // Two wheels, the arm, intake and ejector.
        assert_eq!(brain.claimed_drivers().len(), 5);
    }

    #[test]
    fn uncontrollable_mechanism_gets_no_behaviors() {
        let (_world, mechanism, c, mut ctx) = setup(false);
        let mut brain = InputBrain::new("pad");
        brain.configure(view(&mechanism, &c), &mut ctx).unwrap();
        assert!(brain.behaviors().is_empty());
    }

    #[test]
    fn unknown_scheme_fails_configure() {
        let (_world, mechanism, c, mut ctx) = setup(true);
        let mut brain = InputBrain::new("missing");
        assert!(brain.configure(view(&mechanism, &c), &mut ctx).is_err());
        assert_eq!(brain.state(), BrainState::Unconfigured);
        assert_eq!(ctx.bound_count(), 0);
    }

    #[test]
    fn disable_is_idempotent() {
        let (_world, mechanism, c, mut ctx) = setup(true);
        let mut brain = InputBrain::new("pad");
        brain.configure(view(&mechanism, &c), &mut ctx).unwrap();
        brain.disable(&mut ctx);
        brain.disable(&mut ctx);
        assert_eq!(brain.state(), BrainState::Disabled);
        assert!(brain.behaviors().is_empty());
        assert!(brain.claimed_drivers().is_empty());
        assert_eq!(ctx.bound_count(), 0);
        assert!(brain.index().is_none());
    }

    #[test]
    fn unstick_fires_one_impulse_per_press() {
        let mut world = SimWorld::new();
        let mechanism = SimMechanismBuilder::new("bot")
            .with_wheel(0.3)
            .with_chassis()
            .build(&mut world);
        let body = world.body(0).unwrap();
        let mut ctx = SimContext::default();
        ctx.add_scheme(InputScheme::gamepad("pad", 0));
        let mut c = classify(&mechanism, &DriverTuning::default(), &ctx.preferences);

        let mut brain = InputBrain::new("pad").with_unstick_impulse(10.0);
        brain
            .configure(
                MechanismView {
                    mechanism: &mechanism,
                    drivers: &c.drivers,
                    stimuli: &c.stimuli,
                },
                &mut ctx,
            )
            .unwrap();

        let mut input = InputState::new();
        input.set_button(0, "y", true);
        for _ in 0..4 {
            brain.update(BrainIo {
                drivers: &mut c.drivers,
                stimuli: &c.stimuli,
                input: &input,
                context: &ctx,
                dt: 0.02,
            });
        }
        assert_eq!(body.borrow().total_impulse(), Vec3::new(0.0, 10.0, 0.0));
    }
}
