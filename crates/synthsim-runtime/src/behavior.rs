//! Behaviors – small control policies that turn resolved controls into
//! driver commands.
//!
//! A behavior never owns a driver.  It records the identity keys of the
//! drivers it commands and writes through the [`DriverSet`] handed to it in
//! [`BehaviorContext`] each tick.
//!
//! | Behavior | Reads | Writes |
//! |---|---|---|
//! | [`DrivetrainBehavior`] | `drive`/`turn` or `left`/`right` | every wheel |
//! | [`JointBehavior`] | `joint <n>` | one hinge or slider |
//! | [`GamepieceBehavior`] | `intake`, `eject` | intake and ejector |

use std::collections::HashSet;

use synthsim_hal::{DriverSet, Mechanism};
use synthsim_types::{DriverId, DriverKind, JointKind, MechanismJoint, SequentialJoint};
use tracing::{debug, warn};

use crate::edge::EdgeTrigger;
use crate::input::Controls;

/// Everything a behavior may touch during one update.
pub struct BehaviorContext<'a> {
    pub drivers: &'a mut DriverSet,
    pub controls: &'a dyn Controls,
    pub dt: f32,
}

impl BehaviorContext<'_> {
    /// Write `value` into the driver stored under `key`.
    pub fn command(&mut self, key: &str, value: f32) {
        match self.drivers.get_mut(key) {
            Some(driver) => driver.set_command(value),
            None => debug!(driver = %key, "commanded driver is not present"),
        }
    }
}

pub trait Behavior {
    fn name(&self) -> &str;

    /// Identity keys of every driver this behavior commands.
    fn drivers(&self) -> Vec<String>;

    fn update(&mut self, ctx: &mut BehaviorContext<'_>);
}

fn driver_key(kind: DriverKind, joint: &MechanismJoint) -> String {
    DriverId::new(kind, joint.name.clone(), joint.guid.clone()).key()
}

// ────────────────────────────────────────────────────────────────────────────
// Drivetrain
// ────────────────────────────────────────────────────────────────────────────

/// Arcade or tank drive over the mechanism's wheels.
///
/// Wheels anchored at negative `x` form the left side, the rest the right
/// side.  Every wheel on a side receives the same command.
#[derive(Debug, Clone)]
pub struct DrivetrainBehavior {
    left: Vec<String>,
    right: Vec<String>,
}

impl DrivetrainBehavior {
    /// Collect the classified wheel drivers of `mechanism`.  `None` when the
    /// mechanism has no wheels.
    pub fn from_mechanism(mechanism: &Mechanism, drivers: &DriverSet) -> Option<Self> {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for binding in &mechanism.joints {
            let joint = &binding.joint;
            if joint.kind != JointKind::Wheel {
                continue;
            }
            let key = driver_key(DriverKind::Wheel, joint);
            if !drivers.contains(&key) {
                continue;
            }
            if joint.anchor.x < 0.0 {
                left.push(key);
            } else {
                right.push(key);
            }
        }
        if left.is_empty() && right.is_empty() {
            return None;
        }
        Some(Self { left, right })
    }

    pub fn left(&self) -> &[String] {
        &self.left
    }

    pub fn right(&self) -> &[String] {
        &self.right
    }

    /// Side commands for the given controls.
    pub fn mix(controls: &dyn Controls) -> (f32, f32) {
        let (left, right) = if controls.arcade() {
            let drive = controls.axis("drive");
            let turn = controls.axis("turn");
            (drive + turn, drive - turn)
        } else {
            (controls.axis("left"), controls.axis("right"))
        };
        (left.clamp(-1.0, 1.0), right.clamp(-1.0, 1.0))
    }
}

impl Behavior for DrivetrainBehavior {
    fn name(&self) -> &str {
        "drivetrain"
    }

    fn drivers(&self) -> Vec<String> {
        self.left.iter().chain(&self.right).cloned().collect()
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) {
        let (left, right) = Self::mix(ctx.controls);
        for key in &self.left {
            ctx.command(key, left);
        }
        for key in &self.right {
            ctx.command(key, right);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sequenceable joint
// ────────────────────────────────────────────────────────────────────────────

/// Drives one hinge or slider from the `joint <n>` control.
///
/// With a sequential preference the joint follows the control of the root of
/// its chain instead of its own; inversions along the chain compose.
#[derive(Debug, Clone)]
pub struct JointBehavior {
    name: String,
    driver: String,
    control: String,
    inverted: bool,
}

impl JointBehavior {
    pub fn new(driver: String, control: String, inverted: bool) -> Self {
        Self {
            name: format!("{control} -> {driver}"),
            driver,
            control,
            inverted,
        }
    }

    /// One behavior per classified hinge/slider of `mechanism`, in joint
    /// order.
    pub fn for_mechanism(
        mechanism: &Mechanism,
        drivers: &DriverSet,
        sequential: &[SequentialJoint],
    ) -> Vec<Self> {
        let mut out = Vec::new();
        let mut index = 0;
        for binding in &mechanism.joints {
            let joint = &binding.joint;
            let kind = match joint.kind {
                JointKind::Hinge => DriverKind::Hinge,
                JointKind::Slider => DriverKind::Slider,
                _ => continue,
            };
            let n = index;
            index += 1;

            let key = driver_key(kind, joint);
            if !drivers.contains(&key) {
                continue;
            }
            let (root, inverted) = resolve_chain(n, sequential);
            out.push(Self::new(key, format!("joint {root}"), inverted));
        }
        out
    }

    pub fn control(&self) -> &str {
        &self.control
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }
}

/// Follow `child → parent` links from joint `n` to the root of its chain.
///
/// Returns the root index and the composed inversion.  A cycle stops at the
/// last joint before it closes.
pub fn resolve_chain(n: usize, sequential: &[SequentialJoint]) -> (usize, bool) {
    let mut current = n;
    let mut inverted = false;
    let mut visited = HashSet::from([n]);
    while let Some(link) = sequential.iter().find(|s| s.child == current) {
        if !visited.insert(link.parent) {
            warn!(joint = n, at = current, "sequential joint cycle; breaking chain");
            break;
        }
        inverted ^= link.inverted;
        current = link.parent;
    }
    (current, inverted)
}

impl Behavior for JointBehavior {
    fn name(&self) -> &str {
        &self.name
    }

    fn drivers(&self) -> Vec<String> {
        vec![self.driver.clone()]
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) {
        let value = ctx.controls.axis(&self.control);
        let value = if self.inverted { -value } else { value };
        ctx.command(&self.driver, value);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gamepiece
// ────────────────────────────────────────────────────────────────────────────

/// Intake axis straight through; one ejection per `eject` press.
#[derive(Debug, Clone)]
pub struct GamepieceBehavior {
    intake: String,
    ejector: String,
    eject: EdgeTrigger,
}

impl GamepieceBehavior {
    /// Uses the `{id}-intake` / `{id}-ejector` drivers classification adds
    /// for an assembly.  `None` when they are missing.
    pub fn from_mechanism(mechanism: &Mechanism, drivers: &DriverSet) -> Option<Self> {
        let intake =
            DriverId::new(DriverKind::Intake, None, format!("{}-intake", mechanism.id)).key();
        let ejector =
            DriverId::new(DriverKind::Ejector, None, format!("{}-ejector", mechanism.id)).key();
        (drivers.contains(&intake) && drivers.contains(&ejector)).then(|| Self {
            intake,
            ejector,
            eject: EdgeTrigger::new(),
        })
    }
}

impl Behavior for GamepieceBehavior {
    fn name(&self) -> &str {
        "gamepiece"
    }

    fn drivers(&self) -> Vec<String> {
        vec![self.intake.clone(), self.ejector.clone()]
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) {
        let intake = ctx.controls.axis("intake");
        ctx.command(&self.intake, intake);
        let fire = self.eject.poll(ctx.controls.button("eject"));
        ctx.command(&self.ejector, if fire { 1.0 } else { 0.0 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputScheme, InputState, SchemeControls};
    use synthsim_hal::sim::{SimMechanismBuilder, SimWorld};
    use synthsim_hal::{DriverTuning, Preferences, classify};

    fn drivetrain_bot() -> (Mechanism, DriverSet) {
        let mut world = SimWorld::new();
        let mechanism = SimMechanismBuilder::new("bot")
            .with_hinge("arm")
            .with_slider("lift")
            .with_wheel(-0.3)
            .with_wheel(-0.3)
            .with_wheel(0.3)
            .with_wheel(0.3)
            .with_assembly()
            .build(&mut world);
        let c = classify(&mechanism, &DriverTuning::default(), &Preferences::default());
        (mechanism, c.drivers)
    }

    fn run(
        behavior: &mut dyn Behavior,
        drivers: &mut DriverSet,
        input: &InputState,
        scheme: &InputScheme,
    ) {
        let controls = SchemeControls {
            scheme,
            source: input,
        };
        let mut ctx = BehaviorContext {
            drivers,
            controls: &controls,
            dt: 0.02,
        };
        behavior.update(&mut ctx);
    }

    fn command(drivers: &DriverSet, key: &str) -> f32 {
        drivers.get(key).unwrap().command()
    }

    #[test]
    fn arcade_mixing() {
        let (mechanism, mut drivers) = drivetrain_bot();
        let mut drive = DrivetrainBehavior::from_mechanism(&mechanism, &drivers).unwrap();
        assert_eq!(drive.left().len(), 2);
        assert_eq!(drive.right().len(), 2);
        let scheme = InputScheme::gamepad("pad", 0);
        let mut input = InputState::new();

        input.set_axis(0, "left_y", 1.0);
        input.set_axis(0, "right_x", 0.0);
        run(&mut drive, &mut drivers, &input, &scheme);
        for key in drive.drivers() {
            assert_eq!(command(&drivers, &key), 1.0);
        }

        input.set_axis(0, "left_y", 0.0);
        input.set_axis(0, "right_x", 1.0);
        run(&mut drive, &mut drivers, &input, &scheme);
        for key in drive.left() {
            assert_eq!(command(&drivers, key), 1.0);
        }
        for key in drive.right() {
            assert_eq!(command(&drivers, key), -1.0);
        }
    }

    #[test]
    fn arcade_output_is_clamped() {
        let scheme = InputScheme::gamepad("pad", 0);
        let mut input = InputState::new();
        input.set_axis(0, "left_y", 1.0);
        input.set_axis(0, "right_x", 1.0);
        let controls = SchemeControls {
            scheme: &scheme,
            source: &input,
        };
        assert_eq!(DrivetrainBehavior::mix(&controls), (1.0, 0.0));
    }

    #[test]
    fn tank_passes_sides_through() {
        let scheme = InputScheme::gamepad("pad", 0).with_tank();
        let mut input = InputState::new();
        input.set_axis(0, "left_y", 0.3);
        input.set_axis(0, "right_y", -0.6);
        let controls = SchemeControls {
            scheme: &scheme,
            source: &input,
        };
        assert_eq!(DrivetrainBehavior::mix(&controls), (0.3, -0.6));
    }

    #[test]
    fn joints_follow_their_own_controls() {
        let (mechanism, mut drivers) = drivetrain_bot();
        let mut joints = JointBehavior::for_mechanism(&mechanism, &drivers, &[]);
        assert_eq!(joints.len(), 2);
        assert_eq!(joints[0].control(), "joint 0");
        assert_eq!(joints[1].control(), "joint 1");

        let scheme = InputScheme::gamepad("pad", 0);
        let mut input = InputState::new();
        input.set_axis(0, "dpad_x", 0.5);
        run(&mut joints[1], &mut drivers, &input, &scheme);
        assert_eq!(command(&drivers, &joints[1].drivers()[0]), 0.5);
    }

    #[test]
    fn sequential_chain_inversion_composes() {
        let seq = [
            SequentialJoint {
                child: 2,
                parent: 1,
                inverted: true,
            },
            SequentialJoint {
                child: 1,
                parent: 0,
                inverted: true,
            },
        ];
        assert_eq!(resolve_chain(2, &seq), (0, false));
        assert_eq!(resolve_chain(1, &seq), (0, true));
        assert_eq!(resolve_chain(0, &seq), (0, false));
    }

    #[test]
    fn sequential_cycle_is_broken() {
        let seq = [
            SequentialJoint {
                child: 0,
                parent: 1,
                inverted: false,
            },
            SequentialJoint {
                child: 1,
                parent: 0,
                inverted: true,
            },
        ];
        assert_eq!(resolve_chain(0, &seq), (1, false));
        assert_eq!(resolve_chain(1, &seq), (0, true));
    }

    #[test]
    fn eject_fires_once_per_press() {
        let (mechanism, mut drivers) = drivetrain_bot();
        let mut gamepiece = GamepieceBehavior::from_mechanism(&mechanism, &drivers).unwrap();
        let ejector = gamepiece.drivers()[1].clone();
        let scheme = InputScheme::gamepad("pad", 0);
        let mut input = InputState::new();
        input.set_button(0, "a", true);

        let mut fired = Vec::new();
        for _ in 0..3 {
            run(&mut gamepiece, &mut drivers, &input, &scheme);
            fired.push(command(&drivers, &ejector));
        }
        assert_eq!(fired, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn gamepiece_requires_assembly() {
        let mut world = SimWorld::new();
        let mechanism = SimMechanismBuilder::new("plain").with_wheel(0.2).build(&mut world);
        let c = classify(&mechanism, &DriverTuning::default(), &Preferences::default());
        assert!(GamepieceBehavior::from_mechanism(&mechanism, &c.drivers).is_none());
        assert!(DrivetrainBehavior::from_mechanism(&mechanism, &c.drivers).is_some());
    }
}
