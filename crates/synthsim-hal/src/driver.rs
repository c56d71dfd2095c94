//! Generic [`Driver`] trait for everything that pushes a command into the
//! physics engine, plus the concrete drivers produced by classification.
//!
//! Brains and behaviors only ever write commands through the trait; the
//! simulation layer then calls [`Driver::update`] once per tick to apply the
//! command to the engine.

use serde::{Deserialize, Serialize};
use synthsim_types::{ControlMode, DriverId, DriverKind, Value, ValueType};
use tracing::debug;

use crate::physics::{SharedHandler, SharedJoint};
use crate::preferences::GravitySubscription;

/// A control-writable actuator.
pub trait Driver {
    /// Stable identity of this driver.
    fn id(&self) -> &DriverId;

    fn display_name(&self) -> String {
        self.id().display_name()
    }

    /// Store the command to apply on the next [`update`][Driver::update].
    fn set_command(&mut self, value: f32);

    /// The most recently written command.
    fn command(&self) -> f32;

    /// Apply the current command to the engine for one tick of `dt` seconds.
    fn update(&mut self, dt: f32);

    /// Value type this driver accepts from the routing graph.
    fn consumer_type(&self) -> ValueType {
        ValueType::Scalar
    }

    /// Accept a routed value.  Scalar drivers ignore anything that is not a
    /// number.
    fn set_value(&mut self, value: Value) {
        if let Some(n) = value.as_number() {
            self.set_command(n);
        }
    }

    /// Pick up preference changes (force ceilings) immediately.
    fn sync_preferences(&mut self) {}

    /// Control mode of motor-backed drivers; `None` for everything else.
    fn control_mode(&self) -> Option<ControlMode> {
        None
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tuning
// ────────────────────────────────────────────────────────────────────────────

/// Session-wide driver tuning, loaded from the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverTuning {
    /// Maximum change of motor velocity per second for velocity-mode drivers.
    pub max_acceleration: f32,
    /// Normal force / torque ceiling.
    pub max_force: f32,
    /// Ceiling used while subsystem gravity is enabled.
    pub subsystem_gravity_force: f32,
    pub hinge_mode: ControlMode,
    pub slider_mode: ControlMode,
}

impl Default for DriverTuning {
    fn default() -> Self {
        Self {
            max_acceleration: 60.0,
            max_force: 2000.0,
            subsystem_gravity_force: 500.0,
            hinge_mode: ControlMode::Velocity,
            slider_mode: ControlMode::Velocity,
        }
    }
}

/// Limits of one motor driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorLimits {
    pub max_velocity: f32,
    pub max_acceleration: f32,
    pub max_force: f32,
    pub subsystem_gravity_force: f32,
}

impl MotorLimits {
    pub fn from_tuning(max_velocity: f32, tuning: &DriverTuning) -> Self {
        Self {
            max_velocity,
            max_acceleration: tuning.max_acceleration,
            max_force: tuning.max_force,
            subsystem_gravity_force: tuning.subsystem_gravity_force,
        }
    }

    fn force_for(&self, subsystem_gravity: bool) -> f32 {
        if subsystem_gravity {
            self.subsystem_gravity_force
        } else {
            self.max_force
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Motor driver (hinge / slider / wheel)
// ────────────────────────────────────────────────────────────────────────────

/// Rate-limited motor driver for hinge, slider and wheel joints.
///
/// * Velocity mode: the applied motor velocity moves toward
///   `command * max_velocity` by at most `max_acceleration * dt` per tick.
/// * Position mode: the applied target moves toward `command` by at most
///   `max_velocity * dt` per tick.
pub struct MotorDriver {
    id: DriverId,
    joint: SharedJoint,
    mode: ControlMode,
    limits: MotorLimits,
    gravity: GravitySubscription,
    command: f32,
    applied: f32,
    force_limit: f32,
}

impl MotorDriver {
    pub fn new(
        id: DriverId,
        joint: SharedJoint,
        mode: ControlMode,
        limits: MotorLimits,
        gravity: GravitySubscription,
    ) -> Self {
        let mode = if id.kind == DriverKind::Wheel {
            ControlMode::Velocity
        } else {
            mode
        };
        let force_limit = limits.force_for(gravity.current());
        joint.borrow_mut().set_max_force(force_limit);
        let applied = Self::initial_applied(&joint, mode);
        Self {
            id,
            joint,
            mode,
            limits,
            gravity,
            command: 0.0,
            applied,
            force_limit,
        }
    }

    fn initial_applied(joint: &SharedJoint, mode: ControlMode) -> f32 {
        match mode {
            ControlMode::Velocity => 0.0,
            ControlMode::Position => joint.borrow().position(),
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Switch control mode.  Wheels stay in velocity mode.
    pub fn set_mode(&mut self, mode: ControlMode) {
        if self.id.kind == DriverKind::Wheel || mode == self.mode {
            return;
        }
        self.mode = mode;
        self.applied = Self::initial_applied(&self.joint, mode);
        self.command = match mode {
            ControlMode::Velocity => 0.0,
            ControlMode::Position => self.applied,
        };
    }

    /// Value last pushed to the motor (velocity or position target).
    pub fn applied(&self) -> f32 {
        self.applied
    }

    /// Force / torque ceiling currently configured on the motor.
    pub fn force_limit(&self) -> f32 {
        self.force_limit
    }

    pub fn limits(&self) -> MotorLimits {
        self.limits
    }
}

impl Driver for MotorDriver {
    fn id(&self) -> &DriverId {
        &self.id
    }

    fn set_command(&mut self, value: f32) {
        self.command = value;
    }

    fn command(&self) -> f32 {
        self.command
    }

    fn update(&mut self, dt: f32) {
        self.sync_preferences();
        if dt <= 0.0 {
            return;
        }
        match self.mode {
            ControlMode::Velocity => {
                let target = self.command.clamp(-1.0, 1.0) * self.limits.max_velocity;
                let step = self.limits.max_acceleration * dt;
                self.applied += (target - self.applied).clamp(-step, step);
                self.joint.borrow_mut().drive_velocity(self.applied);
            }
            ControlMode::Position => {
                let step = self.limits.max_velocity * dt;
                self.applied += (self.command - self.applied).clamp(-step, step);
                self.joint.borrow_mut().drive_position(self.applied);
            }
        }
    }

    fn control_mode(&self) -> Option<ControlMode> {
        Some(self.mode)
    }

    fn sync_preferences(&mut self) {
        if let Some(subsystem_gravity) = self.gravity.poll_change() {
            self.force_limit = self.limits.force_for(subsystem_gravity);
            self.joint.borrow_mut().set_max_force(self.force_limit);
            debug!(
                driver = %self.id,
                force_limit = self.force_limit,
                "motor force ceiling updated"
            );
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gamepiece drivers
// ────────────────────────────────────────────────────────────────────────────

/// Keeps the assembly's intake running while the command is above one half.
pub struct IntakeDriver {
    id: DriverId,
    handler: SharedHandler,
    command: f32,
    active: bool,
}

impl IntakeDriver {
    pub fn new(id: DriverId, handler: SharedHandler) -> Self {
        Self {
            id,
            handler,
            command: 0.0,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Driver for IntakeDriver {
    fn id(&self) -> &DriverId {
        &self.id
    }

    fn set_command(&mut self, value: f32) {
        self.command = value;
    }

    fn command(&self) -> f32 {
        self.command
    }

    fn update(&mut self, _dt: f32) {
        let active = self.command > 0.5;
        if active != self.active {
            self.active = active;
            self.handler.borrow_mut().set_intake_active(active);
        }
    }
}

/// Fires one ejection on every tick whose command is at least one half.
pub struct EjectorDriver {
    id: DriverId,
    handler: SharedHandler,
    command: f32,
}

impl EjectorDriver {
    pub fn new(id: DriverId, handler: SharedHandler) -> Self {
        Self {
            id,
            handler,
            command: 0.0,
        }
    }
}

impl Driver for EjectorDriver {
    fn id(&self) -> &DriverId {
        &self.id
    }

    fn set_command(&mut self, value: f32) {
        self.command = value;
    }

    fn command(&self) -> f32 {
        self.command
    }

    fn update(&mut self, _dt: f32) {
        if self.command >= 0.5 {
            self.handler.borrow_mut().eject();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::preferences::Preferences;
    use crate::sim::{SimGamepieceHandler, SimJoint};

    const DT: f32 = 0.02;

    fn limits() -> MotorLimits {
        MotorLimits {
            max_velocity: 10.0,
            max_acceleration: 50.0,
            max_force: 400.0,
            subsystem_gravity_force: 100.0,
        }
    }

    fn hinge(prefs: &Preferences, mode: ControlMode) -> (Rc<RefCell<SimJoint>>, MotorDriver) {
        let joint = Rc::new(RefCell::new(SimJoint::default()));
        let driver = MotorDriver::new(
            DriverId::new(DriverKind::Hinge, None, "h1"),
            joint.clone(),
            mode,
            limits(),
            prefs.subscribe_gravity(),
        );
        (joint, driver)
    }

    #[test]
    fn velocity_change_per_tick_is_bounded() {
        let prefs = Preferences::default();
        let (joint, mut driver) = hinge(&prefs, ControlMode::Velocity);
        let max_step = limits().max_acceleration * DT;

        let mut previous = 0.0_f32;
        for command in [1.0, -1.0, 1.0, 0.3, -0.8, 1.0] {
            driver.set_command(command);
            for _ in 0..5 {
                driver.update(DT);
                let applied = joint.borrow().target_velocity();
                assert!((applied - previous).abs() <= max_step + 1e-5);
                previous = applied;
            }
        }
    }

    #[test]
    fn velocity_reaches_target_eventually() {
        let prefs = Preferences::default();
        let (joint, mut driver) = hinge(&prefs, ControlMode::Velocity);
        driver.set_command(0.5);
        for _ in 0..50 {
            driver.update(DT);
        }
        assert!((joint.borrow().target_velocity() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn velocity_command_is_clamped_to_unit_range() {
        let prefs = Preferences::default();
        let (joint, mut driver) = hinge(&prefs, ControlMode::Velocity);
        driver.set_command(4.0);
        for _ in 0..100 {
            driver.update(DT);
        }
        assert!((joint.borrow().target_velocity() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn position_mode_tracks_smoothly() {
        let prefs = Preferences::default();
        let (joint, mut driver) = hinge(&prefs, ControlMode::Position);
        driver.set_command(1.0);
        driver.update(DT);
        // max_velocity * dt = 0.2 per tick
        assert!((joint.borrow().target_position() - 0.2).abs() < 1e-5);
        for _ in 0..10 {
            driver.update(DT);
        }
        assert!((joint.borrow().target_position() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn gravity_toggle_swaps_force_ceiling() {
        let prefs = Preferences::default();
        let (joint, mut driver) = hinge(&prefs, ControlMode::Velocity);
        assert!((joint.borrow().max_force() - 400.0).abs() < f32::EPSILON);

        prefs.set_subsystem_gravity(true);
        driver.sync_preferences();
        assert!((joint.borrow().max_force() - 100.0).abs() < f32::EPSILON);
        assert!((driver.force_limit() - 100.0).abs() < f32::EPSILON);

        prefs.set_subsystem_gravity(false);
        driver.update(DT);
        assert!((joint.borrow().max_force() - 400.0).abs() < f32::EPSILON);
    }

    #[test]
    fn driver_created_while_gravity_on_uses_reduced_ceiling() {
        let prefs = Preferences::new(true);
        let (joint, _driver) = hinge(&prefs, ControlMode::Velocity);
        assert!((joint.borrow().max_force() - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn dropping_driver_releases_gravity_subscription() {
        let prefs = Preferences::default();
        let (_joint, driver) = hinge(&prefs, ControlMode::Velocity);
        assert_eq!(prefs.gravity_subscribers(), 1);
        drop(driver);
        assert_eq!(prefs.gravity_subscribers(), 0);
    }

    #[test]
    fn wheel_driver_ignores_position_mode() {
        let prefs = Preferences::default();
        let joint = Rc::new(RefCell::new(SimJoint::default()));
        let mut driver = MotorDriver::new(
            DriverId::new(DriverKind::Wheel, None, "w1"),
            joint,
            ControlMode::Position,
            limits(),
            prefs.subscribe_gravity(),
        );
        assert_eq!(driver.mode(), ControlMode::Velocity);
        driver.set_mode(ControlMode::Position);
        assert_eq!(driver.mode(), ControlMode::Velocity);
    }

    #[test]
    fn intake_and_ejector_drive_the_assembly() {
        let handler = Rc::new(RefCell::new(SimGamepieceHandler::default()));
        let mut intake = IntakeDriver::new(
            DriverId::new(DriverKind::Intake, None, "r-intake"),
            handler.clone(),
        );
        let mut ejector = EjectorDriver::new(
            DriverId::new(DriverKind::Ejector, None, "r-ejector"),
            handler.clone(),
        );

        intake.set_command(1.0);
        intake.update(DT);
        assert!(handler.borrow().intake_active());

        ejector.set_command(1.0);
        ejector.update(DT);
        ejector.set_command(0.0);
        ejector.update(DT);
        assert_eq!(handler.borrow().ejections(), 1);

        intake.set_command(0.0);
        intake.update(DT);
        assert!(!handler.borrow().intake_active());
    }
}
