//! Traits implemented by the physics engine collaborator.
//!
//! The control layer never integrates anything itself.  It only reads joint
//! and body state and writes motor targets through these interfaces, so any
//! engine (or the kinematic stubs in [`crate::sim`]) can sit underneath.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;

/// Motor and state interface of a single physics joint.
///
/// Units follow the joint subtype: radians for hinges and wheels, metres for
/// sliders.
pub trait PhysicsJoint {
    /// Current joint position (angle or translation).
    fn position(&self) -> f32;

    /// Current joint velocity.
    fn velocity(&self) -> f32;

    /// Drive the motor toward `target` velocity this step.
    fn drive_velocity(&mut self, target: f32);

    /// Drive the motor toward `target` position this step.
    fn drive_position(&mut self, target: f32);

    /// Cap the force (sliders) or torque (hinges, wheels) the motor may use.
    fn set_max_force(&mut self, max_force: f32);
}

/// A rigid body the layer can observe and nudge.
pub trait PhysicsBody {
    fn position(&self) -> Vec3;

    fn linear_velocity(&self) -> Vec3;

    /// Apply an instantaneous impulse at the centre of mass.
    fn apply_impulse(&mut self, impulse: Vec3);
}

/// The gamepiece assembly of a mechanism (intake rollers + ejector).
pub trait GamepieceHandler {
    fn set_intake_active(&mut self, active: bool);

    /// Fire one ejection of the held gamepiece, if any.
    fn eject(&mut self);
}

/// Joint handle shared between the engine, one driver and one stimulus.
pub type SharedJoint = Rc<RefCell<dyn PhysicsJoint>>;

pub type SharedBody = Rc<RefCell<dyn PhysicsBody>>;

pub type SharedHandler = Rc<RefCell<dyn GamepieceHandler>>;
