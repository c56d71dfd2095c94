//! Joint classification – turns a parsed [`Mechanism`] into the drivers and
//! stimuli the rest of the control layer works with.
//!
//! | Joint subtype | Driver | Stimulus |
//! |---|---|---|
//! | `Hinge`  | hinge [`MotorDriver`] | hinge [`JointStimulus`] (accumulation off) |
//! | `Slider` | slider [`MotorDriver`] | slider [`JointStimulus`] |
//! | `Wheel`  | wheel [`MotorDriver`] (velocity only) | wheel [`JointStimulus`] (accumulating) |
//! | `Fixed` / `Unknown` | – | – |
//!
//! A resolvable gamepiece assembly adds an intake and an ejector driver; a
//! root body adds a chassis stimulus.  Nothing here fails: unsupported joints
//! and missing assemblies are logged and skipped.

use synthsim_types::{
    DriverId, DriverKind, JointKind, MechanismJoint, StimulusId, StimulusKind,
};
use tracing::{debug, warn};

use crate::catalog::{DriverSet, StimulusSet};
use crate::driver::{DriverTuning, EjectorDriver, IntakeDriver, MotorDriver, MotorLimits};
use crate::mechanism::Mechanism;
use crate::preferences::Preferences;
use crate::stimulus::{ChassisStimulus, JointStimulus};

/// Result of classifying one mechanism.
#[derive(Default)]
pub struct Classification {
    pub drivers: DriverSet,
    pub stimuli: StimulusSet,
}

/// Classify every joint of `mechanism`.
///
/// Deterministic: the same joint list always yields the same identity keys in
/// the same order.
pub fn classify(
    mechanism: &Mechanism,
    tuning: &DriverTuning,
    preferences: &Preferences,
) -> Classification {
    let mut out = Classification::default();

    for binding in &mechanism.joints {
        let joint = &binding.joint;
        let Some((driver_kind, stimulus_kind)) = pairing(joint.kind) else {
            debug!(
                mechanism = %mechanism.id,
                guid = %joint.guid,
                kind = ?joint.kind,
                "joint subtype has no driver/stimulus pairing; skipping"
            );
            continue;
        };

        let driver_id = DriverId::new(driver_kind, joint.name.clone(), joint.guid.clone());
        if out.drivers.contains(&driver_id.key()) {
            warn!(
                mechanism = %mechanism.id,
                guid = %joint.guid,
                "duplicate joint guid; skipping"
            );
            continue;
        }

        let mode = match joint.kind {
            JointKind::Slider => tuning.slider_mode,
            _ => tuning.hinge_mode,
        };
        let driver = MotorDriver::new(
            driver_id,
            binding.handle.clone(),
            mode,
            MotorLimits::from_tuning(joint.max_velocity, tuning),
            preferences.subscribe_gravity(),
        );
        out.drivers.add(Box::new(driver));

        let stimulus_id = stimulus_id(stimulus_kind, joint);
        out.stimuli
            .add(Box::new(JointStimulus::new(stimulus_id, binding.handle.clone())));
    }

    match &mechanism.assembly {
        Some(handler) => {
            let intake = DriverId::new(
                DriverKind::Intake,
                None,
                format!("{}-intake", mechanism.id),
            );
            let ejector = DriverId::new(
                DriverKind::Ejector,
                None,
                format!("{}-ejector", mechanism.id),
            );
            out.drivers
                .add(Box::new(IntakeDriver::new(intake, handler.clone())));
            out.drivers
                .add(Box::new(EjectorDriver::new(ejector, handler.clone())));
        }
        None => debug!(
            mechanism = %mechanism.id,
            "no gamepiece assembly resolved; intake/ejector omitted"
        ),
    }

    if let Some(body) = &mechanism.root_body {
        let id = StimulusId::new(
            StimulusKind::Chassis,
            Some("chassis".to_string()),
            format!("{}-chassis", mechanism.id),
        );
        out.stimuli.add(Box::new(ChassisStimulus::new(id, body.clone())));
    }

    debug!(
        mechanism = %mechanism.id,
        drivers = out.drivers.len(),
        stimuli = out.stimuli.len(),
        "mechanism classified"
    );
    out
}

fn pairing(kind: JointKind) -> Option<(DriverKind, StimulusKind)> {
    match kind {
        JointKind::Hinge => Some((DriverKind::Hinge, StimulusKind::Hinge)),
        JointKind::Slider => Some((DriverKind::Slider, StimulusKind::Slider)),
        JointKind::Wheel => Some((DriverKind::Wheel, StimulusKind::Wheel)),
        JointKind::Fixed | JointKind::Unknown => None,
    }
}

fn stimulus_id(kind: StimulusKind, joint: &MechanismJoint) -> StimulusId {
    StimulusId::new(kind, joint.name.clone(), joint.guid.clone())
}
