//! Generic [`Stimulus`] trait for read-only sensors and the concrete joint
//! and chassis sensors produced by classification.

use glam::Vec3;
use synthsim_types::{StimulusId, StimulusKind, Value, ValueType};
use tracing::debug;

use crate::physics::{SharedBody, SharedJoint};

/// A sensor sampled once per tick.
pub trait Stimulus {
    fn id(&self) -> &StimulusId;

    /// Refresh the cached reading from the current physics state.
    fn update(&mut self, dt: f32);

    /// Latest position reading.
    fn position_value(&self) -> Value;

    /// Latest velocity reading, where the sensor measures one.
    fn velocity_value(&self) -> Option<Value>;

    /// The reading as exposed on the typed value bus.
    fn supplier_value(&self) -> Value;

    fn supplier_type(&self) -> ValueType;

    /// Turn accumulation on or off.  Sensors without accumulation ignore it.
    fn set_accumulate(&mut self, _on: bool) {}

    fn is_accumulating(&self) -> bool {
        false
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Joint stimulus
// ────────────────────────────────────────────────────────────────────────────

/// Position / velocity sensor on a hinge, slider or wheel joint.
///
/// Hinge and wheel sensors can *accumulate*: instead of reading the joint's
/// absolute position they integrate `velocity * dt`.  Turning accumulation
/// on from off resets the total to zero.
pub struct JointStimulus {
    id: StimulusId,
    joint: SharedJoint,
    accumulate_supported: bool,
    accumulating: bool,
    accumulated: f32,
    position: f32,
    velocity: f32,
}

impl JointStimulus {
    pub fn new(id: StimulusId, joint: SharedJoint) -> Self {
        let (accumulate_supported, accumulating) = match id.kind {
            StimulusKind::Hinge => (true, false),
            StimulusKind::Wheel => (true, true),
            StimulusKind::Slider | StimulusKind::Chassis => (false, false),
        };
        let position = if accumulating {
            0.0
        } else {
            joint.borrow().position()
        };
        Self {
            id,
            joint,
            accumulate_supported,
            accumulating,
            accumulated: 0.0,
            position,
            velocity: 0.0,
        }
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }
}

impl Stimulus for JointStimulus {
    fn id(&self) -> &StimulusId {
        &self.id
    }

    fn update(&mut self, dt: f32) {
        let joint = self.joint.borrow();
        self.velocity = joint.velocity();
        if self.accumulating {
            self.accumulated += self.velocity * dt;
            self.position = self.accumulated;
        } else {
            self.position = joint.position();
        }
    }

    fn position_value(&self) -> Value {
        Value::Number(self.position)
    }

    fn velocity_value(&self) -> Option<Value> {
        Some(Value::Number(self.velocity))
    }

    fn supplier_value(&self) -> Value {
        Value::Pair(self.position, self.velocity)
    }

    fn supplier_type(&self) -> ValueType {
        ValueType::Pair
    }

    fn set_accumulate(&mut self, on: bool) {
        if !self.accumulate_supported {
            debug!(stimulus = %self.id, "accumulation not supported; ignoring");
            return;
        }
        if on && !self.accumulating {
            self.accumulated = 0.0;
        }
        self.accumulating = on;
    }

    fn is_accumulating(&self) -> bool {
        self.accumulating
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Chassis stimulus
// ────────────────────────────────────────────────────────────────────────────

/// World position and linear velocity of a mechanism's root body.
pub struct ChassisStimulus {
    id: StimulusId,
    body: SharedBody,
    position: Vec3,
    velocity: Vec3,
}

impl ChassisStimulus {
    pub fn new(id: StimulusId, body: SharedBody) -> Self {
        let position = body.borrow().position();
        Self {
            id,
            body,
            position,
            velocity: Vec3::ZERO,
        }
    }

    pub fn linear_velocity(&self) -> Vec3 {
        self.velocity
    }
}

impl Stimulus for ChassisStimulus {
    fn id(&self) -> &StimulusId {
        &self.id
    }

    fn update(&mut self, _dt: f32) {
        let body = self.body.borrow();
        self.position = body.position();
        self.velocity = body.linear_velocity();
    }

    fn position_value(&self) -> Value {
        self.position.into()
    }

    fn velocity_value(&self) -> Option<Value> {
        Some(self.velocity.into())
    }

    fn supplier_value(&self) -> Value {
        self.position.into()
    }

    fn supplier_type(&self) -> ValueType {
        ValueType::Triple
    }
}
