//! `synthsim-types` – shared vocabulary of the mechanism control layer.
//!
//! Everything here is plain data: joint descriptors handed over by the
//! mechanism parser, the structured identities used to key actuators and
//! sensors, and the crate-spanning [`SimError`].  The typed value bus lives
//! in [`value`].

pub mod value;

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use value::{Combiner, Value, ValueType};

// ────────────────────────────────────────────────────────────────────────────
// Mechanism description
// ────────────────────────────────────────────────────────────────────────────

/// Stable identifier of one mechanism (robot or field assembly) inside a
/// simulation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MechanismId(pub String);

impl MechanismId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MechanismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Physics-engine subtype of a joint, resolved once by the mechanism parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointKind {
    /// Rotational joint (arm pivot, turret).
    Hinge,
    /// Translational joint (elevator stage, linear slide).
    Slider,
    /// Wheel / vehicle constraint with continuous rotation.
    Wheel,
    /// Rigid weld with no degrees of freedom.
    Fixed,
    /// Anything the parser could not map onto a known constraint.
    Unknown,
}

/// One physics joint inside a mechanism as handed over by the parser.
///
/// Immutable for the lifetime of a simulation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanismJoint {
    pub kind: JointKind,
    /// Optional display name authored in the CAD assembly.
    #[serde(default)]
    pub name: Option<String>,
    pub guid: String,
    /// Maximum motor speed (rad/s for hinges and wheels, m/s for sliders).
    pub max_velocity: f32,
    /// Joint anchor in the mechanism's local frame.  The drivetrain uses the
    /// sign of `x` to decide which side a wheel belongs to.
    #[serde(default)]
    pub anchor: Vec3,
}

impl MechanismJoint {
    pub fn new(kind: JointKind, guid: impl Into<String>, max_velocity: f32) -> Self {
        Self {
            kind,
            name: None,
            guid: guid.into(),
            max_velocity,
            anchor: Vec3::ZERO,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_anchor(mut self, anchor: Vec3) -> Self {
        self.anchor = anchor;
        self
    }
}

/// Per-robot sequential joint preference: joint `child` follows the control
/// axis of joint `parent`, optionally inverted.  Indices count hinge and
/// slider joints in mechanism order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequentialJoint {
    pub child: usize,
    pub parent: usize,
    #[serde(default)]
    pub inverted: bool,
}

/// How an actuator interprets its command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Command is a normalized speed in `[-1, 1]` scaled by the max velocity.
    #[default]
    Velocity,
    /// Command is an absolute target position.
    Position,
}

// ────────────────────────────────────────────────────────────────────────────
// Identities
// ────────────────────────────────────────────────────────────────────────────

/// Implemented by the closed kind enums used inside an [`Identity`].
pub trait IdentityKind: Copy + fmt::Debug + Eq + std::hash::Hash + Ord {
    fn as_str(&self) -> &'static str;
}

/// Actuator flavours produced by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    Hinge,
    Slider,
    Wheel,
    Intake,
    Ejector,
}

impl IdentityKind for DriverKind {
    fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Hinge => "hinge",
            DriverKind::Slider => "slider",
            DriverKind::Wheel => "wheel",
            DriverKind::Intake => "intake",
            DriverKind::Ejector => "ejector",
        }
    }
}

/// Sensor flavours produced by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusKind {
    Hinge,
    Slider,
    Wheel,
    Chassis,
}

impl IdentityKind for StimulusKind {
    fn as_str(&self) -> &'static str {
        match self {
            StimulusKind::Hinge => "hinge",
            StimulusKind::Slider => "slider",
            StimulusKind::Wheel => "wheel",
            StimulusKind::Chassis => "chassis",
        }
    }
}

/// Structured identity of an actuator or sensor.
///
/// Derived deterministically from the joint subtype and GUID, so two
/// classification runs over the same joint list produce equal identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity<K> {
    pub kind: K,
    pub name: Option<String>,
    pub guid: String,
}

pub type DriverId = Identity<DriverKind>;
pub type StimulusId = Identity<StimulusKind>;

impl<K: IdentityKind> Identity<K> {
    pub fn new(kind: K, name: Option<String>, guid: impl Into<String>) -> Self {
        Self {
            kind,
            name,
            guid: guid.into(),
        }
    }

    /// Canonical serialized form used as a map key.
    ///
    /// Keys are emitted in sorted order (`guid`, `kind`, `name`), so equal
    /// identities always yield byte-identical strings.
    pub fn key(&self) -> String {
        serde_json::json!({
            "kind": self.kind.as_str(),
            "name": self.name,
            "guid": self.guid,
        })
        .to_string()
    }

    /// Human-readable label: the authored name if present, otherwise
    /// `"<kind> <guid>"`.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{} {}", self.kind.as_str(), self.guid),
        }
    }
}

impl<K: IdentityKind> fmt::Display for Identity<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.guid)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Error type shared by every synthsim crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Unknown mechanism: {0}")]
    UnknownMechanism(String),

    #[error("Unknown driver: {0}")]
    UnknownDriver(String),

    #[error("Unknown stimulus: {0}")]
    UnknownStimulus(String),

    #[error("Driver {0} is already controlled by another behavior")]
    DriverAlreadyClaimed(String),

    #[error("Type mismatch: producer {producer} cannot feed consumer {consumer}")]
    TypeMismatch {
        producer: ValueType,
        consumer: ValueType,
    },

    #[error("Consumer type {0} has no fan-in combiner; only one producer may feed it")]
    NoCombiner(ValueType),

    #[error("Value type {0} is not a tuple and cannot be decomposed")]
    NotATuple(ValueType),

    #[error("Component {index} is out of range for {value_type}")]
    ComponentOutOfRange { index: usize, value_type: ValueType },

    #[error("Bridge error: {0}")]
    Bridge(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
