//! HALSim WebSocket frame format.
//!
//! Every frame is a JSON object of the form
//!
//! ```json
//! {"type": "PWM", "device": "3", "data": {"<speed": 0.4}}
//! ```
//!
//! Keys prefixed with `<` flow from the robot program to the simulator,
//! keys prefixed with `>` flow back.  Only the motor outputs the simulator
//! can act on are decoded; everything else parses but yields no port update.
//!
//! | Frame type | Inbound key | Port |
//! |---|---|---|
//! | `PWM` | `<speed` | [`PortKind::Pwm`] |
//! | `CANMotor` | `<dutyCycle` | [`PortKind::Can`] |
//! | `CANEncoder` | – (outbound `>position`, `>velocity`) | – |

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use synthsim_types::SimError;

pub const PWM_TYPE: &str = "PWM";
pub const CAN_MOTOR_TYPE: &str = "CANMotor";
pub const CAN_ENCODER_TYPE: &str = "CANEncoder";

/// Address space of a motor output port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Pwm,
    Can,
}

/// One motor output port of the robot program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortKey {
    pub kind: PortKind,
    pub device: u32,
}

impl PortKey {
    pub fn pwm(device: u32) -> Self {
        Self {
            kind: PortKind::Pwm,
            device,
        }
    }

    pub fn can(device: u32) -> Self {
        Self {
            kind: PortKind::Can,
            device,
        }
    }
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PortKind::Pwm => write!(f, "pwm:{}", self.device),
            PortKind::Can => write!(f, "can:{}", self.device),
        }
    }
}

/// A single HALSim frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub device: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl HalFrame {
    /// Parse one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Serialization`] when `text` is not a frame object.
    pub fn parse(text: &str) -> Result<Self, SimError> {
        serde_json::from_str(text).map_err(|e| SimError::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        serde_json::to_string(self).map_err(|e| SimError::Serialization(e.to_string()))
    }

    /// Outbound encoder reading for CAN device `device`.
    pub fn encoder(device: u32, position: f32, velocity: f32) -> Self {
        let mut data = Map::new();
        data.insert(">position".into(), Value::from(position));
        data.insert(">velocity".into(), Value::from(velocity));
        Self {
            frame_type: CAN_ENCODER_TYPE.into(),
            device: device.to_string(),
            data,
        }
    }

    /// Motor output carried by this frame, if any.
    pub fn port_update(&self) -> Option<(PortKey, f32)> {
        let (kind, field) = match self.frame_type.as_str() {
            PWM_TYPE => (PortKind::Pwm, "<speed"),
            CAN_MOTOR_TYPE => (PortKind::Can, "<dutyCycle"),
            _ => return None,
        };
        let device = self.device.trim().parse::<u32>().ok()?;
        let value = self.data.get(field)?.as_f64()?;
        Some((PortKey { kind, device }, value as f32))
    }
}
