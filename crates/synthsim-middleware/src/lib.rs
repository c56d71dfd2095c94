//! `synthsim-middleware` – the link to an external robot program.
//!
//! Carries HALSim-style JSON frames between the simulator and a robot program
//! over a WebSocket, without knowing which mechanism the values end up in.
//!
//! # Modules
//!
//! - [`protocol`] – frame layout, port addressing and encoder replies.
//! - [`ports`] – the shared, last-known value of every PWM / CAN port.
//! - [`bridge`] – [`HalBridge`], the reconnecting client task.

pub mod bridge;
pub mod ports;
pub mod protocol;

pub use bridge::{BridgeConfig, BridgeStatus, HalBridge, StatusEvent};
pub use ports::PortStates;
pub use protocol::{HalFrame, PortKey, PortKind};
