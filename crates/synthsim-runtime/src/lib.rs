//! `synthsim-runtime` – who drives the mechanism, and how.
//!
//! Sits on top of `synthsim-hal`'s drivers and stimuli and decides, every
//! tick, which commands the actuators receive.
//!
//! # Modules
//!
//! - [`brain`] – [`Brain`][brain::Brain]: the per-mechanism control strategy
//!   and its `Unconfigured → Configured → Disabled` lifecycle.
//! - [`input_brain`] – [`InputBrain`][input_brain::InputBrain]: local control
//!   from an input scheme (gamepad, keyboard).
//! - [`bridge_brain`] – [`BridgeBrain`][bridge_brain::BridgeBrain]: remote
//!   control by a robot program over the HALSim bridge.
//! - [`behavior`] – drivetrain, sequenceable-joint and gamepiece policies the
//!   input brain composes.
//! - [`edge`] – [`EdgeTrigger`][edge::EdgeTrigger]: one-shot button presses.
//! - [`input`] – the input collaborator trait and named input schemes.
//! - [`context`] – [`SimContext`][context::SimContext]: session state shared
//!   by all brains (schemes, bindings, preferences).
//! - [`layer`] – [`SimulationLayer`][layer::SimulationLayer]: one mechanism's
//!   drivers, stimuli, routes and brain.
//! - [`system`] – [`SimulationSystem`][system::SimulationSystem]: the registry
//!   of layers ticked by the host.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: `tracing`
//!   subscriber with an optional OTLP span exporter.

pub mod behavior;
pub mod brain;
pub mod bridge_brain;
pub mod context;
pub mod edge;
pub mod input;
pub mod input_brain;
pub mod layer;
pub mod system;
pub mod telemetry;

pub use behavior::{Behavior, BehaviorContext, DrivetrainBehavior, GamepieceBehavior, JointBehavior};
pub use brain::{Brain, BrainIo, BrainState, MechanismView};
pub use bridge_brain::{BridgeBrain, EncoderBinding, PortGroup};
pub use context::SimContext;
pub use edge::EdgeTrigger;
pub use input::{Controls, InputScheme, InputSource, InputState};
pub use input_brain::InputBrain;
pub use layer::SimulationLayer;
pub use system::SimulationSystem;
pub use telemetry::{TracerProviderGuard, init_tracing};
