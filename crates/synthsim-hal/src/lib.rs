//! `synthsim-hal` – the mechanism's motor and sensor surface.
//!
//! Wraps the physics engine's joints and bodies in two small traits the rest
//! of the simulator talks to:
//!
//! - [`driver`] – [`Driver`][driver::Driver]: a writable actuator that pushes
//!   a normalized command into one joint motor per tick.
//! - [`stimulus`] – [`Stimulus`][stimulus::Stimulus]: a read-only sensor that
//!   samples a joint or body once per tick.
//! - [`classify`] – turns a parsed [`Mechanism`][mechanism::Mechanism] into
//!   its drivers and stimuli.
//! - [`routing`] – user-configured sensor → actuator wiring over the typed
//!   value bus.
//! - [`preferences`] – the subsystem-gravity toggle and per-robot
//!   sequential joint settings.
//! - [`sim`] – kinematic stand-ins for the physics engine so the control
//!   layer runs headless in tests and CI.

pub mod catalog;
pub mod classify;
pub mod driver;
pub mod mechanism;
pub mod physics;
pub mod preferences;
pub mod routing;
pub mod sim;
pub mod stimulus;

pub use catalog::{Catalog, DriverSet, StimulusSet};
pub use classify::{Classification, classify};
pub use driver::{Driver, DriverTuning, MotorDriver, MotorLimits};
pub use mechanism::{JointBinding, Mechanism};
pub use physics::{GamepieceHandler, PhysicsBody, PhysicsJoint};
pub use preferences::{GravitySubscription, Preferences};
pub use routing::{Route, RouteTable};
pub use stimulus::Stimulus;
