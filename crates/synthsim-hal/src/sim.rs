//! Kinematic stand-ins for the physics engine, for CI/CD testing without a
//! real solver.
//!
//! [`SimJoint`], [`SimBody`] and [`SimGamepieceHandler`] record every command
//! they receive and integrate trivially in [`SimWorld::step`].  They exist so
//! the whole control layer can run headless; they make no attempt at
//! physical fidelity.
//!
//! # Example
//!
//! ```rust
//! use synthsim_hal::sim::{SimMechanismBuilder, SimWorld};
//!
//! let mut world = SimWorld::new();
//! let mechanism = SimMechanismBuilder::new("robot")
//!     .with_hinge("shoulder")
//!     .with_wheel(-0.3)
//!     .with_wheel(0.3)
//!     .with_chassis()
//!     .build(&mut world);
//!
//! assert_eq!(mechanism.joints.len(), 3);
//! world.step(0.02);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use synthsim_types::{JointKind, MechanismId, MechanismJoint};
use uuid::Uuid;

use crate::mechanism::{JointBinding, Mechanism};
use crate::physics::{GamepieceHandler, PhysicsBody, PhysicsJoint};

// ────────────────────────────────────────────────────────────────────────────
// Stub joint
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum MotorTarget {
    #[default]
    Velocity,
    Position,
}

/// A simulated joint whose motor reaches its target instantly.
#[derive(Debug, Clone, Default)]
pub struct SimJoint {
    position: f32,
    velocity: f32,
    target: MotorTarget,
    target_velocity: f32,
    target_position: f32,
    max_force: f32,
}

impl SimJoint {
    /// Teleport the joint (test setup only).
    pub fn set_position(&mut self, position: f32) {
        self.position = position;
    }

    pub fn target_velocity(&self) -> f32 {
        self.target_velocity
    }

    pub fn target_position(&self) -> f32 {
        self.target_position
    }

    pub fn max_force(&self) -> f32 {
        self.max_force
    }

    /// Integrate one step of `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        match self.target {
            MotorTarget::Velocity => self.position += self.velocity * dt,
            MotorTarget::Position => {
                self.velocity = (self.target_position - self.position) / dt;
                self.position = self.target_position;
            }
        }
    }
}

impl PhysicsJoint for SimJoint {
    fn position(&self) -> f32 {
        self.position
    }

    fn velocity(&self) -> f32 {
        self.velocity
    }

    fn drive_velocity(&mut self, target: f32) {
        self.target = MotorTarget::Velocity;
        self.target_velocity = target;
        self.velocity = target;
    }

    fn drive_position(&mut self, target: f32) {
        self.target = MotorTarget::Position;
        self.target_position = target;
    }

    fn set_max_force(&mut self, max_force: f32) {
        self.max_force = max_force;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub body
// ────────────────────────────────────────────────────────────────────────────

/// A simulated point-mass body.
#[derive(Debug, Clone)]
pub struct SimBody {
    mass: f32,
    position: Vec3,
    velocity: Vec3,
    total_impulse: Vec3,
}

impl SimBody {
    pub fn new(mass: f32) -> Self {
        Self {
            mass: mass.max(f32::EPSILON),
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            total_impulse: Vec3::ZERO,
        }
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    /// Sum of every impulse applied so far.
    pub fn total_impulse(&self) -> Vec3 {
        self.total_impulse
    }

    pub fn step(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }
}

impl PhysicsBody for SimBody {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn linear_velocity(&self) -> Vec3 {
        self.velocity
    }

    fn apply_impulse(&mut self, impulse: Vec3) {
        self.total_impulse += impulse;
        self.velocity += impulse / self.mass;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub gamepiece assembly
// ────────────────────────────────────────────────────────────────────────────

/// Records intake state and counts ejections.
#[derive(Debug, Clone, Default)]
pub struct SimGamepieceHandler {
    intake_active: bool,
    ejections: usize,
}

impl SimGamepieceHandler {
    pub fn intake_active(&self) -> bool {
        self.intake_active
    }

    pub fn ejections(&self) -> usize {
        self.ejections
    }
}

impl GamepieceHandler for SimGamepieceHandler {
    fn set_intake_active(&mut self, active: bool) {
        self.intake_active = active;
    }

    fn eject(&mut self) {
        self.ejections += 1;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// World
// ────────────────────────────────────────────────────────────────────────────

/// Owns every stub joint and body so they can be stepped together.
#[derive(Default)]
pub struct SimWorld {
    joints: Vec<Rc<RefCell<SimJoint>>>,
    bodies: Vec<Rc<RefCell<SimBody>>>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_joint(&mut self) -> Rc<RefCell<SimJoint>> {
        let joint = Rc::new(RefCell::new(SimJoint::default()));
        self.joints.push(joint.clone());
        joint
    }

    pub fn add_body(&mut self, mass: f32) -> Rc<RefCell<SimBody>> {
        let body = Rc::new(RefCell::new(SimBody::new(mass)));
        self.bodies.push(body.clone());
        body
    }

    /// Joint `index` in creation order.
    pub fn joint(&self, index: usize) -> Option<Rc<RefCell<SimJoint>>> {
        self.joints.get(index).cloned()
    }

    pub fn body(&self, index: usize) -> Option<Rc<RefCell<SimBody>>> {
        self.bodies.get(index).cloned()
    }

    pub fn step(&mut self, dt: f32) {
        for joint in &self.joints {
            joint.borrow_mut().step(dt);
        }
        for body in &self.bodies {
            body.borrow_mut().step(dt);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Mechanism builder
// ────────────────────────────────────────────────────────────────────────────

/// Default speed limit of builder-created hinges and sliders.
pub const DEFAULT_JOINT_MAX_VELOCITY: f32 = 6.0;
/// Default speed limit of builder-created wheels.
pub const DEFAULT_WHEEL_MAX_VELOCITY: f32 = 40.0;

/// Builder that assembles a [`Mechanism`] backed by stub joints in a
/// [`SimWorld`].
///
/// Call the `with_*` methods to add the parts you need, then
/// [`build`][Self::build] to register them in a world.
pub struct SimMechanismBuilder {
    id: MechanismId,
    name: String,
    joints: Vec<MechanismJoint>,
    chassis_mass: Option<f32>,
    assembly: bool,
    controllable: bool,
}

impl SimMechanismBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: MechanismId::new(name.clone()),
            name,
            joints: Vec::new(),
            chassis_mass: None,
            assembly: false,
            controllable: true,
        }
    }

    /// Override the mechanism id (defaults to the name).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = MechanismId::new(id);
        self
    }

    /// Add a hinge joint with a display name.
    pub fn with_hinge(mut self, name: impl Into<String>) -> Self {
        self.joints.push(
            MechanismJoint::new(JointKind::Hinge, new_guid(), DEFAULT_JOINT_MAX_VELOCITY)
                .with_name(name),
        );
        self
    }

    /// Add a slider joint with a display name.
    pub fn with_slider(mut self, name: impl Into<String>) -> Self {
        self.joints.push(
            MechanismJoint::new(JointKind::Slider, new_guid(), DEFAULT_JOINT_MAX_VELOCITY)
                .with_name(name),
        );
        self
    }

    /// Add a wheel anchored at lateral offset `x` (negative = left side).
    pub fn with_wheel(mut self, x: f32) -> Self {
        self.joints.push(
            MechanismJoint::new(JointKind::Wheel, new_guid(), DEFAULT_WHEEL_MAX_VELOCITY)
                .with_anchor(Vec3::new(x, 0.0, 0.0)),
        );
        self
    }

    /// Add an arbitrary joint descriptor.
    pub fn with_joint(mut self, joint: MechanismJoint) -> Self {
        self.joints.push(joint);
        self
    }

    /// Give the mechanism a 50 kg root body.
    pub fn with_chassis(mut self) -> Self {
        self.chassis_mass = Some(50.0);
        self
    }

    /// Give the mechanism a gamepiece assembly (intake + ejector).
    pub fn with_assembly(mut self) -> Self {
        self.assembly = true;
        self
    }

    /// Mark the mechanism as a static, non-controllable assembly.
    pub fn uncontrollable(mut self) -> Self {
        self.controllable = false;
        self
    }

    /// Register stub joints and bodies in `world` and return the mechanism.
    ///
    /// The gamepiece handler, when requested, is returned inside
    /// [`Mechanism::assembly`]; use [`build_with_handler`][Self::build_with_handler]
    /// to keep a typed handle on it.
    pub fn build(self, world: &mut SimWorld) -> Mechanism {
        self.build_with_handler(world).0
    }

    /// Like [`build`][Self::build] but also returns the typed stub handler.
    pub fn build_with_handler(
        self,
        world: &mut SimWorld,
    ) -> (Mechanism, Option<Rc<RefCell<SimGamepieceHandler>>>) {
        let mut mechanism = Mechanism::new(self.id, self.name);
        mechanism.controllable = self.controllable;
        for joint in self.joints {
            let handle = world.add_joint();
            mechanism.joints.push(JointBinding { joint, handle });
        }
        if let Some(mass) = self.chassis_mass {
            mechanism.root_body = Some(world.add_body(mass));
        }
        let handler = self
            .assembly
            .then(|| Rc::new(RefCell::new(SimGamepieceHandler::default())));
        if let Some(h) = &handler {
            mechanism.assembly = Some(h.clone());
        }
        (mechanism, handler)
    }
}

fn new_guid() -> String {
    Uuid::new_v4().to_string()
}
