//! Parsed mechanism as handed to the control layer.

use synthsim_types::{MechanismId, MechanismJoint};

use crate::physics::{SharedBody, SharedHandler, SharedJoint};

/// A joint descriptor together with the engine handle it describes.
#[derive(Clone)]
pub struct JointBinding {
    pub joint: MechanismJoint,
    pub handle: SharedJoint,
}

/// One robot or field assembly: its joints in parser order, the designated
/// root body, and the gamepiece assembly if one resolves.
#[derive(Clone)]
pub struct Mechanism {
    pub id: MechanismId,
    pub name: String,
    pub joints: Vec<JointBinding>,
    pub root_body: Option<SharedBody>,
    pub assembly: Option<SharedHandler>,
    /// `false` for static assemblies such as a field.
    pub controllable: bool,
}

impl Mechanism {
    pub fn new(id: MechanismId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            joints: Vec::new(),
            root_body: None,
            assembly: None,
            controllable: true,
        }
    }
}

impl std::fmt::Debug for Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mechanism")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("joints", &self.joints.len())
            .field("root_body", &self.root_body.is_some())
            .field("assembly", &self.assembly.is_some())
            .field("controllable", &self.controllable)
            .finish()
    }
}
