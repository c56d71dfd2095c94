//! Session preferences that reach into the control layer.
//!
//! The subsystem-gravity toggle is broadcast through a
//! [`tokio::sync::watch`] channel.  Every actuator holds its own
//! [`GravitySubscription`]; dropping the actuator drops the receiver, so no
//! listener outlives the thing it updates.

use std::collections::HashMap;

use synthsim_types::SequentialJoint;
use tokio::sync::watch;

/// Preferences owned by one simulation session.
#[derive(Debug)]
pub struct Preferences {
    gravity: watch::Sender<bool>,
    sequential: HashMap<String, Vec<SequentialJoint>>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Preferences {
    pub fn new(subsystem_gravity: bool) -> Self {
        let (gravity, _) = watch::channel(subsystem_gravity);
        Self {
            gravity,
            sequential: HashMap::new(),
        }
    }

    /// Whether the reduced "subsystem gravity" force ceilings are active.
    pub fn subsystem_gravity(&self) -> bool {
        *self.gravity.borrow()
    }

    /// Flip the gravity toggle.  Returns `true` when the value changed.
    ///
    /// Subscribers only observe actual changes; re-sending the current value
    /// is a no-op.
    pub fn set_subsystem_gravity(&self, enabled: bool) -> bool {
        self.gravity.send_if_modified(|current| {
            if *current == enabled {
                false
            } else {
                *current = enabled;
                true
            }
        })
    }

    /// Open a new subscription to the gravity toggle.
    pub fn subscribe_gravity(&self) -> GravitySubscription {
        GravitySubscription {
            rx: self.gravity.subscribe(),
        }
    }

    /// Number of live gravity subscriptions.
    pub fn gravity_subscribers(&self) -> usize {
        self.gravity.receiver_count()
    }

    /// Replace the sequential joint configuration for `robot`.
    pub fn set_sequential(&mut self, robot: impl Into<String>, joints: Vec<SequentialJoint>) {
        self.sequential.insert(robot.into(), joints);
    }

    /// Sequential joint configuration for `robot` (empty when none is set).
    pub fn sequential(&self, robot: &str) -> &[SequentialJoint] {
        self.sequential.get(robot).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// An actuator's handle on the gravity toggle.
#[derive(Debug, Clone)]
pub struct GravitySubscription {
    rx: watch::Receiver<bool>,
}

impl GravitySubscription {
    /// Latest published value.
    pub fn current(&self) -> bool {
        *self.rx.borrow()
    }

    /// Return the new value if the toggle changed since the last poll.
    pub fn poll_change(&mut self) -> Option<bool> {
        match self.rx.has_changed() {
            Ok(true) => Some(*self.rx.borrow_and_update()),
            _ => None,
        }
    }
}
