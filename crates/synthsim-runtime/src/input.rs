//! Input collaborator and named input schemes.
//!
//! Behaviors never see raw device inputs.  They ask for *controls* such as
//! `"drive"`, `"turn"` or `"joint 2"`; an [`InputScheme`] maps each control to
//! a physical input name on one controller, and the host's [`InputSource`]
//! answers for that input.
//!
//! | Control | Kind | Used by |
//! |---|---|---|
//! | `drive`, `turn` | axis | arcade drivetrain |
//! | `left`, `right` | axis | tank drivetrain |
//! | `joint <n>` | axis | sequenceable joints |
//! | `intake` | axis | gamepiece |
//! | `eject`, `unstick` | button | gamepiece, input brain |

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Polled device state supplied by the host each tick.
pub trait InputSource {
    /// Axis value in `[-1, 1]`; `0.0` for unknown inputs.
    fn axis(&self, input: &str, controller: usize) -> f32;

    fn button(&self, input: &str, controller: usize) -> bool;
}

/// In-memory [`InputSource`] for scripted runs and tests.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    axes: HashMap<(usize, String), f32>,
    buttons: HashMap<(usize, String), bool>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_axis(&mut self, controller: usize, input: impl Into<String>, value: f32) {
        self.axes.insert((controller, input.into()), value);
    }

    pub fn set_button(&mut self, controller: usize, input: impl Into<String>, pressed: bool) {
        self.buttons.insert((controller, input.into()), pressed);
    }

    pub fn clear(&mut self) {
        self.axes.clear();
        self.buttons.clear();
    }
}

impl InputSource for InputState {
    fn axis(&self, input: &str, controller: usize) -> f32 {
        self.axes
            .get(&(controller, input.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    fn button(&self, input: &str, controller: usize) -> bool {
        self.buttons
            .get(&(controller, input.to_string()))
            .copied()
            .unwrap_or(false)
    }
}

/// Control name → physical input mapping for one controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputScheme {
    pub name: String,
    pub controller: usize,
    /// Arcade (`drive` + `turn`) instead of tank (`left` + `right`) drive.
    pub arcade: bool,
    pub bindings: BTreeMap<String, String>,
}

impl Default for InputScheme {
    fn default() -> Self {
        Self::gamepad("default", 0)
    }
}

impl InputScheme {
    /// Empty scheme with no bindings.
    pub fn new(name: impl Into<String>, controller: usize) -> Self {
        Self {
            name: name.into(),
            controller,
            arcade: true,
            bindings: BTreeMap::new(),
        }
    }

    /// Standard dual-stick gamepad layout.
    pub fn gamepad(name: impl Into<String>, controller: usize) -> Self {
        Self::new(name, controller)
            .with_binding("drive", "left_y")
            .with_binding("turn", "right_x")
            .with_binding("left", "left_y")
            .with_binding("right", "right_y")
            .with_binding("joint 0", "dpad_y")
            .with_binding("joint 1", "dpad_x")
            .with_binding("joint 2", "left_trigger")
            .with_binding("intake", "right_trigger")
            .with_binding("eject", "a")
            .with_binding("unstick", "y")
    }

    pub fn with_binding(mut self, control: impl Into<String>, input: impl Into<String>) -> Self {
        self.bindings.insert(control.into(), input.into());
        self
    }

    pub fn with_tank(mut self) -> Self {
        self.arcade = false;
        self
    }

    pub fn input_for(&self, control: &str) -> Option<&str> {
        self.bindings.get(control).map(String::as_str)
    }
}

/// Resolved controls handed to behaviors.
pub trait Controls {
    fn axis(&self, control: &str) -> f32;

    fn button(&self, control: &str) -> bool;

    /// Whether the drivetrain should mix `drive`/`turn`.
    fn arcade(&self) -> bool {
        true
    }
}

/// [`Controls`] backed by a scheme and an input source.
pub struct SchemeControls<'a> {
    pub scheme: &'a InputScheme,
    pub source: &'a dyn InputSource,
}

impl Controls for SchemeControls<'_> {
    fn axis(&self, control: &str) -> f32 {
        self.scheme
            .input_for(control)
            .map_or(0.0, |input| self.source.axis(input, self.scheme.controller))
    }

    fn button(&self, control: &str) -> bool {
        self.scheme
            .input_for(control)
            .is_some_and(|input| self.source.button(input, self.scheme.controller))
    }

    fn arcade(&self) -> bool {
        self.scheme.arcade
    }
}

/// Every axis at rest, every button released.
pub struct NoControls;

impl Controls for NoControls {
    fn axis(&self, _control: &str) -> f32 {
        0.0
    }

    fn button(&self, _control: &str) -> bool {
        false
    }
}
