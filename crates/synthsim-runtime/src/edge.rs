//! Rising-edge detection for buttons.

/// Fires once when a button goes from released to pressed.
///
/// Only the previous tick is remembered, so a press and release that both
/// happen between two polls are never seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EdgeTrigger {
    #[default]
    Idle,
    Held,
}

impl EdgeTrigger {
    pub fn new() -> Self {
        Self::Idle
    }

    /// Feed this tick's button state.  Returns `true` on the first tick of a
    /// press only.
    pub fn poll(&mut self, pressed: bool) -> bool {
        let fired = pressed && *self == EdgeTrigger::Idle;
        *self = if pressed {
            EdgeTrigger::Held
        } else {
            EdgeTrigger::Idle
        };
        fired
    }

    pub fn reset(&mut self) {
        *self = EdgeTrigger::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_press_and_hold() {
        let mut trigger = EdgeTrigger::new();
        let fired: Vec<bool> = [false, true, true, true, false, true, false]
            .into_iter()
            .map(|p| trigger.poll(p))
            .collect();
        assert_eq!(fired, vec![false, true, false, false, false, true, false]);
    }

    #[test]
    fn reset_rearms() {
        let mut trigger = EdgeTrigger::new();
        assert!(trigger.poll(true));
        trigger.reset();
        assert!(trigger.poll(true));
    }
}
