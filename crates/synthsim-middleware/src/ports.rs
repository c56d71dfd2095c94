//! Last-known motor outputs, shared between the bridge task and the tick.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::protocol::{HalFrame, PortKey};

/// Thread-safe map of port → last received value.  Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct PortStates {
    inner: Arc<Mutex<HashMap<PortKey, f32>>>,
}

impl PortStates {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicked writer cannot leave a half-written f32 behind, so poisoned
    // data is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<PortKey, f32>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, port: PortKey, value: f32) {
        self.lock().insert(port, value);
    }

    pub fn get(&self, port: PortKey) -> Option<f32> {
        self.lock().get(&port).copied()
    }

    /// Record the motor output carried by `frame`.  Returns `true` when the
    /// frame addressed a port.
    pub fn apply_frame(&self, frame: &HalFrame) -> bool {
        match frame.port_update() {
            Some((port, value)) => {
                self.set(port, value);
                true
            }
            None => false,
        }
    }

    /// Average of the known values in `ports`.  Ports never heard from are
    /// skipped; `None` when none of them has a value yet.
    pub fn average(&self, ports: &[PortKey]) -> Option<f32> {
        let map = self.lock();
        let known: Vec<f32> = ports.iter().filter_map(|p| map.get(p).copied()).collect();
        if known.is_empty() {
            None
        } else {
            Some(known.iter().sum::<f32>() / known.len() as f32)
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
