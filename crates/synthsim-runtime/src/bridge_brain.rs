//! Remote control by a robot program over the HALSim bridge.
//!
//! The robot program writes motor outputs to numbered PWM / CAN ports.  A
//! [`PortGroup`] maps a set of ports onto a set of drivers: each tick the
//! average of the group's known port values is written to every driver in
//! the group.  [`EncoderBinding`]s send sensor readings back the other way.

use serde::{Deserialize, Serialize};
use synthsim_middleware::{BridgeStatus, HalBridge, HalFrame, PortKey, PortStates, StatusEvent};
use synthsim_types::SimError;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::brain::{Brain, BrainIo, BrainState, MechanismView};
use crate::context::SimContext;

/// Ports whose averaged value drives a set of drivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortGroup {
    pub ports: Vec<PortKey>,
    /// Driver identity keys.
    pub drivers: Vec<String>,
}

/// Publishes one stimulus as a `CANEncoder` device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderBinding {
    /// Stimulus identity key.
    pub stimulus: String,
    pub device: u32,
}

pub struct BridgeBrain {
    state: BrainState,
    bridge: HalBridge,
    ports: PortStates,
    status: broadcast::Receiver<StatusEvent>,
    last_status: Option<BridgeStatus>,
    groups: Vec<PortGroup>,
    encoders: Vec<EncoderBinding>,
}

impl BridgeBrain {
    /// Wrap a (usually already started) bridge.  The brain takes ownership
    /// and shuts the bridge down when disabled.
    pub fn new(bridge: HalBridge) -> Self {
        let ports = bridge.ports();
        let status = bridge.subscribe_status();
        Self {
            state: BrainState::Unconfigured,
            bridge,
            ports,
            status,
            last_status: None,
            groups: Vec::new(),
            encoders: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: PortGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_encoder(mut self, binding: EncoderBinding) -> Self {
        self.encoders.push(binding);
        self
    }

    /// Most recent connection status seen by [`Brain::update`].
    pub fn last_status(&self) -> Option<&BridgeStatus> {
        self.last_status.as_ref()
    }

    pub fn ports(&self) -> &PortStates {
        &self.ports
    }

    fn validate(&self, view: &MechanismView<'_>) -> Result<(), SimError> {
        let mut claimed: Vec<&str> = Vec::new();
        for group in &self.groups {
            for key in &group.drivers {
                if !view.drivers.contains(key) {
                    return Err(SimError::UnknownDriver(key.clone()));
                }
                if claimed.contains(&key.as_str()) {
                    return Err(SimError::DriverAlreadyClaimed(key.clone()));
                }
                claimed.push(key);
            }
        }
        for binding in &self.encoders {
            if !view.stimuli.contains(&binding.stimulus) {
                return Err(SimError::UnknownStimulus(binding.stimulus.clone()));
            }
        }
        Ok(())
    }

    fn drain_status(&mut self) {
        loop {
            match self.status.try_recv() {
                Ok(event) => {
                    match &event.status {
                        BridgeStatus::Open => info!(at = %event.at, "bridge open"),
                        BridgeStatus::Error(msg) => {
                            warn!(at = %event.at, error = %msg, "bridge error")
                        }
                        BridgeStatus::Closed => info!(at = %event.at, "bridge closed"),
                    }
                    self.last_status = Some(event.status);
                }
                Err(TryRecvError::Lagged(n)) => debug!(skipped = n, "bridge status lagged"),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }
}

impl Brain for BridgeBrain {
    fn name(&self) -> &str {
        "bridge"
    }

    fn state(&self) -> BrainState {
        self.state
    }

    fn configure(
        &mut self,
        view: MechanismView<'_>,
        _ctx: &mut SimContext,
    ) -> Result<(), SimError> {
        match self.state {
            BrainState::Configured => return Ok(()),
            BrainState::Disabled => {
                return Err(SimError::Config("bridge brain was disabled".to_string()));
            }
            BrainState::Unconfigured => {}
        }
        self.validate(&view)?;
        self.state = BrainState::Configured;
        info!(
            mechanism = %view.mechanism.id,
            groups = self.groups.len(),
            encoders = self.encoders.len(),
            url = %self.bridge.config().url,
            "bridge brain configured"
        );
        Ok(())
    }

    fn update(&mut self, io: BrainIo<'_>) {
        if self.state != BrainState::Configured {
            return;
        }
        self.drain_status();

        for group in &self.groups {
            let Some(value) = self.ports.average(&group.ports) else {
                continue;
            };
            for key in &group.drivers {
                if let Some(driver) = io.drivers.get_mut(key) {
                    driver.set_command(value);
                }
            }
        }

        for binding in &self.encoders {
            let Some(stimulus) = io.stimuli.get(&binding.stimulus) else {
                continue;
            };
            let position = stimulus.position_value().as_number().unwrap_or(0.0);
            let velocity = stimulus
                .velocity_value()
                .and_then(|v| v.as_number())
                .unwrap_or(0.0);
            let frame = HalFrame::encoder(binding.device, position, velocity);
            if let Err(e) = self.bridge.send(&frame) {
                debug!(device = binding.device, error = %e, "encoder frame dropped");
            }
        }
    }

    fn disable(&mut self, _ctx: &mut SimContext) {
        if self.state == BrainState::Disabled {
            return;
        }
        self.bridge.shutdown();
        self.ports.clear();
        self.groups.clear();
        self.encoders.clear();
        self.state = BrainState::Disabled;
        info!("bridge brain disabled");
    }

    fn claimed_drivers(&self) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|g| g.drivers.iter().cloned())
            .collect()
    }
}
