//! State behind the interactive front-end.
//!
//! The panel owns the device list, the optional open board and the last known
//! relay byte. Every relay action goes through [`relay_engine::execute`], and
//! losing the device mid-action drops the panel back to disconnected.

use std::time::Duration;

use log::info;
use log::warn;

use crate::cli::PROGRAM;
use crate::device_select::list_devices;
use crate::error::RelayError;
use crate::ftdi::DeviceInfo;
use crate::ftdi::Driver;
use crate::relay_ctl::RelayControl;
use crate::relay_engine;
use crate::relay_engine::Intent;
use crate::relay_engine::RelayPort;
use crate::relay_types::RelayId;
use crate::relay_types::RelaySet;
use crate::relay_types::RelayState;
use crate::relay_types::ALL_RELAYS;

pub struct RelayPanel<'a> {
    driver: &'a dyn Driver,
    devices: Vec<DeviceInfo>,
    selected: Option<usize>,
    board: Option<RelayControl>,
    state: u8,
    last_command: Option<String>,
}

impl<'a> RelayPanel<'a> {
    pub fn new(driver: &'a dyn Driver) -> RelayPanel<'a> {
        RelayPanel {
            driver,
            devices: Vec::new(),
            selected: None,
            board: None,
            state: 0,
            last_command: None,
        }
    }

    /// Re-enumerates devices and selects `hint` if present, the first device otherwise.
    pub fn refresh_devices(&mut self, hint: Option<&str>) -> Result<(), RelayError> {
        if self.is_connected() {
            return Err(RelayError::General(String::from(
                "Please disconnect before refreshing devices.",
            )));
        }
        self.devices.clear();
        self.selected = None;

        self.devices = list_devices(self.driver)?;
        let hinted = hint.and_then(|serial| self.devices.iter().position(|d| d.serial == serial));
        self.selected = Some(hinted.unwrap_or(0));
        Ok(())
    }

    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    pub fn select(&mut self, index: usize) {
        if index < self.devices.len() && !self.is_connected() {
            self.selected = Some(index);
        }
    }

    pub fn selected_device(&self) -> Option<&DeviceInfo> {
        self.selected.and_then(|i| self.devices.get(i))
    }

    pub fn is_connected(&self) -> bool {
        self.board.is_some()
    }

    /// Opens the selected device and reads its relay byte. Returns the serial connected to.
    pub fn connect(&mut self) -> Result<String, RelayError> {
        let serial = match self.selected_device() {
            Some(device) => device.serial.clone(),
            None => return Err(RelayError::NoDevicesFound),
        };
        if self.is_connected() {
            return Ok(serial);
        }

        let mut board = RelayControl::open(self.driver, &serial)?;
        self.state = board.read_state()?;
        self.board = Some(board);
        self.last_command = None;
        info!("Panel connected to {}", serial);
        Ok(serial)
    }

    pub fn disconnect(&mut self) {
        if let Some(mut board) = self.board.take() {
            board.close();
        }
        self.last_command = None;
    }

    pub fn state(&self) -> u8 {
        self.state
    }

    pub fn relay_states(&self) -> [(RelayId, RelayState); 4] {
        ALL_RELAYS.map(|relay| (relay, RelayState::of(relay, self.state)))
    }

    /// Command line that reproduces the last successful action.
    pub fn last_command(&self) -> Option<&str> {
        self.last_command.as_deref()
    }

    pub fn relay_on(&mut self, relay: RelayId) -> Result<(), RelayError> {
        self.run(Intent::TurnOn(single(relay)))
    }

    pub fn relay_off(&mut self, relay: RelayId) -> Result<(), RelayError> {
        self.run(Intent::TurnOff(single(relay)))
    }

    pub fn relay_toggle(&mut self, relay: RelayId) -> Result<(), RelayError> {
        self.run(Intent::Toggle(single(relay)))
    }

    pub fn relay_pulse(&mut self, relay: RelayId, duration: Duration) -> Result<(), RelayError> {
        self.run(Intent::Momentary(single(relay), duration))
    }

    pub fn all_on(&mut self) -> Result<(), RelayError> {
        self.run(Intent::SetAbsolute(RelaySet::all()))
    }

    pub fn all_off(&mut self) -> Result<(), RelayError> {
        self.run(Intent::SetAbsolute(RelaySet::empty()))
    }

    fn run(&mut self, intent: Intent) -> Result<(), RelayError> {
        let board = match self.board.as_mut() {
            Some(board) => board,
            None => return Err(RelayError::NotConnected),
        };

        match relay_engine::execute(board, &intent) {
            Ok(state) => {
                self.state = state;
                self.last_command = Some(cli_equivalent(board.serial(), &intent));
                Ok(())
            }
            Err(e) => {
                if is_device_loss(&e) {
                    warn!("Device lost, disconnecting");
                    self.disconnect();
                }
                Err(e)
            }
        }
    }
}

fn single(relay: RelayId) -> RelaySet {
    let mut set = RelaySet::empty();
    set.insert(relay);
    set
}

fn is_device_loss(e: &RelayError) -> bool {
    match e {
        RelayError::DeviceDisconnected => true,
        RelayError::PulseRestoreFailed { source, .. } => is_device_loss(source),
        _ => false,
    }
}

pub fn cli_equivalent(serial: &str, intent: &Intent) -> String {
    let command = match intent {
        Intent::SetAbsolute(relays) if relays.is_empty() => String::from("--state"),
        Intent::SetAbsolute(relays) => format!("--state {}", relays),
        Intent::TurnOn(relays) => format!("--on {}", relays),
        Intent::TurnOff(relays) => format!("--off {}", relays),
        Intent::Toggle(relays) => format!("--toggle {}", relays),
        Intent::Momentary(relays, duration) => format!(
            "--momentary {} --duration {}",
            relays,
            duration.as_secs_f64()
        ),
    };
    format!("{} --device-serial {} {}", PROGRAM, serial, command)
}
