use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::path::Path;

use inquire::InquireError;
use inquire::Select;
use log::info;
use log::warn;

use crate::error::RelayError;
use crate::ftdi::Driver;
use crate::panel::RelayPanel;
use crate::relay_types::RelayId;
use crate::relay_types::RelayState;
use crate::relay_types::ALL_RELAYS;
use crate::settings::Settings;

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Refresh,
    SelectDevice(usize, String),
    Connect,
    Disconnect,
    On(RelayId),
    Off(RelayId),
    Toggle(RelayId),
    Pulse(RelayId),
    AllOn,
    AllOff,
    Quit,
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Action::Refresh => write!(f, "Refresh devices"),
            Action::SelectDevice(index, label) => write!(f, "Select [{}] {}", index, label),
            Action::Connect => write!(f, "Connect"),
            Action::Disconnect => write!(f, "Disconnect"),
            Action::On(relay) => write!(f, "Relay {} ON", relay),
            Action::Off(relay) => write!(f, "Relay {} OFF", relay),
            Action::Toggle(relay) => write!(f, "Relay {} TOGGLE", relay),
            Action::Pulse(relay) => write!(f, "Relay {} PULSE", relay),
            Action::AllOn => write!(f, "All ON"),
            Action::AllOff => write!(f, "All OFF"),
            Action::Quit => write!(f, "Quit"),
        }
    }
}

/// Menu entries offered in the panel's current state.
pub fn actions(panel: &RelayPanel) -> Vec<Action> {
    let mut actions = Vec::new();
    if panel.is_connected() {
        for relay in ALL_RELAYS {
            actions.push(Action::On(relay));
            actions.push(Action::Off(relay));
            actions.push(Action::Toggle(relay));
            actions.push(Action::Pulse(relay));
        }
        actions.push(Action::AllOn);
        actions.push(Action::AllOff);
        actions.push(Action::Disconnect);
    } else {
        if panel.selected_device().is_some() {
            actions.push(Action::Connect);
        }
        let selected = panel.selected_device().map(|d| d.index);
        for device in panel.devices() {
            if Some(device.index) != selected {
                actions.push(Action::SelectDevice(device.index, device.label()));
            }
        }
        actions.push(Action::Refresh);
    }
    actions.push(Action::Quit);
    actions
}

pub fn status_line(panel: &RelayPanel) -> String {
    let device = panel
        .selected_device()
        .map(|d| d.label())
        .unwrap_or_else(|| String::from("No devices found"));

    if !panel.is_connected() {
        return format!("○ Disconnected | {}", device);
    }
    let leds: Vec<String> = panel
        .relay_states()
        .iter()
        .map(|(relay, state)| match state {
            RelayState::On => format!("{} ●", relay),
            RelayState::Off => format!("{} ○", relay),
        })
        .collect();
    format!("● Connected | {} | {}", device, leds.join("  "))
}

/// Applies one menu action. Returns `false` once the user quits.
pub fn handle(
    panel: &mut RelayPanel,
    action: Action,
    settings: &mut Settings,
    settings_path: &Path,
) -> Result<bool, RelayError> {
    match action {
        Action::Refresh => panel.refresh_devices(settings.connection.last_device.as_deref())?,
        Action::SelectDevice(index, _) => panel.select(index),
        Action::Connect => {
            let serial = panel.connect()?;
            settings.connection.last_device = Some(serial);
            settings.save_or_warn(settings_path);
        }
        Action::Disconnect => panel.disconnect(),
        Action::On(relay) => panel.relay_on(relay)?,
        Action::Off(relay) => panel.relay_off(relay)?,
        Action::Toggle(relay) => panel.relay_toggle(relay)?,
        Action::Pulse(relay) => panel.relay_pulse(relay, settings.default_duration())?,
        Action::AllOn => panel.all_on()?,
        Action::AllOff => panel.all_off()?,
        Action::Quit => return Ok(false),
    }
    Ok(true)
}

/// Connects at startup when enabled, but only to the last used device.
/// Returns whether a connection was made.
pub fn auto_connect(
    panel: &mut RelayPanel,
    settings: &mut Settings,
    settings_path: &Path,
) -> Result<bool, RelayError> {
    if !settings.connection.auto_connect_startup {
        return Ok(false);
    }
    let last = match settings.connection.last_device.clone() {
        Some(last) => last,
        None => return Ok(false),
    };
    if panel.selected_device().map(|d| d.serial.as_str()) != Some(last.as_str()) {
        warn!("Last device {} not found, staying disconnected", last);
        return Ok(false);
    }
    handle(panel, Action::Connect, settings, settings_path)?;
    Ok(true)
}

/// Interactive panel on the terminal. Settings are saved on the way out.
pub fn run(
    driver: &dyn Driver,
    settings: &mut Settings,
    settings_path: &Path,
) -> Result<(), RelayError> {
    info!("=== Interactive Mode Started ===");
    let mut panel = RelayPanel::new(driver);

    if let Err(e) = panel.refresh_devices(settings.connection.last_device.as_deref()) {
        eprintln!("Error: {}", e);
    }
    if let Err(e) = auto_connect(&mut panel, settings, settings_path) {
        eprintln!("Failed to connect:\n{}", e);
    }

    loop {
        println!();
        println!("{}", status_line(&panel));
        if let Some(command) = panel.last_command() {
            println!("CLI: {}", command);
        }

        let action = match Select::new("Action:", actions(&panel)).prompt() {
            Ok(action) => action,
            Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => {
                break
            }
            Err(InquireError::NotTTY) => {
                return Err(RelayError::General(String::from(
                    "interactive mode needs a terminal, run with --help for command line usage",
                )))
            }
            Err(e) => return Err(RelayError::General(e.to_string())),
        };

        match handle(&mut panel, action, settings, settings_path) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    panel.disconnect();
    settings.save_or_warn(settings_path);
    info!("=== Interactive Mode Finished ===");
    Ok(())
}
