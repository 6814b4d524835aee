use inquire::InquireError;
use inquire::Select;
use log::debug;
use log::info;

use crate::error::RelayError;
use crate::ftdi::DeviceInfo;
use crate::ftdi::Driver;
use crate::ftdi::DriverError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Serial(String),
    Index(i64),
    Any,
}

/// Enumerates devices, treating an empty list as [`RelayError::NoDevicesFound`].
pub fn list_devices(driver: &dyn Driver) -> Result<Vec<DeviceInfo>, RelayError> {
    let devices = driver.list_devices().map_err(|e| match e {
        DriverError::PermissionDenied(reason) => RelayError::PermissionDenied(reason),
        other => RelayError::Driver(other),
    })?;
    if devices.is_empty() {
        return Err(RelayError::NoDevicesFound);
    }
    info!("Found {} FTDI device(s)", devices.len());
    Ok(devices)
}

/// Picks the device to connect to.
///
/// A serial or index selects directly. Otherwise a single device is taken as
/// is and several are offered to `prompt`, which returns `None` when the user
/// backs out. `hint` is the serial to pre-select in that prompt.
pub fn select_device<'a, F>(
    devices: &'a [DeviceInfo],
    selection: &Selection,
    hint: Option<&str>,
    prompt: F,
) -> Result<Option<&'a DeviceInfo>, RelayError>
where
    F: FnOnce(&[DeviceInfo], usize) -> Option<usize>,
{
    match selection {
        Selection::Serial(serial) => match devices.iter().find(|d| &d.serial == serial) {
            Some(device) => Ok(Some(device)),
            None => Err(RelayError::DeviceNotFound(serial.clone())),
        },
        Selection::Index(index) => {
            let device = usize::try_from(*index).ok().and_then(|i| devices.get(i));
            match device {
                Some(device) => Ok(Some(device)),
                None => Err(RelayError::DeviceIndexOutOfRange {
                    index: *index,
                    max: devices.len().saturating_sub(1),
                }),
            }
        }
        Selection::Any if devices.len() == 1 => Ok(devices.first()),
        Selection::Any => {
            let start = hint
                .and_then(|serial| devices.iter().position(|d| d.serial == serial))
                .unwrap_or(0);
            Ok(prompt(devices, start).and_then(|i| devices.get(i)))
        }
    }
}

/// Interactive prompt on the terminal.
///
/// Returns `None` on escape, Ctrl-C, or when stdin is not a terminal.
pub fn prompt_for_device(devices: &[DeviceInfo], start: usize) -> Option<usize> {
    let labels: Vec<String> = devices
        .iter()
        .map(|d| format!("[{}] {}", d.index, d.label()))
        .collect();

    match Select::new("Multiple FTDI devices found, select device:", labels.clone())
        .with_starting_cursor(start)
        .with_help_message("Esc to exit without connecting")
        .prompt()
    {
        Ok(choice) => labels.iter().position(|l| *l == choice),
        Err(InquireError::NotTTY) => {
            eprintln!("Error: No input available (running in non-interactive mode?)");
            eprintln!("Use --device-index or --device-serial when running in scripts");
            None
        }
        Err(e) => {
            debug!("Device selection ended: {}", e);
            None
        }
    }
}
