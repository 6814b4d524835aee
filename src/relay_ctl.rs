use log::debug;
use log::info;
use log::warn;

use crate::error::RelayError;
use crate::ftdi::BitBangDevice;
use crate::ftdi::Driver;
use crate::ftdi::DriverError;
use crate::ftdi::ALL_OUTPUTS;
use crate::ftdi::BITBANG_BAUD_RATE;
use crate::relay_engine::RelayPort;

/// An open connection to one relay board.
///
/// The handle is closed on [`RelayControl::close`] or when the value is dropped,
/// whichever comes first. Reads and writes after close fail with
/// [`RelayError::NotConnected`].
pub struct RelayControl {
    device: Option<Box<dyn BitBangDevice>>,
    serial: String,
}

impl RelayControl {
    pub fn open(driver: &dyn Driver, serial: &str) -> Result<RelayControl, RelayError> {
        info!("Attempting to connect to device: {}", serial);

        let mut device = driver.open(serial).map_err(|e| {
            warn!("Failed to connect: {}", e);
            match e {
                DriverError::DeviceNotFound => RelayError::DeviceNotFound(serial.to_string()),
                DriverError::DeviceInUse => RelayError::DeviceInUse,
                DriverError::PermissionDenied(reason) => RelayError::PermissionDenied(reason),
                DriverError::Status(reason) => RelayError::ConnectionFailed(reason),
            }
        })?;

        // Wrap first so the handle is released if configuring it fails.
        let mut ctl = RelayControl {
            device: None,
            serial: serial.to_string(),
        };

        debug!("Setting baud rate to {}", BITBANG_BAUD_RATE);
        let configured = device
            .set_baud_rate(BITBANG_BAUD_RATE)
            .and_then(|_| {
                debug!("Setting bit bang mode");
                device.set_async_bitbang(ALL_OUTPUTS)
            });
        ctl.device = Some(device);
        if let Err(e) = configured {
            warn!("Failed to configure device: {}", e);
            return Err(RelayError::ConnectionFailed(e.to_string()));
        }

        info!("Device connected successfully");
        Ok(ctl)
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Releases the handle. Errors are logged, calling it twice is harmless.
    pub fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            match device.close() {
                Ok(()) => info!("Device disconnected"),
                Err(e) => warn!("Error during disconnect: {}", e),
            }
        }
    }

    fn device(&mut self) -> Result<&mut Box<dyn BitBangDevice>, RelayError> {
        self.device.as_mut().ok_or(RelayError::NotConnected)
    }
}

impl RelayPort for RelayControl {
    fn read_state(&mut self) -> Result<u8, RelayError> {
        let state = self.device()?.read_pins().map_err(|e| {
            warn!("Failed to read relay state: {}", e);
            RelayError::DeviceDisconnected
        })?;
        debug!("Read relay state: 0x{:02X}", state);
        Ok(state)
    }

    fn write_state(&mut self, state: u8) -> Result<(), RelayError> {
        debug!("Writing relay state: 0x{:02X}", state);
        let written = self.device()?.write(&[state]).map_err(|e| {
            warn!("Failed to write relay state: {}", e);
            match e {
                DriverError::DeviceNotFound => RelayError::DeviceDisconnected,
                other => RelayError::CommandFailed(other.to_string()),
            }
        })?;
        if written != 1 {
            warn!("Device accepted {} of 1 bytes", written);
            return Err(RelayError::CommandFailed(String::from(
                "device did not accept the state byte",
            )));
        }
        info!("Relay state set successfully");
        Ok(())
    }
}

impl Drop for RelayControl {
    fn drop(&mut self) {
        self.close();
    }
}
