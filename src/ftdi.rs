use thiserror::Error;

/// Baud rate used to clock the bit-bang engine.
pub const BITBANG_BAUD_RATE: u32 = 9600;

/// Drive all 8 lines as outputs.
pub const ALL_OUTPUTS: u8 = 0xFF;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub index: usize,
    pub description: String,
    pub serial: String,
}

impl DeviceInfo {
    pub fn label(&self) -> String {
        format!("{} (Serial: {})", self.description, self.serial)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("device not found")]
    DeviceNotFound,

    #[error("device already opened by another process")]
    DeviceInUse,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Status(String),
}

/// An opened FTDI chip that can drive its 8 data lines in bit-bang mode.
pub trait BitBangDevice {
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), DriverError>;

    fn set_async_bitbang(&mut self, output_mask: u8) -> Result<(), DriverError>;

    /// Instantaneous value of the data lines.
    fn read_pins(&mut self) -> Result<u8, DriverError>;

    /// Number of bytes the driver accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, DriverError>;

    fn close(&mut self) -> Result<(), DriverError>;
}

pub trait Driver {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, DriverError>;

    fn open(&self, serial: &str) -> Result<Box<dyn BitBangDevice>, DriverError>;
}

#[cfg(feature = "ftd2xx")]
pub fn default_driver() -> Box<dyn Driver> {
    Box::new(d2xx::D2xxDriver)
}

#[cfg(not(feature = "ftd2xx"))]
pub fn default_driver() -> Box<dyn Driver> {
    Box::new(UnavailableDriver)
}

/// Stand-in when the crate is built without a driver backend.
#[cfg(not(feature = "ftd2xx"))]
struct UnavailableDriver;

#[cfg(not(feature = "ftd2xx"))]
impl Driver for UnavailableDriver {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, DriverError> {
        Err(unavailable())
    }

    fn open(&self, _serial: &str) -> Result<Box<dyn BitBangDevice>, DriverError> {
        Err(unavailable())
    }
}

#[cfg(not(feature = "ftd2xx"))]
fn unavailable() -> DriverError {
    DriverError::Status(String::from(
        "built without FTDI driver support (enable the 'ftd2xx' feature)",
    ))
}

#[cfg(feature = "ftd2xx")]
mod d2xx {
    use libftd2xx::BitMode;
    use libftd2xx::Ftdi;
    use libftd2xx::FtdiCommon;
    use libftd2xx::FtStatus;
    use log::debug;

    use super::BitBangDevice;
    use super::DeviceInfo;
    use super::Driver;
    use super::DriverError;

    pub struct D2xxDriver;

    impl Driver for D2xxDriver {
        fn list_devices(&self) -> Result<Vec<DeviceInfo>, DriverError> {
            let devices = libftd2xx::list_devices().map_err(status)?;
            Ok(devices
                .into_iter()
                .enumerate()
                .map(|(index, info)| DeviceInfo {
                    index,
                    description: info.description,
                    serial: info.serial_number,
                })
                .collect())
        }

        fn open(&self, serial: &str) -> Result<Box<dyn BitBangDevice>, DriverError> {
            let listed = libftd2xx::list_devices()
                .map_err(status)?
                .into_iter()
                .find(|info| info.serial_number == serial);

            let listed = match listed {
                Some(listed) => listed,
                None => return Err(DriverError::DeviceNotFound),
            };
            if listed.port_open {
                return Err(DriverError::DeviceInUse);
            }

            match Ftdi::with_serial_number(serial) {
                Ok(handle) => Ok(Box::new(D2xxDevice { handle })),
                Err(FtStatus::DEVICE_NOT_FOUND) => Err(DriverError::DeviceNotFound),
                // Listed but not flagged open: on Linux this is the kernel's
                // ftdi_sio driver holding the chip or a missing udev rule.
                Err(FtStatus::DEVICE_NOT_OPENED) => Err(DriverError::PermissionDenied(
                    String::from("unable to open device, check udev rules and that ftdi_sio is unloaded"),
                )),
                Err(e) => Err(status(e)),
            }
        }
    }

    struct D2xxDevice {
        handle: Ftdi,
    }

    impl BitBangDevice for D2xxDevice {
        fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), DriverError> {
            self.handle.set_baud_rate(baud_rate).map_err(status)
        }

        fn set_async_bitbang(&mut self, output_mask: u8) -> Result<(), DriverError> {
            self.handle
                .set_bit_mode(output_mask, BitMode::AsyncBitbang)
                .map_err(status)
        }

        fn read_pins(&mut self) -> Result<u8, DriverError> {
            self.handle.bit_mode().map_err(status)
        }

        fn write(&mut self, data: &[u8]) -> Result<usize, DriverError> {
            self.handle.write(data).map_err(status)
        }

        fn close(&mut self) -> Result<(), DriverError> {
            debug!("Closing D2XX handle");
            self.handle.close().map_err(status)
        }
    }

    fn status(status: FtStatus) -> DriverError {
        match status {
            FtStatus::DEVICE_NOT_FOUND => DriverError::DeviceNotFound,
            other => DriverError::Status(format!("{:?}", other)),
        }
    }
}
