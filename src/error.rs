use thiserror::Error;

use crate::ftdi::DriverError;

/// Process exit codes. Scripts depend on these values, never renumber them.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    Success = 0,
    GeneralError = 1,
    NoDevicesFound = 2,
    DeviceNotFound = 3,
    ConnectionFailed = 4,
    CommandExecutionFailed = 5,
    InvalidArguments = 6,
    DeviceDisconnected = 7,
    PermissionDenied = 8,
    DeviceInUse = 9,
    InvalidRelayNumber = 10,
    ConflictingFlags = 11,
    DriverError = 12,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        std::process::ExitCode::from(status.code())
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("No FTDI devices found")]
    NoDevicesFound,

    #[error("Device '{0}' not found")]
    DeviceNotFound(String),

    #[error("Device index {index} out of range (0-{max})")]
    DeviceIndexOutOfRange { index: i64, max: usize },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Device in use by another application")]
    DeviceInUse,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device disconnected unexpectedly")]
    DeviceDisconnected,

    #[error("Invalid relay number: {flag}: {value}. Must be 1-4")]
    InvalidRelayNumber { flag: String, value: i64 },

    #[error("Conflicting flags: {0}")]
    ConflictingFlags(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("FTDI driver error: {0}")]
    Driver(#[source] DriverError),

    /// The pulse write landed but restoring the previous state did not, the
    /// pulsed relays are still energised.
    #[error("Failed to restore relays {relays} after pulse, relays remain ON: {source}")]
    PulseRestoreFailed {
        relays: String,
        #[source]
        source: Box<RelayError>,
    },

    #[error("Not connected to a device")]
    NotConnected,

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("{0}")]
    General(String),
}

impl RelayError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            RelayError::NoDevicesFound => ExitStatus::NoDevicesFound,
            RelayError::DeviceNotFound(_) => ExitStatus::DeviceNotFound,
            RelayError::DeviceIndexOutOfRange { .. } => ExitStatus::DeviceNotFound,
            RelayError::ConnectionFailed(_) => ExitStatus::ConnectionFailed,
            RelayError::DeviceInUse => ExitStatus::DeviceInUse,
            RelayError::PermissionDenied(_) => ExitStatus::PermissionDenied,
            RelayError::DeviceDisconnected => ExitStatus::DeviceDisconnected,
            RelayError::InvalidRelayNumber { .. } => ExitStatus::InvalidRelayNumber,
            RelayError::ConflictingFlags(_) => ExitStatus::ConflictingFlags,
            RelayError::InvalidArguments(_) => ExitStatus::InvalidArguments,
            RelayError::CommandFailed(_) => ExitStatus::CommandExecutionFailed,
            RelayError::Driver(_) => ExitStatus::DriverError,
            RelayError::PulseRestoreFailed { source, .. } => source.exit_status(),
            RelayError::NotConnected => ExitStatus::GeneralError,
            RelayError::Output(_) => ExitStatus::GeneralError,
            RelayError::General(_) => ExitStatus::GeneralError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_stable() {
        let expected = [
            (ExitStatus::Success, 0),
            (ExitStatus::GeneralError, 1),
            (ExitStatus::NoDevicesFound, 2),
            (ExitStatus::DeviceNotFound, 3),
            (ExitStatus::ConnectionFailed, 4),
            (ExitStatus::CommandExecutionFailed, 5),
            (ExitStatus::InvalidArguments, 6),
            (ExitStatus::DeviceDisconnected, 7),
            (ExitStatus::PermissionDenied, 8),
            (ExitStatus::DeviceInUse, 9),
            (ExitStatus::InvalidRelayNumber, 10),
            (ExitStatus::ConflictingFlags, 11),
            (ExitStatus::DriverError, 12),
        ];
        for (status, code) in expected {
            assert_eq!(status.code(), code, "{:?}", status);
        }
    }

    #[test]
    fn restore_failure_keeps_code_of_cause() {
        let err = RelayError::PulseRestoreFailed {
            relays: "2".into(),
            source: Box::new(RelayError::DeviceDisconnected),
        };
        assert_eq!(err.exit_status(), ExitStatus::DeviceDisconnected);
        assert!(err.to_string().contains("remain ON"));
    }

    #[test]
    fn invalid_relay_names_flag_and_value() {
        let err = RelayError::InvalidRelayNumber {
            flag: "--on".into(),
            value: 5,
        };
        assert_eq!(
            err.to_string(),
            "Invalid relay number: --on: 5. Must be 1-4"
        );
        assert_eq!(err.exit_status().code(), 10);
    }
}
