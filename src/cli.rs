use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;

use crate::error::ExitStatus;

pub const PROGRAM: &str = "sainsmart-relay";

const EXIT_CODES: &str = "EXIT CODES:
    0=Success, 1=General error, 2=No devices, 3=Device not found,
    4=Connection failed, 5=Command failed, 6=Invalid args, 7=Disconnected,
    8=Permission denied, 9=Device in use, 10=Invalid relay, 11=Conflicting flags,
    12=FTDI driver error

Run without arguments to start the interactive panel.";

#[derive(Parser, Debug)]
#[command(
    name = PROGRAM,
    version,
    about = "SainSmart 4-Relay Control for FTDI based relay boards",
    after_help = EXIT_CODES
)]
pub struct Cli {
    /// List all available FTDI devices
    #[arg(long)]
    pub list_devices: bool,

    /// Connect to device by index (0-based)
    #[arg(long, value_name = "INDEX", allow_negative_numbers = true)]
    pub device_index: Option<i64>,

    /// Connect to device by serial number
    #[arg(long, value_name = "SERIAL")]
    pub device_serial: Option<String>,

    /// Set absolute state (specified ON, others OFF, none given = all OFF)
    #[arg(short = 's', long, value_name = "RELAY", num_args = 0.., allow_negative_numbers = true)]
    pub state: Option<Vec<i64>>,

    /// Turn on specified relays (leave others unchanged)
    #[arg(long, value_name = "RELAY", num_args = 1.., allow_negative_numbers = true)]
    pub on: Option<Vec<i64>>,

    /// Turn off specified relays (leave others unchanged)
    #[arg(long, value_name = "RELAY", num_args = 1.., allow_negative_numbers = true)]
    pub off: Option<Vec<i64>>,

    /// Toggle specified relays (leave others unchanged)
    #[arg(short = 't', long, value_name = "RELAY", num_args = 1.., allow_negative_numbers = true)]
    pub toggle: Option<Vec<i64>>,

    /// Pulse relays, then restore previous state
    #[arg(short = 'm', long, value_name = "RELAY", num_args = 1.., allow_negative_numbers = true)]
    pub momentary: Option<Vec<i64>>,

    /// Duration for momentary pulse in seconds [default: from settings, 0.5]
    #[arg(short = 'd', long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub duration: Option<f64>,

    /// Suppress informational messages
    #[arg(short, long)]
    pub quiet: bool,

    /// Show detailed execution information
    #[arg(short, long)]
    pub verbose: bool,

    /// Write logs to specified file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Use custom settings file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    CommandLine,
}

impl Mode {
    /// `args` includes the program name. Nothing after it opens the interactive panel.
    pub fn for_args<I: IntoIterator>(args: I) -> Mode {
        match args.into_iter().nth(1) {
            None => Mode::Interactive,
            Some(_) => Mode::CommandLine,
        }
    }
}

/// Exit status for an argument parser failure. Help and version output count as success.
pub fn parse_failure_status(error: &clap::Error) -> ExitStatus {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitStatus::Success,
        _ => ExitStatus::InvalidArguments,
    }
}
