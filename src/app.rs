use std::io::Write;
use std::path::PathBuf;

use log::info;
use log::LevelFilter;

use crate::cli::Cli;
use crate::commands::CommandPlan;
use crate::device_select::list_devices;
use crate::device_select::select_device;
use crate::device_select::Selection;
use crate::error::RelayError;
use crate::ftdi::DeviceInfo;
use crate::ftdi::Driver;
use crate::logging::level_from_name;
use crate::relay_ctl::RelayControl;
use crate::relay_types::RelayState;
use crate::relay_types::ALL_RELAYS;
use crate::settings::Settings;

pub type Prompt = fn(&[DeviceInfo], usize) -> Option<usize>;

/// Output switches after merging flags with settings. Flags win, quiet beats verbose.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Verbosity {
    pub quiet: bool,
    pub verbose: bool,
}

impl Verbosity {
    pub fn resolve(cli: &Cli, settings: &Settings) -> Verbosity {
        let quiet = cli.quiet || (settings.cli.quiet_mode && !cli.verbose);
        let verbose = !quiet && (cli.verbose || settings.cli.verbose_mode);
        Verbosity { quiet, verbose }
    }

    pub fn log_level(&self, settings: &Settings) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            level_from_name(&settings.cli.log_level).unwrap_or(LevelFilter::Info)
        }
    }
}

pub struct App<'a> {
    pub driver: &'a dyn Driver,
    pub settings: Settings,
    pub settings_path: PathBuf,
    pub prompt: Prompt,
}

impl<'a> App<'a> {
    /// Runs one command line invocation, writing user facing output to `out`.
    pub fn run_cli<W: Write>(&mut self, cli: &Cli, out: &mut W) -> Result<(), RelayError> {
        let quiet = Verbosity::resolve(cli, &self.settings).quiet;
        info!("=== CLI Mode Started ===");

        if cli.list_devices {
            let devices = list_devices(self.driver)?;
            writeln!(out, "Available FTDI devices:")?;
            for device in &devices {
                writeln!(out, "  [{}] {}", device.index, device.label())?;
            }
            return Ok(());
        }

        let plan = CommandPlan::from_cli(cli)?;

        let devices = list_devices(self.driver)?;
        let selection = match (&cli.device_serial, cli.device_index) {
            (Some(serial), _) => Selection::Serial(serial.clone()),
            (None, Some(index)) => Selection::Index(index),
            (None, None) => Selection::Any,
        };
        let hint = self.settings.connection.last_device.clone();
        let device = match select_device(&devices, &selection, hint.as_deref(), self.prompt)? {
            Some(device) => device,
            None => {
                writeln!(out, "Exiting without connecting.")?;
                return Ok(());
            }
        };

        if !quiet {
            writeln!(out, "Connecting to: {}", device.label())?;
        }
        let mut ctl = RelayControl::open(self.driver, &device.serial)?;

        self.settings.connection.last_device = Some(device.serial.clone());
        self.settings.save_or_warn(&self.settings_path);

        let report = plan.execute(&mut ctl, self.settings.default_duration())?;
        ctl.close();

        if plan.is_empty() {
            writeln!(out, "{}", describe_state(report.state))?;
        }
        if !quiet {
            for intent in &report.performed {
                writeln!(out, "{}", intent)?;
            }
            writeln!(out, "Command executed successfully.")?;
        }
        info!("=== CLI Mode Completed Successfully ===");
        Ok(())
    }
}

pub fn describe_state(state: u8) -> String {
    let relays: Vec<String> = ALL_RELAYS
        .iter()
        .map(|relay| match RelayState::of(*relay, state) {
            RelayState::On => format!("Relay {}: ON", relay),
            RelayState::Off => format!("Relay {}: OFF", relay),
        })
        .collect();
    format!("State 0x{:02X}: {}", state, relays.join(", "))
}
