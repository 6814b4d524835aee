mod app;
mod cli;
mod commands;
mod console;
mod device_select;
mod error;
mod ftdi;
mod logging;
#[cfg(test)]
mod mock_device;
mod panel;
mod relay_ctl;
mod relay_engine;
mod relay_types;
mod settings;

use std::io;
use std::path::Path;
use std::process::ExitCode;

use app::App;
use app::Verbosity;
use clap::Parser;
use cli::parse_failure_status;
use cli::Cli;
use cli::Mode;
use device_select::prompt_for_device;
use error::ExitStatus;
use log::debug;
use log::error;
use log::warn;
use log::LevelFilter;
use settings::settings_path;
use settings::Settings;

/// Loads settings and brings up logging. Problems with either are reported but never fatal.
fn setup(
    path: &Path,
    level: impl FnOnce(&Settings) -> LevelFilter,
    log_file: Option<&Path>,
) -> Settings {
    let loaded = Settings::try_load(path);
    let settings = match &loaded {
        Ok(settings) => settings.clone(),
        Err(_) => Settings::default(),
    };

    let log_file = log_file.map(Path::to_path_buf).or_else(|| settings.log_file());
    let level = level(&settings);
    if let Err(e) = logging::init(level, log_file.as_deref()) {
        eprintln!("Warning: {:#}", e);
        if log_file.is_some() && logging::init(level, None).is_ok() {
            warn!("File logging disabled: {:#}", e);
        }
    }

    if let Err(e) = loaded {
        warn!("Failed to load settings: {:#}. Using defaults.", e);
    }
    settings
}

fn run_console() -> ExitStatus {
    let path = settings_path(None);
    let mut settings = setup(
        &path,
        |settings| Verbosity::default().log_level(settings),
        None,
    );

    let driver = ftdi::default_driver();
    match console::run(driver.as_ref(), &mut settings, &path) {
        Ok(()) => ExitStatus::Success,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            e.exit_status()
        }
    }
}

fn run_cli() -> ExitStatus {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return parse_failure_status(&e);
        }
    };

    let path = settings_path(cli.config.as_deref());
    let settings = setup(
        &path,
        |settings| Verbosity::resolve(&cli, settings).log_level(settings),
        cli.log_file.as_deref(),
    );

    let driver = ftdi::default_driver();
    let mut app = App {
        driver: driver.as_ref(),
        settings,
        settings_path: path,
        prompt: prompt_for_device,
    };
    match app.run_cli(&cli, &mut io::stdout()) {
        Ok(()) => ExitStatus::Success,
        Err(e) => {
            debug!("CLI failed: {:?}", e);
            eprintln!("Error: {}", e);
            e.exit_status()
        }
    }
}

fn main() -> ExitCode {
    let status = match Mode::for_args(std::env::args_os()) {
        Mode::Interactive => run_console(),
        Mode::CommandLine => run_cli(),
    };
    status.into()
}
