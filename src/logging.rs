use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use anyhow::Context;
use anyhow::Result;
use chrono::Local;
use log::Level;
use log::LevelFilter;
use log::Log;
use log::Metadata;
use log::Record;
use stderrlog::StdErrLog;
use stderrlog::Timestamp;

const LOGGER_NAME: &str = "relay_control";
const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;
const LOG_BACKUPS: usize = 5;

pub fn level_from_name(name: &str) -> Option<LevelFilter> {
    match name.trim().to_ascii_uppercase().as_str() {
        "ERROR" => Some(LevelFilter::Error),
        "WARNING" | "WARN" => Some(LevelFilter::Warn),
        "INFO" => Some(LevelFilter::Info),
        "DEBUG" => Some(LevelFilter::Debug),
        "TRACE" => Some(LevelFilter::Trace),
        _ => None,
    }
}

fn verbosity(level: LevelFilter) -> usize {
    match level {
        LevelFilter::Off | LevelFilter::Error => 0,
        LevelFilter::Warn => 1,
        LevelFilter::Info => 2,
        LevelFilter::Debug => 3,
        LevelFilter::Trace => 4,
    }
}

/// Installs the global logger: stderr always, plus a rotating file when `log_file` is set.
pub fn init(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let mut console = stderrlog::new();
    console
        .module("sainsmart_relay")
        .verbosity(verbosity(level))
        .quiet(level == LevelFilter::Off)
        .timestamp(Timestamp::Off);

    let file = match log_file {
        Some(path) => Some(Mutex::new(RotatingFile::open(path, MAX_LOG_BYTES, LOG_BACKUPS)?)),
        None => None,
    };

    log::set_boxed_logger(Box::new(Logger {
        console,
        file,
        level,
        file_failed: AtomicBool::new(false),
    }))
    .context("logger already initialized")?;
    log::set_max_level(level);

    if let Some(path) = log_file {
        log::info!("Logging to file: {}", path.display());
    }
    Ok(())
}

pub fn default_log_path() -> Option<PathBuf> {
    crate::settings::settings_dir().map(|dir| dir.join("relay_control.log"))
}

struct Logger {
    console: StdErrLog,
    file: Option<Mutex<RotatingFile>>,
    level: LevelFilter,
    file_failed: AtomicBool,
}

impl Logger {
    /// Warns on stderr about the first file write failure only. Returns whether it warned.
    fn report_file_error(&self, e: &anyhow::Error) -> bool {
        if self.file_failed.swap(true, Ordering::Relaxed) {
            return false;
        }
        eprintln!(
            "Warning: failed to write log file, further file errors are not reported: {:#}",
            e
        );
        true
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        self.console.log(record);

        if !self.enabled(record.metadata()) || !record.target().starts_with("sainsmart_relay") {
            return;
        }
        if let Some(file) = &self.file {
            let line = format_line(record.level(), &record.args().to_string());
            if let Ok(mut file) = file.lock() {
                if let Err(e) = file.write_line(&line) {
                    self.report_file_error(&e);
                }
            }
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.file.flush();
            }
        }
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

fn format_line(level: Level, message: &str) -> String {
    format!(
        "{} - {} - {} - {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        LOGGER_NAME,
        level_name(level),
        message
    )
}

/// Append-only log file that rolls over to `name.1` .. `name.N` once it reaches `max_bytes`.
struct RotatingFile {
    path: PathBuf,
    file: File,
    size: u64,
    max_bytes: u64,
    backups: usize,
}

impl RotatingFile {
    fn open(path: &Path, max_bytes: u64, backups: usize) -> Result<RotatingFile> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        let size = file.metadata()?.len();
        Ok(RotatingFile {
            path: path.to_path_buf(),
            file,
            size,
            max_bytes,
            backups,
        })
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        if self.size > 0 && self.size + line.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(line.as_bytes())?;
        self.size += line.len() as u64;
        Ok(())
    }

    fn backup(&self, n: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> Result<()> {
        self.file.flush()?;
        if self.backups == 0 {
            self.file = File::create(&self.path)?;
            self.size = 0;
            return Ok(());
        }
        for n in (1..self.backups).rev() {
            let from = self.backup(n);
            if from.exists() {
                fs::rename(&from, self.backup(n + 1))?;
            }
        }
        fs::rename(&self.path, self.backup(1))?;
        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.size = 0;
        Ok(())
    }
}
