use std::time::Duration;

use log::debug;

use crate::cli::Cli;
use crate::error::RelayError;
use crate::relay_engine::pulse;
use crate::relay_engine::Intent;
use crate::relay_engine::RelayPort;
use crate::relay_types::RelayId;
use crate::relay_types::RelaySet;

/// Validated relay commands of one invocation.
///
/// Built before the device is touched, so a rejected invocation does no I/O.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandPlan {
    pub absolute: Option<RelaySet>,
    pub on: Option<RelaySet>,
    pub off: Option<RelaySet>,
    pub toggle: Option<RelaySet>,
    pub momentary: Option<RelaySet>,
    pub duration: Option<Duration>,
}

/// What a plan did to the board.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub performed: Vec<Intent>,
    /// Relay byte after the last write, or as read when nothing was written.
    pub state: u8,
}

impl CommandPlan {
    pub fn from_cli(cli: &Cli) -> Result<CommandPlan, RelayError> {
        let absolute = relay_set(cli.state.as_deref(), "--state")?;
        let on = relay_set(cli.on.as_deref(), "--on")?;
        let off = relay_set(cli.off.as_deref(), "--off")?;
        let toggle = relay_set(cli.toggle.as_deref(), "--toggle")?;
        let momentary = relay_set(cli.momentary.as_deref(), "--momentary")?;

        if absolute.is_some() && (on.is_some() || off.is_some() || toggle.is_some()) {
            return Err(RelayError::ConflictingFlags(String::from(
                "--state cannot be used with --on, --off, or --toggle",
            )));
        }

        if let (Some(on), Some(off)) = (on, off) {
            if let Some(relay) = on.iter().find(|relay| off.contains(*relay)) {
                return Err(RelayError::ConflictingFlags(format!(
                    "Relay {} specified in both --on and --off",
                    relay
                )));
            }
        }

        if cli.duration.is_some() && momentary.is_none() {
            return Err(RelayError::ConflictingFlags(String::from(
                "--duration can only be used with --momentary",
            )));
        }

        if cli.device_index.is_some() && cli.device_serial.is_some() {
            return Err(RelayError::ConflictingFlags(String::from(
                "--device-index cannot be used with --device-serial",
            )));
        }

        let duration = match cli.duration {
            Some(secs) => Some(pulse_duration(secs)?),
            None => None,
        };

        debug!("Argument validation passed");
        Ok(CommandPlan {
            absolute,
            on,
            off,
            toggle,
            momentary,
            duration,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.absolute.is_none()
            && self.on.is_none()
            && self.off.is_none()
            && self.toggle.is_none()
            && self.momentary.is_none()
    }

    /// Intents in execution order.
    pub fn intents(&self, default_duration: Duration) -> Vec<Intent> {
        let mut intents = Vec::new();
        if let Some(relays) = self.absolute {
            intents.push(Intent::SetAbsolute(relays));
        }
        if let Some(relays) = self.on {
            intents.push(Intent::TurnOn(relays));
        }
        if let Some(relays) = self.off {
            intents.push(Intent::TurnOff(relays));
        }
        if let Some(relays) = self.toggle {
            intents.push(Intent::Toggle(relays));
        }
        if let Some(relays) = self.momentary {
            let duration = self.duration.unwrap_or(default_duration);
            intents.push(Intent::Momentary(relays, duration));
        }
        intents
    }

    /// Runs the plan against an open board.
    ///
    /// An absolute state is written as is. Otherwise on, off and toggle are
    /// folded onto one read of the board and written once. A momentary pulse
    /// comes last and takes whatever the board holds then as its baseline.
    pub fn execute<P: RelayPort + ?Sized>(
        &self,
        port: &mut P,
        default_duration: Duration,
    ) -> Result<Report, RelayError> {
        let intents = self.intents(default_duration);
        let mut performed = Vec::new();
        let mut state = None;

        let (pulses, changes): (Vec<Intent>, Vec<Intent>) = intents
            .into_iter()
            .partition(|i| matches!(i, Intent::Momentary(..)));

        let absolute = changes
            .iter()
            .copied()
            .find(|i| matches!(i, Intent::SetAbsolute(_)));

        if let Some(absolute) = absolute {
            let byte = absolute.apply(0);
            port.write_state(byte)?;
            performed.push(absolute);
            state = Some(byte);
        } else if !changes.is_empty() {
            let current = port.read_state()?;
            let byte = changes
                .iter()
                .fold(current, |byte, intent| intent.apply(byte));
            port.write_state(byte)?;
            performed.extend(changes);
            state = Some(byte);
        }

        for intent in pulses {
            if let Intent::Momentary(relays, duration) = intent {
                state = Some(pulse(port, relays, duration)?);
                performed.push(intent);
            }
        }

        let state = match state {
            Some(state) => state,
            None => port.read_state()?,
        };
        Ok(Report { performed, state })
    }
}

pub fn pulse_duration(secs: f64) -> Result<Duration, RelayError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        RelayError::InvalidArguments(format!(
            "--duration must be a non-negative number of seconds, got {}",
            secs
        ))
    })
}

fn relay_set(numbers: Option<&[i64]>, flag: &str) -> Result<Option<RelaySet>, RelayError> {
    let numbers = match numbers {
        Some(numbers) => numbers,
        None => return Ok(None),
    };
    let mut relays = RelaySet::empty();
    for &number in numbers {
        match RelayId::from_number(number) {
            Some(relay) => relays.insert(relay),
            None => {
                return Err(RelayError::InvalidRelayNumber {
                    flag: flag.to_string(),
                    value: number,
                })
            }
        }
    }
    debug!("Validated relay numbers for {}: {:?}", flag, numbers);
    Ok(Some(relays))
}
