use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::thread;
use std::time::Duration;

use log::debug;
use log::info;
use log::warn;

use crate::error::RelayError;
use crate::relay_types::RelaySet;

/// Something that holds the latched relay byte of a board.
pub trait RelayPort {
    fn read_state(&mut self) -> Result<u8, RelayError>;

    fn write_state(&mut self, state: u8) -> Result<(), RelayError>;
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Intent {
    /// Listed relays on, everything else off, reserved bits included.
    SetAbsolute(RelaySet),
    TurnOn(RelaySet),
    TurnOff(RelaySet),
    Toggle(RelaySet),
    Momentary(RelaySet, Duration),
}

impl Intent {
    /// Computes the byte to write for `current`.
    ///
    /// For [`Intent::Momentary`] this is the byte held during the pulse; the
    /// restore is done by [`pulse`].
    pub fn apply(&self, current: u8) -> u8 {
        match self {
            Intent::SetAbsolute(relays) => mask_of(relays),
            Intent::TurnOn(relays) => current | mask_of(relays),
            Intent::TurnOff(relays) => current & !mask_of(relays),
            Intent::Toggle(relays) => current ^ mask_of(relays),
            Intent::Momentary(relays, _) => current | mask_of(relays),
        }
    }
}

impl Display for Intent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Intent::SetAbsolute(relays) if relays.is_empty() => {
                write!(f, "Set absolute state: all relays OFF")
            }
            Intent::SetAbsolute(relays) => {
                write!(f, "Set absolute state: Relays {} ON, others OFF", relays)
            }
            Intent::TurnOn(relays) => write!(f, "Turned ON: Relays {}", relays),
            Intent::TurnOff(relays) => write!(f, "Turned OFF: Relays {}", relays),
            Intent::Toggle(relays) => write!(f, "Toggled: Relays {}", relays),
            Intent::Momentary(relays, duration) => write!(
                f,
                "Pulsed relays {} for {}s",
                relays,
                duration.as_secs_f64()
            ),
        }
    }
}

pub fn mask_of(relays: &RelaySet) -> u8 {
    relays.iter().fold(0u8, |mask, relay| mask | relay.bit())
}

/// Reads the board, applies `intent` and writes the result. Returns the written byte.
pub fn execute<P: RelayPort + ?Sized>(port: &mut P, intent: &Intent) -> Result<u8, RelayError> {
    match intent {
        Intent::SetAbsolute(_) => {
            let state = intent.apply(0);
            port.write_state(state)?;
            Ok(state)
        }
        Intent::Momentary(relays, duration) => pulse(port, *relays, *duration),
        _ => {
            let current = port.read_state()?;
            let state = intent.apply(current);
            port.write_state(state)?;
            Ok(state)
        }
    }
}

/// Energises `relays` for `duration`, then writes back the byte read before the pulse,
/// which is returned.
///
/// Relays already on stay on. A zero duration still performs both writes.
/// When the restore write fails the relays are left pulsed and
/// [`RelayError::PulseRestoreFailed`] is returned; nothing is retried.
pub fn pulse<P: RelayPort + ?Sized>(
    port: &mut P,
    relays: RelaySet,
    duration: Duration,
) -> Result<u8, RelayError> {
    let previous = port.read_state()?;
    let pulsed = Intent::Momentary(relays, duration).apply(previous);

    port.write_state(pulsed)?;

    debug!(
        "Pulsing relays {} for {}s",
        relays,
        duration.as_secs_f64()
    );
    thread::sleep(duration);

    if let Err(e) = port.write_state(previous) {
        warn!("Restore after pulse failed, relays {} remain ON", relays);
        return Err(RelayError::PulseRestoreFailed {
            relays: relays.to_string(),
            source: Box::new(e),
        });
    }
    info!("Relays {} pulsed and restored", relays);
    Ok(previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay_types::RelayId;
    use crate::relay_types::ALL_RELAYS;

    /// In-memory board recording the bytes written to it.
    #[derive(Default)]
    struct Board {
        latched: u8,
        writes: Vec<u8>,
        fail_write: Option<usize>,
    }

    impl RelayPort for Board {
        fn read_state(&mut self) -> Result<u8, RelayError> {
            Ok(self.latched)
        }

        fn write_state(&mut self, state: u8) -> Result<(), RelayError> {
            if self.fail_write == Some(self.writes.len()) {
                self.fail_write = None;
                return Err(RelayError::DeviceDisconnected);
            }
            self.writes.push(state);
            self.latched = state;
            Ok(())
        }
    }

    fn set(numbers: &[i64]) -> RelaySet {
        numbers
            .iter()
            .map(|n| RelayId::from_number(*n).unwrap())
            .collect()
    }

    fn all_subsets() -> Vec<RelaySet> {
        (0u8..16)
            .map(|bits| {
                ALL_RELAYS
                    .iter()
                    .copied()
                    .filter(|r| bits & r.bit() != 0)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn mask_has_one_bit_per_relay() {
        for relays in all_subsets() {
            let mask = mask_of(&relays);
            assert_eq!(mask.count_ones() as usize, relays.iter().count());
            for relay in relays.iter() {
                assert_ne!(mask & (1 << (relay.number() - 1)), 0);
            }
            assert_eq!(mask & 0xF0, 0);
        }
    }

    #[test]
    fn transition_laws_hold_for_every_byte() {
        for relays in all_subsets() {
            let mask = mask_of(&relays);
            for b in 0..=255u8 {
                let on = Intent::TurnOn(relays).apply(b);
                assert_eq!(Intent::TurnOn(relays).apply(on), on);
                assert_eq!(Intent::TurnOff(relays).apply(on), b & !mask);

                let toggled = Intent::Toggle(relays).apply(b);
                assert_eq!(Intent::Toggle(relays).apply(toggled), b);

                assert_eq!(Intent::SetAbsolute(relays).apply(b), mask);
            }
        }
    }

    #[test]
    fn partial_updates_keep_reserved_bits() {
        let relays = set(&[1, 2, 3, 4]);
        assert_eq!(Intent::TurnOff(relays).apply(0xF5), 0xF0);
        assert_eq!(Intent::TurnOn(relays).apply(0xA0), 0xAF);
        assert_eq!(Intent::Toggle(relays).apply(0x50), 0x5F);
        assert_eq!(Intent::SetAbsolute(set(&[1])).apply(0xF0), 0x01);
    }

    #[test]
    fn turn_on_writes_combined_byte() {
        let mut board = Board::default();
        let written = execute(&mut board, &Intent::TurnOn(set(&[1, 3]))).unwrap();
        assert_eq!(written, 0b0101);
        assert_eq!(board.writes, vec![0b0101]);
    }

    #[test]
    fn turn_off_clears_only_listed() {
        let mut board = Board {
            latched: 0b0101,
            ..Board::default()
        };
        execute(&mut board, &Intent::TurnOff(set(&[1]))).unwrap();
        assert_eq!(board.writes, vec![0b0100]);
    }

    #[test]
    fn toggle_flips_listed() {
        let mut board = Board {
            latched: 0b0110,
            ..Board::default()
        };
        execute(&mut board, &Intent::Toggle(set(&[2, 4]))).unwrap();
        assert_eq!(board.writes, vec![0b1100]);
    }

    #[test]
    fn set_absolute_ignores_current() {
        for latched in [0x00, 0x0F, 0xFF, 0b1001] {
            let mut board = Board {
                latched,
                ..Board::default()
            };
            execute(&mut board, &Intent::SetAbsolute(set(&[2]))).unwrap();
            assert_eq!(board.writes, vec![0b0010]);
        }
    }

    #[test]
    fn pulse_writes_then_restores() {
        let mut board = Board {
            latched: 0b0001,
            ..Board::default()
        };
        let restored = pulse(&mut board, set(&[2]), Duration::from_millis(20)).unwrap();
        assert_eq!(restored, 0b0001);
        assert_eq!(board.writes, vec![0b0011, 0b0001]);
        assert_eq!(board.latched, 0b0001);
    }

    #[test]
    fn zero_duration_pulse_still_writes_twice() {
        let mut board = Board {
            latched: 0xA4,
            ..Board::default()
        };
        pulse(&mut board, set(&[1, 3]), Duration::ZERO).unwrap();
        assert_eq!(board.writes, vec![0xA5, 0xA4]);
    }

    #[test]
    fn failed_pulse_write_is_not_a_restore_failure() {
        let mut board = Board {
            fail_write: Some(0),
            ..Board::default()
        };
        let err = pulse(&mut board, set(&[1]), Duration::ZERO).unwrap_err();
        assert!(matches!(err, RelayError::DeviceDisconnected));
        assert!(board.writes.is_empty());
    }

    #[test]
    fn failed_restore_leaves_relays_pulsed() {
        let mut board = Board {
            latched: 0b1000,
            fail_write: Some(1),
            ..Board::default()
        };
        let err = pulse(&mut board, set(&[2]), Duration::ZERO).unwrap_err();
        match err {
            RelayError::PulseRestoreFailed { relays, source } => {
                assert_eq!(relays, "2");
                assert!(matches!(*source, RelayError::DeviceDisconnected));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(board.latched, 0b1010);
        assert_eq!(board.writes, vec![0b1010]);
    }

    #[test]
    fn intents_describe_themselves() {
        assert_eq!(
            Intent::SetAbsolute(set(&[1, 3])).to_string(),
            "Set absolute state: Relays 1 3 ON, others OFF"
        );
        assert_eq!(
            Intent::Momentary(set(&[2]), Duration::from_millis(500)).to_string(),
            "Pulsed relays 2 for 0.5s"
        );
    }
}
