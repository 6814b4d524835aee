use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum RelayId {
    Relay1,
    Relay2,
    Relay3,
    Relay4,
}

pub const ALL_RELAYS: [RelayId; 4] = [
    RelayId::Relay1,
    RelayId::Relay2,
    RelayId::Relay3,
    RelayId::Relay4,
];

impl RelayId {
    /// Maps a 1-based relay number to its id, `None` outside of 1..=4.
    pub fn from_number(number: i64) -> Option<RelayId> {
        match number {
            1 => Some(RelayId::Relay1),
            2 => Some(RelayId::Relay2),
            3 => Some(RelayId::Relay3),
            4 => Some(RelayId::Relay4),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            RelayId::Relay1 => 1,
            RelayId::Relay2 => 2,
            RelayId::Relay3 => 3,
            RelayId::Relay4 => 4,
        }
    }

    pub fn bit(&self) -> u8 {
        1 << (self.number() - 1)
    }
}

impl Display for RelayId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum RelayState {
    On,
    Off,
}

impl RelayState {
    pub fn of(relay: RelayId, state_byte: u8) -> RelayState {
        match state_byte & relay.bit() {
            0 => RelayState::Off,
            _ => RelayState::On,
        }
    }
}

/// A set of relays, stored as the bit mask it drives on the board.
///
/// Only bits 0-3 can ever be set, one per relay. Inserting a relay twice is a no-op.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct RelaySet(u8);

impl RelaySet {
    pub fn empty() -> RelaySet {
        RelaySet(0)
    }

    pub fn all() -> RelaySet {
        ALL_RELAYS.iter().copied().collect()
    }

    pub fn insert(&mut self, relay: RelayId) {
        self.0 |= relay.bit();
    }

    pub fn contains(&self, relay: RelayId) -> bool {
        self.0 & relay.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn mask(&self) -> u8 {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = RelayId> + '_ {
        ALL_RELAYS.iter().copied().filter(move |r| self.contains(*r))
    }
}

impl FromIterator<RelayId> for RelaySet {
    fn from_iter<T: IntoIterator<Item = RelayId>>(iter: T) -> Self {
        let mut set = RelaySet::empty();
        for relay in iter {
            set.insert(relay);
        }
        set
    }
}

/// Renders the set the way the relays are typed on the command line, e.g. `1 3`.
impl Display for RelaySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let numbers: Vec<String> = self.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", numbers.join(" "))
    }
}
