//! Slot numbering and the per-drive loaded-slot tri-state.

use std::fmt;

/// A storage position inside a changer, 1-based.
///
/// Slot 0 and negative slot numbers are not representable here on
/// purpose -- those are sentinel values in the wire protocol ("no
/// slot" / "unknown") and get their own `SlotState` variants instead
/// of being smuggled through the numeric domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(u32);

impl Slot {
    /// Returns `None` for `n == 0` -- callers meaning "empty" should use
    /// `SlotState::Empty`, not `Slot::new(0)`.
    pub fn new(n: u32) -> Option<Self> {
        if n == 0 {
            None
        } else {
            Some(Slot(n))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A drive's belief about what, if anything, is loaded in it.
///
/// An explicit sum type over the sentinel-integer convention (-1
/// unknown, 0 empty, n>0 occupied) used at the wire boundary -- every
/// `<= 0` comparison there maps to "not occupied" here, i.e.
/// `!matches!(state, SlotState::Occupied(_))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unknown,
    Empty,
    Occupied(Slot),
}

impl SlotState {
    pub fn is_occupied(self) -> bool {
        matches!(self, SlotState::Occupied(_))
    }

    pub fn occupied_slot(self) -> Option<Slot> {
        match self {
            SlotState::Occupied(s) => Some(s),
            _ => None,
        }
    }

    /// The wire-level three-way query result: -1 error/unknown, 0
    /// empty, n>0 occupied.
    pub fn as_query_result(self) -> i64 {
        match self {
            SlotState::Unknown => -1,
            SlotState::Empty => 0,
            SlotState::Occupied(s) => s.get() as i64,
        }
    }

    /// Builds a state from the same three-way encoding used by the
    /// helper's `loaded?` output: negative or unparseable -> Unknown,
    /// zero -> Empty, positive -> Occupied.
    pub fn from_loaded_reply(n: i64) -> Self {
        if n > 0 {
            // n fits u32 for any sane slot count; saturate defensively.
            SlotState::Occupied(Slot::new(n as u32).expect("n > 0"))
        } else if n == 0 {
            SlotState::Empty
        } else {
            SlotState::Unknown
        }
    }
}
