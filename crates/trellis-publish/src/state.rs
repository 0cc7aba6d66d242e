// crates/trellis-publish/src/state.rs
//
// Publication state of an own identity.
//
// Valid transitions:
//   Idle -> InsertPending -> Inserting -> Idle
//   Inserting -> InsertPending   (insert failed, or changed while inserting)

use std::fmt;

/// Where an own identity is in the publication cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertState {
    /// Published and unchanged since.
    Idle,
    /// Never published, or changed since the last insert started.
    InsertPending,
    /// An insert is in flight.
    Inserting,
}

impl InsertState {
    /// Derive the state from the needs-insert flag and the in-flight marker.
    pub fn derive(needs_insert: bool, inserting: bool) -> Self {
        match (inserting, needs_insert) {
            (true, _) => InsertState::Inserting,
            (false, true) => InsertState::InsertPending,
            (false, false) => InsertState::Idle,
        }
    }
}

impl fmt::Display for InsertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertState::Idle => write!(f, "Idle"),
            InsertState::InsertPending => write!(f, "InsertPending"),
            InsertState::Inserting => write!(f, "Inserting"),
        }
    }
}
