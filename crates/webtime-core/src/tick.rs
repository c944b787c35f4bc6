//! The tick payload carried from the ticker to every subscriber.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One published clock value.
///
/// `seq` is the logical clock of the ticker: it starts at 0 for the
/// value that exists before the first update and grows by exactly one
/// per applied update. Subscribers may skip values but never see `seq`
/// go backwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Logical tick counter
    pub seq: u64,

    /// Formatted wall-clock time
    pub time: String,
}

impl Tick {
    /// Creates a tick with the given sequence number and value.
    pub fn new(seq: u64, time: impl Into<String>) -> Self {
        Self {
            seq,
            time: time.into(),
        }
    }

    /// The value held before the ticker applies its first update.
    pub fn initial() -> Self {
        Self::new(0, String::new())
    }

    /// Returns true if no update has been applied yet.
    pub fn is_initial(&self) -> bool {
        self.seq == 0
    }

    /// Builds the tick that follows this one.
    pub fn next(&self, time: impl Into<String>) -> Self {
        Self::new(self.seq.saturating_add(1), time)
    }
}

impl Default for Tick {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.seq, self.time)
    }
}
