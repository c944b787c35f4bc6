//! Tick sources: how the ticker recomputes its value on every interval.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::Local;

use crate::error::{TickError, TickResult};

/// Default layout for [`WallClock`]: hours, minutes, seconds and zone.
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S %Z";

/// Produces the value published on each tick.
///
/// Implementations run on the ticker task, once per interval. A failed
/// render skips that tick; the ticker keeps going.
pub trait TickSource: Send + 'static {
    /// Renders the value for tick number `seq`.
    fn render(&mut self, seq: u64) -> TickResult<String>;
}

impl<F> TickSource for F
where
    F: FnMut(u64) -> TickResult<String> + Send + 'static,
{
    fn render(&mut self, seq: u64) -> TickResult<String> {
        self(seq)
    }
}

/// Formats the local wall-clock time with a chrono strftime layout.
#[derive(Debug, Clone)]
pub struct WallClock {
    format: String,
}

impl WallClock {
    /// Creates a wall clock source, rejecting layouts chrono cannot render.
    pub fn new(format: impl Into<String>) -> TickResult<Self> {
        let format = format.into();

        if format.is_empty() {
            return Err(TickError::InvalidFormat {
                format,
                reason: "format is empty".to_string(),
            });
        }

        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(TickError::InvalidFormat {
                format,
                reason: "unsupported strftime specifier".to_string(),
            });
        }

        Ok(Self { format })
    }

    /// Returns the strftime layout in use.
    pub fn format(&self) -> &str {
        &self.format
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self {
            format: DEFAULT_TIME_FORMAT.to_string(),
        }
    }
}

impl TickSource for WallClock {
    fn render(&mut self, seq: u64) -> TickResult<String> {
        let mut out = String::new();
        // Display for DelayedFormat reports bad items as fmt::Error instead of panicking here
        write!(out, "{}", Local::now().format(&self.format)).map_err(|e| TickError::Render {
            seq,
            reason: e.to_string(),
        })?;
        Ok(out)
    }
}
