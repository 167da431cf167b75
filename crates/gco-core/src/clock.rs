//! Wall-clock source used for journal times, archive dates and task stamps.

use chrono::{Local, NaiveDateTime};

/// Full timestamp layout used on the task board (`Completada`, `Última sincronización`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Second-precision time used in journal entry headers.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Day layout used for journal headers, index records and archive file names.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of the current local time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;

    /// `YYYY-MM-DD HH:MM:SS`.
    fn timestamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }

    /// `HH:MM:SS`.
    fn time(&self) -> String {
        self.now().format(TIME_FORMAT).to_string()
    }

    /// `YYYY-MM-DD`.
    fn date(&self) -> String {
        self.now().format(DATE_FORMAT).to_string()
    }
}

/// The machine's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant, for tests and reproducible output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Parse a `YYYY-MM-DD HH:MM:SS` timestamp.
    #[must_use]
    pub fn parse(timestamp: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .ok()
            .map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
