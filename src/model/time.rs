// src/model/time.rs

//! `H:M:S` durations.
//!
//! Recording lengths and task timeouts are expressed as hour/minute/second
//! triples (the way operators type them), not raw seconds. `Hms` converts to
//! `chrono::Duration` for wall-clock arithmetic and serializes as its
//! `HH:MM:SS` display form.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An hours/minutes/seconds duration, e.g. `01:30:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hms {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Hms {
    pub fn new(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    /// Build from a whole number of seconds.
    pub fn from_secs(total: u64) -> Self {
        Self {
            hours: (total / 3600) as u32,
            minutes: ((total % 3600) / 60) as u32,
            seconds: (total % 60) as u32,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }

    pub fn to_std(&self) -> Duration {
        Duration::from_secs(self.total_seconds())
    }

    pub fn to_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.total_seconds() as i64)
    }
}

impl fmt::Display for Hms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

impl FromStr for Hms {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 3 {
            return Err(format!(
                "invalid duration '{s}'; expected H:M:S (e.g. 01:30:00)"
            ));
        }

        let parse = |part: &str, unit: &str| -> Result<u32, String> {
            part.parse::<u32>()
                .map_err(|e| format!("invalid {unit} in duration '{s}': {e}"))
        };

        let hours = parse(parts[0], "hours")?;
        let minutes = parse(parts[1], "minutes")?;
        let seconds = parse(parts[2], "seconds")?;

        if minutes > 59 || seconds > 59 {
            return Err(format!(
                "invalid duration '{s}': minutes and seconds must be < 60"
            ));
        }

        Ok(Self {
            hours,
            minutes,
            seconds,
        })
    }
}

impl Serialize for Hms {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hms {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
