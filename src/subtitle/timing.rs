//! Millisecond-precise subtitle timestamps.
//!
//! All timestamp parsing and formatting funnels through this type so the
//! `HH:MM:SS,mmm` wire format has exactly one implementation.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::error::{DubflowError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SrtTimestamp(u64);

impl SrtTimestamp {
    pub const ZERO: Self = Self(0);

    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Negative inputs clamp to zero.
    pub fn from_seconds(secs: f64) -> Self {
        Self((secs.max(0.0) * 1000.0).round() as u64)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    pub fn as_seconds(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// ASS event time, centisecond precision: `H:MM:SS.cc`.
    pub fn ass(self) -> String {
        let hours = self.0 / 3_600_000;
        let minutes = (self.0 % 3_600_000) / 60_000;
        let secs = (self.0 % 60_000) / 1_000;
        let centis = (self.0 % 1_000) / 10;
        format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, centis)
    }
}

impl fmt::Display for SrtTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / 3_600_000;
        let minutes = (self.0 % 3_600_000) / 60_000;
        let secs = (self.0 % 60_000) / 1_000;
        let millis = self.0 % 1_000;
        write!(f, "{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
    }
}

impl FromStr for SrtTimestamp {
    type Err = DubflowError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DubflowError::Format(format!("invalid timestamp: {:?}", s));

        let mut clock = s.trim().split(':');
        let hours: u64 = clock.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let minutes: u64 = clock.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let rest = clock.next().ok_or_else(invalid)?;
        if clock.next().is_some() {
            return Err(invalid());
        }

        let (secs_str, millis_str) = rest
            .split_once(',')
            .or_else(|| rest.split_once('.'))
            .ok_or_else(invalid)?;
        let secs: u64 = secs_str.parse().map_err(|_| invalid())?;
        let millis: u64 = millis_str.parse().map_err(|_| invalid())?;
        if minutes >= 60 || secs >= 60 || millis >= 1000 {
            return Err(invalid());
        }

        Ok(Self(hours * 3_600_000 + minutes * 60_000 + secs * 1_000 + millis))
    }
}

impl Add for SrtTimestamp {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sub for SrtTimestamp {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self.saturating_sub(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_srt_wire_format() {
        assert_eq!(SrtTimestamp::ZERO.to_string(), "00:00:00,000");
        assert_eq!(SrtTimestamp::from_seconds(65.123).to_string(), "00:01:05,123");
        assert_eq!(SrtTimestamp::from_seconds(3661.5).to_string(), "01:01:01,500");
    }

    #[test]
    fn parse_format_round_trips() {
        for input in ["00:00:00,000", "00:01:05,123", "01:01:01,500", "12:34:56,789"] {
            let parsed: SrtTimestamp = input.parse().unwrap();
            assert_eq!(parsed.to_string(), input);
        }
    }

    #[test]
    fn accepts_dot_separator() {
        let parsed: SrtTimestamp = "00:01:23.456".parse().unwrap();
        assert_eq!(parsed.as_millis(), 83_456);
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["", "1:2", "aa:bb:cc,ddd", "00:61:00,000", "00:00:00", "00:00:00,000,1"] {
            assert!(input.parse::<SrtTimestamp>().is_err(), "{input}");
        }
    }

    #[test]
    fn ass_format_truncates_to_centiseconds() {
        assert_eq!(SrtTimestamp::from_millis(83_456).ass(), "0:01:23.45");
        assert_eq!(SrtTimestamp::from_seconds(3661.5).ass(), "1:01:01.50");
    }

    #[test]
    fn arithmetic_saturates() {
        let a = SrtTimestamp::from_millis(500);
        let b = SrtTimestamp::from_millis(2000);
        assert_eq!((a - b).as_millis(), 0);
        assert_eq!((a + b).as_millis(), 2500);
    }

    #[test]
    fn from_seconds_clamps_negative() {
        assert_eq!(SrtTimestamp::from_seconds(-1.0), SrtTimestamp::ZERO);
    }
}
