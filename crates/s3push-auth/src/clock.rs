//! Request timestamps.
//!
//! Every signed request carries a timestamp in the compact ISO-8601 basic
//! format (`YYYYMMDDThhmmssZ`); the credential scope uses its first eight
//! characters as the date. [`ClockReading`] keeps both and guarantees the date
//! is always a prefix of the timestamp.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::AuthError;

/// `strftime` pattern of the `x-amz-date` timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// A single reading of the clock: the request timestamp and its date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockReading {
    timestamp: String,
}

impl ClockReading {
    /// Build a reading from a UTC instant.
    #[must_use]
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self {
            timestamp: instant.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Parse a reading from a compact ISO-8601 timestamp such as `20150830T123600Z`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidTimestamp`] if the value is not in that format.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3push_auth::clock::ClockReading;
    ///
    /// let reading = ClockReading::parse("20150830T123600Z").unwrap();
    /// assert_eq!(reading.date(), "20150830");
    /// assert!(ClockReading::parse("2015-08-30T12:36:00Z").is_err());
    /// ```
    pub fn parse(timestamp: &str) -> Result<Self, AuthError> {
        let parsed = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|_| AuthError::InvalidTimestamp(timestamp.to_owned()))?;
        Ok(Self::from_datetime(parsed.and_utc()))
    }

    /// The full timestamp, e.g. `20150830T123600Z`.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// The date component, e.g. `20150830`.
    #[must_use]
    pub fn date(&self) -> &str {
        &self.timestamp[..8]
    }
}

impl fmt::Display for ClockReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.timestamp)
    }
}

/// Source of request timestamps.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Read the clock.
    fn now(&self) -> ClockReading;
}

/// The system wall clock, in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> ClockReading {
        ClockReading::from_datetime(Utc::now())
    }
}

/// A clock frozen at one reading, for deterministic signatures.
#[derive(Debug, Clone)]
pub struct FixedClock {
    reading: ClockReading,
}

impl FixedClock {
    /// Freeze the clock at `reading`.
    #[must_use]
    pub fn new(reading: ClockReading) -> Self {
        Self { reading }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> ClockReading {
        self.reading.clone()
    }
}
