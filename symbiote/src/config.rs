//! Session configuration.

use crate::Error;
use std::{fmt, str::FromStr, time::Duration};

/// When the generator hands its role to the other peer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Policy {
    /// Each peer runs all of its trials for a topic before handing over.
    #[default]
    PerTopic,
    /// Roles alternate after every trial.
    PerTrial,
    /// Only First generates.
    Never,
}

impl FromStr for Policy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "per-topic" => Ok(Self::PerTopic),
            "per-trial" => Ok(Self::PerTrial),
            "never" => Ok(Self::Never),
            _ => Err(Error::InvalidPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PerTopic => "per-topic",
            Self::PerTrial => "per-trial",
            Self::Never => "never",
        })
    }
}

/// Configuration for a session.
///
/// # Warning
///
/// `trials`, `policy`, and `max_message_size` should match on both peers. Mismatched values do not
/// break a session but make the two reports harder to compare.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of trials each peer generates per topic.
    ///
    /// Topics with fewer distinct values run fewer trials.
    pub trials: usize,

    /// How long to wait for the peer before aborting the session.
    pub timeout: Duration,

    /// When to hand the generator role to the other peer.
    pub policy: Policy,

    /// Failed trials tolerated per topic before the session is aborted.
    ///
    /// `None` never aborts on failures.
    pub max_failures: Option<usize>,

    /// Seed for value generation.
    pub seed: u64,

    /// Maximum size of a framed message on stream transports.
    pub max_message_size: usize,

    /// Messages buffered by in-process channels.
    pub mailbox_size: usize,
}

impl Config {
    /// Generates a configuration with reasonable defaults for testing another implementation.
    pub fn recommended(seed: u64) -> Self {
        Self {
            trials: 100,
            timeout: Duration::from_secs(10),
            policy: Policy::PerTopic,
            max_failures: None,
            seed,
            max_message_size: 1024 * 1024,
            mailbox_size: 1_024,
        }
    }

    /// Generates a small, fast configuration for tests.
    pub fn test(seed: u64) -> Self {
        Self {
            trials: 8,
            timeout: Duration::from_secs(1),
            policy: Policy::PerTopic,
            max_failures: None,
            seed,
            max_message_size: 64 * 1024,
            mailbox_size: 64,
        }
    }
}

/// Parses durations such as `"5"`, `"500ms"`, `"1.5s"`, `"2m"`, or `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration, Error> {
    let s = s.trim();
    let invalid = || Error::InvalidDuration(s.to_string());

    // Bare numbers are seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    if let Some(ms) = s.strip_suffix("ms") {
        return ms.parse::<u64>().map(Duration::from_millis).map_err(|_| invalid());
    }
    if let Some(secs) = s.strip_suffix('s') {
        let secs = secs.parse::<f64>().map_err(|_| invalid())?;
        return Duration::try_from_secs_f64(secs).map_err(|_| invalid());
    }
    if let Some(mins) = s.strip_suffix('m') {
        let mins = mins.parse::<u64>().map_err(|_| invalid())?;
        return mins
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(invalid);
    }
    if let Some(hours) = s.strip_suffix('h') {
        let hours = hours.parse::<u64>().map_err(|_| invalid())?;
        return hours
            .checked_mul(3600)
            .map(Duration::from_secs)
            .ok_or_else(invalid);
    }
    Err(invalid())
}
