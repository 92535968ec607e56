//! Results of a session.

use crate::topic::{AvailableTopics, Topic};
use serde::Serialize;
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

/// The two sides of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    /// Opens the session and advertises topics first.
    First,
    /// Accepts the session and picks the topics to start.
    Second,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::Second => "second",
        })
    }
}

/// Trial outcomes for one topic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
    /// Trials cut short by the session ending.
    pub aborted: usize,
}

impl Tally {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.aborted
    }
}

/// Reason a session ended early.
#[derive(Error, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Abort {
    #[error("no usable topics in common")]
    BadTopics(AvailableTopics),
    #[error("start topics were not a subset of ours")]
    BadStartSubset,
    #[error("timed out waiting for peer")]
    Timeout { topic: Option<Topic> },
    #[error("channel error: {0}")]
    Channel(String),
    #[error("codec error: {0}")]
    Codec(String),
    #[error("unexpected message: {0}")]
    UnexpectedMessage(&'static str),
    #[error("too many failed trials in {topic}")]
    TooManyFailures { topic: Topic },
    #[error("unknown topic: {0}")]
    UnknownTopic(Topic),
}

impl From<crate::channel::Error> for Abort {
    fn from(e: crate::channel::Error) -> Self {
        Self::Channel(e.to_string())
    }
}

impl From<symbiote_codec::Error> for Abort {
    fn from(e: symbiote_codec::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

/// Everything one peer observed during a session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub party: Party,
    pub encoding: &'static str,
    /// Tallies for every negotiated topic, including topics never reached.
    pub topics: BTreeMap<Topic, Tally>,
    pub abort: Option<Abort>,
}

impl Report {
    /// Sum of the tallies of every topic.
    pub fn total(&self) -> Tally {
        self.topics.values().fold(Tally::default(), |acc, tally| Tally {
            passed: acc.passed + tally.passed,
            failed: acc.failed + tally.failed,
            aborted: acc.aborted + tally.aborted,
        })
    }

    /// Returns true if the session completed with no failed or aborted trials.
    pub fn is_success(&self) -> bool {
        let total = self.total();
        self.abort.is_none() && total.failed == 0 && total.aborted == 0
    }
}
