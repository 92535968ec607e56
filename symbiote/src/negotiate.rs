//! Agree on the topics two peers will test.
//!
//! Second computes the topics both peers can test from First's advertisement. Size hints must
//! match exactly for a shared topic to be usable.

use crate::topic::{AvailableTopics, Topic};
use std::collections::BTreeSet;

/// Progress of topic negotiation for one session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Negotiation {
    /// Topics have been (or are about to be) advertised but not agreed.
    #[default]
    Advertising,
    /// Both peers agreed to test these topics, in order.
    Negotiated(BTreeSet<Topic>),
}

impl Negotiation {
    /// Records the agreed topics.
    pub fn negotiate(&mut self, topics: BTreeSet<Topic>) {
        *self = Self::Negotiated(topics);
    }

    pub fn topics(&self) -> Option<&BTreeSet<Topic>> {
        match self {
            Self::Advertising => None,
            Self::Negotiated(topics) => Some(topics),
        }
    }
}

/// Selects the topics shared by `theirs` and `ours`.
///
/// On failure, returns the topics to report in `BadTopics`: the shared topics whose size hints
/// disagree (with our sizes), or all of ours if nothing is shared.
pub fn select(
    theirs: &AvailableTopics,
    ours: &AvailableTopics,
) -> Result<BTreeSet<Topic>, AvailableTopics> {
    let mut shared = BTreeSet::new();
    let mut mismatched = AvailableTopics::new();
    for (topic, size) in theirs.iter() {
        let Some(our_size) = ours.get(topic) else {
            continue;
        };
        if our_size != *size {
            mismatched.insert(topic.clone(), our_size);
            continue;
        }
        shared.insert(topic.clone());
    }
    if !mismatched.is_empty() {
        return Err(mismatched);
    }
    if shared.is_empty() {
        return Err(ours.clone());
    }
    Ok(shared)
}

/// Returns whether `start` is a non-empty subset of the topics in `ours`.
pub fn validate_start(start: &BTreeSet<Topic>, ours: &AvailableTopics) -> bool {
    !start.is_empty() && start.iter().all(|topic| ours.contains(topic))
}
