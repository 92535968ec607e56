//! The protocol state machine.
//!
//! A session walks both peers through topic negotiation and then through every negotiated topic in
//! order. For each topic, the two peers take turns as generator and operator:
//!
//! ```txt
//! Generate -> AwaitOperated -> Verify -> (Generate | AwaitGenerated)
//! AwaitGenerated -> (AwaitGenerated | Generate | Finished)
//! ```
//!
//! First is the initial generator of every topic. Both peers keep their own [Tally] of the trials
//! they took part in. Parse failures and mismatched results are reported to the peer and counted as
//! failed trials; only negotiation failures, timeouts, channel errors, and protocol violations end
//! the session early.

use crate::{
    channel::Channel,
    config::{Config, Policy},
    encoding::Encoding,
    message::{First, Generating, Operating, Second},
    negotiate::{self, Negotiation},
    registry::{Registry, Suite, Trial, Verdict},
    report::{Abort, Party, Report, Tally},
    topic::Topic,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet};
use symbiote_codec::Codec;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Per-topic message received from the peer.
enum Turn<P> {
    Generating(Generating<P>),
    Operating(Operating<P>),
}

impl<P> Turn<P> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Generating(generating) => generating.kind(),
            Self::Operating(operating) => operating.kind(),
        }
    }
}

/// Where a peer is within the current topic.
enum Phase<P> {
    /// Generator: about to run a trial or hand over.
    Generate,
    /// Generator: waiting for the operator's reply to this trial.
    AwaitOperated(Trial<P>),
    /// Generator: checking the operator's output.
    Verify(Trial<P>, P),
    /// Operator: waiting for the generator's next message.
    AwaitGenerated,
    Finished,
}

/// Bookkeeping for one topic.
#[derive(Default)]
struct Progress {
    /// Trials this peer may still generate.
    remaining: usize,
    /// Whether the peer handed us the generator role in this topic.
    handed: bool,
    /// A generated trial awaiting its outcome.
    in_flight: bool,
    /// An `Operated` reply awaiting the generator's verdict.
    provisional: bool,
}

impl Progress {
    /// Trials that cannot be settled if the session stops now.
    fn unsettled(&self) -> usize {
        usize::from(self.in_flight) + usize::from(self.provisional)
    }
}

/// One peer's side of a session.
pub(crate) struct Session<'a, E: Encoding, C> {
    party: Party,
    registry: &'a Registry<E>,
    config: &'a Config,
    channel: &'a mut C,
    rng: ChaCha8Rng,
    negotiation: Negotiation,
    tallies: BTreeMap<Topic, Tally>,
}

impl<'a, E, C> Session<'a, E, C>
where
    E: Encoding,
    C: Channel<E::Payload>,
{
    pub(crate) fn new(
        party: Party,
        registry: &'a Registry<E>,
        config: &'a Config,
        channel: &'a mut C,
    ) -> Self {
        // Each party draws from its own stream so the two peers never generate identical sequences.
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        rng.set_stream(match party {
            Party::First => 0,
            Party::Second => 1,
        });
        Self {
            party,
            registry,
            config,
            channel,
            rng,
            negotiation: Negotiation::default(),
            tallies: BTreeMap::new(),
        }
    }

    /// Runs the session to completion, returning whatever was observed.
    pub(crate) async fn run(mut self) -> Report {
        let result = match self.party {
            Party::First => self.open().await,
            Party::Second => self.accept().await,
        };
        let abort = match result {
            Ok(()) => None,
            Err(abort) => {
                warn!(party = %self.party, reason = %abort, "session aborted");
                Some(abort)
            }
        };
        Report {
            party: self.party,
            encoding: E::NAME,
            topics: self.tallies,
            abort,
        }
    }

    /// Advertises our topics and waits for Second to pick the ones to test.
    async fn open(&mut self) -> Result<(), Abort> {
        let ours = self.registry.available();
        debug!(topics = ours.len(), "advertising topics");
        self.send(None, &First::<E::Payload>::Topics(ours.clone()))
            .await?;
        let payload = self.recv(None).await?;
        match E::decode::<Second<E::Payload>>(&payload)? {
            Second::BadTopics(topics) => Err(Abort::BadTopics(topics)),
            Second::Start(topics) => {
                if !negotiate::validate_start(&topics, &ours) {
                    self.send(None, &First::<E::Payload>::BadStartSubset)
                        .await?;
                    return Err(Abort::BadStartSubset);
                }
                self.negotiation.negotiate(topics);
                self.test_all().await
            }
            other => Err(Abort::UnexpectedMessage(other.kind())),
        }
    }

    /// Waits for First's topics and starts the ones we share.
    async fn accept(&mut self) -> Result<(), Abort> {
        let payload = self.recv(None).await?;
        let theirs = match E::decode::<First<E::Payload>>(&payload)? {
            First::Topics(topics) => topics,
            other => return Err(Abort::UnexpectedMessage(other.kind())),
        };
        let ours = self.registry.available();
        match negotiate::select(&theirs, &ours) {
            Ok(topics) => {
                self.send(None, &Second::<E::Payload>::Start(topics.clone()))
                    .await?;
                self.negotiation.negotiate(topics);
                self.test_all().await
            }
            Err(bad) => {
                self.send(None, &Second::<E::Payload>::BadTopics(bad.clone()))
                    .await?;
                Err(Abort::BadTopics(bad))
            }
        }
    }

    async fn test_all(&mut self) -> Result<(), Abort> {
        let topics: BTreeSet<Topic> = self.negotiation.topics().cloned().unwrap_or_default();
        info!(party = %self.party, topics = topics.len(), "negotiated topics");
        for topic in &topics {
            self.tallies.insert(topic.clone(), Tally::default());
        }
        for topic in &topics {
            self.test_topic(topic).await?;
        }
        Ok(())
    }

    async fn test_topic(&mut self, topic: &Topic) -> Result<(), Abort> {
        let registry = self.registry;
        let suite = registry
            .lookup(topic)
            .ok_or_else(|| Abort::UnknownTopic(topic.clone()))?;
        let mut progress = Progress {
            remaining: suite.limit().map_or(self.config.trials, |limit| {
                limit.min(self.config.trials)
            }),
            ..Default::default()
        };
        let mut phase = match self.party {
            Party::First => Phase::Generate,
            Party::Second => Phase::AwaitGenerated,
        };
        debug!(party = %self.party, %topic, trials = progress.remaining, "testing topic");

        loop {
            let step = match phase {
                Phase::Generate => self.generate(topic, suite, &mut progress).await,
                Phase::AwaitOperated(trial) => {
                    self.await_operated(topic, trial, &mut progress).await
                }
                Phase::Verify(trial, output) => {
                    self.verify(topic, suite, trial, output, &mut progress)
                        .await
                }
                Phase::AwaitGenerated => self.await_generated(topic, suite, &mut progress).await,
                Phase::Finished => break,
            };
            phase = match step {
                Ok(next) => next,
                Err(abort) => {
                    // A peer that stops answering fails the trial it left open.
                    let tally = self.tally(topic);
                    if let Abort::Timeout { .. } = abort {
                        tally.failed += progress.unsettled();
                    } else {
                        tally.aborted += progress.unsettled();
                    }
                    return Err(abort);
                }
            };
        }

        let party = self.party;
        let tally = self.tally(topic);
        info!(
            %party,
            %topic,
            passed = tally.passed,
            failed = tally.failed,
            "topic finished"
        );
        Ok(())
    }

    /// Runs the next trial, or hands over the generator role when none remain.
    async fn generate(
        &mut self,
        topic: &Topic,
        suite: &dyn Suite<E>,
        progress: &mut Progress,
    ) -> Result<Phase<E::Payload>, Abort> {
        if progress.remaining == 0 {
            if self.config.policy == Policy::PerTopic && !progress.handed {
                self.send_generating(topic, Generating::YourTurn).await?;
                return Ok(Phase::AwaitGenerated);
            }
            self.send_generating(topic, Generating::ImFinished).await?;
            return Ok(Phase::Finished);
        }

        let trial = suite.generate(self.rng.gen());
        progress.remaining -= 1;
        progress.in_flight = true;
        self.send_generating(
            topic,
            Generating::Generated {
                value: trial.value.clone(),
                operation: trial.operation.clone(),
            },
        )
        .await?;
        Ok(Phase::AwaitOperated(trial))
    }

    async fn await_operated(
        &mut self,
        topic: &Topic,
        trial: Trial<E::Payload>,
        progress: &mut Progress,
    ) -> Result<Phase<E::Payload>, Abort> {
        let operating = match self.recv_turn(topic).await? {
            Turn::Operating(operating) => operating,
            Turn::Generating(Generating::ImFinished) => {
                // The peer ended the topic early, leaving this trial unanswered.
                info!(party = %self.party, %topic, "peer finished topic early");
                progress.in_flight = false;
                self.tally(topic).aborted += 1;
                return Ok(Phase::Finished);
            }
            other => return Err(Abort::UnexpectedMessage(other.kind())),
        };
        match operating {
            Operating::Operated(output) => Ok(Phase::Verify(trial, output)),
            rejected => {
                // The peer could not parse what we generated.
                warn!(party = %self.party, %topic, reason = rejected.kind(), value = ?trial.value, "trial failed");
                progress.in_flight = false;
                self.fail(topic)?;
                self.conclude(topic).await
            }
        }
    }

    async fn verify(
        &mut self,
        topic: &Topic,
        suite: &dyn Suite<E>,
        trial: Trial<E::Payload>,
        output: E::Payload,
        progress: &mut Progress,
    ) -> Result<Phase<E::Payload>, Abort> {
        progress.in_flight = false;
        let reply = match suite.verify(&trial, &output) {
            Verdict::Passed => {
                self.tally(topic).passed += 1;
                None
            }
            Verdict::BadResult => Some(Generating::BadResult(output)),
            Verdict::NoParseOperated => Some(Generating::NoParseOperated(output)),
        };
        if let Some(reply) = reply {
            warn!(party = %self.party, %topic, reason = reply.kind(), value = ?trial.value, "trial failed");
            self.tally(topic).failed += 1;
            self.send_generating(topic, reply).await?;
            self.check_failures(topic)?;
        }
        self.conclude(topic).await
    }

    /// Picks the next phase after a trial completes.
    async fn conclude(&mut self, topic: &Topic) -> Result<Phase<E::Payload>, Abort> {
        if self.config.policy == Policy::PerTrial {
            self.send_generating(topic, Generating::YourTurn).await?;
            return Ok(Phase::AwaitGenerated);
        }
        Ok(Phase::Generate)
    }

    async fn await_generated(
        &mut self,
        topic: &Topic,
        suite: &dyn Suite<E>,
        progress: &mut Progress,
    ) -> Result<Phase<E::Payload>, Abort> {
        let generating = match self.recv_turn(topic).await? {
            Turn::Generating(generating) => generating,
            other => return Err(Abort::UnexpectedMessage(other.kind())),
        };

        // Settle the previous reply: only a rejection from the generator fails it.
        if let Generating::BadResult(_) | Generating::NoParseOperated(_) = generating {
            if !progress.provisional {
                return Err(Abort::UnexpectedMessage(generating.kind()));
            }
            progress.provisional = false;
            warn!(party = %self.party, %topic, reason = generating.kind(), "trial failed");
            self.fail(topic)?;
            return Ok(Phase::AwaitGenerated);
        }
        if progress.provisional {
            progress.provisional = false;
            self.tally(topic).passed += 1;
        }

        match generating {
            Generating::Generated { value, operation } => {
                let reply = suite.operate(&value, &operation);
                if let Operating::Operated(_) = reply {
                    progress.provisional = true;
                } else {
                    warn!(party = %self.party, %topic, reason = reply.kind(), ?value, "trial failed");
                    self.tally(topic).failed += 1;
                }
                self.send_operating(topic, reply).await?;
                self.check_failures(topic)?;
                Ok(Phase::AwaitGenerated)
            }
            Generating::YourTurn => {
                progress.handed = true;
                Ok(Phase::Generate)
            }
            Generating::ImFinished => Ok(Phase::Finished),
            rejected @ (Generating::BadResult(_) | Generating::NoParseOperated(_)) => {
                Err(Abort::UnexpectedMessage(rejected.kind()))
            }
        }
    }

    fn tally(&mut self, topic: &Topic) -> &mut Tally {
        self.tallies.entry(topic.clone()).or_default()
    }

    /// Records a failed trial.
    fn fail(&mut self, topic: &Topic) -> Result<(), Abort> {
        self.tally(topic).failed += 1;
        self.check_failures(topic)
    }

    fn check_failures(&mut self, topic: &Topic) -> Result<(), Abort> {
        let Some(max) = self.config.max_failures else {
            return Ok(());
        };
        if self.tally(topic).failed > max {
            return Err(Abort::TooManyFailures {
                topic: topic.clone(),
            });
        }
        Ok(())
    }

    async fn send_generating(
        &mut self,
        topic: &Topic,
        generating: Generating<E::Payload>,
    ) -> Result<(), Abort> {
        debug!(party = %self.party, %topic, kind = generating.kind(), "sending");
        match self.party {
            Party::First => {
                let message = First::FirstGenerating {
                    topic: topic.clone(),
                    generating,
                };
                self.send(Some(topic), &message).await
            }
            Party::Second => {
                self.send(Some(topic), &Second::SecondGenerating(generating))
                    .await
            }
        }
    }

    async fn send_operating(
        &mut self,
        topic: &Topic,
        operating: Operating<E::Payload>,
    ) -> Result<(), Abort> {
        debug!(party = %self.party, %topic, kind = operating.kind(), "sending");
        match self.party {
            Party::First => {
                let message = First::FirstOperating {
                    topic: topic.clone(),
                    operating,
                };
                self.send(Some(topic), &message).await
            }
            Party::Second => {
                self.send(Some(topic), &Second::SecondOperating(operating))
                    .await
            }
        }
    }

    /// Receives the peer's next message for `topic`.
    async fn recv_turn(&mut self, topic: &Topic) -> Result<Turn<E::Payload>, Abort> {
        let payload = self.recv(Some(topic)).await?;
        match self.party {
            Party::First => match E::decode::<Second<E::Payload>>(&payload)? {
                Second::SecondGenerating(generating) => Ok(Turn::Generating(generating)),
                Second::SecondOperating(operating) => Ok(Turn::Operating(operating)),
                other => Err(Abort::UnexpectedMessage(other.kind())),
            },
            Party::Second => match E::decode::<First<E::Payload>>(&payload)? {
                First::FirstGenerating {
                    topic: received,
                    generating,
                } if received == *topic => Ok(Turn::Generating(generating)),
                First::FirstOperating {
                    topic: received,
                    operating,
                } if received == *topic => Ok(Turn::Operating(operating)),
                First::BadStartSubset => Err(Abort::BadStartSubset),
                other => Err(Abort::UnexpectedMessage(other.kind())),
            },
        }
    }

    async fn send<M: Codec>(&mut self, topic: Option<&Topic>, message: &M) -> Result<(), Abort> {
        let payload = E::encode(message);
        match timeout(self.config.timeout, self.channel.send(payload)).await {
            Ok(result) => result.map_err(Abort::from),
            Err(_) => Err(Abort::Timeout {
                topic: topic.cloned(),
            }),
        }
    }

    async fn recv(&mut self, topic: Option<&Topic>) -> Result<E::Payload, Abort> {
        match timeout(self.config.timeout, self.channel.recv()).await {
            Ok(result) => result.map_err(Abort::from),
            Err(_) => Err(Abort::Timeout {
                topic: topic.cloned(),
            }),
        }
    }
}
