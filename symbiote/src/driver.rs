//! Run sessions and collect their reports.

use crate::{
    channel::Channel,
    config::Config,
    encoding::Encoding,
    registry::Registry,
    report::{Party, Report},
    session::Session,
};
use std::sync::Arc;
use tracing::info;

/// Runs sessions against a shared, read-only [Registry].
pub struct Driver<E: Encoding> {
    registry: Arc<Registry<E>>,
    config: Config,
}

impl<E: Encoding> Clone for Driver<E> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            config: self.config.clone(),
        }
    }
}

impl<E: Encoding> Driver<E> {
    pub fn new(registry: Arc<Registry<E>>, config: Config) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Opens a session over `channel` as First.
    pub async fn first<C: Channel<E::Payload>>(&self, channel: C) -> Report {
        self.run(Party::First, channel).await
    }

    /// Accepts a session over `channel` as Second.
    pub async fn second<C: Channel<E::Payload>>(&self, channel: C) -> Report {
        self.run(Party::Second, channel).await
    }

    async fn run<C: Channel<E::Payload>>(&self, party: Party, mut channel: C) -> Report {
        let report = Session::new(party, &self.registry, &self.config, &mut channel)
            .run()
            .await;
        channel.close().await;

        let total = report.total();
        info!(
            %party,
            encoding = E::NAME,
            topics = report.topics.len(),
            passed = total.passed,
            failed = total.failed,
            aborted = total.aborted,
            abort = ?report.abort,
            "session finished"
        );
        report
    }
}
