//! A single simulated user and its request loop.

use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::config::WaitTime;
use crate::events::{EventBus, RequestEvent, UserStart};
use crate::http::HttpRemote;
use crate::outcome::{Failure, Outcome};
use crate::stats::Stats;
use crate::task::{Task, TaskSet};

/// State shared by all users of one load test.
#[derive(Debug)]
pub(crate) struct Shared {
    pub remote: HttpRemote,
    pub tasks: TaskSet,
    pub wait_time: WaitTime,
    pub stats: Arc<Stats>,
    pub events: EventBus,
}

/// One virtual client, looping over weighted random tasks until cancelled.
#[derive(Debug)]
pub(crate) struct SimulatedUser {
    id: usize,
    shared: Arc<Shared>,
    rng: SmallRng,
}

impl SimulatedUser {
    pub fn new(id: usize, shared: Arc<Shared>) -> Self {
        Self {
            id,
            shared,
            rng: SmallRng::seed_from_u64(rand::random()),
        }
    }

    /// Runs the request loop until `token` is cancelled.
    ///
    /// A request or pause that is in progress on cancellation is abandoned, and the abandoned
    /// request is not reported.
    pub async fn run(mut self, token: CancellationToken) {
        self.shared.events.user_started(&UserStart { user_id: self.id });

        loop {
            let task = self.shared.tasks.sample(&mut self.rng);
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = self.execute(task) => {}
            }

            let pause = self.shared.wait_time.sample(&mut self.rng);
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    async fn execute(&self, task: Task) {
        let mut scope = RequestScope::new(self.id, task.name(), &self.shared);

        match self.shared.remote.execute(task).await {
            Ok(response) => {
                let outcome = task.validate(response.status, &response.body);
                scope.complete(Some(response.status), outcome);
            }
            Err(error) => {
                let failure = Failure::Transport(error.to_string());
                scope.complete(error.status(), Err(failure));
            }
        }
    }
}

/// Measures a single request and reports it when dropped.
///
/// The report goes to the [`Stats`] aggregator and the request listeners. A scope that is dropped
/// before [`complete`](Self::complete) was called reports nothing.
pub(crate) struct RequestScope<'a> {
    user_id: usize,
    name: &'static str,
    start: Instant,
    shared: &'a Shared,
    result: Option<(Option<StatusCode>, Outcome)>,
}

impl<'a> RequestScope<'a> {
    pub fn new(user_id: usize, name: &'static str, shared: &'a Shared) -> Self {
        Self {
            user_id,
            name,
            start: Instant::now(),
            shared,
            result: None,
        }
    }

    /// Sets the status and outcome to report. A later call replaces an earlier one.
    pub fn complete(&mut self, status: Option<StatusCode>, outcome: Outcome) {
        self.result = Some((status, outcome));
    }
}

impl Drop for RequestScope<'_> {
    fn drop(&mut self) {
        let Some((status, outcome)) = self.result.take() else {
            return;
        };

        let event = RequestEvent {
            user_id: self.user_id,
            name: self.name,
            elapsed: self.start.elapsed(),
            status,
            outcome,
        };
        self.shared.stats.record(&event);
        self.shared.events.request_completed(&event);
    }
}
