//! Run simulated users concurrently against the pet-store API and print metrics.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::{self, Config, WaitTime};
use crate::events::{Environment, EventBus};
use crate::http::HttpRemote;
use crate::stats::Stats;
use crate::task::{TASKS, TaskSet};
use crate::user::{Shared, SimulatedUser};

/// A builder for creating a [`LoadTest`].
#[derive(Debug)]
pub struct LoadTestBuilder {
    remote: HttpRemote,
    users: usize,
    spawn_rate: f64,
    run_time: Option<Duration>,
    wait_time: WaitTime,
    headless: bool,
    events: EventBus,
}

impl LoadTestBuilder {
    /// The number of users running concurrently once ramp-up is complete.
    pub fn users(mut self, users: usize) -> Self {
        self.users = users;
        self
    }

    /// The number of users started per second during ramp-up.
    pub fn spawn_rate(mut self, spawn_rate: f64) -> Self {
        self.spawn_rate = spawn_rate;
        self
    }

    /// Stops the test after `run_time`. Without it, the test runs until Ctrl-C.
    pub fn run_time(mut self, run_time: impl Into<Option<Duration>>) -> Self {
        self.run_time = run_time.into();
        self
    }

    /// Bounds of the random pause between two requests of a user.
    pub fn wait_time(mut self, min: Duration, max: Duration) -> Self {
        self.wait_time = WaitTime { min, max };
        self
    }

    /// Disables the progress spinner.
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Listeners to notify about lifecycle events.
    pub fn events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Creates the load test instance.
    pub fn build(self) -> LoadTest {
        LoadTest {
            remote: self.remote,
            users: self.users.max(1),
            spawn_rate: self.spawn_rate,
            run_time: self.run_time,
            wait_time: self.wait_time,
            headless: self.headless,
            events: self.events,
        }
    }
}

/// A load test that can be run against the pet-store API.
#[derive(Debug)]
pub struct LoadTest {
    remote: HttpRemote,
    users: usize,
    spawn_rate: f64,
    run_time: Option<Duration>,
    wait_time: WaitTime,
    headless: bool,
    events: EventBus,
}

impl LoadTest {
    /// Constructs a new load test builder against the given remote.
    pub fn builder(remote: HttpRemote) -> LoadTestBuilder {
        let defaults = Config::default();
        LoadTestBuilder {
            remote,
            users: defaults.users,
            spawn_rate: defaults.spawn_rate,
            run_time: defaults.run_time,
            wait_time: defaults.wait_time,
            headless: defaults.headless,
            events: EventBus::default(),
        }
    }

    /// Runs the load test until the run time elapses or Ctrl-C is pressed.
    ///
    /// Users are started at the configured spawn rate. On stop, all users are cancelled, in-flight
    /// requests are abandoned, and the report is printed. The returned [`Stats`] hold the counters
    /// of all completed requests.
    pub async fn run(self) -> Result<Arc<Stats>> {
        let spawn_interval = config::spawn_interval(self.spawn_rate)
            .with_context(|| format!("invalid spawn rate: {}", self.spawn_rate))?;
        let tasks = TaskSet::new(TASKS).context("invalid task weights")?;

        let environment = Environment {
            host: self.remote.host().to_owned(),
            users: self.users,
            run_time: self.run_time,
        };
        let stats = Arc::new(Stats::default());
        let shared = Arc::new(Shared {
            remote: self.remote,
            tasks,
            wait_time: self.wait_time,
            stats: Arc::clone(&stats),
            events: self.events,
        });

        shared.events.test_started(&environment);

        let bar = if self.headless {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
                .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
        };
        bar.enable_steady_tick(Duration::from_millis(100));

        let start = Instant::now();
        let token = CancellationToken::new();
        let mut users = JoinSet::new();
        let mut spawned = 0;

        let mut spawn_tick = tokio::time::interval(spawn_interval);
        let mut refresh_tick = tokio::time::interval(Duration::from_millis(250));

        let stop = stop_signal(self.run_time);
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = spawn_tick.tick(), if spawned < self.users => {
                    let user = SimulatedUser::new(spawned, Arc::clone(&shared));
                    users.spawn(user.run(token.child_token()));
                    spawned += 1;
                }
                _ = refresh_tick.tick() => {
                    bar.set_message(format!(
                        "Running load test: {spawned}/{} users, {} requests, {} failures,",
                        self.users,
                        stats.total_requests(),
                        stats.total_failures(),
                    ));
                }
            }
        }

        token.cancel();
        while let Some(result) = users.join_next().await {
            if let Err(error) = result {
                tracing::error!(error = &error as &dyn std::error::Error, "simulated user crashed");
            }
        }
        bar.finish_and_clear();

        let duration = start.elapsed();
        shared.events.test_stopped(&environment);
        stats.print_report(duration);

        Ok(stats)
    }
}

/// Resolves after `run_time`, or when Ctrl-C is pressed.
async fn stop_signal(run_time: Option<Duration>) {
    let interrupted = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Interrupted, stopping load test"),
            // Without a signal handler, only the run time can stop the test.
            Err(error) => {
                tracing::error!(error = &error as &dyn std::error::Error, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    };

    match run_time {
        Some(run_time) => {
            tokio::select! {
                _ = tokio::time::sleep(run_time) => {}
                _ = interrupted => {}
            }
        }
        None => interrupted.await,
    }
}
