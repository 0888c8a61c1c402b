//! Lifecycle hooks of a load test.
//!
//! Listeners are registered on an [`EventBus`] before the test starts. The bus is then shared
//! read-only between all simulated users, so listeners must be `Send + Sync` and must not block.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;

use crate::outcome::Outcome;

/// Describes the load test, passed to test start and stop listeners.
#[derive(Clone, Debug)]
pub struct Environment {
    /// The base URL of the target API.
    pub host: String,
    /// The number of simulated users.
    pub users: usize,
    /// How long the test runs, or `None` if it runs until interrupted.
    pub run_time: Option<Duration>,
}

/// Passed to listeners when a simulated user starts.
#[derive(Clone, Debug)]
pub struct UserStart {
    /// Sequential ID of the user, starting at `0`.
    pub user_id: usize,
}

/// A completed request, passed to request listeners.
#[derive(Clone, Debug)]
pub struct RequestEvent {
    /// The ID of the user that issued the request.
    pub user_id: usize,
    /// The name the request is reported under.
    pub name: &'static str,
    /// Time from sending the request until the body was read.
    pub elapsed: Duration,
    /// The status code, if a response was received.
    pub status: Option<StatusCode>,
    /// The classification of the request.
    pub outcome: Outcome,
}

type Listener<T> = Box<dyn Fn(&T) + Send + Sync>;

/// A registry of lifecycle listeners.
///
/// Listeners of the same event are called in the order they were registered.
#[derive(Default)]
pub struct EventBus {
    test_start: Vec<Listener<Environment>>,
    test_stop: Vec<Listener<Environment>>,
    user_start: Vec<Listener<UserStart>>,
    request: Vec<Listener<RequestEvent>>,
}

impl EventBus {
    /// Registers a listener called once before the first user is started.
    pub fn on_test_start(&mut self, f: impl Fn(&Environment) + Send + Sync + 'static) -> &mut Self {
        self.test_start.push(Box::new(f));
        self
    }

    /// Registers a listener called once after all users have stopped.
    pub fn on_test_stop(&mut self, f: impl Fn(&Environment) + Send + Sync + 'static) -> &mut Self {
        self.test_stop.push(Box::new(f));
        self
    }

    /// Registers a listener called when a simulated user starts.
    pub fn on_user_start(&mut self, f: impl Fn(&UserStart) + Send + Sync + 'static) -> &mut Self {
        self.user_start.push(Box::new(f));
        self
    }

    /// Registers a listener called after every completed request.
    pub fn on_request(&mut self, f: impl Fn(&RequestEvent) + Send + Sync + 'static) -> &mut Self {
        self.request.push(Box::new(f));
        self
    }

    pub(crate) fn test_started(&self, environment: &Environment) {
        self.test_start.iter().for_each(|f| f(environment));
    }

    pub(crate) fn test_stopped(&self, environment: &Environment) {
        self.test_stop.iter().for_each(|f| f(environment));
    }

    pub(crate) fn user_started(&self, user: &UserStart) {
        self.user_start.iter().for_each(|f| f(user));
    }

    pub(crate) fn request_completed(&self, event: &RequestEvent) {
        self.request.iter().for_each(|f| f(event));
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("test_start", &self.test_start.len())
            .field("test_stop", &self.test_stop.len())
            .field("user_start", &self.user_start.len())
            .field("request", &self.request.len())
            .finish()
    }
}
