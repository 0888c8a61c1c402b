//! Default logging listeners for the pet-store load test.

use crate::events::{Environment, EventBus, RequestEvent, UserStart};
use crate::outcome::FailureKind;
use crate::task::{PET_ID, PET_STATUS};

/// Registers the console logging listeners on `events`.
pub fn register(events: &mut EventBus) {
    events
        .on_test_start(test_started)
        .on_test_stop(test_stopped)
        .on_user_start(user_started)
        .on_request(request_completed);
}

fn test_started(environment: &Environment) {
    tracing::info!("Starting Petstore API Load Test");
    tracing::info!("Target: {}", environment.host);
    tracing::info!("Endpoints to test:");
    tracing::info!("  - GET /pet/{PET_ID}");
    tracing::info!("  - GET /pet/findByStatus?status={PET_STATUS}");
    tracing::info!("  - GET /");
    match environment.run_time {
        Some(run_time) => tracing::info!(
            "Running {} users for {}",
            environment.users,
            humantime::format_duration(run_time)
        ),
        None => tracing::info!("Running {} users until interrupted", environment.users),
    }
}

fn test_stopped(_environment: &Environment) {
    tracing::info!("Petstore API Load Test Completed");
}

fn user_started(user: &UserStart) {
    tracing::info!("Starting user: {}", user.user_id);
}

fn request_completed(event: &RequestEvent) {
    let name = event.name;
    let user = event.user_id;

    match &event.outcome {
        Ok(success) => tracing::info!(user, "{success}"),
        Err(failure) if failure.kind() == FailureKind::Transport => {
            tracing::warn!(user, "Request failed: {name} - {failure}");
            return;
        }
        Err(failure) => tracing::warn!(user, "Request failure: {name} - {failure}"),
    }

    // Reported for every error status, including those a task accepts.
    if let Some(status) = event.status.filter(|status| status.as_u16() >= 400) {
        tracing::warn!(user, "Request error: {name} - Status: {}", status.as_u16());
    }
}
