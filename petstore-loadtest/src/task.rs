//! The tasks a simulated user can perform, and how their responses are validated.
//!
//! Each [`Task`] maps to one endpoint of the pet-store API. Tasks are picked at random by a
//! [`TaskSet`], using the static weights in [`TASKS`]: fetching a pet and searching by status are
//! each twice as frequent as the health check.

use rand::Rng;
use rand_distr::Distribution;
use rand_distr::weighted::{Error as WeightError, WeightedIndex};
use reqwest::StatusCode;
use serde_json::Value;

use crate::outcome::{Failure, Outcome, Success};

/// The ID of the pet fetched by [`Task::FetchPetById`].
pub const PET_ID: u64 = 1;

/// The status queried by [`Task::FindPetsByStatus`].
pub const PET_STATUS: &str = "available";

/// All tasks with their relative weights.
pub const TASKS: [(Task, u32); 3] = [
    (Task::FetchPetById, 2),
    (Task::FindPetsByStatus, 2),
    (Task::HealthCheck, 1),
];

/// A single kind of request issued by a simulated user.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Task {
    /// `GET /pet/{id}`
    FetchPetById,
    /// `GET /pet/findByStatus?status={status}`
    FindPetsByStatus,
    /// `GET /`
    HealthCheck,
}

impl Task {
    /// The name under which requests of this task are reported.
    pub fn name(self) -> &'static str {
        match self {
            Self::FetchPetById => "GET /pet/{id}",
            Self::FindPetsByStatus => "GET /pet/findByStatus",
            Self::HealthCheck => "Health Check",
        }
    }

    /// The request path relative to the API base URL.
    pub fn path(self) -> String {
        match self {
            Self::FetchPetById => format!("/pet/{PET_ID}"),
            Self::FindPetsByStatus => "/pet/findByStatus".to_owned(),
            Self::HealthCheck => "/".to_owned(),
        }
    }

    /// Query parameters appended to [`path`](Self::path).
    pub fn query(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::FindPetsByStatus => &[("status", PET_STATUS)],
            Self::FetchPetById | Self::HealthCheck => &[],
        }
    }

    /// Classifies a response of this task.
    pub fn validate(self, status: StatusCode, body: &[u8]) -> Outcome {
        match self {
            Self::FetchPetById => validate_pet(status, body),
            Self::FindPetsByStatus => validate_pet_list(status, body),
            Self::HealthCheck => validate_health(status),
        }
    }
}

fn validate_pet(status: StatusCode, body: &[u8]) -> Outcome {
    match status {
        StatusCode::OK => {
            let pet: Value = serde_json::from_slice(body).map_err(|_| Failure::InvalidJson)?;
            if !has_keys(&pet, &["id", "name"]) {
                return Err(Failure::InvalidStructure);
            }

            let name = match &pet["name"] {
                Value::String(name) => name.clone(),
                _ => "Unknown".to_owned(),
            };
            Ok(Success::Pet { name })
        }
        StatusCode::NOT_FOUND => Err(Failure::PetNotFound),
        status => Err(Failure::UnexpectedStatus(status.as_u16())),
    }
}

fn validate_pet_list(status: StatusCode, body: &[u8]) -> Outcome {
    match status {
        StatusCode::OK => {
            let pets: Value = serde_json::from_slice(body).map_err(|_| Failure::InvalidJson)?;
            let Value::Array(pets) = pets else {
                return Err(Failure::ExpectedList);
            };

            // Only the first pet is inspected, the rest of the list is trusted.
            if pets
                .first()
                .is_some_and(|first| !has_keys(first, &["id", "status"]))
            {
                return Err(Failure::MissingPetFields);
            }

            Ok(Success::Pets {
                count: pets.len(),
                status: PET_STATUS,
            })
        }
        StatusCode::BAD_REQUEST => Err(Failure::InvalidStatusValue),
        status => Err(Failure::UnexpectedStatus(status.as_u16())),
    }
}

fn validate_health(status: StatusCode) -> Outcome {
    match status {
        StatusCode::OK | StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED => {
            Ok(Success::Healthy {
                status: status.as_u16(),
            })
        }
        status => Err(Failure::HealthCheckFailed(status.as_u16())),
    }
}

fn has_keys(value: &Value, keys: &[&str]) -> bool {
    match value {
        Value::Object(map) => keys.iter().all(|key| map.contains_key(*key)),
        _ => false,
    }
}

/// Picks [`Task`]s at random according to their weights.
#[derive(Clone, Debug)]
pub struct TaskSet {
    tasks: Vec<Task>,
    distribution: WeightedIndex<u32>,
}

impl TaskSet {
    /// Creates a task set from `(task, weight)` pairs.
    ///
    /// Fails if the list is empty or all weights are zero.
    pub fn new(weighted: impl IntoIterator<Item = (Task, u32)>) -> Result<Self, WeightError> {
        let (tasks, weights): (Vec<_>, Vec<_>) = weighted.into_iter().unzip();
        let distribution = WeightedIndex::new(weights)?;
        Ok(Self {
            tasks,
            distribution,
        })
    }

    /// Draws the next task.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Task {
        self.tasks[self.distribution.sample(rng)]
    }
}
