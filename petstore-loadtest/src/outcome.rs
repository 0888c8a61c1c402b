//! Classification of a single request into success or failure.

use std::fmt;

use thiserror::Error;

/// The result of validating one request.
///
/// Every executed request resolves to exactly one `Outcome`, which is then reported to the
/// [`Stats`](crate::stats::Stats) aggregator and the request listeners.
pub type Outcome = Result<Success, Failure>;

/// A successful request, carrying a short summary for logging.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Success {
    /// A pet was fetched by its ID.
    Pet {
        /// The name of the pet, or `Unknown` if the field was not a string.
        name: String,
    },
    /// A list of pets was returned for a status query.
    Pets {
        /// The number of pets in the response.
        count: usize,
        /// The status value that was queried.
        status: &'static str,
    },
    /// The connectivity check received an acceptable status code.
    Healthy {
        /// The status code returned by the root endpoint.
        status: u16,
    },
}

impl fmt::Display for Success {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pet { name } => write!(f, "Successfully retrieved pet: {name}"),
            Self::Pets { count, status } => {
                write!(f, "Found {count} pets with status '{status}'")
            }
            Self::Healthy { status } => write!(f, "Health check passed ({status})"),
        }
    }
}

/// Broad category of a [`Failure`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FailureKind {
    /// The response body was malformed or did not have the expected shape.
    Protocol,
    /// The status code was outside of the accepted set for the endpoint.
    UnexpectedStatus,
    /// The request did not complete, e.g. because the connection was refused or timed out.
    Transport,
}

/// The reason a request was classified as failed.
///
/// The display representation of each variant is the reason string shown in logs and the final
/// report.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Failure {
    /// The body was not valid JSON.
    #[error("Invalid JSON response")]
    InvalidJson,

    /// A pet was returned without its `id` or `name`.
    #[error("Invalid response structure")]
    InvalidStructure,

    /// The status query returned something other than a list.
    #[error("Expected list response")]
    ExpectedList,

    /// The first pet of a status query lacks its `id` or `status`.
    #[error("Pet objects missing required fields")]
    MissingPetFields,

    /// The pet does not exist.
    #[error("Pet not found")]
    PetNotFound,

    /// The API rejected the status query value.
    #[error("Invalid status value")]
    InvalidStatusValue,

    /// A status code that the endpoint does not document.
    #[error("Unexpected status code: {0}")]
    UnexpectedStatus(u16),

    /// The root endpoint returned a status outside of the accepted set.
    #[error("Health check failed: {0}")]
    HealthCheckFailed(u16),

    /// The request failed before a response could be read.
    #[error("{0}")]
    Transport(String),
}

impl Failure {
    /// Returns the category of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidJson
            | Self::InvalidStructure
            | Self::ExpectedList
            | Self::MissingPetFields => FailureKind::Protocol,
            Self::PetNotFound
            | Self::InvalidStatusValue
            | Self::UnexpectedStatus(_)
            | Self::HealthCheckFailed(_) => FailureKind::UnexpectedStatus,
            Self::Transport(_) => FailureKind::Transport,
        }
    }
}
