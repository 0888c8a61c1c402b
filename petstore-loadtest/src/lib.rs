//! A load test for the Swagger pet-store demo API.
//!
//! A [`LoadTest`] starts a number of simulated users, ramped up at a fixed spawn rate. Every user
//! repeatedly picks a weighted random [`Task`](task::Task), issues its request, validates the
//! response and reports the [`Outcome`](outcome::Outcome) to the shared [`Stats`](stats::Stats),
//! then pauses for a random interval.
//!
//! Lifecycle hooks (test start and stop, user start, completed requests) are registered explicitly
//! on an [`EventBus`](events::EventBus). The [`listeners`] module contains the default console
//! logging.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cli;
pub mod config;
pub mod events;
pub mod http;
pub mod listeners;
pub mod observability;
pub mod outcome;
pub mod runner;
pub mod stats;
pub mod task;
mod user;

pub use crate::runner::LoadTest;
