//! Test utilities for the pet-store load test.
//!
//! This crate provides an in-process fake of the pet-store API and a test logger. See the modules
//! for all available utilities.

pub mod server;
pub mod tracing;

pub use axum;
