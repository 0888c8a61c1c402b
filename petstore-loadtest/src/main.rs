//! Load test binary for the Swagger pet-store demo API.
//!
//! Run it with a short test against the public API:
//!
//! ```sh
//! petstore-loadtest run --host https://petstore.swagger.io/v2 -u 5 -r 1 -t 60s --headless
//! ```
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    petstore_loadtest::cli::execute()
}
