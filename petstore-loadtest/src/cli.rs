//! Command line interface of the load test binary.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;

use crate::config::{Config, Overrides};
use crate::events::EventBus;
use crate::http::HttpRemote;
use crate::runner::LoadTest;
use crate::{listeners, observability};

/// Load test for the Swagger pet-store API.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(RunCommand),
    Version(VersionCommand),
}

/// run the load test against the target host
///
/// Flags take precedence over environment variables and the configuration file.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {
    /// base URL of the target API
    #[argh(option)]
    host: Option<String>,

    /// number of concurrent users
    #[argh(option, short = 'u')]
    users: Option<usize>,

    /// users to start per second during ramp-up
    #[argh(option, short = 'r')]
    spawn_rate: Option<f64>,

    /// stop after this duration, e.g. `60s` or `5m`
    #[argh(option, short = 't', from_str_fn(parse_duration))]
    run_time: Option<Duration>,

    /// disable the interactive progress display
    #[argh(switch)]
    headless: bool,
}

impl RunCommand {
    fn into_overrides(self) -> Overrides {
        Overrides {
            host: self.host,
            users: self.users,
            spawn_rate: self.spawn_rate,
            run_time: self.run_time,
            headless: self.headless.then_some(true),
        }
    }
}

/// print the load test version
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|e| e.to_string())
}

/// Bootstrap the runtime and execute the CLI command.
///
/// Exits with a failure code if any request of the load test failed.
pub fn execute() -> Result<ExitCode> {
    let args: Args = argh::from_env();

    let run = match args.command {
        Command::Version(VersionCommand {}) => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return Ok(ExitCode::SUCCESS);
        }
        Command::Run(run) => run,
    };

    let config = Config::load(args.config.as_deref(), run.into_overrides())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("loadtest-rt")
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing(&config);
    tracing::debug!(?config);

    let remote = HttpRemote::with_timeout(config.host.as_str(), config.request_timeout)?;
    let mut events = EventBus::default();
    listeners::register(&mut events);

    let load_test = LoadTest::builder(remote)
        .users(config.users)
        .spawn_rate(config.spawn_rate)
        .run_time(config.run_time)
        .wait_time(config.wait_time.min, config.wait_time.max)
        .headless(config.headless)
        .events(events)
        .build();

    let stats = runtime.block_on(load_test.run())?;

    if stats.total_failures() > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let args = Args::from_args(
            &["petstore-loadtest"],
            &[
                "-c",
                "loadtest.yml",
                "run",
                "--host",
                "http://localhost:8080",
                "-u",
                "5",
                "-r",
                "1",
                "-t",
                "60s",
                "--headless",
            ],
        )
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("loadtest.yml")));
        let Command::Run(run) = args.command else {
            panic!("expected run command");
        };

        let overrides = run.into_overrides();
        assert_eq!(overrides.host.as_deref(), Some("http://localhost:8080"));
        assert_eq!(overrides.users, Some(5));
        assert_eq!(overrides.spawn_rate, Some(1.0));
        assert_eq!(overrides.run_time, Some(Duration::from_secs(60)));
        assert_eq!(overrides.headless, Some(true));
    }

    #[test]
    fn omitted_flags_do_not_override() {
        let args = Args::from_args(&["petstore-loadtest"], &["run"]).unwrap();
        let Command::Run(run) = args.command else {
            panic!("expected run command");
        };

        let overrides = run.into_overrides();
        assert_eq!(overrides.host, None);
        assert_eq!(overrides.users, None);
        assert_eq!(overrides.run_time, None);
        assert_eq!(overrides.headless, None);
    }

    #[test]
    fn rejects_bad_duration() {
        assert!(Args::from_args(&["petstore-loadtest"], &["run", "-t", "soon"]).is_err());
    }
}
