//! Aggregated request statistics and the final report.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sketches_ddsketch::DDSketch;
use yansi::Paint;

use crate::events::RequestEvent;

/// Collects timings and failures of all requests, grouped by request name.
///
/// Recording is safe from any number of users concurrently.
#[derive(Default)]
pub struct Stats {
    endpoints: Mutex<BTreeMap<&'static str, EndpointStats>>,
}

#[derive(Default)]
struct EndpointStats {
    /// Latency of every request in seconds, including failed ones.
    timing: DDSketch,
    /// Failure counts keyed by reason.
    failures: BTreeMap<String, u64>,
}

/// A point-in-time copy of the counters of one request name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EndpointSummary {
    /// Total number of requests, successful or not.
    pub requests: usize,
    /// Failure counts keyed by reason.
    pub failures: BTreeMap<String, u64>,
}

impl EndpointSummary {
    /// The total number of failed requests.
    pub fn failure_count(&self) -> u64 {
        self.failures.values().sum()
    }
}

impl Stats {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<&'static str, EndpointStats>> {
        self.endpoints.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a completed request.
    pub fn record(&self, event: &RequestEvent) {
        let mut endpoints = self.lock();
        let endpoint = endpoints.entry(event.name).or_default();

        endpoint.timing.add(event.elapsed.as_secs_f64());
        if let Err(failure) = &event.outcome {
            *endpoint.failures.entry(failure.to_string()).or_default() += 1;
        }
    }

    /// The number of requests recorded so far.
    pub fn total_requests(&self) -> usize {
        self.lock().values().map(|e| e.timing.count()).sum()
    }

    /// The number of failed requests recorded so far.
    pub fn total_failures(&self) -> u64 {
        self.lock()
            .values()
            .flat_map(|e| e.failures.values())
            .sum()
    }

    /// Returns the counters of the given request name, if any request was recorded for it.
    pub fn endpoint(&self, name: &str) -> Option<EndpointSummary> {
        self.lock().get(name).map(|e| EndpointSummary {
            requests: e.timing.count(),
            failures: e.failures.clone(),
        })
    }

    /// Prints the report for a test that ran for `duration` to stdout.
    pub fn print_report(&self, duration: Duration) {
        let endpoints = self.lock();
        let mut total = EndpointStats::default();

        for (name, endpoint) in endpoints.iter() {
            println!();
            println!("{} {}", "##".bold(), name.bold().blue());
            print_endpoint(endpoint, duration);

            // Both sketches use the default config, so merging cannot fail.
            total.timing.merge(&endpoint.timing).ok();
            for (reason, count) in &endpoint.failures {
                *total.failures.entry(reason.clone()).or_default() += count;
            }
        }

        let failures: Vec<_> = endpoints
            .iter()
            .flat_map(|(name, e)| e.failures.iter().map(move |(r, c)| (*name, r, *c)))
            .collect();
        if !failures.is_empty() {
            println!();
            println!("{}", "## FAILURES".bold().red());
            for (name, reason, count) in failures {
                println!("  {count:>6}  {name}: {reason}");
            }
        }

        println!();
        println!("{}", "## TOTALS".bold());
        print_endpoint(&total, duration);
        println!();
    }
}

impl fmt::Debug for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stats")
            .field("requests", &self.total_requests())
            .field("failures", &self.total_failures())
            .finish()
    }
}

fn print_endpoint(endpoint: &EndpointStats, duration: Duration) {
    let requests = endpoint.timing.count();
    let failures: u64 = endpoint.failures.values().sum();

    print!("{} ({} requests", "REQUESTS:".bold().green(), requests.bold());
    if failures > 0 {
        print!(", {}", format!("{failures} FAILURES").bold().red());
    }
    println!(")");

    if requests > 0 {
        print_rate(requests, duration);
        print_percentiles(&endpoint.timing, Duration::from_secs_f64);
    }
}

fn print_rate(requests: usize, duration: Duration) {
    let rate = requests as f64 / duration.as_secs_f64();
    println!("  {:.2} requests/s", rate.bold());
}

fn print_percentiles<T: fmt::Debug>(sketch: &DDSketch, map: impl Fn(f64) -> T) {
    let quantile = |q| sketch.quantile(q).ok().flatten().unwrap_or_default();

    let avg = map(sketch.sum().unwrap_or_default() / sketch.count() as f64);
    let p50 = map(quantile(0.5));
    let p90 = map(quantile(0.9));
    let p99 = map(quantile(0.99));
    println!(
        "  avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}",
        avg.bold()
    );
}
