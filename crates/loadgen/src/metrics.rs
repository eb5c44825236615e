//! Outcome aggregation and run reporting.

use crate::user::UserSummary;
use hdrhistogram::Histogram;
use shopload_types::OutcomeEvent;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;

/// Running totals for one label.
struct LabelStats {
    requests: u64,
    failures: u64,
    transport_errors: u64,
    /// Latency in microseconds.
    latencies: Histogram<u64>,
}

impl LabelStats {
    fn new() -> Self {
        Self {
            requests: 0,
            failures: 0,
            transport_errors: 0,
            latencies: Histogram::new(3).expect("3 significant figures is in range"),
        }
    }

    fn record(&mut self, event: &OutcomeEvent) {
        self.requests += 1;
        if !event.success {
            self.failures += 1;
        }
        if event.status.is_none() {
            self.transport_errors += 1;
        }
        self.latencies
            .saturating_record(event.latency.as_micros().min(u64::MAX as u128) as u64);
    }

    fn report(&self) -> LabelReport {
        let at = |q: f64| Duration::from_micros(self.latencies.value_at_quantile(q));
        LabelReport {
            requests: self.requests,
            failures: self.failures,
            transport_errors: self.transport_errors,
            mean: Duration::from_micros(self.latencies.mean() as u64),
            p50: at(0.50),
            p95: at(0.95),
            p99: at(0.99),
            max: Duration::from_micros(self.latencies.max()),
        }
    }
}

/// Consumes outcome events and aggregates them per label.
#[derive(Default)]
pub struct MetricsCollector {
    labels: BTreeMap<&'static str, LabelStats>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the totals.
    pub fn record(&mut self, event: &OutcomeEvent) {
        self.labels
            .entry(event.label)
            .or_insert_with(LabelStats::new)
            .record(event);
    }

    /// Drain the channel until every sender is gone.
    pub async fn collect(mut self, mut events: mpsc::UnboundedReceiver<OutcomeEvent>) -> Self {
        while let Some(event) = events.recv().await {
            self.record(&event);
        }
        self
    }

    /// Total events recorded.
    pub fn total_requests(&self) -> u64 {
        self.labels.values().map(|s| s.requests).sum()
    }

    /// Build the final report.
    pub fn finish(self, elapsed: Duration, users: &[UserSummary]) -> RunReport {
        let labels = self
            .labels
            .iter()
            .map(|(label, stats)| (label.to_string(), stats.report()))
            .collect();

        RunReport {
            elapsed,
            labels,
            users: UserTotals::from_summaries(users),
        }
    }
}

/// Per-label results.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelReport {
    pub requests: u64,
    pub failures: u64,
    /// Requests that never got a response.
    pub transport_errors: u64,
    pub mean: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub max: Duration,
}

/// Session-level totals across all users.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserTotals {
    /// Users spawned.
    pub spawned: usize,
    /// Users that never obtained a token.
    pub auth_failures: usize,
    /// Successful transfers.
    pub transfers: u64,
    /// Successful purchases.
    pub purchases: u64,
}

impl UserTotals {
    fn from_summaries(users: &[UserSummary]) -> Self {
        Self {
            spawned: users.len(),
            auth_failures: users.iter().filter(|u| !u.authenticated).count(),
            transfers: users.iter().map(|u| u.transfers as u64).sum(),
            purchases: users.iter().map(|u| u.purchases as u64).sum(),
        }
    }
}

/// Results of a finished run.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Wall-clock time from first spawn to last user stopping.
    pub elapsed: Duration,
    /// Results keyed by label.
    pub labels: BTreeMap<String, LabelReport>,
    pub users: UserTotals,
}

impl RunReport {
    pub fn total_requests(&self) -> u64 {
        self.labels.values().map(|l| l.requests).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.labels.values().map(|l| l.failures).sum()
    }

    /// Fraction of requests that failed (0.0 when nothing ran).
    pub fn failure_ratio(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.total_failures() as f64 / total as f64
        }
    }

    pub fn requests_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_requests() as f64 / secs
        } else {
            0.0
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print(&self) {
        println!();
        println!("=== Load Test Report ===");
        println!("Duration:     {:.2}s", self.elapsed.as_secs_f64());
        println!(
            "Users:        {} spawned, {} failed authentication",
            self.users.spawned, self.users.auth_failures
        );
        println!(
            "Sessions:     {} transfers, {} purchases",
            self.users.transfers, self.users.purchases
        );
        println!(
            "Requests:     {} ({:.1}/s), {} failed ({:.2}%)",
            self.total_requests(),
            self.requests_per_second(),
            self.total_failures(),
            self.failure_ratio() * 100.0
        );
        println!();
        println!(
            "{:<18} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}",
            "Label", "Requests", "Failures", "p50 ms", "p95 ms", "p99 ms", "max ms"
        );

        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        for (label, stats) in &self.labels {
            println!(
                "{:<18} {:>9} {:>9} {:>9.2} {:>9.2} {:>9.2} {:>9.2}",
                label,
                stats.requests,
                stats.failures,
                ms(stats.p50),
                ms(stats.p95),
                ms(stats.p99),
                ms(stats.max)
            );
        }
    }
}
