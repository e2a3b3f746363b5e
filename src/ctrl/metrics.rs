//! Prometheus metrics owned by the manager.

use std::time::Duration;

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::{Error, Result};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    reconcile_total: IntCounterVec,
    reconcile_errors: IntCounterVec,
    reconcile_time: HistogramVec,
    leader_status: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let reconcile_total = IntCounterVec::new(
            Opts::new(
                "controller_runtime_reconcile_total",
                "Total number of reconciliations per controller",
            ),
            &["controller", "result"],
        )
        .map_err(Error::MetricsError)?;
        let reconcile_errors = IntCounterVec::new(
            Opts::new(
                "controller_runtime_reconcile_errors_total",
                "Total number of reconciliation errors per controller",
            ),
            &["controller"],
        )
        .map_err(Error::MetricsError)?;
        let reconcile_time = HistogramVec::new(
            HistogramOpts::new(
                "controller_runtime_reconcile_time_seconds",
                "Length of time per reconciliation per controller",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["controller"],
        )
        .map_err(Error::MetricsError)?;
        let leader_status = IntGaugeVec::new(
            Opts::new(
                "leader_election_master_status",
                "Whether this replica currently holds the leader lease",
            ),
            &["name"],
        )
        .map_err(Error::MetricsError)?;

        registry
            .register(Box::new(reconcile_total.clone()))
            .map_err(Error::MetricsError)?;
        registry
            .register(Box::new(reconcile_errors.clone()))
            .map_err(Error::MetricsError)?;
        registry
            .register(Box::new(reconcile_time.clone()))
            .map_err(Error::MetricsError)?;
        registry
            .register(Box::new(leader_status.clone()))
            .map_err(Error::MetricsError)?;

        Ok(Self {
            registry,
            reconcile_total,
            reconcile_errors,
            reconcile_time,
            leader_status,
        })
    }

    pub fn record_reconcile(&self, controller: &str, elapsed: Duration, success: bool) {
        let result = if success { "success" } else { "error" };
        self.reconcile_total
            .with_label_values(&[controller, result])
            .inc();
        if !success {
            self.reconcile_errors.with_label_values(&[controller]).inc();
        }
        self.reconcile_time
            .with_label_values(&[controller])
            .observe(elapsed.as_secs_f64());
    }

    pub fn set_leader(&self, election_id: &str, leader: bool) {
        self.leader_status
            .with_label_values(&[election_id])
            .set(i64::from(leader));
    }

    /// Text exposition of every registered metric.
    pub fn gather(&self) -> Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(Error::MetricsError)?;
        String::from_utf8(buf).map_err(|e| Error::OtherError(e.to_string()))
    }
}
