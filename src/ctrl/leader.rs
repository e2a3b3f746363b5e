//! Leader election on a `coordination.k8s.io/v1` Lease.
//!
//! Writes go through `replace` carrying the resourceVersion that was read, so
//! two replicas racing for an expired lease cannot both win: the loser gets a
//! 409 Conflict and keeps waiting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, ObjectMeta};
use kube::{
    Client,
    api::{Api, PostParams},
};
use tokio::{sync::oneshot, task::JoinHandle, time::Instant};
use tracing::{debug, info, warn};

use crate::{Error, Result};

const DEFAULT_LEASE_DURATION_SECONDS: i32 = 15;
const DEFAULT_RENEW_DEADLINE_SECONDS: u64 = 10;
const DEFAULT_RETRY_PERIOD_SECONDS: u64 = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderElectionConfig {
    pub lease_name: String,
    pub namespace: String,
    pub identity: String,
    pub lease_duration_seconds: i32,
    pub renew_deadline: Duration,
    pub retry_period: Duration,
}

impl LeaderElectionConfig {
    pub fn new(
        lease_name: impl Into<String>,
        namespace: impl Into<String>,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            lease_name: lease_name.into(),
            namespace: namespace.into(),
            identity: identity.into(),
            lease_duration_seconds: DEFAULT_LEASE_DURATION_SECONDS,
            renew_deadline: Duration::from_secs(DEFAULT_RENEW_DEADLINE_SECONDS),
            retry_period: Duration::from_secs(DEFAULT_RETRY_PERIOD_SECONDS),
        }
    }

    pub fn with_lease_duration(mut self, seconds: i32) -> Self {
        self.lease_duration_seconds = seconds;
        self
    }

    pub fn with_renew_deadline(mut self, duration: Duration) -> Self {
        self.renew_deadline = duration;
        self
    }

    pub fn with_retry_period(mut self, duration: Duration) -> Self {
        self.retry_period = duration;
        self
    }
}

/// Identity of this replica in the lease: `<hostname>_<uuid>`.
pub fn identity(hostname: &str) -> String {
    format!("{hostname}_{}", uuid::Uuid::new_v4())
}

/// True when nobody holds the lease or the holder stopped renewing it.
pub(crate) fn lease_expired(spec: &LeaseSpec, now: DateTime<Utc>) -> bool {
    if spec.holder_identity.as_deref().is_none_or(str::is_empty) {
        return true;
    }
    match (&spec.renew_time, spec.lease_duration_seconds) {
        (Some(renewed), Some(secs)) => now > renewed.0 + chrono::Duration::seconds(i64::from(secs)),
        _ => true,
    }
}

pub struct LeaderElector {
    config: LeaderElectionConfig,
    client: Client,
    is_leader: Arc<AtomicBool>,
}

impl LeaderElector {
    pub fn new(client: Client, config: LeaderElectionConfig, is_leader: Arc<AtomicBool>) -> Self {
        Self {
            config,
            client,
            is_leader,
        }
    }

    pub fn config(&self) -> &LeaderElectionConfig {
        &self.config
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader.load(Ordering::SeqCst)
    }

    fn leases(&self) -> Api<Lease> {
        Api::namespaced(self.client.clone(), &self.config.namespace)
    }

    /// Block until this replica holds the lease.
    pub async fn acquire(&self) {
        info!(
            identity = %self.config.identity,
            lease = %self.config.lease_name,
            namespace = %self.config.namespace,
            "attempting to acquire leader lease"
        );
        loop {
            match self.try_acquire_or_renew().await {
                Ok(true) => {
                    info!(identity = %self.config.identity, "successfully acquired lease");
                    self.is_leader.store(true, Ordering::SeqCst);
                    return;
                }
                Ok(false) => debug!(identity = %self.config.identity, "lease held by another replica"),
                Err(e) => warn!(error = %e, "failed to acquire lease, retrying"),
            }
            tokio::time::sleep(self.config.retry_period).await;
        }
    }

    /// Renew in the background. The receiver fires once leadership is lost.
    pub fn keep_alive(self: &Arc<Self>) -> (JoinHandle<()>, oneshot::Receiver<()>) {
        let (lost_tx, lost_rx) = oneshot::channel();
        let elector = Arc::clone(self);
        let task = tokio::spawn(async move {
            elector.renew_loop().await;
            elector.is_leader.store(false, Ordering::SeqCst);
            let _ = lost_tx.send(());
        });
        (task, lost_rx)
    }

    /// Returns once the lease is lost. Every attempt is bounded by what is
    /// left of the renew deadline, so a stalled API server counts as loss.
    async fn renew_loop(&self) {
        let mut last_renewal = Instant::now();
        loop {
            tokio::time::sleep(self.config.retry_period).await;
            let remaining = self
                .config
                .renew_deadline
                .saturating_sub(last_renewal.elapsed());
            match tokio::time::timeout(remaining, self.try_acquire_or_renew()).await {
                Ok(Ok(true)) => {
                    debug!(identity = %self.config.identity, "renewed leader lease");
                    last_renewal = Instant::now();
                    continue;
                }
                Ok(Ok(false)) => {
                    warn!(identity = %self.config.identity, "leader lease taken by another replica");
                    return;
                }
                Ok(Err(e)) => warn!(error = %e, "failed to renew leader lease"),
                Err(_) => debug!("lease renewal did not complete in time"),
            }
            if last_renewal.elapsed() >= self.config.renew_deadline {
                warn!(
                    identity = %self.config.identity,
                    deadline_secs = self.config.renew_deadline.as_secs_f64(),
                    "failed to renew leader lease within deadline"
                );
                return;
            }
        }
    }

    async fn try_acquire_or_renew(&self) -> Result<bool> {
        let leases = self.leases();
        let now = Utc::now();
        let Some(existing) = leases
            .get_opt(&self.config.lease_name)
            .await
            .map_err(Error::KubeError)?
        else {
            return self.create_lease(&leases, now).await;
        };

        let spec = existing.spec.clone().unwrap_or_default();
        let ours = spec.holder_identity.as_deref() == Some(self.config.identity.as_str());
        if !ours && !lease_expired(&spec, now) {
            return Ok(false);
        }

        let transitions = spec.lease_transitions.unwrap_or(0);
        let spec = LeaseSpec {
            holder_identity: Some(self.config.identity.clone()),
            lease_duration_seconds: Some(self.config.lease_duration_seconds),
            acquire_time: if ours { spec.acquire_time.clone() } else { Some(MicroTime(now)) },
            renew_time: Some(MicroTime(now)),
            lease_transitions: Some(if ours { transitions } else { transitions + 1 }),
            ..spec
        };
        self.replace(&leases, existing.metadata, spec).await
    }

    async fn create_lease(&self, leases: &Api<Lease>, now: DateTime<Utc>) -> Result<bool> {
        let lease = Lease {
            metadata: ObjectMeta {
                name: Some(self.config.lease_name.clone()),
                namespace: Some(self.config.namespace.clone()),
                ..ObjectMeta::default()
            },
            spec: Some(LeaseSpec {
                holder_identity: Some(self.config.identity.clone()),
                lease_duration_seconds: Some(self.config.lease_duration_seconds),
                acquire_time: Some(MicroTime(now)),
                renew_time: Some(MicroTime(now)),
                lease_transitions: Some(0),
                ..LeaseSpec::default()
            }),
        };
        match leases.create(&PostParams::default(), &lease).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(e)) if e.code == 409 => Ok(false),
            Err(e) => Err(Error::KubeError(e)),
        }
    }

    async fn replace(&self, leases: &Api<Lease>, metadata: ObjectMeta, spec: LeaseSpec) -> Result<bool> {
        let lease = Lease {
            metadata,
            spec: Some(spec),
        };
        match leases
            .replace(&self.config.lease_name, &PostParams::default(), &lease)
            .await
        {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(e)) if e.code == 409 => Ok(false),
            Err(e) => Err(Error::KubeError(e)),
        }
    }

    /// Hand the lease back so another replica can take over without waiting for expiry.
    pub async fn release(&self) -> Result<()> {
        if !self.is_leader() {
            return Ok(());
        }
        self.is_leader.store(false, Ordering::SeqCst);

        let leases = self.leases();
        let Some(existing) = leases
            .get_opt(&self.config.lease_name)
            .await
            .map_err(Error::KubeError)?
        else {
            debug!("lease not found, nothing to release");
            return Ok(());
        };
        let spec = existing.spec.clone().unwrap_or_default();
        if spec.holder_identity.as_deref() != Some(self.config.identity.as_str()) {
            return Ok(());
        }

        let now = Utc::now();
        let spec = LeaseSpec {
            holder_identity: None,
            lease_duration_seconds: Some(1),
            acquire_time: Some(MicroTime(now)),
            renew_time: Some(MicroTime(now)),
            ..spec
        };
        if self.replace(&leases, existing.metadata, spec).await? {
            info!(identity = %self.config.identity, "released leader lease");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(identity: &str, renewed: DateTime<Utc>, secs: i32) -> LeaseSpec {
        LeaseSpec {
            holder_identity: Some(identity.to_string()),
            renew_time: Some(MicroTime(renewed)),
            lease_duration_seconds: Some(secs),
            ..LeaseSpec::default()
        }
    }

    #[test]
    fn config_defaults() {
        let config = LeaderElectionConfig::new("4662f1d5.kiegroup.org", "operators", "pod-1_abc");
        assert_eq!(config.lease_name, "4662f1d5.kiegroup.org");
        assert_eq!(config.lease_duration_seconds, 15);
        assert_eq!(config.renew_deadline, Duration::from_secs(10));
        assert_eq!(config.retry_period, Duration::from_secs(2));
    }

    #[test]
    fn config_builders_chain() {
        let config = LeaderElectionConfig::new("lease", "ns", "me")
            .with_lease_duration(30)
            .with_renew_deadline(Duration::from_secs(20))
            .with_retry_period(Duration::from_secs(5));
        assert_eq!(config.lease_duration_seconds, 30);
        assert_eq!(config.renew_deadline, Duration::from_secs(20));
        assert_eq!(config.retry_period, Duration::from_secs(5));
    }

    #[test]
    fn identity_is_unique_per_process_start() {
        let a = identity("operator-7d9f");
        let b = identity("operator-7d9f");
        assert!(a.starts_with("operator-7d9f_"));
        assert_ne!(a, b);
    }

    #[test]
    fn fresh_lease_is_not_expired() {
        let now = Utc::now();
        assert!(!lease_expired(&held("other", now - chrono::Duration::seconds(5), 15), now));
    }

    #[test]
    fn stale_lease_is_expired() {
        let now = Utc::now();
        assert!(lease_expired(&held("other", now - chrono::Duration::seconds(16), 15), now));
    }

    #[test]
    fn released_or_incomplete_lease_is_expired() {
        let now = Utc::now();
        assert!(lease_expired(&LeaseSpec::default(), now));

        let mut released = held("other", now, 15);
        released.holder_identity = Some(String::new());
        assert!(lease_expired(&released, now));

        let mut no_duration = held("other", now, 15);
        no_duration.lease_duration_seconds = None;
        assert!(lease_expired(&no_duration, now));
    }

    #[tokio::test]
    async fn stalled_api_server_loses_leadership_at_deadline() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let url = format!("http://{addr}").parse().unwrap();
        let client = Client::try_from(kube::Config::new(url)).unwrap();
        let config = LeaderElectionConfig::new("lease", "ns", "me")
            .with_renew_deadline(Duration::from_millis(300))
            .with_retry_period(Duration::from_millis(100));
        let elector = Arc::new(LeaderElector::new(client, config, Arc::new(AtomicBool::new(true))));

        let (_task, lost) = elector.keep_alive();
        tokio::time::timeout(Duration::from_secs(5), lost)
            .await
            .expect("leadership should be lost once the renew deadline passes")
            .unwrap();
        assert!(!elector.is_leader());
    }
}
