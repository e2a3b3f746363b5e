use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use futures::{FutureExt, future::BoxFuture};
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use tokio::{sync::oneshot, task::JoinSet};
use tracing::*;

use super::{
    Shutdown,
    leader::{self, LeaderElectionConfig, LeaderElector},
    metrics::Metrics,
    server::{MetricsServer, State},
};
use crate::{Error, Result, helper, scheme::Scheme};

pub const DEFAULT_WEBHOOK_PORT: u16 = 9443;

/// Manager construction parameters.
#[derive(Clone, Debug)]
pub struct Options {
    pub scheme: Arc<Scheme>,
    /// `"0"` disables the endpoint; `":8080"` binds every interface.
    pub metrics_bind_address: String,
    /// Port of the admission webhook server, started only when webhooks are registered.
    pub port: u16,
    pub leader_election: bool,
    pub leader_election_id: String,
    /// Defaults to the namespace of the pod's service account.
    pub leader_election_namespace: Option<String>,
    /// Empty watches every namespace.
    pub namespace: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            scheme: Arc::default(),
            metrics_bind_address: crate::config::DEFAULT_METRICS_ADDR.to_string(),
            port: DEFAULT_WEBHOOK_PORT,
            leader_election: false,
            leader_election_id: String::new(),
            leader_election_namespace: None,
            namespace: String::new(),
        }
    }
}

/// Normalize a Go-style bind address. `None` means metrics are disabled.
pub(crate) fn parse_bind_address(addr: &str) -> Result<Option<String>> {
    if addr == "0" {
        return Ok(None);
    }
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| Error::InvalidBindAddress(addr.to_string()))?;
    port.parse::<u16>()
        .map_err(|_| Error::InvalidBindAddress(addr.to_string()))?;
    let host = if host.is_empty() { "0.0.0.0" } else { host };
    Ok(Some(format!("{host}:{port}")))
}

type Runnable = Box<dyn FnOnce(Shutdown) -> BoxFuture<'static, Result<()>> + Send>;

/// Hosts the controllers of one process and owns what they share.
pub struct Manager {
    client: Client,
    scheme: Arc<Scheme>,
    namespace: String,
    port: u16,
    metrics_listener: Option<TcpListener>,
    leader_election: Option<LeaderElectionConfig>,
    state: State,
    runnables: Vec<(String, Runnable)>,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("namespace", &self.namespace)
            .field("port", &self.port)
            .field("metrics_addr", &self.metrics_addr())
            .field("leader_election", &self.leader_election)
            .field("runnables", &self.runnables.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

impl Manager {
    /// Validate options and bind the metrics listener. Nothing runs until [`Manager::start`].
    pub fn new(client: Client, options: Options) -> Result<Self> {
        let leader_election = if options.leader_election {
            if options.leader_election_id.is_empty() {
                return Err(Error::MissingLeaderElectionId);
            }
            let namespace = match options.leader_election_namespace {
                Some(ns) => ns,
                None => helper::get_my_namespace().map_err(|e| {
                    Error::LeaderElectionNamespace(format!(
                        "not running in-cluster, please specify the leader election namespace ({e})"
                    ))
                })?,
            };
            let hostname = helper::get_my_hostname()?;
            Some(LeaderElectionConfig::new(
                options.leader_election_id,
                namespace,
                leader::identity(&hostname),
            ))
        } else {
            None
        };

        let metrics_listener = parse_bind_address(&options.metrics_bind_address)?
            .map(|addr| {
                TcpListener::bind(&addr).map_err(|source| Error::BindError { addr, source })
            })
            .transpose()?;

        let metrics = Arc::new(Metrics::new()?);
        Ok(Self {
            client,
            scheme: options.scheme,
            state: State::new(&options.namespace, metrics),
            namespace: options.namespace,
            port: options.port,
            metrics_listener,
            leader_election,
            runnables: Vec::new(),
        })
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    pub fn scheme(&self) -> Arc<Scheme> {
        self.scheme.clone()
    }

    /// Watch scope shared by every controller; empty means all namespaces.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
    }

    pub fn leader_election(&self) -> Option<&LeaderElectionConfig> {
        self.leader_election.as_ref()
    }

    pub(crate) fn state(&self) -> &State {
        &self.state
    }

    /// Api for `K` in the manager's watch scope.
    pub fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        if self.namespace.is_empty() {
            Api::all(self.client.clone())
        } else {
            Api::namespaced(self.client.clone(), &self.namespace)
        }
    }

    /// Register a run-loop. It receives the shutdown future and should return once it fires.
    pub fn add<F, Fut>(&mut self, name: &str, runnable: F) -> Result<()>
    where
        F: FnOnce(Shutdown) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if self.runnables.iter().any(|(n, _)| n == name) {
            return Err(Error::DuplicateController(name.to_string()));
        }
        self.runnables
            .push((name.to_string(), Box::new(move |shutdown| runnable(shutdown).boxed())));
        Ok(())
    }

    /// Run until `signal` completes or something fails.
    ///
    /// Returns `Ok` after a signal-driven shutdown once in-flight work has drained,
    /// and an error when a controller fails or leadership is lost.
    pub async fn start(mut self, signal: impl Future<Output = ()> + Send) -> Result<()> {
        let server = self
            .metrics_listener
            .take()
            .map(|listener| MetricsServer::serve(listener, self.state.clone()))
            .transpose()?;
        debug!(port = self.port, "no webhooks registered, webhook server not started");
        tokio::pin!(signal);

        let elector = self.leader_election.take().map(|config| {
            Arc::new(LeaderElector::new(self.client.clone(), config, self.state.leader_flag()))
        });
        let mut renewal = None;
        if let Some(elector) = &elector {
            tokio::select! {
                _ = elector.acquire() => {}
                _ = &mut signal => {
                    info!("shutdown requested before leadership was acquired");
                    if let Some(server) = server {
                        server.stop().await;
                    }
                    return Ok(());
                }
            }
            self.state
                .metrics()
                .set_leader(&elector.config().lease_name, true);
            renewal = Some(elector.keep_alive());
        } else {
            self.state.leader_flag().store(true, std::sync::atomic::Ordering::SeqCst);
        }
        let (renew_task, lost) = match renewal {
            Some((task, lost)) => (Some(task), lost.map(|_| ()).left_future()),
            None => (None, futures::future::pending().right_future()),
        };
        tokio::pin!(lost);

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let shutdown: Shutdown = stop_rx.map(|_| ()).boxed().shared();
        let mut tasks = JoinSet::new();
        for (name, runnable) in self.runnables.drain(..) {
            info!(controller = %name, "starting controller");
            let run = runnable(shutdown.clone());
            tasks.spawn(async move { (name, run.await) });
        }

        let result = loop {
            tokio::select! {
                _ = &mut signal => break Ok(()),
                _ = &mut lost => break Err(Error::LeaderElectionLost),
                Some(joined) = tasks.join_next() => match joined {
                    Ok((name, Ok(()))) => debug!(controller = %name, "controller stopped"),
                    Ok((name, Err(e))) => {
                        error!(controller = %name, error = %e, "controller failed");
                        break Err(e);
                    }
                    Err(e) => break Err(Error::OtherError(format!("controller task failed: {e}"))),
                },
            }
        };

        info!("stopping controllers and waiting for in-flight reconciles");
        let _ = stop_tx.send(());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => debug!(controller = %name, "controller stopped"),
                Ok((name, Err(e))) => warn!(controller = %name, error = %e, "controller failed during shutdown"),
                Err(e) => warn!("controller task failed during shutdown: {e}"),
            }
        }

        if let Some(task) = renew_task {
            task.abort();
        }
        if let Some(elector) = elector {
            if let Err(e) = elector.release().await {
                warn!(error = %e, "failed to release leader lease");
            }
            self.state
                .metrics()
                .set_leader(&elector.config().lease_name, false);
        }
        if let Some(server) = server {
            server.stop().await;
        }
        result
    }
}
