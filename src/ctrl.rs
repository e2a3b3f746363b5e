//! Controller manager: hosts the reconcilers' run loops and what they share.

mod builder;
pub mod leader;
mod manager;
pub mod metrics;
pub mod server;

pub use builder::Builder;
pub use manager::{DEFAULT_WEBHOOK_PORT, Manager, Options};

use futures::future::{BoxFuture, Shared};
use kube::Client;
use tracing::*;

use crate::{Error, Result};

/// Resolves once the manager begins shutting down. Cheap to clone.
pub type Shutdown = Shared<BoxFuture<'static, ()>>;

/// Connect to the cluster and build a [`Manager`].
///
/// Fails when no kubeconfig or in-cluster config can be found, or when the API
/// server does not answer.
pub async fn new_manager(options: Options) -> Result<Manager> {
    let config = kube::Config::infer().await.map_err(Error::KubeconfigError)?;
    let client = Client::try_from(config).map_err(Error::KubeError)?;
    let version = client.apiserver_version().await.map_err(Error::KubeError)?;
    info!(version = %version.git_version, "connected to cluster API");
    Manager::new(client, options)
}

/// Completes on SIGTERM or SIGINT. A second signal terminates the process with status 1.
pub async fn signal_handler() {
    wait_for_signal().await;
    info!("received termination signal, shutting down");
    tokio::spawn(async {
        wait_for_signal().await;
        error!("received second termination signal, exiting");
        std::process::exit(1);
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = term.recv() => {}
                Ok(()) = tokio::signal::ctrl_c() => {}
            }
        }
        Err(e) => {
            warn!("unable to listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
