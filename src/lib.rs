use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kube Error: {0}")]
    KubeError(#[source] kube::Error),

    #[error("Kubeconfig Error: {0}")]
    KubeconfigError(#[source] kube::config::InferConfigError),

    #[error("IO Error: {0}")]
    IoError(#[source] std::io::Error),

    #[error("Metrics Error: {0}")]
    MetricsError(#[source] prometheus::Error),

    #[error("invalid metrics bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("unable to bind metrics listener on {addr}: {source}")]
    BindError {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("kind {0} is not registered in the scheme")]
    KindNotRegistered(String),

    #[error("controller with name {0} already exists")]
    DuplicateController(String),

    #[error("LeaderElectionID must be configured")]
    MissingLeaderElectionId,

    #[error("unable to find leader election namespace: {0}")]
    LeaderElectionNamespace(String),

    #[error("leader election lost")]
    LeaderElectionLost,

    #[error("Missing Namespace: {0}")]
    MissingNamespace(String),

    /// NB: this is a catch-all for any other errors
    #[error("Other Error: {0}")]
    OtherError(String),
}
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub mod conditions;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod ctrl;
pub mod driver;
pub mod environment;
pub mod events_helper;
pub mod helper;
mod macros;
pub mod scheme;

/// Log and trace integrations
pub mod telemetry;
