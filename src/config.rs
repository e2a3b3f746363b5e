use clap::{ArgAction, Parser};

pub const DEFAULT_METRICS_ADDR: &str = ":8080";

/// Command-line flags of the manager binary.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(version, about = "Kogito operator controller manager", long_about = None)]
pub struct Args {
    /// The address the metric endpoint binds to.
    #[arg(long = "metrics-addr", default_value = DEFAULT_METRICS_ADDR)]
    pub metrics_addr: String,

    /// Enable leader election for controller manager. Enabling this will ensure
    /// there is only one active controller manager.
    #[arg(
        long = "enable-leader-election",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        require_equals = true
    )]
    pub enable_leader_election: bool,
}

/// Startup configuration, fixed once the driver has resolved flags and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub metrics_addr: String,
    pub leader_election: bool,
    /// Empty means every namespace.
    pub watch_namespace: String,
    pub debug: bool,
}

impl Configuration {
    pub fn new(args: Args, watch_namespace: String, debug: bool) -> Self {
        Self {
            metrics_addr: args.metrics_addr,
            leader_election: args.enable_leader_election,
            watch_namespace,
            debug,
        }
    }

    pub fn cluster_scoped(&self) -> bool {
        self.watch_namespace.is_empty()
    }
}
