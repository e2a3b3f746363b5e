//! Operator scope and verbosity, read from the process environment.
//!
//! Keeping these out of the flag set lets one image serve both namespaced and
//! cluster-wide deployments.

use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// Namespace to restrict reconciliation to. Empty or unset means all namespaces.
pub const WATCH_NAMESPACE_ENV_VAR: &str = "WATCH_NAMESPACE";
/// Case-insensitive `true` turns on debug verbosity.
pub const DEBUG_ENV_VAR: &str = "DEBUG";

/// Source of environment values.
pub trait Environment {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// The environment of the running process.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var_os(key).map(|v| v.to_string_lossy().into_owned())
    }
}

impl Environment for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl Environment for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Namespace the operator watches; empty string when cluster scoped.
pub fn watch_namespace(env: &impl Environment) -> String {
    let ns = env.lookup(WATCH_NAMESPACE_ENV_VAR).unwrap_or_default();
    if ns.is_empty() {
        info!(
            env_var = WATCH_NAMESPACE_ENV_VAR,
            "The operator is running as cluster scoped. It will watch and manage resources in all namespaces"
        );
    }
    ns
}

pub fn debug_mode(env: &impl Environment) -> bool {
    let debug = env
        .lookup(DEBUG_ENV_VAR)
        .is_some_and(|v| v.to_uppercase() == "TRUE");
    if debug {
        info!("Running in Debug Mode");
    }
    debug
}
