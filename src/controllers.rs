//! Reconciler bindings for the Kogito resource kinds.

mod build;
mod runtime;

pub use build::KogitoBuildReconciler;
pub use runtime::KogitoRuntimeReconciler;

use std::fmt::Debug;
use std::future::Future;

use kube::api::{Api, Patch, PatchParams};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;

use crate::conditions::{CONDITION_RECONCILED, Conditions};
use crate::ctrl::Manager;
use crate::{Error, Result};

/// Field manager used for status writes.
pub static MANAGER_NAME: &str = "kogito-operator";

/// Registers a reconciler with a [`Manager`] so it runs when the manager starts.
pub trait SetupWithManager {
    /// Controller name reported when registration fails.
    const CONTROLLER: &'static str;

    fn setup_with_manager(self, mgr: &mut Manager) -> impl Future<Output = Result<()>>;
}

/// Status for `generation`, or `None` when it has already been observed.
pub(crate) fn observe<S>(current: Option<&S>, generation: i64) -> Option<S>
where
    S: Conditions + Clone + Default,
{
    let mut status = current.cloned().unwrap_or_default();
    if status.observed_generation() == Some(generation) && status.is_true(CONDITION_RECONCILED) {
        return None;
    }
    status.set_observed_generation(generation);
    status.upsert_bool(CONDITION_RECONCILED, true, "Observed", None, generation);
    Some(status)
}

pub(crate) async fn patch_status<K, S>(api: &Api<K>, name: &str, status: &S) -> Result<()>
where
    K: Clone + DeserializeOwned + Debug,
    S: Serialize,
{
    let serverside = PatchParams::apply(MANAGER_NAME);
    let patch = Patch::Merge(json!({ "status": status }));
    api.patch_status(name, &serverside, &patch)
        .await
        .map_err(Error::KubeError)?;
    Ok(())
}
