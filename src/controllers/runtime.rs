use std::sync::Arc;

use kube::{
    api::{Api, ResourceExt},
    runtime::controller::Action,
};
use tracing::*;

use super::{observe, patch_status};
use crate::crd::KogitoRuntime;
use crate::events_helper::emit_info;
use crate::{Error, Result};

crate::reconciler_scaffold! {
    reconciler: KogitoRuntimeReconciler,
    controller_ty: KogitoRuntime,
    controller: "KogitoRuntime",
    reporter: "kogitoruntime-controller",
    reconcile_fn: reconcile_runtime,
    error_policy_fn: runtime_error_policy,
    error_requeue_secs: 5 * 60
}

async fn reconcile_runtime(runtime: Arc<KogitoRuntime>, ctx: Arc<Context>) -> Result<Action> {
    let log = ctx.log.clone();
    apply_runtime(runtime, ctx).instrument(log).await
}

async fn apply_runtime(runtime: Arc<KogitoRuntime>, ctx: Arc<Context>) -> Result<Action> {
    let name = runtime.name_any();
    let ns = runtime
        .namespace()
        .ok_or_else(|| Error::MissingNamespace(name.clone()))?;
    info!("Reconciling KogitoRuntime \"{}\" in {}", name, ns);

    let generation = runtime.metadata.generation.unwrap_or_default();
    let Some(status) = observe(runtime.status.as_ref(), generation) else {
        debug!(generation, "generation already observed");
        return Ok(Action::await_change());
    };

    let api: Api<KogitoRuntime> = Api::namespaced(ctx.client.clone(), &ns);
    patch_status(&api, &name, &status).await?;
    emit_info(
        &ctx.recorder,
        runtime.as_ref(),
        "Reconciled",
        "Reconcile",
        Some(format!("Observed generation {generation} with {} replica(s)", runtime.spec.replicas.unwrap_or(1))),
    )
    .await;
    Ok(Action::await_change())
}
