use std::sync::Arc;

use kube::{
    api::{Api, ResourceExt},
    runtime::controller::Action,
};
use tracing::*;

use super::{observe, patch_status};
use crate::crd::KogitoBuild;
use crate::events_helper::emit_info;
use crate::{Error, Result};

crate::reconciler_scaffold! {
    reconciler: KogitoBuildReconciler,
    controller_ty: KogitoBuild,
    controller: "KogitoBuild",
    reporter: "kogitobuild-controller",
    reconcile_fn: reconcile_build,
    error_policy_fn: build_error_policy,
    error_requeue_secs: 5 * 60
}

async fn reconcile_build(build: Arc<KogitoBuild>, ctx: Arc<Context>) -> Result<Action> {
    let log = ctx.log.clone();
    apply_build(build, ctx).instrument(log).await
}

async fn apply_build(build: Arc<KogitoBuild>, ctx: Arc<Context>) -> Result<Action> {
    let name = build.name_any();
    let ns = build
        .namespace()
        .ok_or_else(|| Error::MissingNamespace(name.clone()))?;
    info!("Reconciling KogitoBuild \"{}\" in {}", name, ns);

    let generation = build.metadata.generation.unwrap_or_default();
    let Some(status) = observe(build.status.as_ref(), generation) else {
        debug!(generation, "generation already observed");
        return Ok(Action::await_change());
    };

    let api: Api<KogitoBuild> = Api::namespaced(ctx.client.clone(), &ns);
    patch_status(&api, &name, &status).await?;

    let target = build
        .spec
        .target_kogito_runtime
        .clone()
        .unwrap_or_else(|| name.clone());
    emit_info(
        &ctx.recorder,
        build.as_ref(),
        "Reconciled",
        "Reconcile",
        Some(format!("Observed generation {generation} of {:?} build for {target}", build.spec.type_)),
    )
    .await;
    Ok(Action::await_change())
}
