use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    Resource,
    api::ListParams,
    runtime::{
        controller::{Action, Controller},
        watcher,
    },
};
use serde::de::DeserializeOwned;
use tracing::*;

use super::Manager;
use crate::{Error, Result};

/// Wires one resource kind into a [`Manager`] as a kube-runtime controller.
#[derive(Debug)]
pub struct Builder<'a> {
    mgr: &'a mut Manager,
    name: Option<String>,
}

impl<'a> Builder<'a> {
    pub fn new(mgr: &'a mut Manager) -> Self {
        Self { mgr, name: None }
    }

    /// Controller name used in logs and metrics. Defaults to the lowercased kind.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Check the kind is known and watchable, then register the run loop.
    pub async fn complete<K, R, RFut, P, Ctx>(self, mut reconcile: R, error_policy: P, ctx: Arc<Ctx>) -> Result<()>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug
            + Send
            + Sync
            + 'static,
        R: FnMut(Arc<K>, Arc<Ctx>) -> RFut + Send + 'static,
        RFut: Future<Output = Result<Action>> + Send + 'static,
        P: Fn(Arc<K>, &Error, Arc<Ctx>) -> Action + Send + Sync + 'static,
        Ctx: Send + Sync + 'static,
    {
        let kind = K::kind(&()).to_string();
        if !self.mgr.scheme().is_registered::<K>() {
            return Err(Error::KindNotRegistered(kind));
        }
        let name = self.name.unwrap_or_else(|| kind.to_lowercase());

        let api = self.mgr.api::<K>();
        if let Err(e) = api.list(&ListParams::default().limit(1)).await {
            error!("{kind} CRD is not queryable; {e:?}. Is the CRD installed?");
            info!("Installation: cargo run --bin gencrd -- --output crds && kubectl apply -f crds/");
            return Err(Error::KubeError(e));
        }

        let state = self.mgr.state().clone();
        let controller = name.clone();
        let instrumented = move |obj: Arc<K>, ctx: Arc<Ctx>| {
            let started = Instant::now();
            let fut = reconcile(obj, ctx);
            let state = state.clone();
            let controller = controller.clone();
            async move {
                let result = fut.await;
                state
                    .metrics()
                    .record_reconcile(&controller, started.elapsed(), result.is_ok());
                state.touch(&controller).await;
                result
            }
        };

        let log_name = name.clone();
        self.mgr.add(&name, move |shutdown| async move {
            Controller::new(api, watcher::Config::default().any_semantic())
                .graceful_shutdown_on(shutdown)
                .run(instrumented, error_policy, ctx)
                .for_each(move |res| {
                    match res {
                        Ok((obj, _)) => debug!(controller = %log_name, "reconciled {obj}"),
                        Err(e) => warn!(controller = %log_name, "reconcile failed: {e}"),
                    }
                    futures::future::ready(())
                })
                .await;
            Ok(())
        })
    }
}
