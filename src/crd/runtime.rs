use k8s_openapi::api::core::v1::EnvVar;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::conditions::DeriveConditions;

/// A deployed Kogito service.
#[skip_serializing_none]
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "rhpam.kiegroup.org",
    version = "v1",
    kind = "KogitoRuntime",
    namespaced
)]
#[kube(status = "KogitoRuntimeStatus")]
#[kube(printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".spec.replicas"}"#)]
#[kube(printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image"}"#)]
pub struct KogitoRuntimeSpec {
    /// Number of pods; the reconciler defaults to one.
    pub replicas: Option<i32>,
    /// Container image of the service.
    pub image: Option<String>,
    pub env: Option<Vec<EnvVar>>,
    pub enable_istio: Option<bool>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, DeriveConditions)]
#[serde(rename_all = "camelCase")]
pub struct KogitoRuntimeStatus {
    pub observed_generation: Option<i64>,
    pub conditions: Option<Vec<Condition>>,
}
