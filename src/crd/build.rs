use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::conditions::DeriveConditions;

/// Builds a Kogito service image from sources or binaries.
#[skip_serializing_none]
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "rhpam.kiegroup.org",
    version = "v1",
    kind = "KogitoBuild",
    namespaced
)]
#[kube(status = "KogitoBuildStatus")]
#[kube(printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#)]
pub struct KogitoBuildSpec {
    #[serde(rename = "type")]
    pub type_: BuildType,
    pub git_source: Option<GitSource>,
    #[serde(default)]
    pub runtime: RuntimeType,
    #[serde(rename = "mavenMirrorURL")]
    pub maven_mirror_url: Option<String>,
    /// Name of the KogitoRuntime fed by this build. Defaults to the build name.
    pub target_kogito_runtime: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum BuildType {
    Binary,
    LocalSource,
    RemoteSource,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    #[default]
    Quarkus,
    Springboot,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GitSource {
    pub uri: String,
    /// Branch, tag or commit.
    pub reference: Option<String>,
    pub context_dir: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, DeriveConditions)]
#[serde(rename_all = "camelCase")]
pub struct KogitoBuildStatus {
    pub observed_generation: Option<i64>,
    pub conditions: Option<Vec<Condition>>,
}
