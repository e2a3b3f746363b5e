use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition as K8sCondition, Time};
pub use operator_derive::Conditions as DeriveConditions;

pub const CONDITION_RECONCILED: &str = "Reconciled";

/// Status types that expose Kubernetes-style `conditions`.
///
/// Usually implemented through `#[derive(DeriveConditions)]`.
pub trait Conditions {
    fn conditions(&self) -> &Option<Vec<K8sCondition>>;
    fn conditions_mut(&mut self) -> &mut Option<Vec<K8sCondition>>;

    /// Generation last handled by a reconciler, if the status tracks one.
    fn observed_generation(&self) -> Option<i64> {
        None
    }

    fn set_observed_generation(&mut self, _generation: i64) {}

    fn condition(&self, type_: &str) -> Option<&K8sCondition> {
        self.conditions()
            .as_ref()
            .and_then(|conds| conds.iter().find(|c| c.type_ == type_))
    }

    fn is_true(&self, type_: &str) -> bool {
        self.condition(type_).is_some_and(|c| c.status == "True")
    }

    /// Upsert a boolean condition for the given generation.
    fn upsert_bool(
        &mut self,
        type_: &str,
        status: bool,
        reason: &str,
        message: Option<&str>,
        observed_generation: i64,
    ) {
        let cond = K8sCondition {
            type_: type_.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            reason: reason.to_string(),
            message: message.unwrap_or_default().to_string(),
            observed_generation: Some(observed_generation),
            last_transition_time: Time(chrono::Utc::now()),
        };
        self.upsert_condition(cond);
    }

    /// Insert or replace a condition by type. The transition time only moves
    /// when the status flips.
    fn upsert_condition(&mut self, new_cond: K8sCondition) {
        let conds = self.conditions_mut().get_or_insert_with(Vec::new);
        match conds.iter_mut().find(|c| c.type_ == new_cond.type_) {
            Some(existing) if existing.status == new_cond.status => {
                existing.reason = new_cond.reason;
                existing.message = new_cond.message;
                existing.observed_generation = new_cond.observed_generation;
            }
            Some(existing) => *existing = new_cond,
            None => conds.push(new_cond),
        }
    }
}
