use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;

pub mod conditions {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
    pub trait Conditions {
        fn conditions(&self) -> &Option<Vec<Condition>>;
        fn conditions_mut(&mut self) -> &mut Option<Vec<Condition>>;
        fn observed_generation(&self) -> Option<i64> {
            None
        }
        fn set_observed_generation(&mut self, _generation: i64) {}
    }
}

#[derive(Default, operator_derive::Conditions)]
pub struct KogitoRuntimeStatus {
    pub observed_generation: Option<i64>,
    pub conditions: Option<Vec<Condition>>,
}

#[derive(Default, operator_derive::Conditions)]
pub struct BareStatus {
    pub conditions: Option<Vec<Condition>>,
    pub message: Option<String>,
}

fn main() {
    use conditions::Conditions;

    let mut status = KogitoRuntimeStatus::default();
    status.set_observed_generation(2);
    assert_eq!(status.observed_generation(), Some(2));
    assert!(BareStatus::default().conditions().is_none());
}
