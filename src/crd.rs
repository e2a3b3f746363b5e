//! Custom resources managed by the operator, and the scheme that registers them.

mod build;
mod runtime;

pub use build::*;
pub use runtime::*;

use crate::scheme::Scheme;

pub static API_GROUP: &str = "rhpam.kiegroup.org";

/// Build the scheme handed to the manager and every reconciler.
pub fn registered_scheme() -> Scheme {
    let mut scheme = Scheme::new();
    scheme
        .add_known_type::<KogitoRuntime>()
        .add_known_type::<KogitoBuild>();
    scheme
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::{CustomResourceExt, core::GroupVersionKind};

    #[test]
    fn scheme_contains_both_kinds() {
        let scheme = registered_scheme();
        assert_eq!(scheme.len(), 2);
        assert!(scheme.is_registered::<KogitoRuntime>());
        assert!(scheme.is_registered::<KogitoBuild>());
        assert!(scheme.recognizes(&GroupVersionKind::gvk(API_GROUP, "v1", "KogitoBuild")));
    }

    #[test]
    fn crds_are_namespaced_with_status() {
        for crd in [KogitoRuntime::crd(), KogitoBuild::crd()] {
            assert_eq!(crd.spec.group, API_GROUP);
            assert_eq!(crd.spec.scope, "Namespaced");
            let version = &crd.spec.versions[0];
            assert!(version.subresources.as_ref().and_then(|s| s.status.as_ref()).is_some());
        }
        assert_eq!(KogitoRuntime::crd_name(), "kogitoruntimes.rhpam.kiegroup.org");
        assert_eq!(KogitoBuild::crd_name(), "kogitobuilds.rhpam.kiegroup.org");
    }
}
