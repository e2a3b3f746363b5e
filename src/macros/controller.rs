/// Generates a Reconciler Binding for one resource kind: the binding struct
/// (client, logger, scheme), the reconcile `Context`, an error policy and the
/// `SetupWithManager` entry point.
#[macro_export]
macro_rules! reconciler_scaffold {
    (
        reconciler: $reconciler:ident,
        controller_ty: $resource:ty,
        controller: $controller:expr,
        reporter: $reporter:expr,
        reconcile_fn: $reconcile_fn:path,
        error_policy_fn: $error_policy_fn:ident,
        error_requeue_secs: $requeue_secs:expr
    ) => {
        #[derive(Clone)]
        pub struct $reconciler {
            /// Kubernetes client shared with every reconciler
            pub client: kube::Client,
            /// Named logger the reconcile loop runs under
            pub log: tracing::Span,
            /// Scheme shared with the manager
            pub scheme: std::sync::Arc<$crate::scheme::Scheme>,
        }

        #[derive(Clone)]
        pub struct Context {
            pub client: kube::Client,
            pub log: tracing::Span,
            pub scheme: std::sync::Arc<$crate::scheme::Scheme>,
            /// Event recorder for publishing Kubernetes Events
            pub recorder: kube::runtime::events::Recorder,
        }

        fn $error_policy_fn(
            _: std::sync::Arc<$resource>,
            error: &$crate::Error,
            ctx: std::sync::Arc<Context>,
        ) -> kube::runtime::controller::Action {
            ctx.log.in_scope(|| tracing::warn!("reconcile failed: {:?}", error));
            kube::runtime::controller::Action::requeue(
                std::time::Duration::from_secs(($requeue_secs) as u64),
            )
        }

        impl $crate::controllers::SetupWithManager for $reconciler {
            const CONTROLLER: &'static str = $controller;

            async fn setup_with_manager(self, mgr: &mut $crate::ctrl::Manager) -> $crate::Result<()> {
                let recorder = kube::runtime::events::Recorder::new(self.client.clone(), $reporter.into());
                let ctx = std::sync::Arc::new(Context {
                    client: self.client,
                    log: self.log,
                    scheme: self.scheme,
                    recorder,
                });
                $crate::ctrl::Builder::new(mgr)
                    .named(Self::CONTROLLER.to_lowercase())
                    .complete::<$resource, _, _, _, _>($reconcile_fn, $error_policy_fn, ctx)
                    .await
            }
        }
    };
}
