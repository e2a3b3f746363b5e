//! Startup sequence of the manager binary.
//!
//! Every step is fatal on failure: the error is logged under its context and
//! the process exits with status 1. Controllers already registered when a
//! later step fails are not torn down; the process exit releases them.

use std::future::Future;
use std::sync::Arc;

use tracing::*;

use crate::config::{Args, Configuration};
use crate::controllers::{KogitoBuildReconciler, KogitoRuntimeReconciler, SetupWithManager};
use crate::ctrl::{Manager, Options};
use crate::environment::{self, Environment};
use crate::scheme::Scheme;
use crate::telemetry::{self, Telemetry};
use crate::{Error, crd};

/// Port of the admission webhook server.
pub const SECURE_PORT: u16 = 9443;
/// Name of the Lease replicas compete for when leader election is on.
pub const LEADER_ELECTION_ID: &str = "4662f1d5.kiegroup.org";

pub const RUNTIME_LOGGER: &str = "kogitoruntime_controllers";
pub const BUILD_LOGGER: &str = "kogitoBuild-controller";

#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    #[error("unable to start manager: {0}")]
    StartManager(#[source] Error),

    #[error("unable to create controller {controller}: {source}")]
    CreateController {
        controller: &'static str,
        #[source]
        source: Error,
    },

    #[error("problem running manager: {0}")]
    RunManager(#[source] Error),
}

impl SetupError {
    /// Log under the context message of the failed step.
    pub fn log(&self) {
        match self {
            SetupError::StartManager(e) => error!(error = %e, "unable to start manager"),
            SetupError::CreateController { controller, source } => {
                error!(error = %source, controller = %controller, "unable to create controller")
            }
            SetupError::RunManager(e) => error!(error = %e, "problem running manager"),
        }
    }
}

/// Resolve debug mode and watch scope, and apply the verbosity.
pub fn configure(args: Args, env: &impl Environment, telemetry: &Telemetry) -> Configuration {
    let debug = environment::debug_mode(env);
    if let Err(e) = telemetry.set_debug_mode(debug) {
        warn!("unable to change log verbosity: {e}");
    }
    let watch_namespace = environment::watch_namespace(env);
    Configuration::new(args, watch_namespace, debug)
}

pub fn manager_options(config: &Configuration, scheme: Arc<Scheme>) -> Options {
    Options {
        scheme,
        metrics_bind_address: config.metrics_addr.clone(),
        port: SECURE_PORT,
        leader_election: config.leader_election,
        leader_election_id: LEADER_ELECTION_ID.to_string(),
        leader_election_namespace: None,
        namespace: config.watch_namespace.clone(),
    }
}

/// Register both reconcilers in order, stopping at the first failure.
pub async fn setup_controllers<R, B>(mgr: &mut Manager, runtime: R, build: B) -> Result<(), SetupError>
where
    R: SetupWithManager,
    B: SetupWithManager,
{
    register(mgr, runtime).await?;
    register(mgr, build).await
}

async fn register<C: SetupWithManager>(mgr: &mut Manager, reconciler: C) -> Result<(), SetupError> {
    reconciler
        .setup_with_manager(mgr)
        .await
        .map_err(|source| SetupError::CreateController {
            controller: C::CONTROLLER,
            source,
        })
}

/// Build the manager, register the controllers and run until `signal` fires.
///
/// Failures are logged before they are returned.
pub async fn run<F, Fut, S>(config: &Configuration, new_manager: F, signal: S) -> Result<(), SetupError>
where
    F: FnOnce(Options) -> Fut,
    Fut: Future<Output = crate::Result<Manager>>,
    S: Future<Output = ()> + Send,
{
    let result = start(config, new_manager, signal).await;
    if let Err(e) = &result {
        e.log();
    }
    result
}

async fn start<F, Fut, S>(config: &Configuration, new_manager: F, signal: S) -> Result<(), SetupError>
where
    F: FnOnce(Options) -> Fut,
    Fut: Future<Output = crate::Result<Manager>>,
    S: Future<Output = ()> + Send,
{
    let scheme = Arc::new(crd::registered_scheme());
    let mut mgr = new_manager(manager_options(config, scheme))
        .await
        .map_err(SetupError::StartManager)?;

    let runtime = KogitoRuntimeReconciler {
        client: mgr.client(),
        log: telemetry::logger(RUNTIME_LOGGER),
        scheme: mgr.scheme(),
    };
    let build = KogitoBuildReconciler {
        client: mgr.client(),
        log: telemetry::logger(BUILD_LOGGER),
        scheme: mgr.scheme(),
    };
    setup_controllers(&mut mgr, runtime, build).await?;

    info!("starting manager");
    mgr.start(signal).await.map_err(SetupError::RunManager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use clap::Parser;

    use crate::telemetry::capture::Captured;

    type Calls = Arc<Mutex<Vec<&'static str>>>;

    fn test_client() -> kube::Client {
        kube::Client::try_from(kube::Config::new("http://127.0.0.1:1".parse().unwrap())).unwrap()
    }

    fn test_manager() -> Manager {
        let options = Options {
            metrics_bind_address: "0".to_string(),
            ..Options::default()
        };
        Manager::new(test_client(), options).unwrap()
    }

    fn config(watch_namespace: &str) -> Configuration {
        let args = Args::try_parse_from(["manager", "--metrics-addr=0"]).unwrap();
        Configuration::new(args, watch_namespace.to_string(), false)
    }

    macro_rules! stub_reconciler {
        ($name:ident, $controller:literal) => {
            struct $name {
                fail: bool,
                calls: Calls,
            }

            impl SetupWithManager for $name {
                const CONTROLLER: &'static str = $controller;

                async fn setup_with_manager(self, mgr: &mut Manager) -> crate::Result<()> {
                    self.calls.lock().unwrap().push(Self::CONTROLLER);
                    if self.fail {
                        return Err(Error::OtherError("invalid reconciler".to_string()));
                    }
                    mgr.add(Self::CONTROLLER, |shutdown| async move {
                        shutdown.await;
                        Ok(())
                    })
                }
            }
        };
    }

    stub_reconciler!(RuntimeStub, "KogitoRuntime");
    stub_reconciler!(BuildStub, "KogitoBuild");

    fn stubs(runtime_fails: bool, build_fails: bool) -> (RuntimeStub, BuildStub, Calls) {
        let calls = Calls::default();
        (
            RuntimeStub {
                fail: runtime_fails,
                calls: calls.clone(),
            },
            BuildStub {
                fail: build_fails,
                calls: calls.clone(),
            },
            calls,
        )
    }

    #[test]
    fn options_carry_fixed_port_and_election_id() {
        let mut config = config("team-a");
        config.leader_election = true;
        let options = manager_options(&config, Arc::new(crd::registered_scheme()));
        assert_eq!(options.port, 9443);
        assert_eq!(options.leader_election_id, "4662f1d5.kiegroup.org");
        assert!(options.leader_election);
        assert_eq!(options.metrics_bind_address, "0");
        assert_eq!(options.namespace, "team-a");
        assert_eq!(options.scheme.len(), 2);
    }

    #[test]
    fn configure_reads_environment() {
        let args = Args::try_parse_from(["manager", "--enable-leader-election"]).unwrap();
        let env: BTreeMap<String, String> = [("WATCH_NAMESPACE", "team-b"), ("DEBUG", "True")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = configure(args, &env, &Telemetry::detached());
        assert_eq!(config.watch_namespace, "team-b");
        assert!(config.debug);
        assert!(config.leader_election);
        assert_eq!(config.metrics_addr, ":8080");
    }

    #[test]
    fn configure_defaults_to_cluster_scope() {
        let args = Args::try_parse_from(["manager"]).unwrap();
        let config = configure(args, &BTreeMap::<String, String>::new(), &Telemetry::detached());
        assert!(config.cluster_scoped());
        assert!(!config.debug);
    }

    #[tokio::test]
    async fn registers_both_controllers_in_order() {
        let mut mgr = test_manager();
        let (runtime, build, calls) = stubs(false, false);
        setup_controllers(&mut mgr, runtime, build).await.unwrap();
        assert_eq!(*calls.lock().unwrap(), ["KogitoRuntime", "KogitoBuild"]);
    }

    #[tokio::test]
    async fn runtime_failure_skips_build_registration() {
        let mut mgr = test_manager();
        let (runtime, build, calls) = stubs(true, false);
        let err = setup_controllers(&mut mgr, runtime, build).await.unwrap_err();
        assert!(matches!(
            err,
            SetupError::CreateController {
                controller: "KogitoRuntime",
                ..
            }
        ));
        assert_eq!(*calls.lock().unwrap(), ["KogitoRuntime"]);
    }

    #[tokio::test]
    async fn build_failure_names_build_controller() {
        let mut mgr = test_manager();
        let (runtime, build, calls) = stubs(false, true);
        let err = setup_controllers(&mut mgr, runtime, build).await.unwrap_err();
        assert!(err.to_string().starts_with("unable to create controller KogitoBuild"));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn manager_construction_failure_is_start_error() {
        let out = Captured::default();
        let _guard = tracing::subscriber::set_default(out.subscriber());
        let err = run(
            &config(""),
            |_| async { Err(Error::MissingLeaderElectionId) },
            std::future::pending(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SetupError::StartManager(Error::MissingLeaderElectionId)));
        assert!(err.to_string().starts_with("unable to start manager"));

        let logs = out.text();
        assert_eq!(logs.matches("unable to start manager").count(), 1);
        assert!(logs.contains("ERROR"));
        assert!(!logs.contains("starting manager"));
    }

    #[tokio::test]
    async fn factory_receives_driver_options() {
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let _ = run(
            &config("team-c"),
            move |options: Options| async move {
                *captured.lock().unwrap() = Some((options.port, options.namespace.clone()));
                Err(Error::OtherError("no cluster".to_string()))
            },
            std::future::pending(),
        )
        .await;
        assert_eq!(*seen.lock().unwrap(), Some((9443, "team-c".to_string())));
    }

    #[tokio::test]
    async fn unreachable_cluster_fails_runtime_registration() {
        let out = Captured::default();
        let _guard = tracing::subscriber::set_default(out.subscriber());
        let err = run(
            &config(""),
            |options| async move { Manager::new(test_client(), options) },
            std::future::pending(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            SetupError::CreateController {
                controller: "KogitoRuntime",
                ..
            }
        ));

        let logs = out.text();
        assert!(logs.contains("unable to create controller"));
        assert!(logs.contains("controller=KogitoRuntime"));
        assert!(!logs.contains("starting manager"));
    }

    #[test]
    fn debug_env_is_logged_while_configuring() {
        let out = Captured::default();
        let args = Args::try_parse_from(["manager"]).unwrap();
        let env: BTreeMap<String, String> = [("DEBUG".to_string(), "true".to_string())].into();
        let config = tracing::subscriber::with_default(out.subscriber(), || {
            configure(args, &env, &Telemetry::detached())
        });
        assert!(config.debug);
        let logs = out.text();
        assert!(logs.contains("Running in Debug Mode"));
        assert!(logs.contains("running as cluster scoped"));
    }

    #[test]
    fn run_error_message() {
        let err = SetupError::RunManager(Error::LeaderElectionLost);
        assert_eq!(err.to_string(), "problem running manager: leader election lost");
    }
}
