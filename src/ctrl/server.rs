use std::collections::BTreeMap;
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, Responder, dev::ServerHandle, get, middleware, web::Data};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::*;

use super::metrics::Metrics;
use crate::{Error, Result};

/// Diagnostics exposed by the web server
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Empty when cluster scoped
    pub watch_namespace: String,
    pub leader: bool,
    /// Last reconcile seen per controller
    pub last_event: BTreeMap<String, DateTime<Utc>>,
}

/// State shared between the controllers and the web server
#[derive(Clone)]
pub struct State {
    namespace: String,
    leader: Arc<AtomicBool>,
    last_event: Arc<RwLock<BTreeMap<String, DateTime<Utc>>>>,
    metrics: Arc<Metrics>,
}

impl State {
    pub fn new(namespace: &str, metrics: Arc<Metrics>) -> Self {
        Self {
            namespace: namespace.to_string(),
            leader: Arc::new(AtomicBool::new(false)),
            last_event: Arc::default(),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn leader_flag(&self) -> Arc<AtomicBool> {
        self.leader.clone()
    }

    pub async fn touch(&self, controller: &str) {
        self.last_event
            .write()
            .await
            .insert(controller.to_string(), Utc::now());
    }

    pub async fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            watch_namespace: self.namespace.clone(),
            leader: self.leader.load(Ordering::SeqCst),
            last_event: self.last_event.read().await.clone(),
        }
    }
}

#[get("/health")]
async fn health(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

#[get("/healthz")]
async fn healthz(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

#[get("/metrics")]
async fn metrics_endpoint(c: Data<State>, _req: HttpRequest) -> impl Responder {
    match c.metrics.gather() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            warn!("failed to encode metrics: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/")]
async fn index(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let d = c.diagnostics().await;
    HttpResponse::Ok().json(&d)
}

/// Running metrics server; stop it with [`MetricsServer::stop`].
pub struct MetricsServer {
    handle: ServerHandle,
    task: JoinHandle<std::io::Result<()>>,
}

impl MetricsServer {
    /// Serve on an already bound listener. Signal handling stays with the manager.
    pub fn serve(listener: TcpListener, state: State) -> Result<Self> {
        let addr = listener.local_addr().map_err(Error::IoError)?;
        let server = HttpServer::new(move || {
            App::new()
                .app_data(Data::new(state.clone()))
                .wrap(middleware::Logger::default().exclude("/health").exclude("/healthz"))
                .service(index)
                .service(health)
                .service(healthz)
                .service(metrics_endpoint)
        })
        .workers(1)
        .disable_signals()
        .listen(listener)
        .map_err(Error::IoError)?
        .shutdown_timeout(5)
        .run();
        info!(%addr, "serving metrics");
        Ok(Self {
            handle: server.handle(),
            task: tokio::spawn(server),
        })
    }

    pub async fn stop(self) {
        self.handle.stop(true).await;
        match self.task.await {
            Ok(Err(e)) => warn!("metrics server exited with error: {e}"),
            Err(e) => warn!("metrics server task failed: {e}"),
            Ok(Ok(())) => debug!("metrics server stopped"),
        }
    }
}
