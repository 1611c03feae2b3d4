//! Dual-mode request pipeline: validation, strategy selection, admission,
//! and teardown sequencing.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::artifact::{safe_filename, Pdf};
use crate::config::RenderConfig;
use crate::engine::{Engine, EngineLauncher, Session};
use crate::error::{RenderError, Result};
use crate::lifecycle::SharedEngine;
use crate::renderer::{self, RenderBudgets};

/// Which resource strategy a request runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Fresh engine handle, private to the request, destroyed afterwards.
    Isolated,
    /// Long-lived shared handle, fresh session per request.
    Shared,
}

/// Input envelope for one render.
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    pub html: String,
    pub filename: Option<String>,
    pub correlation_id: Option<String>,
}

/// A finished render: the artifact plus the resources whose close is
/// deferred until the response has finished transmitting.
pub struct RenderOutcome {
    pub pdf: Pdf,
    pub filename: String,
    pub correlation_id: String,
    pub teardown: Teardown,
}

/// Deferred close of per-request resources.
///
/// Runs when [`Teardown::run`] is awaited. If the outcome is abandoned
/// instead (the client vanished before the response could be delivered),
/// the drop impl detaches the same cleanup, so resources are released on
/// every path. Shared-mode teardown never holds the engine handle.
pub struct Teardown {
    session: Option<Arc<dyn Session>>,
    engine: Option<Arc<dyn Engine>>,
    correlation_id: String,
}

impl Teardown {
    pub async fn run(mut self) {
        let session = self.session.take();
        let engine = self.engine.take();
        close_resources(session, engine, &self.correlation_id).await;
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        let session = self.session.take();
        let engine = self.engine.take();
        if session.is_none() && engine.is_none() {
            return;
        }
        let correlation_id = self.correlation_id.clone();
        debug!(
            correlation_id = %correlation_id,
            "response abandoned before completion, releasing render resources"
        );
        // Dropping may happen while the runtime is shutting down; a panic
        // here would abort the process.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                close_resources(session, engine, &correlation_id).await;
            });
        }
    }
}

async fn close_resources(
    session: Option<Arc<dyn Session>>,
    engine: Option<Arc<dyn Engine>>,
    correlation_id: &str,
) {
    if let Some(session) = session {
        if session.close().await.is_err() {
            debug!(correlation_id, "session close failed during teardown");
        }
    }
    if let Some(engine) = engine {
        if engine.close().await.is_err() {
            debug!(correlation_id, "engine close failed during teardown");
        }
    }
}

/// Executes renders under either resource strategy.
#[derive(Clone)]
pub struct RenderService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    launcher: Arc<dyn EngineLauncher>,
    shared: SharedEngine,
    budgets: RenderBudgets,
    admission: Option<Arc<Semaphore>>,
}

impl RenderService {
    pub fn new(launcher: Arc<dyn EngineLauncher>, config: &RenderConfig) -> Self {
        let shared = SharedEngine::new(launcher.clone());
        let admission = config
            .max_concurrent
            .map(|permits| Arc::new(Semaphore::new(permits.max(1))));
        Self {
            inner: Arc::new(ServiceInner {
                launcher,
                shared,
                budgets: RenderBudgets::from(config),
                admission,
            }),
        }
    }

    pub fn shared_engine(&self) -> &SharedEngine {
        &self.inner.shared
    }

    /// Runs one render to completion.
    ///
    /// Input is validated before any engine resource is touched. The render
    /// itself runs on a detached task: dropping the returned future (client
    /// disconnect) leaves the render running server-side, and the abandoned
    /// outcome releases its own resources.
    pub async fn render(&self, mode: RenderMode, request: RenderRequest) -> Result<RenderOutcome> {
        if request.html.trim().is_empty() {
            return Err(RenderError::invalid_input(
                "html must be a non-empty string",
            ));
        }

        let correlation_id = request
            .correlation_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let filename = safe_filename(request.filename.as_deref());

        let permit = match &self.inner.admission {
            Some(semaphore) => Some(
                semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| RenderError::engine("render admission closed"))?,
            ),
            None => None,
        };

        let service = self.inner.clone();
        let html = request.html;
        let id = correlation_id.clone();
        let span = info_span!("render", mode = ?mode, correlation_id = %correlation_id);
        let task = tokio::spawn(
            async move { execute(service, mode, html, filename, id, permit).await }.instrument(span),
        );

        match task.await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(RenderError::engine(format!(
                "render task failed: {join_err}"
            ))),
        }
    }
}

async fn execute(
    service: Arc<ServiceInner>,
    mode: RenderMode,
    html: String,
    filename: String,
    correlation_id: String,
    _permit: Option<OwnedSemaphorePermit>,
) -> Result<RenderOutcome> {
    match mode {
        RenderMode::Isolated => {
            // A private engine, launched for this request alone.
            let engine = service.launcher.launch().await?;
            match renderer::render(engine.as_ref(), &html, &correlation_id, service.budgets).await {
                Ok((session, pdf)) => Ok(RenderOutcome {
                    pdf,
                    filename,
                    correlation_id: correlation_id.clone(),
                    teardown: Teardown {
                        session: Some(session),
                        engine: Some(engine),
                        correlation_id,
                    },
                }),
                Err(err) => {
                    // The coordinator already closed the session; the private
                    // engine goes with it.
                    if engine.close().await.is_err() {
                        debug!(
                            correlation_id = %correlation_id,
                            "engine close failed after render failure"
                        );
                    }
                    Err(err)
                }
            }
        }
        RenderMode::Shared => {
            let engine = service.shared.acquire().await?;
            let (session, pdf) =
                renderer::render(engine.as_ref(), &html, &correlation_id, service.budgets).await?;
            Ok(RenderOutcome {
                pdf,
                filename,
                correlation_id: correlation_id.clone(),
                teardown: Teardown {
                    session: Some(session),
                    engine: None,
                    correlation_id,
                },
            })
        }
    }
}
