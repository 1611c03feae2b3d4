//! Drives one rendering session from raw HTML to a finished artifact.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::artifact::Pdf;
use crate::config::RenderConfig;
use crate::deadline::with_deadline;
use crate::engine::{Engine, PageLayout, Session};
use crate::error::{RenderError, Result};

/// Per-stage time budgets for one render.
#[derive(Debug, Clone, Copy)]
pub struct RenderBudgets {
    pub load: Duration,
    pub emit: Duration,
}

impl Default for RenderBudgets {
    fn default() -> Self {
        Self {
            load: Duration::from_secs(25),
            emit: Duration::from_secs(20),
        }
    }
}

impl From<&RenderConfig> for RenderBudgets {
    fn from(config: &RenderConfig) -> Self {
        Self {
            load: config.load_timeout,
            emit: config.emit_timeout,
        }
    }
}

/// Renders `html` on a fresh session of `engine`.
///
/// On success the session is returned still open; the caller decides when to
/// close it relative to response delivery. On any failure the session is
/// closed here, best-effort, before the error propagates — sessions never
/// leak on the error path.
pub async fn render(
    engine: &dyn Engine,
    html: &str,
    correlation_id: &str,
    budgets: RenderBudgets,
) -> Result<(Arc<dyn Session>, Pdf)> {
    if !engine.is_connected() {
        return Err(RenderError::EngineUnavailable(
            "engine handle is disconnected".to_string(),
        ));
    }

    let session = engine.open_session().await?;

    match drive(session.clone(), html.to_string(), budgets).await {
        Ok(pdf) => {
            if !pdf.has_signature() {
                warn!(
                    correlation_id,
                    bytes = pdf.len(),
                    "rendered artifact is missing the %PDF- signature"
                );
            }
            debug!(correlation_id, bytes = pdf.len(), "render complete");
            Ok((session, pdf))
        }
        Err(err) => {
            // A close failure must not mask the render error.
            if session.close().await.is_err() {
                debug!(correlation_id, "session close failed during error cleanup");
            }
            Err(err)
        }
    }
}

async fn drive(session: Arc<dyn Session>, html: String, budgets: RenderBudgets) -> Result<Pdf> {
    let loading = session.clone();
    with_deadline(
        async move { loading.load_html(&html).await },
        budgets.load,
        format!("content load exceeded {}s", budgets.load.as_secs()),
    )
    .await?;

    let bytes = with_deadline(
        async move { session.emit_pdf(&PageLayout::a4()).await },
        budgets.emit,
        format!("artifact emission exceeded {}s", budgets.emit.as_secs()),
    )
    .await?;

    Ok(Pdf::new(bytes))
}
