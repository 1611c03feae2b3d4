//! pdfpress library
//!
//! HTML-to-PDF conversion over HTTP, backed by a headless Chromium engine
//! reached through a capability trait. Two resource strategies are offered:
//! an isolated engine per request, and a shared long-lived engine with a
//! disposable session per request.
//!
//! # Module Overview
//!
//! - [`engine`] - Rendering-engine capability traits and the Chromium backend
//! - [`lifecycle`] - Shared-engine singleton with single-flight launches
//! - [`renderer`] - One bounded render: load content, emit the artifact
//! - [`pipeline`] - Dual-mode dispatch, admission, deferred teardown
//! - [`deadline`] - Per-stage timeout guard
//! - [`artifact`] - PDF artifact, signature check, download framing
//! - [`http`] - Axum router and handlers
//! - [`config`] - Configuration file support
//! - [`error`] - Error taxonomy and JSON error bodies
//! - [`telemetry`] - Tracing subscriber setup

pub mod artifact;
pub mod config;
pub mod deadline;
pub mod engine;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod pipeline;
pub mod renderer;
pub mod telemetry;

pub use artifact::{safe_filename, Pdf, DEFAULT_FILENAME, PDF_SIGNATURE};
pub use config::Config;
pub use deadline::with_deadline;
pub use engine::{ChromiumLauncher, Engine, EngineLauncher, PageLayout, Session};
pub use error::{ErrorBody, RenderError, Result};
pub use lifecycle::SharedEngine;
pub use pipeline::{RenderMode, RenderOutcome, RenderRequest, RenderService, Teardown};
pub use renderer::RenderBudgets;
