//! Rendering-engine capability seam.
//!
//! The coordination layer never talks to Chromium directly; it goes through
//! these traits so the lifecycle and pipeline logic can be exercised against
//! instrumented mock engines.

mod chromium;

pub use chromium::ChromiumLauncher;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Launches rendering-engine processes.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn Engine>>;
}

/// A live handle to one running rendering-engine process.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Whether the engine process is still reachable. A disconnected handle
    /// must never be handed to a caller.
    fn is_connected(&self) -> bool;

    /// Token cancelled exactly once, when the engine process goes away.
    fn disconnected(&self) -> CancellationToken;

    /// Opens a fresh rendering session (one page) on this handle.
    async fn open_session(&self) -> Result<Arc<dyn Session>>;

    /// Closes the engine process. Idempotent best-effort.
    async fn close(&self) -> Result<()>;
}

/// A single rendering context bound to one engine handle, used for exactly
/// one render.
#[async_trait]
pub trait Session: Send + Sync + std::fmt::Debug {
    /// Loads HTML into the session and waits until network activity has
    /// settled, with the screen media profile applied.
    async fn load_html(&self, html: &str) -> Result<()>;

    /// Emits the paginated artifact for the loaded content.
    async fn emit_pdf(&self, layout: &PageLayout) -> Result<Vec<u8>>;

    /// Closes the session. Idempotent best-effort.
    async fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// Fixed page geometry for emitted artifacts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    /// Paper width in inches.
    pub width_in: f64,
    /// Paper height in inches.
    pub height_in: f64,
    /// Uniform margin on all four sides, in inches.
    pub margin_in: f64,
    /// Render background graphics into the artifact.
    pub print_background: bool,
}

impl PageLayout {
    /// A4 paper with a uniform 10mm margin and backgrounds enabled.
    pub fn a4() -> Self {
        Self {
            width_in: 8.27,
            height_in: 11.69,
            margin_in: 10.0 / 25.4,
            print_background: true,
        }
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::a4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_layout_matches_expected_geometry() {
        let layout = PageLayout::a4();
        assert!((layout.width_in - 8.27).abs() < 1e-9);
        assert!((layout.height_in - 11.69).abs() < 1e-9);
        assert!((layout.margin_in - 10.0 / 25.4).abs() < 1e-9);
        assert!(layout.print_background);
        assert_eq!(PageLayout::default(), layout);
    }
}
