//! Headless Chromium implementation of the engine capability.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetEmulatedMediaParams;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::{Engine, EngineLauncher, PageLayout, Session};
use crate::error::{RenderError, Result};

/// Launches headless Chromium processes via the DevTools protocol.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    config: EngineConfig,
}

impl ChromiumLauncher {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Arc<dyn Engine>> {
        let mut builder = BrowserConfig::builder();
        if let Some(path) = &self.config.executable {
            builder = builder.chrome_executable(path);
        }
        if !self.config.headless {
            builder = builder.with_head();
        }
        for arg in &self.config.extra_args {
            builder = builder.arg(arg.as_str());
        }
        let config = builder.build().map_err(RenderError::Engine)?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|err| RenderError::engine(format!("failed to launch chromium: {err}")))?;

        // The CDP event loop doubles as the disconnect observer: the stream
        // only ends once the browser process is gone.
        let disconnect = CancellationToken::new();
        let observer = disconnect.clone();
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
            debug!("chromium event stream ended, marking engine disconnected");
            observer.cancel();
        });

        Ok(Arc::new(ChromiumEngine {
            browser: Mutex::new(browser),
            disconnect,
        }))
    }
}

struct ChromiumEngine {
    browser: Mutex<Browser>,
    disconnect: CancellationToken,
}

#[async_trait]
impl Engine for ChromiumEngine {
    fn is_connected(&self) -> bool {
        !self.disconnect.is_cancelled()
    }

    fn disconnected(&self) -> CancellationToken {
        self.disconnect.clone()
    }

    async fn open_session(&self) -> Result<Arc<dyn Session>> {
        let browser = self.browser.lock().await;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|err| RenderError::engine(format!("failed to open page: {err}")))?;

        Ok(Arc::new(ChromiumSession {
            page,
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|err| RenderError::engine(format!("failed to close chromium: {err}")))?;
        let _ = browser.wait().await;
        Ok(())
    }
}

#[derive(Debug)]
struct ChromiumSession {
    page: Page,
    closed: AtomicBool,
}

#[async_trait]
impl Session for ChromiumSession {
    async fn load_html(&self, html: &str) -> Result<()> {
        // Callers submit arbitrary HTML and expect screen fidelity, not the
        // print stylesheet Chromium would otherwise apply to PDF output.
        self.page
            .execute(SetEmulatedMediaParams {
                media: Some("screen".to_string()),
                ..Default::default()
            })
            .await
            .map_err(cdp_err)?;

        self.page.set_content(html).await.map_err(cdp_err)?;
        self.page.wait_for_navigation().await.map_err(cdp_err)?;
        Ok(())
    }

    async fn emit_pdf(&self, layout: &PageLayout) -> Result<Vec<u8>> {
        let params = PrintToPdfParams {
            print_background: Some(layout.print_background),
            paper_width: Some(layout.width_in),
            paper_height: Some(layout.height_in),
            margin_top: Some(layout.margin_in),
            margin_bottom: Some(layout.margin_in),
            margin_left: Some(layout.margin_in),
            margin_right: Some(layout.margin_in),
            ..Default::default()
        };
        self.page.pdf(params).await.map_err(cdp_err)
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.page.clone().close().await.map_err(cdp_err)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn cdp_err(err: CdpError) -> RenderError {
    RenderError::engine(err.to_string())
}
