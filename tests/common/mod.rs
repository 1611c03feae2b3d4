//! Instrumented mock engines shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use pdfpress_lib::engine::{Engine, EngineLauncher, PageLayout, Session};
use pdfpress_lib::error::{RenderError, Result};

/// Behavior knobs for engines produced by a [`MockLauncher`].
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub pdf: Vec<u8>,
    pub fail_load: bool,
    pub launch_delay: Duration,
    pub fail_launch: bool,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            pdf: b"%PDF-1.7 mock artifact".to_vec(),
            fail_load: false,
            launch_delay: Duration::from_millis(5),
            fail_launch: false,
        }
    }
}

#[derive(Debug)]
pub struct MockSession {
    behavior: MockBehavior,
    closed: AtomicBool,
}

#[async_trait]
impl Session for MockSession {
    async fn load_html(&self, _html: &str) -> Result<()> {
        if self.behavior.fail_load {
            return Err(RenderError::engine("navigation aborted"));
        }
        Ok(())
    }

    async fn emit_pdf(&self, _layout: &PageLayout) -> Result<Vec<u8>> {
        Ok(self.behavior.pdf.clone())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct MockEngine {
    behavior: MockBehavior,
    connected: AtomicBool,
    disconnect: CancellationToken,
    closes: AtomicUsize,
    sessions: Mutex<Vec<Arc<MockSession>>>,
}

impl MockEngine {
    fn new(behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            connected: AtomicBool::new(true),
            disconnect: CancellationToken::new(),
            closes: AtomicUsize::new(0),
            sessions: Mutex::new(Vec::new()),
        })
    }

    /// Simulates the engine process dying: the connectivity flag drops and
    /// the disconnect notification fires.
    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.disconnect.cancel();
    }

    /// Drops connectivity without firing the notification, so tests can
    /// deliver it late.
    pub fn sever_quietly(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Fires the disconnect notification.
    pub fn fire_disconnect(&self) {
        self.disconnect.cancel();
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn closed_session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|session| session.is_closed())
            .count()
    }
}

#[async_trait]
impl Engine for MockEngine {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn disconnected(&self) -> CancellationToken {
        self.disconnect.clone()
    }

    async fn open_session(&self) -> Result<Arc<dyn Session>> {
        let session = Arc::new(MockSession {
            behavior: self.behavior.clone(),
            closed: AtomicBool::new(false),
        });
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockLauncher {
    behavior: MockBehavior,
    launches: AtomicUsize,
    engines: Mutex<Vec<Arc<MockEngine>>>,
}

impl MockLauncher {
    pub fn new(behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            launches: AtomicUsize::new(0),
            engines: Mutex::new(Vec::new()),
        })
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn engines(&self) -> Vec<Arc<MockEngine>> {
        self.engines.lock().unwrap().clone()
    }

    pub fn latest(&self) -> Arc<MockEngine> {
        self.engines
            .lock()
            .unwrap()
            .last()
            .expect("no engine launched yet")
            .clone()
    }
}

#[async_trait]
impl EngineLauncher for MockLauncher {
    async fn launch(&self) -> Result<Arc<dyn Engine>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.behavior.launch_delay).await;
        if self.behavior.fail_launch {
            return Err(RenderError::engine("no chromium executable found"));
        }
        let engine = MockEngine::new(self.behavior.clone());
        self.engines.lock().unwrap().push(engine.clone());
        Ok(engine)
    }
}
