//! Lifecycle of the shared, long-lived engine handle.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{info, warn};

use crate::engine::{Engine, EngineLauncher};
use crate::error::{RenderError, Result};

type LaunchFuture =
    Shared<BoxFuture<'static, std::result::Result<Arc<dyn Engine>, Arc<RenderError>>>>;

enum Slot {
    /// No handle and no launch in flight.
    Absent,
    /// A launch is in flight; every concurrent acquire awaits this future.
    Launching(LaunchFuture),
    /// The singleton handle, reused across requests while connected.
    Ready(Arc<dyn Engine>),
}

/// Owns the process-lifetime engine handle shared across requests.
///
/// At most one live handle and at most one in-flight launch exist at any
/// time. The launch future itself settles the slot, so the ticket clears on
/// success and failure alike, and a per-handle watcher clears the slot when
/// the engine disconnects.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Inner>,
}

struct Inner {
    launcher: Arc<dyn EngineLauncher>,
    slot: Mutex<Slot>,
}

impl SharedEngine {
    pub fn new(launcher: Arc<dyn EngineLauncher>) -> Self {
        Self {
            inner: Arc::new(Inner {
                launcher,
                slot: Mutex::new(Slot::Absent),
            }),
        }
    }

    /// Returns the shared handle, launching the engine if needed.
    ///
    /// Safe to call concurrently: callers arriving while a launch is in
    /// flight await the same outcome instead of starting a second launch,
    /// and a stored handle that lost its process triggers a relaunch rather
    /// than being handed out.
    pub async fn acquire(&self) -> Result<Arc<dyn Engine>> {
        let launch = {
            let mut slot = lock(&self.inner.slot);
            match std::mem::replace(&mut *slot, Slot::Absent) {
                Slot::Ready(engine) if engine.is_connected() => {
                    *slot = Slot::Ready(engine.clone());
                    return Ok(engine);
                }
                Slot::Launching(pending) => {
                    *slot = Slot::Launching(pending.clone());
                    pending
                }
                // Absent, or a stored handle that lost its process.
                _ => {
                    let launch = begin_launch(self.inner.clone());
                    *slot = Slot::Launching(launch.clone());
                    launch
                }
            }
        };

        launch
            .await
            .map_err(|err| RenderError::engine(format!("engine launch failed: {err}")))
    }

    /// Closes the stored handle, if any. An in-flight launch is left to
    /// settle on its own; process exit does not wait for it.
    pub async fn shutdown(&self) {
        let engine = {
            let mut slot = lock(&self.inner.slot);
            if matches!(&*slot, Slot::Ready(_)) {
                match std::mem::replace(&mut *slot, Slot::Absent) {
                    Slot::Ready(engine) => Some(engine),
                    _ => None,
                }
            } else {
                None
            }
        };

        if let Some(engine) = engine {
            if let Err(err) = engine.close().await {
                warn!(error = %err, "failed to close shared engine during shutdown");
            }
        }
    }
}

fn begin_launch(inner: Arc<Inner>) -> LaunchFuture {
    async move {
        match inner.launcher.launch().await {
            Ok(engine) => {
                {
                    let mut slot = lock(&inner.slot);
                    *slot = Slot::Ready(engine.clone());
                }
                info!("shared engine launched");
                watch_disconnect(inner, engine.clone());
                Ok(engine)
            }
            Err(err) => {
                let mut slot = lock(&inner.slot);
                *slot = Slot::Absent;
                warn!(error = %err, "shared engine launch failed");
                Err(Arc::new(err))
            }
        }
    }
    .boxed()
    .shared()
}

/// One subscription per handle. The identity check makes stale deliveries
/// idempotent: a late notification from a replaced handle cannot unset the
/// current one.
fn watch_disconnect(inner: Arc<Inner>, engine: Arc<dyn Engine>) {
    let token = engine.disconnected();
    tokio::spawn(async move {
        token.cancelled().await;
        let mut slot = lock(&inner.slot);
        if let Slot::Ready(current) = &*slot {
            if Arc::ptr_eq(current, &engine) {
                warn!("shared engine disconnected, clearing handle");
                *slot = Slot::Absent;
            }
        }
    });
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
