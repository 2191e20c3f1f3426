//! Live-render backend client.
//!
//! The backend materializes missing tiles on demand behind a plain URL
//! contract, and exposes a status document the UI polls while live
//! rendering is enabled.

use crate::fetch::Fetch;
use crossbeam_channel::{unbounded, Receiver};
use quadscope_core::TileKey;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Poll cadence while live rendering is on.
const POLL_INTERVAL: Duration = Duration::from_millis(300);

pub fn live_tile_url(backend_base: &str, dataset: &str, key: &TileKey) -> String {
    format!(
        "{}/live/{}/{}/{}/{}.webp",
        backend_base.trim_end_matches('/'),
        dataset,
        key.level,
        key.x,
        key.y
    )
}

pub fn status_url(backend_base: &str) -> String {
    format!("{}/status", backend_base.trim_end_matches('/'))
}

/// Snapshot of the backend's render queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackendStatus {
    pub up: bool,
    #[serde(default)]
    pub active_renders: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
}

/// One status fetch. `None` means the backend is unreachable or spoke
/// garbage; the UI shows it as unavailable.
pub fn fetch_status(fetch: &dyn Fetch, backend_base: &str) -> Option<BackendStatus> {
    let url = status_url(backend_base);
    let response = match fetch.get(&url) {
        Ok(response) if response.is_success() => response,
        Ok(response) => {
            log::debug!("status poll returned {}", response.status);
            return None;
        }
        Err(e) => {
            log::debug!("status poll failed: {}", e);
            return None;
        }
    };
    match serde_json::from_slice(&response.body) {
        Ok(status) => Some(status),
        Err(e) => {
            log::debug!("status parse failed: {}", e);
            None
        }
    }
}

/// Background poller posting snapshots on a channel.
pub struct StatusPoller {
    snapshots: Receiver<Option<BackendStatus>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    latest: Option<BackendStatus>,
}

impl StatusPoller {
    pub fn spawn(fetch: Arc<dyn Fetch>, backend_base: String) -> Self {
        let (tx, rx) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name("status-poller".to_string())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    let status = fetch_status(fetch.as_ref(), &backend_base);
                    if tx.send(status).is_err() {
                        break;
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            })
            .expect("spawn status poller");
        Self {
            snapshots: rx,
            stop,
            handle: Some(handle),
            latest: None,
        }
    }

    /// Latest snapshot, draining anything queued since the last call.
    pub fn latest(&mut self) -> Option<&BackendStatus> {
        for snapshot in self.snapshots.try_iter() {
            self.latest = snapshot;
        }
        self.latest.as_ref()
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
