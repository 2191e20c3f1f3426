//! Background fetch/decode workers.
//!
//! The pool's public surface is a pair of channels: jobs go in,
//! completions come out, and the main loop drains completions once per
//! frame. Workers never touch shared state; each one owns its in-flight
//! bytes until the completion message hands them over.

use crate::error::StreamError;
use crate::fetch::Fetch;
use crate::scheduler::{Completion, Dispatch, Lane};
use crossbeam_channel::{unbounded, Receiver, Sender};
use quadscope_core::TileKey;
use std::sync::Arc;
use std::thread::JoinHandle;

/// HTTP status the live backend returns while its render queue is full.
const STATUS_BUSY: u16 = 503;

/// Decoded tile pixels, RGBA8 row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct TileImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// One finished job.
#[derive(Clone, Debug)]
pub struct WorkResult {
    pub key: TileKey,
    pub lane: Lane,
    pub completion: Completion,
    pub image: Option<TileImage>,
}

pub struct WorkerPool {
    jobs: Sender<Dispatch>,
    results: Receiver<WorkResult>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` threads sharing one fetcher.
    pub fn spawn(worker_count: usize, fetch: Arc<dyn Fetch>) -> Self {
        let (job_tx, job_rx) = unbounded::<Dispatch>();
        let (result_tx, result_rx) = unbounded::<WorkResult>();

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count.max(1) {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let fetch = Arc::clone(&fetch);
            handles.push(
                std::thread::Builder::new()
                    .name(format!("tile-worker-{}", worker_id))
                    .spawn(move || worker_loop(jobs, results, fetch))
                    .expect("spawn tile worker"),
            );
        }

        Self {
            jobs: job_tx,
            results: result_rx,
            handles,
        }
    }

    /// Hand a dispatch to the next free worker.
    pub fn submit(&self, dispatch: Dispatch) {
        // Send only fails if all workers are gone, which means shutdown.
        let _ = self.jobs.send(dispatch);
    }

    /// Completions accumulated since the last drain.
    pub fn drain_completions(&self) -> Vec<WorkResult> {
        self.results.try_iter().collect()
    }

    /// Close the job channel and wait for workers to finish.
    pub fn shutdown(self) {
        drop(self.jobs);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop(jobs: Receiver<Dispatch>, results: Sender<WorkResult>, fetch: Arc<dyn Fetch>) {
    // Channel close is the shutdown signal.
    while let Ok(dispatch) = jobs.recv() {
        let result = run_job(&dispatch, fetch.as_ref());
        if results.send(result).is_err() {
            break;
        }
    }
}

fn run_job(dispatch: &Dispatch, fetch: &dyn Fetch) -> WorkResult {
    let (completion, image) = match dispatch.lane {
        Lane::Static => run_static(dispatch, fetch),
        Lane::Live => run_live(dispatch, fetch),
    };
    WorkResult {
        key: dispatch.key.clone(),
        lane: dispatch.lane,
        completion,
        image,
    }
}

/// Static lane: the bytes are expected to exist; any failure is final
/// and the tile falls back to a blank placeholder.
fn run_static(dispatch: &Dispatch, fetch: &dyn Fetch) -> (Completion, Option<TileImage>) {
    let response = match fetch.get(&dispatch.url) {
        Ok(response) => response,
        Err(e) => {
            log::warn!("static fetch failed for {}: {}", dispatch.key, e);
            return (Completion::Failure, None);
        }
    };
    if !response.is_success() {
        log::warn!(
            "static tile {} returned status {}",
            dispatch.key,
            response.status
        );
        return (Completion::Failure, None);
    }
    match decode_image(&response.body) {
        Ok(image) => (Completion::Success, Some(image)),
        Err(reason) => {
            log::warn!("decode failed for {}: {}", dispatch.key, reason);
            (Completion::Failure, None)
        }
    }
}

/// Live lane: 503 and transport errors mean the backend is busy and the
/// request should retry; other error statuses are final.
fn run_live(dispatch: &Dispatch, fetch: &dyn Fetch) -> (Completion, Option<TileImage>) {
    let response = match fetch.get(&dispatch.url) {
        Ok(response) => response,
        Err(e) => {
            log::debug!("live fetch error for {}, will retry: {}", dispatch.key, e);
            return (Completion::Busy, None);
        }
    };
    if response.status == STATUS_BUSY {
        return (Completion::Busy, None);
    }
    if !response.is_success() {
        log::warn!(
            "live render for {} failed with status {}",
            dispatch.key,
            response.status
        );
        return (Completion::Failure, None);
    }
    match decode_image(&response.body) {
        Ok(image) => (Completion::Success, Some(image)),
        Err(reason) => {
            log::warn!("live decode failed for {}: {}", dispatch.key, reason);
            (Completion::Failure, None)
        }
    }
}

fn decode_image(bytes: &[u8]) -> Result<TileImage, StreamError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| StreamError::Decode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    Ok(TileImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}
