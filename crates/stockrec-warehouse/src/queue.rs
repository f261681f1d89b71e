//! Background writer for raw payloads.
//!
//! Fetch tasks hand payloads to [`SaveQueue::enqueue`], which never blocks.
//! A dedicated thread drains the channel in order and writes each payload
//! through [`Warehouse::insert_raw`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use stockrec_core::{DayKey, QuoteStore, RawPayload, StoreError};
use time::Date;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{Warehouse, WarehouseError};

enum SaveJob {
    Raw(RawPayload),
    Shutdown,
}

/// Counts of what the writer did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveQueueReport {
    pub written: usize,
    pub duplicates: usize,
    pub failed: usize,
}

type PendingKeys = Arc<Mutex<HashSet<DayKey>>>;

fn pending(keys: &PendingKeys) -> MutexGuard<'_, HashSet<DayKey>> {
    keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct SaveQueue {
    sender: UnboundedSender<SaveJob>,
    in_flight: PendingKeys,
    worker: Mutex<Option<JoinHandle<SaveQueueReport>>>,
}

impl SaveQueue {
    /// Spawn the writer thread.
    pub fn start(warehouse: Warehouse) -> Result<Self, WarehouseError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let in_flight = PendingKeys::default();
        let worker_keys = Arc::clone(&in_flight);

        let worker = thread::Builder::new()
            .name(String::from("stockrec-save-queue"))
            .spawn(move || run_writer(&warehouse, receiver, &worker_keys))?;

        Ok(Self {
            sender,
            in_flight,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queue a payload for writing.
    pub fn enqueue(&self, raw: RawPayload) {
        let key = raw.key();
        pending(&self.in_flight).insert(key.clone());

        if self.sender.send(SaveJob::Raw(raw)).is_err() {
            pending(&self.in_flight).remove(&key);
            warn!(%key, "save queue closed, raw payload dropped");
        }
    }

    /// Whether a payload for the day is queued but not yet written.
    pub fn is_in_flight(&self, key: &DayKey) -> bool {
        pending(&self.in_flight).contains(key)
    }

    /// Write everything queued so far, stop the writer and report.
    ///
    /// Later calls return an empty report.
    pub fn shutdown(&self) -> SaveQueueReport {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(handle) = handle else {
            return SaveQueueReport::default();
        };

        let _ = self.sender.send(SaveJob::Shutdown);
        match handle.join() {
            Ok(report) => {
                info!(
                    written = report.written,
                    duplicates = report.duplicates,
                    failed = report.failed,
                    "save queue drained"
                );
                report
            }
            Err(_) => {
                error!("save queue writer panicked");
                SaveQueueReport::default()
            }
        }
    }
}

impl Drop for SaveQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_writer(
    warehouse: &Warehouse,
    mut receiver: UnboundedReceiver<SaveJob>,
    in_flight: &PendingKeys,
) -> SaveQueueReport {
    let mut report = SaveQueueReport::default();

    while let Some(job) = receiver.blocking_recv() {
        let raw = match job {
            SaveJob::Raw(raw) => raw,
            SaveJob::Shutdown => break,
        };
        let key = raw.key();
        let request_id = Uuid::new_v4().to_string();

        match warehouse.insert_raw(&raw, &request_id) {
            Ok(true) => {
                report.written += 1;
                debug!(%key, %request_id, bytes = raw.json.len(), "raw payload written");
            }
            Ok(false) => {
                report.duplicates += 1;
                debug!(%key, %request_id, "raw payload already stored");
            }
            Err(error) => {
                report.failed += 1;
                error!(%key, %request_id, %error, "failed to write raw payload");
            }
        }
        pending(in_flight).remove(&key);
    }

    report
}

/// [`QuoteStore`] over a warehouse and its save queue.
///
/// A day counts as present once it is queued, so a second task for the same
/// day does not refetch while the first write is still pending.
///
/// The check and the enqueue are separate calls: tasks for the same day that
/// run at the same time may each fetch. Callers are expected to run one task
/// per `(market, code, date)`; overlapping tasks cost extra requests, and the
/// writer still keeps one row per day and counts the rest as duplicates.
#[derive(Clone)]
pub struct QueuedStore {
    warehouse: Warehouse,
    queue: Arc<SaveQueue>,
}

impl QueuedStore {
    pub fn new(warehouse: Warehouse, queue: Arc<SaveQueue>) -> Self {
        Self { warehouse, queue }
    }

    pub fn start(warehouse: Warehouse) -> Result<Self, WarehouseError> {
        let queue = Arc::new(SaveQueue::start(warehouse.clone())?);
        Ok(Self::new(warehouse, queue))
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    pub fn shutdown(&self) -> SaveQueueReport {
        self.queue.shutdown()
    }
}

impl QuoteStore for QueuedStore {
    fn exists(&self, market: &str, code: &str, date: Date) -> Result<bool, StoreError> {
        if self.queue.is_in_flight(&DayKey::new(market, code, date)) {
            return Ok(true);
        }
        Ok(self.warehouse.raw_exists(market, code, date)?)
    }

    fn enqueue(&self, raw: RawPayload) {
        self.queue.enqueue(raw);
    }
}
