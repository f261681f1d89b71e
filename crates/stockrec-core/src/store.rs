//! Persistence contracts used by the orchestrator and the reprocessor.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use time::Date;

use crate::domain::{DailyAnalysis, DayKey, RawPayload};
use crate::error::StoreError;

/// Raw-payload store consulted before fetching.
pub trait QuoteStore: Send + Sync {
    /// Whether a raw payload for the day has already been recorded.
    fn exists(&self, market: &str, code: &str, date: Date) -> Result<bool, StoreError>;

    /// Hand a payload over for persistence. Must not block on I/O; failures
    /// are the store's to report.
    fn enqueue(&self, raw: RawPayload);
}

/// Destination for parsed days. Bars are stored in session order.
pub trait AnalysisSink: Send + Sync {
    fn save(&self, analysis: &DailyAnalysis) -> Result<(), StoreError>;
}

/// In-process store keeping at most one payload and one analysis per day.
#[derive(Debug, Default)]
pub struct MemoryStore {
    raws: Mutex<BTreeMap<DayKey, RawPayload>>,
    analyses: Mutex<BTreeMap<DayKey, DailyAnalysis>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &DayKey) -> Option<RawPayload> {
        lock(&self.raws).get(key).cloned()
    }

    pub fn raw_count(&self) -> usize {
        lock(&self.raws).len()
    }

    pub fn analysis(&self, key: &DayKey) -> Option<DailyAnalysis> {
        lock(&self.analyses).get(key).cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl QuoteStore for MemoryStore {
    fn exists(&self, market: &str, code: &str, date: Date) -> Result<bool, StoreError> {
        Ok(lock(&self.raws).contains_key(&DayKey::new(market, code, date)))
    }

    fn enqueue(&self, raw: RawPayload) {
        lock(&self.raws).entry(raw.key()).or_insert(raw);
    }
}

impl AnalysisSink for MemoryStore {
    fn save(&self, analysis: &DailyAnalysis) -> Result<(), StoreError> {
        lock(&self.analyses).insert(analysis.key(), analysis.clone());
        Ok(())
    }
}
