//! Commit feed: event window, running aggregate and live listeners
//!
//! `CommitFeed` is the single shared service object of the hub. The hosting
//! process creates one at startup and hands an `Arc` to every HTTP handler.
//! State lives only in memory and is lost on restart.
//!
//! Ingestion is atomic per trace. One ingest at a time runs the full
//! push, fold, publish sequence; readers see either all of a trace's effects
//! or none of them. Publishing happens after the state lock is released, so
//! listeners may read `snapshot()` / `stats()` from inside their callback and
//! observe the already-updated aggregate. Listeners must not call `ingest`
//! or the `*_with_replay` subscriptions from their callback.

pub mod listeners;
pub mod store;

pub use listeners::{Delivery, ListenerError, ListenerSet, Subscription};
pub use store::{EventStore, DEFAULT_WINDOW_CAPACITY};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use attrib_common::config::HubConfig;
use attrib_common::{AggregateStats, CommitTrace};
use serde::Serialize;
use tracing::{debug, warn};

struct FeedState {
    store: EventStore,
    aggregate: AggregateStats,
}

/// Point-in-time counters for the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeedDiagnostics {
    /// Traces ingested since startup; never reset
    pub ingested_total: u64,
    pub window_len: usize,
    pub trace_listeners: usize,
    pub stats_listeners: usize,
}

pub struct CommitFeed {
    state: RwLock<FeedState>,
    /// Serializes whole ingests, publish included
    ingest_lock: Mutex<()>,
    traces: ListenerSet<CommitTrace>,
    stats: ListenerSet<AggregateStats>,
    ingested_total: AtomicU64,
    listener_warn_threshold: usize,
}

impl CommitFeed {
    pub fn new(window_capacity: usize) -> Self {
        Self::with_limits(window_capacity, HubConfig::default().listener_warn_threshold)
    }

    pub fn from_config(config: &HubConfig) -> Self {
        Self::with_limits(config.window_capacity, config.listener_warn_threshold)
    }

    fn with_limits(window_capacity: usize, listener_warn_threshold: usize) -> Self {
        Self {
            state: RwLock::new(FeedState {
                store: EventStore::new(window_capacity),
                aggregate: AggregateStats::default(),
            }),
            ingest_lock: Mutex::new(()),
            traces: ListenerSet::new("trace"),
            stats: ListenerSet::new("stats"),
            ingested_total: AtomicU64::new(0),
            listener_warn_threshold,
        }
    }

    /// Store one trace, fold it into the aggregate, then notify listeners
    ///
    /// Trace listeners are notified before stats listeners, and both only
    /// after the window and aggregate reflect the trace.
    pub fn ingest(&self, trace: CommitTrace) {
        let _serial = self.serial();

        let stats = {
            let mut state = self.write();
            let evicted = state.store.push(trace.clone());
            let parsed = state.aggregate.fold(&trace);
            if parsed.is_none() && !trace.ai_stats.is_empty() {
                debug!("Trace {} has unparseable attribution; counted with zero lines", trace.id);
            }
            debug!(
                "Ingested trace {} (commit {}, author {:?}, repo {:?}), evicted {}",
                trace.id, trace.commit_short, trace.author, trace.repo, evicted
            );
            state.aggregate.clone()
        };
        self.ingested_total.fetch_add(1, Ordering::Relaxed);

        self.traces.publish(&trace);
        self.stats.publish(&stats);
    }

    /// Ingest each trace in order; returns how many were ingested
    pub fn ingest_all<I>(&self, traces: I) -> usize
    where
        I: IntoIterator<Item = CommitTrace>,
    {
        traces.into_iter().fold(0, |count, trace| {
            self.ingest(trace);
            count + 1
        })
    }

    /// Current window, newest first
    pub fn snapshot(&self) -> Vec<CommitTrace> {
        self.read().store.snapshot()
    }

    /// Copy of the running aggregate
    pub fn stats(&self) -> AggregateStats {
        self.read().aggregate.clone()
    }

    /// Window and aggregate read under one lock
    pub fn snapshot_with_stats(&self) -> (Vec<CommitTrace>, AggregateStats) {
        let state = self.read();
        (state.store.snapshot(), state.aggregate.clone())
    }

    pub fn subscribe_traces<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CommitTrace) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let subscription = self.traces.subscribe(listener);
        self.check_listener_count("trace", self.traces.len());
        subscription
    }

    pub fn subscribe_stats<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AggregateStats) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let subscription = self.stats.subscribe(listener);
        self.check_listener_count("stats", self.stats.len());
        subscription
    }

    /// Snapshot the window and register a trace listener in one step
    ///
    /// No trace is both in the replay and delivered to the listener, and none
    /// falls between the two.
    pub fn subscribe_traces_with_replay<F>(&self, listener: F) -> (Vec<CommitTrace>, Subscription)
    where
        F: Fn(&CommitTrace) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let _serial = self.serial();
        (self.snapshot(), self.subscribe_traces(listener))
    }

    /// Snapshot the aggregate and register a stats listener in one step
    pub fn subscribe_stats_with_replay<F>(&self, listener: F) -> (AggregateStats, Subscription)
    where
        F: Fn(&AggregateStats) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let _serial = self.serial();
        (self.stats(), self.subscribe_stats(listener))
    }

    pub fn diagnostics(&self) -> FeedDiagnostics {
        FeedDiagnostics {
            ingested_total: self.ingested_total.load(Ordering::Relaxed),
            window_len: self.read().store.len(),
            trace_listeners: self.traces.len(),
            stats_listeners: self.stats.len(),
        }
    }

    fn check_listener_count(&self, kind: &str, count: usize) {
        if count > self.listener_warn_threshold {
            warn!(
                "{} {} listeners registered (threshold {}); fan-out is unbounded",
                count, kind, self.listener_warn_threshold
            );
        }
    }

    fn serial(&self) -> MutexGuard<'_, ()> {
        self.ingest_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, FeedState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FeedState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CommitFeed {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}
