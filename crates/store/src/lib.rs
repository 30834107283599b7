//! Desko store: coalescing ingest and epoch'd row snapshots.

#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use arc_swap::ArcSwap;
use desko_core::{DeltaKind, LiteRow, RowDelta, RowId, RowSnapshot};
use desko_resthub::to_lite;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Coalescing queue keyed by row id with FIFO order and fixed capacity.
/// A newer delta for an id already queued replaces the queued one.
pub struct Coalescer {
    map: FxHashMap<RowId, RowDelta>,
    order: VecDeque<RowId>,
    cap: usize,
    dropped: u64,
}

impl Coalescer {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            map: FxHashMap::default(),
            order: VecDeque::new(),
            cap,
            dropped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn push(&mut self, d: RowDelta) {
        let id = d.id;
        if !self.map.contains_key(&id) {
            if self.order.len() >= self.cap {
                if let Some(old) = self.order.pop_front() {
                    self.map.remove(&old);
                    self.dropped += 1;
                    metrics::counter!("store_coalescer_dropped", 1);
                }
            }
            self.order.push_back(id);
        }
        self.map.insert(id, d);
    }

    /// Drain all currently coalesced deltas in arrival order.
    pub fn drain_ready(&mut self) -> Vec<RowDelta> {
        let mut out = Vec::with_capacity(self.order.len());
        while let Some(id) = self.order.pop_front() {
            if let Some(d) = self.map.remove(&id) {
                out.push(d);
            }
        }
        out
    }
}

/// Builds [`RowSnapshot`] instances from deltas for one entity. Rows keep
/// their first-seen position; updates replace in place.
pub struct SnapshotBuilder {
    entity: String,
    epoch: u64,
    items: Vec<LiteRow>,
    index: FxHashMap<RowId, usize>,
}

impl SnapshotBuilder {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            epoch: 0,
            items: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    pub fn apply(&mut self, batch: Vec<RowDelta>) {
        for d in batch {
            match d.kind {
                DeltaKind::Applied => match to_lite(&self.entity, d.raw) {
                    Some(row) => {
                        if let Some(&idx) = self.index.get(&row.id) {
                            self.items[idx] = row;
                        } else {
                            self.index.insert(row.id, self.items.len());
                            self.items.push(row);
                        }
                    }
                    None => warn!(entity = %self.entity, id = d.id, "applied delta without usable record"),
                },
                DeltaKind::Deleted => {
                    if let Some(idx) = self.index.remove(&d.id) {
                        self.items.remove(idx);
                        for (i, row) in self.items.iter().enumerate().skip(idx) {
                            self.index.insert(row.id, i);
                        }
                    }
                }
            }
        }
        self.epoch = self.epoch.saturating_add(1);
    }

    pub fn freeze(&self) -> Arc<RowSnapshot> {
        metrics::gauge!("store_rows", self.items.len() as f64);
        Arc::new(RowSnapshot {
            epoch: self.epoch,
            items: self.items.clone(),
        })
    }
}

/// Handle for readers to access the current snapshot and subscribe to swaps.
pub struct BackendHandle {
    snap: Arc<ArcSwap<RowSnapshot>>,
    epoch_rx: watch::Receiver<u64>,
}

impl BackendHandle {
    pub fn current(&self) -> Arc<RowSnapshot> {
        self.snap.load_full()
    }

    pub fn subscribe_epoch(&self) -> watch::Receiver<u64> {
        self.epoch_rx.clone()
    }
}

/// Spawn an ingest loop consuming deltas and swapping snapshots. Returns a
/// sender for deltas and a handle for reads.
pub fn spawn_ingest(entity: &str, cap: usize) -> (mpsc::Sender<RowDelta>, BackendHandle) {
    let (tx, mut rx) = mpsc::channel::<RowDelta>(cap);
    let snap = Arc::new(ArcSwap::from_pointee(RowSnapshot::default()));
    let (epoch_tx, epoch_rx) = watch::channel(0u64);
    let snap_clone = Arc::clone(&snap);
    let entity = entity.to_string();

    tokio::spawn(async move {
        let mut coalescer = Coalescer::with_capacity(cap);
        let mut builder = SnapshotBuilder::new(entity);
        let mut ticker = tokio::time::interval(std::time::Duration::from_millis(8));
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    match maybe {
                        Some(d) => coalescer.push(d),
                        None => {
                            debug!("delta channel closed; draining and exiting ingest loop");
                            let batch = coalescer.drain_ready();
                            if !batch.is_empty() {
                                builder.apply(batch);
                                let next = builder.freeze();
                                let epoch = next.epoch;
                                snap_clone.store(next);
                                let _ = epoch_tx.send(epoch);
                            }
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    let batch = coalescer.drain_ready();
                    if !batch.is_empty() {
                        builder.apply(batch);
                        let next = builder.freeze();
                        let epoch = next.epoch;
                        snap_clone.store(next);
                        let _ = epoch_tx.send(epoch);
                    }
                }
            }
        }
        info!("ingest loop stopped");
    });

    (tx, BackendHandle { snap, epoch_rx })
}
