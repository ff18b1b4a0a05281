//! Fixed-width pool of OS threads with bounded, best-effort batch joins.
//!
//! Each thread is an execution unit with a stable [`UnitId`]. Units pull jobs
//! from one shared queue, so which unit handles which item is up to the
//! scheduler. Every unit also owns a slot in the pool's [`ScratchStore`];
//! the slot outlives the task that wrote it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::error::HarnessError;
use crate::scratch::{ScratchStore, UnitId};
use crate::stats::{PoolStats, PoolStatsSnapshot, SharedStats};

type Job<S> = Box<dyn for<'a> FnOnce(&UnitContext<'a, S>) + Send + 'static>;

/// What a handler sees about the unit it is running on.
pub struct UnitContext<'a, S> {
    unit: UnitId,
    scratch: &'a ScratchStore<S>,
}

impl<'a, S> UnitContext<'a, S> {
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Write this unit's scratch slot, returning the previous value.
    pub fn scratch_set(&self, value: S) -> Option<S> {
        self.scratch.set(self.unit, value)
    }

    /// Reset this unit's scratch slot to unset.
    pub fn scratch_clear(&self) -> Option<S> {
        self.scratch.remove(self.unit)
    }
}

impl<'a, S: Clone> UnitContext<'a, S> {
    /// Whatever the last task on this unit left behind, if anything.
    pub fn scratch_get(&self) -> Option<S> {
        self.scratch.get(self.unit)
    }
}

/// Result of [`WorkerPool::submit_and_await`].
#[derive(Debug, Clone)]
pub struct BatchOutcome<R> {
    /// True if every dispatched item finished before the timeout.
    pub completed: bool,
    /// Time from submission until the batch drained or the wait gave up.
    pub elapsed: Duration,
    /// Items placed on the queue. Each is dispatched exactly once.
    pub dispatched: usize,
    /// Handler return values in completion order. On timeout, only the
    /// items that finished in time.
    pub outputs: Vec<R>,
}

struct Batch<R> {
    /// Items not yet finished, plus one while submission is still running.
    pending: AtomicUsize,
    outputs: Mutex<Vec<R>>,
    done: Notify,
}

impl<R> Batch<R> {
    fn new() -> Self {
        Batch {
            pending: AtomicUsize::new(1),
            outputs: Mutex::new(Vec::new()),
            done: Notify::new(),
        }
    }

    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            // notify_one stores a permit if nobody is waiting yet.
            self.done.notify_one();
        }
    }
}

/// A bounded pool of parallel execution units.
///
/// Dropping the pool closes its queue; units finish whatever is already
/// queued and then exit in the background. Use [`WorkerPool::shutdown`] to
/// wait for them.
pub struct WorkerPool<S = ()> {
    queue: Mutex<Option<Sender<Job<S>>>>,
    units: Mutex<Vec<JoinHandle<()>>>,
    scratch: Arc<ScratchStore<S>>,
    stats: SharedStats,
    width: usize,
}

impl<S: Send + Sync + 'static> WorkerPool<S> {
    /// Start `width` execution units.
    pub fn new(width: usize) -> Result<Self, HarnessError> {
        if width == 0 {
            return Err(HarnessError::InvalidPool(width));
        }

        let (sender, receiver) = mpsc::channel::<Job<S>>();
        let receiver = Arc::new(Mutex::new(receiver));
        let scratch = Arc::new(ScratchStore::new());

        let mut units = Vec::with_capacity(width);
        for id in 0..width {
            let unit = UnitId(id);
            let receiver = Arc::clone(&receiver);
            let scratch = Arc::clone(&scratch);
            let handle = thread::Builder::new()
                .name(unit.to_string())
                .spawn(move || run_unit(unit, receiver, scratch))
                .map_err(|source| HarnessError::Spawn { unit: id, source })?;
            units.push(handle);
        }
        debug!(width, "worker pool started");

        Ok(WorkerPool {
            queue: Mutex::new(Some(sender)),
            units: Mutex::new(units),
            scratch,
            stats: Arc::new(PoolStats::new()),
            width,
        })
    }

    /// Queue every item and wait up to `timeout` for all of them to finish.
    ///
    /// Submission never blocks. If the timeout elapses first, the returned
    /// outcome has `completed == false`; items still running or queued are
    /// left to finish on their own and are not dispatched again.
    pub async fn submit_and_await<I, T, R, F>(
        &self,
        items: I,
        handler: F,
        timeout: Duration,
    ) -> Result<BatchOutcome<R>, HarnessError>
    where
        I: IntoIterator<Item = T>,
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(&UnitContext<'_, S>, T) -> R + Send + Sync + 'static,
    {
        let sender = self.queue.lock().clone().ok_or(HarnessError::PoolClosed)?;
        let started = Instant::now();
        let handler = Arc::new(handler);
        let batch = Arc::new(Batch::new());
        self.stats.record_batch();

        let mut dispatched = 0;
        for item in items {
            let handler = Arc::clone(&handler);
            let job_batch = Arc::clone(&batch);
            let stats = Arc::clone(&self.stats);
            batch.pending.fetch_add(1, Ordering::AcqRel);

            let job: Job<S> = Box::new(move |ctx: &UnitContext<'_, S>| {
                match panic::catch_unwind(AssertUnwindSafe(|| handler(ctx, item))) {
                    Ok(output) => {
                        stats.record_handled();
                        job_batch.outputs.lock().push(output);
                    }
                    Err(_) => {
                        stats.record_panic();
                        warn!(unit = %ctx.unit(), "handler panicked");
                    }
                }
                job_batch.finish_one();
            });

            if sender.send(job).is_err() {
                return Err(HarnessError::PoolClosed);
            }
            self.stats.record_dispatch();
            dispatched += 1;
        }
        batch.finish_one();

        let completed = tokio::time::timeout(timeout, batch.done.notified())
            .await
            .is_ok();
        let elapsed = started.elapsed();

        if completed {
            debug!(dispatched, ?elapsed, "batch drained");
        } else {
            self.stats.record_timeout();
            warn!(
                dispatched,
                ?timeout,
                remaining = batch.pending.load(Ordering::Acquire),
                "batch did not drain before timeout"
            );
        }

        let outputs = std::mem::take(&mut *batch.outputs.lock());
        Ok(BatchOutcome {
            completed,
            elapsed,
            dispatched,
            outputs,
        })
    }
}

impl<S> WorkerPool<S> {
    pub fn width(&self) -> usize {
        self.width
    }

    /// The per-unit scratch slots owned by this pool.
    pub fn scratch(&self) -> &ScratchStore<S> {
        &self.scratch
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop accepting work. Queued items still run.
    pub fn close(&self) {
        if self.queue.lock().take().is_some() {
            debug!(width = self.width, "worker pool closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.queue.lock().is_none()
    }

    /// Close the queue and join every unit.
    ///
    /// Blocks until in-flight and queued handlers return.
    pub fn shutdown(&self) {
        self.close();
        let units: Vec<_> = self.units.lock().drain(..).collect();
        for handle in units {
            if handle.join().is_err() {
                warn!("worker unit terminated abnormally");
            }
        }
    }
}

impl<S> Drop for WorkerPool<S> {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_unit<S>(unit: UnitId, queue: Arc<Mutex<Receiver<Job<S>>>>, scratch: Arc<ScratchStore<S>>) {
    let ctx = UnitContext {
        unit,
        scratch: &scratch,
    };
    loop {
        let job = queue.lock().recv();
        match job {
            Ok(job) => job(&ctx),
            Err(_) => break,
        }
    }
    debug!(%unit, "unit exiting");
}
