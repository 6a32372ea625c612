use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, warn};

use crate::error::{CacheError, Result};

/// Runs deferred tasks on a bounded worker pool, delaying each by an
/// exponential back-off derived from its consecutive failure count.
#[derive(Debug)]
pub struct BackoffScheduler {
    workers: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    queue_size: usize,
    shutdown: watch::Sender<bool>,
    initial: Duration,
    rate: u32,
    max: Duration,
}

impl BackoffScheduler {
    /// A scheduler with `workers` parallel slots, refusing work once
    /// `queue_size` tasks are pending, backing off from `initial` by
    /// `rate` per failure up to `max`.
    pub fn new(
        workers: usize,
        queue_size: usize,
        initial: Duration,
        rate: u32,
        max: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            workers: Arc::new(Semaphore::new(workers.max(1))),
            pending: Arc::new(AtomicUsize::new(0)),
            queue_size: queue_size.max(1),
            shutdown,
            initial,
            rate,
            max,
        }
    }

    /// Delay before retrying after `error_count` consecutive failures:
    /// zero for none, otherwise `min(initial * rate^(n-1), max)`.
    pub fn delay_for(&self, error_count: u32) -> Duration {
        if error_count == 0 {
            return Duration::ZERO;
        }
        let factor = u128::from(self.rate).checked_pow(error_count - 1).unwrap_or(u128::MAX);
        let delay_ms = u128::from(self.initial.as_millis() as u64).saturating_mul(factor);
        let capped = delay_ms.min(self.max.as_millis());
        Duration::from_millis(capped as u64)
    }

    /// Queues `task` to run after `delay`, subject to the worker pool.
    ///
    /// Fails fast when the scheduler is shut down or the queue is full;
    /// the task is dropped unexecuted in both cases.
    pub fn schedule(
        &self,
        delay: Duration,
        task: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        if *self.shutdown.borrow() {
            return Err(CacheError::SchedulerShutdown);
        }
        if self.pending.load(Ordering::Acquire) >= self.queue_size {
            return Err(CacheError::SchedulerRejected);
        }
        self.pending.fetch_add(1, Ordering::AcqRel);
        let pending = Arc::clone(&self.pending);
        let workers = Arc::clone(&self.workers);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                _ = shutdown.wait_for(|stop| *stop) => {},
            };
            let cancelled = *shutdown.borrow();
            if !cancelled {
                // `acquire` only fails once the pool is closed by shutdown.
                if let Ok(_permit) = workers.acquire().await {
                    task.await;
                }
            }
            pending.fetch_sub(1, Ordering::AcqRel);
        });
        Ok(())
    }

    /// Refuses new tasks and cancels tasks still waiting out their delay.
    /// Tasks already running complete.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        self.workers.close();
    }

    /// Tasks queued or running.
    pub fn pending_tasks(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

/// Deduplicated background revalidation.
///
/// One identifier (derived from the request and its variant) has at most
/// one revalidation in flight at any time; later requests for the same
/// identifier return without scheduling until the first completes.
#[derive(Debug)]
pub struct AsyncValidator {
    in_flight: Arc<DashSet<String>>,
    scheduler: BackoffScheduler,
}

struct InFlightGuard {
    set: Arc<DashSet<String>>,
    identifier: Option<String>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(identifier) = self.identifier.take() {
            self.set.remove(&identifier);
        }
    }
}

impl AsyncValidator {
    /// A validator submitting work to `scheduler`.
    pub fn new(scheduler: BackoffScheduler) -> Self {
        Self { in_flight: Arc::new(DashSet::new()), scheduler }
    }

    /// Schedules `task` to revalidate `identifier` after the back-off for
    /// `error_count`, unless a revalidation for the identifier is already
    /// in flight or the scheduler refuses the work.
    pub fn revalidate(
        &self,
        identifier: &str,
        error_count: u32,
        task: impl Future<Output = ()> + Send + 'static,
    ) {
        if !self.in_flight.insert(identifier.to_string()) {
            debug!(identifier, "revalidation already in flight");
            return;
        }
        // The guard travels with the task: the identifier leaves the
        // in-flight set when the task finishes, is cancelled, or is
        // refused, whichever comes first.
        let guard = InFlightGuard {
            set: Arc::clone(&self.in_flight),
            identifier: Some(identifier.to_string()),
        };
        let delay = self.scheduler.delay_for(error_count);
        let wrapped = async move {
            let _guard = guard;
            task.await;
        };
        if let Err(e) = self.scheduler.schedule(delay, wrapped) {
            warn!(identifier, error = %e, "background revalidation skipped");
        }
    }

    /// Number of revalidations currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Shuts the underlying scheduler down.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}
