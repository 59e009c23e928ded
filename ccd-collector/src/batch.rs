//! Batch scheduler for per-entity upstream queries
//!
//! Splits an identifier list into fixed-size batches, runs one request per
//! batch in order, and pauses a fixed interval between consecutive batches.
//! The pause is not adaptive: it is taken whether the previous batch
//! succeeded or failed.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Fixed-interval sleeper
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    pauses: AtomicUsize,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pauses: AtomicUsize::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep for the configured interval
    pub async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::Relaxed);
        if !self.interval.is_zero() {
            debug!("Pacing: waiting {:?}", self.interval);
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Number of pauses taken so far
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::Relaxed)
    }
}

/// Fixed-size batching with pacing between batches
#[derive(Debug)]
pub struct BatchScheduler {
    batch_size: usize,
    pacer: Pacer,
}

impl BatchScheduler {
    /// `batch_size` of 0 is treated as 1
    pub fn new(batch_size: usize, interval: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            pacer: Pacer::new(interval),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    /// Split `ids` into consecutive batches of at most `batch_size`
    pub fn partition<'a, T>(&self, ids: &'a [T]) -> Vec<&'a [T]> {
        ids.chunks(self.batch_size).collect()
    }

    /// Run `request` once per batch, in order, pausing between batches
    ///
    /// Results are returned in batch order. No pause precedes the first
    /// batch or follows the last.
    pub async fn run<'a, T, R, F, Fut>(&self, ids: &'a [T], mut request: F) -> Vec<R>
    where
        F: FnMut(usize, &'a [T]) -> Fut,
        Fut: Future<Output = R>,
    {
        let batches = self.partition(ids);
        let total = batches.len();
        let mut results = Vec::with_capacity(total);

        for (index, batch) in batches.into_iter().enumerate() {
            if index > 0 {
                self.pacer.pause().await;
            }
            debug!(batch = index + 1, total, size = batch.len(), "Issuing batch");
            results.push(request(index, batch).await);
        }

        results
    }
}
