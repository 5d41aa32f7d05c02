//! Bounded worker pool with cooperative cancellation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

/// Upper bound on concurrent workers.
pub const MAX_WORKERS: usize = 64;

/// Cancellation signal shared between a caller and a running job.
///
/// Raising it stops new items from starting; items already running finish.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs a task over a slice of items on at most `workers` threads.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Create a pool; `workers` is clamped to `1..=MAX_WORKERS`.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.clamp(1, MAX_WORKERS),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` on every item and return results in item order.
    ///
    /// An item whose slot is `None` never started because `cancel` was
    /// raised first.
    pub fn run<T, R, F>(&self, items: &[T], cancel: &CancellationFlag, task: F) -> Vec<Option<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        let mut results: Vec<Option<R>> = items.iter().map(|_| None).collect();
        if items.is_empty() {
            return results;
        }

        let next = AtomicUsize::new(0);
        let threads = self.workers.min(items.len());
        let task = &task;
        let next = &next;

        let finished: Vec<Vec<(usize, R)>> = thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    s.spawn(move || {
                        let mut done = Vec::new();
                        while !cancel.is_cancelled() {
                            let index = next.fetch_add(1, Ordering::SeqCst);
                            let Some(item) = items.get(index) else {
                                break;
                            };
                            done.push((index, task(item)));
                        }
                        done
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });

        for (index, result) in finished.into_iter().flatten() {
            results[index] = Some(result);
        }
        results
    }
}
