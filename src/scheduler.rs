//! Fixed-size worker pool with a per-batch barrier
//!
//! The driving thread hands a whole batch to [`WorkerPool::run_batch`], which
//! spawns one task per unit and returns only after every task has finished.
//! Task errors and panics come back through the barrier as a fatal error;
//! nothing is retried.

use crate::error::{PigzrError, PigzrResult};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    num_threads: usize,
}

impl WorkerPool {
    pub fn new(num_threads: usize) -> PigzrResult<Self> {
        if num_threads == 0 {
            return Err(PigzrError::invalid_argument(
                "worker pool needs at least one thread",
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("pigzr-worker-{}", i))
            .build()
            .map_err(|e| PigzrError::thread(format!("failed to start worker pool: {}", e)))?;
        Ok(Self { pool, num_threads })
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Run `task` on every item in parallel and wait for all of them.
    ///
    /// The first error reported by a task is returned once the whole batch
    /// has drained. A panicking task is reported as a thread error.
    pub fn run_batch<T, F>(&self, items: &[T], task: F) -> PigzrResult<()>
    where
        T: Sync,
        F: Fn(&T) -> PigzrResult<()> + Sync,
    {
        let first_error: Mutex<Option<PigzrError>> = Mutex::new(None);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pool.scope(|scope| {
                for item in items {
                    let task = &task;
                    let first_error = &first_error;
                    scope.spawn(move |_| {
                        if let Err(e) = task(item) {
                            if let Ok(mut slot) = first_error.lock() {
                                slot.get_or_insert(e);
                            }
                        }
                    });
                }
            })
        }));

        if outcome.is_err() {
            return Err(PigzrError::thread("compression worker panicked"));
        }

        match first_error.into_inner() {
            Ok(None) => Ok(()),
            Ok(Some(e)) => Err(e),
            Err(_) => Err(PigzrError::thread("worker error slot poisoned")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_barrier_waits_for_all() {
        let pool = WorkerPool::new(4).unwrap();
        let done = AtomicUsize::new(0);
        let items: Vec<u64> = (0..16).collect();

        pool.run_batch(&items, |&i| {
            // Later items finish first
            thread::sleep(Duration::from_millis(16 - i));
            done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        assert_eq!(done.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn test_task_error_propagates() {
        let pool = WorkerPool::new(2).unwrap();
        let items = [0, 1, 2, 3];
        let err = pool
            .run_batch(&items, |&i| {
                if i == 2 {
                    Err(PigzrError::compression("boom"))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert!(matches!(err, PigzrError::Compression(_)));
    }

    #[test]
    fn test_task_panic_becomes_error() {
        let pool = WorkerPool::new(2).unwrap();
        let items = [0, 1];
        let err = pool
            .run_batch(&items, |&i| {
                if i == 1 {
                    panic!("worker blew up");
                }
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, PigzrError::Thread(_)));

        // Pool stays usable after a panicking batch
        pool.run_batch(&items, |_| Ok(())).unwrap();
    }

    #[test]
    fn test_rejects_zero_threads() {
        assert!(WorkerPool::new(0).is_err());
        assert_eq!(WorkerPool::new(3).unwrap().num_threads(), 3);
    }
}
