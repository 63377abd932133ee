//! Bounded worker pool for compositing tasks

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Task function type
pub type TaskFn = Box<dyn FnOnce() + Send + 'static>;

/// Shared FIFO the workers pull from
struct TaskQueue {
    tasks: Mutex<VecDeque<TaskFn>>,
    condvar: Condvar,
    shutdown: AtomicBool,
}

impl TaskQueue {
    fn new() -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<TaskFn>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, task: TaskFn) {
        self.lock().push_back(task);
        self.condvar.notify_one();
    }

    /// Block until a task is available; `None` once shut down and drained
    fn wait_for_task(&self) -> Option<TaskFn> {
        let mut queue = self.lock();
        loop {
            if let Some(task) = queue.pop_front() {
                return Some(task);
            }
            if self.shutdown.load(Ordering::Acquire) {
                return None;
            }
            queue = self
                .condvar
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn shutdown(&self) {
        // Flip under the lock so no worker misses the wakeup
        let _guard = self.lock();
        self.shutdown.store(true, Ordering::Release);
        self.condvar.notify_all();
    }
}

struct Worker {
    id: usize,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("running", &self.thread.is_some())
            .finish()
    }
}

impl Worker {
    fn spawn(id: usize, queue: Arc<TaskQueue>) -> std::io::Result<Self> {
        let thread = thread::Builder::new()
            .name(format!("caption-compositor-{id}"))
            .spawn(move || {
                while let Some(task) = queue.wait_for_task() {
                    // A panicking task must not take the worker down with it;
                    // its result channel closes and the submitter notices.
                    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                        tracing::error!("Compositing task panicked on worker {}", id);
                    }
                }
            })?;

        Ok(Self {
            id,
            thread: Some(thread),
        })
    }
}

/// Fixed-size thread pool
pub struct ThreadPool {
    workers: Vec<Worker>,
    queue: Arc<TaskQueue>,
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("workers", &self.workers)
            .finish()
    }
}

impl ThreadPool {
    /// Create a pool with `worker_count` threads (at least one).
    ///
    /// If the OS refuses to spawn some threads the pool runs with the ones
    /// it got; if it refuses all of them, tasks run on the submitting thread.
    pub fn new(worker_count: usize) -> Self {
        let queue = Arc::new(TaskQueue::new());

        let mut workers = Vec::with_capacity(worker_count.max(1));
        for id in 0..worker_count.max(1) {
            match Worker::spawn(id, Arc::clone(&queue)) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    tracing::warn!("Could not spawn compositing worker {}: {}", id, e);
                    break;
                }
            }
        }

        Self {
            workers,
            queue,
        }
    }

    /// Submit a task
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.workers.is_empty() {
            if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                tracing::error!("Compositing task panicked on the submitting thread");
            }
            return;
        }
        self.queue.push(Box::new(task));
    }

    /// Get worker count
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Finish queued tasks and stop the workers
    pub fn shutdown(&mut self) {
        self.queue.shutdown();

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Number of CPUs, falling back to 4
pub(crate) fn available_workers() -> usize {
    thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn test_runs_all_tasks() {
        let pool = ThreadPool::new(3);
        assert_eq!(pool.worker_count(), 3);

        let (tx, rx) = mpsc::channel();
        for i in 0..20 {
            let tx = tx.clone();
            pool.submit(move || {
                tx.send(i).unwrap();
            });
        }
        drop(tx);

        let mut seen: Vec<i32> = rx.iter().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_survives_panicking_task() {
        let pool = ThreadPool::new(1);
        let (tx, rx) = mpsc::channel::<u32>();

        let doomed = tx.clone();
        pool.submit(move || {
            let _keep = doomed;
            panic!("boom");
        });
        pool.submit(move || {
            tx.send(7).unwrap();
        });

        assert_eq!(rx.recv().unwrap(), 7);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_zero_workers_rounds_up() {
        let pool = ThreadPool::new(0);
        assert_eq!(pool.worker_count(), 1);
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut pool = ThreadPool::new(2);
        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }
}
