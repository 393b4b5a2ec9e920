//! A fixed set of long-lived worker threads draining a FIFO task queue.

mod barrier;
mod future;

pub use barrier::Barrier;
pub use future::TaskFuture;

use crate::error::Error;
use crate::registry;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs once on each worker thread before it starts draining tasks. The
/// arguments are the total worker count and this worker's index; typical
/// uses are naming the thread (`name_thread!`), pinning affinity or
/// adjusting priority through native handles.
pub type SetupFn = dyn Fn(usize, usize) + Send + Sync;

struct QueueState {
    tasks: VecDeque<Task>,
    running: bool,
}

struct PoolShared {
    queue: Mutex<QueueState>,
    /// Wakes workers for new tasks and for shutdown.
    new_task: Condvar,
    /// Tasks submitted but not yet finished executing. Incremented at
    /// submission (under the queue lock), decremented after a task runs.
    in_flight: AtomicUsize,
}

/// The worker pool.
///
/// Dropping the pool shuts it down: submissions start failing with
/// [`Error::PoolClosed`], already-queued tasks are drained, and every
/// worker is joined.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// A pool with `worker_count` workers and no per-thread setup.
    pub fn new(worker_count: usize) -> Result<Self, Error> {
        Self::with_setup(worker_count, |_, _| {})
    }

    /// A pool with one worker per available core minus one (the spawning
    /// thread keeps working too), and at least one.
    pub fn with_default_workers() -> Result<Self, Error> {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(cores.saturating_sub(1).max(1))
    }

    /// A pool whose workers each run `setup(total, index)` before their
    /// first task.
    pub fn with_setup(
        worker_count: usize,
        setup: impl Fn(usize, usize) + Send + Sync + 'static,
    ) -> Result<Self, Error> {
        if worker_count == 0 {
            return Err(Error::InvalidConfiguration("worker count must be > 0"));
        }

        let shared = Arc::new(PoolShared {
            queue: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                running: true,
            }),
            new_task: Condvar::new(),
            in_flight: AtomicUsize::new(0),
        });

        let setup: Arc<SetupFn> = Arc::new(setup);
        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let shared = shared.clone();
            let setup = setup.clone();
            let handle = std::thread::Builder::new()
                .name(format!("pool-worker-{index}"))
                .spawn(move || run_worker(shared, setup, worker_count, index))
                .map_err(Error::Io)?;
            workers.push(handle);
        }

        Ok(Self { shared, workers })
    }

    /// Number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of tasks queued and not yet picked up by a worker.
    pub fn remaining_tasks(&self) -> usize {
        self.shared.queue.lock().unwrap().tasks.len()
    }

    /// Enqueue a fire-and-forget task.
    pub fn add_task(&self, task: impl FnOnce() + Send + 'static) -> Result<(), Error> {
        #[cfg(feature = "pool-profiling")]
        crate::profile_scope!(pool_add_task);
        self.enqueue(Box::new(task))
    }

    /// Enqueue a task that notifies `barrier` after it runs.
    pub fn add_task_with_barrier(
        &self,
        barrier: &Arc<Barrier>,
        task: impl FnOnce() + Send + 'static,
    ) -> Result<(), Error> {
        #[cfg(feature = "pool-profiling")]
        crate::profile_scope!(pool_add_task_with_barrier);
        let barrier = barrier.clone();
        self.enqueue(Box::new(move || {
            task();
            notify_barrier(&barrier);
        }))
    }

    /// Enqueue a task whose return value materializes a [`TaskFuture`].
    pub fn add_task_with_result<T, F>(&self, task: F) -> Result<TaskFuture<T>, Error>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        #[cfg(feature = "pool-profiling")]
        crate::profile_scope!(pool_add_task_with_result);
        let (promise, future) = future::task_channel();
        self.enqueue(Box::new(move || promise.fulfill(task())))?;
        Ok(future)
    }

    /// Enqueue a result-bearing task that also notifies `barrier` after
    /// it runs.
    pub fn add_task_with_result_and_barrier<T, F>(
        &self,
        barrier: &Arc<Barrier>,
        task: F,
    ) -> Result<TaskFuture<T>, Error>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        #[cfg(feature = "pool-profiling")]
        crate::profile_scope!(pool_add_task_with_result_and_barrier);
        let (promise, future) = future::task_channel();
        let barrier = barrier.clone();
        self.enqueue(Box::new(move || {
            promise.fulfill(task());
            notify_barrier(&barrier);
        }))?;
        Ok(future)
    }

    /// Busily wait until every submitted task has finished executing.
    ///
    /// This spins on the in-flight counter for minimal wake-up latency at
    /// the cost of burning a core while waiting. Submissions made
    /// concurrently from *other* threads have no happens-before
    /// relationship with the waiter and may be missed; submissions made
    /// earlier on the waiting thread are always observed.
    pub fn wait_for_all(&self) {
        while self.shared.in_flight.load(Ordering::Acquire) != 0 {
            std::hint::spin_loop();
        }
    }

    /// Start shutting down: further submissions fail with
    /// [`Error::PoolClosed`]. Queued tasks are still drained; workers are
    /// joined when the pool is dropped.
    pub fn shutdown(&self) {
        {
            let mut queue = self.shared.queue.lock().unwrap();
            queue.running = false;
        }
        self.shared.new_task.notify_all();
    }

    fn enqueue(&self, task: Task) -> Result<(), Error> {
        {
            let mut queue = self.shared.queue.lock().unwrap();
            if !queue.running {
                return Err(Error::PoolClosed);
            }
            self.shared.in_flight.fetch_add(1, Ordering::Relaxed);
            queue.tasks.push_back(task);
        }
        self.shared.new_task.notify_one();
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
        tracing::debug!(workers = self.workers.len(), "worker pool shutting down");
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn notify_barrier(barrier: &Barrier) {
    if let Err(error) = barrier.notify_completed() {
        // Misconfigured barrier count; surface it without taking the
        // worker down.
        tracing::error!(%error, "barrier notification failed");
    }
}

fn run_worker(shared: Arc<PoolShared>, setup: Arc<SetupFn>, total: usize, index: usize) {
    setup(total, index);
    // Claim an identity so recorded events attribute to this worker. A
    // name assigned by the setup function wins; a full table is
    // tolerated.
    let _ = registry::assign_thread_name(&format!("PoolWorker{index}"));

    loop {
        let task = {
            #[cfg(feature = "pool-profiling")]
            crate::profile_scope!(pool_acquire_task);
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if !queue.running && queue.tasks.is_empty() {
                    return;
                }
                match queue.tasks.pop_front() {
                    Some(task) => break task,
                    None => queue = shared.new_task.wait(queue).unwrap(),
                }
            }
        };

        task();
        shared.in_flight.fetch_sub(1, Ordering::Release);
    }
}
