//! Fixed-size worker pool running jobs in rounds
//!
//! The coordinating thread opens a round with a list of jobs. Workers pull
//! jobs by index under the pool mutex, run them without holding it, and the
//! coordinator waits until every job of the round has finished. Idle
//! workers park on a condition variable until the next round or shutdown.
//!
//! Jobs are small `Copy` values (typically enums of indices) interpreted by
//! a shared [`Workload`]; the workload owns all mutable state and is
//! responsible for its own per-item locking.
//!
//! A job that panics still counts as finished; the round completes and the
//! first panic is resumed on the coordinating thread. A job that never
//! returns stalls its round; there is no per-job timeout.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// State and job interpreter shared by every worker
pub trait Workload: Send + Sync + 'static {
    type Job: Copy + Send + 'static;

    fn execute(&self, job: Self::Job);
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to spawn worker thread {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },
}

struct RoundState<J> {
    jobs: Vec<J>,
    next: usize,
    remaining: usize,
    shutdown: bool,
    /// First panic raised by a job of the current round
    panic: Option<Box<dyn Any + Send>>,
}

struct Shared<W: Workload> {
    workload: Arc<W>,
    state: Mutex<RoundState<W::Job>>,
    work_ready: Condvar,
    round_done: Condvar,
}

/// Worker pool bound to one workload
///
/// With zero threads every round runs inline on the caller.
///
/// # Example
/// ```
/// use ran_emulator_core::threading::{WorkerPool, Workload};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// struct Sum(AtomicUsize);
///
/// impl Workload for Sum {
///     type Job = usize;
///     fn execute(&self, job: usize) {
///         self.0.fetch_add(job, Ordering::Relaxed);
///     }
/// }
///
/// let work = Arc::new(Sum(AtomicUsize::new(0)));
/// let pool = WorkerPool::new(Arc::clone(&work), 3).unwrap();
/// pool.run_round((1..=10).collect());
/// assert_eq!(work.0.load(Ordering::Relaxed), 55);
/// ```
pub struct WorkerPool<W: Workload> {
    shared: Arc<Shared<W>>,
    handles: Vec<JoinHandle<()>>,
}

impl<W: Workload> WorkerPool<W> {
    /// Spawn `threads` workers for `workload`
    pub fn new(workload: Arc<W>, threads: usize) -> Result<Self, PoolError> {
        let shared = Arc::new(Shared {
            workload,
            state: Mutex::new(RoundState {
                jobs: Vec::new(),
                next: 0,
                remaining: 0,
                shutdown: false,
                panic: None,
            }),
            work_ready: Condvar::new(),
            round_done: Condvar::new(),
        });

        let mut pool = Self {
            shared,
            handles: Vec::with_capacity(threads),
        };
        for index in 0..threads {
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("emulator-worker-{index}"))
                .spawn(move || worker_loop(&shared))
                .map_err(|source| PoolError::Spawn { index, source })?;
            pool.handles.push(handle);
        }
        Ok(pool)
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.handles.len()
    }

    pub fn workload(&self) -> &Arc<W> {
        &self.shared.workload
    }

    /// Run every job and return once all have finished
    ///
    /// # Panics
    /// Resumes the first panic raised by a job, after the whole round is done.
    pub fn run_round(&self, jobs: Vec<W::Job>) {
        if jobs.is_empty() {
            return;
        }
        if self.handles.is_empty() {
            for job in jobs {
                self.shared.workload.execute(job);
            }
            return;
        }

        let mut state = self.shared.state.lock();
        state.remaining = jobs.len();
        state.next = 0;
        state.jobs = jobs;
        self.shared.work_ready.notify_all();
        while state.remaining > 0 {
            self.shared.round_done.wait(&mut state);
        }
        state.jobs.clear();
        let panicked = state.panic.take();
        drop(state);
        if let Some(payload) = panicked {
            panic::resume_unwind(payload);
        }
    }
}

fn worker_loop<W: Workload>(shared: &Shared<W>) {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            return;
        }
        if state.next < state.jobs.len() {
            let job = state.jobs[state.next];
            state.next += 1;
            let outcome = MutexGuard::unlocked(&mut state, || {
                panic::catch_unwind(AssertUnwindSafe(|| shared.workload.execute(job)))
            });
            if let Err(payload) = outcome {
                log::error!("worker job panicked");
                if state.panic.is_none() {
                    state.panic = Some(payload);
                }
            }
            state.remaining -= 1;
            if state.remaining == 0 {
                shared.round_done.notify_all();
            }
        } else {
            shared.work_ready.wait(&mut state);
        }
    }
}

impl<W: Workload> Drop for WorkerPool<W> {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.work_ready.notify_all();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("worker thread panicked");
            }
        }
    }
}
