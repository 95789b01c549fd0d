//! Worker pool tests: every job runs once per round, rounds are barriers

use parking_lot::Mutex;
use ran_emulator_core::threading::{WorkerPool, Workload};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct Counters {
    hits: Vec<AtomicUsize>,
    threads: Mutex<Vec<String>>,
}

impl Counters {
    fn new(n: usize) -> Self {
        Self {
            hits: (0..n).map(|_| AtomicUsize::new(0)).collect(),
            threads: Mutex::new(Vec::new()),
        }
    }

    fn total(&self) -> usize {
        self.hits.iter().map(|h| h.load(Ordering::SeqCst)).sum()
    }
}

impl Workload for Counters {
    type Job = usize;

    fn execute(&self, job: usize) {
        if job % 7 == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        self.hits[job].fetch_add(1, Ordering::SeqCst);
        if let Some(name) = thread::current().name() {
            self.threads.lock().push(name.to_string());
        }
    }
}

#[test]
fn test_each_job_runs_exactly_once() {
    let work = Arc::new(Counters::new(64));
    let pool = WorkerPool::new(Arc::clone(&work), 4).unwrap();
    assert_eq!(pool.threads(), 4);

    pool.run_round((0..64).collect());
    assert!(work.hits.iter().all(|h| h.load(Ordering::SeqCst) == 1));
}

#[test]
fn test_round_is_a_barrier() {
    let work = Arc::new(Counters::new(32));
    let pool = WorkerPool::new(Arc::clone(&work), 3).unwrap();
    for round in 1..=20 {
        pool.run_round((0..32).collect());
        // Every job of the round has finished before run_round returns
        assert_eq!(work.total(), 32 * round);
    }
}

#[test]
fn test_fewer_jobs_than_threads() {
    let work = Arc::new(Counters::new(2));
    let pool = WorkerPool::new(Arc::clone(&work), 8).unwrap();
    pool.run_round(vec![0, 1]);
    pool.run_round(vec![1]);
    assert_eq!(work.hits[0].load(Ordering::SeqCst), 1);
    assert_eq!(work.hits[1].load(Ordering::SeqCst), 2);
}

#[test]
fn test_empty_round_returns() {
    let work = Arc::new(Counters::new(1));
    let pool = WorkerPool::new(Arc::clone(&work), 2).unwrap();
    pool.run_round(Vec::new());
    assert_eq!(work.total(), 0);
}

#[test]
fn test_zero_threads_runs_inline() {
    let work = Arc::new(Counters::new(10));
    let pool = WorkerPool::new(Arc::clone(&work), 0).unwrap();
    pool.run_round((0..10).collect());
    assert_eq!(work.total(), 10);
    // Executed on the calling (test) thread, never on a pool worker
    assert!(work
        .threads
        .lock()
        .iter()
        .all(|name| !name.starts_with("emulator-worker")));
}

#[test]
fn test_workers_are_named() {
    let work = Arc::new(Counters::new(50));
    let pool = WorkerPool::new(Arc::clone(&work), 2).unwrap();
    pool.run_round((0..50).collect());
    let names = work.threads.lock();
    assert_eq!(names.len(), 50);
    assert!(names.iter().all(|n| n.starts_with("emulator-worker-")));
}

#[test]
fn test_drop_joins_workers() {
    let work = Arc::new(Counters::new(4));
    {
        let pool = WorkerPool::new(Arc::clone(&work), 4).unwrap();
        pool.run_round((0..4).collect());
    }
    // Only the test's handle remains once the workers have exited
    assert_eq!(Arc::strong_count(&work), 1);
}

struct Faulty {
    done: AtomicUsize,
}

impl Workload for Faulty {
    type Job = usize;

    fn execute(&self, job: usize) {
        if job == 3 {
            panic!("job 3 failed");
        }
        self.done.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_panicking_job_reaches_the_caller() {
    let work = Arc::new(Faulty {
        done: AtomicUsize::new(0),
    });
    let pool = WorkerPool::new(Arc::clone(&work), 3).unwrap();

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pool.run_round((0..10).collect())
    }));
    let payload = outcome.unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"job 3 failed"));
    assert_eq!(work.done.load(Ordering::SeqCst), 9);

    // The pool stays usable for later rounds
    pool.run_round(vec![0, 1, 2]);
    assert_eq!(work.done.load(Ordering::SeqCst), 12);
}
