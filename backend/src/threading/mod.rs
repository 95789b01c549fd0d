//! Barrier-synchronized worker pool

mod pool;

pub use pool::{PoolError, WorkerPool, Workload};
