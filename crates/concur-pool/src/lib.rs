#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod future;
mod pool;
mod scheduled;
mod sizing;

pub use future::{TaskFuture, TaskResolver};
pub use pool::{WorkerInfo, WorkerPool};
pub use scheduled::{ScheduledFuture, ScheduledPool};
pub use sizing::{
    resolve_pool_sizes, DefaultPoolSizesProvider, LicenseState, PoolSizes, PoolSizesProvider,
    DEFAULT_POOL_SIZE,
};
