#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod concurrency;
pub mod error;
mod task;
mod termination;

pub use concurrency::Concurrency;
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use task::{RunnableTask, Task, into_task};
pub use termination::{
    AlwaysRunning, AlwaysTerminated, DEFAULT_POLL_INTERVAL, MonitorFlag, TerminationFlag,
    TerminationMonitor,
};
