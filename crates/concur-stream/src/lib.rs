#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod queue_iter;

pub use queue_iter::QueueIter;
