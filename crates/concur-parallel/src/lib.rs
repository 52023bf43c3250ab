#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod batching;
mod fanout;
mod tasks;

pub use batching::{adjusted_batch_size, adjusted_batch_size_with_cap, power_of_two_batch_size, thread_count};
pub use fanout::{parallel_for_each_node, read_parallel};
pub use tasks::{run, run_single, tasks, tasks_with_index};
