#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod fixtures;
mod tasks;
mod termination;

pub use fixtures::{csv_data_files, csv_header_file, csv_sample_dir};
pub use tasks::{blocking_task, counting_task, panicking_task, returning_task};
pub use termination::FakeTerminationMonitor;
