#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod completion;
mod driver;
mod pushback;

pub use completion::{CompletionService, TrySubmitOutcome};
pub use driver::{run_with_concurrency, DriverConfig, DEFAULT_MAX_WAIT_RETRIES, DEFAULT_WAIT_MILLIS};
pub use pushback::PushbackIter;
