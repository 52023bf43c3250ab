//! Subcommand implementations, one module per [`crate::config::Command`]
//! variant.

mod bench;
mod run;

pub use bench::run as bench;
pub use run::run;
