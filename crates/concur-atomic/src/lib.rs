#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod cas;
mod counter;
mod latch;
mod spin;

pub use cas::update_loop;
pub use counter::PaddedCounter;
pub use latch::LatchFlag;
pub use spin::{UNBOUNDED, spin_wait};
