#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod creator;
mod paged_array;
mod sort;

pub use creator::{create_paged_array, PageFactory};
pub use paged_array::HugePagedArray;
pub use sort::indirect_merge_sort;
