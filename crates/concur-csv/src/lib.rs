#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod error;
mod pipeline;
mod schema;
mod visitor;

pub use error::{Error, ErrorKind, Result};
pub use pipeline::{ImportPipeline, DEFAULT_TERMINATION_POLL_ROWS};
pub use schema::{ColumnSchema, Schema, SchemaLoader, ValueType};
pub use visitor::{LineVisitor, Row};
