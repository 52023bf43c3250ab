//! Per-row visitor contract.

use crate::error::Result;

/// One parsed data row, in header column order.
pub type Row = csv::StringRecord;

/// Called once per data row as a file streams in.
///
/// Implementations are not handed the whole file at once: the import
/// driver calls `visit` row by row so a visitor can accumulate state
/// (a running sum, a batch buffer) without holding the source file in
/// memory.
pub trait LineVisitor: Send {
    /// Handles one row. `line_no` is 1-based within its source file.
    fn visit(&mut self, line_no: u64, row: &Row) -> Result<()>;
}

impl<F> LineVisitor for F
where
    F: FnMut(u64, &Row) -> Result<()> + Send,
{
    fn visit(&mut self, line_no: u64, row: &Row) -> Result<()> {
        self(line_no, row)
    }
}
