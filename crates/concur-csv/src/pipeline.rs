//! CSV import pipeline: wires file discovery and per-row streaming
//! through `concur-parallel::read_parallel`.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use concur_core::{AlwaysRunning, Concurrency, TerminationFlag};
use concur_parallel::read_parallel;
use concur_pool::WorkerPool;

use crate::error::{Error, Result};
use crate::schema::{Schema, SchemaLoader};
use crate::visitor::LineVisitor;

const TRACING_TARGET: &str = "concur_csv::pipeline";

/// How often (in rows) a running import checks its termination flag,
/// matching C2's throttled-polling rationale: checking every row would
/// dominate the cost of the import itself.
pub const DEFAULT_TERMINATION_POLL_ROWS: u64 = 10_000;

/// Drives a directory import: discovers the schema and data files, then
/// streams each data file's rows through a fresh visitor, fanning the
/// files out across `concurrency` via [`read_parallel`].
pub struct ImportPipeline {
    concurrency: Concurrency,
    pool: Option<WorkerPool<()>>,
    termination: Arc<dyn TerminationFlag>,
}

impl ImportPipeline {
    /// A pipeline bounded by `concurrency`, running inline (no pool) and
    /// never terminating early, by default.
    #[must_use]
    pub fn new(concurrency: Concurrency) -> Self {
        Self {
            concurrency,
            pool: None,
            termination: Arc::new(AlwaysRunning),
        }
    }

    /// Dispatches data-file tasks through `pool` instead of running them
    /// inline.
    #[must_use]
    pub fn with_pool(mut self, pool: WorkerPool<()>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Overrides the termination flag checked every
    /// [`DEFAULT_TERMINATION_POLL_ROWS`] rows.
    #[must_use]
    pub fn with_termination_flag(mut self, flag: Arc<dyn TerminationFlag>) -> Self {
        self.termination = flag;
        self
    }

    /// Imports every data file under `dir`, calling `visitor_factory()`
    /// once per data file to produce a fresh visitor for that file's
    /// rows. Returns the total number of rows visited across every file.
    ///
    /// The first error encountered (schema mismatch, CSV parse failure,
    /// visitor error, or termination) is surfaced; files still in flight
    /// when that happens are allowed to finish their current row but stop
    /// before reading further rows.
    pub async fn run<V, F>(&self, dir: impl AsRef<Path>, visitor_factory: F) -> Result<u64>
    where
        V: LineVisitor,
        F: Fn() -> V + Send + Sync + 'static,
    {
        let (schema, data_paths) = SchemaLoader::load(dir)?;
        if data_paths.is_empty() {
            tracing::debug!(target: TRACING_TARGET, "no data files discovered, nothing to import");
            return Ok(0);
        }

        let schema = Arc::new(schema);
        let visitor_factory = Arc::new(visitor_factory);
        let data_paths = Arc::new(data_paths);
        let errors: Arc<Mutex<Vec<Error>>> = Arc::new(Mutex::new(Vec::new()));
        let rows_processed = Arc::new(AtomicU64::new(0));
        let termination = Arc::clone(&self.termination);

        let size = data_paths.len() as u64;
        let consumer_schema = Arc::clone(&schema);
        let consumer_paths = Arc::clone(&data_paths);
        let consumer_errors = Arc::clone(&errors);
        let consumer_rows = Arc::clone(&rows_processed);
        let consumer_termination = Arc::clone(&termination);

        read_parallel(self.concurrency, size, self.pool.as_ref(), move |start, end| {
            for index in start..end {
                let path = &consumer_paths[index as usize];
                let mut visitor = visitor_factory();
                let outcome = process_file(path, &consumer_schema, &mut visitor, &consumer_termination, &consumer_rows);
                if let Err(err) = outcome {
                    tracing::warn!(target: TRACING_TARGET, file = %path.display(), error = %err, "import file failed");
                    consumer_errors.lock().expect("errors mutex poisoned").push(err);
                    break;
                }
            }
        })
        .await
        .map_err(|err| Error::visitor_failed(err.to_string()))?;

        let mut errors = errors.lock().expect("errors mutex poisoned");
        if let Some(first) = errors.drain(..).next() {
            return Err(first);
        }

        Ok(rows_processed.load(Ordering::SeqCst))
    }
}

fn process_file(
    path: &Path,
    schema: &Schema,
    visitor: &mut dyn LineVisitor,
    termination: &Arc<dyn TerminationFlag>,
    rows_processed: &AtomicU64,
) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_path(path)?;
    for (offset, record) in reader.records().enumerate() {
        let record = record?;
        let line_no = offset as u64 + 1;
        if record.len() != schema.column_count() {
            return Err(Error::column_count_mismatch(schema.column_count(), record.len(), line_no));
        }
        visitor.visit(line_no, &record)?;

        let total = rows_processed.fetch_add(1, Ordering::Relaxed) + 1;
        if total % DEFAULT_TERMINATION_POLL_ROWS == 0 {
            termination
                .assert_running()
                .map_err(|err| Error::visitor_failed(err.to_string()))?;
        }
    }
    Ok(())
}
