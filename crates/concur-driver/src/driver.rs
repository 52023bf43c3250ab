//! Bounded-concurrency driver.

use std::sync::Arc;
use std::time::Duration;

use concur_core::{AlwaysRunning, Concurrency, Error, Result, Task, TerminationFlag};
use concur_pool::WorkerPool;

use crate::completion::{CompletionService, TrySubmitOutcome};
use crate::pushback::PushbackIter;

const TRACING_TARGET: &str = "concur_driver::driver";

/// Default sleep between unsuccessful submit attempts when nothing is
/// outstanding to wait on instead.
pub const DEFAULT_WAIT_MILLIS: u64 = 10;

/// Default retry budget: roughly three days at a 1ms wait.
pub const DEFAULT_MAX_WAIT_RETRIES: u64 = 250_000_000;

/// Frozen configuration for one [`run_with_concurrency`] invocation (spec
/// §4.4's input contract). `concurrency`/`executor` map to required
/// fields; everything else defaults.
pub struct DriverConfig<T> {
    concurrency: Concurrency,
    force_usage_of_executor: bool,
    wait_millis: u64,
    max_wait_retries: u64,
    may_interrupt_if_running: bool,
    termination_flag: Arc<dyn TerminationFlag>,
    executor: Option<WorkerPool<T>>,
}

impl<T> DriverConfig<T> {
    /// A config bound to `executor` (or none, forcing the sequential
    /// path) with spec defaults for everything else.
    #[must_use]
    pub fn new(concurrency: Concurrency, executor: Option<WorkerPool<T>>) -> Self {
        Self {
            concurrency,
            force_usage_of_executor: false,
            wait_millis: DEFAULT_WAIT_MILLIS,
            max_wait_retries: DEFAULT_MAX_WAIT_RETRIES,
            may_interrupt_if_running: true,
            termination_flag: Arc::new(AlwaysRunning),
            executor,
        }
    }

    /// Fails fast instead of silently downgrading to sequential execution
    /// when the executor is unusable.
    #[must_use]
    pub fn with_force_usage_of_executor(mut self, force: bool) -> Self {
        self.force_usage_of_executor = force;
        self
    }

    /// Overrides the sleep between unsuccessful submit attempts.
    #[must_use]
    pub fn with_wait_millis(mut self, wait_millis: u64) -> Self {
        self.wait_millis = wait_millis;
        self
    }

    /// Overrides the consecutive-stall budget before the driver gives up
    /// with a timeout error.
    #[must_use]
    pub fn with_max_wait_retries(mut self, max_wait_retries: u64) -> Self {
        self.max_wait_retries = max_wait_retries;
        self
    }

    /// Whether still-outstanding futures are asked to cancel during
    /// cleanup (best-effort either way; a task that already started
    /// running is not preemptible).
    #[must_use]
    pub fn with_may_interrupt_if_running(mut self, may_interrupt: bool) -> Self {
        self.may_interrupt_if_running = may_interrupt;
        self
    }

    /// Overrides the cooperative-cancellation flag polled at every submit
    /// and await/sleep step.
    #[must_use]
    pub fn with_termination_flag(mut self, flag: Arc<dyn TerminationFlag>) -> Self {
        self.termination_flag = flag;
        self
    }
}

fn executor_usable<T>(executor: &Option<WorkerPool<T>>) -> bool {
    match executor {
        Some(pool) => !pool.is_shutdown() && !pool.is_terminated(),
        None => false,
    }
}

/// Runs `tasks` to completion honouring `config`'s concurrency bound.
///
/// Falls back to sequential, inline execution when the executor is
/// unusable (unless `forceUsageOfExecutor` is set, in which case that is
/// an invalid-argument error) or when `concurrency.value() == 1`.
/// Individual task failures are accumulated and surfaced together via
/// [`Error::chain`] once the whole run has finished settling; the driver
/// never silently drops a failure.
pub async fn run_with_concurrency<T, I>(config: &DriverConfig<T>, tasks: I) -> Result<()>
where
    T: Clone + Send + 'static,
    I: Iterator<Item = Task<T>>,
{
    let usable = executor_usable(&config.executor);
    if !usable && config.force_usage_of_executor {
        return Err(Error::invalid_argument(
            "forceUsageOfExecutor was requested but the executor is unusable",
        ));
    }

    if !usable || (config.concurrency.value() == 1 && !config.force_usage_of_executor) {
        tracing::debug!(target: TRACING_TARGET, "running tasks sequentially");
        for task in tasks {
            config.termination_flag.assert_running()?;
            task();
        }
        return Ok(());
    }

    let pool = config
        .executor
        .clone()
        .expect("usable executor implies Some per executor_usable");
    let service = CompletionService::new(pool, config.concurrency.value());
    let mut iter = PushbackIter::new(tasks);
    let mut errors: Vec<Error> = Vec::new();

    for _ in 0..config.concurrency.value() {
        if !config.termination_flag.running() {
            break;
        }
        match service.try_submit(&mut iter) {
            TrySubmitOutcome::Dispatched => {}
            TrySubmitOutcome::Backpressure | TrySubmitOutcome::Exhausted => break,
        }
    }

    let drained = drain(&service, &mut iter, config, &mut errors).await;
    if let Err(err) = drained {
        service.cancel_all(config.may_interrupt_if_running);
        return Err(err);
    }

    while service.in_flight() > 0 {
        if let Err(err) = config.termination_flag.assert_running() {
            service.cancel_all(config.may_interrupt_if_running);
            return Err(err);
        }
        if let Some(Err(err)) = service.await_or_fail().await {
            errors.push(err);
        }
    }

    service.cancel_all(config.may_interrupt_if_running);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::chain(errors))
    }
}

async fn drain<T, I>(
    service: &Arc<CompletionService<T>>,
    iter: &mut PushbackIter<I>,
    config: &DriverConfig<T>,
    errors: &mut Vec<Error>,
) -> Result<()>
where
    T: Clone + Send + 'static,
    I: Iterator<Item = Task<T>>,
{
    let mut stall: u64 = 0;
    loop {
        if iter.peek().is_none() {
            return Ok(());
        }

        // "Stalled" means an iteration where nothing completed and the
        // pool still refused new work, not merely `in_flight() == 0`:
        // `try_submit` only ever reports `Backpressure` once at least one
        // task is already in flight (`available_concurrency >= 1`), so a
        // gate on `in_flight() == 0` here could never fire and the retry
        // cap would be dead code.
        let mut made_progress = false;
        if service.in_flight() > 0 {
            match service.await_or_fail().await {
                Some(Err(err)) => {
                    errors.push(err);
                    made_progress = true;
                }
                Some(Ok(_)) => made_progress = true,
                None => {}
            }
        }

        config.termination_flag.assert_running()?;

        match service.try_submit(iter) {
            TrySubmitOutcome::Dispatched => stall = 0,
            TrySubmitOutcome::Exhausted => return Ok(()),
            TrySubmitOutcome::Backpressure => {
                if made_progress {
                    stall = 0;
                } else {
                    tokio::time::sleep(Duration::from_millis(config.wait_millis)).await;
                    stall += 1;
                    if stall >= config.max_wait_retries {
                        return Err(Error::timeout_with_retries(stall, config.wait_millis));
                    }
                }
            }
        }
    }
}
