//! Parallel page creator.

use std::sync::{Arc, Mutex as StdMutex};

use concur_core::{Concurrency, Result, Task};
use concur_driver::DriverConfig;
use concur_pool::WorkerPool;

use crate::paged_array::HugePagedArray;

const TRACING_TARGET: &str = "concur_paged::creator";

/// How each element of a page is produced.
///
/// `Identity` and `PassThrough` are both provided because callers
/// sometimes want the permutation array pre-seeded with its own indices
/// (`Identity`) and sometimes want a page of untouched zeros to fill in
/// later (`PassThrough`); `Generator` covers everything else.
pub enum PageFactory {
    /// `a[i] = i` for every global index `i`.
    Identity,
    /// `a[i] = 0` for every global index `i`.
    PassThrough,
    /// `a[i] = generator(i)` for every global index `i`.
    Generator(Arc<dyn Fn(u64) -> i64 + Send + Sync>),
}

impl PageFactory {
    fn value_at(&self, global_index: u64) -> i64 {
        match self {
            PageFactory::Identity => global_index as i64,
            PageFactory::PassThrough => 0,
            PageFactory::Generator(f) => f(global_index),
        }
    }
}

fn fill_page(factory: &PageFactory, page_index: u64, page_size: u64, len: u64) -> Vec<i64> {
    let base = page_index * page_size;
    (0..len).map(|offset| factory.value_at(base + offset)).collect()
}

/// Builds a [`HugePagedArray`] of `size` elements, paged at `1 <<
/// page_shift`, filling every page through `factory`.
///
/// All pages but the last are dispatched through `pool` via the
/// bounded-concurrency driver; the last page is always filled inline on
/// the calling task, concurrently with the driver run, so that the tail
/// of the array never becomes a straggler submission waiting on a busy
/// pool.
pub async fn create_paged_array(
    size: u64,
    page_shift: u32,
    factory: PageFactory,
    concurrency: Concurrency,
    pool: Option<WorkerPool<()>>,
) -> Result<HugePagedArray> {
    let page_size = 1u64 << page_shift;
    let page_count = if size == 0 { 0 } else { size.div_ceil(page_size) };

    if page_count == 0 {
        return Ok(HugePagedArray::from_pages(Vec::new(), size, page_shift));
    }

    let factory = Arc::new(factory);
    let slots: Arc<Vec<StdMutex<Vec<i64>>>> =
        Arc::new((0..page_count).map(|_| StdMutex::new(Vec::new())).collect());

    let last_page_index = page_count - 1;
    let last_len = size - last_page_index * page_size;

    let driver_handle = if last_page_index > 0 {
        let tasks: Vec<Task<()>> = (0..last_page_index)
            .map(|page_index| {
                let factory = Arc::clone(&factory);
                let slots = Arc::clone(&slots);
                Box::new(move || {
                    let page = fill_page(&factory, page_index, page_size, page_size);
                    *slots[page_index as usize].lock().expect("page slot mutex poisoned") = page;
                }) as Task<()>
            })
            .collect();

        let config = DriverConfig::new(concurrency, pool);
        Some(tokio::spawn(
            async move { concur_driver::run_with_concurrency(&config, tasks.into_iter()).await },
        ))
    } else {
        None
    };

    tracing::debug!(
        target: TRACING_TARGET,
        page_count,
        last_page_index,
        "filling last page inline while earlier pages fill concurrently"
    );
    let last_page = fill_page(&factory, last_page_index, page_size, last_len);
    *slots[last_page_index as usize].lock().expect("page slot mutex poisoned") = last_page;

    if let Some(handle) = driver_handle {
        handle
            .await
            .map_err(|join_err| concur_core::Error::task_failure(join_err.to_string()))??;
    }

    let pages = slots
        .iter()
        .map(|slot| std::mem::take(&mut *slot.lock().expect("page slot mutex poisoned")))
        .collect();

    Ok(HugePagedArray::from_pages(pages, size, page_shift))
}
