//! End-to-end scenario: 4 pages, page shift 4 (page size 16), last page
//! holding 10 elements (`size = 58`). With the identity factory, every
//! page's elements equal their own global index.

use concur_core::Concurrency;
use concur_paged::{create_paged_array, PageFactory};
use concur_pool::{PoolSizes, WorkerPool};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn identity_factory_fills_every_page_including_the_short_last_one() {
    let page_shift = 4;
    let page_size = 1u64 << page_shift;
    let size = 3 * page_size + 10;

    let pool = WorkerPool::new(PoolSizes::fixed(4).unwrap(), "scenario-page-creator");
    let array = create_paged_array(
        size,
        page_shift,
        PageFactory::Identity,
        Concurrency::new(4).unwrap(),
        Some(pool),
    )
    .await
    .unwrap();

    assert_eq!(array.page_count(), 4);

    for page in 0..3u64 {
        for i in 0..page_size {
            let global = page * page_size + i;
            assert_eq!(array.get(global), global as i64, "page {page} index {i}");
        }
    }

    for i in 0..10u64 {
        let global = 3 * page_size + i;
        assert_eq!(array.get(global), 48 + i as i64, "last page index {i}");
    }
}
