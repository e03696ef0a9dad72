//! Batched parallel mapping with early exit.
//!
//! Items are processed in batches of at most `batch_size` on the rayon pool,
//! which caps how many images are open at once. A failing batch ends the
//! run before the next batch starts.

use rayon::prelude::*;

/// Maps `f` over `items` batch by batch, returning results in input order.
///
/// `progress(done, total)` is called after every completed batch. The first
/// error (in input order) of a failing batch is returned and later batches
/// are never started; other items of that batch may still have run.
///
/// # Panics
///
/// Panics if `batch_size` is 0.
pub fn try_map_batches<T, R, E, F, P>(
    items: &[T],
    batch_size: usize,
    f: F,
    mut progress: P,
) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync,
    P: FnMut(usize, usize),
{
    assert!(batch_size > 0, "batch_size must be > 0");

    let total = items.len();
    let mut results = Vec::with_capacity(total);
    for batch in items.chunks(batch_size) {
        let outputs: Vec<Result<R, E>> = batch.par_iter().map(&f).collect();
        for output in outputs {
            results.push(output?);
        }
        progress(results.len(), total);
    }
    Ok(results)
}
