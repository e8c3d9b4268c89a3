use crate::config::ExecutionMode;
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use rayon::{prelude::*, ThreadPool};
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use std::sync::OnceLock;

/// Rollup work uses a crate-local Rayon pool rather than the global one.
///
/// Global pool initialization panics if the OS refuses to spawn threads (e.g. EAGAIN under
/// heavy test concurrency). A dedicated pool lets us fall back to sequential execution instead.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
static RAYON_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn desired_rayon_threads() -> usize {
    let from_env = std::env::var("RAYON_NUM_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0);
    from_env.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn build_rayon_pool() -> Option<ThreadPool> {
    let requested = desired_rayon_threads().max(1);
    let try_build = |n| rayon::ThreadPoolBuilder::new().num_threads(n).build();

    match try_build(requested) {
        Ok(pool) => Some(pool),
        Err(err) if requested > 1 => {
            log::debug!("rollup: failed to build {requested}-thread pool ({err}); retrying with 1");
            try_build(1).ok()
        }
        Err(err) => {
            log::debug!("rollup: no thread pool available ({err}); running sequentially");
            None
        }
    }
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn rayon_pool() -> Option<&'static ThreadPool> {
    RAYON_POOL.get_or_init(build_rayon_pool).as_ref()
}

/// Apply `f` to every item, preserving input order in the output.
///
/// Each call owns its output slot, so items may run on any worker. When several items fail,
/// the error of the earliest failing item is returned regardless of mode.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
pub(crate) fn try_map_ordered<T, R, E, F>(
    mode: ExecutionMode,
    items: &[T],
    f: F,
) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync + Send,
{
    if mode == ExecutionMode::MultiThreaded && items.len() > 1 {
        if let Some(pool) = rayon_pool() {
            let results: Vec<Result<R, E>> =
                pool.install(|| items.par_iter().map(&f).collect());
            return results.into_iter().collect();
        }
    }

    items.iter().map(f).collect()
}

#[cfg(not(all(feature = "parallel", not(target_arch = "wasm32"))))]
pub(crate) fn try_map_ordered<T, R, E, F>(
    _mode: ExecutionMode,
    items: &[T],
    f: F,
) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync + Send,
{
    items.iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_agree_on_values_and_order() {
        let items: Vec<u64> = (0..1_000).collect();
        let square = |n: &u64| -> Result<u64, String> { Ok(n * n) };
        let single = try_map_ordered(ExecutionMode::SingleThreaded, &items, square).unwrap();
        let multi = try_map_ordered(ExecutionMode::MultiThreaded, &items, square).unwrap();
        assert_eq!(single, multi);
        assert_eq!(multi[999], 999 * 999);
    }

    #[test]
    fn earliest_error_wins() {
        let items: Vec<u64> = (0..500).collect();
        let check = |n: &u64| -> Result<u64, u64> {
            if n % 100 == 37 {
                Err(*n)
            } else {
                Ok(*n)
            }
        };
        assert_eq!(
            try_map_ordered(ExecutionMode::MultiThreaded, &items, check),
            Err(37)
        );
        assert_eq!(
            try_map_ordered(ExecutionMode::SingleThreaded, &items, check),
            Err(37)
        );
    }
}
