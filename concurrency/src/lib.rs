// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Fork-join helpers for batch computations over independent keys.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

use std::collections::BTreeMap;
use std::num::NonZero;

/// Number of workers to split a batch of `len` items across.
fn workers(len: usize, parallel: bool) -> usize {
    if !parallel || len < 2 {
        return 1;
    }
    std::thread::available_parallelism()
        .map_or(1, NonZero::get)
        .min(len)
}

/// Apply `f` to every entry of `items` and collect the results under the same keys.
///
/// With `parallel`, entries are split in contiguous chunks over scoped threads, one chunk per
/// available core. The result does not depend on the split. A panic in a worker is resumed on
/// the calling thread.
///
/// # Errors
///
/// Fails with the error of the first failing entry, in key order.
pub fn map_keyed<K, V, T, E, F>(
    items: &BTreeMap<K, V>,
    parallel: bool,
    f: F,
) -> Result<BTreeMap<K, T>, E>
where
    K: Ord + Clone + Sync + Send,
    V: Sync,
    T: Send,
    E: Send,
    F: Fn(&K, &V) -> Result<T, E> + Sync,
{
    let entries: Vec<(&K, &V)> = items.iter().collect();
    let map_chunk = |chunk: &[(&K, &V)]| -> Result<Vec<(K, T)>, E> {
        chunk
            .iter()
            .map(|(key, value)| f(key, value).map(|t| ((*key).clone(), t)))
            .collect()
    };
    let map_chunk = &map_chunk;

    let workers = workers(entries.len(), parallel);
    if workers == 1 {
        return map_chunk(&entries).map(|mapped| mapped.into_iter().collect());
    }
    let chunk_size = entries.len().div_ceil(workers);
    let chunks: Vec<Result<Vec<(K, T)>, E>> = std::thread::scope(|scope| {
        let handles: Vec<_> = entries
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || map_chunk(chunk)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    });
    let mut mapped = BTreeMap::new();
    for chunk in chunks {
        mapped.extend(chunk?);
    }
    Ok(mapped)
}
