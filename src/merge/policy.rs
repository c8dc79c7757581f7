//! The generic merge algorithms.
//!
//! Both functions take already-decoded sequences and are parameterized by
//! extractor functions, so each collection type instantiates them once
//! instead of carrying its own copy of the loop.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// How an append-dedup collection is ordered after the union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrder {
    /// Descending by the entry's recency key.
    NewestFirst,
    /// Local entries first, then appended remote entries, never re-sorted.
    AppendOrder,
}

/// Union `local` and `remote`, dropping any entry whose dedup key has already
/// been seen (local entries are seen first), then order and truncate to `cap`.
///
/// With [`EntryOrder::NewestFirst`] the sort is stable, so entries with equal
/// recency keep their union order.
pub fn append_dedup_capped<T, K>(
    local: Vec<T>,
    remote: Vec<T>,
    dedup_key: impl Fn(&T) -> K,
    recency: impl Fn(&T) -> i64,
    order: EntryOrder,
    cap: usize,
) -> Vec<T>
where
    K: Eq + Hash,
{
    let mut seen: HashSet<K> = HashSet::with_capacity(local.len() + remote.len());
    let mut merged: Vec<T> = Vec::with_capacity(local.len() + remote.len());

    for entry in local.into_iter().chain(remote) {
        if seen.insert(dedup_key(&entry)) {
            merged.push(entry);
        }
    }

    if order == EntryOrder::NewestFirst {
        merged.sort_by_key(|e| std::cmp::Reverse(recency(e)));
    }
    merged.truncate(cap);
    merged
}

/// Union `local` and `remote` keyed by `key`; on a collision the entry with
/// the strictly greater recency wins (ties keep the local entry). The result
/// is sorted newest first and truncated to `cap`.
pub fn merge_latest_by_key<T, K>(
    local: Vec<T>,
    remote: Vec<T>,
    key: impl Fn(&T) -> K,
    recency: impl Fn(&T) -> i64,
    cap: usize,
) -> Vec<T>
where
    K: Eq + Hash,
{
    let mut index: HashMap<K, usize> = HashMap::with_capacity(local.len() + remote.len());
    let mut merged: Vec<T> = Vec::with_capacity(local.len() + remote.len());

    for entry in local.into_iter().chain(remote) {
        let k = key(&entry);
        match index.get(&k).copied() {
            Some(slot) => {
                if recency(&entry) > recency(&merged[slot]) {
                    merged[slot] = entry;
                }
            }
            None => {
                index.insert(k, merged.len());
                merged.push(entry);
            }
        }
    }

    merged.sort_by_key(|e| std::cmp::Reverse(recency(e)));
    merged.truncate(cap);
    merged
}
