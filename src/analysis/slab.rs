use std::collections::BTreeMap;

use serde::Serialize;

use crate::format::BYTES_PER_MB;
use crate::system::snapshot::SlabCache;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlabDiff {
    pub name: String,
    pub first_bytes: u64,
    pub last_bytes: u64,
    pub delta: i64,
}

impl SlabDiff {
    pub fn delta_mb(&self) -> f64 {
        self.delta as f64 / BYTES_PER_MB
    }
}

/// Per-cache size change between two top-N lists.
///
/// A cache missing from one side counts as zero there, so a cache that only
/// shows up at the end reports its whole size as growth.
pub fn diff_slab_caches(
    first: &[SlabCache],
    last: &[SlabCache],
    min_change_mb: f64,
    limit: usize,
) -> Vec<SlabDiff> {
    let mut sizes: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for cache in first {
        sizes.entry(&cache.name).or_default().0 = cache.total_size_bytes;
    }
    for cache in last {
        sizes.entry(&cache.name).or_default().1 = cache.total_size_bytes;
    }

    let mut diffs: Vec<SlabDiff> = sizes
        .into_iter()
        .map(|(name, (first_bytes, last_bytes))| SlabDiff {
            name: name.to_string(),
            first_bytes,
            last_bytes,
            delta: last_bytes as i64 - first_bytes as i64,
        })
        .filter(|d| d.delta_mb().abs() > min_change_mb)
        .collect();
    diffs.sort_by_key(|d| std::cmp::Reverse(d.delta.unsigned_abs()));
    diffs.truncate(limit);
    diffs
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn cache(name: &str, bytes: u64) -> SlabCache {
        SlabCache {
            name: name.to_string(),
            active_objects: 0,
            total_objects: 0,
            object_size: 0,
            active_slabs: 0,
            total_slabs: 0,
            total_size_bytes: bytes,
        }
    }

    #[test]
    fn union_of_names_is_compared() {
        let first = [cache("dentry", 10 * MB), cache("old_cache", 4 * MB)];
        let last = [cache("dentry", 12 * MB), cache("new_cache", 8 * MB)];
        let diffs = diff_slab_caches(&first, &last, 1.0, 10);

        let summary: Vec<(&str, i64)> = diffs.iter().map(|d| (d.name.as_str(), d.delta)).collect();
        assert_eq!(
            summary,
            vec![
                ("new_cache", (8 * MB) as i64),
                ("old_cache", -((4 * MB) as i64)),
                ("dentry", (2 * MB) as i64),
            ]
        );
    }

    #[test]
    fn small_changes_and_overflow_are_dropped() {
        let first = [cache("a", 10 * MB), cache("b", 0), cache("c", 0)];
        let last = [cache("a", 10 * MB + 1024), cache("b", 3 * MB), cache("c", 2 * MB)];
        let diffs = diff_slab_caches(&first, &last, 1.0, 1);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].name, "b");
    }
}
