//! Catalog version selection
//!
//! Picks the earliest version effective at or after the target time. When the
//! target is later than every version the last one is used. A single version
//! is always selected. This is a ceiling search, not a floor search: a target
//! that falls between two versions gets the later one.

/// Select a version index from an ascending slice of timestamps.
///
/// Returns `None` only for an empty slice. Ties resolve to the leftmost
/// equal element.
pub fn select_version<T: Ord>(target: &T, versions: &[T]) -> Option<usize> {
    select_version_by(target, versions, |v| v)
}

/// Same as [`select_version`], for items ordered by a key
pub fn select_version_by<V, K, F>(target: &K, versions: &[V], key: F) -> Option<usize>
where
    K: Ord,
    F: Fn(&V) -> &K,
{
    match versions.len() {
        0 => None,
        1 => Some(0),
        len => {
            let index = versions.partition_point(|v| key(v) < target);
            if index == len {
                Some(len - 1)
            } else {
                Some(index)
            }
        }
    }
}
