//! Consumer schema filters (spec.md §3 "Consumer", §9 Open Question 1).
//!
//! The source material the spec was distilled from has two variants: a
//! 64-bit id bitmask, and a dense byte array indexed by id. The bitmask
//! silently fails for ids >= 64 even though `MAX_SCHEMA_ENTRIES` is 64 by
//! default, which is exactly the id range it needs to cover. We adopt the
//! dense-array interpretation here, as spec.md §9 directs, so a filter can
//! always address the full `MAX_SCHEMA_ENTRIES` range regardless of how the
//! constant is tuned.

use crate::config::MAX_SCHEMA_ENTRIES;

/// A consumer's schema filter: either "accept everything" or a dense,
/// per-id accept/reject table.
#[derive(Clone)]
pub enum Filter {
    /// Accept entries of any registered schema id.
    All,
    /// Accept only entries whose id is marked `true`.
    Ids([bool; MAX_SCHEMA_ENTRIES]),
}

impl Filter {
    /// A filter that accepts every id.
    #[must_use]
    pub const fn all() -> Self {
        Self::All
    }

    /// A filter that accepts only the given ids. Ids `>= MAX_SCHEMA_ENTRIES`
    /// are silently ignored (they could never match a registered schema
    /// anyway, per spec.md invariant 5).
    #[must_use]
    pub fn accepting(ids: impl IntoIterator<Item = u16>) -> Self {
        let mut table = [false; MAX_SCHEMA_ENTRIES];
        for id in ids {
            if let Some(slot) = table.get_mut(id as usize) {
                *slot = true;
            }
        }
        Self::Ids(table)
    }

    /// Returns `true` if this filter accepts entries with the given id.
    #[inline]
    #[must_use]
    pub fn accepts(&self, id: u16) -> bool {
        match self {
            Self::All => true,
            Self::Ids(table) => table.get(id as usize).copied().unwrap_or(false),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::All
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_accepts_everything() {
        let f = Filter::all();
        assert!(f.accepts(0));
        assert!(f.accepts(63));
        assert!(f.accepts(9999));
    }

    #[test]
    fn dense_filter_accepts_only_listed_ids() {
        let f = Filter::accepting([1, 3]);
        assert!(!f.accepts(0));
        assert!(f.accepts(1));
        assert!(!f.accepts(2));
        assert!(f.accepts(3));
    }

    #[test]
    fn dense_filter_covers_full_range_unlike_a_bitmask() {
        // The whole point of the dense-array interpretation: ids up to
        // MAX_SCHEMA_ENTRIES - 1 work, not just the low 64 of a u64 mask
        // truncated differently.
        let f = Filter::accepting([63]);
        assert!(f.accepts(63));
        assert!(!f.accepts(62));
    }

    #[test]
    fn out_of_range_ids_are_ignored_not_panicking() {
        let f = Filter::accepting([1000]);
        assert!(!f.accepts(1000));
    }
}
