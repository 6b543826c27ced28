//! UV data and ghost UV compaction.
//!
//! A mesh's UV data is two tables read once from the host and written back
//! as a whole:
//! - [`UvTable`]: the (u, v) coordinate pairs, indexed `0..N`
//! - [`UvAssignments`]: per-face corner counts plus one UV index per face corner
//!
//! Entries of the coordinate table that no corner references are "ghost" UVs.
//! [`UvIndexCompactor`] removes them while keeping every corner pointing at the
//! same coordinates and every shared UV shared.

pub mod compact;

use serde::{Deserialize, Serialize};

pub use compact::{
    CompactionError, CompactionReport, Compacted, UvIndexCompactor, compact, ghost_indices,
    validate_assignments,
};

/// Ordered (u, v) coordinate pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UvTable(pub Vec<(f32, f32)>);

impl UvTable {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<(f32, f32)> {
        self.0.get(index as usize).copied()
    }
}

impl From<Vec<(f32, f32)>> for UvTable {
    fn from(coords: Vec<(f32, f32)>) -> Self {
        UvTable(coords)
    }
}

/// Face-corner UV assignments.
///
/// `counts[f]` is the number of corners of face `f`; `ids` holds one UV-table
/// index per corner, faces laid out back to back. Several corners may share an
/// index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UvAssignments {
    pub counts: Vec<u32>,
    pub ids: Vec<u32>,
}

impl UvAssignments {
    pub fn new(counts: Vec<u32>, ids: Vec<u32>) -> Self {
        Self { counts, ids }
    }

    /// Assignments for a single face holding every corner in `ids`
    pub fn from_ids(ids: Vec<u32>) -> Self {
        let counts = if ids.is_empty() {
            Vec::new()
        } else {
            vec![ids.len() as u32]
        };
        Self { counts, ids }
    }

    pub fn corner_count(&self) -> usize {
        self.ids.len()
    }

    /// Number of distinct UV indices referenced by any corner
    pub fn distinct_count(&self) -> usize {
        let mut ids = self.ids.clone();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ids_single_face() {
        let assignments = UvAssignments::from_ids(vec![0, 1, 1, 2]);
        assert_eq!(assignments.counts, vec![4]);
        assert_eq!(assignments.corner_count(), 4);
        assert_eq!(assignments.distinct_count(), 3);

        assert!(UvAssignments::from_ids(Vec::new()).counts.is_empty());
    }

    #[test]
    fn test_uv_table_yaml() {
        let table: UvTable = serde_yaml_ng::from_str("[[0.0, 0.5], [1.0, 1.0]]").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0), Some((0.0, 0.5)));
        assert_eq!(table.get(2), None);
    }
}
