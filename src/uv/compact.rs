use crate::models::Locator;
use crate::scene::{SceneError, SceneProvider};
use crate::uv::{UvAssignments, UvTable};
use thiserror::Error;

/// Errors that can occur while compacting a UV table.
///
/// All of these describe corrupt input (or a failed host round-trip) and are
/// fatal to the single compaction call that raised them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompactionError {
    #[error("UV index {0} has no entry in the compaction map")]
    UnmappedIndex(u32),

    #[error("UV index {index} is out of range for a table of {len} entries")]
    IndexOutOfRange { index: u32, len: usize },

    #[error("Face corner counts add up to {expected} but {actual} assignments were given")]
    CornerCountMismatch { expected: usize, actual: usize },

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Output of [`compact`]
#[derive(Debug, Clone, PartialEq)]
pub struct Compacted {
    pub table: UvTable,
    pub assignments: UvAssignments,
    /// Number of ghost entries dropped from the table
    pub removed: usize,
}

impl Compacted {
    pub fn changed(&self) -> bool {
        self.removed > 0
    }
}

/// Summary of one in-scene compaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionReport {
    pub target: Locator,
    pub before: usize,
    pub after: usize,
}

impl CompactionReport {
    pub fn removed(&self) -> usize {
        self.before - self.after
    }
}

/// Check that corner counts match the assignments and every id has a table entry
pub fn validate_assignments(table: &UvTable, assignments: &UvAssignments) -> Result<(), CompactionError> {
    let expected: usize = assignments.counts.iter().map(|&c| c as usize).sum();
    if expected != assignments.ids.len() {
        return Err(CompactionError::CornerCountMismatch {
            expected,
            actual: assignments.ids.len(),
        });
    }

    if let Some(&index) = assignments.ids.iter().find(|&&id| id as usize >= table.len()) {
        return Err(CompactionError::IndexOutOfRange {
            index,
            len: table.len(),
        });
    }

    Ok(())
}

/// Mark which table entries are referenced by at least one corner
fn referenced_mask(table_len: usize, ids: &[u32]) -> Vec<bool> {
    let mut referenced = vec![false; table_len];
    for &id in ids {
        if let Some(slot) = referenced.get_mut(id as usize) {
            *slot = true;
        }
    }
    referenced
}

/// Indices of table entries that no face corner references, ascending
pub fn ghost_indices(table_len: usize, assignments: &UvAssignments) -> Vec<u32> {
    referenced_mask(table_len, &assignments.ids)
        .iter()
        .enumerate()
        .filter(|(_, referenced)| !**referenced)
        .map(|(index, _)| index as u32)
        .collect()
}

/// Pack a UV table down to the entries that are actually referenced.
///
/// Kept entries stay in ascending order of their original index, every
/// assignment is remapped to the new position of its entry, and coordinates
/// are copied bit for bit. When every entry is already referenced the input
/// is returned unchanged, which makes the operation idempotent.
pub fn compact(table: UvTable, assignments: UvAssignments) -> Result<Compacted, CompactionError> {
    validate_assignments(&table, &assignments)?;

    let referenced = referenced_mask(table.len(), &assignments.ids);
    let kept: Vec<u32> = referenced
        .iter()
        .enumerate()
        .filter(|(_, referenced)| **referenced)
        .map(|(index, _)| index as u32)
        .collect();

    if kept.len() == table.len() {
        return Ok(Compacted {
            table,
            assignments,
            removed: 0,
        });
    }

    // old index -> rank within `kept`
    let mut remap: Vec<Option<u32>> = vec![None; table.len()];
    for (new_index, &old_index) in kept.iter().enumerate() {
        remap[old_index as usize] = Some(new_index as u32);
    }

    let coords = kept.iter().map(|&old| table.0[old as usize]).collect();

    let ids = assignments
        .ids
        .iter()
        .map(|&id| {
            remap
                .get(id as usize)
                .copied()
                .flatten()
                .ok_or(CompactionError::UnmappedIndex(id))
        })
        .collect::<Result<Vec<u32>, _>>()?;

    Ok(Compacted {
        removed: table.len() - kept.len(),
        table: UvTable(coords),
        assignments: UvAssignments {
            counts: assignments.counts,
            ids,
        },
    })
}

/// Removes ghost UVs from meshes through a [`SceneProvider`].
///
/// Stateless: every call reads the current tables from the host, compacts
/// them and writes both back with a single atomic `set_uv_table`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UvIndexCompactor;

impl UvIndexCompactor {
    pub fn new() -> Self {
        Self
    }

    /// Compact the UV tables of `target` in place.
    ///
    /// Nothing is written when the table is already compact.
    pub fn compact_in_scene(
        &self,
        scene: &mut dyn SceneProvider,
        target: &Locator,
    ) -> Result<CompactionReport, CompactionError> {
        let (table, assignments) = scene.get_uv_table(target)?;
        let before = table.len();

        let compacted = compact(table, assignments)?;
        let after = compacted.table.len();

        if compacted.changed() {
            scene.set_uv_table(target, compacted.table, compacted.assignments)?;
            tracing::info!(
                "Compacted UVs on {}: {} -> {} ({} ghost UVs removed)",
                target,
                before,
                after,
                before - after
            );
        } else {
            tracing::debug!("UVs on {} already compact ({} entries)", target, before);
        }

        Ok(CompactionReport {
            target: target.clone(),
            before,
            after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MockSceneProvider;
    use mockall::predicate::eq;
    use proptest::prelude::*;

    fn table(coords: &[(f32, f32)]) -> UvTable {
        UvTable(coords.to_vec())
    }

    #[test]
    fn test_trailing_ghost_dropped() {
        let result = compact(
            table(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (9.0, 9.0)]),
            UvAssignments::from_ids(vec![0, 1, 1, 2]),
        )
        .unwrap();

        assert_eq!(result.table, table(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]));
        assert_eq!(result.assignments.ids, vec![0, 1, 1, 2]);
        assert_eq!(result.removed, 1);
    }

    #[test]
    fn test_sparse_indices_remapped() {
        let result = compact(
            table(&[(0.0, 0.0), (5.0, 5.0), (0.0, 0.0), (7.0, 7.0)]),
            UvAssignments::from_ids(vec![1, 3]),
        )
        .unwrap();

        assert_eq!(result.table, table(&[(5.0, 5.0), (7.0, 7.0)]));
        assert_eq!(result.assignments.ids, vec![0, 1]);
        assert_eq!(result.removed, 2);
    }

    #[test]
    fn test_dense_table_unchanged() {
        let input = table(&[(0.1, 0.2), (0.3, 0.4)]);
        let assignments = UvAssignments::new(vec![3], vec![1, 0, 1]);
        let result = compact(input.clone(), assignments.clone()).unwrap();

        assert!(!result.changed());
        assert_eq!(result.table, input);
        assert_eq!(result.assignments, assignments);
    }

    #[test]
    fn test_all_ghosts_removed_when_nothing_assigned() {
        let result = compact(table(&[(0.0, 0.0), (1.0, 0.0)]), UvAssignments::default()).unwrap();
        assert!(result.table.is_empty());
        assert_eq!(result.removed, 2);
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let err = compact(table(&[(0.0, 0.0)]), UvAssignments::from_ids(vec![0, 4])).unwrap_err();
        assert_eq!(err, CompactionError::IndexOutOfRange { index: 4, len: 1 });
    }

    #[test]
    fn test_corner_count_mismatch_rejected() {
        let err = compact(
            table(&[(0.0, 0.0), (1.0, 1.0)]),
            UvAssignments::new(vec![3], vec![0, 1]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CompactionError::CornerCountMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_ghost_indices() {
        let ghosts = ghost_indices(5, &UvAssignments::from_ids(vec![4, 1, 1]));
        assert_eq!(ghosts, vec![0, 2, 3]);
    }

    #[test]
    fn test_compact_in_scene_writes_once() {
        let target = Locator::new("|mesh");
        let mut scene = MockSceneProvider::new();
        scene.expect_get_uv_table().with(eq(target.clone())).returning(|_| {
            Ok((
                UvTable(vec![(0.0, 0.0), (5.0, 5.0), (7.0, 7.0)]),
                UvAssignments::new(vec![2], vec![2, 1]),
            ))
        });
        scene
            .expect_set_uv_table()
            .withf(|_, table, assignments| {
                table.0 == vec![(5.0, 5.0), (7.0, 7.0)] && assignments.ids == vec![1, 0]
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let report = UvIndexCompactor::new()
            .compact_in_scene(&mut scene, &target)
            .unwrap();
        assert_eq!(report.before, 3);
        assert_eq!(report.after, 2);
        assert_eq!(report.removed(), 1);
    }

    #[test]
    fn test_compact_in_scene_skips_write_when_dense() {
        let mut scene = MockSceneProvider::new();
        scene.expect_get_uv_table().returning(|_| {
            Ok((UvTable(vec![(0.0, 0.0)]), UvAssignments::from_ids(vec![0, 0])))
        });
        scene.expect_set_uv_table().never();

        let report = UvIndexCompactor::new()
            .compact_in_scene(&mut scene, &Locator::new("|mesh"))
            .unwrap();
        assert_eq!(report.removed(), 0);
    }

    #[test]
    fn test_compact_in_scene_propagates_host_failure() {
        let target = Locator::new("|mesh");
        let mut scene = MockSceneProvider::new();
        scene.expect_get_uv_table().returning(|t| {
            Err(SceneError::HostOperationFailed {
                target: t.clone(),
                reason: "uv set locked".into(),
            })
        });

        let err = UvIndexCompactor::new()
            .compact_in_scene(&mut scene, &target)
            .unwrap_err();
        assert!(matches!(err, CompactionError::Scene(_)));
    }

    fn uv_input() -> impl Strategy<Value = (UvTable, UvAssignments)> {
        (1usize..24).prop_flat_map(|len| {
            (
                prop::collection::vec((-4.0f32..4.0, -4.0f32..4.0), len),
                prop::collection::vec(0..len as u32, 0..40),
            )
                .prop_map(|(coords, ids)| (UvTable(coords), UvAssignments::from_ids(ids)))
        })
    }

    proptest! {
        #[test]
        fn prop_compaction_is_idempotent((table, assignments) in uv_input()) {
            let once = compact(table, assignments).unwrap();
            let twice = compact(once.table.clone(), once.assignments.clone()).unwrap();
            prop_assert_eq!(twice.removed, 0);
            prop_assert_eq!(&twice.table, &once.table);
            prop_assert_eq!(&twice.assignments, &once.assignments);
        }

        #[test]
        fn prop_corners_keep_their_coordinates((table, assignments) in uv_input()) {
            let result = compact(table.clone(), assignments.clone()).unwrap();
            prop_assert_eq!(result.assignments.ids.len(), assignments.ids.len());
            for (old, new) in assignments.ids.iter().zip(&result.assignments.ids) {
                let (ou, ov) = table.get(*old).unwrap();
                let (nu, nv) = result.table.get(*new).unwrap();
                prop_assert_eq!(ou.to_bits(), nu.to_bits());
                prop_assert_eq!(ov.to_bits(), nv.to_bits());
            }
        }

        #[test]
        fn prop_table_shrinks_to_distinct_count((table, assignments) in uv_input()) {
            let distinct = assignments.distinct_count();
            let result = compact(table, assignments).unwrap();
            prop_assert_eq!(result.table.len(), distinct);
        }

        #[test]
        fn prop_sharing_is_preserved((table, assignments) in uv_input()) {
            let result = compact(table, assignments.clone()).unwrap();
            let ids = &assignments.ids;
            let new_ids = &result.assignments.ids;
            for i in 0..ids.len() {
                for j in 0..ids.len() {
                    prop_assert_eq!(ids[i] == ids[j], new_ids[i] == new_ids[j]);
                }
            }
        }
    }
}
