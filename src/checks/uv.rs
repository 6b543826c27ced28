use crate::checks::{CheckDescriptor, CheckError, CheckUnit, fix_each, inspect_each};
use crate::models::{CheckConfig, CheckResult, ComponentKind, Locator};
use crate::scene::{SceneError, SceneProvider};
use crate::uv::{UvIndexCompactor, ghost_indices, validate_assignments};

/// Finds UV-table entries that no face corner references ("ghost" UVs).
///
/// Each result lists the ghost entries as `<mesh>.map[i]` components. The fix
/// rewrites the table through [`UvIndexCompactor`], which converges in one
/// round.
#[derive(Debug, Clone)]
pub struct UnassignedUvsCheck {
    descriptor: CheckDescriptor,
    compactor: UvIndexCompactor,
}

impl UnassignedUvsCheck {
    pub fn new() -> Self {
        Self {
            descriptor: CheckDescriptor::new("Unassigned UVs", "UV").fixable(),
            compactor: UvIndexCompactor::new(),
        }
    }
}

impl Default for UnassignedUvsCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckUnit for UnassignedUvsCheck {
    fn descriptor(&self) -> &CheckDescriptor {
        &self.descriptor
    }

    fn check(
        &self,
        scene: &dyn SceneProvider,
        objects: &[Locator],
        _config: &CheckConfig,
    ) -> Result<Vec<CheckResult>, CheckError> {
        Ok(inspect_each(&self.descriptor.name, objects, |object| {
            let (table, assignments) = scene.get_uv_table(object)?;
            // corrupt tables are reported as host failures rather than as clean
            validate_assignments(&table, &assignments).map_err(|e| {
                SceneError::HostOperationFailed {
                    target: object.clone(),
                    reason: e.to_string(),
                }
            })?;
            Ok(ghost_indices(table.len(), &assignments)
                .into_iter()
                .map(|index| object.component(ComponentKind::Uv, index))
                .collect())
        }))
    }

    fn fix(&self, scene: &mut dyn SceneProvider, results: &[CheckResult]) -> Result<(), CheckError> {
        fix_each(&self.descriptor.name, results, |result| {
            self.compactor.compact_in_scene(scene, result.target())?;
            Ok(())
        })
    }
}
