use crate::checks::{CheckDescriptor, CheckError, CheckUnit, fix_each, inspect_each};
use crate::models::{CheckConfig, CheckResult, Locator};
use crate::scene::{SceneError, SceneProvider};

pub use crate::scene::INTERMEDIATE_ATTR;

/// Objects with upstream construction history.
///
/// Components are the upstream history nodes; the fix deletes the history
/// of each reported object.
#[derive(Debug, Clone)]
pub struct ConstructionHistoryCheck {
    descriptor: CheckDescriptor,
}

impl ConstructionHistoryCheck {
    pub fn new() -> Self {
        Self {
            descriptor: CheckDescriptor::new("Construction History", "History").fixable(),
        }
    }
}

impl Default for ConstructionHistoryCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckUnit for ConstructionHistoryCheck {
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
            scene.list_history(object)
        }))
    }

    fn fix(&self, scene: &mut dyn SceneProvider, results: &[CheckResult]) -> Result<(), CheckError> {
        fix_each(&self.descriptor.name, results, |result| {
            scene.delete_construction_history(result.target())?;
            tracing::info!("Deleted construction history on {}", result.target());
            Ok(())
        })
    }
}

/// Intermediate (hidden history) shapes left in the hierarchy.
///
/// The fix deletes them. A host may refuse while the parent still carries
/// construction history; in that case the parent's history is deleted first
/// and the deletion retried once.
#[derive(Debug, Clone)]
pub struct IntermediateObjectsCheck {
    descriptor: CheckDescriptor,
}

impl IntermediateObjectsCheck {
    pub fn new() -> Self {
        Self {
            descriptor: CheckDescriptor::new("Intermediate Objects", "History").fixable(),
        }
    }
}

impl Default for IntermediateObjectsCheck {
    fn default() -> Self {
        Self::new()
    }
}

fn delete_intermediate(scene: &mut dyn SceneProvider, node: &Locator) -> Result<(), SceneError> {
    match scene.delete_node(node) {
        Err(SceneError::HostOperationFailed { reason, .. }) => {
            let Some(parent) = node.parent() else {
                return Err(SceneError::HostOperationFailed {
                    target: node.clone(),
                    reason,
                });
            };
            tracing::debug!(
                "Deleting {} failed ({}), clearing history on {} and retrying",
                node,
                reason,
                parent
            );
            scene.delete_construction_history(&parent)?;
            scene.delete_node(node)
        }
        other => other,
    }
}

impl CheckUnit for IntermediateObjectsCheck {
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
            let intermediate = scene
                .get_attribute(object, INTERMEDIATE_ATTR)?
                .as_bool()
                .unwrap_or(false);
            Ok(if intermediate {
                vec![object.clone()]
            } else {
                Vec::new()
            })
        }))
    }

    fn fix(&self, scene: &mut dyn SceneProvider, results: &[CheckResult]) -> Result<(), CheckError> {
        fix_each(&self.descriptor.name, results, |result| {
            for node in result.components() {
                match delete_intermediate(scene, node) {
                    // already gone, e.g. removed together with its parent's history
                    Ok(()) | Err(SceneError::NotFound(_)) => {
                        tracing::info!("Deleted intermediate object {}", node);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{AttrValue, MockSceneProvider};
    use mockall::Sequence;
    use mockall::predicate::eq;

    #[test]
    fn test_history_components_are_upstream_nodes() {
        let mut scene = MockSceneProvider::new();
        scene.expect_list_history().returning(|t| {
            Ok(if t.as_str() == "|body" {
                vec![Locator::new("polyBevel1"), Locator::new("polyCube1")]
            } else {
                Vec::new()
            })
        });

        let objects = vec![Locator::new("|body"), Locator::new("|clean")];
        let results = ConstructionHistoryCheck::new()
            .check(&scene, &objects, &CheckConfig::new())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].components().len(), 2);
    }

    #[test]
    fn test_intermediate_detected() {
        let mut scene = MockSceneProvider::new();
        scene
            .expect_get_attribute()
            .returning(|t, _| Ok(AttrValue::Bool(t.as_str().ends_with("Orig"))));

        let objects = vec![Locator::new("|body|bodyShape"), Locator::new("|body|bodyShapeOrig")];
        let results = IntermediateObjectsCheck::new()
            .check(&scene, &objects, &CheckConfig::new())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].components(), &[Locator::new("|body|bodyShapeOrig")]);
    }

    #[test]
    fn test_intermediate_fix_clears_parent_history_on_failure() {
        let node = Locator::new("|body|bodyShapeOrig");
        let mut seq = Sequence::new();
        let mut scene = MockSceneProvider::new();

        scene
            .expect_delete_node()
            .with(eq(node.clone()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|t| {
                Err(SceneError::HostOperationFailed {
                    target: t.clone(),
                    reason: "node has downstream history".into(),
                })
            });
        scene
            .expect_delete_construction_history()
            .with(eq(Locator::new("|body")))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        scene
            .expect_delete_node()
            .with(eq(node.clone()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let results = vec![CheckResult::new(node.clone(), vec![node])];
        IntermediateObjectsCheck::new().fix(&mut scene, &results).unwrap();
    }

    #[test]
    fn test_intermediate_fix_tolerates_missing_node() {
        let mut scene = MockSceneProvider::new();
        scene
            .expect_delete_node()
            .returning(|t| Err(SceneError::NotFound(t.clone())));

        let node = Locator::new("|body|bodyShapeOrig");
        let results = vec![CheckResult::new(node.clone(), vec![node])];
        IntermediateObjectsCheck::new().fix(&mut scene, &results).unwrap();
    }
}
