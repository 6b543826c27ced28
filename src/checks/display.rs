use crate::checks::{CheckDescriptor, CheckError, CheckUnit, fix_each, inspect_each};
use crate::models::{CheckConfig, CheckResult, Locator};
use crate::scene::{AttrValue, SceneProvider};

pub use crate::scene::SMOOTH_PREVIEW_ATTR;

/// Meshes left in smooth mesh preview mode
#[derive(Debug, Clone)]
pub struct SmoothPreviewCheck {
    descriptor: CheckDescriptor,
}

impl SmoothPreviewCheck {
    pub fn new() -> Self {
        Self {
            descriptor: CheckDescriptor::new("Smooth Mesh Preview", "Display")
                .warning()
                .fixable(),
        }
    }
}

impl Default for SmoothPreviewCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckUnit for SmoothPreviewCheck {
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
            let level = scene.get_attribute(object, SMOOTH_PREVIEW_ATTR)?;
            let enabled = level.as_f64().map(|l| l != 0.0).or(level.as_bool()).unwrap_or(false);
            Ok(if enabled {
                vec![object.attribute(SMOOTH_PREVIEW_ATTR)]
            } else {
                Vec::new()
            })
        }))
    }

    fn fix(&self, scene: &mut dyn SceneProvider, results: &[CheckResult]) -> Result<(), CheckError> {
        fix_each(&self.descriptor.name, results, |result| {
            scene.set_attribute(result.target(), SMOOTH_PREVIEW_ATTR, AttrValue::Int(0))?;
            Ok(())
        })
    }
}
