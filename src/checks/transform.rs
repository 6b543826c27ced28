use crate::checks::{CheckDescriptor, CheckError, CheckUnit, fix_each, inspect_each};
use crate::models::{CheckConfig, CheckResult, Locator};
use crate::scene::{AttrValue, SceneError, SceneProvider, lock_flag};

pub use crate::scene::TRANSFORM_CHANNELS;

const IDENTITY_TOLERANCE: f64 = 1e-6;

/// Split an attribute locator (`|node.translateX`) into its node and attribute name
fn split_attribute(locator: &Locator) -> Option<(Locator, &str)> {
    let (_, name) = locator.as_str().split_once('.')?;
    Some((locator.node(), name))
}

/// Reports transform channels whose lock flag is set.
///
/// Fixing unlocks every reported channel, which converges in one round.
#[derive(Debug, Clone)]
pub struct LockedChannelsCheck {
    descriptor: CheckDescriptor,
}

impl LockedChannelsCheck {
    pub fn new() -> Self {
        Self {
            descriptor: CheckDescriptor::new("Locked Channels", "Transform").fixable(),
        }
    }
}

impl Default for LockedChannelsCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckUnit for LockedChannelsCheck {
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
            let mut locked = Vec::new();
            for (channel, _) in TRANSFORM_CHANNELS {
                let flag = scene.get_attribute(object, &lock_flag(channel))?;
                if flag.as_bool().unwrap_or(false) {
                    locked.push(object.attribute(channel));
                }
            }
            Ok(locked)
        }))
    }

    fn fix(&self, scene: &mut dyn SceneProvider, results: &[CheckResult]) -> Result<(), CheckError> {
        fix_each(&self.descriptor.name, results, |result| {
            for component in result.components() {
                let (node, channel) = split_attribute(component).ok_or_else(|| {
                    SceneError::NotApplicable(component.clone())
                })?;
                scene.set_attribute(&node, &lock_flag(channel), AttrValue::Bool(false))?;
                tracing::debug!("Unlocked {}", component);
            }
            Ok(())
        })
    }
}

/// Flags transforms whose translate/rotate/scale are not at identity.
///
/// Advisory only: freezing transforms is a host operation this tool does not
/// perform.
#[derive(Debug, Clone)]
pub struct TransformIdentityCheck {
    descriptor: CheckDescriptor,
}

impl TransformIdentityCheck {
    pub fn new() -> Self {
        Self {
            descriptor: CheckDescriptor::new("Unfrozen Transforms", "Transform").warning(),
        }
    }
}

impl Default for TransformIdentityCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckUnit for TransformIdentityCheck {
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
            let mut off_identity = Vec::new();
            for (channel, identity) in TRANSFORM_CHANNELS {
                let value = scene.get_attribute(object, channel)?;
                let value = value.as_f64().ok_or_else(|| SceneError::HostOperationFailed {
                    target: object.attribute(channel),
                    reason: format!("expected a numeric value, got {:?}", value),
                })?;
                if (value - identity).abs() > IDENTITY_TOLERANCE {
                    off_identity.push(object.attribute(channel));
                }
            }
            Ok(off_identity)
        }))
    }
}
