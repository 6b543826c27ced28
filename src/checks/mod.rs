//! Check units - named, categorized defect checks with optional fixes.
//!
//! Every check implements [`CheckUnit`]: static metadata in a
//! [`CheckDescriptor`], a `check` pass that turns target objects into
//! [`CheckResult`]s, and an optional `fix` pass that repairs those results
//! through the [`SceneProvider`].
//!
//! # Components
//!
//! - [`TopologyCheck`]: one data-driven unit per host defect query code
//!   (triangles, N-gons, non-manifold edges, UDIM borders, ...)
//! - [`UnassignedUvsCheck`]: ghost UV detection, fixed by UV compaction
//! - [`LockedChannelsCheck`] / [`TransformIdentityCheck`]: transform attributes
//! - [`SmoothPreviewCheck`]: smooth mesh preview display flag
//! - [`ConstructionHistoryCheck`] / [`IntermediateObjectsCheck`]: history graph
//! - [`CheckRegistry`]: ordered collection of units, sorted by category
//!
//! # Failure semantics
//!
//! A host failure on one object never aborts a batch: `NotApplicable` objects
//! are skipped silently and host errors are logged and skipped. Only
//! structural problems (a required parameter missing or mistyped) abort the
//! `check` call of that one unit.
//!
//! Checks hold no per-run state. The result set that bridges `check` and `fix`
//! is owned by the runner and handed to `fix` explicitly.

pub mod display;
pub mod history;
pub mod registry;
pub mod topology;
pub mod transform;
pub mod uv;

use crate::models::{CheckConfig, CheckResult, Locator, ParamValue};
use crate::scene::{SceneError, SceneProvider};
use crate::uv::CompactionError;
use serde::Serialize;
use thiserror::Error;

pub use display::SmoothPreviewCheck;
pub use history::{ConstructionHistoryCheck, IntermediateObjectsCheck};
pub use registry::{CheckRegistry, RegistryError};
pub use topology::{TopologyCheck, codes};
pub use transform::{LockedChannelsCheck, TransformIdentityCheck};
pub use uv::UnassignedUvsCheck;

/// Errors that abort a check or fix pass for a single unit
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckError {
    #[error("Check '{unit}' requires parameter '{key}'")]
    ConfigurationMissing { unit: String, key: String },

    #[error("Parameter '{key}' of check '{unit}' must be {expected}")]
    ConfigurationInvalid {
        unit: String,
        key: String,
        expected: &'static str,
    },

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("UV compaction failed: {0}")]
    Compaction(#[from] CompactionError),
}

/// Static metadata of a check unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckDescriptor {
    /// Unique within a registry
    pub name: String,
    /// Grouping key, also the display/execution sort key
    pub category: String,
    /// A non-empty result is advisory rather than an error
    pub is_warning: bool,
    pub is_enabled: bool,
    pub is_fixable: bool,
}

impl CheckDescriptor {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            is_warning: false,
            is_enabled: true,
            is_fixable: false,
        }
    }

    pub fn warning(mut self) -> Self {
        self.is_warning = true;
        self
    }

    pub fn fixable(mut self) -> Self {
        self.is_fixable = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }
}

/// A parameter a check reads from [`CheckConfig`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub key: &'static str,
    /// `None` makes the parameter required
    pub default: Option<f64>,
}

impl ParamSpec {
    pub const fn optional(key: &'static str, default: f64) -> Self {
        Self {
            key,
            default: Some(default),
        }
    }

    pub const fn required(key: &'static str) -> Self {
        Self { key, default: None }
    }
}

/// Pick the declared parameters out of `config`, filling in defaults.
///
/// Undeclared keys are dropped. A declared key holding a non-number is
/// `ConfigurationInvalid`; a required key that is absent is
/// `ConfigurationMissing`.
pub fn resolve_params(
    unit: &str,
    specs: &[ParamSpec],
    config: &CheckConfig,
) -> Result<CheckConfig, CheckError> {
    let mut resolved = CheckConfig::new();

    for spec in specs {
        let value = match config.get(spec.key) {
            Some(value) => value.as_number().ok_or_else(|| CheckError::ConfigurationInvalid {
                unit: unit.to_string(),
                key: spec.key.to_string(),
                expected: "a number",
            })?,
            None => spec.default.ok_or_else(|| CheckError::ConfigurationMissing {
                unit: unit.to_string(),
                key: spec.key.to_string(),
            })?,
        };
        resolved.insert(spec.key, ParamValue::Number(value));
    }

    Ok(resolved)
}

/// One named, categorized check with an optional fix
pub trait CheckUnit: Send + Sync {
    fn descriptor(&self) -> &CheckDescriptor;

    /// Inspect `objects` and return one result per defective object.
    ///
    /// Always recomputes from the current scene state. An empty object list
    /// yields an empty result.
    fn check(
        &self,
        scene: &dyn SceneProvider,
        objects: &[Locator],
        config: &CheckConfig,
    ) -> Result<Vec<CheckResult>, CheckError>;

    /// Repair the defects in `results` (the most recent `check` output).
    ///
    /// Must be a no-op for units that are not fixable. [`CheckRunner`] only
    /// hands over the unit's own stored results and skips non-fixable units;
    /// callers driving a unit directly own both of those preconditions.
    ///
    /// [`CheckRunner`]: crate::runner::CheckRunner
    fn fix(&self, _scene: &mut dyn SceneProvider, _results: &[CheckResult]) -> Result<(), CheckError> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}

/// Run `inspect` on every object, skipping objects the host cannot handle.
///
/// `inspect` returns the implicated components; objects with none produce no
/// result.
pub(crate) fn inspect_each<F>(unit: &str, objects: &[Locator], mut inspect: F) -> Vec<CheckResult>
where
    F: FnMut(&Locator) -> Result<Vec<Locator>, SceneError>,
{
    let mut results = Vec::new();

    for object in objects {
        match inspect(object) {
            Ok(components) if components.is_empty() => {}
            Ok(components) => results.push(CheckResult::new(object.clone(), components)),
            Err(SceneError::NotApplicable(_)) | Err(SceneError::NotFound(_)) => {
                tracing::debug!("{}: skipping {} (not applicable)", unit, object);
            }
            Err(e) => {
                tracing::warn!("{}: skipping {} after host failure: {}", unit, object, e);
            }
        }
    }

    results
}

/// Apply `repair` to every result target, continuing past failures.
///
/// Returns the first error encountered once all targets have been attempted.
pub(crate) fn fix_each<F>(unit: &str, results: &[CheckResult], mut repair: F) -> Result<(), CheckError>
where
    F: FnMut(&CheckResult) -> Result<(), CheckError>,
{
    let mut first_error = None;

    for result in results.iter().filter(|r| !r.is_clean()) {
        if let Err(e) = repair(result) {
            tracing::warn!("{}: fix failed on {}: {}", unit, result.target(), e);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
