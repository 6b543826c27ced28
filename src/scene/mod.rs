//! Scene provider - the capability interface onto the host application.
//!
//! Every check and the runner talk to the host exclusively through
//! [`SceneProvider`]. Nothing in this crate imports a global host API, so any
//! host (a DCC plugin bridge, a file-backed snapshot, a test double) can drive
//! the same checks.
//!
//! # Contract
//!
//! - Queries take `&self`, mutations take `&mut self`. The caller owns
//!   exclusive, serialized access to the host for the duration of each call.
//! - [`SceneError::NotApplicable`] means "this object does not support the
//!   query" (e.g. a transform with no mesh). Checks skip such objects silently.
//! - [`SceneProvider::set_uv_table`] must be atomic: clear, set coordinates and
//!   set assignments as one logical unit with no observable partial state.
//! - Lock state of an attribute is exposed as the pseudo-attribute
//!   `<attr>.lock` (see [`lock_flag`]).
//!
//! [`InMemoryScene`] is a serde-loadable snapshot implementing the contract,
//! used by the batch front end and the integration tests.

pub mod memory;

use crate::models::{CheckConfig, Locator};
use crate::uv::{UvAssignments, UvTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::{InMemoryScene, SceneNode, UvData};

/// Errors raised by a scene provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("{0} does not support this query")]
    NotApplicable(Locator),

    #[error("{0} does not exist in the scene")]
    NotFound(Locator),

    #[error("Host operation failed on {target}: {reason}")]
    HostOperationFailed { target: Locator, reason: String },
}

/// Kind filter for [`SceneProvider::list_descendants`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Any DAG node (transforms and shapes)
    Dag,
    Transform,
    Mesh,
}

impl NodeKind {
    /// Whether a node of kind `self` passes the filter `filter`
    pub fn matches(self, filter: NodeKind) -> bool {
        filter == NodeKind::Dag || self == filter
    }
}

/// A generic attribute value as read from or written to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(i) => Some(*i as f64),
            AttrValue::Float(f) => Some(*f),
            AttrValue::Bool(_) | AttrValue::Text(_) => None,
        }
    }

    /// Truthiness the way the host treats numeric flags
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            AttrValue::Int(i) => Some(*i != 0),
            AttrValue::Float(_) | AttrValue::Text(_) => None,
        }
    }
}

/// Name of the pseudo-attribute carrying the lock state of `attribute`
pub fn lock_flag(attribute: &str) -> String {
    format!("{}.lock", attribute)
}

/// Transform channels with their identity values
pub const TRANSFORM_CHANNELS: [(&str, f64); 9] = [
    ("translateX", 0.0),
    ("translateY", 0.0),
    ("translateZ", 0.0),
    ("rotateX", 0.0),
    ("rotateY", 0.0),
    ("rotateZ", 0.0),
    ("scaleX", 1.0),
    ("scaleY", 1.0),
    ("scaleZ", 1.0),
];

/// Host attribute holding the smooth mesh preview level (0 = off)
pub const SMOOTH_PREVIEW_ATTR: &str = "displaySmoothMesh";

/// Host attribute marking hidden construction-history shapes
pub const INTERMEDIATE_ATTR: &str = "intermediateObject";

/// Host capability interface consumed by checks and the runner
#[cfg_attr(test, mockall::automock)]
pub trait SceneProvider {
    /// All descendants of `root` matching `kind`, in a deterministic host order.
    /// `root` itself is not included.
    fn list_descendants(&self, root: &Locator, kind: NodeKind) -> Result<Vec<Locator>, SceneError>;

    /// Run the host's native defect query `code` on `target`, returning the
    /// implicated components (empty when clean)
    fn query_topology_defects(
        &self,
        target: &Locator,
        code: u32,
        params: &CheckConfig,
    ) -> Result<Vec<Locator>, SceneError>;

    /// Run defect query `code` on `target` in the host's repair mode.
    ///
    /// Only meaningful for queries the host can repair (unfrozen vertices);
    /// other codes are `NotApplicable`.
    fn repair_topology_defects(&mut self, target: &Locator, code: u32) -> Result<(), SceneError>;

    fn get_uv_table(&self, target: &Locator) -> Result<(UvTable, UvAssignments), SceneError>;

    /// Replace the whole UV table and its assignments atomically
    fn set_uv_table(
        &mut self,
        target: &Locator,
        table: UvTable,
        assignments: UvAssignments,
    ) -> Result<(), SceneError>;

    fn get_attribute(&self, target: &Locator, name: &str) -> Result<AttrValue, SceneError>;

    fn set_attribute(&mut self, target: &Locator, name: &str, value: AttrValue) -> Result<(), SceneError>;

    fn select_active(&mut self, locators: &[Locator]);

    fn get_active_selection(&self) -> Vec<Locator>;

    /// Upstream construction-history nodes feeding `target` (empty when none)
    fn list_history(&self, target: &Locator) -> Result<Vec<Locator>, SceneError>;

    fn delete_construction_history(&mut self, target: &Locator) -> Result<(), SceneError>;

    fn delete_node(&mut self, target: &Locator) -> Result<(), SceneError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_filter() {
        assert!(NodeKind::Mesh.matches(NodeKind::Dag));
        assert!(NodeKind::Mesh.matches(NodeKind::Mesh));
        assert!(!NodeKind::Transform.matches(NodeKind::Mesh));
    }

    #[test]
    fn test_attr_value_conversions() {
        assert_eq!(AttrValue::Int(2).as_f64(), Some(2.0));
        assert_eq!(AttrValue::Int(0).as_bool(), Some(false));
        assert_eq!(AttrValue::Float(1.5).as_bool(), None);
        assert_eq!(AttrValue::Text("x".into()).as_f64(), None);
    }

    #[test]
    fn test_attr_value_yaml() {
        let values: Vec<AttrValue> = serde_yaml_ng::from_str("[true, 3, 0.25, layer1]").unwrap();
        assert_eq!(
            values,
            vec![
                AttrValue::Bool(true),
                AttrValue::Int(3),
                AttrValue::Float(0.25),
                AttrValue::Text("layer1".into()),
            ]
        );
    }

    #[test]
    fn test_lock_flag_name() {
        assert_eq!(lock_flag("translateX"), "translateX.lock");
    }
}
