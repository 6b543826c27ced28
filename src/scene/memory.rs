use crate::models::{CheckConfig, Locator};
use crate::scene::{
    AttrValue, INTERMEDIATE_ATTR, NodeKind, SMOOTH_PREVIEW_ATTR, SceneError, SceneProvider,
    TRANSFORM_CHANNELS,
};
use crate::uv::{UvAssignments, UvTable};
use anyhow::{Context, Result};
use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;

/// UV data of one mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UvData {
    pub table: UvTable,
    pub assignments: UvAssignments,
}

/// One DAG node of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub kind: NodeKind,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, AttrValue>,

    /// Components the host's defect query `code` reports for this node
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub defects: IndexMap<u32, Vec<Locator>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv: Option<UvData>,

    /// Upstream construction-history node names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Locator>,
}

impl SceneNode {
    fn of_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            attributes: IndexMap::new(),
            defects: IndexMap::new(),
            uv: None,
            history: Vec::new(),
        }
    }

    pub fn transform() -> Self {
        Self::of_kind(NodeKind::Transform)
    }

    pub fn mesh() -> Self {
        Self::of_kind(NodeKind::Mesh)
    }

    pub fn with_attribute(mut self, name: &str, value: AttrValue) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    pub fn with_defects(mut self, code: u32, components: Vec<Locator>) -> Self {
        self.defects.insert(code, components);
        self
    }

    pub fn with_uvs(mut self, table: UvTable, assignments: UvAssignments) -> Self {
        self.uv = Some(UvData { table, assignments });
        self
    }

    pub fn with_history(mut self, history: Vec<Locator>) -> Self {
        self.history = history;
        self
    }

    fn is_intermediate(&self) -> bool {
        self.attributes
            .get(INTERMEDIATE_ATTR)
            .and_then(AttrValue::as_bool)
            .unwrap_or(false)
    }

    /// Value the host reports for an attribute that was never set explicitly
    fn default_attribute(&self, name: &str) -> Option<AttrValue> {
        if name == INTERMEDIATE_ATTR {
            return Some(AttrValue::Bool(false));
        }

        match self.kind {
            NodeKind::Transform => {
                if let Some(channel) = name.strip_suffix(".lock") {
                    return TRANSFORM_CHANNELS
                        .iter()
                        .any(|(c, _)| *c == channel)
                        .then_some(AttrValue::Bool(false));
                }
                TRANSFORM_CHANNELS
                    .iter()
                    .find(|(c, _)| *c == name)
                    .map(|(_, identity)| AttrValue::Float(*identity))
            }
            NodeKind::Mesh if name == SMOOTH_PREVIEW_ATTR => Some(AttrValue::Int(0)),
            _ => None,
        }
    }
}

/// A file-backed scene snapshot implementing [`SceneProvider`].
///
/// Nodes are keyed by their full `|` path and kept in insertion order, which
/// is the traversal order reported by [`SceneProvider::list_descendants`].
/// Nodes listed in `failing` raise `HostOperationFailed` on every call, for
/// exercising the per-object failure paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryScene {
    #[serde(default)]
    pub nodes: IndexMap<Locator, SceneNode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selection: Vec<Locator>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failing: Vec<Locator>,
}

impl InMemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot from a YAML file
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene snapshot: {}", path))?;

        let scene: InMemoryScene = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse scene snapshot: {}", path))?;

        tracing::info!("Loaded scene snapshot {} ({} nodes)", path, scene.nodes.len());
        Ok(scene)
    }

    /// Write the snapshot to a YAML file
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let yaml = serde_yaml_ng::to_string(self).context("Failed to serialize scene snapshot")?;

        fs::write(path, yaml)
            .with_context(|| format!("Failed to write scene snapshot: {}", path))?;

        tracing::info!("Saved scene snapshot to {}", path);
        Ok(())
    }

    pub fn insert(&mut self, path: impl Into<Locator>, node: SceneNode) -> &mut Self {
        self.nodes.insert(path.into(), node);
        self
    }

    pub fn node(&self, path: &Locator) -> Option<&SceneNode> {
        self.nodes.get(path)
    }

    /// Make every call touching `path` fail
    pub fn fail_on(&mut self, path: impl Into<Locator>) -> &mut Self {
        self.failing.push(path.into());
        self
    }

    fn lookup(&self, target: &Locator) -> Result<&SceneNode, SceneError> {
        let node = target.node();
        if self.failing.contains(&node) {
            return Err(SceneError::HostOperationFailed {
                target: target.clone(),
                reason: "injected host failure".into(),
            });
        }
        self.nodes
            .get(&node)
            .ok_or_else(|| SceneError::NotFound(target.clone()))
    }

    fn lookup_mut(&mut self, target: &Locator) -> Result<&mut SceneNode, SceneError> {
        self.lookup(target)?;
        self.nodes
            .get_mut(&target.node())
            .ok_or_else(|| SceneError::NotFound(target.clone()))
    }

    fn lookup_mesh(&self, target: &Locator) -> Result<&SceneNode, SceneError> {
        let node = self.lookup(target)?;
        if node.kind != NodeKind::Mesh {
            return Err(SceneError::NotApplicable(target.clone()));
        }
        Ok(node)
    }
}

impl SceneProvider for InMemoryScene {
    fn list_descendants(&self, root: &Locator, kind: NodeKind) -> Result<Vec<Locator>, SceneError> {
        self.lookup(root)?;

        Ok(self
            .nodes
            .iter()
            .filter(|(path, node)| path.is_descendant_of(root) && node.kind.matches(kind))
            .map(|(path, _)| path.clone())
            .collect())
    }

    fn query_topology_defects(
        &self,
        target: &Locator,
        code: u32,
        _params: &CheckConfig,
    ) -> Result<Vec<Locator>, SceneError> {
        let node = self.lookup_mesh(target)?;
        Ok(node.defects.get(&code).cloned().unwrap_or_default())
    }

    /// Clears the recorded defects of `code`; any code is repairable here
    fn repair_topology_defects(&mut self, target: &Locator, code: u32) -> Result<(), SceneError> {
        self.lookup_mesh(target)?;
        let node = self.lookup_mut(target)?;
        node.defects.shift_remove(&code);
        Ok(())
    }

    fn get_uv_table(&self, target: &Locator) -> Result<(UvTable, UvAssignments), SceneError> {
        let node = self.lookup_mesh(target)?;
        let uv = node.uv.clone().unwrap_or_default();
        Ok((uv.table, uv.assignments))
    }

    fn set_uv_table(
        &mut self,
        target: &Locator,
        table: UvTable,
        assignments: UvAssignments,
    ) -> Result<(), SceneError> {
        self.lookup_mesh(target)?;

        // validate everything before touching the node so a rejected write leaves no trace
        let corners: u64 = assignments.counts.iter().map(|&c| u64::from(c)).sum();
        if corners != assignments.ids.len() as u64 {
            return Err(SceneError::HostOperationFailed {
                target: target.clone(),
                reason: format!(
                    "face counts cover {} corners but {} UV ids were given",
                    corners,
                    assignments.ids.len()
                ),
            });
        }
        if let Some(&bad) = assignments.ids.iter().find(|&&id| id as usize >= table.len()) {
            return Err(SceneError::HostOperationFailed {
                target: target.clone(),
                reason: format!("UV id {} is outside a table of {}", bad, table.len()),
            });
        }

        let node = self.lookup_mut(target)?;
        node.uv = Some(UvData { table, assignments });
        Ok(())
    }

    fn get_attribute(&self, target: &Locator, name: &str) -> Result<AttrValue, SceneError> {
        let node = self.lookup(target)?;
        node.attributes
            .get(name)
            .cloned()
            .or_else(|| node.default_attribute(name))
            .ok_or_else(|| SceneError::NotApplicable(target.attribute(name)))
    }

    fn set_attribute(&mut self, target: &Locator, name: &str, value: AttrValue) -> Result<(), SceneError> {
        let node = self.lookup_mut(target)?;
        node.attributes.insert(name.to_string(), value);
        Ok(())
    }

    fn select_active(&mut self, locators: &[Locator]) {
        self.selection = locators.to_vec();
    }

    fn get_active_selection(&self) -> Vec<Locator> {
        self.selection.clone()
    }

    fn list_history(&self, target: &Locator) -> Result<Vec<Locator>, SceneError> {
        Ok(self.lookup(target)?.history.clone())
    }

    /// Clears the history of `target` and everything below it. Intermediate
    /// shapes below `target` only exist to feed that history and go with it.
    fn delete_construction_history(&mut self, target: &Locator) -> Result<(), SceneError> {
        self.lookup(target)?;
        let root = target.node();

        self.nodes
            .retain(|path, node| !(path.is_descendant_of(&root) && node.is_intermediate()));
        for (path, node) in self.nodes.iter_mut() {
            if *path == root || path.is_descendant_of(&root) {
                node.history.clear();
            }
        }
        Ok(())
    }

    fn delete_node(&mut self, target: &Locator) -> Result<(), SceneError> {
        let node = self.lookup(target)?;
        let root = target.node();

        if node.is_intermediate() {
            let parent_has_history = root
                .parent()
                .and_then(|parent| self.nodes.get(&parent))
                .is_some_and(|parent| !parent.history.is_empty());
            if parent_has_history {
                return Err(SceneError::HostOperationFailed {
                    target: target.clone(),
                    reason: "parent still has construction history".into(),
                });
            }
        }

        self.nodes
            .retain(|path, _| *path != root && !path.is_descendant_of(&root));
        self.selection
            .retain(|path| path.node() != root && !path.is_descendant_of(&root));
        Ok(())
    }
}
