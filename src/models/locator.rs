use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Separator between DAG path segments (`|group|mesh`).
pub const PATH_SEPARATOR: char = '|';

static COMPONENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<node>[^.\[\]]+)\.(?P<kind>f|e|vtx|map)\[(?P<index>\d+)\]$")
        .expect("Invalid component locator regex")
});

/// Stable identifier of a scene entity or sub-component.
///
/// A locator is a reference into host-owned scene state, never a copy of the
/// data it names. Equality and ordering are purely by the path string, so
/// locators can be used as map keys and sorted deterministically.
///
/// Node locators are full DAG paths (`|root|body|bodyShape`). Component
/// locators append a typed index (`|root|body|bodyShape.f[12]`), and
/// attribute locators append a plug name (`|root|body.translateX`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

/// Kind of sub-component a component locator points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Face,
    Edge,
    Vertex,
    Uv,
}

impl ComponentKind {
    /// The host's suffix for this component type (`f`, `e`, `vtx`, `map`)
    pub fn suffix(self) -> &'static str {
        match self {
            ComponentKind::Face => "f",
            ComponentKind::Edge => "e",
            ComponentKind::Vertex => "vtx",
            ComponentKind::Uv => "map",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "f" => Some(ComponentKind::Face),
            "e" => Some(ComponentKind::Edge),
            "vtx" => Some(ComponentKind::Vertex),
            "map" => Some(ComponentKind::Uv),
            _ => None,
        }
    }
}

impl Locator {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, used for compact display (`|a|b|bShape` -> `bShape`)
    pub fn short_name(&self) -> &str {
        self.0
            .rsplit(PATH_SEPARATOR)
            .next()
            .unwrap_or(self.0.as_str())
    }

    /// The node this locator belongs to, with any component or attribute suffix removed
    pub fn node(&self) -> Locator {
        match self.0.split_once('.') {
            Some((node, _)) => Locator::new(node),
            None => self.clone(),
        }
    }

    /// Parent DAG node, or `None` for a top-level node
    pub fn parent(&self) -> Option<Locator> {
        let node = self.node();
        let (parent, _) = node.0.rsplit_once(PATH_SEPARATOR)?;
        if parent.is_empty() {
            None
        } else {
            Some(Locator::new(parent))
        }
    }

    /// Whether `self` lies strictly below `ancestor` in the DAG
    pub fn is_descendant_of(&self, ancestor: &Locator) -> bool {
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(ancestor.as_str())
            && self.0[ancestor.0.len()..].starts_with(PATH_SEPARATOR)
    }

    /// Build a component locator such as `mesh.f[3]`
    pub fn component(&self, kind: ComponentKind, index: u32) -> Locator {
        Locator(format!("{}.{}[{}]", self.node().0, kind.suffix(), index))
    }

    /// Build an attribute locator such as `node.translateX`
    pub fn attribute(&self, name: &str) -> Locator {
        Locator(format!("{}.{}", self.node().0, name))
    }

    /// Split a component locator into node, kind and index.
    ///
    /// Returns `None` for plain node or attribute locators.
    pub fn parse_component(&self) -> Option<(Locator, ComponentKind, u32)> {
        let captures = COMPONENT_PATTERN.captures(&self.0)?;
        let kind = ComponentKind::from_suffix(&captures["kind"])?;
        let index = captures["index"].parse().ok()?;
        Some((Locator::new(&captures["node"]), kind, index))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(path: &str) -> Self {
        Locator::new(path)
    }
}

impl From<String> for Locator {
    fn from(path: String) -> Self {
        Locator(path)
    }
}
