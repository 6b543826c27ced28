use crate::checks::{
    CheckDescriptor, CheckUnit, ConstructionHistoryCheck, IntermediateObjectsCheck,
    LockedChannelsCheck, SmoothPreviewCheck, TopologyCheck, TransformIdentityCheck,
    UnassignedUvsCheck,
};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("A check named '{0}' is already registered")]
    DuplicateName(String),
}

struct Entry {
    /// Insertion index, the tie-breaker within a category
    order: usize,
    unit: Box<dyn CheckUnit>,
}

/// Ordering used for display and execution: category, then insertion order
fn registry_order(a: &Entry, b: &Entry) -> Ordering {
    a.unit
        .descriptor()
        .category
        .cmp(&b.unit.descriptor().category)
        .then(a.order.cmp(&b.order))
}

/// Ordered collection of check units.
///
/// Units are kept sorted by category (lexicographic) and, within a category,
/// by the order they were registered in. Names are unique.
#[derive(Default)]
pub struct CheckRegistry {
    entries: Vec<Entry>,
    next_order: usize,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in check
    pub fn with_default_checks() -> Self {
        let mut units: Vec<Box<dyn CheckUnit>> = TopologyCheck::defaults()
            .into_iter()
            .map(|check| Box::new(check) as Box<dyn CheckUnit>)
            .collect();
        units.push(Box::new(UnassignedUvsCheck::new()));
        units.push(Box::new(LockedChannelsCheck::new()));
        units.push(Box::new(TransformIdentityCheck::new()));
        units.push(Box::new(SmoothPreviewCheck::new()));
        units.push(Box::new(ConstructionHistoryCheck::new()));
        units.push(Box::new(IntermediateObjectsCheck::new()));

        let mut registry = Self::new();
        for unit in units {
            // built-in names are unique
            if let Err(e) = registry.register(unit) {
                tracing::error!("Skipping built-in check: {}", e);
            }
        }
        registry
    }

    /// Add a unit, keeping the registry sorted
    pub fn register(&mut self, unit: Box<dyn CheckUnit>) -> Result<(), RegistryError> {
        if self.get(unit.name()).is_some() {
            return Err(RegistryError::DuplicateName(unit.name().to_string()));
        }

        tracing::debug!(
            "Registered check '{}' ({})",
            unit.name(),
            unit.descriptor().category
        );
        self.entries.push(Entry {
            order: self.next_order,
            unit,
        });
        self.next_order += 1;
        // stable, and the insertion index breaks ties anyway
        self.entries.sort_by(registry_order);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn CheckUnit> {
        self.entries
            .iter()
            .find(|entry| entry.unit.name() == name)
            .map(|entry| entry.unit.as_ref())
    }

    /// Units in registry order
    pub fn iter(&self) -> impl Iterator<Item = &dyn CheckUnit> {
        self.entries.iter().map(|entry| entry.unit.as_ref())
    }

    /// Descriptors in registry order, for front ends
    pub fn descriptors(&self) -> Vec<CheckDescriptor> {
        self.iter().map(|unit| unit.descriptor().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the registry, yielding the units in registry order
    pub fn into_units(self) -> Vec<Box<dyn CheckUnit>> {
        self.entries.into_iter().map(|entry| entry.unit).collect()
    }
}

impl std::fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|unit| unit.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckError;
    use crate::models::{CheckConfig, CheckResult, Locator};
    use crate::scene::SceneProvider;

    struct Named(CheckDescriptor);

    impl CheckUnit for Named {
        fn descriptor(&self) -> &CheckDescriptor {
            &self.0
        }

        fn check(
            &self,
            _scene: &dyn SceneProvider,
            _objects: &[Locator],
            _config: &CheckConfig,
        ) -> Result<Vec<CheckResult>, CheckError> {
            Ok(Vec::new())
        }
    }

    fn named(name: &str, category: &str) -> Box<dyn CheckUnit> {
        Box::new(Named(CheckDescriptor::new(name, category)))
    }

    #[test]
    fn test_sorted_by_category_then_insertion() {
        let mut registry = CheckRegistry::new();
        registry.register(named("b1", "b")).unwrap();
        registry.register(named("a1", "a")).unwrap();
        registry.register(named("b2", "b")).unwrap();
        registry.register(named("a2", "a")).unwrap();
        registry.register(named("c1", "c")).unwrap();

        let names: Vec<_> = registry.iter().map(|u| u.name().to_string()).collect();
        assert_eq!(names, vec!["a1", "a2", "b1", "b2", "c1"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = CheckRegistry::new();
        registry.register(named("Triangles", "Mesh")).unwrap();
        let err = registry.register(named("Triangles", "UV")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("Triangles".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_default_checks() {
        let registry = CheckRegistry::with_default_checks();
        assert_eq!(registry.len(), TopologyCheck::defaults().len() + 6);

        let categories: Vec<_> = registry
            .descriptors()
            .into_iter()
            .map(|d| d.category)
            .collect();
        let mut sorted = categories.clone();
        sorted.sort();
        assert_eq!(categories, sorted);

        assert!(registry.get("Unassigned UVs").unwrap().descriptor().is_fixable);
        assert!(registry.get("Triangles").unwrap().descriptor().is_warning);
        assert!(registry.get("Nonexistent").is_none());
    }

    #[test]
    fn test_insertion_order_kept_within_category() {
        let registry = CheckRegistry::with_default_checks();
        let mesh: Vec<_> = registry
            .iter()
            .filter(|u| u.descriptor().category == "Mesh")
            .map(|u| u.name().to_string())
            .collect();
        assert_eq!(mesh.first().map(String::as_str), Some("Triangles"));
        assert_eq!(mesh.last().map(String::as_str), Some("Unfrozen Vertices"));
    }
}
