use crate::models::Locator;

/// One reported defect: the offending object plus the sub-components implicated.
///
/// Created only by a check's `check` pass and never mutated afterwards. The
/// clean flag is derived, so a result cannot disagree with its component list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    target: Locator,
    components: Vec<Locator>,
}

impl CheckResult {
    pub fn new(target: Locator, components: Vec<Locator>) -> Self {
        Self { target, components }
    }

    pub fn target(&self) -> &Locator {
        &self.target
    }

    pub fn components(&self) -> &[Locator] {
        &self.components
    }

    /// True iff no components were implicated
    pub fn is_clean(&self) -> bool {
        self.components.is_empty()
    }

    /// Display label for lists (short name plus component count)
    pub fn label(&self) -> String {
        match self.components.len() {
            0 => self.target.short_name().to_string(),
            1 => format!("{} (1 component)", self.target.short_name()),
            n => format!("{} ({} components)", self.target.short_name(), n),
        }
    }
}
