use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Upper face area below which a face counts as degenerate
pub const MAX_FACE_AREA: &str = "maxFaceArea";
/// Edge length below which an edge counts as degenerate
pub const MIN_EDGE_LENGTH: &str = "minEdgeLength";
/// UV face area below which a UV face counts as degenerate
pub const MIN_UV_AREA: &str = "minUvArea";
/// Distance from a UDIM border still treated as touching it
pub const MAX_UV_BORDER_DISTANCE: &str = "maxUvBorderDistance";

/// A single named check parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Number(_) => None,
        }
    }
}

/// Optional map of named numeric/boolean parameters read by individual checks.
///
/// Each check declares the keys it reads; unknown keys are ignored and missing
/// keys fall back to the check's default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckConfig {
    params: IndexMap<String, ParamValue>,
}

impl CheckConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
        self.params.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Settings file from `Sanity Settings.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(rename = "Sanity_Settings", default)]
    pub sanity_settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "Parameters", default = "default_parameters")]
    pub parameters: CheckConfig,

    #[serde(rename = "Disabled Checks", default)]
    pub disabled_checks: Vec<String>,

    #[serde(rename = "Max Fix Rounds", default = "default_max_fix_rounds")]
    pub max_fix_rounds: u32,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,

    #[serde(rename = "Log Directory", default = "default_log_directory")]
    pub log_directory: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            parameters: default_parameters(),
            disabled_checks: Vec::new(),
            max_fix_rounds: default_max_fix_rounds(),
            debug_mode: false,
            log_directory: default_log_directory(),
        }
    }
}

impl Settings {
    /// Check whether a unit has been switched off by name (case-insensitive)
    pub fn is_disabled(&self, check_name: &str) -> bool {
        self.disabled_checks
            .iter()
            .any(|name| name.eq_ignore_ascii_case(check_name))
    }
}

/// The parameters the host plugins fall back to when no flag is given
pub fn default_parameters() -> CheckConfig {
    CheckConfig::new()
        .with(MAX_FACE_AREA, ParamValue::Number(0.000001))
        .with(MIN_EDGE_LENGTH, ParamValue::Number(0.000001))
        .with(MIN_UV_AREA, ParamValue::Number(0.000001))
        .with(MAX_UV_BORDER_DISTANCE, ParamValue::Number(0.0))
}

fn default_max_fix_rounds() -> u32 {
    3
}

fn default_log_directory() -> String {
    "logs".to_string()
}
