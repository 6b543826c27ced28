//! Data models shared by every layer of the checker.
//!
//! - [`Locator`]: stable path-style identity of a scene node, component or attribute
//! - [`CheckResult`]: one reported defect (target plus implicated components)
//! - [`CheckConfig`]: named numeric/boolean parameters consumed by individual checks
//! - [`Settings`]: the persisted user settings from `Sanity Settings.yaml`
//!
//! Models are plain values. Host scene state is never copied into them; a
//! locator is only a reference that the [`SceneProvider`](crate::scene::SceneProvider)
//! resolves on demand.

pub mod config;
pub mod locator;
pub mod result;

pub use config::{CheckConfig, ParamValue, Settings, SettingsFile, default_parameters};
pub use locator::{ComponentKind, Locator};
pub use result::CheckResult;
