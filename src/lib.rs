// modelsanity - mesh and UV sanity checks with convergent fixes
//
// This is the library crate containing the check framework, the runner and
// the UV compaction algorithm. The binary crate (main.rs) provides the batch
// command-line front end.

pub mod checks;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod runner;
pub mod scene;
pub mod uv;

// Re-export commonly used types for convenience
pub use crate::checks::{CheckDescriptor, CheckError, CheckRegistry, CheckUnit};
pub use crate::config::ConfigManager;
pub use crate::models::{CheckConfig, CheckResult, Locator, Settings};
pub use crate::runner::{CheckRunner, CheckStatus, RunSummary, RunnerError, RunnerEvent};
pub use crate::scene::{InMemoryScene, SceneError, SceneProvider};
pub use crate::uv::{UvIndexCompactor, compact};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
