use crate::models::{Settings, SettingsFile};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Settings file name inside the configuration directory
pub const SETTINGS_FILE: &str = "Sanity Settings.yaml";

/// Prefix of environment variables overriding file settings
/// (`MODELSANITY_DEBUG_MODE`, `MODELSANITY_MAX_FIX_ROUNDS`, ...)
pub const ENV_PREFIX: &str = "MODELSANITY";

/// Configuration manager for loading and saving the YAML settings file.
///
/// Manages `Sanity Settings.yaml` in the configuration directory: check
/// parameters, disabled checks, fix round limit, and logging options.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing configuration files (e.g., "Sanity Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        })
    }

    /// Load the settings file.
    ///
    /// # Returns
    /// The loaded Settings, or defaults if the file doesn't exist
    pub fn load_settings(&self) -> Result<Settings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
            return Ok(Settings::default());
        }

        let file_contents = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let file: SettingsFile = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(file.sanity_settings)
    }

    /// Save the settings file.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let file = SettingsFile {
            sanity_settings: settings.clone(),
        };
        let yaml_string =
            serde_yaml_ng::to_string(&file).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Load the settings file, then apply `MODELSANITY_*` environment overrides
    pub fn load_layered_settings(&self) -> Result<Settings> {
        let settings = self.load_settings()?;
        apply_env_overrides(settings, ::config::Environment::with_prefix(ENV_PREFIX))
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

/// Overlay the scalar settings found in `env` onto `settings`.
///
/// `DISABLED_CHECKS` is a comma-separated list replacing the file's list.
pub fn apply_env_overrides(mut settings: Settings, env: ::config::Environment) -> Result<Settings> {
    let layered = ::config::Config::builder()
        .add_source(env)
        .build()
        .context("Failed to read environment overrides")?;

    if let Ok(debug_mode) = layered.get_bool("debug_mode") {
        settings.debug_mode = debug_mode;
    }

    if let Ok(rounds) = layered.get_int("max_fix_rounds") {
        settings.max_fix_rounds = u32::try_from(rounds)
            .with_context(|| format!("Invalid {}_MAX_FIX_ROUNDS: {}", ENV_PREFIX, rounds))?;
    }

    if let Ok(log_directory) = layered.get_string("log_directory") {
        settings.log_directory = log_directory;
    }

    if let Ok(disabled) = layered.get_string("disabled_checks") {
        settings.disabled_checks = disabled
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();
    }

    Ok(settings)
}
