//! Layered configuration loader.
//!
//! Discovers configuration layers (user, cwd), validates them, merges them
//! by deep JSON override, and produces a final `VerboConfig`.

use crate::{ConfigError, VerboConfig};
use directories::BaseDirs;
use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "verbo.json5";
/// Default config directory under the user home.
const DEFAULT_CONFIG_DIR: &str = ".verbo";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: VerboConfig,
    /// Metadata for each layer considered during load.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User-specific configuration (`~/.verbo/verbo.json5`).
    User,
    /// Current working directory configuration.
    Cwd,
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer origin (user or cwd).
    pub source: ConfigLayerSource,
    /// Location on disk.
    pub path: PathBuf,
}

/// Options controlling layered config discovery.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to resolve the local layer.
    pub cwd: PathBuf,
    /// Optional user config path (defaults to `~/.verbo/verbo.json5`).
    pub user_config_path: Option<PathBuf>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: default_user_config_path(),
        }
    }
}

impl VerboConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value)
    }

    /// Load a layered config stack using the default layer locations.
    ///
    /// Layer precedence (low -> high): user, cwd.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let mut layers = Vec::new();
        let mut merged = Value::Object(serde_json::Map::new());

        let candidates = [
            (
                ConfigLayerSource::User,
                options.user_config_path.clone(),
            ),
            (
                ConfigLayerSource::Cwd,
                Some(options.cwd.join(DEFAULT_CONFIG_FILE)),
            ),
        ];

        for (source, path) in candidates {
            let Some(path) = path else { continue };
            if !path.exists() {
                debug!(
                    "skipping missing layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            let contents = fs::read_to_string(&path)?;
            let value: Value = json5::from_str(&contents)?;
            debug!("loaded layer (source={:?}, path={})", source, path.display());
            merge_json_values(&mut merged, &value);
            layers.push(ConfigLayer { source, path });
        }

        let config = config_from_value(merged)?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::Invalid(format!(
                "model.temperature out of range: {}",
                self.model.temperature
            )));
        }
        if self.model.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "model.max_tokens must be greater than zero".to_string(),
            ));
        }
        if let Some(remote) = &self.storage.remote
            && remote.base_url.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "storage.remote.base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve the local state root: explicit path, else `~/.verbo/state`,
/// else a cwd-relative fallback.
pub fn default_state_root(path: Option<&String>) -> PathBuf {
    if let Some(path) = path {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            debug!("using absolute storage root: {}", path.display());
            return path;
        }
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        debug!(
            "resolving storage root relative to cwd: {}",
            cwd.join(&path).display()
        );
        return cwd.join(path);
    }

    if let Some(home) = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()) {
        return home.join(DEFAULT_CONFIG_DIR).join("state");
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    cwd.join(DEFAULT_CONFIG_DIR).join("state")
}

/// Default user config path under the home directory.
fn default_user_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    })
}

fn config_from_value(value: Value) -> Result<VerboConfig, ConfigError> {
    let config: VerboConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}

/// Deep-merge `overlay` into `base`: objects merge key-wise, everything
/// else is replaced by the overlay value.
fn merge_json_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => merge_json_values(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::{LayeredConfigOptions, default_state_root, merge_json_values};
    use crate::{Language, VerboConfig};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_apply_on_empty_config() {
        let config = VerboConfig::load_from_str("{}").expect("config");
        assert_eq!(config.language, Language::Pt);
        assert_eq!(config.model.name, "gpt-3.5-turbo");
        assert_eq!(config.model.max_tokens, 500);
        assert_eq!(config.storage.remote.is_none(), true);
    }

    #[test]
    fn json5_comments_and_partial_fields_parse() {
        let config = VerboConfig::load_from_str(
            r#"{
                // interface language
                language: "en",
                model: { name: "gpt-4o-mini" },
            }"#,
        )
        .expect("config");
        assert_eq!(config.language, Language::En);
        assert_eq!(config.model.name, "gpt-4o-mini");
        // untouched defaults survive a partial model override
        assert_eq!(config.model.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let err = VerboConfig::load_from_str(r#"{ model: { temperature: 9.0 } }"#)
            .expect_err("temperature");
        assert_eq!(err.to_string().contains("temperature"), true);

        let err = VerboConfig::load_from_str(r#"{ model: { max_tokens: 0 } }"#)
            .expect_err("max_tokens");
        assert_eq!(err.to_string().contains("max_tokens"), true);

        let err = VerboConfig::load_from_str(r#"{ storage: { remote: { base_url: " " } } }"#)
            .expect_err("base_url");
        assert_eq!(err.to_string().contains("base_url"), true);
    }

    #[test]
    fn cwd_layer_overrides_user_layer() {
        let temp = tempdir().expect("tempdir");
        let user_path = temp.path().join("user.json5");
        fs::write(&user_path, r#"{ language: "en", model: { name: "user-model" } }"#)
            .expect("write user");
        let cwd = temp.path().join("project");
        fs::create_dir_all(&cwd).expect("cwd");
        fs::write(cwd.join("verbo.json5"), r#"{ model: { name: "cwd-model" } }"#)
            .expect("write cwd");

        let mut options = LayeredConfigOptions::new(&cwd);
        options.user_config_path = Some(user_path);
        let layered = VerboConfig::load_layered_with_options(options).expect("layered");

        assert_eq!(layered.layers.len(), 2);
        assert_eq!(layered.config.language, Language::En);
        assert_eq!(layered.config.model.name, "cwd-model");
    }

    #[test]
    fn merge_replaces_scalars_and_merges_objects() {
        let mut base = json!({"a": {"x": 1, "y": 2}, "b": "keep"});
        let overlay = json!({"a": {"y": 3}, "c": true});
        merge_json_values(&mut base, &overlay);
        assert_eq!(base, json!({"a": {"x": 1, "y": 3}, "b": "keep", "c": true}));
    }

    #[test]
    fn state_root_prefers_explicit_absolute_path() {
        let temp = tempdir().expect("tempdir");
        let absolute = temp.path().join("state");
        let absolute_str = absolute.to_string_lossy().to_string();
        assert_eq!(default_state_root(Some(&absolute_str)), absolute);
    }
}
