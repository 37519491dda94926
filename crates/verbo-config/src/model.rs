//! Configuration schema for Verbo.

use serde::{Deserialize, Serialize};

/// Root config for the Verbo core.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VerboConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub verse: VerseConfig,
}

impl VerboConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> VerboConfigBuilder {
        VerboConfigBuilder::new()
    }
}

/// Builder for assembling a `VerboConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct VerboConfigBuilder {
    config: VerboConfig,
}

impl VerboConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: VerboConfig::default(),
        }
    }

    /// Replace the interface language.
    pub fn language(mut self, language: Language) -> Self {
        self.config.language = language;
        self
    }

    /// Replace the storage configuration.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Replace the reply model configuration.
    pub fn model(mut self, model: ModelConfig) -> Self {
        self.config.model = model;
        self
    }

    /// Replace the verse provider configuration.
    pub fn verse(mut self, verse: VerseConfig) -> Self {
        self.config.verse = verse;
        self
    }

    /// Finalize and return the built `VerboConfig`.
    pub fn build(self) -> VerboConfig {
        self.config
    }
}

/// Interface language for assistant-facing text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Brazilian Portuguese.
    #[default]
    Pt,
    /// English.
    En,
    /// Spanish.
    Es,
}

impl Language {
    /// Return the language as a lowercase tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::En => "en",
            Language::Es => "es",
        }
    }
}

/// Conversation persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Optional local storage root (absolute or cwd-relative).
    #[serde(default)]
    pub path: Option<String>,
    /// Optional remote store; absent means local-only persistence.
    #[serde(default)]
    pub remote: Option<RemoteStorageConfig>,
}

/// Remote persistence endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStorageConfig {
    pub base_url: String,
    /// Env var holding the bearer token, if the endpoint requires one.
    #[serde(default)]
    pub auth_token_env: Option<String>,
}

/// Reply model provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_provider")]
    pub provider: String,
    #[serde(default = "default_model_name")]
    pub name: String,
    /// Override for the chat completions endpoint base.
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_model_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_model_provider(),
            name: default_model_name(),
            api_base: None,
            api_key_env: default_model_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Default reply model provider identifier.
fn default_model_provider() -> String {
    "openai".to_string()
}

/// Default reply model name.
fn default_model_name() -> String {
    "gpt-3.5-turbo".to_string()
}

/// Default env var for the model API key.
fn default_model_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default sampling temperature for replies.
fn default_temperature() -> f32 {
    0.7
}

/// Default reply token budget.
fn default_max_tokens() -> u32 {
    500
}

/// Daily verse provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerseConfig {
    #[serde(default = "default_verse_api_base")]
    pub api_base: String,
    /// Env var holding the scripture API key; absent disables the provider.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub bibles: BibleVersions,
}

impl Default for VerseConfig {
    fn default() -> Self {
        Self {
            api_base: default_verse_api_base(),
            api_key_env: None,
            bibles: BibleVersions::default(),
        }
    }
}

/// Default scripture API endpoint.
fn default_verse_api_base() -> String {
    "https://api.scripture.api.bible/v1".to_string()
}

/// Bible version ids per language for the verse provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BibleVersions {
    #[serde(default = "default_bible_pt")]
    pub pt: String,
    #[serde(default = "default_bible_en")]
    pub en: String,
    #[serde(default = "default_bible_es")]
    pub es: String,
}

impl Default for BibleVersions {
    fn default() -> Self {
        Self {
            pt: default_bible_pt(),
            en: default_bible_en(),
            es: default_bible_es(),
        }
    }
}

/// Almeida Revista e Atualizada.
fn default_bible_pt() -> String {
    "b730fb6bd36cf26a-01".to_string()
}

/// King James Version.
fn default_bible_en() -> String {
    "de4e12af7f28f599-01".to_string()
}

/// Reina Valera 1909.
fn default_bible_es() -> String {
    "592420522e16049f-01".to_string()
}
