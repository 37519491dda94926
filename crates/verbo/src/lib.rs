//! Public SDK surface for Verbo.
//!
//! This crate re-exports the core building blocks and provides small
//! helpers to keep consumer setup consistent.

use std::sync::Arc;

/// Re-export for convenience.
pub use verbo_config as config;
pub use verbo_core as core;

pub use verbo_config::{Language, VerboConfig};
pub use verbo_core::{Identity, SyncCoordinator};

use verbo_core::state::StateError;
use verbo_core::{
    DailyVerseService, HttpStateStore, HttpVerseProvider, JsonStateStore, OpenAiReplyProvider,
    PersistenceAdapter, StateStore, VerseProvider,
};

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Binaries are still expected
/// to call this early in startup to ensure log output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}

/// Wire up a guest sync coordinator from config: local JSON storage under
/// the configured root, a remote store when one is configured, and the
/// OpenAI reply provider. The returned coordinator still needs
/// [`SyncCoordinator::initialize`] before use.
pub fn session_from_config(config: &VerboConfig) -> Result<SyncCoordinator, StateError> {
    let root = verbo_config::default_state_root(config.storage.path.as_ref());
    let local: Arc<dyn StateStore> = Arc::new(JsonStateStore::new(root)?);
    let remote: Option<Arc<dyn StateStore>> = config
        .storage
        .remote
        .as_ref()
        .map(|remote| Arc::new(HttpStateStore::from_config(remote)) as Arc<dyn StateStore>);
    let adapter = Arc::new(PersistenceAdapter::new(local, remote));
    let coordinator = SyncCoordinator::new(config.language, adapter)
        .with_reply_provider(Arc::new(OpenAiReplyProvider::new(config.model.clone())));
    Ok(coordinator)
}

/// Build the daily verse service from config. Without a configured API key
/// env var the service serves the static fallback table only.
pub fn verse_service_from_config(config: &VerboConfig) -> DailyVerseService {
    let provider: Option<Arc<dyn VerseProvider>> = config
        .verse
        .api_key_env
        .as_ref()
        .map(|_| Arc::new(HttpVerseProvider::new(config.verse.clone())) as Arc<dyn VerseProvider>);
    DailyVerseService::new(provider)
}
