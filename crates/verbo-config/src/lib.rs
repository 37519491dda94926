//! Configuration models and layered config loading.
//!
//! This crate owns the Verbo config schema, validation, and layer-merging
//! logic used by the conversation core and any embedding UI.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types, loader options, and storage root resolution.
pub use loader::{
    ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions, default_state_root,
};
/// Configuration schema models.
pub use model::*;
