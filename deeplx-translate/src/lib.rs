//! DeepLX translation provider.
//!
//! This crate provides:
//! - `Translate` - capability interface a host uses to drive any provider
//! - `DeepLxTranslate` - provider backed by a self-hosted DeepLX endpoint
//! - `Configuration` - namespaced configuration access with change
//!   notifications, and `WorkspaceConfiguration`, a TOML-backed store
//! - `convert_lang` - language code canonicalization used for links

mod config;
mod deeplx;
mod error;
mod lang;
mod options;
mod translate;

pub use config::ChangeListener;
pub use config::ConfigError;
pub use config::Configuration;
pub use config::ConfigurationChangeEvent;
pub use config::Subscription;
pub use config::WorkspaceConfiguration;
pub use config::default_config_path;
pub use config::set_value;
pub use deeplx::API_URL_KEY;
pub use deeplx::CONFIG_SECTION;
pub use deeplx::DeepLxRequest;
pub use deeplx::DeepLxResponse;
pub use deeplx::DeepLxTranslate;
pub use deeplx::MAX_LEN;
pub use error::TranslationError;
pub use lang::convert_lang;
pub use options::DeepLxOptions;
pub use translate::Translate;
pub use translate::TranslateOptions;
