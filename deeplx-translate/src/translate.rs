//! Capability interface between a host and a translation provider.

use async_trait::async_trait;

use crate::error::TranslationError;

/// Per-call language hints supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Source language code, if the host knows it.
    pub from: Option<String>,
    /// Target language code. Links fall back to `auto` when unset.
    pub to: Option<String>,
}

impl TranslateOptions {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            to: Some(to.into()),
        }
    }

    /// Options carrying only a target language.
    pub fn to(to: impl Into<String>) -> Self {
        Self {
            from: None,
            to: Some(to.into()),
        }
    }
}

/// A translation provider as seen by the host.
///
/// Hosts hold `Arc<dyn Translate>` and never the concrete provider type.
#[async_trait]
pub trait Translate: Send + Sync {
    /// Maximum content length the provider accepts per call. Hosts are
    /// expected to chunk longer text before calling `translate`.
    fn max_len(&self) -> usize;

    /// Translate `content`, resolving to the translated text.
    async fn translate(
        &self,
        content: &str,
        options: &TranslateOptions,
    ) -> Result<String, TranslationError>;

    /// A display string linking to a page where `content` can be translated
    /// by hand.
    fn link(&self, content: &str, options: &TranslateOptions) -> String;

    /// Whether the provider accepts `source_lang` as a source language.
    fn is_supported(&self, source_lang: &str) -> bool;
}
