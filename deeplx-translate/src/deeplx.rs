//! DeepLX translation provider.
//!
//! Posts text to a self-hosted DeepLX endpoint whose URL comes from the
//! `deeplxTranslate.apiUrl` setting, and re-reads that setting whenever the
//! section changes.

use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;

use crate::config::Configuration;
use crate::config::ConfigurationChangeEvent;
use crate::config::Subscription;
use crate::error::TranslationError;
use crate::lang::convert_lang;
use crate::options::DeepLxOptions;
use crate::translate::Translate;
use crate::translate::TranslateOptions;

/// Configuration section owned by this provider.
pub const CONFIG_SECTION: &str = "deeplxTranslate";

/// Key holding the endpoint URL within [`CONFIG_SECTION`].
pub const API_URL_KEY: &str = "apiUrl";

/// Maximum content length advertised to hosts. Not enforced here.
pub const MAX_LEN: usize = 3000;

const SOURCE_LANG: &str = "EN";
const TARGET_LANG: &str = "ZH";

/// `code` value signalling a successful translation.
const SUCCESS_CODE: i64 = 200;

const LINK_BASE_URL: &str = "https://www.deeplx.com/translator";

/// Translation provider backed by a DeepLX endpoint.
#[derive(Debug)]
pub struct DeepLxTranslate {
    client: Client,
    options: Arc<RwLock<Arc<DeepLxOptions>>>,
    _subscription: Subscription,
}

impl DeepLxTranslate {
    /// Create a provider reading from `configuration`, with a default HTTP
    /// client.
    pub fn new(configuration: &dyn Configuration) -> Self {
        Self::with_client(configuration, Client::new())
    }

    /// Create a provider that sends requests through `client`.
    ///
    /// The provider stays subscribed to `configuration` until it is dropped.
    pub fn with_client(configuration: &dyn Configuration, client: Client) -> Self {
        let options = Arc::new(RwLock::new(Arc::new(DeepLxOptions::from_configuration(
            configuration,
        ))));

        let slot = Arc::clone(&options);
        let subscription = configuration.on_did_change(Box::new(
            move |event: &ConfigurationChangeEvent, current: &dyn Configuration| {
                if !event.affects_configuration(CONFIG_SECTION) {
                    return;
                }
                let next = Arc::new(DeepLxOptions::from_configuration(current));
                tracing::info!(api_url = ?next.api_url, "Reloaded DeepLX options");
                *slot.write().unwrap_or_else(PoisonError::into_inner) = next;
            },
        ));

        Self {
            client,
            options,
            _subscription: subscription,
        }
    }

    /// Snapshot of the current options.
    pub fn options(&self) -> Arc<DeepLxOptions> {
        Arc::clone(&self.options.read().unwrap_or_else(PoisonError::into_inner))
    }
}

#[async_trait]
impl Translate for DeepLxTranslate {
    fn max_len(&self) -> usize {
        MAX_LEN
    }

    async fn translate(
        &self,
        content: &str,
        _options: &TranslateOptions,
    ) -> Result<String, TranslationError> {
        let options = self.options();
        let Some(url) = options.effective_api_url() else {
            return Err(TranslationError::MissingApiUrl);
        };

        // The endpoint is always asked for EN -> ZH; caller hints are not
        // forwarded.
        let request = DeepLxRequest {
            text: content,
            source_lang: SOURCE_LANG,
            target_lang: TARGET_LANG,
        };

        tracing::debug!(url, chars = content.chars().count(), "Sending DeepLX request");

        let response: DeepLxResponse = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.code != Some(SUCCESS_CODE) {
            tracing::warn!(code = ?response.code, id = ?response.id, "DeepLX reported failure");
            return Err(TranslationError::Server {
                code: response.code,
            });
        }

        // An empty translation echoes the input instead of failing.
        Ok(response
            .data
            .filter(|data| !data.is_empty())
            .unwrap_or_else(|| content.to_string()))
    }

    fn link(&self, content: &str, options: &TranslateOptions) -> String {
        let to = options.to.as_deref().unwrap_or("auto");
        let url = format!(
            "{LINK_BASE_URL}#auto/{}/{}",
            convert_lang(to),
            urlencoding::encode(content)
        );
        format!("[DeepLX]({url})")
    }

    fn is_supported(&self, _source_lang: &str) -> bool {
        true
    }
}

// DeepLX API types
#[derive(Debug, Serialize)]
pub struct DeepLxRequest<'a> {
    pub text: &'a str,
    pub source_lang: &'a str,
    pub target_lang: &'a str,
}

/// Response body. Every field is optional on the wire.
///
/// `id` and `alternatives` are never interpreted, so they are kept as raw
/// JSON and any shape a server sends is accepted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeepLxResponse {
    pub code: Option<i64>,
    pub id: Option<serde_json::Value>,
    pub data: Option<String>,
    pub alternatives: Option<serde_json::Value>,
}
