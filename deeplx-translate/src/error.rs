//! Translation error types.

use thiserror::Error;

/// Error returned by a translation call.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// No API URL configured for the provider.
    #[error("DeepLX API URL is not configured; set `deeplxTranslate.apiUrl` in your settings")]
    MissingApiUrl,

    /// The endpoint answered with a non-success `code` field.
    ///
    /// The server payload is not carried; `code` is kept for logging.
    #[error("Server error!")]
    Server { code: Option<i64> },

    /// Anything below the response body contract: DNS, connect, timeout,
    /// non-2xx HTTP status or an undecodable body.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}
