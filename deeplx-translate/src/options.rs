//! DeepLX provider options.

use crate::config::Configuration;
use crate::deeplx::API_URL_KEY;
use crate::deeplx::CONFIG_SECTION;

/// Options the provider reads from the `deeplxTranslate` section.
///
/// Always rebuilt as a whole from configuration, never patched field by
/// field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepLxOptions {
    /// Endpoint that accepts translation POSTs.
    pub api_url: Option<String>,
}

impl DeepLxOptions {
    pub fn from_configuration(configuration: &dyn Configuration) -> Self {
        Self {
            api_url: configuration.get_string(CONFIG_SECTION, API_URL_KEY),
        }
    }

    /// The configured URL, treating an empty string as unset.
    pub fn effective_api_url(&self) -> Option<&str> {
        self.api_url.as_deref().filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkspaceConfiguration;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_api_url_from_section() {
        let config = WorkspaceConfiguration::from_toml_str(
            "[deeplxTranslate]\napiUrl = \"http://127.0.0.1:1188/translate\"\n",
        )
        .unwrap();

        let options = DeepLxOptions::from_configuration(&config);
        assert_eq!(
            options.effective_api_url(),
            Some("http://127.0.0.1:1188/translate")
        );
    }

    #[test]
    fn missing_or_empty_url_is_unset() {
        let options = DeepLxOptions::from_configuration(&WorkspaceConfiguration::new());
        assert_eq!(options, DeepLxOptions::default());
        assert_eq!(options.effective_api_url(), None);

        let options = DeepLxOptions {
            api_url: Some(String::new()),
        };
        assert_eq!(options.effective_api_url(), None);
    }
}
