use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use deeplx_translate::API_URL_KEY;
use deeplx_translate::CONFIG_SECTION;
use deeplx_translate::DeepLxTranslate;
use deeplx_translate::Translate;
use deeplx_translate::TranslateOptions;
use deeplx_translate::WorkspaceConfiguration;
use deeplx_translate::default_config_path;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

mod watch;

#[derive(Debug, Parser)]
#[command(version, about = "Translate text through a self-hosted DeepLX endpoint")]
struct Cli {
    /// Configuration file (defaults to ~/.deeplx-translate/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `deeplxTranslate.apiUrl` for this run
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Translate TEXT, or standard input when TEXT is omitted
    Translate {
        text: Option<String>,

        /// Source language hint
        #[arg(long)]
        from: Option<String>,

        /// Target language hint
        #[arg(long)]
        to: Option<String>,
    },

    /// Print a link for translating TEXT by hand
    Link {
        text: String,

        /// Target language (defaults to auto)
        #[arg(long)]
        to: Option<String>,
    },

    /// Translate standard input line by line, reloading the config file
    /// whenever it changes
    Watch,

    /// Store the endpoint URL in the config file
    SetUrl { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path().context("cannot determine home directory")?,
    };
    let configuration = Arc::new(
        WorkspaceConfiguration::load(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?,
    );
    if let Some(url) = &cli.api_url {
        configuration.update(CONFIG_SECTION, API_URL_KEY, Some(url.as_str().into()));
    }

    match cli.command {
        Command::Translate { text, from, to } => {
            let provider = DeepLxTranslate::new(configuration.as_ref());
            let content = match text {
                Some(text) => text,
                None => read_stdin().await?,
            };
            warn_if_too_long(&provider, &content);

            let translated = provider
                .translate(&content, &TranslateOptions { from, to })
                .await?;
            println!("{translated}");
        }
        Command::Link { text, to } => {
            let provider = DeepLxTranslate::new(configuration.as_ref());
            println!("{}", provider.link(&text, &TranslateOptions { from: None, to }));
        }
        Command::Watch => {
            watch::run(configuration, config_path, cli.api_url).await?;
        }
        Command::SetUrl { url } => {
            configuration.update(CONFIG_SECTION, API_URL_KEY, Some(url.into()));
            configuration
                .save(&config_path)
                .with_context(|| format!("failed to save {}", config_path.display()))?;
            println!("Saved {}", config_path.display());
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_stdin() -> Result<String> {
    let mut content = String::new();
    tokio::io::stdin()
        .read_to_string(&mut content)
        .await
        .context("failed to read standard input")?;
    Ok(content.trim_end_matches(['\r', '\n']).to_string())
}

/// Hosts are expected to chunk text to `max_len`; this CLI only warns.
fn warn_if_too_long(provider: &dyn Translate, content: &str) {
    if let Some(len) = oversized_len(provider, content) {
        tracing::warn!(
            len,
            max_len = provider.max_len(),
            "Content exceeds the provider's maximum length"
        );
    }
}

/// Length of `content` in characters when it exceeds the provider's limit.
fn oversized_len(provider: &dyn Translate, content: &str) -> Option<usize> {
    let len = content.chars().count();
    (len > provider.max_len()).then_some(len)
}
