//! `watch` command: translate stdin line by line while following edits to
//! the config file.

use std::fs;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use deeplx_translate::API_URL_KEY;
use deeplx_translate::CONFIG_SECTION;
use deeplx_translate::DeepLxTranslate;
use deeplx_translate::Translate;
use deeplx_translate::TranslateOptions;
use deeplx_translate::TranslationError;
use deeplx_translate::WorkspaceConfiguration;
use deeplx_translate::set_value;
use notify::Event;
use notify::EventKind;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;

pub(crate) async fn run(
    configuration: Arc<WorkspaceConfiguration>,
    config_path: PathBuf,
    api_url_override: Option<String>,
) -> Result<()> {
    let provider = DeepLxTranslate::new(configuration.as_ref());
    let _watcher = watch_config(Arc::clone(&configuration), config_path, api_url_override)?;

    let options = TranslateOptions::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let result = provider.translate(&line, &options).await;
        write_result(&mut io::stdout().lock(), &mut io::stderr().lock(), result)?;
    }

    Ok(())
}

/// Print a translation to `out`, or report its failure once on `err`.
fn write_result(
    out: &mut impl Write,
    err: &mut impl Write,
    result: Result<String, TranslationError>,
) -> io::Result<()> {
    match result {
        Ok(translated) => writeln!(out, "{translated}"),
        Err(e) => writeln!(err, "error: {e}"),
    }
}

/// Start watching the directory holding `config_path`. The watcher stops
/// when the returned value is dropped.
fn watch_config(
    configuration: Arc<WorkspaceConfiguration>,
    config_path: PathBuf,
    api_url_override: Option<String>,
) -> Result<RecommendedWatcher> {
    // Editors often replace the file instead of writing in place, so the
    // directory is watched rather than the file.
    let dir = config_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if touches_config(&event, &config_path) => {
            reload(&configuration, &config_path, api_url_override.as_deref());
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Config watcher error: {e}"),
    })?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", dir.display()))?;

    tracing::info!("Watching {} for changes", dir.display());
    Ok(watcher)
}

fn touches_config(event: &Event, config_path: &Path) -> bool {
    let content_changed = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    content_changed
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == config_path.file_name())
}

/// Re-read the config file with the command-line URL override applied on
/// top, so the override keeps precedence and listeners never observe the
/// file's own URL in between.
fn reload(
    configuration: &WorkspaceConfiguration,
    config_path: &Path,
    api_url_override: Option<&str>,
) {
    let result = configuration.reload_with(config_path, |table| {
        if let Some(url) = api_url_override {
            set_value(table, CONFIG_SECTION, API_URL_KEY, Some(url.into()));
        }
    });
    match result {
        Ok(()) => tracing::info!("Reloaded {}", config_path.display()),
        Err(e) => tracing::warn!(
            "Keeping previous configuration, failed to reload {}: {e}",
            config_path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use deeplx_translate::Configuration;
    use deeplx_translate::ConfigurationChangeEvent;
    use notify::event::AccessKind;
    use notify::event::CreateKind;
    use notify::event::ModifyKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn only_content_events_for_the_config_file_count() {
        let config_path = Path::new("/home/user/.deeplx-translate/config.toml");

        let modify = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/home/user/.deeplx-translate/config.toml"));
        assert!(touches_config(&modify, config_path));

        let create = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/home/user/.deeplx-translate/config.toml"));
        assert!(touches_config(&create, config_path));

        let other_file = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/home/user/.deeplx-translate/notes.txt"));
        assert!(!touches_config(&other_file, config_path));

        let access = Event::new(EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("/home/user/.deeplx-translate/config.toml"));
        assert!(!touches_config(&access, config_path));
    }

    #[test]
    fn reload_reapplies_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[deeplxTranslate]\napiUrl = \"http://file\"\n").unwrap();
        let configuration = WorkspaceConfiguration::load(&path).unwrap();

        fs::write(&path, "[deeplxTranslate]\napiUrl = \"http://edited\"\n").unwrap();
        reload(&configuration, &path, None);
        assert_eq!(
            configuration.get_string(CONFIG_SECTION, API_URL_KEY).as_deref(),
            Some("http://edited")
        );

        reload(&configuration, &path, Some("http://override"));
        assert_eq!(
            configuration.get_string(CONFIG_SECTION, API_URL_KEY).as_deref(),
            Some("http://override")
        );
    }

    #[test]
    fn listeners_never_see_file_url_while_override_is_active() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[deeplxTranslate]\napiUrl = \"http://file\"\n").unwrap();
        let configuration = WorkspaceConfiguration::load(&path).unwrap();
        configuration.update(CONFIG_SECTION, API_URL_KEY, Some("http://override".into()));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = configuration.on_did_change(Box::new(
            move |_: &ConfigurationChangeEvent, current: &dyn Configuration| {
                sink.lock()
                    .unwrap()
                    .push(current.get_string(CONFIG_SECTION, API_URL_KEY));
            },
        ));

        fs::write(
            &path,
            "[deeplxTranslate]\napiUrl = \"http://file\"\n\n[other]\nflag = true\n",
        )
        .unwrap();
        reload(&configuration, &path, Some("http://override"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("http://override".to_string())]
        );
        assert_eq!(
            configuration.get_string(CONFIG_SECTION, API_URL_KEY).as_deref(),
            Some("http://override")
        );
    }

    #[test]
    fn failures_are_reported_once_on_stderr() {
        let mut out = Vec::new();
        let mut err = Vec::new();

        write_result(&mut out, &mut err, Ok("你好".to_string())).unwrap();
        write_result(&mut out, &mut err, Err(TranslationError::MissingApiUrl)).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "你好\n");
        let err = String::from_utf8(err).unwrap();
        assert_eq!(err.lines().count(), 1);
        assert!(err.starts_with("error: "));
    }

    #[test]
    fn reload_failure_keeps_previous_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[deeplxTranslate]\napiUrl = \"http://file\"\n").unwrap();
        let configuration = WorkspaceConfiguration::load(&path).unwrap();

        fs::write(&path, "not = [valid").unwrap();
        reload(&configuration, &path, None);
        assert_eq!(
            configuration.get_string(CONFIG_SECTION, API_URL_KEY).as_deref(),
            Some("http://file")
        );
    }
}
