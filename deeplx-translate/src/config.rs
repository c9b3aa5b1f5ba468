//! Namespaced configuration with change notifications.
//!
//! Configuration is stored at `~/.deeplx-translate/config.toml`, one table
//! per section:
//!
//! ```toml
//! [deeplxTranslate]
//! apiUrl = "http://localhost:1188/translate"
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::Weak;

use thiserror::Error;
use toml::Table;
use toml::Value;

/// Error loading or saving a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Get the default configuration file path.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".deeplx-translate").join("config.toml"))
}

/// Describes which settings changed, as `section.key` names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationChangeEvent {
    keys: Vec<String>,
}

impl ConfigurationChangeEvent {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Whether any changed setting lives under `section`.
    ///
    /// `section` may itself be a dotted name such as `deeplxTranslate.apiUrl`.
    pub fn affects_configuration(&self, section: &str) -> bool {
        self.keys.iter().any(|key| {
            key.strip_prefix(section)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
        })
    }
}

/// Callback invoked after configuration changed. It receives the event and
/// a reader for the current values.
pub type ChangeListener = Box<dyn Fn(&ConfigurationChangeEvent, &dyn Configuration) + Send + Sync>;

type SharedListener = Arc<dyn Fn(&ConfigurationChangeEvent, &dyn Configuration) + Send + Sync>;

/// Handle for a registered listener. Dropping it unregisters the listener.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(dispose: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}

/// Read access to host configuration, keyed by section and key.
pub trait Configuration: Send + Sync {
    /// Raw value of `key` in `section`.
    fn get(&self, section: &str, key: &str) -> Option<Value>;

    /// Register `listener` for every subsequent change.
    fn on_did_change(&self, listener: ChangeListener) -> Subscription;

    /// String value of `key` in `section`. Non-string values read as absent.
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        match self.get(section, key)? {
            Value::String(value) => Some(value),
            other => {
                tracing::warn!("Ignoring non-string value for {section}.{key}: {other}");
                None
            }
        }
    }
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, SharedListener)>,
}

/// TOML-backed configuration store.
pub struct WorkspaceConfiguration {
    values: RwLock<Table>,
    listeners: Arc<Mutex<Listeners>>,
}

impl Default for WorkspaceConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WorkspaceConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceConfiguration")
            .field("values", &*self.read_values())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl WorkspaceConfiguration {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::from_table(Table::new())
    }

    pub fn from_table(table: Table) -> Self {
        Self {
            values: RwLock::new(table),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_table(toml::from_str(content)?))
    }

    /// Load configuration from file. A missing file yields an empty
    /// configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::from_table(read_table(path)?))
    }

    /// Re-read `path` and replace the current values with its contents.
    ///
    /// On error the current values are left untouched.
    pub fn reload(&self, path: &Path) -> Result<(), ConfigError> {
        self.reload_with(path, |_| {})
    }

    /// Like [`reload`](Self::reload), but lets `edit` adjust the file's
    /// values before they are swapped in. Listeners see a single change
    /// carrying the edited values, never the raw file contents.
    pub fn reload_with<F>(&self, path: &Path, edit: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Table),
    {
        let mut table = read_table(path)?;
        edit(&mut table);
        self.replace(table);
        Ok(())
    }

    /// Replace every value at once, notifying listeners of the keys whose
    /// value differs.
    pub fn replace(&self, table: Table) {
        let changed = {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            let changed = changed_keys(&values, &table);
            *values = table;
            changed
        };
        self.fire(changed);
    }

    /// Set (or with `None`, remove) a single value.
    pub fn update(&self, section: &str, key: &str, value: Option<Value>) {
        let changed = {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            let previous = set_value(&mut values, section, key, value.clone());
            previous != value
        };

        if changed {
            self.fire(vec![format!("{section}.{key}")]);
        }
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(&*self.read_values())?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &content)?;

        // Owner read/write only; the file may hold private endpoint URLs.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(path, permissions);
        }

        Ok(())
    }

    /// Number of registered change listeners.
    pub fn listener_count(&self) -> usize {
        self.lock_listeners().entries.len()
    }

    fn read_values(&self) -> std::sync::RwLockReadGuard<'_, Table> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        let event = ConfigurationChangeEvent::new(keys);
        tracing::debug!(keys = ?event.keys(), "configuration changed");

        // Listeners may read configuration, so no lock is held while they run.
        let listeners: Vec<SharedListener> = self
            .lock_listeners()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&event, self);
        }
    }
}

impl Configuration for WorkspaceConfiguration {
    fn get(&self, section: &str, key: &str) -> Option<Value> {
        self.read_values()
            .get(section)
            .and_then(Value::as_table)
            .and_then(|table| table.get(key))
            .cloned()
    }

    fn on_did_change(&self, listener: ChangeListener) -> Subscription {
        let id = {
            let mut listeners = self.lock_listeners();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, Arc::from(listener)));
            id
        };

        let registry: Weak<Mutex<Listeners>> = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entries
                    .retain(|(entry, _)| *entry != id);
            }
        })
    }
}

fn read_table(path: &Path) -> Result<Table, ConfigError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Table::new()),
        Err(e) => Err(e.into()),
    }
}

/// Set (or with `None`, remove) `section.key` in `table`, returning the
/// previous value. A section that is missing or not a table is replaced by
/// a fresh one when setting.
pub fn set_value(
    table: &mut Table,
    section: &str,
    key: &str,
    value: Option<Value>,
) -> Option<Value> {
    match value {
        Some(value) => {
            if !matches!(table.get(section), Some(Value::Table(_))) {
                table.insert(section.to_string(), Value::Table(Table::new()));
            }
            table
                .get_mut(section)
                .and_then(Value::as_table_mut)
                .and_then(|entries| entries.insert(key.to_string(), value))
        }
        None => table
            .get_mut(section)
            .and_then(Value::as_table_mut)
            .and_then(|entries| entries.remove(key)),
    }
}

/// `section.key` names whose value differs between `old` and `new`. A
/// section that is not a table on either side is reported by its name.
fn changed_keys(old: &Table, new: &Table) -> Vec<String> {
    let empty = Table::new();
    let sections: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    let mut changed = Vec::new();

    for section in sections {
        match (
            section_entries(old, section, &empty),
            section_entries(new, section, &empty),
        ) {
            (Some(before), Some(after)) => {
                let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
                changed.extend(
                    keys.into_iter()
                        .filter(|key| before.get(key.as_str()) != after.get(key.as_str()))
                        .map(|key| format!("{section}.{key}")),
                );
            }
            _ => {
                if old.get(section.as_str()) != new.get(section.as_str()) {
                    changed.push(section.clone());
                }
            }
        }
    }

    changed
}

/// Entries of `section`; a missing section reads as `empty`.
fn section_entries<'a>(table: &'a Table, section: &str, empty: &'a Table) -> Option<&'a Table> {
    match table.get(section) {
        None => Some(empty),
        Some(Value::Table(entries)) => Some(entries),
        Some(_) => None,
    }
}
