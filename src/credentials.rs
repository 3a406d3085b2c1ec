use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::{
    config::{api_key_from_lookup, API_KEY_VARS},
    error::{GenAIError, Result},
};

/// The currently selected API key, shared between the client (which reads
/// it on every call) and whichever selector writes it.
#[derive(Clone, Default)]
pub struct KeyStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl KeyStore {
    pub fn new(initial: Option<String>) -> Self {
        let store = Self::default();
        if let Some(key) = initial {
            store.set(key);
        }
        store
    }

    pub fn get(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Blank keys clear the store.
    pub fn set(&self, key: impl Into<String>) {
        let key = key.into().trim().to_string();
        let mut slot = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = if key.is_empty() { None } else { Some(key) };
    }

    pub fn clear(&self) {
        let mut slot = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }

    pub fn is_set(&self) -> bool {
        self.inner
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_set() { "<selected>" } else { "<none>" };
        f.debug_struct("KeyStore").field("key", &state).finish()
    }
}

/// Credential collaborator consulted before Pro generations and after an
/// authentication failure.
#[async_trait]
pub trait KeySelector: Send + Sync {
    async fn has_selected_key(&self) -> bool;

    async fn open_key_selector(&self) -> Result<()>;
}

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Where `EnvKeySelector` looks for a `.env` file on each selection.
#[derive(Debug, Clone)]
enum DotenvSource {
    /// Search the working directory and its parents.
    Discover,
    File(PathBuf),
    Off,
}

/// Selects whatever key `.env` (or, failing that, the environment)
/// currently provides. The file is re-read on every selection and its
/// values win over the process environment, which still holds the key
/// loaded at startup.
pub struct EnvKeySelector {
    store: KeyStore,
    lookup: Lookup,
    dotenv: DotenvSource,
}

impl EnvKeySelector {
    pub fn new(store: KeyStore) -> Self {
        Self {
            store,
            lookup: Arc::new(|key: &str| std::env::var(key).ok()),
            dotenv: DotenvSource::Discover,
        }
    }

    /// Uses `lookup` in place of the process environment and skips `.env`
    /// unless `with_dotenv_file` is also given.
    pub fn with_lookup(
        store: KeyStore,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            store,
            lookup: Arc::new(lookup),
            dotenv: DotenvSource::Off,
        }
    }

    pub fn with_dotenv_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.dotenv = DotenvSource::File(path.into());
        self
    }

    /// Key variables currently written in the `.env` file, if any.
    fn dotenv_keys(&self) -> HashMap<String, String> {
        let iter = match &self.dotenv {
            DotenvSource::Discover => dotenv::dotenv_iter(),
            DotenvSource::File(path) => dotenv::from_path_iter(path),
            DotenvSource::Off => return HashMap::new(),
        };
        match iter {
            Ok(iter) => iter
                .filter_map(|item| match item {
                    Ok(pair) => Some(pair),
                    Err(e) => {
                        log::warn!("Skipping unreadable .env line: {}", e);
                        None
                    }
                })
                .filter(|(var, _)| API_KEY_VARS.contains(&var.as_str()))
                .collect(),
            Err(e) => {
                log::debug!("No .env file read for key selection: {}", e);
                HashMap::new()
            }
        }
    }
}

#[async_trait]
impl KeySelector for EnvKeySelector {
    async fn has_selected_key(&self) -> bool {
        self.store.is_set()
    }

    async fn open_key_selector(&self) -> Result<()> {
        let from_file = self.dotenv_keys();

        if let Some(key) = api_key_from_lookup(|var: &str| from_file.get(var).cloned()) {
            self.store.set(key);
            log::info!("🔑 API key selected from .env");
            return Ok(());
        }

        match api_key_from_lookup(|var: &str| (self.lookup)(var)) {
            Some(key) => {
                self.store.set(key);
                log::info!("🔑 API key selected from environment");
                Ok(())
            }
            None => Err(GenAIError::KeySelection(format!(
                "no API key found in {}",
                API_KEY_VARS.join(" or ")
            ))),
        }
    }
}

/// Asks for a key on the terminal.
pub struct PromptKeySelector {
    store: KeyStore,
}

impl PromptKeySelector {
    pub fn new(store: KeyStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl KeySelector for PromptKeySelector {
    async fn has_selected_key(&self) -> bool {
        self.store.is_set()
    }

    async fn open_key_selector(&self) -> Result<()> {
        let entered = tokio::task::spawn_blocking(|| -> io::Result<String> {
            let mut stderr = io::stderr();
            write!(stderr, "Enter a Gemini API key from a billing-enabled project: ")?;
            stderr.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await
        .map_err(|e| GenAIError::KeySelection(e.to_string()))??;

        let key = entered.trim();
        if key.is_empty() {
            return Err(GenAIError::KeySelection("no key entered".into()));
        }
        self.store.set(key);
        log::info!("🔑 API key selected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_store_is_shared_between_clones() {
        let store = KeyStore::default();
        let reader = store.clone();
        assert!(!reader.is_set());

        store.set("  abc  ");
        assert_eq!(reader.get().as_deref(), Some("abc"));

        store.set("   ");
        assert!(!reader.is_set());
    }

    #[test]
    fn key_store_debug_hides_the_key() {
        let store = KeyStore::new(Some("secret-key".into()));
        let rendered = format!("{:?}", store);
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<selected>"));
    }

    #[tokio::test]
    async fn env_selector_fills_the_store() {
        let store = KeyStore::default();
        let selector = EnvKeySelector::with_lookup(store.clone(), |var| {
            (var == "API_KEY").then(|| "from-env".to_string())
        });

        assert!(!selector.has_selected_key().await);
        selector.open_key_selector().await.unwrap();
        assert!(selector.has_selected_key().await);
        assert_eq!(store.get().as_deref(), Some("from-env"));
    }

    #[tokio::test]
    async fn env_selector_fails_without_a_key() {
        let selector = EnvKeySelector::with_lookup(KeyStore::default(), |_| None);
        let err = selector.open_key_selector().await.unwrap_err();
        assert!(matches!(err, GenAIError::KeySelection(_)));
    }

    #[tokio::test]
    async fn env_selector_prefers_a_fresh_dotenv_key_over_the_stale_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "# rotated\nGEMINI_API_KEY=fresh-from-dotenv\n").unwrap();

        let store = KeyStore::new(Some("stale-key".into()));
        let selector = EnvKeySelector::with_lookup(store.clone(), |var: &str| {
            (var == "GEMINI_API_KEY").then(|| "stale-key".to_string())
        })
        .with_dotenv_file(&path);

        selector.open_key_selector().await.unwrap();
        assert_eq!(store.get().as_deref(), Some("fresh-from-dotenv"));
    }

    #[tokio::test]
    async fn env_selector_reads_the_fallback_var_from_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "API_KEY=rotated\nOTHER=ignored\n").unwrap();

        let store = KeyStore::default();
        let selector = EnvKeySelector::with_lookup(store.clone(), |var: &str| {
            (var == "GEMINI_API_KEY").then(|| "stale-key".to_string())
        })
        .with_dotenv_file(&path);

        selector.open_key_selector().await.unwrap();
        assert_eq!(store.get().as_deref(), Some("rotated"));
    }

    #[tokio::test]
    async fn env_selector_falls_back_to_environment_without_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::default();
        let selector = EnvKeySelector::with_lookup(store.clone(), |var: &str| {
            (var == "API_KEY").then(|| "from-env".to_string())
        })
        .with_dotenv_file(dir.path().join("missing.env"));

        selector.open_key_selector().await.unwrap();
        assert_eq!(store.get().as_deref(), Some("from-env"));
    }
}
