//! Persisted prompt lookup.
//!
//! Prompts live in a JSON file of the form `{"prompts": {"key": "body"}}`.
//! The file is created with the built-in prompts on first use. Keys found in
//! the file override the built-in ones; built-in keys missing from the file
//! stay available.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable that overrides the prompt store directory.
pub const CONFIG_DIR_ENV: &str = "MERGEFILES_CONFIG_DIR";

const CONFIG_FILE_NAME: &str = "config.json";

const DEVELOPER_PROMPT_BODY: &str = "You will always output every file in TOTAL if you changed it. 
Do not output unchanged files. 
You will ask questions to make sure you understood everything perfectly right.
Also ask for further info, like documentation, files etc. if needed.
I provide you with the content of several files. Every file will be introduced by '--- START File: [path] ---' and ended by '--- END FILE ---'

This is your task:

";

static BUILTIN_PROMPTS: Lazy<BTreeMap<String, String>> = Lazy::new(|| {
    BTreeMap::from([
        (
            "default".to_string(),
            format!("You are an expert software developer. {DEVELOPER_PROMPT_BODY}\n"),
        ),
        (
            "go".to_string(),
            format!("You are an expert go software developer. {DEVELOPER_PROMPT_BODY}"),
        ),
        (
            "shell".to_string(),
            "Return a one-line bash command with the functionality I will describe. \
             Return ONLY the command ready to run in the terminal. \
             The command should do the following:\n"
                .to_string(),
        ),
    ])
});

/// Key to prompt mapping, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptStore {
    prompts: BTreeMap<String, String>,
}

impl Default for PromptStore {
    fn default() -> Self {
        Self {
            prompts: BUILTIN_PROMPTS.clone(),
        }
    }
}

impl PromptStore {
    /// Default location of the prompt store.
    ///
    /// `$MERGEFILES_CONFIG_DIR/config.json` when the variable is set, else
    /// `~/.config/mergefiles/config.json`, else `./config.json`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let dir = std::env::var_os(CONFIG_DIR_ENV)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".config").join("mergefiles")))
            .unwrap_or_else(|| PathBuf::from("."));

        dir.join(CONFIG_FILE_NAME)
    }

    /// Loads the store at `path`, creating it with the built-in prompts if
    /// it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created, read or decoded.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        let mut store = Self::default();

        match fs::read_to_string(path) {
            Ok(text) => {
                let stored: Self = serde_json::from_str(&text).map_err(|e| {
                    Error::prompt_store(path, format!("failed to read config file: {e}"))
                })?;
                store.prompts.extend(stored.prompts);
                debug!("Loaded {} prompts from {}", store.prompts.len(), path.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                store.save(path)?;
                info!("Created prompt store at {}", path.display());
            }
            Err(e) => {
                return Err(Error::prompt_store(
                    path,
                    format!("failed to open config file: {e}"),
                ));
            }
        }

        Ok(store)
    }

    /// Writes the store to `path` as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_private_dir(dir).map_err(|e| {
                Error::prompt_store(path, format!("failed to create config dir: {e}"))
            })?;
        }

        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');

        let mut file = create_private_file(path).map_err(|e| {
            Error::prompt_store(path, format!("failed to create config file: {e}"))
        })?;
        file.write_all(json.as_bytes()).map_err(|e| {
            Error::prompt_store(path, format!("failed to write config file: {e}"))
        })?;

        Ok(())
    }

    /// Returns the prompt for `key`, or `key` itself if there is no
    /// non-empty prompt stored under it.
    #[must_use]
    pub fn lookup<'a>(&'a self, key: &'a str) -> &'a str {
        match self.prompts.get(key) {
            Some(prompt) if !prompt.is_empty() => prompt,
            _ => key,
        }
    }

    /// Known prompt keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.prompts.keys().map(String::as_str)
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn create_private_file(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private_file(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_creates_store_with_builtins() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.child("cfg/mergefiles/config.json");

        let store = PromptStore::load_or_init(path.path()).unwrap();

        assert!(path.exists());
        assert_eq!(store, PromptStore::default());
        let keys: Vec<&str> = store.keys().collect();
        assert_eq!(keys, vec!["default", "go", "shell"]);

        let reloaded = PromptStore::load_or_init(path.path()).unwrap();
        assert_eq!(reloaded, store);
    }

    #[test]
    fn test_file_entries_override_and_extend_builtins() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.child("config.json");
        path.write_str(r#"{"prompts": {"go": "custom go", "review": "Review this:\n"}}"#)
            .unwrap();

        let store = PromptStore::load_or_init(path.path()).unwrap();

        assert_eq!(store.lookup("go"), "custom go");
        assert_eq!(store.lookup("review"), "Review this:\n");
        assert!(store.lookup("shell").starts_with("Return a one-line bash command"));
    }

    #[test]
    fn test_lookup_falls_back_to_key() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.child("config.json");
        path.write_str(r#"{"prompts": {"blank": ""}}"#).unwrap();

        let store = PromptStore::load_or_init(path.path()).unwrap();

        assert_eq!(store.lookup("Explain this code:\n"), "Explain this code:\n");
        assert_eq!(store.lookup("blank"), "blank");
    }

    #[test]
    fn test_builtin_prompts() {
        let store = PromptStore::default();
        assert!(store.lookup("default").starts_with("You are an expert software developer."));
        assert!(store.lookup("default").ends_with("This is your task:\n\n\n"));
        assert!(store.lookup("go").ends_with("This is your task:\n\n"));
        for key in ["default", "go"] {
            let prompt = store.lookup(key);
            assert!(
                prompt.contains("if you changed it. \nDo not output unchanged files. \nYou will ask")
            );
        }
    }

    #[test]
    fn test_invalid_json_is_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.child("config.json");
        path.write_str("{ not json").unwrap();

        let err = PromptStore::load_or_init(path.path()).unwrap_err();
        assert!(matches!(err, Error::PromptStore { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_store_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.child("config.json");
        PromptStore::default().save(path.path()).unwrap();

        let mode = fs::metadata(path.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
