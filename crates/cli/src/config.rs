use crate::error::CliError;
use engine_config::settings::IngestSettings;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::debug;

pub const APP_DIR: &str = ".tabload";
pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_ACCOUNT: &str = "local";
/// Container for checkpoints of local inputs when the job names none.
pub const DEFAULT_CONTAINER: &str = "uploads";

/// Where one account keeps its blobs and its tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub blob_root: PathBuf,
    pub table_path: PathBuf,
}

impl AccountConfig {
    fn under(dir: &Path) -> Self {
        AccountConfig {
            blob_root: dir.join("blobs"),
            table_path: dir.join("tables"),
        }
    }
}

/// Contents of `~/.tabload/config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub default_account: Option<String>,
    pub accounts: BTreeMap<String, AccountConfig>,
    pub queue_dir: Option<PathBuf>,
    pub ingest: IngestSettings,
}

impl CliConfig {
    /// Loads `explicit`, or the file in the app directory when none is given.
    ///
    /// A missing default file is not an error; a missing explicit one is.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        if let Some(path) = explicit
            && !path.exists()
        {
            return Err(CliError::ConfigMissing(path.display().to_string()));
        }
        let home = app_dir()?;
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => home.join(CONFIG_FILE),
        };

        let mut config = if path.exists() {
            debug!(path = %path.display(), "Loading config");
            let text = std::fs::read_to_string(&path)?;
            serde_json::from_str::<CliConfig>(&text)?
        } else {
            CliConfig::default()
        };
        config.fill_defaults(&home);
        Ok(config)
    }

    fn fill_defaults(&mut self, home: &Path) {
        if self.accounts.is_empty() {
            self.accounts.insert(
                DEFAULT_ACCOUNT.to_string(),
                AccountConfig::under(&home.join(DEFAULT_ACCOUNT)),
            );
        }
        if self.queue_dir.is_none() {
            self.queue_dir = Some(home.join("queue"));
        }
    }

    /// Account names compare case-insensitively.
    pub fn account(&self, name: &str) -> Result<&AccountConfig, CliError> {
        self.accounts
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, account)| account)
            .ok_or_else(|| CliError::UnknownAccount(name.to_string()))
    }

    /// The account used when a job names none: the configured default, else the only one.
    pub fn default_account(&self) -> Option<&str> {
        if let Some(name) = &self.default_account {
            return Some(name.as_str());
        }
        match self.accounts.len() {
            1 => self.accounts.keys().next().map(String::as_str),
            _ => self
                .accounts
                .contains_key(DEFAULT_ACCOUNT)
                .then_some(DEFAULT_ACCOUNT),
        }
    }

    pub fn queue_dir(&self) -> Result<PathBuf, CliError> {
        match &self.queue_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(app_dir()?.join("queue")),
        }
    }
}

fn app_dir() -> Result<PathBuf, CliError> {
    dirs::home_dir()
        .map(|home| home.join(APP_DIR))
        .ok_or_else(|| CliError::Unexpected("Cannot determine home directory".to_string()))
}
