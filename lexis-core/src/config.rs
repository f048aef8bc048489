// Settings file: ~/.config/lexis/config.json

use crate::book::DEFAULT_BOOK_PAGE;
use crate::error::{CoreError, Result};
use crate::export::ExportFormat;
use lexis_scanner::catalog::DEFAULT_PAGE_SIZE;
use lexis_scanner::client::{
    DEFAULT_CATALOG_BASE, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
    HttpOptions, RetryPolicy,
};
use lexis_scanner::walker::{BranchPolicy, DEFAULT_BRANCH_POLICY, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/lexis/config.json";
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 1000;

/// Everything about a run that is not the book itself.
///
/// Missing fields take their defaults, so a config file only needs the keys
/// it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub catalog_base_url: String,
    pub book_page_url: String,
    pub page_size: usize,
    pub max_attempts: u32,
    pub retry_interval_ms: u64,
    pub max_depth: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub branch_policy: BranchPolicy,
    pub format: ExportFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_base_url: DEFAULT_CATALOG_BASE.to_string(),
            book_page_url: DEFAULT_BOOK_PAGE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            max_depth: DEFAULT_MAX_DEPTH,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            branch_policy: DEFAULT_BRANCH_POLICY,
            format: ExportFormat::default(),
            cookie: None,
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing file is not an error and yields
    /// the defaults; a file that does not parse is.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| CoreError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| CoreError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        fs::write(path, json + "\n")?;
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_interval_ms),
        )
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout_secs: self.timeout_secs,
            user_agent: self.user_agent.clone(),
            cookie: self.cookie.clone(),
        }
    }
}

/// Expand a leading `~` the way a shell would.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
