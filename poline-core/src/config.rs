//! Run configuration.
//!
//! Settings come from an optional YAML file and from command-line flags; the
//! flags win. [`Settings::into_run_config`] validates the merged values once
//! at startup and produces the [`RunConfig`] that is passed explicitly to
//! every component for the rest of the run.
//!
//! ```yaml
//! environment: test
//! input: po_lines.xlsx
//! sheet: Sheet1
//! log_file: updated_po_lines.csv
//! timeout_secs: 30
//! partial_batch: skip
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};

/// Audit log written when no other path is configured.
pub const DEFAULT_LOG_FILE: &str = "updated_po_lines.csv";

/// Per-request transport timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// The three fixed procurement environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Prod,
    Test,
    Dev,
}

impl Environment {
    /// All environments in a stable order.
    pub fn all() -> &'static [Environment] {
        &[Environment::Prod, Environment::Test, Environment::Dev]
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Prod => "https://coupahost.com",
            Environment::Test => "https://test.coupahost.com",
            Environment::Dev => "https://dev.coupahost.com",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Prod => write!(f, "prod"),
            Environment::Test => write!(f, "test"),
            Environment::Dev => write!(f, "dev"),
        }
    }
}

impl FromStr for Environment {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prod" => Ok(Environment::Prod),
            "test" => Ok(Environment::Test),
            "dev" => Ok(Environment::Dev),
            _ => Err(CoreError::UnknownEnvironment(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Partial batch policy
// ---------------------------------------------------------------------------

/// What to do with a PO when one of its line numbers is absent remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartialBatchPolicy {
    /// Leave the whole PO untouched and record a failure.
    #[default]
    Skip,
    /// Process the lines that precede the first unresolved one; drop the rest.
    SubmitResolved,
}

impl fmt::Display for PartialBatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialBatchPolicy::Skip => write!(f, "skip"),
            PartialBatchPolicy::SubmitResolved => write!(f, "submit-resolved"),
        }
    }
}

impl FromStr for PartialBatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(PartialBatchPolicy::Skip),
            "submit-resolved" => Ok(PartialBatchPolicy::SubmitResolved),
            other => Err(format!(
                "unknown partial batch policy '{other}'; expected: skip, submit-resolved"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings (unvalidated)
// ---------------------------------------------------------------------------

/// Raw, possibly incomplete settings from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub environment: Option<String>,
    /// Overrides the environment's base URL (staging proxies, mock servers).
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub input: Option<PathBuf>,
    pub sheet: Option<String>,
    pub log_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub partial_batch: Option<PartialBatchPolicy>,
}

impl Settings {
    /// Load settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        serde_yaml::from_str(&contents).map_err(|source| CoreError::Settings {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Layer `overrides` on top of `self`.
    ///
    /// The target (`environment` / `base_url`) is taken as a pair: naming
    /// either one in `overrides` replaces both.
    pub fn merge(self, overrides: Settings) -> Settings {
        let (environment, base_url) =
            if overrides.environment.is_some() || overrides.base_url.is_some() {
                (overrides.environment, overrides.base_url)
            } else {
                (self.environment, self.base_url)
            };
        Settings {
            environment,
            base_url,
            api_key: overrides.api_key.or(self.api_key),
            input: overrides.input.or(self.input),
            sheet: overrides.sheet.or(self.sheet),
            log_file: overrides.log_file.or(self.log_file),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            partial_batch: overrides.partial_batch.or(self.partial_batch),
        }
    }

    /// Validate and freeze into a [`RunConfig`].
    pub fn into_run_config(self) -> Result<RunConfig, CoreError> {
        let environment = self
            .environment
            .as_deref()
            .map(Environment::from_str)
            .transpose()?;
        let base_url = match (&self.base_url, environment) {
            (Some(url), _) => url.trim().trim_end_matches('/').to_string(),
            (None, Some(env)) => env.base_url().to_string(),
            (None, None) => return Err(CoreError::MissingSetting("environment")),
        };
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(CoreError::MissingSetting("api_key"))?;
        let input = self.input.ok_or(CoreError::MissingSetting("input"))?;

        Ok(RunConfig {
            environment,
            base_url,
            api_key,
            input,
            sheet: self.sheet.filter(|s| !s.trim().is_empty()),
            log_file: self
                .log_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            partial_batch: self.partial_batch.unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// RunConfig (validated)
// ---------------------------------------------------------------------------

/// Validated configuration, fixed for the lifetime of a run.
#[derive(Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// `None` when an explicit base URL was supplied.
    pub environment: Option<Environment>,
    /// Without trailing slash.
    pub base_url: String,
    pub api_key: String,
    pub input: PathBuf,
    pub sheet: Option<String>,
    pub log_file: PathBuf,
    pub timeout: Duration,
    pub partial_batch: PartialBatchPolicy,
}

// Keeps the API key out of logs.
impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("input", &self.input)
            .field("sheet", &self.sheet)
            .field("log_file", &self.log_file)
            .field("timeout", &self.timeout)
            .field("partial_batch", &self.partial_batch)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
