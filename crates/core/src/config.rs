//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as
//! `Arc<CoreConfig>`. Nothing in this crate reads process-wide environment variables; binaries
//! read them and hand the raw values to the parsing helpers below.

use crate::constants::DEFAULT_STATE_FILE;
use crate::{LedgerError, LedgerResult};
use qtl_types::Principal;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    administrator: Principal,
    state_file: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(administrator: Principal, state_file: PathBuf) -> LedgerResult<Self> {
        if state_file.as_os_str().is_empty() {
            return Err(LedgerError::InvalidInput(
                "state file path cannot be empty".into(),
            ));
        }

        Ok(Self {
            administrator,
            state_file,
        })
    }

    /// The single principal allowed to add and deactivate labs.
    pub fn administrator(&self) -> &Principal {
        &self.administrator
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }
}

/// Parse the administrator principal from an optional raw value.
///
/// There is no default administrator; a missing or blank value is an error.
pub fn administrator_from_env_value(value: Option<String>) -> LedgerResult<Principal> {
    let value = value.ok_or_else(|| {
        LedgerError::InvalidInput("administrator principal is not configured".into())
    })?;

    // Surrounding whitespace in an environment value is an artefact of `.env` editing, not part
    // of the principal.
    Principal::new(value.trim()).map_err(|_| {
        LedgerError::InvalidInput("administrator principal cannot be empty".into())
    })
}

/// Parse the state file path from an optional raw value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_STATE_FILE`].
pub fn state_file_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE))
}
