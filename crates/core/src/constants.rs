//! Constants used throughout the quality test ledger core.

/// Environment variable naming the administrator principal.
pub const ADMIN_ENV_VAR: &str = "QTL_ADMIN";

/// Environment variable naming the state snapshot file.
pub const STATE_FILE_ENV_VAR: &str = "QTL_STATE_FILE";

/// Snapshot file used when no explicit path is configured.
pub const DEFAULT_STATE_FILE: &str = "qtl-state.yaml";

/// Snapshot format version written into every state file.
pub const STATE_FORMAT_VERSION: u32 = 1;
