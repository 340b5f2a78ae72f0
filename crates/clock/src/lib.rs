//! Logical clock sources for the quality test ledger.
//!
//! Every admitted test record is stamped with the *ordinal* current at insertion time. The
//! ledger does not care where that ordinal comes from; a host may feed it a block height, a
//! replication log index, or wall-clock milliseconds. The only requirement is that successive
//! reads never go backwards.
//!
//! This crate provides:
//! - [`Ordinal`], the value stamped into records.
//! - [`LogicalClock`], the trait the ledger reads from.
//! - Three implementations: [`FixedClock`] (a pinned height, useful for tests and for hosts
//!   that already know the height of the block being executed), [`CounterClock`] (an atomic
//!   counter advanced by the host) and [`WallClock`] (Unix milliseconds, clamped so it never
//!   decreases).

mod service;

pub use service::{CounterClock, FixedClock, LogicalClock, Ordinal, WallClock};

/// Error type for clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for clock operations.
pub type ClockResult<T> = Result<T, ClockError>;
