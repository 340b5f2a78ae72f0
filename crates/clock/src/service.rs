//! Clock implementations.

use crate::{ClockError, ClockResult};
use chrono::Utc;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// A logical timestamp: a block height, a log index, or milliseconds since the Unix epoch.
///
/// Ordinals only carry ordering. Two records stamped with the same ordinal were admitted
/// "at the same time" as far as the ledger is concerned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Ordinal(u64);

impl Ordinal {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for Ordinal {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ordinal {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_ordinal(s)
    }
}

fn parse_ordinal(input: &str) -> ClockResult<Ordinal> {
    input.trim().parse::<u64>().map(Ordinal).map_err(|e| {
        ClockError::InvalidInput(format!("ordinal must be an unsigned integer, got '{input}': {e}"))
    })
}

/// Source of the ordinal stamped into each admitted record.
///
/// Implementations must be monotonically non-decreasing: a read never returns a value smaller
/// than any earlier read on the same clock.
pub trait LogicalClock: Send + Sync + fmt::Debug {
    /// Returns the current ordinal.
    fn now(&self) -> Ordinal;
}

/// A clock pinned to one ordinal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(Ordinal);

impl FixedClock {
    pub fn new(ordinal: impl Into<Ordinal>) -> Self {
        Self(ordinal.into())
    }
}

impl LogicalClock for FixedClock {
    fn now(&self) -> Ordinal {
        self.0
    }
}

/// A counter the host advances explicitly, typically once per executed block.
#[derive(Debug, Default)]
pub struct CounterClock {
    current: AtomicU64,
}

impl CounterClock {
    pub fn starting_at(start: impl Into<Ordinal>) -> Self {
        Self {
            current: AtomicU64::new(start.into().value()),
        }
    }

    /// Moves the clock forward by one and returns the new ordinal.
    ///
    /// Saturates at `u64::MAX` rather than wrapping.
    pub fn advance(&self) -> Ordinal {
        let previous = self
            .current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some(v.saturating_add(1))
            })
            .unwrap_or_else(|v| v);
        Ordinal(previous.saturating_add(1))
    }
}

impl LogicalClock for CounterClock {
    fn now(&self) -> Ordinal {
        Ordinal(self.current.load(Ordering::SeqCst))
    }
}

/// Milliseconds since the Unix epoch, clamped so the clock never moves backwards.
///
/// System clocks can step backwards (NTP corrections, VM migration). When that happens the
/// last observed value is returned instead.
#[derive(Debug, Default)]
pub struct WallClock {
    last: AtomicU64,
}

impl WallClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A wall clock that never reports less than `floor`, e.g. the latest ordinal already
    /// persisted by a previous process.
    pub fn starting_at(floor: impl Into<Ordinal>) -> Self {
        Self {
            last: AtomicU64::new(floor.into().value()),
        }
    }

    fn observe(&self, millis: u64) -> Ordinal {
        let previous = self.last.fetch_max(millis, Ordering::SeqCst);
        Ordinal(previous.max(millis))
    }
}

impl LogicalClock for WallClock {
    fn now(&self) -> Ordinal {
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.observe(millis)
    }
}
