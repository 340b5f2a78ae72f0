//! The closed domain of test results.

use crate::{LedgerError, LedgerResult};
use std::fmt;
use std::str::FromStr;

/// Outcome of a single quality test.
///
/// The numeric codes are part of the external contract: hosts submit results as raw codes and
/// anything outside `0..=2` is rejected at admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    Fail = 0,
    Pass = 1,
    Inconclusive = 2,
}

impl TestOutcome {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn label(self) -> &'static str {
        match self {
            TestOutcome::Fail => "fail",
            TestOutcome::Pass => "pass",
            TestOutcome::Inconclusive => "inconclusive",
        }
    }
}

impl TryFrom<u32> for TestOutcome {
    type Error = LedgerError;

    fn try_from(code: u32) -> LedgerResult<Self> {
        match code {
            0 => Ok(TestOutcome::Fail),
            1 => Ok(TestOutcome::Pass),
            2 => Ok(TestOutcome::Inconclusive),
            other => Err(LedgerError::InvalidResult(other)),
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TestOutcome {
    type Err = LedgerError;

    /// Accepts a label (`fail`, `pass`, `inconclusive`, any case) or a numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<u32>() {
            return TestOutcome::try_from(code);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "fail" => Ok(TestOutcome::Fail),
            "pass" => Ok(TestOutcome::Pass),
            "inconclusive" => Ok(TestOutcome::Inconclusive),
            _ => Err(LedgerError::InvalidInput(format!(
                "unknown test result '{trimmed}'"
            ))),
        }
    }
}
