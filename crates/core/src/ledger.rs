//! Append-only ledger of quality test records.
//!
//! [`TestResultLedger::record_result`] is the only way to write. It runs a fixed chain of
//! guards and the first failing guard decides the outcome:
//!
//! 1. the test id is already recorded → [`LedgerError::DuplicateTest`]
//! 2. the caller is not a registered lab → [`LedgerError::Unauthorized`]
//! 3. the caller's lab is deactivated → [`LedgerError::LabInactive`]
//! 4. the result code is outside `0..=2` → [`LedgerError::InvalidResult`]
//!
//! The duplicate check runs before any authorization check, so an unregistered caller
//! resubmitting a known test id sees `DuplicateTest`. Hosts rely on this order; keep it.
//!
//! Records are never updated or deleted.

use crate::labs::LabRegistry;
use crate::outcome::TestOutcome;
use crate::{LedgerError, LedgerResult};
use qtl_clock::{LogicalClock, Ordinal};
use qtl_types::{BatchId, Principal, TestId};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// An admitted test result. Immutable once stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRecord {
    pub batch_id: BatchId,
    /// The lab that submitted the record, taken from the authenticated caller.
    pub lab: Principal,
    /// Logical time of admission.
    pub submitted_at: Ordinal,
    pub result: TestOutcome,
    /// Free-form measurement payload.
    pub parameters: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestResultLedger {
    #[serde(deserialize_with = "crate::unique_keys::deserialize")]
    records: BTreeMap<TestId, TestRecord>,
}

impl TestResultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a new test record submitted by `caller`.
    ///
    /// On success the stored record carries `caller` as its lab and `clock.now()` as its
    /// submission ordinal. The clock is read once, after every guard has passed.
    ///
    /// # Errors
    ///
    /// See the module documentation for the guard order. On any error the ledger is unchanged.
    #[allow(clippy::too_many_arguments)]
    pub fn record_result<C>(
        &mut self,
        labs: &LabRegistry,
        clock: &C,
        caller: &Principal,
        test_id: TestId,
        batch_id: BatchId,
        result: u32,
        parameters: impl Into<String>,
    ) -> LedgerResult<()>
    where
        C: LogicalClock + ?Sized,
    {
        let slot = match self.records.entry(test_id) {
            Entry::Occupied(existing) => {
                return Err(rejected(LedgerError::DuplicateTest(existing.key().clone())));
            }
            Entry::Vacant(slot) => slot,
        };

        match labs.get_lab(caller) {
            None => return Err(rejected(LedgerError::Unauthorized(caller.clone()))),
            Some(entry) if !entry.is_active => {
                return Err(rejected(LedgerError::LabInactive(caller.clone())));
            }
            Some(_) => {}
        }

        let result = TestOutcome::try_from(result).map_err(rejected)?;

        let record = TestRecord {
            batch_id,
            lab: caller.clone(),
            submitted_at: clock.now(),
            result,
            parameters: parameters.into(),
        };

        tracing::info!(
            test_id = %slot.key(),
            batch_id = %record.batch_id,
            lab = %record.lab,
            result = %record.result,
            submitted_at = %record.submitted_at,
            "test result recorded"
        );
        slot.insert(record);
        Ok(())
    }

    pub fn get(&self, test_id: &TestId) -> Option<&TestRecord> {
        self.records.get(test_id)
    }

    pub fn contains(&self, test_id: &TestId) -> bool {
        self.records.contains_key(test_id)
    }

    /// Iterates over every record, ordered by test id.
    pub fn records(&self) -> impl Iterator<Item = (&TestId, &TestRecord)> {
        self.records.iter()
    }

    /// The highest submission ordinal stored, if any.
    pub fn latest_submission(&self) -> Option<Ordinal> {
        self.records.values().map(|r| r.submitted_at).max()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn rejected(err: LedgerError) -> LedgerError {
    tracing::warn!(code = err.code(), error = %err, "test result rejected");
    err
}
