//! Read-only queries over the test ledger.
//!
//! Reads are public and need no caller identity: authorization already happened when each
//! record was admitted.

use crate::ledger::{TestRecord, TestResultLedger};
use crate::outcome::TestOutcome;
use qtl_types::{BatchId, TestId};

#[derive(Clone, Copy, Debug)]
pub struct QueryFacade<'a> {
    ledger: &'a TestResultLedger,
}

impl<'a> QueryFacade<'a> {
    pub fn new(ledger: &'a TestResultLedger) -> Self {
        Self { ledger }
    }

    pub fn get_result(&self, test_id: &TestId) -> Option<&'a TestRecord> {
        let record = self.ledger.get(test_id);
        tracing::debug!(test_id = %test_id, found = record.is_some(), "get result");
        record
    }

    /// True only if `test_id` exists, belongs to `batch_id` and passed.
    ///
    /// A missing test, a test from another batch, and a failed or inconclusive test all yield
    /// `false`. Use [`QueryFacade::get_result`] to tell them apart.
    pub fn is_batch_passed(&self, batch_id: &BatchId, test_id: &TestId) -> bool {
        let passed = self
            .ledger
            .get(test_id)
            .is_some_and(|r| &r.batch_id == batch_id && r.result == TestOutcome::Pass);
        tracing::debug!(batch_id = %batch_id, test_id = %test_id, passed, "batch pass check");
        passed
    }

    /// Every record filed under `batch_id`, ordered by test id.
    pub fn results_for_batch(&self, batch_id: &BatchId) -> Vec<(&'a TestId, &'a TestRecord)> {
        self.ledger
            .records()
            .filter(|(_, record)| &record.batch_id == batch_id)
            .collect()
    }
}
