//! # QTL Core
//!
//! Core logic for the quality test ledger: an authorization-gated registry where testing labs
//! vetted by a single administrator submit write-once quality test records for production
//! batches.
//!
//! The crate is built from three parts:
//! - [`labs::LabRegistry`]: which labs exist and whether they are active.
//! - [`ledger::TestResultLedger`]: the append-only record store and its admission rules.
//! - [`query::QueryFacade`]: public, read-only queries over admitted records.
//!
//! [`QualityService`] bundles them behind a cloneable, thread-safe handle.
//!
//! **No transport concerns**: authenticating callers, provisioning the administrator and
//! exposing these operations over a CLI or RPC belong to the host.

pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod labs;
pub mod ledger;
pub mod outcome;
pub mod query;
pub mod state;
mod unique_keys;

pub use config::CoreConfig;
pub use error::{LedgerError, LedgerResult};
pub use identity::{AdminAuthority, SingleAdministrator};
pub use labs::{LabEntry, LabRegistry};
pub use ledger::{TestRecord, TestResultLedger};
pub use outcome::TestOutcome;
pub use query::QueryFacade;
pub use state::LedgerState;

pub use qtl_clock::{LogicalClock, Ordinal};
pub use qtl_types::{BatchId, NonEmptyText, Principal, TestId, TextError};

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared handle over one deployment's ledger state.
///
/// Mutations take an exclusive lock over both stores, so each operation is applied
/// atomically and the admission guard order holds under concurrent callers. Reads take a
/// shared lock and see a consistent snapshot.
#[derive(Clone)]
pub struct QualityService {
    cfg: Arc<CoreConfig>,
    clock: Arc<dyn LogicalClock>,
    state: Arc<RwLock<LedgerState>>,
}

impl std::fmt::Debug for QualityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityService")
            .field("cfg", &self.cfg)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl QualityService {
    /// Creates a service over empty state.
    pub fn new(cfg: Arc<CoreConfig>, clock: Arc<dyn LogicalClock>) -> Self {
        Self::with_state(cfg, clock, LedgerState::new())
    }

    pub fn with_state(
        cfg: Arc<CoreConfig>,
        clock: Arc<dyn LogicalClock>,
        state: LedgerState,
    ) -> Self {
        Self {
            cfg,
            clock,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Creates a service over the snapshot at the configured state file.
    pub fn load(cfg: Arc<CoreConfig>, clock: Arc<dyn LogicalClock>) -> LedgerResult<Self> {
        let state = LedgerState::load(cfg.state_file())?;
        Ok(Self::with_state(cfg, clock, state))
    }

    /// Writes the current state to the configured state file.
    pub fn save(&self) -> LedgerResult<()> {
        self.read().save(self.cfg.state_file())
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> LedgerState {
        self.read().clone()
    }

    /// See [`LabRegistry::add_lab`].
    pub fn add_lab(
        &self,
        caller: &Principal,
        lab: Principal,
        name: impl Into<String>,
    ) -> LedgerResult<()> {
        self.write().labs.add_lab(&*self.cfg, caller, lab, name)
    }

    /// See [`LabRegistry::deactivate_lab`].
    pub fn deactivate_lab(&self, caller: &Principal, lab: &Principal) -> LedgerResult<()> {
        self.write().labs.deactivate_lab(&*self.cfg, caller, lab)
    }

    pub fn is_active(&self, lab: &Principal) -> bool {
        self.read().labs.is_active(lab)
    }

    pub fn get_lab(&self, lab: &Principal) -> Option<LabEntry> {
        self.read().labs.get_lab(lab).cloned()
    }

    pub fn labs(&self) -> Vec<(Principal, LabEntry)> {
        self.read()
            .labs
            .labs()
            .map(|(p, e)| (p.clone(), e.clone()))
            .collect()
    }

    /// See [`TestResultLedger::record_result`].
    pub fn record_result(
        &self,
        caller: &Principal,
        test_id: TestId,
        batch_id: BatchId,
        result: u32,
        parameters: impl Into<String>,
    ) -> LedgerResult<()> {
        let mut guard = self.write();
        let LedgerState { labs, ledger } = &mut *guard;
        ledger.record_result(
            labs,
            &*self.clock,
            caller,
            test_id,
            batch_id,
            result,
            parameters,
        )
    }

    /// See [`QueryFacade::get_result`].
    pub fn get_result(&self, test_id: &TestId) -> Option<TestRecord> {
        let guard = self.read();
        QueryFacade::new(&guard.ledger).get_result(test_id).cloned()
    }

    /// See [`QueryFacade::is_batch_passed`].
    pub fn is_batch_passed(&self, batch_id: &BatchId, test_id: &TestId) -> bool {
        let guard = self.read();
        QueryFacade::new(&guard.ledger).is_batch_passed(batch_id, test_id)
    }

    /// See [`QueryFacade::results_for_batch`].
    pub fn results_for_batch(&self, batch_id: &BatchId) -> Vec<(TestId, TestRecord)> {
        let guard = self.read();
        QueryFacade::new(&guard.ledger)
            .results_for_batch(batch_id)
            .into_iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    // A panic while holding the lock cannot leave a half-applied operation behind: every
    // mutation validates first and then performs a single insert or flag write.
    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
