//! Registry of testing labs allowed to submit results.
//!
//! Labs are vetted by the administrator. An entry is never removed once created; the
//! administrator can only flip it inactive, or re-add it.
//!
//! Two behaviours here look like bugs and are not:
//! - [`LabRegistry::add_lab`] on an existing lab overwrites it. This is how a deactivated lab
//!   is reactivated and how a lab is renamed.
//! - [`LabRegistry::deactivate_lab`] on an already inactive lab succeeds again. Only a lab that
//!   was never added is an error.

use crate::identity::AdminAuthority;
use crate::{LedgerError, LedgerResult};
use qtl_types::Principal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Registration details for one lab.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabEntry {
    /// Display name supplied by the administrator.
    pub name: String,
    /// Whether the lab may currently submit results.
    pub is_active: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabRegistry {
    #[serde(deserialize_with = "crate::unique_keys::deserialize")]
    labs: BTreeMap<Principal, LabEntry>,
}

impl LabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `lab` as an active lab named `name`.
    ///
    /// Any existing entry for `lab` is replaced, active or not.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAdministrator`] if `caller` does not hold the administrator
    /// privilege. Nothing is changed in that case.
    pub fn add_lab<A>(
        &mut self,
        authority: &A,
        caller: &Principal,
        lab: Principal,
        name: impl Into<String>,
    ) -> LedgerResult<()>
    where
        A: AdminAuthority + ?Sized,
    {
        require_administrator(authority, caller)?;

        let name = name.into();
        let replaced = self.labs.insert(
            lab.clone(),
            LabEntry {
                name: name.clone(),
                is_active: true,
            },
        );

        tracing::info!(
            lab = %lab,
            name = %name,
            reactivated = replaced.is_some_and(|prev| !prev.is_active),
            "lab added"
        );
        Ok(())
    }

    /// Marks `lab` inactive. Past records submitted by the lab are unaffected.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotAdministrator`] if `caller` is not the administrator.
    /// - [`LedgerError::NotFound`] if `lab` was never added.
    pub fn deactivate_lab<A>(
        &mut self,
        authority: &A,
        caller: &Principal,
        lab: &Principal,
    ) -> LedgerResult<()>
    where
        A: AdminAuthority + ?Sized,
    {
        require_administrator(authority, caller)?;

        let Some(entry) = self.labs.get_mut(lab) else {
            tracing::warn!(lab = %lab, code = 404, "deactivate rejected: lab not registered");
            return Err(LedgerError::NotFound(lab.clone()));
        };

        entry.is_active = false;
        tracing::info!(lab = %lab, "lab deactivated");
        Ok(())
    }

    /// Returns true if `lab` is registered and active. Unknown labs are inactive.
    pub fn is_active(&self, lab: &Principal) -> bool {
        self.labs.get(lab).is_some_and(|entry| entry.is_active)
    }

    pub fn get_lab(&self, lab: &Principal) -> Option<&LabEntry> {
        self.labs.get(lab)
    }

    /// Iterates over every registered lab, ordered by principal.
    pub fn labs(&self) -> impl Iterator<Item = (&Principal, &LabEntry)> {
        self.labs.iter()
    }

    pub fn len(&self) -> usize {
        self.labs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labs.is_empty()
    }
}

fn require_administrator<A>(authority: &A, caller: &Principal) -> LedgerResult<()>
where
    A: AdminAuthority + ?Sized,
{
    if authority.is_administrator(caller) {
        return Ok(());
    }
    tracing::warn!(caller = %caller, code = 405, "registry change rejected: not administrator");
    Err(LedgerError::NotAdministrator(caller.clone()))
}
