//! Caller identity and administrator privilege.
//!
//! Principals arrive already authenticated by the host. The core only needs one further
//! answer from the host: whether a given principal holds the administrator privilege.

use crate::config::CoreConfig;
use qtl_types::Principal;

/// Decides whether a caller may administer the lab registry.
pub trait AdminAuthority {
    fn is_administrator(&self, caller: &Principal) -> bool;
}

/// One fixed principal is the administrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SingleAdministrator(Principal);

impl SingleAdministrator {
    pub fn new(administrator: Principal) -> Self {
        Self(administrator)
    }
}

impl AdminAuthority for SingleAdministrator {
    fn is_administrator(&self, caller: &Principal) -> bool {
        &self.0 == caller
    }
}

impl AdminAuthority for CoreConfig {
    fn is_administrator(&self, caller: &Principal) -> bool {
        self.administrator() == caller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn single_administrator_matches_exact_principal() {
        let admin = Principal::new("ST1ADMIN").unwrap();
        let authority = SingleAdministrator::new(admin.clone());

        assert!(authority.is_administrator(&admin));
        assert!(!authority.is_administrator(&Principal::new("ST2LAB").unwrap()));
    }

    #[test]
    fn core_config_uses_configured_administrator() {
        let admin = Principal::new("ST1ADMIN").unwrap();
        let cfg = CoreConfig::new(admin.clone(), PathBuf::from("state.yaml")).unwrap();

        assert!(cfg.is_administrator(&admin));
        assert!(!cfg.is_administrator(&Principal::new("st1admin").unwrap()));
    }
}
