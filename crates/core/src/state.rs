//! Owned ledger state and its YAML snapshot.
//!
//! [`LedgerState`] bundles the two stores so a host can construct them once, hand them to
//! [`crate::QualityService`], and dump or restore them between runs. The snapshot is a plain
//! serde document; it makes no durability promises.

use crate::constants::STATE_FORMAT_VERSION;
use crate::labs::LabRegistry;
use crate::ledger::TestResultLedger;
use crate::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerState {
    pub labs: LabRegistry,
    pub ledger: TestResultLedger,
}

#[derive(Deserialize)]
struct StateDocument {
    version: u32,
    #[serde(default)]
    labs: LabRegistry,
    #[serde(default)]
    tests: TestResultLedger,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a snapshot from `path`. A missing file yields empty state.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::FileRead`] if the file exists but cannot be read.
    /// - [`LedgerError::YamlDeserialization`] if the document is malformed.
    /// - [`LedgerError::InvalidInput`] if the document was written by an unknown format version.
    pub fn load(path: &Path) -> LedgerResult<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no state file, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(LedgerError::FileRead(e)),
        };

        let doc: StateDocument =
            serde_yaml::from_str(&contents).map_err(LedgerError::YamlDeserialization)?;
        if doc.version != STATE_FORMAT_VERSION {
            return Err(LedgerError::InvalidInput(format!(
                "unsupported state file version {} (expected {})",
                doc.version, STATE_FORMAT_VERSION
            )));
        }

        tracing::debug!(
            path = %path.display(),
            labs = doc.labs.len(),
            tests = doc.tests.len(),
            "state loaded"
        );
        Ok(Self {
            labs: doc.labs,
            ledger: doc.tests,
        })
    }

    /// Writes a snapshot to `path`, replacing any existing file.
    ///
    /// The document is written to a sibling temporary file first and then renamed over `path`.
    pub fn save(&self, path: &Path) -> LedgerResult<()> {
        #[derive(Serialize)]
        struct StateDocumentRef<'a> {
            version: u32,
            labs: &'a LabRegistry,
            tests: &'a TestResultLedger,
        }

        let yaml = serde_yaml::to_string(&StateDocumentRef {
            version: STATE_FORMAT_VERSION,
            labs: &self.labs,
            tests: &self.ledger,
        })
        .map_err(LedgerError::YamlSerialization)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(LedgerError::FileWrite)?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, yaml).map_err(LedgerError::FileWrite)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(LedgerError::FileWrite(e));
        }

        tracing::debug!(path = %path.display(), "state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SingleAdministrator;
    use qtl_clock::FixedClock;
    use qtl_types::{BatchId, Principal, TestId};
    use tempfile::TempDir;

    fn populated_state() -> LedgerState {
        let admin = Principal::new("ST1ADMIN").unwrap();
        let lab = Principal::new("ST1LAB").unwrap();
        let authority = SingleAdministrator::new(admin.clone());

        let mut state = LedgerState::new();
        state
            .labs
            .add_lab(&authority, &admin, lab.clone(), "Current Lab")
            .unwrap();
        state
            .labs
            .add_lab(
                &authority,
                &admin,
                Principal::new("ST2RETIRED").unwrap(),
                "Retired Lab",
            )
            .unwrap();
        state
            .labs
            .deactivate_lab(&authority, &admin, &Principal::new("ST2RETIRED").unwrap())
            .unwrap();
        state
            .ledger
            .record_result(
                &state.labs,
                &FixedClock::new(123),
                &lab,
                TestId::new("TEST123").unwrap(),
                BatchId::new("BATCH456").unwrap(),
                1,
                "Compression strength: 50MPa",
            )
            .unwrap();
        state
    }

    #[test]
    fn missing_file_loads_empty_state() {
        let dir = TempDir::new().unwrap();
        let state = LedgerState::load(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(state, LedgerState::new());
    }

    #[test]
    fn saved_state_loads_back_identically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.yaml");
        let state = populated_state();

        state.save(&path).unwrap();
        let loaded = LedgerState::load(&path).unwrap();

        assert_eq!(loaded, state);
        assert!(!loaded.labs.is_active(&Principal::new("ST2RETIRED").unwrap()));
    }

    #[test]
    fn snapshot_uses_readable_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.yaml");
        populated_state().save(&path).unwrap();

        let yaml = fs::read_to_string(&path).unwrap();
        assert!(yaml.contains("version: 1"));
        assert!(yaml.contains("TEST123"));
        assert!(yaml.contains("result: pass"));
        assert!(yaml.contains("is_active: false"));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.yaml");
        fs::write(&path, "version: 99\nlabs: {}\ntests: {}\n").unwrap();

        let err = LedgerState::load(&path).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[test]
    fn malformed_document_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.yaml");
        fs::write(&path, "version: 1\ntests:\n  T1:\n    result: maybe\n").unwrap();

        let err = LedgerState::load(&path).unwrap_err();
        assert!(matches!(err, LedgerError::YamlDeserialization(_)));
    }

    #[test]
    fn repeated_test_id_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.yaml");
        let record = "    batch_id: B1\n    lab: ST1LAB\n    submitted_at: 1\n    result: pass\n    parameters: ''\n";
        fs::write(
            &path,
            format!("version: 1\nlabs: {{}}\ntests:\n  T1:\n{record}  T1:\n{record}"),
        )
        .unwrap();

        let err = LedgerState::load(&path).unwrap_err();
        assert!(matches!(err, LedgerError::YamlDeserialization(_)));
    }

    #[test]
    fn repeated_lab_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.yaml");
        fs::write(
            &path,
            "version: 1\nlabs:\n  ST1LAB:\n    name: A\n    is_active: false\n  ST1LAB:\n    name: B\n    is_active: true\n",
        )
        .unwrap();

        let err = LedgerState::load(&path).unwrap_err();
        assert!(matches!(err, LedgerError::YamlDeserialization(_)));
    }

    #[test]
    fn padded_ids_load_as_separate_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.yaml");
        let mut state = populated_state();
        state
            .ledger
            .record_result(
                &state.labs,
                &FixedClock::new(124),
                &Principal::new("ST1LAB").unwrap(),
                TestId::new(" TEST123").unwrap(),
                BatchId::new("BATCH456").unwrap(),
                0,
                "",
            )
            .unwrap();

        state.save(&path).unwrap();
        let loaded = LedgerState::load(&path).unwrap();

        assert_eq!(loaded.ledger.len(), 2);
        assert_eq!(loaded, state);
    }

    #[test]
    fn failed_save_leaves_no_temporary_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.yaml");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "").unwrap();

        let err = populated_state().save(&path).unwrap_err();

        assert!(matches!(err, LedgerError::FileWrite(_)));
        assert!(!dir.path().join("state.yaml.tmp").exists());
        assert!(path.is_dir());
    }
}
