use qtl_types::{Principal, TestId};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("lab {0} is not registered")]
    NotFound(Principal),
    #[error("test {0} has already been recorded")]
    DuplicateTest(TestId),
    #[error("caller {0} is not a registered testing lab")]
    Unauthorized(Principal),
    #[error("lab {0} has been deactivated")]
    LabInactive(Principal),
    #[error("result code {0} is not one of fail (0), pass (1), inconclusive (2)")]
    InvalidResult(u32),
    #[error("caller {0} is not the administrator")]
    NotAdministrator(Principal),

    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to read state file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write state file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
}

impl LedgerError {
    /// Stable numeric code for the error.
    ///
    /// Admission and registry failures keep the codes the ledger has always reported, so hosts
    /// that switch on them keep working.
    pub fn code(&self) -> u32 {
        match self {
            LedgerError::DuplicateTest(_) => 100,
            LedgerError::InvalidResult(_) => 400,
            LedgerError::Unauthorized(_) => 401,
            LedgerError::LabInactive(_) => 403,
            LedgerError::NotFound(_) => 404,
            LedgerError::NotAdministrator(_) => 405,
            LedgerError::InvalidInput(_) => 422,
            LedgerError::FileRead(_)
            | LedgerError::FileWrite(_)
            | LedgerError::YamlSerialization(_)
            | LedgerError::YamlDeserialization(_) => 500,
        }
    }
}

impl From<qtl_types::TextError> for LedgerError {
    fn from(err: qtl_types::TextError) -> Self {
        LedgerError::InvalidInput(err.to_string())
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
