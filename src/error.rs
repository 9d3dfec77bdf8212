use thiserror::Error;

use crate::sheets::SheetsError;

/// Outcome classes of the report pipeline. Handlers match on these to pick
/// the user-facing reply; everything else is logged and surfaced generically.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Phone number could not be normalized")]
    InvalidPhone,
    #[error("Client directory is unreachable: {0}")]
    DirectoryUnreachable(#[source] SheetsError),
    #[error("Phone number is not present in the client directory")]
    NotRegistered,
    #[error("A report for this phone number is already being prepared")]
    AlreadyProcessing,
    #[error("Spreadsheet operation failed: {0}")]
    Sheet(#[from] SheetsError),
    #[error("Every export strategy failed: {0}")]
    ExportExhausted(String),
    #[error("User storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Token acquisition failures point at broken deployment configuration
    /// and get logged louder than ordinary request errors.
    pub fn is_credential(&self) -> bool {
        matches!(
            self,
            ReportError::Sheet(SheetsError::Credential(_))
                | ReportError::DirectoryUnreachable(SheetsError::Credential(_))
        )
    }
}
