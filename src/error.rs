// src/error.rs
use thiserror::Error;

/// Caller-visible failure categories.
///
/// Everything that can go wrong during `analyze` (transport, empty body,
/// malformed JSON, endpoint-reported error) is collapsed into
/// `AnalysisFailed`; the message string is for display and logging only.
#[derive(Debug, Error)]
pub enum TriageError {
    /// The camera device refused access (permission denied or busy).
    #[error("camera access denied: {0}")]
    CaptureAccessDenied(String),
    /// Any failure while producing a triage report.
    #[error("analysis failed: {0}")]
    AnalysisFailed(String),
}

impl TriageError {
    pub fn analysis(err: impl std::fmt::Display) -> Self {
        TriageError::AnalysisFailed(err.to_string())
    }
}
