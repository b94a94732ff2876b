// src/ai/connector.rs
use super::report::TriageReport;
use crate::capture::CapturedImage;
use crate::error::TriageError;

/// Trait defining the interface for vision triage backends
pub trait VisionTriage: Send + Sync {
    /// Analyze one image and return a structured triage report.
    ///
    /// Resolves exactly once, with a report or a failure. At most one call
    /// should be in flight per instance; the caller enforces this.
    fn analyze(&self, image: &CapturedImage) -> Result<TriageReport, TriageError>;
}
