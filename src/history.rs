// src/history.rs
use chrono::{DateTime, Local};
use log::info;

use crate::ai::report::TriageReport;
use crate::capture::CapturedImage;

/// One completed analysis, kept for the life of the session. Never mutated
/// after insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: u64,
    pub captured_at: DateTime<Local>,
    pub image: CapturedImage,
    pub report: TriageReport,
}

/// Reverse-chronological log of completed analyses.
///
/// Entries are appended on success only and removed only by `clear`. Nothing
/// is persisted beyond the running session.
#[derive(Debug, Default)]
pub struct SessionHistory {
    entries: Vec<HistoryEntry>,
    next_id: u64,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a fresh entry for a completed analysis and return its id.
    pub fn record(&mut self, image: CapturedImage, report: TriageReport) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            0,
            HistoryEntry {
                id,
                captured_at: Local::now(),
                image,
                report,
            },
        );
        info!("Recorded history entry {} ({} total)", id, self.entries.len());
        id
    }

    /// Most recent first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: u64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::SessionHistory;
    use crate::ai::report::{TriageReport, Urgency};
    use crate::capture::CapturedImage;
    use pretty_assertions::assert_eq;

    fn report(diagnosis: &str) -> TriageReport {
        TriageReport {
            diagnosis: diagnosis.to_string(),
            differential_diagnosis: vec!["Cellulitis".to_string()],
            reasoning: "Crusted plaques.".to_string(),
            recommendations: vec!["Bacterial culture".to_string()],
            urgency: Urgency::Medium,
        }
    }

    #[test]
    fn entries_are_ordered_most_recent_first() {
        let mut history = SessionHistory::new();
        history.record(CapturedImage::new(vec![1], "image/jpeg"), report("Impetigo"));
        history.record(CapturedImage::new(vec![2], "image/jpeg"), report("Eczema"));
        history.record(CapturedImage::new(vec![3], "image/jpeg"), report("Psoriasis"));

        assert_eq!(history.len(), 3);
        let diagnoses: Vec<&str> = history
            .entries()
            .iter()
            .map(|entry| entry.report.diagnosis.as_str())
            .collect();
        assert_eq!(diagnoses, vec!["Psoriasis", "Eczema", "Impetigo"]);
    }

    #[test]
    fn ids_are_unique_across_entries() {
        let mut history = SessionHistory::new();
        let first = history.record(CapturedImage::new(vec![1], "image/jpeg"), report("A"));
        let second = history.record(CapturedImage::new(vec![2], "image/jpeg"), report("B"));
        assert_ne!(first, second);
    }

    #[test]
    fn get_restores_the_exact_stored_entry() {
        let mut history = SessionHistory::new();
        let image = CapturedImage::new(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg");
        let stored_report = report("Impetigo");
        let id = history.record(image.clone(), stored_report.clone());

        let entry = history.get(id).expect("entry");
        assert_eq!(entry.image, image);
        assert_eq!(entry.report, stored_report);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut history = SessionHistory::new();
        history.record(CapturedImage::new(vec![1], "image/jpeg"), report("A"));

        history.clear();
        assert!(history.is_empty());
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn ids_keep_growing_after_clear() {
        let mut history = SessionHistory::new();
        let first = history.record(CapturedImage::new(vec![1], "image/jpeg"), report("A"));
        history.clear();
        let second = history.record(CapturedImage::new(vec![2], "image/jpeg"), report("B"));
        assert!(second > first);
    }
}
