// src/state.rs
use crate::ai::report::TriageReport;
use crate::capture::CapturedImage;
use crate::history::HistoryEntry;

/// Caller-side lifecycle of a single analysis.
///
/// Each transition consumes the current state and produces a new value.
/// Transitions that are not legal from the current state return it unchanged,
/// so a late worker result after a discard is silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum TriageState {
    /// No image selected.
    Idle,
    /// Image captured or uploaded, not yet analyzed.
    ImageReady { image: CapturedImage },
    /// Request in flight. The only state from which the analyze operation
    /// has been invoked; re-entry is a no-op.
    Analyzing { image: CapturedImage },
    /// Result available.
    Resolved {
        image: CapturedImage,
        report: TriageReport,
    },
    /// Error available. The image is kept so the user can retry.
    Failed {
        image: CapturedImage,
        message: String,
    },
}

impl TriageState {
    /// A new capture replaces whatever was shown, unless a request is in
    /// flight.
    pub fn select_image(self, image: CapturedImage) -> TriageState {
        match self {
            TriageState::Analyzing { .. } => self,
            _ => TriageState::ImageReady { image },
        }
    }

    /// Move into `Analyzing`. Legal only from `ImageReady`.
    pub fn begin_analysis(self) -> TriageState {
        match self {
            TriageState::ImageReady { image } => TriageState::Analyzing { image },
            other => other,
        }
    }

    pub fn complete(self, report: TriageReport) -> TriageState {
        match self {
            TriageState::Analyzing { image } => TriageState::Resolved { image, report },
            other => other,
        }
    }

    pub fn fail(self, message: impl Into<String>) -> TriageState {
        match self {
            TriageState::Analyzing { image } => TriageState::Failed {
                image,
                message: message.into(),
            },
            other => other,
        }
    }

    /// Drop the current image and result. From `Analyzing` this discards
    /// interest in the in-flight request; it does not cancel it.
    pub fn discard(self) -> TriageState {
        TriageState::Idle
    }

    /// Return the user to a failed image for another attempt.
    pub fn retry(self) -> TriageState {
        match self {
            TriageState::Failed { image, .. } => TriageState::ImageReady { image },
            other => other,
        }
    }

    /// Jump straight to `Resolved` with a stored history entry.
    pub fn restore(self, entry: &HistoryEntry) -> TriageState {
        match self {
            TriageState::Analyzing { .. } => self,
            _ => TriageState::Resolved {
                image: entry.image.clone(),
                report: entry.report.clone(),
            },
        }
    }

    pub fn is_analyzing(&self) -> bool {
        matches!(self, TriageState::Analyzing { .. })
    }

    pub fn can_analyze(&self) -> bool {
        matches!(self, TriageState::ImageReady { .. })
    }

    pub fn current_image(&self) -> Option<&CapturedImage> {
        match self {
            TriageState::Idle => None,
            TriageState::ImageReady { image }
            | TriageState::Analyzing { image }
            | TriageState::Resolved { image, .. }
            | TriageState::Failed { image, .. } => Some(image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TriageState;
    use crate::ai::report::{TriageReport, Urgency};
    use crate::capture::CapturedImage;
    use crate::history::SessionHistory;
    use pretty_assertions::assert_eq;

    fn image(tag: u8) -> CapturedImage {
        CapturedImage::new(vec![tag], "image/jpeg")
    }

    fn report() -> TriageReport {
        TriageReport {
            diagnosis: "Impetigo".to_string(),
            differential_diagnosis: vec![],
            reasoning: "Crusting.".to_string(),
            recommendations: vec![],
            urgency: Urgency::Low,
        }
    }

    #[test]
    fn happy_path_reaches_resolved() {
        let state = TriageState::Idle
            .select_image(image(1))
            .begin_analysis()
            .complete(report());
        assert!(matches!(state, TriageState::Resolved { .. }));
    }

    #[test]
    fn analysis_requires_a_ready_image() {
        assert_eq!(TriageState::Idle.begin_analysis(), TriageState::Idle);

        let resolved = TriageState::Resolved {
            image: image(1),
            report: report(),
        };
        assert!(matches!(
            resolved.begin_analysis(),
            TriageState::Resolved { .. }
        ));
    }

    #[test]
    fn reentering_analyzing_is_a_no_op() {
        let analyzing = TriageState::ImageReady { image: image(1) }.begin_analysis();
        let again = analyzing.clone().begin_analysis();
        assert_eq!(again, analyzing);
    }

    #[test]
    fn new_image_is_ignored_while_analyzing() {
        let analyzing = TriageState::ImageReady { image: image(1) }.begin_analysis();
        let state = analyzing.select_image(image(2));
        assert_eq!(state.current_image().expect("image").bytes, vec![1]);
        assert!(state.is_analyzing());
    }

    #[test]
    fn failure_keeps_the_image_for_retry() {
        let state = TriageState::ImageReady { image: image(1) }
            .begin_analysis()
            .fail("endpoint unreachable");
        assert_eq!(state.current_image().expect("image").bytes, vec![1]);

        let retried = state.retry();
        assert!(retried.can_analyze());
    }

    #[test]
    fn late_result_after_discard_is_dropped() {
        let discarded = TriageState::ImageReady { image: image(1) }
            .begin_analysis()
            .discard();
        assert_eq!(discarded, TriageState::Idle);

        // The worker resolves after the user lost interest.
        assert_eq!(discarded.complete(report()), TriageState::Idle);
        assert_eq!(TriageState::Idle.fail("late"), TriageState::Idle);
    }

    #[test]
    fn restoring_a_history_entry_resolves_with_stored_values() {
        let mut history = SessionHistory::new();
        let stored_image = image(7);
        let id = history.record(stored_image.clone(), report());
        let entry = history.get(id).expect("entry");

        let state = TriageState::Idle.restore(entry);
        match state {
            TriageState::Resolved { image, report } => {
                assert_eq!(image, stored_image);
                assert_eq!(report.diagnosis, "Impetigo");
            }
            other => panic!("expected Resolved, got {:?}", other),
        }
    }

    #[test]
    fn restore_is_blocked_while_analyzing() {
        let mut history = SessionHistory::new();
        let id = history.record(image(7), report());
        let entry = history.get(id).expect("entry");

        let analyzing = TriageState::ImageReady { image: image(1) }.begin_analysis();
        assert!(analyzing.restore(entry).is_analyzing());
    }
}
