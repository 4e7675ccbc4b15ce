// SPDX-License-Identifier: GPL-3.0-only

//! Scanner delegate
//!
//! The scanner reports outcomes only through its delegate. At most one of
//! the two methods is called, at most once, per scanner instance.

use serde::Serialize;

/// Receiver of scan outcomes
pub trait ScannerDelegate {
    /// A new disarm code was scanned (register mode)
    fn send_code(&mut self, value: String);

    /// The scanned code matched the stored one (verify mode)
    fn stop_alarm(&mut self);
}

/// What a finished scan produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanOutcome {
    CodeSet { code: String, at: String },
    AlarmStopped { at: String },
}

/// Delegate that keeps the outcome for the caller
#[derive(Debug, Default)]
pub struct OutcomeRecorder {
    outcome: Option<ScanOutcome>,
}

impl OutcomeRecorder {
    pub fn outcome(&self) -> Option<&ScanOutcome> {
        self.outcome.as_ref()
    }

    pub fn into_outcome(self) -> Option<ScanOutcome> {
        self.outcome
    }
}

fn timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}

impl ScannerDelegate for OutcomeRecorder {
    fn send_code(&mut self, value: String) {
        self.outcome = Some(ScanOutcome::CodeSet {
            code: value,
            at: timestamp(),
        });
    }

    fn stop_alarm(&mut self) {
        self.outcome = Some(ScanOutcome::AlarmStopped { at: timestamp() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_keeps_code() {
        let mut recorder = OutcomeRecorder::default();
        assert!(recorder.outcome().is_none());

        recorder.send_code("ABC123".to_string());
        match recorder.into_outcome() {
            Some(ScanOutcome::CodeSet { code, at }) => {
                assert_eq!(code, "ABC123");
                assert!(!at.is_empty());
            }
            other => panic!("Expected CodeSet, got {:?}", other),
        }
    }

    #[test]
    fn test_outcome_json_is_tagged() {
        let outcome = ScanOutcome::AlarmStopped {
            at: "2026-01-01T07:00:00+00:00".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["event"], "alarm_stopped");
        assert_eq!(json["at"], "2026-01-01T07:00:00+00:00");
    }
}
