//! Log-pattern trigger sets for backend state detection
//!
//! The worker infers backend readiness and failure by matching substrings
//! against the backend's log stream. Three disjoint pattern sets classify a
//! line as ready, error, or informational.

use serde::{Deserialize, Serialize};

/// Event class inferred from a backend log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEvent {
    /// The backend has finished loading and is ready to serve
    Ready,
    /// The backend hit a fatal or degrading condition
    Error,
    /// Progress worth surfacing, no state change
    Info,
}

/// Log-pattern trigger sets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogActionConfig {
    /// Substrings that mark the backend as ready
    pub on_load: Vec<String>,

    /// Substrings that mark a backend error
    pub on_error: Vec<String>,

    /// Substrings logged as informational progress
    pub on_info: Vec<String>,
}

impl LogActionConfig {
    /// Create trigger sets from pattern slices
    pub fn new<S: Into<String> + Clone>(on_load: &[S], on_error: &[S], on_info: &[S]) -> Self {
        Self {
            on_load: on_load.iter().cloned().map(Into::into).collect(),
            on_error: on_error.iter().cloned().map(Into::into).collect(),
            on_info: on_info.iter().cloned().map(Into::into).collect(),
        }
    }

    /// Classify a log line against the trigger sets.
    ///
    /// Error patterns win over ready patterns, ready over info, so a line
    /// matching several sets resolves to the most severe class.
    pub fn classify(&self, line: &str) -> Option<LogEvent> {
        if self.on_error.iter().any(|p| line.contains(p.as_str())) {
            return Some(LogEvent::Error);
        }
        if self.on_load.iter().any(|p| line.contains(p.as_str())) {
            return Some(LogEvent::Ready);
        }
        if self.on_info.iter().any(|p| line.contains(p.as_str())) {
            return Some(LogEvent::Info);
        }
        None
    }

    /// Check that the three sets share no pattern
    pub fn is_disjoint(&self) -> bool {
        self.overlapping_patterns().is_empty()
    }

    /// Patterns that appear in more than one set
    pub fn overlapping_patterns(&self) -> Vec<&str> {
        let mut overlap = Vec::new();
        for p in &self.on_load {
            if self.on_error.contains(p) || self.on_info.contains(p) {
                overlap.push(p.as_str());
            }
        }
        for p in &self.on_error {
            if self.on_info.contains(p) {
                overlap.push(p.as_str());
            }
        }
        overlap
    }
}
