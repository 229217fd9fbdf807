//! Read-only session snapshot handed to presentation layers

use serde::{Deserialize, Serialize};

use crate::types::{AnalysisRecord, Gaze, SessionPhase, VerdictSummary};

/// State exposed after every tick and on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// None until the first tick after `start()`
    pub verdict: Option<VerdictSummary>,
    pub dominant_expression: Option<String>,
    pub blink_rate: u32,
    pub gaze: Option<Gaze>,
    /// Newest first
    pub history: Vec<AnalysisRecord>,
    pub tick_count: u64,
    /// Set when capture failed and the session was halted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

impl SessionSnapshot {
    pub fn latest(&self) -> Option<&AnalysisRecord> {
        self.history.first()
    }
}
