//! Verdict produced by the scoring engine

use serde::{Deserialize, Serialize};

/// Binary verdict label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictLabel {
    Truth,
    Lie,
}

impl VerdictLabel {
    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            VerdictLabel::Truth => "\x1b[32m", // Green
            VerdictLabel::Lie => "\x1b[31m",   // Red
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            VerdictLabel::Truth => "✅",
            VerdictLabel::Lie => "❌",
        }
    }
}

impl std::fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VerdictLabel::Truth => "TRUTH",
            VerdictLabel::Lie => "LIE",
        };
        write!(f, "{}", name)
    }
}

/// One tick's scoring outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: VerdictLabel,
    /// `max(lie_confidence, 100 - lie_confidence)`, always 50..=100
    pub confidence: u8,
    /// Share of the deception bucket, 0..=100
    pub lie_confidence: u8,
    pub dominant_expression: String,
    /// Bucket totals after jitter
    pub deception_score: f64,
    pub truth_score: f64,
}

impl Verdict {
    /// Label/confidence pair as exposed in snapshots
    pub fn summary(&self) -> VerdictSummary {
        VerdictSummary {
            label: self.label,
            confidence: self.confidence,
        }
    }
}

/// The part of a verdict a presentation layer needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictSummary {
    pub label: VerdictLabel,
    pub confidence: u8,
}
