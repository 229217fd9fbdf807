//! History records and their terminal rendering

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Channel, Gaze, MicroExpression, Sample, SessionAggregates, Verdict};

/// Compact view of the sample behind a verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub blink_rate: u32,
    pub gaze: Gaze,
    pub intensities: BTreeMap<Channel, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub micro_expression: Option<MicroExpression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion: Option<f64>,
}

impl SampleSummary {
    pub fn new(sample: &Sample, agg: &SessionAggregates) -> Self {
        Self {
            blink_rate: agg.blink_rate,
            gaze: sample.gaze,
            intensities: sample.intensities.clone(),
            micro_expression: sample.micro_expression,
            motion: sample.motion.map(|m| m.magnitude()),
        }
    }
}

/// Immutable snapshot of one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub timestamp: DateTime<Utc>,
    pub tick: u64,
    pub verdict: Verdict,
    pub sample: SampleSummary,
}

impl AnalysisRecord {
    pub fn new(sample: &Sample, agg: &SessionAggregates, verdict: Verdict) -> Self {
        Self {
            timestamp: sample.captured_at,
            tick: sample.tick,
            verdict,
            sample: SampleSummary::new(sample, agg),
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let label = self.verdict.label;
        format!(
            "{}{} #{} {} {}% | expr={} | blink={}/min | gaze={}{}",
            label.color_code(),
            label.emoji(),
            self.tick,
            label,
            self.verdict.confidence,
            self.verdict.dominant_expression,
            self.sample.blink_rate,
            self.sample.gaze,
            crate::types::SessionPhase::color_reset()
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "tick={} | time={} | verdict={} | confidence={} | expr={} | blink={} | gaze={}",
            self.tick,
            self.timestamp.format("%H:%M:%S"),
            self.verdict.label,
            self.verdict.confidence,
            self.verdict.dominant_expression,
            self.sample.blink_rate,
            self.sample.gaze
        )
    }
}
