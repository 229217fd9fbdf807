//! Scoring Engine: weighted rule table → verdict
//!
//! deception/truth buckets accumulate matching rule weights plus jitter,
//! lie_confidence = round(100 * deception / total), ties (total == 0) → 50.

use rand::Rng;

use crate::types::{
    Bucket, Channel, ExpressionBaseline, RuleTable, Sample, SessionAggregates, Verdict,
    VerdictLabel,
};
use crate::{NEUTRAL_EXPRESSION, TIE_LIE_CONFIDENCE};

/// Bucket totals before normalization
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreBuckets {
    pub deception: f64,
    pub truth: f64,
}

impl ScoreBuckets {
    fn add(&mut self, bucket: Bucket, weight: f64) {
        match bucket {
            Bucket::Deception => self.deception += weight,
            Bucket::Truth => self.truth += weight,
        }
    }
}

/// Stateless evaluator over a rule table
#[derive(Debug, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate one tick. `rng` only feeds the jitter.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        sample: &Sample,
        agg: &SessionAggregates,
        table: &RuleTable,
        rng: &mut R,
    ) -> Verdict {
        let mut buckets = self.rule_scores(sample, agg, table);

        if table.jitter > 0.0 {
            buckets.deception += rng.gen_range(0.0..=table.jitter);
            buckets.truth += rng.gen_range(0.0..=table.jitter);
        }

        let dominant_expression = self.dominant_expression(sample, agg, table);
        verdict_from_scores(buckets, dominant_expression)
    }

    /// Sum of matching rule weights per bucket, no jitter
    pub fn rule_scores(&self, sample: &Sample, agg: &SessionAggregates, table: &RuleTable) -> ScoreBuckets {
        let mut buckets = ScoreBuckets::default();
        for rule in &table.rules {
            if rule.predicate.holds(sample, agg) {
                buckets.add(rule.bucket, rule.weight);
            }
        }
        buckets
    }

    /// Baseline tag, then every matching override in order; the last match wins
    pub fn dominant_expression(&self, sample: &Sample, agg: &SessionAggregates, table: &RuleTable) -> String {
        let mut tag = match &table.baseline {
            ExpressionBaseline::Fixed(tag) => tag.clone(),
            ExpressionBaseline::SampledExpression => sample
                .expression
                .map(|e| e.as_str())
                .unwrap_or(NEUTRAL_EXPRESSION)
                .to_string(),
            ExpressionBaseline::StrongestEmotion => strongest_emotion(sample)
                .map(|c| c.as_str())
                .unwrap_or(NEUTRAL_EXPRESSION)
                .to_string(),
        };

        for rule in &table.overrides {
            if rule.predicate.holds(sample, agg) {
                tag = rule.tag.clone();
            }
        }
        tag
    }
}

/// Emotion channel with the highest intensity; first listed wins ties
fn strongest_emotion(sample: &Sample) -> Option<Channel> {
    let mut best: Option<(Channel, f64)> = None;
    for channel in Channel::EMOTIONS {
        if let Some(value) = sample.intensity(channel) {
            if best.map_or(true, |(_, b)| value > b) {
                best = Some((channel, value));
            }
        }
    }
    best.map(|(channel, _)| channel)
}

/// Percentage share of the deception bucket, 50 when both are zero or the total is not finite
pub fn lie_confidence(buckets: ScoreBuckets) -> u8 {
    let total = buckets.deception + buckets.truth;
    if !(total > 0.0 && total.is_finite()) {
        return TIE_LIE_CONFIDENCE;
    }
    (100.0 * buckets.deception / total).round().clamp(0.0, 100.0) as u8
}

/// Turn bucket totals into a verdict
pub fn verdict_from_scores(buckets: ScoreBuckets, dominant_expression: String) -> Verdict {
    let lie = lie_confidence(buckets);
    let label = if lie > 50 { VerdictLabel::Lie } else { VerdictLabel::Truth };
    Verdict {
        label,
        confidence: lie.max(100 - lie),
        lie_confidence: lie,
        dominant_expression,
        deception_score: buckets.deception,
        truth_score: buckets.truth,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::profiles::RuleProfile;
    use crate::types::{
        Expression, ExpressionOverride, Gaze, MicroExpression, Predicate, Rule,
    };
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn agg(rate: u32) -> SessionAggregates {
        SessionAggregates {
            blink_count: rate,
            elapsed_minutes: 1.0,
            blink_rate: rate,
        }
    }

    fn fixed(tag: &str) -> ExpressionBaseline {
        ExpressionBaseline::Fixed(tag.to_string())
    }

    #[test]
    fn test_sixty_forty_is_lie_sixty() {
        let v = verdict_from_scores(ScoreBuckets { deception: 60.0, truth: 40.0 }, "neutral".into());
        assert_eq!(v.lie_confidence, 60);
        assert_eq!(v.label, VerdictLabel::Lie);
        assert_eq!(v.confidence, 60);
    }

    #[test]
    fn test_zero_total_ties_to_truth_fifty() {
        let v = verdict_from_scores(ScoreBuckets::default(), "neutral".into());
        assert_eq!(v.lie_confidence, 50);
        assert_eq!(v.confidence, 50);
        assert_eq!(v.label, VerdictLabel::Truth);
    }

    #[test]
    fn test_exact_half_is_truth() {
        let v = verdict_from_scores(ScoreBuckets { deception: 30.0, truth: 30.0 }, "x".into());
        assert_eq!(v.label, VerdictLabel::Truth);
        assert_eq!(v.confidence, 50);
    }

    #[test]
    fn test_truth_majority() {
        let v = verdict_from_scores(ScoreBuckets { deception: 10.0, truth: 90.0 }, "x".into());
        assert_eq!(v.lie_confidence, 10);
        assert_eq!(v.label, VerdictLabel::Truth);
        assert_eq!(v.confidence, 90);
    }

    #[test]
    fn test_steady_blink_rule_adds_twenty() {
        let table = RuleTable::new(
            vec![Rule::truth("steady blinking", Predicate::BlinkRateBetween { min: 15, max: 25 }, 20.0)],
            0.0,
            fixed("neutral"),
        );
        let agg = SessionAggregates::compute(18, 1.0, 40);
        let sample = Sample::new(0, Utc::now(), Gaze::Center);
        let scores = ScoringEngine::new().rule_scores(&sample, &agg, &table);
        assert_eq!(agg.blink_rate, 18);
        assert_eq!(scores.truth, 20.0);
        assert_eq!(scores.deception, 0.0);
    }

    #[test]
    fn test_rules_accumulate_without_jitter() {
        let table = RuleTable::new(
            vec![
                Rule::deception("averted", Predicate::GazeIn { gazes: vec![Gaze::Avoidant] }, 35.0),
                Rule::deception("darting", Predicate::ChannelAbove { channel: Channel::EyeMovement, threshold: 7.0 }, 25.0),
                Rule::truth("steady", Predicate::BlinkRateBetween { min: 15, max: 25 }, 40.0),
            ],
            0.0,
            fixed("neutral"),
        );
        let sample = Sample::new(0, Utc::now(), Gaze::Avoidant).with_intensity(Channel::EyeMovement, 8.0);
        let mut rng = StdRng::seed_from_u64(0);
        let v = ScoringEngine::new().evaluate(&sample, &agg(20), &table, &mut rng);
        assert_eq!(v.deception_score, 60.0);
        assert_eq!(v.truth_score, 40.0);
        assert_eq!(v.label, VerdictLabel::Lie);
        assert_eq!(v.confidence, 60);
    }

    #[test]
    fn test_jitter_bounded() {
        let table = RuleTable::new(Vec::new(), 15.0, fixed("neutral"));
        let sample = Sample::new(0, Utc::now(), Gaze::Center);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let v = ScoringEngine::new().evaluate(&sample, &agg(0), &table, &mut rng);
            assert!(v.deception_score >= 0.0 && v.deception_score <= 15.0);
            assert!(v.truth_score >= 0.0 && v.truth_score <= 15.0);
            assert!(v.confidence >= 50 && v.confidence <= 100);
        }
    }

    #[test]
    fn test_later_override_wins() {
        let table = RuleTable::new(Vec::new(), 0.0, fixed("neutral")).with_overrides(vec![
            ExpressionOverride::new(Predicate::Always, "first"),
            ExpressionOverride::new(Predicate::GazeIn { gazes: vec![Gaze::Left] }, "never"),
            ExpressionOverride::new(Predicate::Always, "last"),
        ]);
        let sample = Sample::new(0, Utc::now(), Gaze::Center);
        let tag = ScoringEngine::new().dominant_expression(&sample, &agg(0), &table);
        assert_eq!(tag, "last");
    }

    #[test]
    fn test_no_override_keeps_baseline() {
        let table = RuleTable::new(Vec::new(), 0.0, ExpressionBaseline::SampledExpression);
        let mut sample = Sample::new(0, Utc::now(), Gaze::Center);
        sample.expression = Some(Expression::Surprised);
        assert_eq!(ScoringEngine::new().dominant_expression(&sample, &agg(0), &table), "surprised");

        sample.expression = None;
        assert_eq!(ScoringEngine::new().dominant_expression(&sample, &agg(0), &table), "neutral");
    }

    #[test]
    fn test_strongest_emotion_baseline() {
        let table = RuleTable::new(Vec::new(), 0.0, ExpressionBaseline::StrongestEmotion);
        let sample = Sample::new(0, Utc::now(), Gaze::Center)
            .with_intensity(Channel::Happy, 0.2)
            .with_intensity(Channel::Fearful, 0.9)
            .with_intensity(Channel::ApparentAge, 50.0);
        assert_eq!(ScoringEngine::new().dominant_expression(&sample, &agg(0), &table), "fearful");
    }

    #[test]
    fn test_basic_profile_weights() {
        let table = &RuleProfile::Basic.definition().rules;
        let mut sample = Sample::new(0, Utc::now(), Gaze::Center);
        sample.expression = Some(Expression::Neutral);
        sample.micro_expression = Some(MicroExpression::EyebrowFlash);
        let scores = ScoringEngine::new().rule_scores(&sample, &agg(0), table);
        assert_eq!(scores.truth, 55.0);
        assert_eq!(scores.deception, 0.0);

        sample.expression = Some(Expression::Fearful);
        sample.micro_expression = Some(MicroExpression::ForcedSmile);
        let scores = ScoringEngine::new().rule_scores(&sample, &agg(0), table);
        assert_eq!(scores.deception, 70.0);
        assert_eq!(scores.truth, 0.0);
    }

    #[test]
    fn test_enhanced_override_precedence() {
        let table = &RuleProfile::Enhanced.definition().rules;
        let sample = Sample::new(0, Utc::now(), Gaze::Avoidant)
            .with_intensity(Channel::EyeMovement, 9.0)
            .with_intensity(Channel::FacialAsymmetry, 0.0)
            .with_intensity(Channel::LipTension, 0.9);
        // tense, nervous and evasive all match; evasive is listed last
        assert_eq!(ScoringEngine::new().dominant_expression(&sample, &agg(20), table), "evasive");
    }

    #[test]
    fn test_non_finite_total_ties() {
        let buckets = ScoreBuckets { deception: f64::INFINITY, truth: 1.0 };
        assert_eq!(lie_confidence(buckets), 50);
    }
}
