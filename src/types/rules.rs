//! Rule-table data model
//!
//! Rules are data: a profile is nothing more than a signal model plus one of
//! these tables, so custom tables can be loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::types::{Channel, Expression, Gaze, MicroExpression, Region, Sample, SessionAggregates};

/// Score bucket a rule contributes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Deception,
    Truth,
}

/// Condition over a sample and the session aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Always,
    /// Inclusive on both ends
    BlinkRateBetween { min: u32, max: u32 },
    BlinkRateAbove { threshold: u32 },
    BlinkRateBelow { threshold: u32 },
    GazeIn { gazes: Vec<Gaze> },
    ChannelAbove { channel: Channel, threshold: f64 },
    ChannelBelow { channel: Channel, threshold: f64 },
    ExpressionIn { expressions: Vec<Expression> },
    MicroExpressionIn { micro_expressions: Vec<MicroExpression> },
    MotionAbove { region: Region, threshold: f64 },
    MotionBelow { region: Region, threshold: f64 },
    All { of: Vec<Predicate> },
    Any { of: Vec<Predicate> },
}

impl Predicate {
    /// Evaluate against one tick. Signals missing from the sample never match.
    pub fn holds(&self, sample: &Sample, agg: &SessionAggregates) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::BlinkRateBetween { min, max } => {
                agg.blink_rate >= *min && agg.blink_rate <= *max
            }
            Predicate::BlinkRateAbove { threshold } => agg.blink_rate > *threshold,
            Predicate::BlinkRateBelow { threshold } => agg.blink_rate < *threshold,
            Predicate::GazeIn { gazes } => gazes.contains(&sample.gaze),
            Predicate::ChannelAbove { channel, threshold } => {
                sample.intensity(*channel).is_some_and(|v| v > *threshold)
            }
            Predicate::ChannelBelow { channel, threshold } => {
                sample.intensity(*channel).is_some_and(|v| v < *threshold)
            }
            Predicate::ExpressionIn { expressions } => sample
                .expression
                .is_some_and(|e| expressions.contains(&e)),
            Predicate::MicroExpressionIn { micro_expressions } => sample
                .micro_expression
                .is_some_and(|m| micro_expressions.contains(&m)),
            Predicate::MotionAbove { region, threshold } => sample
                .motion
                .is_some_and(|m| m.region(*region) > *threshold),
            Predicate::MotionBelow { region, threshold } => sample
                .motion
                .is_some_and(|m| m.region(*region) < *threshold),
            Predicate::All { of } => of.iter().all(|p| p.holds(sample, agg)),
            Predicate::Any { of } => of.iter().any(|p| p.holds(sample, agg)),
        }
    }
}

/// One weighted rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub predicate: Predicate,
    pub bucket: Bucket,
    pub weight: f64,
}

impl Rule {
    pub fn new(name: &str, predicate: Predicate, bucket: Bucket, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            predicate,
            bucket,
            weight,
        }
    }

    pub fn deception(name: &str, predicate: Predicate, weight: f64) -> Self {
        Self::new(name, predicate, Bucket::Deception, weight)
    }

    pub fn truth(name: &str, predicate: Predicate, weight: f64) -> Self {
        Self::new(name, predicate, Bucket::Truth, weight)
    }
}

/// Where the dominant-expression tag starts before overrides apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tag", rename_all = "snake_case")]
pub enum ExpressionBaseline {
    /// A constant tag such as "neutral"
    Fixed(String),
    /// The sample's categorical expression, falling back to "neutral"
    SampledExpression,
    /// The emotion channel with the highest intensity, falling back to "neutral"
    StrongestEmotion,
}

/// Replaces the dominant tag when its predicate holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionOverride {
    pub predicate: Predicate,
    pub tag: String,
}

impl ExpressionOverride {
    pub fn new(predicate: Predicate, tag: &str) -> Self {
        Self {
            predicate,
            tag: tag.to_string(),
        }
    }
}

/// Weighted rules plus jitter and dominant-expression derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    pub rules: Vec<Rule>,
    /// Each bucket receives uniform noise in `[0, jitter]`
    pub jitter: f64,
    pub baseline: ExpressionBaseline,
    /// Evaluated in order; a later match overwrites an earlier one
    #[serde(default)]
    pub overrides: Vec<ExpressionOverride>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>, jitter: f64, baseline: ExpressionBaseline) -> Self {
        Self {
            rules,
            jitter,
            baseline,
            overrides: Vec::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: Vec<ExpressionOverride>) -> Self {
        self.overrides = overrides;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn agg(rate: u32) -> SessionAggregates {
        SessionAggregates {
            blink_count: 0,
            elapsed_minutes: 1.0,
            blink_rate: rate,
        }
    }

    #[test]
    fn test_blink_range_is_inclusive() {
        let p = Predicate::BlinkRateBetween { min: 15, max: 25 };
        let s = Sample::new(0, Utc::now(), Gaze::Center);
        assert!(p.holds(&s, &agg(15)));
        assert!(p.holds(&s, &agg(25)));
        assert!(!p.holds(&s, &agg(26)));
    }

    #[test]
    fn test_missing_channel_never_matches() {
        let s = Sample::new(0, Utc::now(), Gaze::Center);
        let above = Predicate::ChannelAbove { channel: Channel::EyeMovement, threshold: -1.0 };
        let below = Predicate::ChannelBelow { channel: Channel::EyeMovement, threshold: 100.0 };
        assert!(!above.holds(&s, &agg(0)));
        assert!(!below.holds(&s, &agg(0)));
    }

    #[test]
    fn test_combinators() {
        let s = Sample::new(0, Utc::now(), Gaze::Avoidant).with_intensity(Channel::Fearful, 0.8);
        let avoidant = Predicate::GazeIn { gazes: vec![Gaze::Avoidant] };
        let calm = Predicate::ChannelBelow { channel: Channel::Fearful, threshold: 0.2 };
        assert!(!Predicate::All { of: vec![avoidant.clone(), calm.clone()] }.holds(&s, &agg(0)));
        assert!(Predicate::Any { of: vec![avoidant, calm] }.holds(&s, &agg(0)));
    }

    #[test]
    fn test_rule_table_json_shape() {
        let table = RuleTable::new(
            vec![Rule::truth("steady blink", Predicate::BlinkRateBetween { min: 15, max: 25 }, 20.0)],
            0.0,
            ExpressionBaseline::Fixed("neutral".into()),
        );
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["rules"][0]["predicate"]["kind"], "blink_rate_between");
        assert_eq!(json["rules"][0]["bucket"], "truth");
        assert_eq!(json["baseline"]["kind"], "fixed");

        let back: RuleTable = serde_json::from_value(json).unwrap();
        assert_eq!(back, table);
    }
}
