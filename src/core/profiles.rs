//! Rule profiles: signal ranges plus a weighted rule table
//!
//! The four built-in profiles share one engine and differ only in this data.
//! `basic` scores categorical expression cues only; the others add blink, gaze,
//! intensity channels and landmark motion.

use std::ops::Range;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::types::{
    Channel, ConfigError, Expression, ExpressionBaseline, ExpressionOverride, Gaze,
    MicroExpression, Predicate, Region, Rule, RuleTable,
};
use crate::{
    BLINK_RATE_CAP, DEFAULT_TICK_INTERVAL_MS, MAX_LANDMARK_POINTS, MAX_PROFILE_MAGNITUDE,
    NEUTRAL_EXPRESSION,
};

/// Uniform range for one intensity channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub channel: Channel,
    pub min: f64,
    pub max: f64,
}

impl ChannelRange {
    pub fn new(channel: Channel, min: f64, max: f64) -> Self {
        Self { channel, min, max }
    }
}

/// Synthetic face landmarks on an ellipse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkModel {
    pub points: usize,
    pub eye_region: Range<usize>,
    pub mouth_region: Range<usize>,
    /// Independent per-point jitter (pixels)
    pub point_jitter: f64,
    /// Whole-face offset per tick (pixels)
    pub head_drift: f64,
    /// Upper bound of the substitute motion when no previous set exists
    pub fallback_max: f64,
}

/// What the synthesizer draws each tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalModel {
    #[serde(default)]
    pub channels: Vec<ChannelRange>,
    pub blink_probability: f64,
    #[serde(default = "default_blink_cap")]
    pub blink_rate_cap: u32,
    pub gaze: Vec<Gaze>,
    #[serde(default)]
    pub expressions: bool,
    #[serde(default)]
    pub micro_expressions: bool,
    #[serde(default)]
    pub landmarks: Option<LandmarkModel>,
}

fn default_blink_cap() -> u32 {
    BLINK_RATE_CAP
}

/// Complete profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDefinition {
    pub name: String,
    pub tick_interval_ms: u64,
    pub signals: SignalModel,
    pub rules: RuleTable,
}

impl ProfileDefinition {
    /// Check ranges, probabilities and weights. Every magnitude the
    /// synthesizer or the jitter draws from must stay finite and bounded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let profile = || self.name.clone();
        let signals = &self.signals;

        if !(0.0..=1.0).contains(&signals.blink_probability) {
            return Err(ConfigError::BlinkProbability {
                profile: profile(),
                value: signals.blink_probability,
            });
        }
        for range in &signals.channels {
            if !(range.min >= 0.0 && range.min <= range.max && range.max.is_finite()) {
                return Err(ConfigError::ChannelRange {
                    profile: profile(),
                    channel: range.channel.to_string(),
                    min: range.min,
                    max: range.max,
                });
            }
            self.bounded(&format!("channel {} max", range.channel), range.max)?;
        }
        if signals.gaze.is_empty() {
            return Err(ConfigError::EmptyGazeSet { profile: profile() });
        }
        if let Some(model) = &signals.landmarks {
            validate_landmarks(model).map_err(|message| ConfigError::Landmarks {
                profile: profile(),
                message,
            })?;
            self.bounded("landmarks.point_jitter", model.point_jitter)?;
            self.bounded("landmarks.head_drift", model.head_drift)?;
            self.bounded("landmarks.fallback_max", model.fallback_max)?;
        }

        if !(self.rules.jitter >= 0.0) {
            return Err(ConfigError::NegativeJitter {
                profile: profile(),
                value: self.rules.jitter,
            });
        }
        self.bounded("rules.jitter", self.rules.jitter)?;

        for rule in &self.rules.rules {
            if !(rule.weight >= 0.0) {
                return Err(ConfigError::NegativeWeight {
                    profile: profile(),
                    rule: rule.name.clone(),
                    weight: rule.weight,
                });
            }
        }
        let total_weight: f64 = self.rules.rules.iter().map(|r| r.weight).sum();
        self.bounded("rules total weight", total_weight)
    }

    fn bounded(&self, field: &str, value: f64) -> Result<(), ConfigError> {
        if value.is_finite() && value.abs() <= MAX_PROFILE_MAGNITUDE {
            Ok(())
        } else {
            Err(ConfigError::OutOfBounds {
                profile: self.name.clone(),
                field: field.to_string(),
                value,
                limit: MAX_PROFILE_MAGNITUDE,
            })
        }
    }
}

fn validate_landmarks(model: &LandmarkModel) -> Result<(), String> {
    if model.points == 0 || model.points > MAX_LANDMARK_POINTS {
        return Err(format!(
            "point count {} outside 1..={}",
            model.points, MAX_LANDMARK_POINTS
        ));
    }
    for (name, region) in [("eye", &model.eye_region), ("mouth", &model.mouth_region)] {
        if region.is_empty() || region.end > model.points {
            return Err(format!(
                "{} region {}..{} not within {} points",
                name, region.start, region.end, model.points
            ));
        }
    }
    if model.point_jitter < 0.0 || model.head_drift < 0.0 || model.fallback_max < 0.0 {
        return Err("jitter, drift and fallback must be non-negative".into());
    }
    Ok(())
}

/// Selects the weight table and signal ranges
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleProfile {
    #[default]
    Basic,
    Enhanced,
    Landmark,
    Demographic,
    Custom(Box<ProfileDefinition>),
}

impl RuleProfile {
    pub const BUILT_IN: [RuleProfile; 4] = [
        RuleProfile::Basic,
        RuleProfile::Enhanced,
        RuleProfile::Landmark,
        RuleProfile::Demographic,
    ];

    pub fn definition(&self) -> &ProfileDefinition {
        match self {
            RuleProfile::Basic => &*BASIC,
            RuleProfile::Enhanced => &*ENHANCED,
            RuleProfile::Landmark => &*LANDMARK,
            RuleProfile::Demographic => &*DEMOGRAPHIC,
            RuleProfile::Custom(def) => def.as_ref(),
        }
    }

    pub fn name(&self) -> &str {
        &self.definition().name
    }
}

impl FromStr for RuleProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(RuleProfile::Basic),
            "enhanced" => Ok(RuleProfile::Enhanced),
            "landmark" => Ok(RuleProfile::Landmark),
            "demographic" => Ok(RuleProfile::Demographic),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }
}

impl std::fmt::Display for RuleProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// PREDICATE SHORTHANDS
// =============================================================================

fn gaze(gazes: &[Gaze]) -> Predicate {
    Predicate::GazeIn { gazes: gazes.to_vec() }
}

fn above(channel: Channel, threshold: f64) -> Predicate {
    Predicate::ChannelAbove { channel, threshold }
}

fn below(channel: Channel, threshold: f64) -> Predicate {
    Predicate::ChannelBelow { channel, threshold }
}

fn motion_above(region: Region, threshold: f64) -> Predicate {
    Predicate::MotionAbove { region, threshold }
}

fn motion_below(region: Region, threshold: f64) -> Predicate {
    Predicate::MotionBelow { region, threshold }
}

fn steady_blinking() -> Predicate {
    Predicate::BlinkRateBetween { min: 15, max: 25 }
}

fn neutral() -> ExpressionBaseline {
    ExpressionBaseline::Fixed(NEUTRAL_EXPRESSION.to_string())
}

lazy_static! {
    // =========================================================================
    // basic: categorical expression + micro-expression, 2s cadence
    // =========================================================================
    static ref BASIC: ProfileDefinition = ProfileDefinition {
        name: "basic".into(),
        tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        signals: SignalModel {
            channels: Vec::new(),
            blink_probability: 0.2,
            blink_rate_cap: BLINK_RATE_CAP,
            gaze: vec![Gaze::Center, Gaze::Left, Gaze::Right],
            expressions: true,
            micro_expressions: true,
            landmarks: None,
        },
        rules: RuleTable::new(
            vec![
                Rule::deception("deceptive micro-expression", Predicate::MicroExpressionIn {
                    micro_expressions: vec![
                        MicroExpression::EyeMovement,
                        MicroExpression::LipTension,
                        MicroExpression::ForcedSmile,
                        MicroExpression::NostrilFlare,
                    ],
                }, 40.0),
                Rule::deception("fear or surprise", Predicate::ExpressionIn {
                    expressions: vec![Expression::Fearful, Expression::Surprised],
                }, 30.0),
                Rule::deception("contempt or disgust", Predicate::ExpressionIn {
                    expressions: vec![Expression::Contemptuous, Expression::Disgusted],
                }, 25.0),
                Rule::truth("open expression", Predicate::ExpressionIn {
                    expressions: vec![Expression::Neutral, Expression::Happy],
                }, 35.0),
                Rule::truth("neutral expression", Predicate::ExpressionIn {
                    expressions: vec![Expression::Neutral],
                }, 20.0),
            ],
            20.0,
            ExpressionBaseline::SampledExpression,
        ),
    };

    // =========================================================================
    // enhanced: blink rate, gaze, eye movement, asymmetry, lip tension
    // =========================================================================
    static ref ENHANCED: ProfileDefinition = ProfileDefinition {
        name: "enhanced".into(),
        tick_interval_ms: 1500,
        signals: SignalModel {
            channels: vec![
                ChannelRange::new(Channel::EyeMovement, 0.0, 10.0),
                ChannelRange::new(Channel::FacialAsymmetry, 0.0, 0.5),
                ChannelRange::new(Channel::LipTension, 0.0, 1.0),
            ],
            blink_probability: 0.25,
            blink_rate_cap: BLINK_RATE_CAP,
            gaze: Gaze::ALL.to_vec(),
            expressions: false,
            micro_expressions: false,
            landmarks: None,
        },
        rules: RuleTable::new(
            vec![
                Rule::deception("rapid blinking", Predicate::BlinkRateAbove { threshold: 25 }, 25.0),
                Rule::truth("steady blinking", steady_blinking(), 20.0),
                Rule::deception("suppressed blinking", Predicate::BlinkRateBelow { threshold: 8 }, 10.0),
                Rule::deception("averted gaze", gaze(&[Gaze::Avoidant]), 20.0),
                Rule::deception("vertical gaze", gaze(&[Gaze::Up, Gaze::Down]), 5.0),
                Rule::truth("direct gaze", gaze(&[Gaze::Center]), 15.0),
                Rule::deception("darting eyes", above(Channel::EyeMovement, 7.0), 20.0),
                Rule::truth("calm eyes", below(Channel::EyeMovement, 3.0), 10.0),
                Rule::deception("asymmetric face", above(Channel::FacialAsymmetry, 0.3), 15.0),
                Rule::truth("symmetric face", below(Channel::FacialAsymmetry, 0.1), 10.0),
                Rule::deception("tense lips", above(Channel::LipTension, 0.7), 15.0),
            ],
            15.0,
            neutral(),
        )
        .with_overrides(vec![
            ExpressionOverride::new(above(Channel::LipTension, 0.7), "tense"),
            ExpressionOverride::new(above(Channel::EyeMovement, 7.0), "nervous"),
            ExpressionOverride::new(above(Channel::FacialAsymmetry, 0.3), "contempt"),
            ExpressionOverride::new(gaze(&[Gaze::Avoidant]), "evasive"),
        ]),
    };

    // =========================================================================
    // landmark: 68-point face, eye/mouth displacement between ticks
    // =========================================================================
    static ref LANDMARK: ProfileDefinition = ProfileDefinition {
        name: "landmark".into(),
        tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        signals: SignalModel {
            channels: vec![
                ChannelRange::new(Channel::EyeMovement, 0.0, 10.0),
                ChannelRange::new(Channel::FacialAsymmetry, 0.0, 0.5),
            ],
            blink_probability: 0.2,
            blink_rate_cap: BLINK_RATE_CAP,
            gaze: vec![Gaze::Center, Gaze::Left, Gaze::Right, Gaze::Avoidant],
            expressions: false,
            micro_expressions: false,
            landmarks: Some(LandmarkModel {
                points: 68,
                eye_region: 36..48,
                mouth_region: 48..68,
                point_jitter: 2.0,
                head_drift: 3.0,
                fallback_max: 5.0,
            }),
        },
        rules: RuleTable::new(
            vec![
                Rule::deception("eye region motion", motion_above(Region::Eye, 3.0), 25.0),
                Rule::deception("mouth region motion", motion_above(Region::Mouth, 4.0), 20.0),
                Rule::truth("still eyes", motion_below(Region::Eye, 1.5), 20.0),
                Rule::truth("still mouth", motion_below(Region::Mouth, 2.0), 15.0),
                Rule::truth("steady blinking", steady_blinking(), 20.0),
                Rule::deception("rapid blinking", Predicate::BlinkRateAbove { threshold: 30 }, 20.0),
                Rule::deception("averted gaze", gaze(&[Gaze::Avoidant]), 15.0),
                Rule::truth("direct gaze", gaze(&[Gaze::Center]), 10.0),
                Rule::deception("asymmetric face", above(Channel::FacialAsymmetry, 0.35), 15.0),
            ],
            15.0,
            neutral(),
        )
        .with_overrides(vec![
            ExpressionOverride::new(motion_above(Region::Mouth, 4.0), "speaking"),
            ExpressionOverride::new(motion_above(Region::Eye, 3.0), "darting eyes"),
            ExpressionOverride::new(above(Channel::FacialAsymmetry, 0.35), "smirk"),
        ]),
    };

    // =========================================================================
    // demographic: 468-point mesh, emotion channels, apparent age
    // =========================================================================
    static ref DEMOGRAPHIC: ProfileDefinition = ProfileDefinition {
        name: "demographic".into(),
        tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        signals: SignalModel {
            channels: vec![
                ChannelRange::new(Channel::EyeMovement, 0.0, 10.0),
                ChannelRange::new(Channel::Happy, 0.0, 1.0),
                ChannelRange::new(Channel::Sad, 0.0, 1.0),
                ChannelRange::new(Channel::Angry, 0.0, 1.0),
                ChannelRange::new(Channel::Fearful, 0.0, 1.0),
                ChannelRange::new(Channel::Surprised, 0.0, 1.0),
                ChannelRange::new(Channel::Disgusted, 0.0, 1.0),
                ChannelRange::new(Channel::ApparentAge, 18.0, 70.0),
            ],
            blink_probability: 0.22,
            blink_rate_cap: BLINK_RATE_CAP,
            gaze: Gaze::ALL.to_vec(),
            expressions: false,
            micro_expressions: false,
            landmarks: Some(LandmarkModel {
                points: 468,
                eye_region: 130..160,
                mouth_region: 61..91,
                point_jitter: 1.5,
                head_drift: 2.5,
                fallback_max: 4.0,
            }),
        },
        rules: RuleTable::new(
            vec![
                Rule::deception("fear", above(Channel::Fearful, 0.6), 25.0),
                Rule::deception("surprise", above(Channel::Surprised, 0.6), 15.0),
                Rule::deception("disgust", above(Channel::Disgusted, 0.5), 15.0),
                Rule::truth("happiness", above(Channel::Happy, 0.6), 25.0),
                Rule::truth("steady blinking", steady_blinking(), 20.0),
                Rule::deception("rapid blinking", Predicate::BlinkRateAbove { threshold: 30 }, 20.0),
                Rule::deception("averted gaze", gaze(&[Gaze::Avoidant]), 20.0),
                Rule::truth("direct gaze", gaze(&[Gaze::Center]), 15.0),
                Rule::deception("eye region motion", motion_above(Region::Eye, 3.0), 20.0),
                Rule::truth("still eyes", motion_below(Region::Eye, 1.5), 15.0),
            ],
            15.0,
            ExpressionBaseline::StrongestEmotion,
        )
        .with_overrides(vec![
            ExpressionOverride::new(motion_above(Region::Eye, 3.0), "darting eyes"),
            ExpressionOverride::new(
                Predicate::All { of: vec![gaze(&[Gaze::Avoidant]), above(Channel::Fearful, 0.5)] },
                "anxious",
            ),
        ]),
    };
}
