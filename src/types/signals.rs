//! Signal structures produced by the synthesizer

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::BLINK_RATE_MIN_MINUTES;

/// Named intensity channels a profile may synthesize
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Saccade activity, 0-10
    EyeMovement,
    /// Left/right face mismatch, 0-0.5
    FacialAsymmetry,
    /// Compressed lips, 0-1
    LipTension,
    Happy,
    Sad,
    Angry,
    Fearful,
    Surprised,
    Disgusted,
    /// Descriptive only, not an emotion
    ApparentAge,
}

impl Channel {
    /// Emotion channels compete for the dominant tag in emotion-modeled profiles
    pub const EMOTIONS: [Channel; 6] = [
        Channel::Happy,
        Channel::Sad,
        Channel::Angry,
        Channel::Fearful,
        Channel::Surprised,
        Channel::Disgusted,
    ];

    pub fn is_emotion(&self) -> bool {
        Self::EMOTIONS.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::EyeMovement => "eye_movement",
            Channel::FacialAsymmetry => "facial_asymmetry",
            Channel::LipTension => "lip_tension",
            Channel::Happy => "happy",
            Channel::Sad => "sad",
            Channel::Angry => "angry",
            Channel::Fearful => "fearful",
            Channel::Surprised => "surprised",
            Channel::Disgusted => "disgusted",
            Channel::ApparentAge => "apparent_age",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gaze direction category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gaze {
    Center,
    Left,
    Right,
    Up,
    Down,
    Avoidant,
}

impl Gaze {
    pub const ALL: [Gaze; 6] = [
        Gaze::Center,
        Gaze::Left,
        Gaze::Right,
        Gaze::Up,
        Gaze::Down,
        Gaze::Avoidant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gaze::Center => "center",
            Gaze::Left => "left",
            Gaze::Right => "right",
            Gaze::Up => "up",
            Gaze::Down => "down",
            Gaze::Avoidant => "avoidant",
        }
    }
}

impl std::fmt::Display for Gaze {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical facial expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Neutral,
    Happy,
    Surprised,
    Angry,
    Fearful,
    Disgusted,
    Sad,
    Contemptuous,
}

impl Expression {
    pub const ALL: [Expression; 8] = [
        Expression::Neutral,
        Expression::Happy,
        Expression::Surprised,
        Expression::Angry,
        Expression::Fearful,
        Expression::Disgusted,
        Expression::Sad,
        Expression::Contemptuous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Surprised => "surprised",
            Expression::Angry => "angry",
            Expression::Fearful => "fearful",
            Expression::Disgusted => "disgusted",
            Expression::Sad => "sad",
            Expression::Contemptuous => "contemptuous",
        }
    }
}

/// Categorical micro-expression cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MicroExpression {
    EyeMovement,
    LipTension,
    EyebrowFlash,
    NostrilFlare,
    JawClench,
    ForcedSmile,
}

impl MicroExpression {
    pub const ALL: [MicroExpression; 6] = [
        MicroExpression::EyeMovement,
        MicroExpression::LipTension,
        MicroExpression::EyebrowFlash,
        MicroExpression::NostrilFlare,
        MicroExpression::JawClench,
        MicroExpression::ForcedSmile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MicroExpression::EyeMovement => "eye_movement",
            MicroExpression::LipTension => "lip_tension",
            MicroExpression::EyebrowFlash => "eyebrow_flash",
            MicroExpression::NostrilFlare => "nostril_flare",
            MicroExpression::JawClench => "jaw_clench",
            MicroExpression::ForcedSmile => "forced_smile",
        }
    }
}

/// Face region used for landmark displacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Eye,
    Mouth,
}

/// Average landmark displacement per region since the previous tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkMotion {
    pub eye: f64,
    pub mouth: f64,
    /// False when no previous landmark set existed and the values are substitutes
    pub measured: bool,
}

impl LandmarkMotion {
    pub fn region(&self, region: Region) -> f64 {
        match region {
            Region::Eye => self.eye,
            Region::Mouth => self.mouth,
        }
    }

    /// Single motion magnitude (mean of both regions)
    pub fn magnitude(&self) -> f64 {
        (self.eye + self.mouth) / 2.0
    }
}

/// One tick's synthesized reading set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Monotonic tick index within the session
    pub tick: u64,
    /// When the sample was taken
    pub captured_at: DateTime<Utc>,
    /// Bounded non-negative intensities per channel
    pub intensities: BTreeMap<Channel, f64>,
    pub gaze: Gaze,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<Expression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub micro_expression: Option<MicroExpression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion: Option<LandmarkMotion>,
    /// Whether a blink happened this tick
    pub blinked: bool,
}

impl Sample {
    /// Create a bare sample with no channels or categorical cues
    pub fn new(tick: u64, captured_at: DateTime<Utc>, gaze: Gaze) -> Self {
        Self {
            tick,
            captured_at,
            intensities: BTreeMap::new(),
            gaze,
            expression: None,
            micro_expression: None,
            motion: None,
            blinked: false,
        }
    }

    pub fn intensity(&self, channel: Channel) -> Option<f64> {
        self.intensities.get(&channel).copied()
    }

    pub fn with_intensity(mut self, channel: Channel, value: f64) -> Self {
        self.intensities.insert(channel, value);
        self
    }
}

/// Session-accumulated values the rules can see alongside the sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionAggregates {
    pub blink_count: u32,
    pub elapsed_minutes: f64,
    pub blink_rate: u32,
}

impl SessionAggregates {
    /// Derive blink rate: `round(count / max(minutes, 0.1))`, clamped to `cap`
    pub fn compute(blink_count: u32, elapsed_minutes: f64, cap: u32) -> Self {
        let minutes = elapsed_minutes.max(BLINK_RATE_MIN_MINUTES);
        let rate = (blink_count as f64 / minutes).round();
        let blink_rate = (rate.min(cap as f64)).max(0.0) as u32;
        Self {
            blink_count,
            elapsed_minutes,
            blink_rate,
        }
    }
}
