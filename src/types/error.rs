//! Error types

use thiserror::Error;

/// Rejected configuration. The engine never starts with one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("tick interval must be positive")]
    ZeroTickInterval,

    #[error("history capacity must be at least 1")]
    ZeroHistoryCapacity,

    #[error("profile {profile}: blink probability {value} outside [0, 1]")]
    BlinkProbability { profile: String, value: f64 },

    #[error("profile {profile}: channel {channel} range [{min}, {max}] is invalid")]
    ChannelRange {
        profile: String,
        channel: String,
        min: f64,
        max: f64,
    },

    #[error("profile {profile}: gaze set is empty")]
    EmptyGazeSet { profile: String },

    #[error("profile {profile}: rule '{rule}' has negative weight {weight}")]
    NegativeWeight {
        profile: String,
        rule: String,
        weight: f64,
    },

    #[error("profile {profile}: jitter {value} must be non-negative")]
    NegativeJitter { profile: String, value: f64 },

    #[error("profile {profile}: {field} = {value} is not finite or exceeds {limit}")]
    OutOfBounds {
        profile: String,
        field: String,
        value: f64,
        limit: f64,
    },

    #[error("profile {profile}: landmark model invalid: {message}")]
    Landmarks { profile: String, message: String },

    #[error("unknown profile '{0}' (expected basic, enhanced, landmark or demographic)")]
    UnknownProfile(String),

    #[error("failed to read config {path}: {message}")]
    Read { path: String, message: String },
}

/// Reported by a frame observer when capture is gone
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    Unavailable(String),

    #[error("capture permission denied")]
    PermissionDenied,
}

/// Errors surfaced by a running session
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("session halted: {0}")]
    CaptureUnavailable(#[from] CaptureError),

    #[error("session task has shut down")]
    SessionClosed,
}

pub type EngineResult<T> = Result<T, EngineError>;
