//! Session phase definitions

use serde::{Deserialize, Serialize};

/// The two phases of an analysis session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    /// No timer held, ticks are discarded
    #[default]
    Idle,
    /// Timer held, ticks produce verdicts
    Recording,
}

impl SessionPhase {
    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "\x1b[90m",      // Gray
            SessionPhase::Recording => "\x1b[31m", // Red
        }
    }

    /// Reset ANSI color
    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }

    /// Get emoji for phase
    pub fn emoji(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "⏸",
            SessionPhase::Recording => "🔴",
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, SessionPhase::Recording)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Idle => "IDLE",
            SessionPhase::Recording => "RECORDING",
        };
        write!(f, "{}", name)
    }
}
