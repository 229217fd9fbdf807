//! Verity: periodic behavioral-signal scoring engine
//!
//! Session (tick) → SignalSynthesizer → ScoringEngine → HistoryLog → snapshot

pub mod core;
pub mod types;

// =============================================================================
// SESSION DEFAULTS
// =============================================================================

/// History log capacity when not configured
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Cadence used by profiles that do not declare their own (milliseconds)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 2000;

// =============================================================================
// BLINK RATE
// =============================================================================

/// Elapsed-minutes floor when deriving blink rate, avoids a spike on the first ticks
pub const BLINK_RATE_MIN_MINUTES: f64 = 0.1;

/// Blink rate ceiling (blinks per minute)
pub const BLINK_RATE_CAP: u32 = 40;

// =============================================================================
// SCORING
// =============================================================================

/// lie_confidence used when both buckets are zero
pub const TIE_LIE_CONFIDENCE: u8 = 50;

/// Tag used when no baseline expression can be derived
pub const NEUTRAL_EXPRESSION: &str = "neutral";

// =============================================================================
// PROFILE LIMITS
// =============================================================================

/// Largest accepted channel width, jitter, drift or summed rule weight
pub const MAX_PROFILE_MAGNITUDE: f64 = 1e6;

/// Largest accepted landmark point count
pub const MAX_LANDMARK_POINTS: usize = 10_000;

// =============================================================================
// LANDMARK GEOMETRY
// =============================================================================

/// Frame center the synthetic face is placed around (640x480 capture)
pub const LANDMARK_CENTER: (f64, f64) = (320.0, 240.0);

/// Ellipse radii of the synthetic face outline
pub const LANDMARK_RADII: (f64, f64) = (110.0, 140.0);

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
