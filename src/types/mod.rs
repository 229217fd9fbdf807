//! Core types for Verity

mod phase;
mod signals;
mod rules;
mod verdict;
mod record;
mod snapshot;
mod error;

pub use phase::SessionPhase;
pub use signals::{Channel, Gaze, Expression, MicroExpression, Region, LandmarkMotion, Sample, SessionAggregates};
pub use rules::{Bucket, Predicate, Rule, RuleTable, ExpressionBaseline, ExpressionOverride};
pub use verdict::{Verdict, VerdictLabel, VerdictSummary};
pub use record::{AnalysisRecord, SampleSummary};
pub use snapshot::SessionSnapshot;
pub use error::{ConfigError, CaptureError, EngineError, EngineResult};
