//! Core modules for Verity

pub mod profiles;
pub mod synthesizer;
pub mod scoring;
pub mod history;
pub mod scheduler;
pub mod clock;
pub mod config;
pub mod session;
pub mod runtime;
pub mod api;

pub use profiles::{ChannelRange, LandmarkModel, ProfileDefinition, RuleProfile, SignalModel};
pub use synthesizer::SignalSynthesizer;
pub use scoring::{lie_confidence, verdict_from_scores, ScoreBuckets, ScoringEngine};
pub use history::HistoryLog;
pub use scheduler::{ManualScheduler, Scheduler, TimerId, TokioScheduler};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use session::{FrameObserver, Session};
pub use runtime::{spawn_session, spawn_session_with_observer, SessionHandle};
pub use api::{create_router, run_server};
