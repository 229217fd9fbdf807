//! Session Controller: Idle/Recording state machine
//!
//! Transitions:
//! - IDLE → RECORDING: start() (no-op while recording)
//! - RECORDING → IDLE: stop(), keeps verdict and history
//! - any → IDLE: reset(), clears everything
//! - RECORDING → IDLE: capture failure during a tick
//!
//! Timers are always cancelled before any state is cleared, and a tick is only
//! applied when the session is recording and the tick carries the timer id the
//! session currently holds.

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::EngineConfig;
use crate::core::history::HistoryLog;
use crate::core::scheduler::{Scheduler, TimerId};
use crate::core::scoring::ScoringEngine;
use crate::core::synthesizer::SignalSynthesizer;
use crate::types::{
    AnalysisRecord, CaptureError, ConfigError, EngineError, EngineResult, Gaze, SessionAggregates,
    SessionPhase, SessionSnapshot, Verdict,
};

/// Mixed into the seed so jitter and synthesis draw from distinct streams
const JITTER_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Optional capture capability consulted at the top of every tick.
/// An error halts the session; there is no retry.
pub trait FrameObserver: Send {
    fn frame_ready(&mut self) -> Result<(), CaptureError>;
}

/// One analysis session
pub struct Session {
    config: EngineConfig,
    phase: SessionPhase,
    /// Elapsed-time origin, set by start()
    started_at: Option<DateTime<Utc>>,
    blink_count: u32,
    tick_count: u64,
    /// Held iff phase is Recording
    timer: Option<TimerId>,
    synthesizer: SignalSynthesizer,
    scoring: ScoringEngine,
    jitter_rng: StdRng,
    history: HistoryLog,
    current: Option<Verdict>,
    last_aggregates: Option<SessionAggregates>,
    last_gaze: Option<Gaze>,
    fault: Option<CaptureError>,
    scheduler: Box<dyn Scheduler>,
    clock: Box<dyn Clock>,
    frame_observer: Option<Box<dyn FrameObserver>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("profile", &self.config.rule_profile.name())
            .field("phase", &self.phase)
            .field("timer", &self.timer)
            .field("tick_count", &self.tick_count)
            .field("blink_count", &self.blink_count)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Validate `config` and build an idle session
    pub fn new(config: EngineConfig, scheduler: Box<dyn Scheduler>) -> Result<Self, ConfigError> {
        config.validate()?;

        let synthesizer = SignalSynthesizer::new(config.profile().signals.clone(), config.seed);
        let jitter_rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ JITTER_SEED_SALT),
            None => StdRng::from_entropy(),
        };
        let history = HistoryLog::new(config.history_capacity);

        Ok(Self {
            config,
            phase: SessionPhase::Idle,
            started_at: None,
            blink_count: 0,
            tick_count: 0,
            timer: None,
            synthesizer,
            scoring: ScoringEngine::new(),
            jitter_rng,
            history,
            current: None,
            last_aggregates: None,
            last_gaze: None,
            fault: None,
            scheduler,
            clock: Box::new(SystemClock),
            frame_observer: None,
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_frame_observer(self, observer: impl FrameObserver + 'static) -> Self {
        self.with_boxed_frame_observer(Box::new(observer))
    }

    pub fn with_boxed_frame_observer(mut self, observer: Box<dyn FrameObserver>) -> Self {
        self.frame_observer = Some(observer);
        self
    }

    // =========================================================================
    // CONTROL
    // =========================================================================

    /// Begin recording. Returns false if already recording.
    pub fn start(&mut self) -> bool {
        if self.phase.is_recording() {
            debug!("start ignored, session already recording");
            return false;
        }

        self.fault = None;
        self.current = None;
        self.blink_count = 0;
        self.last_aggregates = None;
        self.last_gaze = None;
        self.started_at = Some(self.clock.now());
        self.synthesizer.clear_landmarks();

        let interval = self.config.tick_interval();
        let id = self.scheduler.schedule_repeating(interval);
        self.timer = Some(id);
        self.phase = SessionPhase::Recording;

        info!(
            "session recording: profile={} interval={}ms {}",
            self.config.rule_profile.name(),
            interval.as_millis(),
            id
        );
        true
    }

    /// Stop recording. Verdict and history are kept. Returns false if idle.
    pub fn stop(&mut self) -> bool {
        if !self.phase.is_recording() {
            return false;
        }
        self.cancel_timer();
        self.phase = SessionPhase::Idle;
        info!("session stopped after {} ticks", self.tick_count);
        true
    }

    /// Return to a clean idle state from any phase
    pub fn reset(&mut self) {
        self.cancel_timer();

        self.phase = SessionPhase::Idle;
        self.started_at = None;
        self.blink_count = 0;
        self.tick_count = 0;
        self.synthesizer.clear_landmarks();
        self.history.clear();
        self.current = None;
        self.last_aggregates = None;
        self.last_gaze = None;
        self.fault = None;
        info!("session reset");
    }

    fn cancel_timer(&mut self) {
        if let Some(id) = self.timer.take() {
            self.scheduler.cancel(id);
            debug!("{} cancelled", id);
        }
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Apply a tick from timer `id`. Stale ticks (idle session, or a timer
    /// that is no longer held) are discarded and return `Ok(None)`.
    pub fn tick(&mut self, id: TimerId) -> EngineResult<Option<AnalysisRecord>> {
        if !self.phase.is_recording() || self.timer != Some(id) {
            debug!("discarding stale tick from {} (phase={})", id, self.phase);
            return Ok(None);
        }

        if let Some(observer) = self.frame_observer.as_mut() {
            if let Err(err) = observer.frame_ready() {
                self.halt(err.clone());
                return Err(EngineError::CaptureUnavailable(err));
            }
        }

        Ok(Some(self.run_tick()))
    }

    /// Fire the currently held timer by hand (headless and test driving)
    pub fn fire(&mut self) -> EngineResult<Option<AnalysisRecord>> {
        match self.timer {
            Some(id) => self.tick(id),
            None => Ok(None),
        }
    }

    fn run_tick(&mut self) -> AnalysisRecord {
        self.tick_count += 1;
        let now = self.clock.now();

        let sample = self.synthesizer.next_sample(self.tick_count, now);
        if sample.blinked {
            self.blink_count += 1;
        }

        let elapsed_minutes = self
            .started_at
            .map(|origin| (now - origin).num_milliseconds().max(0) as f64 / 60_000.0)
            .unwrap_or(0.0);
        let profile = self.config.profile();
        let agg = SessionAggregates::compute(
            self.blink_count,
            elapsed_minutes,
            profile.signals.blink_rate_cap,
        );

        let verdict = self
            .scoring
            .evaluate(&sample, &agg, &profile.rules, &mut self.jitter_rng);
        let record = AnalysisRecord::new(&sample, &agg, verdict.clone());

        debug!(
            "tick {}: {} {}% expr={} blink={}/min gaze={}",
            self.tick_count,
            verdict.label,
            verdict.confidence,
            verdict.dominant_expression,
            agg.blink_rate,
            sample.gaze
        );

        self.history.push(record.clone());
        self.current = Some(verdict);
        self.last_aggregates = Some(agg);
        self.last_gaze = Some(sample.gaze);
        record
    }

    fn halt(&mut self, err: CaptureError) {
        self.cancel_timer();
        self.phase = SessionPhase::Idle;
        error!("capture failed, session halted: {}", err);
        self.fault = Some(err);
    }

    // =========================================================================
    // READ
    // =========================================================================

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            verdict: self.current.as_ref().map(Verdict::summary),
            dominant_expression: self.current.as_ref().map(|v| v.dominant_expression.clone()),
            blink_rate: self.blink_rate(),
            gaze: self.last_gaze,
            history: self.history.to_vec(),
            tick_count: self.tick_count,
            fault: self.fault.as_ref().map(|e| e.to_string()),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn timer(&self) -> Option<TimerId> {
        self.timer
    }

    pub fn current_verdict(&self) -> Option<&Verdict> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn blink_count(&self) -> u32 {
        self.blink_count
    }

    pub fn blink_rate(&self) -> u32 {
        self.last_aggregates.map(|a| a.blink_rate).unwrap_or(0)
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn fault(&self) -> Option<&CaptureError> {
        self.fault.as_ref()
    }

    pub fn has_landmark_cache(&self) -> bool {
        self.synthesizer.has_landmark_cache()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

// =============================================================================
// TESTS
// =============================================================================
