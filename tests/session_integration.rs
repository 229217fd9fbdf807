//! Integration tests for the session controller
//!
//! Drives sessions with a manual scheduler and clock so every run is exact.

use pretty_assertions::assert_eq;
use verity::core::{EngineConfig, ManualClock, ManualScheduler, RuleProfile, Session};
use verity::types::{
    AnalysisRecord, ExpressionBaseline, Predicate, Rule, RuleTable, SessionPhase, VerdictLabel,
};

fn headless(config: EngineConfig) -> (Session, ManualScheduler, ManualClock) {
    let scheduler = ManualScheduler::new();
    let clock = ManualClock::default();
    let session = Session::new(config, Box::new(scheduler.clone()))
        .unwrap()
        .with_clock(clock.clone());
    (session, scheduler, clock)
}

fn run(session: &mut Session, clock: &ManualClock, ticks: usize) -> Vec<AnalysisRecord> {
    let interval = session.config().tick_interval_ms();
    (0..ticks)
        .map(|_| {
            clock.advance_ms(interval);
            session.fire().unwrap().unwrap()
        })
        .collect()
}

/// 60/40 fixed weights, no jitter
fn fixed_profile() -> RuleProfile {
    let mut def = RuleProfile::Basic.definition().clone();
    def.name = "fixed".into();
    def.rules = RuleTable::new(
        vec![
            Rule::deception("always deceptive", Predicate::Always, 60.0),
            Rule::truth("always truthful", Predicate::Always, 40.0),
        ],
        0.0,
        ExpressionBaseline::Fixed("calm".into()),
    );
    RuleProfile::Custom(Box::new(def))
}

#[test]
fn test_seeded_sessions_are_reproducible() {
    for profile in RuleProfile::BUILT_IN {
        let config = EngineConfig::new(profile).with_seed(7);
        let (mut a, _, clock_a) = headless(config.clone());
        let (mut b, _, clock_b) = headless(config);
        a.start();
        b.start();

        let left = run(&mut a, &clock_a, 25);
        let right = run(&mut b, &clock_b, 25);
        assert_eq!(left, right);
        assert_eq!(a.snapshot(), b.snapshot());
    }
}

#[test]
fn test_different_seeds_diverge() {
    let (mut a, _, clock_a) = headless(EngineConfig::new(RuleProfile::Enhanced).with_seed(1));
    let (mut b, _, clock_b) = headless(EngineConfig::new(RuleProfile::Enhanced).with_seed(2));
    a.start();
    b.start();
    assert_ne!(run(&mut a, &clock_a, 10), run(&mut b, &clock_b, 10));
}

#[test]
fn test_fixed_weights_give_lie_sixty() {
    let (mut s, _, clock) = headless(EngineConfig::new(fixed_profile()));
    s.start();
    let records = run(&mut s, &clock, 3);

    for record in &records {
        assert_eq!(record.verdict.label, VerdictLabel::Lie);
        assert_eq!(record.verdict.confidence, 60);
        assert_eq!(record.verdict.dominant_expression, "calm");
    }
    let snap = s.snapshot();
    assert_eq!(snap.dominant_expression.as_deref(), Some("calm"));
    assert_eq!(snap.verdict.map(|v| v.confidence), Some(60));
}

#[test]
fn test_capacity_plus_one_evicts_oldest() {
    let config = EngineConfig::new(RuleProfile::Basic).with_seed(3);
    let capacity = config.history_capacity;
    let (mut s, _, clock) = headless(config);
    s.start();
    run(&mut s, &clock, capacity + 1);

    let ticks: Vec<u64> = s.snapshot().history.iter().map(|r| r.tick).collect();
    assert_eq!(ticks.len(), capacity);
    assert_eq!(ticks.first(), Some(&(capacity as u64 + 1)));
    assert_eq!(ticks.last(), Some(&2));
}

#[test]
fn test_stop_restart_resumes_with_history() {
    let (mut s, scheduler, clock) = headless(EngineConfig::new(RuleProfile::Landmark).with_seed(11));
    s.start();
    run(&mut s, &clock, 4);
    let old_timer = s.timer().unwrap();
    s.stop();
    assert_eq!(scheduler.active_count(), 0);

    s.start();
    assert_eq!(s.snapshot().phase, SessionPhase::Recording);
    assert!(s.snapshot().verdict.is_none());
    assert_eq!(s.tick(old_timer).unwrap(), None);

    let next = run(&mut s, &clock, 1);
    assert_eq!(next[0].tick, 5);
    assert_eq!(s.history().len(), 5);
    assert_eq!(scheduler.active_count(), 1);
}

#[test]
fn test_reset_returns_to_clean_idle() {
    let (mut s, scheduler, clock) = headless(EngineConfig::new(RuleProfile::Demographic).with_seed(5));
    s.start();
    run(&mut s, &clock, 6);
    s.reset();

    let snap = s.snapshot();
    assert_eq!(snap.phase, SessionPhase::Idle);
    assert_eq!(snap.tick_count, 0);
    assert_eq!(snap.blink_rate, 0);
    assert!(snap.history.is_empty());
    assert!(snap.verdict.is_none());
    assert!(snap.dominant_expression.is_none());
    assert_eq!(scheduler.active_count(), 0);
}

#[test]
fn test_blink_rate_never_exceeds_cap() {
    let mut def = RuleProfile::Enhanced.definition().clone();
    def.signals.blink_probability = 1.0;
    let config = EngineConfig::new(RuleProfile::Custom(Box::new(def)))
        .with_tick_interval_ms(100)
        .with_seed(2);
    let (mut s, _, clock) = headless(config);
    s.start();
    for record in run(&mut s, &clock, 30) {
        assert!(record.sample.blink_rate <= 40);
    }
    assert_eq!(s.blink_rate(), 40);
}

#[test]
fn test_records_are_newest_first_and_serialize() {
    let (mut s, _, clock) = headless(EngineConfig::new(RuleProfile::Enhanced).with_seed(8));
    s.start();
    run(&mut s, &clock, 3);

    let snap = s.snapshot();
    assert_eq!(snap.latest().map(|r| r.tick), Some(3));

    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["phase"], "RECORDING");
    assert_eq!(json["history"][0]["tick"], 3);
    assert!(json["history"][0]["verdict"]["label"].is_string());
}
