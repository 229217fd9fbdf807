//! Signal Synthesizer: one pseudo-random sample per tick
//!
//! Camera independent. Every draw comes from a single `StdRng` in a fixed
//! order, so a seeded synthesizer reproduces its sample sequence exactly.

use std::f64::consts::TAU;
use std::ops::Range;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::core::profiles::{LandmarkModel, SignalModel};
use crate::types::{Expression, Gaze, LandmarkMotion, MicroExpression, Sample};
use crate::{LANDMARK_CENTER, LANDMARK_RADII};

/// A landmark position in frame pixels
pub type Point = (f64, f64);

/// Synthesizes samples for one session
#[derive(Debug)]
pub struct SignalSynthesizer {
    model: SignalModel,
    rng: StdRng,
    /// Most recent landmark set only; older sets are dropped
    previous_landmarks: Option<Vec<Point>>,
}

impl SignalSynthesizer {
    /// Create a synthesizer; `None` seeds from OS entropy
    pub fn new(model: SignalModel, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            model,
            rng,
            previous_landmarks: None,
        }
    }

    /// Draw the next sample
    pub fn next_sample(&mut self, tick: u64, captured_at: DateTime<Utc>) -> Sample {
        let rng = &mut self.rng;

        // Gaze set is validated non-empty at configuration time
        let gaze = self.model.gaze.choose(rng).copied().unwrap_or(Gaze::Center);
        let mut sample = Sample::new(tick, captured_at, gaze);

        for range in &self.model.channels {
            sample
                .intensities
                .insert(range.channel, uniform(rng, range.min, range.max));
        }

        sample.blinked = rng.gen_bool(self.model.blink_probability);

        if self.model.expressions {
            sample.expression = Expression::ALL.choose(rng).copied();
        }
        if self.model.micro_expressions {
            sample.micro_expression = MicroExpression::ALL.choose(rng).copied();
        }

        if let Some(model) = &self.model.landmarks {
            let current = generate_landmarks(rng, model);
            let motion = match &self.previous_landmarks {
                Some(previous) => LandmarkMotion {
                    eye: region_displacement(previous, &current, &model.eye_region),
                    mouth: region_displacement(previous, &current, &model.mouth_region),
                    measured: true,
                },
                None => LandmarkMotion {
                    eye: uniform(rng, 0.0, model.fallback_max),
                    mouth: uniform(rng, 0.0, model.fallback_max),
                    measured: false,
                },
            };
            sample.motion = Some(motion);
            self.previous_landmarks = Some(current);
        }

        sample
    }

    /// Drop the landmark cache so the next motion value is a substitute
    pub fn clear_landmarks(&mut self) {
        self.previous_landmarks = None;
    }

    pub fn has_landmark_cache(&self) -> bool {
        self.previous_landmarks.is_some()
    }

    pub fn model(&self) -> &SignalModel {
        &self.model
    }
}

/// Uniform draw in `[min, max]`, degenerate ranges return `min`
fn uniform(rng: &mut StdRng, min: f64, max: f64) -> f64 {
    if max > min {
        rng.gen_range(min..=max)
    } else {
        min
    }
}

/// Points on an ellipse around the frame center, shifted by head drift,
/// each with its own jitter
pub fn generate_landmarks(rng: &mut StdRng, model: &LandmarkModel) -> Vec<Point> {
    let (cx, cy) = LANDMARK_CENTER;
    let (rx, ry) = LANDMARK_RADII;
    let dx = uniform(rng, -model.head_drift, model.head_drift);
    let dy = uniform(rng, -model.head_drift, model.head_drift);
    let n = model.points as f64;

    (0..model.points)
        .map(|i| {
            let theta = TAU * i as f64 / n;
            let jx = uniform(rng, -model.point_jitter, model.point_jitter);
            let jy = uniform(rng, -model.point_jitter, model.point_jitter);
            (
                cx + dx + rx * theta.cos() + jx,
                cy + dy + ry * theta.sin() + jy,
            )
        })
        .collect()
}

/// Mean Euclidean displacement over an index range
pub fn region_displacement(previous: &[Point], current: &[Point], region: &Range<usize>) -> f64 {
    let pairs: Vec<f64> = region
        .clone()
        .filter_map(|i| Some((previous.get(i)?, current.get(i)?)))
        .map(|(a, b)| (b.0 - a.0).hypot(b.1 - a.1))
        .collect();

    if pairs.is_empty() {
        0.0
    } else {
        pairs.iter().sum::<f64>() / pairs.len() as f64
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::profiles::RuleProfile;
    use crate::types::Channel;

    fn synth(profile: RuleProfile, seed: u64) -> SignalSynthesizer {
        SignalSynthesizer::new(profile.definition().signals.clone(), Some(seed))
    }

    #[test]
    fn test_intensities_stay_in_range() {
        let mut s = synth(RuleProfile::Enhanced, 7);
        for tick in 0..200 {
            let sample = s.next_sample(tick, Utc::now());
            let eye = sample.intensity(Channel::EyeMovement).unwrap();
            let asym = sample.intensity(Channel::FacialAsymmetry).unwrap();
            assert!((0.0..=10.0).contains(&eye));
            assert!((0.0..=0.5).contains(&asym));
        }
    }

    #[test]
    fn test_basic_draws_categorical_cues_only() {
        let mut s = synth(RuleProfile::Basic, 1);
        let sample = s.next_sample(0, Utc::now());
        assert!(sample.expression.is_some());
        assert!(sample.micro_expression.is_some());
        assert!(sample.intensities.is_empty());
        assert!(sample.motion.is_none());
    }

    #[test]
    fn test_gaze_drawn_from_profile_set() {
        let mut s = synth(RuleProfile::Landmark, 3);
        let allowed = &RuleProfile::Landmark.definition().signals.gaze;
        for tick in 0..100 {
            assert!(allowed.contains(&s.next_sample(tick, Utc::now()).gaze));
        }
    }

    #[test]
    fn test_same_seed_same_samples() {
        let now = Utc::now();
        let mut a = synth(RuleProfile::Demographic, 42);
        let mut b = synth(RuleProfile::Demographic, 42);
        for tick in 0..10 {
            let sa = a.next_sample(tick, now);
            let sb = b.next_sample(tick, now);
            assert_eq!(sa.intensities, sb.intensities);
            assert_eq!(sa.gaze, sb.gaze);
            assert_eq!(sa.motion, sb.motion);
            assert_eq!(sa.blinked, sb.blinked);
        }
    }

    #[test]
    fn test_first_landmark_tick_uses_substitute() {
        let mut s = synth(RuleProfile::Landmark, 5);
        assert!(!s.has_landmark_cache());

        let first = s.next_sample(0, Utc::now()).motion.unwrap();
        assert!(!first.measured);
        assert!(first.eye <= 5.0 && first.mouth <= 5.0);
        assert!(s.has_landmark_cache());

        let second = s.next_sample(1, Utc::now()).motion.unwrap();
        assert!(second.measured);

        s.clear_landmarks();
        let third = s.next_sample(2, Utc::now()).motion.unwrap();
        assert!(!third.measured);
    }

    #[test]
    fn test_landmark_points_on_ellipse() {
        let model = RuleProfile::Landmark.definition().signals.landmarks.clone().unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let points = generate_landmarks(&mut rng, &model);
        assert_eq!(points.len(), 68);

        let (cx, cy) = LANDMARK_CENTER;
        let (rx, ry) = LANDMARK_RADII;
        let slack = model.head_drift + model.point_jitter;
        let (x0, y0) = points[0];
        assert!((x0 - (cx + rx)).abs() <= slack);
        assert!((y0 - cy).abs() <= slack);
        assert!(points.iter().all(|(x, _)| *x >= cx - rx - slack && *x <= cx + rx + slack));
        assert!(points.iter().all(|(_, y)| *y >= cy - ry - slack && *y <= cy + ry + slack));
    }

    #[test]
    fn test_region_displacement_is_mean() {
        let prev = vec![(0.0, 0.0), (0.0, 0.0), (0.0, 0.0)];
        let cur = vec![(3.0, 4.0), (0.0, 1.0), (100.0, 0.0)];
        assert_eq!(region_displacement(&prev, &cur, &(0..2)), 3.0);
        assert_eq!(region_displacement(&prev, &cur, &(2..3)), 100.0);
    }

    #[test]
    fn test_blink_probability_extremes() {
        let mut model = RuleProfile::Enhanced.definition().signals.clone();
        model.blink_probability = 1.0;
        let mut always = SignalSynthesizer::new(model.clone(), Some(1));
        assert!((0..20).all(|t| always.next_sample(t, Utc::now()).blinked));

        model.blink_probability = 0.0;
        let mut never = SignalSynthesizer::new(model, Some(1));
        assert!((0..20).all(|t| !never.next_sample(t, Utc::now()).blinked));
    }
}
