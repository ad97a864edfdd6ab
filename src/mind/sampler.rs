//! Per-turn internal-state sampling.
//!
//! Every field is an independent uniform draw; only confidence carries
//! over between turns (as a bounded random walk).

use rand::Rng;

use super::state::{ChoiceReasoning, DominantValues, UncertaintyProfile};

/// Width of the symmetric confidence nudge applied each turn.
pub const CONFIDENCE_DRIFT: f64 = 0.2;

/// Length of the opaque activation vector recorded per turn.
pub const STATE_DIMS: usize = 128;

/// Draw the next [`ChoiceReasoning`], walking `confidence` from its previous value.
pub fn simulate<R: Rng + ?Sized>(rng: &mut R, previous_confidence: f64) -> ChoiceReasoning {
    let confidence =
        (previous_confidence + (rng.r#gen::<f64>() - 0.5) * CONFIDENCE_DRIFT).clamp(0.0, 1.0);

    let dominant_values = DominantValues {
        exploration: rng.r#gen::<f64>() * 0.5 + 0.3,
        safety: rng.r#gen::<f64>() * 0.4,
        cooperation: rng.r#gen::<f64>() * 0.6 + 0.2,
        analytical: rng.r#gen::<f64>() * 0.7 + 0.3,
    };

    let uncertainty_breakdown = UncertaintyProfile {
        epistemic: rng.r#gen::<f64>() * 0.8,
        aleatoric: rng.r#gen::<f64>() * 0.4,
        ontological: rng.r#gen::<f64>() * 0.2,
    };

    ChoiceReasoning {
        confidence,
        dominant_values,
        uncertainty_breakdown,
        moral_weight: rng.r#gen(),
        commitment_strength: rng.r#gen::<f64>() * 0.8 + 0.2,
        future_impact: rng.r#gen(),
    }
}

/// A [`STATE_DIMS`]-long vector drawn uniformly from `[-1, 1)`.
pub fn activation_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec<f64> {
    (0..STATE_DIMS).map(|_| rng.r#gen::<f64>() * 2.0 - 1.0).collect()
}

/// Mean absolute activation.
pub fn magnitude(state: &[f64]) -> f64 {
    if state.is_empty() {
        return 0.0;
    }
    state.iter().map(|v| v.abs()).sum::<f64>() / state.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn in_range(v: f64, lo: f64, hi: f64) -> bool {
        v >= lo && v < hi
    }

    #[test]
    fn draws_stay_in_their_ranges() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut confidence = 0.65;
        for _ in 0..2_000 {
            let r = simulate(&mut rng, confidence);
            confidence = r.confidence;
            assert!((0.0..=1.0).contains(&r.confidence));
            assert!(in_range(r.dominant_values.exploration, 0.3, 0.8));
            assert!(in_range(r.dominant_values.safety, 0.0, 0.4));
            assert!(in_range(r.dominant_values.cooperation, 0.2, 0.8));
            assert!(in_range(r.dominant_values.analytical, 0.3, 1.0));
            assert!(in_range(r.uncertainty_breakdown.epistemic, 0.0, 0.8));
            assert!(in_range(r.uncertainty_breakdown.aleatoric, 0.0, 0.4));
            assert!(in_range(r.uncertainty_breakdown.ontological, 0.0, 0.2));
            assert!(in_range(r.moral_weight, 0.0, 1.0));
            assert!(in_range(r.commitment_strength, 0.2, 1.0));
            assert!(in_range(r.future_impact, 0.0, 1.0));
        }
    }

    #[test]
    fn confidence_drift_is_bounded() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..500 {
            let r = simulate(&mut rng, 0.5);
            assert!((r.confidence - 0.5).abs() <= CONFIDENCE_DRIFT / 2.0);
        }
    }

    #[test]
    fn confidence_clamps_at_edges() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            assert!(simulate(&mut rng, 1.0).confidence <= 1.0);
            assert!(simulate(&mut rng, 0.0).confidence >= 0.0);
        }
    }

    #[test]
    fn activation_vector_shape() {
        let mut rng = StdRng::seed_from_u64(4);
        let v = activation_vector(&mut rng);
        assert_eq!(v.len(), STATE_DIMS);
        assert!(v.iter().all(|x| (-1.0..1.0).contains(x)));
        let m = magnitude(&v);
        assert!((0.0..=1.0).contains(&m));
    }

    #[test]
    fn magnitude_of_empty_is_zero() {
        assert_eq!(magnitude(&[]), 0.0);
        assert_eq!(magnitude(&[-0.5, 0.5]), 0.5);
    }
}
