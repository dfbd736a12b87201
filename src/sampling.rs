use rand::Rng;
use rand_distr::StandardNormal;

use crate::events::RiskEvent;

/// Midpoint of the probability range, scaled by the event's timeframe.
/// Unclamped: long windows may exceed 1.
pub fn base_probability(event: &RiskEvent) -> f64 {
    let avg = event.lower_prob + (event.upper_prob - event.lower_prob) / 2.0;
    event.timeframe.scale(avg)
}

/// Add `N(0, std_dev)` noise to a probability and clamp to `[0, 1]`.
pub fn perturb_probability(probability: f64, std_dev: f64, rng: &mut impl Rng) -> f64 {
    perturb_value(probability, std_dev, rng).clamp(0.0, 1.0)
}

/// Add `N(0, std_dev)` noise to a raw value. No clamping.
pub fn perturb_value(value: f64, std_dev: f64, rng: &mut impl Rng) -> f64 {
    if std_dev == 0.0 {
        return value;
    }
    let z: f64 = rng.sample(StandardNormal);
    value + z * std_dev
}

/// Draw a signed impact for an occurred trial.
///
/// Uniform on `[min, max]` (or `[max, min]` for an inverted range), perturbed
/// by the confidence standard deviation when present, floored at 0. Cost-saving
/// events return the negation: an avoided loss.
pub fn sample_impact(
    (min, max): (f64, f64),
    confidence_std_dev: Option<f64>,
    is_cost_saving: bool,
    rng: &mut impl Rng,
) -> f64 {
    let u: f64 = rng.random();
    let mut impact = min + u * (max - min);
    if let Some(sd) = confidence_std_dev {
        impact = perturb_value(impact, sd, rng);
    }
    let impact = impact.max(0.0);
    if is_cost_saving { -impact } else { impact }
}

/// Perturb one implementation-cost bound by its own standard deviation and
/// floor the result at 0.
pub fn sample_cost(bound: f64, std_dev: Option<f64>, rng: &mut impl Rng) -> f64 {
    perturb_value(bound, std_dev.unwrap_or(0.0), rng).max(0.0)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::types::Timeframe;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(42)
    }

    #[test]
    fn base_probability_is_scaled_midpoint() {
        let ev = RiskEvent::new("A", 0.2, 0.4, Timeframe::Yearly);
        assert_relative_eq!(base_probability(&ev), 0.3, epsilon = 1e-12);
        let ev = RiskEvent::new("A", 0.3, 0.6, Timeframe::Monthly);
        assert_relative_eq!(base_probability(&ev), 0.45 / 12.0, epsilon = 1e-12);
        let ev = RiskEvent::new("A", 0.15, 0.35, Timeframe::EveryFiveYears);
        assert_relative_eq!(base_probability(&ev), 1.25, epsilon = 1e-12);
    }

    #[test]
    fn zero_std_dev_leaves_value_untouched() {
        let mut rng = rng();
        assert_eq!(perturb_value(12_345.0, 0.0, &mut rng), 12_345.0);
        assert_eq!(perturb_probability(0.3, 0.0, &mut rng), 0.3);
    }

    #[test]
    fn zero_std_dev_still_clamps_long_window_probability() {
        let mut rng = rng();
        assert_eq!(perturb_probability(1.5, 0.0, &mut rng), 1.0);
    }

    /// Perturbation is mean-zero: 100k draws around 0.5 with sd 0.05 must
    /// average within 0.002 of 0.5 (clamping is negligible at 10 sigma).
    #[test]
    fn perturbation_is_centred() {
        let mut rng = rng();
        let n = 100_000;
        let mean: f64 =
            (0..n).map(|_| perturb_probability(0.5, 0.05, &mut rng)).sum::<f64>() / n as f64;
        assert!((mean - 0.5).abs() < 0.002, "mean {mean:.4} drifted from 0.5");
    }

    #[test]
    fn impact_lies_within_bounds_without_noise() {
        let mut rng = rng();
        for _ in 0..10_000 {
            let x = sample_impact((10_000.0, 50_000.0), None, false, &mut rng);
            assert!((10_000.0..=50_000.0).contains(&x), "impact {x} out of range");
        }
    }

    #[test]
    fn impact_mean_is_range_midpoint() {
        let mut rng = rng();
        let n = 100_000;
        let mean: f64 = (0..n)
            .map(|_| sample_impact((10_000.0, 50_000.0), None, false, &mut rng))
            .sum::<f64>()
            / n as f64;
        assert!((mean - 30_000.0).abs() < 300.0, "impact mean {mean:.0} not near 30_000");
    }

    #[test]
    fn cost_saving_impact_is_never_positive() {
        let mut rng = rng();
        for _ in 0..10_000 {
            let x = sample_impact((10_000.0, 50_000.0), Some(20_000.0), true, &mut rng);
            assert!(x <= 0.0, "cost-saving impact {x} reported as a loss");
        }
    }

    #[test]
    fn inverted_impact_range_samples_between_the_values() {
        let mut rng = rng();
        for _ in 0..10_000 {
            let x = sample_impact((50_000.0, 10_000.0), None, false, &mut rng);
            assert!((10_000.0..=50_000.0).contains(&x), "impact {x} escaped inverted range");
        }
    }

    #[test]
    fn cost_is_floored_at_zero() {
        let mut rng = rng();
        for _ in 0..10_000 {
            let c = sample_cost(100.0, Some(10_000.0), &mut rng);
            assert!(c >= 0.0, "cost {c} went negative");
        }
    }

    proptest! {
        #[test]
        fn perturbed_probability_stays_in_unit_interval(
            p in -2.0f64..3.0,
            sd in 0.0f64..1e6,
            seed in any::<u64>(),
        ) {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let q = perturb_probability(p, sd, &mut rng);
            prop_assert!((0.0..=1.0).contains(&q));
        }
    }
}
