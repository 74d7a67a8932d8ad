//! Wilson score interval for binomial proportions.
//!
//! Better behaved than the normal approximation for the small counts typical
//! of a single evaluation run.

use serde::{Deserialize, Serialize};

/// z for a two-sided 95% interval.
pub const Z_95: f64 = 1.96;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
  pub lower: f64,
  pub upper: f64,
}

impl ConfidenceInterval {
  pub fn width(&self) -> f64 {
    self.upper - self.lower
  }
}

/// 95% Wilson interval for `successes` out of `trials`. `(0, 0)` when there are no trials.
pub fn wilson_interval(successes: usize, trials: usize) -> ConfidenceInterval {
  if trials == 0 {
    return ConfidenceInterval::default();
  }

  let n = trials as f64;
  let p = successes.min(trials) as f64 / n;
  let z2 = Z_95 * Z_95;

  let denominator = 1.0 + z2 / n;
  let center = (p + z2 / (2.0 * n)) / denominator;
  let margin = Z_95 * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denominator;

  // Rounding can push a bound past the point estimate at p = 0 or p = 1
  ConfidenceInterval {
    lower: (center - margin).clamp(0.0, p),
    upper: (center + margin).clamp(p, 1.0),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_no_trials() {
    assert_eq!(wilson_interval(0, 0), ConfidenceInterval { lower: 0.0, upper: 0.0 });
  }

  #[test]
  fn test_known_value() {
    // 8/10 → [0.490, 0.943]
    let ci = wilson_interval(8, 10);
    assert!((ci.lower - 0.4902).abs() < 1e-3);
    assert!((ci.upper - 0.9433).abs() < 1e-3);
  }

  #[test]
  fn test_bounds_bracket_point_estimate() {
    for trials in 1..=40 {
      for successes in 0..=trials {
        let p = successes as f64 / trials as f64;
        let ci = wilson_interval(successes, trials);
        assert!(0.0 <= ci.lower, "{successes}/{trials}");
        assert!(ci.lower <= p, "{successes}/{trials}");
        assert!(p <= ci.upper, "{successes}/{trials}");
        assert!(ci.upper <= 1.0, "{successes}/{trials}");
      }
    }
  }

  #[test]
  fn test_narrows_with_more_trials() {
    assert!(wilson_interval(50, 100).width() < wilson_interval(5, 10).width());
  }
}
