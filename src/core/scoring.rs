//! Retrieval and answer-quality metrics.
//!
//! [`hit_rate`] and [`mrr`] compare the sources an agent cited against the
//! expected sources of a dataset item. [`ScoringFormula`] folds the judge
//! score, hit rate and token cost into a single number used to rank runs.

use std::collections::HashSet;

/// Returns `1.0` if any of `actual` is in `expected`, else `0.0`.
#[must_use]
pub fn hit_rate(expected: &HashSet<String>, actual: &[String]) -> f64 {
    if actual.iter().any(|source| expected.contains(source)) {
        1.0
    } else {
        0.0
    }
}

/// Reciprocal of the 1-based rank of the first `actual` source found in
/// `expected`, or `0.0` if none match.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mrr(expected: &HashSet<String>, actual: &[String]) -> f64 {
    actual
        .iter()
        .position(|source| expected.contains(source))
        .map_or(0.0, |idx| 1.0 / (idx + 1) as f64)
}

/// Combines per-question metrics into one ranking score.
///
/// Implementations must reward higher judge scores and hit rates and
/// penalise higher token counts.
pub trait ScoringFormula: Send + Sync {
    /// Scores one evaluated question.
    fn score(&self, hit_rate: f64, judge_score: f64, num_tokens: u64) -> f64;
}

/// Linear blend `alpha * judge + beta * hit - gamma * tokens / token_divisor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedScore {
    /// Weight on the judge score.
    pub alpha: f64,
    /// Weight on the hit rate.
    pub beta: f64,
    /// Weight on the token penalty.
    pub gamma: f64,
    /// Tokens per unit of penalty.
    pub token_divisor: f64,
}

impl WeightedScore {
    /// Default judge weight.
    pub const DEFAULT_ALPHA: f64 = 2.0;
    /// Default hit-rate weight.
    pub const DEFAULT_BETA: f64 = 0.5;
    /// Default token penalty weight.
    pub const DEFAULT_GAMMA: f64 = 1.5;
    /// Default token divisor.
    pub const DEFAULT_TOKEN_DIVISOR: f64 = 1000.0;
}

impl Default for WeightedScore {
    fn default() -> Self {
        Self {
            alpha: Self::DEFAULT_ALPHA,
            beta: Self::DEFAULT_BETA,
            gamma: Self::DEFAULT_GAMMA,
            token_divisor: Self::DEFAULT_TOKEN_DIVISOR,
        }
    }
}

impl ScoringFormula for WeightedScore {
    #[allow(clippy::cast_precision_loss)]
    fn score(&self, hit_rate: f64, judge_score: f64, num_tokens: u64) -> f64 {
        let divisor = if self.token_divisor > 0.0 {
            self.token_divisor
        } else {
            Self::DEFAULT_TOKEN_DIVISOR
        };
        let reward = self.alpha.mul_add(judge_score, self.beta * hit_rate);
        self.gamma.mul_add(-(num_tokens as f64 / divisor), reward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_hit_rate() {
        let hit = hit_rate(&set(&["A", "B"]), &list(&["X", "A"]));
        assert!((hit - 1.0).abs() < f64::EPSILON);
        assert!(hit_rate(&set(&["A"]), &list(&["B"])).abs() < f64::EPSILON);
        assert!(hit_rate(&set(&["A"]), &[]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mrr() {
        assert!((mrr(&set(&["A"]), &list(&["B", "A", "C"])) - 0.5).abs() < f64::EPSILON);
        assert!(mrr(&set(&["A"]), &[]).abs() < f64::EPSILON);
        assert!((mrr(&set(&["A", "C"]), &list(&["C", "A"])) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weighted_score_default() {
        let formula = WeightedScore::default();
        let score = formula.score(1.0, 0.8, 2000);
        // 2.0 * 0.8 + 0.5 * 1.0 - 1.5 * 2.0
        assert!((score - (-0.9)).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_score_zero_divisor_falls_back() {
        let formula = WeightedScore {
            token_divisor: 0.0,
            ..WeightedScore::default()
        };
        assert!(formula.score(0.0, 0.0, 1000).is_finite());
    }

    proptest! {
        #[test]
        fn mrr_is_bounded_and_never_exceeds_hit_rate(
            expected in prop::collection::hash_set("[a-d]", 0..4),
            actual in prop::collection::vec("[a-f]", 0..8),
        ) {
            let m = mrr(&expected, &actual);
            let h = hit_rate(&expected, &actual);
            prop_assert!((0.0..=1.0).contains(&m));
            prop_assert!(m <= h);
            prop_assert_eq!(m > 0.0, h > 0.0);
        }

        #[test]
        fn weighted_score_is_monotonic(
            judge in 0.0f64..1.0,
            hit in 0.0f64..1.0,
            tokens in 0u64..100_000,
            bump in 0.001f64..1.0,
        ) {
            let formula = WeightedScore::default();
            let base = formula.score(hit, judge, tokens);
            prop_assert!(formula.score(hit, judge + bump, tokens) > base);
            prop_assert!(formula.score(hit + bump, judge, tokens) > base);
            prop_assert!(formula.score(hit, judge, tokens + 1) < base);
        }
    }
}
