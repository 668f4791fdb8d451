//! Calibration curve from descriptor distance to a similarity percentage.
//!
//! Five bands, nearest first. Each band is linear in distance and the slopes
//! are chosen so that the curve is continuous at every boundary:
//!
//! | band      | similarity at the band's far edge | slope per unit distance |
//! |-----------|-----------------------------------|-------------------------|
//! | Very High | 95                                | 12.5                    |
//! | High      | 85                                | 100                     |
//! | Good      | 70                                | 150                     |
//! | Low       | 50                                | 200                     |
//! | Very Low  | -                                 | 100, floored at 0       |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ScoringConfig;

/// Similarity band, ordered from most to least similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    #[serde(rename = "Very High")]
    VeryHigh,
    High,
    Good,
    Low,
    #[serde(rename = "Very Low")]
    VeryLow,
}

impl Confidence {
    pub const ALL: [Confidence; 5] = [
        Confidence::VeryHigh,
        Confidence::High,
        Confidence::Good,
        Confidence::Low,
        Confidence::VeryLow,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Confidence::VeryHigh => "Very High",
            Confidence::High => "High",
            Confidence::Good => "Good",
            Confidence::Low => "Low",
            Confidence::VeryLow => "Very Low",
        }
    }

    /// The three nearest bands count as a match.
    pub fn is_match(&self) -> bool {
        matches!(self, Confidence::VeryHigh | Confidence::High | Confidence::Good)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityResult {
    /// Percentage in [0, 100]
    pub similarity: f64,
    pub confidence: Confidence,
    pub is_match: bool,
}

impl SimilarityResult {
    fn new(similarity: f64, confidence: Confidence) -> Self {
        Self {
            similarity: similarity.clamp(0.0, 100.0),
            confidence,
            is_match: confidence.is_match(),
        }
    }
}

/// Score one descriptor distance.
///
/// When either face wears sunglasses every boundary moves out by
/// `cfg.sunglasses_adjustment`. Comparisons are strict, so a distance equal
/// to a boundary lands in the next, less similar band. A NaN distance scores
/// as Very Low with 0 similarity.
pub fn compute_similarity(distance: f64, any_sunglasses: bool, cfg: &ScoringConfig) -> SimilarityResult {
    if distance.is_nan() {
        return SimilarityResult::new(0.0, Confidence::VeryLow);
    }

    let adjust = if any_sunglasses {
        cfg.sunglasses_adjustment
    } else {
        0.0
    };
    let t = cfg.thresholds.shifted(adjust);

    if distance < t.very_high {
        SimilarityResult::new(95.0 + (t.very_high - distance) * 12.5, Confidence::VeryHigh)
    } else if distance < t.high {
        SimilarityResult::new(85.0 + (t.high - distance) * 100.0, Confidence::High)
    } else if distance < t.good {
        SimilarityResult::new(70.0 + (t.good - distance) * 150.0, Confidence::Good)
    } else if distance < t.low {
        SimilarityResult::new(50.0 + (t.low - distance) * 200.0, Confidence::Low)
    } else {
        SimilarityResult::new(
            (50.0 - (distance - t.low) * 100.0).max(0.0),
            Confidence::VeryLow,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdConfig;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn score(distance: f64) -> SimilarityResult {
        compute_similarity(distance, false, &ScoringConfig::default())
    }

    #[rstest]
    #[case::zero(0.0, 100.0, Confidence::VeryHigh)]
    #[case::very_high(0.39, 95.125, Confidence::VeryHigh)]
    #[case::high(0.45, 90.0, Confidence::High)]
    #[case::good(0.55, 77.5, Confidence::Good)]
    #[case::low(0.65, 60.0, Confidence::Low)]
    #[case::very_low(0.9, 30.0, Confidence::VeryLow)]
    #[case::far(1.5, 0.0, Confidence::VeryLow)]
    fn test_band_values(#[case] distance: f64, #[case] expected: f64, #[case] band: Confidence) {
        let r = score(distance);
        assert_relative_eq!(r.similarity, expected, epsilon = 1e-9);
        assert_eq!(r.confidence, band);
        assert_eq!(r.is_match, band.is_match());
    }

    #[rstest]
    #[case::very_high_edge(0.4, 95.0, Confidence::High)]
    #[case::high_edge(0.5, 85.0, Confidence::Good)]
    #[case::good_edge(0.6, 70.0, Confidence::Low)]
    #[case::low_edge(0.7, 50.0, Confidence::VeryLow)]
    fn test_boundary_goes_to_farther_band(
        #[case] distance: f64,
        #[case] expected: f64,
        #[case] band: Confidence,
    ) {
        let r = score(distance);
        assert_eq!(r.confidence, band);
        assert_relative_eq!(r.similarity, expected, epsilon = 1e-9);
    }

    #[rstest]
    #[case(0.4)]
    #[case(0.5)]
    #[case(0.6)]
    #[case(0.7)]
    fn test_continuous_at_boundaries(#[case] boundary: f64) {
        let eps = 1e-9;
        let below = score(boundary - eps).similarity;
        let at = score(boundary).similarity;
        assert!((below - at).abs() < 1e-6, "jump at {}: {} vs {}", boundary, below, at);
    }

    #[rstest]
    #[case::very_high(0.5, 95.0)]
    #[case::high(0.6, 85.0)]
    #[case::good(0.7, 70.0)]
    #[case::low(0.8, 50.0)]
    fn test_continuous_at_sunglasses_boundaries(#[case] boundary: f64, #[case] expected: f64) {
        let cfg = ScoringConfig::default();
        let eps = 1e-9;
        let below = compute_similarity(boundary - eps, true, &cfg).similarity;
        let at = compute_similarity(boundary, true, &cfg).similarity;
        assert!((below - at).abs() < 1e-6, "jump at {}: {} vs {}", boundary, below, at);
        assert_relative_eq!(at, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_match_verdicts() {
        assert!(score(0.39).is_match);
        assert!(score(0.45).is_match);
        assert!(score(0.55).is_match);
        assert!(!score(0.65).is_match);
        assert!(!score(0.9).is_match);
    }

    #[test]
    fn test_sunglasses_shift_boundaries() {
        let cfg = ScoringConfig::default();
        let with = compute_similarity(0.45, true, &cfg);
        let without = compute_similarity(0.45 - 0.1, false, &cfg);
        assert_eq!(with.confidence, without.confidence);
        assert_eq!(with.confidence, Confidence::VeryHigh);
        assert!(compute_similarity(0.65, true, &cfg).is_match);
        assert!(!compute_similarity(0.65, false, &cfg).is_match);
    }

    #[test]
    fn test_custom_adjustment() {
        let cfg = ScoringConfig {
            sunglasses_adjustment: 0.25,
            ..ScoringConfig::default()
        };
        assert_eq!(compute_similarity(0.6, true, &cfg).confidence, Confidence::VeryHigh);
    }

    #[test]
    fn test_custom_thresholds() {
        let cfg = ScoringConfig {
            thresholds: ThresholdConfig {
                very_high: 0.2,
                high: 0.3,
                good: 0.4,
                low: 0.5,
            },
            ..ScoringConfig::default()
        };
        let r = compute_similarity(0.45, false, &cfg);
        assert_eq!(r.confidence, Confidence::Low);
        assert_relative_eq!(r.similarity, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_output_always_in_range() {
        for d in [-10.0, -0.5, 0.0, 0.3, 0.7, 1.0, 2.0, 50.0, f64::INFINITY, f64::NEG_INFINITY] {
            let s = score(d).similarity;
            assert!((0.0..=100.0).contains(&s), "{} -> {}", d, s);
        }
        let mut d = 0.0;
        while d < 2.0 {
            let s = score(d).similarity;
            assert!((0.0..=100.0).contains(&s));
            d += 0.001;
        }
    }

    #[test]
    fn test_nan_scores_very_low() {
        let r = score(f64::NAN);
        assert_eq!(r.similarity, 0.0);
        assert_eq!(r.confidence, Confidence::VeryLow);
        assert!(!r.is_match);
    }

    #[test]
    fn test_pure() {
        let a = score(0.4321);
        let b = score(0.4321);
        assert_eq!(a.similarity.to_bits(), b.similarity.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn test_confidence_json_label() {
        let json = serde_json::to_string(&score(0.1)).unwrap();
        assert!(json.contains("\"Very High\""));
        assert!(json.contains("\"isMatch\":true"));
    }
}
