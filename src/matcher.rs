use facerank_vision::{euclidean_distance, Descriptor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::config::ScoringConfig;
use crate::error::{MatchError, MatchResult};
use crate::scorer::{compute_similarity, Confidence, SimilarityResult};

/// How several reference-to-candidate distances are reduced to one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AggregationMethod {
    /// Closest reference wins
    Best,
    #[default]
    Average,
    /// Resists a single outlier reference
    Median,
}

impl AggregationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::Best => "best",
            AggregationMethod::Average => "average",
            AggregationMethod::Median => "median",
        }
    }

    /// Parse a user supplied name. Anything unrecognised means `Average`.
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "best" => AggregationMethod::Best,
            "average" => AggregationMethod::Average,
            "median" => AggregationMethod::Median,
            other => {
                log::warn!("unknown aggregation method {:?}, using average", other);
                AggregationMethod::Average
            }
        }
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AggregationMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AggregationMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(AggregationMethod::parse_lenient(&name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiReferenceResult {
    pub similarity: f64,
    pub confidence: Confidence,
    pub is_match: bool,
    /// One per reference, in reference order
    pub distances: Vec<f64>,
    pub final_distance: f64,
    pub method: AggregationMethod,
    pub reference_count: usize,
}

impl MultiReferenceResult {
    pub fn similarity_result(&self) -> SimilarityResult {
        SimilarityResult {
            similarity: self.similarity,
            confidence: self.confidence,
            is_match: self.is_match,
        }
    }
}

/// Reduce per-reference distances with `method`. `None` when empty.
pub fn reduce_distances(distances: &[f64], method: AggregationMethod) -> Option<f64> {
    if distances.is_empty() {
        return None;
    }
    let reduced = match method {
        AggregationMethod::Best => distances.iter().copied().fold(f64::INFINITY, f64::min),
        AggregationMethod::Average => distances.iter().sum::<f64>() / distances.len() as f64,
        AggregationMethod::Median => {
            let mut sorted = distances.to_vec();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 1 {
                sorted[mid]
            } else {
                (sorted[mid - 1] + sorted[mid]) / 2.0
            }
        }
    };
    Some(reduced)
}

/// Fails when any descriptor's length differs from the first one's.
pub fn check_descriptor_lengths<'a>(
    descriptors: impl IntoIterator<Item = &'a Descriptor>,
) -> MatchResult<Option<usize>> {
    let mut expected = None;
    for d in descriptors {
        match expected {
            None => expected = Some(d.len()),
            Some(len) if len != d.len() => {
                return Err(MatchError::DescriptorLength {
                    expected: len,
                    found: d.len(),
                })
            }
            Some(_) => {}
        }
    }
    Ok(expected)
}

/// Score a candidate descriptor against several references of the same subject.
pub fn compute_multi_reference_similarity(
    references: &[Descriptor],
    candidate: &Descriptor,
    any_sunglasses: bool,
    method: AggregationMethod,
    cfg: &ScoringConfig,
) -> MatchResult<MultiReferenceResult> {
    check_descriptor_lengths(references.iter().chain(std::iter::once(candidate)))?;
    let distances: Vec<f64> = references
        .iter()
        .map(|r| euclidean_distance(r, candidate))
        .collect();
    let final_distance = reduce_distances(&distances, method)
        .ok_or(MatchError::InvalidInput("No reference descriptors provided"))?;

    let scored = compute_similarity(final_distance, any_sunglasses, cfg);
    log::debug!(
        "{} reference(s), {} distance {:.4} -> {:.1}% ({})",
        references.len(),
        method,
        final_distance,
        scored.similarity,
        scored.confidence
    );

    Ok(MultiReferenceResult {
        similarity: scored.similarity,
        confidence: scored.confidence,
        is_match: scored.is_match,
        distances,
        final_distance,
        method,
        reference_count: references.len(),
    })
}

/// Single-reference convenience: distance then score.
pub fn match_descriptor(
    reference: &Descriptor,
    candidate: &Descriptor,
    any_sunglasses: bool,
    cfg: &ScoringConfig,
) -> (f64, SimilarityResult) {
    let distance = euclidean_distance(reference, candidate);
    (distance, compute_similarity(distance, any_sunglasses, cfg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn d(v: f32) -> Descriptor {
        Descriptor::new(vec![v])
    }

    fn refs(values: &[f32]) -> Vec<Descriptor> {
        values.iter().map(|v| d(*v)).collect()
    }

    #[test]
    fn test_empty_references_rejected() {
        let err = compute_multi_reference_similarity(
            &[],
            &d(0.0),
            false,
            AggregationMethod::Average,
            &ScoringConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, MatchError::InvalidInput("No reference descriptors provided"));
        assert_eq!(err.to_string(), "No reference descriptors provided");
    }

    #[test]
    fn test_mismatched_candidate_length_rejected() {
        let references = vec![Descriptor::new(vec![0.0; 128])];
        let mut longer = vec![0.0f32; 128];
        longer.extend(std::iter::repeat(1.0).take(384));
        let err = compute_multi_reference_similarity(
            &references,
            &Descriptor::new(longer),
            false,
            AggregationMethod::Best,
            &ScoringConfig::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            MatchError::DescriptorLength {
                expected: 128,
                found: 512
            }
        );
    }

    #[rstest]
    #[case(AggregationMethod::Best)]
    #[case(AggregationMethod::Average)]
    #[case(AggregationMethod::Median)]
    fn test_single_reference_methods_agree(#[case] method: AggregationMethod) {
        let reference = Descriptor::new(vec![0.1, 0.2, 0.3]);
        let candidate = Descriptor::new(vec![0.4, 0.2, -0.1]);
        let r = compute_multi_reference_similarity(
            std::slice::from_ref(&reference),
            &candidate,
            false,
            method,
            &ScoringConfig::default(),
        )
        .unwrap();
        assert_eq!(r.final_distance, euclidean_distance(&reference, &candidate));
        assert_eq!(r.reference_count, 1);
        assert_eq!(r.method, method);
    }

    #[test]
    fn test_median_even_count() {
        let m = reduce_distances(&[0.9, 0.3, 0.7, 0.5], AggregationMethod::Median).unwrap();
        assert_relative_eq!(m, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_median_odd_count() {
        let m = reduce_distances(&[0.9, 0.2, 0.4], AggregationMethod::Median).unwrap();
        assert_eq!(m, 0.4);
    }

    #[test]
    fn test_best_and_average() {
        let distances = [0.3, 0.5, 0.7, 0.9];
        assert_eq!(reduce_distances(&distances, AggregationMethod::Best), Some(0.3));
        assert_relative_eq!(
            reduce_distances(&distances, AggregationMethod::Average).unwrap(),
            0.6,
            epsilon = 1e-12
        );
        assert_eq!(reduce_distances(&[], AggregationMethod::Best), None);
    }

    #[test]
    fn test_distances_keep_reference_order() {
        let r = compute_multi_reference_similarity(
            &refs(&[0.9, 0.3, 0.7, 0.5]),
            &d(0.0),
            false,
            AggregationMethod::Median,
            &ScoringConfig::default(),
        )
        .unwrap();
        let expected = [0.9, 0.3, 0.7, 0.5];
        assert_eq!(r.distances.len(), r.reference_count);
        for (got, want) in r.distances.iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-6);
        }
        assert_relative_eq!(r.final_distance, 0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_best_picks_closest_reference() {
        let r = compute_multi_reference_similarity(
            &refs(&[0.9, 0.35, 0.7]),
            &d(0.0),
            false,
            AggregationMethod::Best,
            &ScoringConfig::default(),
        )
        .unwrap();
        assert_relative_eq!(r.final_distance, 0.35, epsilon = 1e-6);
        assert!(r.is_match);
        assert_eq!(r.confidence, Confidence::VeryHigh);
    }

    #[test]
    fn test_sunglasses_passed_through() {
        let cfg = ScoringConfig::default();
        let references = refs(&[0.45]);
        let plain = compute_multi_reference_similarity(&references, &d(0.0), false, AggregationMethod::Average, &cfg)
            .unwrap();
        let shaded = compute_multi_reference_similarity(&references, &d(0.0), true, AggregationMethod::Average, &cfg)
            .unwrap();
        assert_eq!(plain.confidence, Confidence::High);
        assert_eq!(shaded.confidence, Confidence::VeryHigh);
        assert!(shaded.similarity > plain.similarity);
    }

    #[rstest]
    #[case("best", AggregationMethod::Best)]
    #[case("Median", AggregationMethod::Median)]
    #[case(" average ", AggregationMethod::Average)]
    #[case("mode", AggregationMethod::Average)]
    #[case("", AggregationMethod::Average)]
    fn test_parse_lenient(#[case] name: &str, #[case] expected: AggregationMethod) {
        assert_eq!(AggregationMethod::parse_lenient(name), expected);
    }

    #[test]
    fn test_method_json() {
        assert_eq!(serde_json::to_string(&AggregationMethod::Median).unwrap(), "\"median\"");
        let m: AggregationMethod = serde_json::from_str("\"nonsense\"").unwrap();
        assert_eq!(m, AggregationMethod::Average);
    }
}
