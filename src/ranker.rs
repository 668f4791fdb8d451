use facerank_vision::{Descriptor, DetectedFace, DetectionFile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ScoringConfig;
use crate::error::{MatchError, MatchResult};
use crate::matcher::{
    check_descriptor_lengths, compute_multi_reference_similarity, match_descriptor, AggregationMethod,
    MultiReferenceResult,
};
use crate::scorer::{Confidence, SimilarityResult};

/// Which face(s) the comparison set is ranked against.
#[derive(Debug, Clone)]
pub enum ReferenceSet {
    Single(DetectedFace),
    Multi {
        faces: Vec<DetectedFace>,
        method: AggregationMethod,
    },
}

impl ReferenceSet {
    /// True when any reference face wears sunglasses.
    pub fn any_sunglasses(&self) -> bool {
        match self {
            ReferenceSet::Single(face) => face.has_sunglasses,
            ReferenceSet::Multi { faces, .. } => faces.iter().any(|f| f.has_sunglasses),
        }
    }

    /// The single reference's age, or the mean of the known ages.
    pub fn age(&self) -> Option<f32> {
        match self {
            ReferenceSet::Single(face) => face.age,
            ReferenceSet::Multi { faces, .. } => {
                let ages: Vec<f32> = faces.iter().filter_map(|f| f.age).collect();
                if ages.is_empty() {
                    None
                } else {
                    Some(ages.iter().sum::<f32>() / ages.len() as f32)
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReferenceSet::Single(_) => 1,
            ReferenceSet::Multi { faces, .. } => faces.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scoring outcome for one comparison face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum MatchOutcome {
    Single {
        distance: f64,
        #[serde(flatten)]
        result: SimilarityResult,
    },
    Multi(MultiReferenceResult),
}

impl MatchOutcome {
    pub fn similarity(&self) -> f64 {
        self.result().similarity
    }

    pub fn confidence(&self) -> Confidence {
        self.result().confidence
    }

    pub fn is_match(&self) -> bool {
        self.result().is_match
    }

    pub fn distance(&self) -> f64 {
        match self {
            MatchOutcome::Single { distance, .. } => *distance,
            MatchOutcome::Multi(m) => m.final_distance,
        }
    }

    pub fn result(&self) -> SimilarityResult {
        match self {
            MatchOutcome::Single { result, .. } => *result,
            MatchOutcome::Multi(m) => m.similarity_result(),
        }
    }
}

/// One row of a ranked result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRecord {
    pub filename: String,
    pub image_index: usize,
    pub face_index: usize,
    pub result: MatchOutcome,
    pub has_sunglasses: bool,
    pub reference_sunglasses: bool,
    pub age: Option<f32>,
    pub reference_age: Option<f32>,
    pub quality: Option<u8>,
}

impl ComparisonRecord {
    pub fn similarity(&self) -> f64 {
        self.result.similarity()
    }
}

fn score_face(
    reference: &ReferenceSet,
    reference_descriptors: &[Descriptor],
    face: &DetectedFace,
    any_sunglasses: bool,
    cfg: &ScoringConfig,
) -> MatchResult<MatchOutcome> {
    Ok(match reference {
        ReferenceSet::Single(r) => {
            let (distance, result) = match_descriptor(&r.descriptor, &face.descriptor, any_sunglasses, cfg);
            MatchOutcome::Single { distance, result }
        }
        ReferenceSet::Multi { method, .. } => MatchOutcome::Multi(compute_multi_reference_similarity(
            reference_descriptors,
            &face.descriptor,
            any_sunglasses,
            *method,
            cfg,
        )?),
    })
}

/// Score every face of every comparison image and rank by descending similarity.
///
/// Images and faces are visited in input order and the sort is stable, so
/// equal similarities keep that order.
pub fn rank_comparisons(
    reference: &ReferenceSet,
    images: &[DetectionFile],
    cfg: &ScoringConfig,
) -> MatchResult<Vec<ComparisonRecord>> {
    if reference.is_empty() {
        return Err(MatchError::InvalidInput("No reference descriptors provided"));
    }

    let reference_descriptors: Vec<Descriptor> = match reference {
        ReferenceSet::Single(_) => Vec::new(),
        ReferenceSet::Multi { faces, .. } => faces.iter().map(|f| f.descriptor.clone()).collect(),
    };
    let reference_len = match reference {
        ReferenceSet::Single(face) => face.descriptor.len(),
        ReferenceSet::Multi { .. } => check_descriptor_lengths(&reference_descriptors)?.unwrap_or(0),
    };
    let reference_sunglasses = reference.any_sunglasses();
    let reference_age = reference.age();

    let mut records = Vec::new();
    for (image_index, image) in images.iter().enumerate() {
        for (face_index, face) in image.faces.iter().enumerate() {
            if face.descriptor.len() != reference_len {
                return Err(MatchError::DescriptorLength {
                    expected: reference_len,
                    found: face.descriptor.len(),
                });
            }
            let any_sunglasses = face.has_sunglasses || reference_sunglasses;
            let result = score_face(reference, &reference_descriptors, face, any_sunglasses, cfg)?;
            records.push(ComparisonRecord {
                filename: image.source.clone(),
                image_index,
                face_index,
                result,
                has_sunglasses: face.has_sunglasses,
                reference_sunglasses,
                age: face.age,
                reference_age,
                quality: face.quality,
            });
        }
    }

    sort_by_similarity(&mut records);
    log::debug!(
        "ranked {} face(s) from {} image(s) against {} reference(s)",
        records.len(),
        images.len(),
        reference.len()
    );
    Ok(records)
}

/// Stable sort, highest similarity first.
pub fn sort_by_similarity(records: &mut [ComparisonRecord]) {
    records.sort_by(|a, b| b.similarity().total_cmp(&a.similarity()));
}

pub fn filter_matches(records: Vec<ComparisonRecord>) -> Vec<ComparisonRecord> {
    records.into_iter().filter(|r| r.result.is_match()).collect()
}

pub fn top_n(mut records: Vec<ComparisonRecord>, n: usize) -> Vec<ComparisonRecord> {
    records.truncate(n);
    records
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankSummary {
    pub total_faces: usize,
    pub matches: usize,
    pub by_confidence: BTreeMap<Confidence, usize>,
    pub best_similarity: Option<f64>,
}

impl RankSummary {
    pub fn from_records(records: &[ComparisonRecord]) -> Self {
        let mut by_confidence: BTreeMap<Confidence, usize> =
            Confidence::ALL.iter().map(|c| (*c, 0)).collect();
        for r in records {
            *by_confidence.entry(r.result.confidence()).or_default() += 1;
        }
        Self {
            total_faces: records.len(),
            matches: records.iter().filter(|r| r.result.is_match()).count(),
            by_confidence,
            best_similarity: records
                .iter()
                .map(|r| r.similarity())
                .fold(None, |acc, s| match acc {
                    Some(best) if best >= s => Some(best),
                    _ => Some(s),
                }),
        }
    }
}
