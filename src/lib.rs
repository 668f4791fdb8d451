pub mod config;
pub mod error;
pub mod matcher;
pub mod ranker;
pub mod scorer;
pub mod storage;

// Re-export vision types for convenience
pub use facerank_vision::{annotate, detections, face, DetectedFace, Descriptor, DetectionFile};

pub use error::MatchError;
pub use matcher::{compute_multi_reference_similarity, AggregationMethod, MultiReferenceResult};
pub use ranker::{rank_comparisons, ComparisonRecord, ReferenceSet};
pub use scorer::{compute_similarity, Confidence, SimilarityResult};
