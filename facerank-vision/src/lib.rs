pub mod annotate;
pub mod detections;
pub mod face;
pub mod luma;
pub mod quality;
pub mod sunglasses;

// Re-export commonly used types
pub use detections::DetectionFile;
pub use face::{euclidean_distance, BoundingBox, Descriptor, DetectedFace, Point};
pub use sunglasses::{SunglassesCheck, SunglassesConfig};
