use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Number of landmark points produced by the 68-point landmark model.
pub const LANDMARK_COUNT: usize = 68;

/// Face descriptor produced by the external recognizer (typically 128 floats).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f32>", into = "Vec<f32>")]
pub struct Descriptor {
    pub vector: Array1<f32>,
}

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            vector: Array1::from_vec(values),
        }
    }

    pub fn len(&self) -> usize {
        self.vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.vector.to_vec()
    }
}

impl From<Vec<f32>> for Descriptor {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

impl From<Descriptor> for Vec<f32> {
    fn from(d: Descriptor) -> Self {
        d.vector.to_vec()
    }
}

/// Euclidean distance between two descriptors.
///
/// Only defined for descriptors of equal length; callers compare lengths
/// first. Accumulates in f64.
pub fn euclidean_distance(a: &Descriptor, b: &Descriptor) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "descriptor lengths differ");
    a.vector
        .iter()
        .zip(b.vector.iter())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn short_side(&self) -> f32 {
        self.width.min(self.height)
    }
}

/// One face found by the external detector, with everything the ranking
/// core consumes already attached.
///
/// Values are built once; the `with_*` methods return a new face rather than
/// mutating one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFace {
    pub descriptor: Descriptor,
    pub bbox: BoundingBox,
    #[serde(default)]
    pub landmarks: Vec<Point>,
    #[serde(default)]
    pub age: Option<f32>,
    #[serde(default)]
    pub has_sunglasses: bool,
    /// 0-100
    #[serde(default)]
    pub quality: Option<u8>,
}

impl DetectedFace {
    pub fn new(descriptor: Descriptor, bbox: BoundingBox) -> Self {
        Self {
            descriptor,
            bbox,
            landmarks: Vec::new(),
            age: None,
            has_sunglasses: false,
            quality: None,
        }
    }

    pub fn with_landmarks(self, landmarks: Vec<Point>) -> Self {
        Self { landmarks, ..self }
    }

    pub fn with_age(self, age: Option<f32>) -> Self {
        Self { age, ..self }
    }

    pub fn with_sunglasses(self, has_sunglasses: bool) -> Self {
        Self {
            has_sunglasses,
            ..self
        }
    }

    pub fn with_quality(self, quality: Option<u8>) -> Self {
        Self {
            quality: quality.map(|q| q.min(100)),
            ..self
        }
    }

    pub fn has_full_landmarks(&self) -> bool {
        self.landmarks.len() >= LANDMARK_COUNT
    }
}
