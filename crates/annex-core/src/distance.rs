//! Distance metrics and their scalar evaluation.
//!
//! The metric is a property of the index: it is chosen at creation time
//! and persisted in the index header. Evaluation here is plain scalar
//! code used by the exact-scan reference engine; a production ANN engine
//! brings its own distance kernels behind [`crate::engine::AnnEngine`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Distance metric used to rank search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// L1 (Manhattan) norm.
    L1,
    /// L2 (Euclidean) norm.
    L2,
    /// Angle between vectors, in radians.
    Angle,
    /// Cosine distance, `1 - cosine_similarity`.
    Cosine,
    /// Count of element positions that differ.
    Hamming,
    /// Angle over pre-normalized vectors.
    NormalizedAngle,
    /// Cosine distance over pre-normalized vectors.
    NormalizedCosine,
}

impl DistanceMetric {
    /// Returns the canonical configuration name for this metric.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::L1 => "l1",
            Self::L2 => "l2",
            Self::Angle => "angle",
            Self::Cosine => "cosine",
            Self::Hamming => "hamming",
            Self::NormalizedAngle => "normalizedangle",
            Self::NormalizedCosine => "normalizedcosine",
        }
    }

    /// Discriminant used in the persisted index header.
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::L1 => 0,
            Self::L2 => 1,
            Self::Angle => 2,
            Self::Cosine => 3,
            Self::Hamming => 4,
            Self::NormalizedAngle => 5,
            Self::NormalizedCosine => 6,
        }
    }

    /// Decodes a persisted header discriminant.
    pub(crate) fn from_u8(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(Self::L1),
            1 => Ok(Self::L2),
            2 => Ok(Self::Angle),
            3 => Ok(Self::Cosine),
            4 => Ok(Self::Hamming),
            5 => Ok(Self::NormalizedAngle),
            6 => Ok(Self::NormalizedCosine),
            _ => Err(Error::OptionApply(format!(
                "unknown distance metric discriminant {value}"
            ))),
        }
    }

    /// Evaluates the distance between two vectors of equal length.
    ///
    /// The normalized variants share the plain evaluation: an exact scan
    /// has no precomputed norms to exploit, and both cosine and angle are
    /// scale-invariant.
    #[must_use]
    pub fn evaluate(self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Self::L1 => manhattan_distance_scalar(a, b),
            Self::L2 => euclidean_distance_scalar(a, b),
            Self::Angle | Self::NormalizedAngle => angle_distance_scalar(a, b),
            Self::Cosine | Self::NormalizedCosine => cosine_distance_scalar(a, b),
            Self::Hamming => hamming_distance_scalar(a, b),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l1" => Ok(Self::L1),
            "l2" => Ok(Self::L2),
            "angle" => Ok(Self::Angle),
            "cosine" => Ok(Self::Cosine),
            "hamming" => Ok(Self::Hamming),
            "normalizedangle" => Ok(Self::NormalizedAngle),
            "normalizedcosine" => Ok(Self::NormalizedCosine),
            other => Err(Error::OptionApply(format!(
                "unknown distance metric {other:?}"
            ))),
        }
    }
}

fn manhattan_distance_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

fn euclidean_distance_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn cosine_similarity_scalar(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

fn cosine_distance_scalar(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity_scalar(a, b)
}

fn angle_distance_scalar(a: &[f32], b: &[f32]) -> f32 {
    cosine_similarity_scalar(a, b).clamp(-1.0, 1.0).acos()
}

#[allow(clippy::cast_precision_loss)]
fn hamming_distance_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).filter(|(x, y)| x != y).count() as f32
}
