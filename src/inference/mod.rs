//! Linear-classifier inference.
//!
//! ```text
//!  raw X ──▶ standardize(MEAN, STD) ──▶ bias + Σ W·x ──▶ sigmoid ──▶ p ∈ [0, 1]
//! ```
//!
//! Everything here is a pure function of its inputs and the model: no
//! hidden state, no I/O, and identical inputs give bit-identical outputs.

pub mod classifier;

pub use classifier::{Classifier, FeatureVector, InferenceResult};

/// Beyond this magnitude the logistic is pinned to 0 or 1.
pub const SIGMOID_CLAMP: f32 = 50.0;

/// Zero-mean/unit-variance scaling of one feature.  A zero scale maps to 0.
#[inline]
pub fn standardize(raw: f32, mean: f32, std: f32) -> f32 {
    if std == 0.0 { 0.0 } else { (raw - mean) / std }
}

/// `bias + Σ W[i]·X[i]` over the common prefix of both slices.
pub fn linear_score(x: &[f32], weights: &[f32], bias: f32) -> f32 {
    x.iter()
        .zip(weights.iter())
        .fold(bias, |acc, (xi, wi)| acc + wi * xi)
}

/// Saturating logistic function.
///
/// A NaN score (only reachable through overflowing inputs) maps to 0 so
/// that the negative class is chosen.
pub fn sigmoid(z: f32) -> f32 {
    if z.is_nan() || z <= -SIGMOID_CLAMP {
        0.0
    } else if z >= SIGMOID_CLAMP {
        1.0
    } else {
        1.0 / (1.0 + (-z).exp())
    }
}
