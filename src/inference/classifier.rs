//! Feature vectors and the borrowed-model classifier.

use crate::config::{ClassifierModel, FeatureArray};
use crate::sensors::SensorReading;

use super::{linear_score, sigmoid, standardize};

/// Slot of the temperature reading in the raw vector.
pub const SLOT_TEMPERATURE: usize = 0;
/// Slot of the humidity reading in the raw vector.
pub const SLOT_HUMIDITY: usize = 1;

/// Ordered feature values, always exactly N long for the model that built it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: FeatureArray,
}

impl FeatureVector {
    /// Fresh raw vector: the model baseline with the reading written into
    /// slots 0 and 1 (slot 1 only when N > 1).
    pub fn from_reading(model: &ClassifierModel, reading: &SensorReading) -> Self {
        let mut values = model.baseline.clone();
        if let Some(t) = values.get_mut(SLOT_TEMPERATURE) {
            *t = reading.temperature;
        }
        if let Some(h) = values.get_mut(SLOT_HUMIDITY) {
            *h = reading.humidity;
        }
        Self { values }
    }

    /// Wrap raw values.  Returns `None` when the length differs from N.
    pub fn from_raw(model: &ClassifierModel, raw: &[f32]) -> Option<Self> {
        if raw.len() != model.len() {
            return None;
        }
        FeatureArray::from_slice(raw).ok().map(|values| Self { values })
    }

    /// Standardised copy using the model's MEAN and STD.
    pub fn standardized(&self, model: &ClassifierModel) -> Self {
        let values = self
            .values
            .iter()
            .zip(model.mean.iter().zip(model.std.iter()))
            .map(|(&x, (&m, &s))| standardize(x, m, s))
            .collect();
        Self { values }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn values(&self) -> &FeatureArray {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Output of one inference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceResult {
    /// Positive-class probability in [0, 1].
    pub probability: f32,
    /// Pre-sigmoid score (`bias + Σ W·x`).
    pub score: f32,
    /// 1 when `probability >= threshold`, else 0.
    pub class: u8,
}

/// Classifier bound to one immutable model and decision threshold.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    model: &'a ClassifierModel,
    threshold: f32,
}

impl<'a> Classifier<'a> {
    pub fn new(model: &'a ClassifierModel, threshold: f32) -> Self {
        Self { model, threshold }
    }

    pub fn model(&self) -> &'a ClassifierModel {
        self.model
    }

    /// `sigmoid(linear_score(standardize(raw), W, bias))`.
    pub fn predict(&self, raw: &FeatureVector) -> InferenceResult {
        let x = raw.standardized(self.model);
        let score = linear_score(x.as_slice(), &self.model.weights, self.model.bias);
        let probability = sigmoid(score);
        InferenceResult {
            probability,
            score,
            class: u8::from(probability >= self.threshold),
        }
    }

    /// Probability only.
    pub fn probability(&self, raw: &FeatureVector) -> f32 {
        self.predict(raw).probability
    }
}
