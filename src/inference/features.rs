//! Feature vector assembly.

use super::domain::{FeatureVector, PredictionRequest, FEATURE_COUNT, PLACEHOLDER_TAIL};

/// Lay out `[age, weight, height, bmi]` followed by the placeholder tail.
pub fn assemble(request: &PredictionRequest) -> FeatureVector {
    let mut values = [0.0; FEATURE_COUNT];
    values[0] = request.age as f64;
    values[1] = request.weight;
    values[2] = request.height;
    values[3] = request.bmi;
    values[4..].copy_from_slice(&PLACEHOLDER_TAIL);
    FeatureVector::from_array(values)
}
