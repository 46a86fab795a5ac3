//! Domain definitions for prediction requests, feature vectors and results.

use std::collections::BTreeMap;
use std::fmt;

/// Observed fields at the head of every feature vector, in order.
pub const OBSERVED_FIELDS: [&str; 4] = ["age", "weight", "height", "bmi"];

/// Constant features appended after the observed fields.
///
/// The deployed classifier was fitted against this exact tail. Replacing it
/// with real per-user features is a change to `features::assemble` only.
pub const PLACEHOLDER_TAIL: [f64; 37] = [
    11.0, 72.0, 22.0, 12.0, 2.0, 4.0, 15.0, 0.0, 0.0, 10.00, 10.00, 5.01, 6.48, 0.773148, 40.0,
    37.0, 0.925000, 4.21, 1.89, 12.71, 32.45, 0.27, 85.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 110.0,
    80.0, 5.0, 10.0, 14.0, 13.0, 6.0,
];

/// Width of the vector the classifier expects.
pub const FEATURE_COUNT: usize = OBSERVED_FIELDS.len() + PLACEHOLDER_TAIL.len();

/// Confidence reported with every prediction.
///
/// Not derived from the model output; callers should not rely on it.
pub const PLACEHOLDER_CONFIDENCE: f64 = 0.85;

/// A request that passed validation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PredictionRequest {
    pub age: i64,
    pub weight: f64,
    pub height: f64,
    pub bmi: f64,
}

/// Fixed-width model input. Only `features::assemble` builds one.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub(crate) fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of a single inference call.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Class id produced by the model.
    pub label: i64,
    pub confidence: f64,
}

/// Every problem found in one request, keyed by field name.
///
/// Request-level problems (body not a JSON object) live under `_schema`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationFailure {
    pub const SCHEMA_KEY: &'static str = "_schema";

    pub fn new() -> Self {
        Self::default()
    }

    /// Failure describing the request as a whole.
    pub fn schema(message: impl Into<String>) -> Self {
        let mut failure = Self::new();
        failure.push(Self::SCHEMA_KEY, message);
        failure
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields with at least one problem, sorted by name.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn as_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_four_observed_plus_tail() {
        assert_eq!(FEATURE_COUNT, 41);
        assert_eq!(PLACEHOLDER_TAIL.len(), 37);
        assert_eq!(PLACEHOLDER_TAIL[0], 11.0);
        assert_eq!(PLACEHOLDER_TAIL[13], 0.773148);
        assert_eq!(PLACEHOLDER_TAIL[36], 6.0);
    }

    #[test]
    fn failure_collects_messages_per_field() {
        let mut failure = ValidationFailure::new();
        failure.push("bmi", "BMI must be between 10 and 50.");
        failure.push("age", "Missing data for required field.");
        failure.push("age", "Not a valid integer.");

        assert_eq!(failure.fields().collect::<Vec<_>>(), vec!["age", "bmi"]);
        assert_eq!(failure.messages("age").len(), 2);
        assert!(failure.messages("height").is_empty());
        assert_eq!(
            failure.to_string(),
            "age: Missing data for required field.; age: Not a valid integer.; \
             bmi: BMI must be between 10 and 50."
        );
    }
}
