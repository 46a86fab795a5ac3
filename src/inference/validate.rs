//! Input validation for raw prediction payloads.
//!
//! Every field is checked independently and all problems are reported
//! together, so a caller can fix a request in one round trip.

use std::num::IntErrorKind;

use serde_json::{Map, Value};

use super::domain::{PredictionRequest, ValidationFailure, OBSERVED_FIELDS};

const MISSING: &str = "Missing data for required field.";
const NULL: &str = "Field may not be null.";
const NOT_INTEGER: &str = "Not a valid integer.";
const NOT_NUMBER: &str = "Not a valid number.";
const NOT_FINITE: &str = "Special numeric values (nan or infinity) are not permitted.";
const UNKNOWN: &str = "Unknown field.";
const NOT_OBJECT: &str = "Invalid input type.";

/// Inclusive bounds for one observed field.
#[derive(Copy, Clone, Debug)]
pub struct FieldRange {
    pub field: &'static str,
    pub min: f64,
    pub max: f64,
    pub message: &'static str,
}

impl FieldRange {
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

pub const AGE: FieldRange = FieldRange {
    field: "age",
    min: 10.0,
    max: 100.0,
    message: "Age must be between 10 and 100.",
};
pub const WEIGHT: FieldRange = FieldRange {
    field: "weight",
    min: 20.0,
    max: 300.0,
    message: "Weight must be between 20 and 300 kg.",
};
pub const HEIGHT: FieldRange = FieldRange {
    field: "height",
    min: 100.0,
    max: 250.0,
    message: "Height must be between 100 and 250 cm.",
};
pub const BMI: FieldRange = FieldRange {
    field: "bmi",
    min: 10.0,
    max: 50.0,
    message: "BMI must be between 10 and 50.",
};

/// Turn an untyped JSON payload into a [`PredictionRequest`].
pub fn validate(raw: &Value) -> Result<PredictionRequest, ValidationFailure> {
    let Some(body) = raw.as_object() else {
        return Err(ValidationFailure::schema(NOT_OBJECT));
    };

    let mut failure = ValidationFailure::new();

    for key in body.keys() {
        if !OBSERVED_FIELDS.contains(&key.as_str()) {
            failure.push(key, UNKNOWN);
        }
    }

    let age = field(body, &AGE, coerce_int, &mut failure);
    let weight = field(body, &WEIGHT, coerce_float, &mut failure);
    let height = field(body, &HEIGHT, coerce_float, &mut failure);
    let bmi = field(body, &BMI, coerce_float, &mut failure);

    match (age, weight, height, bmi) {
        (Some(age), Some(weight), Some(height), Some(bmi)) if failure.is_empty() => {
            Ok(PredictionRequest {
                age,
                weight,
                height,
                bmi,
            })
        }
        _ => Err(failure),
    }
}

/// Numeric value that can be compared against a [`FieldRange`].
trait Bounded: Copy {
    fn as_bound(self) -> f64;
}

impl Bounded for i64 {
    fn as_bound(self) -> f64 {
        self as f64
    }
}

impl Bounded for f64 {
    fn as_bound(self) -> f64 {
        self
    }
}

fn field<T, F>(
    body: &Map<String, Value>,
    range: &FieldRange,
    coerce: F,
    failure: &mut ValidationFailure,
) -> Option<T>
where
    T: Bounded,
    F: Fn(&Value) -> Result<T, &'static str>,
{
    let value = match body.get(range.field) {
        None => {
            failure.push(range.field, MISSING);
            return None;
        }
        Some(Value::Null) => {
            failure.push(range.field, NULL);
            return None;
        }
        Some(value) => value,
    };

    match coerce(value) {
        Ok(parsed) if range.contains(parsed.as_bound()) => Some(parsed),
        Ok(_) => {
            failure.push(range.field, range.message);
            None
        }
        Err(message) => {
            failure.push(range.field, message);
            None
        }
    }
}

/// Integers, integral floats (`25.0`) and integer strings (`"25"`).
///
/// Integers beyond `i64` saturate so they fail the bounds check with the
/// field's range message.
fn coerce_int(value: &Value) -> Result<i64, &'static str> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                // `as` saturates at the i64 limits.
                Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
                _ => Err(NOT_INTEGER),
            }
        }
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => Ok(i),
            Err(err) => match err.kind() {
                IntErrorKind::PosOverflow => Ok(i64::MAX),
                IntErrorKind::NegOverflow => Ok(i64::MIN),
                _ => Err(NOT_INTEGER),
            },
        },
        _ => Err(NOT_INTEGER),
    }
}

/// JSON numbers and numeric strings; NaN and infinities are refused.
fn coerce_float(value: &Value) -> Result<f64, &'static str> {
    let parsed = match value {
        Value::Number(n) => n.as_f64().ok_or(NOT_NUMBER)?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| NOT_NUMBER)?,
        _ => return Err(NOT_NUMBER),
    };
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(NOT_FINITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn fields_of(failure: &ValidationFailure) -> Vec<&str> {
        failure.fields().collect()
    }

    #[test]
    fn accepts_reference_payload() {
        let request = validate(&json!({"age": 25, "weight": 65.5, "height": 175.0, "bmi": 21.3}))
            .unwrap();
        assert_eq!(
            request,
            PredictionRequest {
                age: 25,
                weight: 65.5,
                height: 175.0,
                bmi: 21.3
            }
        );
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(validate(&json!({"age": 10, "weight": 20, "height": 100, "bmi": 10})).is_ok());
        assert!(validate(&json!({"age": 100, "weight": 300, "height": 250, "bmi": 50})).is_ok());
    }

    #[test]
    fn age_below_range_is_cited() {
        let failure =
            validate(&json!({"age": 5, "weight": 65.5, "height": 175.0, "bmi": 21.3})).unwrap_err();
        assert_eq!(fields_of(&failure), vec!["age"]);
        assert_eq!(failure.messages("age"), ["Age must be between 10 and 100."]);
    }

    #[test]
    fn reports_every_missing_field() {
        let failure = validate(&json!({"weight": 70})).unwrap_err();
        assert_eq!(fields_of(&failure), vec!["age", "bmi", "height"]);
        for field in ["age", "bmi", "height"] {
            assert_eq!(failure.messages(field), [MISSING]);
        }
    }

    #[test]
    fn reports_all_four_out_of_range() {
        let failure =
            validate(&json!({"age": 101, "weight": 5, "height": 99.9, "bmi": 50.01})).unwrap_err();
        assert_eq!(fields_of(&failure), vec!["age", "bmi", "height", "weight"]);
    }

    #[test]
    fn coerces_numeric_strings_and_integral_floats() {
        let request =
            validate(&json!({"age": "30", "weight": "70.5", "height": 180, "bmi": 25.0})).unwrap();
        assert_eq!(request.age, 30);
        assert_eq!(request.weight, 70.5);
        assert_eq!(request.height, 180.0);

        assert_eq!(
            validate(&json!({"age": 30.0, "weight": 70, "height": 180, "bmi": 25}))
                .unwrap()
                .age,
            30
        );
    }

    #[test]
    fn names_mistyped_fields() {
        let failure = validate(&json!({
            "age": 25.5,
            "weight": "heavy",
            "height": true,
            "bmi": null
        }))
        .unwrap_err();
        assert_eq!(failure.messages("age"), [NOT_INTEGER]);
        assert_eq!(failure.messages("weight"), [NOT_NUMBER]);
        assert_eq!(failure.messages("height"), [NOT_NUMBER]);
        assert_eq!(failure.messages("bmi"), [NULL]);
    }

    #[test]
    fn huge_integral_ages_get_the_range_message() {
        for age in [
            json!(1e19),
            json!(-1e19),
            json!(u64::MAX),
            json!("99999999999999999999"),
            json!("-99999999999999999999"),
        ] {
            let failure =
                validate(&json!({"age": age, "weight": 65.5, "height": 175.0, "bmi": 21.3}))
                    .unwrap_err();
            assert_eq!(failure.messages("age"), [AGE.message]);
        }
    }

    #[test]
    fn refuses_non_finite_strings() {
        let failure =
            validate(&json!({"age": 25, "weight": "NaN", "height": "inf", "bmi": 20})).unwrap_err();
        assert_eq!(failure.messages("weight"), [NOT_FINITE]);
        assert_eq!(failure.messages("height"), [NOT_FINITE]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let failure = validate(&json!({
            "age": 25, "weight": 65.5, "height": 175.0, "bmi": 21.3, "sex": "f"
        }))
        .unwrap_err();
        assert_eq!(fields_of(&failure), vec!["sex"]);
        assert_eq!(failure.messages("sex"), [UNKNOWN]);
    }

    #[test]
    fn non_object_bodies_fail_at_schema_level() {
        for body in [json!([1, 2, 3]), json!("age=25"), json!(null), json!(42)] {
            let failure = validate(&body).unwrap_err();
            assert_eq!(fields_of(&failure), vec![ValidationFailure::SCHEMA_KEY]);
        }
    }

    proptest! {
        #[test]
        fn in_range_inputs_always_validate(
            age in 10i64..=100,
            weight in 20.0f64..=300.0,
            height in 100.0f64..=250.0,
            bmi in 10.0f64..=50.0,
        ) {
            let request = validate(&json!({
                "age": age, "weight": weight, "height": height, "bmi": bmi
            })).unwrap();
            prop_assert_eq!(request, PredictionRequest { age, weight, height, bmi });
        }

        #[test]
        fn out_of_range_age_is_always_cited(
            age in prop_oneof![-1000i64..10, 101i64..1000],
        ) {
            let failure = validate(&json!({
                "age": age, "weight": 65.5, "height": 175.0, "bmi": 21.3
            })).unwrap_err();
            prop_assert_eq!(failure.fields().collect::<Vec<_>>(), vec!["age"]);
        }

        #[test]
        fn out_of_range_weight_is_always_cited(
            weight in prop_oneof![0.0f64..19.99, 300.01f64..1000.0],
        ) {
            let failure = validate(&json!({
                "age": 40, "weight": weight, "height": 175.0, "bmi": 21.3
            })).unwrap_err();
            prop_assert_eq!(failure.messages("weight"), [WEIGHT.message]);
        }
    }
}
