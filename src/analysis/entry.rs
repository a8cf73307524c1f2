//! Manually entered health data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::HealthDataPayload;

/// One rule violated by a manual entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field that failed validation
    pub field: &'static str,
    /// User-facing message
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Health data typed in by the user.
///
/// `date` has no default; every other field may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDataEntry {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    pub date: NaiveDate,
    /// Age in years
    #[serde(default)]
    pub age: f64,
    /// Height in cm
    #[serde(default)]
    pub height: f64,
    /// Weight in kg
    #[serde(default)]
    pub weight: f64,
    /// Body fat percentage
    #[serde(default)]
    pub body_fat: f64,
    #[serde(default)]
    pub exercise_habit: bool,
    /// Exercise energy in kcal
    #[serde(default)]
    pub exercise_kcal: f64,
    #[serde(default)]
    pub steps: f64,
    /// Sleep in hours
    #[serde(default)]
    pub sleep_duration: f64,
    /// Systolic blood pressure in mmHg
    #[serde(default)]
    pub systolic_bp: f64,
    /// Diastolic blood pressure in mmHg
    #[serde(default)]
    pub diastolic_bp: f64,
    /// Body temperature in ℃
    #[serde(default)]
    pub body_temperature: f64,
    /// Heart rate in bpm
    #[serde(default)]
    pub heart_rate: f64,
    #[serde(default = "default_source_type")]
    pub source_type: String,
}

fn default_user_id() -> String {
    "test_user_1".to_string()
}

fn default_source_type() -> String {
    "direct".to_string()
}

/// Accepted range per numeric field: (field, min, max, unit label).
const RANGES: &[(&str, f64, f64, &str)] = &[
    ("age", 0.0, 120.0, "years"),
    ("height", 50.0, 250.0, "cm"),
    ("weight", 10.0, 300.0, "kg"),
    ("body_fat", 0.0, 100.0, "%"),
    ("exercise_kcal", 0.0, 10000.0, "kcal"),
    ("steps", 0.0, 100000.0, "steps"),
    ("sleep_duration", 0.0, 24.0, "hours"),
    ("systolic_bp", 50.0, 250.0, "mmHg"),
    ("diastolic_bp", 30.0, 150.0, "mmHg"),
    ("body_temperature", 30.0, 45.0, "℃"),
    ("heart_rate", 30.0, 220.0, "bpm"),
];

impl HealthDataEntry {
    /// Blank entry for `date`; numeric fields start at zero.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            user_id: default_user_id(),
            date,
            age: 0.0,
            height: 0.0,
            weight: 0.0,
            body_fat: 0.0,
            exercise_habit: false,
            exercise_kcal: 0.0,
            steps: 0.0,
            sleep_duration: 0.0,
            systolic_bp: 0.0,
            diastolic_bp: 0.0,
            body_temperature: 0.0,
            heart_rate: 0.0,
            source_type: default_source_type(),
        }
    }

    fn numeric(&self, field: &str) -> f64 {
        match field {
            "age" => self.age,
            "height" => self.height,
            "weight" => self.weight,
            "body_fat" => self.body_fat,
            "exercise_kcal" => self.exercise_kcal,
            "steps" => self.steps,
            "sleep_duration" => self.sleep_duration,
            "systolic_bp" => self.systolic_bp,
            "diastolic_bp" => self.diastolic_bp,
            "body_temperature" => self.body_temperature,
            "heart_rate" => self.heart_rate,
            _ => f64::NAN,
        }
    }

    /// Check every field against its accepted range.
    ///
    /// Returns all violations; an empty list means the entry is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        RANGES
            .iter()
            .filter_map(|&(field, min, max, unit)| {
                let value = self.numeric(field);
                if value.is_nan() || value < min || value > max {
                    Some(ValidationError {
                        field,
                        message: format!("must be between {} and {} {}", min, max, unit),
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Upload body for this entry.
    pub fn to_payload(&self) -> HealthDataPayload {
        let mut payload = HealthDataPayload::new(&self.user_id, self.date)
            .with_field("exercise_habit", self.exercise_habit)
            .with_field("source_type", self.source_type.as_str());
        for &(field, _, _, _) in RANGES {
            payload = payload.with_field(field, self.numeric(field));
        }
        payload
    }
}
