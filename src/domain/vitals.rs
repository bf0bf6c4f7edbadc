//! Vital-sign records and the 5-field feature vector used by the forecaster.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format used by the vitals table and uploads.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The five tracked vitals, in model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalField {
    HeartRate,
    BpSystolic,
    BpDiastolic,
    OxygenSaturation,
    Temperature,
}

impl VitalField {
    /// All fields in model order.
    pub const ALL: [VitalField; 5] = [
        Self::HeartRate,
        Self::BpSystolic,
        Self::BpDiastolic,
        Self::OxygenSaturation,
        Self::Temperature,
    ];

    /// Column name in the vitals table.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HeartRate => "heart_rate",
            Self::BpSystolic => "bp_systolic",
            Self::BpDiastolic => "bp_diastolic",
            Self::OxygenSaturation => "oxygen_saturation",
            Self::Temperature => "temperature",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::HeartRate => "Heart Rate",
            Self::BpSystolic => "Systolic BP",
            Self::BpDiastolic => "Diastolic BP",
            Self::OxygenSaturation => "Oxygen Saturation",
            Self::Temperature => "Temperature",
        }
    }

    /// Position in the feature vector.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::HeartRate => 0,
            Self::BpSystolic => 1,
            Self::BpDiastolic => 2,
            Self::OxygenSaturation => 3,
            Self::Temperature => 4,
        }
    }

    /// Look a field up by its exact column name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl std::fmt::Display for VitalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Column names of the feature vector, in model order.
pub const FEATURE_NAMES: [&str; 5] = [
    VitalField::HeartRate.name(),
    VitalField::BpSystolic.name(),
    VitalField::BpDiastolic.name(),
    VitalField::OxygenSaturation.name(),
    VitalField::Temperature.name(),
];

/// Number of features (and of forecast outputs).
pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// The 5-vector of vitals fed to and produced by the forecaster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vitals {
    pub heart_rate: f64,
    pub bp_systolic: f64,
    pub bp_diastolic: f64,
    pub oxygen_saturation: f64,
    pub temperature: f64,
}

impl Vitals {
    /// Convert to an array in model order.
    #[must_use]
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.heart_rate,
            self.bp_systolic,
            self.bp_diastolic,
            self.oxygen_saturation,
            self.temperature,
        ]
    }

    /// Build from an array in model order.
    #[must_use]
    pub fn from_array(v: [f64; FEATURE_COUNT]) -> Self {
        Self {
            heart_rate: v[0],
            bp_systolic: v[1],
            bp_diastolic: v[2],
            oxygen_saturation: v[3],
            temperature: v[4],
        }
    }

    /// Value of a single field.
    #[must_use]
    pub fn get(&self, field: VitalField) -> f64 {
        self.to_array()[field.index()]
    }

    /// Whether every component is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// One observation from the vitals table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalRecord {
    pub patient_id: i64,
    pub timestamp: NaiveDateTime,
    pub heart_rate: i32,
    pub bp_systolic: i32,
    pub bp_diastolic: i32,
    pub oxygen_saturation: f64,
    pub temperature: f64,
}

impl VitalRecord {
    /// The feature vector of this record.
    #[must_use]
    pub fn vitals(&self) -> Vitals {
        Vitals {
            heart_rate: f64::from(self.heart_rate),
            bp_systolic: f64::from(self.bp_systolic),
            bp_diastolic: f64::from(self.bp_diastolic),
            oxygen_saturation: self.oxygen_saturation,
            temperature: self.temperature,
        }
    }

    /// Timestamp rendered in table format.
    #[must_use]
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Requested ordering of loaded records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first (training).
    Ascending,
    /// Latest first (display).
    Descending,
}

/// Sort records by timestamp. Ties keep their incoming order.
pub fn sort_records(records: &mut [VitalRecord], order: SortOrder) {
    match order {
        SortOrder::Ascending => records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        SortOrder::Descending => records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
    }
}

/// A reading as it arrives at a boundary (upload row, form input).
///
/// Fields are optional until validated with [`VitalReading::require_vitals`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VitalReading {
    pub patient_id: Option<i64>,
    pub timestamp: Option<NaiveDateTime>,
    pub heart_rate: Option<f64>,
    pub bp_systolic: Option<f64>,
    pub bp_diastolic: Option<f64>,
    pub oxygen_saturation: Option<f64>,
    pub temperature: Option<f64>,
}

impl VitalReading {
    /// Value of a field, if present.
    #[must_use]
    pub fn get(&self, field: VitalField) -> Option<f64> {
        match field {
            VitalField::HeartRate => self.heart_rate,
            VitalField::BpSystolic => self.bp_systolic,
            VitalField::BpDiastolic => self.bp_diastolic,
            VitalField::OxygenSaturation => self.oxygen_saturation,
            VitalField::Temperature => self.temperature,
        }
    }

    /// Set a field.
    pub fn set(&mut self, field: VitalField, value: Option<f64>) {
        match field {
            VitalField::HeartRate => self.heart_rate = value,
            VitalField::BpSystolic => self.bp_systolic = value,
            VitalField::BpDiastolic => self.bp_diastolic = value,
            VitalField::OxygenSaturation => self.oxygen_saturation = value,
            VitalField::Temperature => self.temperature = value,
        }
    }

    /// Names of the required fields that are absent, in model order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<String> {
        VitalField::ALL
            .into_iter()
            .filter(|f| self.get(*f).is_none())
            .map(|f| f.name().to_string())
            .collect()
    }

    /// Validate that all five vitals are present.
    ///
    /// # Errors
    /// Returns the names of every missing field.
    pub fn require_vitals(&self) -> Result<Vitals, Vec<String>> {
        match (
            self.heart_rate,
            self.bp_systolic,
            self.bp_diastolic,
            self.oxygen_saturation,
            self.temperature,
        ) {
            (Some(hr), Some(sys), Some(dia), Some(spo2), Some(temp)) => Ok(Vitals {
                heart_rate: hr,
                bp_systolic: sys,
                bp_diastolic: dia,
                oxygen_saturation: spo2,
                temperature: temp,
            }),
            _ => Err(self.missing_fields()),
        }
    }
}

impl From<&VitalRecord> for VitalReading {
    fn from(record: &VitalRecord) -> Self {
        let v = record.vitals();
        Self {
            patient_id: Some(record.patient_id),
            timestamp: Some(record.timestamp),
            heart_rate: Some(v.heart_rate),
            bp_systolic: Some(v.bp_systolic),
            bp_diastolic: Some(v.bp_diastolic),
            oxygen_saturation: Some(v.oxygen_saturation),
            temperature: Some(v.temperature),
        }
    }
}

/// Parse a table timestamp.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ts: &str) -> VitalRecord {
        VitalRecord {
            patient_id: 1,
            timestamp: parse_timestamp(ts).expect("valid timestamp"),
            heart_rate: 70,
            bp_systolic: 120,
            bp_diastolic: 80,
            oxygen_saturation: 98.0,
            temperature: 36.5,
        }
    }

    #[test]
    fn test_vitals_array_order_matches_feature_names() {
        let v = record("2025-07-10 10:00:00").vitals();
        let arr = v.to_array();
        for field in VitalField::ALL {
            assert_eq!(FEATURE_NAMES[field.index()], field.name());
            assert!((arr[field.index()] - v.get(field)).abs() < f64::EPSILON);
        }
        assert_eq!(Vitals::from_array(arr), v);
    }

    #[test]
    fn test_field_lookup_by_name() {
        assert_eq!(VitalField::from_name("temperature"), Some(VitalField::Temperature));
        assert_eq!(VitalField::from_name("Temperature"), None);
    }

    #[test]
    fn test_sort_records_both_directions() {
        let mut records = vec![
            record("2025-07-10 12:00:00"),
            record("2025-07-10 10:00:00"),
            record("2025-07-10 11:00:00"),
        ];

        sort_records(&mut records, SortOrder::Ascending);
        assert_eq!(records[0].timestamp_string(), "2025-07-10 10:00:00");
        assert_eq!(records[2].timestamp_string(), "2025-07-10 12:00:00");

        sort_records(&mut records, SortOrder::Descending);
        assert_eq!(records[0].timestamp_string(), "2025-07-10 12:00:00");
    }

    #[test]
    fn test_reading_reports_missing_fields() {
        let mut reading = VitalReading::from(&record("2025-07-10 10:00:00"));
        assert!(reading.require_vitals().is_ok());

        reading.temperature = None;
        reading.heart_rate = None;
        let missing = reading.require_vitals().expect_err("must fail");
        assert_eq!(missing, vec!["heart_rate".to_string(), "temperature".to_string()]);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("2025-07-10 10:00:00").is_some());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("2025-13-10 10:00:00").is_none());
    }
}
