//! Supervised frame builder: one-step-ahead training pairs per patient.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::vitals::{VitalRecord, Vitals};
use crate::VitalcastError;

/// Features of record *i* and the vitals of record *i+1* for the same patient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingPair {
    pub features: Vitals,
    pub target: Vitals,
}

/// Build one-step-ahead training pairs grouped by `patient_id`.
///
/// Each patient's records are stable-sorted by timestamp and every adjacent
/// pair emits one [`TrainingPair`]. The last record of a series has no
/// successor and is dropped. Patients are visited in ascending id order.
///
/// # Errors
/// Returns `InsufficientData` if no patient has at least two records.
pub fn build_pairs(records: &[VitalRecord]) -> Result<Vec<TrainingPair>, VitalcastError> {
    let mut by_patient: BTreeMap<i64, Vec<&VitalRecord>> = BTreeMap::new();
    for record in records {
        by_patient.entry(record.patient_id).or_default().push(record);
    }

    let mut pairs = Vec::with_capacity(records.len().saturating_sub(by_patient.len()));
    for (patient_id, mut series) in by_patient {
        series.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let before = pairs.len();
        pairs.extend(series.windows(2).map(|w| TrainingPair {
            features: w[0].vitals(),
            target: w[1].vitals(),
        }));
        tracing::debug!(
            "Patient {}: {} records -> {} pairs",
            patient_id,
            series.len(),
            pairs.len() - before
        );
    }

    if pairs.is_empty() {
        return Err(VitalcastError::InsufficientData(format!(
            "{} records across {} patients; need at least 2 records for one patient",
            records.len(),
            records
                .iter()
                .map(|r| r.patient_id)
                .collect::<std::collections::BTreeSet<_>>()
                .len()
        )));
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vitals::parse_timestamp;

    fn record(patient_id: i64, ts: &str, hr: i32) -> VitalRecord {
        VitalRecord {
            patient_id,
            timestamp: parse_timestamp(ts).expect("valid timestamp"),
            heart_rate: hr,
            bp_systolic: 120,
            bp_diastolic: 80,
            oxygen_saturation: 98.0,
            temperature: 36.5,
        }
    }

    #[test]
    fn test_series_emits_count_minus_one_pairs() {
        let records = vec![
            record(1, "2025-07-10 10:00:00", 70),
            record(1, "2025-07-10 10:30:00", 75),
            record(1, "2025-07-10 11:00:00", 80),
            record(1, "2025-07-10 11:30:00", 85),
        ];

        let pairs = build_pairs(&records).expect("should build");
        assert_eq!(pairs.len(), 3);
        for (i, pair) in pairs.iter().enumerate() {
            assert_eq!(pair.features, records[i].vitals());
            assert_eq!(pair.target, records[i + 1].vitals());
        }
    }

    #[test]
    fn test_sorts_within_patient_before_shifting() {
        let records = vec![
            record(1, "2025-07-10 11:00:00", 80),
            record(1, "2025-07-10 10:00:00", 70),
        ];

        let pairs = build_pairs(&records).expect("should build");
        assert_eq!(pairs.len(), 1);
        assert!((pairs[0].features.heart_rate - 70.0).abs() < f64::EPSILON);
        assert!((pairs[0].target.heart_rate - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pairs_never_cross_patients() {
        let records = vec![
            record(2, "2025-07-10 10:00:00", 100),
            record(1, "2025-07-10 10:05:00", 70),
            record(2, "2025-07-10 10:10:00", 101),
            record(1, "2025-07-10 10:15:00", 71),
            record(3, "2025-07-10 10:20:00", 90),
        ];

        let pairs = build_pairs(&records).expect("should build");
        // Patient 3 has one record and contributes nothing.
        assert_eq!(pairs.len(), 2);
        // Ascending patient order: patient 1 first.
        assert!((pairs[0].features.heart_rate - 70.0).abs() < f64::EPSILON);
        assert!((pairs[0].target.heart_rate - 71.0).abs() < f64::EPSILON);
        assert!((pairs[1].features.heart_rate - 100.0).abs() < f64::EPSILON);
        assert!((pairs[1].target.heart_rate - 101.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_single_record_patient_is_insufficient() {
        let records = vec![record(1, "2025-07-10 10:00:00", 70)];
        let err = build_pairs(&records).expect_err("must fail");
        assert!(matches!(err, VitalcastError::InsufficientData(_)));
    }

    #[test]
    fn test_many_singletons_are_insufficient() {
        let records = vec![
            record(1, "2025-07-10 10:00:00", 70),
            record(2, "2025-07-10 10:00:00", 70),
            record(3, "2025-07-10 10:00:00", 70),
        ];
        assert!(matches!(
            build_pairs(&records),
            Err(VitalcastError::InsufficientData(_))
        ));
        assert!(matches!(
            build_pairs(&[]),
            Err(VitalcastError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_output_is_independent_of_patient_interleaving() {
        let a = vec![
            record(1, "2025-07-10 10:00:00", 70),
            record(2, "2025-07-10 10:00:00", 90),
            record(1, "2025-07-10 11:00:00", 72),
            record(2, "2025-07-10 11:00:00", 92),
        ];
        let mut b = a.clone();
        b.reverse();

        assert_eq!(
            build_pairs(&a).expect("should build"),
            build_pairs(&b).expect("should build")
        );
    }
}
