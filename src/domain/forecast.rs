//! Forecast output types.

use serde::{Deserialize, Serialize};

use super::vitals::{VitalField, Vitals};

/// Predicted next vitals for one input reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Source patient (if the input carried one)
    pub patient_id: Option<i64>,

    /// Forecasted vitals
    pub predicted: Vitals,
}

impl PredictionResult {
    #[must_use]
    pub fn new(patient_id: Option<i64>, predicted: Vitals) -> Self {
        Self {
            patient_id,
            predicted,
        }
    }

    /// Value of a single predicted field.
    #[must_use]
    pub fn value(&self, field: VitalField) -> f64 {
        self.predicted.get(field)
    }

    /// `(label, value)` pairs in model order.
    #[must_use]
    pub fn labeled(&self) -> Vec<(&'static str, f64)> {
        VitalField::ALL
            .into_iter()
            .map(|f| (f.label(), self.predicted.get(f)))
            .collect()
    }

    /// One `"{label}: {value:.2}"` line per field.
    #[must_use]
    pub fn summary(&self) -> String {
        self.labeled()
            .into_iter()
            .map(|(label, value)| format!("{label}: {value:.2}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_labels_in_order() {
        let result = PredictionResult::new(
            Some(3),
            Vitals {
                heart_rate: 72.0,
                bp_systolic: 122.0,
                bp_diastolic: 81.0,
                oxygen_saturation: 97.0,
                temperature: 36.7,
            },
        );

        let summary = result.summary();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Heart Rate: 72.00",
                "Systolic BP: 122.00",
                "Diastolic BP: 81.00",
                "Oxygen Saturation: 97.00",
                "Temperature: 36.70",
            ]
        );
    }
}
