//! Threshold alerts derived from predicted vitals.
//!
//! Thresholds are data: each entry names a field, a comparison direction and
//! a limit. In the default table every row alerts when the predicted value is
//! *above* its limit, oxygen saturation included (> 92). Low saturation is the
//! clinical danger sign, so [`ThresholdTable::with_low_saturation_alert`] flips
//! that row without touching any other entry.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::forecast::PredictionResult;
use super::vitals::VitalField;

/// Subject line used for alert emails.
pub const ALERT_SUBJECT: &str = "Vitals Alert";

/// Direction in which a value violates its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Violates when strictly greater than the limit
    Above,
    /// Violates when strictly less than the limit
    Below,
}

impl Comparison {
    #[must_use]
    pub fn violated(self, value: f64, limit: f64) -> bool {
        match self {
            Self::Above => value > limit,
            Self::Below => value < limit,
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Above => ">",
            Self::Below => "<",
        }
    }
}

impl std::str::FromStr for Comparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "above" | ">" => Ok(Self::Above),
            "below" | "<" => Ok(Self::Below),
            other => Err(format!("unknown comparison '{other}' (expected above|below)")),
        }
    }
}

/// One row of the threshold table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub field: VitalField,
    pub comparison: Comparison,
    pub limit: f64,
}

/// Per-field alert thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    entries: Vec<Threshold>,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            entries: vec![
                Threshold {
                    field: VitalField::HeartRate,
                    comparison: Comparison::Above,
                    limit: 100.0,
                },
                Threshold {
                    field: VitalField::BpSystolic,
                    comparison: Comparison::Above,
                    limit: 140.0,
                },
                Threshold {
                    field: VitalField::BpDiastolic,
                    comparison: Comparison::Above,
                    limit: 90.0,
                },
                Threshold {
                    field: VitalField::OxygenSaturation,
                    comparison: Comparison::Above,
                    limit: 92.0,
                },
                Threshold {
                    field: VitalField::Temperature,
                    comparison: Comparison::Above,
                    limit: 38.0,
                },
            ],
        }
    }
}

impl ThresholdTable {
    /// Build a table from explicit entries.
    #[must_use]
    pub fn new(entries: Vec<Threshold>) -> Self {
        Self { entries }
    }

    /// Default table with the saturation row alerting on values below 92.
    #[must_use]
    pub fn with_low_saturation_alert() -> Self {
        Self::default().with_comparison(VitalField::OxygenSaturation, Comparison::Below)
    }

    /// Replace the comparison direction for one field.
    #[must_use]
    pub fn with_comparison(mut self, field: VitalField, comparison: Comparison) -> Self {
        for entry in self.entries.iter_mut().filter(|e| e.field == field) {
            entry.comparison = comparison;
        }
        self
    }

    #[must_use]
    pub fn entries(&self) -> &[Threshold] {
        &self.entries
    }

    /// Every entry violated by the prediction, in table order.
    #[must_use]
    pub fn violations(&self, prediction: &PredictionResult) -> Vec<Violation> {
        self.entries
            .iter()
            .filter_map(|t| {
                let value = prediction.value(t.field);
                t.comparison.violated(value, t.limit).then_some(Violation {
                    threshold: *t,
                    value,
                })
            })
            .collect()
    }

    /// Derive an alert, or `None` when nothing is violated.
    #[must_use]
    pub fn evaluate(&self, prediction: &PredictionResult) -> Option<Alert> {
        let violations = self.violations(prediction);
        if violations.is_empty() {
            None
        } else {
            Some(Alert {
                patient_id: prediction.patient_id,
                violations,
            })
        }
    }
}

/// A predicted value that crossed its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub threshold: Threshold,
    pub value: f64,
}

impl Violation {
    #[must_use]
    pub fn field(&self) -> VitalField {
        self.threshold.field
    }

    /// `"{label}: {value:.2}"`
    #[must_use]
    pub fn line(&self) -> String {
        format!("{}: {:.2}", self.threshold.field.label(), self.value)
    }
}

/// Non-empty set of violations for one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub patient_id: Option<i64>,
    pub violations: Vec<Violation>,
}

impl Alert {
    /// Plain-text alert body.
    #[must_use]
    pub fn message(&self) -> String {
        let who = self
            .patient_id
            .map_or_else(|| "unknown patient".to_string(), |id| format!("patient {id}"));
        let lines: Vec<String> = self.violations.iter().map(Violation::line).collect();
        format!("Critical vitals for {who}:\n\n{}", lines.join("\n"))
    }

    #[must_use]
    pub fn fields(&self) -> Vec<VitalField> {
        self.violations.iter().map(Violation::field).collect()
    }
}

/// Sender credential for the mail collaborator.
///
/// Zeroized on drop; never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MailCredential(String);

impl MailCredential {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for MailCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MailCredential([REDACTED])")
    }
}

/// Structured send request handed to a mail sink.
#[derive(Debug, Clone)]
pub struct AlertEmail {
    pub sender: String,
    pub credential: MailCredential,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}
