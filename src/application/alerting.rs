//! Alert service: threshold evaluation and hand-off to the injected sinks.
//!
//! Dispatch never fails the caller. A missing mail configuration or a sink
//! error is reported as an [`AlertOutcome`] and logged.

use std::sync::Arc;

use crate::domain::{
    Alert, AlertEmail, MailCredential, PredictionResult, ThresholdTable, ALERT_SUBJECT,
};
use crate::ports::{announce, MailSink, SpeechSink};

/// Addresses and credential for alert mail.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub sender: String,
    pub recipient: String,
    pub credential: MailCredential,
}

/// Result of checking one prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertOutcome {
    /// Every predicted value is within its threshold
    NoAlert,
    /// Alert handed to the mail sink
    Sent,
    /// Alert raised but mail settings are incomplete
    NotConfigured,
    /// Alert raised but the mail sink refused it
    SendFailed(String),
}

impl std::fmt::Display for AlertOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAlert => write!(f, "no alert"),
            Self::Sent => write!(f, "alert email queued"),
            Self::NotConfigured => write!(f, "alert mail not configured"),
            Self::SendFailed(reason) => write!(f, "alert send failed: {reason}"),
        }
    }
}

/// Service evaluating forecasts against the threshold table.
pub struct AlertService<M, S>
where
    M: MailSink,
    S: SpeechSink,
{
    thresholds: ThresholdTable,
    mail: Option<MailSettings>,
    mail_sink: Arc<M>,
    speech: Arc<S>,
}

impl<M, S> AlertService<M, S>
where
    M: MailSink,
    S: SpeechSink,
{
    pub fn new(thresholds: ThresholdTable, mail_sink: Arc<M>, speech: Arc<S>) -> Self {
        Self {
            thresholds,
            mail: None,
            mail_sink,
            speech,
        }
    }

    /// Enable mail dispatch.
    #[must_use]
    pub fn with_mail(mut self, settings: Option<MailSettings>) -> Self {
        self.mail = settings;
        self
    }

    #[must_use]
    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    #[must_use]
    pub fn mail_configured(&self) -> bool {
        self.mail.is_some()
    }

    /// Alert for a prediction, if any threshold is crossed.
    #[must_use]
    pub fn evaluate(&self, prediction: &PredictionResult) -> Option<Alert> {
        self.thresholds.evaluate(prediction)
    }

    /// Hand an alert to the mail sink.
    pub fn dispatch(&self, alert: &Alert) -> AlertOutcome {
        let Some(settings) = &self.mail else {
            tracing::info!(
                "Alert for patient {:?} not mailed: mail settings incomplete",
                alert.patient_id
            );
            return AlertOutcome::NotConfigured;
        };

        let email = AlertEmail {
            sender: settings.sender.clone(),
            credential: settings.credential.clone(),
            recipient: settings.recipient.clone(),
            subject: ALERT_SUBJECT.to_string(),
            body: alert.message(),
        };

        match self.mail_sink.send(&email) {
            Ok(()) => {
                tracing::info!(
                    "Alert for patient {:?} dispatched ({} violations)",
                    alert.patient_id,
                    alert.violations.len()
                );
                AlertOutcome::Sent
            }
            Err(e) => {
                tracing::warn!("Alert dispatch failed: {}", e);
                AlertOutcome::SendFailed(e.to_string())
            }
        }
    }

    /// Evaluate and, when needed, dispatch.
    pub fn check(&self, prediction: &PredictionResult) -> AlertOutcome {
        match self.evaluate(prediction) {
            Some(alert) => self.dispatch(&alert),
            None => AlertOutcome::NoAlert,
        }
    }

    /// Read lines aloud through the speech sink.
    pub fn speak(&self, lines: &[String]) {
        announce(self.speech.as_ref(), lines);
    }
}
