//! Start-up configuration.
//!
//! Every setting is read once from the environment at the composition root
//! (`main` or a CLI binary) and handed to the components that need it.
//!
//! The alert-mail credential is read from `VITALCAST_MAIL_PASSWORD_FILE`. Debug
//! builds also accept `VITALCAST_MAIL_PASSWORD`; release builds ignore it.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::adapters::forest::ForestConfig;
use crate::adapters::notify::{CommandSpeechSink, LogSpeechSink, OutboxMailSink};
use crate::application::MailSettings;
use crate::domain::{Comparison, MailCredential, ThresholdTable, VitalField};
use crate::ports::{ArtifactVariant, MailSink, NoopMailSink, NoopSpeechSink, SpeechSink};
use crate::{Result, VitalcastError};

const DATA_PATH_ENV: &str = "VITALCAST_DATA_PATH";
const MODEL_DIR_ENV: &str = "VITALCAST_MODEL_DIR";
const MODEL_VARIANT_ENV: &str = "VITALCAST_MODEL_VARIANT";
const REFRESH_SECS_ENV: &str = "VITALCAST_REFRESH_SECS";
const FOREST_TREES_ENV: &str = "VITALCAST_FOREST_TREES";
const FOREST_MAX_DEPTH_ENV: &str = "VITALCAST_FOREST_MAX_DEPTH";
const FOREST_SEED_ENV: &str = "VITALCAST_FOREST_SEED";
const FOREST_BOOTSTRAP_ENV: &str = "VITALCAST_FOREST_BOOTSTRAP";
const SPO2_ALERT_ENV: &str = "VITALCAST_SPO2_ALERT";
const SPEECH_ENV: &str = "VITALCAST_SPEECH";
const SPEECH_COMMAND_ENV: &str = "VITALCAST_SPEECH_COMMAND";
const MAIL_SENDER_ENV: &str = "VITALCAST_MAIL_SENDER";
const MAIL_RECIPIENT_ENV: &str = "VITALCAST_MAIL_RECIPIENT";
const MAIL_PASSWORD_FILE_ENV: &str = "VITALCAST_MAIL_PASSWORD_FILE";
const OUTBOX_DIR_ENV: &str = "VITALCAST_OUTBOX_DIR";

// Dev-only escape hatch for local runs.
const MAIL_PASSWORD_ENV_DEV: &str = "VITALCAST_MAIL_PASSWORD";

/// How text is spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeechMode {
    Off,
    #[default]
    Log,
    Command,
}

impl FromStr for SpeechMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
            "log" => Ok(Self::Log),
            "command" => Ok(Self::Command),
            other => Err(format!("unknown speech mode '{other}' (expected off|log|command)")),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_path: PathBuf,
    pub model_dir: PathBuf,
    pub model_variant: ArtifactVariant,
    pub refresh: Duration,
    pub forest: ForestConfig,
    pub spo2_alert: Comparison,
    pub speech: SpeechMode,
    pub speech_command: String,
    pub mail: Option<MailSettings>,
    pub outbox_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/vitals.csv"),
            model_dir: PathBuf::from("models"),
            model_variant: ArtifactVariant::Plain,
            refresh: Duration::from_secs(10),
            forest: ForestConfig::default(),
            spo2_alert: Comparison::Above,
            speech: SpeechMode::Log,
            speech_command: "espeak".to_string(),
            mail: None,
            outbox_dir: PathBuf::from("data/outbox"),
        }
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw, "1" | "true" | "TRUE" | "yes" | "YES")
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| VitalcastError::Validation(format!("{name}: invalid value '{raw}' ({e})")))
}

impl AppConfig {
    /// Read settings from the process environment.
    ///
    /// # Errors
    /// Returns `Validation` for malformed values, or `Io` if the credential
    /// file cannot be read.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary lookup. Blank values count as unset.
    ///
    /// # Errors
    /// Returns `Validation` for malformed values, or `Io` if the credential
    /// file cannot be read.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(v) = get(DATA_PATH_ENV) {
            config.data_path = PathBuf::from(v);
        }
        if let Some(v) = get(MODEL_DIR_ENV) {
            config.model_dir = PathBuf::from(v);
        }
        if let Some(v) = get(MODEL_VARIANT_ENV) {
            config.model_variant = parse_value(MODEL_VARIANT_ENV, &v)?;
        }
        if let Some(v) = get(REFRESH_SECS_ENV) {
            let secs: u64 = parse_value(REFRESH_SECS_ENV, &v)?;
            if secs == 0 {
                return Err(VitalcastError::Validation(format!(
                    "{REFRESH_SECS_ENV} must be at least 1"
                )));
            }
            config.refresh = Duration::from_secs(secs);
        }

        if let Some(v) = get(FOREST_TREES_ENV) {
            config.forest.n_trees = parse_value(FOREST_TREES_ENV, &v)?;
        }
        if let Some(v) = get(FOREST_MAX_DEPTH_ENV) {
            config.forest.max_depth = Some(parse_value(FOREST_MAX_DEPTH_ENV, &v)?);
        }
        if let Some(v) = get(FOREST_SEED_ENV) {
            config.forest.seed = parse_value(FOREST_SEED_ENV, &v)?;
        }
        if let Some(v) = get(FOREST_BOOTSTRAP_ENV) {
            config.forest.bootstrap = parse_bool(&v);
        }
        config.forest.validate()?;

        if let Some(v) = get(SPO2_ALERT_ENV) {
            config.spo2_alert = parse_value(SPO2_ALERT_ENV, &v)?;
        }
        if let Some(v) = get(SPEECH_ENV) {
            config.speech = parse_value(SPEECH_ENV, &v)?;
        }
        if let Some(v) = get(SPEECH_COMMAND_ENV) {
            config.speech_command = v;
        }
        if let Some(v) = get(OUTBOX_DIR_ENV) {
            config.outbox_dir = PathBuf::from(v);
        }

        config.mail = match (get(MAIL_SENDER_ENV), get(MAIL_RECIPIENT_ENV)) {
            (Some(sender), Some(recipient)) => {
                Self::mail_credential(&get)?.map(|credential| MailSettings {
                    sender,
                    recipient,
                    credential,
                })
            }
            _ => None,
        };

        Ok(config)
    }

    fn mail_credential<G>(get: &G) -> Result<Option<MailCredential>>
    where
        G: Fn(&str) -> Option<String>,
    {
        if let Some(path) = get(MAIL_PASSWORD_FILE_ENV) {
            let content = std::fs::read_to_string(&path)?;
            let secret = MailCredential::new(content.trim_end_matches(['\n', '\r']));
            if secret.is_empty() {
                return Err(VitalcastError::Validation(format!(
                    "{MAIL_PASSWORD_FILE_ENV}: credential file is empty"
                )));
            }
            return Ok(Some(secret));
        }

        if cfg!(debug_assertions) {
            if let Some(v) = get(MAIL_PASSWORD_ENV_DEV) {
                return Ok(Some(MailCredential::new(v)));
            }
        }

        tracing::warn!(
            "Mail sender and recipient set but no credential; provide {}",
            MAIL_PASSWORD_FILE_ENV
        );
        Ok(None)
    }

    /// Alert thresholds with the configured oxygen-saturation direction.
    #[must_use]
    pub fn thresholds(&self) -> ThresholdTable {
        ThresholdTable::default().with_comparison(VitalField::OxygenSaturation, self.spo2_alert)
    }

    /// Speech sink for the configured mode.
    #[must_use]
    pub fn speech_sink(&self) -> Box<dyn SpeechSink> {
        match self.speech {
            SpeechMode::Off => Box::new(NoopSpeechSink),
            SpeechMode::Log => Box::new(LogSpeechSink),
            SpeechMode::Command => Box::new(CommandSpeechSink::from_command_line(&self.speech_command)),
        }
    }

    /// Mail sink: the outbox when mail is configured, otherwise a no-op.
    #[must_use]
    pub fn mail_sink(&self) -> Box<dyn MailSink> {
        if self.mail.is_some() {
            Box::new(OutboxMailSink::new(&self.outbox_dir))
        } else {
            Box::new(NoopMailSink)
        }
    }
}
