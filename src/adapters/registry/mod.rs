//! Registry adapter: file-backed model artifacts.
//!
//! Artifacts are a bincode envelope around the bincode-encoded model:
//!
//! ```text
//! { format_version, created_at, feature_names, training_pairs, sha256, payload }
//! ```
//!
//! The compressed variant is the same envelope, gzip-compressed. Loading
//! sniffs the gzip magic bytes, so either file can be handed to `load`.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::adapters::forest::ForecastModel;
use crate::domain::FEATURE_NAMES;
use crate::ports::{ArtifactVariant, Forecaster, ModelRegistry};
use crate::{Result, VitalcastError};

/// Current envelope layout.
const FORMAT_VERSION: u32 = 1;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArtifactEnvelope {
    format_version: u32,
    created_at: DateTime<Utc>,
    feature_names: Vec<String>,
    training_pairs: u64,
    sha256: String,
    payload: Vec<u8>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Model registry rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileModelRegistry {
    dir: PathBuf,
}

impl FileModelRegistry {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn encode(model: &ForecastModel, variant: ArtifactVariant) -> Result<Vec<u8>> {
        let payload = bincode::serialize(model)?;
        let envelope = ArtifactEnvelope {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            feature_names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
            training_pairs: model.training_pairs() as u64,
            sha256: sha256_hex(&payload),
            payload,
        };
        let bytes = bincode::serialize(&envelope)?;

        match variant {
            ArtifactVariant::Plain => Ok(bytes),
            ArtifactVariant::Compressed => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
                encoder.write_all(&bytes)?;
                Ok(encoder.finish()?)
            }
        }
    }

    fn decode(bytes: &[u8]) -> Result<ForecastModel> {
        let raw = if bytes.starts_with(&GZIP_MAGIC) {
            let mut inflated = Vec::new();
            GzDecoder::new(bytes).read_to_end(&mut inflated)?;
            tracing::debug!("Inflated artifact: {} -> {} bytes", bytes.len(), inflated.len());
            inflated
        } else {
            bytes.to_vec()
        };

        let envelope: ArtifactEnvelope = bincode::deserialize(&raw)?;
        if envelope.format_version != FORMAT_VERSION {
            return Err(VitalcastError::Serialization(format!(
                "unsupported artifact format version {} (expected {FORMAT_VERSION})",
                envelope.format_version
            )));
        }
        if envelope.feature_names != FEATURE_NAMES {
            return Err(VitalcastError::Serialization(format!(
                "artifact features [{}] do not match [{}]",
                envelope.feature_names.join(", "),
                FEATURE_NAMES.join(", ")
            )));
        }
        if sha256_hex(&envelope.payload) != envelope.sha256 {
            return Err(VitalcastError::Serialization(
                "artifact checksum mismatch".into(),
            ));
        }

        let model: ForecastModel = bincode::deserialize(&envelope.payload)?;
        tracing::debug!(
            "Artifact created {} from {} training pairs",
            envelope.created_at,
            envelope.training_pairs
        );
        Ok(model)
    }
}

impl ModelRegistry for FileModelRegistry {
    type Model = ForecastModel;

    fn save(&self, model: &ForecastModel, path: &Path, variant: ArtifactVariant) -> Result<()> {
        let bytes = Self::encode(model, variant)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;

        tracing::info!(
            "Saved {} model artifact to {:?} ({} bytes)",
            variant,
            path,
            bytes.len()
        );
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<ForecastModel> {
        if !path.exists() {
            return Err(VitalcastError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = fs::read(path)?;
        let model = Self::decode(&bytes)?;
        tracing::info!(
            "Loaded model from {:?} ({} training pairs)",
            path,
            model.training_pairs()
        );
        Ok(model)
    }

    fn path_for(&self, variant: ArtifactVariant) -> PathBuf {
        self.dir.join(variant.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::forest::ForestConfig;
    use crate::domain::{TrainingPair, Vitals};

    fn vitals(hr: f64, sys: f64, dia: f64, spo2: f64, temp: f64) -> Vitals {
        Vitals {
            heart_rate: hr,
            bp_systolic: sys,
            bp_diastolic: dia,
            oxygen_saturation: spo2,
            temperature: temp,
        }
    }

    fn trained_model() -> ForecastModel {
        let pairs: Vec<TrainingPair> = (0..12)
            .map(|i| {
                let step = f64::from(i);
                TrainingPair {
                    features: vitals(70.0 + step, 120.0 + step, 80.0, 97.0, 36.5),
                    target: vitals(71.0 + step, 121.0 + step, 80.5, 96.0, 36.6),
                }
            })
            .collect();
        let config = ForestConfig {
            n_trees: 10,
            ..ForestConfig::default()
        };
        ForecastModel::train(&pairs, &config).expect("train")
    }

    #[test]
    fn test_load_missing_path_is_model_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = FileModelRegistry::new(dir.path());

        let err = registry
            .load_variant(ArtifactVariant::Plain)
            .expect_err("must fail");
        match err {
            VitalcastError::ModelNotFound { path } => {
                assert_eq!(path, dir.path().join("model.bin"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_both_variants_reproduce_predictions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = FileModelRegistry::new(dir.path().join("models"));
        let model = trained_model();
        let probe = vitals(75.0, 125.0, 80.0, 97.0, 36.5);
        let expected = model.predict(&probe).expect("predict");

        for variant in [ArtifactVariant::Plain, ArtifactVariant::Compressed] {
            let path = registry.save_variant(&model, variant).expect("save");
            assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(variant.file_name()));

            let loaded = registry.load(&path).expect("load");
            assert_eq!(loaded.predict(&probe).expect("predict"), expected);
            assert_eq!(loaded.training_pairs(), 12);
        }

        let compressed = fs::read(registry.path_for(ArtifactVariant::Compressed)).expect("read");
        assert!(compressed.starts_with(&GZIP_MAGIC));
        let plain = fs::read(registry.path_for(ArtifactVariant::Plain)).expect("read");
        assert!(!plain.starts_with(&GZIP_MAGIC));
        assert!(compressed.len() < plain.len());
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = FileModelRegistry::new(dir.path());
        let path = registry
            .save_variant(&trained_model(), ArtifactVariant::Plain)
            .expect("save");

        let mut envelope: ArtifactEnvelope =
            bincode::deserialize(&fs::read(&path).expect("read")).expect("envelope");
        let last = envelope.payload.len() - 1;
        envelope.payload[last] ^= 0xff;
        fs::write(&path, bincode::serialize(&envelope).expect("encode")).expect("write");

        let err = registry.load(&path).expect_err("must fail");
        assert!(matches!(err, VitalcastError::Serialization(ref m) if m.contains("checksum")));
    }

    #[test]
    fn test_unknown_version_and_features_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = FileModelRegistry::new(dir.path());
        let path = registry
            .save_variant(&trained_model(), ArtifactVariant::Plain)
            .expect("save");
        let original: ArtifactEnvelope =
            bincode::deserialize(&fs::read(&path).expect("read")).expect("envelope");

        let mut future = original.clone();
        future.format_version = 99;
        fs::write(&path, bincode::serialize(&future).expect("encode")).expect("write");
        assert!(matches!(
            registry.load(&path),
            Err(VitalcastError::Serialization(ref m)) if m.contains("version")
        ));

        let mut renamed = original;
        renamed.feature_names[0] = "pulse".into();
        fs::write(&path, bincode::serialize(&renamed).expect("encode")).expect("write");
        assert!(matches!(
            registry.load(&path),
            Err(VitalcastError::Serialization(ref m)) if m.contains("pulse")
        ));
    }

    #[test]
    fn test_garbage_file_is_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.bin");
        fs::write(&path, b"not a model").expect("write");

        let registry = FileModelRegistry::new(dir.path());
        assert!(matches!(
            registry.load(&path),
            Err(VitalcastError::Serialization(_))
        ));
    }
}
