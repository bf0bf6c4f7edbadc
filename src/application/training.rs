//! Training service: vitals table -> supervised pairs -> forest -> artifacts.

use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::forest::{ForecastModel, ForestConfig};
use crate::domain::{build_pairs, SortOrder};
use crate::ports::{ArtifactVariant, ModelRegistry, VitalsStore};
use crate::Result;

/// What a training run produced.
#[derive(Debug)]
pub struct TrainingReport {
    pub model: ForecastModel,
    pub records: usize,
    pub pairs: usize,
    pub plain_path: PathBuf,
    pub compressed_path: PathBuf,
}

/// Service for (re)training the forecaster.
pub struct TrainingService<S, R>
where
    S: VitalsStore,
    R: ModelRegistry<Model = ForecastModel>,
{
    store: Arc<S>,
    registry: Arc<R>,
    config: ForestConfig,
}

impl<S, R> TrainingService<S, R>
where
    S: VitalsStore,
    R: ModelRegistry<Model = ForecastModel>,
{
    pub fn new(store: Arc<S>, registry: Arc<R>, config: ForestConfig) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Fit a model on the current table without persisting it.
    ///
    /// # Errors
    /// Returns `MissingData` if the table is absent, `InsufficientData` if no
    /// patient has two usable records.
    pub fn train(&self) -> Result<(ForecastModel, usize, usize)> {
        let records = self.store.load(SortOrder::Ascending)?;
        tracing::info!("Loaded {} records for training", records.len());

        let pairs = build_pairs(&records)?;
        let model = ForecastModel::train(&pairs, &self.config)?;
        Ok((model, records.len(), pairs.len()))
    }

    /// Fit a model and write both the plain and the compressed artifacts.
    ///
    /// # Errors
    /// Returns error if training fails or either artifact cannot be written.
    pub fn train_and_save(&self) -> Result<TrainingReport> {
        let (model, records, pairs) = self.train()?;

        let plain_path = self.registry.save_variant(&model, ArtifactVariant::Plain)?;
        let compressed_path = self
            .registry
            .save_variant(&model, ArtifactVariant::Compressed)?;

        tracing::info!(
            "Model trained on {} pairs; artifacts at {:?} and {:?}",
            pairs,
            plain_path,
            compressed_path
        );

        Ok(TrainingReport {
            model,
            records,
            pairs,
            plain_path,
            compressed_path,
        })
    }
}
