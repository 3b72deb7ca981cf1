// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the trained artifact with burn recorders.
//
// Files in the artifact directory:
//   artifacts/
//     train_config.json        ← TrainConfig, incl. the ModelConfig
//     model_epoch_1.mpk.gz     ← model weights after epoch 1
//     optim_epoch_1.mpk.gz     ← Adam moment estimates after epoch 1
//     ...
//     latest_epoch.json        ← number of the newest complete epoch
//     metrics.csv              ← written by MetricsLogger
//
// Weights are stored at full precision so a reloaded model
// reproduces the in-memory model's predictions exactly.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;

pub type ArtifactRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

const CONFIG_FILE: &str = "train_config.json";
const LATEST_FILE: &str = "latest_epoch.json";

/// Manages saving and loading of the trained artifact.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Open an artifact directory, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create artifact directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn model_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    fn optim_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("optim_epoch_{epoch}"))
    }

    /// Save model weights and optimizer state for `epoch`, then
    /// move the latest-epoch pointer to it.
    pub fn save_epoch<B, M, O>(&self, model: &M, optim: &O, epoch: usize) -> Result<()>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        self.save_model::<B, M>(model, epoch)?;

        let path = self.optim_path(epoch);
        <ArtifactRecorder as Recorder<B>>::record(&ArtifactRecorder::new(), optim.to_record(), path.clone())
            .with_context(|| format!("Failed to save optimizer state to '{}'", path.display()))?;

        let latest_path = self.dir.join(LATEST_FILE);
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write {LATEST_FILE}"))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Save model weights only (the recorder appends the extension).
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<()> {
        let path = self.model_path(epoch);
        model
            .clone()
            .save_file(path.clone(), &ArtifactRecorder::new())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        Ok(())
    }

    /// Load the latest weights into a freshly initialised `model`.
    ///
    /// The model must have the architecture the checkpoint was
    /// trained with, or loading fails.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let epoch = self.latest_epoch()?;
        let path  = self.model_path(epoch);

        tracing::info!("Loading model from epoch {}", epoch);

        model
            .load_file(path.clone(), &ArtifactRecorder::new(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })
    }

    /// Restore the latest optimizer state into `optim`.
    pub fn load_optimizer<B, M, O>(&self, optim: O, device: &B::Device) -> Result<O>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let epoch = self.latest_epoch()?;
        let path  = self.optim_path(epoch);

        let record = <ArtifactRecorder as Recorder<B>>::load(&ArtifactRecorder::new(), path.clone(), device)
            .with_context(|| format!("Cannot load optimizer state '{}'", path.display()))?;

        Ok(optim.load_record(record))
    }

    /// Save the training configuration as pretty JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| {
                format!("Cannot write config to '{}'", path.display())
            })?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the training configuration written by `save_config`.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' first.",
                    path.display()
                )
            })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    /// Number of the newest complete epoch.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_FILE);

        let s = fs::read_to_string(&path)
            .with_context(|| {
                format!("Cannot find '{}'. Have you run 'train' first?", path.display())
            })?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }

    pub fn has_checkpoint(&self) -> bool {
        self.dir.join(LATEST_FILE).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use crate::ml::model::{Baseline, BaselineConfig, DigitClassifier};
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::AdamConfig;
    use temp_dir::TempDir;

    type TestBackend = NdArray;
    type TestAutodiffBackend = Autodiff<NdArray>;

    #[test]
    #[serial]
    fn test_config_round_trip() {
        let dir  = TempDir::new().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg  = TrainConfig { epochs: 3, batch_size: 17, ..TrainConfig::default() };

        ckpt.save_config(&cfg).unwrap();
        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.epochs, 3);
        assert_eq!(loaded.batch_size, 17);
        assert_eq!(loaded.model.architecture, cfg.model.architecture);
    }

    #[test]
    #[serial]
    fn test_reloaded_model_predicts_identically() {
        let dir    = TempDir::new().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let config = BaselineConfig::new().with_hidden(12);

        let model  = config.init::<TestAutodiffBackend>(&device);
        let optim  = AdamConfig::new()
            .init::<TestAutodiffBackend, Baseline<TestAutodiffBackend>>();
        ckpt.save_epoch::<TestAutodiffBackend, _, _>(&model, &optim, 1).unwrap();
        assert_eq!(ckpt.latest_epoch().unwrap(), 1);

        let reloaded = ckpt
            .load_model::<TestBackend, _>(config.init::<TestBackend>(&device), &device)
            .unwrap();

        let input    = Tensor::<TestBackend, 4>::ones([2, 1, 28, 28], &device) * 0.5;
        let expected = model.valid().forward(input.clone()).into_data();
        let actual   = reloaded.forward(input).into_data();
        expected.assert_eq(&actual, true);
    }

    #[test]
    #[serial]
    fn test_missing_checkpoint_is_an_error() {
        let dir  = TempDir::new().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(!ckpt.has_checkpoint());
        assert!(ckpt.latest_epoch().is_err());
        assert!(ckpt.load_config().is_err());
    }
}
