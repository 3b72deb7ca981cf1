// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load MNIST                  (Layer 4 - data)
//   Step 2: Apply sample limits         (Layer 4 - data)
//   Step 3: Hold out a validation set   (Layer 4 - data)
//   Step 4: Open the artifact directory (Layer 6 - infra)
//   Step 5: Save config                 (Layer 6 - infra)
//   Step 6: Run training loop           (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{ensure, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::{loader::source_for, splitter::split_train_val};
use crate::domain::digit::DigitSample;
use crate::infra::{backend::BackendTask, checkpoint::CheckpointManager};
use crate::ml::{
    model::{Architecture, ModelConfig},
    trainer::{run_training, TrainingData, TrainingReport},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings of a training run. Saved as train_config.json so
// inference can rebuild the same architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Directory holding the IDX files. `None` downloads MNIST through burn
    pub data_dir:         Option<String>,
    pub artifact_dir:     String,
    pub epochs:           usize,
    pub batch_size:       usize,
    pub lr:               f64,
    pub seed:             u64,
    pub num_workers:      usize,
    /// Fraction of the training split held out for validation.
    /// `None` validates on the test split
    pub validation_split: Option<f64>,
    pub train_limit:      Option<usize>,
    pub test_limit:       Option<usize>,
    pub resume:           bool,
    pub model:            ModelConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:         None,
            artifact_dir:     "artifacts".to_string(),
            epochs:           10,
            batch_size:       200,
            lr:               1e-3,
            seed:             7,
            num_workers:      1,
            validation_split: None,
            train_limit:      None,
            test_limit:       None,
            resume:           false,
            model:            ModelConfig::new(Architecture::Baseline),
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "Batch size must be at least 1");
        ensure!(self.lr > 0.0, "Learning rate must be positive, got {}", self.lr);
        ensure!(self.num_workers > 0, "At least one data loader worker is required");
        if let Some(f) = self.validation_split {
            ensure!(f > 0.0 && f < 1.0, "Validation split must be in (0, 1), got {f}");
        }
        self.model.validate()
    }
}

fn limit(mut samples: Vec<DigitSample>, max: Option<usize>) -> Vec<DigitSample> {
    if let Some(max) = max {
        samples.truncate(max);
    }
    samples
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }
}

impl BackendTask for TrainUseCase {
    type Output = TrainingReport;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<TrainingReport> {
        let mut cfg = self.config;
        cfg.validate()?;

        // ── Step 1: Load MNIST ────────────────────────────────────────────────
        let (train, test) = source_for(cfg.data_dir.as_deref()).load_all()?.into_parts();
        tracing::info!("Loaded {} training and {} test samples", train.len(), test.len());

        // ── Step 2: Sample limits ─────────────────────────────────────────────
        let train = limit(train, cfg.train_limit);
        let test  = limit(test,  cfg.test_limit);
        ensure!(!test.is_empty(), "No test samples left after applying limits");

        // ── Step 3: Validation set ────────────────────────────────────────────
        let (train, validation) = match cfg.validation_split {
            Some(fraction) => {
                let (train, val) = split_train_val(train, 1.0 - fraction, cfg.seed);
                tracing::info!("Holding out {} training samples for validation", val.len());
                (train, Some(val))
            }
            None => (train, None),
        };
        ensure!(
            !train.is_empty(),
            "No training samples left after applying limits and the validation split"
        );
        if let Some(val) = &validation {
            ensure!(!val.is_empty(), "Validation split leaves no samples to validate on");
        }

        // ── Step 4: Artifact directory ────────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.artifact_dir)?;

        // A resumed run must rebuild the architecture the weights belong to
        if cfg.resume && ckpt.has_checkpoint() {
            let stored = ckpt.load_config()?;
            if stored.model.architecture != cfg.model.architecture {
                tracing::warn!(
                    "Resuming a {} artifact, ignoring requested architecture {}",
                    stored.model.architecture.title(),
                    cfg.model.architecture.title(),
                );
            }
            cfg.model = stored.model;
            cfg.model.validate()?;
        }

        // ── Step 5: Save config for inference ─────────────────────────────────
        ckpt.save_config(&cfg)?;

        // ── Step 6: Training loop (Layer 5) ───────────────────────────────────
        let data = TrainingData { train, validation, test };
        run_training::<B>(&cfg, data, &ckpt, device)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serial_test::serial;
    use crate::data::loader::tests::write_synthetic_mnist;
    use crate::ml::model::BaselineConfig;
    use burn::backend::{Autodiff, NdArray};
    use temp_dir::TempDir;

    pub(crate) type TestBackend = Autodiff<NdArray>;

    /// A small Baseline trained for one epoch on synthetic IDX files.
    pub(crate) fn trained_artifact(dir: &TempDir) -> TrainConfig {
        let data_dir = dir.path().join("mnist");
        std::fs::create_dir_all(&data_dir).unwrap();
        write_synthetic_mnist(&data_dir, 100, 20);

        let cfg = TrainConfig {
            data_dir:     Some(data_dir.display().to_string()),
            artifact_dir: dir.path().join("artifacts").display().to_string(),
            epochs:       1,
            batch_size:   25,
            model: ModelConfig::new(Architecture::Baseline)
                .with_baseline(BaselineConfig::new().with_hidden(16)),
            ..TrainConfig::default()
        };
        TrainUseCase::new(cfg.clone()).run::<TestBackend>(Default::default()).unwrap();
        cfg
    }

    #[test]
    fn test_default_hyperparameters() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.epochs, 10);
        assert_eq!(cfg.batch_size, 200);
        assert_eq!(cfg.seed, 7);
        assert!((cfg.lr - 1e-3).abs() < 1e-12);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let zero_batch = TrainConfig { batch_size: 0, ..TrainConfig::default() };
        assert!(zero_batch.validate().is_err());

        let bad_split = TrainConfig { validation_split: Some(1.0), ..TrainConfig::default() };
        assert!(bad_split.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_train_writes_artifact() {
        let dir = TempDir::new().unwrap();
        let cfg = trained_artifact(&dir);

        let ckpt = CheckpointManager::new(&cfg.artifact_dir).unwrap();
        assert_eq!(ckpt.latest_epoch().unwrap(), 1);
        assert_eq!(ckpt.load_config().unwrap().model.baseline.hidden, 16);
    }

    #[test]
    #[serial]
    fn test_limits_and_validation_split() {
        let dir      = TempDir::new().unwrap();
        let data_dir = dir.path().join("mnist");
        std::fs::create_dir_all(&data_dir).unwrap();
        write_synthetic_mnist(&data_dir, 80, 30);

        let cfg = TrainConfig {
            data_dir:         Some(data_dir.display().to_string()),
            artifact_dir:     dir.path().join("artifacts").display().to_string(),
            epochs:           1,
            batch_size:       10,
            train_limit:      Some(50),
            test_limit:       Some(12),
            validation_split: Some(0.2),
            model: ModelConfig::new(Architecture::Baseline)
                .with_baseline(BaselineConfig::new().with_hidden(8)),
            ..TrainConfig::default()
        };
        let report = TrainUseCase::new(cfg).run::<TestBackend>(Default::default()).unwrap();
        assert_eq!(report.history.len(), 1);
        assert_eq!(report.test.samples, 12);
    }

    #[test]
    #[serial]
    fn test_split_leaving_either_side_empty_is_an_error() {
        let dir      = TempDir::new().unwrap();
        let data_dir = dir.path().join("mnist");
        std::fs::create_dir_all(&data_dir).unwrap();
        write_synthetic_mnist(&data_dir, 10, 10);

        let base = TrainConfig {
            data_dir:     Some(data_dir.display().to_string()),
            artifact_dir: dir.path().join("artifacts").display().to_string(),
            epochs:       1,
            train_limit:  Some(1),
            ..TrainConfig::default()
        };

        // one sample: 0.6 holds it out, 0.4 keeps it for training
        for fraction in [0.6, 0.4] {
            let cfg = TrainConfig { validation_split: Some(fraction), ..base.clone() };
            assert!(TrainUseCase::new(cfg).run::<TestBackend>(Default::default()).is_err());
        }
        assert!(!dir.path().join("artifacts").join("metrics.csv").exists());
    }

    #[test]
    #[serial]
    fn test_resume_keeps_stored_architecture() {
        let dir = TempDir::new().unwrap();
        let cfg = trained_artifact(&dir);

        let resumed = TrainConfig {
            epochs: 2,
            resume: true,
            model:  ModelConfig::new(Architecture::SimpleCnn),
            ..cfg.clone()
        };
        let report = TrainUseCase::new(resumed).run::<TestBackend>(Default::default()).unwrap();
        assert_eq!(report.history.iter().map(|m| m.epoch).collect::<Vec<_>>(), vec![2]);

        let ckpt = CheckpointManager::new(&cfg.artifact_dir).unwrap();
        assert_eq!(ckpt.load_config().unwrap().model.architecture, Architecture::Baseline);
    }
}
