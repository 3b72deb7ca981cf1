// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Reloads the trained artifact and measures it on the test split.

use anyhow::{ensure, Result};
use burn::tensor::backend::AutodiffBackend;

use crate::data::loader::source_for;
use crate::domain::split::Split;
use crate::infra::{backend::BackendTask, checkpoint::CheckpointManager};
use crate::ml::{
    inferencer::LoadedModel,
    model::Architecture,
    trainer::{evaluate, Evaluation},
};

#[derive(Debug, Clone)]
pub struct EvaluateConfig {
    pub data_dir:     Option<String>,
    pub artifact_dir: String,
    pub batch_size:   usize,
    pub test_limit:   Option<usize>,
}

/// Test-split result of the stored model
#[derive(Debug, Clone, Copy)]
pub struct EvaluationSummary {
    pub architecture: Architecture,
    pub evaluation:   Evaluation,
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }
}

impl BackendTask for EvaluateUseCase {
    type Output = EvaluationSummary;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<EvaluationSummary> {
        let cfg = self.config;
        ensure!(cfg.batch_size > 0, "Batch size must be at least 1");

        let ckpt      = CheckpointManager::new(&cfg.artifact_dir)?;
        let model_cfg = ckpt.load_config()?.model;
        let model     = LoadedModel::<B::InnerBackend>::load(&ckpt, &model_cfg, &device)?;

        let mut test = source_for(cfg.data_dir.as_deref()).load(Split::Test)?;
        if let Some(max) = cfg.test_limit {
            test.truncate(max);
        }
        ensure!(!test.is_empty(), "No test samples to evaluate");
        tracing::info!("Evaluating {} on {} test samples", model_cfg.architecture.title(), test.len());

        let evaluation = evaluate::<B::InnerBackend, _>(&model, test, cfg.batch_size, &device);
        Ok(EvaluationSummary { architecture: model_cfg.architecture, evaluation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use crate::application::train_use_case::tests::{trained_artifact, TestBackend};
    use temp_dir::TempDir;

    #[test]
    #[serial]
    fn test_evaluate_trained_artifact() {
        let dir   = TempDir::new().unwrap();
        let train = trained_artifact(&dir);

        let summary = EvaluateUseCase::new(EvaluateConfig {
            data_dir:     train.data_dir.clone(),
            artifact_dir: train.artifact_dir.clone(),
            batch_size:   7,
            test_limit:   Some(15),
        })
        .run::<TestBackend>(Default::default())
        .unwrap();

        assert_eq!(summary.architecture, Architecture::Baseline);
        assert_eq!(summary.evaluation.samples, 15);
        assert!(summary.evaluation.loss.is_finite());
    }

    #[test]
    #[serial]
    fn test_evaluate_without_artifact_fails() {
        let dir = TempDir::new().unwrap();
        let result = EvaluateUseCase::new(EvaluateConfig {
            data_dir:     Some(dir.path().display().to_string()),
            artifact_dir: dir.path().join("none").display().to_string(),
            batch_size:   10,
            test_limit:   None,
        })
        .run::<TestBackend>(Default::default());
        assert!(result.is_err());
    }
}
