// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the trained network from the artifact directory and
// classifies digit images.
//
// The architecture is only known at run time (it is read from
// train_config.json), so LoadedModel holds one of the four
// concrete modules and forwards DigitClassifier calls to it.
use anyhow::{anyhow, Context, Result};
use burn::{prelude::*, tensor::activation::softmax};

use crate::data::batcher::DigitBatcher;
use crate::domain::{
    digit::{DigitImage, Label, NUM_CLASSES},
    traits::{DigitPredictor, Prediction},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{
    Architecture, Baseline, BranchingCnn, DigitClassifier, LargeCnn, ModelConfig, SimpleCnn,
};

/// A trained network of any architecture
#[derive(Debug, Clone)]
pub enum LoadedModel<B: Backend> {
    Baseline(Baseline<B>),
    SimpleCnn(SimpleCnn<B>),
    LargeCnn(LargeCnn<B>),
    Branching(BranchingCnn<B>),
}

impl<B: Backend> LoadedModel<B> {
    /// Initialise `cfg`'s architecture and fill it with the latest weights.
    pub fn load(ckpt: &CheckpointManager, cfg: &ModelConfig, device: &B::Device) -> Result<Self> {
        cfg.validate()
            .with_context(|| format!("Invalid model settings in '{}'", ckpt.dir().display()))?;

        let model = match cfg.architecture {
            Architecture::Baseline => Self::Baseline(
                ckpt.load_model::<B, _>(cfg.baseline.init::<B>(device), device)?,
            ),
            Architecture::SimpleCnn => Self::SimpleCnn(
                ckpt.load_model::<B, _>(cfg.simple_cnn.init::<B>(device), device)?,
            ),
            Architecture::LargeCnn => Self::LargeCnn(
                ckpt.load_model::<B, _>(cfg.large_cnn.init::<B>(device), device)?,
            ),
            Architecture::Branching => Self::Branching(
                ckpt.load_model::<B, _>(cfg.branching.init::<B>(device), device)?,
            ),
        };
        Ok(model)
    }

    pub fn architecture(&self) -> Architecture {
        match self {
            Self::Baseline(_)  => Architecture::Baseline,
            Self::SimpleCnn(_) => Architecture::SimpleCnn,
            Self::LargeCnn(_)  => Architecture::LargeCnn,
            Self::Branching(_) => Architecture::Branching,
        }
    }

    fn classifier(&self) -> &dyn DigitClassifier<B> {
        match self {
            Self::Baseline(m)  => m,
            Self::SimpleCnn(m) => m,
            Self::LargeCnn(m)  => m,
            Self::Branching(m) => m,
        }
    }
}

impl<B: Backend> DigitClassifier<B> for LoadedModel<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.classifier().forward(images)
    }

    fn feature_maps(&self, images: Tensor<B, 4>) -> Vec<Tensor<B, 4>> {
        self.classifier().feature_maps(images)
    }
}

pub struct Inferencer<B: Backend> {
    model:   LoadedModel<B>,
    batcher: DigitBatcher<B>,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: LoadedModel<B>, device: B::Device) -> Self {
        Self { model, batcher: DigitBatcher::new(device) }
    }

    /// Load the artifact written by `train`.
    pub fn from_checkpoint(ckpt: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg   = ckpt.load_config()?;
        let model = LoadedModel::load(ckpt, &cfg.model, &device)?;
        tracing::info!("Model loaded from checkpoint: {}", model.architecture().title());
        Ok(Self::new(model, device))
    }

    /// Invert pixel intensities before classifying (dark digit on light paper).
    pub fn with_inversion(mut self, invert: bool) -> Self {
        self.batcher.preprocessor = self.batcher.preprocessor.with_inversion(invert);
        self
    }
}

impl<B: Backend> DigitPredictor for Inferencer<B> {
    fn predict(&self, images: &[DigitImage]) -> Result<Vec<Prediction>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let refs: Vec<&DigitImage> = images.iter().collect();
        let input  = self.batcher.images(&refs);
        let probs  = softmax(self.model.forward(input), 1);

        let values = probs
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read probabilities: {e:?}"))?;

        values
            .chunks(NUM_CLASSES)
            .map(|row| {
                let (best, _) = row
                    .iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |acc, (i, &p)| if p > acc.1 { (i, p) } else { acc });

                tracing::debug!("Predicted {} with p={:.4}", best, row[best]);
                Ok(Prediction { label: Label::new(best as u8)?, probabilities: row.to_vec() })
            })
            .collect()
    }
}
