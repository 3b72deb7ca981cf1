// ============================================================
// Layer 2 — Visualization Use Cases
// ============================================================
// VisualizeUseCase:
//   gray noise → gradient ascent on one filter → deprocess → PNG
//
// FeatureMapsUseCase:
//   image file → one conv stage's outputs → tiled grid → PNG
//
// Both need a convolutional architecture; a baseline artifact
// has no stages to look at and is rejected.

use anyhow::Result;
use std::path::PathBuf;
use burn::tensor::backend::AutodiffBackend;

use crate::data::batcher::DigitBatcher;
use crate::domain::digit::{HEIGHT, WIDTH};
use crate::infra::{
    backend::BackendTask,
    checkpoint::CheckpointManager,
    image_io::{load_digit_image, save_grayscale, tile_feature_maps},
};
use crate::ml::{
    inferencer::LoadedModel,
    visualizer::{deprocess, extract_feature_maps, gray_noise, maximize_activation, AscentSettings},
};

// ─── VisualizeUseCase ─────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct VisualizeConfig {
    pub artifact_dir: String,
    pub settings:     AscentSettings,
    pub seed:         u64,
    pub output:       PathBuf,
}

pub struct VisualizeUseCase {
    config: VisualizeConfig,
}

impl VisualizeUseCase {
    pub fn new(config: VisualizeConfig) -> Self {
        Self { config }
    }
}

impl BackendTask for VisualizeUseCase {
    type Output = PathBuf;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<PathBuf> {
        let cfg = self.config;
        B::seed(cfg.seed);

        // Gradients flow back to the input, so the model lives on B itself
        let ckpt      = CheckpointManager::new(&cfg.artifact_dir)?;
        let model_cfg = ckpt.load_config()?.model;
        let model     = LoadedModel::<B>::load(&ckpt, &model_cfg, &device)?;

        tracing::info!(
            "Maximising filter {} of stage {} ({} iterations, step {})",
            cfg.settings.filter,
            cfg.settings.stage,
            cfg.settings.iterations,
            cfg.settings.step,
        );

        let start  = gray_noise::<B::InnerBackend>(&device);
        let values = maximize_activation::<B, _>(&model, cfg.settings, start)?;
        save_grayscale(&cfg.output, &deprocess(&values), WIDTH, HEIGHT)?;

        Ok(cfg.output)
    }
}

// ─── FeatureMapsUseCase ───────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct FeatureMapsConfig {
    pub artifact_dir: String,
    pub image:        PathBuf,
    pub stage:        usize,
    pub invert:       bool,
    pub output:       PathBuf,
}

/// Where the grid was written and how many maps it holds
#[derive(Debug, Clone)]
pub struct FeatureMapsOutput {
    pub path:  PathBuf,
    pub count: usize,
}

pub struct FeatureMapsUseCase {
    config: FeatureMapsConfig,
}

impl FeatureMapsUseCase {
    pub fn new(config: FeatureMapsConfig) -> Self {
        Self { config }
    }
}

impl BackendTask for FeatureMapsUseCase {
    type Output = FeatureMapsOutput;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<FeatureMapsOutput> {
        let cfg   = self.config;
        let digit = load_digit_image(&cfg.image)?;

        let ckpt      = CheckpointManager::new(&cfg.artifact_dir)?;
        let model_cfg = ckpt.load_config()?.model;
        let model     = LoadedModel::<B::InnerBackend>::load(&ckpt, &model_cfg, &device)?;

        let mut batcher = DigitBatcher::<B::InnerBackend>::new(device);
        batcher.preprocessor = batcher.preprocessor.with_inversion(cfg.invert);

        let maps  = extract_feature_maps(&model, batcher.images(&[&digit]), cfg.stage)?;
        let tiled = tile_feature_maps(&maps.planes, maps.height, maps.width)?;
        save_grayscale(&cfg.output, &tiled.pixels, tiled.width, tiled.height)?;

        Ok(FeatureMapsOutput { path: cfg.output, count: maps.planes.len() })
    }
}
