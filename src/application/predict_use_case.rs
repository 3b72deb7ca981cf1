// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Classifies a single image file with the trained artifact:
//
//   Step 1: Decode, convert to grayscale, resize to 28×28  (Layer 6)
//   Step 2: Rebuild the model from the artifact            (Layer 5)
//   Step 3: Softmax over the 10 classes                    (Layer 5)

use anyhow::Result;
use std::path::PathBuf;
use burn::tensor::backend::AutodiffBackend;

use crate::domain::traits::{DigitPredictor, Prediction};
use crate::infra::{backend::BackendTask, checkpoint::CheckpointManager, image_io::load_digit_image};
use crate::ml::inferencer::Inferencer;

#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub artifact_dir: String,
    pub image:        PathBuf,
    /// Treat the image as a dark digit on a light background
    pub invert:       bool,
}

pub struct PredictUseCase {
    config: PredictConfig,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }
}

impl BackendTask for PredictUseCase {
    type Output = Prediction;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<Prediction> {
        let cfg   = self.config;
        let digit = load_digit_image(&cfg.image)?;

        let ckpt       = CheckpointManager::new(&cfg.artifact_dir)?;
        let inferencer = Inferencer::<B::InnerBackend>::from_checkpoint(&ckpt, device)?
            .with_inversion(cfg.invert);

        let prediction = inferencer.predict_one(&digit)?;
        tracing::info!(
            "'{}' classified as {} ({:.1}%)",
            cfg.image.display(),
            prediction.label,
            prediction.confidence() * 100.0,
        );
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use crate::application::train_use_case::tests::{trained_artifact, TestBackend};
    use crate::domain::digit::{HEIGHT, NUM_CLASSES, WIDTH};
    use crate::infra::image_io::save_grayscale;
    use temp_dir::TempDir;

    #[test]
    #[serial]
    fn test_predict_image_file() {
        let dir   = TempDir::new().unwrap();
        let train = trained_artifact(&dir);

        // Same pattern as the synthetic training digit 3: row band 3 lit
        let band = HEIGHT / 10;
        let mut pixels = vec![0u8; WIDTH * HEIGHT];
        pixels[3 * band * WIDTH..4 * band * WIDTH].fill(255);
        let image = dir.path().join("three.png");
        save_grayscale(&image, &pixels, WIDTH, HEIGHT).unwrap();

        let prediction = PredictUseCase::new(PredictConfig {
            artifact_dir: train.artifact_dir.clone(),
            image,
            invert: false,
        })
        .run::<TestBackend>(Default::default())
        .unwrap();

        assert_eq!(prediction.probabilities.len(), NUM_CLASSES);
        assert!(prediction.label.value() <= 9);
    }

    #[test]
    #[serial]
    fn test_missing_image_is_an_error() {
        let dir   = TempDir::new().unwrap();
        let train = trained_artifact(&dir);

        let result = PredictUseCase::new(PredictConfig {
            artifact_dir: train.artifact_dir,
            image:        dir.path().join("missing.png"),
            invert:       false,
        })
        .run::<TestBackend>(Default::default());
        assert!(result.is_err());
    }
}
