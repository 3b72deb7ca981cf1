// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// DigitSource lets the application layer load MNIST without
// knowing where the bytes come from:
//   - IdxLoader       → raw IDX files in a local directory
//   - BurnMnistLoader → burn's downloader and cache
//
// DigitPredictor is implemented by the inference engine.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::digit::{DigitImage, DigitSample, Label};
use crate::domain::split::{DatasetSplit, Split};

// ─── DigitSource ──────────────────────────────────────────────────────────────
/// Any component that can produce the labelled MNIST partitions.
pub trait DigitSource {
    /// Load every sample of one split, in dataset order.
    fn load(&self, split: Split) -> Result<Vec<DigitSample>>;

    /// Load both splits.
    fn load_all(&self) -> Result<DatasetSplit> {
        let train = self.load(Split::Train)?;
        let test  = self.load(Split::Test)?;
        Ok(DatasetSplit::new(train, test))
    }
}

// ─── DigitPredictor ───────────────────────────────────────────────────────────
/// The output of classifying one image
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label:         Label,
    /// Softmax over the 10 classes, indexed by digit
    pub probabilities: Vec<f32>,
}

impl Prediction {
    pub fn confidence(&self) -> f32 {
        self.probabilities[self.label.index()]
    }
}

/// Any component that can classify digit images.
pub trait DigitPredictor {
    fn predict(&self, images: &[DigitImage]) -> Result<Vec<Prediction>>;

    fn predict_one(&self, image: &DigitImage) -> Result<Prediction> {
        let mut predictions = self.predict(std::slice::from_ref(image))?;
        predictions
            .pop()
            .ok_or_else(|| anyhow::anyhow!("predictor returned no output"))
    }
}
