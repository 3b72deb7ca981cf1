// ============================================================
// Layer 4 — Digit Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<DigitSample>
// into tensors on the target device.
//
//   Input:  N DigitSamples
//   Output: DigitBatch with
//             images  [N, 1, 28, 28]  floats in [0, 1]
//             targets [N]             class indices
//             one_hot [N, 10]         one-hot targets for the loss
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::preprocessor::Preprocessor;
use crate::domain::digit::{DigitImage, DigitSample, HEIGHT, NUM_CLASSES, PIXELS, WIDTH};

// ─── DigitBatch ───────────────────────────────────────────────────────────────
/// A batch of digits ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct DigitBatch<B: Backend> {
    /// Shape: [batch_size, 1, HEIGHT, WIDTH]
    pub images: Tensor<B, 4>,

    /// Shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,

    /// Shape: [batch_size, NUM_CLASSES]
    pub one_hot: Tensor<B, 2>,
}

// ─── DigitBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct DigitBatcher<B: Backend> {
    pub device:       B::Device,
    pub preprocessor: Preprocessor,
}

impl<B: Backend> DigitBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device, preprocessor: Preprocessor::new() }
    }

    /// Images only, for inference: [N, 1, HEIGHT, WIDTH]
    pub fn images(&self, images: &[&DigitImage]) -> Tensor<B, 4> {
        let pixels: Vec<f32> = images
            .iter()
            .flat_map(|image| self.preprocessor.normalize(image))
            .collect();

        Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [images.len(), 1, HEIGHT, WIDTH]).convert::<B::FloatElem>(),
            &self.device,
        )
    }
}

impl<B: Backend> Batcher<DigitSample, DigitBatch<B>> for DigitBatcher<B> {
    fn batch(&self, items: Vec<DigitSample>) -> DigitBatch<B> {
        let batch_size = items.len();

        let image_refs: Vec<&DigitImage> = items.iter().map(|s| &s.image).collect();
        let images = self.images(&image_refs);
        debug_assert_eq!(images.dims(), [batch_size, 1, HEIGHT, WIDTH]);
        debug_assert_eq!(PIXELS, HEIGHT * WIDTH);

        let labels: Vec<_> = items.iter().map(|s| s.label).collect();

        let class_ids: Vec<i64> = labels.iter().map(|l| l.value() as i64).collect();
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(class_ids, [batch_size]).convert::<B::IntElem>(),
            &self.device,
        );

        let encoded = self.preprocessor.one_hot_matrix(&labels, NUM_CLASSES);
        let one_hot = Tensor::<B, 2>::from_data(
            TensorData::new(encoded.values, [encoded.rows, encoded.cols])
                .convert::<B::FloatElem>(),
            &self.device,
        );

        DigitBatch { images, targets, one_hot }
    }
}
