// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns raw samples into the numbers the models consume:
//
//   1. Optionally invert intensities (p → 255 - p) so dark ink
//      on light paper matches MNIST's light-on-dark convention
//   2. Scale every byte into [0, 1] by dividing by 255
//   3. One-hot encode labels into length-10 vectors
//
// Pure CPU code with no tensor types; the batcher turns the
// resulting Vec<f32>s into tensors.
//
// Reference: Rust Book §13 (Iterators)

use crate::domain::digit::{DigitImage, Label, NUM_CLASSES};

const MAX_INTENSITY: f32 = 255.0;

/// An N x C row-major matrix with exactly one 1.0 per row
#[derive(Debug, Clone, PartialEq)]
pub struct OneHotMatrix {
    pub rows:   usize,
    pub cols:   usize,
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    invert: bool,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invert intensities before scaling
    pub fn with_inversion(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Scale one image into [0, 1], row-major, length 784.
    pub fn normalize(&self, image: &DigitImage) -> Vec<f32> {
        image
            .pixels()
            .iter()
            .map(|&p| if self.invert { 255 - p } else { p })
            .map(|p| p as f32 / MAX_INTENSITY)
            .collect()
    }

    /// Length-10 vector with a single 1.0 at the label's index
    pub fn one_hot(&self, label: Label) -> Vec<f32> {
        let mut encoded = vec![0.0; NUM_CLASSES];
        encoded[label.index()] = 1.0;
        encoded
    }

    /// Encode a whole label set against `classes` columns.
    /// `classes` must be at least 10; extra columns stay zero.
    pub fn one_hot_matrix(&self, labels: &[Label], classes: usize) -> OneHotMatrix {
        debug_assert!(classes >= NUM_CLASSES);
        let values = labels
            .iter()
            .flat_map(|&label| {
                let mut row = self.one_hot(label);
                row.resize(classes, 0.0);
                row
            })
            .collect();
        OneHotMatrix { rows: labels.len(), cols: classes, values }
    }
}
