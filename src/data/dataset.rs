use burn::data::dataset::Dataset;

use crate::domain::digit::DigitSample;

/// In-memory collection of labelled digits for burn's DataLoader.
pub struct DigitDataset {
    samples: Vec<DigitSample>,
}

impl DigitDataset {
    pub fn new(samples: Vec<DigitSample>) -> Self { Self { samples } }
}

impl Dataset<DigitSample> for DigitDataset {
    fn get(&self, index: usize) -> Option<DigitSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
