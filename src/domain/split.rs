use serde::{Deserialize, Serialize};

use crate::domain::digit::DigitSample;

/// Which half of the fixed MNIST partition to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    /// Number of samples in the published dataset
    pub fn expected_len(self) -> usize {
        match self {
            Split::Train => 60_000,
            Split::Test  => 10_000,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test  => "test",
        }
    }
}

/// The training and test collections, fixed at load time.
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    train: Vec<DigitSample>,
    test:  Vec<DigitSample>,
}

impl DatasetSplit {
    pub fn new(train: Vec<DigitSample>, test: Vec<DigitSample>) -> Self {
        Self { train, test }
    }

    /// Hand both collections over to the caller
    pub fn into_parts(self) -> (Vec<DigitSample>, Vec<DigitSample>) {
        (self.train, self.test)
    }
}
