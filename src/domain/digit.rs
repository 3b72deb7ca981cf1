// ============================================================
// Layer 3 — Digit Domain Types
// ============================================================
// DigitImage: 784 intensity bytes, row-major, immutable.
// Label:      a class index in 0..=9.
// DigitSample: one labelled image from the dataset.
//
// Both constructors validate their invariant and return an
// error instead of building an invalid value.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Image width in pixels
pub const WIDTH: usize = 28;

/// Image height in pixels
pub const HEIGHT: usize = 28;

/// Number of pixels in one image
pub const PIXELS: usize = WIDTH * HEIGHT;

/// Number of digit classes
pub const NUM_CLASSES: usize = 10;

/// A single 28x28 grayscale image.
/// 0 is black (background in MNIST), 255 is white (ink).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitImage {
    pixels: Vec<u8>,
}

impl DigitImage {
    /// Build an image from exactly [`PIXELS`] row-major bytes.
    pub fn new(pixels: Vec<u8>) -> Result<Self> {
        ensure!(
            pixels.len() == PIXELS,
            "expected a {WIDTH}x{HEIGHT} image ({PIXELS} pixels), got {} pixels",
            pixels.len()
        );
        Ok(Self { pixels })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// A digit class in 0..=9
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label(u8);

impl Label {
    pub fn new(value: u8) -> Result<Self> {
        ensure!(
            (value as usize) < NUM_CLASSES,
            "label {value} is outside 0..={}",
            NUM_CLASSES - 1
        );
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One labelled image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitSample {
    pub image: DigitImage,
    pub label: Label,
}

impl DigitSample {
    pub fn new(image: DigitImage, label: Label) -> Self {
        Self { image, label }
    }
}
