// ============================================================
// Layer 5 — Digit Classifier Architectures
// ============================================================
// Four networks, each described by a burn Config and built by
// its init() method:
//
//   Baseline     flatten → dense(784, relu) → dense(10)
//   SimpleCnn    conv 5x5 (32) → pool → dropout → dense(128) → dense(10)
//   LargeCnn     conv 5x5 (30) → pool → conv 3x3 (15) → pool → dropout
//                → dense(128) → dense(50) → dense(10)
//   BranchingCnn conv 3x3 (32) ┐
//                              ├ sum → pool → dropout → dense(128) → dense(10)
//                conv 5x5 (32) ┘
//
// Every model takes images shaped [batch, 1, 28, 28] and returns
// logits shaped [batch, 10]. Softmax lives in the loss and in
// the inferencer.
//
// Reference: Burn Book §3 (Building Blocks)

use anyhow::{ensure, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};
use serde::{Deserialize, Serialize};

use crate::domain::digit::{HEIGHT, NUM_CLASSES, PIXELS, WIDTH};

const POOL: usize = 2;

// ─── Architecture ─────────────────────────────────────────────────────────────
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Architecture {
    /// One hidden fully-connected layer
    Baseline,
    /// One convolution + pooling stage
    SimpleCnn,
    /// Two convolution + pooling stages
    LargeCnn,
    /// Two parallel convolutions summed element-wise
    Branching,
}

impl Architecture {
    pub fn title(self) -> &'static str {
        match self {
            Architecture::Baseline  => "Baseline",
            Architecture::SimpleCnn => "Simple CNN",
            Architecture::LargeCnn  => "Large CNN",
            Architecture::Branching => "Branching CNN",
        }
    }
}

// ─── DigitClassifier ──────────────────────────────────────────────────────────
/// Shared surface of every architecture.
pub trait DigitClassifier<B: Backend> {
    /// images: [batch, 1, 28, 28] → logits: [batch, 10]
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Outputs of each convolutional stage, in network order.
    /// Each tensor is [batch, channels, height, width].
    fn feature_maps(&self, images: Tensor<B, 4>) -> Vec<Tensor<B, 4>>;
}

/// Spatial size after a valid convolution
fn conv_out(size: usize, kernel: usize) -> usize {
    size + 1 - kernel
}

/// Padding that keeps the spatial size for an odd kernel
fn same_padding(kernel: usize) -> PaddingConfig2d {
    PaddingConfig2d::Explicit(kernel / 2, kernel / 2)
}

fn max_pool() -> MaxPool2d {
    MaxPool2dConfig::new([POOL, POOL]).with_strides([POOL, POOL]).init()
}

// ─── Baseline ─────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct BaselineConfig {
    #[config(default = 784)]
    pub hidden: usize,
}

#[derive(Module, Debug)]
pub struct Baseline<B: Backend> {
    pub hidden: Linear<B>,
    pub output: Linear<B>,
}

impl BaselineConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Baseline<B> {
        Baseline {
            hidden: LinearConfig::new(PIXELS, self.hidden).init(device),
            output: LinearConfig::new(self.hidden, NUM_CLASSES).init(device),
        }
    }
}

impl<B: Backend> DigitClassifier<B> for Baseline<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = images.flatten::<2>(1, 3); // [batch, 784]
        let x = relu(self.hidden.forward(x));
        self.output.forward(x)
    }

    fn feature_maps(&self, _images: Tensor<B, 4>) -> Vec<Tensor<B, 4>> {
        Vec::new()
    }
}

// ─── SimpleCnn ────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct SimpleCnnConfig {
    #[config(default = 32)]
    pub filters: usize,
    #[config(default = 5)]
    pub kernel_size: usize,
    #[config(default = 128)]
    pub hidden: usize,
    #[config(default = 0.2)]
    pub dropout: f64,
}

#[derive(Module, Debug)]
pub struct SimpleCnn<B: Backend> {
    pub conv:    Conv2d<B>,
    pub pool:    MaxPool2d,
    pub dropout: Dropout,
    pub hidden:  Linear<B>,
    pub output:  Linear<B>,
}

impl SimpleCnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SimpleCnn<B> {
        let side      = conv_out(HEIGHT, self.kernel_size) / POOL;
        let flattened = self.filters * side * side;

        SimpleCnn {
            conv: Conv2dConfig::new([1, self.filters], [self.kernel_size, self.kernel_size])
                .init(device),
            pool:    max_pool(),
            dropout: DropoutConfig::new(self.dropout).init(),
            hidden:  LinearConfig::new(flattened, self.hidden).init(device),
            output:  LinearConfig::new(self.hidden, NUM_CLASSES).init(device),
        }
    }
}

impl<B: Backend> SimpleCnn<B> {
    fn features(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        relu(self.conv.forward(images))
    }
}

impl<B: Backend> DigitClassifier<B> for SimpleCnn<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(self.features(images));
        let x = self.dropout.forward(x);
        let x = relu(self.hidden.forward(x.flatten::<2>(1, 3)));
        self.output.forward(x)
    }

    fn feature_maps(&self, images: Tensor<B, 4>) -> Vec<Tensor<B, 4>> {
        vec![self.features(images)]
    }
}

// ─── LargeCnn ─────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct LargeCnnConfig {
    #[config(default = 30)]
    pub filters_1: usize,
    #[config(default = 5)]
    pub kernel_1: usize,
    #[config(default = 15)]
    pub filters_2: usize,
    #[config(default = 3)]
    pub kernel_2: usize,
    #[config(default = 128)]
    pub hidden_1: usize,
    #[config(default = 50)]
    pub hidden_2: usize,
    #[config(default = 0.2)]
    pub dropout: f64,
}

#[derive(Module, Debug)]
pub struct LargeCnn<B: Backend> {
    pub conv_1:   Conv2d<B>,
    pub conv_2:   Conv2d<B>,
    pub pool:     MaxPool2d,
    pub dropout:  Dropout,
    pub hidden_1: Linear<B>,
    pub hidden_2: Linear<B>,
    pub output:   Linear<B>,
}

impl LargeCnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LargeCnn<B> {
        let side_1    = conv_out(HEIGHT, self.kernel_1) / POOL;
        let side_2    = conv_out(side_1, self.kernel_2) / POOL;
        let flattened = self.filters_2 * side_2 * side_2;

        LargeCnn {
            conv_1: Conv2dConfig::new([1, self.filters_1], [self.kernel_1, self.kernel_1])
                .init(device),
            conv_2: Conv2dConfig::new([self.filters_1, self.filters_2], [self.kernel_2, self.kernel_2])
                .init(device),
            pool:     max_pool(),
            dropout:  DropoutConfig::new(self.dropout).init(),
            hidden_1: LinearConfig::new(flattened, self.hidden_1).init(device),
            hidden_2: LinearConfig::new(self.hidden_1, self.hidden_2).init(device),
            output:   LinearConfig::new(self.hidden_2, NUM_CLASSES).init(device),
        }
    }
}

impl<B: Backend> DigitClassifier<B> for LargeCnn<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(relu(self.conv_1.forward(images)));
        let x = self.pool.forward(relu(self.conv_2.forward(x)));
        let x = self.dropout.forward(x);
        let x = relu(self.hidden_1.forward(x.flatten::<2>(1, 3)));
        let x = relu(self.hidden_2.forward(x));
        self.output.forward(x)
    }

    fn feature_maps(&self, images: Tensor<B, 4>) -> Vec<Tensor<B, 4>> {
        let first  = relu(self.conv_1.forward(images));
        let second = relu(self.conv_2.forward(self.pool.forward(first.clone())));
        vec![first, second]
    }
}

// ─── BranchingCnn ─────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct BranchingCnnConfig {
    #[config(default = 32)]
    pub filters: usize,
    #[config(default = 3)]
    pub kernel_a: usize,
    #[config(default = 5)]
    pub kernel_b: usize,
    #[config(default = 128)]
    pub hidden: usize,
    #[config(default = 0.2)]
    pub dropout: f64,
}

#[derive(Module, Debug)]
pub struct BranchingCnn<B: Backend> {
    pub branch_a: Conv2d<B>,
    pub branch_b: Conv2d<B>,
    pub pool:     MaxPool2d,
    pub dropout:  Dropout,
    pub hidden:   Linear<B>,
    pub output:   Linear<B>,
}

impl BranchingCnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BranchingCnn<B> {
        assert!(
            self.kernel_a % 2 == 1 && self.kernel_b % 2 == 1,
            "branch kernels must be odd to keep both paths the same size"
        );
        let side      = HEIGHT / POOL;
        let flattened = self.filters * side * side;

        BranchingCnn {
            branch_a: Conv2dConfig::new([1, self.filters], [self.kernel_a, self.kernel_a])
                .with_padding(same_padding(self.kernel_a))
                .init(device),
            branch_b: Conv2dConfig::new([1, self.filters], [self.kernel_b, self.kernel_b])
                .with_padding(same_padding(self.kernel_b))
                .init(device),
            pool:    max_pool(),
            dropout: DropoutConfig::new(self.dropout).init(),
            hidden:  LinearConfig::new(flattened, self.hidden).init(device),
            output:  LinearConfig::new(self.hidden, NUM_CLASSES).init(device),
        }
    }
}

impl<B: Backend> BranchingCnn<B> {
    /// (path a, path b, element-wise sum)
    fn branches(&self, images: Tensor<B, 4>) -> (Tensor<B, 4>, Tensor<B, 4>, Tensor<B, 4>) {
        let a = relu(self.branch_a.forward(images.clone()));
        let b = relu(self.branch_b.forward(images));
        let merged = a.clone() + b.clone();
        (a, b, merged)
    }
}

impl<B: Backend> DigitClassifier<B> for BranchingCnn<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let (_, _, merged) = self.branches(images);
        let x = self.dropout.forward(self.pool.forward(merged));
        let x = relu(self.hidden.forward(x.flatten::<2>(1, 3)));
        self.output.forward(x)
    }

    fn feature_maps(&self, images: Tensor<B, 4>) -> Vec<Tensor<B, 4>> {
        let (a, b, merged) = self.branches(images);
        vec![a, b, merged]
    }
}

// ─── ModelConfig ──────────────────────────────────────────────────────────────
/// Selected architecture plus the layer settings of every variant.
/// Saved with the artifact so inference rebuilds the same network.
#[derive(Config, Debug)]
pub struct ModelConfig {
    pub architecture: Architecture,
    #[config(default = "BaselineConfig::new()")]
    pub baseline: BaselineConfig,
    #[config(default = "SimpleCnnConfig::new()")]
    pub simple_cnn: SimpleCnnConfig,
    #[config(default = "LargeCnnConfig::new()")]
    pub large_cnn: LargeCnnConfig,
    #[config(default = "BranchingCnnConfig::new()")]
    pub branching: BranchingCnnConfig,
}

impl ModelConfig {
    /// Override the first hidden dense width of the selected variant
    pub fn with_hidden_units(mut self, hidden: usize) -> Self {
        match self.architecture {
            Architecture::Baseline  => self.baseline.hidden = hidden,
            Architecture::SimpleCnn => self.simple_cnn.hidden = hidden,
            Architecture::LargeCnn  => self.large_cnn.hidden_1 = hidden,
            Architecture::Branching => self.branching.hidden = hidden,
        }
        self
    }

    /// Check the selected variant's settings before any layer is built.
    pub fn validate(&self) -> Result<()> {
        let (widths, dropout) = match self.architecture {
            Architecture::Baseline => (vec![self.baseline.hidden], 0.0),
            Architecture::SimpleCnn => {
                let c = &self.simple_cnn;
                ensure!(
                    (1..HEIGHT).contains(&c.kernel_size),
                    "Kernel size {} does not fit a {HEIGHT}x{WIDTH} image",
                    c.kernel_size
                );
                (vec![c.filters, c.hidden], c.dropout)
            }
            Architecture::LargeCnn => {
                let c = &self.large_cnn;
                ensure!(
                    (1..HEIGHT).contains(&c.kernel_1),
                    "First kernel size {} does not fit a {HEIGHT}x{WIDTH} image",
                    c.kernel_1
                );
                let side = conv_out(HEIGHT, c.kernel_1) / POOL;
                ensure!(
                    (1..side).contains(&c.kernel_2),
                    "Second kernel size {} does not fit the {side}x{side} pooled maps",
                    c.kernel_2
                );
                (vec![c.filters_1, c.filters_2, c.hidden_1, c.hidden_2], c.dropout)
            }
            Architecture::Branching => {
                let c = &self.branching;
                ensure!(
                    c.kernel_a % 2 == 1 && c.kernel_b % 2 == 1,
                    "Branch kernels must be odd to keep both paths the same size, got {} and {}",
                    c.kernel_a,
                    c.kernel_b
                );
                (vec![c.filters, c.hidden], c.dropout)
            }
        };

        ensure!(
            widths.iter().all(|&w| w > 0),
            "{} layer widths must be at least 1, got {widths:?}",
            self.architecture.title()
        );
        ensure!((0.0..1.0).contains(&dropout), "Dropout must be in [0, 1), got {dropout}");
        Ok(())
    }

    /// Override the dropout rate of the convolutional variants
    pub fn with_dropout_rate(mut self, dropout: f64) -> Self {
        self.simple_cnn.dropout = dropout;
        self.large_cnn.dropout  = dropout;
        self.branching.dropout  = dropout;
        self
    }
}
