// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands `train`, `evaluate`, `predict`,
// `visualize` and `feature-maps`, their flags, and the global
// backend / device / precision options.
//
// Each *Args struct converts into its application-layer config
// with `From`, so Layer 2 never sees clap types.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{
    evaluate_use_case::EvaluateConfig,
    predict_use_case::PredictConfig,
    train_use_case::TrainConfig,
    visualize_use_case::{FeatureMapsConfig, VisualizeConfig},
};
use crate::infra::backend::{BackendSelection, ComputeBackend, DeviceSpec, Precision};
use crate::ml::{
    model::{Architecture, ModelConfig},
    visualizer::AscentSettings,
};

/// Backend selection shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct ComputeArgs {
    /// Tensor backend
    #[arg(long, global = true, env = "MNIST_BACKEND", value_enum, default_value_t = ComputeBackend::Ndarray)]
    pub backend: ComputeBackend,

    /// Device: cpu, gpu, gpu:N or default
    #[arg(long, global = true, env = "MNIST_DEVICE", default_value = "default")]
    pub device: DeviceSpec,

    /// Float precision (float16 needs the wgpu backend)
    #[arg(long, global = true, env = "MNIST_FLOATX", value_enum, default_value_t = Precision::Float32)]
    pub precision: Precision,
}

impl From<ComputeArgs> for BackendSelection {
    fn from(a: ComputeArgs) -> Self {
        BackendSelection { backend: a.backend, device: a.device, precision: a.precision }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a classifier and report its test error
    Train(TrainArgs),

    /// Measure the trained model on the test split
    Evaluate(EvaluateArgs),

    /// Classify one image file
    Predict(PredictArgs),

    /// Render the input pattern that maximally excites one filter
    Visualize(VisualizeArgs),

    /// Save the outputs of one convolutional stage for an image
    FeatureMaps(FeatureMapsArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Network to train
    #[arg(long, value_enum, default_value_t = Architecture::Baseline)]
    pub architecture: Architecture,

    /// Directory with the MNIST IDX files; downloads MNIST when omitted
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Where weights, optimizer state, config and metrics are written
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Images per gradient step
    #[arg(long, default_value_t = 200)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Seeds shuffling, the validation split and weight initialisation
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    /// Data loader worker threads. With more than one, batches arrive in
    /// completion order and runs with the same seed no longer match
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Hold out this fraction of the training split for validation
    /// instead of validating on the test split
    #[arg(long)]
    pub validation_split: Option<f64>,

    /// Use at most this many training samples
    #[arg(long)]
    pub train_limit: Option<usize>,

    /// Use at most this many test samples
    #[arg(long)]
    pub test_limit: Option<usize>,

    /// Continue from the latest checkpoint in the artifact directory
    #[arg(long)]
    pub resume: bool,

    /// Width of the first hidden dense layer
    #[arg(long)]
    pub hidden: Option<usize>,

    /// Dropout rate of the convolutional networks
    #[arg(long)]
    pub dropout: Option<f64>,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let mut model = ModelConfig::new(a.architecture);
        if let Some(hidden) = a.hidden {
            model = model.with_hidden_units(hidden);
        }
        if let Some(dropout) = a.dropout {
            model = model.with_dropout_rate(dropout);
        }

        TrainConfig {
            data_dir:         a.data_dir,
            artifact_dir:     a.artifact_dir,
            epochs:           a.epochs,
            batch_size:       a.batch_size,
            lr:               a.lr,
            seed:             a.seed,
            num_workers:      a.num_workers,
            validation_split: a.validation_split,
            train_limit:      a.train_limit,
            test_limit:       a.test_limit,
            resume:           a.resume,
            model,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub data_dir: Option<String>,

    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    #[arg(long, default_value_t = 200)]
    pub batch_size: usize,

    #[arg(long)]
    pub test_limit: Option<usize>,
}

impl From<EvaluateArgs> for EvaluateConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateConfig {
            data_dir:     a.data_dir,
            artifact_dir: a.artifact_dir,
            batch_size:   a.batch_size,
            test_limit:   a.test_limit,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Image file to classify (any size; converted to 28×28 grayscale)
    pub image: PathBuf,

    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    /// Print the probability of every class
    #[arg(long)]
    pub probabilities: bool,

    /// The image shows a dark digit on a light background
    #[arg(long)]
    pub invert: bool,
}

impl From<&PredictArgs> for PredictConfig {
    fn from(a: &PredictArgs) -> Self {
        PredictConfig {
            artifact_dir: a.artifact_dir.clone(),
            image:        a.image.clone(),
            invert:       a.invert,
        }
    }
}

#[derive(Args, Debug)]
pub struct VisualizeArgs {
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    /// Convolutional stage (0 = first)
    #[arg(long, default_value_t = 0)]
    pub layer: usize,

    /// Filter within the stage
    #[arg(long, default_value_t = 0)]
    pub filter: usize,

    /// Gradient ascent steps
    #[arg(long, default_value_t = 50)]
    pub iterations: usize,

    /// Step size applied to the normalised gradient
    #[arg(long, default_value_t = 1.0)]
    pub step: f32,

    /// Seeds the starting noise image
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    /// PNG to write; defaults to <artifact-dir>/filter_<layer>_<filter>.png
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl From<VisualizeArgs> for VisualizeConfig {
    fn from(a: VisualizeArgs) -> Self {
        let output = a.output.unwrap_or_else(|| {
            PathBuf::from(&a.artifact_dir).join(format!("filter_{}_{}.png", a.layer, a.filter))
        });

        VisualizeConfig {
            artifact_dir: a.artifact_dir,
            settings: AscentSettings {
                stage:      a.layer,
                filter:     a.filter,
                iterations: a.iterations,
                step:       a.step,
            },
            seed: a.seed,
            output,
        }
    }
}

#[derive(Args, Debug)]
pub struct FeatureMapsArgs {
    /// Image file to run through the network
    pub image: PathBuf,

    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    /// Convolutional stage (0 = first)
    #[arg(long, default_value_t = 0)]
    pub layer: usize,

    #[arg(long)]
    pub invert: bool,

    /// PNG to write; defaults to <artifact-dir>/feature_maps_<layer>.png
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl From<FeatureMapsArgs> for FeatureMapsConfig {
    fn from(a: FeatureMapsArgs) -> Self {
        let output = a.output.unwrap_or_else(|| {
            PathBuf::from(&a.artifact_dir).join(format!("feature_maps_{}.png", a.layer))
        });

        FeatureMapsConfig {
            artifact_dir: a.artifact_dir,
            image:        a.image,
            stage:        a.layer,
            invert:       a.invert,
            output,
        }
    }
}
