// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application);
// this layer routes commands and prints their results.
//
//   train         — trains a classifier, prints the test error
//   evaluate      — reloads the artifact, prints test metrics
//   predict       — classifies one image file
//   visualize     — activation maximisation for one filter
//   feature-maps  — one conv stage's outputs for an image
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{
    Commands, ComputeArgs, EvaluateArgs, FeatureMapsArgs, PredictArgs, TrainArgs, VisualizeArgs,
};

use crate::application::{
    evaluate_use_case::EvaluateUseCase,
    predict_use_case::PredictUseCase,
    train_use_case::TrainUseCase,
    visualize_use_case::{FeatureMapsUseCase, VisualizeUseCase},
};
use crate::infra::backend::{dispatch, BackendSelection};

#[derive(Parser, Debug)]
#[command(
    name = "mnist-digits",
    version,
    about = "Train, evaluate and inspect MNIST handwritten digit classifiers."
)]
pub struct Cli {
    #[command(flatten)]
    pub compute: ComputeArgs,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        let selection: BackendSelection = self.compute.into();
        match self.command {
            Commands::Train(args)       => run_train(selection, args),
            Commands::Evaluate(args)    => run_evaluate(selection, args),
            Commands::Predict(args)     => run_predict(selection, args),
            Commands::Visualize(args)   => run_visualize(selection, args),
            Commands::FeatureMaps(args) => run_feature_maps(selection, args),
        }
    }
}

fn run_train(selection: BackendSelection, args: TrainArgs) -> Result<()> {
    tracing::info!("Training {} for {} epochs", args.architecture.title(), args.epochs);

    let title  = args.architecture.title();
    let report = dispatch(selection, TrainUseCase::new(args.into()))?;

    println!("{} Error: {:.2}%", title, report.test.error_percent());
    Ok(())
}

fn run_evaluate(selection: BackendSelection, args: EvaluateArgs) -> Result<()> {
    let summary = dispatch(selection, EvaluateUseCase::new(args.into()))?;
    let eval    = summary.evaluation;

    println!("Samples:  {}", eval.samples);
    println!("Loss:     {:.4}", eval.loss);
    println!("Accuracy: {:.2}%", eval.accuracy * 100.0);
    println!("{} Error: {:.2}%", summary.architecture.title(), eval.error_percent());
    Ok(())
}

fn run_predict(selection: BackendSelection, args: PredictArgs) -> Result<()> {
    let prediction = dispatch(selection, PredictUseCase::new((&args).into()))?;

    println!("Predicted digit: {}", prediction.label);
    if args.probabilities {
        for (digit, p) in prediction.probabilities.iter().enumerate() {
            println!("  {digit}: {p:.4}");
        }
    }
    Ok(())
}

fn run_visualize(selection: BackendSelection, args: VisualizeArgs) -> Result<()> {
    let path = dispatch(selection, VisualizeUseCase::new(args.into()))?;
    println!("Saved filter visualization to {}", path.display());
    Ok(())
}

fn run_feature_maps(selection: BackendSelection, args: FeatureMapsArgs) -> Result<()> {
    let output = dispatch(selection, FeatureMapsUseCase::new(args.into()))?;
    println!("Saved {} feature maps to {}", output.count, output.path.display());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{train_use_case::TrainConfig, visualize_use_case::VisualizeConfig};
    use crate::infra::backend::{ComputeBackend, DeviceSpec, Precision};
    use crate::ml::model::Architecture;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["mnist-digits", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };

        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.epochs, 10);
        assert_eq!(cfg.batch_size, 200);
        assert_eq!(cfg.model.architecture, Architecture::Baseline);
        assert_eq!(cfg.artifact_dir, "artifacts");
    }

    #[test]
    fn test_train_overrides() {
        let cli = Cli::try_parse_from([
            "mnist-digits", "train",
            "--architecture", "large-cnn",
            "--hidden", "64",
            "--dropout", "0.3",
            "--validation-split", "0.1",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };

        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.model.architecture, Architecture::LargeCnn);
        assert_eq!(cfg.model.large_cnn.hidden_1, 64);
        assert_eq!(cfg.model.large_cnn.dropout, 0.3);
        assert_eq!(cfg.validation_split, Some(0.1));
    }

    #[test]
    fn test_global_backend_flags() {
        let cli = Cli::try_parse_from([
            "mnist-digits", "predict", "digit.png",
            "--backend", "wgpu", "--device", "gpu:1", "--precision", "float16",
        ])
        .unwrap();

        let selection: BackendSelection = cli.compute.into();
        assert_eq!(selection.backend, ComputeBackend::Wgpu);
        assert_eq!(selection.device, DeviceSpec::Gpu(1));
        assert_eq!(selection.precision, Precision::Float16);
        assert!(selection.validate().is_ok());
    }

    #[test]
    fn test_predict_requires_image() {
        assert!(Cli::try_parse_from(["mnist-digits", "predict"]).is_err());
    }

    #[test]
    fn test_visualize_default_output() {
        let cli = Cli::try_parse_from(["mnist-digits", "visualize", "--layer", "1", "--filter", "4"])
            .unwrap();
        let Commands::Visualize(args) = cli.command else { panic!("expected visualize") };

        let cfg: VisualizeConfig = args.into();
        assert_eq!(cfg.settings.iterations, 50);
        assert_eq!(cfg.settings.step, 1.0);
        assert!(cfg.output.ends_with("filter_1_4.png"));
    }
}
