// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Mini-batch Adam training with per-epoch validation and
// checkpointing, generic over the backend and the architecture.
//
//   for each epoch:
//     reseed from (seed, epoch), shuffle → batches of `batch_size`
//     forward → categorical cross-entropy → backward → Adam step
//     model.valid() on the validation data (dropout disabled)
//     save model + optimizer, append metrics.csv
//   finally: loss / accuracy / error on the test split
//
// Training runs on an AutodiffBackend B. model.valid() gives
// the same network on B::InnerBackend, so validation batches
// are built on the inner backend as well.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use std::sync::Arc;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{DigitBatch, DigitBatcher},
    dataset::DigitDataset,
};
use crate::domain::digit::DigitSample;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    loss::{categorical_cross_entropy, correct_predictions},
    model::{Architecture, DigitClassifier},
};

/// Samples handed to the training loop.
pub struct TrainingData {
    pub train: Vec<DigitSample>,
    /// Held-out part of the training split. `None` validates on `test`.
    pub validation: Option<Vec<DigitSample>>,
    pub test: Vec<DigitSample>,
}

/// Loss and accuracy of a model over a labelled set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub loss:     f64,
    pub accuracy: f64,
    pub samples:  usize,
}

impl Evaluation {
    /// Classification error as a percentage
    pub fn error_percent(&self) -> f64 {
        (1.0 - self.accuracy) * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Metrics of the epochs run in this invocation
    pub history: Vec<EpochMetrics>,
    pub test:    Evaluation,
}

/// Build the configured architecture and train it.
pub fn run_training<B: AutodiffBackend>(
    cfg:    &TrainConfig,
    data:   TrainingData,
    ckpt:   &CheckpointManager,
    device: B::Device,
) -> Result<TrainingReport> {
    B::seed(cfg.seed);

    let model_cfg = &cfg.model;
    match model_cfg.architecture {
        Architecture::Baseline  => fit(cfg, model_cfg.baseline.init::<B>(&device), data, ckpt, device),
        Architecture::SimpleCnn => fit(cfg, model_cfg.simple_cnn.init::<B>(&device), data, ckpt, device),
        Architecture::LargeCnn  => fit(cfg, model_cfg.large_cnn.init::<B>(&device), data, ckpt, device),
        Architecture::Branching => fit(cfg, model_cfg.branching.init::<B>(&device), data, ckpt, device),
    }
}

fn fit<B, M>(
    cfg:       &TrainConfig,
    mut model: M,
    data:      TrainingData,
    ckpt:      &CheckpointManager,
    device:    B::Device,
) -> Result<TrainingReport>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + DigitClassifier<B>,
    M::InnerModule: DigitClassifier<B::InnerBackend>,
{
    tracing::info!(
        "Model ready: {} ({} parameters)",
        cfg.model.architecture.title(),
        model.num_params(),
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().with_epsilon(1e-7).init::<B, M>();

    // ── Resume ────────────────────────────────────────────────────────────────
    let mut first_epoch = 1;
    if cfg.resume && ckpt.has_checkpoint() {
        let done = ckpt.latest_epoch()?;
        model = ckpt.load_model::<B, M>(model, &device)?;
        optim = ckpt.load_optimizer::<B, M, _>(optim, &device)?;
        first_epoch = done + 1;
        tracing::info!("Resuming after epoch {}", done);
    } else if cfg.resume {
        tracing::warn!("No checkpoint in '{}', starting from scratch", ckpt.dir().display());
    }

    let metrics = if first_epoch == 1 {
        MetricsLogger::fresh(ckpt.dir())?
    } else {
        MetricsLogger::new(ckpt.dir())?
    };

    // ── Data loaders ──────────────────────────────────────────────────────────
    tracing::info!(
        "Training on {} samples, validating on {} samples",
        data.train.len(),
        data.validation.as_ref().map_or(data.test.len(), Vec::len),
    );

    let train_set = Arc::new(DigitDataset::new(data.train));

    let test_loader = inner_loader::<B::InnerBackend>(data.test, cfg, &device);
    let val_loader  = match data.validation {
        Some(samples) => inner_loader::<B::InnerBackend>(samples, cfg, &device),
        None          => test_loader.clone(),
    };

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut history   = Vec::new();
    let mut best_loss = f64::INFINITY;

    for epoch in first_epoch..=cfg.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut correct  = 0usize;
        let mut seen     = 0usize;

        // Shuffle order and dropout masks depend only on (seed, epoch)
        let epoch_seed = cfg.seed.wrapping_add(epoch as u64);
        B::seed(epoch_seed);
        let train_loader = DataLoaderBuilder::new(DigitBatcher::<B>::new(device.clone()))
            .batch_size(cfg.batch_size)
            .shuffle(epoch_seed)
            .num_workers(cfg.num_workers)
            .build(train_set.clone());

        for batch in train_loader.iter() {
            let logits = model.forward(batch.images);
            let loss   = categorical_cross_entropy(logits.clone(), batch.one_hot);

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches  += 1;
            seen     += batch.targets.dims()[0];
            correct  += correct_predictions(logits, batch.targets);

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        let train_acc  = if seen    > 0 { correct as f64 / seen as f64 } else { 0.0 };

        let val = evaluate_loader(&model.valid(), &val_loader);
        let m   = EpochMetrics::new(epoch, train_loss, train_acc, val.loss, val.accuracy);

        println!(
            "Epoch {:>3}/{} | loss={:.4} | acc={:.2}% | val_loss={:.4} | val_acc={:.2}%",
            epoch, cfg.epochs, m.train_loss, m.train_acc * 100.0, m.val_loss, m.val_acc * 100.0,
        );

        if m.is_improvement(best_loss) {
            best_loss = m.val_loss;
            tracing::debug!("New best validation error: {:.2}%", m.val_error_percent());
        } else {
            tracing::debug!("Validation loss did not improve (best {:.4})", best_loss);
        }

        ckpt.save_epoch::<B, M, _>(&model, &optim, epoch)?;
        metrics.log(&m)?;
        history.push(m);
    }

    if first_epoch > cfg.epochs {
        tracing::info!("All {} epochs already complete, evaluating only", cfg.epochs);
    }

    let test = evaluate_loader(&model.valid(), &test_loader);
    tracing::info!("Training complete! Metrics in '{}'", metrics.csv_path().display());
    Ok(TrainingReport { history, test })
}

fn inner_loader<B: Backend>(
    samples: Vec<DigitSample>,
    cfg:     &TrainConfig,
    device:  &B::Device,
) -> Arc<dyn DataLoader<DigitBatch<B>>> {
    DataLoaderBuilder::new(DigitBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(cfg.num_workers)
        .build(DigitDataset::new(samples))
}

/// Mean loss and accuracy of `model` over `samples`.
pub fn evaluate<B: Backend, M: DigitClassifier<B>>(
    model:      &M,
    samples:    Vec<DigitSample>,
    batch_size: usize,
    device:     &B::Device,
) -> Evaluation {
    let loader = DataLoaderBuilder::new(DigitBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .build(DigitDataset::new(samples));
    evaluate_loader(model, &loader)
}

fn evaluate_loader<B: Backend, M: DigitClassifier<B>>(
    model:  &M,
    loader: &Arc<dyn DataLoader<DigitBatch<B>>>,
) -> Evaluation {
    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;
    let mut samples  = 0usize;

    for batch in loader.iter() {
        let n      = batch.targets.dims()[0];
        let logits = model.forward(batch.images);
        let loss: f64 = categorical_cross_entropy(logits.clone(), batch.one_hot)
            .into_scalar()
            .elem::<f64>();

        // Weight by batch size so a short last batch counts correctly
        loss_sum += loss * n as f64;
        correct  += correct_predictions(logits, batch.targets);
        samples  += n;
    }

    if samples == 0 {
        return Evaluation { loss: f64::NAN, accuracy: 0.0, samples };
    }

    Evaluation {
        loss:     loss_sum / samples as f64,
        accuracy: correct as f64 / samples as f64,
        samples,
    }
}
