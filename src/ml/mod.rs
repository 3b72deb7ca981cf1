// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, trains or runs a network lives here.
//
//   model.rs      — The four digit classifier architectures
//                   (baseline MLP, simple CNN, large CNN,
//                   branching CNN) and their burn Configs
//
//   loss.rs       — Categorical cross-entropy against one-hot
//                   targets, and correct-prediction counting
//
//   trainer.rs    — The training loop
//                   Forward pass, loss, backward pass, Adam
//                   step, per-epoch validation, checkpoints
//
//   inferencer.rs — Rebuilds the trained network from the
//                   artifact and classifies images
//
//   visualizer.rs — Feature-map extraction and activation
//                   maximisation by gradient ascent
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            LeCun et al. (1998) Gradient-Based Learning Applied
//            to Document Recognition

/// Digit classifier architectures
pub mod model;

/// Loss function and accuracy counting
pub mod loss;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads checkpoint and predicts digits
pub mod inferencer;

/// Feature maps and activation maximisation
pub mod visualizer;
