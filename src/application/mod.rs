// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one command (train, evaluate, predict, visualize).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing of results (that's Layer 1)
//   - Only workflow coordination
//
// Every use case is a BackendTask, so the CLI can run it on
// whichever backend MNIST_BACKEND selects.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// Test-split evaluation of a stored artifact
pub mod evaluate_use_case;

// Single-image classification
pub mod predict_use_case;

// Activation maximisation and feature-map images
pub mod visualize_use_case;
