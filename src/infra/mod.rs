// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several other layers:
//
//   backend.rs    — Backend / device / precision selection
//                   Turns MNIST_BACKEND, MNIST_DEVICE and
//                   MNIST_FLOATX into a concrete burn backend
//                   and runs a generic task on it.
//
//   checkpoint.rs — Saving and loading the trained artifact
//                   Model and optimizer records per epoch plus
//                   the TrainConfig as JSON so inference can
//                   rebuild the exact architecture.
//
//   metrics.rs    — Training metrics logging
//                   Epoch-level loss and accuracy appended to
//                   metrics.csv.
//
//   image_io.rs   — Image decoding and PNG output
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Runtime backend, device and precision selection
pub mod backend;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Digit image decoding and grayscale PNG output
pub mod image_io;
