// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From IDX bytes on disk to tensor batches:
//
//   IDX files / burn cache
//       │
//       ▼
//   IdxLoader / BurnMnistLoader → DigitSamples (u8 pixels + label)
//       │
//       ▼
//   split_train_val   → optional held-out validation set
//       │
//       ▼
//   DigitDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   DigitBatcher      → Preprocessor + stacking into tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Loads MNIST from IDX files or burn's download cache
pub mod loader;

/// Scales pixels into [0, 1] and one-hot encodes labels
pub mod preprocessor;

/// Implements Burn's Dataset trait for digit samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
