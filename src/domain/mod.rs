// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing what the system works on:
// digit images, class labels, labelled samples and the fixed
// train/test partition of the dataset.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A 28x28 grayscale image, a class label, and the pair of them
pub mod digit;

// The pre-partitioned train/test collections
pub mod split;

// Core abstractions (traits) that other layers implement
pub mod traits;
