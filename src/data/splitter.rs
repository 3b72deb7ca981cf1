// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles samples with a seeded RNG and splits them into:
//   - Training set:   used to update model weights
//   - Validation set: reported after every epoch
//
// Used when --validation-split holds out part of the MNIST
// training split instead of validating on the test split.
// The seed makes the partition reproducible across runs.
//
// Reference: rand crate documentation (SliceRandom, SeedableRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
///
/// `train_fraction` is the proportion kept for training, e.g. 0.9.
pub fn split_train_val<T>(
    mut samples:    Vec<T>,
    train_fraction: f64,
    seed:           u64,
) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;
    let split_at = split_at.min(total);

    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}
