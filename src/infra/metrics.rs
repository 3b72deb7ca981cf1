// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: mean categorical cross-entropy over training batches
//   - train_acc:  fraction of training images classified correctly
//   - val_loss:   mean cross-entropy on the validation data
//   - val_acc:    fraction of validation images classified correctly
//
// Output file: artifacts/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,train_acc,val_loss,val_acc
//   1,0.278400,0.920100,0.141200,0.957300
//   2,0.111700,0.967800,0.092400,0.971600
//   ...
//
// A resumed run appends to the existing file.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean cross-entropy over all training batches.
    /// An untrained 10-class model sits near ln(10) ≈ 2.30
    pub train_loss: f64,

    /// Range: [0.0, 1.0]
    pub train_acc: f64,

    pub val_loss: f64,

    /// Range: [0.0, 1.0]. The reported error is 1 - val_acc
    pub val_acc: f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:      usize,
        train_loss: f64,
        train_acc:  f64,
        val_loss:   f64,
        val_acc:    f64,
    ) -> Self {
        Self { epoch, train_loss, train_acc, val_loss, val_acc }
    }

    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }

    /// Validation error as a percentage, e.g. 1.23
    pub fn val_error_percent(&self) -> f64 {
        (1.0 - self.val_acc) * 100.0
    }
}

/// Appends epoch metrics to `metrics.csv`.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,train_loss,train_acc,val_loss,val_acc")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Start a new log, discarding rows from an earlier run.
    pub fn fresh(dir: impl AsRef<Path>) -> Result<Self> {
        let csv_path = dir.as_ref().join("metrics.csv");
        if csv_path.exists() {
            fs::remove_file(&csv_path)
                .with_context(|| format!("Cannot remove stale '{}'", csv_path.display()))?;
        }
        Self::new(dir)
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.train_acc,
            m.val_loss,
            m.val_acc,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use temp_dir::TempDir;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 0.25, 0.93, 0.20, 0.95);
        assert!(m.is_improvement(0.30));
        assert!(!m.is_improvement(0.10));
    }

    #[test]
    fn test_val_error_percent() {
        let m = EpochMetrics::new(1, 0.3, 0.9, 0.1, 0.9875);
        assert!((m.val_error_percent() - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_rows_are_appended_after_header() {
        let dir    = TempDir::new().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 0.5, 0.8, 0.4, 0.85)).unwrap();

        // A second logger on the same directory keeps the existing rows
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(2, 0.3, 0.9, 0.2, 0.93)).unwrap();

        let csv   = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,train_loss,train_acc,val_loss,val_acc");
        assert!(lines[1].starts_with("1,0.500000,0.800000"));
        assert!(lines[2].starts_with("2,"));
    }

    #[test]
    fn test_fresh_discards_previous_rows() {
        let dir = TempDir::new().unwrap();
        MetricsLogger::new(dir.path()).unwrap()
            .log(&EpochMetrics::new(1, 0.5, 0.8, 0.4, 0.85)).unwrap();

        let logger = MetricsLogger::fresh(dir.path()).unwrap();
        let csv    = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
