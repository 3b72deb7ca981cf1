// ============================================================
// Layer 4 — MNIST Loaders
// ============================================================
// Two DigitSource implementations:
//
//   IdxLoader       — reads the four IDX files from a local
//                     directory (plain or .gz compressed)
//   BurnMnistLoader — delegates to burn's vision MnistDataset,
//                     which downloads the CVDF mirror once and
//                     caches it under ~/.cache/burn-dataset
//
// IDX layout (all integers big-endian u32):
//   images: magic 0x00000803 | count | rows | cols | pixels...
//   labels: magic 0x00000801 | count | labels...
//
// Reference: http://yann.lecun.com/exdb/mnist/ (file format)
//            Rust Book §9 (Error Handling)

use anyhow::{bail, ensure, Context, Result};
use burn::data::dataset::{vision::MnistDataset, Dataset};
use flate2::read::GzDecoder;
use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use crate::domain::digit::{DigitImage, DigitSample, Label, HEIGHT, WIDTH};
use crate::domain::split::Split;
use crate::domain::traits::DigitSource;

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;
const IMAGES_HEADER_LEN: usize = 16;
const LABELS_HEADER_LEN: usize = 8;

/// File names of one split, without the optional `.gz` suffix
fn file_names(split: Split) -> (&'static str, &'static str) {
    match split {
        Split::Train => ("train-images-idx3-ubyte", "train-labels-idx1-ubyte"),
        Split::Test  => ("t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte"),
    }
}

// ─── IdxLoader ────────────────────────────────────────────────────────────────
/// Loads MNIST from raw IDX files in a directory.
pub struct IdxLoader {
    dir: PathBuf,
}

impl IdxLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Read `name`, falling back to `name.gz`.
    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let plain = self.dir.join(name);
        if plain.exists() {
            return fs::read(&plain)
                .with_context(|| format!("Cannot read '{}'", plain.display()));
        }

        let gz = self.dir.join(format!("{name}.gz"));
        if gz.exists() {
            return read_gz(&gz);
        }

        bail!(
            "Neither '{}' nor '{}' exists",
            plain.display(),
            gz.display()
        )
    }
}

impl DigitSource for IdxLoader {
    fn load(&self, split: Split) -> Result<Vec<DigitSample>> {
        let (images_name, labels_name) = file_names(split);
        tracing::info!("Reading {} split from '{}'", split.name(), self.dir.display());

        let images = parse_idx_images(&self.read_file(images_name)?)
            .with_context(|| format!("Malformed image file '{images_name}'"))?;
        let labels = parse_idx_labels(&self.read_file(labels_name)?)
            .with_context(|| format!("Malformed label file '{labels_name}'"))?;

        ensure!(
            images.len() == labels.len(),
            "{} split has {} images but {} labels",
            split.name(),
            images.len(),
            labels.len()
        );
        if images.len() != split.expected_len() {
            tracing::warn!(
                "{} split has {} samples, the published dataset has {}",
                split.name(),
                images.len(),
                split.expected_len()
            );
        }

        Ok(images
            .into_iter()
            .zip(labels)
            .map(|(image, label)| DigitSample::new(image, label))
            .collect())
    }
}

fn read_gz(path: &Path) -> Result<Vec<u8>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;
    let mut bytes = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut bytes)
        .with_context(|| format!("Cannot decompress '{}'", path.display()))?;
    Ok(bytes)
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    let word: [u8; 4] = bytes
        .get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .with_context(|| format!("file truncated before byte {}", offset + 4))?;
    Ok(u32::from_be_bytes(word))
}

/// Parse an IDX3 image file into 28x28 images.
pub fn parse_idx_images(bytes: &[u8]) -> Result<Vec<DigitImage>> {
    let magic = read_u32(bytes, 0)?;
    ensure!(magic == IMAGES_MAGIC, "bad image magic number {magic:#010x}");

    let count = read_u32(bytes, 4)? as usize;
    let rows  = read_u32(bytes, 8)? as usize;
    let cols  = read_u32(bytes, 12)? as usize;
    ensure!(
        rows == HEIGHT && cols == WIDTH,
        "images are {rows}x{cols}, expected {HEIGHT}x{WIDTH}"
    );

    let payload = &bytes[IMAGES_HEADER_LEN..];
    ensure!(
        payload.len() >= count * rows * cols,
        "header announces {count} images but only {} bytes follow",
        payload.len()
    );

    payload
        .chunks_exact(rows * cols)
        .take(count)
        .map(|chunk| DigitImage::new(chunk.to_vec()))
        .collect()
}

/// Parse an IDX1 label file.
pub fn parse_idx_labels(bytes: &[u8]) -> Result<Vec<Label>> {
    let magic = read_u32(bytes, 0)?;
    ensure!(magic == LABELS_MAGIC, "bad label magic number {magic:#010x}");

    let count   = read_u32(bytes, 4)? as usize;
    let payload = &bytes[LABELS_HEADER_LEN..];
    ensure!(
        payload.len() >= count,
        "header announces {count} labels but only {} bytes follow",
        payload.len()
    );

    payload[..count].iter().map(|&b| Label::new(b)).collect()
}

// ─── BurnMnistLoader ──────────────────────────────────────────────────────────
/// Loads MNIST through burn's vision dataset (download + cache).
#[derive(Default)]
pub struct BurnMnistLoader;

impl DigitSource for BurnMnistLoader {
    fn load(&self, split: Split) -> Result<Vec<DigitSample>> {
        tracing::info!("Fetching {} split through burn's MNIST cache", split.name());

        let dataset = match split {
            Split::Train => MnistDataset::train(),
            Split::Test  => MnistDataset::test(),
        };

        dataset
            .iter()
            .map(|item| {
                // burn stores intensities as f32 in 0.0..=255.0
                let pixels = item
                    .image
                    .iter()
                    .flatten()
                    .map(|v| v.round().clamp(0.0, 255.0) as u8)
                    .collect();
                Ok(DigitSample::new(DigitImage::new(pixels)?, Label::new(item.label)?))
            })
            .collect()
    }
}

/// Pick the loader for an optional local directory.
pub fn source_for(data_dir: Option<&str>) -> Box<dyn DigitSource> {
    match data_dir {
        Some(dir) => Box::new(IdxLoader::new(dir)),
        None      => Box::new(BurnMnistLoader),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::digit::PIXELS;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;
    use temp_dir::TempDir;

    pub(crate) fn idx_images(images: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&IMAGES_MAGIC.to_be_bytes());
        bytes.extend_from_slice(&(images.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&(HEIGHT as u32).to_be_bytes());
        bytes.extend_from_slice(&(WIDTH as u32).to_be_bytes());
        for image in images {
            bytes.extend_from_slice(image);
        }
        bytes
    }

    pub(crate) fn idx_labels(labels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
        bytes.extend_from_slice(&(labels.len() as u32).to_be_bytes());
        bytes.extend_from_slice(labels);
        bytes
    }

    /// Write all four IDX files to `dir`. Digit `d` lights up row band `d`.
    pub(crate) fn write_synthetic_mnist(dir: &Path, train: usize, test: usize) {
        for (split, count) in [(Split::Train, train), (Split::Test, test)] {
            let labels: Vec<u8> = (0..count).map(|i| (i % 10) as u8).collect();
            let images: Vec<Vec<u8>> = labels
                .iter()
                .map(|&d| {
                    let band = HEIGHT / 10;
                    let mut px = vec![0u8; PIXELS];
                    for r in d as usize * band..(d as usize + 1) * band {
                        px[r * WIDTH..(r + 1) * WIDTH].fill(255);
                    }
                    px
                })
                .collect();

            let (images_name, labels_name) = file_names(split);
            fs::write(dir.join(images_name), idx_images(&images)).unwrap();
            fs::write(dir.join(labels_name), idx_labels(&labels)).unwrap();
        }
    }

    #[test]
    fn test_parse_images() {
        let images = vec![vec![7u8; PIXELS], vec![9u8; PIXELS]];
        let parsed = parse_idx_images(&idx_images(&images)).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].pixels()[PIXELS - 1], 9);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = idx_labels(&[1, 2]);
        bytes[3] = 0x03;
        assert!(parse_idx_labels(&bytes).is_err());
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let mut bytes = idx_images(&[vec![0u8; PIXELS]]);
        bytes.truncate(bytes.len() - 1);
        assert!(parse_idx_images(&bytes).is_err());
        assert!(parse_idx_images(&[0, 0, 8]).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_label() {
        assert!(parse_idx_labels(&idx_labels(&[3, 10])).is_err());
    }

    #[test]
    fn test_loads_plain_and_gz_files() {
        let dir = TempDir::new().unwrap();
        let (images_name, labels_name) = file_names(Split::Test);

        fs::write(
            dir.path().join(images_name),
            idx_images(&[vec![1u8; PIXELS], vec![2u8; PIXELS], vec![3u8; PIXELS]]),
        )
        .unwrap();

        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&idx_labels(&[4, 5, 6])).unwrap();
        fs::write(
            dir.path().join(format!("{labels_name}.gz")),
            gz.finish().unwrap(),
        )
        .unwrap();

        let samples = IdxLoader::new(dir.path()).load(Split::Test).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[2].label.value(), 6);
        assert_eq!(samples[2].image.pixels()[0], 3);
    }

    #[test]
    fn test_image_and_label_counts_must_match() {
        let dir = TempDir::new().unwrap();
        let (images_name, labels_name) = file_names(Split::Train);
        fs::write(dir.path().join(images_name), idx_images(&vec![vec![0u8; PIXELS]; 3])).unwrap();
        fs::write(dir.path().join(labels_name), idx_labels(&[1, 2])).unwrap();

        let err = IdxLoader::new(dir.path()).load(Split::Train).unwrap_err();
        assert!(err.to_string().contains("3 images but 2 labels"), "{err}");
    }

    #[test]
    fn test_missing_files_are_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(IdxLoader::new(dir.path()).load(Split::Train).is_err());
    }
}
