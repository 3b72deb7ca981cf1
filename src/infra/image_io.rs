// ============================================================
// Layer 6 — Image I/O
// ============================================================
// Decodes user images for `predict` / `feature-maps` and writes
// visualizations as grayscale PNG files.
//
// Input images of any size or colour type are converted to
// 8-bit luma and resized to 28×28 with a triangle filter.

use anyhow::{ensure, Context, Result};
use std::{fs, path::Path};
use image::{imageops::FilterType, GrayImage};

use crate::domain::digit::{DigitImage, HEIGHT, WIDTH};

/// Gap in pixels between tiles of a feature-map grid
const TILE_GAP: usize = 1;

/// Decode an image file into a 28×28 digit.
pub fn load_digit_image(path: impl AsRef<Path>) -> Result<DigitImage> {
    let path = path.as_ref();
    let img  = image::open(path)
        .with_context(|| format!("Cannot decode image '{}'", path.display()))?;

    let gray = img.to_luma8();
    let gray = if gray.dimensions() == (WIDTH as u32, HEIGHT as u32) {
        gray
    } else {
        tracing::debug!(
            "Resizing '{}' from {}x{} to {}x{}",
            path.display(), gray.width(), gray.height(), WIDTH, HEIGHT,
        );
        image::imageops::resize(&gray, WIDTH as u32, HEIGHT as u32, FilterType::Triangle)
    };

    DigitImage::new(gray.into_raw())
}

/// Write row-major 8-bit pixels as a grayscale PNG.
pub fn save_grayscale(path: impl AsRef<Path>, pixels: &[u8], width: usize, height: usize) -> Result<()> {
    let path = path.as_ref();
    ensure!(
        pixels.len() == width * height,
        "Expected {}x{} = {} pixels, got {}",
        width, height, width * height, pixels.len()
    );

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }

    let img = GrayImage::from_raw(width as u32, height as u32, pixels.to_vec())
        .context("Pixel buffer does not match image dimensions")?;
    img.save(path)
        .with_context(|| format!("Cannot write image '{}'", path.display()))?;

    tracing::info!("Saved {}x{} image to '{}'", width, height, path.display());
    Ok(())
}

/// Scale values linearly so the minimum maps to 0 and the maximum to 255.
/// A constant map becomes all zeros.
pub fn min_max_to_u8(values: &[f32]) -> Vec<u8> {
    let min   = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max   = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = if max - min > 0.0 { max - min } else { 1.0 };

    values
        .iter()
        .map(|v| (((v - min) / range) * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect()
}

/// A grid of feature maps packed into one grayscale canvas
#[derive(Debug, Clone)]
pub struct TiledImage {
    pub pixels: Vec<u8>,
    pub width:  usize,
    pub height: usize,
}

/// Arrange `maps` (each `map_h × map_w`, row-major) on a near-square grid.
///
/// Every map is normalised on its own so weak channels stay visible.
pub fn tile_feature_maps(maps: &[Vec<f32>], map_h: usize, map_w: usize) -> Result<TiledImage> {
    ensure!(!maps.is_empty(), "No feature maps to tile");
    for (i, m) in maps.iter().enumerate() {
        ensure!(
            m.len() == map_h * map_w,
            "Feature map {} has {} values, expected {}x{}",
            i, m.len(), map_h, map_w
        );
    }

    let cols   = (maps.len() as f64).sqrt().ceil() as usize;
    let rows   = maps.len().div_ceil(cols);
    let width  = cols * map_w + (cols - 1) * TILE_GAP;
    let height = rows * map_h + (rows - 1) * TILE_GAP;
    let mut pixels = vec![0u8; width * height];

    for (i, map) in maps.iter().enumerate() {
        let scaled = min_max_to_u8(map);
        let top    = (i / cols) * (map_h + TILE_GAP);
        let left   = (i % cols) * (map_w + TILE_GAP);

        for r in 0..map_h {
            let dst = (top + r) * width + left;
            pixels[dst..dst + map_w].copy_from_slice(&scaled[r * map_w..(r + 1) * map_w]);
        }
    }

    Ok(TiledImage { pixels, width, height })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use temp_dir::TempDir;

    #[test]
    fn test_min_max_spans_full_range() {
        assert_eq!(min_max_to_u8(&[-1.0, 0.0, 1.0]), vec![0, 128, 255]);
        assert_eq!(min_max_to_u8(&[0.3, 0.3]), vec![0, 0]);
    }

    #[test]
    fn test_tile_layout() {
        let maps  = vec![vec![1.0; 4]; 5];
        let tiled = tile_feature_maps(&maps, 2, 2).unwrap();
        // 5 maps → 3 columns, 2 rows, with 1px gaps
        assert_eq!(tiled.width,  3 * 2 + 2);
        assert_eq!(tiled.height, 2 * 2 + 1);
        assert_eq!(tiled.pixels.len(), tiled.width * tiled.height);
    }

    #[test]
    fn test_tile_rejects_wrong_map_size() {
        assert!(tile_feature_maps(&[vec![0.0; 3]], 2, 2).is_err());
        assert!(tile_feature_maps(&[], 2, 2).is_err());
    }

    #[test]
    fn test_saved_png_loads_as_digit() {
        let dir    = TempDir::new().unwrap();
        let path   = dir.path().join("digit.png");
        let pixels: Vec<u8> = (0..WIDTH * HEIGHT).map(|i| (i % 256) as u8).collect();

        save_grayscale(&path, &pixels, WIDTH, HEIGHT).unwrap();
        let digit = load_digit_image(&path).unwrap();
        assert_eq!(digit.pixels(), pixels.as_slice());
    }

    #[test]
    fn test_large_image_is_resized() {
        let dir  = TempDir::new().unwrap();
        let path = dir.path().join("big.png");
        save_grayscale(&path, &vec![200u8; 56 * 56], 56, 56).unwrap();

        let digit = load_digit_image(&path).unwrap();
        assert_eq!(digit.pixels().len(), WIDTH * HEIGHT);
        assert!(digit.pixels().iter().all(|&p| p == 200));
    }

    #[test]
    fn test_missing_image_is_an_error() {
        assert!(load_digit_image("/nonexistent/digit.png").is_err());
    }
}
