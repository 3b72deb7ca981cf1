// ============================================================
// Layer 5 — Visualizer
// ============================================================
// Two ways of looking inside a trained convolutional network:
//
//   Feature maps:
//     run one image through the network and keep the output of
//     convolutional stage L, one plane per filter.
//
//   Activation maximisation:
//     start from a gray noise image and repeatedly step along the
//     gradient of "mean activation of filter F in stage L" with
//     respect to the input pixels:
//
//       g  = ∂ mean(act[F]) / ∂ x
//       x ← x + step · g / (rms(g) + 1e-5)
//
//     The result is the input pattern that filter F responds to
//     most strongly. `deprocess` turns it into a viewable image.
//
// Reference: Burn Book §2 (Autodiff)
//            Erhan et al. (2009) Visualizing Higher-Layer Features

use anyhow::{anyhow, ensure, Context, Result};
use burn::{
    prelude::*,
    tensor::{backend::AutodiffBackend, Distribution},
};

use crate::domain::digit::{HEIGHT, WIDTH};
use crate::ml::model::DigitClassifier;

const GRAD_EPSILON: f32 = 1e-5;

/// Settings for activation maximisation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AscentSettings {
    /// Index into the model's feature maps (0 = first conv stage)
    pub stage:      usize,
    pub filter:     usize,
    pub iterations: usize,
    pub step:       f32,
}

impl Default for AscentSettings {
    fn default() -> Self {
        Self { stage: 0, filter: 0, iterations: 50, step: 1.0 }
    }
}

/// Per-filter output planes of one convolutional stage
#[derive(Debug, Clone)]
pub struct FeatureMaps {
    /// One row-major `height × width` plane per filter
    pub planes: Vec<Vec<f32>>,
    pub height: usize,
    pub width:  usize,
}

fn select_stage<B: Backend>(maps: Vec<Tensor<B, 4>>, stage: usize) -> Result<Tensor<B, 4>> {
    ensure!(!maps.is_empty(), "This architecture has no convolutional stages to inspect");
    let stages = maps.len();
    maps.into_iter()
        .nth(stage)
        .with_context(|| format!("Stage {stage} does not exist (model has {stages} stages)"))
}

/// Feature maps of the first image in `images` at `stage`.
pub fn extract_feature_maps<B: Backend, M: DigitClassifier<B>>(
    model:  &M,
    images: Tensor<B, 4>,
    stage:  usize,
) -> Result<FeatureMaps> {
    let map = select_stage(model.feature_maps(images), stage)?;
    let [_, channels, height, width] = map.dims();

    let values = map
        .narrow(0, 0, 1)
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read feature maps: {e:?}"))?;

    let planes = values
        .chunks(height * width)
        .take(channels)
        .map(<[f32]>::to_vec)
        .collect();

    tracing::debug!("Stage {}: {} maps of {}x{}", stage, channels, height, width);
    Ok(FeatureMaps { planes, height, width })
}

/// Mean activation of one filter, for a single input image
fn filter_activation<B: Backend, M: DigitClassifier<B>>(
    model:  &M,
    input:  Tensor<B, 4>,
    stage:  usize,
    filter: usize,
) -> Result<Tensor<B, 1>> {
    let map = select_stage(model.feature_maps(input), stage)?;
    let channels = map.dims()[1];
    ensure!(
        filter < channels,
        "Filter {filter} does not exist (stage {stage} has {channels} filters)"
    );
    Ok(map.narrow(1, filter, 1).mean())
}

/// Gray noise around mid intensity, shaped [1, 1, 28, 28]
pub fn gray_noise<B: Backend>(device: &B::Device) -> Tensor<B, 4> {
    Tensor::random([1, 1, HEIGHT, WIDTH], Distribution::Uniform(0.0, 20.0 / 255.0), device)
        .add_scalar(128.0 / 255.0)
}

/// Gradient ascent on the input to maximise one filter's mean activation.
///
/// Returns the raw (not de-processed) 28×28 input, row-major.
pub fn maximize_activation<B: AutodiffBackend, M: DigitClassifier<B>>(
    model:    &M,
    settings: AscentSettings,
    start:    Tensor<B::InnerBackend, 4>,
) -> Result<Vec<f32>> {
    let mut input = start;

    for iteration in 0..settings.iterations {
        let x = Tensor::<B, 4>::from_inner(input.clone()).require_grad();
        let activation = filter_activation(model, x.clone(), settings.stage, settings.filter)?;

        let grads = activation.backward();
        let grad  = x
            .grad(&grads)
            .context("Input image received no gradient")?;

        let rms: f32 = grad
            .clone()
            .powf_scalar(2.0)
            .mean()
            .sqrt()
            .into_scalar()
            .elem::<f32>();

        input = input + grad.div_scalar(rms + GRAD_EPSILON).mul_scalar(settings.step);

        if iteration % 10 == 0 {
            tracing::debug!("Ascent iteration {}: gradient rms {:.6}", iteration, rms);
        }
    }

    input
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read generated image: {e:?}"))
}

/// Standardise, scale by 0.1, centre on 0.5, clip to [0, 1], map to 0..=255.
pub fn deprocess(values: &[f32]) -> Vec<u8> {
    if values.is_empty() {
        return Vec::new();
    }
    let n    = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let std  = (values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n).sqrt();

    values
        .iter()
        .map(|v| {
            let x = (v - mean) / (std + GRAD_EPSILON) * 0.1 + 0.5;
            (x.clamp(0.0, 1.0) * 255.0).round() as u8
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use crate::ml::model::{BaselineConfig, LargeCnnConfig, SimpleCnnConfig};
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn mean_activation<M: DigitClassifier<TestBackend>>(model: &M, pixels: &[f32], filter: usize) -> f32 {
        let input = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(pixels.to_vec(), [1, 1, HEIGHT, WIDTH]),
            &Default::default(),
        );
        filter_activation(model, input, 0, filter).unwrap().into_scalar()
    }

    #[test]
    #[serial]
    fn test_ascent_does_not_lower_activation() {
        let device = Default::default();
        let model  = SimpleCnnConfig::new().with_filters(3).with_hidden(8)
            .init::<TestBackend>(&device);

        let start  = gray_noise::<NdArray>(&device);
        let before = start.clone().into_data().to_vec::<f32>().unwrap();
        let settings = AscentSettings { filter: 1, iterations: 5, ..Default::default() };
        let after  = maximize_activation::<TestBackend, _>(&model, settings, start).unwrap();

        assert_eq!(after.len(), HEIGHT * WIDTH);
        let a0 = mean_activation(&model, &before, 1);
        let a1 = mean_activation(&model, &after, 1);
        assert!(a1 >= a0 - 1e-4, "activation fell from {a0} to {a1}");
    }

    #[test]
    #[serial]
    fn test_gray_noise_is_near_mid_gray() {
        let noise = gray_noise::<NdArray>(&Default::default())
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(noise.len(), HEIGHT * WIDTH);
        assert!(noise.iter().all(|v| (0.5..=0.59).contains(v)));
    }

    #[test]
    #[serial]
    fn test_invalid_stage_or_filter_is_an_error() {
        let device = Default::default();
        let cnn    = SimpleCnnConfig::new().with_filters(2).with_hidden(4)
            .init::<TestBackend>(&device);
        let start  = || gray_noise::<NdArray>(&device);

        let bad_stage  = AscentSettings { stage: 1, iterations: 1, ..Default::default() };
        let bad_filter = AscentSettings { filter: 2, iterations: 1, ..Default::default() };
        assert!(maximize_activation::<TestBackend, _>(&cnn, bad_stage, start()).is_err());
        assert!(maximize_activation::<TestBackend, _>(&cnn, bad_filter, start()).is_err());

        let baseline = BaselineConfig::new().with_hidden(4).init::<TestBackend>(&device);
        let settings = AscentSettings { iterations: 1, ..Default::default() };
        assert!(maximize_activation::<TestBackend, _>(&baseline, settings, start()).is_err());
    }

    #[test]
    #[serial]
    fn test_extract_feature_maps_per_stage() {
        let device = Default::default();
        let model  = LargeCnnConfig::new()
            .with_filters_1(3)
            .with_filters_2(2)
            .with_hidden_1(8)
            .with_hidden_2(4)
            .init::<NdArray>(&device);
        let images = Tensor::<NdArray, 4>::ones([2, 1, HEIGHT, WIDTH], &device);

        let first = extract_feature_maps(&model, images.clone(), 0).unwrap();
        assert_eq!(first.planes.len(), 3);
        assert_eq!((first.height, first.width), (24, 24));
        assert!(first.planes.iter().all(|p| p.len() == 24 * 24));

        let second = extract_feature_maps(&model, images.clone(), 1).unwrap();
        assert_eq!(second.planes.len(), 2);
        assert_eq!((second.height, second.width), (10, 10));

        assert!(extract_feature_maps(&model, images, 2).is_err());
    }

    #[test]
    #[serial]
    fn test_deprocess_range_and_centre() {
        let values: Vec<f32> = (0..100).map(|i| i as f32 * 3.0 - 50.0).collect();
        let pixels = deprocess(&values);
        assert_eq!(pixels.len(), 100);

        // Standardised values × 0.1 stay well inside [0, 1]
        assert!(pixels.iter().all(|&p| p > 60 && p < 195));

        assert_eq!(deprocess(&[0.7; 4]), vec![128; 4]);
        assert!(deprocess(&[]).is_empty());
    }
}
