// ============================================================
// Layer 6 — Backend Selection
// ============================================================
// Picks the burn backend, device and float precision at run
// time from MNIST_BACKEND / MNIST_DEVICE / MNIST_FLOATX (or the
// matching global flags).
//
// Supported combinations:
//   ndarray + cpu/default + float32  → Autodiff<NdArray>
//   wgpu    + any device  + float32  → Autodiff<Wgpu>
//   wgpu    + any device  + float16  → Autodiff<Wgpu<f16>>
//
// Every use case is written once, generic over the backend, as a
// BackendTask. `dispatch` monomorphises it for the selected
// combination.
//
// Reference: Burn Book §2 (Backends)

use anyhow::{bail, Context, Result};
use std::{fmt, str::FromStr};
use burn::{
    backend::{
        ndarray::NdArrayDevice,
        wgpu::WgpuDevice,
        Autodiff, NdArray, Wgpu,
    },
    tensor::{backend::AutodiffBackend, f16},
};
use serde::{Deserialize, Serialize};

/// Tensor engine to run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComputeBackend {
    /// Pure-Rust CPU backend
    #[default]
    Ndarray,
    /// GPU through wgpu (Vulkan, Metal, DX12 or WebGPU)
    Wgpu,
}

/// Float element type used for weights and activations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Precision {
    #[default]
    Float32,
    Float16,
}

/// Parsed form of MNIST_DEVICE: `cpu`, `gpu`, `gpu:N` or `default`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceSpec {
    #[default]
    Default,
    Cpu,
    Gpu(usize),
}

impl FromStr for DeviceSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "" | "default" => Ok(Self::Default),
            "cpu"          => Ok(Self::Cpu),
            "gpu"          => Ok(Self::Gpu(0)),
            other => match other.strip_prefix("gpu:") {
                Some(index) => {
                    let index = index
                        .parse::<usize>()
                        .with_context(|| format!("Invalid GPU index in device '{other}'"))?;
                    Ok(Self::Gpu(index))
                }
                None => bail!("Unknown device '{other}' (expected cpu, gpu, gpu:N or default)"),
            },
        }
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default  => write!(f, "default"),
            Self::Cpu      => write!(f, "cpu"),
            Self::Gpu(idx) => write!(f, "gpu:{idx}"),
        }
    }
}

/// The resolved backend/device/precision triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendSelection {
    pub backend:   ComputeBackend,
    pub device:    DeviceSpec,
    pub precision: Precision,
}

impl BackendSelection {
    /// Reject combinations no backend can honour.
    pub fn validate(&self) -> Result<()> {
        if self.backend == ComputeBackend::Ndarray {
            if self.precision == Precision::Float16 {
                bail!("The ndarray backend only supports float32; use --backend wgpu for float16");
            }
            if let DeviceSpec::Gpu(_) = self.device {
                bail!("The ndarray backend runs on the CPU; use --backend wgpu for '{}'", self.device);
            }
        }
        Ok(())
    }

    fn wgpu_device(&self) -> WgpuDevice {
        match self.device {
            DeviceSpec::Default  => WgpuDevice::default(),
            DeviceSpec::Cpu      => WgpuDevice::Cpu,
            DeviceSpec::Gpu(idx) => WgpuDevice::DiscreteGpu(idx),
        }
    }
}

/// A unit of work that can run on any autodiff backend.
pub trait BackendTask {
    type Output;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<Self::Output>;
}

/// Run `task` on the backend described by `selection`.
pub fn dispatch<T: BackendTask>(selection: BackendSelection, task: T) -> Result<T::Output> {
    selection.validate()?;
    tracing::info!(
        "Backend: {:?}, device: {}, precision: {:?}",
        selection.backend,
        selection.device,
        selection.precision,
    );

    match (selection.backend, selection.precision) {
        (ComputeBackend::Ndarray, Precision::Float32) => {
            task.run::<Autodiff<NdArray>>(NdArrayDevice::Cpu)
        }
        (ComputeBackend::Wgpu, Precision::Float32) => {
            task.run::<Autodiff<Wgpu>>(selection.wgpu_device())
        }
        (ComputeBackend::Wgpu, Precision::Float16) => {
            task.run::<Autodiff<Wgpu<f16>>>(selection.wgpu_device())
        }
        (ComputeBackend::Ndarray, Precision::Float16) => {
            bail!("The ndarray backend only supports float32")
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_specs() {
        assert_eq!("default".parse::<DeviceSpec>().unwrap(), DeviceSpec::Default);
        assert_eq!("CPU".parse::<DeviceSpec>().unwrap(),     DeviceSpec::Cpu);
        assert_eq!("gpu".parse::<DeviceSpec>().unwrap(),     DeviceSpec::Gpu(0));
        assert_eq!("gpu:2".parse::<DeviceSpec>().unwrap(),   DeviceSpec::Gpu(2));
        assert!("gpu:x".parse::<DeviceSpec>().is_err());
        assert!("tpu".parse::<DeviceSpec>().is_err());
    }

    #[test]
    fn test_device_display_parses_back() {
        for spec in [DeviceSpec::Default, DeviceSpec::Cpu, DeviceSpec::Gpu(3)] {
            assert_eq!(spec.to_string().parse::<DeviceSpec>().unwrap(), spec);
        }
    }

    #[test]
    fn test_ndarray_rejects_float16_and_gpu() {
        let half = BackendSelection { precision: Precision::Float16, ..Default::default() };
        assert!(half.validate().is_err());

        let gpu = BackendSelection { device: DeviceSpec::Gpu(0), ..Default::default() };
        assert!(gpu.validate().is_err());

        assert!(BackendSelection::default().validate().is_ok());
    }

    struct Echo;

    impl BackendTask for Echo {
        type Output = usize;

        fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<usize> {
            let t = burn::tensor::Tensor::<B, 1>::ones([3], &device);
            Ok(t.dims()[0])
        }
    }

    #[test]
    fn test_dispatch_runs_on_ndarray() {
        assert_eq!(dispatch(BackendSelection::default(), Echo).unwrap(), 3);
    }
}
