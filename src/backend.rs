//! Backend selection.
//!
//! The default backend is NdArray so every entry point runs on plain CPU
//! hardware. Enabling the `wgpu` feature switches training and inference
//! to the GPU backend.

use burn::backend::Autodiff;

#[cfg(feature = "wgpu")]
pub type DefaultBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type DefaultBackend = burn::backend::NdArray;

/// The autodiff backend used for training.
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Get the default device for the selected backend.
pub fn default_device() -> <DefaultBackend as burn::tensor::backend::Backend>::Device {
    Default::default()
}

/// Human-readable name for the current backend.
pub fn backend_name() -> &'static str {
    #[cfg(feature = "wgpu")]
    {
        "wgpu (GPU)"
    }
    #[cfg(not(feature = "wgpu"))]
    {
        "ndarray (CPU)"
    }
}
