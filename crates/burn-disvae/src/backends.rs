//! Backend selection
//!
//! Enable the desired Burn backend via feature flags:
//!
//! - `ndarray`: CPU backend using ndarray (default)
//! - `tch`: PyTorch backend via libtorch (CUDA, MPS)
//! - `wgpu`: WebGPU backend (Vulkan, Metal, DX12)
//!
//! ```toml
//! [dependencies]
//! burn-disvae = { version = "0.1", default-features = false, features = ["wgpu"] }
//! ```

#[cfg(feature = "ndarray")]
pub use burn_ndarray::{NdArray, NdArrayDevice};

#[cfg(feature = "tch")]
pub use burn_tch::{LibTorch, LibTorchDevice};

#[cfg(feature = "wgpu")]
pub use burn_wgpu::{Wgpu, WgpuDevice};

/// Default backend when using the ndarray feature
#[cfg(feature = "ndarray")]
pub type DefaultBackend = NdArray<f32>;

/// Default backend when using the tch feature
#[cfg(all(feature = "tch", not(feature = "ndarray")))]
pub type DefaultBackend = LibTorch<f32>;

/// Default backend when using the wgpu feature
#[cfg(all(feature = "wgpu", not(any(feature = "ndarray", feature = "tch"))))]
pub type DefaultBackend = Wgpu;

/// Name of the backend behind [`DefaultBackend`]
#[cfg(feature = "ndarray")]
pub const DEFAULT_BACKEND_NAME: &str = "ndarray";

#[cfg(all(feature = "tch", not(feature = "ndarray")))]
pub const DEFAULT_BACKEND_NAME: &str = "tch";

#[cfg(all(feature = "wgpu", not(any(feature = "ndarray", feature = "tch"))))]
pub const DEFAULT_BACKEND_NAME: &str = "wgpu";

/// Get the default device for the enabled backend
#[cfg(feature = "ndarray")]
pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::default()
}

/// Get the default device for the enabled backend
#[cfg(all(feature = "tch", not(feature = "ndarray")))]
pub fn default_device() -> LibTorchDevice {
    // CUDA when available, otherwise CPU
    if burn_tch::is_cuda_available() {
        LibTorchDevice::Cuda(0)
    } else {
        LibTorchDevice::Cpu
    }
}

/// Get the default device for the enabled backend
#[cfg(all(feature = "wgpu", not(any(feature = "ndarray", feature = "tch"))))]
pub fn default_device() -> WgpuDevice {
    WgpuDevice::default()
}
