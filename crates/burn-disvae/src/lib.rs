//! burn-disvae: Disentangled VAE Encoders in Pure Rust
//!
//! Encoder networks for variational autoencoders, built on the Burn deep
//! learning framework. Each encoder maps an image batch to the mean and
//! log variance of a diagonal Gaussian over the latent space.
//!
//! # Encoders
//!
//! - `Burgess`: convolutional, for 32x32 and 64x64 images
//! - `Fullyconnected1` to `Fullyconnected5`: MLPs for any image size
//!
//! # Backend Selection
//!
//! Choose a backend via feature flags:
//! - `ndarray`: CPU backend (default)
//! - `tch`: PyTorch backend via libtorch (CUDA, MPS support)
//! - `wgpu`: WebGPU backend (cross-platform GPU)
//!
//! # Example
//!
//! ```ignore
//! use burn_disvae::backends::{DefaultBackend, default_device};
//! use burn_disvae::{get_encoder, ImageSize};
//!
//! let device = default_device();
//! let encoder = get_encoder("burgess")?
//!     .config(ImageSize::new(1, 64, 64))
//!     .init::<DefaultBackend>(&device)?;
//!
//! let latent = encoder.forward(images);
//! let z = latent.sample();
//! ```
//!
//! Pretrained weights exported from PyTorch load through [`convert`]:
//!
//! ```ignore
//! let encoder = burn_disvae::convert::load_encoder_file::<DefaultBackend, _>(
//!     "encoder.safetensors",
//!     &config,
//!     &device,
//! )?;
//! ```

pub mod backends;

pub use burn_disvae_convert as convert;
pub use burn_disvae_encoders as encoders;

pub use burn_disvae_encoders::{
    Encoder, EncoderConfig, EncoderError, EncoderKind, ImageSize, LatentEncoder, LatentParams,
    get_encoder,
};
