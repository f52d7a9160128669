//! Encoders for Disentangled Variational Autoencoders
//!
//! This crate provides interchangeable encoder networks that map an image
//! batch to the parameters of a diagonal Gaussian over the latent space.
//!
//! # Components
//!
//! - [`EncoderBurgess`] - Convolutional encoder (32x32 and 64x64 images)
//! - [`FullyConnectedEncoder`] - MLP encoders (`Fullyconnected1` to `Fullyconnected5`)
//! - [`Encoder`] - Any of the above, selected by [`EncoderKind`]
//! - [`LatentParams`] - Mean and log variance, with reparameterized sampling
//!
//! # Example
//!
//! ```ignore
//! use burn_disvae_encoders::{get_encoder, ImageSize};
//!
//! let kind = get_encoder("burgess")?;
//! let encoder = kind.config(ImageSize::new(3, 64, 64)).init::<Backend>(&device)?;
//!
//! let latent = encoder.forward(images);
//! let z = latent.sample();
//! ```

pub mod burgess;
pub mod config;
pub mod error;
pub mod factory;
pub mod fully_connected;
pub mod latent;

pub use burgess::{BurgessLayers, EncoderBurgess};
pub use config::{EncoderConfig, ImageSize};
pub use error::EncoderError;
pub use factory::{Encoder, EncoderKind, LatentEncoder, get_encoder};
pub use fully_connected::{FullyConnectedEncoder, MlpLayout};
pub use latent::LatentParams;
