//! Weight Loading and Serialization
//!
//! This crate loads encoder weights exported from PyTorch as safetensors
//! and saves/loads them in burn's own record format.
//!
//! # Weight Loading
//!
//! ```ignore
//! use burn_disvae_convert::{SafeTensorFile, load_encoder};
//!
//! let file = SafeTensorFile::open("encoder.safetensors")?;
//! let encoder = load_encoder::<B>(&file, &config, &device)?;
//! ```
//!
//! # Serialization
//!
//! ```ignore
//! use burn_disvae_convert::{save_encoder, load_encoder_record, Precision};
//!
//! save_encoder(&encoder, "encoder", Precision::Half)?;
//! let encoder = load_encoder_record::<B, _>(&config, "encoder", Precision::Half, &device)?;
//! ```

pub mod encoder_loader;
pub mod loader;
pub mod serialize;

pub use encoder_loader::{
    EncoderLoadError, detect_prefix, infer_latent_dim, load_encoder, load_encoder_file,
};
pub use loader::{LoadError, SafeTensorFile};
pub use serialize::{
    Precision, SerializeError, bytes_recorder, encoder_to_bytes, full_precision_recorder,
    half_precision_recorder, load_encoder_record, save_encoder,
};
