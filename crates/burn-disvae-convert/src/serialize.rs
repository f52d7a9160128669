//! Encoder save/load in burn's record format
//!
//! Converting from safetensors on every run is unnecessary once an encoder
//! has been loaded: save it as a burn record and load it back directly.
//!
//! ```ignore
//! use burn_disvae_convert::serialize::{save_encoder, load_encoder_record, Precision};
//!
//! save_encoder(&encoder, "encoder", Precision::Full)?; // writes encoder.bin
//! let encoder = load_encoder_record::<B, _>(&config, "encoder", Precision::Full, &device)?;
//! ```

use std::path::PathBuf;

use burn::prelude::*;
pub use burn::record::{
    BinBytesRecorder, BinFileRecorder, FullPrecisionSettings, HalfPrecisionSettings, Recorder,
    RecorderError,
};

use burn_disvae_encoders::{Encoder, EncoderConfig, EncoderError};

/// Error type for serialization operations
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the Burn recorder
    #[error("Record error: {0}")]
    Record(#[from] RecorderError),

    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),
}

/// Float precision of saved records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// f32 weights
    #[default]
    Full,
    /// f16 weights, about half the file size
    Half,
}

/// Create a recorder for full precision (f32) binary files
pub fn full_precision_recorder() -> BinFileRecorder<FullPrecisionSettings> {
    BinFileRecorder::new()
}

/// Create a recorder for half precision (f16) binary files
pub fn half_precision_recorder() -> BinFileRecorder<HalfPrecisionSettings> {
    BinFileRecorder::new()
}

/// Creates a recorder for full precision binary bytes (in memory)
pub fn bytes_recorder() -> BinBytesRecorder<FullPrecisionSettings> {
    BinBytesRecorder::new()
}

macro_rules! with_module {
    ($encoder:expr, $module:ident => $body:expr) => {
        match $encoder {
            Encoder::Burgess($module) => $body,
            Encoder::FullyConnected1($module)
            | Encoder::FullyConnected2($module)
            | Encoder::FullyConnected3($module)
            | Encoder::FullyConnected4($module)
            | Encoder::FullyConnected5($module) => $body,
        }
    };
}

/// Saves encoder weights; the recorder appends the `.bin` extension
pub fn save_encoder<B: Backend, P: Into<PathBuf>>(
    encoder: &Encoder<B>,
    path: P,
    precision: Precision,
) -> Result<(), SerializeError> {
    let path = path.into();
    log::debug!("saving {} encoder to {}", encoder.kind(), path.display());

    with_module!(encoder.clone(), module => match precision {
        Precision::Full => module.save_file(path, &full_precision_recorder())?,
        Precision::Half => module.save_file(path, &half_precision_recorder())?,
    });

    Ok(())
}

/// Builds the encoder described by `config` and loads saved weights into it
pub fn load_encoder_record<B: Backend, P: Into<PathBuf>>(
    config: &EncoderConfig,
    path: P,
    precision: Precision,
    device: &B::Device,
) -> Result<Encoder<B>, SerializeError> {
    let path = path.into();
    let encoder = config.init::<B>(device)?;
    log::debug!("loading {} encoder from {}", config.model, path.display());

    let loaded = match encoder {
        Encoder::Burgess(m) => Encoder::Burgess(load_module(m, path, precision, device)?),
        Encoder::FullyConnected1(m) => {
            Encoder::FullyConnected1(load_module(m, path, precision, device)?)
        }
        Encoder::FullyConnected2(m) => {
            Encoder::FullyConnected2(load_module(m, path, precision, device)?)
        }
        Encoder::FullyConnected3(m) => {
            Encoder::FullyConnected3(load_module(m, path, precision, device)?)
        }
        Encoder::FullyConnected4(m) => {
            Encoder::FullyConnected4(load_module(m, path, precision, device)?)
        }
        Encoder::FullyConnected5(m) => {
            Encoder::FullyConnected5(load_module(m, path, precision, device)?)
        }
    };

    Ok(loaded)
}

fn load_module<B: Backend, M: Module<B>>(
    module: M,
    path: PathBuf,
    precision: Precision,
    device: &B::Device,
) -> Result<M, RecorderError> {
    match precision {
        Precision::Full => module.load_file(path, &full_precision_recorder(), device),
        Precision::Half => module.load_file(path, &half_precision_recorder(), device),
    }
}

/// Serializes encoder weights to bytes (full precision)
pub fn encoder_to_bytes<B: Backend>(encoder: &Encoder<B>) -> Result<Vec<u8>, SerializeError> {
    let recorder = bytes_recorder();
    let bytes = with_module!(encoder.clone(), module => recorder.record(module.into_record(), ())?);
    Ok(bytes)
}
