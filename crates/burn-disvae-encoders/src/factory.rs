//! Encoder lookup by name
//!
//! Models are selected with a string such as `"burgess"` or
//! `"fullyconnected3"`. Lookup ignores case and surrounding whitespace.
//!
//! ```ignore
//! use burn_disvae_encoders::{get_encoder, ImageSize};
//!
//! let kind = get_encoder("Burgess")?;
//! let encoder = kind.config(ImageSize::new(1, 64, 64)).init::<B>(&device)?;
//! let latent = encoder.forward(images);
//! ```

use std::fmt;
use std::str::FromStr;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::burgess::EncoderBurgess;
use crate::config::{EncoderConfig, ImageSize};
use crate::error::EncoderError;
use crate::fully_connected::{FullyConnectedEncoder, MlpLayout};
use crate::latent::LatentParams;

/// Available encoder architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EncoderKind {
    Burgess,
    FullyConnected1,
    FullyConnected2,
    FullyConnected3,
    FullyConnected4,
    FullyConnected5,
}

impl EncoderKind {
    pub const ALL: [EncoderKind; 6] = [
        EncoderKind::Burgess,
        EncoderKind::FullyConnected1,
        EncoderKind::FullyConnected2,
        EncoderKind::FullyConnected3,
        EncoderKind::FullyConnected4,
        EncoderKind::FullyConnected5,
    ];

    /// Canonical name (first letter upper case, rest lower case)
    pub fn name(&self) -> &'static str {
        match self {
            EncoderKind::Burgess => "Burgess",
            EncoderKind::FullyConnected1 => "Fullyconnected1",
            EncoderKind::FullyConnected2 => "Fullyconnected2",
            EncoderKind::FullyConnected3 => "Fullyconnected3",
            EncoderKind::FullyConnected4 => "Fullyconnected4",
            EncoderKind::FullyConnected5 => "Fullyconnected5",
        }
    }

    pub fn default_latent_dim(&self) -> usize {
        match self {
            EncoderKind::Burgess => 10,
            _ => 128,
        }
    }

    /// MLP layout, `None` for the convolutional encoder
    pub fn mlp_layout(&self) -> Option<MlpLayout> {
        match self {
            EncoderKind::Burgess => None,
            EncoderKind::FullyConnected1 => Some(MlpLayout::FC1),
            EncoderKind::FullyConnected2 => Some(MlpLayout::FC2),
            EncoderKind::FullyConnected3 => Some(MlpLayout::FC3),
            EncoderKind::FullyConnected4 => Some(MlpLayout::FC4),
            EncoderKind::FullyConnected5 => Some(MlpLayout::FC5),
        }
    }

    /// Default config for images of the given size
    pub fn config(&self, img_size: ImageSize) -> EncoderConfig {
        EncoderConfig::new(*self, img_size)
    }

    fn known_names() -> String {
        Self::ALL
            .iter()
            .map(|k| k.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncoderKind {
    type Err = EncoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.name().to_lowercase() == wanted)
            .ok_or_else(|| EncoderError::UnknownEncoder {
                name: s.to_string(),
                known: Self::known_names(),
            })
    }
}

impl TryFrom<String> for EncoderKind {
    type Error = EncoderError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EncoderKind> for String {
    fn from(kind: EncoderKind) -> Self {
        kind.name().to_string()
    }
}

/// Resolves a model-type string to an encoder architecture
pub fn get_encoder(model_type: &str) -> Result<EncoderKind, EncoderError> {
    model_type.parse()
}

/// Common interface of all encoders
pub trait LatentEncoder<B: Backend> {
    /// Encode `[batch, C, H, W]` images to latent parameters
    fn encode(&self, x: Tensor<B, 4>) -> LatentParams<B>;

    fn latent_dim(&self) -> usize;

    fn img_size(&self) -> ImageSize;

    /// Like [`encode`](Self::encode) but checks the input shape first
    fn try_encode(&self, x: Tensor<B, 4>) -> Result<LatentParams<B>, EncoderError> {
        let dims = x.dims();
        let expected = self.img_size();
        if dims[1..] != [expected.channels, expected.height, expected.width] {
            return Err(EncoderError::InputShape {
                expected,
                actual: dims,
            });
        }
        Ok(self.encode(x))
    }
}

impl<B: Backend> LatentEncoder<B> for EncoderBurgess<B> {
    fn encode(&self, x: Tensor<B, 4>) -> LatentParams<B> {
        self.forward(x)
    }

    fn latent_dim(&self) -> usize {
        EncoderBurgess::latent_dim(self)
    }

    fn img_size(&self) -> ImageSize {
        EncoderBurgess::img_size(self)
    }
}

impl<B: Backend> LatentEncoder<B> for FullyConnectedEncoder<B> {
    fn encode(&self, x: Tensor<B, 4>) -> LatentParams<B> {
        self.forward(x)
    }

    fn latent_dim(&self) -> usize {
        FullyConnectedEncoder::latent_dim(self)
    }

    fn img_size(&self) -> ImageSize {
        FullyConnectedEncoder::img_size(self)
    }
}

/// Any of the available encoders
#[derive(Debug, Clone)]
pub enum Encoder<B: Backend> {
    Burgess(EncoderBurgess<B>),
    FullyConnected1(FullyConnectedEncoder<B>),
    FullyConnected2(FullyConnectedEncoder<B>),
    FullyConnected3(FullyConnectedEncoder<B>),
    FullyConnected4(FullyConnectedEncoder<B>),
    FullyConnected5(FullyConnectedEncoder<B>),
}

impl<B: Backend> Encoder<B> {
    /// Builds a randomly initialized encoder without validating the config
    ///
    /// Prefer [`EncoderConfig::init`], which validates first.
    pub fn new(config: &EncoderConfig, device: &B::Device) -> Self {
        let mlp = |layout| FullyConnectedEncoder::new(layout, config, device);
        match config.model {
            EncoderKind::Burgess => Encoder::Burgess(EncoderBurgess::new(config, device)),
            EncoderKind::FullyConnected1 => Encoder::FullyConnected1(mlp(MlpLayout::FC1)),
            EncoderKind::FullyConnected2 => Encoder::FullyConnected2(mlp(MlpLayout::FC2)),
            EncoderKind::FullyConnected3 => Encoder::FullyConnected3(mlp(MlpLayout::FC3)),
            EncoderKind::FullyConnected4 => Encoder::FullyConnected4(mlp(MlpLayout::FC4)),
            EncoderKind::FullyConnected5 => Encoder::FullyConnected5(mlp(MlpLayout::FC5)),
        }
    }

    /// Wraps an MLP encoder under the given kind
    ///
    /// Returns `None` for [`EncoderKind::Burgess`].
    pub fn from_mlp(kind: EncoderKind, encoder: FullyConnectedEncoder<B>) -> Option<Self> {
        match kind {
            EncoderKind::Burgess => None,
            EncoderKind::FullyConnected1 => Some(Encoder::FullyConnected1(encoder)),
            EncoderKind::FullyConnected2 => Some(Encoder::FullyConnected2(encoder)),
            EncoderKind::FullyConnected3 => Some(Encoder::FullyConnected3(encoder)),
            EncoderKind::FullyConnected4 => Some(Encoder::FullyConnected4(encoder)),
            EncoderKind::FullyConnected5 => Some(Encoder::FullyConnected5(encoder)),
        }
    }

    pub fn kind(&self) -> EncoderKind {
        match self {
            Encoder::Burgess(_) => EncoderKind::Burgess,
            Encoder::FullyConnected1(_) => EncoderKind::FullyConnected1,
            Encoder::FullyConnected2(_) => EncoderKind::FullyConnected2,
            Encoder::FullyConnected3(_) => EncoderKind::FullyConnected3,
            Encoder::FullyConnected4(_) => EncoderKind::FullyConnected4,
            Encoder::FullyConnected5(_) => EncoderKind::FullyConnected5,
        }
    }

    /// The MLP encoder inside, if this is not the Burgess encoder
    pub fn as_mlp(&self) -> Option<&FullyConnectedEncoder<B>> {
        match self {
            Encoder::Burgess(_) => None,
            Encoder::FullyConnected1(e)
            | Encoder::FullyConnected2(e)
            | Encoder::FullyConnected3(e)
            | Encoder::FullyConnected4(e)
            | Encoder::FullyConnected5(e) => Some(e),
        }
    }

    /// Encode images to latent distribution parameters
    ///
    /// Panics if the input's `[C, H, W]` does not match the configured image
    /// size. Use [`LatentEncoder::try_encode`] to get an error instead.
    pub fn forward(&self, x: Tensor<B, 4>) -> LatentParams<B> {
        match self {
            Encoder::Burgess(e) => e.forward(x),
            Encoder::FullyConnected1(e)
            | Encoder::FullyConnected2(e)
            | Encoder::FullyConnected3(e)
            | Encoder::FullyConnected4(e)
            | Encoder::FullyConnected5(e) => e.forward(x),
        }
    }

    pub fn latent_dim(&self) -> usize {
        match self {
            Encoder::Burgess(e) => e.latent_dim(),
            Encoder::FullyConnected1(e)
            | Encoder::FullyConnected2(e)
            | Encoder::FullyConnected3(e)
            | Encoder::FullyConnected4(e)
            | Encoder::FullyConnected5(e) => e.latent_dim(),
        }
    }

    pub fn img_size(&self) -> ImageSize {
        match self {
            Encoder::Burgess(e) => e.img_size(),
            Encoder::FullyConnected1(e)
            | Encoder::FullyConnected2(e)
            | Encoder::FullyConnected3(e)
            | Encoder::FullyConnected4(e)
            | Encoder::FullyConnected5(e) => e.img_size(),
        }
    }

    /// Number of trainable parameters
    pub fn num_params(&self) -> usize {
        match self {
            Encoder::Burgess(e) => e.num_params(),
            Encoder::FullyConnected1(e)
            | Encoder::FullyConnected2(e)
            | Encoder::FullyConnected3(e)
            | Encoder::FullyConnected4(e)
            | Encoder::FullyConnected5(e) => e.num_params(),
        }
    }
}

impl<B: Backend> LatentEncoder<B> for Encoder<B> {
    fn encode(&self, x: Tensor<B, 4>) -> LatentParams<B> {
        self.forward(x)
    }

    fn latent_dim(&self) -> usize {
        Encoder::latent_dim(self)
    }

    fn img_size(&self) -> ImageSize {
        Encoder::img_size(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_get_encoder_case_insensitive() {
        assert_eq!(get_encoder("burgess").unwrap(), EncoderKind::Burgess);
        assert_eq!(get_encoder("BURGESS").unwrap(), EncoderKind::Burgess);
        assert_eq!(
            get_encoder("FullyConnected2").unwrap(),
            EncoderKind::FullyConnected2
        );
        assert_eq!(
            get_encoder(" fullyconnected5 ").unwrap(),
            EncoderKind::FullyConnected5
        );
    }

    #[test]
    fn test_get_encoder_unknown() {
        let err = get_encoder("fullyconnected6").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("fullyconnected6"));
        assert!(msg.contains("Burgess"));
    }

    #[test]
    fn test_names_roundtrip() {
        for kind in EncoderKind::ALL {
            assert_eq!(get_encoder(kind.name()).unwrap(), kind);
            assert_eq!(kind.to_string(), kind.name());
        }
    }

    #[test]
    fn test_every_encoder_output_shape() {
        let device = Default::default();
        for kind in EncoderKind::ALL {
            let size = ImageSize::new(1, 32, 32);
            let config = kind.config(size).with_latent_dim(7);
            let encoder = config.init::<TestBackend>(&device).unwrap();
            assert_eq!(encoder.kind(), kind);
            assert_eq!(encoder.latent_dim(), 7);
            assert_eq!(encoder.img_size(), size);

            let x = Tensor::<TestBackend, 4>::zeros(size.batch_shape(2), &device);
            let out = encoder.forward(x);
            assert_eq!(out.mean.dims(), [2, 7], "{kind}");
            assert_eq!(out.logvar.dims(), [2, 7], "{kind}");
        }
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let device = Default::default();
        let config = EncoderKind::Burgess.config(ImageSize::new(1, 28, 28));
        assert!(config.init::<TestBackend>(&device).is_err());
    }

    #[test]
    fn test_try_encode_shape_check() {
        let device = Default::default();
        let encoder = EncoderKind::FullyConnected4
            .config(ImageSize::new(1, 16, 16))
            .init::<TestBackend>(&device)
            .unwrap();

        let wrong = Tensor::<TestBackend, 4>::zeros([1, 3, 16, 16], &device);
        assert!(matches!(
            encoder.try_encode(wrong),
            Err(EncoderError::InputShape { .. })
        ));

        let right = Tensor::<TestBackend, 4>::zeros([5, 1, 16, 16], &device);
        let out = encoder.try_encode(right).unwrap();
        assert_eq!(out.batch_size(), 5);
        assert_eq!(out.latent_dim(), 128);
    }

    #[test]
    fn test_from_mlp() {
        let device = Default::default();
        let config = EncoderKind::FullyConnected3.config(ImageSize::new(1, 4, 4));
        let mlp = FullyConnectedEncoder::<TestBackend>::new(MlpLayout::FC3, &config, &device);

        assert!(Encoder::from_mlp(EncoderKind::Burgess, mlp.clone()).is_none());
        let encoder = Encoder::from_mlp(EncoderKind::FullyConnected3, mlp).unwrap();
        assert_eq!(encoder.kind(), EncoderKind::FullyConnected3);
        assert!(encoder.as_mlp().is_some());
    }
}
