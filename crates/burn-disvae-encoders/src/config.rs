//! Encoder configuration
//!
//! An [`EncoderConfig`] fully determines an encoder's layer shapes. Configs
//! are plain serde structs so they can be stored next to checkpoints:
//!
//! ```json
//! { "model": "Burgess", "img_size": { "channels": 1, "height": 64, "width": 64 }, "latent_dim": 10 }
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::EncoderError;
use crate::factory::{Encoder, EncoderKind};

/// Default dropout probability (only used by `Fullyconnected5`)
pub const DEFAULT_DROPOUT: f64 = 0.2;

/// Input image dimensions, channels first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageSize {
    pub const fn new(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
        }
    }

    /// Number of values in one image (`C * H * W`)
    pub fn num_elements(&self) -> usize {
        self.channels * self.height * self.width
    }

    /// True when the image is `side x side`
    pub fn is_square(&self, side: usize) -> bool {
        self.height == side && self.width == side
    }

    /// Shape of a batch of these images
    pub fn batch_shape(&self, batch: usize) -> [usize; 4] {
        [batch, self.channels, self.height, self.width]
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.channels, self.height, self.width)
    }
}

/// Parses `"C,H,W"` or `"CxHxW"`
impl FromStr for ImageSize {
    type Err = EncoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s
            .split(|c| c == ',' || c == 'x' || c == 'X')
            .map(str::trim)
            .collect();

        let dims = parts
            .iter()
            .map(|p| p.parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| EncoderError::ParseImageSize(s.to_string()))?;

        match dims.as_slice() {
            &[c, h, w] => Ok(Self::new(c, h, w)),
            _ => Err(EncoderError::ParseImageSize(s.to_string())),
        }
    }
}

fn default_dropout() -> f64 {
    DEFAULT_DROPOUT
}

/// Encoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Which architecture to build
    pub model: EncoderKind,
    /// Size of the input images
    pub img_size: ImageSize,
    /// Dimensionality of the latent Gaussian
    pub latent_dim: usize,
    /// Dropout probability after the hidden layer (`Fullyconnected5`)
    #[serde(default = "default_dropout")]
    pub dropout: f64,
}

impl EncoderConfig {
    /// Config with the architecture's default latent size
    pub fn new(model: EncoderKind, img_size: ImageSize) -> Self {
        Self {
            model,
            img_size,
            latent_dim: model.default_latent_dim(),
            dropout: DEFAULT_DROPOUT,
        }
    }

    pub fn with_latent_dim(mut self, latent_dim: usize) -> Self {
        self.latent_dim = latent_dim;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// Checks that the layer shapes this config implies are buildable
    pub fn validate(&self) -> Result<(), EncoderError> {
        if self.latent_dim == 0 {
            return Err(EncoderError::InvalidConfig(
                "latent_dim must be positive".into(),
            ));
        }

        let size = self.img_size;
        if size.channels == 0 || size.height == 0 || size.width == 0 {
            return Err(EncoderError::InvalidConfig(format!(
                "image dimensions must be positive, got {size}"
            )));
        }

        if !(0.0..1.0).contains(&self.dropout) {
            return Err(EncoderError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }

        // The conv stack must end at 4x4 for lin1's input size to hold
        if self.model == EncoderKind::Burgess && !(size.is_square(32) || size.is_square(64)) {
            return Err(EncoderError::UnsupportedImageSize {
                model: self.model.name().to_string(),
                size,
                supported: "Cx32x32, Cx64x64".into(),
            });
        }

        Ok(())
    }

    /// Validates the config and builds the encoder
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Encoder<B>, EncoderError> {
        self.validate()?;
        Ok(Encoder::new(self, device))
    }

    /// Reads a config from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EncoderError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), EncoderError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image_size() {
        assert_eq!("1,32,32".parse::<ImageSize>().unwrap(), ImageSize::new(1, 32, 32));
        assert_eq!("3x64x64".parse::<ImageSize>().unwrap(), ImageSize::new(3, 64, 64));
        assert_eq!(" 3, 28 ,28".parse::<ImageSize>().unwrap(), ImageSize::new(3, 28, 28));
        assert!("32,32".parse::<ImageSize>().is_err());
        assert!("a,b,c".parse::<ImageSize>().is_err());
    }

    #[test]
    fn test_num_elements() {
        assert_eq!(ImageSize::new(3, 64, 64).num_elements(), 12288);
    }

    #[test]
    fn test_default_latent_dims() {
        let size = ImageSize::new(1, 32, 32);
        assert_eq!(EncoderConfig::new(EncoderKind::Burgess, size).latent_dim, 10);
        assert_eq!(
            EncoderConfig::new(EncoderKind::FullyConnected3, size).latent_dim,
            128
        );
    }

    #[test]
    fn test_validate_burgess_sizes() {
        let ok = EncoderConfig::new(EncoderKind::Burgess, ImageSize::new(3, 64, 64));
        assert!(ok.validate().is_ok());

        let bad = EncoderConfig::new(EncoderKind::Burgess, ImageSize::new(1, 28, 28));
        assert!(matches!(
            bad.validate(),
            Err(EncoderError::UnsupportedImageSize { .. })
        ));

        // Fully connected encoders take any size
        let fc = EncoderConfig::new(EncoderKind::FullyConnected1, ImageSize::new(1, 28, 28));
        assert!(fc.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let size = ImageSize::new(1, 32, 32);
        let zero_latent = EncoderConfig::new(EncoderKind::FullyConnected2, size).with_latent_dim(0);
        assert!(zero_latent.validate().is_err());

        let bad_dropout = EncoderConfig::new(EncoderKind::FullyConnected5, size).with_dropout(1.0);
        assert!(bad_dropout.validate().is_err());
    }

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encoder.json");

        let config = EncoderConfig::new(EncoderKind::FullyConnected5, ImageSize::new(3, 32, 32))
            .with_latent_dim(16)
            .with_dropout(0.1);
        config.save(&path).unwrap();

        let loaded = EncoderConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_json_defaults_and_case() {
        let json = r#"{
            "model": "burgess",
            "img_size": { "channels": 1, "height": 32, "width": 32 },
            "latent_dim": 10
        }"#;
        let config: EncoderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.model, EncoderKind::Burgess);
        assert_eq!(config.dropout, DEFAULT_DROPOUT);
    }
}
