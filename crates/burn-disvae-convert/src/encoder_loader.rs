//! Encoder weight loading
//!
//! Loads encoders from a PyTorch `state_dict` saved as safetensors. Tensor
//! names follow the PyTorch modules:
//!
//! ```text
//! conv1.weight        [32, C, 4, 4]       (Burgess)
//! conv2.weight        [32, 32, 4, 4]
//! conv3.weight        [32, 32, 4, 4]
//! conv_64.weight      [32, 32, 4, 4]      (64x64 inputs only)
//! lin1.weight         [out, in]
//! lin2.weight, lin3.weight ...
//! mu_logvar_gen.weight [2 * latent_dim, hidden]
//! ```
//!
//! Every `.weight` may have a matching `.bias`. Full VAE checkpoints store
//! the same names under an `encoder.` prefix, which is detected
//! automatically.

use std::collections::HashSet;
use std::path::Path;

use burn::module::Param;
use burn::nn::conv::Conv2d;
use burn::nn::Linear;
use burn::prelude::*;

use burn_disvae_encoders::burgess::{
    self, BurgessLayers, EncoderBurgess, HIDDEN_CHANNELS, KERNEL_SIZE,
};
use burn_disvae_encoders::{Encoder, EncoderConfig, EncoderError, FullyConnectedEncoder};

use crate::loader::{LoadError, SafeTensorFile};

/// Prefixes tried, in order, when looking for encoder weights
pub const KNOWN_PREFIXES: [&str; 2] = ["", "encoder."];

/// Name of the output head, used to detect the prefix and latent size
const HEAD: &str = "mu_logvar_gen";

/// Error type for encoder weight loading
#[derive(Debug, thiserror::Error)]
pub enum EncoderLoadError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Missing tensor: {0}")]
    MissingTensor(String),

    #[error("Shape mismatch for {tensor}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        tensor: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("{tensor} has odd output dim {size}; expected an even dim (2 * latent_dim)")]
    OddHeadDim { tensor: String, size: usize },

    #[error("{tensor} has shape {shape:?}; expected a 2D [2 * latent_dim, hidden] weight")]
    HeadRank { tensor: String, shape: Vec<usize> },

    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),
}

/// Finds the prefix under which encoder weights are stored
pub fn detect_prefix(file: &SafeTensorFile) -> Option<&'static str> {
    KNOWN_PREFIXES
        .into_iter()
        .find(|prefix| file.contains(&format!("{prefix}{HEAD}.weight")))
}

/// Reads the latent size from the output head's shape
pub fn infer_latent_dim(file: &SafeTensorFile) -> Result<usize, EncoderLoadError> {
    let prefix = detect_prefix(file)
        .ok_or_else(|| EncoderLoadError::MissingTensor(format!("{HEAD}.weight")))?;
    let key = format!("{prefix}{HEAD}.weight");

    match file.shape(&key) {
        Some(&[out, _]) if out % 2 == 0 => Ok(out / 2),
        Some(&[out, _]) => Err(EncoderLoadError::OddHeadDim {
            tensor: key,
            size: out,
        }),
        Some(shape) => Err(EncoderLoadError::HeadRank {
            tensor: key.clone(),
            shape: shape.to_vec(),
        }),
        None => Err(EncoderLoadError::MissingTensor(key)),
    }
}

/// Opens a safetensors file and loads an encoder from it
pub fn load_encoder_file<B: Backend, P: AsRef<Path>>(
    path: P,
    config: &EncoderConfig,
    device: &B::Device,
) -> Result<Encoder<B>, EncoderLoadError> {
    let file = SafeTensorFile::open(path)?;
    load_encoder(&file, config, device)
}

/// Loads an encoder described by `config` from a safetensors file
pub fn load_encoder<B: Backend>(
    file: &SafeTensorFile,
    config: &EncoderConfig,
    device: &B::Device,
) -> Result<Encoder<B>, EncoderLoadError> {
    config.validate()?;

    let prefix = detect_prefix(file)
        .ok_or_else(|| EncoderLoadError::MissingTensor(format!("{HEAD}.weight")))?;
    let mut loader = WeightLoader {
        file,
        prefix,
        used: HashSet::new(),
    };

    let encoder = match config.model.mlp_layout() {
        None => Encoder::Burgess(loader.burgess(config, device)?),
        Some(layout) => {
            let hidden = layout
                .layer_dims(config.img_size.num_elements())
                .into_iter()
                .enumerate()
                .map(|(i, [d_in, d_out])| loader.linear(&format!("lin{}", i + 1), d_in, d_out, device))
                .collect::<Result<Vec<_>, _>>()?;
            let head = loader.linear(HEAD, layout.last_hidden(), config.latent_dim * 2, device)?;
            let mlp = FullyConnectedEncoder::from_layers(layout, config, hidden, head);

            Encoder::from_mlp(config.model, mlp).ok_or_else(|| {
                EncoderError::InvalidConfig(format!("{} is not an MLP encoder", config.model))
            })?
        }
    };

    loader.warn_unused();
    log::debug!(
        "loaded {} encoder ({} params, prefix '{}')",
        config.model,
        encoder.num_params(),
        prefix
    );

    Ok(encoder)
}

struct WeightLoader<'a> {
    file: &'a SafeTensorFile,
    prefix: &'static str,
    used: HashSet<String>,
}

impl WeightLoader<'_> {
    fn key(&mut self, module: &str, param: &str) -> String {
        let key = format!("{}{}.{}", self.prefix, module, param);
        self.used.insert(key.clone());
        key
    }

    fn burgess<B: Backend>(
        &mut self,
        config: &EncoderConfig,
        device: &B::Device,
    ) -> Result<EncoderBurgess<B>, EncoderLoadError> {
        let hid = HIDDEN_CHANNELS;
        let conv1 = self.conv("conv1", config.img_size.channels, hid, device)?;
        let conv2 = self.conv("conv2", hid, hid, device)?;
        let conv3 = self.conv("conv3", hid, hid, device)?;
        let conv_64 = if EncoderBurgess::<B>::needs_conv_64(config.img_size) {
            Some(self.conv("conv_64", hid, hid, device)?)
        } else {
            None
        };

        let layers = BurgessLayers {
            conv1,
            conv2,
            conv3,
            conv_64,
            lin1: self.linear("lin1", burgess::CONV_OUT_FEATURES, burgess::HIDDEN_DIM, device)?,
            lin2: self.linear("lin2", burgess::HIDDEN_DIM, burgess::HIDDEN_DIM, device)?,
            mu_logvar_gen: self.linear(HEAD, burgess::HIDDEN_DIM, config.latent_dim * 2, device)?,
        };

        Ok(EncoderBurgess::from_layers(config, layers))
    }

    fn tensor<B: Backend, const D: usize>(
        &mut self,
        module: &str,
        param: &str,
        expected: [usize; D],
        device: &B::Device,
    ) -> Result<Tensor<B, D>, EncoderLoadError> {
        let key = self.key(module, param);
        match self.file.shape(&key) {
            None => Err(EncoderLoadError::MissingTensor(key)),
            Some(actual) if actual != expected.as_slice() => Err(EncoderLoadError::ShapeMismatch {
                tensor: key.clone(),
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            }),
            Some(_) => Ok(self.file.load_f32(&key, device)?),
        }
    }

    fn bias<B: Backend>(
        &mut self,
        module: &str,
        size: usize,
        device: &B::Device,
    ) -> Result<Option<Param<Tensor<B, 1>>>, EncoderLoadError> {
        let key = format!("{}{}.bias", self.prefix, module);
        if !self.file.contains(&key) {
            return Ok(None);
        }
        let bias = self.tensor(module, "bias", [size], device)?;
        Ok(Some(Param::from_tensor(bias)))
    }

    fn linear<B: Backend>(
        &mut self,
        module: &str,
        in_features: usize,
        out_features: usize,
        device: &B::Device,
    ) -> Result<Linear<B>, EncoderLoadError> {
        // PyTorch stores [out, in]; burn expects [in, out]
        let weight: Tensor<B, 2> =
            self.tensor(module, "weight", [out_features, in_features], device)?;
        let bias = self.bias(module, out_features, device)?;

        Ok(Linear {
            weight: Param::from_tensor(weight.transpose()),
            bias,
        })
    }

    fn conv<B: Backend>(
        &mut self,
        module: &str,
        in_channels: usize,
        out_channels: usize,
        device: &B::Device,
    ) -> Result<Conv2d<B>, EncoderLoadError> {
        let weight: Tensor<B, 4> = self.tensor(
            module,
            "weight",
            [out_channels, in_channels, KERNEL_SIZE, KERNEL_SIZE],
            device,
        )?;

        let mut conv = burgess::downsample_conv(in_channels, out_channels, device);
        conv.weight = Param::from_tensor(weight);
        conv.bias = self.bias(module, out_channels, device)?;

        Ok(conv)
    }

    fn warn_unused(&self) {
        let unused: Vec<&str> = self
            .file
            .names()
            .into_iter()
            .filter(|name| name.starts_with(self.prefix) && !self.used.contains(*name))
            .collect();
        if !unused.is_empty() {
            log::warn!("{} tensors not used by the encoder: {:?}", unused.len(), unused);
        }
    }
}
