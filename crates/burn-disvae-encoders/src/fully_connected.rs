//! Fully connected (MLP) encoders
//!
//! Five variants that flatten the image and run it through a stack of
//! ReLU linear layers before the mean/log-variance head. They differ only
//! in their hidden widths. The fifth also declares a dropout layer, which
//! is part of its record but never applied in `forward`.

use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::relu;

use crate::config::{EncoderConfig, ImageSize};
use crate::latent::LatentParams;

/// Hidden layer widths and extras of one MLP variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MlpLayout {
    pub hidden: &'static [usize],
    pub dropout: bool,
}

impl MlpLayout {
    pub const FC1: Self = Self {
        hidden: &[128, 64, 32],
        dropout: false,
    };
    pub const FC2: Self = Self {
        hidden: &[4096, 1024],
        dropout: false,
    };
    pub const FC3: Self = Self {
        hidden: &[1024, 1024],
        dropout: false,
    };
    pub const FC4: Self = Self {
        hidden: &[128, 32],
        dropout: false,
    };
    pub const FC5: Self = Self {
        hidden: &[128],
        dropout: true,
    };

    /// Width feeding the mean/log-variance head
    pub fn last_hidden(&self) -> usize {
        self.hidden.last().copied().unwrap_or(0)
    }

    /// `[in, out]` of every hidden layer for a given input size
    pub fn layer_dims(&self, in_features: usize) -> Vec<[usize; 2]> {
        let mut dims = Vec::with_capacity(self.hidden.len());
        let mut prev = in_features;
        for &width in self.hidden {
            dims.push([prev, width]);
            prev = width;
        }
        dims
    }
}

/// Multilayer perceptron encoder
///
/// Hidden layers are named `lin1`, `lin2`, ... in exported weights.
#[derive(Module, Debug)]
pub struct FullyConnectedEncoder<B: Backend> {
    pub hidden: Vec<Linear<B>>,
    pub dropout: Option<Dropout>,
    pub mu_logvar_gen: Linear<B>,
    latent_dim: usize,
    channels: usize,
    height: usize,
    width: usize,
}

impl<B: Backend> FullyConnectedEncoder<B> {
    /// Creates a randomly initialized encoder with the given layout
    pub fn new(layout: MlpLayout, config: &EncoderConfig, device: &B::Device) -> Self {
        let size = config.img_size;

        let hidden: Vec<Linear<B>> = layout
            .layer_dims(size.num_elements())
            .into_iter()
            .map(|[d_in, d_out]| LinearConfig::new(d_in, d_out).init(device))
            .collect();
        let mu_logvar_gen =
            LinearConfig::new(layout.last_hidden(), config.latent_dim * 2).init(device);

        Self::from_layers(layout, config, hidden, mu_logvar_gen)
    }

    /// Assembles an encoder from existing hidden layers and head
    ///
    /// Layer shapes are not checked here; a mismatch surfaces on the first
    /// forward pass.
    pub fn from_layers(
        layout: MlpLayout,
        config: &EncoderConfig,
        hidden: Vec<Linear<B>>,
        mu_logvar_gen: Linear<B>,
    ) -> Self {
        let size = config.img_size;
        let dropout = layout
            .dropout
            .then(|| DropoutConfig::new(config.dropout).init());

        log::debug!(
            "MLP encoder: {} -> {:?} -> latent {}",
            size,
            layout.hidden,
            config.latent_dim
        );

        Self {
            hidden,
            dropout,
            mu_logvar_gen,
            latent_dim: config.latent_dim,
            channels: size.channels,
            height: size.height,
            width: size.width,
        }
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    pub fn img_size(&self) -> ImageSize {
        ImageSize::new(self.channels, self.height, self.width)
    }

    /// Encode images to latent distribution parameters
    ///
    /// Input: `[batch, C, H, W]`, flattened to `[batch, C*H*W]`
    /// Output: mean and logvar, each `[batch, latent_dim]`
    ///
    /// # Panics
    ///
    /// If the input's `[C, H, W]` differs from the configured image size.
    pub fn forward(&self, x: Tensor<B, 4>) -> LatentParams<B> {
        let [batch, c, h, w] = x.dims();
        assert_eq!(
            [c, h, w],
            [self.channels, self.height, self.width],
            "MLP encoder expects [batch, {}] input, got {:?}",
            self.img_size(),
            [batch, c, h, w]
        );
        let mut x = x.reshape([batch, c * h * w]);

        for layer in &self.hidden {
            x = relu(layer.forward(x));
        }

        // `dropout` is declared but not applied
        let mu_logvar = self.mu_logvar_gen.forward(x);
        LatentParams::from_interleaved(mu_logvar, self.latent_dim)
    }
}
