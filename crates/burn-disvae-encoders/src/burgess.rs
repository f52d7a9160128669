//! Convolutional encoder from Burgess et al.
//!
//! Architecture:
//! - 3 convolutional layers (32 channels, 4x4 kernel, stride 2), plus a
//!   fourth one for 64x64 inputs
//! - 2 fully connected layers of 256 units
//! - 1 fully connected layer of `2 * latent_dim` units (mean, log variance)
//!
//! Reference: "Understanding disentangling in beta-VAE"
//! https://arxiv.org/abs/1804.03599

use burn::nn::{
    Linear, LinearConfig, PaddingConfig2d,
    conv::{Conv2d, Conv2dConfig},
};
use burn::prelude::*;
use burn::tensor::activation::relu;

use crate::config::{EncoderConfig, ImageSize};
use crate::latent::LatentParams;

/// Channels of every convolution
pub const HIDDEN_CHANNELS: usize = 32;
/// Convolution kernel size
pub const KERNEL_SIZE: usize = 4;
/// Width of the two hidden linear layers
pub const HIDDEN_DIM: usize = 256;

/// Flattened size of the conv output: `[32, 4, 4]`
pub const CONV_OUT_FEATURES: usize = HIDDEN_CHANNELS * KERNEL_SIZE * KERNEL_SIZE;

/// 4x4 conv with stride 2 and padding 1 (halves the spatial size)
pub fn downsample_conv<B: Backend>(
    in_channels: usize,
    out_channels: usize,
    device: &B::Device,
) -> Conv2d<B> {
    Conv2dConfig::new([in_channels, out_channels], [KERNEL_SIZE, KERNEL_SIZE])
        .with_stride([2, 2])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device)
}

/// Layers of a Burgess encoder, built elsewhere (e.g. from loaded weights)
#[derive(Debug)]
pub struct BurgessLayers<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub conv3: Conv2d<B>,
    pub conv_64: Option<Conv2d<B>>,
    pub lin1: Linear<B>,
    pub lin2: Linear<B>,
    pub mu_logvar_gen: Linear<B>,
}

/// Burgess convolutional encoder
#[derive(Module, Debug)]
pub struct EncoderBurgess<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub conv3: Conv2d<B>,
    /// Only present for 64x64 inputs
    pub conv_64: Option<Conv2d<B>>,
    pub lin1: Linear<B>,
    pub lin2: Linear<B>,
    pub mu_logvar_gen: Linear<B>,
    latent_dim: usize,
    channels: usize,
    height: usize,
    width: usize,
}

impl<B: Backend> EncoderBurgess<B> {
    /// Creates a randomly initialized encoder
    ///
    /// The config is assumed valid (32x32 or 64x64 images).
    pub fn new(config: &EncoderConfig, device: &B::Device) -> Self {
        let size = config.img_size;

        let layers = BurgessLayers {
            conv1: downsample_conv(size.channels, HIDDEN_CHANNELS, device),
            conv2: downsample_conv(HIDDEN_CHANNELS, HIDDEN_CHANNELS, device),
            conv3: downsample_conv(HIDDEN_CHANNELS, HIDDEN_CHANNELS, device),
            conv_64: Self::needs_conv_64(size)
                .then(|| downsample_conv(HIDDEN_CHANNELS, HIDDEN_CHANNELS, device)),
            lin1: LinearConfig::new(CONV_OUT_FEATURES, HIDDEN_DIM).init(device),
            lin2: LinearConfig::new(HIDDEN_DIM, HIDDEN_DIM).init(device),
            mu_logvar_gen: LinearConfig::new(HIDDEN_DIM, config.latent_dim * 2).init(device),
        };

        Self::from_layers(config, layers)
    }

    /// Assembles an encoder from existing layers
    ///
    /// Layer shapes are not checked here; a mismatch surfaces on the first
    /// forward pass.
    pub fn from_layers(config: &EncoderConfig, layers: BurgessLayers<B>) -> Self {
        let size = config.img_size;

        log::debug!(
            "Burgess encoder: {} -> latent {} (conv_64: {})",
            size,
            config.latent_dim,
            layers.conv_64.is_some()
        );

        Self {
            conv1: layers.conv1,
            conv2: layers.conv2,
            conv3: layers.conv3,
            conv_64: layers.conv_64,
            lin1: layers.lin1,
            lin2: layers.lin2,
            mu_logvar_gen: layers.mu_logvar_gen,
            latent_dim: config.latent_dim,
            channels: size.channels,
            height: size.height,
            width: size.width,
        }
    }

    /// Whether an extra downsampling conv is needed to reach 4x4
    pub fn needs_conv_64(size: ImageSize) -> bool {
        size.is_square(64)
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    pub fn img_size(&self) -> ImageSize {
        ImageSize::new(self.channels, self.height, self.width)
    }

    /// Encode images to latent distribution parameters
    ///
    /// Input: `[batch, C, 32, 32]` or `[batch, C, 64, 64]`
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
            "Burgess encoder expects [batch, {}] input, got {:?}",
            self.img_size(),
            [batch, c, h, w]
        );

        let mut h = relu(self.conv1.forward(x));
        h = relu(self.conv2.forward(h));
        h = relu(self.conv3.forward(h));
        if let Some(conv) = &self.conv_64 {
            h = relu(conv.forward(h));
        }

        let h = h.reshape([batch, CONV_OUT_FEATURES]);
        let h = relu(self.lin1.forward(h));
        let h = relu(self.lin2.forward(h));

        // Log std-dev in the paper; treated as log variance downstream
        let mu_logvar = self.mu_logvar_gen.forward(h);
        LatentParams::from_interleaved(mu_logvar, self.latent_dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::EncoderKind;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn config(size: ImageSize) -> EncoderConfig {
        EncoderConfig::new(EncoderKind::Burgess, size)
    }

    #[test]
    fn test_burgess_32_forward() {
        let device = Default::default();
        let encoder = EncoderBurgess::<TestBackend>::new(&config(ImageSize::new(1, 32, 32)), &device);
        assert!(encoder.conv_64.is_none());

        let x = Tensor::<TestBackend, 4>::zeros([2, 1, 32, 32], &device);
        let out = encoder.forward(x);

        assert_eq!(out.mean.dims(), [2, 10]);
        assert_eq!(out.logvar.dims(), [2, 10]);
    }

    #[test]
    fn test_burgess_64_forward() {
        let device = Default::default();
        let cfg = config(ImageSize::new(3, 64, 64)).with_latent_dim(6);
        let encoder = EncoderBurgess::<TestBackend>::new(&cfg, &device);
        assert!(encoder.conv_64.is_some());

        let x = Tensor::<TestBackend, 4>::ones([3, 3, 64, 64], &device);
        let out = encoder.forward(x);

        assert_eq!(out.mean.dims(), [3, 6]);
        assert_eq!(out.logvar.dims(), [3, 6]);
    }

    #[test]
    fn test_conv_stack_reaches_4x4() {
        let device = Default::default();
        let conv = downsample_conv::<TestBackend>(1, HIDDEN_CHANNELS, &device);
        let x = Tensor::<TestBackend, 4>::zeros([1, 1, 8, 8], &device);
        assert_eq!(conv.forward(x).dims(), [1, HIDDEN_CHANNELS, 4, 4]);
    }

    #[test]
    fn test_burgess_param_count() {
        let device = Default::default();
        let encoder = EncoderBurgess::<TestBackend>::new(&config(ImageSize::new(1, 32, 32)), &device);

        let conv1 = 32 * 16 + 32;
        let conv = 32 * 32 * 16 + 32;
        let lin1 = 512 * 256 + 256;
        let lin2 = 256 * 256 + 256;
        let head = 256 * 20 + 20;
        assert_eq!(encoder.num_params(), conv1 + 2 * conv + lin1 + lin2 + head);
    }

    #[test]
    #[should_panic(expected = "Burgess encoder expects [batch, 1x32x32] input")]
    fn test_forward_rejects_other_image_size() {
        let device = Default::default();
        let encoder = EncoderBurgess::<TestBackend>::new(&config(ImageSize::new(1, 32, 32)), &device);

        // Same conv output size (512 per sample) as a 1x32x32 input
        let x = Tensor::<TestBackend, 4>::zeros([2, 1, 16, 64], &device);
        let _ = encoder.forward(x);
    }

    #[test]
    fn test_from_layers_keeps_weights() {
        let device = Default::default();
        let cfg = config(ImageSize::new(1, 32, 32)).with_latent_dim(3);
        let layers = BurgessLayers {
            conv1: downsample_conv::<TestBackend>(1, HIDDEN_CHANNELS, &device),
            conv2: downsample_conv(HIDDEN_CHANNELS, HIDDEN_CHANNELS, &device),
            conv3: downsample_conv(HIDDEN_CHANNELS, HIDDEN_CHANNELS, &device),
            conv_64: None,
            lin1: LinearConfig::new(CONV_OUT_FEATURES, HIDDEN_DIM).init(&device),
            lin2: LinearConfig::new(HIDDEN_DIM, HIDDEN_DIM).init(&device),
            mu_logvar_gen: LinearConfig::new(HIDDEN_DIM, 6).init(&device),
        };
        let head = layers.mu_logvar_gen.weight.val().into_data().to_vec::<f32>().unwrap();

        let encoder = EncoderBurgess::from_layers(&cfg, layers);
        assert_eq!(encoder.latent_dim(), 3);
        assert_eq!(encoder.img_size(), ImageSize::new(1, 32, 32));
        let kept = encoder.mu_logvar_gen.weight.val().into_data().to_vec::<f32>().unwrap();
        assert_eq!(kept, head);

        let out = encoder.forward(Tensor::zeros([1, 1, 32, 32], &device));
        assert_eq!(out.mean.dims(), [1, 3]);
    }
}
