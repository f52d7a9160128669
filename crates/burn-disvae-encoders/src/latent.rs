//! Latent distribution parameters
//!
//! Every encoder ends in a single linear layer producing `2 * latent_dim`
//! values per sample. Mean and log-variance are interleaved in that output:
//!
//! ```text
//! [mu_0, logvar_0, mu_1, logvar_1, ..., mu_{n-1}, logvar_{n-1}]
//! ```

use burn::prelude::*;
use burn::tensor::Distribution;

/// Parameters of a diagonal Gaussian over the latent space
#[derive(Debug, Clone)]
pub struct LatentParams<B: Backend> {
    /// Mean, `[batch, latent_dim]`
    pub mean: Tensor<B, 2>,
    /// Log variance, `[batch, latent_dim]`
    pub logvar: Tensor<B, 2>,
}

impl<B: Backend> LatentParams<B> {
    /// Splits the interleaved output of the final linear layer
    ///
    /// Input: `[batch, 2 * latent_dim]`
    pub fn from_interleaved(mu_logvar: Tensor<B, 2>, latent_dim: usize) -> Self {
        let [batch, features] = mu_logvar.dims();
        assert_eq!(
            features,
            2 * latent_dim,
            "expected {} latent features, got {}",
            2 * latent_dim,
            features
        );

        let pairs = mu_logvar.reshape([batch, latent_dim, 2]);
        let mean = pairs
            .clone()
            .slice([0..batch, 0..latent_dim, 0..1])
            .reshape([batch, latent_dim]);
        let logvar = pairs
            .slice([0..batch, 0..latent_dim, 1..2])
            .reshape([batch, latent_dim]);

        Self { mean, logvar }
    }

    pub fn batch_size(&self) -> usize {
        self.mean.dims()[0]
    }

    pub fn latent_dim(&self) -> usize {
        self.mean.dims()[1]
    }

    /// Standard deviation, `exp(logvar / 2)`
    pub fn std(&self) -> Tensor<B, 2> {
        (self.logvar.clone() * 0.5).exp()
    }

    /// Most likely latent (the mean)
    pub fn mode(&self) -> Tensor<B, 2> {
        self.mean.clone()
    }

    /// Draws `z = mean + std * eps` with `eps ~ N(0, 1)`
    pub fn sample(&self) -> Tensor<B, 2> {
        let noise = Tensor::random(
            self.mean.shape(),
            Distribution::Normal(0.0, 1.0),
            &self.mean.device(),
        );
        self.mean.clone() + self.std() * noise
    }

    /// Mean and log variance as a pair
    pub fn into_parts(self) -> (Tensor<B, 2>, Tensor<B, 2>) {
        (self.mean, self.logvar)
    }
}
