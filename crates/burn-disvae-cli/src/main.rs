//! burn-disvae CLI
//!
//! Command-line interface for inspecting and running VAE encoders.
//!
//! Supports:
//! - Listing and describing encoder architectures
//! - Running an encoder on a random batch
//! - Converting PyTorch safetensors weights to burn records

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use burn::nn::Linear;
use burn::nn::conv::Conv2d;
use burn::prelude::*;
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use burn_disvae::backends::{DEFAULT_BACKEND_NAME, DefaultBackend, default_device};
use burn_disvae::convert::{self, Precision, SafeTensorFile};
use burn_disvae::{Encoder, EncoderConfig, EncoderKind, ImageSize, LatentEncoder};

#[derive(Parser)]
#[command(name = "disvae")]
#[command(about = "Disentangled VAE encoders in pure Rust")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all log output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Selects an encoder either from a config file or from flags
#[derive(Args, Debug, Clone, Default)]
struct ModelArgs {
    /// Encoder name (case-insensitive), e.g. burgess, fullyconnected3
    #[arg(short, long)]
    model: Option<EncoderKind>,

    /// Image size as C,H,W (e.g. 1,64,64)
    #[arg(short, long)]
    img_size: Option<ImageSize>,

    /// Latent dimensionality (default depends on the encoder)
    #[arg(short, long)]
    latent_dim: Option<usize>,

    /// Dropout probability (Fullyconnected5 only)
    #[arg(long)]
    dropout: Option<f64>,

    /// JSON encoder config; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available encoders
    List,

    /// Show the layers and parameter count of an encoder
    Describe {
        #[command(flatten)]
        model: ModelArgs,

        /// Print the resolved config as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encode a random batch and report latent statistics
    Encode {
        #[command(flatten)]
        model: ModelArgs,

        /// Weights (.safetensors from PyTorch, or a .bin burn record)
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Batch size
        #[arg(short, long, default_value = "8")]
        batch: usize,

        /// Random seed for the input batch
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Also draw a reparameterized sample
        #[arg(long)]
        sample: bool,
    },

    /// List tensors stored in a safetensors file
    Inspect {
        /// Path to safetensors file
        path: PathBuf,

        /// Filter tensor names (substring match)
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Convert safetensors weights to a burn record
    Convert {
        #[command(flatten)]
        model: ModelArgs,

        /// Input safetensors file
        #[arg(short, long)]
        weights: PathBuf,

        /// Output path (".bin" is appended; config is written next to it)
        #[arg(short, long)]
        output: PathBuf,

        /// Store weights as f16
        #[arg(long)]
        half: bool,
    },

    /// Write a JSON config with default values
    InitConfig {
        #[command(flatten)]
        model: ModelArgs,

        /// Output JSON path
        #[arg(short, long)]
        output: PathBuf,
    },
}

impl ModelArgs {
    /// Resolves the encoder config from the file and flags
    ///
    /// `latent_hint` is used when neither the config file nor the flags set
    /// a latent size (e.g. inferred from weights).
    fn resolve(&self, latent_hint: Option<usize>) -> Result<EncoderConfig> {
        let mut config = match &self.config {
            Some(path) => EncoderConfig::load(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
            None => {
                let (Some(model), Some(img_size)) = (self.model, self.img_size) else {
                    bail!("either --config or both --model and --img-size are required");
                };
                let mut config = EncoderConfig::new(model, img_size);
                if let Some(latent_dim) = latent_hint {
                    config.latent_dim = latent_dim;
                }
                config
            }
        };

        if let Some(model) = self.model {
            if model != config.model {
                config.latent_dim = latent_hint.unwrap_or(model.default_latent_dim());
            }
            config.model = model;
        }
        if let Some(img_size) = self.img_size {
            config.img_size = img_size;
        }
        if let Some(latent_dim) = self.latent_dim {
            config.latent_dim = latent_dim;
        }
        if let Some(dropout) = self.dropout {
            config.dropout = dropout;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Summary statistics of a tensor
#[derive(Debug, Clone, Copy)]
struct Stats {
    mean: f32,
    min: f32,
    max: f32,
}

fn stats<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Stats> {
    let values = tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Failed to read tensor data: {e:?}"))?;
    if values.is_empty() {
        bail!("empty tensor");
    }

    let sum: f32 = values.iter().sum();
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    Ok(Stats {
        mean: sum / values.len() as f32,
        min,
        max,
    })
}

/// Uniform [0, 1) images, reproducible from `seed`
fn random_batch<B: Backend>(
    size: ImageSize,
    batch: usize,
    seed: u64,
    device: &B::Device,
) -> Tensor<B, 4> {
    let mut rng = StdRng::seed_from_u64(seed);
    let shape = size.batch_shape(batch);
    let values: Vec<f32> = (0..shape.iter().product::<usize>())
        .map(|_| rng.r#gen::<f32>())
        .collect();
    Tensor::from_data(TensorData::new(values, shape), device)
}

fn is_safetensors(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "safetensors")
}

fn load_weights(
    model: &ModelArgs,
    path: &Path,
    device: &<DefaultBackend as Backend>::Device,
) -> Result<Encoder<DefaultBackend>> {
    if is_safetensors(path) {
        let file = SafeTensorFile::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let hint = convert::infer_latent_dim(&file).ok();
        let config = model.resolve(hint)?;
        log::info!("loading {} weights from {}", config.model, path.display());
        Ok(convert::load_encoder(&file, &config, device)?)
    } else {
        let config = model.resolve(None)?;
        // The recorder appends ".bin" itself
        let record = path.with_extension("");
        log::info!("loading {} record from {}", config.model, path.display());
        match convert::load_encoder_record(&config, record.clone(), Precision::Full, device) {
            Ok(encoder) => Ok(encoder),
            Err(err) => {
                log::debug!("full precision load failed ({err}), trying half precision");
                Ok(convert::load_encoder_record(&config, record, Precision::Half, device)?)
            }
        }
    }
}

fn describe_conv(name: &str, conv: &Conv2d<impl Backend>) {
    let [out_ch, in_ch, kh, kw] = conv.weight.val().dims();
    println!("  {name:<14} Conv2d({in_ch} -> {out_ch}, {kh}x{kw}, stride 2) + ReLU");
}

fn describe_linear(name: &str, linear: &Linear<impl Backend>, activation: &str) {
    let [d_in, d_out] = linear.weight.val().dims();
    println!("  {name:<14} Linear({d_in} -> {d_out}){activation}");
}

fn print_layers(encoder: &Encoder<DefaultBackend>) {
    match encoder {
        Encoder::Burgess(e) => {
            describe_conv("conv1", &e.conv1);
            describe_conv("conv2", &e.conv2);
            describe_conv("conv3", &e.conv3);
            if let Some(conv) = &e.conv_64 {
                describe_conv("conv_64", conv);
            }
            println!("  {:<14} [batch, 512]", "flatten");
            describe_linear("lin1", &e.lin1, " + ReLU");
            describe_linear("lin2", &e.lin2, " + ReLU");
            describe_linear("mu_logvar_gen", &e.mu_logvar_gen, "");
        }
        other => {
            let Some(mlp) = other.as_mlp() else { return };
            let size = other.img_size().num_elements();
            println!("  {:<14} [batch, {size}]", "flatten");
            for (i, layer) in mlp.hidden.iter().enumerate() {
                describe_linear(&format!("lin{}", i + 1), layer, " + ReLU");
            }
            if let Some(dropout) = &mlp.dropout {
                println!("  {:<14} Dropout(p = {})", "dropout", dropout.prob);
            }
            describe_linear("mu_logvar_gen", &mlp.mu_logvar_gen, "");
        }
    }
}

fn run_list() {
    println!("Available encoders:\n");
    for kind in EncoderKind::ALL {
        let layout = match kind.mlp_layout() {
            None => "conv 32x4x4 (x3, x4 for 64x64) -> 256 -> 256".to_string(),
            Some(layout) => layout
                .hidden
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(" -> "),
        };
        println!(
            "  {:<16} latent {:>3}  {}",
            kind.name(),
            kind.default_latent_dim(),
            layout
        );
    }
}

fn run_describe(model: ModelArgs, json: bool) -> Result<()> {
    let config = model.resolve(None)?;
    let device = default_device();
    let encoder = config.init::<DefaultBackend>(&device)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("Encoder:    {}", config.model);
    println!("Image size: {}", config.img_size);
    println!("Latent dim: {}", config.latent_dim);
    println!("\nLayers:");
    print_layers(&encoder);
    println!("  {:<14} mean, logvar: [batch, {}]", "split", config.latent_dim);
    println!("\nParameters: {}", encoder.num_params());
    Ok(())
}

fn run_encode(
    model: ModelArgs,
    weights: Option<PathBuf>,
    batch: usize,
    seed: u64,
    sample: bool,
) -> Result<()> {
    if batch == 0 {
        bail!("--batch must be positive");
    }

    let device = default_device();
    let encoder = match &weights {
        Some(path) => load_weights(&model, path, &device)?,
        None => {
            log::warn!("no --weights given, using random initialization");
            model.resolve(None)?.init::<DefaultBackend>(&device)?
        }
    };

    println!("burn-disvae: encoding on {DEFAULT_BACKEND_NAME}\n");
    println!("Configuration:");
    println!("  Encoder: {}", encoder.kind());
    println!("  Input:   [{batch}, {}]", encoder.img_size());
    println!("  Seed:    {seed}");

    let x = random_batch::<DefaultBackend>(encoder.img_size(), batch, seed, &device);
    let latent = encoder.try_encode(x)?;

    println!("\nOutput:");
    println!("  mean:   {:?}", latent.mean.dims());
    println!("  logvar: {:?}", latent.logvar.dims());

    let report = |name: &str, s: Stats| {
        println!(
            "  {name:<7} mean {:>9.4}  min {:>9.4}  max {:>9.4}",
            s.mean, s.min, s.max
        );
    };
    println!("\nStatistics:");
    report("mean", stats(latent.mean.clone())?);
    report("logvar", stats(latent.logvar.clone())?);
    report("std", stats(latent.std())?);
    if sample {
        report("sample", stats(latent.sample())?);
    }

    Ok(())
}

fn run_inspect(path: PathBuf, filter: Option<String>) -> Result<()> {
    let file = SafeTensorFile::open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    println!("File: {}", path.display());
    println!("Total tensors: {}\n", file.len());

    for name in file.names() {
        if let Some(filter) = &filter {
            if !name.contains(filter.as_str()) {
                continue;
            }
        }
        let shape = file.shape(name).unwrap_or_default();
        match file.dtype(name) {
            Some(dtype) => println!("{name}: {shape:?} ({dtype:?})"),
            None => println!("{name}: {shape:?}"),
        }
    }

    if let Some(prefix) = convert::detect_prefix(&file) {
        match convert::infer_latent_dim(&file) {
            Ok(latent) => {
                println!("\nEncoder weights found (prefix '{prefix}', latent dim {latent})")
            }
            Err(err) => log::warn!("encoder head under prefix '{prefix}' is unusable: {err}"),
        }
    }

    Ok(())
}

fn run_convert(model: ModelArgs, weights: PathBuf, output: PathBuf, half: bool) -> Result<()> {
    if !is_safetensors(&weights) {
        bail!("expected a .safetensors file, got {}", weights.display());
    }

    let device = default_device();
    let encoder = load_weights(&model, &weights, &device)?;
    let config = model.resolve(Some(encoder.latent_dim()))?;

    let precision = if half { Precision::Half } else { Precision::Full };
    convert::save_encoder(&encoder, output.clone(), precision)
        .with_context(|| format!("Failed to save {}", output.display()))?;

    let config_path = output.with_extension("json");
    config.save(&config_path)?;

    println!("Saved {} encoder:", encoder.kind());
    println!("  weights: {}", output.with_extension("bin").display());
    println!("  config:  {}", config_path.display());
    Ok(())
}

fn run_init_config(model: ModelArgs, output: PathBuf) -> Result<()> {
    let config = model.resolve(None)?;
    config
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {} config to {}", config.model, output.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    stderrlog::new()
        .module(module_path!())
        .module("burn_disvae_encoders")
        .module("burn_disvae_convert")
        .quiet(cli.quiet)
        .verbosity(cli.verbose as usize + 1)
        .init()?;

    match cli.command {
        Commands::List => {
            run_list();
            Ok(())
        }
        Commands::Describe { model, json } => run_describe(model, json),
        Commands::Encode {
            model,
            weights,
            batch,
            seed,
            sample,
        } => run_encode(model, weights, batch, seed, sample),
        Commands::Inspect { path, filter } => run_inspect(path, filter),
        Commands::Convert {
            model,
            weights,
            output,
            half,
        } => run_convert(model, weights, output, half),
        Commands::InitConfig { model, output } => run_init_config(model, output),
    }
}
