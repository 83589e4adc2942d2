use std::fs::create_dir_all;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use math_audio_laguerre_volterra::{
    CascadeSystem, IdentificationConfig, LvnStructure, SimulatedSystem, first_order_kernel,
    generate_dataset, identify, laguerre_filter_memory, load_model, load_signals, save_model,
    save_recorded, save_signals, test_nmse,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Parser, Debug)]
#[command(
    name = "identify-lvn",
    about = "Identify Laguerre-Volterra networks with metaheuristic optimizers"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write train/test datasets generated by a simulated system
    Generate(GenerateArgs),
    /// Fit a network to a training dataset
    Optimize(OptimizeArgs),
    /// NMSE of a stored model on a signal file
    Evaluate(EvaluateArgs),
    /// Print the first-order Volterra kernel of a stored model
    Kernels(KernelsArgs),
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SystemChoice {
    /// Random Laguerre-Volterra network
    Lvn,
    /// Exponential smoothers followed by exp(sin(.))
    Cascade,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Output directory for train.csv, test.csv and the system description
    #[arg(long, default_value = "data_generated")]
    out_dir: PathBuf,

    /// Kind of ground-truth system
    #[arg(long, value_enum, default_value_t = SystemChoice::Lvn)]
    system: SystemChoice,

    /// Laguerre filters of the ground-truth network
    #[arg(long, default_value_t = 5)]
    filter_order: usize,

    /// Hidden units of the ground-truth network
    #[arg(long, default_value_t = 3)]
    hidden_units: usize,

    /// Polynomial degree of the ground-truth network
    #[arg(long, default_value_t = 4)]
    polynomial_order: usize,

    /// Number of smoothers of the cascade system
    #[arg(long, default_value_t = 3)]
    branches: usize,

    /// Sampling frequency in Hz
    #[arg(long, default_value_t = 25.0)]
    sampling_frequency: f64,

    /// Training samples
    #[arg(long, default_value_t = 1024)]
    train_len: usize,

    /// Test samples
    #[arg(long, default_value_t = 1024)]
    test_len: usize,

    /// Output signal-to-noise ratio in dB (noise-free when absent)
    #[arg(long)]
    snr_db: Option<f64>,

    /// Optional random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Parser, Debug)]
struct OptimizeArgs {
    /// JSON experiment configuration
    #[arg(long)]
    config: PathBuf,

    /// Training signals
    #[arg(long)]
    train: PathBuf,

    /// Held-out signals
    #[arg(long)]
    test: Option<PathBuf>,

    /// Output directory for recorded.csv and best.lvn
    #[arg(long, default_value = "data_generated")]
    out_dir: PathBuf,

    /// Override the seed of the configuration
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Parser, Debug)]
struct EvaluateArgs {
    /// Model file
    #[arg(long)]
    model: PathBuf,

    /// Signal file
    #[arg(long)]
    signals: PathBuf,

    /// Sampling frequency in Hz
    #[arg(long, default_value_t = 25.0)]
    sampling_frequency: f64,
}

#[derive(Parser, Debug)]
struct KernelsArgs {
    /// Model file
    #[arg(long)]
    model: PathBuf,

    /// Sampling frequency in Hz
    #[arg(long, default_value_t = 25.0)]
    sampling_frequency: f64,

    /// Number of lags (defaults to the filter memory of the model)
    #[arg(long)]
    memory: Option<usize>,
}

fn sampling_interval(sampling_frequency: f64) -> Result<f64> {
    if !(sampling_frequency > 0.0 && sampling_frequency.is_finite()) {
        bail!("sampling frequency must be > 0, got {sampling_frequency}");
    }
    Ok(1.0 / sampling_frequency)
}

fn generate(args: GenerateArgs) -> Result<()> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    create_dir_all(&args.out_dir)
        .with_context(|| format!("cannot create {}", args.out_dir.display()))?;

    let system = match args.system {
        SystemChoice::Lvn => {
            let structure = LvnStructure::from_sampling_frequency(
                args.filter_order,
                args.hidden_units,
                args.polynomial_order,
                args.sampling_frequency,
            )?;
            SimulatedSystem::random_lvn(structure, &mut rng)
        }
        SystemChoice::Cascade => {
            SimulatedSystem::Cascade(CascadeSystem::random(args.branches, &mut rng))
        }
    };

    let train = generate_dataset(&system, args.train_len, args.snr_db, &mut rng)?;
    let test = generate_dataset(&system, args.test_len, args.snr_db, &mut rng)?;
    save_signals(args.out_dir.join("train.csv"), &train)?;
    save_signals(args.out_dir.join("test.csv"), &test)?;

    if let SimulatedSystem::Lvn {
        structure,
        parameters,
    } = &system
    {
        save_model(args.out_dir.join("system.lvn"), structure, parameters)?;
    }
    std::fs::write(
        args.out_dir.join("system.json"),
        serde_json::to_string_pretty(&system)?,
    )?;
    println!(
        "wrote {} train and {} test samples to {}",
        train.len(),
        test.len(),
        args.out_dir.display()
    );
    Ok(())
}

fn optimize(args: OptimizeArgs) -> Result<()> {
    let mut config = IdentificationConfig::load(&args.config)
        .with_context(|| format!("cannot load {}", args.config.display()))?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    let train = load_signals(&args.train)
        .with_context(|| format!("cannot load {}", args.train.display()))?;

    let start = Instant::now();
    let identification = identify(&config, &train)?;
    let elapsed = start.elapsed();

    create_dir_all(&args.out_dir)
        .with_context(|| format!("cannot create {}", args.out_dir.display()))?;
    save_recorded(
        args.out_dir.join("recorded.csv"),
        &identification.report.recorded,
    )?;
    save_model(
        args.out_dir.join("best.lvn"),
        &identification.structure,
        &identification.parameters,
    )?;

    let report = &identification.report;
    println!("{}", report.message);
    println!(
        "  iterations: {}  evaluations: {}  time: {:.2}s",
        report.nit,
        report.nfev,
        elapsed.as_secs_f64()
    );
    println!("  best cost: {:.6e}", report.best.cost);
    let train_nmse = test_nmse(&identification.structure, &identification.parameters, &train)?;
    println!("  train NMSE: {train_nmse:.6e}");
    if let Some(path) = &args.test {
        let test = load_signals(path).with_context(|| format!("cannot load {}", path.display()))?;
        let nmse = test_nmse(&identification.structure, &identification.parameters, &test)?;
        println!("  test NMSE: {nmse:.6e}");
    }
    Ok(())
}

fn evaluate(args: EvaluateArgs) -> Result<()> {
    let t = sampling_interval(args.sampling_frequency)?;
    let (structure, params) = load_model(&args.model, t)
        .with_context(|| format!("cannot load {}", args.model.display()))?;
    let signals = load_signals(&args.signals)
        .with_context(|| format!("cannot load {}", args.signals.display()))?;
    println!("{:.6e}", test_nmse(&structure, &params, &signals)?);
    Ok(())
}

fn kernels(args: KernelsArgs) -> Result<()> {
    let t = sampling_interval(args.sampling_frequency)?;
    let (structure, params) = load_model(&args.model, t)
        .with_context(|| format!("cannot load {}", args.model.display()))?;
    let memory = match args.memory {
        Some(m) => m,
        None => laguerre_filter_memory(params.alpha)?.max(1),
    };
    let k1 = first_order_kernel(&structure, &params, memory)?;
    println!("lag,k1");
    for (m, value) in k1.iter().enumerate() {
        println!("{m},{value}");
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => generate(args),
        Command::Optimize(args) => optimize(args),
        Command::Evaluate(args) => evaluate(args),
        Command::Kernels(args) => kernels(args),
    }
}
