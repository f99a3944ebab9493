//! Command-line driver for architecture sweeps.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ferrite_sweep::data::import_images;
use ferrite_sweep::eval::{distances, embed, first_of_each_class, score_folder, score_idx};
use ferrite_sweep::network::assemble_with;
use ferrite_sweep::sweep::{SweepContext, TrialRunner};
use ferrite_sweep::{NativeBackend, Network, SweepConfig};

#[derive(Parser)]
#[command(name = "ferrite-sweep")]
#[command(about = "Hyperparameter sweeps over small convolutional classifiers")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default sweep configuration
    InitConfig {
        path: PathBuf,
    },

    /// Print the architecture of the baseline and every configuration
    Summary {
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Run the full sweep
    Sweep {
        #[arg(short, long)]
        config: PathBuf,

        /// Where to write the report JSON
        #[arg(short, long, default_value = "sweep_report.json")]
        out: PathBuf,
    },

    /// Train and evaluate the baseline only, then save the model
    Train {
        #[arg(short, long)]
        config: PathBuf,

        #[arg(short, long, default_value = "model.json")]
        out: PathBuf,
    },

    /// Score a saved model on held-out images
    Evaluate {
        /// Trained model JSON
        #[arg(short, long)]
        model: PathBuf,

        /// Folder of `<category>_<n>.png` images, or an IDX image file with `--labels`
        #[arg(short, long)]
        images: PathBuf,

        /// IDX label file matching `--images`
        #[arg(short, long)]
        labels: Option<PathBuf>,

        /// Category order used in training, e.g. `alpha,beta,gamma`
        #[arg(short, long, value_delimiter = ',')]
        categories: Vec<String>,
    },

    /// Embedding distances from the first image of each category
    Distances {
        /// Trained model JSON
        #[arg(short, long)]
        model: PathBuf,

        /// Folder of `<category>_<n>.png` images
        #[arg(short, long)]
        images: PathBuf,

        /// Number of layers to run before reading the embedding
        #[arg(short, long, default_value = "1")]
        stage: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::InitConfig { path } => {
            SweepConfig::default()
                .save_json(path_str(&path)?)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "default configuration written");
        }
        Commands::Summary { config } => summary(&load_config(&config)?)?,
        Commands::Sweep { config, out } => run_sweep(&load_config(&config)?, &out)?,
        Commands::Train { config, out } => train_baseline(&load_config(&config)?, &out)?,
        Commands::Evaluate { model, images, labels, categories } => {
            evaluate_saved(&model, &images, labels.as_deref(), categories)?
        }
        Commands::Distances { model, images, stage } => print_distances(&model, &images, stage)?,
    }

    Ok(())
}

fn path_str(path: &std::path::Path) -> Result<&str> {
    path.to_str().with_context(|| format!("path is not valid UTF-8: {}", path.display()))
}

fn load_config(path: &std::path::Path) -> Result<SweepConfig> {
    SweepConfig::load_json(path_str(path)?).with_context(|| format!("reading config {}", path.display()))
}

fn native_context(config: &SweepConfig) -> SweepContext<NativeBackend> {
    let runner = TrialRunner::new(NativeBackend::new(), config.training.clone());
    let mut ctx = SweepContext::new(
        config.domain.clone(),
        config.input_shape,
        config.n_classes,
        config.baseline,
        runner,
    );
    ctx.rules = config.rules;
    ctx
}

fn summary(config: &SweepConfig) -> Result<()> {
    let total = config.domain.checked_size()?;
    let baseline = assemble_with(&config.rules, config.input_shape, config.n_classes, &config.baseline, "baseline")?;
    println!("{}", baseline.summary());
    for c in config.domain.configurations() {
        let description = assemble_with(&config.rules, config.input_shape, config.n_classes, &c, c.to_string())?;
        println!("{}", description.summary());
    }
    println!("{total} configurations plus baseline");
    Ok(())
}

fn run_sweep(config: &SweepConfig, out: &std::path::Path) -> Result<()> {
    let data = config.load_datasets().context("loading datasets")?;
    print_categories(&data.categories);
    let mut ctx = native_context(config);

    let report = ctx.run(&data.train, &data.test)?;
    println!("{}", report.summary_table());
    report.save_json(path_str(out)?).with_context(|| format!("writing {}", out.display()))?;
    info!(path = %out.display(), "report saved");
    Ok(())
}

fn train_baseline(config: &SweepConfig, out: &std::path::Path) -> Result<()> {
    let data = config.load_datasets().context("loading datasets")?;
    print_categories(&data.categories);
    let mut ctx = native_context(config);
    println!("{}", ctx.describe(None)?.summary());

    let (model, result) = ctx.run_baseline(&data.train, &data.test)?;
    for s in &result.training_curve {
        println!(
            "epoch {:>3}/{}  loss {:.4}  acc {:.4}  val_acc {}",
            s.epoch,
            s.total_epochs,
            s.train_loss,
            s.train_accuracy,
            s.val_accuracy.map_or_else(|| "-".to_owned(), |v| format!("{v:.4}"))
        );
    }
    println!("test loss {:.4}  test accuracy {:.4}", result.test_score.loss, result.test_score.accuracy);

    model.save_json(path_str(out)?).with_context(|| format!("writing {}", out.display()))?;
    info!(path = %out.display(), "model saved");
    Ok(())
}

fn evaluate_saved(
    model: &std::path::Path,
    images: &std::path::Path,
    labels: Option<&std::path::Path>,
    categories: Vec<String>,
) -> Result<()> {
    let mut network = Network::load_json(path_str(model)?).with_context(|| format!("reading {}", model.display()))?;
    let score = match labels {
        Some(labels) => score_idx(&mut network, images, labels)?,
        None => {
            let (score, categories) = score_folder(&mut network, images, categories)?;
            print_categories(&categories);
            score
        }
    };
    println!("test loss {:.4}  test accuracy {:.4}", score.loss, score.accuracy);
    Ok(())
}

/// Label order of image-folder data; empty for IDX sets.
fn print_categories(categories: &[String]) {
    if !categories.is_empty() {
        println!("categories: {}", categories.join(","));
    }
}

fn print_distances(model: &std::path::Path, images: &std::path::Path, stage: usize) -> Result<()> {
    let mut network = Network::load_json(path_str(model)?).with_context(|| format!("reading {}", model.display()))?;
    if stage > network.layers.len() {
        bail!("model has {} layers, cannot stop after {stage}", network.layers.len());
    }
    let n_classes = network.n_outputs().context("model has no dense output layer")?;
    let (data, categories) = import_images(images, network.input_shape, n_classes, Vec::new())?;

    let embeddings = embed(&mut network, &data, stage);
    for anchor in first_of_each_class(&data) {
        let name = |label: usize| categories.get(label).map_or("?", String::as_str);
        let anchor_label = ferrite_sweep::loss::cross_entropy::argmax(&data.labels[anchor]);
        println!("anchor #{anchor} ({})", name(anchor_label));
        for row in distances(&embeddings, &data.labels, anchor) {
            println!("  #{:<4} {:<12} {:.4}", row.index, name(row.label), row.distance);
        }
    }
    Ok(())
}
