//! Spinel CLI - knowledge graph completion from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Train with a YAML config, flags override file values
//! spinel train --config kinship.yaml
//! spinel train --config kinship.yaml --model complex --epochs 200
//!
//! # Evaluate a saved checkpoint on the test split
//! spinel evaluate --config kinship.yaml --checkpoint runs/kinship_complex/best.ckpt
//! ```
//!
//! Each run writes its metric lines to `<out_dir>/<dataset>_<model>/log.txt`
//! and keeps the checkpoint with the best validation MRR next to it.

mod config;
mod logger;

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use config::{Overrides, RunConfig};
use indicatif::ProgressBar;
use logger::Logger;
use spinel_core::{eval_batches, Dataset, FilterIndex, Split};
use spinel_kge::{evaluate, log_pass_header, train, Checkpoint, ScoreModel};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "spinel")]
#[command(about = "Knowledge graph completion: train and evaluate link-prediction models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model and checkpoint the best validation MRR
    Train {
        /// YAML configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Dataset directory (overrides the config file)
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Model tag: distmult, complex or transe
        #[arg(long)]
        model: Option<String>,

        /// Embedding dimension
        #[arg(long)]
        embedding_dim: Option<usize>,

        /// Number of epochs
        #[arg(long)]
        epochs: Option<usize>,

        /// Batch size
        #[arg(long)]
        batch_size: Option<usize>,

        /// Learning rate
        #[arg(long)]
        lr: Option<f32>,

        /// Device tag (cpu)
        #[arg(long)]
        device: Option<String>,

        /// Initialization seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output root directory
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Resume from an existing checkpoint
        #[arg(long)]
        resume: Option<PathBuf>,
    },

    /// Evaluate a checkpoint with the filtered ranking protocol
    Evaluate {
        /// YAML configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Checkpoint to evaluate
        #[arg(long)]
        checkpoint: PathBuf,

        /// Split to evaluate: valid or test
        #[arg(long, default_value = "test")]
        split: Split,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            config,
            dataset,
            model,
            embedding_dim,
            epochs,
            batch_size,
            lr,
            device,
            seed,
            out_dir,
            resume,
        } => {
            let mut run = RunConfig::load(&config)?;
            run.apply(Overrides {
                dataset,
                model,
                embedding_dim,
                epochs,
                batch_size,
                lr,
                device,
                seed,
                out_dir,
            });
            cmd_train(run, resume)
        }
        Commands::Evaluate {
            config,
            checkpoint,
            split,
        } => {
            let run = RunConfig::load(&config)?;
            cmd_evaluate(run, &checkpoint, split)
        }
    }
}

fn load_dataset(run: &RunConfig) -> Result<(Dataset, FilterIndex)> {
    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Loading {}...", run.dataset.display()));

    let dataset = Dataset::load(&run.dataset)
        .with_context(|| format!("failed to load dataset {}", run.dataset.display()))?;
    let filters = FilterIndex::build(&dataset);

    pb.finish_with_message(format!(
        "Loaded {} entities, {} relations, {}/{}/{} triples in {:.2?}",
        dataset.num_entities(),
        dataset.relations.base_len(),
        dataset.train.len(),
        dataset.valid.len(),
        dataset.test.len(),
        start.elapsed()
    ));

    Ok((dataset, filters))
}

fn build_model(run: &RunConfig, dataset: &Dataset) -> Result<Box<dyn ScoreModel>> {
    // resolve tags before touching any data: bad configuration must fail fast
    let kind = run.model_kind()?;
    let model_config = run.model_config()?;
    Ok(kind.build(dataset.num_entities(), dataset.num_relations(), &model_config))
}

fn cmd_train(run: RunConfig, resume: Option<PathBuf>) -> Result<()> {
    // validate model and device tags first
    let kind = run.model_kind()?;
    run.parse_device()?;

    let (dataset, filters) = load_dataset(&run)?;
    ensure!(
        !dataset.valid.is_empty(),
        "validation split is empty; cannot select a best checkpoint"
    );

    let mut model = build_model(&run, &dataset)?;
    if let Some(path) = &resume {
        let checkpoint = Checkpoint::load(path)
            .with_context(|| format!("failed to load checkpoint {}", path.display()))?;
        checkpoint.restore(model.as_mut())?;
        println!(
            "Resumed {} from {} (epoch {}, MRR {:.4})",
            kind,
            path.display(),
            checkpoint.epoch,
            checkpoint.mrr
        );
    }

    let run_dir = run.run_dir();
    let header = serde_json::to_string_pretty(&run).context("failed to render config header")?;
    let mut logger = Logger::create(&run_dir, &header)
        .with_context(|| format!("failed to create log in {}", run_dir.display()))?;

    let checkpoint_path = run.checkpoint_path();
    let train_config = run.train_config();

    let start = Instant::now();
    let outcome = {
        let mut sink = |line: &str| logger.write(line);
        train(
            model.as_mut(),
            &dataset,
            &filters,
            &train_config,
            Some(checkpoint_path.as_path()),
            &mut sink,
        )?
    };

    logger.write(&format!(
        "training finished in {:.2?}; best dev MRR {:.4}{}",
        start.elapsed(),
        outcome.best_mrr,
        match outcome.best_epoch {
            Some(epoch) => format!(" at epoch {}", epoch),
            None => String::new(),
        }
    ));

    // final pass over the held-out test split with the last model state
    log_pass_header(&mut |line: &str| logger.write(line), "test_evaluation");
    let report = evaluate(
        model.as_ref(),
        eval_batches(&dataset.test, &dataset, &filters, train_config.batch_size),
    )?;
    for line in report.log_lines() {
        logger.write(&line);
    }
    logger.write(&report.summary());
    logger.flush()?;

    Ok(())
}

fn cmd_evaluate(run: RunConfig, checkpoint_path: &PathBuf, split: Split) -> Result<()> {
    run.model_kind()?;
    run.parse_device()?;

    let (dataset, filters) = load_dataset(&run)?;
    let mut model = build_model(&run, &dataset)?;

    let checkpoint = Checkpoint::load(checkpoint_path)
        .with_context(|| format!("failed to load checkpoint {}", checkpoint_path.display()))?;
    checkpoint.restore(model.as_mut())?;

    let name = match split {
        Split::Train => "train_evaluation",
        Split::Valid => "dev_evaluation",
        Split::Test => "test_evaluation",
    };
    let mut sink = |line: &str| println!("{}", line);
    log_pass_header(&mut sink, name);

    let report = evaluate(
        model.as_ref(),
        eval_batches(dataset.split(split), &dataset, &filters, run.batch_size),
    )?;
    for line in report.log_lines() {
        println!("{}", line);
    }
    println!("{}", report.summary());

    Ok(())
}
