mod config;
mod corpus;
mod embeddings;
mod logging;
mod manifest;
mod pairs;
mod pipeline;
mod vocab;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use candle_core::Device;

use crate::config::{PipelineConfig, SubsamplingMode};
use crate::embeddings::{neighbors, store, train};
use crate::logging::LogOptions;
use crate::manifest::RunManifest;
use crate::pairs::SkipGramSampler;
use crate::pipeline::PipelineContext;
use crate::vocab::Vocabulary;

const USAGE: &str = "\
usage:
  corpus_vectors index     --types <file> --out <index.tsv>
  corpus_vectors pairs     --tokens <file> --types <file> --out <pairs.tsv>
  corpus_vectors train     --tokens <file> --types <file> --out-dir <dir>
  corpus_vectors neighbors --embeddings <file> --index <index.tsv> --word <w> [--top <k>]

options (any subcommand):
  --config <file.json>   pipeline settings (JSON); flags below override it
  --seed <u64>           seed every random draw
  --window <n>           skip-gram window (default 4)
  --epochs <n>  --dims <n>  --batch-size <n>  --learning-rate <x>
  --negative-ratio <x>   negatives per positive (default 1.0)
  --subsampling <frequency|rank|none>
  --no-shuffle           keep pairs in generation order
  --log-dir <dir>        where the per-subcommand log goes (default ~/.corpus-vectors/logs)
  --verbose              echo progress to stderr";

fn main() {
    if let Err(e) = real_main() {
        eprintln!("[corpus-vectors] fatal error: {e:?}");
        log::error!("Fatal error: {:?}", e);
        std::process::exit(1);
    }
}

fn real_main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1).map(String::as_str) else {
        bail!("missing subcommand\n{USAGE}");
    };
    if command == "--help" || command == "-h" || command == "help" {
        println!("{USAGE}");
        return Ok(());
    }

    let log_dir = read_arg_value(&args, "--log-dir").map(PathBuf::from);
    logging::init_logging(LogOptions {
        dir: log_dir.as_deref(),
        verbose: args.iter().any(|a| a == "--verbose"),
        command,
    })?;
    log::info!("Command: {}", args[1..].join(" "));

    let result = match command {
        "index" => handle_index(&args),
        "pairs" => handle_pairs(&args),
        "train" => handle_train(&args),
        "neighbors" => handle_neighbors(&args),
        _ => bail!("unknown subcommand: {command}\n{USAGE}"),
    };

    log::info!("=== corpus-vectors finished: {} ===", command);
    result
}

fn handle_index(args: &[String]) -> anyhow::Result<()> {
    let types_path = required_path(args, "--types")?;
    let out = required_path(args, "--out")?;

    let vocab = Vocabulary::from_types(corpus::read_list(&types_path)?);
    vocab.write_index(&out)?;
    println!("{} words -> {}", vocab.len(), out.display());
    Ok(())
}

fn handle_pairs(args: &[String]) -> anyhow::Result<()> {
    let cfg = load_config(args)?;
    let tokens_path = required_path(args, "--tokens")?;
    let types_path = required_path(args, "--types")?;
    let out = required_path(args, "--out")?;

    let ctx = PipelineContext::from_files(&tokens_path, &types_path)?;
    let pairs = SkipGramSampler::new(&ctx, &cfg)?.sample(&ctx.sequence);
    pairs::write_pairs(&out, &pairs)?;

    let (positives, negatives) = pairs::label_counts(&pairs);
    println!(
        "{} pairs ({} positive, {} negative) -> {}",
        pairs.len(),
        positives,
        negatives,
        out.display()
    );
    Ok(())
}

fn handle_train(args: &[String]) -> anyhow::Result<()> {
    let cfg = load_config(args)?;
    let tokens_path = required_path(args, "--tokens")?;
    let types_path = required_path(args, "--types")?;
    let out_dir = required_path(args, "--out-dir")?;

    let ctx = PipelineContext::from_files(&tokens_path, &types_path)?;
    let (model, history) = train::train(&ctx, &cfg)?;

    let index_path = out_dir.join(config::output::WORD_INDEX_FILE);
    let embeddings_path = out_dir.join(config::output::EMBEDDINGS_FILE);
    ctx.vocab.write_index(&index_path)?;
    store::save_embeddings(model.table(), &embeddings_path)?;

    let (_, dims) = model.dims()?;
    let manifest = RunManifest {
        tool_version: config::TOOL_VERSION.to_string(),
        created_at: manifest::now_rfc3339(),
        config: cfg,
        vocab_size: ctx.vocab.len(),
        embedding_dims: dims,
        tokens: ctx.sequence.len(),
        oov_tokens: ctx.oov_tokens,
        word_index_sha256: manifest::sha256_file(&index_path)?,
        embeddings_sha256: manifest::sha256_file(&embeddings_path)?,
        epochs: history,
    };
    manifest.write(&out_dir.join(config::output::MANIFEST_FILE))?;

    let final_loss = manifest.epochs.last().map(|e| e.mean_loss).unwrap_or(f32::NAN);
    println!(
        "{}x{} embeddings, final loss {:.4} -> {}",
        ctx.vocab.table_rows(),
        dims,
        final_loss,
        out_dir.display()
    );
    Ok(())
}

fn handle_neighbors(args: &[String]) -> anyhow::Result<()> {
    let embeddings_path = required_path(args, "--embeddings")?;
    let index_path = required_path(args, "--index")?;
    let word = read_arg_value(args, "--word").context("missing --word")?;
    let top = match read_arg_value(args, "--top") {
        Some(v) => parse_flag::<usize>("--top", &v)?,
        None => config::training::DEFAULT_NEIGHBORS,
    };

    manifest::verify_embeddings(&embeddings_path)?;
    let table = store::load_embeddings(&embeddings_path, &Device::Cpu)?;
    let vocab = Vocabulary::read_index(&index_path)?;

    for (neighbor, sim) in neighbors::nearest(&table, &vocab, &word, top)? {
        println!("{neighbor}\t{sim:.4}");
    }
    Ok(())
}

/// Defaults, then `--config`, then individual flags.
fn load_config(args: &[String]) -> anyhow::Result<PipelineConfig> {
    let mut cfg = match read_arg_value(args, "--config") {
        Some(path) => PipelineConfig::from_json_file(Path::new(&path))?,
        None => PipelineConfig::default(),
    };

    if let Some(v) = read_arg_value(args, "--seed") {
        cfg.seed = Some(parse_flag("--seed", &v)?);
    }
    if let Some(v) = read_arg_value(args, "--window") {
        cfg.window_size = parse_flag("--window", &v)?;
    }
    if let Some(v) = read_arg_value(args, "--epochs") {
        cfg.epochs = parse_flag("--epochs", &v)?;
    }
    if let Some(v) = read_arg_value(args, "--dims") {
        cfg.embedding_dims = parse_flag("--dims", &v)?;
    }
    if let Some(v) = read_arg_value(args, "--batch-size") {
        cfg.batch_size = parse_flag("--batch-size", &v)?;
    }
    if let Some(v) = read_arg_value(args, "--learning-rate") {
        cfg.learning_rate = parse_flag("--learning-rate", &v)?;
    }
    if let Some(v) = read_arg_value(args, "--negative-ratio") {
        cfg.negative_ratio = parse_flag("--negative-ratio", &v)?;
    }
    if let Some(v) = read_arg_value(args, "--subsampling") {
        cfg.subsampling = match v.as_str() {
            "frequency" => SubsamplingMode::Frequency,
            "rank" => SubsamplingMode::Rank,
            "none" => SubsamplingMode::None,
            other => bail!("--subsampling must be frequency, rank or none (got '{other}')"),
        };
    }
    if args.iter().any(|a| a == "--no-shuffle") {
        cfg.shuffle = false;
    }

    cfg.validate()?;
    log::info!("Effective config: {:?}", cfg);
    Ok(cfg)
}

fn read_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn required_path(args: &[String], key: &str) -> anyhow::Result<PathBuf> {
    read_arg_value(args, key)
        .map(PathBuf::from)
        .with_context(|| format!("missing {key}"))
}

fn parse_flag<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("invalid value for {key}: '{value}'"))
}
