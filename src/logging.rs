use std::path::{Path, PathBuf};

use anyhow::Context;
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming};

use crate::config;

/// Per-run logging choices taken from the command line.
#[derive(Debug, Clone, Copy)]
pub struct LogOptions<'a> {
    /// Overrides `~/.corpus-vectors/logs`.
    pub dir: Option<&'a Path>,
    /// Echo info-level progress (sampling counts, epoch losses) to stderr.
    pub verbose: bool,
    /// Subcommand name; each one logs to its own rotating file.
    pub command: &'a str,
}

/// Start the file logger for one subcommand run.
pub fn init_logging(opts: LogOptions<'_>) -> anyhow::Result<()> {
    let log_dir = resolve_log_dir(opts.dir, home_dir()).context("cannot determine home directory for logs")?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed creating log dir {}", log_dir.display()))?;

    Logger::try_with_str("debug")?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir.clone())
                .basename(config::logging::LOG_FILE_NAME)
                .discriminant(opts.command),
        )
        .rotate(
            Criterion::Size(config::logging::LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config::logging::LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stderr(stderr_level(opts.verbose))
        .format(flexi_logger::detailed_format)
        .start()
        .context("failed to start logger")?;

    log::info!("{}", "=".repeat(60));
    log::info!("corpus-vectors {} ({})", config::TOOL_VERSION, std::env::consts::OS);
    log::info!("Subcommand: {}", opts.command);
    log::info!("Log dir: {}", log_dir.display());
    log::info!("{}", "=".repeat(60));

    Ok(())
}

/// Subcommand stdout carries results, so stderr stays at warnings unless asked.
fn stderr_level(verbose: bool) -> Duplicate {
    if verbose {
        Duplicate::Info
    } else {
        Duplicate::Warn
    }
}

/// An explicit directory wins; otherwise logs live under the home directory.
fn resolve_log_dir(explicit: Option<&Path>, home: Option<PathBuf>) -> Option<PathBuf> {
    match explicit {
        Some(dir) => Some(dir.to_path_buf()),
        None => home.map(|h| h.join(config::logging::LOG_DIR_REL)),
    }
}

fn home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .find(|v| !v.is_empty())
        .map(PathBuf::from)
}
