use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use git_cloner::url::{parse_target, Target};
use git_cloner::{CancelFlag, ClonerError, CloneOutcome, Config, RepoIndex, SyncEngine};

#[derive(Parser)]
#[command(name = "git-cloner")]
#[command(about = "Clone git repositories into an organized directory structure and keep them in sync")]
#[command(version)]
struct Cli {
    /// Repository URL, or organization/user URL to clone every repository of
    git_url: Option<String>,

    /// Pull every repository in the index
    #[arg(long)]
    sync: bool,

    /// List every repository in the index
    #[arg(long)]
    list: bool,

    /// Root directory for repositories (defaults to $REPOS_BASE_DIR or ~/code)
    #[arg(long, value_name = "PATH")]
    base_dir: Option<String>,

    /// Branch to check out when cloning
    #[arg(long)]
    branch: Option<String>,

    /// Include forked repositories when cloning an organization or user
    #[arg(long)]
    include_forks: bool,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

enum Operation<'a> {
    Clone(&'a str),
    Sync,
    List,
}

impl Cli {
    fn operations(&self) -> Vec<Operation<'_>> {
        let mut ops = Vec::new();
        if let Some(url) = &self.git_url {
            ops.push(Operation::Clone(url));
        }
        if self.sync {
            ops.push(Operation::Sync);
        }
        if self.list {
            ops.push(Operation::List);
        }
        ops
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            if matches!(e.downcast_ref::<ClonerError>(), Some(ClonerError::Cancelled)) {
                println!("\nOperation cancelled by user");
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let operation = {
        let mut ops = cli.operations();
        match ops.len() {
            0 => {
                Cli::command().print_help()?;
                return Ok(ExitCode::FAILURE);
            }
            1 => ops.remove(0),
            _ => {
                println!("Error: Please specify only one operation");
                return Ok(ExitCode::FAILURE);
            }
        }
    };

    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.verbose, &config.logging.level)?;
    info!("Starting git-cloner v{}", env!("CARGO_PKG_VERSION"));

    let root = config.resolve_base_dir(cli.base_dir.as_deref())?;
    std::fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create base directory: {}", root.display()))?;
    debug!("Repository root: {}", root.display());

    match operation {
        Operation::List => {
            cmd_list(&RepoIndex::load_for_root(&root)?);
            Ok(ExitCode::SUCCESS)
        }
        Operation::Sync => {
            let engine = engine(&config, &root)?;
            let mut index = engine.open_index()?;
            engine.sync_all(&mut index).await?;
            Ok(ExitCode::SUCCESS)
        }
        Operation::Clone(url) => {
            let engine = engine(&config, &root)?;
            let mut index = engine.open_index()?;
            let branch = cli.branch.as_deref();
            let succeeded = match parse_target(url)? {
                Target::Owner(_) => {
                    let summary = engine
                        .clone_organization(&mut index, url, branch, cli.include_forks)
                        .await?;
                    summary.cloned > 0
                }
                Target::Repository(_) => matches!(
                    engine.clone_one(&mut index, url, branch).await?,
                    CloneOutcome::Cloned(_)
                ),
            };
            Ok(if succeeded {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// Sync engine wired to Ctrl-C: the repository in flight finishes, the rest are abandoned
fn engine(config: &Config, root: &Path) -> Result<SyncEngine> {
    let cancel = CancelFlag::new();
    let listener = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current repository");
            listener.cancel();
        }
    });

    Ok(SyncEngine::from_config(config, root)?.with_cancel_flag(cancel))
}

fn cmd_list(index: &RepoIndex) {
    if index.is_empty() {
        println!("No repositories found in index");
        return;
    }

    println!("Tracked repositories ({}):", index.len());
    for record in index.records() {
        println!("\n📁 {}", record.full_name());
        println!("   URL: {}", record.url);
        println!("   Path: {}", record.local_path.display());
        println!("   Branch: {}", record.branch);
        println!("   Last Hash: {}...", record.short_hash());
        println!("   Last Pull: {}", record.last_pull);
    }
}

/// Initialize logging; RUST_LOG wins, then --verbose, then the configured level
fn init_logging(verbose: bool, level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(),
    }
}
