use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::config::GitConfig;
use crate::error::{ClonerError, Result};

/// The four version-control operations the sync engine relies on.
///
/// Each call blocks the caller until the operation finishes; a non-zero exit
/// is a hard failure for that operation.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Clone `url` into `dest`, optionally checking out `branch`
    async fn clone_repo(&self, url: &str, dest: &Path, branch: Option<&str>) -> Result<()>;

    /// Pull the latest changes from the default remote
    async fn pull(&self, path: &Path) -> Result<()>;

    /// Name of the checked-out branch (empty when detached)
    async fn current_branch(&self, path: &Path) -> Result<String>;

    /// Full hash of the HEAD commit
    async fn head_commit(&self, path: &Path) -> Result<String>;
}

/// [`Vcs`] backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: String,
    timeout: Option<Duration>,
}

impl GitCli {
    pub fn new(config: &GitConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: config.timeout(),
        }
    }

    async fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<Output> {
        let command = format!("{} {}", self.binary, args.join(" "));
        debug!("Running: {}", command);

        let mut cmd = AsyncCommand::new(&self.binary);
        cmd.args(args).kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| ClonerError::Timeout {
                    operation: command.clone(),
                    after: limit,
                })?,
            None => cmd.output().await,
        }
        .map_err(|e| ClonerError::Subprocess {
            command: command.clone(),
            status: "not started".to_string(),
            stderr: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(ClonerError::Subprocess {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }

    async fn query(&self, args: &[&str], path: &Path) -> Result<String> {
        let output = self.run(args, Some(path)).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(&GitConfig::default())
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn clone_repo(&self, url: &str, dest: &Path, branch: Option<&str>) -> Result<()> {
        let dest_str = dest.to_string_lossy();
        let mut args: Vec<&str> = vec!["clone", url, &dest_str];
        if let Some(branch) = branch {
            args.extend(["-b", branch]);
        }
        self.run(&args, None).await?;
        Ok(())
    }

    async fn pull(&self, path: &Path) -> Result<()> {
        self.run(&["pull", "origin"], Some(path)).await?;
        Ok(())
    }

    async fn current_branch(&self, path: &Path) -> Result<String> {
        self.query(&["branch", "--show-current"], path).await
    }

    async fn head_commit(&self, path: &Path) -> Result<String> {
        self.query(&["rev-parse", "HEAD"], path).await
    }
}

/// Branch and HEAD of a working copy
pub async fn inspect(vcs: &dyn Vcs, path: &Path) -> Result<(String, String)> {
    let branch = vcs.current_branch(path).await?;
    let hash = vcs.head_commit(path).await?;
    Ok((branch, hash))
}
