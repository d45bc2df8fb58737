//! Sync Engine - clone, bulk clone and sync-all over the repository index
//!
//! Every operation runs strictly sequentially, one repository at a time, in
//! listing or index order. The index is passed in explicitly: clones persist
//! it after each successful repository, sync-all persists it once at the end.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::cancel::CancelFlag;
use crate::config::Config;
use crate::error::{ClonerError, Result};
use crate::git::{self, GitCli, Vcs};
use crate::index::{RepoIndex, RepositoryRecord};
use crate::paths;
use crate::provider::ProviderRegistry;
use crate::url::{parse_git_url, parse_org_user_url};

/// Result of a single clone attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneOutcome {
    /// Working copy created and indexed
    Cloned(RepositoryRecord),
    /// Destination already existed; nothing was done
    Skipped { path: PathBuf },
}

/// Totals for an organization/user clone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkCloneSummary {
    /// Repositories reported by the provider
    pub found: usize,
    pub forks_excluded: usize,
    pub cloned: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Totals for a sync-all run
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub total: usize,
    pub updated: usize,
    pub missing: usize,
    pub failed: usize,
    pub duration: Duration,
}

/// Orchestrates clone / pull / index updates under one root directory
#[derive(Clone)]
pub struct SyncEngine {
    root: PathBuf,
    vcs: Arc<dyn Vcs>,
    providers: ProviderRegistry,
    cancel: CancelFlag,
}

impl SyncEngine {
    pub fn new(root: impl Into<PathBuf>, vcs: Arc<dyn Vcs>, providers: ProviderRegistry) -> Self {
        Self {
            root: root.into(),
            vcs,
            providers,
            cancel: CancelFlag::new(),
        }
    }

    /// Engine backed by the `git` executable and the default provider registry
    pub fn from_config(config: &Config, root: impl Into<PathBuf>) -> Result<Self> {
        let providers = crate::github::default_registry(&config.github)?;
        Ok(Self::new(root, Arc::new(GitCli::new(&config.git)), providers))
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Open the index kept under this engine's root
    pub fn open_index(&self) -> Result<RepoIndex> {
        RepoIndex::load_for_root(&self.root)
    }

    /// Clone one repository and record it in the index.
    ///
    /// An existing destination is a skip, not an error.
    pub async fn clone_one(
        &self,
        index: &mut RepoIndex,
        url: &str,
        branch: Option<&str>,
    ) -> Result<CloneOutcome> {
        let id = parse_git_url(url)?;
        let local_path = paths::resolve_id(&self.root, &id);

        if local_path.exists() {
            println!("Repository already exists at: {}", local_path.display());
            println!("Use --sync to update existing repositories");
            return Ok(CloneOutcome::Skipped { path: local_path });
        }

        if let Some(parent) = local_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClonerError::io(format!("Failed to create {}", parent.display()), e)
            })?;
        }

        println!("Cloning {} to {}", url, local_path.display());
        self.vcs.clone_repo(url, &local_path, branch).await?;

        let (current_branch, commit_hash) = git::inspect(self.vcs.as_ref(), &local_path).await?;
        let record = RepositoryRecord::new(url, &local_path, &id, current_branch, commit_hash);
        index.upsert(record.clone())?;

        info!("Indexed {} at {}", url, local_path.display());
        println!("Successfully cloned and indexed repository");
        println!("Local path: {}", local_path.display());
        println!("Branch: {}", record.branch);
        println!("Commit: {}", record.last_hash);

        Ok(CloneOutcome::Cloned(record))
    }

    /// Clone every repository of an organization or user.
    ///
    /// Per-repository failures are reported and counted; they never abort the batch.
    pub async fn clone_organization(
        &self,
        index: &mut RepoIndex,
        url: &str,
        branch: Option<&str>,
        include_forks: bool,
    ) -> Result<BulkCloneSummary> {
        let owner = parse_org_user_url(url)?;
        println!("Fetching repositories for {} from {}...", owner.name, owner.host);

        // Listing can sit in a rate-limit cooldown indefinitely; an interrupt drops it
        let mut repos = tokio::select! {
            listed = self.providers.list_repositories(&owner.host, &owner.name) => listed?,
            _ = self.cancel.cancelled() => return Err(ClonerError::Cancelled),
        };

        let mut summary = BulkCloneSummary {
            found: repos.len(),
            ..Default::default()
        };

        if repos.is_empty() {
            println!("No repositories found for {}", owner.name);
            return Ok(summary);
        }

        if !include_forks {
            repos.retain(|repo| !repo.fork);
            summary.forks_excluded = summary.found - repos.len();
            if summary.forks_excluded > 0 {
                println!("Filtered out {} forks", summary.forks_excluded);
            }
        }

        println!("Found {} repositories to clone", repos.len());

        for repo in &repos {
            self.cancel.check()?;

            println!("\n📦 Cloning {}/{}", owner.name, repo.name);
            if !repo.description.is_empty() {
                println!("   📝 {}", repo.description);
            }

            match self.clone_one(index, &repo.clone_url, branch).await {
                Ok(CloneOutcome::Cloned(_)) => summary.cloned += 1,
                Ok(CloneOutcome::Skipped { .. }) => summary.skipped += 1,
                Err(e) => {
                    warn!("Clone of {} failed: {}", repo.clone_url, e);
                    println!("❌ Failed to clone {}: {}", repo.name, e);
                    summary.failed += 1;
                }
            }
        }

        println!("\n✅ Bulk clone complete!");
        println!("   📦 Cloned: {} repositories", summary.cloned);
        println!("   ⏭️  Skipped: {} repositories", summary.skipped);
        println!("   ❌ Failed: {} repositories", summary.failed);

        Ok(summary)
    }

    /// Pull every indexed repository and refresh its branch and commit.
    ///
    /// Missing working copies are reported and left untouched. The index is
    /// written once, after the loop; an interrupted run writes nothing.
    pub async fn sync_all(&self, index: &mut RepoIndex) -> Result<SyncSummary> {
        let start = Instant::now();
        let mut summary = SyncSummary {
            total: index.len(),
            ..Default::default()
        };

        if index.is_empty() {
            println!("No repositories found in index");
            return Ok(summary);
        }

        println!("Syncing {} repositories...", index.len());

        for i in 0..index.len() {
            self.cancel.check()?;

            let mut record = index.records()[i].clone();
            let name = record.full_name();

            if !record.local_path.exists() {
                println!("⚠️  Repository not found: {}", record.local_path.display());
                summary.missing += 1;
                continue;
            }

            println!("📥 Syncing {}", name);
            match self.refresh(&record.local_path).await {
                Ok((branch, hash)) => {
                    record.observe(branch, hash);
                    println!("✅ Updated {} ({})", name, record.short_hash());
                    // Positional: duplicate URLs in a hand-edited index stay distinct
                    index.records_mut()[i] = record;
                    summary.updated += 1;
                }
                Err(e) => {
                    warn!("Sync of {} failed: {}", record.url, e);
                    println!("❌ Failed to sync {}: {}", name, e);
                    summary.failed += 1;
                }
            }
        }

        index.save()?;
        summary.duration = start.elapsed();
        debug!("Sync finished in {:.2}s", summary.duration.as_secs_f64());
        println!("Sync complete!");

        Ok(summary)
    }

    async fn refresh(&self, path: &Path) -> Result<(String, String)> {
        self.vcs.pull(path).await?;
        git::inspect(self.vcs.as_ref(), path).await
    }
}
