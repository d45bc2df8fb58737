//! Repository Index - line-delimited JSON record of every tracked working copy
//!
//! The index lives at `<root>/repos.jsonl`, one [`RepositoryRecord`] per line,
//! keyed by the exact URL the repository was cloned from. It is the only
//! durable state the tool keeps.
//!
//! The whole file is read into a [`RepoIndex`] value, mutated in memory and
//! written back in one piece. Writes go to a sibling temp file that is then
//! renamed over the index, so a crash never leaves a torn line behind.
//!
//! There is no locking: two processes working on the same root can overwrite
//! each other's updates.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ClonerError, Result};
use crate::url::RepoId;

/// One tracked repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Clone URL exactly as supplied; unique key
    pub url: String,
    pub local_path: PathBuf,
    pub host: String,
    pub org: String,
    pub repo: String,
    /// Last observed checked-out branch
    pub branch: String,
    /// Last observed HEAD commit
    pub last_hash: String,
    /// ISO-8601 time of the last successful clone or pull
    pub last_pull: String,
}

impl RepositoryRecord {
    pub fn new(
        url: impl Into<String>,
        local_path: impl Into<PathBuf>,
        id: &RepoId,
        branch: impl Into<String>,
        last_hash: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            local_path: local_path.into(),
            host: id.host.clone(),
            org: id.org.clone(),
            repo: id.repo.clone(),
            branch: branch.into(),
            last_hash: last_hash.into(),
            last_pull: timestamp_now(),
        }
    }

    /// `org/repo` display form
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }

    /// First eight characters of the last known commit
    pub fn short_hash(&self) -> &str {
        self.last_hash.get(..8).unwrap_or(&self.last_hash)
    }

    /// Record a fresh observation of the working copy
    pub fn observe(&mut self, branch: String, last_hash: String) {
        self.branch = branch;
        self.last_hash = last_hash;
        self.last_pull = timestamp_now();
    }
}

/// Current time in a sortable ISO-8601 form
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Whether an upsert replaced an existing record or appended a new one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Replaced(usize),
    Appended(usize),
}

/// In-memory view of the index file
#[derive(Debug, Clone)]
pub struct RepoIndex {
    path: PathBuf,
    records: Vec<RepositoryRecord>,
}

impl RepoIndex {
    /// Read the index at `path`.
    ///
    /// A missing file is an empty index. Blank lines are ignored. Any other
    /// unreadable or malformed content fails the whole read.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No index at {}, starting empty", path.display());
                return Ok(Self {
                    path,
                    records: Vec::new(),
                });
            }
            Err(source) => {
                return Err(ClonerError::Index {
                    path,
                    line: None,
                    source,
                })
            }
        };

        let mut records = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| ClonerError::Index {
                path: path.clone(),
                line: Some(n + 1),
                source,
            })?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let record: RepositoryRecord =
                serde_json::from_str(line).map_err(|e| ClonerError::Index {
                    path: path.clone(),
                    line: Some(n + 1),
                    source: e.into(),
                })?;
            records.push(record);
        }

        debug!("Loaded {} records from {}", records.len(), path.display());
        Ok(Self { path, records })
    }

    /// Index file for a root directory
    pub fn load_for_root(root: &Path) -> Result<Self> {
        Self::load(crate::paths::index_path(root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[RepositoryRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [RepositoryRecord] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, url: &str) -> Option<&RepositoryRecord> {
        self.records.iter().find(|r| r.url == url)
    }

    /// Replace the record with the same URL in place, or append it.
    /// Memory only; see [`RepoIndex::upsert`] for the persisting variant.
    pub fn insert_or_replace(&mut self, record: RepositoryRecord) -> Upsert {
        match self.records.iter().position(|r| r.url == record.url) {
            Some(pos) => {
                self.records[pos] = record;
                Upsert::Replaced(pos)
            }
            None => {
                self.records.push(record);
                Upsert::Appended(self.records.len() - 1)
            }
        }
    }

    /// Insert or replace, then rewrite the whole file
    pub fn upsert(&mut self, record: RepositoryRecord) -> Result<Upsert> {
        let outcome = self.insert_or_replace(record);
        self.save()?;
        Ok(outcome)
    }

    /// Rewrite the index file from the in-memory records
    pub fn save(&self) -> Result<()> {
        let index_err = |source| ClonerError::Index {
            path: self.path.clone(),
            line: None,
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(index_err)?;
        }

        let tmp_path = self.path.with_extension("jsonl.tmp");
        let mut tmp = File::create(&tmp_path).map_err(index_err)?;
        for record in &self.records {
            let line = serde_json::to_string(record).map_err(|e| index_err(e.into()))?;
            writeln!(tmp, "{line}").map_err(index_err)?;
        }
        tmp.sync_all().map_err(index_err)?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path).map_err(index_err)?;

        debug!("Wrote {} records to {}", self.records.len(), self.path.display());
        Ok(())
    }
}
