//! git-cloner - Organized Git Repository Cloning and Syncing
//!
//! git-cloner clones repositories into a deterministic `<root>/<host>/<org>/<repo>`
//! layout, keeps a line-delimited JSON index of everything it cloned, and can
//! bulk-clone every repository of a GitHub organization or user.
//!
//! ## Core Features
//!
//! - **Deterministic Layout**: HTTPS and SSH URLs for the same repository share a path
//! - **Repository Index**: `repos.jsonl` under the root, one record per clone URL
//! - **Bulk Cloning**: Paginated GitHub enumeration with optional fork filtering
//! - **Syncing**: Pull every indexed working copy and refresh branch/commit
//! - **Configuration Management**: YAML-based configuration with XDG compliance
//!
//! ## Modules
//!
//! - [`url`]: URL parsing and classification
//! - [`paths`]: On-disk layout
//! - [`index`]: The repository index
//! - [`provider`]: Pluggable remote enumeration
//! - [`github`]: GitHub REST provider
//! - [`git`]: Version-control subprocess wrapper
//! - [`sync`]: Clone, bulk clone and sync orchestration
//! - [`cancel`]: Interrupt propagation
//! - [`config`]: Configuration management and parsing

pub mod cancel;
pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod index;
pub mod paths;
pub mod provider;
pub mod sync;
pub mod url;

pub use cancel::CancelFlag;
pub use config::Config;
pub use error::{ClonerError, Result};
pub use git::{GitCli, Vcs};
pub use github::GitHubProvider;
pub use index::{RepoIndex, RepositoryRecord};
pub use provider::{ProviderRegistry, RemoteProvider, RemoteRepo};
pub use sync::{BulkCloneSummary, CloneOutcome, SyncEngine, SyncSummary};
pub use url::{is_org_user_url, parse_git_url, parse_org_user_url, RepoId, Target};
