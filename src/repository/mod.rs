// src/repository/mod.rs

//! Repository registry
//!
//! This module provides:
//! - The local repository root (env override, else the conventional
//!   user-home location)
//! - The ordered list of remote repositories queried during resolution
//! - The on-disk repository layout (see [`layout`])

pub mod layout;

use crate::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Environment variable overriding the local repository root
pub const LOCAL_REPO_ENV: &str = "M2_REPO";

/// URL of the default "central" remote repository
pub const CENTRAL_URL: &str = "https://repo1.maven.org/maven2/";

/// Layout identifier for Maven-style repositories
pub const DEFAULT_LAYOUT: &str = "default";

/// Credentials for an authenticated remote repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryAuth {
    pub username: String,
    pub password: String,
}

/// A network-addressable source of descriptors and artifact binaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepository {
    pub id: String,
    pub layout: String,
    pub url: Url,
    pub auth: Option<RepositoryAuth>,
}

impl RemoteRepository {
    pub fn new(id: &str, layout: &str, url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(RemoteRepository {
            id: id.to_string(),
            layout: layout.to_string(),
            url,
            auth: None,
        })
    }

    /// Build from a bare URL, deriving the id from the host
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let id = parsed.host_str().unwrap_or("repo").to_string();
        Ok(RemoteRepository {
            id,
            layout: DEFAULT_LAYOUT.to_string(),
            url: parsed,
            auth: None,
        })
    }

    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.auth = Some(RepositoryAuth {
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// Absolute URL of an artifact path within this repository
    pub fn artifact_url(&self, relative_path: &str) -> Result<Url> {
        self.url.join(relative_path).map_err(|e| Error::InvalidUrl {
            url: format!("{}{}", self.url, relative_path),
            reason: e.to_string(),
        })
    }
}

/// Local repository root plus the ordered remote repositories
///
/// Remote order is priority: during collection the first repository that
/// can supply a descriptor wins. Ids are unique; re-adding an existing id
/// replaces that entry in place, keeping its priority slot.
#[derive(Debug, Clone)]
pub struct RepositoryRegistry {
    local_repo: PathBuf,
    remotes: Vec<RemoteRepository>,
}

impl RepositoryRegistry {
    /// New registry seeded with the central repository
    ///
    /// The local root honors the `M2_REPO` environment override, else
    /// falls back to `<home>/.m2/repository`.
    pub fn new() -> Self {
        let mut registry = RepositoryRegistry {
            local_repo: default_local_repo(),
            remotes: Vec::new(),
        };

        // CENTRAL_URL is a valid constant URL
        if let Ok(central) = RemoteRepository::new("central", DEFAULT_LAYOUT, CENTRAL_URL) {
            registry.remotes.push(central);
        }

        debug!("local repository root: {}", registry.local_repo.display());
        registry
    }

    pub fn set_local_repo(&mut self, path: &Path) {
        self.local_repo = path.to_path_buf();
    }

    pub fn local_repo(&self) -> &Path {
        &self.local_repo
    }

    pub fn remotes(&self) -> &[RemoteRepository] {
        &self.remotes
    }

    /// Add a remote repository, replacing any existing entry with the same id
    pub fn add_remote(&mut self, repository: RemoteRepository) {
        info!("adding remote repository {} ({})", repository.id, repository.url);
        match self.remotes.iter_mut().find(|r| r.id == repository.id) {
            Some(existing) => *existing = repository,
            None => self.remotes.push(repository),
        }
    }

    /// Add a remote repository by id, layout type, and URL
    pub fn add_remote_repository(&mut self, id: &str, layout: &str, url: &str) -> Result<()> {
        self.add_remote(RemoteRepository::new(id, layout, url)?);
        Ok(())
    }

    /// Add a remote repository by bare URL
    pub fn add_remote_url(&mut self, url: &str) -> Result<()> {
        self.add_remote(RemoteRepository::from_url(url)?);
        Ok(())
    }

    /// Add a remote repository by bare URL with basic-auth credentials
    pub fn add_remote_url_with_auth(
        &mut self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        self.add_remote(RemoteRepository::from_url(url)?.with_auth(username, password));
        Ok(())
    }

    /// Remove every remote repository, including the default central entry
    ///
    /// Supports fully private-repository configurations; re-add central
    /// explicitly if it is still wanted.
    pub fn clear_remotes(&mut self) {
        self.remotes.clear();
    }

    /// Local-repository paths for a batch of notation strings
    ///
    /// See [`layout::local_paths_for`] for the root-usability check.
    pub fn local_paths(&self, notations: &[&str]) -> Result<Vec<PathBuf>> {
        layout::local_paths_for(&self.local_repo, notations)
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Default local repository root: env override, else `<home>/.m2/repository`
fn default_local_repo() -> PathBuf {
    if let Some(overridden) = env::var_os(LOCAL_REPO_ENV) {
        let path = PathBuf::from(overridden);
        return absolutize(&path);
    }

    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    absolutize(&home.join(".m2").join("repository"))
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
