// src/resolver/mod.rs

//! Transitive dependency resolution
//!
//! The [`Resolver`] holds a working set of declared dependencies and, on
//! [`Resolver::resolve`], expands them into the full transitive graph,
//! flattens it with the nearest-wins conflict rule, optionally downloads
//! every surviving artifact into the local repository, and exposes the
//! result as an ordered dependency list / classpath.
//!
//! Expansion and flattening are single-threaded and deterministic; only
//! independent sibling downloads run in parallel.

mod graph;

use crate::dependency::{Dependency, DependencyDeclaration, Exclusion, Scope};
use crate::error::{Error, Result};
use crate::install::ArtifactBundle;
use crate::notation::{ArtifactKey, Coordinate};
use crate::repository::{RemoteRepository, RepositoryRegistry, layout};
use crate::transport::{self, ArtifactDescriptor, FetchedArtifact, HttpTransport, Transport};
use graph::DependencyGraph;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maximum fetch attempts per remote repository during download
const MAX_RETRIES: u32 = 3;

/// Base retry delay in milliseconds, doubled per attempt
const RETRY_DELAY_MS: u64 = 500;

/// Shared flag for aborting a resolution in flight
///
/// Checked between expansion steps and before each download; artifacts
/// already downloaded when the flag trips are left intact, so a retried
/// resolution resumes from the warm cache.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Configuration for one resolve call, built once and never mutated
#[derive(Debug, Clone)]
pub struct ResolutionSession {
    pub local_repo: PathBuf,
    pub remotes: Vec<RemoteRepository>,
    pub download_artifacts: bool,
    pub user_properties: HashMap<String, String>,
    pub cancel: CancelToken,
}

/// One unit of pending expansion work
struct WorkItem {
    parent: Option<usize>,
    dependency: Dependency,
    /// Exclusions declared by every ancestor, applied to this whole subtree
    inherited_exclusions: Vec<Exclusion>,
    /// Keys on the path from the root, for cycle detection
    ancestors: Vec<ArtifactKey>,
}

/// Dependency graph resolver over a repository registry
///
/// The transport is injected explicitly; [`Resolver::new`] wires the
/// default HTTP transport.
pub struct Resolver {
    registry: RepositoryRegistry,
    transport: Arc<dyn Transport>,
    dependencies: Vec<Dependency>,
    resolved: Option<Vec<Dependency>>,
}

impl Resolver {
    /// New resolver over the default HTTP transport
    pub fn new(registry: RepositoryRegistry) -> Result<Self> {
        Ok(Self::with_transport(
            registry,
            Arc::new(HttpTransport::new()?),
        ))
    }

    /// New resolver with an explicit transport
    pub fn with_transport(registry: RepositoryRegistry, transport: Arc<dyn Transport>) -> Self {
        Resolver {
            registry,
            transport,
            dependencies: Vec::new(),
            resolved: None,
        }
    }

    pub fn registry(&self) -> &RepositoryRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RepositoryRegistry {
        &mut self.registry
    }

    // Registry conveniences mirroring the registry surface

    pub fn set_local_repo(&mut self, path: &Path) {
        self.registry.set_local_repo(path);
    }

    pub fn add_remote_repository(&mut self, id: &str, layout: &str, url: &str) -> Result<()> {
        self.registry.add_remote_repository(id, layout, url)
    }

    pub fn add_remote_url(&mut self, url: &str) -> Result<()> {
        self.registry.add_remote_url(url)
    }

    pub fn add_remote_url_with_auth(
        &mut self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        self.registry.add_remote_url_with_auth(url, username, password)
    }

    pub fn clear_remote_repositories(&mut self) {
        self.registry.clear_remotes();
    }

    // Working set

    /// Current working dependency set (the resolved set after a resolve)
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn add_dependency(&mut self, dependency: Dependency) {
        debug!("adding dependency {} ({})", dependency.notation(), dependency.scope.as_str());
        self.dependencies.push(dependency);
    }

    /// Add by colon notation with the default compile scope
    pub fn add_notation(&mut self, notation: &str) -> Result<()> {
        self.add_notation_with_scope(notation, Scope::Compile)
    }

    pub fn add_notation_with_scope(&mut self, notation: &str, scope: Scope) -> Result<()> {
        self.add_dependency(Dependency::new(Coordinate::parse(notation)?, scope));
        Ok(())
    }

    /// Add declarations from a project-descriptor front-end
    ///
    /// When a scope filter is given, declarations whose scope is not in the
    /// filter are skipped.
    pub fn add_declarations(
        &mut self,
        declarations: &[DependencyDeclaration],
        scope_filter: Option<&[Scope]>,
    ) {
        for declaration in declarations {
            if let Some(filter) = scope_filter {
                if !filter.contains(&declaration.scope) {
                    debug!(
                        "skipping {}:{} (scope {} filtered)",
                        declaration.group,
                        declaration.artifact,
                        declaration.scope.as_str()
                    );
                    continue;
                }
            }
            self.add_dependency(Dependency::from(declaration));
        }
    }

    pub fn clear_dependencies(&mut self) {
        self.dependencies.clear();
    }

    // Resolution

    /// Resolve the working set, downloading artifacts
    pub fn resolve(&mut self) -> Result<()> {
        self.resolve_with(true, HashMap::new(), CancelToken::new())
    }

    /// Resolve the working set
    ///
    /// On success the flattened set replaces the working set, so resolving
    /// again with unchanged inputs is idempotent. On failure both the
    /// working set and the previously resolved state are left untouched.
    pub fn resolve_with(
        &mut self,
        download_artifacts: bool,
        user_properties: HashMap<String, String>,
        cancel: CancelToken,
    ) -> Result<()> {
        info!("resolving {} dependencies", self.dependencies.len());
        debug!("local repository: {}", self.registry.local_repo().display());
        for repository in self.registry.remotes() {
            debug!("remote repository {} ({})", repository.id, repository.url);
        }

        let session = ResolutionSession {
            local_repo: self.registry.local_repo().to_path_buf(),
            remotes: self.registry.remotes().to_vec(),
            download_artifacts,
            user_properties,
            cancel,
        };

        let graph = self.collect(&session)?;
        debug!("collected {} graph nodes", graph.len());

        let mut flattened = graph.flatten();
        if session.download_artifacts {
            self.download_all(&session, &mut flattened)?;
        }

        info!("resolved {} dependencies", flattened.len());
        self.dependencies = flattened.clone();
        self.resolved = Some(flattened);
        Ok(())
    }

    /// Expand the working set into the full dependency graph
    fn collect(&self, session: &ResolutionSession) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        let mut stack: Vec<WorkItem> = self
            .dependencies
            .iter()
            .rev()
            .map(|dependency| WorkItem {
                parent: None,
                dependency: dependency.clone(),
                inherited_exclusions: Vec::new(),
                ancestors: Vec::new(),
            })
            .collect();

        while let Some(item) = stack.pop() {
            if session.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let node = match item.parent {
                None => graph.add_root(item.dependency.clone()),
                Some(parent) => graph.add_child(parent, item.dependency.clone()),
            };

            // Validity filter: system-scope dependencies are file-path
            // based, never expanded or fetched from a repository
            if item.dependency.scope == Scope::System {
                debug!("{} has system scope, treating as leaf", item.dependency.notation());
                continue;
            }

            let descriptor = self.find_descriptor(session, &item.dependency.coordinate)?;

            let mut effective_exclusions = item.inherited_exclusions.clone();
            effective_exclusions.extend(item.dependency.exclusions.iter().cloned());

            let mut path = item.ancestors.clone();
            path.push(item.dependency.coordinate.key());

            let mut children: Vec<Dependency> = Vec::new();
            for declaration in &descriptor.dependencies {
                let mut child = Dependency::from(declaration);
                child.coordinate.version =
                    interpolate(&child.coordinate.version, &session.user_properties);

                // Transitive structural filters: test/provided scopes and
                // optional declarations do not propagate below depth 0
                if matches!(child.scope, Scope::Test | Scope::Provided) || child.optional {
                    continue;
                }
                if child.excluded_by(&effective_exclusions) {
                    debug!(
                        "excluding {} under {}",
                        child.notation(),
                        item.dependency.notation()
                    );
                    continue;
                }
                if path.contains(&child.coordinate.key()) {
                    warn!(
                        "dependency cycle at {} under {}, pruning",
                        child.notation(),
                        item.dependency.notation()
                    );
                    continue;
                }
                children.push(child);
            }

            for child in children.into_iter().rev() {
                stack.push(WorkItem {
                    parent: Some(node),
                    dependency: child,
                    inherited_exclusions: effective_exclusions.clone(),
                    ancestors: path.clone(),
                });
            }
        }

        Ok(graph)
    }

    /// Find a coordinate's descriptor: local repository first, then each
    /// remote in priority order; first hit wins
    fn find_descriptor(
        &self,
        session: &ResolutionSession,
        coordinate: &Coordinate,
    ) -> Result<ArtifactDescriptor> {
        let local = layout::local_path_for(&coordinate.as_descriptor(), &session.local_repo);
        if local.is_file() {
            debug!("descriptor for {} found locally", coordinate);
            return transport::parse_descriptor(&std::fs::read(&local)?);
        }

        for repository in &session.remotes {
            if let Some(descriptor) = self.transport.fetch_descriptor(repository, coordinate)? {
                debug!("descriptor for {} found in {}", coordinate, repository.id);
                return Ok(descriptor);
            }
        }

        Err(Error::Collection(format!(
            "no descriptor for {} in any repository",
            coordinate
        )))
    }

    /// Download every flattened non-system artifact into the local
    /// repository and attach the resulting file paths
    ///
    /// Sibling downloads run on the rayon pool. Flattened entries have
    /// distinct identities and therefore distinct destination paths, so no
    /// two workers share a destination; cross-process safety comes from
    /// atomic temp-file staging.
    fn download_all(
        &self,
        session: &ResolutionSession,
        dependencies: &mut [Dependency],
    ) -> Result<()> {
        let pending: Vec<(usize, Coordinate)> = dependencies
            .iter()
            .enumerate()
            .filter(|(_, dependency)| dependency.scope != Scope::System)
            .map(|(index, dependency)| (index, dependency.coordinate.clone()))
            .collect();

        let downloaded: Vec<Result<(usize, PathBuf)>> = pending
            .par_iter()
            .map(|(index, coordinate)| {
                if session.cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                Ok((*index, self.download_one(session, coordinate)?))
            })
            .collect();

        for result in downloaded {
            let (index, path) = result?;
            dependencies[index].resolved_file = Some(path);
        }
        Ok(())
    }

    /// Fetch one artifact into its local-repository path, reusing the warm
    /// cache, verifying checksums, and retrying transient failures
    fn download_one(&self, session: &ResolutionSession, coordinate: &Coordinate) -> Result<PathBuf> {
        let dest = layout::local_path_for(coordinate, &session.local_repo);
        if dest.is_file() {
            debug!("{} already in local repository", coordinate);
            return Ok(dest);
        }

        for repository in &session.remotes {
            let Some(fetched) = self.fetch_with_retry(repository, coordinate)? else {
                continue;
            };

            let actual = transport::sha256_hex(&fetched.bytes);
            if let Some(expected) = &fetched.sha256 {
                // Integrity violation, never retried
                if *expected != actual {
                    return Err(Error::ChecksumMismatch {
                        path: dest,
                        expected: expected.clone(),
                        actual,
                    });
                }
            }

            layout::store_atomic(&dest, &fetched.bytes)?;
            layout::store_atomic(&layout::checksum_path(&dest), actual.as_bytes())?;
            info!("downloaded {} from {}", coordinate, repository.id);
            return Ok(dest);
        }

        Err(Error::Resolution(format!(
            "artifact {} not found in any repository",
            coordinate
        )))
    }

    /// Bounded retry with exponential backoff for transient transport
    /// failures
    fn fetch_with_retry(
        &self,
        repository: &RemoteRepository,
        coordinate: &Coordinate,
    ) -> Result<Option<FetchedArtifact>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.fetch_artifact(repository, coordinate) {
                Ok(fetched) => return Ok(fetched),
                Err(e) => {
                    if attempt >= MAX_RETRIES {
                        return Err(Error::Resolution(format!(
                            "failed to fetch {} from {} after {} attempts: {}",
                            coordinate, repository.id, attempt, e
                        )));
                    }
                    warn!(
                        "fetch attempt {} for {} from {} failed: {}, retrying...",
                        attempt, coordinate, repository.id, e
                    );
                    std::thread::sleep(Duration::from_millis(
                        RETRY_DELAY_MS << (attempt - 1),
                    ));
                }
            }
        }
    }

    // Resolved state accessors

    /// Resolved dependencies in flattened order, empty before any resolve
    pub fn resolved_dependencies(&self) -> &[Dependency] {
        self.resolved.as_deref().unwrap_or(&[])
    }

    /// Resolved dependencies as notation strings
    pub fn resolved_notations(&self) -> Vec<String> {
        self.resolved_dependencies()
            .iter()
            .map(Dependency::notation)
            .collect()
    }

    /// Notation-to-local-file mapping for every resolved dependency that
    /// carries a file
    pub fn resolved_paths(&self) -> BTreeMap<String, PathBuf> {
        self.resolved_dependencies()
            .iter()
            .filter_map(|dependency| {
                dependency
                    .resolved_file
                    .as_ref()
                    .map(|path| (dependency.notation(), path.clone()))
            })
            .collect()
    }

    /// Platform path-separator-joined classpath of the resolved files
    ///
    /// `None` before any successful resolve.
    pub fn classpath(&self) -> Option<String> {
        let resolved = self.resolved.as_ref()?;
        let files = resolved
            .iter()
            .filter_map(|dependency| dependency.resolved_file.as_ref());
        let joined = std::env::join_paths(files).ok()?;
        Some(joined.to_string_lossy().into_owned())
    }

    // Artifact lifecycle conveniences

    /// Install an artifact into the local repository, see [`crate::install::install`]
    pub fn install(
        &self,
        notation: &str,
        descriptor_path: Option<&Path>,
        binary_path: Option<&Path>,
    ) -> Result<()> {
        crate::install::install(&self.registry, notation, descriptor_path, binary_path)
    }

    /// Deploy an artifact bundle to a remote repository through this
    /// resolver's transport
    pub fn deploy(&self, bundle: &ArtifactBundle, target: &RemoteRepository) -> Result<()> {
        crate::install::deploy(self.transport.as_ref(), bundle, target)
    }
}

/// Substitute `${key}` references from session user properties
fn interpolate(value: &str, properties: &HashMap<String, String>) -> String {
    if !value.contains("${") || properties.is_empty() {
        return value.to_string();
    }
    let mut out = value.to_string();
    for (key, replacement) in properties {
        out = out.replace(&format!("${{{}}}", key), replacement);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate() {
        let mut properties = HashMap::new();
        properties.insert("lib.version".to_string(), "2.4".to_string());

        assert_eq!(interpolate("${lib.version}", &properties), "2.4");
        assert_eq!(interpolate("1.0", &properties), "1.0");
        assert_eq!(interpolate("${unknown}", &properties), "${unknown}");
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
    }
}
