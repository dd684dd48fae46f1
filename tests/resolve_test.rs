// tests/resolve_test.rs

//! End-to-end resolution tests against an in-memory transport
//!
//! These tests exercise the full resolve pipeline: collection, exclusion
//! propagation, nearest-wins flattening, downloads with checksum
//! verification, and the resolved-state accessors.

use jresolve::dependency::{Dependency, DependencyDeclaration, Exclusion, Scope};
use jresolve::notation::Coordinate;
use jresolve::repository::RepositoryRegistry;
use jresolve::resolver::{CancelToken, Resolver};
use jresolve::transport::{ArtifactDescriptor, FetchedArtifact, Transport, sha256_hex};
use jresolve::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// In-memory transport keyed by repository id and coordinate notation
#[derive(Default)]
struct MemoryTransport {
    descriptors: Mutex<HashMap<(String, String), ArtifactDescriptor>>,
    artifacts: Mutex<HashMap<(String, String), (Vec<u8>, Option<String>)>>,
    /// Notations whose artifacts were requested, any repository
    artifact_requests: Mutex<Vec<String>>,
    /// Notations whose descriptors were requested, any repository
    descriptor_requests: Mutex<Vec<String>>,
    /// Number of upcoming fetch_artifact calls that fail transiently
    induced_failures: AtomicU32,
}

impl MemoryTransport {
    fn add_descriptor(&self, repo: &str, notation: &str, dependencies: Vec<DependencyDeclaration>) {
        let coordinate = Coordinate::parse(notation).unwrap();
        let mut descriptor = ArtifactDescriptor::leaf(&coordinate);
        descriptor.dependencies = dependencies;
        self.descriptors
            .lock()
            .unwrap()
            .insert((repo.to_string(), notation.to_string()), descriptor);
    }

    fn add_artifact(&self, repo: &str, notation: &str, bytes: &[u8], sha256: Option<String>) {
        self.artifacts.lock().unwrap().insert(
            (repo.to_string(), notation.to_string()),
            (bytes.to_vec(), sha256),
        );
    }

    /// Descriptor plus artifact bytes with a correct published checksum
    fn add_leaf(&self, repo: &str, notation: &str, bytes: &[u8]) {
        self.add_descriptor(repo, notation, Vec::new());
        self.add_artifact(repo, notation, bytes, Some(sha256_hex(bytes)));
    }

    fn fail_next_fetches(&self, count: u32) {
        self.induced_failures.store(count, Ordering::SeqCst);
    }
}

impl Transport for MemoryTransport {
    fn fetch_descriptor(
        &self,
        repository: &jresolve::RemoteRepository,
        coordinate: &Coordinate,
    ) -> Result<Option<ArtifactDescriptor>> {
        let notation = coordinate.notation();
        self.descriptor_requests.lock().unwrap().push(notation.clone());
        Ok(self
            .descriptors
            .lock()
            .unwrap()
            .get(&(repository.id.clone(), notation))
            .cloned())
    }

    fn fetch_artifact(
        &self,
        repository: &jresolve::RemoteRepository,
        coordinate: &Coordinate,
    ) -> Result<Option<FetchedArtifact>> {
        let notation = coordinate.notation();
        self.artifact_requests.lock().unwrap().push(notation.clone());

        let failures = self.induced_failures.load(Ordering::SeqCst);
        if failures > 0
            && self
                .induced_failures
                .compare_exchange(failures, failures - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            return Err(Error::Resolution("induced transient failure".to_string()));
        }

        Ok(self
            .artifacts
            .lock()
            .unwrap()
            .get(&(repository.id.clone(), notation))
            .map(|(bytes, sha256)| FetchedArtifact {
                bytes: bytes.clone(),
                sha256: sha256.clone(),
            }))
    }

    fn publish(
        &self,
        _repository: &jresolve::RemoteRepository,
        _relative_path: &str,
        _bytes: &[u8],
    ) -> Result<()> {
        Ok(())
    }
}

fn declaration(notation: &str) -> DependencyDeclaration {
    let coordinate = Coordinate::parse(notation).unwrap();
    DependencyDeclaration {
        group: coordinate.group,
        artifact: coordinate.artifact,
        version: coordinate.version,
        packaging: coordinate.packaging,
        classifier: coordinate.classifier,
        scope: Scope::Compile,
        optional: false,
        exclusions: Vec::new(),
    }
}

/// Resolver over one in-memory remote repository ("mem") and a temp local
/// repository
fn test_resolver(local: &Path, transport: Arc<MemoryTransport>) -> Resolver {
    let mut registry = RepositoryRegistry::new();
    registry.set_local_repo(local);
    registry.clear_remotes();
    registry
        .add_remote_repository("mem", "default", "http://mem.invalid/")
        .unwrap();
    Resolver::with_transport(registry, transport)
}

#[test]
fn test_resolve_transitive_and_classpath() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());
    transport.add_descriptor(
        "mem",
        "org.example:app:1.0",
        vec![declaration("org.example:lib:1.0"), declaration("org.util:tool:2.0")],
    );
    transport.add_artifact("mem", "org.example:app:1.0", b"app", Some(sha256_hex(b"app")));
    transport.add_leaf("mem", "org.example:lib:1.0", b"lib");
    transport.add_leaf("mem", "org.util:tool:2.0", b"tool");

    let mut resolver = test_resolver(local.path(), transport);
    resolver.add_notation("org.example:app:1.0").unwrap();
    resolver.resolve().unwrap();

    assert_eq!(
        resolver.resolved_notations(),
        ["org.example:app:1.0", "org.example:lib:1.0", "org.util:tool:2.0"]
    );

    // Every artifact landed at its layout path
    let lib_path = local.path().join("org/example/lib/1.0/lib-1.0.jar");
    assert_eq!(std::fs::read(&lib_path).unwrap(), b"lib");
    assert!(
        local
            .path()
            .join("org/example/lib/1.0/lib-1.0.jar.sha256")
            .is_file(),
        "checksum sidecar should be written"
    );

    let paths = resolver.resolved_paths();
    assert_eq!(paths.len(), 3);
    assert_eq!(paths["org.example:lib:1.0"], lib_path);

    let classpath = resolver.classpath().expect("classpath after resolve");
    let entries: Vec<std::path::PathBuf> = std::env::split_paths(&classpath).collect();
    assert_eq!(entries.len(), 3, "three classpath entries in flattened order");
    assert_eq!(entries[1], lib_path);
}

#[test]
fn test_nearest_wins_conflict() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());
    // a depends on b@1 and c; c depends on b@2
    transport.add_descriptor(
        "mem",
        "g:a:1",
        vec![declaration("g:b:1"), declaration("g:c:1")],
    );
    transport.add_descriptor("mem", "g:c:1", vec![declaration("g:b:2")]);
    transport.add_descriptor("mem", "g:b:1", Vec::new());
    transport.add_descriptor("mem", "g:b:2", Vec::new());

    let mut resolver = test_resolver(local.path(), transport);
    resolver.add_notation("g:a:1").unwrap();
    resolver
        .resolve_with(false, HashMap::new(), CancelToken::new())
        .unwrap();

    assert_eq!(resolver.resolved_notations(), ["g:a:1", "g:b:1", "g:c:1"]);
}

#[test]
fn test_exclusion_propagates_per_declaring_dependency() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());
    // a (excluding g:x) -> b -> x ; sibling d -> x without exclusions
    transport.add_descriptor("mem", "g:a:1", vec![declaration("g:b:1")]);
    transport.add_descriptor("mem", "g:b:1", vec![declaration("g:x:1")]);
    transport.add_descriptor("mem", "g:d:1", vec![declaration("g:x:1")]);
    transport.add_descriptor("mem", "g:x:1", Vec::new());

    let mut excluding = Dependency::from_notation("g:a:1").unwrap();
    excluding.exclusions.push(Exclusion::new("g", "x"));

    let mut resolver = test_resolver(local.path(), transport.clone());
    resolver.add_dependency(excluding.clone());
    resolver
        .resolve_with(false, HashMap::new(), CancelToken::new())
        .unwrap();
    assert_eq!(
        resolver.resolved_notations(),
        ["g:a:1", "g:b:1"],
        "x should be excluded beneath a"
    );

    // With the sibling added, x comes back through d only
    let mut resolver = test_resolver(local.path(), transport);
    resolver.add_dependency(excluding);
    resolver.add_notation("g:d:1").unwrap();
    resolver
        .resolve_with(false, HashMap::new(), CancelToken::new())
        .unwrap();
    let notations = resolver.resolved_notations();
    assert_eq!(notations, ["g:a:1", "g:b:1", "g:d:1", "g:x:1"]);
}

#[test]
fn test_system_scope_never_touches_repositories() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());
    // The coordinate exists remotely, but the system-scope declaration
    // must never reach for it
    transport.add_leaf("mem", "g:native:1", b"native");
    transport.add_leaf("mem", "g:a:1", b"a");

    let mut resolver = test_resolver(local.path(), transport.clone());
    resolver.add_notation("g:a:1").unwrap();
    resolver
        .add_notation_with_scope("g:native:1", Scope::System)
        .unwrap();
    resolver.resolve().unwrap();

    let notations = resolver.resolved_notations();
    assert!(notations.contains(&"g:native:1".to_string()));

    let system_dep = resolver
        .resolved_dependencies()
        .iter()
        .find(|d| d.coordinate.artifact == "native")
        .unwrap();
    assert_eq!(system_dep.resolved_file, None, "system scope is never downloaded");

    assert!(
        !transport
            .descriptor_requests
            .lock()
            .unwrap()
            .contains(&"g:native:1".to_string()),
        "system scope must not be expanded from a repository"
    );
    assert!(
        !transport
            .artifact_requests
            .lock()
            .unwrap()
            .contains(&"g:native:1".to_string()),
        "system scope must not be fetched"
    );
}

#[test]
fn test_resolve_is_idempotent_with_warm_cache() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());
    transport.add_descriptor("mem", "g:a:1", vec![declaration("g:b:1")]);
    transport.add_artifact("mem", "g:a:1", b"a", Some(sha256_hex(b"a")));
    transport.add_leaf("mem", "g:b:1", b"b");

    let mut resolver = test_resolver(local.path(), transport);
    resolver.add_notation("g:a:1").unwrap();
    resolver.resolve().unwrap();

    let first_notations = resolver.resolved_notations();
    let first_classpath = resolver.classpath();

    resolver.resolve().unwrap();
    assert_eq!(resolver.resolved_notations(), first_notations);
    assert_eq!(resolver.classpath(), first_classpath);
}

#[test]
fn test_missing_descriptor_is_collection_error() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());

    let mut resolver = test_resolver(local.path(), transport);
    resolver.add_notation("g:ghost:1").unwrap();

    let result = resolver.resolve_with(false, HashMap::new(), CancelToken::new());
    assert!(matches!(result, Err(Error::Collection(_))));
}

#[test]
fn test_failed_resolve_preserves_previous_state() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());
    transport.add_leaf("mem", "g:a:1", b"a");

    let mut resolver = test_resolver(local.path(), transport);
    resolver.add_notation("g:a:1").unwrap();
    resolver.resolve().unwrap();
    let good_notations = resolver.resolved_notations();

    resolver.add_notation("g:ghost:1").unwrap();
    assert!(resolver.resolve().is_err());

    assert_eq!(
        resolver.resolved_notations(),
        good_notations,
        "failed resolve must not overwrite the last good state"
    );
}

#[test]
fn test_checksum_mismatch_fails_without_retry() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());
    transport.add_descriptor("mem", "g:bad:1", Vec::new());
    transport.add_artifact("mem", "g:bad:1", b"bytes", Some("deadbeef".to_string()));

    let mut resolver = test_resolver(local.path(), transport.clone());
    resolver.add_notation("g:bad:1").unwrap();

    let result = resolver.resolve();
    assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
    assert_eq!(
        transport.artifact_requests.lock().unwrap().len(),
        1,
        "integrity failures are never retried"
    );
    assert!(
        !local.path().join("g/bad/1/bad-1.jar").exists(),
        "no file may be left behind on checksum mismatch"
    );
}

#[test]
fn test_transient_failures_are_retried() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());
    transport.add_leaf("mem", "g:flaky:1", b"flaky");
    transport.fail_next_fetches(2);

    let mut resolver = test_resolver(local.path(), transport);
    resolver.add_notation("g:flaky:1").unwrap();
    resolver.resolve().unwrap();

    assert!(local.path().join("g/flaky/1/flaky-1.jar").is_file());
}

#[test]
fn test_user_properties_interpolate_versions() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());
    transport.add_descriptor(
        "mem",
        "g:a:1",
        vec![declaration("g:b:${b.version}")],
    );
    transport.add_descriptor("mem", "g:b:3.1", Vec::new());

    let mut resolver = test_resolver(local.path(), transport);
    resolver.add_notation("g:a:1").unwrap();

    let mut properties = HashMap::new();
    properties.insert("b.version".to_string(), "3.1".to_string());
    resolver
        .resolve_with(false, properties, CancelToken::new())
        .unwrap();

    assert_eq!(resolver.resolved_notations(), ["g:a:1", "g:b:3.1"]);
}

#[test]
fn test_scope_filter_on_declarations() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());

    let mut test_decl = declaration("g:t:1");
    test_decl.scope = Scope::Test;
    let declarations = vec![declaration("g:a:1"), test_decl];

    let mut resolver = test_resolver(local.path(), transport);
    resolver.add_declarations(&declarations, Some(&[Scope::Compile, Scope::Runtime]));
    assert_eq!(resolver.dependencies().len(), 1);
    assert_eq!(resolver.dependencies()[0].notation(), "g:a:1");

    resolver.clear_dependencies();
    resolver.add_declarations(&declarations, None);
    assert_eq!(resolver.dependencies().len(), 2);
}

#[test]
fn test_transitive_test_and_optional_declarations_are_skipped() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());

    let mut test_decl = declaration("g:t:1");
    test_decl.scope = Scope::Test;
    let mut optional_decl = declaration("g:opt:1");
    optional_decl.optional = true;
    transport.add_descriptor(
        "mem",
        "g:a:1",
        vec![test_decl, optional_decl, declaration("g:b:1")],
    );
    transport.add_descriptor("mem", "g:b:1", Vec::new());

    let mut resolver = test_resolver(local.path(), transport);
    resolver.add_notation("g:a:1").unwrap();
    resolver
        .resolve_with(false, HashMap::new(), CancelToken::new())
        .unwrap();

    assert_eq!(resolver.resolved_notations(), ["g:a:1", "g:b:1"]);
}

#[test]
fn test_local_descriptor_preferred_over_remote() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());

    // Remote claims a has a child; the locally installed descriptor says leaf
    transport.add_descriptor("mem", "g:a:1", vec![declaration("g:b:1")]);

    let coordinate = Coordinate::parse("g:a:1").unwrap();
    let local_descriptor = serde_json::to_vec(&ArtifactDescriptor::leaf(&coordinate)).unwrap();
    let descriptor_path = local.path().join("g/a/1/a-1.pom");
    std::fs::create_dir_all(descriptor_path.parent().unwrap()).unwrap();
    std::fs::write(&descriptor_path, local_descriptor).unwrap();

    let mut resolver = test_resolver(local.path(), transport);
    resolver.add_notation("g:a:1").unwrap();
    resolver
        .resolve_with(false, HashMap::new(), CancelToken::new())
        .unwrap();

    assert_eq!(resolver.resolved_notations(), ["g:a:1"]);
}

#[test]
fn test_cancelled_resolve_aborts() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());
    transport.add_leaf("mem", "g:a:1", b"a");

    let mut resolver = test_resolver(local.path(), transport);
    resolver.add_notation("g:a:1").unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let result = resolver.resolve_with(true, HashMap::new(), cancel);
    assert!(matches!(result, Err(Error::Cancelled)));
}

#[test]
fn test_concurrent_resolutions_of_same_artifact() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());
    transport.add_leaf("mem", "g:shared:1", b"shared bytes");

    let local_path = local.path().to_path_buf();
    let mut handles = Vec::new();
    for _ in 0..2 {
        let transport = transport.clone();
        let local_path = local_path.clone();
        handles.push(std::thread::spawn(move || {
            let mut resolver = test_resolver(&local_path, transport);
            resolver.add_notation("g:shared:1").unwrap();
            resolver.resolve()
        }));
    }
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let dest = local.path().join("g/shared/1/shared-1.jar");
    assert_eq!(std::fs::read(&dest).unwrap(), b"shared bytes");
    assert_eq!(
        jresolve::transport::file_sha256(&dest).unwrap(),
        sha256_hex(b"shared bytes")
    );
}

#[test]
fn test_resolve_without_download_attaches_no_files() {
    init_logging();
    let local = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::default());
    transport.add_descriptor("mem", "g:a:1", Vec::new());

    let mut resolver = test_resolver(local.path(), transport.clone());
    resolver.add_notation("g:a:1").unwrap();

    assert_eq!(resolver.classpath(), None, "no classpath before resolve");

    resolver
        .resolve_with(false, HashMap::new(), CancelToken::new())
        .unwrap();

    assert!(resolver.resolved_paths().is_empty());
    assert!(transport.artifact_requests.lock().unwrap().is_empty());
}
