// src/lib.rs

//! jresolve
//!
//! Maven-repository-style dependency management for build tools that do not
//! want a full build system: resolve a project's declared dependencies into
//! a concrete, ordered, deduplicated artifact set, download the artifacts
//! into a local repository, and hand back a usable classpath.
//!
//! # Architecture
//!
//! - Coordinates: `group:artifact[:packaging[:classifier]]:version` notation
//! - Registry: local repository root + ordered remote repositories
//! - Resolver: transitive graph expansion with exclusion propagation,
//!   nearest-wins conflict resolution, preorder flattening
//! - Transport: pluggable descriptor/artifact access (HTTP by default)
//! - Install/deploy: publish artifacts to the local or a remote repository

pub mod dependency;
mod error;
pub mod install;
pub mod notation;
pub mod repository;
pub mod resolver;
pub mod transport;

pub use dependency::{Dependency, DependencyDeclaration, Exclusion, Scope};
pub use error::{Error, Result};
pub use install::ArtifactBundle;
pub use notation::Coordinate;
pub use repository::{RemoteRepository, RepositoryRegistry};
pub use resolver::{CancelToken, Resolver};
pub use transport::{ArtifactDescriptor, HttpTransport, Transport};
