// src/transport/mod.rs

//! Transport seam between the resolver and remote repositories
//!
//! The resolver never speaks a wire protocol itself: it asks a [`Transport`]
//! for descriptors (graph expansion) and artifact bytes (download), and hands
//! it bytes to publish (deploy). Swapping the transport is how embedders and
//! tests replace the network.

pub mod http;

use crate::dependency::DependencyDeclaration;
use crate::error::{Error, Result};
use crate::notation::{Coordinate, DEFAULT_PACKAGING};
use crate::repository::RemoteRepository;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

pub use http::HttpTransport;

/// Descriptor of one artifact: its identity plus its declared dependencies
///
/// This is the JSON payload served at the descriptor path. Parsing full
/// POM XML is the job of an external project-descriptor front-end; the
/// core only ever sees this already-structured shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub group: String,

    pub artifact: String,

    pub version: String,

    #[serde(default = "default_packaging")]
    pub packaging: String,

    #[serde(default)]
    pub dependencies: Vec<DependencyDeclaration>,
}

fn default_packaging() -> String {
    DEFAULT_PACKAGING.to_string()
}

impl ArtifactDescriptor {
    /// Minimal descriptor with no declared dependencies
    pub fn leaf(coordinate: &Coordinate) -> Self {
        ArtifactDescriptor {
            group: coordinate.group.clone(),
            artifact: coordinate.artifact.clone(),
            version: coordinate.version.clone(),
            packaging: coordinate.packaging.clone(),
            dependencies: Vec::new(),
        }
    }
}

/// Artifact bytes fetched from a remote repository
#[derive(Debug, Clone)]
pub struct FetchedArtifact {
    pub bytes: Vec<u8>,
    /// Lowercase-hex sha256 published alongside the artifact, when the
    /// repository carries one
    pub sha256: Option<String>,
}

/// Pluggable access to remote repositories
///
/// `Ok(None)` from the fetch methods means "this repository does not have
/// it" (the caller moves on to the next repository); `Err` is a transport
/// failure.
pub trait Transport: Send + Sync {
    /// Fetch the descriptor for a coordinate, used during graph expansion
    fn fetch_descriptor(
        &self,
        repository: &RemoteRepository,
        coordinate: &Coordinate,
    ) -> Result<Option<ArtifactDescriptor>>;

    /// Fetch the artifact bytes and published checksum for a coordinate
    fn fetch_artifact(
        &self,
        repository: &RemoteRepository,
        coordinate: &Coordinate,
    ) -> Result<Option<FetchedArtifact>>;

    /// Publish bytes at a layout-relative path within a repository
    fn publish(
        &self,
        repository: &RemoteRepository,
        relative_path: &str,
        bytes: &[u8],
    ) -> Result<()>;
}

/// Parse descriptor bytes (JSON)
pub fn parse_descriptor(bytes: &[u8]) -> Result<ArtifactDescriptor> {
    serde_json::from_slice(bytes)
        .map_err(|e| Error::Collection(format!("failed to parse descriptor: {}", e)))
}

/// Lowercase-hex sha256 of a byte slice
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Lowercase-hex sha256 of a file, streamed
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
