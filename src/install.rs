// src/install.rs

//! Installing artifacts into the local repository and deploying them to
//! remote repositories
//!
//! Install writes into the local Maven layout with atomic staging, so a
//! concurrent resolution reading the same paths never observes a partial
//! file; re-installing an identical artifact simply overwrites it. Deploy
//! pushes the same artifact set through the transport; any retry policy
//! belongs to the transport, not to this module.

use crate::error::{Error, Result};
use crate::notation::Coordinate;
use crate::repository::{RemoteRepository, RepositoryRegistry, layout};
use crate::transport::{Transport, sha256_hex};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Artifact set submitted to a remote repository
///
/// The binary is required; the descriptor sub-artifact is optional and is
/// published under the same coordinate with pom packaging.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub coordinate: Coordinate,
    pub binary: PathBuf,
    pub descriptor: Option<PathBuf>,
}

impl ArtifactBundle {
    pub fn new(notation: &str, binary: &Path) -> Result<Self> {
        Ok(ArtifactBundle {
            coordinate: Coordinate::parse(notation)?,
            binary: binary.to_path_buf(),
            descriptor: None,
        })
    }

    pub fn with_descriptor(mut self, descriptor: &Path) -> Self {
        self.descriptor = Some(descriptor.to_path_buf());
        self
    }
}

/// Install an artifact into the local repository
///
/// With a binary path the coordinate's artifact is installed, plus a pom
/// sub-artifact when a descriptor path is also given. With only a
/// descriptor path the coordinate's packaging is forced to pom first
/// (descriptor-only artifacts such as parent aggregators). At least one
/// path is required.
pub fn install(
    registry: &RepositoryRegistry,
    notation: &str,
    descriptor_path: Option<&Path>,
    binary_path: Option<&Path>,
) -> Result<()> {
    let coordinate = Coordinate::parse(notation)?;
    info!("installing {}", coordinate);

    match (binary_path, descriptor_path) {
        (None, None) => Err(Error::Install("nothing to install".to_string())),
        (Some(binary), descriptor) => {
            install_file(registry.local_repo(), &coordinate, binary)?;
            if let Some(descriptor) = descriptor {
                install_file(registry.local_repo(), &coordinate.as_descriptor(), descriptor)?;
            }
            Ok(())
        }
        (None, Some(descriptor)) => {
            install_file(registry.local_repo(), &coordinate.as_descriptor(), descriptor)
        }
    }
}

/// Copy one file into its layout path with a checksum sidecar
fn install_file(root: &Path, coordinate: &Coordinate, source: &Path) -> Result<()> {
    let bytes = fs::read(source).map_err(|e| {
        Error::Install(format!("cannot read {}: {}", source.display(), e))
    })?;

    let dest = layout::local_path_for(coordinate, root);
    debug!("installing {} to {}", source.display(), dest.display());

    layout::store_atomic(&dest, &bytes)
        .and_then(|_| layout::store_atomic(&layout::checksum_path(&dest), sha256_hex(&bytes).as_bytes()))
        .map_err(|e| Error::Install(format!("cannot write {}: {}", dest.display(), e)))
}

/// Deploy an artifact bundle to a remote repository
///
/// Publishes the binary and its checksum sidecar, then the descriptor and
/// its sidecar when present.
pub fn deploy(
    transport: &dyn Transport,
    bundle: &ArtifactBundle,
    target: &RemoteRepository,
) -> Result<()> {
    info!("deploying {} to {}", bundle.coordinate, target.id);

    publish_file(transport, target, &bundle.coordinate, &bundle.binary)?;
    if let Some(descriptor) = &bundle.descriptor {
        publish_file(transport, target, &bundle.coordinate.as_descriptor(), descriptor)?;
    }
    Ok(())
}

fn publish_file(
    transport: &dyn Transport,
    target: &RemoteRepository,
    coordinate: &Coordinate,
    source: &Path,
) -> Result<()> {
    let bytes = fs::read(source).map_err(|e| {
        Error::Deploy(format!("cannot read {}: {}", source.display(), e))
    })?;

    let relative = layout::relative_path(coordinate);
    transport.publish(target, &relative, &bytes)?;
    transport.publish(
        target,
        &format!("{}.sha256", relative),
        sha256_hex(&bytes).as_bytes(),
    )
}
