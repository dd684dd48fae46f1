// src/repository/layout.rs

//! Maven repository layout path math
//!
//! The on-disk layout is a durable contract other tools rely on bit-exactly:
//! `root/<group dots-as-slashes>/<artifact>/<version>/<artifact>-<version>[-<classifier>].<packaging>`

use crate::error::{Error, Result};
use crate::notation::Coordinate;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of an artifact within its version directory
pub fn artifact_file_name(coordinate: &Coordinate) -> String {
    match &coordinate.classifier {
        Some(classifier) => format!(
            "{}-{}-{}.{}",
            coordinate.artifact, coordinate.version, classifier, coordinate.packaging
        ),
        None => format!(
            "{}-{}.{}",
            coordinate.artifact, coordinate.version, coordinate.packaging
        ),
    }
}

/// Artifact path relative to a repository root, with `/` separators
///
/// Used both for local-repository paths and for remote URLs.
pub fn relative_path(coordinate: &Coordinate) -> String {
    format!(
        "{}/{}/{}/{}",
        coordinate.group.replace('.', "/"),
        coordinate.artifact,
        coordinate.version,
        artifact_file_name(coordinate)
    )
}

/// Absolute local-repository path for a coordinate. Pure, no I/O.
pub fn local_path_for(coordinate: &Coordinate, root: &Path) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in coordinate.group.split('.') {
        path.push(segment);
    }
    path.push(&coordinate.artifact);
    path.push(&coordinate.version);
    path.push(artifact_file_name(coordinate));
    path
}

/// Sidecar path carrying the lowercase-hex sha256 of an installed file
pub fn checksum_path(artifact_path: &Path) -> PathBuf {
    let mut name = artifact_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".sha256");
    artifact_path.with_file_name(name)
}

/// Store bytes at a destination atomically
///
/// Stages into a uniquely named temp file in the destination directory and
/// renames it into place, so concurrent writers never expose a partial file
/// and the last complete write wins.
pub(crate) fn store_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let parent = dest.parent().ok_or_else(|| Error::RepositoryInit {
        path: dest.to_path_buf(),
        reason: "destination has no parent directory".to_string(),
    })?;
    fs::create_dir_all(parent)?;

    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    use std::io::Write;
    staged.write_all(bytes)?;
    staged.persist(dest).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Local-repository paths for a batch of notation strings
///
/// Lazily verifies the root is usable by creating it when absent; an
/// uncreatable root fails with [`Error::RepositoryInit`].
pub fn local_paths_for(root: &Path, notations: &[&str]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(root).map_err(|e| Error::RepositoryInit {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    notations
        .iter()
        .map(|notation| Ok(local_path_for(&Coordinate::parse(notation)?, root)))
        .collect()
}
