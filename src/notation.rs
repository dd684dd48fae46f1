// src/notation.rs

//! Artifact coordinates and their compact colon notation
//!
//! A coordinate identifies one artifact in a Maven-layout repository:
//! group, artifact, packaging (file extension, "jar" by default), an
//! optional classifier, and a version. The notation form is positional:
//!
//! - `group:artifact:version`
//! - `group:artifact:packaging:version`
//! - `group:artifact:packaging:classifier:version`

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Packaging assumed when the notation omits it
pub const DEFAULT_PACKAGING: &str = "jar";

/// Packaging of descriptor sub-artifacts
pub const DESCRIPTOR_PACKAGING: &str = "pom";

/// Full identity of one artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
    pub packaging: String,
    pub classifier: Option<String>,
    pub version: String,
}

/// Version-less identity used for deduplication during flattening
///
/// Two coordinates with the same key are the same artifact as far as
/// conflict resolution is concerned; only their versions may differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub group: String,
    pub artifact: String,
    pub packaging: String,
    pub classifier: Option<String>,
}

impl Coordinate {
    pub fn new(group: &str, artifact: &str, version: &str) -> Self {
        Coordinate {
            group: group.to_string(),
            artifact: artifact.to_string(),
            packaging: DEFAULT_PACKAGING.to_string(),
            classifier: None,
            version: version.to_string(),
        }
    }

    /// Parse the colon notation form
    pub fn parse(notation: &str) -> Result<Self> {
        let malformed = |reason: &str| Error::MalformedNotation {
            notation: notation.to_string(),
            reason: reason.to_string(),
        };

        let fields: Vec<&str> = notation.split(':').collect();
        let (group, artifact, packaging, classifier, version) = match fields.len() {
            3 => (fields[0], fields[1], DEFAULT_PACKAGING, None, fields[2]),
            4 => (fields[0], fields[1], fields[2], None, fields[3]),
            5 => (fields[0], fields[1], fields[2], Some(fields[3]), fields[4]),
            n if n < 3 => {
                return Err(malformed("expected at least group:artifact:version"));
            }
            _ => {
                return Err(malformed("too many fields"));
            }
        };

        if group.is_empty() || artifact.is_empty() || packaging.is_empty() || version.is_empty() {
            return Err(malformed("empty field"));
        }

        Ok(Coordinate {
            group: group.to_string(),
            artifact: artifact.to_string(),
            packaging: packaging.to_string(),
            classifier: classifier
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string()),
            version: version.to_string(),
        })
    }

    /// The descriptor sub-artifact of this coordinate: packaging forced to
    /// "pom", classifier cleared
    pub fn as_descriptor(&self) -> Coordinate {
        Coordinate {
            group: self.group.clone(),
            artifact: self.artifact.clone(),
            packaging: DESCRIPTOR_PACKAGING.to_string(),
            classifier: None,
            version: self.version.clone(),
        }
    }

    /// The version-less deduplication key
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey {
            group: self.group.clone(),
            artifact: self.artifact.clone(),
            packaging: self.packaging.clone(),
            classifier: self.classifier.clone(),
        }
    }

    /// Render the shortest notation that round-trips through `parse`
    ///
    /// The packaging segment is omitted only when it is the default and no
    /// classifier is present; a classifier always forces the packaging out.
    pub fn notation(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}:{}:{}:{}:{}",
                self.group, self.artifact, self.packaging, classifier, self.version
            ),
            None if self.packaging == DEFAULT_PACKAGING => {
                format!("{}:{}:{}", self.group, self.artifact, self.version)
            }
            None => format!(
                "{}:{}:{}:{}",
                self.group, self.artifact, self.packaging, self.version
            ),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.notation())
    }
}

impl FromStr for Coordinate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Coordinate::parse(s)
    }
}
