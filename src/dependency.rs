// src/dependency.rs

//! Dependency declarations and their scopes
//!
//! A [`Dependency`] is one entry in the resolver's working set: a coordinate
//! plus the scope it is needed for, the exclusions it declares for its
//! subtree, and (after resolution) the local file it resolved to.
//! [`DependencyDeclaration`] is the plain-data shape supplied by external
//! project-descriptor front-ends and carried inside repository descriptors.

use crate::error::{Error, Result};
use crate::notation::{Coordinate, DEFAULT_PACKAGING};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Lifecycle phase a dependency is needed for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Compile,
    Provided,
    Runtime,
    Test,
    System,
    Import,
}

impl Scope {
    pub fn as_str(&self) -> &str {
        match self {
            Scope::Compile => "compile",
            Scope::Provided => "provided",
            Scope::Runtime => "runtime",
            Scope::Test => "test",
            Scope::System => "system",
            Scope::Import => "import",
        }
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "compile" => Ok(Scope::Compile),
            "provided" => Ok(Scope::Provided),
            "runtime" => Ok(Scope::Runtime),
            "test" => Ok(Scope::Test),
            "system" => Ok(Scope::System),
            "import" => Ok(Scope::Import),
            _ => Err(Error::MalformedNotation {
                notation: s.to_string(),
                reason: "unknown scope".to_string(),
            }),
        }
    }
}

/// Suppression of a transitive group/artifact beneath a declaring dependency
///
/// `*` on either field matches anything in that field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    pub group: String,
    pub artifact: String,
}

impl Exclusion {
    pub fn new(group: &str, artifact: &str) -> Self {
        Exclusion {
            group: group.to_string(),
            artifact: artifact.to_string(),
        }
    }

    /// Whether this exclusion suppresses the given coordinate
    pub fn matches(&self, coordinate: &Coordinate) -> bool {
        (self.group == "*" || self.group == coordinate.group)
            && (self.artifact == "*" || self.artifact == coordinate.artifact)
    }
}

/// One entry in the resolver's working set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub coordinate: Coordinate,
    pub scope: Scope,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
    /// Local file the artifact resolved to, attached during download
    pub resolved_file: Option<PathBuf>,
}

impl Dependency {
    pub fn new(coordinate: Coordinate, scope: Scope) -> Self {
        Dependency {
            coordinate,
            scope,
            optional: false,
            exclusions: Vec::new(),
            resolved_file: None,
        }
    }

    /// Build from colon notation with the default compile scope
    pub fn from_notation(notation: &str) -> Result<Self> {
        Ok(Dependency::new(Coordinate::parse(notation)?, Scope::Compile))
    }

    pub fn notation(&self) -> String {
        self.coordinate.notation()
    }

    /// Whether any of the given exclusions suppress this dependency
    pub fn excluded_by(&self, exclusions: &[Exclusion]) -> bool {
        exclusions.iter().any(|e| e.matches(&self.coordinate))
    }
}

/// Dependency declaration as supplied by a project-descriptor front-end
/// and as carried in repository descriptors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyDeclaration {
    pub group: String,

    pub artifact: String,

    pub version: String,

    /// Packaging / file extension, "jar" when omitted
    #[serde(default = "default_packaging")]
    pub packaging: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,

    #[serde(default)]
    pub scope: Scope,

    #[serde(default)]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Exclusion>,
}

fn default_packaging() -> String {
    DEFAULT_PACKAGING.to_string()
}

impl From<&DependencyDeclaration> for Dependency {
    fn from(decl: &DependencyDeclaration) -> Self {
        Dependency {
            coordinate: Coordinate {
                group: decl.group.clone(),
                artifact: decl.artifact.clone(),
                packaging: decl.packaging.clone(),
                classifier: decl.classifier.clone(),
                version: decl.version.clone(),
            },
            scope: decl.scope,
            optional: decl.optional,
            exclusions: decl.exclusions.clone(),
            resolved_file: None,
        }
    }
}
