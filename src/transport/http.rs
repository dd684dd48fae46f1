// src/transport/http.rs

//! Blocking HTTP transport for Maven-layout repositories

use crate::error::{Error, Result};
use crate::notation::Coordinate;
use crate::repository::{RemoteRepository, layout};
use crate::transport::{ArtifactDescriptor, FetchedArtifact, Transport, parse_descriptor};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client implementation of [`Transport`]
///
/// Descriptors are fetched from the conventional pom path, artifact bytes
/// from the layout path, and checksums from the `.sha256` sidecar next to
/// the artifact. A 404 on any of these means "not in this repository".
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Resolution(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// GET a repository path, with `None` for 404
    fn get(
        &self,
        repository: &RemoteRepository,
        relative_path: &str,
    ) -> Result<Option<Vec<u8>>> {
        let url = repository.artifact_url(relative_path)?;
        debug!("GET {}", url);

        let mut request = self.client.get(url.clone());
        if let Some(auth) = &repository.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request
            .send()
            .map_err(|e| Error::Resolution(format!("request to {} failed: {}", url, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Resolution(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| Error::Resolution(format!("failed reading body from {}: {}", url, e)))?;
        Ok(Some(bytes.to_vec()))
    }
}

impl Transport for HttpTransport {
    fn fetch_descriptor(
        &self,
        repository: &RemoteRepository,
        coordinate: &Coordinate,
    ) -> Result<Option<ArtifactDescriptor>> {
        let path = layout::relative_path(&coordinate.as_descriptor());
        match self.get(repository, &path) {
            Ok(Some(bytes)) => parse_descriptor(&bytes).map(Some),
            Ok(None) => Ok(None),
            // A descriptor fetch failure is a collection failure
            Err(Error::Resolution(reason)) => Err(Error::Collection(reason)),
            Err(e) => Err(e),
        }
    }

    fn fetch_artifact(
        &self,
        repository: &RemoteRepository,
        coordinate: &Coordinate,
    ) -> Result<Option<FetchedArtifact>> {
        let path = layout::relative_path(coordinate);
        let Some(bytes) = self.get(repository, &path)? else {
            return Ok(None);
        };

        // Missing sidecar just means the repository publishes no checksum
        let checksum_path = format!("{}.sha256", path);
        let sha256 = self
            .get(repository, &checksum_path)?
            .map(|b| String::from_utf8_lossy(&b).trim().to_string());

        Ok(Some(FetchedArtifact { bytes, sha256 }))
    }

    fn publish(
        &self,
        repository: &RemoteRepository,
        relative_path: &str,
        bytes: &[u8],
    ) -> Result<()> {
        let url = repository.artifact_url(relative_path)?;
        info!("PUT {} ({} bytes)", url, bytes.len());

        let mut request = self.client.put(url.clone()).body(bytes.to_vec());
        if let Some(auth) = &repository.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request
            .send()
            .map_err(|e| Error::Deploy(format!("request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Deploy(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        Ok(())
    }
}
