//! OCI distribution v2 client over HTTP.
//!
//! Conditional push is approximated with a resolve-then-PUT: the tag's
//! current digest is checked immediately before the write. The remaining
//! race window is the registry's to close; the promoter re-checks digests
//! as well, so a lost race surfaces as a conflict rather than a silent
//! overwrite.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use tracing::debug;

use shiplane_core::Digest;
use shiplane_core::config::RegistryConfig;

use crate::client::Registry;
use crate::error::{RegistryError, RegistryResult};

const MANIFEST_ACCEPT: &str = "application/vnd.oci.image.manifest.v1+json, \
     application/vnd.docker.distribution.manifest.v2+json";
const MANIFEST_DEFAULT_TYPE: &str = "application/vnd.docker.distribution.manifest.v2+json";
const DIGEST_HEADER: &str = "Docker-Content-Digest";

#[derive(Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Registry client speaking the distribution v2 HTTP API.
#[derive(Clone)]
pub struct HttpRegistry {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRegistry {
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
    }

    fn manifest_url(&self, repo: &str, reference: &str) -> String {
        format!("{}/v2/{}/manifests/{}", self.base_url, repo, reference)
    }

    /// Map a non-success status to the error taxonomy.
    fn unexpected(op: &str, status: StatusCode) -> RegistryError {
        if status.is_server_error() {
            RegistryError::Unavailable(format!("{op}: {status}"))
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            RegistryError::Auth(format!("{op}: {status}"))
        } else {
            RegistryError::Protocol(format!("{op}: unexpected status {status}"))
        }
    }

    fn digest_from_headers(resp: &reqwest::Response) -> Option<Digest> {
        let raw = resp.headers().get(DIGEST_HEADER)?.to_str().ok()?;
        Digest::parse(raw).ok()
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn list_tags(&self, repo: &str) -> RegistryResult<Vec<String>> {
        let url = format!("{}/v2/{}/tags/list", self.base_url, repo);
        let resp = self.request(reqwest::Method::GET, url).send().await?;

        match resp.status() {
            s if s.is_success() => {
                let list: TagList = resp
                    .json()
                    .await
                    .map_err(|e| RegistryError::Protocol(format!("tag list body: {e}")))?;
                Ok(list.tags.unwrap_or_default())
            }
            StatusCode::NOT_FOUND => Err(RegistryError::NotFound(format!("repository {repo}"))),
            s => Err(Self::unexpected("list tags", s)),
        }
    }

    async fn manifest_digest(&self, repo: &str, tag: &str) -> RegistryResult<Option<Digest>> {
        let url = self.manifest_url(repo, tag);
        let resp = self
            .request(reqwest::Method::HEAD, url)
            .header(header::ACCEPT, MANIFEST_ACCEPT)
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => {
                if let Some(digest) = Self::digest_from_headers(&resp) {
                    return Ok(Some(digest));
                }
                // Some registries omit the digest header on HEAD; fall
                // back to fetching the body and hashing it ourselves.
                debug!(repo, tag, "no digest header, hashing manifest body");
                let resp = self
                    .request(reqwest::Method::GET, self.manifest_url(repo, tag))
                    .header(header::ACCEPT, MANIFEST_ACCEPT)
                    .send()
                    .await?;
                if !resp.status().is_success() {
                    return Err(Self::unexpected("resolve manifest", resp.status()));
                }
                Ok(Some(Digest::of(&resp.bytes().await?)))
            }
            StatusCode::NOT_FOUND => Ok(None),
            s => Err(Self::unexpected("resolve manifest", s)),
        }
    }

    async fn fetch_manifest(&self, repo: &str, digest: &Digest) -> RegistryResult<Bytes> {
        let url = self.manifest_url(repo, digest.as_str());
        let resp = self
            .request(reqwest::Method::GET, url)
            .header(header::ACCEPT, MANIFEST_ACCEPT)
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => Ok(resp.bytes().await?),
            StatusCode::NOT_FOUND => Err(RegistryError::NotFound(format!("manifest {digest}"))),
            s => Err(Self::unexpected("fetch manifest", s)),
        }
    }

    async fn put_manifest(&self, repo: &str, tag: &str, manifest: Bytes) -> RegistryResult<Digest> {
        let digest = Digest::of(&manifest);

        if let Some(existing) = self.manifest_digest(repo, tag).await? {
            if existing == digest {
                debug!(repo, tag, %digest, "tag already points at digest, skipping push");
                return Ok(digest);
            }
            return Err(RegistryError::Conflict {
                tag: format!("{repo}:{tag}"),
                existing,
                attempted: digest,
            });
        }

        // Preserve the manifest's own media type when it declares one.
        let content_type = serde_json::from_slice::<serde_json::Value>(&manifest)
            .ok()
            .and_then(|v| v.get("mediaType")?.as_str().map(String::from))
            .unwrap_or_else(|| MANIFEST_DEFAULT_TYPE.to_string());

        let url = self.manifest_url(repo, tag);
        let resp = self
            .request(reqwest::Method::PUT, url)
            .header(header::CONTENT_TYPE, content_type)
            .body(manifest)
            .send()
            .await?;

        match resp.status() {
            StatusCode::CREATED | StatusCode::OK => {
                debug!(repo, tag, %digest, "manifest pushed");
                Ok(digest)
            }
            s => Err(Self::unexpected("push manifest", s)),
        }
    }
}
