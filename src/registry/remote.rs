//! Registry HTTP API v2 implementations of the repository services
//!
//! Endpoints used:
//! - manifests: `GET|HEAD /v2/{name}/manifests/{reference}` with `Accept` negotiation
//! - tags: `GET /v2/{name}/tags/list`, following `Link: <...>; rel="next"` pages
//! - blobs: `HEAD|GET /v2/{name}/blobs/{digest}`
//! - uploads: `POST /v2/{name}/blobs/uploads/`, `PATCH` chunks, `PUT ?digest=` to
//!   commit, `DELETE` to cancel
//!
//! Every request goes through the repository's [`HttpTransport`], so a decorated
//! transport authenticates all of them.

use crate::error::handlers::{HttpErrorHandler, NetworkErrorHandler};
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::digest::DigestUtils;
use crate::manifest::{Descriptor, Manifest, ManifestType};
use crate::registry::memory::DEFAULT_MEDIA_TYPE;
use crate::registry::reference::{Reference, RepositoryName};
use crate::registry::services::{BlobStore, BlobWriter, ByteStream, ManifestService, TagService};
use crate::registry::transport::HttpTransport;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, LINK, LOCATION};
use reqwest::{Method, Request, Response};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use url::Url;

pub const DOCKER_CONTENT_DIGEST: &str = "docker-content-digest";
pub const DOCKER_UPLOAD_UUID: &str = "docker-upload-uuid";

/// Upload sessions buffer this many bytes before sending a chunk
pub const UPLOAD_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// One repository on one registry, reachable through one transport
#[derive(Clone)]
pub struct RegistryEndpoint {
    base: Url,
    name: RepositoryName,
    transport: Arc<dyn HttpTransport>,
    output: Logger,
}

impl RegistryEndpoint {
    pub fn new(base: Url, name: RepositoryName, transport: Arc<dyn HttpTransport>, output: Logger) -> Self {
        Self {
            base,
            name,
            transport,
            output,
        }
    }

    /// `{base}/v2/{name}/{path}`
    fn url(&self, path: &str) -> Result<Url> {
        let url = format!("{}/v2/{}/{}", self.base.as_str().trim_end_matches('/'), self.name, path);
        Url::parse(&url).map_err(|e| RegistryError::Validation(format!("Invalid registry URL {}: {}", url, e)))
    }

    /// Resolve a `Location` or `Link` target, which may be relative to the registry
    fn resolve(&self, location: &str) -> Result<Url> {
        self.base
            .join(location)
            .map_err(|e| RegistryError::Registry(format!("Invalid location {}: {}", location, e)))
    }

    async fn send(&self, request: Request) -> Result<Response> {
        self.transport.send(request).await
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl reqwest::header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn header_u64(headers: &HeaderMap, name: HeaderName) -> Option<u64> {
    header_str(headers, name).and_then(|value| value.trim().parse().ok())
}

fn with_accept(request: &mut Request, accept: &[&str]) -> Result<()> {
    for media_type in accept {
        let value = HeaderValue::from_str(media_type)
            .map_err(|e| RegistryError::Validation(format!("Invalid media type {}: {}", media_type, e)))?;
        request.headers_mut().append(ACCEPT, value);
    }
    Ok(())
}

/// Extract the `rel="next"` target from a `Link` header
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|param| param.trim().replace(' ', "") == "rel=\"next\"");
        if !is_next {
            return None;
        }
        let target = target.trim();
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

pub struct RemoteManifestService {
    endpoint: Arc<RegistryEndpoint>,
}

impl RemoteManifestService {
    pub fn new(endpoint: Arc<RegistryEndpoint>) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl ManifestService for RemoteManifestService {
    async fn get(&self, reference: &Reference, accept: &[&str]) -> Result<Manifest> {
        let url = self.endpoint.url(&format!("manifests/{}", reference))?;
        let mut request = Request::new(Method::GET, url);
        with_accept(&mut request, accept)?;

        self.endpoint
            .output
            .verbose(&format!("Fetching manifest {}:{}", self.endpoint.name, reference));

        let response = self.endpoint.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = HttpErrorHandler::error_text(response).await;
            return Err(HttpErrorHandler::handle_registry_error(
                status,
                &error_text,
                &format!("manifest {}:{}", self.endpoint.name, reference),
            ));
        }

        let content_type = header_str(response.headers(), CONTENT_TYPE).map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "manifest read"))?;
        let manifest = Manifest::parse(content_type.as_deref(), body.to_vec())?;

        // Signed schema1 digests cover the payload without signatures
        if let Reference::Digest(expected) = reference {
            if manifest.manifest_type() != &ManifestType::DockerV1 && manifest.digest() != *expected {
                return Err(RegistryError::Verification(format!(
                    "Manifest digest mismatch: requested {}, received {}",
                    expected,
                    manifest.digest()
                )));
            }
        }

        self.endpoint.output.detail(&format!(
            "Manifest {} ({}) references {} blobs",
            reference,
            manifest.media_type(),
            manifest.references().len()
        ));
        Ok(manifest)
    }
}

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

pub struct RemoteTagService {
    endpoint: Arc<RegistryEndpoint>,
}

impl RemoteTagService {
    pub fn new(endpoint: Arc<RegistryEndpoint>) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl TagService for RemoteTagService {
    async fn all(&self) -> Result<Vec<String>> {
        let mut tags = Vec::new();
        let mut next = Some(self.endpoint.url("tags/list")?);

        while let Some(url) = next.take() {
            let response = self.endpoint.send(Request::new(Method::GET, url)).await?;
            let status = response.status();
            if !status.is_success() {
                let error_text = HttpErrorHandler::error_text(response).await;
                return Err(HttpErrorHandler::handle_registry_error(
                    status,
                    &error_text,
                    &format!("tag list {}", self.endpoint.name),
                ));
            }

            let link = header_str(response.headers(), LINK).and_then(next_link);
            let body = response
                .bytes()
                .await
                .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "tag list read"))?;
            let page: TagList = serde_json::from_slice(&body)?;
            tags.extend(page.tags.unwrap_or_default());

            next = match link {
                Some(link) => Some(self.endpoint.resolve(&link)?),
                None => None,
            };
        }

        Ok(tags)
    }

    async fn get(&self, tag: &str) -> Result<Descriptor> {
        let reference = Reference::tag(tag)?;
        let url = self.endpoint.url(&format!("manifests/{}", reference))?;
        let mut request = Request::new(Method::HEAD, url);
        with_accept(&mut request, crate::manifest::ACCEPTED_MANIFEST_TYPES)?;

        let response = self.endpoint.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpErrorHandler::handle_registry_error(
                status,
                "",
                &format!("tag {}:{}", self.endpoint.name, tag),
            ));
        }

        let headers = response.headers();
        let digest = header_str(headers, DOCKER_CONTENT_DIGEST).ok_or_else(|| {
            RegistryError::Registry(format!("Registry returned no digest for tag {}", tag))
        })?;
        let size = header_u64(headers, CONTENT_LENGTH).unwrap_or(0);
        let media_type = header_str(headers, CONTENT_TYPE).unwrap_or_default();

        Ok(Descriptor::new(digest, size, media_type))
    }
}

pub struct RemoteBlobStore {
    endpoint: Arc<RegistryEndpoint>,
}

impl RemoteBlobStore {
    pub fn new(endpoint: Arc<RegistryEndpoint>) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl BlobStore for RemoteBlobStore {
    async fn stat(&self, digest: &str) -> Result<Descriptor> {
        let url = self.endpoint.url(&format!("blobs/{}", digest))?;
        let response = self.endpoint.send(Request::new(Method::HEAD, url)).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(HttpErrorHandler::handle_registry_error(
                status,
                "",
                &format!("blob {} in {}", digest, self.endpoint.name),
            ));
        }

        let headers = response.headers();
        let size = header_u64(headers, CONTENT_LENGTH).ok_or_else(|| {
            RegistryError::Registry(format!("Registry returned no Content-Length for blob {}", digest))
        })?;
        let media_type = header_str(headers, CONTENT_TYPE).unwrap_or(DEFAULT_MEDIA_TYPE);
        let digest = header_str(headers, DOCKER_CONTENT_DIGEST).unwrap_or(digest);

        Ok(Descriptor::new(digest, size, media_type))
    }

    async fn open(&self, digest: &str) -> Result<ByteStream> {
        let url = self.endpoint.url(&format!("blobs/{}", digest))?;
        let response = self.endpoint.send(Request::new(Method::GET, url)).await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = HttpErrorHandler::error_text(response).await;
            return Err(HttpErrorHandler::handle_registry_error(
                status,
                &error_text,
                &format!("blob {} in {}", digest, self.endpoint.name),
            ));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| NetworkErrorHandler::handle_network_error(&e, "blob read")));
        Ok(Box::pin(stream))
    }

    async fn create(&self) -> Result<Box<dyn BlobWriter>> {
        let url = self.endpoint.url("blobs/uploads/")?;
        let mut request = Request::new(Method::POST, url);
        request.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from_static("0"));

        let response = self.endpoint.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = HttpErrorHandler::error_text(response).await;
            return Err(HttpErrorHandler::handle_upload_error(status, &error_text, "upload start"));
        }

        let location = header_str(response.headers(), LOCATION)
            .ok_or_else(|| RegistryError::Registry("No Location header in upload response".to_string()))?;
        let location = self.endpoint.resolve(location)?;
        let id = header_str(response.headers(), DOCKER_UPLOAD_UUID)
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        self.endpoint.output.detail(&format!("Started upload session {}", id));

        Ok(Box::new(RemoteBlobWriter {
            endpoint: self.endpoint.clone(),
            id,
            location,
            buffer: BytesMut::new(),
            flushed: 0,
            hasher: Sha256::new(),
            state: SessionState::Open,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Committed,
    Cancelled,
}

/// Chunked upload session against `/v2/{name}/blobs/uploads/`
pub struct RemoteBlobWriter {
    endpoint: Arc<RegistryEndpoint>,
    id: String,
    location: Url,
    buffer: BytesMut,
    flushed: u64,
    hasher: Sha256,
    state: SessionState,
}

impl RemoteBlobWriter {
    fn ensure_open(&self) -> Result<()> {
        if self.state != SessionState::Open {
            return Err(RegistryError::Registry(format!(
                "Upload session {} is no longer open",
                self.id
            )));
        }
        Ok(())
    }

    fn update_location(&mut self, response: &Response) -> Result<()> {
        if let Some(location) = header_str(response.headers(), LOCATION) {
            self.location = self.endpoint.resolve(location)?;
        }
        Ok(())
    }

    fn octet_stream(request: &mut Request, body: Bytes) {
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
        request.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(body.len() as u64));
        *request.body_mut() = Some(body.into());
    }

    /// Send the buffered bytes as one `PATCH` chunk
    async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let chunk = self.buffer.split().freeze();
        let start = self.flushed;
        let end = start + chunk.len() as u64 - 1;

        let mut request = Request::new(Method::PATCH, self.location.clone());
        let range = HeaderValue::from_str(&format!("{}-{}", start, end))
            .map_err(|e| RegistryError::Registry(format!("Invalid content range: {}", e)))?;
        request.headers_mut().insert("content-range", range);
        let len = chunk.len() as u64;
        Self::octet_stream(&mut request, chunk);

        let response = self.endpoint.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = HttpErrorHandler::error_text(response).await;
            return Err(HttpErrorHandler::handle_upload_error(status, &error_text, "chunk upload"));
        }

        self.update_location(&response)?;
        self.flushed += len;
        self.endpoint
            .output
            .trace(&format!("Upload {}: {} bytes sent", self.id, self.flushed));
        Ok(())
    }

    fn verify(&self, expected: &Descriptor) -> Result<()> {
        let written = self.size();
        if expected.has_known_size() && written != expected.size {
            return Err(RegistryError::Verification(format!(
                "Size mismatch for {}: expected {} bytes, received {}",
                expected.digest, expected.size, written
            )));
        }

        if DigestUtils::is_valid_docker_digest(&expected.digest) {
            let computed = format!("sha256:{}", hex::encode(self.hasher.clone().finalize()));
            if computed != expected.digest {
                return Err(RegistryError::Verification(format!(
                    "Digest mismatch: expected {}, computed {}",
                    expected.digest, computed
                )));
            }
        } else {
            self.endpoint.output.detail(&format!(
                "Digest {} cannot be verified locally; relying on registry verification",
                expected.digest
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl BlobWriter for RemoteBlobWriter {
    fn id(&self) -> &str {
        &self.id
    }

    fn size(&self) -> u64 {
        self.flushed + self.buffer.len() as u64
    }

    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        self.ensure_open()?;
        self.hasher.update(&chunk);
        self.buffer.extend_from_slice(&chunk);

        if self.buffer.len() >= UPLOAD_CHUNK_SIZE {
            self.flush().await?;
        }
        Ok(())
    }

    async fn commit(&mut self, expected: &Descriptor) -> Result<Descriptor> {
        self.ensure_open()?;

        if let Err(e) = self.verify(expected) {
            // Never finalize mismatching content
            if let Err(cancel_err) = self.cancel().await {
                self.endpoint
                    .output
                    .warning(&format!("Failed to cancel upload {}: {}", self.id, cancel_err));
            }
            return Err(e);
        }

        let written = self.size();
        let mut url = self.location.clone();
        url.query_pairs_mut().append_pair("digest", &expected.digest);

        let mut request = Request::new(Method::PUT, url);
        let remaining = self.buffer.split().freeze();
        Self::octet_stream(&mut request, remaining);

        let response = self.endpoint.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = HttpErrorHandler::error_text(response).await;
            return Err(HttpErrorHandler::handle_upload_error(status, &error_text, "blob commit"));
        }

        if let Some(digest) = header_str(response.headers(), DOCKER_CONTENT_DIGEST) {
            if digest != expected.digest {
                return Err(RegistryError::Verification(format!(
                    "Registry committed {} but {} was expected",
                    digest, expected.digest
                )));
            }
        }

        self.state = SessionState::Committed;
        Ok(Descriptor::new(expected.digest.clone(), written, expected.media_type.clone()))
    }

    async fn cancel(&mut self) -> Result<()> {
        if self.state != SessionState::Open {
            return Ok(());
        }
        self.state = SessionState::Cancelled;
        self.buffer.clear();

        let response = self
            .endpoint
            .send(Request::new(Method::DELETE, self.location.clone()))
            .await?;
        let status = response.status();
        if status.is_success() || status.as_u16() == 404 {
            return Ok(());
        }

        let error_text = HttpErrorHandler::error_text(response).await;
        Err(HttpErrorHandler::handle_upload_error(status, &error_text, "upload cancel"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ACCEPTED_MANIFEST_TYPES, MEDIA_TYPE_DOCKER_V2};
    use crate::registry::transport::testing::{respond, FnTransport};

    fn endpoint(transport: Arc<FnTransport>) -> Arc<RegistryEndpoint> {
        Arc::new(RegistryEndpoint::new(
            Url::parse("https://registry.example").unwrap(),
            RepositoryName::parse("library/alpine").unwrap(),
            transport,
            Logger::new_quiet(),
        ))
    }

    fn schema2_payload(config: &str) -> Vec<u8> {
        serde_json::json!({
            "schemaVersion": 2,
            "mediaType": MEDIA_TYPE_DOCKER_V2,
            "config": {"mediaType": "application/vnd.docker.container.image.v1+json", "size": 3, "digest": config},
            "layers": []
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_next_link() {
        assert_eq!(
            next_link(r#"</v2/library/alpine/tags/list?n=2&last=b>; rel="next""#).as_deref(),
            Some("/v2/library/alpine/tags/list?n=2&last=b")
        );
        assert_eq!(next_link(r#"</v2/x>; rel="prev""#), None);
    }

    #[tokio::test]
    async fn test_manifest_get_sends_accept_headers_in_priority_order() {
        let config = DigestUtils::compute_docker_digest(b"cfg");
        let payload = schema2_payload(&config);
        let transport = FnTransport::new(move |_| respond(200, &[("content-type", MEDIA_TYPE_DOCKER_V2)], &payload));
        let service = RemoteManifestService::new(endpoint(transport.clone()));

        let manifest = service
            .get(&Reference::tag("3.10.2").unwrap(), ACCEPTED_MANIFEST_TYPES)
            .await
            .unwrap();
        assert_eq!(manifest.references().len(), 1);

        let recorded = transport.recorded();
        assert_eq!(recorded[0].url.as_str(), "https://registry.example/v2/library/alpine/manifests/3.10.2");
        let accepts: Vec<_> = recorded[0]
            .headers
            .get_all(ACCEPT)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(accepts, ACCEPTED_MANIFEST_TYPES.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_manifest_not_found() {
        let transport = FnTransport::new(|_| respond(404, &[], br#"{"errors":[{"code":"MANIFEST_UNKNOWN"}]}"#));
        let service = RemoteManifestService::new(endpoint(transport));

        let err = service
            .get(&Reference::tag("missing").unwrap(), ACCEPTED_MANIFEST_TYPES)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_manifest_by_digest_is_verified() {
        let config = DigestUtils::compute_docker_digest(b"cfg");
        let payload = schema2_payload(&config);
        let transport = FnTransport::new(move |_| respond(200, &[("content-type", MEDIA_TYPE_DOCKER_V2)], &payload));
        let service = RemoteManifestService::new(endpoint(transport));

        let wrong = Reference::digest(&DigestUtils::compute_docker_digest(b"other")).unwrap();
        let err = service.get(&wrong, ACCEPTED_MANIFEST_TYPES).await.unwrap_err();
        assert!(matches!(err, RegistryError::Verification(_)));
    }

    #[tokio::test]
    async fn test_tags_follow_pagination() {
        let transport = FnTransport::new(|req| {
            if req.url.query().is_some_and(|q| q.contains("last=b")) {
                respond(200, &[], br#"{"name":"library/alpine","tags":["c"]}"#)
            } else {
                respond(
                    200,
                    &[("link", r#"</v2/library/alpine/tags/list?n=2&last=b>; rel="next""#)],
                    br#"{"name":"library/alpine","tags":["a","b"]}"#,
                )
            }
        });
        let service = RemoteTagService::new(endpoint(transport.clone()));

        assert_eq!(service.all().await.unwrap(), vec!["a", "b", "c"]);
        assert_eq!(transport.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_tag_get_resolves_descriptor() {
        let digest = DigestUtils::compute_docker_digest(b"manifest");
        let header_digest = digest.clone();
        let transport = FnTransport::new(move |_| {
            respond(
                200,
                &[
                    ("docker-content-digest", header_digest.as_str()),
                    ("content-length", "528"),
                    ("content-type", MEDIA_TYPE_DOCKER_V2),
                ],
                b"",
            )
        });
        let service = RemoteTagService::new(endpoint(transport.clone()));

        let descriptor = service.get("3.10.2").await.unwrap();
        assert_eq!(descriptor, Descriptor::new(digest, 528, MEDIA_TYPE_DOCKER_V2));
        assert_eq!(transport.recorded()[0].method, Method::HEAD);
    }

    #[tokio::test]
    async fn test_blob_stat() {
        let digest = DigestUtils::compute_docker_digest(b"layer");
        let transport = FnTransport::new(|req| {
            if req.url.path().ends_with("missing") {
                respond(404, &[], b"")
            } else {
                respond(200, &[("content-length", "5")], b"")
            }
        });
        let store = RemoteBlobStore::new(endpoint(transport.clone()));

        let descriptor = store.stat(&digest).await.unwrap();
        assert_eq!(descriptor.size, 5);
        assert_eq!(descriptor.digest, digest);
        assert_eq!(transport.recorded()[0].method, Method::HEAD);

        assert!(store.stat("sha256:missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_upload_session_commits_with_digest() {
        let data = b"blob content";
        let digest = DigestUtils::compute_docker_digest(data);
        let transport = FnTransport::new(|req| match req.method {
            Method::POST => respond(
                202,
                &[("location", "/v2/library/alpine/blobs/uploads/u1?_state=s"), ("docker-upload-uuid", "u1")],
                b"",
            ),
            Method::PUT => respond(201, &[], b""),
            _ => respond(500, &[], b""),
        });
        let store = RemoteBlobStore::new(endpoint(transport.clone()));

        let mut writer = store.create().await.unwrap();
        assert_eq!(writer.id(), "u1");
        writer.write(Bytes::from_static(data)).await.unwrap();
        let committed = writer.commit(&Descriptor::new(digest.clone(), data.len() as u64, "layer")).await.unwrap();
        assert_eq!(committed.size, data.len() as u64);

        let recorded = transport.recorded();
        assert_eq!(recorded.len(), 2);
        let put = &recorded[1];
        assert_eq!(put.method, Method::PUT);
        assert_eq!(put.url.path(), "/v2/library/alpine/blobs/uploads/u1");
        let query: Vec<(String, String)> = put.url.query_pairs().into_owned().collect();
        assert!(query.contains(&("_state".to_string(), "s".to_string())));
        assert!(query.contains(&("digest".to_string(), digest)));
        assert_eq!(put.body.as_deref(), Some(&data[..]));
    }

    #[tokio::test]
    async fn test_mismatching_upload_is_cancelled_not_committed() {
        let transport = FnTransport::new(|req| match req.method {
            Method::POST => respond(202, &[("location", "/v2/library/alpine/blobs/uploads/u2")], b""),
            Method::DELETE => respond(204, &[], b""),
            _ => respond(201, &[], b""),
        });
        let store = RemoteBlobStore::new(endpoint(transport.clone()));
        let data = vec![1u8; 20];
        let digest = DigestUtils::compute_docker_digest(&data);

        let mut writer = store.create().await.unwrap();
        writer.write(Bytes::copy_from_slice(&data[..15])).await.unwrap();
        let err = writer.commit(&Descriptor::new(digest, 20, "layer")).await.unwrap_err();
        assert!(matches!(err, RegistryError::Verification(_)));

        let methods: Vec<_> = transport.recorded().iter().map(|r| r.method.clone()).collect();
        assert_eq!(methods, vec![Method::POST, Method::DELETE]);
    }
}
