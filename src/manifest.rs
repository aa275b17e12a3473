//! Manifest media types and parsing
//!
//! A [`Manifest`] is kept as the raw payload the registry returned plus the ordered
//! list of content descriptors it references. Supported documents:
//! - Docker image manifest v2 schema 2
//! - Docker image manifest v2 schema 1 (signed and unsigned)
//! - OCI image manifest v1
//!
//! Manifest lists and OCI indexes reference other manifests rather than blobs and are
//! rejected.

use crate::digest::DigestUtils;
use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};

pub const MEDIA_TYPE_DOCKER_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const MEDIA_TYPE_DOCKER_V1_SIGNED: &str = "application/vnd.docker.distribution.manifest.v1+prettyjws";
pub const MEDIA_TYPE_DOCKER_V1: &str = "application/vnd.docker.distribution.manifest.v1+json";
pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const MEDIA_TYPE_DOCKER_LIST: &str = "application/vnd.docker.distribution.manifest.list.v2+json";
pub const MEDIA_TYPE_OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";

/// Media type schema1 manifests imply for every layer
pub const MEDIA_TYPE_V1_LAYER: &str = "application/vnd.docker.container.image.rootfs.diff+x-gtar";

/// Media types requested from the registry, in priority order
pub const ACCEPTED_MANIFEST_TYPES: &[&str] = &[
    MEDIA_TYPE_DOCKER_V2,
    MEDIA_TYPE_DOCKER_V1_SIGNED,
    MEDIA_TYPE_DOCKER_V1,
    MEDIA_TYPE_OCI_MANIFEST,
];

/// Content reference: enough to locate and verify a blob.
///
/// A `size` of 0 means the size is unknown (schema1 manifests carry none).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "mediaType", default)]
    pub media_type: String,
    pub digest: String,
    #[serde(default)]
    pub size: u64,
}

impl Descriptor {
    pub fn new(digest: impl Into<String>, size: u64, media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            digest: digest.into(),
            size,
        }
    }

    pub fn has_known_size(&self) -> bool {
        self.size > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestType {
    DockerV2,
    DockerV1,
    OciManifest,
    DockerList,
    OciIndex,
    Unknown(String),
}

impl ManifestType {
    pub fn from_media_type(media_type: &str) -> Self {
        // Content-Type headers may carry parameters
        let media_type = media_type.split(';').next().unwrap_or("").trim();
        match media_type {
            MEDIA_TYPE_DOCKER_V2 => ManifestType::DockerV2,
            MEDIA_TYPE_DOCKER_V1 | MEDIA_TYPE_DOCKER_V1_SIGNED => ManifestType::DockerV1,
            MEDIA_TYPE_OCI_MANIFEST => ManifestType::OciManifest,
            MEDIA_TYPE_DOCKER_LIST => ManifestType::DockerList,
            MEDIA_TYPE_OCI_INDEX => ManifestType::OciIndex,
            other => ManifestType::Unknown(other.to_string()),
        }
    }

    pub fn to_content_type(&self) -> &str {
        match self {
            ManifestType::DockerV2 => MEDIA_TYPE_DOCKER_V2,
            ManifestType::DockerV1 => MEDIA_TYPE_DOCKER_V1_SIGNED,
            ManifestType::OciManifest => MEDIA_TYPE_OCI_MANIFEST,
            ManifestType::DockerList => MEDIA_TYPE_DOCKER_LIST,
            ManifestType::OciIndex => MEDIA_TYPE_OCI_INDEX,
            ManifestType::Unknown(media_type) => media_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ManifestHeader {
    #[serde(rename = "schemaVersion", default)]
    schema_version: u32,
    #[serde(rename = "mediaType")]
    media_type: Option<String>,
    manifests: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ImageManifest {
    #[serde(rename = "schemaVersion")]
    schema_version: u32,
    config: Descriptor,
    #[serde(default)]
    layers: Vec<Descriptor>,
}

#[derive(Debug, Deserialize)]
struct SchemaV1Manifest {
    #[serde(rename = "schemaVersion")]
    schema_version: u32,
    #[serde(rename = "fsLayers")]
    fs_layers: Vec<FsLayer>,
}

#[derive(Debug, Deserialize)]
struct FsLayer {
    #[serde(rename = "blobSum")]
    blob_sum: String,
}

/// A fetched manifest and the blobs it references, in document order
#[derive(Debug, Clone)]
pub struct Manifest {
    manifest_type: ManifestType,
    payload: Vec<u8>,
    references: Vec<Descriptor>,
}

impl Manifest {
    /// Parse a manifest payload. `content_type` is the response's `Content-Type`
    /// header; when it is missing or generic the document itself decides.
    pub fn parse(content_type: Option<&str>, payload: Vec<u8>) -> Result<Self> {
        let manifest_type = Self::detect_type(content_type, &payload)?;

        let references = match &manifest_type {
            ManifestType::DockerV2 | ManifestType::OciManifest => {
                let manifest: ImageManifest = serde_json::from_slice(&payload)
                    .map_err(|e| RegistryError::Parse(format!("Invalid image manifest: {}", e)))?;
                if manifest.schema_version != 2 {
                    return Err(RegistryError::Parse(format!(
                        "Unsupported schema version {} for {}",
                        manifest.schema_version,
                        manifest_type.to_content_type()
                    )));
                }

                let mut references = Vec::with_capacity(manifest.layers.len() + 1);
                references.push(manifest.config);
                references.extend(manifest.layers);
                references
            }
            ManifestType::DockerV1 => {
                let manifest: SchemaV1Manifest = serde_json::from_slice(&payload)
                    .map_err(|e| RegistryError::Parse(format!("Invalid schema1 manifest: {}", e)))?;
                if manifest.schema_version != 1 {
                    return Err(RegistryError::Parse(format!(
                        "Unsupported schema version {} for schema1 manifest",
                        manifest.schema_version
                    )));
                }

                manifest
                    .fs_layers
                    .into_iter()
                    .map(|layer| Descriptor::new(layer.blob_sum, 0, MEDIA_TYPE_V1_LAYER))
                    .collect()
            }
            other => {
                return Err(RegistryError::Parse(format!(
                    "Unsupported manifest media type: {}",
                    other.to_content_type()
                )));
            }
        };

        for reference in &references {
            DigestUtils::validate(&reference.digest)
                .map_err(|e| RegistryError::Parse(format!("Manifest references invalid digest: {}", e)))?;
        }

        Ok(Self {
            manifest_type,
            payload,
            references,
        })
    }

    fn detect_type(content_type: Option<&str>, payload: &[u8]) -> Result<ManifestType> {
        if let Some(content_type) = content_type {
            let manifest_type = ManifestType::from_media_type(content_type);
            if !matches!(manifest_type, ManifestType::Unknown(_)) {
                return Ok(manifest_type);
            }
        }

        let header: ManifestHeader = serde_json::from_slice(payload)
            .map_err(|e| RegistryError::Parse(format!("Manifest is not valid JSON: {}", e)))?;

        if let Some(media_type) = header.media_type {
            return Ok(ManifestType::from_media_type(&media_type));
        }

        match header.schema_version {
            1 => Ok(ManifestType::DockerV1),
            2 if header.manifests.is_some() => Ok(ManifestType::OciIndex),
            2 => Ok(ManifestType::OciManifest),
            other => Err(RegistryError::Parse(format!(
                "Cannot determine manifest type (schemaVersion {})",
                other
            ))),
        }
    }

    pub fn manifest_type(&self) -> &ManifestType {
        &self.manifest_type
    }

    pub fn media_type(&self) -> &str {
        self.manifest_type.to_content_type()
    }

    /// Blobs the manifest references, in document order, duplicates included
    pub fn references(&self) -> &[Descriptor] {
        &self.references
    }

    /// Digest of the raw payload
    pub fn digest(&self) -> String {
        DigestUtils::compute_docker_digest(&self.payload)
    }
}
