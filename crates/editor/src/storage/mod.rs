use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene::SceneDocument;

mod http;

pub use http::HttpBackend;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to decode response from {url} at '{path}': {message}")]
    Decode {
        url: String,
        path: String,
        message: String,
    },
    #[error("cannot build a request url for '{target}': {message}")]
    InvalidUrl { target: String, message: String },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Status { status: 404, .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Pack,
    Atlas,
}

/// Answer of the asset resolution endpoint for one texture key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLocation {
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AssetKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl AssetLocation {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn pack(path: &str) -> Self {
        Self {
            found: true,
            kind: Some(AssetKind::Pack),
            path: Some(path.to_string()),
            directory: None,
        }
    }

    pub fn atlas(path: &str, directory: &str) -> Self {
        Self {
            found: true,
            kind: Some(AssetKind::Atlas),
            path: Some(path.to_string()),
            directory: Some(directory.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub scene_count: u64,
    #[serde(default)]
    pub folders: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveStatus {
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedScene {
    pub status: String,
    pub path: String,
}

/// Scene, prefab and project endpoints of the scene service.
#[async_trait(?Send)]
pub trait SceneStorage {
    async fn list_scenes(&self) -> Result<Vec<String>, StorageError>;

    async fn fetch_scene(&self, path: &str) -> Result<SceneDocument, StorageError>;

    async fn update_scene(
        &self,
        path: &str,
        scene: &SceneDocument,
    ) -> Result<SaveStatus, StorageError>;

    async fn create_scene(&self, scene: &SceneDocument) -> Result<CreatedScene, StorageError>;

    async fn fetch_prefab(&self, prefab_id: &str) -> Result<SceneDocument, StorageError>;

    async fn project_info(&self) -> Result<ProjectInfo, StorageError>;

    async fn list_assets(&self) -> Result<Vec<AssetInfo>, StorageError>;
}

#[async_trait(?Send)]
pub trait AssetResolver {
    async fn resolve_asset(&self, key: &str) -> Result<AssetLocation, StorageError>;
}

/// Raw static files (pack manifests, atlas JSON, images, fonts). `location` is either an
/// absolute URL or a path relative to the server root.
#[async_trait(?Send)]
pub trait AssetSource {
    async fn fetch_bytes(&self, location: &str) -> Result<Vec<u8>, StorageError>;
}
