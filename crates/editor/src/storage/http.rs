use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{
    AssetInfo, AssetLocation, AssetResolver, AssetSource, CreatedScene, ProjectInfo, SaveStatus,
    SceneStorage, StorageError,
};
use crate::config::ServerConfig;
use crate::scene::SceneDocument;

/// `reqwest` client for the scene service and its static file tree.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(config: &ServerConfig) -> Result<Self, StorageError> {
        let base = Url::parse(&config.url).map_err(|error| StorageError::InvalidUrl {
            target: config.url.clone(),
            message: error.to_string(),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|error| StorageError::Transport {
                url: config.url.clone(),
                message: error.to_string(),
            })?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Appends `segments` to the base path. Each segment is percent-encoded on its own, so
    /// a `/` inside a segment never creates a new path level.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, StorageError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| StorageError::InvalidUrl {
                target: segments.join("/"),
                message: "base url cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn scene_endpoint(&self, scene_path: &str) -> Result<Url, StorageError> {
        let mut segments = vec!["api", "scenes"];
        segments.extend(scene_path.split('/').filter(|segment| !segment.is_empty()));
        self.endpoint(&segments)
    }

    pub fn locate(&self, location: &str) -> Result<Url, StorageError> {
        self.base
            .join(location)
            .map_err(|error| StorageError::InvalidUrl {
                target: location.to_string(),
                message: error.to_string(),
            })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, StorageError> {
        debug!(url = %url, "http_get");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|error| transport_error(&url, &error))?;
        read_json(&url, response).await
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: Url,
        body: &B,
    ) -> Result<T, StorageError> {
        debug!(url = %url, method = %method, "http_send");
        let response = self
            .client
            .request(method, url.clone())
            .json(body)
            .send()
            .await
            .map_err(|error| transport_error(&url, &error))?;
        read_json(&url, response).await
    }
}

fn transport_error(url: &Url, error: &reqwest::Error) -> StorageError {
    StorageError::Transport {
        url: url.to_string(),
        message: error.to_string(),
    }
}

async fn read_bytes(url: &Url, response: Response) -> Result<Vec<u8>, StorageError> {
    let status = response.status();
    if !status.is_success() {
        return Err(StorageError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response
        .bytes()
        .await
        .map_err(|error| transport_error(url, &error))?;
    Ok(body.to_vec())
}

async fn read_json<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T, StorageError> {
    let body = read_bytes(url, response).await?;
    decode_json(url, &body)
}

pub(crate) fn decode_json<T: DeserializeOwned>(url: &Url, body: &[u8]) -> Result<T, StorageError> {
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| StorageError::Decode {
        url: url.to_string(),
        path: error.path().to_string(),
        message: error.inner().to_string(),
    })
}

#[async_trait(?Send)]
impl SceneStorage for HttpBackend {
    async fn list_scenes(&self) -> Result<Vec<String>, StorageError> {
        self.get_json(self.endpoint(&["api", "scenes"])?).await
    }

    async fn fetch_scene(&self, path: &str) -> Result<SceneDocument, StorageError> {
        self.get_json(self.scene_endpoint(path)?).await
    }

    async fn update_scene(
        &self,
        path: &str,
        scene: &SceneDocument,
    ) -> Result<SaveStatus, StorageError> {
        self.send_json(reqwest::Method::PUT, self.scene_endpoint(path)?, scene)
            .await
    }

    async fn create_scene(&self, scene: &SceneDocument) -> Result<CreatedScene, StorageError> {
        self.send_json(
            reqwest::Method::POST,
            self.endpoint(&["api", "scenes"])?,
            scene,
        )
        .await
    }

    async fn fetch_prefab(&self, prefab_id: &str) -> Result<SceneDocument, StorageError> {
        self.get_json(self.endpoint(&["api", "prefab", prefab_id])?)
            .await
    }

    async fn project_info(&self) -> Result<ProjectInfo, StorageError> {
        self.get_json(self.endpoint(&["api", "project"])?).await
    }

    async fn list_assets(&self) -> Result<Vec<AssetInfo>, StorageError> {
        self.get_json(self.endpoint(&["api", "assets"])?).await
    }
}

#[async_trait(?Send)]
impl AssetResolver for HttpBackend {
    async fn resolve_asset(&self, key: &str) -> Result<AssetLocation, StorageError> {
        self.get_json(self.endpoint(&["api", "assets", "resolve", key])?)
            .await
    }
}

#[async_trait(?Send)]
impl AssetSource for HttpBackend {
    async fn fetch_bytes(&self, location: &str) -> Result<Vec<u8>, StorageError> {
        let url = self.locate(location)?;
        debug!(url = %url, "http_fetch_file");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|error| transport_error(&url, &error))?;
        read_bytes(&url, response).await
    }
}
