//! In-memory collaborators for unit tests. Every fake yields once before answering so
//! concurrent callers really interleave under `block_on`.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;

use crate::scene::SceneDocument;
use crate::storage::{
    AssetInfo, AssetLocation, AssetResolver, AssetSource, CreatedScene, ProjectInfo, SaveStatus,
    SceneStorage, StorageError,
};

struct YieldOnce {
    yielded: bool,
}

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

pub(crate) async fn yield_now() {
    YieldOnce { yielded: false }.await
}

fn count(calls: &RefCell<HashMap<String, usize>>, key: &str) {
    *calls.borrow_mut().entry(key.to_string()).or_default() += 1;
}

fn not_found(url: &str) -> StorageError {
    StorageError::Status {
        url: url.to_string(),
        status: 404,
    }
}

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::new(width, height);
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("encode png");
    bytes.into_inner()
}

#[derive(Default)]
pub(crate) struct FakeAssetResolver {
    answers: RefCell<HashMap<String, AssetLocation>>,
    failing: RefCell<HashSet<String>>,
    calls: RefCell<HashMap<String, usize>>,
}

impl FakeAssetResolver {
    pub(crate) fn insert(&self, key: &str, location: AssetLocation) {
        self.answers.borrow_mut().insert(key.to_string(), location);
    }

    pub(crate) fn fail(&self, key: &str) {
        self.failing.borrow_mut().insert(key.to_string());
    }

    pub(crate) fn calls(&self, key: &str) -> usize {
        self.calls.borrow().get(key).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.borrow().values().sum()
    }
}

#[async_trait(?Send)]
impl AssetResolver for FakeAssetResolver {
    async fn resolve_asset(&self, key: &str) -> Result<AssetLocation, StorageError> {
        count(&self.calls, key);
        yield_now().await;
        if self.failing.borrow().contains(key) {
            return Err(StorageError::Transport {
                url: format!("/api/assets/resolve/{key}"),
                message: "connection refused".to_string(),
            });
        }
        Ok(self
            .answers
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or_else(AssetLocation::not_found))
    }
}

#[derive(Default)]
pub(crate) struct FakeAssetSource {
    files: RefCell<HashMap<String, Vec<u8>>>,
    requested: RefCell<Vec<String>>,
}

impl FakeAssetSource {
    pub(crate) fn insert(&self, location: &str, bytes: Vec<u8>) {
        self.files.borrow_mut().insert(location.to_string(), bytes);
    }

    pub(crate) fn insert_json(&self, location: &str, value: &serde_json::Value) {
        self.insert(location, value.to_string().into_bytes());
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

#[async_trait(?Send)]
impl AssetSource for FakeAssetSource {
    async fn fetch_bytes(&self, location: &str) -> Result<Vec<u8>, StorageError> {
        self.requested.borrow_mut().push(location.to_string());
        yield_now().await;
        self.files
            .borrow()
            .get(location)
            .cloned()
            .ok_or_else(|| not_found(location))
    }
}

#[derive(Default)]
pub(crate) struct FakeSceneStorage {
    scenes: RefCell<BTreeMap<String, SceneDocument>>,
    prefabs: RefCell<HashMap<String, SceneDocument>>,
    failing_prefabs: RefCell<HashSet<String>>,
    prefab_calls: RefCell<HashMap<String, usize>>,
    fail_writes: Cell<bool>,
    writes: Cell<usize>,
}

impl FakeSceneStorage {
    pub(crate) fn insert_scene(&self, path: &str, scene: SceneDocument) {
        self.scenes.borrow_mut().insert(path.to_string(), scene);
    }

    pub(crate) fn insert_prefab(&self, prefab_id: &str, document: SceneDocument) {
        self.prefabs
            .borrow_mut()
            .insert(prefab_id.to_string(), document);
    }

    pub(crate) fn fail_prefab(&self, prefab_id: &str) {
        self.failing_prefabs
            .borrow_mut()
            .insert(prefab_id.to_string());
    }

    pub(crate) fn prefab_calls(&self, prefab_id: &str) -> usize {
        self.prefab_calls
            .borrow()
            .get(prefab_id)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.get()
    }

    pub(crate) fn scene(&self, path: &str) -> Option<SceneDocument> {
        self.scenes.borrow().get(path).cloned()
    }
}

#[async_trait(?Send)]
impl SceneStorage for FakeSceneStorage {
    async fn list_scenes(&self) -> Result<Vec<String>, StorageError> {
        yield_now().await;
        Ok(self.scenes.borrow().keys().cloned().collect())
    }

    async fn fetch_scene(&self, path: &str) -> Result<SceneDocument, StorageError> {
        yield_now().await;
        self.scene(path)
            .ok_or_else(|| not_found(&format!("/api/scenes/{path}")))
    }

    async fn update_scene(
        &self,
        path: &str,
        scene: &SceneDocument,
    ) -> Result<SaveStatus, StorageError> {
        yield_now().await;
        if self.fail_writes.get() {
            return Err(StorageError::Status {
                url: format!("/api/scenes/{path}"),
                status: 500,
            });
        }
        self.writes.set(self.writes.get() + 1);
        self.insert_scene(path, scene.clone());
        Ok(SaveStatus {
            status: "ok".to_string(),
        })
    }

    async fn create_scene(&self, scene: &SceneDocument) -> Result<CreatedScene, StorageError> {
        yield_now().await;
        if self.fail_writes.get() {
            return Err(StorageError::Status {
                url: "/api/scenes".to_string(),
                status: 500,
            });
        }
        let path = format!("{}.json", scene.id);
        self.writes.set(self.writes.get() + 1);
        self.insert_scene(&path, scene.clone());
        Ok(CreatedScene {
            status: "created".to_string(),
            path,
        })
    }

    async fn fetch_prefab(&self, prefab_id: &str) -> Result<SceneDocument, StorageError> {
        count(&self.prefab_calls, prefab_id);
        yield_now().await;
        if self.failing_prefabs.borrow().contains(prefab_id) {
            return Err(StorageError::Transport {
                url: format!("/api/prefab/{prefab_id}"),
                message: "connection reset".to_string(),
            });
        }
        self.prefabs
            .borrow()
            .get(prefab_id)
            .cloned()
            .ok_or_else(|| not_found(&format!("/api/prefab/{prefab_id}")))
    }

    async fn project_info(&self) -> Result<ProjectInfo, StorageError> {
        Ok(ProjectInfo {
            name: "fixture".to_string(),
            path: "/fixture".to_string(),
            scene_count: self.scenes.borrow().len() as u64,
            folders: vec!["scenes".to_string()],
        })
    }

    async fn list_assets(&self) -> Result<Vec<AssetInfo>, StorageError> {
        Ok(Vec::new())
    }
}
