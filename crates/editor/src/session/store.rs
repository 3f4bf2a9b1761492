use std::rc::Rc;

use tracing::{error, info};

use super::EditorError;
use crate::render::CAMERA_ZOOM_DEFAULT;
use crate::scene::{GameObjectDescriptor, PropertyValue, SceneDocument};
use crate::storage::{CreatedScene, SceneStorage};

/// UI-facing session state: the scene list, the open document and the inspector's
/// selection. Storage failures are recorded in `error` and handed back to the caller.
pub struct SceneSession {
    storage: Rc<dyn SceneStorage>,
    scenes: Vec<String>,
    current_scene: Option<SceneDocument>,
    current_path: Option<String>,
    selected_object: Option<GameObjectDescriptor>,
    loading: bool,
    error: Option<String>,
    camera_zoom: f64,
}

impl SceneSession {
    pub fn new(storage: Rc<dyn SceneStorage>) -> Self {
        Self {
            storage,
            scenes: Vec::new(),
            current_scene: None,
            current_path: None,
            selected_object: None,
            loading: false,
            error: None,
            camera_zoom: CAMERA_ZOOM_DEFAULT,
        }
    }

    pub async fn fetch_scenes(&mut self) -> Result<&[String], EditorError> {
        self.loading = true;
        let result = self.storage.list_scenes().await;
        self.loading = false;
        match result {
            Ok(scenes) => {
                info!(scene_count = scenes.len(), "scenes_fetched");
                self.scenes = scenes;
                self.error = None;
                Ok(&self.scenes)
            }
            Err(fetch_error) => Err(self.fail("fetch_scenes", fetch_error.into())),
        }
    }

    /// Fetches the scene at `path` and makes it current. Selection and zoom are reset
    /// before the request goes out.
    pub async fn load_scene(&mut self, path: &str) -> Result<&SceneDocument, EditorError> {
        self.loading = true;
        self.selected_object = None;
        self.camera_zoom = CAMERA_ZOOM_DEFAULT;
        let result = self.storage.fetch_scene(path).await;
        self.loading = false;
        match result {
            Ok(scene) => {
                info!(
                    scene_path = path,
                    scene_id = %scene.id,
                    object_count = scene.object_count(),
                    "scene_fetched"
                );
                self.error = None;
                self.current_path = Some(path.to_string());
                Ok(self.current_scene.insert(scene))
            }
            Err(fetch_error) => Err(self.fail("load_scene", fetch_error.into())),
        }
    }

    /// Makes a document read from elsewhere (a local file, a fresh template) current.
    pub fn open_document(&mut self, scene: SceneDocument, path: Option<String>) -> &SceneDocument {
        self.selected_object = None;
        self.camera_zoom = CAMERA_ZOOM_DEFAULT;
        self.error = None;
        self.current_path = path;
        self.current_scene.insert(scene)
    }

    pub async fn save_scene(&mut self, path: &str) -> Result<(), EditorError> {
        let Some(scene) = self.current_scene.clone() else {
            return Err(self.fail("save_scene", EditorError::NoSceneLoaded));
        };
        self.loading = true;
        let result = self.storage.update_scene(path, &scene).await;
        self.loading = false;
        match result {
            Ok(saved) => {
                info!(scene_path = path, status = %saved.status, "scene_saved");
                self.error = None;
                self.current_path = Some(path.to_string());
                Ok(())
            }
            Err(save_error) => Err(self.fail("save_scene", save_error.into())),
        }
    }

    pub async fn create_scene(&mut self, scene: &SceneDocument) -> Result<CreatedScene, EditorError> {
        self.loading = true;
        let result = self.storage.create_scene(scene).await;
        self.loading = false;
        match result {
            Ok(created) => {
                info!(scene_id = %scene.id, scene_path = %created.path, "scene_created");
                self.error = None;
                if !self.scenes.contains(&created.path) {
                    self.scenes.push(created.path.clone());
                }
                Ok(created)
            }
            Err(create_error) => Err(self.fail("create_scene", create_error.into())),
        }
    }

    /// Selects the object with `id` anywhere in the current document; `None` clears.
    pub fn select_object(&mut self, id: Option<&str>) -> Option<&GameObjectDescriptor> {
        self.selected_object = id.and_then(|id| {
            self.current_scene
                .as_ref()
                .and_then(|scene| scene.find_object(id))
                .cloned()
        });
        self.selected_object.as_ref()
    }

    /// Writes `property` on the selected object and on the node with the same id in the
    /// current document. Returns `Ok(false)` when nothing is selected.
    pub fn update_selected_object(
        &mut self,
        property: &str,
        value: PropertyValue,
    ) -> Result<bool, EditorError> {
        let Some(selected) = self.selected_object.as_mut() else {
            return Ok(false);
        };
        selected.set_property(property, value.clone())?;
        if let Some(node) = self
            .current_scene
            .as_mut()
            .and_then(|scene| scene.find_object_mut(&selected.id))
        {
            node.set_property(property, value)?;
        }
        Ok(true)
    }

    pub fn set_camera_zoom(&mut self, zoom: f64) {
        self.camera_zoom = zoom;
    }

    pub fn scenes(&self) -> &[String] {
        &self.scenes
    }

    pub fn current_scene(&self) -> Option<&SceneDocument> {
        self.current_scene.as_ref()
    }

    pub fn current_path(&self) -> Option<&str> {
        self.current_path.as_deref()
    }

    pub fn selected_object(&self) -> Option<&GameObjectDescriptor> {
        self.selected_object.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn camera_zoom(&self) -> f64 {
        self.camera_zoom
    }

    fn fail(&mut self, operation: &'static str, failure: EditorError) -> EditorError {
        error!(operation, error = %failure, "session_operation_failed");
        self.error = Some(failure.to_string());
        failure
    }
}
