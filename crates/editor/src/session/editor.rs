use std::collections::BTreeSet;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use tracing::{debug, info, warn};

use crate::assets::{collect_texture_keys, AssetLoadCoordinator, AssetResolutionCache};
use crate::config::{EditorConfig, ResolutionCacheScope};
use crate::graph::{ObjectGraphBuilder, SceneObjectRegistry};
use crate::input::{Key, PointerEvent};
use crate::prefab::{PrefabCacheStats, PrefabInstantiator, PrefabStore};
use crate::render::{
    positive_or, CameraController, CameraState, LoadReport, LoadRequest, PrimitiveId,
    PrimitiveSpec, Rect, Renderer, Shape, Vec2,
};
use crate::scene::{PropertyValue, SceneDocument};
use crate::selection::SelectionController;
use crate::storage::{AssetResolver, SceneStorage};

pub const BORDER_DEPTH: f64 = 9_999.0;

/// Properties `update_object_property` applies to the rendered object.
pub const UPDATABLE_PROPERTIES: [&str; 7] = ["x", "y", "scaleX", "scaleY", "angle", "alpha", "visible"];

type FontsReady = Shared<LocalBoxFuture<'static, LoadReport>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneLoadSummary {
    pub scene_id: String,
    pub top_level_objects: usize,
    pub registered_objects: usize,
    pub assets: LoadReport,
}

/// Command surface over one renderer: loads scene documents into it, tracks the rendered
/// objects, selection and camera, and applies live property edits.
pub struct SceneEditor<R: Renderer> {
    config: EditorConfig,
    renderer: R,
    coordinator: AssetLoadCoordinator,
    builder: ObjectGraphBuilder,
    registry: SceneObjectRegistry,
    selection: SelectionController,
    camera: CameraController,
    fonts_ready: FontsReady,
    scene: Option<SceneDocument>,
    border: Option<PrimitiveId>,
}

impl<R: Renderer> SceneEditor<R> {
    /// Starts loading the configured fonts right away; the first scene load waits for them.
    pub fn new(
        config: EditorConfig,
        mut renderer: R,
        storage: Rc<dyn SceneStorage>,
        resolver: Rc<dyn AssetResolver>,
    ) -> Self {
        let camera = CameraController::new(config.editor.camera);
        camera.attach(renderer.camera_mut());

        let requests = config
            .fonts
            .iter()
            .map(|font| LoadRequest::Font {
                family: font.family.clone(),
                url: font.url.clone(),
            })
            .collect();
        let fonts_ready = wait_for_fonts(renderer.begin_load(requests));

        let coordinator =
            AssetLoadCoordinator::new(AssetResolutionCache::new(resolver), config.assets.clone());
        let builder = ObjectGraphBuilder::new(PrefabInstantiator::new(PrefabStore::new(storage)));

        Self {
            config,
            renderer,
            coordinator,
            builder,
            registry: SceneObjectRegistry::new(),
            selection: SelectionController::new(),
            camera,
            fonts_ready,
            scene: None,
            border: None,
        }
    }

    /// Replaces whatever is on the canvas with `scene`. Missing assets and prefabs degrade
    /// to placeholders, so this never fails.
    pub async fn load_scene_data(&mut self, scene: SceneDocument) -> SceneLoadSummary {
        info!(
            scene_id = %scene.id,
            object_count = scene.object_count(),
            "scene_load_started"
        );
        self.teardown();
        if self.config.assets.resolution_cache_scope == ResolutionCacheScope::PerScene {
            self.coordinator.resolution().clear();
        }
        let duplicates = scene.duplicate_ids();
        if !duplicates.is_empty() {
            warn!(
                scene_id = %scene.id,
                duplicates = %duplicates.join(","),
                "scene_duplicate_object_ids"
            );
        }

        self.fonts_ready.clone().await;

        let mut assets = self
            .coordinator
            .load_scene_assets(&scene, &mut self.renderer)
            .await;

        let resolved = self
            .builder
            .resolve_display_list(&scene.display_list)
            .await;

        let mut keys = BTreeSet::new();
        for node in &resolved {
            collect_texture_keys(node, &mut keys);
        }
        assets.merge(
            self.coordinator
                .load_textures(keys, &mut self.renderer)
                .await,
        );

        let handles = self.builder.build_display_list(&resolved, &mut self.renderer);
        let top_level_objects = handles.len();
        for handle in handles {
            self.registry.register(handle);
        }

        self.draw_border(&scene);
        let summary = SceneLoadSummary {
            scene_id: scene.id.clone(),
            top_level_objects,
            registered_objects: self.registry.len(),
            assets,
        };
        info!(
            scene_id = %summary.scene_id,
            top_level_objects,
            registered_objects = summary.registered_objects,
            failed_files = summary.assets.failed.len(),
            "scene_loaded"
        );
        self.scene = Some(scene);
        summary
    }

    fn teardown(&mut self) {
        self.selection.reset(&mut self.renderer);
        self.registry.clear(&mut self.renderer);
        if let Some(border) = self.border.take() {
            self.renderer.destroy(border);
        }
        self.scene = None;
    }

    fn draw_border(&mut self, scene: &SceneDocument) {
        let border = &self.config.editor.border;
        let width = positive_or(scene.settings.border_width, border.default_width);
        let height = positive_or(scene.settings.border_height, border.default_height);
        let primitive = self.renderer.create(PrimitiveSpec::Graphics {
            shapes: vec![Shape::StrokeRect {
                rect: Rect::new(0.0, 0.0, width, height),
                line_width: border.line_width,
                color: border.color,
            }],
        });
        self.renderer.set_depth(primitive, BORDER_DEPTH);
        self.border = Some(primitive);
        debug!(width, height, "camera_border_drawn");
    }

    pub fn select_object(&mut self, id: &str) -> bool {
        self.selection
            .select(id, &self.registry, &mut self.renderer)
    }

    pub fn deselect_object(&mut self) {
        self.selection.deselect(&self.registry, &mut self.renderer);
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selection.selected_id()
    }

    /// Applies a live edit to the rendered object. Unsupported properties and values of the
    /// wrong type are logged and ignored. Returns whether anything changed.
    pub fn update_object_property(&mut self, id: &str, property: &str, value: &PropertyValue) -> bool {
        let Some(primitive) = self.registry.primitive(id) else {
            warn!(object_id = id, property, "property_update_target_missing");
            return false;
        };
        let Some(transform) = self.renderer.transform(primitive) else {
            return false;
        };

        let renderer = &mut self.renderer;
        let applied = match (property, value) {
            ("x", PropertyValue::Number(x)) => {
                renderer.set_position(primitive, Vec2::new(*x, transform.position.y));
                true
            }
            ("y", PropertyValue::Number(y)) => {
                renderer.set_position(primitive, Vec2::new(transform.position.x, *y));
                true
            }
            ("scaleX", PropertyValue::Number(scale_x)) => {
                renderer.set_scale(primitive, *scale_x, transform.scale.y);
                true
            }
            ("scaleY", PropertyValue::Number(scale_y)) => {
                renderer.set_scale(primitive, transform.scale.x, *scale_y);
                true
            }
            ("angle", PropertyValue::Number(angle)) => {
                renderer.set_angle(primitive, *angle);
                true
            }
            ("alpha", PropertyValue::Number(alpha)) => {
                renderer.set_alpha(primitive, *alpha);
                true
            }
            ("visible", PropertyValue::Bool(visible)) => {
                renderer.set_visible(primitive, *visible);
                true
            }
            (name, _) if UPDATABLE_PROPERTIES.contains(&name) => {
                warn!(object_id = id, property, value = %value, "property_update_wrong_type");
                false
            }
            _ => {
                warn!(object_id = id, property, "property_update_unsupported");
                false
            }
        };

        if applied && self.selection.selected_id() == Some(id) {
            self.selection.refresh(&self.registry, &mut self.renderer);
        }
        applied
    }

    pub fn set_on_zoom_change(&mut self, callback: impl FnMut(f64) + 'static) {
        self.camera.set_on_zoom_change(callback);
    }

    /// Routes pointer input: pan gestures go to the camera, everything else to selection.
    /// Returns the id selected by this event, if any.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Option<String> {
        if self.camera.handle_pointer(self.renderer.camera_mut(), event) {
            return None;
        }
        self.selection
            .handle_pointer(event, &self.registry, &mut self.renderer)
    }

    pub fn handle_wheel(&mut self, delta_y: f64) -> f64 {
        self.camera.handle_wheel(self.renderer.camera_mut(), delta_y)
    }

    pub fn handle_key(&mut self, key: Key) -> bool {
        self.camera.handle_key(self.renderer.camera_mut(), key)
    }

    pub fn reset_camera(&mut self) {
        self.camera.reset(self.renderer.camera_mut());
    }

    pub fn center_camera_on(&mut self, x: f64, y: f64) {
        self.camera.center_on(self.renderer.camera_mut(), x, y);
    }

    pub fn camera_state(&self) -> CameraState {
        self.camera.state(self.renderer.camera())
    }

    pub fn scene_document(&self) -> Option<&SceneDocument> {
        self.scene.as_ref()
    }

    pub fn registry(&self) -> &SceneObjectRegistry {
        &self.registry
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn border(&self) -> Option<PrimitiveId> {
        self.border
    }

    pub fn selection_overlay(&self) -> Option<PrimitiveId> {
        self.selection.overlay()
    }

    pub fn prefab_cache_stats(&self) -> PrefabCacheStats {
        self.builder.instantiator().store().cache_stats()
    }

    pub fn clear_prefab_cache(&self) {
        self.builder.instantiator().store().clear_cache();
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }
}

fn wait_for_fonts(pending: LocalBoxFuture<'static, LoadReport>) -> FontsReady {
    async move {
        let report = pending.await;
        for failure in &report.failed {
            warn!(
                family = %failure.key,
                url = %failure.url,
                reason = %failure.reason,
                "font_load_failed"
            );
        }
        info!(loaded = report.completed.len(), "fonts_ready");
        report
    }
    .boxed_local()
    .shared()
}
