use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use editor::input::PointerButton;
use editor::{
    AssetResolver, EditorConfig, EditorError, PointerEvent, PropertyValue, RetainedCanvas,
    SceneDocument, SceneEditor, SceneLoadSummary, SceneSession, SceneStorage,
};
use tracing::{info, warn};

use crate::commands::{CommandRegistry, ShellCommand};

const CLICK_START_MS: u64 = 1_000;

/// What the caller should do after a line ran.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LineOutcome {
    Continue(Vec<String>),
    Quit,
}

/// Line-oriented front end over the editor core. Keeps the session's selection and zoom in
/// step with the canvas.
pub(crate) struct Shell {
    registry: CommandRegistry,
    storage: Rc<dyn SceneStorage>,
    editor: SceneEditor<RetainedCanvas>,
    session: SceneSession,
    pending_zoom: Rc<Cell<Option<f64>>>,
    clock_ms: u64,
}

impl Shell {
    pub(crate) fn new(
        config: EditorConfig,
        canvas: RetainedCanvas,
        storage: Rc<dyn SceneStorage>,
        resolver: Rc<dyn AssetResolver>,
    ) -> Self {
        let mut editor = SceneEditor::new(config, canvas, Rc::clone(&storage), resolver);
        let pending_zoom = Rc::new(Cell::new(None));
        let sink = Rc::clone(&pending_zoom);
        editor.set_on_zoom_change(move |zoom| sink.set(Some(zoom)));
        Self {
            registry: CommandRegistry::with_builtins(),
            session: SceneSession::new(Rc::clone(&storage)),
            storage,
            editor,
            pending_zoom,
            clock_ms: CLICK_START_MS,
        }
    }

    pub(crate) async fn run_line(&mut self, line: &str) -> LineOutcome {
        let command = match self.registry.parse_line(line) {
            Ok(Some(command)) => command,
            Ok(None) => return LineOutcome::Continue(Vec::new()),
            Err(message) => return LineOutcome::Continue(vec![message]),
        };
        if command == ShellCommand::Quit {
            info!("shell_quit_requested");
            return LineOutcome::Quit;
        }
        let output = match self.execute(command).await {
            Ok(lines) => lines,
            Err(failure) => vec![format!("error: {failure}")],
        };
        if let Some(zoom) = self.pending_zoom.take() {
            self.session.set_camera_zoom(zoom);
        }
        LineOutcome::Continue(output)
    }

    async fn execute(&mut self, command: ShellCommand) -> Result<Vec<String>, EditorError> {
        let lines = match command {
            ShellCommand::Help => self.registry.help_lines(),
            ShellCommand::Scenes => self.session.fetch_scenes().await?.to_vec(),
            ShellCommand::Load { path } => {
                let scene = self.session.load_scene(&path).await?.clone();
                let summary = self.editor.load_scene_data(scene).await;
                vec![describe_load(&summary)]
            }
            ShellCommand::Open { file } => {
                let raw = fs::read_to_string(&file).map_err(|source| {
                    warn!(file = %file, error = %source, "scene_file_read_failed");
                    EditorError::ReadFile {
                        path: PathBuf::from(&file),
                        source,
                    }
                })?;
                let scene = SceneDocument::from_json_str(&raw)?;
                self.session.open_document(scene.clone(), None);
                let summary = self.editor.load_scene_data(scene).await;
                vec![describe_load(&summary)]
            }
            ShellCommand::Save { path } => {
                let path = path
                    .or_else(|| self.session.current_path().map(ToString::to_string))
                    .ok_or(EditorError::NoSceneLoaded)?;
                self.session.save_scene(&path).await?;
                vec![format!("saved {path}")]
            }
            ShellCommand::Create { scene_id } => {
                let created = self
                    .session
                    .create_scene(&SceneDocument::new(scene_id, Vec::new()))
                    .await?;
                vec![format!("created {} ({})", created.path, created.status)]
            }
            ShellCommand::Select { object_id } => {
                if self.editor.select_object(&object_id) {
                    self.session.select_object(Some(&object_id));
                    vec![format!("selected {object_id}")]
                } else {
                    self.session.select_object(None);
                    vec![format!("no object '{object_id}'")]
                }
            }
            ShellCommand::Deselect => {
                self.editor.deselect_object();
                self.session.select_object(None);
                vec!["selection cleared".to_string()]
            }
            ShellCommand::Set { property, value } => self.set_property(&property, value)?,
            ShellCommand::Objects => self.editor.registry().ids().to_vec(),
            ShellCommand::Click { x, y, held_ms } => {
                let start = self.tick();
                self.editor
                    .handle_pointer(&PointerEvent::down(PointerButton::Primary, x, y, start));
                let selected = self.editor.handle_pointer(&PointerEvent::up(
                    PointerButton::Primary,
                    x,
                    y,
                    start + held_ms,
                ));
                self.clock_ms += held_ms;
                match selected {
                    Some(id) => {
                        self.session.select_object(Some(&id));
                        vec![format!("selected {id}")]
                    }
                    None => vec!["nothing selected".to_string()],
                }
            }
            ShellCommand::Pan { dx, dy, button } => {
                let start = self.tick();
                self.editor
                    .handle_pointer(&PointerEvent::down(button, 0.0, 0.0, start));
                self.editor
                    .handle_pointer(&PointerEvent::moved(Some(button), dx, dy, start + 1));
                self.editor
                    .handle_pointer(&PointerEvent::up(button, dx, dy, start + 2));
                vec![self.describe_camera()]
            }
            ShellCommand::Wheel { delta_y } => {
                self.editor.handle_wheel(delta_y);
                vec![self.describe_camera()]
            }
            ShellCommand::Key { key } => {
                self.editor.handle_key(key);
                vec![self.describe_camera()]
            }
            ShellCommand::Camera => vec![self.describe_camera()],
            ShellCommand::Center { x, y } => {
                self.editor.center_camera_on(x, y);
                vec![self.describe_camera()]
            }
            ShellCommand::ResetCamera => {
                self.editor.reset_camera();
                vec![self.describe_camera()]
            }
            ShellCommand::Stats => {
                let prefabs = self.editor.prefab_cache_stats();
                vec![
                    format!("objects: {}", self.editor.registry().len()),
                    format!(
                        "prefabs cached: {} [{}]",
                        prefabs.size,
                        prefabs.prefab_ids.join(", ")
                    ),
                    format!("primitives: {}", self.editor.renderer().primitive_count()),
                ]
            }
            ShellCommand::ClearPrefabs => {
                self.editor.clear_prefab_cache();
                vec!["prefab cache cleared".to_string()]
            }
            ShellCommand::Project => {
                let project = self.storage.project_info().await?;
                vec![
                    format!("{} at {}", project.name, project.path),
                    format!("scenes: {}", project.scene_count),
                    format!("folders: {}", project.folders.join(", ")),
                ]
            }
            ShellCommand::Assets => self
                .storage
                .list_assets()
                .await?
                .into_iter()
                .map(|asset| format!("{} {} ({} bytes)", asset.kind, asset.path, asset.size))
                .collect(),
            ShellCommand::Quit => Vec::new(),
        };
        Ok(lines)
    }

    fn set_property(&mut self, property: &str, value: PropertyValue) -> Result<Vec<String>, EditorError> {
        let Some(object_id) = self.editor.selected_id().map(ToString::to_string) else {
            return Ok(vec!["nothing selected".to_string()]);
        };
        self.session.update_selected_object(property, value.clone())?;
        let rendered = self
            .editor
            .update_object_property(&object_id, property, &value);
        let note = if rendered { "" } else { " (not shown live)" };
        Ok(vec![format!("{object_id}.{property} = {value}{note}")])
    }

    fn describe_camera(&self) -> String {
        let state = self.editor.camera_state();
        serde_json::json!({ "x": state.x, "y": state.y, "zoom": state.zoom }).to_string()
    }

    fn tick(&mut self) -> u64 {
        self.clock_ms += 1_000;
        self.clock_ms
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> &SceneSession {
        &self.session
    }
}

fn describe_load(summary: &SceneLoadSummary) -> String {
    format!(
        "loaded {}: {} top-level, {} objects, {} asset files failed",
        summary.scene_id,
        summary.top_level_objects,
        summary.registered_objects,
        summary.assets.failed.len()
    )
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use editor::scene::ObjectType;
    use editor::storage::{AssetInfo, CreatedScene, ProjectInfo, SaveStatus};
    use editor::{AssetLocation, GameObjectDescriptor, StorageError};

    use super::*;

    #[derive(Default)]
    struct MemoryStorage {
        scenes: RefCell<BTreeMap<String, SceneDocument>>,
    }

    #[async_trait(?Send)]
    impl SceneStorage for MemoryStorage {
        async fn list_scenes(&self) -> Result<Vec<String>, StorageError> {
            Ok(self.scenes.borrow().keys().cloned().collect())
        }

        async fn fetch_scene(&self, path: &str) -> Result<SceneDocument, StorageError> {
            self.scenes
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| StorageError::Status {
                    url: format!("/api/scenes/{path}"),
                    status: 404,
                })
        }

        async fn update_scene(
            &self,
            path: &str,
            scene: &SceneDocument,
        ) -> Result<SaveStatus, StorageError> {
            self.scenes
                .borrow_mut()
                .insert(path.to_string(), scene.clone());
            Ok(SaveStatus {
                status: "ok".to_string(),
            })
        }

        async fn create_scene(&self, scene: &SceneDocument) -> Result<CreatedScene, StorageError> {
            let path = format!("{}.json", scene.id);
            self.scenes.borrow_mut().insert(path.clone(), scene.clone());
            Ok(CreatedScene {
                status: "created".to_string(),
                path,
            })
        }

        async fn fetch_prefab(&self, prefab_id: &str) -> Result<SceneDocument, StorageError> {
            Err(StorageError::Status {
                url: format!("/api/prefab/{prefab_id}"),
                status: 404,
            })
        }

        async fn project_info(&self) -> Result<ProjectInfo, StorageError> {
            Ok(ProjectInfo {
                name: "club".to_string(),
                path: "/srv/club".to_string(),
                scene_count: self.scenes.borrow().len() as u64,
                folders: vec!["scenes".to_string(), "prefabs".to_string()],
            })
        }

        async fn list_assets(&self) -> Result<Vec<AssetInfo>, StorageError> {
            Ok(vec![AssetInfo {
                name: "town".to_string(),
                path: "media/rooms/town.png".to_string(),
                kind: "image".to_string(),
                size: 2048,
            }])
        }
    }

    struct NothingResolves;

    #[async_trait(?Send)]
    impl AssetResolver for NothingResolves {
        async fn resolve_asset(&self, _key: &str) -> Result<AssetLocation, StorageError> {
            Ok(AssetLocation::not_found())
        }
    }

    fn shell_with_town() -> (Rc<MemoryStorage>, Shell) {
        let storage = Rc::new(MemoryStorage::default());
        let mut crate_box = GameObjectDescriptor::new("crate", ObjectType::Rectangle)
            .with_position(100.0, 100.0);
        crate_box.width = Some(40.0);
        crate_box.height = Some(40.0);
        storage
            .scenes
            .borrow_mut()
            .insert("town.json".to_string(), SceneDocument::new("town", vec![crate_box]));
        let config = EditorConfig {
            fonts: Vec::new(),
            ..EditorConfig::default()
        };
        let shell = Shell::new(
            config,
            RetainedCanvas::new(),
            storage.clone(),
            Rc::new(NothingResolves),
        );
        (storage, shell)
    }

    fn run(shell: &mut Shell, line: &str) -> Vec<String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        match runtime.block_on(shell.run_line(line)) {
            LineOutcome::Continue(lines) => lines,
            LineOutcome::Quit => vec!["<quit>".to_string()],
        }
    }

    #[test]
    fn load_select_edit_and_save() {
        let (storage, mut shell) = shell_with_town();

        assert_eq!(run(&mut shell, "scenes"), vec!["town.json"]);
        let loaded = run(&mut shell, "load town.json");
        assert!(loaded[0].starts_with("loaded town: 1 top-level, 1 objects"), "{loaded:?}");
        assert_eq!(run(&mut shell, "objects"), vec!["crate"]);
        assert_eq!(run(&mut shell, "select crate"), vec!["selected crate"]);
        assert_eq!(run(&mut shell, "set x 250"), vec!["crate.x = 250"]);
        assert_eq!(run(&mut shell, "save"), vec!["saved town.json"]);

        let saved = storage.scenes.borrow().get("town.json").cloned().expect("saved");
        assert_eq!(saved.find_object("crate").and_then(|node| node.x), Some(250.0));
    }

    #[test]
    fn clicks_select_through_the_canvas() {
        let (_storage, mut shell) = shell_with_town();
        run(&mut shell, "load town.json");

        assert_eq!(run(&mut shell, "click 100 100"), vec!["selected crate"]);
        assert_eq!(
            shell.session().selected_object().map(|node| node.id.as_str()),
            Some("crate")
        );
        run(&mut shell, "deselect");
        assert_eq!(run(&mut shell, "click 100 100 500"), vec!["nothing selected"]);
    }

    #[test]
    fn zoom_changes_reach_the_session() {
        let (_storage, mut shell) = shell_with_town();

        run(&mut shell, "wheel -1");
        assert!(shell.session().camera_zoom() > 1.0);
        run(&mut shell, "reset_camera");
        assert_eq!(shell.session().camera_zoom(), 1.0);
    }

    #[test]
    fn failures_are_reported_and_the_shell_keeps_going() {
        let (_storage, mut shell) = shell_with_town();

        let output = run(&mut shell, "load missing.json");
        assert!(output[0].starts_with("error:"), "{output:?}");
        assert!(shell.session().error().is_some());
        assert_eq!(run(&mut shell, "save"), vec!["error: no scene loaded"]);
        assert_eq!(run(&mut shell, "set x 1"), vec!["nothing selected"]);
        assert_eq!(run(&mut shell, "quit"), vec!["<quit>"]);
    }

    #[test]
    fn project_commands_read_from_storage() {
        let (_storage, mut shell) = shell_with_town();

        let created = run(&mut shell, "create dock");
        assert_eq!(created, vec!["created dock.json (created)"]);
        let project = run(&mut shell, "project");
        assert_eq!(project[0], "club at /srv/club");
        assert_eq!(project[1], "scenes: 2");
        assert_eq!(
            run(&mut shell, "assets"),
            vec!["image media/rooms/town.png (2048 bytes)"]
        );
    }
}
