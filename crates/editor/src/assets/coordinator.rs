use std::cell::Cell;
use std::collections::BTreeSet;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::resolution::{AssetResolutionCache, PackSource};
use crate::config::AssetConfig;
use crate::render::{LoadReport, LoadRequest, Renderer};
use crate::scene::{GameObjectDescriptor, SceneDocument};

pub const MEDIA_ROOT: &str = "/assets/media/";
pub const PRELOAD_PACK_FILE: &str = "preload-pack.json";

/// Strips the `client/` and `yukon/` project prefixes and roots the path.
pub fn normalize_asset_path(path: &str) -> String {
    let stripped = path
        .strip_prefix("client/")
        .or_else(|| path.strip_prefix("yukon/"))
        .unwrap_or(path);
    if stripped.starts_with('/') {
        stripped.to_string()
    } else {
        format!("/{stripped}")
    }
}

/// Texture keys referenced by `node` and, through containers, its descendants.
pub fn collect_texture_keys(node: &GameObjectDescriptor, keys: &mut BTreeSet<String>) {
    if let Some(texture) = &node.texture {
        if !texture.key.is_empty() {
            keys.insert(texture.key.clone());
        }
    }
    if node.is_container() {
        for child in node.children() {
            collect_texture_keys(child, keys);
        }
    }
}

/// Decides which packs and atlases a scene needs and drives the renderer's bulk loader.
pub struct AssetLoadCoordinator {
    resolution: AssetResolutionCache,
    assets: AssetConfig,
    batch: Cell<u64>,
}

impl AssetLoadCoordinator {
    pub fn new(resolution: AssetResolutionCache, assets: AssetConfig) -> Self {
        Self {
            resolution,
            assets,
            batch: Cell::new(0),
        }
    }

    pub fn resolution(&self) -> &AssetResolutionCache {
        &self.resolution
    }

    pub fn preload_pack_path(&self) -> String {
        if self.assets.has_preload_subdirectory() {
            format!("{MEDIA_ROOT}preload/{PRELOAD_PACK_FILE}")
        } else {
            format!("{MEDIA_ROOT}{PRELOAD_PACK_FILE}")
        }
    }

    /// The shared preload pack followed by the scene's own pack files, each loaded once.
    pub async fn load_scene_assets(
        &self,
        scene: &SceneDocument,
        renderer: &mut dyn Renderer,
    ) -> LoadReport {
        let mut sources = Vec::new();
        let mut seen = BTreeSet::new();
        let paths = std::iter::once(self.preload_pack_path()).chain(
            scene
                .settings
                .preload_pack_files
                .iter()
                .flatten()
                .map(|path| normalize_asset_path(path)),
        );
        for path in paths {
            let source = PackSource::Pack { path };
            if seen.insert(source.dedup_key()) {
                sources.push(source);
            }
        }
        info!(
            scene_id = %scene.id,
            pack_count = sources.len(),
            "scene_asset_packs_requested"
        );
        self.load_sources(sources, renderer).await
    }

    pub async fn load_subtree_textures(
        &self,
        node: &GameObjectDescriptor,
        renderer: &mut dyn Renderer,
    ) -> LoadReport {
        let mut keys = BTreeSet::new();
        collect_texture_keys(node, &mut keys);
        self.load_textures(keys, renderer).await
    }

    /// Resolves every key the renderer does not have yet and loads the distinct sources.
    /// Unresolvable keys are logged and skipped.
    pub async fn load_textures(
        &self,
        keys: BTreeSet<String>,
        renderer: &mut dyn Renderer,
    ) -> LoadReport {
        let missing: Vec<String> = keys
            .into_iter()
            .filter(|key| !renderer.has_texture(key))
            .collect();
        if missing.is_empty() {
            return LoadReport::default();
        }

        let answers = join_all(missing.iter().map(|key| self.resolution.resolve(key))).await;
        let mut sources = BTreeSet::new();
        for (key, answer) in missing.iter().zip(answers) {
            match answer {
                Some(source) => {
                    sources.insert(source);
                }
                None => warn!(texture_key = %key, "texture_source_unresolved"),
            }
        }
        debug!(
            missing_count = missing.len(),
            source_count = sources.len(),
            "texture_sources_resolved"
        );
        self.load_sources(sources.into_iter().collect(), renderer)
            .await
    }

    async fn load_sources(
        &self,
        sources: Vec<PackSource>,
        renderer: &mut dyn Renderer,
    ) -> LoadReport {
        if sources.is_empty() {
            return LoadReport::default();
        }
        let batch = self.batch.get() + 1;
        self.batch.set(batch);

        let requests: Vec<LoadRequest> = sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| load_request_for(source, batch, index))
            .collect();
        let request_count = requests.len();
        let pending = renderer.begin_load(requests);
        let report = pending.await;

        for failure in &report.failed {
            warn!(
                key = %failure.key,
                url = %failure.url,
                reason = %failure.reason,
                "asset_file_load_failed"
            );
        }
        info!(
            batch,
            request_count,
            completed = report.completed.len(),
            failed = report.failed.len(),
            "asset_batch_loaded"
        );
        report
    }
}

fn load_request_for(source: PackSource, batch: u64, index: usize) -> LoadRequest {
    match source {
        PackSource::Atlas { directory } => {
            let directory = directory.trim_end_matches('/').to_string();
            let key = directory
                .rsplit('/')
                .next()
                .filter(|segment| !segment.is_empty())
                .map(ToString::to_string)
                .unwrap_or_else(|| format!("atlas-{index}"));
            LoadRequest::MultiAtlas {
                url: format!("{directory}/{key}.json"),
                key,
                base_path: directory,
            }
        }
        PackSource::Pack { path } => LoadRequest::Pack {
            key: format!("pack-{batch}-{index}"),
            url: path,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use futures::executor::block_on;

    use super::*;
    use crate::render::RetainedCanvas;
    use crate::scene::ObjectType;
    use crate::storage::AssetLocation;
    use crate::testing::{FakeAssetResolver, FakeAssetSource};

    fn coordinator(resolver: Rc<FakeAssetResolver>, assets: AssetConfig) -> AssetLoadCoordinator {
        AssetLoadCoordinator::new(AssetResolutionCache::new(resolver), assets)
    }

    #[test]
    fn asset_paths_are_normalized() {
        assert_eq!(normalize_asset_path("client/assets/a.json"), "/assets/a.json");
        assert_eq!(normalize_asset_path("yukon/assets/a.json"), "/assets/a.json");
        assert_eq!(normalize_asset_path("assets/a.json"), "/assets/a.json");
        assert_eq!(normalize_asset_path("/assets/a.json"), "/assets/a.json");
    }

    #[test]
    fn preload_path_depends_on_media_subdirectories() {
        let resolver = Rc::new(FakeAssetResolver::default());
        let with_preload = coordinator(resolver.clone(), AssetConfig::default());
        assert_eq!(
            with_preload.preload_pack_path(),
            "/assets/media/preload/preload-pack.json"
        );

        let without = coordinator(
            resolver,
            AssetConfig {
                media_subdirectories: vec!["rooms".to_string()],
                ..AssetConfig::default()
            },
        );
        assert_eq!(without.preload_pack_path(), "/assets/media/preload-pack.json");
    }

    #[test]
    fn texture_keys_follow_containers_only() {
        let mut image = GameObjectDescriptor::new("img", ObjectType::Image).with_texture("a", None);
        image.list = Some(vec![
            GameObjectDescriptor::new("hidden", ObjectType::Image).with_texture("ignored", None)
        ]);
        let root = GameObjectDescriptor::new("root", ObjectType::Container).with_children(vec![
            image,
            GameObjectDescriptor::new("inner", ObjectType::Container).with_children(vec![
                GameObjectDescriptor::new("deep", ObjectType::Sprite).with_texture("b", Some("f")),
            ]),
        ]);
        let mut keys = BTreeSet::new();
        collect_texture_keys(&root, &mut keys);
        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn scene_packs_are_deduplicated_and_preload_comes_first() {
        let source = Rc::new(FakeAssetSource::default());
        let mut canvas = RetainedCanvas::with_source(source.clone());
        let resolver = Rc::new(FakeAssetResolver::default());
        let coordinator = coordinator(resolver, AssetConfig::default());

        let mut scene = SceneDocument::new("town", Vec::new());
        scene.settings.preload_pack_files = Some(vec![
            "client/assets/media/rooms/town-pack.json".to_string(),
            "/assets/media/rooms/town-pack.json".to_string(),
        ]);
        let report = block_on(coordinator.load_scene_assets(&scene, &mut canvas));

        assert_eq!(
            source.requested(),
            vec![
                "/assets/media/preload/preload-pack.json".to_string(),
                "/assets/media/rooms/town-pack.json".to_string()
            ]
        );
        assert_eq!(report.failed.len(), 2);
    }

    #[test]
    fn shared_sources_load_once_and_present_textures_are_skipped() {
        let source = Rc::new(FakeAssetSource::default());
        source.insert_json(
            "/media/town/town.json",
            &serde_json::json!({ "textures": [{ "frames": [
                { "filename": "bg", "frame": { "x": 0, "y": 0, "w": 10, "h": 10 } }
            ] }] }),
        );
        let mut canvas = RetainedCanvas::with_source(source.clone());
        canvas.register_texture("already", 8.0, 8.0);

        let resolver = Rc::new(FakeAssetResolver::default());
        resolver.insert("bg", AssetLocation::atlas("/media/town/town.json", "/media/town"));
        resolver.insert("door", AssetLocation::atlas("/media/town/town.json", "/media/town"));
        let coordinator = coordinator(resolver.clone(), AssetConfig::default());

        let keys: BTreeSet<String> = ["bg", "door", "ghost", "already"]
            .iter()
            .map(|key| key.to_string())
            .collect();
        let report = block_on(coordinator.load_textures(keys, &mut canvas));

        assert_eq!(resolver.calls("already"), 0);
        assert_eq!(resolver.calls("ghost"), 1);
        assert_eq!(source.requested(), vec!["/media/town/town.json".to_string()]);
        assert_eq!(report.completed, vec!["town".to_string()]);
        assert!(canvas.has_texture("town"));
    }

    #[test]
    fn empty_requirements_never_touch_the_renderer() {
        let source = Rc::new(FakeAssetSource::default());
        let mut canvas = RetainedCanvas::with_source(source.clone());
        let resolver = Rc::new(FakeAssetResolver::default());
        let coordinator = coordinator(resolver.clone(), AssetConfig::default());

        let report = block_on(coordinator.load_textures(BTreeSet::new(), &mut canvas));
        assert!(report.is_empty());
        assert!(source.requested().is_empty());
        assert_eq!(resolver.total_calls(), 0);
    }

    #[test]
    fn pack_keys_are_unique_per_batch() {
        let first = load_request_for(PackSource::Pack { path: "/a.json".to_string() }, 1, 0);
        let second = load_request_for(PackSource::Pack { path: "/a.json".to_string() }, 2, 0);
        assert_ne!(first.key(), second.key());

        let atlas = load_request_for(
            PackSource::Atlas {
                directory: "/media/rooms/town/".to_string(),
            },
            1,
            3,
        );
        assert_eq!(
            atlas,
            LoadRequest::MultiAtlas {
                key: "town".to_string(),
                url: "/media/rooms/town/town.json".to_string(),
                base_path: "/media/rooms/town".to_string()
            }
        );
    }
}
