pub mod assets;
pub mod config;
pub mod graph;
pub mod input;
pub mod prefab;
pub mod render;
pub mod scene;
pub mod selection;
pub mod session;
pub mod storage;
#[cfg(test)]
mod testing;

pub use assets::{AssetLoadCoordinator, AssetResolutionCache, PackSource};
pub use config::{ConfigError, EditorConfig, ResolutionCacheScope};
pub use graph::{ObjectGraphBuilder, RenderedObjectHandle, SceneObjectRegistry};
pub use input::{Key, PointerButton, PointerEvent, PointerEventKind};
pub use prefab::{PrefabCacheStats, PrefabError, PrefabInstantiator, PrefabStore};
pub use render::{
    Camera2D, CameraController, CameraState, LoadReport, PrimitiveId, PrimitiveKind, Renderer,
    RetainedCanvas, Vec2,
};
pub use scene::{
    GameObjectDescriptor, ObjectType, PropertyError, PropertyValue, SceneDecodeError,
    SceneDocument,
};
pub use selection::{SelectionController, SelectionState};
pub use session::{EditorError, SceneEditor, SceneLoadSummary, SceneSession};
pub use storage::{
    AssetLocation, AssetResolver, AssetSource, HttpBackend, SceneStorage, StorageError,
};
