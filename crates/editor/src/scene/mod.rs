mod descriptor;
mod document;

pub use descriptor::{GameObjectDescriptor, ObjectType, PropertyError, PropertyValue, TextureRef};
pub use document::{
    ObjectList, SceneDecodeError, SceneDocument, SceneMeta, SceneSettings, PREFAB_SCENE_TYPE,
    SCENE_SCENE_TYPE,
};
