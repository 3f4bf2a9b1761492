use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::descriptor::{serialize_optional_number, GameObjectDescriptor, PropertyValue};

pub const PREFAB_SCENE_TYPE: &str = "PREFAB";
pub const SCENE_SCENE_TYPE: &str = "SCENE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_key: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_number"
    )]
    pub border_width: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_number"
    )]
    pub border_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preload_pack_files: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, PropertyValue>,
}

impl SceneSettings {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectList {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_ids: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_number"
    )]
    pub version: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, PropertyValue>,
}

/// A scene (or prefab) file as stored by the scene service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub scene_type: String,
    #[serde(default, skip_serializing_if = "SceneSettings::is_empty")]
    pub settings: SceneSettings,
    #[serde(default)]
    pub display_list: Vec<GameObjectDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lists: Option<Vec<ObjectList>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<SceneMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_objects: Option<Vec<PropertyValue>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Error)]
#[error("invalid scene document at '{path}': {message}")]
pub struct SceneDecodeError {
    pub path: String,
    pub message: String,
}

impl SceneDocument {
    pub fn new(id: impl Into<String>, display_list: Vec<GameObjectDescriptor>) -> Self {
        Self {
            id: id.into(),
            scene_type: SCENE_SCENE_TYPE.to_string(),
            display_list,
            ..Self::default()
        }
    }

    pub fn prefab(id: impl Into<String>, root: GameObjectDescriptor) -> Self {
        Self {
            id: id.into(),
            scene_type: PREFAB_SCENE_TYPE.to_string(),
            display_list: vec![root],
            ..Self::default()
        }
    }

    /// Decodes a document, reporting the JSON path of the first offending value.
    pub fn from_json_str(raw: &str) -> Result<Self, SceneDecodeError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| SceneDecodeError {
            path: error.path().to_string(),
            message: error.inner().to_string(),
        })
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn is_prefab(&self) -> bool {
        self.scene_type == PREFAB_SCENE_TYPE
    }

    pub fn object_count(&self) -> usize {
        let mut count = 0;
        for root in &self.display_list {
            root.walk(&mut |_| count += 1);
        }
        count
    }

    pub fn find_object(&self, id: &str) -> Option<&GameObjectDescriptor> {
        let mut found = None;
        for root in &self.display_list {
            root.walk(&mut |node| {
                if found.is_none() && node.id == id {
                    found = Some(node);
                }
            });
            if found.is_some() {
                break;
            }
        }
        found
    }

    pub fn find_object_mut(&mut self, id: &str) -> Option<&mut GameObjectDescriptor> {
        self.display_list
            .iter_mut()
            .find_map(|root| root.find_mut(id))
    }

    /// Ids that occur more than once anywhere in the display list, in first-seen order.
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for root in &self.display_list {
            root.walk(&mut |node| {
                if !seen.insert(node.id.as_str()) && !duplicates.contains(&node.id) {
                    duplicates.push(node.id.clone());
                }
            });
        }
        duplicates
    }
}
