use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

const DEFAULT_ORIGIN: f64 = 0.5;
const TEXT_DEFAULT_ORIGIN: f64 = 0.0;
/// Largest magnitude below which every integral `f64` is an exact integer.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Value stored in the open-ended part of a descriptor, addressed by its JSON key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Interprets a bare shell token: booleans, numbers and `null` are typed, anything
    /// else is a string.
    pub fn from_token(token: &str) -> Self {
        match token {
            "true" => PropertyValue::Bool(true),
            "false" => PropertyValue::Bool(false),
            "null" => PropertyValue::Null,
            _ => match token.parse::<f64>() {
                Ok(number) if number.is_finite() => PropertyValue::Number(number),
                _ => PropertyValue::String(token.to_string()),
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::Null => Value::Null,
            PropertyValue::Bool(value) => Value::Bool(*value),
            PropertyValue::Number(value) => match exact_integer(*value) {
                Some(integer) => Value::from(integer),
                None => serde_json::Number::from_f64(*value)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
            },
            PropertyValue::String(value) => Value::String(value.clone()),
            PropertyValue::List(items) => {
                Value::Array(items.iter().map(PropertyValue::to_json).collect())
            }
            PropertyValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Integral numbers are written without a fraction so `800` stays `800` on save.
fn exact_integer(value: f64) -> Option<i64> {
    (value.fract() == 0.0 && value.abs() < EXACT_INTEGER_LIMIT).then_some(value as i64)
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropertyValue::Null => serializer.serialize_unit(),
            PropertyValue::Bool(value) => serializer.serialize_bool(*value),
            PropertyValue::Number(value) => match exact_integer(*value) {
                Some(integer) => serializer.serialize_i64(integer),
                None => serializer.serialize_f64(*value),
            },
            PropertyValue::String(value) => serializer.serialize_str(value),
            PropertyValue::List(items) => serializer.collect_seq(items),
            PropertyValue::Map(entries) => serializer.collect_map(entries),
        }
    }
}

pub(crate) fn serialize_optional_number<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(number) => PropertyValue::Number(*number).serialize(serializer),
        None => serializer.serialize_none(),
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            Value::Null => PropertyValue::Null,
            Value::Bool(value) => PropertyValue::Bool(value),
            Value::Number(number) => {
                number.as_f64().map_or(PropertyValue::Null, PropertyValue::Number)
            }
            Value::String(value) => PropertyValue::String(value),
            Value::Array(items) => {
                PropertyValue::List(items.into_iter().map(PropertyValue::from).collect())
            }
            Value::Object(entries) => PropertyValue::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, PropertyValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(value) => write!(f, "{value}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectType {
    Image,
    Sprite,
    Rectangle,
    Text,
    Container,
    Other(String),
}

impl ObjectType {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::Image => "Image",
            ObjectType::Sprite => "Sprite",
            ObjectType::Rectangle => "Rectangle",
            ObjectType::Text => "Text",
            ObjectType::Container => "Container",
            ObjectType::Other(name) => name.as_str(),
        }
    }
}

impl From<String> for ObjectType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Image" => ObjectType::Image,
            "Sprite" => ObjectType::Sprite,
            "Rectangle" => ObjectType::Rectangle,
            "Text" => ObjectType::Text,
            "Container" => ObjectType::Container,
            _ => ObjectType::Other(value),
        }
    }
}

impl From<ObjectType> for String {
    fn from(value: ObjectType) -> Self {
        match value {
            ObjectType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Texture reference of an image or sprite. Spritesheet frames may be written as
/// integer indices; they are read as their decimal string and written back as numbers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureRef {
    pub key: String,
    pub frame: Option<String>,
    frame_is_index: bool,
    pub extra: BTreeMap<String, PropertyValue>,
}

impl TextureRef {
    pub fn new(key: impl Into<String>, frame: Option<&str>) -> Self {
        Self {
            key: key.into(),
            frame: frame.map(ToString::to_string),
            frame_is_index: false,
            extra: BTreeMap::new(),
        }
    }

    fn from_fields(fields: Map<String, Value>) -> Self {
        let mut texture = Self::default();
        for (name, value) in fields {
            if let Err(value) = texture.take_typed(&name, value) {
                texture.extra.insert(name, PropertyValue::from(value));
            }
        }
        texture
    }

    fn take_typed(&mut self, name: &str, value: Value) -> Result<(), Value> {
        match (name, value) {
            ("key", Value::String(key)) => self.key = key,
            ("frame", Value::String(frame)) => self.frame = Some(frame),
            ("frame", Value::Number(index)) if index.is_u64() => {
                self.frame = Some(index.to_string());
                self.frame_is_index = true;
            }
            (_, value) => return Err(value),
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for TextureRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(TextureRef::from_fields)
    }
}

impl Serialize for TextureRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if !self.key.is_empty() {
            map.serialize_entry("key", &self.key)?;
        }
        if let Some(frame) = &self.frame {
            match frame.parse::<u64>() {
                Ok(index) if self.frame_is_index => map.serialize_entry("frame", &index)?,
                _ => map.serialize_entry("frame", frame)?,
            }
        }
        for (name, value) in &self.extra {
            let shadowed = match name.as_str() {
                "key" => !self.key.is_empty(),
                "frame" => self.frame.is_some(),
                _ => false,
            };
            if !shadowed {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    #[error("property '{property}' expects {expected}")]
    TypeMismatch {
        property: String,
        expected: &'static str,
    },
}

/// One node of a scene display list. The typed fields cover the schema every object kind
/// shares; all other keys (component properties, text styles, scopes) are kept in `extra`
/// and serialize back unchanged.
///
/// A typed key whose value has the wrong JSON type (or is `null`) is kept in `extra`
/// under its own name, so a single malformed object never fails the scene and is written
/// back exactly as it was read. A typed field that is set always shadows such an entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameObjectDescriptor {
    pub id: String,
    pub object_type: Option<ObjectType>,
    pub label: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub origin_x: Option<f64>,
    pub origin_y: Option<f64>,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
    pub angle: Option<f64>,
    pub visible: Option<bool>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub texture: Option<TextureRef>,
    pub list: Option<Vec<GameObjectDescriptor>>,
    pub prefab_id: Option<String>,
    pub unlock: Option<Vec<String>>,
    pub extra: BTreeMap<String, PropertyValue>,
}

const TYPED_PROPERTIES: [&str; 17] = [
    "id", "type", "label", "x", "y", "originX", "originY", "scaleX", "scaleY", "angle",
    "visible", "width", "height", "texture", "list", "prefabId", "unlock",
];

impl GameObjectDescriptor {
    pub fn new(id: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            id: id.into(),
            object_type: Some(object_type),
            ..Self::default()
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_texture(mut self, key: &str, frame: Option<&str>) -> Self {
        self.texture = Some(TextureRef::new(key, frame));
        self
    }

    pub fn with_children(mut self, children: Vec<GameObjectDescriptor>) -> Self {
        self.list = Some(children);
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn prefab_instance(id: impl Into<String>, prefab_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prefab_id: Some(prefab_id.into()),
            ..Self::default()
        }
    }

    pub fn is_prefab_instance(&self) -> bool {
        self.prefab_id.is_some()
    }

    pub fn is_container(&self) -> bool {
        self.object_type == Some(ObjectType::Container)
    }

    pub fn children(&self) -> &[GameObjectDescriptor] {
        self.list.as_deref().unwrap_or(&[])
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x.unwrap_or(0.0), self.y.unwrap_or(0.0))
    }

    /// Origin with the per-type defaults applied: text anchors at its top-left corner,
    /// everything else at its center.
    pub fn origin(&self) -> (f64, f64) {
        let fallback = if self.object_type == Some(ObjectType::Text) {
            TEXT_DEFAULT_ORIGIN
        } else {
            DEFAULT_ORIGIN
        };
        (
            self.origin_x.unwrap_or(fallback),
            self.origin_y.unwrap_or(fallback),
        )
    }

    /// Explicit scale only; `scaleY` falls back to `scaleX`.
    pub fn scale(&self) -> Option<(f64, f64)> {
        self.scale_x.map(|sx| (sx, self.scale_y.unwrap_or(sx)))
    }

    pub fn is_visible(&self) -> bool {
        self.visible.unwrap_or(true)
    }

    pub fn display_label(&self) -> &str {
        if let Some(label) = self.label.as_deref().filter(|label| !label.is_empty()) {
            return label;
        }
        match &self.object_type {
            Some(object_type) => object_type.as_str(),
            None => "Unknown",
        }
    }

    pub fn text_property(&self, name: &str) -> Option<&str> {
        self.extra
            .get(name)
            .and_then(PropertyValue::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn number_property(&self, name: &str) -> Option<f64> {
        self.extra.get(name).and_then(PropertyValue::as_f64)
    }

    /// Names of every property this node defines: typed fields first, then extras.
    pub fn defined_properties(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for name in TYPED_PROPERTIES.iter() {
            if self.has_typed(name) {
                names.push(*name);
            }
        }
        names.extend(
            self.extra
                .keys()
                .map(String::as_str)
                .filter(|name| !self.has_typed(name)),
        );
        names
    }

    fn numbers(&self) -> [(&'static str, Option<f64>); 9] {
        [
            ("x", self.x),
            ("y", self.y),
            ("originX", self.origin_x),
            ("originY", self.origin_y),
            ("scaleX", self.scale_x),
            ("scaleY", self.scale_y),
            ("angle", self.angle),
            ("width", self.width),
            ("height", self.height),
        ]
    }

    fn number_field(&mut self, name: &str) -> Option<&mut Option<f64>> {
        match name {
            "x" => Some(&mut self.x),
            "y" => Some(&mut self.y),
            "originX" => Some(&mut self.origin_x),
            "originY" => Some(&mut self.origin_y),
            "scaleX" => Some(&mut self.scale_x),
            "scaleY" => Some(&mut self.scale_y),
            "angle" => Some(&mut self.angle),
            "width" => Some(&mut self.width),
            "height" => Some(&mut self.height),
            _ => None,
        }
    }

    /// Whether `name` is held by a typed field rather than by `extra`.
    fn has_typed(&self, name: &str) -> bool {
        if let Some((_, number)) = self.numbers().into_iter().find(|(key, _)| *key == name) {
            return number.is_some();
        }
        match name {
            "id" => !self.id.is_empty(),
            "label" => self.label.is_some(),
            "type" => self.object_type.is_some(),
            "visible" => self.visible.is_some(),
            "texture" => self.texture.is_some(),
            "list" => self.list.is_some(),
            "prefabId" => self.prefab_id.is_some(),
            "unlock" => self.unlock.is_some(),
            _ => false,
        }
    }

    fn clear_typed(&mut self, name: &str) {
        if let Some(slot) = self.number_field(name) {
            *slot = None;
            return;
        }
        match name {
            "label" => self.label = None,
            "type" => self.object_type = None,
            "visible" => self.visible = None,
            "texture" => self.texture = None,
            "list" => self.list = None,
            "prefabId" => self.prefab_id = None,
            "unlock" => self.unlock = None,
            _ => {}
        }
    }

    /// Copies `name` from `source` when `source` defines it. Returns whether anything was
    /// copied.
    pub fn copy_property_from(&mut self, source: &GameObjectDescriptor, name: &str) -> bool {
        fn take<T: Clone>(target: &mut Option<T>, source: &Option<T>) -> bool {
            match source {
                Some(value) => {
                    *target = Some(value.clone());
                    true
                }
                None => false,
            }
        }

        let copied = match name {
            "id" if source.has_typed(name) => {
                self.id = source.id.clone();
                true
            }
            "label" => take(&mut self.label, &source.label),
            "type" => take(&mut self.object_type, &source.object_type),
            "x" => take(&mut self.x, &source.x),
            "y" => take(&mut self.y, &source.y),
            "originX" => take(&mut self.origin_x, &source.origin_x),
            "originY" => take(&mut self.origin_y, &source.origin_y),
            "scaleX" => take(&mut self.scale_x, &source.scale_x),
            "scaleY" => take(&mut self.scale_y, &source.scale_y),
            "angle" => take(&mut self.angle, &source.angle),
            "visible" => take(&mut self.visible, &source.visible),
            "width" => take(&mut self.width, &source.width),
            "height" => take(&mut self.height, &source.height),
            "texture" => take(&mut self.texture, &source.texture),
            "list" => take(&mut self.list, &source.list),
            "prefabId" => take(&mut self.prefab_id, &source.prefab_id),
            "unlock" => take(&mut self.unlock, &source.unlock),
            _ => false,
        };
        if copied {
            self.extra.remove(name);
            return true;
        }
        match source.extra.get(name) {
            Some(value) => {
                self.clear_typed(name);
                self.extra.insert(name.to_string(), value.clone());
                true
            }
            None => false,
        }
    }

    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        self.typed_property(name)
            .or_else(|| self.extra.get(name).cloned())
    }

    fn typed_property(&self, name: &str) -> Option<PropertyValue> {
        if let Some((_, number)) = self.numbers().into_iter().find(|(key, _)| *key == name) {
            return number.map(PropertyValue::Number);
        }
        match name {
            "id" if self.has_typed(name) => Some(PropertyValue::String(self.id.clone())),
            "label" => self.label.clone().map(PropertyValue::String),
            "type" => self
                .object_type
                .as_ref()
                .map(|object_type| PropertyValue::String(object_type.as_str().to_string())),
            "visible" => self.visible.map(PropertyValue::Bool),
            "prefabId" => self.prefab_id.clone().map(PropertyValue::String),
            "texture" => self.texture.as_ref().and_then(to_property_value),
            "list" => self.list.as_ref().and_then(to_property_value),
            "unlock" => self.unlock.as_ref().map(|names| {
                PropertyValue::List(names.iter().cloned().map(PropertyValue::String).collect())
            }),
            _ => None,
        }
    }

    /// Writes a property by its JSON name. `Null` clears optional typed fields.
    pub fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
        fn string(name: &str, value: &PropertyValue) -> Result<Option<String>, PropertyError> {
            match value {
                PropertyValue::Null => Ok(None),
                PropertyValue::String(text) => Ok(Some(text.clone())),
                _ => Err(mismatch(name, "a string")),
            }
        }

        if !TYPED_PROPERTIES.contains(&name) {
            self.extra.insert(name.to_string(), value);
            return Ok(());
        }
        if let Some(slot) = self.number_field(name) {
            *slot = match value {
                PropertyValue::Null => None,
                PropertyValue::Number(number) => Some(number),
                _ => return Err(mismatch(name, "a number")),
            };
            self.extra.remove(name);
            return Ok(());
        }
        match name {
            "id" => {
                self.id = string(name, &value)?.ok_or_else(|| mismatch(name, "a string"))?;
            }
            "label" => self.label = string(name, &value)?,
            "type" => self.object_type = string(name, &value)?.map(ObjectType::from),
            "prefabId" => self.prefab_id = string(name, &value)?,
            "visible" => {
                self.visible = match value {
                    PropertyValue::Null => None,
                    PropertyValue::Bool(flag) => Some(flag),
                    _ => return Err(mismatch(name, "a boolean")),
                }
            }
            "texture" => self.texture = from_property_value(name, &value, "a texture object")?,
            "list" => self.list = from_property_value(name, &value, "a list of objects")?,
            "unlock" => self.unlock = from_property_value(name, &value, "a list of strings")?,
            _ => {}
        }
        self.extra.remove(name);
        Ok(())
    }

    /// Visits this node and every descendant in display order.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a GameObjectDescriptor)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut GameObjectDescriptor> {
        if self.id == id {
            return Some(self);
        }
        self.list
            .as_mut()?
            .iter_mut()
            .find_map(|child| child.find_mut(id))
    }

    fn from_fields(fields: Map<String, Value>) -> Self {
        let mut node = Self::default();
        let mut mismatched = Vec::new();
        for (name, value) in fields {
            if let Err(value) = node.take_typed(&name, value) {
                if TYPED_PROPERTIES.contains(&name.as_str()) && !value.is_null() {
                    mismatched.push(name.clone());
                }
                node.extra.insert(name, PropertyValue::from(value));
            }
        }
        for property in mismatched {
            warn!(object_id = %node.id, property = %property, "scene_property_type_mismatch");
        }
        node
    }

    /// Stores `value` in its typed field, or hands it back when `name` is not typed or
    /// the value has the wrong shape.
    fn take_typed(&mut self, name: &str, value: Value) -> Result<(), Value> {
        if let Some(slot) = self.number_field(name) {
            return match value.as_f64() {
                Some(number) => {
                    *slot = Some(number);
                    Ok(())
                }
                None => Err(value),
            };
        }
        match (name, value) {
            ("id", Value::String(id)) => self.id = id,
            ("type", Value::String(object_type)) => {
                self.object_type = Some(ObjectType::from(object_type))
            }
            ("label", Value::String(label)) => self.label = Some(label),
            ("prefabId", Value::String(prefab_id)) => self.prefab_id = Some(prefab_id),
            ("visible", Value::Bool(flag)) => self.visible = Some(flag),
            ("texture", Value::Object(fields)) => {
                self.texture = Some(TextureRef::from_fields(fields))
            }
            ("list", Value::Array(items)) if items.iter().all(Value::is_object) => {
                self.list = Some(
                    items
                        .into_iter()
                        .filter_map(|item| match item {
                            Value::Object(fields) => Some(Self::from_fields(fields)),
                            _ => None,
                        })
                        .collect(),
                );
            }
            ("unlock", Value::Array(items)) if items.iter().all(Value::is_string) => {
                self.unlock = Some(
                    items
                        .into_iter()
                        .filter_map(|item| match item {
                            Value::String(name) => Some(name),
                            _ => None,
                        })
                        .collect(),
                );
            }
            (_, value) => return Err(value),
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for GameObjectDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(GameObjectDescriptor::from_fields)
    }
}

impl Serialize for GameObjectDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if !self.id.is_empty() {
            map.serialize_entry("id", &self.id)?;
        }
        if let Some(object_type) = &self.object_type {
            map.serialize_entry("type", object_type.as_str())?;
        }
        if let Some(label) = &self.label {
            map.serialize_entry("label", label)?;
        }
        for (name, number) in self.numbers() {
            if let Some(number) = number {
                map.serialize_entry(name, &PropertyValue::Number(number))?;
            }
        }
        if let Some(visible) = self.visible {
            map.serialize_entry("visible", &visible)?;
        }
        if let Some(texture) = &self.texture {
            map.serialize_entry("texture", texture)?;
        }
        if let Some(list) = &self.list {
            map.serialize_entry("list", list)?;
        }
        if let Some(prefab_id) = &self.prefab_id {
            map.serialize_entry("prefabId", prefab_id)?;
        }
        if let Some(unlock) = &self.unlock {
            map.serialize_entry("unlock", unlock)?;
        }
        for (name, value) in &self.extra {
            if !self.has_typed(name) {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}

fn mismatch(property: &str, expected: &'static str) -> PropertyError {
    PropertyError::TypeMismatch {
        property: property.to_string(),
        expected,
    }
}

fn to_property_value<T: Serialize>(value: &T) -> Option<PropertyValue> {
    serde_json::to_value(value).ok().map(PropertyValue::from)
}

fn from_property_value<T: serde::de::DeserializeOwned>(
    name: &str,
    value: &PropertyValue,
    expected: &'static str,
) -> Result<Option<T>, PropertyError> {
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value.to_json())
        .map(Some)
        .map_err(|_| mismatch(name, expected))
}
