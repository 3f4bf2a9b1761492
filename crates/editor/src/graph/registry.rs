use std::collections::HashMap;

use tracing::{debug, warn};

use super::builder::RenderedObjectHandle;
use crate::render::{PrimitiveId, Renderer};

/// Flat index from object id to handle. Container children are indexed alongside their
/// parents so every built node can be selected and edited by id.
#[derive(Debug, Default)]
pub struct SceneObjectRegistry {
    handles: HashMap<String, RenderedObjectHandle>,
    order: Vec<String>,
}

impl SceneObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `handle` and, recursively, every child handle it carries.
    pub fn register(&mut self, handle: RenderedObjectHandle) {
        for nested in handle.descendants().into_iter().skip(1) {
            self.insert(nested.clone());
        }
        self.insert(handle);
    }

    fn insert(&mut self, handle: RenderedObjectHandle) {
        let id = handle.object_id.clone();
        if self.handles.insert(id.clone(), handle).is_some() {
            warn!(object_id = %id, "registry_duplicate_object_id");
        } else {
            self.order.push(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&RenderedObjectHandle> {
        self.handles.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handles.contains_key(id)
    }

    pub fn primitive(&self, id: &str) -> Option<PrimitiveId> {
        self.handles.get(id).map(|handle| handle.primitive)
    }

    /// Ids in registration order: children of a container come before the container.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Destroys the object's primitive, its label and everything nested under it, and
    /// forgets the whole subtree.
    pub fn remove(&mut self, id: &str, renderer: &mut dyn Renderer) -> bool {
        let Some(handle) = self.handles.remove(id) else {
            return false;
        };
        for nested in handle.descendants() {
            if let Some(label) = nested.label {
                renderer.destroy(label);
            }
            renderer.destroy(nested.primitive);
            if nested.object_id != id {
                self.handles.remove(&nested.object_id);
            }
        }
        let handles = &self.handles;
        self.order.retain(|known| handles.contains_key(known));
        debug!(object_id = id, "registry_object_removed");
        true
    }

    pub fn clear(&mut self, renderer: &mut dyn Renderer) {
        let count = self.handles.len();
        for handle in self.handles.values() {
            if let Some(label) = handle.label {
                renderer.destroy(label);
            }
            renderer.destroy(handle.primitive);
        }
        self.handles.clear();
        self.order.clear();
        debug!(count, "registry_cleared");
    }
}
