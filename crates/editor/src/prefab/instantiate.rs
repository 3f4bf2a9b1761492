use thiserror::Error;
use tracing::{debug, warn};

use super::store::PrefabStore;
use crate::scene::GameObjectDescriptor;

/// Properties that belong to the instance itself and never overwrite the template.
const INSTANCE_ONLY_PROPERTIES: [&str; 4] = ["prefabId", "unlock", "id", "label"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefabError {
    #[error("object '{object_id}' does not reference a prefab")]
    MissingPrefabId { object_id: String },
    #[error("prefab '{prefab_id}' could not be loaded")]
    NotFound { prefab_id: String },
}

#[derive(Clone)]
pub struct PrefabInstantiator {
    store: PrefabStore,
}

impl PrefabInstantiator {
    pub fn new(store: PrefabStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &PrefabStore {
        &self.store
    }

    pub async fn instantiate(
        &self,
        instance: &GameObjectDescriptor,
    ) -> Result<GameObjectDescriptor, PrefabError> {
        let Some(prefab_id) = instance.prefab_id.as_deref() else {
            warn!(object_id = %instance.id, "prefab_instance_missing_prefab_id");
            return Err(PrefabError::MissingPrefabId {
                object_id: instance.id.clone(),
            });
        };
        let template = self
            .store
            .load(prefab_id)
            .await
            .ok_or_else(|| PrefabError::NotFound {
                prefab_id: prefab_id.to_string(),
            })?;

        let merged = apply_instance(&template, instance);
        debug!(
            object_id = %merged.id,
            prefab_id,
            "prefab_instantiated"
        );
        Ok(merged)
    }
}

/// Deep-copies `template` and layers the instance on top. The `unlock` list is applied
/// first, then every other property the instance defines, so the instance always wins.
pub fn apply_instance(
    template: &GameObjectDescriptor,
    instance: &GameObjectDescriptor,
) -> GameObjectDescriptor {
    let mut merged = template.clone();
    merged.id = instance.id.clone();
    if let Some(label) = instance.label.as_ref().filter(|label| !label.is_empty()) {
        merged.label = Some(label.clone());
    }

    for name in instance.unlock.iter().flatten() {
        merged.copy_property_from(instance, name);
    }
    for name in instance.defined_properties() {
        if !INSTANCE_ONLY_PROPERTIES.contains(&name) {
            merged.copy_property_from(instance, name);
        }
    }
    merged
}
