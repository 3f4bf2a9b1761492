use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use tracing::{debug, error, info, warn};

use crate::scene::{GameObjectDescriptor, SceneDocument};
use crate::storage::SceneStorage;

type PendingPrefab = Shared<LocalBoxFuture<'static, Option<Rc<GameObjectDescriptor>>>>;

#[derive(Default)]
struct PrefabState {
    cache: HashMap<String, Rc<GameObjectDescriptor>>,
    loading: HashMap<String, PendingPrefab>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefabCacheStats {
    pub size: usize,
    pub prefab_ids: Vec<String>,
}

/// Session cache of prefab templates. Successful loads are kept until `clear_cache`;
/// failures are not, so a later load retries.
#[derive(Clone)]
pub struct PrefabStore {
    storage: Rc<dyn SceneStorage>,
    state: Rc<RefCell<PrefabState>>,
}

impl PrefabStore {
    pub fn new(storage: Rc<dyn SceneStorage>) -> Self {
        Self {
            storage,
            state: Rc::new(RefCell::new(PrefabState::default())),
        }
    }

    pub async fn load(&self, prefab_id: &str) -> Option<Rc<GameObjectDescriptor>> {
        let pending = {
            let mut state = self.state.borrow_mut();
            if let Some(template) = state.cache.get(prefab_id) {
                debug!(prefab_id, "prefab_cache_hit");
                return Some(Rc::clone(template));
            }
            match state.loading.get(prefab_id) {
                Some(pending) => {
                    debug!(prefab_id, "prefab_load_joined");
                    pending.clone()
                }
                None => {
                    let fetch = Self::fetch(
                        Rc::clone(&self.storage),
                        Rc::clone(&self.state),
                        prefab_id.to_string(),
                    )
                    .boxed_local()
                    .shared();
                    state.loading.insert(prefab_id.to_string(), fetch.clone());
                    fetch
                }
            }
        };
        pending.await
    }

    async fn fetch(
        storage: Rc<dyn SceneStorage>,
        state: Rc<RefCell<PrefabState>>,
        prefab_id: String,
    ) -> Option<Rc<GameObjectDescriptor>> {
        let template = match storage.fetch_prefab(&prefab_id).await {
            Ok(document) => template_from_document(&prefab_id, document),
            Err(fetch_error) => {
                error!(prefab_id = %prefab_id, error = %fetch_error, "prefab_fetch_failed");
                None
            }
        };

        let mut state = state.borrow_mut();
        state.loading.remove(&prefab_id);
        if let Some(template) = &template {
            state.cache.insert(prefab_id.clone(), Rc::clone(template));
            info!(
                prefab_id = %prefab_id,
                root_type = template
                    .object_type
                    .as_ref()
                    .map(|object_type| object_type.as_str())
                    .unwrap_or("none"),
                "prefab_loaded"
            );
        }
        template
    }

    pub fn cached(&self, prefab_id: &str) -> Option<Rc<GameObjectDescriptor>> {
        self.state.borrow().cache.get(prefab_id).cloned()
    }

    pub fn cache_stats(&self) -> PrefabCacheStats {
        let state = self.state.borrow();
        let mut prefab_ids: Vec<String> = state.cache.keys().cloned().collect();
        prefab_ids.sort();
        PrefabCacheStats {
            size: prefab_ids.len(),
            prefab_ids,
        }
    }

    pub fn clear_cache(&self) {
        let cleared = {
            let mut state = self.state.borrow_mut();
            let cleared = state.cache.len();
            state.cache.clear();
            cleared
        };
        info!(cleared, "prefab_cache_cleared");
    }
}

fn template_from_document(
    prefab_id: &str,
    document: SceneDocument,
) -> Option<Rc<GameObjectDescriptor>> {
    if !document.is_prefab() {
        warn!(
            prefab_id,
            scene_type = %document.scene_type,
            "prefab_document_not_a_prefab"
        );
        return None;
    }
    match document.display_list.into_iter().next() {
        Some(root) => Some(Rc::new(root)),
        None => {
            warn!(prefab_id, "prefab_display_list_empty");
            None
        }
    }
}
