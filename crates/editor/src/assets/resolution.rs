use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use tracing::{debug, warn};

use crate::storage::{AssetKind, AssetLocation, AssetResolver};

/// Where the texture for a key comes from. Two keys that live in the same pack or atlas
/// resolve to equal values, which is what load deduplication relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PackSource {
    Atlas { directory: String },
    Pack { path: String },
}

impl PackSource {
    pub fn from_location(location: &AssetLocation) -> Option<Self> {
        if !location.found {
            return None;
        }
        match location.kind? {
            AssetKind::Atlas => {
                let directory = location.directory.clone().or_else(|| {
                    location
                        .path
                        .as_deref()
                        .and_then(|path| path.rsplit_once('/'))
                        .map(|(directory, _)| directory.to_string())
                })?;
                Some(PackSource::Atlas { directory })
            }
            AssetKind::Pack => location
                .path
                .clone()
                .map(|path| PackSource::Pack { path }),
        }
    }

    pub fn dedup_key(&self) -> String {
        match self {
            PackSource::Atlas { directory } => format!("ATLAS:{directory}"),
            PackSource::Pack { path } => format!("PACK:{path}"),
        }
    }
}

type PendingLookup = Shared<LocalBoxFuture<'static, Option<PackSource>>>;

#[derive(Default)]
struct ResolutionState {
    answers: HashMap<String, Option<PackSource>>,
    in_flight: HashMap<String, PendingLookup>,
}

/// Memoized texture-key lookups. Every answer is cached, negative ones included, and a key
/// is asked for at most once while a lookup for it is pending.
#[derive(Clone)]
pub struct AssetResolutionCache {
    resolver: Rc<dyn AssetResolver>,
    state: Rc<RefCell<ResolutionState>>,
}

impl AssetResolutionCache {
    pub fn new(resolver: Rc<dyn AssetResolver>) -> Self {
        Self {
            resolver,
            state: Rc::new(RefCell::new(ResolutionState::default())),
        }
    }

    pub async fn resolve(&self, key: &str) -> Option<PackSource> {
        let pending = {
            let mut state = self.state.borrow_mut();
            if let Some(answer) = state.answers.get(key) {
                debug!(texture_key = key, "asset_resolution_cache_hit");
                return answer.clone();
            }
            match state.in_flight.get(key) {
                Some(pending) => pending.clone(),
                None => {
                    let lookup = Self::lookup(
                        Rc::clone(&self.resolver),
                        Rc::clone(&self.state),
                        key.to_string(),
                    )
                    .boxed_local()
                    .shared();
                    state.in_flight.insert(key.to_string(), lookup.clone());
                    lookup
                }
            }
        };
        pending.await
    }

    async fn lookup(
        resolver: Rc<dyn AssetResolver>,
        state: Rc<RefCell<ResolutionState>>,
        key: String,
    ) -> Option<PackSource> {
        let answer = match resolver.resolve_asset(&key).await {
            Ok(location) => {
                let source = PackSource::from_location(&location);
                match &source {
                    Some(found) => {
                        debug!(texture_key = %key, source = %found.dedup_key(), "asset_resolved")
                    }
                    None => debug!(texture_key = %key, "asset_not_found"),
                }
                source
            }
            Err(error) => {
                warn!(texture_key = %key, error = %error, "asset_resolution_failed");
                None
            }
        };

        let mut state = state.borrow_mut();
        state.in_flight.remove(&key);
        state.answers.insert(key, answer.clone());
        answer
    }

    /// Cached answer for `key`: `None` when never asked, `Some(None)` for a cached miss.
    pub fn cached(&self, key: &str) -> Option<Option<PackSource>> {
        self.state.borrow().answers.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.answers.clear();
        state.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use futures::future::join_all;

    use super::*;
    use crate::testing::FakeAssetResolver;

    #[test]
    fn concurrent_lookups_share_one_request() {
        let resolver = Rc::new(FakeAssetResolver::default());
        resolver.insert("bg", AssetLocation::pack("/assets/media/rooms/town-pack.json"));
        let cache = AssetResolutionCache::new(resolver.clone());

        let answers = block_on(join_all((0..5).map(|_| cache.resolve("bg"))));
        assert_eq!(resolver.calls("bg"), 1);
        assert!(answers.iter().all(|answer| answer
            == &Some(PackSource::Pack {
                path: "/assets/media/rooms/town-pack.json".to_string()
            })));

        block_on(cache.resolve("bg"));
        assert_eq!(resolver.calls("bg"), 1);
    }

    #[test]
    fn negative_answers_are_cached() {
        let resolver = Rc::new(FakeAssetResolver::default());
        let cache = AssetResolutionCache::new(resolver.clone());

        assert_eq!(block_on(cache.resolve("ghost")), None);
        assert_eq!(block_on(cache.resolve("ghost")), None);
        assert_eq!(resolver.calls("ghost"), 1);
        assert_eq!(cache.cached("ghost"), Some(None));
    }

    #[test]
    fn transport_failures_are_cached_as_misses() {
        let resolver = Rc::new(FakeAssetResolver::default());
        resolver.fail("broken");
        let cache = AssetResolutionCache::new(resolver.clone());

        assert_eq!(block_on(cache.resolve("broken")), None);
        assert_eq!(block_on(cache.resolve("broken")), None);
        assert_eq!(resolver.calls("broken"), 1);
    }

    #[test]
    fn clear_forgets_answers() {
        let resolver = Rc::new(FakeAssetResolver::default());
        resolver.insert("door", AssetLocation::atlas("/m/town/town.json", "/m/town"));
        let cache = AssetResolutionCache::new(resolver.clone());

        block_on(cache.resolve("door"));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        block_on(cache.resolve("door"));
        assert_eq!(resolver.calls("door"), 2);
    }

    #[test]
    fn atlas_directory_falls_back_to_path_parent() {
        let mut location = AssetLocation::atlas("/media/town/town.json", "/media/town");
        location.directory = None;
        assert_eq!(
            PackSource::from_location(&location),
            Some(PackSource::Atlas {
                directory: "/media/town".to_string()
            })
        );
        assert_eq!(
            PackSource::from_location(&AssetLocation {
                found: true,
                kind: None,
                path: None,
                directory: None
            }),
            None
        );
    }
}
