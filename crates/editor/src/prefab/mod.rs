mod instantiate;
mod store;

pub use instantiate::{apply_instance, PrefabError, PrefabInstantiator};
pub use store::{PrefabCacheStats, PrefabStore};
