mod coordinator;
pub mod pack;
mod resolution;

pub use coordinator::{
    collect_texture_keys, normalize_asset_path, AssetLoadCoordinator, MEDIA_ROOT,
    PRELOAD_PACK_FILE,
};
pub use resolution::{AssetResolutionCache, PackSource};
