use std::path::PathBuf;

mod editor;
mod store;

use thiserror::Error;

use crate::config::ConfigError;
use crate::scene::{PropertyError, SceneDecodeError};
use crate::storage::StorageError;

pub use editor::{SceneEditor, SceneLoadSummary, BORDER_DEPTH, UPDATABLE_PROPERTIES};
pub use store::SceneSession;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Decode(#[from] SceneDecodeError),
    #[error(transparent)]
    Property(#[from] PropertyError),
    #[error("failed to read scene file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no scene loaded")]
    NoSceneLoaded,
}
