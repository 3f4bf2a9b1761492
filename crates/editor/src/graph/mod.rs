mod builder;
mod registry;

pub use builder::{
    text_style, ObjectGraphBuilder, RenderedObjectHandle, IMAGE_PLACEHOLDER_COLOR, LABEL_DEPTH,
    LABEL_OFFSET_Y, PLACEHOLDER_SIZE, RECTANGLE_FILL_ALPHA, RECTANGLE_FILL_COLOR,
    SPRITE_PLACEHOLDER_COLOR, UNKNOWN_PLACEHOLDER_COLOR,
};
pub use registry::SceneObjectRegistry;
