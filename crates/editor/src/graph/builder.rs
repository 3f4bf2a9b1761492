use std::collections::BTreeMap;

use futures::future::{join_all, FutureExt, LocalBoxFuture};
use tracing::{debug, warn};

use crate::prefab::PrefabInstantiator;
use crate::render::{
    positive_or, HitArea, ObjectTag, Padding, PrimitiveId, PrimitiveKind, PrimitiveSpec, Rect,
    Renderer, TextStyle, Vec2,
};
use crate::scene::{GameObjectDescriptor, ObjectType};

pub const LABEL_DEPTH: f64 = 10_000.0;
pub const LABEL_OFFSET_Y: f64 = 60.0;
pub const PLACEHOLDER_SIZE: f64 = 100.0;

pub const IMAGE_PLACEHOLDER_COLOR: u32 = 0x3498db;
pub const SPRITE_PLACEHOLDER_COLOR: u32 = 0xe74c3c;
pub const RECTANGLE_FILL_COLOR: u32 = 0x2ecc71;
pub const RECTANGLE_FILL_ALPHA: f64 = 0.5;
pub const UNKNOWN_PLACEHOLDER_COLOR: u32 = 0xffffff;

/// What the builder made for one descriptor. `label` is `None` once a parent container has
/// absorbed the node and destroyed its label.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedObjectHandle {
    pub primitive: PrimitiveId,
    pub object_id: String,
    pub kind: PrimitiveKind,
    pub label: Option<PrimitiveId>,
    pub children: BTreeMap<String, RenderedObjectHandle>,
}

impl RenderedObjectHandle {
    pub fn child(&self, id: &str) -> Option<&RenderedObjectHandle> {
        self.children.get(id)
    }

    /// This handle and every nested child handle, parents before children.
    pub fn descendants(&self) -> Vec<&RenderedObjectHandle> {
        let mut out = vec![self];
        for child in self.children.values() {
            out.extend(child.descendants());
        }
        out
    }
}

/// Turns descriptors into renderer primitives in two steps: `resolve` expands prefab
/// instances (the only step that suspends), `build` creates primitives synchronously.
#[derive(Clone)]
pub struct ObjectGraphBuilder {
    instantiator: PrefabInstantiator,
}

impl ObjectGraphBuilder {
    pub fn new(instantiator: PrefabInstantiator) -> Self {
        Self { instantiator }
    }

    pub fn instantiator(&self) -> &PrefabInstantiator {
        &self.instantiator
    }

    /// Resolves every top-level node concurrently, keeping display-list order.
    pub async fn resolve_display_list(
        &self,
        display_list: &[GameObjectDescriptor],
    ) -> Vec<GameObjectDescriptor> {
        join_all(
            display_list
                .iter()
                .map(|node| self.resolve_node(node.clone(), Vec::new())),
        )
        .await
    }

    /// Returns a copy of `node` with no prefab instances left in it. Instances that fail to
    /// instantiate, or that would expand a prefab already being expanded above them, become
    /// fixed-size rectangle placeholders.
    pub async fn resolve(&self, node: &GameObjectDescriptor) -> GameObjectDescriptor {
        self.resolve_node(node.clone(), Vec::new()).await
    }

    fn resolve_node(
        &self,
        mut node: GameObjectDescriptor,
        mut chain: Vec<String>,
    ) -> LocalBoxFuture<'_, GameObjectDescriptor> {
        async move {
            if let Some(prefab_id) = node.prefab_id.clone() {
                if chain.contains(&prefab_id) {
                    warn!(
                        object_id = %node.id,
                        prefab_id = %prefab_id,
                        chain = %chain.join(" > "),
                        "prefab_cycle_detected"
                    );
                    return failed_instance_placeholder(node);
                }
                return match self.instantiator.instantiate(&node).await {
                    Ok(merged) => {
                        chain.push(prefab_id);
                        self.resolve_node(merged, chain).await
                    }
                    Err(error) => {
                        warn!(
                            object_id = %node.id,
                            error = %error,
                            "prefab_instance_placeholder"
                        );
                        failed_instance_placeholder(node)
                    }
                };
            }

            if node.is_container() {
                if let Some(children) = node.list.take() {
                    let resolved = join_all(
                        children
                            .into_iter()
                            .map(|child| self.resolve_node(child, chain.clone())),
                    )
                    .await;
                    node.list = Some(resolved);
                }
            }
            node
        }
        .boxed_local()
    }

    /// Builds a resolved display list. Depth follows list position, index 0 at the back.
    pub fn build_display_list(
        &self,
        display_list: &[GameObjectDescriptor],
        renderer: &mut dyn Renderer,
    ) -> Vec<RenderedObjectHandle> {
        display_list
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let handle = self.build(node, renderer);
                renderer.set_depth(handle.primitive, index as f64);
                handle
            })
            .collect()
    }

    /// Creates the primitive for a resolved node, its children and its label. Prefab
    /// references are not followed here; run `resolve` first.
    pub fn build(
        &self,
        node: &GameObjectDescriptor,
        renderer: &mut dyn Renderer,
    ) -> RenderedObjectHandle {
        let mut children = BTreeMap::new();
        let (primitive, kind) = match node.object_type.as_ref() {
            Some(ObjectType::Image) => {
                build_textured(node, renderer, PrimitiveKind::Image, IMAGE_PLACEHOLDER_COLOR)
            }
            Some(ObjectType::Sprite) => {
                build_textured(node, renderer, PrimitiveKind::Sprite, SPRITE_PLACEHOLDER_COLOR)
            }
            Some(ObjectType::Rectangle) => build_rectangle(node, renderer),
            Some(ObjectType::Text) => build_text(node, renderer),
            Some(ObjectType::Container) => {
                let container = self.build_container(node, renderer, &mut children);
                (container, PrimitiveKind::Container)
            }
            Some(ObjectType::Other(name)) => {
                debug!(object_id = %node.id, object_type = %name, "object_type_unrecognized");
                (
                    placeholder(node, renderer, UNKNOWN_PLACEHOLDER_COLOR),
                    PrimitiveKind::Rectangle,
                )
            }
            None => {
                warn!(object_id = %node.id, "object_type_missing");
                (
                    placeholder(node, renderer, UNKNOWN_PLACEHOLDER_COLOR),
                    PrimitiveKind::Rectangle,
                )
            }
        };

        if !renderer.is_interactive(primitive) {
            renderer.set_interactive(primitive, HitArea::Bounds);
        }
        tag(renderer, primitive, node);
        let label = create_label(node, renderer);

        RenderedObjectHandle {
            primitive,
            object_id: node.id.clone(),
            kind,
            label: Some(label),
            children,
        }
    }

    fn build_container(
        &self,
        node: &GameObjectDescriptor,
        renderer: &mut dyn Renderer,
        children: &mut BTreeMap<String, RenderedObjectHandle>,
    ) -> PrimitiveId {
        let (x, y) = node.position();
        let container = renderer.create(PrimitiveSpec::Container {
            position: Vec2::new(x, y),
        });

        for child in node.children() {
            let mut handle = self.build(child, renderer);
            if !renderer.is_interactive(handle.primitive) {
                renderer.set_interactive(handle.primitive, HitArea::Bounds);
            }
            tag(renderer, handle.primitive, child);
            renderer.add_child(container, handle.primitive);
            if let Some(label) = handle.label.take() {
                renderer.destroy(label);
            }
            children.insert(child.id.clone(), handle);
        }

        if !children.is_empty() {
            if let Some(bounds) = renderer.bounds(container) {
                renderer.set_interactive(
                    container,
                    HitArea::Rect(Rect::new(
                        bounds.x - x,
                        bounds.y - y,
                        bounds.width,
                        bounds.height,
                    )),
                );
            }
        }

        apply_angle_and_visibility(node, renderer, container);
        container
    }
}

fn failed_instance_placeholder(mut node: GameObjectDescriptor) -> GameObjectDescriptor {
    node.object_type = Some(ObjectType::Rectangle);
    node.width = Some(PLACEHOLDER_SIZE);
    node.height = Some(PLACEHOLDER_SIZE);
    node.list = None;
    node
}

fn tag(renderer: &mut dyn Renderer, primitive: PrimitiveId, node: &GameObjectDescriptor) {
    renderer.set_object_tag(
        primitive,
        ObjectTag {
            object_id: node.id.clone(),
            data: node.clone(),
        },
    );
}

fn apply_angle_and_visibility(
    node: &GameObjectDescriptor,
    renderer: &mut dyn Renderer,
    primitive: PrimitiveId,
) {
    if let Some(angle) = node.angle.filter(|angle| *angle != 0.0) {
        renderer.set_angle(primitive, angle);
    }
    if !node.is_visible() {
        renderer.set_visible(primitive, false);
    }
}

fn build_textured(
    node: &GameObjectDescriptor,
    renderer: &mut dyn Renderer,
    kind: PrimitiveKind,
    placeholder_color: u32,
) -> (PrimitiveId, PrimitiveKind) {
    let texture = node.texture.as_ref().and_then(|texture| {
        let frame = texture.frame.as_deref().filter(|frame| !frame.is_empty())?;
        (!texture.key.is_empty()).then_some((texture.key.as_str(), frame))
    });
    let Some((key, frame)) = texture else {
        debug!(object_id = %node.id, "texture_reference_incomplete");
        return (
            placeholder(node, renderer, placeholder_color),
            PrimitiveKind::Rectangle,
        );
    };
    if !renderer.has_texture(key) || !renderer.has_frame(key, frame) {
        warn!(
            object_id = %node.id,
            texture_key = key,
            frame,
            "texture_not_loaded_using_placeholder"
        );
        return (
            placeholder(node, renderer, placeholder_color),
            PrimitiveKind::Rectangle,
        );
    }

    let (x, y) = node.position();
    let position = Vec2::new(x, y);
    let spec = match kind {
        PrimitiveKind::Sprite => PrimitiveSpec::Sprite {
            position,
            texture: key.to_string(),
            frame: Some(frame.to_string()),
        },
        _ => PrimitiveSpec::Image {
            position,
            texture: key.to_string(),
            frame: Some(frame.to_string()),
        },
    };
    let kind = spec.kind();
    let primitive = renderer.create(spec);
    let (origin_x, origin_y) = node.origin();
    renderer.set_origin(primitive, origin_x, origin_y);
    if let Some((scale_x, scale_y)) = node.scale() {
        renderer.set_scale(primitive, scale_x, scale_y);
    }
    apply_angle_and_visibility(node, renderer, primitive);
    (primitive, kind)
}

fn build_rectangle(
    node: &GameObjectDescriptor,
    renderer: &mut dyn Renderer,
) -> (PrimitiveId, PrimitiveKind) {
    let (x, y) = node.position();
    let primitive = renderer.create(PrimitiveSpec::Rectangle {
        position: Vec2::new(x, y),
        width: positive_or(node.width, PLACEHOLDER_SIZE),
        height: positive_or(node.height, PLACEHOLDER_SIZE),
        fill_color: RECTANGLE_FILL_COLOR,
        fill_alpha: RECTANGLE_FILL_ALPHA,
    });
    apply_angle_and_visibility(node, renderer, primitive);
    (primitive, PrimitiveKind::Rectangle)
}

fn build_text(
    node: &GameObjectDescriptor,
    renderer: &mut dyn Renderer,
) -> (PrimitiveId, PrimitiveKind) {
    let (x, y) = node.position();
    let primitive = renderer.create(PrimitiveSpec::Text {
        position: Vec2::new(x, y),
        text: node.text_property("text").unwrap_or("Text").to_string(),
        style: text_style(node),
    });
    let (origin_x, origin_y) = node.origin();
    renderer.set_origin(primitive, origin_x, origin_y);
    apply_angle_and_visibility(node, renderer, primitive);
    (primitive, PrimitiveKind::Text)
}

/// Style read from the node's property bag. Font sizes given as bare numbers are pixels.
pub fn text_style(node: &GameObjectDescriptor) -> TextStyle {
    let defaults = TextStyle::default();
    let font_size = node
        .text_property("fontSize")
        .map(ToString::to_string)
        .or_else(|| node.number_property("fontSize").map(|size| format!("{size}px")))
        .unwrap_or(defaults.font_size);
    let padding = |name: &str| node.number_property(name).unwrap_or(0.0);

    TextStyle {
        font_family: node
            .text_property("fontFamily")
            .map(ToString::to_string)
            .unwrap_or(defaults.font_family),
        font_size,
        font_style: node.text_property("fontStyle").map(ToString::to_string),
        color: node
            .text_property("color")
            .map(ToString::to_string)
            .unwrap_or(defaults.color),
        background_color: None,
        stroke: node.text_property("stroke").map(ToString::to_string),
        stroke_thickness: node.number_property("strokeThickness").unwrap_or(0.0),
        align: node
            .text_property("align")
            .map(ToString::to_string)
            .unwrap_or(defaults.align),
        padding: Padding {
            left: padding("paddingLeft"),
            top: padding("paddingTop"),
            right: padding("paddingRight"),
            bottom: padding("paddingBottom"),
        },
    }
}

fn placeholder(node: &GameObjectDescriptor, renderer: &mut dyn Renderer, color: u32) -> PrimitiveId {
    let (x, y) = node.position();
    let primitive = renderer.create(PrimitiveSpec::Rectangle {
        position: Vec2::new(x, y),
        width: PLACEHOLDER_SIZE,
        height: PLACEHOLDER_SIZE,
        fill_color: color,
        fill_alpha: RECTANGLE_FILL_ALPHA,
    });
    renderer.set_origin(
        primitive,
        node.origin_x.unwrap_or(0.5),
        node.origin_y.unwrap_or(0.5),
    );
    apply_angle_and_visibility(node, renderer, primitive);
    primitive
}

fn create_label(node: &GameObjectDescriptor, renderer: &mut dyn Renderer) -> PrimitiveId {
    let (x, y) = node.position();
    let label = renderer.create(PrimitiveSpec::Text {
        position: Vec2::new(x, y - LABEL_OFFSET_Y),
        text: node.display_label().to_string(),
        style: TextStyle {
            font_size: "12px".to_string(),
            color: "#ffffff".to_string(),
            background_color: Some("#000000".to_string()),
            padding: Padding {
                left: 4.0,
                top: 2.0,
                right: 4.0,
                bottom: 2.0,
            },
            ..TextStyle::default()
        },
    });
    renderer.set_origin(label, 0.5, 0.5);
    renderer.set_depth(label, LABEL_DEPTH);
    label
}
