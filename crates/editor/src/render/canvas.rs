use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Cursor;
use std::rc::Rc;

use futures::future::{join_all, FutureExt, LocalBoxFuture};
use image::ImageReader;
use tracing::debug;

use super::{
    Camera2D, HitArea, LoadFailure, LoadReport, LoadRequest, ObjectTag, PrimitiveId,
    PrimitiveKind, PrimitiveSpec, PrimitiveTransform, Rect, Renderer, Shape, Stroke, TextStyle,
    Vec2,
};
use crate::assets::pack::{parse_atlas_frames, parse_pack_manifest, FrameSize, PackEntry};
use crate::storage::AssetSource;

const MISSING_TEXTURE_SIZE: f64 = 32.0;
const TEXT_ADVANCE_RATIO: f64 = 0.55;
const TEXT_LINE_RATIO: f64 = 1.25;

#[derive(Debug, Clone, PartialEq)]
struct TextureInfo {
    width: f64,
    height: f64,
    frames: BTreeMap<String, FrameSize>,
}

impl TextureInfo {
    fn frame_size(&self, frame: Option<&str>) -> FrameSize {
        frame
            .and_then(|name| self.frames.get(name).copied())
            .unwrap_or(FrameSize {
                width: self.width,
                height: self.height,
            })
    }
}

#[derive(Debug, Default)]
struct TextureStore {
    textures: HashMap<String, TextureInfo>,
}

#[derive(Debug, Clone)]
enum NodeContent {
    Textured {
        texture: String,
        frame: Option<String>,
    },
    Rectangle {
        width: f64,
        height: f64,
        fill_color: u32,
        fill_alpha: f64,
    },
    Text {
        text: String,
        style: TextStyle,
    },
    Container,
    Graphics {
        shapes: Vec<Shape>,
    },
}

#[derive(Debug, Clone)]
struct Node {
    kind: PrimitiveKind,
    seq: u64,
    parent: Option<PrimitiveId>,
    children: Vec<PrimitiveId>,
    transform: PrimitiveTransform,
    content: NodeContent,
    tint: Option<u32>,
    stroke: Option<Stroke>,
    hit_area: Option<HitArea>,
    tag: Option<ObjectTag>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    tx: f64,
    ty: f64,
}

impl Affine {
    const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    fn local(transform: &PrimitiveTransform) -> Affine {
        let (sin, cos) = transform.angle.to_radians().sin_cos();
        Affine {
            a: cos * transform.scale.x,
            b: sin * transform.scale.x,
            c: -sin * transform.scale.y,
            d: cos * transform.scale.y,
            tx: transform.position.x,
            ty: transform.position.y,
        }
    }

    fn then(&self, child: &Affine) -> Affine {
        Affine {
            a: self.a * child.a + self.c * child.b,
            b: self.b * child.a + self.d * child.b,
            c: self.a * child.c + self.c * child.d,
            d: self.b * child.c + self.d * child.d,
            tx: self.a * child.tx + self.c * child.ty + self.tx,
            ty: self.b * child.tx + self.d * child.ty + self.ty,
        }
    }

    fn apply(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            self.a * point.x + self.c * point.y + self.tx,
            self.b * point.x + self.d * point.y + self.ty,
        )
    }

    fn inverse(&self) -> Option<Affine> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        Some(Affine {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            tx: (self.c * self.ty - self.d * self.tx) * inv,
            ty: (self.b * self.tx - self.a * self.ty) * inv,
        })
    }
}

/// Headless retained-mode canvas: keeps the primitive tree, computes bounds, draw order and
/// hit tests, and loads pack manifests and atlases through an [`AssetSource`].
pub struct RetainedCanvas {
    nodes: HashMap<PrimitiveId, Node>,
    next_id: u64,
    textures: Rc<RefCell<TextureStore>>,
    fonts: Rc<RefCell<BTreeSet<String>>>,
    source: Option<Rc<dyn AssetSource>>,
    camera: Camera2D,
}

impl Default for RetainedCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl RetainedCanvas {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 0,
            textures: Rc::new(RefCell::new(TextureStore::default())),
            fonts: Rc::new(RefCell::new(BTreeSet::new())),
            source: None,
            camera: Camera2D::default(),
        }
    }

    pub fn with_source(source: Rc<dyn AssetSource>) -> Self {
        Self {
            source: Some(source),
            ..Self::new()
        }
    }

    pub fn register_texture(&mut self, key: &str, width: f64, height: f64) {
        self.register_atlas(key, width, height, BTreeMap::new());
    }

    pub fn register_atlas(
        &mut self,
        key: &str,
        width: f64,
        height: f64,
        frames: BTreeMap<String, FrameSize>,
    ) {
        self.textures.borrow_mut().textures.insert(
            key.to_string(),
            TextureInfo {
                width,
                height,
                frames,
            },
        );
    }

    pub fn texture_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.textures.borrow().textures.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn has_font(&self, family: &str) -> bool {
        self.fonts.borrow().contains(family)
    }

    pub fn primitive_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, id: PrimitiveId) -> Vec<PrimitiveId> {
        self.nodes
            .get(&id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: PrimitiveId) -> Option<PrimitiveId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn tint(&self, id: PrimitiveId) -> Option<u32> {
        self.nodes.get(&id).and_then(|node| node.tint)
    }

    pub fn stroke(&self, id: PrimitiveId) -> Option<Stroke> {
        self.nodes.get(&id).and_then(|node| node.stroke)
    }

    pub fn shapes(&self, id: PrimitiveId) -> Vec<Shape> {
        match self.nodes.get(&id).map(|node| &node.content) {
            Some(NodeContent::Graphics { shapes }) => shapes.clone(),
            _ => Vec::new(),
        }
    }

    pub fn text(&self, id: PrimitiveId) -> Option<(&str, &TextStyle)> {
        match self.nodes.get(&id).map(|node| &node.content) {
            Some(NodeContent::Text { text, style }) => Some((text.as_str(), style)),
            _ => None,
        }
    }

    pub fn fill(&self, id: PrimitiveId) -> Option<(u32, f64)> {
        match self.nodes.get(&id).map(|node| &node.content) {
            Some(NodeContent::Rectangle {
                fill_color,
                fill_alpha,
                ..
            }) => Some((*fill_color, *fill_alpha)),
            _ => None,
        }
    }

    pub fn texture_of(&self, id: PrimitiveId) -> Option<(&str, Option<&str>)> {
        match self.nodes.get(&id).map(|node| &node.content) {
            Some(NodeContent::Textured { texture, frame }) => {
                Some((texture.as_str(), frame.as_deref()))
            }
            _ => None,
        }
    }

    /// Every primitive in paint order: roots by (depth, creation), each followed by its
    /// children in insertion order.
    pub fn draw_order(&self) -> Vec<PrimitiveId> {
        let mut roots: Vec<(&PrimitiveId, &Node)> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .collect();
        roots.sort_by(|(_, left), (_, right)| {
            left.transform
                .depth
                .total_cmp(&right.transform.depth)
                .then(left.seq.cmp(&right.seq))
        });

        let mut order = Vec::with_capacity(self.nodes.len());
        for (id, _) in roots {
            self.push_subtree(*id, &mut order);
        }
        order
    }

    fn push_subtree(&self, id: PrimitiveId, order: &mut Vec<PrimitiveId>) {
        order.push(id);
        if let Some(node) = self.nodes.get(&id) {
            for child in &node.children {
                self.push_subtree(*child, order);
            }
        }
    }

    fn world_affine(&self, id: PrimitiveId) -> Option<Affine> {
        let node = self.nodes.get(&id)?;
        let local = Affine::local(&node.transform);
        match node.parent {
            Some(parent) => Some(self.world_affine(parent)?.then(&local)),
            None => Some(Affine::IDENTITY.then(&local)),
        }
    }

    fn effectively_visible(&self, id: PrimitiveId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.nodes.get(&node_id) {
                Some(node) if node.transform.visible => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Size before scale, rotation and origin are applied. `None` for containers and graphics.
    fn local_size(&self, node: &Node) -> Option<(f64, f64)> {
        match &node.content {
            NodeContent::Textured { texture, frame } => {
                let textures = self.textures.borrow();
                let size = textures
                    .textures
                    .get(texture)
                    .map(|info| info.frame_size(frame.as_deref()))
                    .unwrap_or(FrameSize {
                        width: MISSING_TEXTURE_SIZE,
                        height: MISSING_TEXTURE_SIZE,
                    });
                Some((size.width, size.height))
            }
            NodeContent::Rectangle { width, height, .. } => Some((*width, *height)),
            NodeContent::Text { text, style } => Some(measure_text(text, style)),
            NodeContent::Container | NodeContent::Graphics { .. } => None,
        }
    }

    fn local_rect(&self, node: &Node) -> Option<Rect> {
        let (width, height) = self.local_size(node)?;
        let origin = node.transform.origin;
        Some(Rect::new(
            -origin.x * width,
            -origin.y * height,
            width,
            height,
        ))
    }

    fn hits(&self, id: PrimitiveId, node: &Node, area: HitArea, point: Vec2) -> bool {
        let Some(local_point) = self
            .world_affine(id)
            .and_then(|affine| affine.inverse())
            .map(|inverse| inverse.apply(point))
        else {
            return false;
        };
        match area {
            HitArea::Rect(rect) => rect.contains(local_point),
            HitArea::Bounds => match self.local_rect(node) {
                Some(rect) => rect.contains(local_point),
                None => self
                    .bounds(id)
                    .map(|bounds| bounds.contains(point))
                    .unwrap_or(false),
            },
        }
    }

    fn with_node(&mut self, id: PrimitiveId, update: impl FnOnce(&mut Node)) {
        if let Some(node) = self.nodes.get_mut(&id) {
            update(node);
        }
    }

    fn detach(&mut self, id: PrimitiveId) {
        let parent = self.nodes.get(&id).and_then(|node| node.parent);
        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|child| *child != id);
            }
        }
        self.with_node(id, |node| node.parent = None);
    }
}

fn measure_text(text: &str, style: &TextStyle) -> (f64, f64) {
    let size = style.font_size_px();
    let longest = text.lines().map(|line| line.chars().count()).max().unwrap_or(0);
    let lines = text.lines().count().max(1);
    let stroke = style.stroke_thickness.max(0.0);
    (
        longest as f64 * size * TEXT_ADVANCE_RATIO
            + style.padding.left
            + style.padding.right
            + stroke,
        lines as f64 * size * TEXT_LINE_RATIO + style.padding.top + style.padding.bottom + stroke,
    )
}

impl Renderer for RetainedCanvas {
    fn has_texture(&self, key: &str) -> bool {
        self.textures.borrow().textures.contains_key(key)
    }

    fn has_frame(&self, key: &str, frame: &str) -> bool {
        self.textures
            .borrow()
            .textures
            .get(key)
            .map(|info| info.frames.is_empty() || info.frames.contains_key(frame))
            .unwrap_or(false)
    }

    fn create(&mut self, spec: PrimitiveSpec) -> PrimitiveId {
        self.next_id += 1;
        let id = PrimitiveId(self.next_id);
        let kind = spec.kind();
        let mut transform = PrimitiveTransform::default();
        let content = match spec {
            PrimitiveSpec::Image {
                position,
                texture,
                frame,
            }
            | PrimitiveSpec::Sprite {
                position,
                texture,
                frame,
            } => {
                transform.position = position;
                NodeContent::Textured { texture, frame }
            }
            PrimitiveSpec::Rectangle {
                position,
                width,
                height,
                fill_color,
                fill_alpha,
            } => {
                transform.position = position;
                NodeContent::Rectangle {
                    width,
                    height,
                    fill_color,
                    fill_alpha,
                }
            }
            PrimitiveSpec::Text {
                position,
                text,
                style,
            } => {
                transform.position = position;
                transform.origin = Vec2::default();
                NodeContent::Text { text, style }
            }
            PrimitiveSpec::Container { position } => {
                transform.position = position;
                transform.origin = Vec2::default();
                NodeContent::Container
            }
            PrimitiveSpec::Graphics { shapes } => {
                transform.origin = Vec2::default();
                NodeContent::Graphics { shapes }
            }
        };
        self.nodes.insert(
            id,
            Node {
                kind,
                seq: self.next_id,
                parent: None,
                children: Vec::new(),
                transform,
                content,
                tint: None,
                stroke: None,
                hit_area: None,
                tag: None,
            },
        );
        id
    }

    fn destroy(&mut self, id: PrimitiveId) {
        if !self.nodes.contains_key(&id) {
            return;
        }
        self.detach(id);
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                pending.extend(node.children);
            }
        }
    }

    fn exists(&self, id: PrimitiveId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn kind(&self, id: PrimitiveId) -> Option<PrimitiveKind> {
        self.nodes.get(&id).map(|node| node.kind)
    }

    fn add_child(&mut self, container: PrimitiveId, child: PrimitiveId) {
        if container == child
            || !self.nodes.contains_key(&child)
            || self.kind(container) != Some(PrimitiveKind::Container)
        {
            return;
        }
        self.detach(child);
        self.with_node(child, |node| node.parent = Some(container));
        self.with_node(container, |node| node.children.push(child));
    }

    fn set_position(&mut self, id: PrimitiveId, position: Vec2) {
        self.with_node(id, |node| node.transform.position = position);
    }

    fn set_scale(&mut self, id: PrimitiveId, x: f64, y: f64) {
        self.with_node(id, |node| node.transform.scale = Vec2::new(x, y));
    }

    fn set_angle(&mut self, id: PrimitiveId, degrees: f64) {
        self.with_node(id, |node| node.transform.angle = degrees);
    }

    fn set_alpha(&mut self, id: PrimitiveId, alpha: f64) {
        self.with_node(id, |node| node.transform.alpha = alpha.clamp(0.0, 1.0));
    }

    fn set_visible(&mut self, id: PrimitiveId, visible: bool) {
        self.with_node(id, |node| node.transform.visible = visible);
    }

    fn set_depth(&mut self, id: PrimitiveId, depth: f64) {
        self.with_node(id, |node| node.transform.depth = depth);
    }

    fn set_origin(&mut self, id: PrimitiveId, x: f64, y: f64) {
        self.with_node(id, |node| node.transform.origin = Vec2::new(x, y));
    }

    fn transform(&self, id: PrimitiveId) -> Option<PrimitiveTransform> {
        self.nodes.get(&id).map(|node| node.transform)
    }

    fn set_tint(&mut self, id: PrimitiveId, tint: Option<u32>) {
        self.with_node(id, |node| node.tint = tint);
    }

    fn set_stroke(&mut self, id: PrimitiveId, stroke: Option<Stroke>) {
        self.with_node(id, |node| {
            node.stroke = stroke.filter(|stroke| stroke.width > 0.0)
        });
    }

    fn set_interactive(&mut self, id: PrimitiveId, area: HitArea) {
        self.with_node(id, |node| node.hit_area = Some(area));
    }

    fn is_interactive(&self, id: PrimitiveId) -> bool {
        self.nodes
            .get(&id)
            .map(|node| node.hit_area.is_some())
            .unwrap_or(false)
    }

    fn set_object_tag(&mut self, id: PrimitiveId, tag: ObjectTag) {
        self.with_node(id, |node| node.tag = Some(tag));
    }

    fn object_tag(&self, id: PrimitiveId) -> Option<&ObjectTag> {
        self.nodes.get(&id).and_then(|node| node.tag.as_ref())
    }

    fn bounds(&self, id: PrimitiveId) -> Option<Rect> {
        let node = self.nodes.get(&id)?;
        let affine = self.world_affine(id)?;
        match &node.content {
            NodeContent::Container => {
                let mut union: Option<Rect> = None;
                for child in &node.children {
                    if let Some(bounds) = self.bounds(*child) {
                        union = Some(match union {
                            Some(current) => current.union(&bounds),
                            None => bounds,
                        });
                    }
                }
                let origin = affine.apply(Vec2::default());
                Some(union.unwrap_or(Rect::new(origin.x, origin.y, 0.0, 0.0)))
            }
            NodeContent::Graphics { shapes } => {
                let points: Vec<Vec2> = shapes
                    .iter()
                    .flat_map(|shape| shape.rect().corners())
                    .map(|corner| affine.apply(corner))
                    .collect();
                Rect::enclosing(&points)
            }
            _ => {
                let rect = self.local_rect(node)?;
                let corners = rect.corners().map(|corner| affine.apply(corner));
                Rect::enclosing(&corners)
            }
        }
    }

    fn set_graphics(&mut self, id: PrimitiveId, shapes: Vec<Shape>) {
        self.with_node(id, |node| {
            if let NodeContent::Graphics { shapes: current } = &mut node.content {
                *current = shapes;
            }
        });
    }

    fn hit_test(&self, point: Vec2) -> Vec<PrimitiveId> {
        let mut hits = Vec::new();
        for id in self.draw_order().into_iter().rev() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let Some(area) = node.hit_area else {
                continue;
            };
            if self.effectively_visible(id) && self.hits(id, node, area, point) {
                hits.push(id);
            }
        }
        hits
    }

    fn camera(&self) -> &Camera2D {
        &self.camera
    }

    fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    fn begin_load(&mut self, requests: Vec<LoadRequest>) -> LocalBoxFuture<'static, LoadReport> {
        let loader = Loader {
            source: self.source.clone(),
            textures: Rc::clone(&self.textures),
            fonts: Rc::clone(&self.fonts),
        };
        async move { loader.run(requests).await }.boxed_local()
    }
}

struct Loader {
    source: Option<Rc<dyn AssetSource>>,
    textures: Rc<RefCell<TextureStore>>,
    fonts: Rc<RefCell<BTreeSet<String>>>,
}

impl Loader {
    async fn run(&self, requests: Vec<LoadRequest>) -> LoadReport {
        let reports = join_all(requests.iter().map(|request| self.load(request))).await;
        let mut report = LoadReport::default();
        for partial in reports {
            report.merge(partial);
        }
        report
    }

    async fn load(&self, request: &LoadRequest) -> LoadReport {
        let mut report = LoadReport::default();
        let outcome = match request {
            LoadRequest::Pack { url, .. } => self.load_pack(url, &mut report).await,
            LoadRequest::MultiAtlas { key, url, .. } => {
                self.load_atlas(key, url, &mut report).await
            }
            LoadRequest::Font { family, url } => self.fetch(url).await.map(|_| {
                self.fonts.borrow_mut().insert(family.clone());
            }),
        };
        match outcome {
            Ok(()) => report.completed.push(request.key().to_string()),
            Err(reason) => report.failed.push(LoadFailure {
                key: request.key().to_string(),
                url: request.url().to_string(),
                reason,
            }),
        }
        report
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| "no_asset_source".to_string())?;
        source
            .fetch_bytes(url)
            .await
            .map_err(|error| format!("fetch_failed:{error}"))
    }

    async fn load_pack(&self, url: &str, report: &mut LoadReport) -> Result<(), String> {
        let bytes = self.fetch(url).await?;
        let entries =
            parse_pack_manifest(url, &bytes).map_err(|error| format!("manifest_invalid:{error}"))?;
        for entry in entries {
            if self.has_texture(entry.key()) {
                debug!(texture_key = entry.key(), "pack_entry_already_loaded");
                continue;
            }
            let outcome = match &entry {
                PackEntry::Image { key, url } => self.load_image(key, url, None, report).await,
                PackEntry::Atlas { key, atlas_url, .. } => {
                    self.load_atlas(key, atlas_url, report).await
                }
                PackEntry::MultiAtlas { key, url, .. } => self.load_atlas(key, url, report).await,
                PackEntry::Spritesheet {
                    key,
                    url,
                    frame_width,
                    frame_height,
                } => {
                    self.load_image(key, url, Some((*frame_width, *frame_height)), report)
                        .await
                }
                PackEntry::Unsupported { key, kind } => {
                    debug!(key = %key, kind = %kind, "pack_entry_skipped");
                    Ok(())
                }
            };
            if let Err(reason) = outcome {
                report.failed.push(LoadFailure {
                    key: entry.key().to_string(),
                    url: url.to_string(),
                    reason,
                });
            }
        }
        Ok(())
    }

    async fn load_atlas(&self, key: &str, url: &str, report: &mut LoadReport) -> Result<(), String> {
        if self.has_texture(key) {
            return Ok(());
        }
        let bytes = self.fetch(url).await?;
        let atlas = parse_atlas_frames(url, &bytes).map_err(|error| format!("atlas_invalid:{error}"))?;
        let size = atlas.size.unwrap_or_else(|| {
            atlas.frames.values().fold(
                FrameSize {
                    width: 0.0,
                    height: 0.0,
                },
                |acc, frame| FrameSize {
                    width: acc.width.max(frame.width),
                    height: acc.height.max(frame.height),
                },
            )
        });
        self.insert_texture(key, size, atlas.frames, report);
        Ok(())
    }

    async fn load_image(
        &self,
        key: &str,
        url: &str,
        frame_size: Option<(f64, f64)>,
        report: &mut LoadReport,
    ) -> Result<(), String> {
        let bytes = self.fetch(url).await?;
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|error| format!("format_detection_failed:{error}"))?
            .into_dimensions()
            .map_err(|error| format!("decode_failed:{error}"))?;
        let size = FrameSize {
            width: f64::from(width),
            height: f64::from(height),
        };
        let mut frames = BTreeMap::new();
        if let Some((frame_width, frame_height)) = frame_size {
            if frame_width > 0.0 && frame_height > 0.0 {
                let columns = (size.width / frame_width).floor() as usize;
                let rows = (size.height / frame_height).floor() as usize;
                for index in 0..columns * rows {
                    frames.insert(
                        index.to_string(),
                        FrameSize {
                            width: frame_width,
                            height: frame_height,
                        },
                    );
                }
            }
        }
        self.insert_texture(key, size, frames, report);
        Ok(())
    }

    fn has_texture(&self, key: &str) -> bool {
        self.textures.borrow().textures.contains_key(key)
    }

    fn insert_texture(
        &self,
        key: &str,
        size: FrameSize,
        frames: BTreeMap<String, FrameSize>,
        report: &mut LoadReport,
    ) {
        self.textures.borrow_mut().textures.insert(
            key.to_string(),
            TextureInfo {
                width: size.width,
                height: size.height,
                frames,
            },
        );
        report.textures_added.push(key.to_string());
        debug!(texture_key = key, "texture_registered");
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use serde_json::json;

    use super::*;
    use crate::testing::{png_bytes, FakeAssetSource};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn rectangle(canvas: &mut RetainedCanvas, x: f64, y: f64, size: f64) -> PrimitiveId {
        canvas.create(PrimitiveSpec::Rectangle {
            position: Vec2::new(x, y),
            width: size,
            height: size,
            fill_color: 0x2ecc71,
            fill_alpha: 0.5,
        })
    }

    #[test]
    fn centered_rectangle_bounds_and_rotation() {
        let mut canvas = RetainedCanvas::new();
        let id = rectangle(&mut canvas, 100.0, 100.0, 100.0);
        assert_eq!(canvas.bounds(id), Some(Rect::new(50.0, 50.0, 100.0, 100.0)));

        canvas.set_scale(id, 2.0, 1.0);
        assert_eq!(canvas.bounds(id), Some(Rect::new(0.0, 50.0, 200.0, 100.0)));

        canvas.set_scale(id, 1.0, 1.0);
        canvas.set_angle(id, 90.0);
        let rotated = canvas.bounds(id).expect("bounds");
        assert!(close(rotated.x, 50.0) && close(rotated.width, 100.0));
    }

    #[test]
    fn container_bounds_union_children_in_world_space() {
        let mut canvas = RetainedCanvas::new();
        let container = canvas.create(PrimitiveSpec::Container {
            position: Vec2::new(300.0, 200.0),
        });
        let left = rectangle(&mut canvas, -50.0, 0.0, 20.0);
        let right = rectangle(&mut canvas, 50.0, 0.0, 20.0);
        canvas.add_child(container, left);
        canvas.add_child(container, right);

        assert_eq!(
            canvas.bounds(container),
            Some(Rect::new(240.0, 190.0, 120.0, 20.0))
        );
        assert_eq!(canvas.parent(left), Some(container));
    }

    #[test]
    fn hit_test_orders_topmost_first_and_skips_hidden() {
        let mut canvas = RetainedCanvas::new();
        let low = rectangle(&mut canvas, 0.0, 0.0, 100.0);
        let high = rectangle(&mut canvas, 10.0, 10.0, 100.0);
        let _passive = rectangle(&mut canvas, 0.0, 0.0, 100.0);
        canvas.set_depth(low, 0.0);
        canvas.set_depth(high, 1.0);
        canvas.set_interactive(low, HitArea::Bounds);
        canvas.set_interactive(high, HitArea::Bounds);

        assert_eq!(canvas.hit_test(Vec2::new(5.0, 5.0)), vec![high, low]);

        canvas.set_visible(high, false);
        assert_eq!(canvas.hit_test(Vec2::new(5.0, 5.0)), vec![low]);
    }

    #[test]
    fn container_children_are_hit_before_the_container() {
        let mut canvas = RetainedCanvas::new();
        let container = canvas.create(PrimitiveSpec::Container {
            position: Vec2::new(100.0, 100.0),
        });
        let child = rectangle(&mut canvas, 0.0, 0.0, 40.0);
        canvas.add_child(container, child);
        canvas.set_interactive(child, HitArea::Bounds);
        canvas.set_interactive(container, HitArea::Rect(Rect::new(-20.0, -20.0, 40.0, 40.0)));

        assert_eq!(canvas.hit_test(Vec2::new(100.0, 100.0)), vec![child, container]);
        assert!(canvas.hit_test(Vec2::new(150.0, 150.0)).is_empty());
    }

    #[test]
    fn destroy_removes_children_and_is_idempotent() {
        let mut canvas = RetainedCanvas::new();
        let container = canvas.create(PrimitiveSpec::Container {
            position: Vec2::default(),
        });
        let child = rectangle(&mut canvas, 0.0, 0.0, 10.0);
        canvas.add_child(container, child);

        canvas.destroy(container);
        canvas.destroy(container);
        assert!(!canvas.exists(child));
        assert_eq!(canvas.primitive_count(), 0);
    }

    #[test]
    fn draw_order_sorts_roots_by_depth_then_creation() {
        let mut canvas = RetainedCanvas::new();
        let a = rectangle(&mut canvas, 0.0, 0.0, 1.0);
        let b = rectangle(&mut canvas, 0.0, 0.0, 1.0);
        let c = rectangle(&mut canvas, 0.0, 0.0, 1.0);
        canvas.set_depth(a, 5.0);
        canvas.set_depth(c, 1.0);
        assert_eq!(canvas.draw_order(), vec![b, c, a]);
    }

    #[test]
    fn text_is_anchored_top_left_and_grows_with_padding() {
        let mut canvas = RetainedCanvas::new();
        let plain = canvas.create(PrimitiveSpec::Text {
            position: Vec2::new(10.0, 10.0),
            text: "abcd".to_string(),
            style: TextStyle::default(),
        });
        let mut padded_style = TextStyle::default();
        padded_style.padding.left = 4.0;
        padded_style.padding.right = 4.0;
        let padded = canvas.create(PrimitiveSpec::Text {
            position: Vec2::new(10.0, 10.0),
            text: "abcd".to_string(),
            style: padded_style,
        });
        let plain_bounds = canvas.bounds(plain).expect("plain");
        let padded_bounds = canvas.bounds(padded).expect("padded");
        assert_eq!((plain_bounds.x, plain_bounds.y), (10.0, 10.0));
        assert!(close(padded_bounds.width - plain_bounds.width, 8.0));
    }

    #[test]
    fn pack_load_registers_images_and_atlases() {
        let source = Rc::new(FakeAssetSource::default());
        source.insert_json(
            "/assets/media/rooms/town-pack.json",
            &json!({
                "town": { "files": [
                    { "type": "image", "key": "sky", "url": "assets/media/rooms/sky.png" },
                    { "type": "multiatlas", "key": "town", "url": "assets/media/rooms/town.json",
                      "path": "assets/media/rooms" },
                    { "type": "image", "key": "missing", "url": "assets/media/rooms/none.png" }
                ] }
            }),
        );
        source.insert("/assets/media/rooms/sky.png", png_bytes(64, 32));
        source.insert_json(
            "/assets/media/rooms/town.json",
            &json!({ "textures": [{ "size": { "w": 512, "h": 256 }, "frames": [
                { "filename": "door", "frame": { "x": 0, "y": 0, "w": 40, "h": 80 } }
            ] }] }),
        );
        let mut canvas = RetainedCanvas::with_source(source.clone());

        let report = block_on(canvas.begin_load(vec![LoadRequest::Pack {
            key: "pack-1-0".to_string(),
            url: "/assets/media/rooms/town-pack.json".to_string(),
        }]));

        assert_eq!(report.completed, vec!["pack-1-0".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].key, "missing");
        assert!(canvas.has_texture("sky"));
        assert!(canvas.has_frame("town", "door"));
        assert!(!canvas.has_frame("town", "window"));

        let image = canvas.create(PrimitiveSpec::Image {
            position: Vec2::new(0.0, 0.0),
            texture: "town".to_string(),
            frame: Some("door".to_string()),
        });
        assert_eq!(canvas.bounds(image), Some(Rect::new(-20.0, -40.0, 40.0, 80.0)));
    }

    #[test]
    fn failed_font_and_missing_source_are_reported() {
        let mut detached = RetainedCanvas::new();
        let report = block_on(detached.begin_load(vec![LoadRequest::Font {
            family: "Arial".to_string(),
            url: "/assets/fonts/Arial.woff2".to_string(),
        }]));
        assert_eq!(report.failed[0].reason, "no_asset_source");

        let source = Rc::new(FakeAssetSource::default());
        source.insert("/assets/fonts/Arial.woff2", vec![0, 1, 2]);
        let mut canvas = RetainedCanvas::with_source(source);
        let report = block_on(canvas.begin_load(vec![LoadRequest::Font {
            family: "Arial".to_string(),
            url: "/assets/fonts/Arial.woff2".to_string(),
        }]));
        assert!(report.failed.is_empty());
        assert!(canvas.has_font("Arial"));
    }

    #[test]
    fn affine_inverse_round_trips() {
        let transform = PrimitiveTransform {
            position: Vec2::new(12.0, -4.0),
            scale: Vec2::new(2.0, 0.5),
            angle: 30.0,
            ..PrimitiveTransform::default()
        };
        let affine = Affine::local(&transform);
        let inverse = affine.inverse().expect("invertible");
        let point = Vec2::new(3.0, 7.0);
        let back = inverse.apply(affine.apply(point));
        assert!(close(back.x, point.x) && close(back.y, point.y));
    }
}
