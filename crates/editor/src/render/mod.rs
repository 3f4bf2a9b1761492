use std::fmt;

use futures::future::LocalBoxFuture;

use crate::scene::GameObjectDescriptor;

mod camera;
mod canvas;

pub use camera::{Camera2D, CameraController, CameraState, Viewport, CAMERA_ZOOM_DEFAULT};
pub use canvas::RetainedCanvas;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    pub fn outset(&self, amount: f64) -> Rect {
        Rect::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.x, self.y),
            Vec2::new(self.right(), self.y),
            Vec2::new(self.x, self.bottom()),
            Vec2::new(self.right(), self.bottom()),
        ]
    }

    /// Smallest rectangle covering every point.
    pub fn enclosing(points: &[Vec2]) -> Option<Rect> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for point in &points[1..] {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveId(pub u64);

impl fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Image,
    Sprite,
    Rectangle,
    Text,
    Container,
    Graphics,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Padding {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: String,
    pub font_style: Option<String>,
    pub color: String,
    pub background_color: Option<String>,
    pub stroke: Option<String>,
    pub stroke_thickness: f64,
    pub align: String,
    pub padding: Padding,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: "16px".to_string(),
            font_style: None,
            color: "#ffffff".to_string(),
            background_color: None,
            stroke: None,
            stroke_thickness: 0.0,
            align: "left".to_string(),
            padding: Padding::default(),
        }
    }
}

impl TextStyle {
    /// Pixel size parsed from the CSS-like `font_size`, 16 when unparseable.
    pub fn font_size_px(&self) -> f64 {
        self.font_size
            .trim()
            .trim_end_matches("px")
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|size| size.is_finite() && *size > 0.0)
            .unwrap_or(16.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    StrokeRect {
        rect: Rect,
        line_width: f64,
        color: u32,
    },
    FillRect {
        rect: Rect,
        color: u32,
    },
}

impl Shape {
    pub fn rect(&self) -> Rect {
        match self {
            Shape::StrokeRect { rect, .. } | Shape::FillRect { rect, .. } => *rect,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveSpec {
    Image {
        position: Vec2,
        texture: String,
        frame: Option<String>,
    },
    Sprite {
        position: Vec2,
        texture: String,
        frame: Option<String>,
    },
    Rectangle {
        position: Vec2,
        width: f64,
        height: f64,
        fill_color: u32,
        fill_alpha: f64,
    },
    Text {
        position: Vec2,
        text: String,
        style: TextStyle,
    },
    Container {
        position: Vec2,
    },
    Graphics {
        shapes: Vec<Shape>,
    },
}

impl PrimitiveSpec {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            PrimitiveSpec::Image { .. } => PrimitiveKind::Image,
            PrimitiveSpec::Sprite { .. } => PrimitiveKind::Sprite,
            PrimitiveSpec::Rectangle { .. } => PrimitiveKind::Rectangle,
            PrimitiveSpec::Text { .. } => PrimitiveKind::Text,
            PrimitiveSpec::Container { .. } => PrimitiveKind::Container,
            PrimitiveSpec::Graphics { .. } => PrimitiveKind::Graphics,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f64,
    pub color: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveTransform {
    pub position: Vec2,
    pub scale: Vec2,
    pub angle: f64,
    pub origin: Vec2,
    pub alpha: f64,
    pub visible: bool,
    pub depth: f64,
}

impl Default for PrimitiveTransform {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            scale: Vec2::new(1.0, 1.0),
            angle: 0.0,
            origin: Vec2::new(0.5, 0.5),
            alpha: 1.0,
            visible: true,
            depth: 0.0,
        }
    }
}

/// Hit region of an interactive primitive. `Rect` is in the primitive's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitArea {
    Bounds,
    Rect(Rect),
}

/// Back-reference from a primitive to the descriptor it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTag {
    pub object_id: String,
    pub data: GameObjectDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    Pack {
        key: String,
        url: String,
    },
    MultiAtlas {
        key: String,
        url: String,
        base_path: String,
    },
    Font {
        family: String,
        url: String,
    },
}

impl LoadRequest {
    pub fn key(&self) -> &str {
        match self {
            LoadRequest::Pack { key, .. } | LoadRequest::MultiAtlas { key, .. } => key,
            LoadRequest::Font { family, .. } => family,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            LoadRequest::Pack { url, .. }
            | LoadRequest::MultiAtlas { url, .. }
            | LoadRequest::Font { url, .. } => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub key: String,
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub completed: Vec<String>,
    pub textures_added: Vec<String>,
    pub failed: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.failed.is_empty()
    }

    pub fn merge(&mut self, other: LoadReport) {
        self.completed.extend(other.completed);
        self.textures_added.extend(other.textures_added);
        self.failed.extend(other.failed);
    }
}

/// Everything the editor core needs from a canvas engine. Primitive ids stay valid until
/// `destroy`; operations on unknown ids are ignored.
pub trait Renderer {
    fn has_texture(&self, key: &str) -> bool;

    fn has_frame(&self, key: &str, frame: &str) -> bool;

    fn create(&mut self, spec: PrimitiveSpec) -> PrimitiveId;

    /// Destroys the primitive and its children. Destroying twice is a no-op.
    fn destroy(&mut self, id: PrimitiveId);

    fn exists(&self, id: PrimitiveId) -> bool;

    fn kind(&self, id: PrimitiveId) -> Option<PrimitiveKind>;

    fn add_child(&mut self, container: PrimitiveId, child: PrimitiveId);

    fn set_position(&mut self, id: PrimitiveId, position: Vec2);

    fn set_scale(&mut self, id: PrimitiveId, x: f64, y: f64);

    fn set_angle(&mut self, id: PrimitiveId, degrees: f64);

    fn set_alpha(&mut self, id: PrimitiveId, alpha: f64);

    fn set_visible(&mut self, id: PrimitiveId, visible: bool);

    fn set_depth(&mut self, id: PrimitiveId, depth: f64);

    fn set_origin(&mut self, id: PrimitiveId, x: f64, y: f64);

    fn transform(&self, id: PrimitiveId) -> Option<PrimitiveTransform>;

    fn set_tint(&mut self, id: PrimitiveId, tint: Option<u32>);

    fn set_stroke(&mut self, id: PrimitiveId, stroke: Option<Stroke>);

    fn set_interactive(&mut self, id: PrimitiveId, area: HitArea);

    fn is_interactive(&self, id: PrimitiveId) -> bool;

    fn set_object_tag(&mut self, id: PrimitiveId, tag: ObjectTag);

    fn object_tag(&self, id: PrimitiveId) -> Option<&ObjectTag>;

    /// World-space axis-aligned bounds.
    fn bounds(&self, id: PrimitiveId) -> Option<Rect>;

    fn set_graphics(&mut self, id: PrimitiveId, shapes: Vec<Shape>);

    /// Interactive, visible primitives under a world point, topmost first.
    fn hit_test(&self, point: Vec2) -> Vec<PrimitiveId>;

    fn camera(&self) -> &Camera2D;

    fn camera_mut(&mut self) -> &mut Camera2D;

    /// Starts a bulk load. The returned future owns everything it needs, so the renderer is
    /// free to be used while it is pending.
    fn begin_load(&mut self, requests: Vec<LoadRequest>) -> LocalBoxFuture<'static, LoadReport>;
}

/// A size taken from scene data, or `fallback` when it is missing or not a positive number.
pub(crate) fn positive_or(value: Option<f64>, fallback: f64) -> f64 {
    value
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_covers_both_rectangles() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, -5.0, 10.0, 5.0);
        assert_eq!(a.union(&b), Rect::new(0.0, -5.0, 15.0, 15.0));
    }

    #[test]
    fn outset_grows_every_side() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0).outset(2.0);
        assert_eq!(rect, Rect::new(8.0, 18.0, 34.0, 44.0));
    }

    #[test]
    fn font_size_falls_back_to_sixteen() {
        let mut style = TextStyle::default();
        assert_eq!(style.font_size_px(), 16.0);
        style.font_size = "24px".to_string();
        assert_eq!(style.font_size_px(), 24.0);
        style.font_size = "huge".to_string();
        assert_eq!(style.font_size_px(), 16.0);
    }

    #[test]
    fn sizes_fall_back_unless_positive() {
        assert_eq!(positive_or(Some(800.0), 1520.0), 800.0);
        assert_eq!(positive_or(Some(0.0), 1520.0), 1520.0);
        assert_eq!(positive_or(Some(-3.0), 10.0), 10.0);
        assert_eq!(positive_or(Some(f64::NAN), 10.0), 10.0);
        assert_eq!(positive_or(None, 10.0), 10.0);
    }
}
