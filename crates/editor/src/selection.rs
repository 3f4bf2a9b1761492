use tracing::{debug, info};

use crate::graph::SceneObjectRegistry;
use crate::input::{PointerEvent, PointerEventKind};
use crate::render::{PrimitiveId, PrimitiveKind, PrimitiveSpec, Rect, Renderer, Shape, Vec2};

pub const SELECTION_DEPTH: f64 = 9_999.0;
pub const SELECTION_COLOR: u32 = 0x00ff00;
pub const SELECTION_LINE_WIDTH: f64 = 2.0;
pub const SELECTION_MARGIN: f64 = 2.0;
pub const HANDLE_SIZE: f64 = 6.0;
pub const CLICK_MAX_DURATION_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Selected(String),
}

#[derive(Debug, Clone, Copy)]
struct PrimaryPress {
    position: Vec2,
    timestamp_ms: u64,
    moved: bool,
}

/// Single-object selection with a bounding overlay drawn on its own graphics primitive.
#[derive(Debug, Default)]
pub struct SelectionController {
    state: SelectionState,
    overlay: Option<PrimitiveId>,
    press: Option<PrimaryPress>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected_id(&self) -> Option<&str> {
        match &self.state {
            SelectionState::Selected(id) => Some(id),
            SelectionState::Idle => None,
        }
    }

    pub fn overlay(&self) -> Option<PrimitiveId> {
        self.overlay
    }

    /// Selects `id` and draws the overlay around its current bounds. An id the registry
    /// does not know leaves the controller idle. Returns whether `id` is now selected.
    pub fn select(
        &mut self,
        id: &str,
        registry: &SceneObjectRegistry,
        renderer: &mut dyn Renderer,
    ) -> bool {
        self.clear_highlight(registry, renderer);
        self.clear_overlay(renderer);

        let Some(primitive) = registry.primitive(id) else {
            debug!(object_id = id, "selection_target_unknown");
            self.state = SelectionState::Idle;
            return false;
        };
        self.state = SelectionState::Selected(id.to_string());
        if let Some(bounds) = renderer.bounds(primitive) {
            let overlay = self.ensure_overlay(renderer);
            renderer.set_graphics(overlay, overlay_shapes(bounds));
        }
        info!(object_id = id, "object_selected");
        true
    }

    pub fn deselect(&mut self, registry: &SceneObjectRegistry, renderer: &mut dyn Renderer) {
        if self.state == SelectionState::Idle {
            return;
        }
        self.clear_highlight(registry, renderer);
        self.clear_overlay(renderer);
        self.state = SelectionState::Idle;
        debug!("object_deselected");
    }

    /// Redraws the overlay after the selected object moved or changed size.
    pub fn refresh(&mut self, registry: &SceneObjectRegistry, renderer: &mut dyn Renderer) {
        if let Some(id) = self.selected_id().map(ToString::to_string) {
            self.select(&id, registry, renderer);
        }
    }

    /// Drops the selection and the overlay primitive without touching registry objects,
    /// which are about to be torn down anyway.
    pub fn reset(&mut self, renderer: &mut dyn Renderer) {
        if let Some(overlay) = self.overlay.take() {
            renderer.destroy(overlay);
        }
        self.state = SelectionState::Idle;
        self.press = None;
    }

    /// Tracks primary-button presses and selects on a click: release without movement
    /// within [`CLICK_MAX_DURATION_MS`]. The topmost registered hit wins and nothing below it
    /// is considered. Returns the id selected by this event.
    pub fn handle_pointer(
        &mut self,
        event: &PointerEvent,
        registry: &SceneObjectRegistry,
        renderer: &mut dyn Renderer,
    ) -> Option<String> {
        match event.kind {
            PointerEventKind::Down => {
                if event.is_primary() {
                    self.press = Some(PrimaryPress {
                        position: event.position,
                        timestamp_ms: event.timestamp_ms,
                        moved: false,
                    });
                }
                None
            }
            PointerEventKind::Move => {
                if let Some(press) = self.press.as_mut() {
                    if event.position != press.position {
                        press.moved = true;
                    }
                }
                None
            }
            PointerEventKind::Up => {
                if !event.is_primary() {
                    return None;
                }
                let press = self.press.take()?;
                let elapsed = event.timestamp_ms.saturating_sub(press.timestamp_ms);
                let moved = press.moved || event.position != press.position;
                if moved || elapsed >= CLICK_MAX_DURATION_MS {
                    debug!(elapsed_ms = elapsed, moved, "pointer_release_not_a_click");
                    return None;
                }
                self.click(event.position, registry, renderer)
            }
        }
    }

    fn click(
        &mut self,
        screen: Vec2,
        registry: &SceneObjectRegistry,
        renderer: &mut dyn Renderer,
    ) -> Option<String> {
        let world = renderer.camera().screen_to_world(screen);
        let target = renderer.hit_test(world).into_iter().find_map(|primitive| {
            renderer
                .object_tag(primitive)
                .map(|tag| tag.object_id.clone())
                .filter(|id| registry.contains(id))
        })?;
        self.select(&target, registry, renderer).then_some(target)
    }

    fn ensure_overlay(&mut self, renderer: &mut dyn Renderer) -> PrimitiveId {
        if let Some(overlay) = self.overlay.filter(|overlay| renderer.exists(*overlay)) {
            return overlay;
        }
        let overlay = renderer.create(PrimitiveSpec::Graphics { shapes: Vec::new() });
        renderer.set_depth(overlay, SELECTION_DEPTH);
        self.overlay = Some(overlay);
        overlay
    }

    fn clear_overlay(&mut self, renderer: &mut dyn Renderer) {
        if let Some(overlay) = self.overlay {
            renderer.set_graphics(overlay, Vec::new());
        }
    }

    fn clear_highlight(&self, registry: &SceneObjectRegistry, renderer: &mut dyn Renderer) {
        let Some(handle) = self.selected_id().and_then(|id| registry.get(id)) else {
            return;
        };
        match renderer.kind(handle.primitive) {
            Some(PrimitiveKind::Image | PrimitiveKind::Sprite) => {
                renderer.set_tint(handle.primitive, None)
            }
            Some(PrimitiveKind::Rectangle) => renderer.set_stroke(handle.primitive, None),
            _ => {}
        }
    }
}

/// Outline outset by [`SELECTION_MARGIN`] plus a square handle centred on each corner.
pub fn overlay_shapes(bounds: Rect) -> Vec<Shape> {
    let mut shapes = vec![Shape::StrokeRect {
        rect: bounds.outset(SELECTION_MARGIN),
        line_width: SELECTION_LINE_WIDTH,
        color: SELECTION_COLOR,
    }];
    shapes.extend(bounds.corners().into_iter().map(|corner| Shape::FillRect {
        rect: Rect::new(
            corner.x - HANDLE_SIZE / 2.0,
            corner.y - HANDLE_SIZE / 2.0,
            HANDLE_SIZE,
            HANDLE_SIZE,
        ),
        color: SELECTION_COLOR,
    }));
    shapes
}
