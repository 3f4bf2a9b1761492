use tracing::debug;

use super::Vec2;
use crate::config::CameraConfig;
use crate::input::{Key, PointerEvent, PointerEventKind};

pub const CAMERA_ZOOM_DEFAULT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1520.0,
            height: 960.0,
        }
    }
}

/// Scroll is the world point shown at the viewport's top-left corner at zoom 1; zoom
/// scales around the viewport center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub scroll: Vec2,
    pub viewport: Viewport,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            scroll: Vec2::default(),
            viewport: Viewport::default(),
            zoom: CAMERA_ZOOM_DEFAULT,
            min_zoom: 0.1,
            max_zoom: 3.0,
        }
    }
}

impl Camera2D {
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom.max(min_zoom);
        self.zoom = self.clamp_zoom(self.zoom);
    }

    pub fn set_zoom_clamped(&mut self, zoom: f64) -> f64 {
        self.zoom = self.clamp_zoom(zoom);
        self.zoom
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        if !zoom.is_finite() {
            return CAMERA_ZOOM_DEFAULT.clamp(self.min_zoom, self.max_zoom);
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        let half_w = self.viewport.width * 0.5;
        let half_h = self.viewport.height * 0.5;
        Vec2::new(
            (screen.x - half_w) / self.zoom + half_w + self.scroll.x,
            (screen.y - half_h) / self.zoom + half_h + self.scroll.y,
        )
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        let half_w = self.viewport.width * 0.5;
        let half_h = self.viewport.height * 0.5;
        Vec2::new(
            (world.x - self.scroll.x - half_w) * self.zoom + half_w,
            (world.y - self.scroll.y - half_h) * self.zoom + half_h,
        )
    }

    pub fn center_on(&mut self, x: f64, y: f64) {
        self.scroll = Vec2::new(
            x - self.viewport.width * 0.5,
            y - self.viewport.height * 0.5,
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

#[derive(Debug, Clone, Copy)]
struct PanDrag {
    pointer_start: Vec2,
    scroll_start: Vec2,
}

type ZoomCallback = Box<dyn FnMut(f64)>;

/// Wheel and keyboard zoom plus middle/right-button panning.
pub struct CameraController {
    config: CameraConfig,
    drag: Option<PanDrag>,
    on_zoom_change: Option<ZoomCallback>,
}

impl CameraController {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            drag: None,
            on_zoom_change: None,
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Applies the configured limits and default zoom.
    pub fn attach(&self, camera: &mut Camera2D) {
        camera.set_zoom_limits(self.config.min_zoom, self.config.max_zoom);
        camera.set_zoom_clamped(self.config.default_zoom);
    }

    pub fn set_on_zoom_change(&mut self, callback: impl FnMut(f64) + 'static) {
        self.on_zoom_change = Some(Box::new(callback));
    }

    pub fn handle_wheel(&mut self, camera: &mut Camera2D, delta_y: f64) -> f64 {
        let step = if delta_y > 0.0 {
            -self.config.zoom_speed
        } else {
            self.config.zoom_speed
        };
        self.set_zoom(camera, camera.zoom() + step)
    }

    /// Returns true when the event belongs to a pan gesture.
    pub fn handle_pointer(&mut self, camera: &mut Camera2D, event: &PointerEvent) -> bool {
        match event.kind {
            PointerEventKind::Down if event.is_pan_button() => {
                self.drag = Some(PanDrag {
                    pointer_start: event.position,
                    scroll_start: camera.scroll,
                });
                debug!("camera_pan_started");
                true
            }
            PointerEventKind::Move => match self.drag {
                Some(drag) => {
                    let zoom = camera.zoom();
                    camera.scroll = Vec2::new(
                        drag.scroll_start.x + (drag.pointer_start.x - event.position.x) / zoom,
                        drag.scroll_start.y + (drag.pointer_start.y - event.position.y) / zoom,
                    );
                    true
                }
                None => false,
            },
            PointerEventKind::Up if event.is_pan_button() && self.drag.is_some() => {
                self.drag = None;
                debug!(x = camera.scroll.x, y = camera.scroll.y, "camera_pan_ended");
                true
            }
            _ => false,
        }
    }

    pub fn is_panning(&self) -> bool {
        self.drag.is_some()
    }

    pub fn handle_key(&mut self, camera: &mut Camera2D, key: Key) -> bool {
        let pan = self.config.pan_speed / camera.zoom();
        match key {
            Key::ArrowLeft => camera.scroll.x -= pan,
            Key::ArrowRight => camera.scroll.x += pan,
            Key::ArrowUp => camera.scroll.y -= pan,
            Key::ArrowDown => camera.scroll.y += pan,
            Key::ZoomIn => {
                self.set_zoom(camera, camera.zoom() + self.config.keyboard_zoom_step);
            }
            Key::ZoomOut => {
                self.set_zoom(camera, camera.zoom() - self.config.keyboard_zoom_step);
            }
            Key::Other => return false,
        }
        true
    }

    pub fn reset(&mut self, camera: &mut Camera2D) {
        camera.scroll = Vec2::default();
        self.set_zoom(camera, self.config.default_zoom);
        debug!("camera_reset");
    }

    pub fn center_on(&self, camera: &mut Camera2D, x: f64, y: f64) {
        camera.center_on(x, y);
        debug!(x, y, "camera_centered");
    }

    pub fn state(&self, camera: &Camera2D) -> CameraState {
        CameraState {
            x: camera.scroll.x,
            y: camera.scroll.y,
            zoom: camera.zoom(),
        }
    }

    fn set_zoom(&mut self, camera: &mut Camera2D, zoom: f64) -> f64 {
        let zoom = camera.set_zoom_clamped(zoom);
        if let Some(callback) = self.on_zoom_change.as_mut() {
            callback(zoom);
        }
        debug!(zoom, "camera_zoom_changed");
        zoom
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::input::PointerButton;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn attached() -> (CameraController, Camera2D) {
        let controller = CameraController::new(CameraConfig::default());
        let mut camera = Camera2D::default();
        controller.attach(&mut camera);
        (controller, camera)
    }

    #[test]
    fn wheel_zoom_is_clamped_and_reported() {
        let (mut controller, mut camera) = attached();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        controller.set_on_zoom_change(move |zoom| sink.borrow_mut().push(zoom));

        assert!(close(controller.handle_wheel(&mut camera, -120.0), 1.1));
        assert!(close(controller.handle_wheel(&mut camera, 120.0), 1.0));
        for _ in 0..50 {
            controller.handle_wheel(&mut camera, -1.0);
        }
        assert!(close(camera.zoom(), 3.0));
        assert_eq!(seen.borrow().len(), 52);
    }

    #[test]
    fn non_finite_zoom_falls_back_to_default() {
        let mut camera = Camera2D::default();
        camera.set_zoom_clamped(f64::NAN);
        assert!(close(camera.zoom(), CAMERA_ZOOM_DEFAULT));
    }

    #[test]
    fn pan_drag_moves_scroll_by_delta_over_zoom() {
        let (mut controller, mut camera) = attached();
        camera.set_zoom_clamped(2.0);
        let down = PointerEvent::down(PointerButton::Middle, 100.0, 100.0, 0);
        assert!(controller.handle_pointer(&mut camera, &down));
        let moved = PointerEvent::moved(Some(PointerButton::Middle), 60.0, 120.0, 10);
        assert!(controller.handle_pointer(&mut camera, &moved));
        assert!(close(camera.scroll.x, 20.0));
        assert!(close(camera.scroll.y, -10.0));
        let up = PointerEvent::up(PointerButton::Middle, 60.0, 120.0, 20);
        assert!(controller.handle_pointer(&mut camera, &up));
        assert!(!controller.is_panning());
    }

    #[test]
    fn primary_button_does_not_pan() {
        let (mut controller, mut camera) = attached();
        let down = PointerEvent::down(PointerButton::Primary, 10.0, 10.0, 0);
        assert!(!controller.handle_pointer(&mut camera, &down));
        let moved = PointerEvent::moved(Some(PointerButton::Primary), 50.0, 50.0, 5);
        assert!(!controller.handle_pointer(&mut camera, &moved));
        assert_eq!(camera.scroll, Vec2::default());
    }

    #[test]
    fn keys_pan_scaled_by_zoom_and_step_zoom() {
        let (mut controller, mut camera) = attached();
        camera.set_zoom_clamped(2.0);
        controller.handle_key(&mut camera, Key::ArrowRight);
        controller.handle_key(&mut camera, Key::ArrowUp);
        assert!(close(camera.scroll.x, 10.0));
        assert!(close(camera.scroll.y, -10.0));

        controller.handle_key(&mut camera, Key::ZoomOut);
        assert!(close(camera.zoom(), 1.95));
        assert!(!controller.handle_key(&mut camera, Key::Other));
    }

    #[test]
    fn screen_and_world_points_round_trip() {
        let mut camera = Camera2D::default();
        camera.scroll = Vec2::new(40.0, -20.0);
        camera.set_zoom_clamped(2.0);
        let world = camera.screen_to_world(Vec2::new(100.0, 700.0));
        let screen = camera.world_to_screen(world);
        assert!(close(screen.x, 100.0));
        assert!(close(screen.y, 700.0));

        let center = Vec2::new(camera.viewport.width * 0.5, camera.viewport.height * 0.5);
        let world_center = camera.screen_to_world(center);
        assert!(close(world_center.x, 40.0 + 760.0));
    }

    #[test]
    fn reset_and_center_on() {
        let (mut controller, mut camera) = attached();
        controller.handle_wheel(&mut camera, -1.0);
        controller.center_on(&mut camera, 760.0, 480.0);
        assert_eq!(camera.scroll, Vec2::new(0.0, 0.0));
        camera.scroll = Vec2::new(5.0, 5.0);
        controller.reset(&mut camera);
        let state = controller.state(&camera);
        assert_eq!(state, CameraState { x: 0.0, y: 0.0, zoom: 1.0 });
    }
}
