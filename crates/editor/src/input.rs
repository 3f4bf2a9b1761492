use crate::render::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
}

/// Pointer input in screen pixels. For `Move`, `button` is the button held (if any).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub button: Option<PointerButton>,
    pub position: Vec2,
    pub timestamp_ms: u64,
}

impl PointerEvent {
    pub fn down(button: PointerButton, x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self {
            kind: PointerEventKind::Down,
            button: Some(button),
            position: Vec2::new(x, y),
            timestamp_ms,
        }
    }

    pub fn moved(button: Option<PointerButton>, x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self {
            kind: PointerEventKind::Move,
            button,
            position: Vec2::new(x, y),
            timestamp_ms,
        }
    }

    pub fn up(button: PointerButton, x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self {
            kind: PointerEventKind::Up,
            button: Some(button),
            position: Vec2::new(x, y),
            timestamp_ms,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.button == Some(PointerButton::Primary)
    }

    pub fn is_pan_button(&self) -> bool {
        matches!(
            self.button,
            Some(PointerButton::Middle) | Some(PointerButton::Secondary)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    ZoomIn,
    ZoomOut,
    Other,
}

impl Key {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "left" | "arrowleft" => Key::ArrowLeft,
            "right" | "arrowright" => Key::ArrowRight,
            "up" | "arrowup" => Key::ArrowUp,
            "down" | "arrowdown" => Key::ArrowDown,
            "+" | "plus" | "=" => Key::ZoomIn,
            "-" | "minus" => Key::ZoomOut,
            _ => Key::Other,
        }
    }
}
