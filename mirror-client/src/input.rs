//! Terminal input → pipeline event translation.
//!
//! Converts crossterm mouse events inside the rendered image area
//! into UI-viewport [`PointerEvent`]s, and key events into device
//! [`KeyInput`]s using the platform key-code table.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use mirror_core::dispatch::KeyInput;
use mirror_core::geometry::Point;
use mirror_core::input::PointerEvent;
use mirror_core::rfb::{UI_HEIGHT, UI_WIDTH};

// ── Key codes ────────────────────────────────────────────────────

// Android key codes for the non-printable keys the client forwards.
const KEYCODE_ENTER: u32 = 66;
const KEYCODE_SPACE: u32 = 62;
const KEYCODE_TAB: u32 = 61;
const KEYCODE_CAPS_LOCK: u32 = 115;
const KEYCODE_DEL: u32 = 67;

/// Translate a key event into a forwardable device key.
///
/// Returns `None` for key releases and for keys the device bridge
/// has no mapping for.
pub fn translate_key(event: &KeyEvent) -> Option<KeyInput> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    match event.code {
        KeyCode::Char(' ') => Some(KeyInput::Code(KEYCODE_SPACE)),
        KeyCode::Char(c) => Some(KeyInput::Text(c)),
        KeyCode::Enter => Some(KeyInput::Code(KEYCODE_ENTER)),
        KeyCode::Tab => Some(KeyInput::Code(KEYCODE_TAB)),
        KeyCode::CapsLock => Some(KeyInput::Code(KEYCODE_CAPS_LOCK)),
        KeyCode::Backspace => Some(KeyInput::Code(KEYCODE_DEL)),
        _ => None,
    }
}

// ── Mouse translation ────────────────────────────────────────────

/// Translate a mouse event over the rendered image area into a
/// pointer event in UI-viewport coordinates.
///
/// A press outside the image is ignored; drags and releases are
/// clamped into the area so a gesture that leaves the image still
/// terminates cleanly.
pub fn translate_mouse(event: &MouseEvent, image_area: Rect) -> Option<PointerEvent> {
    if image_area.width == 0 || image_area.height == 0 {
        return None;
    }
    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if !contains(image_area, event.column, event.row) {
                return None;
            }
            Some(PointerEvent::Press(cell_to_ui(
                image_area,
                event.column,
                event.row,
            )))
        }
        MouseEventKind::Drag(MouseButton::Left) => Some(PointerEvent::Move(cell_to_ui(
            image_area,
            event.column,
            event.row,
        ))),
        MouseEventKind::Up(MouseButton::Left) => Some(PointerEvent::Release(cell_to_ui(
            image_area,
            event.column,
            event.row,
        ))),
        _ => None,
    }
}

fn contains(area: Rect, col: u16, row: u16) -> bool {
    col >= area.x && col < area.x + area.width && row >= area.y && row < area.y + area.height
}

/// Map a terminal cell to UI-viewport pixels, clamping into the area.
fn cell_to_ui(area: Rect, col: u16, row: u16) -> Point {
    let col = col.clamp(area.x, area.x + area.width - 1);
    let row = row.clamp(area.y, area.y + area.height - 1);
    let x = (col - area.x) as i64 * UI_WIDTH as i64 / area.width as i64;
    let y = (row - area.y) as i64 * UI_HEIGHT as i64 / area.height as i64;
    Point::new(x as i32, y as i32)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn area() -> Rect {
        Rect::new(2, 1, 80, 50)
    }

    #[test]
    fn press_inside_maps_to_viewport() {
        let ev = mouse(MouseEventKind::Down(MouseButton::Left), 2, 1);
        assert_eq!(
            translate_mouse(&ev, area()),
            Some(PointerEvent::Press(Point::new(0, 0)))
        );

        let ev = mouse(MouseEventKind::Down(MouseButton::Left), 42, 26);
        // (42-2) * 320/80 = 160, (26-1) * 700/50 = 350.
        assert_eq!(
            translate_mouse(&ev, area()),
            Some(PointerEvent::Press(Point::new(160, 350)))
        );
    }

    #[test]
    fn press_outside_is_ignored() {
        let ev = mouse(MouseEventKind::Down(MouseButton::Left), 100, 0);
        assert_eq!(translate_mouse(&ev, area()), None);
    }

    #[test]
    fn release_outside_is_clamped() {
        let ev = mouse(MouseEventKind::Up(MouseButton::Left), 200, 200);
        let Some(PointerEvent::Release(p)) = translate_mouse(&ev, area()) else {
            panic!("expected a release");
        };
        assert!(p.x < UI_WIDTH as i32);
        assert!(p.y < UI_HEIGHT as i32);
    }

    #[test]
    fn non_left_buttons_are_ignored() {
        let ev = mouse(MouseEventKind::Down(MouseButton::Right), 10, 10);
        assert_eq!(translate_mouse(&ev, area()), None);
        let ev = mouse(MouseEventKind::ScrollUp, 10, 10);
        assert_eq!(translate_mouse(&ev, area()), None);
    }

    #[test]
    fn key_table() {
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(
            translate_key(&key(KeyCode::Char('a'))),
            Some(KeyInput::Text('a'))
        );
        assert_eq!(
            translate_key(&key(KeyCode::Char(' '))),
            Some(KeyInput::Code(62))
        );
        assert_eq!(translate_key(&key(KeyCode::Enter)), Some(KeyInput::Code(66)));
        assert_eq!(translate_key(&key(KeyCode::Tab)), Some(KeyInput::Code(61)));
        assert_eq!(
            translate_key(&key(KeyCode::Backspace)),
            Some(KeyInput::Code(67))
        );
        assert_eq!(translate_key(&key(KeyCode::Esc)), None);
    }
}
