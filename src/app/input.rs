use sceneedit::render::{CameraMovement, TransformMode};
use sceneedit::PointerButton;
use winit::event::MouseButton;
use winit::keyboard::{KeyCode, PhysicalKey};

/// One-shot editor command triggered by a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    None,
    SetMode(TransformMode),
    ToggleSpace,
    TogglePivot,
    BeginPointTo,
    PointSelectionChain,
    FocusSelection,
    RecalculateBounds,
    DeleteSelection,
    ToggleVisibility,
    ToggleDeathZones,
    IncreaseSpeed,
    DecreaseSpeed,
    ResetSpeed,
    SaveScene,
    Escape,
}

/// Held camera keys.
#[derive(Default, Debug, Clone, Copy)]
pub struct InputState {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub aim_left: bool,
    pub aim_right: bool,
    pub aim_up: bool,
    pub aim_down: bool,
}

impl InputState {
    pub fn handle_key(&mut self, key: PhysicalKey, pressed: bool) -> InputAction {
        let PhysicalKey::Code(code) = key else {
            return InputAction::None;
        };
        match code {
            KeyCode::KeyW => self.move_forward = pressed,
            KeyCode::KeyS => self.move_backward = pressed,
            KeyCode::KeyA => self.move_left = pressed,
            KeyCode::KeyD => self.move_right = pressed,
            KeyCode::KeyE => self.move_up = pressed,
            KeyCode::KeyQ => self.move_down = pressed,
            KeyCode::ArrowLeft => self.aim_left = pressed,
            KeyCode::ArrowRight => self.aim_right = pressed,
            KeyCode::ArrowUp => self.aim_up = pressed,
            KeyCode::ArrowDown => self.aim_down = pressed,
            _ if pressed => return map_action(code),
            _ => {}
        }
        InputAction::None
    }

    pub fn any_active(&self) -> bool {
        let m = self.movement();
        m.move_forward
            || m.move_backward
            || m.move_left
            || m.move_right
            || m.move_up
            || m.move_down
            || m.aim_left
            || m.aim_right
            || m.aim_up
            || m.aim_down
    }

    pub fn movement(&self) -> CameraMovement {
        CameraMovement {
            move_forward: self.move_forward,
            move_backward: self.move_backward,
            move_left: self.move_left,
            move_right: self.move_right,
            move_up: self.move_up,
            move_down: self.move_down,
            aim_left: self.aim_left,
            aim_right: self.aim_right,
            aim_up: self.aim_up,
            aim_down: self.aim_down,
        }
    }
}

fn map_action(code: KeyCode) -> InputAction {
    match code {
        KeyCode::Digit1 => InputAction::SetMode(TransformMode::None),
        KeyCode::Digit2 => InputAction::SetMode(TransformMode::Move),
        KeyCode::Digit3 => InputAction::SetMode(TransformMode::Rotate),
        KeyCode::Digit4 => InputAction::SetMode(TransformMode::Scale),
        KeyCode::KeyL => InputAction::ToggleSpace,
        KeyCode::KeyP => InputAction::TogglePivot,
        KeyCode::KeyT => InputAction::BeginPointTo,
        KeyCode::KeyC => InputAction::PointSelectionChain,
        KeyCode::KeyF => InputAction::FocusSelection,
        KeyCode::KeyB => InputAction::RecalculateBounds,
        KeyCode::KeyH => InputAction::ToggleVisibility,
        KeyCode::KeyZ => InputAction::ToggleDeathZones,
        KeyCode::Delete => InputAction::DeleteSelection,
        KeyCode::Equal | KeyCode::NumpadAdd => InputAction::IncreaseSpeed,
        KeyCode::Minus | KeyCode::NumpadSubtract => InputAction::DecreaseSpeed,
        KeyCode::Digit0 => InputAction::ResetSpeed,
        KeyCode::F5 => InputAction::SaveScene,
        KeyCode::Escape => InputAction::Escape,
        _ => InputAction::None,
    }
}

pub fn map_mouse_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Left),
        MouseButton::Right => Some(PointerButton::Right),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}
