mod input;
mod timing;

use input::{map_mouse_button, InputAction, InputState};
use timing::FrameClock;

use glam::{Vec2, Vec3};
use sceneedit::config::EditorSettings;
use sceneedit::geometry::{BoundingSphere, Viewport};
use sceneedit::render::{CameraController, Pivot, TransformSpace};
use sceneedit::scene::serialization::{load_scene_from_file, save_scene_to_file};
use sceneedit::scene::{Pickable, SceneContext};
use sceneedit::{Editor, PointerButton};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Modifiers, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

const SETTINGS_PATH: &str = "sceneedit.json";
const WINDOW_TITLE: &str = "Sceneedit";
// Radians of orbit per pixel of middle-button drag.
const ORBIT_RATE: f32 = 0.005;

pub struct App {
    window: Option<Arc<Window>>,
    editor: Editor,
    scene_path: Option<PathBuf>,
    input: InputState,
    modifiers: Modifiers,
    mouse_pos: Option<Vec2>,
    left_down: bool,
    middle_down: bool,
    camera: CameraController,
    clock: FrameClock,
    close_requested: bool,
}

impl App {
    fn new(settings: EditorSettings, scene_path: Option<PathBuf>) -> Self {
        let mut editor = Editor::new(&settings);
        let scene = match &scene_path {
            Some(path) => match load_scene_from_file(path) {
                Ok(scene) => scene,
                Err(err) => {
                    log::warn!("failed to load scene {}: {err}", path.display());
                    SceneContext::new()
                }
            },
            None => SceneContext::new(),
        };
        let camera = frame_scene(&scene, &settings);
        editor.load_scene(scene);
        editor.subscribe_selection(|items| log::debug!("selection: {} entities", items.len()));

        Self {
            window: None,
            editor,
            scene_path,
            input: InputState::default(),
            modifiers: Modifiers::default(),
            mouse_pos: None,
            left_down: false,
            middle_down: false,
            camera,
            clock: FrameClock::new(Instant::now()),
            close_requested: false,
        }
    }

    fn viewport(&self) -> Viewport {
        let size = self
            .window
            .as_ref()
            .map(|window| window.inner_size())
            .unwrap_or(PhysicalSize::new(0, 0));
        Viewport::new(size.width as f32, size.height as f32)
    }

    /// Push the current camera into the editor and schedule a redraw.
    fn update_view(&mut self) {
        let view = self.camera.view_state(self.viewport());
        self.editor.set_view(view);
        self.request_redraw();
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn status(&self) -> String {
        let gizmo = self.editor.gizmo();
        format!(
            "{} selected | {:?} {:?} {:?} | speed {:.4}",
            self.editor.selection().len(),
            gizmo.mode(),
            gizmo.space(),
            gizmo.pivot(),
            self.camera.move_speed
        )
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let step = self.clock.tick(now);
        if let (Some(rate), Some(window)) = (self.clock.sample_rate(now), &self.window) {
            window.set_title(&format!("{WINDOW_TITLE} - {rate:.1} fps - {}", self.status()));
        }
        if self.camera.update_movement(&self.input.movement(), step) {
            self.update_view();
        }
        log::trace!(
            "frame: {} entities, gizmo at {}",
            self.editor.scene().len(),
            self.editor.gizmo().position()
        );
    }

    fn handle_action(&mut self, action: InputAction, event_loop: &ActiveEventLoop) {
        match action {
            InputAction::None => {}
            InputAction::SetMode(mode) => self.editor.set_mode(mode),
            InputAction::ToggleSpace => {
                let next = match self.editor.gizmo().space() {
                    TransformSpace::World => TransformSpace::Local,
                    TransformSpace::Local => TransformSpace::World,
                };
                if !self.editor.set_space(next) {
                    log::info!("world space is unavailable while rotating or scaling");
                }
            }
            InputAction::TogglePivot => {
                let next = match self.editor.gizmo().pivot() {
                    Pivot::CenterOfMass => Pivot::Origin,
                    Pivot::Origin => Pivot::CenterOfMass,
                };
                self.editor.set_pivot(next);
            }
            InputAction::BeginPointTo => {
                if self.editor.begin_point_to() {
                    log::info!("point-to: click a target, right click to cancel");
                }
            }
            InputAction::PointSelectionChain => {
                let count = self.editor.point_selection_chain();
                log::info!("pointed {count} entities along the selection chain");
            }
            InputAction::FocusSelection => {
                if let Some(bounds) = self.editor.focus_selection() {
                    self.camera.frame_bounds_preserve_orientation(bounds);
                    self.update_view();
                }
            }
            InputAction::RecalculateBounds => {
                self.editor.recalculate_bounds();
                log::info!("bounds recalculated");
            }
            InputAction::DeleteSelection => {
                self.editor.delete_selection();
            }
            InputAction::ToggleVisibility => {
                let selected: Vec<_> = self.editor.selection().iter().collect();
                for entity in selected {
                    self.editor.edit_item(entity, |item| item.visible = !item.visible);
                }
            }
            InputAction::ToggleDeathZones => {
                let filter = self.editor.pick_filter_mut();
                filter.death_zones = !filter.death_zones;
                log::info!("death zone picking: {}", self.editor.pick_filter().death_zones);
            }
            InputAction::IncreaseSpeed => {
                self.camera.increase_speed();
                self.update_view();
            }
            InputAction::DecreaseSpeed => {
                self.camera.decrease_speed();
                self.update_view();
            }
            InputAction::ResetSpeed => {
                self.camera.reset_speed();
                self.update_view();
            }
            InputAction::SaveScene => self.save_scene(),
            InputAction::Escape => {
                if self.editor.is_point_to_pending() {
                    self.editor.cancel_point_to();
                } else {
                    self.close_requested = true;
                    event_loop.exit();
                }
            }
        }
        self.request_redraw();
    }

    fn save_scene(&self) {
        let Some(path) = &self.scene_path else {
            log::warn!("no scene path to save to");
            return;
        };
        match save_scene_to_file(self.editor.scene(), path) {
            Ok(()) => log::info!("scene saved to {}", path.display()),
            Err(err) => log::warn!("failed to save scene {}: {err}", path.display()),
        }
    }

    fn handle_cursor(&mut self, position: Vec2) {
        let previous = self.mouse_pos.replace(position);
        if self.middle_down {
            if let Some(previous) = previous {
                let delta = (position - previous) * ORBIT_RATE;
                self.camera
                    .orbit_around(self.editor.gizmo().position(), delta.x, -delta.y);
                self.update_view();
            }
        }
        if self.editor.mouse_move(position, self.left_down) {
            self.request_redraw();
        }
    }

    fn handle_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        let Some(button) = map_mouse_button(button) else {
            return;
        };
        match button {
            PointerButton::Left => self.left_down = pressed,
            PointerButton::Middle => self.middle_down = pressed,
            PointerButton::Right => {}
        }
        if !pressed {
            return;
        }
        let Some(position) = self.mouse_pos else {
            return;
        };
        let ctrl = self.modifiers.state().control_key();
        if self.editor.mouse_down(button, position, ctrl) {
            self.request_redraw();
        }
    }
}

/// Camera placed back and above the scene, looking at its merged bounds.
fn frame_scene(scene: &SceneContext, settings: &EditorSettings) -> CameraController {
    let bounds = scene
        .iter()
        .map(|item| item.bounds())
        .reduce(BoundingSphere::merge)
        .unwrap_or(BoundingSphere::new(Vec3::ZERO, 1.0));
    let distance = bounds.radius.max(1.0) * 3.0;
    let eye = bounds.center + Vec3::new(distance, distance * 0.4, distance);
    CameraController::looking_at(eye, bounds.center, settings.camera)
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(1280u32, 720u32))
            .with_resizable(true);

        match event_loop.create_window(window_attrs) {
            Ok(window) => {
                self.window = Some(Arc::new(window));
                self.update_view();
            }
            Err(err) => {
                log::error!("failed to create window: {err}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.close_requested = true;
                event_loop.exit();
            }
            WindowEvent::Focused(focused) => {
                if !focused {
                    self.input = InputState::default();
                    self.left_down = false;
                    self.middle_down = false;
                    self.mouse_pos = None;
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == ElementState::Pressed;
                if pressed && event.repeat {
                    return;
                }
                let action = self.input.handle_key(event.physical_key, pressed);
                self.handle_action(action, event_loop);
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers;
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                self.update_view();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => {
                self.mouse_pos = None;
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.handle_mouse_button(button, state == ElementState::Pressed);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let wheel = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
                };
                self.camera.nudge(0.0, 0.0, wheel * self.camera.move_speed);
                self.update_view();
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.close_requested {
            return;
        }
        if self.input.any_active() {
            self.request_redraw();
            event_loop.set_control_flow(ControlFlow::Poll);
        } else {
            self.clock.pause();
            event_loop.set_control_flow(ControlFlow::Wait);
        }
    }
}

pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("Sceneedit viewport");
    log::info!("   2/3/4 move/rotate/scale, L space, P pivot, T point-to, F5 save, ESC exit");

    let settings = match EditorSettings::load(std::path::Path::new(SETTINGS_PATH)) {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!("ignoring {SETTINGS_PATH}: {err}");
            EditorSettings::default()
        }
    };
    let scene_path = std::env::args().nth(1).map(PathBuf::from);

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("failed to create event loop: {err}");
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(settings, scene_path);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("event loop error: {err}");
    }

    log::info!("Goodbye!");
}
