use crate::geometry::{BoundingSphere, Viewport};
use crate::render::ViewState;
use glam::Vec3;
use serde::{Deserialize, Serialize};

// World units per second at move speed 1.
const FLY_RATE: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub default_move_speed: f32,
    pub move_speed_step: f32,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            default_move_speed: 1.125,
            move_speed_step: 0.0625,
            fov_y_degrees: 60.0,
            near: 0.1,
            far: 10_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CameraMovement {
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

#[derive(Debug, Clone, Copy)]
pub struct CameraController {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub move_speed: f32,
    settings: CameraSettings,
}

impl CameraController {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self::with_settings(position, yaw, pitch, CameraSettings::default())
    }

    pub fn with_settings(position: Vec3, yaw: f32, pitch: f32, settings: CameraSettings) -> Self {
        Self {
            position,
            yaw,
            pitch,
            move_speed: settings.default_move_speed,
            settings,
        }
    }

    pub fn looking_at(position: Vec3, target: Vec3, settings: CameraSettings) -> Self {
        let (yaw, pitch) = forward_to_yaw_pitch(target - position);
        Self::with_settings(position, yaw, pitch, settings)
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn increase_speed(&mut self) {
        self.move_speed += self.settings.move_speed_step;
    }

    /// Never drops below one step.
    pub fn decrease_speed(&mut self) {
        let step = self.settings.move_speed_step;
        self.move_speed = (self.move_speed - step).max(step);
    }

    pub fn reset_speed(&mut self) {
        self.move_speed = self.settings.default_move_speed;
    }

    /// Snapshot for picking and gizmo math this frame.
    pub fn view_state(&self, viewport: Viewport) -> ViewState {
        let (forward, _, _) = self.basis();
        ViewState::look_at(
            viewport,
            self.position,
            self.position + forward,
            self.settings.fov_y_degrees.to_radians(),
            self.settings.near,
            self.settings.far,
        )
        .with_move_speed(self.move_speed)
    }

    /// Move back along the current view direction until `bounds` fills the view.
    pub fn frame_bounds_preserve_orientation(&mut self, bounds: BoundingSphere) {
        let distance = if bounds.radius > 0.0 {
            bounds.radius * 3.0
        } else {
            3.0
        };
        let (forward, _, _) = self.basis();
        self.position = bounds.center - forward * distance;
    }

    pub fn nudge(&mut self, yaw_delta: f32, pitch_delta: f32, zoom_delta: f32) {
        self.yaw += yaw_delta;
        self.pitch += pitch_delta;
        self.clamp_angles();
        if zoom_delta != 0.0 {
            let (forward, _, _) = self.basis();
            self.position += forward * zoom_delta;
        }
    }

    pub fn orbit_around(&mut self, pivot: Vec3, yaw_delta: f32, pitch_delta: f32) {
        self.yaw += yaw_delta;
        self.pitch += pitch_delta;
        self.clamp_angles();

        let distance = self.position.distance(pivot).max(0.05);
        let (forward, _, _) = self.basis();
        self.position = pivot - forward * distance;
    }

    /// (forward, right, up)
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        camera_basis(self.yaw, self.pitch)
    }

    pub fn move_horizontal(&mut self, right: f32, up: f32, forward: f32) {
        let yaw = self.yaw;
        let forward_dir = Vec3::new(yaw.cos(), 0.0, yaw.sin());
        let right_dir = Vec3::new(-yaw.sin(), 0.0, yaw.cos());
        self.position += right_dir * right + Vec3::Y * up + forward_dir * forward;
    }

    pub fn update_movement(&mut self, input: &CameraMovement, frame_dt: f32) -> bool {
        let move_step = self.move_speed * FLY_RATE * frame_dt;
        let aim_step = 1.8 * frame_dt;
        let mut changed = false;

        let mut yaw = 0.0;
        let mut pitch = 0.0;
        if input.aim_left {
            yaw -= aim_step;
        }
        if input.aim_right {
            yaw += aim_step;
        }
        if input.aim_up {
            pitch += aim_step;
        }
        if input.aim_down {
            pitch -= aim_step;
        }
        if yaw != 0.0 || pitch != 0.0 {
            self.nudge(yaw, pitch, 0.0);
            changed = true;
        }

        let mut forward = 0.0;
        let mut right = 0.0;
        let mut up = 0.0;
        if input.move_forward {
            forward += move_step;
        }
        if input.move_backward {
            forward -= move_step;
        }
        if input.move_left {
            right -= move_step;
        }
        if input.move_right {
            right += move_step;
        }
        if input.move_up {
            up += move_step;
        }
        if input.move_down {
            up -= move_step;
        }

        if forward != 0.0 || right != 0.0 || up != 0.0 {
            self.move_horizontal(right, up, forward);
            changed = true;
        }

        changed
    }

    fn clamp_angles(&mut self) {
        const LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;
        if self.yaw.is_finite() {
            self.yaw = (self.yaw + std::f32::consts::PI).rem_euclid(std::f32::consts::TAU)
                - std::f32::consts::PI;
        }
        if self.pitch.is_finite() {
            self.pitch = self.pitch.clamp(-LIMIT, LIMIT);
        }
    }
}

fn forward_to_yaw_pitch(forward: Vec3) -> (f32, f32) {
    let n = forward.try_normalize().unwrap_or(Vec3::X);
    (n.z.atan2(n.x), n.y.clamp(-1.0, 1.0).asin())
}

fn camera_basis(yaw: f32, pitch: f32) -> (Vec3, Vec3, Vec3) {
    let cos_pitch = pitch.cos();
    let forward = Vec3::new(yaw.cos() * cos_pitch, pitch.sin(), yaw.sin() * cos_pitch);
    let right = Vec3::new(-yaw.sin(), 0.0, yaw.cos());
    let up = right.cross(forward).normalize_or_zero();
    (forward, right, up)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looking_at_faces_target() {
        let camera = CameraController::looking_at(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(-4.0, 0.0, 7.0),
            CameraSettings::default(),
        );
        let (forward, _, up) = camera.basis();
        let expected = (Vec3::new(-4.0, 0.0, 7.0) - Vec3::new(1.0, 2.0, 3.0)).normalize();
        assert!(forward.distance(expected) < 1e-4);
        assert!(up.y > 0.0);
    }

    #[test]
    fn movement_update_keeps_finite_values() {
        let mut camera = CameraController::new(Vec3::new(0.0, 0.0, 5.0), 0.0, 0.0);
        let movement = CameraMovement {
            move_forward: true,
            move_right: true,
            move_up: true,
            aim_right: true,
            aim_up: true,
            ..CameraMovement::default()
        };
        let changed = camera.update_movement(&movement, 1.0 / 60.0);
        assert!(changed);
        assert!(camera.position.is_finite());
        assert!(camera.yaw.is_finite());
        assert!(camera.pitch.is_finite());
        assert!(!camera.update_movement(&CameraMovement::default(), 1.0 / 60.0));
    }

    #[test]
    fn frame_bounds_preserves_orientation() {
        let mut camera = CameraController::new(Vec3::new(5.0, 6.0, 7.0), 1.1, -0.3);
        camera.frame_bounds_preserve_orientation(BoundingSphere::new(Vec3::ONE, 2.0));
        assert!((camera.yaw - 1.1).abs() < 1e-6);
        assert!((camera.pitch + 0.3).abs() < 1e-6);
        assert!((camera.position.distance(Vec3::ONE) - 6.0).abs() < 1e-4);
    }

    #[test]
    fn speed_steps_and_resets() {
        let mut camera = CameraController::new(Vec3::ZERO, 0.0, 0.0);
        assert!((camera.move_speed - 1.125).abs() < 1e-6);
        camera.increase_speed();
        assert!((camera.move_speed - 1.1875).abs() < 1e-6);
        for _ in 0..100 {
            camera.decrease_speed();
        }
        assert!((camera.move_speed - 0.0625).abs() < 1e-6);
        camera.reset_speed();
        assert!((camera.move_speed - 1.125).abs() < 1e-6);
    }

    #[test]
    fn view_state_carries_speed_and_direction() {
        let mut camera = CameraController::new(Vec3::ZERO, 0.0, 0.0);
        camera.increase_speed();
        let view = camera.view_state(Viewport::new(320.0, 240.0));
        assert!((view.move_speed - 1.1875).abs() < 1e-6);
        assert!(view.look.distance(Vec3::X) < 1e-5);
    }
}
