pub mod camera;
pub mod gizmo;
pub mod pick;
pub mod point_helpers;

pub use camera::{CameraController, CameraMovement, CameraSettings};
pub use gizmo::{GizmoAxes, GizmoConfig, Pivot, TransformGizmo, TransformMode, TransformSpace};
pub use pick::{HitResult, PickFilter, PickSystem, VisibilityFilter};
pub use point_helpers::{HelperBinding, PointHelper, PointHelperSystem};

use crate::geometry::{picking_ray, Ray, Viewport};
use glam::{Mat4, Vec2, Vec3};

/// Snapshot of the camera the rendering layer used for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub viewport: Viewport,
    pub projection: Mat4,
    pub view: Mat4,
    pub position: Vec3,
    pub look: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    /// Camera move speed; also scales gizmo drags.
    pub move_speed: f32,
}

impl ViewState {
    /// Perspective view from `eye` towards `target` with +Y up.
    pub fn look_at(
        viewport: Viewport,
        eye: Vec3,
        target: Vec3,
        fov_y: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let look = (target - eye).try_normalize().unwrap_or(Vec3::NEG_Z);
        let right = look.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(look);
        Self {
            viewport,
            projection: Mat4::perspective_rh(fov_y, viewport.aspect(), near, far),
            view: Mat4::look_to_rh(eye, look, up),
            position: eye,
            look,
            up,
            right,
            move_speed: 1.0,
        }
    }

    pub fn with_move_speed(mut self, move_speed: f32) -> Self {
        self.move_speed = move_speed;
        self
    }

    pub fn screen_points(&self, cursor: Vec2) -> (Vec3, Vec3) {
        self.viewport.screen_points(cursor)
    }

    pub fn picking_ray(&self, cursor: Vec2) -> Option<Ray> {
        let (near, far) = self.screen_points(cursor);
        picking_ray(near, far, &self.viewport, self.projection, self.view)
    }

    /// Screen position (pixels, depth in `z`) of a world point.
    pub fn project(&self, point: Vec3) -> Vec3 {
        self.viewport
            .project(point, self.projection, self.view, Mat4::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_at_basis_is_orthonormal() {
        let view = ViewState::look_at(
            Viewport::new(640.0, 480.0),
            Vec3::new(4.0, 3.0, 8.0),
            Vec3::ZERO,
            1.0,
            0.1,
            100.0,
        );
        assert!((view.look.length() - 1.0).abs() < 1e-5);
        assert!((view.up.length() - 1.0).abs() < 1e-5);
        assert!(view.look.dot(view.up).abs() < 1e-5);
        assert!(view.look.dot(view.right).abs() < 1e-5);
        assert!(view.up.y > 0.0);
    }

    #[test]
    fn projected_target_lands_mid_screen() {
        let view = ViewState::look_at(
            Viewport::new(640.0, 480.0),
            Vec3::new(0.0, 5.0, 5.0),
            Vec3::ZERO,
            1.0,
            0.1,
            100.0,
        );
        let screen = view.project(Vec3::ZERO);
        assert!((screen.x - 320.0).abs() < 1e-2);
        assert!((screen.y - 240.0).abs() < 1e-2);
        let ray = view.picking_ray(Vec2::new(320.0, 240.0)).expect("ray");
        assert!(ray.direction.distance(view.look) < 1e-4);
    }
}
