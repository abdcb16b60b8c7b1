//! On-screen transform gizmo: axis hit-testing and drag application.
//!
//! The gizmo is anchored on the selection (see [`Pivot`]) and oriented either
//! to the world axes or to the first selected entity. Handles are sized in
//! world units proportional to the camera distance so they keep a constant
//! on-screen size.

use crate::editor::selection::first_resolved;
use crate::geometry::{orientation_of, picking_ray, Ray, Viewport};
use crate::render::ViewState;
use crate::scene::{EntityRef, SceneContext, Transformable};
use bitflags::bitflags;
use glam::{BVec3, Mat3, Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Engaged / highlighted gizmo axes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GizmoAxes: u8 {
        const X = 0b001;
        const Y = 0b010;
        const Z = 0b100;
        const XY = Self::X.bits() | Self::Y.bits();
        const XZ = Self::X.bits() | Self::Z.bits();
        const YZ = Self::Y.bits() | Self::Z.bits();
        const XYZ = Self::X.bits() | Self::Y.bits() | Self::Z.bits();
    }
}

impl GizmoAxes {
    const SINGLE: [(GizmoAxes, usize); 3] = [(Self::X, 0), (Self::Y, 1), (Self::Z, 2)];
    const PLANES: [(GizmoAxes, usize); 3] = [(Self::YZ, 0), (Self::XZ, 1), (Self::XY, 2)];

    /// Component indices (0 = X, 1 = Y, 2 = Z) of every engaged axis.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        Self::SINGLE
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, index)| index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransformMode {
    #[default]
    None,
    Move,
    Rotate,
    Scale,
}

impl TransformMode {
    pub fn forces_local(self) -> bool {
        matches!(self, Self::Rotate | Self::Scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransformSpace {
    #[default]
    World,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Pivot {
    /// Centroid of the selected positions.
    #[default]
    CenterOfMass,
    /// Position of the first selected entity.
    Origin,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GizmoConfig {
    /// Handle length as a fraction of the camera distance.
    pub screen_size: f32,
    /// Axis pick distance as a fraction of the handle length.
    pub pick_tolerance: f32,
    /// Plane handle edge as a fraction of the handle length.
    pub plane_handle_size: f32,
    /// Angle units per unit of drag input.
    pub rotate_speed: f32,
    /// Scale change per unit of drag input.
    pub scale_speed: f32,
    pub min_scale: f32,
}

impl Default for GizmoConfig {
    fn default() -> Self {
        Self {
            screen_size: 0.15,
            pick_tolerance: 0.08,
            plane_handle_size: 0.3,
            rotate_speed: 64.0,
            scale_speed: 0.01,
            min_scale: 0.001,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformGizmo {
    pub config: GizmoConfig,
    enabled: bool,
    mode: TransformMode,
    requested_space: TransformSpace,
    pivot: Pivot,
    position: Vec3,
    reference_orientation: Mat3,
    selected_axes: GizmoAxes,
}

impl Default for TransformGizmo {
    fn default() -> Self {
        Self::new(GizmoConfig::default())
    }
}

impl TransformGizmo {
    pub fn new(config: GizmoConfig) -> Self {
        Self {
            config,
            enabled: false,
            mode: TransformMode::None,
            requested_space: TransformSpace::World,
            pivot: Pivot::CenterOfMass,
            position: Vec3::ZERO,
            reference_orientation: Mat3::IDENTITY,
            selected_axes: GizmoAxes::empty(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.selected_axes = GizmoAxes::empty();
        }
    }

    pub fn mode(&self) -> TransformMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TransformMode) {
        if self.mode != mode {
            log::debug!("gizmo mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
    }

    /// Effective space. Rotate and Scale always work in local space.
    pub fn space(&self) -> TransformSpace {
        if self.mode.forces_local() {
            TransformSpace::Local
        } else {
            self.requested_space
        }
    }

    /// Returns `false` when the request is ignored (World while rotating or
    /// scaling).
    pub fn set_space(&mut self, space: TransformSpace) -> bool {
        if space == TransformSpace::World && self.mode.forces_local() {
            log::debug!("world space ignored in {:?} mode", self.mode);
            return false;
        }
        self.requested_space = space;
        true
    }

    pub fn pivot(&self) -> Pivot {
        self.pivot
    }

    pub fn set_pivot(&mut self, pivot: Pivot) {
        self.pivot = pivot;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Basis the next drag works in.
    pub fn orientation(&self) -> Mat3 {
        match self.space() {
            TransformSpace::Local => self.reference_orientation,
            TransformSpace::World => Mat3::IDENTITY,
        }
    }

    pub fn selected_axes(&self) -> GizmoAxes {
        self.selected_axes
    }

    pub fn set_selected_axes(&mut self, axes: GizmoAxes) {
        self.selected_axes = axes;
    }

    /// Place the anchor directly. `local` is the reference entity's world matrix.
    pub fn set_gizmo(&mut self, position: Vec3, local: &Mat4) {
        self.position = position;
        self.reference_orientation = orientation_of(local);
    }

    /// Recompute enable state, anchor and orientation from the selection.
    pub fn refresh(&mut self, selection: &[EntityRef], scene: &SceneContext) {
        let Some(first) = first_resolved(selection, scene) else {
            self.set_enabled(false);
            self.position = Vec3::ZERO;
            self.reference_orientation = Mat3::IDENTITY;
            return;
        };
        self.enabled = true;
        let anchor = match self.pivot {
            Pivot::Origin => first.position(),
            Pivot::CenterOfMass => {
                let (sum, count) = selection
                    .iter()
                    .filter_map(|entity| scene.get(*entity))
                    .fold((Vec3::ZERO, 0usize), |(sum, count), item| {
                        (sum + item.position(), count + 1)
                    });
                sum / count.max(1) as f32
            }
        };
        self.set_gizmo(anchor, &first.transform_matrix());
    }

    /// World length of an axis handle seen from `camera`.
    pub fn handle_length(&self, camera: Vec3) -> f32 {
        (camera.distance(self.position) * self.config.screen_size).max(1e-4)
    }

    /// Hit-test the handles under a screen ray and remember the result as
    /// the highlighted axes.
    pub fn check_hit(
        &mut self,
        near: Vec3,
        far: Vec3,
        viewport: &Viewport,
        projection: Mat4,
        view: Mat4,
        camera: Vec3,
    ) -> GizmoAxes {
        let axes = match picking_ray(near, far, viewport, projection, view) {
            Some(ray) => self.check_ray(&ray, camera),
            None => GizmoAxes::empty(),
        };
        self.selected_axes = axes;
        axes
    }

    /// Pure handle test; does not change the highlight.
    pub fn check_ray(&self, ray: &Ray, camera: Vec3) -> GizmoAxes {
        if !self.enabled {
            return GizmoAxes::empty();
        }
        let length = self.handle_length(camera);
        let tolerance = length * self.config.pick_tolerance;
        let basis = self.orientation();
        match self.mode {
            TransformMode::Rotate => self.check_rings(ray, basis, length, tolerance),
            TransformMode::None | TransformMode::Move | TransformMode::Scale => {
                if ray.intersect_sphere(self.position, tolerance * 1.5).is_some() {
                    return GizmoAxes::XYZ;
                }
                let plane = self.check_planes(ray, basis, length);
                if !plane.is_empty() {
                    return plane;
                }
                self.check_axes(ray, basis, length, tolerance)
            }
        }
    }

    fn check_axes(&self, ray: &Ray, basis: Mat3, length: f32, tolerance: f32) -> GizmoAxes {
        let mut best = (GizmoAxes::empty(), tolerance);
        for (flag, index) in GizmoAxes::SINGLE {
            let tip = self.position + basis.col(index) * length;
            let Some(distance) = ray.distance_to_segment(self.position, tip) else {
                continue;
            };
            if distance <= best.1 {
                best = (flag, distance);
            }
        }
        best.0
    }

    fn check_planes(&self, ray: &Ray, basis: Mat3, length: f32) -> GizmoAxes {
        let extent = length * self.config.plane_handle_size;
        let mut best = (GizmoAxes::empty(), f32::INFINITY);
        for (flag, normal_index) in GizmoAxes::PLANES {
            let normal = basis.col(normal_index);
            let Some(t) = ray.intersect_plane(self.position, normal) else {
                continue;
            };
            let offset = ray.at(t) - self.position;
            let inside = flag
                .indices()
                .all(|i| (0.0..=extent).contains(&offset.dot(basis.col(i))));
            if inside && t < best.1 {
                best = (flag, t);
            }
        }
        best.0
    }

    fn check_rings(&self, ray: &Ray, basis: Mat3, radius: f32, tolerance: f32) -> GizmoAxes {
        let mut best = (GizmoAxes::empty(), tolerance);
        for (flag, index) in GizmoAxes::SINGLE {
            let Some(t) = ray.intersect_plane(self.position, basis.col(index)) else {
                continue;
            };
            let error = (ray.at(t).distance(self.position) - radius).abs();
            if error <= best.1 {
                best = (flag, error);
            }
        }
        best.0
    }

    /// Apply one drag step to every selected entity. `input` is the mouse
    /// delta already scaled by the camera move speed. Returns whether anything
    /// changed.
    pub fn apply_drag(
        &mut self,
        input: Vec2,
        view: &ViewState,
        selection: &[EntityRef],
        scene: &mut SceneContext,
    ) -> bool {
        let axes = self.selected_axes;
        if !self.enabled
            || self.mode == TransformMode::None
            || axes.is_empty()
            || selection.is_empty()
        {
            return false;
        }
        log::trace!("gizmo drag {:?} {:?} input {input}", self.mode, axes);

        let changed = match self.mode {
            TransformMode::Move => {
                let offset = move_offset(axes, self.orientation(), self.position, input, view);
                if offset == Vec3::ZERO {
                    false
                } else {
                    for entity in selection {
                        if let Some(item) = scene.get_mut(*entity) {
                            let position = item.position();
                            item.set_position(position + offset);
                        }
                    }
                    true
                }
            }
            TransformMode::Rotate => {
                let units = ((input.x - input.y) * self.config.rotate_speed).round() as i32;
                if units == 0 {
                    false
                } else {
                    for entity in selection {
                        if let Some(item) = scene.get_mut(*entity) {
                            let rotation = axes
                                .indices()
                                .fold(item.rotation(), |rotation, i| rotation.add_axis(i, units));
                            item.set_rotation(rotation);
                        }
                    }
                    true
                }
            }
            TransformMode::Scale => {
                let factor = 1.0 + (input.x - input.y) * self.config.scale_speed;
                let engaged = BVec3::new(
                    axes.contains(GizmoAxes::X),
                    axes.contains(GizmoAxes::Y),
                    axes.contains(GizmoAxes::Z),
                );
                let min = Vec3::splat(self.config.min_scale);
                let mut any = false;
                for entity in selection {
                    let Some(item) = scene.get_mut(*entity) else {
                        continue;
                    };
                    // Entities without scale support are skipped.
                    let Some(scale) = item.scale() else {
                        continue;
                    };
                    // Magnitude never drops below min_scale and the sign is kept.
                    let scaled = scale.signum() * (scale.abs() * factor).max(min);
                    any |= item.set_scale(Vec3::select(engaged, scaled, scale));
                }
                any
            }
            TransformMode::None => false,
        };

        self.refresh(selection, scene);
        changed
    }
}

/// World offset for a move drag. A free (XYZ) drag moves in the view plane;
/// otherwise the input is projected onto each engaged axis as it appears on
/// screen.
pub(crate) fn move_offset(
    axes: GizmoAxes,
    basis: Mat3,
    anchor: Vec3,
    input: Vec2,
    view: &ViewState,
) -> Vec3 {
    if axes == GizmoAxes::XYZ {
        return view.right * input.x - view.up * input.y;
    }
    let origin = view.project(anchor).truncate();
    axes.indices()
        .filter_map(|i| {
            let axis = basis.col(i);
            let tip = view.project(anchor + axis).truncate();
            let on_screen = (tip - origin).try_normalize()?;
            Some(axis * input.dot(on_screen))
        })
        .fold(Vec3::ZERO, |sum, step| sum + step)
}
