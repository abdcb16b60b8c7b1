use crate::geometry::Ray;
use crate::render::gizmo::{move_offset, GizmoAxes};
use crate::render::ViewState;
use crate::scene::{EntityRef, SceneContext};
use glam::{Mat3, Vec2, Vec3};
use std::collections::HashSet;

/// Which auxiliary point of which entity a helper edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HelperBinding {
    pub host: EntityRef,
    pub slot: usize,
}

/// Small world-axis move handle attached to one auxiliary point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointHelper {
    pub binding: HelperBinding,
    pub position: Vec3,
    selected_axes: GizmoAxes,
}

impl PointHelper {
    pub fn new(binding: HelperBinding, position: Vec3) -> Self {
        Self {
            binding,
            position,
            selected_axes: GizmoAxes::empty(),
        }
    }

    pub fn selected_axes(&self) -> GizmoAxes {
        self.selected_axes
    }

    /// Handle test. `size` is the handle length as a fraction of the camera
    /// distance.
    pub fn check_ray(&self, ray: &Ray, camera: Vec3, size: f32) -> GizmoAxes {
        let length = (camera.distance(self.position) * size).max(1e-4);
        let tolerance = length * 0.1;
        if ray.intersect_sphere(self.position, tolerance * 1.5).is_some() {
            return GizmoAxes::XYZ;
        }
        let mut best = (GizmoAxes::empty(), tolerance);
        for (flag, axis) in [(GizmoAxes::X, Vec3::X), (GizmoAxes::Y, Vec3::Y), (GizmoAxes::Z, Vec3::Z)] {
            let Some(distance) = ray.distance_to_segment(self.position, self.position + axis * length)
            else {
                continue;
            };
            if distance <= best.1 {
                best = (flag, distance);
            }
        }
        best.0
    }

    /// Test and remember the highlighted axes.
    pub fn check_hit(&mut self, ray: &Ray, camera: Vec3, size: f32) -> GizmoAxes {
        self.selected_axes = self.check_ray(ray, camera, size);
        self.selected_axes
    }

    /// Drag this helper and write the result back into its host entity.
    pub fn transform_affected(
        &mut self,
        input: Vec2,
        view: &ViewState,
        scene: &mut SceneContext,
    ) -> bool {
        if self.selected_axes.is_empty() {
            return false;
        }
        let offset = move_offset(self.selected_axes, Mat3::IDENTITY, self.position, input, view);
        if offset == Vec3::ZERO {
            return false;
        }
        let Some(point) = scene
            .get_mut(self.binding.host)
            .and_then(|item| item.aux_points.get_mut(self.binding.slot))
        else {
            return false;
        };
        point.position += offset;
        self.position = point.position;
        true
    }
}

#[derive(Debug, Clone)]
pub struct PointHelperSystem {
    pub size: f32,
    helpers: Vec<PointHelper>,
}

impl PointHelperSystem {
    pub fn new(size: f32) -> Self {
        Self {
            size,
            helpers: Vec::new(),
        }
    }

    /// Keep one helper per auxiliary point of every selected entity.
    pub fn sync(&mut self, selection: &[EntityRef], scene: &SceneContext) {
        let mut seen: HashSet<HelperBinding> = HashSet::new();
        for entity in selection {
            let Some(item) = scene.get(*entity) else {
                continue;
            };
            for (slot, point) in item.aux_points.iter().enumerate() {
                let binding = HelperBinding {
                    host: *entity,
                    slot,
                };
                if !seen.insert(binding) {
                    continue;
                }
                match self.helpers.iter_mut().find(|h| h.binding == binding) {
                    Some(helper) => helper.position = point.position,
                    None => self.helpers.push(PointHelper::new(binding, point.position)),
                }
            }
        }
        self.helpers.retain(|helper| seen.contains(&helper.binding));
    }

    pub fn helpers(&self) -> &[PointHelper] {
        &self.helpers
    }

    /// Hit-test every helper; each keeps its own highlight. Returns whether
    /// any helper is engaged.
    pub fn check_hit_all(&mut self, ray: &Ray, camera: Vec3) -> bool {
        let size = self.size;
        let mut any = false;
        for helper in &mut self.helpers {
            any |= !helper.check_hit(ray, camera, size).is_empty();
        }
        any
    }

    pub fn any_selected(&self) -> bool {
        self.helpers.iter().any(|h| !h.selected_axes.is_empty())
    }

    pub fn clear_highlights(&mut self) {
        for helper in &mut self.helpers {
            helper.selected_axes = GizmoAxes::empty();
        }
    }

    pub fn transform_affected_all(
        &mut self,
        input: Vec2,
        view: &ViewState,
        scene: &mut SceneContext,
    ) -> bool {
        let mut changed = false;
        for helper in &mut self.helpers {
            changed |= helper.transform_affected(input, view, scene);
        }
        changed
    }

    pub fn clear(&mut self) {
        self.helpers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Viewport;
    use crate::scene::{Category, SceneItem, Shape};

    fn scene_with_target() -> (SceneContext, EntityRef, EntityRef) {
        let mut scene = SceneContext::new();
        let host = scene.add(
            Category::SetObject,
            SceneItem::new("spring", Shape::Sphere { radius: 0.5 })
                .with_aux_point("target", Vec3::new(0.0, 0.0, 0.0))
                .with_aux_point("alt", Vec3::new(4.0, 0.0, 0.0)),
        );
        let plain = scene.add(
            Category::SetObject,
            SceneItem::new("ring", Shape::Sphere { radius: 0.5 }),
        );
        (scene, host, plain)
    }

    fn view() -> ViewState {
        ViewState::look_at(
            Viewport::new(800.0, 600.0),
            Vec3::new(0.0, 0.0, 20.0),
            Vec3::ZERO,
            60f32.to_radians(),
            0.1,
            1000.0,
        )
    }

    #[test]
    fn sync_tracks_selected_aux_points() {
        let (scene, host, plain) = scene_with_target();
        let mut system = PointHelperSystem::new(0.1);
        system.sync(&[plain, host], &scene);
        assert_eq!(system.helpers().len(), 2);
        assert_eq!(system.helpers()[1].position, Vec3::new(4.0, 0.0, 0.0));

        system.sync(&[plain], &scene);
        assert!(system.helpers().is_empty());
    }

    #[test]
    fn helpers_hit_test_independently() {
        let (scene, host, _) = scene_with_target();
        let mut system = PointHelperSystem::new(0.1);
        system.sync(&[host], &scene);
        let camera = Vec3::new(4.0, 0.0, 20.0);
        let ray = Ray::new(camera, Vec3::NEG_Z);
        assert!(system.check_hit_all(&ray, camera));
        assert!(system.helpers()[0].selected_axes().is_empty());
        assert_eq!(system.helpers()[1].selected_axes(), GizmoAxes::XYZ);
    }

    #[test]
    fn drag_moves_only_the_bound_point() {
        let (mut scene, host, _) = scene_with_target();
        let mut system = PointHelperSystem::new(0.1);
        system.sync(&[host], &scene);
        let camera = Vec3::new(0.0, 0.0, 20.0);
        system.check_hit_all(&Ray::new(camera, Vec3::NEG_Z), camera);
        assert!(system.any_selected());
        assert!(system.transform_affected_all(Vec2::new(1.0, -2.0), &view(), &mut scene));

        let item = scene.get(host).expect("host");
        assert!(item.aux_points[0].position.distance(Vec3::new(1.0, 2.0, 0.0)) < 1e-4);
        assert_eq!(item.aux_points[1].position, Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(item.position, Vec3::ZERO);
    }
}
