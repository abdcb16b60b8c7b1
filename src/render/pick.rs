//! CPU ray-cast pick system
//!
//! Converts a cursor position into a world-space ray using the current
//! `ViewState`, then sweeps every loaded category of the `SceneContext`.
//! Category order does not matter: the closest hit across the whole sweep
//! wins. Each category is gated by its own toggle, and the categories that
//! carry a visibility flag are further filtered by `VisibilityFilter`.

use crate::geometry::Ray;
use crate::render::ViewState;
use crate::scene::{Category, EntityRef, Pickable, SceneContext, SceneItem};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ========================================================================
// HitResult: outcome of one ray test
// ========================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub is_hit: bool,
    pub entity: Option<EntityRef>,
    /// Distance along the picking ray from its origin, the unprojected point
    /// on the near plane, not from the camera. Through the screen center the
    /// camera distance is this plus the near-plane distance.
    pub distance: f32,
    pub position: Vec3,
    pub normal: Vec3,
}

impl HitResult {
    /// Sentinel for a miss. Sorts after every real hit.
    pub const NO_HIT: Self = Self {
        is_hit: false,
        entity: None,
        distance: f32::INFINITY,
        position: Vec3::ZERO,
        normal: Vec3::ZERO,
    };

    pub fn hit(distance: f32, position: Vec3, normal: Vec3) -> Self {
        Self {
            is_hit: true,
            entity: None,
            distance,
            position,
            normal,
        }
    }

    pub fn with_entity(mut self, entity: EntityRef) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Nearest first; misses last.
    pub fn cmp_distance(&self, other: &Self) -> Ordering {
        match (self.is_hit, other.is_hit) {
            (true, true) => self.distance.total_cmp(&other.distance),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => Ordering::Equal,
        }
    }

    pub fn is_closer_than(&self, other: &Self) -> bool {
        self.cmp_distance(other) == Ordering::Less
    }

    /// Point `offset` units above the hit surface, used to drop new objects
    /// onto picked geometry.
    pub fn placement(&self, offset: f32) -> Vec3 {
        self.position + self.normal * offset
    }
}

impl Default for HitResult {
    fn default() -> Self {
        Self::NO_HIT
    }
}

// ========================================================================
// PickFilter: per-category toggles
// ========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VisibilityFilter {
    #[default]
    Visible,
    Invisible,
    All,
}

impl VisibilityFilter {
    pub fn accepts(self, visible: bool) -> bool {
        match self {
            Self::Visible => visible,
            Self::Invisible => !visible,
            Self::All => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickFilter {
    pub geometry: bool,
    pub start_positions: bool,
    pub set_objects: bool,
    pub camera_objects: bool,
    pub death_zones: bool,
    pub mission_objects: bool,
    pub splines: bool,
    pub visibility: VisibilityFilter,
}

impl Default for PickFilter {
    fn default() -> Self {
        Self {
            geometry: true,
            start_positions: true,
            set_objects: true,
            camera_objects: true,
            death_zones: false,
            mission_objects: true,
            splines: true,
            visibility: VisibilityFilter::Visible,
        }
    }
}

impl PickFilter {
    pub fn category_enabled(&self, category: Category) -> bool {
        match category {
            Category::Geometry => self.geometry,
            Category::StartPosition => self.start_positions,
            Category::SetObject => self.set_objects,
            Category::CameraObject => self.camera_objects,
            Category::DeathZone => self.death_zones,
            Category::MissionObject => self.mission_objects,
            Category::Spline => self.splines,
        }
    }

    pub fn set_category_enabled(&mut self, category: Category, enabled: bool) {
        let slot = match category {
            Category::Geometry => &mut self.geometry,
            Category::StartPosition => &mut self.start_positions,
            Category::SetObject => &mut self.set_objects,
            Category::CameraObject => &mut self.camera_objects,
            Category::DeathZone => &mut self.death_zones,
            Category::MissionObject => &mut self.mission_objects,
            Category::Spline => &mut self.splines,
        };
        *slot = enabled;
    }

    /// Whether `item` is a pick candidate under the current toggles.
    pub fn admits(&self, item: &SceneItem) -> bool {
        let category = item.category();
        if !self.category_enabled(category) {
            return false;
        }
        if category.uses_visibility_filter() {
            return self.visibility.accepts(item.visible);
        }
        // Hidden death zones are never candidates.
        category != Category::DeathZone || item.visible
    }
}

// ========================================================================
// PickSystem: sweeps the scene for the nearest hit
// ========================================================================

#[derive(Debug, Default)]
pub struct PickSystem {
    pub filter: PickFilter,
    last_hit: Option<HitResult>,
}

impl PickSystem {
    pub fn new(filter: PickFilter) -> Self {
        Self {
            filter,
            last_hit: None,
        }
    }

    /// Resolve the entity under `cursor`. Without a view, or with an empty
    /// viewport, this is a miss rather than an error.
    pub fn pick_at(
        &mut self,
        scene: &SceneContext,
        view: Option<&ViewState>,
        cursor: Vec2,
    ) -> (HitResult, Option<EntityRef>) {
        let Some(ray) = view.and_then(|view| view.picking_ray(cursor)) else {
            log::trace!("pick at {cursor} skipped: no usable view");
            return (HitResult::NO_HIT, None);
        };
        let hit = self.pick_ray(scene, &ray);
        if hit.is_hit {
            log::debug!(
                "pick at {cursor}: {:?} at distance {:.3}",
                hit.entity,
                hit.distance
            );
        }
        self.last_hit = Some(hit);
        (hit, hit.entity)
    }

    /// Exhaustive nearest-hit sweep over every admitted entity.
    pub fn pick_ray(&self, scene: &SceneContext, ray: &Ray) -> HitResult {
        let mut best = HitResult::NO_HIT;
        for category in Category::ALL {
            if !self.filter.category_enabled(category) {
                continue;
            }
            for item in scene.items(category) {
                if !self.filter.admits(item) {
                    continue;
                }
                if item.bounds().intersects_ray(ray).is_none() {
                    continue;
                }
                let hit = item.check_ray(ray);
                if hit.is_closer_than(&best) {
                    best = hit;
                }
            }
        }
        best
    }

    pub fn last_hit(&self) -> Option<HitResult> {
        self.last_hit
    }

    pub fn take_hit(&mut self) -> Option<HitResult> {
        self.last_hit.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Viewport;
    use crate::scene::{Mesh, SceneItem, Shape};
    use std::sync::Arc;

    fn cube(position: Vec3) -> SceneItem {
        SceneItem::new("cube", Shape::Mesh(Arc::new(Mesh::cuboid(2.0, 2.0, 2.0))))
            .with_position(position)
    }

    fn front_view(distance: f32) -> ViewState {
        ViewState::look_at(
            Viewport::new(800.0, 600.0),
            Vec3::new(0.0, 0.0, distance),
            Vec3::ZERO,
            60f32.to_radians(),
            0.1,
            1000.0,
        )
    }

    #[test]
    fn no_hit_sorts_after_every_hit() {
        let far = HitResult::hit(1.0e6, Vec3::ZERO, Vec3::Y);
        assert!(far.is_closer_than(&HitResult::NO_HIT));
        assert!(!HitResult::NO_HIT.is_closer_than(&far));
        assert_eq!(HitResult::NO_HIT.cmp_distance(&HitResult::NO_HIT), Ordering::Equal);
    }

    #[test]
    fn placement_offsets_along_normal() {
        let hit = HitResult::hit(3.0, Vec3::new(1.0, 0.0, 0.0), Vec3::Y);
        assert_eq!(hit.placement(2.5), Vec3::new(1.0, 2.5, 0.0));
    }

    #[test]
    fn pick_without_view_is_a_miss() {
        let mut scene = SceneContext::new();
        scene.add(Category::Geometry, cube(Vec3::ZERO));
        let mut picker = PickSystem::default();
        let (hit, entity) = picker.pick_at(&scene, None, Vec2::new(400.0, 300.0));
        assert!(!hit.is_hit);
        assert!(entity.is_none());
    }

    #[test]
    fn empty_scene_is_a_miss() {
        let scene = SceneContext::new();
        let mut picker = PickSystem::default();
        let view = front_view(10.0);
        let (hit, entity) = picker.pick_at(&scene, Some(&view), Vec2::new(400.0, 300.0));
        assert!(!hit.is_hit);
        assert!(entity.is_none());
    }

    #[test]
    fn cube_through_center_hits_near_face() {
        let mut scene = SceneContext::new();
        let cube_ref = scene.add(Category::Geometry, cube(Vec3::ZERO));
        let mut picker = PickSystem::default();
        let view = front_view(10.0);
        let (hit, entity) = picker.pick_at(&scene, Some(&view), Vec2::new(400.0, 300.0));
        assert_eq!(entity, Some(cube_ref));
        // Ray starts on the near plane, 0.1 in front of the camera.
        assert!((hit.distance + 0.1 - 9.0).abs() < 1e-3);
        assert!(hit.position.distance(Vec3::new(0.0, 0.0, 1.0)) < 1e-3);
        assert_eq!(picker.take_hit().map(|h| h.entity), Some(Some(cube_ref)));
        assert!(picker.last_hit().is_none());
    }

    #[test]
    fn closest_entity_wins_across_categories() {
        let mut scene = SceneContext::new();
        scene.add(Category::Geometry, cube(Vec3::new(0.0, 0.0, -5.0)));
        let near = scene.add(
            Category::Spline,
            SceneItem::new(
                "path",
                Shape::Path {
                    knots: vec![Vec3::ZERO],
                    knot_radius: 0.5,
                },
            )
            .with_position(Vec3::new(0.0, 0.0, 2.0)),
        );
        let picker = PickSystem::default();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let hit = picker.pick_ray(&scene, &ray);
        assert_eq!(hit.entity, Some(near));
        assert!((hit.distance - 7.5).abs() < 1e-4);
    }

    #[test]
    fn disabled_category_is_never_returned() {
        let mut scene = SceneContext::new();
        let far = scene.add(Category::Geometry, cube(Vec3::new(0.0, 0.0, -5.0)));
        scene.add(
            Category::CameraObject,
            SceneItem::new("cam", Shape::Sphere { radius: 0.5 }),
        );
        let mut picker = PickSystem::default();
        picker.filter.set_category_enabled(Category::CameraObject, false);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        assert_eq!(picker.pick_ray(&scene, &ray).entity, Some(far));

        picker.filter.set_category_enabled(Category::Geometry, false);
        assert!(!picker.pick_ray(&scene, &ray).is_hit);
    }

    #[test]
    fn visibility_filter_gates_geometry() {
        let mut scene = SceneContext::new();
        let hidden = scene.add(Category::Geometry, cube(Vec3::ZERO).with_visible(false));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);

        let mut picker = PickSystem::default();
        assert!(!picker.pick_ray(&scene, &ray).is_hit);

        picker.filter.visibility = VisibilityFilter::Invisible;
        assert_eq!(picker.pick_ray(&scene, &ray).entity, Some(hidden));

        picker.filter.visibility = VisibilityFilter::All;
        assert_eq!(picker.pick_ray(&scene, &ray).entity, Some(hidden));
    }

    #[test]
    fn hidden_death_zones_are_skipped() {
        let mut scene = SceneContext::new();
        let zone = scene.add(
            Category::DeathZone,
            SceneItem::new(
                "zone",
                Shape::Box {
                    half_extents: Vec3::ONE,
                },
            ),
        );
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let mut picker = PickSystem::default();
        assert!(!picker.pick_ray(&scene, &ray).is_hit);

        picker.filter.death_zones = true;
        assert_eq!(picker.pick_ray(&scene, &ray).entity, Some(zone));

        if let Some(item) = scene.get_mut(zone) {
            item.visible = false;
        }
        assert!(!picker.pick_ray(&scene, &ray).is_hit);
    }

    #[test]
    fn filter_deserializes_missing_fields_as_defaults() {
        let filter: PickFilter = serde_json::from_str(r#"{ "death_zones": true }"#).expect("json");
        assert!(filter.death_zones);
        assert!(filter.geometry);
        assert_eq!(filter.visibility, VisibilityFilter::Visible);
    }
}
