//! Editing session: routes viewport input through picking, the selection set,
//! the transform gizmo and point helpers.

pub mod selection;

pub use selection::SelectionSet;

use crate::config::EditorSettings;
use crate::geometry::{BoundingSphere, Rotation};
use crate::render::{
    GizmoAxes, HitResult, PickFilter, PickSystem, Pivot, PointHelperSystem, TransformGizmo,
    TransformMode, TransformSpace, ViewState,
};
use crate::scene::{Category, EntityRef, Pickable, SceneContext, SceneItem, Transformable};
use glam::{Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug)]
pub struct Editor {
    scene: SceneContext,
    selection: SelectionSet,
    gizmo: TransformGizmo,
    helpers: PointHelperSystem,
    picker: PickSystem,
    view: Option<ViewState>,
    last_cursor: Option<Vec2>,
    point_to_pending: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(&EditorSettings::default())
    }
}

impl Editor {
    pub fn new(settings: &EditorSettings) -> Self {
        Self {
            scene: SceneContext::new(),
            selection: SelectionSet::new(),
            gizmo: TransformGizmo::new(settings.gizmo),
            helpers: PointHelperSystem::new(settings.point_helper_size),
            picker: PickSystem::new(settings.pick),
            view: None,
            last_cursor: None,
            point_to_pending: false,
        }
    }

    // ------------------------------------------------------------------
    // Scene lifecycle
    // ------------------------------------------------------------------

    /// Swap in a new level. The selection is cleared first so no handle
    /// outlives the entities it points at.
    pub fn load_scene(&mut self, scene: SceneContext) {
        self.release_selection();
        self.scene = scene;
        log::info!("scene loaded: {} entities", self.scene.len());
    }

    pub fn unload_scene(&mut self) {
        self.release_selection();
        self.scene.clear();
        log::info!("scene unloaded");
    }

    pub fn scene(&self) -> &SceneContext {
        &self.scene
    }

    /// In-place edits of one entity. Keeps the gizmo attached.
    pub fn edit_item<R>(
        &mut self,
        entity: EntityRef,
        edit: impl FnOnce(&mut SceneItem) -> R,
    ) -> Option<R> {
        let result = self.scene.get_mut(entity).map(edit);
        self.sync_selection();
        result
    }

    fn release_selection(&mut self) {
        self.point_to_pending = false;
        self.selection.clear();
        self.gizmo.set_enabled(false);
        self.helpers.clear();
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn subscribe_selection(&mut self, listener: impl FnMut(&[EntityRef]) + 'static) {
        self.selection.subscribe(listener);
    }

    /// Replace the selection with `entity`.
    pub fn select(&mut self, entity: EntityRef) {
        self.selection.replace(entity);
        self.sync_selection();
    }

    pub fn add_to_selection<I>(&mut self, entities: I) -> usize
    where
        I: IntoIterator<Item = EntityRef>,
    {
        let added = self.selection.add_many(entities);
        self.sync_selection();
        added
    }

    pub fn toggle_selected(&mut self, entity: EntityRef) {
        if !self.selection.remove(entity) {
            self.selection.add(entity);
        }
        self.sync_selection();
    }

    pub fn deselect(&mut self, entity: EntityRef) -> bool {
        let removed = self.selection.remove(entity);
        self.sync_selection();
        removed
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.sync_selection();
    }

    fn sync_selection(&mut self) {
        self.gizmo.refresh(self.selection.items(), &self.scene);
        self.helpers.sync(self.selection.items(), &self.scene);
    }

    // ------------------------------------------------------------------
    // Gizmo settings
    // ------------------------------------------------------------------

    pub fn gizmo(&self) -> &TransformGizmo {
        &self.gizmo
    }

    pub fn helpers(&self) -> &PointHelperSystem {
        &self.helpers
    }

    pub fn set_mode(&mut self, mode: TransformMode) {
        self.gizmo.set_mode(mode);
        self.sync_selection();
    }

    pub fn set_space(&mut self, space: TransformSpace) -> bool {
        let accepted = self.gizmo.set_space(space);
        self.sync_selection();
        accepted
    }

    pub fn set_pivot(&mut self, pivot: Pivot) {
        self.gizmo.set_pivot(pivot);
        self.sync_selection();
    }

    // ------------------------------------------------------------------
    // Picking and viewport input
    // ------------------------------------------------------------------

    pub fn pick_filter(&self) -> &PickFilter {
        &self.picker.filter
    }

    pub fn pick_filter_mut(&mut self) -> &mut PickFilter {
        &mut self.picker.filter
    }

    /// Camera state for the current frame. Until one is set every pick misses.
    pub fn set_view(&mut self, view: ViewState) {
        self.view = Some(view);
    }

    pub fn view(&self) -> Option<&ViewState> {
        self.view.as_ref()
    }

    pub fn pick_at(&mut self, cursor: Vec2) -> (HitResult, Option<EntityRef>) {
        self.picker.pick_at(&self.scene, self.view.as_ref(), cursor)
    }

    /// Click handling. Returns whether the selection or scene changed.
    pub fn mouse_down(&mut self, button: PointerButton, cursor: Vec2, ctrl: bool) -> bool {
        self.last_cursor = Some(cursor);
        match button {
            PointerButton::Right => {
                if self.point_to_pending {
                    self.cancel_point_to();
                }
                false
            }
            PointerButton::Middle => false,
            PointerButton::Left if self.point_to_pending => {
                // A miss keeps point-to armed; only a right click cancels.
                let (hit, _) = self.pick_at(cursor);
                if !hit.is_hit {
                    log::debug!("point-to target missed");
                    return false;
                }
                self.point_to_pending = false;
                self.point_selected_to(hit.position) > 0
            }
            PointerButton::Left => {
                // A highlighted handle means this click starts a drag.
                if (self.gizmo.enabled() && !self.gizmo.selected_axes().is_empty())
                    || self.helpers.any_selected()
                {
                    return false;
                }
                let (_, entity) = self.pick_at(cursor);
                match entity {
                    Some(entity) if ctrl => self.toggle_selected(entity),
                    Some(entity) if !self.selection.contains(entity) => self.select(entity),
                    Some(_) => return false,
                    None if ctrl => return false,
                    None => {
                        if self.selection.is_empty() {
                            return false;
                        }
                        self.clear_selection();
                    }
                }
                true
            }
        }
    }

    /// Drag (button held) or hover. Returns whether a redraw is needed.
    pub fn mouse_move(&mut self, cursor: Vec2, left_button_down: bool) -> bool {
        let delta = self.last_cursor.map_or(Vec2::ZERO, |last| cursor - last);
        self.last_cursor = Some(cursor);
        let Some(view) = self.view else {
            return false;
        };

        if left_button_down {
            if delta == Vec2::ZERO {
                return false;
            }
            let input = delta / 2.0 * view.move_speed;
            let mut changed = self.helpers.transform_affected_all(input, &view, &mut self.scene);
            changed |= self
                .gizmo
                .apply_drag(input, &view, self.selection.items(), &mut self.scene);
            if changed {
                self.helpers.sync(self.selection.items(), &self.scene);
            }
            return changed;
        }

        let previous = (self.gizmo.selected_axes(), self.helpers.any_selected());
        let (near, far) = view.screen_points(cursor);
        self.gizmo.check_hit(
            near,
            far,
            &view.viewport,
            view.projection,
            view.view,
            view.position,
        );
        match view.picking_ray(cursor) {
            Some(ray) => {
                self.helpers.check_hit_all(&ray, view.position);
            }
            None => self.helpers.clear_highlights(),
        }
        previous != (self.gizmo.selected_axes(), self.helpers.any_selected())
    }

    pub fn highlighted_axes(&self) -> GizmoAxes {
        self.gizmo.selected_axes()
    }

    // ------------------------------------------------------------------
    // Editing actions
    // ------------------------------------------------------------------

    /// Arm point-to: the next left click picks a target for the selection.
    pub fn begin_point_to(&mut self) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        self.point_to_pending = true;
        true
    }

    pub fn cancel_point_to(&mut self) {
        if self.point_to_pending {
            log::debug!("point-to cancelled");
        }
        self.point_to_pending = false;
    }

    pub fn is_point_to_pending(&self) -> bool {
        self.point_to_pending
    }

    /// Orient every selected placed object to face `target`.
    pub fn point_selected_to(&mut self, target: Vec3) -> usize {
        let mut count = 0;
        for entity in self.selection.iter() {
            if !entity.category.is_placed_object() {
                continue;
            }
            let Some(item) = self.scene.get_mut(entity) else {
                continue;
            };
            if let Some(rotation) = Rotation::look_at(item.position(), target) {
                item.set_rotation(rotation);
                count += 1;
            }
        }
        self.sync_selection();
        count
    }

    /// Orient each selected entity towards the next one in selection order.
    pub fn point_selection_chain(&mut self) -> usize {
        let targets: Vec<Option<Vec3>> = self
            .selection
            .iter()
            .map(|entity| self.scene.get(entity).map(|item| item.position()))
            .collect();
        let mut count = 0;
        for (index, entity) in self.selection.iter().enumerate() {
            let Some(Some(target)) = targets.get(index + 1).copied() else {
                continue;
            };
            let Some(item) = self.scene.get_mut(entity) else {
                continue;
            };
            if let Some(rotation) = Rotation::look_at(item.position(), target) {
                item.set_rotation(rotation);
                count += 1;
            }
        }
        self.sync_selection();
        count
    }

    /// Merged bounds of the selection, for framing the camera.
    pub fn focus_selection(&self) -> Option<BoundingSphere> {
        self.selection
            .iter()
            .filter_map(|entity| self.scene.get(entity))
            .map(|item| item.bounds())
            .reduce(BoundingSphere::merge)
    }

    pub fn recalculate_bounds(&mut self) {
        self.scene.recalculate_bounds();
        self.sync_selection();
    }

    /// Remove every selected entity from its collection.
    pub fn delete_selection(&mut self) -> usize {
        let doomed: Vec<EntityRef> = self.selection.iter().collect();
        self.clear_selection();
        let removed = doomed
            .into_iter()
            .filter(|entity| self.scene.remove(*entity).is_some())
            .count();
        if removed > 0 {
            log::info!("deleted {removed} entities");
        }
        removed
    }

    /// Drop `item` onto whatever is under `cursor`, `offset` units above the
    /// surface, and select it.
    pub fn place_at(
        &mut self,
        cursor: Vec2,
        category: Category,
        item: SceneItem,
        offset: f32,
    ) -> Option<EntityRef> {
        let (hit, _) = self.pick_at(cursor);
        if !hit.is_hit {
            return None;
        }
        let entity = self
            .scene
            .add(category, item.with_position(hit.placement(offset)));
        self.select(entity);
        Some(entity)
    }
}
