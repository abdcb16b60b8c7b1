pub mod entity;
pub mod mesh;
pub mod serialization;

pub use entity::{Pickable, Transformable};
pub use mesh::Mesh;

use crate::geometry::{BoundingSphere, Rotation};
use glam::{Mat4, Vec3};
use std::sync::Arc;

/// Storage collection an entity belongs to. `ALL` is the hit-test sweep order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Geometry,
    StartPosition,
    SetObject,
    CameraObject,
    DeathZone,
    MissionObject,
    Spline,
}

impl Category {
    pub const COUNT: usize = 7;

    pub const ALL: [Category; Category::COUNT] = [
        Category::Geometry,
        Category::StartPosition,
        Category::SetObject,
        Category::CameraObject,
        Category::DeathZone,
        Category::MissionObject,
        Category::Spline,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Geometry => "Level Geometry",
            Self::StartPosition => "Start Position",
            Self::SetObject => "SET Object",
            Self::CameraObject => "CAM Object",
            Self::DeathZone => "Death Zone",
            Self::MissionObject => "Mission Object",
            Self::Spline => "Spline",
        }
    }

    /// Categories gated by the Visible / Invisible / All filter.
    pub fn uses_visibility_filter(self) -> bool {
        matches!(self, Self::Geometry | Self::SetObject | Self::MissionObject)
    }

    /// Placed objects that can be re-oriented by a point-to operation.
    pub fn is_placed_object(self) -> bool {
        matches!(self, Self::SetObject | Self::MissionObject)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

/// Stable, non-owning handle to an entity in a `SceneContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub category: Category,
    pub id: EntityId,
}

impl EntityRef {
    pub const fn new(category: Category, id: EntityId) -> Self {
        Self { category, id }
    }
}

/// Visual / hit-test representation of an item.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Mesh(Arc<Mesh>),
    /// Oriented box proxy, local half extents.
    Box { half_extents: Vec3 },
    /// Sphere proxy around the item origin.
    Sphere { radius: f32 },
    /// Spline knots (local offsets), each picked as a small sphere.
    Path { knots: Vec<Vec3>, knot_radius: f32 },
}

impl Shape {
    pub fn local_bounds(&self) -> BoundingSphere {
        match self {
            Shape::Mesh(mesh) => mesh.bounds(),
            Shape::Box { half_extents } => BoundingSphere::new(Vec3::ZERO, half_extents.length()),
            Shape::Sphere { radius } => BoundingSphere::new(Vec3::ZERO, *radius),
            Shape::Path { knots, knot_radius } => {
                let core = BoundingSphere::from_points(knots.iter().copied());
                BoundingSphere::new(core.center, core.radius + knot_radius)
            }
        }
    }
}

/// A secondary editable point owned by an item (e.g. a "point at" target).
#[derive(Debug, Clone, PartialEq)]
pub struct AuxPoint {
    pub label: String,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneItem {
    id: EntityId,
    category: Category,
    pub name: String,
    pub(crate) position: Vec3,
    pub(crate) rotation: Rotation,
    pub(crate) scale: Option<Vec3>,
    pub visible: bool,
    pub(crate) shape: Shape,
    pub aux_points: Vec<AuxPoint>,
    bounds: BoundingSphere,
}

impl SceneItem {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        let mut item = Self {
            id: EntityId(0),
            category: Category::Geometry,
            name: name.into(),
            position: Vec3::ZERO,
            rotation: Rotation::ZERO,
            scale: None,
            visible: true,
            shape,
            aux_points: Vec::new(),
            bounds: BoundingSphere::EMPTY,
        };
        item.update_bounds();
        item
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self.update_bounds();
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self.update_bounds();
        self
    }

    /// Gives the item non-uniform scale support.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = Some(scale);
        self.update_bounds();
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_aux_point(mut self, label: impl Into<String>, position: Vec3) -> Self {
        self.aux_points.push(AuxPoint {
            label: label.into(),
            position,
        });
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.category, self.id)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Conservative bounds from the shape's local sphere. Runs on every
    /// transform edit.
    pub(crate) fn update_bounds(&mut self) {
        let world = self.world_matrix();
        self.bounds = self.shape.local_bounds().transformed(&world);
    }

    /// Tight bounds from the current world-space geometry.
    pub fn recalculate_bounds(&mut self) {
        let world = self.world_matrix();
        self.bounds = match &self.shape {
            Shape::Mesh(mesh) => mesh.world_bounds(&world),
            Shape::Path { knots, knot_radius } => {
                let core = BoundingSphere::from_points(knots.iter().map(|k| world.transform_point3(*k)));
                let max_scale = self.scale.map_or(1.0, |s| s.abs().max_element());
                BoundingSphere::new(core.center, core.radius + knot_radius * max_scale)
            }
            shape => shape.local_bounds().transformed(&world),
        };
    }

    pub(crate) fn cached_bounds(&self) -> BoundingSphere {
        self.bounds
    }

    pub fn world_matrix(&self) -> Mat4 {
        compose_transform_matrix(self.position, self.rotation, self.scale.unwrap_or(Vec3::ONE))
    }
}

/// Translation * rotation (Z, X, Y) * scale.
pub fn compose_transform_matrix(position: Vec3, rotation: Rotation, scale: Vec3) -> Mat4 {
    Mat4::from_translation(position) * Mat4::from_mat3(rotation.matrix()) * Mat4::from_scale(scale)
}

/// Per-category entity collections for one loaded level. A category that is
/// `None` is not loaded and contributes no candidates.
#[derive(Debug, Default)]
pub struct SceneContext {
    collections: [Option<Vec<SceneItem>>; Category::COUNT],
    next_id: u32,
}

impl SceneContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a category's collection. Ids are assigned here.
    pub fn load_category(&mut self, category: Category, items: Vec<SceneItem>) -> Vec<EntityRef> {
        let mut refs = Vec::with_capacity(items.len());
        let mut loaded = Vec::with_capacity(items.len());
        for mut item in items {
            self.adopt(category, &mut item);
            refs.push(item.entity_ref());
            loaded.push(item);
        }
        self.collections[category.index()] = Some(loaded);
        refs
    }

    pub fn unload_category(&mut self, category: Category) {
        self.collections[category.index()] = None;
    }

    pub fn clear(&mut self) {
        for collection in &mut self.collections {
            *collection = None;
        }
    }

    pub fn is_loaded(&self, category: Category) -> bool {
        self.collections[category.index()].is_some()
    }

    /// Append one item, loading the category if it was absent.
    pub fn add(&mut self, category: Category, mut item: SceneItem) -> EntityRef {
        self.adopt(category, &mut item);
        let entity = item.entity_ref();
        self.collections[category.index()]
            .get_or_insert_with(Vec::new)
            .push(item);
        entity
    }

    pub fn remove(&mut self, entity: EntityRef) -> Option<SceneItem> {
        let collection = self.collections[entity.category.index()].as_mut()?;
        let index = collection.iter().position(|item| item.id == entity.id)?;
        Some(collection.remove(index))
    }

    pub fn items(&self, category: Category) -> &[SceneItem] {
        self.collections[category.index()].as_deref().unwrap_or(&[])
    }

    pub fn get(&self, entity: EntityRef) -> Option<&SceneItem> {
        self.items(entity.category).iter().find(|item| item.id == entity.id)
    }

    pub fn get_mut(&mut self, entity: EntityRef) -> Option<&mut SceneItem> {
        self.collections[entity.category.index()]
            .as_mut()?
            .iter_mut()
            .find(|item| item.id == entity.id)
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        self.get(entity).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneItem> {
        Category::ALL.into_iter().flat_map(move |c| self.items(c).iter())
    }

    pub fn len(&self) -> usize {
        self.collections.iter().flatten().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn recalculate_bounds(&mut self) {
        for item in self.collections.iter_mut().flatten().flat_map(|c| c.iter_mut()) {
            item.recalculate_bounds();
        }
    }

    fn adopt(&mut self, category: Category, item: &mut SceneItem) {
        self.next_id = self.next_id.wrapping_add(1);
        item.id = EntityId(self.next_id);
        item.category = category;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(name: &str) -> SceneItem {
        SceneItem::new(name, Shape::Mesh(Arc::new(Mesh::cuboid(2.0, 2.0, 2.0))))
    }

    #[test]
    fn absent_category_reads_as_empty() {
        let scene = SceneContext::new();
        assert!(!scene.is_loaded(Category::DeathZone));
        assert!(scene.items(Category::DeathZone).is_empty());
        assert!(scene.is_empty());
    }

    #[test]
    fn ids_are_unique_across_categories() {
        let mut scene = SceneContext::new();
        let a = scene.add(Category::Geometry, cube("a"));
        let b = scene.add(Category::SetObject, cube("b"));
        let loaded = scene.load_category(Category::CameraObject, vec![cube("c"), cube("d")]);
        assert_ne!(a.id, b.id);
        assert_ne!(loaded[0].id, loaded[1].id);
        assert_eq!(scene.len(), 4);
        assert_eq!(scene.get(b).map(|item| item.name.as_str()), Some("b"));
        assert_eq!(scene.get(loaded[1]).map(|item| item.category()), Some(Category::CameraObject));

        scene.unload_category(Category::CameraObject);
        assert!(!scene.is_loaded(Category::CameraObject));
        assert!(!scene.contains(loaded[0]));
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn remove_drops_only_the_target() {
        let mut scene = SceneContext::new();
        let a = scene.add(Category::Geometry, cube("a"));
        let b = scene.add(Category::Geometry, cube("b"));
        assert!(scene.remove(a).is_some());
        assert!(scene.remove(a).is_none());
        assert!(!scene.contains(a));
        assert!(scene.contains(b));
    }

    #[test]
    fn bounds_follow_transform_edits() {
        let item = cube("a").with_position(Vec3::new(10.0, 0.0, 0.0)).with_scale(Vec3::splat(2.0));
        let bounds = item.cached_bounds();
        assert!(bounds.center.distance(Vec3::new(10.0, 0.0, 0.0)) < 1e-5);
        assert!((bounds.radius - 2.0 * 3f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn recalculated_bounds_enclose_world_vertices() {
        let mut scene = SceneContext::new();
        let entity = scene.add(
            Category::Geometry,
            cube("a")
                .with_rotation(Rotation::new(0x1000, 0x2000, 0x3000))
                .with_position(Vec3::new(1.0, 2.0, 3.0)),
        );
        scene.recalculate_bounds();
        let item = scene.get(entity).expect("item");
        let Shape::Mesh(mesh) = item.shape() else {
            panic!("expected mesh");
        };
        let world = item.world_matrix();
        let bounds = item.cached_bounds();
        for p in mesh.positions() {
            assert!(bounds.contains_point(world.transform_point3(*p)));
        }
    }

    #[test]
    fn rotation_order_applies_roll_before_yaw() {
        let m = compose_transform_matrix(Vec3::ZERO, Rotation::new(0, 0x4000, 0x4000), Vec3::ONE);
        // Roll 90° takes +X to +Y, yaw about Y leaves it there.
        assert!(m.transform_vector3(Vec3::X).distance(Vec3::Y) < 1e-5);
    }
}
