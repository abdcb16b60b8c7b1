//! Capability traits every scene entity exposes to picking and the gizmo.

use super::{compose_transform_matrix, SceneItem, Shape};
use crate::geometry::{picking_ray, BoundingSphere, Ray, Rotation, Viewport};
use crate::render::pick::HitResult;
use glam::{Mat3, Mat4, Vec3};

/// Participates in hit-testing.
pub trait Pickable {
    /// World-space sphere used for coarse rejection.
    fn bounds(&self) -> BoundingSphere;

    /// Exact test against an already built world-space ray.
    fn check_ray(&self, ray: &Ray) -> HitResult;

    /// Unproject `near` / `far` (screen x, y, depth) and test the resulting ray.
    fn check_hit(
        &self,
        near: Vec3,
        far: Vec3,
        viewport: &Viewport,
        projection: Mat4,
        view: Mat4,
    ) -> HitResult {
        match picking_ray(near, far, viewport, projection, view) {
            Some(ray) => self.check_ray(&ray),
            None => HitResult::NO_HIT,
        }
    }
}

/// Can be moved, rotated and optionally scaled by the gizmo.
pub trait Transformable {
    fn position(&self) -> Vec3;
    fn set_position(&mut self, position: Vec3);
    fn rotation(&self) -> Rotation;
    fn set_rotation(&mut self, rotation: Rotation);

    /// `None` for entities without non-uniform scale.
    fn scale(&self) -> Option<Vec3> {
        None
    }

    /// Returns `false` and leaves the entity untouched when scale is unsupported.
    fn set_scale(&mut self, _scale: Vec3) -> bool {
        false
    }

    fn transform_matrix(&self) -> Mat4 {
        compose_transform_matrix(
            self.position(),
            self.rotation(),
            self.scale().unwrap_or(Vec3::ONE),
        )
    }
}

impl Pickable for SceneItem {
    fn bounds(&self) -> BoundingSphere {
        self.cached_bounds()
    }

    fn check_ray(&self, ray: &Ray) -> HitResult {
        let world = self.world_matrix();
        let hit = match &self.shape {
            Shape::Mesh(mesh) => mesh
                .check_hit(ray, &world)
                .map(|hit| HitResult::hit(hit.distance, hit.position, hit.normal)),
            Shape::Box { half_extents } => check_box(ray, &world, *half_extents),
            Shape::Sphere { radius } => {
                let bounds = BoundingSphere::new(Vec3::ZERO, *radius).transformed(&world);
                check_sphere(ray, bounds)
            }
            Shape::Path { knots, knot_radius } => knots
                .iter()
                .map(|knot| {
                    BoundingSphere::new(*knot, *knot_radius).transformed(&world)
                })
                .filter_map(|sphere| check_sphere(ray, sphere))
                .min_by(|a, b| a.cmp_distance(b)),
        };
        match hit {
            Some(hit) => hit.with_entity(self.entity_ref()),
            None => HitResult::NO_HIT,
        }
    }
}

impl Transformable for SceneItem {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_bounds();
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
        self.update_bounds();
    }

    fn scale(&self) -> Option<Vec3> {
        self.scale
    }

    fn set_scale(&mut self, scale: Vec3) -> bool {
        if self.scale.is_none() {
            return false;
        }
        self.scale = Some(scale);
        self.update_bounds();
        true
    }

    fn transform_matrix(&self) -> Mat4 {
        self.world_matrix()
    }
}

fn check_sphere(ray: &Ray, sphere: BoundingSphere) -> Option<HitResult> {
    let distance = sphere.intersects_ray(ray)?;
    let position = ray.at(distance);
    let normal = (position - sphere.center).normalize_or_zero();
    Some(HitResult::hit(distance, position, normal))
}

// Slab test in the box's local frame. Distance is re-measured in world space
// so scaled boxes compare fairly against other candidates.
fn check_box(ray: &Ray, world: &Mat4, half_extents: Vec3) -> Option<HitResult> {
    let basis = Mat3::from_mat4(*world);
    if basis.determinant().abs() <= 1e-12 {
        return None;
    }
    let inverse = world.inverse();
    let local = Ray::new(
        inverse.transform_point3(ray.origin),
        inverse.transform_vector3(ray.direction),
    );
    let (t, local_normal) = local.intersect_aabb(-half_extents, half_extents)?;
    let position = world.transform_point3(local.at(t));
    let distance = (position - ray.origin).dot(ray.direction);
    let normal = (basis.inverse().transpose() * local_normal).normalize_or_zero();
    Some(HitResult::hit(distance.max(0.0), position, normal))
}
