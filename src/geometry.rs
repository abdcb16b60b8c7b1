//! Geometry primitives shared by picking and the gizmo.
//!
//! Screen coordinates are top-left origin pixels. Depth 0 maps to the near
//! plane and depth 1 to the far plane, matching `Mat4::perspective_rh`.

use glam::{Mat3, Mat4, Vec2, Vec3};

/// Fixed-point angle units in one full turn.
pub const ANGLE_UNITS_PER_TURN: i32 = 0x10000;

const TRIANGLE_EPSILON: f32 = 1e-9;
// Slack on barycentric bounds so rays through a shared edge hit one side.
const BARYCENTRIC_SLACK: f32 = 1e-6;

// ========================================================================
// Ray
// ========================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length unless the ray was built from coincident points.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray from `near` towards `far`. `None` when the points coincide.
    pub fn between(near: Vec3, far: Vec3) -> Option<Self> {
        let direction = (far - near).try_normalize()?;
        if !near.is_finite() {
            return None;
        }
        Some(Self {
            origin: near,
            direction,
        })
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Two-sided Möller–Trumbore test. Returns the distance along the ray,
    /// or `None` for a miss, a hit behind the origin, or a zero-area triangle.
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < TRIANGLE_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if u < -BARYCENTRIC_SLACK || u > 1.0 + BARYCENTRIC_SLACK {
            return None;
        }
        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < -BARYCENTRIC_SLACK || u + v > 1.0 + BARYCENTRIC_SLACK {
            return None;
        }
        let t = edge2.dot(q) * inv_det;
        (t >= 0.0 && t.is_finite()).then_some(t)
    }

    /// Nearest non-negative intersection with a sphere. A ray starting inside
    /// reports the exit point.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        let t0 = -b - root;
        let t1 = -b + root;
        if t0 >= 0.0 {
            Some(t0)
        } else if t1 >= 0.0 {
            Some(t1)
        } else {
            None
        }
    }

    /// Slab test against an axis-aligned box. Returns the distance and the
    /// outward normal of the face that was hit.
    pub fn intersect_aabb(&self, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut enter_normal = Vec3::ZERO;
        let mut exit_normal = Vec3::ZERO;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let dir = self.direction[axis];
            if dir.abs() < 1e-12 {
                if origin < min[axis] || origin > max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t0 = (min[axis] - origin) * inv;
            let mut t1 = (max[axis] - origin) * inv;
            let mut n0 = Vec3::ZERO;
            n0[axis] = -1.0;
            let mut n1 = Vec3::ZERO;
            n1[axis] = 1.0;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
                std::mem::swap(&mut n0, &mut n1);
            }
            if t0 > t_enter {
                t_enter = t0;
                enter_normal = n0;
            }
            if t1 < t_exit {
                t_exit = t1;
                exit_normal = n1;
            }
            if t_enter > t_exit {
                return None;
            }
        }

        if t_enter >= 0.0 {
            Some((t_enter, enter_normal))
        } else if t_exit >= 0.0 {
            Some((t_exit, exit_normal))
        } else {
            None
        }
    }

    /// Distance along the ray to a plane, if it crosses in front of the origin.
    pub fn intersect_plane(&self, point: Vec3, normal: Vec3) -> Option<f32> {
        let denom = normal.dot(self.direction);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = (point - self.origin).dot(normal) / denom;
        (t >= 0.0).then_some(t)
    }

    /// Shortest distance between the ray and the segment `p0..p1`.
    pub fn distance_to_segment(&self, p0: Vec3, p1: Vec3) -> Option<f32> {
        let u = self.direction;
        let v = p1 - p0;
        let w = self.origin - p0;

        let a = u.dot(u);
        let b = u.dot(v);
        let c = v.dot(v);
        let d = u.dot(w);
        let e = v.dot(w);

        let denom = a * c - b * b;
        if denom.abs() < 1e-8 {
            return None;
        }

        let s = ((b * e - c * d) / denom).max(0.0);
        let t = ((a * e - b * d) / denom).clamp(0.0, 1.0);

        Some(self.at(s).distance(p0 + v * t))
    }
}

// ========================================================================
// Viewport
// ========================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Map a screen point (pixels + depth) back into the space `world` maps
    /// from. Pass `Mat4::IDENTITY` for world space.
    pub fn unproject(&self, screen: Vec3, projection: Mat4, view: Mat4, world: Mat4) -> Vec3 {
        let depth_range = (self.max_depth - self.min_depth).max(f32::EPSILON);
        let ndc = Vec3::new(
            (screen.x - self.x) / self.width * 2.0 - 1.0,
            1.0 - (screen.y - self.y) / self.height * 2.0,
            (screen.z - self.min_depth) / depth_range,
        );
        (projection * view * world).inverse().project_point3(ndc)
    }

    /// Map a point into screen pixels; `z` carries the depth.
    pub fn project(&self, point: Vec3, projection: Mat4, view: Mat4, world: Mat4) -> Vec3 {
        let ndc = (projection * view * world).project_point3(point);
        Vec3::new(
            self.x + (ndc.x + 1.0) * 0.5 * self.width,
            self.y + (1.0 - ndc.y) * 0.5 * self.height,
            self.min_depth + ndc.z * (self.max_depth - self.min_depth),
        )
    }

    /// Near and far screen points for a cursor position.
    pub fn screen_points(&self, cursor: Vec2) -> (Vec3, Vec3) {
        (cursor.extend(self.min_depth), cursor.extend(self.max_depth))
    }
}

/// World-space picking ray through the screen points `near` / `far`.
/// `None` when the viewport is empty or the transforms are degenerate.
pub fn picking_ray(
    near: Vec3,
    far: Vec3,
    viewport: &Viewport,
    projection: Mat4,
    view: Mat4,
) -> Option<Ray> {
    if viewport.is_empty() {
        return None;
    }
    let near_world = viewport.unproject(near, projection, view, Mat4::IDENTITY);
    let far_world = viewport.unproject(far, projection, view, Mat4::IDENTITY);
    if !near_world.is_finite() || !far_world.is_finite() {
        return None;
    }
    Ray::between(near_world, far_world)
}

// ========================================================================
// BoundingSphere
// ========================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub const EMPTY: Self = Self {
        center: Vec3::ZERO,
        radius: 0.0,
    };

    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
        }
    }

    /// Sphere around the centroid reaching the farthest point. Not minimal,
    /// but always enclosing.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
        I::IntoIter: Clone,
    {
        let iter = points.into_iter();
        let mut count = 0usize;
        let mut sum = Vec3::ZERO;
        for p in iter.clone() {
            sum += p;
            count += 1;
        }
        if count == 0 {
            return Self::EMPTY;
        }
        let center = sum / count as f32;
        let radius = iter.map(|p| p.distance(center)).fold(0.0, f32::max);
        Self { center, radius }
    }

    /// Smallest sphere enclosing both inputs.
    pub fn merge(a: Self, b: Self) -> Self {
        let offset = b.center - a.center;
        let distance = offset.length();
        if distance + b.radius <= a.radius {
            return a;
        }
        if distance + a.radius <= b.radius {
            return b;
        }
        let radius = (distance + a.radius + b.radius) * 0.5;
        let center = a.center + offset * ((radius - a.radius) / distance);
        Self { center, radius }
    }

    /// Conservative bounds after transforming by `matrix`: the radius grows by
    /// the largest axis scale.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let basis = Mat3::from_mat4(*matrix);
        let max_scale = basis
            .x_axis
            .length()
            .max(basis.y_axis.length())
            .max(basis.z_axis.length());
        Self {
            center: matrix.transform_point3(self.center),
            radius: self.radius * max_scale,
        }
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.distance_squared(self.center) <= self.radius * self.radius + 1e-5
    }

    pub fn intersects_ray(&self, ray: &Ray) -> Option<f32> {
        ray.intersect_sphere(self.center, self.radius)
    }
}

// ========================================================================
// Fixed-point angles
// ========================================================================

pub fn wrap_angle(units: i32) -> i32 {
    units.rem_euclid(ANGLE_UNITS_PER_TURN)
}

pub fn angle_to_radians(units: i32) -> f32 {
    units as f32 * std::f32::consts::TAU / ANGLE_UNITS_PER_TURN as f32
}

pub fn radians_to_angle(radians: f32) -> i32 {
    if !radians.is_finite() {
        return 0;
    }
    let units = (radians / std::f32::consts::TAU * ANGLE_UNITS_PER_TURN as f32).round();
    (units as i64).rem_euclid(ANGLE_UNITS_PER_TURN as i64) as i32
}

/// Pitch / yaw / roll in fixed-point units, one full turn per 0x10000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rotation {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Rotation {
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self {
            x: wrap_angle(x),
            y: wrap_angle(y),
            z: wrap_angle(z),
        }
    }

    pub fn from_array(units: [i32; 3]) -> Self {
        Self::new(units[0], units[1], units[2])
    }

    pub fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn axis(self, index: usize) -> i32 {
        match index {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Add `units` to one axis, wrapping to a full turn.
    pub fn add_axis(self, index: usize, units: i32) -> Self {
        let mut out = self;
        match index {
            0 => out.x = wrap_angle(out.x.wrapping_add(units)),
            1 => out.y = wrap_angle(out.y.wrapping_add(units)),
            _ => out.z = wrap_angle(out.z.wrapping_add(units)),
        }
        out
    }

    /// Rotation order: Z (roll), then X (pitch), then Y (yaw).
    pub fn matrix(self) -> Mat3 {
        Mat3::from_rotation_y(angle_to_radians(self.y))
            * Mat3::from_rotation_x(angle_to_radians(self.x))
            * Mat3::from_rotation_z(angle_to_radians(self.z))
    }

    /// Orientation whose forward (+Z) axis points from `from` to `to`, with
    /// roll zeroed. `None` when the points coincide.
    pub fn look_at(from: Vec3, to: Vec3) -> Option<Self> {
        let dir = (to - from).try_normalize()?;
        let yaw = dir.x.atan2(dir.z);
        let pitch = (-dir.y).clamp(-1.0, 1.0).asin();
        Some(Self::new(radians_to_angle(pitch), radians_to_angle(yaw), 0))
    }
}

/// Rotation part of an affine matrix with scale removed.
pub fn orientation_of(matrix: &Mat4) -> Mat3 {
    let basis = Mat3::from_mat4(*matrix);
    let x = basis.x_axis.try_normalize().unwrap_or(Vec3::X);
    let y = basis.y_axis.try_normalize().unwrap_or(Vec3::Y);
    let z = basis.z_axis.try_normalize().unwrap_or(Vec3::Z);
    Mat3::from_cols(x, y, z)
}

// ========================================================================
// Tests
// ========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn triangle_hit_distance_matches_plane_distance() {
        let ray = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::NEG_Z);
        let t = ray
            .intersect_triangle(
                Vec3::new(0.0, 0.0, 1.5),
                Vec3::new(1.0, 0.0, 1.5),
                Vec3::new(0.0, 1.0, 1.5),
            )
            .expect("hit");
        assert!(approx(t, 3.5));
    }

    #[test]
    fn triangle_hit_is_two_sided() {
        let ray = Ray::new(Vec3::new(0.2, 0.2, -5.0), Vec3::Z);
        let t = ray.intersect_triangle(Vec3::ZERO, Vec3::X, Vec3::Y);
        assert!(t.is_some_and(|t| approx(t, 5.0)));
    }

    #[test]
    fn triangle_miss_outside_edges() {
        let ray = Ray::new(Vec3::new(0.8, 0.8, 5.0), Vec3::NEG_Z);
        assert!(ray.intersect_triangle(Vec3::ZERO, Vec3::X, Vec3::Y).is_none());
    }

    #[test]
    fn triangle_behind_origin_is_a_miss() {
        let ray = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::Z);
        assert!(ray.intersect_triangle(Vec3::ZERO, Vec3::X, Vec3::Y).is_none());
    }

    #[test]
    fn degenerate_triangle_reports_no_hit() {
        let ray = Ray::new(Vec3::new(0.5, 0.0, 5.0), Vec3::NEG_Z);
        let collinear = ray.intersect_triangle(Vec3::ZERO, Vec3::X, Vec3::X * 2.0);
        let collapsed = ray.intersect_triangle(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);
        assert!(collinear.is_none());
        assert!(collapsed.is_none());
    }

    #[test]
    fn sphere_hit_from_outside_and_inside() {
        let outside = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        assert!(outside.intersect_sphere(Vec3::ZERO, 2.0).is_some_and(|t| approx(t, 8.0)));
        let inside = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(inside.intersect_sphere(Vec3::ZERO, 2.0).is_some_and(|t| approx(t, 2.0)));
        let away = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::Z);
        assert!(away.intersect_sphere(Vec3::ZERO, 2.0).is_none());
    }

    #[test]
    fn aabb_reports_entry_face_normal() {
        let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::NEG_Y);
        let (t, normal) = ray.intersect_aabb(Vec3::splat(-1.0), Vec3::splat(1.0)).expect("hit");
        assert!(approx(t, 9.0));
        assert_eq!(normal, Vec3::Y);
    }

    #[test]
    fn segment_distance_is_perpendicular_gap() {
        let ray = Ray::new(Vec3::new(0.5, 0.25, 10.0), Vec3::NEG_Z);
        let d = ray.distance_to_segment(Vec3::ZERO, Vec3::X).expect("not parallel");
        assert!(approx(d, 0.25));
    }

    #[test]
    fn unproject_center_of_screen_follows_view_axis() {
        let viewport = Viewport::new(800.0, 600.0);
        let projection = Mat4::perspective_rh(60f32.to_radians(), viewport.aspect(), 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let (near, far) = viewport.screen_points(Vec2::new(400.0, 300.0));
        let ray = picking_ray(near, far, &viewport, projection, view).expect("ray");
        assert!(approx(ray.origin.z, 9.9));
        assert!(ray.direction.distance(Vec3::NEG_Z) < 1e-4);
    }

    #[test]
    fn project_inverts_unproject() {
        let viewport = Viewport::new(640.0, 480.0);
        let projection = Mat4::perspective_rh(50f32.to_radians(), viewport.aspect(), 0.5, 500.0);
        let view = Mat4::look_at_rh(Vec3::new(3.0, 4.0, 12.0), Vec3::ZERO, Vec3::Y);
        let point = Vec3::new(1.0, -2.0, 0.5);
        let screen = viewport.project(point, projection, view, Mat4::IDENTITY);
        let back = viewport.unproject(screen, projection, view, Mat4::IDENTITY);
        assert!(back.distance(point) < 1e-3);
    }

    #[test]
    fn empty_viewport_yields_no_ray() {
        let viewport = Viewport::new(0.0, 0.0);
        let ray = picking_ray(Vec3::ZERO, Vec3::Z, &viewport, Mat4::IDENTITY, Mat4::IDENTITY);
        assert!(ray.is_none());
    }

    #[test]
    fn merge_encloses_both_spheres() {
        let a = BoundingSphere::new(Vec3::ZERO, 1.0);
        let b = BoundingSphere::new(Vec3::new(4.0, 0.0, 0.0), 1.0);
        let merged = BoundingSphere::merge(a, b);
        assert!(approx(merged.radius, 3.0));
        assert!(merged.center.distance(Vec3::new(2.0, 0.0, 0.0)) < 1e-5);

        let inner = BoundingSphere::new(Vec3::new(0.5, 0.0, 0.0), 0.25);
        assert_eq!(BoundingSphere::merge(a, inner), a);
        assert_eq!(BoundingSphere::merge(inner, a), a);
    }

    #[test]
    fn angle_units_wrap_at_full_turn() {
        assert_eq!(wrap_angle(0x10000), 0);
        assert_eq!(wrap_angle(-0x4000), 0xC000);
        assert_eq!(radians_to_angle(std::f32::consts::FRAC_PI_2), 0x4000);
        assert!(approx(angle_to_radians(0x8000), std::f32::consts::PI));
    }

    #[test]
    fn look_at_points_forward_axis_at_target() {
        let from = Vec3::new(1.0, 2.0, 3.0);
        let to = Vec3::new(-4.0, 6.0, 0.0);
        let rotation = Rotation::look_at(from, to).expect("distinct points");
        let forward = rotation.matrix() * Vec3::Z;
        let expected = (to - from).normalize();
        assert!(forward.distance(expected) < 1e-3);
        assert!(Rotation::look_at(from, from).is_none());
    }
}
