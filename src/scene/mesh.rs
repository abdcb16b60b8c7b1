use crate::geometry::{BoundingSphere, Ray};
use glam::{Mat3, Mat4, Vec3};

/// Indexed triangle mesh split into submeshes that share one vertex pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    positions: Vec<Vec3>,
    submeshes: Vec<Vec<u16>>,
    bounds: BoundingSphere,
}

/// Closest triangle intersection, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHit {
    pub distance: f32,
    pub position: Vec3,
    pub normal: Vec3,
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, submeshes: Vec<Vec<u16>>) -> Self {
        let bounds = BoundingSphere::from_points(positions.iter().copied());
        Self {
            positions,
            submeshes,
            bounds,
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn submeshes(&self) -> &[Vec<u16>] {
        &self.submeshes
    }

    /// Local-space bounds.
    pub fn bounds(&self) -> BoundingSphere {
        self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(|sub| sub.len() / 3).sum()
    }

    /// Every complete triangle of every submesh. Out-of-range indices drop
    /// the triangle instead of panicking.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.submeshes.iter().flat_map(move |sub| {
            sub.chunks_exact(3).filter_map(move |tri| {
                let a = *self.positions.get(tri[0] as usize)?;
                let b = *self.positions.get(tri[1] as usize)?;
                let c = *self.positions.get(tri[2] as usize)?;
                Some([a, b, c])
            })
        })
    }

    /// Test `ray` (world space) against every triangle placed by `world`.
    pub fn check_hit(&self, ray: &Ray, world: &Mat4) -> Option<MeshHit> {
        let basis = Mat3::from_mat4(*world);
        let normal_matrix = if basis.determinant().abs() > 1e-12 {
            Some(basis.inverse().transpose())
        } else {
            None
        };

        let mut closest: Option<MeshHit> = None;
        for [a, b, c] in self.triangles() {
            let wa = world.transform_point3(a);
            let wb = world.transform_point3(b);
            let wc = world.transform_point3(c);
            let Some(distance) = ray.intersect_triangle(wa, wb, wc) else {
                continue;
            };
            if closest.is_some_and(|hit| hit.distance <= distance) {
                continue;
            }
            let normal = match normal_matrix {
                Some(m) => (m * (b - a).cross(c - a)).normalize_or_zero(),
                None => (wb - wa).cross(wc - wa).normalize_or_zero(),
            };
            closest = Some(MeshHit {
                distance,
                position: ray.at(distance),
                normal,
            });
        }
        closest
    }

    /// Tight world-space bounds from the transformed vertices.
    pub fn world_bounds(&self, world: &Mat4) -> BoundingSphere {
        BoundingSphere::from_points(self.positions.iter().map(|p| world.transform_point3(*p)))
    }

    /// Axis-aligned box centred on the origin.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let sx = width * 0.5;
        let sy = height * 0.5;
        let sz = depth * 0.5;
        let p = vec![
            Vec3::new(-sx, -sy, -sz),
            Vec3::new(sx, -sy, -sz),
            Vec3::new(sx, sy, -sz),
            Vec3::new(-sx, sy, -sz),
            Vec3::new(-sx, -sy, sz),
            Vec3::new(sx, -sy, sz),
            Vec3::new(sx, sy, sz),
            Vec3::new(-sx, sy, sz),
        ];
        let idx = vec![
            0, 2, 1, 0, 3, 2,
            4, 5, 6, 4, 6, 7,
            0, 1, 5, 0, 5, 4,
            1, 2, 6, 1, 6, 5,
            2, 3, 7, 2, 7, 6,
            3, 0, 4, 3, 4, 7,
        ];
        Self::new(p, vec![idx])
    }

    /// Latitude/longitude sphere with poles on the Y axis. The resolution is
    /// reduced when needed so every vertex stays addressable by a `u16` index.
    pub fn uv_sphere(radius: f32, slices: u16, stacks: u16) -> Self {
        let (slices, stacks) = Self::uv_sphere_resolution(slices, stacks);
        let (slices, stacks) = (u32::from(slices), u32::from(stacks));
        let mut positions = Vec::with_capacity(uv_sphere_vertex_count(slices, stacks));
        positions.push(Vec3::new(0.0, radius, 0.0));
        let phi_step = std::f32::consts::PI / stacks as f32;
        let theta_step = std::f32::consts::TAU / slices as f32;
        for i in 1..stacks {
            let phi = i as f32 * phi_step;
            for j in 0..=slices {
                let theta = j as f32 * theta_step;
                positions.push(Vec3::new(
                    radius * phi.sin() * theta.cos(),
                    radius * phi.cos(),
                    radius * phi.sin() * theta.sin(),
                ));
            }
        }
        positions.push(Vec3::new(0.0, -radius, 0.0));

        let ring = slices + 1;
        let mut indices: Vec<u32> = Vec::new();
        for i in 1..=slices {
            indices.extend_from_slice(&[0, i + 1, i]);
        }
        for i in 0..stacks - 2 {
            for j in 0..slices {
                let a = 1 + i * ring + j;
                let b = 1 + (i + 1) * ring + j;
                indices.extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]);
            }
        }
        let south = positions.len() as u32 - 1;
        let last_ring = south - ring;
        for i in 0..slices {
            indices.extend_from_slice(&[south, last_ring + i, last_ring + i + 1]);
        }
        // The resolution clamp keeps `south` within u16.
        let indices = indices.into_iter().map(|i| i as u16).collect();
        Self::new(positions, vec![indices])
    }

    /// Largest sphere resolution at or below the request (minimum 3 slices,
    /// 2 stacks) whose vertices fit in `u16` indices.
    pub fn uv_sphere_resolution(slices: u16, stacks: u16) -> (u16, u16) {
        let limit = usize::from(u16::MAX) + 1;
        let (mut slices, mut stacks) = (u32::from(slices.max(3)), u32::from(stacks.max(2)));
        let count = uv_sphere_vertex_count(slices, stacks);
        if count > limit {
            let shrink = (limit as f64 / count as f64).sqrt();
            slices = ((f64::from(slices) * shrink) as u32).max(3);
            stacks = ((f64::from(stacks) * shrink) as u32).max(2);
        }
        while uv_sphere_vertex_count(slices, stacks) > limit {
            if slices >= stacks {
                slices -= 1;
            } else {
                stacks -= 1;
            }
        }
        (slices as u16, stacks as u16)
    }
}

fn uv_sphere_vertex_count(slices: u32, stacks: u32) -> usize {
    2 + (stacks as usize - 1) * (slices as usize + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn cuboid_hit_reports_near_face() {
        let mesh = Mesh::cuboid(2.0, 2.0, 2.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let hit = mesh.check_hit(&ray, &Mat4::IDENTITY).expect("hit");
        assert!((hit.distance - 9.0).abs() < 1e-4);
        assert!(hit.position.distance(Vec3::new(0.0, 0.0, 1.0)) < 1e-4);
        assert!(hit.normal.abs().distance(Vec3::Z) < 1e-4);
    }

    #[test]
    fn miss_returns_none() {
        let mesh = Mesh::cuboid(2.0, 2.0, 2.0);
        let ray = Ray::new(Vec3::new(3.0, 0.0, 10.0), Vec3::NEG_Z);
        assert!(mesh.check_hit(&ray, &Mat4::IDENTITY).is_none());
        let parallel = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::X);
        assert!(mesh.check_hit(&parallel, &Mat4::IDENTITY).is_none());
    }

    #[test]
    fn transformed_triangle_normal_uses_inverse_transpose() {
        // Triangle in the XY plane, non-uniformly scaled then rotated 90° about Y.
        let mesh = Mesh::new(
            vec![Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            vec![vec![0, 1, 2]],
        );
        let world = Mat4::from_scale_rotation_translation(
            Vec3::new(3.0, 0.5, 1.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::new(5.0, 0.0, 0.0),
        );
        let ray = Ray::new(Vec3::new(20.0, 0.0, 0.0), Vec3::NEG_X);
        let hit = mesh.check_hit(&ray, &world).expect("hit");
        assert!((hit.distance - 15.0).abs() < 1e-4);
        assert!(hit.normal.abs().distance(Vec3::X) < 1e-4);
        assert!((hit.normal.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn closest_triangle_wins_across_submeshes() {
        let tri = |z: f32| {
            vec![
                Vec3::new(-1.0, -1.0, z),
                Vec3::new(1.0, -1.0, z),
                Vec3::new(0.0, 1.0, z),
            ]
        };
        let mut positions = tri(-2.0);
        positions.extend(tri(3.0));
        let mesh = Mesh::new(positions, vec![vec![0, 1, 2], vec![3, 4, 5]]);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let hit = mesh.check_hit(&ray, &Mat4::IDENTITY).expect("hit");
        assert!((hit.distance - 7.0).abs() < 1e-4);
    }

    #[test]
    fn out_of_range_indices_are_skipped() {
        let mesh = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![vec![0, 1, 9, 0, 1, 2, 7]]);
        assert_eq!(mesh.triangles().count(), 1);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn uv_sphere_hit_matches_radius() {
        let mesh = Mesh::uv_sphere(2.0, 24, 16);
        let ray = Ray::new(Vec3::new(0.1, 10.0, 0.05), Vec3::NEG_Y);
        let hit = mesh.check_hit(&ray, &Mat4::IDENTITY).expect("hit");
        assert!((hit.distance - 8.0).abs() < 0.05);
        assert!(mesh.bounds().radius >= 2.0 - 1e-4);
    }

    #[test]
    fn oversized_sphere_is_clamped_to_u16_indices() {
        assert_eq!(Mesh::uv_sphere_resolution(32, 16), (32, 16));
        let (slices, stacks) = Mesh::uv_sphere_resolution(400, 200);
        assert!(slices < 400 && stacks < 200);
        assert!(uv_sphere_vertex_count(u32::from(slices), u32::from(stacks)) <= 65536);

        let mesh = Mesh::uv_sphere(1.0, 400, 200);
        let max_index = mesh.submeshes()[0].iter().copied().max().unwrap_or(0);
        assert_eq!(usize::from(max_index), mesh.positions().len() - 1);
        assert!(mesh.positions().iter().all(|p| (p.length() - 1.0).abs() < 1e-4));

        let ray = Ray::new(Vec3::new(0.3, 0.2, 10.0), Vec3::NEG_Z);
        assert!(mesh.check_hit(&ray, &Mat4::IDENTITY).is_some());
    }
}
