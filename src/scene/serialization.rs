use crate::geometry::Rotation;
use crate::scene::{Category, Mesh, SceneContext, SceneItem, Shape, Transformable};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SerializationError>;

/// On-disk scene: one list per loaded category. A missing key means the
/// category is not loaded, which is different from an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default)]
    pub collections: BTreeMap<Category, Vec<ItemRecord>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    #[serde(default)]
    pub position: [f32; 3],
    /// Fixed-point pitch / yaw / roll.
    #[serde(default)]
    pub rotation: [i32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f32; 3]>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    pub shape: ShapeRecord,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aux_points: Vec<AuxPointRecord>,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxPointRecord {
    pub label: String,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeRecord {
    CuboidMesh {
        size: [f32; 3],
    },
    UvSphereMesh {
        radius: f32,
        slices: u16,
        stacks: u16,
    },
    TriangleMesh {
        positions: Vec<[f32; 3]>,
        submeshes: Vec<Vec<u16>>,
    },
    ProxyBox {
        half_extents: [f32; 3],
    },
    ProxySphere {
        radius: f32,
    },
    Path {
        knots: Vec<[f32; 3]>,
        knot_radius: f32,
    },
}

impl ShapeRecord {
    fn to_shape(&self) -> Shape {
        match self {
            Self::CuboidMesh { size } => {
                Shape::Mesh(Arc::new(Mesh::cuboid(size[0], size[1], size[2])))
            }
            Self::UvSphereMesh {
                radius,
                slices,
                stacks,
            } => Shape::Mesh(Arc::new(Mesh::uv_sphere(*radius, *slices, *stacks))),
            Self::TriangleMesh {
                positions,
                submeshes,
            } => Shape::Mesh(Arc::new(Mesh::new(
                positions.iter().copied().map(Vec3::from_array).collect(),
                submeshes.clone(),
            ))),
            Self::ProxyBox { half_extents } => Shape::Box {
                half_extents: Vec3::from_array(*half_extents),
            },
            Self::ProxySphere { radius } => Shape::Sphere { radius: *radius },
            Self::Path { knots, knot_radius } => Shape::Path {
                knots: knots.iter().copied().map(Vec3::from_array).collect(),
                knot_radius: *knot_radius,
            },
        }
    }

    // Meshes are written back as raw triangles; the builder that produced
    // them is not retained.
    fn from_shape(shape: &Shape) -> Self {
        match shape {
            Shape::Mesh(mesh) => Self::TriangleMesh {
                positions: mesh.positions().iter().map(|p| p.to_array()).collect(),
                submeshes: mesh.submeshes().to_vec(),
            },
            Shape::Box { half_extents } => Self::ProxyBox {
                half_extents: half_extents.to_array(),
            },
            Shape::Sphere { radius } => Self::ProxySphere { radius: *radius },
            Shape::Path { knots, knot_radius } => Self::Path {
                knots: knots.iter().map(|k| k.to_array()).collect(),
                knot_radius: *knot_radius,
            },
        }
    }
}

impl ItemRecord {
    pub fn to_item(&self) -> SceneItem {
        let mut item = SceneItem::new(self.name.clone(), self.shape.to_shape())
            .with_position(Vec3::from_array(self.position))
            .with_rotation(Rotation::from_array(self.rotation))
            .with_visible(self.visible);
        if let Some(scale) = self.scale {
            item = item.with_scale(Vec3::from_array(scale));
        }
        for point in &self.aux_points {
            item = item.with_aux_point(point.label.clone(), Vec3::from_array(point.position));
        }
        item
    }

    pub fn from_item(item: &SceneItem) -> Self {
        Self {
            name: item.name.clone(),
            position: item.position().to_array(),
            rotation: item.rotation().to_array(),
            scale: item.scale().map(|s| s.to_array()),
            visible: item.visible,
            shape: ShapeRecord::from_shape(item.shape()),
            aux_points: item
                .aux_points
                .iter()
                .map(|p| AuxPointRecord {
                    label: p.label.clone(),
                    position: p.position.to_array(),
                })
                .collect(),
        }
    }
}

impl SceneDocument {
    pub fn to_scene(&self) -> SceneContext {
        let mut scene = SceneContext::new();
        for (category, records) in &self.collections {
            let items = records
                .iter()
                .map(|record| {
                    match &record.shape {
                        ShapeRecord::TriangleMesh { positions, .. } if positions.is_empty() => {
                            log::warn!("{} '{}' has an empty mesh", category.label(), record.name);
                        }
                        ShapeRecord::UvSphereMesh { slices, stacks, .. } => {
                            let fitted = Mesh::uv_sphere_resolution(*slices, *stacks);
                            if fitted != (*slices, *stacks) {
                                log::warn!(
                                    "{} '{}' sphere resolution {}x{} reduced to {}x{}",
                                    category.label(),
                                    record.name,
                                    slices,
                                    stacks,
                                    fitted.0,
                                    fitted.1
                                );
                            }
                        }
                        _ => {}
                    }
                    record.to_item()
                })
                .collect();
            scene.load_category(*category, items);
        }
        scene
    }

    pub fn from_scene(scene: &SceneContext) -> Self {
        let collections = Category::ALL
            .into_iter()
            .filter(|category| scene.is_loaded(*category))
            .map(|category| {
                let records = scene.items(category).iter().map(ItemRecord::from_item).collect();
                (category, records)
            })
            .collect();
        Self { collections }
    }
}

pub fn save_scene_to_file(scene: &SceneContext, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&SceneDocument::from_scene(scene))?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_scene_from_file(path: &Path) -> Result<SceneContext> {
    let json = std::fs::read_to_string(path)?;
    let document: SceneDocument = serde_json::from_str(&json)?;
    Ok(document.to_scene())
}
