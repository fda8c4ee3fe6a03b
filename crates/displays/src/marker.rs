//! Visualization-marker primitives to render-list batches.

use std::collections::HashMap;

use glam::DMat4;
use vantage_msgs::{ColorRgba, Marker, MarkerKind};
use vantage_render::{InstanceBlock, MaterialBlock, MeshRef, RenderList, RenderOptions};

/// Lookup into the external mesh/resource system. Returns `None` while a
/// primitive mesh is not (yet) available; callers skip that primitive.
pub trait MeshSource: Send + Sync {
    fn primitive_mesh(&self, kind: MarkerKind) -> Option<MeshRef>;
}

/// One primitive resolved to a world transform, ready for batching.
#[derive(Debug, Clone)]
pub struct PrimitiveInstance {
    pub kind: MarkerKind,
    pub color: ColorRgba,
    pub transform: DMat4,
}

impl PrimitiveInstance {
    /// Resolves `marker` within the given parent frame.
    pub fn resolve(frame: DMat4, marker: &Marker) -> Self {
        Self {
            kind: marker.kind,
            color: marker.color,
            transform: frame * marker.pose.to_scaled_matrix(marker.scale),
        }
    }
}

fn material_for(color: ColorRgba) -> MaterialBlock {
    MaterialBlock {
        color: [color.r, color.g, color.b, color.a],
        transparent: (color.a < 1.0) as u32,
        ..Default::default()
    }
}

type GroupKey = (MarkerKind, [u32; 4]);

fn color_key(color: ColorRgba) -> [u32; 4] {
    [
        color.r.to_bits(),
        color.g.to_bits(),
        color.b.to_bits(),
        color.a.to_bits(),
    ]
}

/// Batches primitives by (kind, color): one material, one mesh and one draw
/// command per group. Primitives whose mesh is missing are skipped.
pub fn push_primitives(
    primitives: &[PrimitiveInstance],
    meshes: &dyn MeshSource,
    list: &mut RenderList,
) {
    let mut order: Vec<(GroupKey, ColorRgba)> = Vec::new();
    let mut groups: HashMap<GroupKey, Vec<InstanceBlock>> = HashMap::new();
    for primitive in primitives {
        let key = (primitive.kind, color_key(primitive.color));
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push((key, primitive.color));
                Vec::new()
            })
            .push(InstanceBlock::from_dmat4(primitive.transform));
    }

    for (key, color) in order {
        let Some(mesh) = meshes.primitive_mesh(key.0) else {
            tracing::debug!(kind = ?key.0, "primitive mesh not available, skipping batch");
            continue;
        };
        let instances = groups.remove(&key).unwrap_or_default();
        let options = RenderOptions {
            transparent: color.a < 1.0,
            ..Default::default()
        };
        list.push_batch(material_for(color), mesh, instances, options);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use vantage_msgs::Pose;

    struct FixedMeshes;

    impl MeshSource for FixedMeshes {
        fn primitive_mesh(&self, kind: MarkerKind) -> Option<MeshRef> {
            // Arrow meshes are "not loaded" in this source.
            (kind != MarkerKind::Arrow).then_some(MeshRef {
                vertex_array: kind as u32 + 1,
                element_count: 36,
                indexed: true,
            })
        }
    }

    fn cube_at(x: f64, color: ColorRgba) -> PrimitiveInstance {
        PrimitiveInstance::resolve(
            DMat4::IDENTITY,
            &Marker {
                kind: MarkerKind::Cube,
                pose: Pose::from_position(DVec3::new(x, 0.0, 0.0)),
                scale: DVec3::ONE,
                color,
            },
        )
    }

    #[test]
    fn same_kind_and_color_share_one_command() {
        let red = ColorRgba::new(1.0, 0.0, 0.0, 1.0);
        let primitives = vec![cube_at(0.0, red), cube_at(1.0, red), cube_at(2.0, red)];
        let mut list = RenderList::new();
        push_primitives(&primitives, &FixedMeshes, &mut list);

        assert_eq!(list.commands().len(), 1);
        assert_eq!(list.commands()[0].instance_count, 3);
        assert_eq!(list.materials().len(), 1);
    }

    #[test]
    fn different_colors_split_batches() {
        let red = ColorRgba::new(1.0, 0.0, 0.0, 1.0);
        let blue = ColorRgba::new(0.0, 0.0, 1.0, 0.5);
        let primitives = vec![cube_at(0.0, red), cube_at(1.0, blue)];
        let mut list = RenderList::new();
        push_primitives(&primitives, &FixedMeshes, &mut list);

        assert_eq!(list.commands().len(), 2);
        assert_eq!(list.materials()[1].transparent, 1);
        assert!(list.commands()[1].options.transparent);
    }

    #[test]
    fn missing_mesh_skips_only_that_batch() {
        let white = ColorRgba::WHITE;
        let mut arrow = cube_at(0.0, white);
        arrow.kind = MarkerKind::Arrow;
        let primitives = vec![arrow, cube_at(1.0, white)];
        let mut list = RenderList::new();
        push_primitives(&primitives, &FixedMeshes, &mut list);

        assert_eq!(list.commands().len(), 1);
        assert_eq!(list.instances().len(), 1);
    }
}
