//! Per-frame CPU-side draw batching.
//!
//! A `RenderList` is built in one pass by the render thread and handed to
//! the external submission layer; it performs no GPU work itself. All
//! indices (material, instance range) are only valid within the frame that
//! produced them, until [`RenderList::clear`].

use bytemuck::{Pod, Zeroable};
use glam::{DMat4, Mat4};

/// Shader-side light array limit; pushes beyond it are dropped.
pub const MAX_LIGHTS: usize = 16;

/// View and projection state for one frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraBlock {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

impl Default for CameraBlock {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY.to_cols_array_2d(),
            projection: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum LightKind {
    Ambient = 0,
    Directional = 1,
    Point = 2,
    Spot = 3,
}

/// One light source, laid out for direct upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightBlock {
    pub pose: [[f32; 4]; 4],
    pub color: [f32; 3],
    pub kind: u32,
    pub position: [f32; 3],
    pub softness: f32,
}

impl LightBlock {
    pub fn new(kind: LightKind, color: [f32; 3]) -> Self {
        Self {
            pose: Mat4::IDENTITY.to_cols_array_2d(),
            color,
            kind: kind as u32,
            position: [0.0; 3],
            softness: 1.0,
        }
    }
}

/// Surface parameters for one draw command. Owned by the list for the
/// duration of a frame; commands reference it by position.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialBlock {
    pub color: [f32; 4],
    pub roughness: f32,
    pub metallic: f32,
    pub color_texture: u32,
    pub normal_texture: u32,
    pub id: u32,
    pub flags: u32,
    pub transparent: u32,
}

impl Default for MaterialBlock {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0, 1.0],
            roughness: 0.5,
            metallic: 0.0,
            color_texture: 0,
            normal_texture: 0,
            id: 0,
            flags: 0,
            transparent: 0,
        }
    }
}

/// 3x4 instance pose as three row vectors, written from a 4x4 transform.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct InstanceBlock {
    pub pose_x: [f32; 4],
    pub pose_y: [f32; 4],
    pub pose_z: [f32; 4],
}

impl InstanceBlock {
    pub fn set_pose(&mut self, matrix: Mat4) {
        self.pose_x = matrix.row(0).to_array();
        self.pose_y = matrix.row(1).to_array();
        self.pose_z = matrix.row(2).to_array();
    }

    pub fn from_mat4(matrix: Mat4) -> Self {
        let mut block = Self {
            pose_x: [0.0; 4],
            pose_y: [0.0; 4],
            pose_z: [0.0; 4],
        };
        block.set_pose(matrix);
        block
    }

    pub fn from_dmat4(matrix: DMat4) -> Self {
        Self::from_mat4(matrix.as_mat4())
    }
}

impl Default for InstanceBlock {
    fn default() -> Self {
        Self::from_mat4(Mat4::IDENTITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveKind {
    #[default]
    Triangles,
    Lines,
    Points,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub primitive: PrimitiveKind,
    pub transparent: bool,
    pub double_sided: bool,
}

/// Borrowed reference to a vertex array owned by the external mesh system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshRef {
    pub vertex_array: u32,
    pub element_count: u32,
    pub indexed: bool,
}

/// One batched draw: a mesh, a contiguous instance range and one material.
#[derive(Debug, Clone, Copy)]
pub struct RenderCommand {
    pub options: RenderOptions,
    pub vertex_array: u32,
    pub element_count: u32,
    pub indexed: bool,
    pub first_instance: usize,
    pub instance_count: usize,
    pub material_index: usize,
}

/// Accumulates materials, instances, lights and draw commands for one frame.
///
/// Not shared across threads: built and consumed within a single thread's
/// frame, then reset with [`clear`](Self::clear).
#[derive(Default)]
pub struct RenderList {
    materials: Vec<MaterialBlock>,
    instances: Vec<InstanceBlock>,
    commands: Vec<RenderCommand>,
    lights: Vec<LightBlock>,
}

impl RenderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a material; following mesh pushes bind to it.
    pub fn push_material(&mut self, material: MaterialBlock) {
        self.materials.push(material);
    }

    /// Opens a draw command for `mesh` bound to the latest material. The
    /// command's instance range starts empty and grows with
    /// [`push_instance`](Self::push_instance).
    pub fn push_mesh(&mut self, mesh: MeshRef, options: RenderOptions) {
        if self.materials.is_empty() {
            tracing::debug!("mesh pushed before any material, inserting default");
            self.materials.push(MaterialBlock::default());
        }
        self.commands.push(RenderCommand {
            options,
            vertex_array: mesh.vertex_array,
            element_count: mesh.element_count,
            indexed: mesh.indexed,
            first_instance: self.instances.len(),
            instance_count: 0,
            material_index: self.materials.len() - 1,
        });
    }

    /// Appends an instance to the most recently opened draw command.
    pub fn push_instance(&mut self, instance: InstanceBlock) {
        self.instances.push(instance);
        if let Some(command) = self.commands.last_mut() {
            command.instance_count += 1;
        } else {
            tracing::debug!("instance pushed before any mesh, no command references it");
        }
    }

    /// Batching entry point: one material, one mesh, N instances, one
    /// command.
    pub fn push_batch(
        &mut self,
        material: MaterialBlock,
        mesh: MeshRef,
        instances: impl IntoIterator<Item = InstanceBlock>,
        options: RenderOptions,
    ) {
        self.push_material(material);
        self.push_mesh(mesh, options);
        for instance in instances {
            self.push_instance(instance);
        }
    }

    /// Appends a light, dropping pushes beyond [`MAX_LIGHTS`].
    pub fn push_light(&mut self, light: LightBlock) {
        if self.lights.len() >= MAX_LIGHTS {
            tracing::warn!(cap = MAX_LIGHTS, "light cap exceeded, dropping light");
            return;
        }
        self.lights.push(light);
    }

    /// Resets all four arrays; marks the start of a new frame.
    pub fn clear(&mut self) {
        self.materials.clear();
        self.instances.clear();
        self.commands.clear();
        self.lights.clear();
    }

    pub fn materials(&self) -> &[MaterialBlock] {
        &self.materials
    }

    pub fn instances(&self) -> &[InstanceBlock] {
        &self.instances
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn lights(&self) -> &[LightBlock] {
        &self.lights
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.lights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn mesh(vertex_array: u32) -> MeshRef {
        MeshRef {
            vertex_array,
            element_count: 36,
            indexed: true,
        }
    }

    fn check_invariants(list: &RenderList) {
        for command in list.commands() {
            assert!(command.material_index < list.materials().len());
            assert!(command.first_instance + command.instance_count <= list.instances().len());
        }
    }

    #[test]
    fn batch_forms_one_command() {
        let mut list = RenderList::new();
        let instances = (0..3).map(|i| {
            InstanceBlock::from_mat4(Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)))
        });
        list.push_batch(MaterialBlock::default(), mesh(7), instances, RenderOptions::default());

        assert_eq!(list.commands().len(), 1);
        let command = &list.commands()[0];
        assert_eq!(command.first_instance, 0);
        assert_eq!(command.instance_count, 3);
        assert_eq!(command.material_index, 0);
        check_invariants(&list);
    }

    #[test]
    fn interleaved_pushes_keep_indices_valid() {
        let mut list = RenderList::new();
        list.push_material(MaterialBlock::default());
        list.push_mesh(mesh(1), RenderOptions::default());
        list.push_instance(InstanceBlock::default());
        list.push_instance(InstanceBlock::default());

        list.push_material(MaterialBlock {
            color: [1.0, 0.0, 0.0, 1.0],
            ..Default::default()
        });
        list.push_mesh(mesh(2), RenderOptions::default());
        list.push_instance(InstanceBlock::default());

        assert_eq!(list.commands().len(), 2);
        assert_eq!(list.commands()[0].instance_count, 2);
        assert_eq!(list.commands()[1].first_instance, 2);
        assert_eq!(list.commands()[1].material_index, 1);
        check_invariants(&list);
    }

    #[test]
    fn misuse_still_upholds_invariants() {
        // Mesh without a material, instance without a mesh: degraded but
        // never out of range.
        let mut list = RenderList::new();
        list.push_instance(InstanceBlock::default());
        list.push_mesh(mesh(1), RenderOptions::default());
        list.push_instance(InstanceBlock::default());
        check_invariants(&list);
        assert_eq!(list.materials().len(), 1);
    }

    #[test]
    fn clear_behaves_like_fresh_list() {
        let mut list = RenderList::new();
        list.push_batch(
            MaterialBlock::default(),
            mesh(1),
            [InstanceBlock::default()],
            RenderOptions::default(),
        );
        list.push_light(LightBlock::new(LightKind::Ambient, [1.0; 3]));
        list.clear();

        assert!(list.is_empty());
        assert!(list.materials().is_empty());
        assert!(list.instances().is_empty());

        list.push_batch(
            MaterialBlock::default(),
            mesh(2),
            [InstanceBlock::default()],
            RenderOptions::default(),
        );
        assert_eq!(list.commands()[0].first_instance, 0);
        assert_eq!(list.commands()[0].material_index, 0);
        check_invariants(&list);
    }

    #[test]
    fn lights_cap_at_sixteen() {
        let mut list = RenderList::new();
        for _ in 0..MAX_LIGHTS + 4 {
            list.push_light(LightBlock::new(LightKind::Point, [1.0; 3]));
        }
        assert_eq!(list.lights().len(), MAX_LIGHTS);
    }

    #[test]
    fn instance_block_takes_matrix_rows() {
        let matrix = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let block = InstanceBlock::from_mat4(matrix);
        assert_eq!(block.pose_x[3], 1.0);
        assert_eq!(block.pose_y[3], 2.0);
        assert_eq!(block.pose_z[3], 3.0);
    }
}
