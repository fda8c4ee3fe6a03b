//! Frame batching and the sync/async scene-element protocol.
//!
//! [`RenderList`] collects draw-ready state on the CPU each frame;
//! [`Snapshot`] carries producer state across the thread boundary;
//! [`SceneNode`] is the capability every dynamic scene element implements.

pub mod interaction;
pub mod list;
pub mod node;
pub mod snapshot;

pub use interaction::{Interaction, PointerPhase, Ray};
pub use list::{
    CameraBlock, InstanceBlock, LightBlock, LightKind, MaterialBlock, MeshRef, PrimitiveKind,
    RenderCommand, RenderList, RenderOptions, MAX_LIGHTS,
};
pub use node::{AsyncContext, SceneNode, SyncContext};
pub use snapshot::Snapshot;
