//! The sync/async capability implemented by every dynamic scene element.

use crate::interaction::Interaction;
use crate::list::{CameraBlock, RenderList};

/// Producer-side phase context. `now_ms` is sampled once per sync pass so
/// all elements trim against the same instant.
#[derive(Debug, Clone, Copy)]
pub struct SyncContext {
    pub now_ms: i64,
}

/// Render-thread phase context: the frame's draw list and camera.
pub struct AsyncContext<'a> {
    pub render_list: &'a mut RenderList,
    pub camera: CameraBlock,
}

/// A scene element that bridges a producer thread and the render thread.
///
/// `render_sync` runs on the thread that owns the element's authoritative
/// state; it may lock the element's own mutex, must stay cheap and must not
/// block on I/O. `render_async` runs on the render thread and reads only the
/// last published snapshot — never a producer lock. Neither phase may
/// propagate errors across the boundary; failures degrade to an empty
/// render.
pub trait SceneNode: Send + Sync {
    fn render_sync(&self, ctx: &SyncContext);

    fn render_async(&self, ctx: &mut AsyncContext<'_>);

    /// Pointer dispatch; returns whether the event was consumed.
    fn interact(&self, interaction: &Interaction) -> bool {
        let _ = interaction;
        false
    }
}
