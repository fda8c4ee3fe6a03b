//! Kind-tagged display construction.
//!
//! Displays are created through an explicitly passed registry instead of a
//! global factory: the application registers a constructor per kind (capturing
//! whatever configuration it wants) and creates instances by tag.

use std::collections::HashMap;
use std::sync::Arc;

use vantage_topics::TopicBus;

use crate::marker::MeshSource;
use crate::Display;

/// Dependencies handed to every display constructor.
#[derive(Clone)]
pub struct DisplayContext {
    pub bus: Arc<TopicBus>,
    pub meshes: Arc<dyn MeshSource>,
}

type Constructor = Box<dyn Fn(&DisplayContext, &str) -> Arc<dyn Display> + Send + Sync>;

#[derive(Default)]
pub struct DisplayRegistry {
    constructors: HashMap<String, Constructor>,
}

impl DisplayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the constructor for `kind`.
    pub fn register(
        &mut self,
        kind: &str,
        constructor: impl Fn(&DisplayContext, &str) -> Arc<dyn Display> + Send + Sync + 'static,
    ) {
        self.constructors
            .insert(kind.to_string(), Box::new(constructor));
    }

    /// Creates a display of the given kind, or `None` for unknown tags.
    pub fn create(
        &self,
        kind: &str,
        ctx: &DisplayContext,
        name: &str,
    ) -> Option<Arc<dyn Display>> {
        match self.constructors.get(kind) {
            Some(constructor) => Some(constructor(ctx, name)),
            None => {
                tracing::warn!(kind, "unknown display kind");
                None
            }
        }
    }

    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.constructors.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_render::{AsyncContext, SceneNode, SyncContext};

    struct NullDisplay {
        name: String,
    }

    impl SceneNode for NullDisplay {
        fn render_sync(&self, _ctx: &SyncContext) {}
        fn render_async(&self, _ctx: &mut AsyncContext<'_>) {}
    }

    impl Display for NullDisplay {
        fn name(&self) -> &str {
            &self.name
        }
    }

    struct NoMeshes;

    impl MeshSource for NoMeshes {
        fn primitive_mesh(&self, _kind: vantage_msgs::MarkerKind) -> Option<vantage_render::MeshRef> {
            None
        }
    }

    #[test]
    fn creates_registered_kinds_only() {
        let mut registry = DisplayRegistry::new();
        registry.register("null", |_ctx, name| {
            Arc::new(NullDisplay {
                name: name.to_string(),
            })
        });

        let ctx = DisplayContext {
            bus: TopicBus::new(),
            meshes: Arc::new(NoMeshes),
        };

        let display = registry.create("null", &ctx, "a").unwrap();
        assert_eq!(display.name(), "a");
        assert!(registry.create("bogus", &ctx, "b").is_none());
        assert_eq!(registry.kinds(), vec!["null".to_string()]);
    }
}
