//! Translation of host vector-store mutations into cache maintenance.

use std::sync::Arc;

use tracing::instrument;

use crate::cache::StatisticsCache;
use crate::error::Result;
use crate::vector::VectorPayload;
use crate::VectorId;

/// A mutation the host store reports after it has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorEvent {
    /// A new vector was stored under `id`.
    Added {
        space: String,
        id: VectorId,
        vector: VectorPayload,
    },
    /// The content of `id` was overwritten with `vector`.
    Replaced {
        space: String,
        id: VectorId,
        vector: VectorPayload,
    },
    /// `delta` was added onto `id`, yielding `accumulated`.
    Accumulated {
        space: String,
        id: VectorId,
        delta: VectorPayload,
        accumulated: VectorPayload,
    },
    /// The vector `id` was deleted.
    Removed { space: String, id: VectorId },
}

impl VectorEvent {
    pub fn space(&self) -> &str {
        match self {
            Self::Added { space, .. }
            | Self::Replaced { space, .. }
            | Self::Accumulated { space, .. }
            | Self::Removed { space, .. } => space,
        }
    }

    pub fn id(&self) -> VectorId {
        match self {
            Self::Added { id, .. }
            | Self::Replaced { id, .. }
            | Self::Accumulated { id, .. }
            | Self::Removed { id, .. } => *id,
        }
    }

    /// The content the vector holds after this event, if it still exists.
    pub fn resulting_vector(&self) -> Option<&VectorPayload> {
        match self {
            Self::Added { vector, .. } | Self::Replaced { vector, .. } => Some(vector),
            Self::Accumulated { accumulated, .. } => Some(accumulated),
            Self::Removed { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Added { .. } => "added",
            Self::Replaced { .. } => "replaced",
            Self::Accumulated { .. } => "accumulated",
            Self::Removed { .. } => "removed",
        }
    }
}

/// Receives vector-space lifecycle notifications from the host store.
///
/// The host calls `on_attached` once per space before any `on_event` for it,
/// and `on_event` synchronously after every mutation.
pub trait VectorEventListener: Send + Sync {
    fn on_attached(&self, space: &str) -> Result<()>;

    fn on_detached(&self, space: &str) -> Result<()>;

    fn on_event(&self, event: &VectorEvent) -> Result<()>;
}

/// Keeps a [`StatisticsCache`] in step with the host's vectors.
pub struct LifecycleHandler {
    cache: Arc<StatisticsCache>,
}

impl LifecycleHandler {
    pub fn new(cache: Arc<StatisticsCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<StatisticsCache> {
        &self.cache
    }

    /// Apply one event. Non-removal events always recompute from the
    /// resulting content; an accumulate delta is never used.
    #[instrument(skip(self, event), fields(kind = event.kind(), space = event.space(), id = event.id()))]
    pub fn handle(&self, event: &VectorEvent) -> Result<()> {
        match event.resulting_vector() {
            Some(vector) => self.cache.update(event.space(), event.id(), vector).map(|_| ()),
            None => self.cache.remove(event.space(), event.id()).map(|_| ()),
        }
    }
}

impl VectorEventListener for LifecycleHandler {
    fn on_attached(&self, space: &str) -> Result<()> {
        self.cache.attach_space(space)
    }

    fn on_detached(&self, space: &str) -> Result<()> {
        self.cache.detach_space(space).map(|_| ())
    }

    fn on_event(&self, event: &VectorEvent) -> Result<()> {
        self.handle(event)
    }
}
