//! Per-type discovery and caching of version sinks
//!
//! Introspecting a model type is paid once per [`SinkLocator`]: the first
//! lookup calls [`VersionedModel::sink_candidates`] and stores the outcome,
//! including an ambiguity failure, keyed by [`TypeId`]. Every later lookup
//! is a cache hit.
//!
//! Discovery for a type runs while holding the cache shard that owns the
//! type's key, so concurrent first lookups never publish a partially built
//! descriptor and never run discovery twice.

use crate::error::{AmbiguousSink, Result, VersioningError};
use crate::sink::{SinkDescriptor, VersionedModel};
use dashmap::DashMap;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

type Located<T> = std::result::Result<Option<Arc<SinkDescriptor<T>>>, AmbiguousSink>;

type CachedSink = Arc<dyn Any + Send + Sync>;

/// Finds and caches the version sink of model types.
///
/// Construct one at startup and share it (`Arc<SinkLocator>`) across every
/// request-handling context.
#[derive(Default)]
pub struct SinkLocator {
    cache: DashMap<TypeId, CachedSink>,
    discoveries: AtomicUsize,
}

impl SinkLocator {
    /// Create a locator with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate the version sink of `T`.
    ///
    /// Returns `Ok(None)` when `T` declares no sink and
    /// [`VersioningError::AmbiguousSink`] when it declares more than one,
    /// on this and every later call.
    pub fn locate<T: VersionedModel>(&self) -> Result<Option<Arc<SinkDescriptor<T>>>> {
        let type_id = TypeId::of::<T>();

        let cached = match self.cache.get(&type_id) {
            Some(entry) => entry.value().clone(),
            None => self
                .cache
                .entry(type_id)
                .or_insert_with(|| Arc::new(self.discover::<T>()) as CachedSink)
                .value()
                .clone(),
        };

        let located = cached
            .downcast::<Located<T>>()
            .expect("sink cache entries are keyed by their own TypeId");
        (*located).clone().map_err(VersioningError::from)
    }

    /// Number of types whose introspection outcome is cached
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no type has been introspected yet
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// How many times introspection actually ran
    pub fn discoveries(&self) -> usize {
        self.discoveries.load(Ordering::Acquire)
    }

    fn discover<T: VersionedModel>(&self) -> Located<T> {
        self.discoveries.fetch_add(1, Ordering::AcqRel);

        let mut candidates = T::sink_candidates();
        let type_name = type_name::<T>();

        match candidates.len() {
            0 => {
                debug!(type_name, "model declares no version sink");
                Ok(None)
            }
            1 => {
                let descriptor = SinkDescriptor::from_candidate(candidates.remove(0));
                debug!(
                    type_name,
                    member = descriptor.member(),
                    kind = %descriptor.kind(),
                    "discovered version sink"
                );
                Ok(Some(Arc::new(descriptor)))
            }
            _ => Err(AmbiguousSink {
                type_name,
                members: candidates.iter().map(|c| c.member().to_owned()).collect(),
            }),
        }
    }
}

impl fmt::Debug for SinkLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkLocator")
            .field("cached_types", &self.cache.len())
            .field("discoveries", &self.discoveries())
            .finish()
    }
}
