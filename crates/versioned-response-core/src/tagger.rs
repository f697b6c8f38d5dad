//! Writing the resolved version into response bodies

use crate::error::Result;
use crate::locator::SinkLocator;
use crate::policy::EndpointVersionPolicy;
use crate::request::{QueryParams, VersionInputs};
use crate::resolver::resolve;
use crate::sink::VersionedModel;
use http::request::Parts;
use std::any::type_name;
use std::sync::Arc;
use tracing::trace;

/// Tags response bodies with their target model version.
///
/// Cloning is cheap; clones share the same [`SinkLocator`].
#[derive(Debug, Clone, Default)]
pub struct ResponseTagger {
    locator: Arc<SinkLocator>,
}

impl ResponseTagger {
    /// Create a tagger backed by `locator`
    pub fn new(locator: Arc<SinkLocator>) -> Self {
        Self { locator }
    }

    /// The shared sink cache
    pub fn locator(&self) -> &Arc<SinkLocator> {
        &self.locator
    }

    /// Resolve the target version for `body` and write it into its sink.
    ///
    /// Returns the same body. Types without a version sink pass through
    /// unchanged.
    ///
    /// # Errors
    ///
    /// [`VersioningError::AmbiguousSink`](crate::VersioningError::AmbiguousSink)
    /// when `T` declares more than one sink, and
    /// [`VersioningError::SinkWrite`](crate::VersioningError::SinkWrite) when
    /// the sink rejects the version.
    pub fn tag<T: VersionedModel>(
        &self,
        mut body: T,
        policy: &EndpointVersionPolicy,
        inputs: VersionInputs<'_>,
    ) -> Result<T> {
        let version = resolve(policy, inputs);
        self.tag_with_version(&mut body, version.as_str())?;
        Ok(body)
    }

    /// Same as [`tag`](Self::tag), reading the inputs from a request head
    pub fn tag_request<T: VersionedModel>(
        &self,
        body: T,
        policy: &EndpointVersionPolicy,
        parts: &Parts,
    ) -> Result<T> {
        let query = QueryParams::from_uri(&parts.uri);
        self.tag(body, policy, VersionInputs::new(&query, &parts.headers))
    }

    /// Write an already resolved `version` into `body`.
    ///
    /// Returns whether a sink was written.
    pub fn tag_with_version<T: VersionedModel>(&self, body: &mut T, version: &str) -> Result<bool> {
        let Some(sink) = self.locator.locate::<T>()? else {
            return Ok(false);
        };

        sink.write(body, version)?;
        trace!(
            type_name = type_name::<T>(),
            member = sink.member(),
            version,
            "tagged response body"
        );
        Ok(true)
    }
}
