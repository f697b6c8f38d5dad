//! Version sink declarations
//!
//! A model type opts into server-driven versioning by implementing
//! [`VersionedModel`]. The implementation lists every member marked as the
//! version sink; the [`SinkLocator`](crate::SinkLocator) checks that there is
//! at most one and caches the answer.
//!
//! Implementations are normally generated by `#[derive(VersionedModel)]`:
//!
//! ```rust,ignore
//! #[derive(Serialize, VersionedModel)]
//! struct Order {
//!     id: u64,
//!     #[version_sink]
//!     model_version: Option<String>,
//! }
//! ```
//!
//! Writing one by hand uses the same building blocks:
//!
//! ```rust,ignore
//! impl VersionedModel for Order {
//!     fn sink_candidates() -> Vec<SinkCandidate<Self>> {
//!         vec![SinkCandidate::<Self>::field("model_version", |order| &mut order.model_version)]
//!     }
//! }
//! ```

use crate::error::{SinkWriteError, VersioningError};
use std::any::{type_name, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Type-erased writer that stores a version string into a model instance
pub type SinkWriter<T> = Arc<dyn Fn(&mut T, &str) -> Result<(), SinkWriteError> + Send + Sync>;

/// A model whose serialized shape depends on a target version.
pub trait VersionedModel: Sized + Send + 'static {
    /// Every member of `Self` marked as the version sink.
    ///
    /// Called once per type by a [`SinkLocator`](crate::SinkLocator). More
    /// than one entry is a configuration error; an empty list means the type
    /// does not take part in version tagging.
    ///
    /// The locator runs this while holding the lock of its cache shard. A
    /// hand-written implementation must not call back into the same
    /// [`SinkLocator`](crate::SinkLocator), or it deadlocks.
    fn sink_candidates() -> Vec<SinkCandidate<Self>>;
}

/// How the version reaches the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    /// Direct assignment to a field
    Field,
    /// Call to a `&mut self` method taking the version as `&str`
    Accessor,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkKind::Field => f.write_str("field"),
            SinkKind::Accessor => f.write_str("accessor"),
        }
    }
}

/// Field types that can receive a version string.
pub trait SinkField {
    /// Store `version`, or reject it.
    fn write_version(&mut self, version: &str) -> Result<(), SinkWriteError>;
}

impl SinkField for String {
    fn write_version(&mut self, version: &str) -> Result<(), SinkWriteError> {
        version.clone_into(self);
        Ok(())
    }
}

impl SinkField for Option<String> {
    fn write_version(&mut self, version: &str) -> Result<(), SinkWriteError> {
        *self = Some(version.to_owned());
        Ok(())
    }
}

impl SinkField for Box<str> {
    fn write_version(&mut self, version: &str) -> Result<(), SinkWriteError> {
        *self = version.into();
        Ok(())
    }
}

impl SinkField for Option<Box<str>> {
    fn write_version(&mut self, version: &str) -> Result<(), SinkWriteError> {
        *self = Some(version.into());
        Ok(())
    }
}

impl SinkField for Cow<'static, str> {
    fn write_version(&mut self, version: &str) -> Result<(), SinkWriteError> {
        *self = Cow::Owned(version.to_owned());
        Ok(())
    }
}

/// Return types accepted from accessor sinks.
///
/// `()` always succeeds; `Result<(), E>` turns `Err` into a [`SinkWriteError`].
pub trait SetterOutcome {
    /// Convert the accessor's return value
    fn into_sink_result(self) -> Result<(), SinkWriteError>;
}

impl SetterOutcome for () {
    fn into_sink_result(self) -> Result<(), SinkWriteError> {
        Ok(())
    }
}

impl<E: fmt::Display> SetterOutcome for Result<(), E> {
    fn into_sink_result(self) -> Result<(), SinkWriteError> {
        self.map_err(|e| SinkWriteError::new(e.to_string()))
    }
}

/// One member marked as version sink, as reported by introspection
pub struct SinkCandidate<T> {
    member: String,
    kind: SinkKind,
    writer: SinkWriter<T>,
}

impl<T: 'static> SinkCandidate<T> {
    /// A field sink reached through `project`
    pub fn field<F>(member: impl Into<String>, project: fn(&mut T) -> &mut F) -> Self
    where
        F: SinkField + 'static,
    {
        Self {
            member: member.into(),
            kind: SinkKind::Field,
            writer: Arc::new(move |model: &mut T, version: &str| {
                project(model).write_version(version)
            }),
        }
    }

    /// An accessor sink; `setter` receives the version as its only argument
    pub fn accessor<R>(member: impl Into<String>, setter: fn(&mut T, &str) -> R) -> Self
    where
        R: SetterOutcome + 'static,
    {
        Self {
            member: member.into(),
            kind: SinkKind::Accessor,
            writer: Arc::new(move |model: &mut T, version: &str| {
                setter(model, version).into_sink_result()
            }),
        }
    }

    /// Re-home this candidate onto an outer type that embeds `T` in `field`.
    ///
    /// The member name becomes `field.member`.
    pub fn flatten<O: 'static>(
        self,
        field: &str,
        project: fn(&mut O) -> &mut T,
    ) -> SinkCandidate<O> {
        let inner = self.writer;
        SinkCandidate {
            member: format!("{}.{}", field, self.member),
            kind: self.kind,
            writer: Arc::new(move |outer: &mut O, version: &str| inner(project(outer), version)),
        }
    }

    /// Member name (dotted for flattened members)
    pub fn member(&self) -> &str {
        &self.member
    }

    /// Field or accessor
    pub fn kind(&self) -> SinkKind {
        self.kind
    }
}

impl<T> fmt::Debug for SinkCandidate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkCandidate")
            .field("member", &self.member)
            .field("kind", &self.kind)
            .finish()
    }
}

/// The single version sink of a model type.
///
/// Two descriptors are equal when they describe the same member of the same
/// type; the writer is not compared.
pub struct SinkDescriptor<T> {
    owner: TypeId,
    owner_name: &'static str,
    member: String,
    kind: SinkKind,
    writer: SinkWriter<T>,
}

impl<T: VersionedModel> SinkDescriptor<T> {
    pub(crate) fn from_candidate(candidate: SinkCandidate<T>) -> Self {
        Self {
            owner: TypeId::of::<T>(),
            owner_name: type_name::<T>(),
            member: candidate.member,
            kind: candidate.kind,
            writer: candidate.writer,
        }
    }

    /// Write `version` into `model`
    pub fn write(&self, model: &mut T, version: &str) -> Result<(), VersioningError> {
        (self.writer)(model, version).map_err(|source| VersioningError::SinkWrite {
            type_name: self.owner_name,
            member: self.member.clone(),
            source,
        })
    }
}

impl<T> SinkDescriptor<T> {
    /// `TypeId` of the model type
    pub fn owner(&self) -> TypeId {
        self.owner
    }

    /// Name of the model type
    pub fn owner_name(&self) -> &'static str {
        self.owner_name
    }

    /// Name of the sink member
    pub fn member(&self) -> &str {
        &self.member
    }

    /// Field or accessor
    pub fn kind(&self) -> SinkKind {
        self.kind
    }
}

impl<T> PartialEq for SinkDescriptor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.kind == other.kind && self.member == other.member
    }
}

impl<T> Eq for SinkDescriptor<T> {}

impl<T> fmt::Debug for SinkDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkDescriptor")
            .field("owner", &self.owner_name)
            .field("member", &self.member)
            .field("kind", &self.kind)
            .finish()
    }
}
