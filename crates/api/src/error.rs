//! Batchfetch error types.

use crate::Key;
use std::sync::Arc;

/// A clonable trait-object inner error.
#[derive(Clone, Default)]
pub struct DynInnerError(
    pub Option<Arc<dyn std::error::Error + 'static + Send + Sync>>,
);

impl std::fmt::Debug for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            None => f.write_str("None"),
            Some(s) => s.fmt(f),
        }
    }
}

impl std::error::Error for DynInnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.as_ref().map(|s| {
            let out: &(dyn std::error::Error + 'static) = &**s;
            out
        })
    }
}

impl DynInnerError {
    /// Construct a new DynInnerError from a source error.
    pub fn new<E: std::error::Error + 'static + Send + Sync>(e: E) -> Self {
        Self(Some(Arc::new(e)))
    }
}

/// The core batchfetch error type.
///
/// This type is required to implement `Clone` so that errors can be
/// recorded in a batch result and still be handed to observers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BfError {
    /// The fetch collaborator failed to talk to the remote source,
    /// for example a non-success status.
    #[error("transport: {ctx} (src: {src})")]
    Transport {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },

    /// The remote source answered with something that could not be
    /// turned into an entity.
    #[error("deserialization: {ctx} (src: {src})")]
    Deserialization {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },

    /// The remote source has no entity for this key.
    #[error("entity not found: key={key}")]
    NotFound {
        /// The key that could not be located.
        key: Key,
    },

    /// The batch was stopped cooperatively.
    #[error("cancelled")]
    Cancelled,

    /// Multiple attempts failed. Never nested, never empty.
    #[error("{} errors, first: {}", .0.len(), first_error(.0))]
    Aggregate(Arc<[BfError]>),

    /// Generic batchfetch internal error.
    #[error("{ctx} (src: {src})")]
    Other {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },
}

impl BfError {
    /// Construct a transport error.
    pub fn transport<C: std::fmt::Display>(ctx: C) -> Self {
        Self::Transport {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::default(),
        }
    }

    /// Construct a transport error with an inner source error.
    pub fn transport_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::Transport {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::new(src),
        }
    }

    /// Construct a deserialization error.
    pub fn deserialization<C: std::fmt::Display>(ctx: C) -> Self {
        Self::Deserialization {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::default(),
        }
    }

    /// Construct a deserialization error with an inner source error.
    pub fn deserialization_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::Deserialization {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::new(src),
        }
    }

    /// Construct a not found error.
    pub fn not_found(key: Key) -> Self {
        Self::NotFound { key }
    }

    /// Construct an "other" error with an inner source error.
    pub fn other_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::Other {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::new(src),
        }
    }

    /// Construct an "other" error.
    pub fn other<C: std::fmt::Display>(ctx: C) -> Self {
        Self::Other {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::default(),
        }
    }

    /// Collapse a list of errors into a single error.
    ///
    /// Nested aggregates are flattened. A list holding exactly one error
    /// yields that error itself. Returns `None` for an empty list.
    pub fn aggregate(errors: impl IntoIterator<Item = BfError>) -> Option<Self> {
        let mut flat = Vec::new();
        for err in errors {
            match err {
                Self::Aggregate(inner) => flat.extend(inner.iter().cloned()),
                err => flat.push(err),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Self::Aggregate(flat.into())),
        }
    }

    /// True if this is the [BfError::Cancelled] variant.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

fn first_error(errors: &[BfError]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "None".to_string())
}

/// The core batchfetch result type.
pub type BfResult<T> = Result<T, BfError>;
