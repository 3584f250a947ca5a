//! Errors raised by writes into the observable graph.
//!
//! Reads never fail. Only `set` / `set_path` on a view that cannot accept the
//! write, or a path write that cannot be applied to the stored structure.

/// Errors that can occur when writing to an observable.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ObservableError {
    /// The observable is derived from other values and cannot be written.
    #[error("cannot set a read-only observable")]
    ReadOnly,

    /// A transform was written to but was built without an inverse.
    #[error("transform has no inverse, it cannot be set")]
    MissingInverse,

    /// Transforms only know whole values, so sub-path writes are rejected.
    #[error("transforms cannot set sub path `{path}`")]
    TransformPath {
        /// The path that was written
        path: String,
    },

    /// A path write tried to descend through a scalar.
    #[error("cannot set `{path}`: `{segment}` is not inside an object or array")]
    NotAContainer {
        /// The full path that was written
        path: String,
        /// The segment that could not be resolved
        segment: String,
    },

    /// An array segment was not a usable index.
    #[error("cannot set `{path}`: `{segment}` is not a valid array index")]
    InvalidIndex {
        /// The full path that was written
        path: String,
        /// The offending segment
        segment: String,
    },
}

/// Result type for observable operations.
pub type Result<T> = std::result::Result<T, ObservableError>;
