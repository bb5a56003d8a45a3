//! Error types for `modweave`

use thiserror::Error;

/// The error type for `modweave` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error during the copy pass.
    #[error("directory walk error: {0}")]
    WalkDirError(String),

    // ==================== Tree Errors ====================
    /// A required attribute is absent from a node.
    ///
    /// Carries the owning node's canonical signature for diagnostics.
    #[error("required attribute '{name}' missing on node '{kind}' ({signature})")]
    MissingAttribute {
        /// The attribute that was requested.
        name: String,
        /// The kind tag of the owning node.
        kind: String,
        /// Canonical signature of the owning node.
        signature: String,
    },

    /// A region expected in the document is absent.
    #[error("region '{0}' not found in document")]
    MissingRegion(String),

    /// A map-keyed entry is absent from a group.
    #[error("no entry with key '{key}' in group '{group}'")]
    MissingMapEntry {
        /// The key that was requested.
        key: String,
        /// The group kind searched.
        group: String,
    },

    /// A float-vector attribute has an unsupported component count.
    #[error("float vector must have 2-4 components, got {0}")]
    InvalidVectorArity(usize),

    /// Creating a new attribute requires an explicit type tag.
    #[error("attribute type required to create '{0}'")]
    AttributeTypeRequired(String),

    /// A fixed-point timeline value could not be parsed.
    #[error("invalid timeline time value: '{0}'")]
    InvalidTimeValue(String),

    // ==================== Package / Content Errors ====================
    /// The external codec failed to parse or serialize a tree.
    #[error("codec error: {0}")]
    Codec(String),

    /// The requested file was not found in the package.
    #[error("file not found in package: {0}")]
    FileNotFoundInPackage(String),

    /// A content identifier is not a well-formed UUID.
    #[error("malformed content UUID: '{0}'")]
    MalformedContentUuid(String),

    /// A mod UUID was referenced that the registry does not know.
    #[error("unknown mod: {0}")]
    UnknownMod(String),

    // ==================== Merge Errors ====================
    /// No mod supplies the contested content and no vanilla baseline exists.
    #[error("no baseline available for content {content}")]
    MissingBaseline {
        /// The contested content UUID.
        content: String,
    },

    /// A diff entry referenced a node that does not exist in its source tree.
    #[error("diff entry references missing node {node} in content {content}")]
    MissingDiffNode {
        /// The node UUID named by the diff entry.
        node: String,
        /// The content UUID being merged.
        content: String,
    },

    /// A timeline phase referenced by a diff entry does not exist.
    #[error("timeline phase {phase} not found")]
    MissingPhase {
        /// The phase UUID.
        phase: String,
    },

    /// Dialog merge failed for one content UUID.
    #[error("dialog merge failed for content {content}")]
    DialogMergeFailed {
        /// The content UUID being merged.
        content: String,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Timeline merge failed for one content UUID.
    #[error("timeline merge failed for content {content}")]
    TimelineMergeFailed {
        /// The content UUID being merged.
        content: String,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    // ==================== Invariant Violations ====================
    // These indicate a bug upstream of the engine, not bad input data,
    // and abort the whole run.
    /// A conflict group with zero contributors was handed to the engine.
    #[error("conflict group has no contributing mods")]
    EmptyConflictGroup,

    /// An engine invariant was violated.
    #[error("invariant violation: {0}")]
    Invariant(String),

    // ==================== Parsing Errors ====================
    /// JSON serialization error (report dumps).
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// Add conversion from walkdir::Error
impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

/// A specialized Result type for `modweave` operations.
pub type Result<T> = std::result::Result<T, Error>;
