//! Error types for extension composition.

use thiserror::Error;

use crate::types::TypeError;

/// Configuration errors raised while composing an environment.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComposeError {
    /// A requested or depended-upon extension is not in the catalog.
    #[error("unknown extension '{0}'")]
    UnknownExtension(String),

    /// The extension conflicts with already applied ones.
    #[error("extension '{extension}' conflicts with {conflicting:?}")]
    Conflict {
        extension: String,
        conflicting: Vec<String>,
    },

    #[error("circular extension dependency: {}", cycle.join(" -> "))]
    DependencyCycle { cycle: Vec<String> },

    /// An extension's `extend` returned something other than subtypes of
    /// existing types or new types of its own.
    #[error("malformed extension '{extension}': {message}")]
    MalformedDeclaration { extension: String, message: String },

    #[error(transparent)]
    Type(#[from] TypeError),
}

pub type Result<T> = std::result::Result<T, ComposeError>;
