use graft_tree::TreeError;
use thiserror::Error;

use crate::compose::ComposeError;
use crate::types::{RetypeError, TypeError};

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("unsupported tag <{0}>")]
    UnsupportedTag(String),

    #[error("unsupported object type '{0}'")]
    UnsupportedObjectType(String),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("invalid {kind} literal '{text}'")]
    InvalidLiteral { kind: &'static str, text: String },

    #[error("malformed opaque blob: {0}")]
    MalformedBlob(String),

    #[error("no opaque decoder registered for '{0}'")]
    UnknownOpaque(String),

    /// A value could not be written at all.
    #[error("cannot serialize value: {0}")]
    Serialization(String),

    #[error("tag <{tag}> is shared by unrelated types {types:?}")]
    AmbiguousTag { tag: String, types: Vec<String> },

    #[error("type {ty} uses reserved tag <{tag}>")]
    ReservedTag { tag: String, ty: String },

    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),

    #[error("invalid metadata: {0}")]
    Metadata(String),

    #[error("empty document")]
    EmptyDocument,

    #[error("nesting exceeds the limit of {0}")]
    TooDeep(usize),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Retype(#[from] RetypeError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

pub type Result<T> = std::result::Result<T, CodecError>;
