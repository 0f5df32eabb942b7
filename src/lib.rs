//! Graft: composable type extensions with a self-describing tree codec
//!
//! Extensions layer new fields and behaviour onto a base set of types.
//! Composing a list of extensions over an environment resolves their
//! dependencies, rejects conflicts and yields a new environment whose
//! types remember which extensions built them. Values encode to a tagged
//! tree that records those extensions, so a document can be decoded
//! without the reader knowing up front which ones it needs.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                 graft                   │
//! │                                         │
//! │  compose   - Extension composition      │
//! │  types     - Composed types, retyping   │
//! │  codec     - Value <-> Tree mapping     │
//! │  plugins   - Built-in extensions        │
//! │                                         │
//! ├─────────────────────────────────────────┤
//! │       graft-tree (wire format, XML)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use graft::{net, Composer, Value};
//! use graft::plugins::labels::Labels;
//!
//! let env = Composer::global().compose(["labels"], &net::environment())?;
//! let mut place = net::place(&env, "p", 1)?;
//! place.set_label("colour", "red")?;
//!
//! let text = graft::dumps(&Value::Object(place.clone()))?;
//! assert_eq!(graft::loads(&text, Vec::<String>::new())?, Value::Object(place));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod codec;
pub mod compose;
pub mod environment;
pub mod extension;
pub mod net;
pub mod plugins;
pub mod types;
pub mod value;

pub use codec::{Codec, CodecError, Limits};
pub use compose::{Catalog, ComposeError, Composer};
pub use environment::{EnvHash, Environment};
pub use extension::{declare, Extension, ExtensionRef};
pub use graft_tree::Tree;
pub use types::{retype, ComposedType, Field, Instance, Layer, RetypeError, Scope, TypeError};
pub use value::{Options, Symbol, SymbolKind, Value};

/// Encode `value` with the default codec and render it as XML.
pub fn dumps(value: &Value) -> codec::Result<String> {
    Codec::default().dumps(value)
}

/// Parse and decode `text`, composing at least `extensions` plus whatever
/// the document itself requires.
pub fn loads<I, S>(text: &str, extensions: I) -> codec::Result<Value>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Codec::default().loads(text, extensions)
}
