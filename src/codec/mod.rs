//! Tree codec
//!
//! Maps [`Value`]s to [`Tree`]s and back. Encoding dispatches on the value
//! kind:
//!
//! - **Instances** of composed types write themselves through their layers
//!   and record the extensions their environment was composed from
//! - **Scalars** become `<object type="int">42</object>` leaves
//! - **Collections and dicts** become `object` nodes with encoded children
//! - **Symbols** inside the `graft` namespace are written by dotted name
//! - **Opaque** values are serialized by serde into a blob node
//!
//! A document is rooted at `<pnml>`. When any instance was encoded, a
//! metadata node listing the required extensions comes first, so decoding
//! can recompose the environment before resolving tags:
//!
//! ```text
//! <pnml>
//!  <graft version="0.3.0">
//!   <extensions>
//!    <object type="tuple">
//!     <object type="str">labels</object>
//!    </object>
//!   </extensions>
//!  </graft>
//!  <place id="p">...</place>
//! </pnml>
//! ```

mod decode;
mod encode;
mod error;
mod opaque;
mod registry;

pub use decode::Decoder;
pub use encode::Encoder;
pub use error::{CodecError, Result};
pub use opaque::{Opaque, OpaqueRegistry, OpaqueType, OpaqueValue};
pub use registry::TypeRegistry;

use std::sync::Arc;

use graft_tree::{Tree, ROOT_TAG};
use tracing::debug;

use crate::compose::Composer;
use crate::environment::Environment;
use crate::net;
use crate::value::Value;

/// Tag of structurally encoded values.
pub const OBJECT_TAG: &str = "object";
/// Tag of the metadata node.
pub const META_TAG: &str = "graft";
const EXTENSIONS_TAG: &str = "extensions";
/// Attribute holding a whitespace-only `str`.
const STR_VALUE_ATTR: &str = "value";
const FORMAT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Deepest value nesting accepted by the encoder and decoder.
    pub max_depth: usize,
    pub allow_opaque: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 512,
            allow_opaque: true,
        }
    }
}

/// Encoder and decoder bound to a composer and a base environment.
pub struct Codec {
    composer: Arc<Composer>,
    base: Environment,
    limits: Limits,
    opaque: OpaqueRegistry,
}

impl Codec {
    pub fn new(composer: Arc<Composer>, base: Environment) -> Self {
        Self {
            composer,
            base,
            limits: Limits::default(),
            opaque: OpaqueRegistry::new(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Accept opaque blobs of type `T` on decode.
    pub fn with_opaque<T: OpaqueType>(mut self) -> Self {
        self.opaque.register::<T>();
        self
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn composer(&self) -> &Arc<Composer> {
        &self.composer
    }

    pub fn base(&self) -> &Environment {
        &self.base
    }

    /// Encode `value` as a `<pnml>` document.
    pub fn encode(&self, value: &Value) -> Result<Tree> {
        let mut encoder = Encoder::new(self.limits);
        let node = encoder.encode(value)?;
        let requires = encoder.into_requires();

        let mut root = Tree::new(ROOT_TAG);
        if !requires.is_empty() {
            root.add_child(self.metadata(&requires)?);
        }
        root.add_child(node);
        Ok(root)
    }

    pub fn dumps(&self, value: &Value) -> Result<String> {
        Ok(self.encode(value)?.to_xml())
    }

    /// Decode a tree, composing `extensions` plus whatever the document
    /// requires on top of the base environment.
    pub fn decode<I, S>(&self, tree: &Tree, extensions: I) -> Result<Value>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = tree.clone();
        let mut requested: Vec<String> = Vec::new();
        for name in extensions {
            push_unique(&mut requested, self.composer.catalog().canonical(name.as_ref()));
        }
        for name in self.strip_requirements(&mut tree)? {
            push_unique(&mut requested, name);
        }

        let env = self.composer.compose(&requested, &self.base)?;
        debug!(requested = ?requested, provenance = ?env.provenance(), "decoding");
        let registry = TypeRegistry::build(&env)?;
        Decoder::new(&env, &registry, &self.opaque, self.limits).decode_document(&tree)
    }

    pub fn loads<I, S>(&self, text: &str, extensions: I) -> Result<Value>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.decode(&graft_tree::parse(text)?, extensions)
    }

    /// Extensions a document needs: those named in its metadata, then the
    /// owners of extension-defined tags it uses.
    pub fn required_extensions(&self, tree: &Tree) -> Result<Vec<String>> {
        self.strip_requirements(&mut tree.clone())
    }

    fn strip_requirements(&self, tree: &mut Tree) -> Result<Vec<String>> {
        let mut metadata = Vec::new();
        take_metadata(tree, &mut metadata);

        let mut names = Vec::new();
        for meta in &metadata {
            for name in self.read_metadata(meta)? {
                push_unique(&mut names, name);
            }
        }
        let owners = self.composer.catalog().tag_owners();
        for node in tree.nodes() {
            if let Some(owner) = owners.get(&node.tag) {
                push_unique(&mut names, owner.clone());
            }
        }
        Ok(names)
    }

    fn metadata(&self, requires: &[String]) -> Result<Tree> {
        let names = Value::Tuple(requires.iter().map(|n| Value::from(n.as_str())).collect());
        let list = Encoder::new(self.limits).encode(&names)?;
        Ok(Tree::new(META_TAG)
            .with_attr("version", FORMAT_VERSION)
            .with_child(Tree::new(EXTENSIONS_TAG).with_child(list)))
    }

    fn read_metadata(&self, meta: &Tree) -> Result<Vec<String>> {
        let env = Environment::default();
        let registry = TypeRegistry::empty();
        let value = Decoder::new(&env, &registry, &self.opaque, self.limits)
            .decode_wrapped(meta.child(EXTENSIONS_TAG)?)?;
        let items = value
            .as_seq()
            .ok_or_else(|| CodecError::Metadata(format!("expected a sequence, got {}", value.type_name())))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|name| self.composer.catalog().canonical(name))
                    .ok_or_else(|| CodecError::Metadata(format!("expected str, got {}", item.type_name())))
            })
            .collect()
    }
}

impl Default for Codec {
    /// The global composer over [`net::environment`].
    fn default() -> Self {
        Self::new(Composer::global(), net::environment())
    }
}

fn take_metadata(tree: &mut Tree, found: &mut Vec<Tree>) {
    found.extend(tree.take_children(META_TAG));
    for child in &mut tree.children {
        take_metadata(child, found);
    }
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}
