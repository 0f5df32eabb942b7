//! Named extension lookup.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{ComposeError, Result};
use crate::extension::Extension;
use crate::plugins;

/// Namespace under which bare extension names are resolved.
pub const DEFAULT_PREFIX: &str = "graft.plugins.";

/// The extensions a [`Composer`](super::Composer) can resolve by name.
///
/// Extensions are keyed by qualified name; a bare name such as `labels`
/// resolves to `graft.plugins.labels`, while a dotted name is taken as
/// already qualified.
pub struct Catalog {
    prefix: String,
    extensions: BTreeMap<String, Arc<dyn Extension>>,
}

impl Catalog {
    /// An empty catalog with the default prefix.
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extensions: BTreeMap::new(),
        }
    }

    /// Catalog of the extensions shipped with the crate.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for ext in plugins::all() {
            catalog.register(ext);
        }
        catalog
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Add an extension, replacing any with the same name.
    pub fn register(&mut self, ext: Arc<dyn Extension>) {
        let key = self.qualified(ext.name());
        self.extensions.insert(key, ext);
    }

    pub fn with(mut self, ext: Arc<dyn Extension>) -> Self {
        self.register(ext);
        self
    }

    /// Fully qualified form of `name`.
    pub fn qualified(&self, name: &str) -> String {
        if name.contains('.') {
            name.to_string()
        } else {
            format!("{}{}", self.prefix, name)
        }
    }

    /// Short form of `name`, as recorded in provenance lists.
    pub fn canonical(&self, name: &str) -> String {
        match name.strip_prefix(self.prefix.as_str()) {
            Some(short) if !short.is_empty() => short.to_string(),
            _ => name.to_string(),
        }
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Extension>> {
        self.extensions
            .get(&self.qualified(name))
            .cloned()
            .ok_or_else(|| ComposeError::UnknownExtension(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.extensions.contains_key(&self.qualified(name))
    }

    /// Which extension defines each tag.
    pub fn tag_owners(&self) -> BTreeMap<String, String> {
        let mut owners = BTreeMap::new();
        for ext in self.extensions.values() {
            for tag in ext.tags() {
                owners.insert(tag, ext.name().to_string());
            }
        }
        owners
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Extension>> {
        self.extensions.values()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
