//! The extension contract.

use std::fmt;
use std::sync::Arc;

use crate::compose::ComposeError;
use crate::environment::Environment;
use crate::types::ComposedType;

/// A named unit that augments the types of an environment.
///
/// `extend` receives the environment as composed so far and returns the
/// types it contributes: subtypes of existing types (built with
/// [`ComposedType::extend`]) or new types defined in its own scope. Types
/// it does not return pass through unchanged.
pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    fn depends(&self) -> Vec<String> {
        Vec::new()
    }

    fn conflicts(&self) -> Vec<String> {
        Vec::new()
    }

    /// Tags of the new types this extension defines.
    fn tags(&self) -> Vec<String> {
        Vec::new()
    }

    fn extend(&self, env: &Environment) -> Result<Vec<ComposedType>, ComposeError>;
}

impl fmt::Debug for dyn Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extension({})", self.name())
    }
}

/// An extension requested by name or given directly.
#[derive(Clone)]
pub enum ExtensionRef {
    Name(String),
    Resolved(Arc<dyn Extension>),
}

impl ExtensionRef {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            ExtensionRef::Name(name) => Some(name),
            ExtensionRef::Resolved(_) => None,
        }
    }
}

impl fmt::Debug for ExtensionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionRef::Name(name) => write!(f, "{:?}", name),
            ExtensionRef::Resolved(ext) => write!(f, "{:?}", ext),
        }
    }
}

impl From<&str> for ExtensionRef {
    fn from(name: &str) -> Self {
        ExtensionRef::Name(name.to_string())
    }
}

impl From<String> for ExtensionRef {
    fn from(name: String) -> Self {
        ExtensionRef::Name(name)
    }
}

impl From<&String> for ExtensionRef {
    fn from(name: &String) -> Self {
        ExtensionRef::Name(name.clone())
    }
}

impl From<Arc<dyn Extension>> for ExtensionRef {
    fn from(ext: Arc<dyn Extension>) -> Self {
        ExtensionRef::Resolved(ext)
    }
}

type ExtendFn = dyn Fn(&Environment) -> Result<Vec<ComposedType>, ComposeError> + Send + Sync;

/// An extension assembled from a closure.
pub struct Declared {
    name: String,
    depends: Vec<String>,
    conflicts: Vec<String>,
    tags: Vec<String>,
    extend: Box<ExtendFn>,
}

/// Start declaring an extension named `name`.
pub fn declare<F>(name: impl Into<String>, extend: F) -> Declared
where
    F: Fn(&Environment) -> Result<Vec<ComposedType>, ComposeError> + Send + Sync + 'static,
{
    Declared {
        name: name.into(),
        depends: Vec::new(),
        conflicts: Vec::new(),
        tags: Vec::new(),
        extend: Box::new(extend),
    }
}

impl Declared {
    pub fn depends<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn conflicts<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflicts.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Arc<dyn Extension> {
        Arc::new(self)
    }
}

impl Extension for Declared {
    fn name(&self) -> &str {
        &self.name
    }

    fn depends(&self) -> Vec<String> {
        self.depends.clone()
    }

    fn conflicts(&self) -> Vec<String> {
        self.conflicts.clone()
    }

    fn tags(&self) -> Vec<String> {
        self.tags.clone()
    }

    fn extend(&self, env: &Environment) -> Result<Vec<ComposedType>, ComposeError> {
        (self.extend)(env)
    }
}
