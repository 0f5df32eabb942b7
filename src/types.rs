//! Composed types
//!
//! A [`ComposedType`] is a stack of [`Layer`]s: the layer that defines the
//! type, then one decorator layer per extension that augmented it. Each
//! layer declares the fields it stores, consumes its own construction
//! options and contributes to the type's tree encoding. Instances are plain
//! field maps tagged with their type, which is what makes [`retype`]
//! possible without running construction logic.
//!
//! ```text
//! Place (base)            fields: name, tokens
//!   └─ Place + labels     fields: + labels
//!        └─ Place + pos   fields: + pos
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use graft_tree::Tree;
use thiserror::Error;

use crate::codec::{self, Decoder, Encoder};
use crate::value::{Options, Value, NAMESPACE};

/// Field storage of an instance.
pub type State = BTreeMap<String, Value>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    #[error("{ty}: unexpected option '{option}'")]
    UnexpectedOption { ty: String, option: String },

    #[error("{ty}: missing required field '{field}'")]
    MissingField { ty: String, field: String },

    #[error("{ty}: field '{field}' is not declared by any layer")]
    UndeclaredField { ty: String, field: String },

    #[error("{ty} is not extended by '{extension}'")]
    NotExtended { ty: String, extension: String },

    #[error("'{field}' expects {expected}, got {got}")]
    WrongType {
        field: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("no node named '{0}'")]
    UnknownNode(String),

    #[error("a node named '{0}' already exists")]
    DuplicateNode(String),

    #[error("cannot merge into '{0}': incompatible markings")]
    IncompatibleMarkings(String),

    #[error(transparent)]
    Retype(#[from] RetypeError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetypeError {
    #[error("cannot retype {from} into unrelated type {to}")]
    Incompatible { from: String, to: String },

    #[error("{ty}: field '{field}' has no default and cannot be left unset")]
    NotDefaultable { ty: String, field: String },

    #[error("{ty}: retyping would drop field '{field}'")]
    WouldDropState { ty: String, field: String },
}

pub type Result<T> = std::result::Result<T, TypeError>;

/// Where the root of a type lineage was defined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Base,
    Extension(String),
}

impl Scope {
    /// Dotted module path of this scope.
    pub fn module_path(&self) -> String {
        match self {
            Scope::Base => format!("{}.net", NAMESPACE),
            Scope::Extension(name) => format!("{}.plugins.{}", NAMESPACE, name),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Base => write!(f, "base"),
            Scope::Extension(name) => write!(f, "{}", name),
        }
    }
}

/// A field stored by a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// `None` marks a required field.
    pub default: Option<Value>,
}

impl Field {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

/// One slice of a composed type: the defining layer or an extension's
/// decorator.
///
/// `init` must take only the options it recognises and leave the rest in
/// `options`; layers further down the stack get their turn afterwards.
pub trait Layer: Send + Sync + fmt::Debug {
    fn fields(&self) -> Vec<Field> {
        Vec::new()
    }

    fn init(&self, _options: &mut Options, _state: &mut State) -> Result<()> {
        Ok(())
    }

    /// Add this layer's part of the encoding to `tree`.
    fn dump(&self, _instance: &Instance, _tree: &mut Tree, _encoder: &mut Encoder) -> codec::Result<()> {
        Ok(())
    }

    /// Read this layer's fields back from `tree`.
    fn load(&self, _tree: &Tree, _state: &mut State, _decoder: &mut Decoder<'_>) -> codec::Result<()> {
        Ok(())
    }
}

/// A type produced by defining a base and applying extensions to it.
pub struct ComposedType {
    name: String,
    tag: String,
    scope: Scope,
    provenance: Vec<String>,
    requires: Vec<String>,
    parent: Option<Arc<ComposedType>>,
    layers: Vec<Arc<dyn Layer>>,
}

impl ComposedType {
    /// Define the root of a new lineage.
    pub fn define(
        name: impl Into<String>,
        tag: impl Into<String>,
        scope: Scope,
        layer: impl Layer + 'static,
    ) -> Self {
        let provenance = match &scope {
            Scope::Base => Vec::new(),
            Scope::Extension(ext) => vec![ext.clone()],
        };
        Self {
            name: name.into(),
            tag: tag.into(),
            scope,
            requires: provenance.clone(),
            provenance,
            parent: None,
            layers: vec![Arc::new(layer)],
        }
    }

    /// A subtype of `self` decorated with `layer` on behalf of `extension`.
    pub fn extend(self: &Arc<Self>, extension: &str, layer: impl Layer + 'static) -> Self {
        self.derive(self.name.clone(), extension, layer)
    }

    /// Like [`extend`](Self::extend), under a new type name sharing the tag.
    pub fn derive(
        self: &Arc<Self>,
        name: impl Into<String>,
        extension: &str,
        layer: impl Layer + 'static,
    ) -> Self {
        let mut provenance = self.provenance.clone();
        provenance.push(extension.to_string());
        let mut layers = self.layers.clone();
        layers.push(Arc::new(layer));
        Self {
            name: name.into(),
            tag: self.tag.clone(),
            scope: self.scope.clone(),
            provenance,
            requires: self.requires.clone(),
            parent: Some(Arc::clone(self)),
            layers,
        }
    }

    pub(crate) fn stamped(mut self, requires: Vec<String>) -> Self {
        self.requires = requires;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Scope of the lineage root.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Extensions that contributed to this type, in application order.
    pub fn provenance(&self) -> &[String] {
        &self.provenance
    }

    /// Environment provenance needed to rebuild this type.
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub fn parent(&self) -> Option<&Arc<ComposedType>> {
        self.parent.as_ref()
    }

    pub fn is_extended_by(&self, extension: &str) -> bool {
        self.provenance.iter().any(|p| p == extension)
    }

    /// Whether `other` is `self` or one of its ancestors.
    pub fn is_subtype_of(&self, other: &ComposedType) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if std::ptr::eq(ty, other) {
                return true;
            }
            current = ty.parent.as_deref();
        }
        false
    }

    pub fn root(&self) -> &ComposedType {
        let mut ty = self;
        while let Some(parent) = ty.parent.as_deref() {
            ty = parent;
        }
        ty
    }

    /// Identity of the lineage, stable across environment builds.
    pub fn lineage(&self) -> (&Scope, &str) {
        let root = self.root();
        (&root.scope, &root.name)
    }

    /// Dotted path used by class symbols.
    pub fn path(&self) -> String {
        format!("{}.{}", self.scope.module_path(), self.name)
    }

    /// All fields, later layers overriding earlier declarations.
    pub fn fields(&self) -> Vec<Field> {
        let mut fields: Vec<Field> = Vec::new();
        for field in self.layers.iter().flat_map(|l| l.fields()) {
            match fields.iter_mut().find(|f| f.name == field.name) {
                Some(slot) => *slot = field,
                None => fields.push(field),
            }
        }
        fields
    }

    /// Build an instance, letting every layer consume its options from the
    /// outermost extension down to the defining layer.
    pub fn construct(self: &Arc<Self>, mut options: Options) -> Result<Instance> {
        let mut state = State::new();
        for layer in self.layers.iter().rev() {
            layer.init(&mut options, &mut state)?;
        }
        if let Some(option) = options.keys().next() {
            return Err(TypeError::UnexpectedOption {
                ty: self.name.clone(),
                option: option.to_string(),
            });
        }
        self.complete(state)
    }

    /// Fill defaults and check the field set.
    fn complete(self: &Arc<Self>, mut state: State) -> Result<Instance> {
        let fields = self.fields();
        if let Some(key) = state.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
            return Err(TypeError::UndeclaredField {
                ty: self.name.clone(),
                field: key.clone(),
            });
        }
        for field in fields {
            if state.contains_key(&field.name) {
                continue;
            }
            match field.default {
                Some(default) => {
                    state.insert(field.name, default);
                }
                None => {
                    return Err(TypeError::MissingField {
                        ty: self.name.clone(),
                        field: field.name,
                    })
                }
            }
        }
        Ok(Instance {
            ty: Arc::clone(self),
            state,
        })
    }

    pub fn dump(&self, instance: &Instance, encoder: &mut Encoder) -> codec::Result<Tree> {
        let mut tree = Tree::new(self.tag.clone());
        for layer in &self.layers {
            layer.dump(instance, &mut tree, encoder)?;
        }
        Ok(tree)
    }

    /// Rebuild an instance from `tree`: the parent type loads its part,
    /// the result is retyped into `self` and this type's own layer reads
    /// the rest.
    pub fn load(self: &Arc<Self>, tree: &Tree, decoder: &mut Decoder<'_>) -> codec::Result<Instance> {
        let mut state = match &self.parent {
            Some(parent) => retype(&parent.load(tree, decoder)?, self)?.state,
            None => State::new(),
        };
        if let Some(own) = self.layers.last() {
            own.load(tree, &mut state, decoder)?;
        }
        Ok(self.complete(state)?)
    }
}

impl fmt::Debug for ComposedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedType")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("scope", &self.scope)
            .field("provenance", &self.provenance)
            .finish()
    }
}

/// A value of a composed type.
#[derive(Debug, Clone)]
pub struct Instance {
    ty: Arc<ComposedType>,
    state: State,
}

impl Instance {
    pub fn ty(&self) -> &Arc<ComposedType> {
        &self.ty
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.state.get(field)
    }

    pub fn require(&self, field: &str) -> Result<&Value> {
        self.state.get(field).ok_or_else(|| TypeError::MissingField {
            ty: self.ty.name.clone(),
            field: field.to_string(),
        })
    }

    pub fn field_mut(&mut self, field: &str) -> Result<&mut Value> {
        let ty = &self.ty.name;
        self.state.get_mut(field).ok_or_else(|| TypeError::UndeclaredField {
            ty: ty.clone(),
            field: field.to_string(),
        })
    }

    /// Replace a declared field.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        *self.field_mut(field)? = value.into();
        Ok(())
    }

    /// The `name` field, when it holds a string.
    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }

    pub fn is_extended_by(&self, extension: &str) -> bool {
        self.ty.is_extended_by(extension)
    }

    /// Fail unless this instance's type carries `extension`.
    pub fn expect_extension(&self, extension: &str) -> Result<()> {
        if self.is_extended_by(extension) {
            Ok(())
        } else {
            Err(TypeError::NotExtended {
                ty: self.ty.name.clone(),
                extension: extension.to_string(),
            })
        }
    }

    pub fn retype(&self, target: &Arc<ComposedType>) -> std::result::Result<Instance, RetypeError> {
        retype(self, target)
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.ty.name == other.ty.name
            && self.ty.lineage() == other.ty.lineage()
            && self.state == other.state
    }
}

/// Reinterpret `instance` as a value of `target` without constructing it.
///
/// Every stored field is copied; fields only `target` declares take their
/// defaults. This assumes `target`'s construction has no side effects that
/// later behavior depends on: a target field without a default is an error,
/// as is source state the target would not keep.
pub fn retype(instance: &Instance, target: &Arc<ComposedType>) -> std::result::Result<Instance, RetypeError> {
    let source = instance.ty();
    if source.lineage() != target.lineage() {
        return Err(RetypeError::Incompatible {
            from: source.name.clone(),
            to: target.name.clone(),
        });
    }

    let fields = target.fields();
    if let Some(key) = instance.state.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
        return Err(RetypeError::WouldDropState {
            ty: target.name.clone(),
            field: key.clone(),
        });
    }

    let mut state = State::new();
    for field in fields {
        let value = match (instance.state.get(&field.name), field.default) {
            (Some(value), _) => value.clone(),
            (None, Some(default)) => default,
            (None, None) => {
                return Err(RetypeError::NotDefaultable {
                    ty: target.name.clone(),
                    field: field.name,
                })
            }
        };
        state.insert(field.name, value);
    }

    Ok(Instance {
        ty: Arc::clone(target),
        state,
    })
}

/// Take a string option.
pub fn take_str(options: &mut Options, key: &str) -> Result<Option<String>> {
    match options.take(key) {
        None => Ok(None),
        Some(Value::Str(s)) => Ok(Some(s)),
        Some(other) => Err(TypeError::WrongType {
            field: key.to_string(),
            expected: "str",
            got: other.type_name(),
        }),
    }
}
