use std::sync::Arc;

use graft_tree::{Tree, ROOT_TAG};

use super::{CodecError, Limits, OpaqueRegistry, Result, TypeRegistry, OBJECT_TAG, STR_VALUE_ATTR};
use crate::environment::Environment;
use crate::value::{Symbol, SymbolKind, Value};

/// Rebuilds values from trees under one environment.
pub struct Decoder<'a> {
    env: &'a Environment,
    registry: &'a TypeRegistry,
    opaque: &'a OpaqueRegistry,
    limits: Limits,
    depth: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(
        env: &'a Environment,
        registry: &'a TypeRegistry,
        opaque: &'a OpaqueRegistry,
        limits: Limits,
    ) -> Self {
        Self {
            env,
            registry,
            opaque,
            limits,
            depth: 0,
        }
    }

    pub fn env(&self) -> &'a Environment {
        self.env
    }

    /// Decode a document root: one child is the value, several are a tuple.
    pub fn decode_document(&mut self, root: &Tree) -> Result<Value> {
        if root.tag != ROOT_TAG {
            return self.decode(root);
        }
        match root.children.as_slice() {
            [] => Err(CodecError::EmptyDocument),
            [only] => self.decode(only),
            children => Ok(Value::Tuple(
                children
                    .iter()
                    .map(|child| self.decode(child))
                    .collect::<Result<_>>()?,
            )),
        }
    }

    pub fn decode(&mut self, node: &Tree) -> Result<Value> {
        if self.depth >= self.limits.max_depth {
            return Err(CodecError::TooDeep(self.limits.max_depth));
        }
        self.depth += 1;
        let result = self.decode_inner(node);
        self.depth -= 1;
        result
    }

    /// Decode the single child of a wrapper node such as `<key>`.
    pub fn decode_wrapped(&mut self, wrapper: &Tree) -> Result<Value> {
        self.decode(wrapper.only_child()?)
    }

    fn decode_inner(&mut self, node: &Tree) -> Result<Value> {
        if node.tag == OBJECT_TAG {
            return self.decode_object(node);
        }
        let ty = match self.registry.get(&node.tag) {
            Some(ty) => Arc::clone(ty),
            None => return Err(CodecError::UnsupportedTag(node.tag.clone())),
        };
        Ok(Value::Object(ty.load(node, self)?))
    }

    fn decode_object(&mut self, node: &Tree) -> Result<Value> {
        let kind = node.attr("type")?;
        let text = node.text().unwrap_or("");
        let value = match kind {
            "NoneType" => Value::None,
            "bool" => match text.trim() {
                "True" => Value::Bool(true),
                "False" => Value::Bool(false),
                _ => return Err(invalid("bool", text)),
            },
            "int" => Value::Int(text.trim().parse().map_err(|_| invalid("int", text))?),
            "float" => Value::Float(text.trim().parse().map_err(|_| invalid("float", text))?),
            "str" => Value::Str(node.get_attr(STR_VALUE_ATTR).unwrap_or(text).to_string()),
            "list" => Value::List(self.decode_children(node)?),
            "tuple" => Value::Tuple(self.decode_children(node)?),
            "set" => Value::set(self.decode_children(node)?),
            "dict" => {
                let mut pairs = Vec::with_capacity(node.children.len());
                for item in node.children_named("item") {
                    let key = self.decode_wrapped(item.child("key")?)?;
                    let value = self.decode_wrapped(item.child("value")?)?;
                    pairs.push((key, value));
                }
                Value::dict(pairs)
            }
            "opaque" => {
                if !self.limits.allow_opaque {
                    return Err(CodecError::MalformedBlob("opaque values are disabled".into()));
                }
                Value::Opaque(self.opaque.decode(node.attr("name")?, text)?)
            }
            other => match SymbolKind::from_type_name(other) {
                Some(kind) => Value::Symbol(self.symbol(kind, node.attr("name")?)?),
                None => return Err(CodecError::UnsupportedObjectType(other.to_string())),
            },
        };
        Ok(value)
    }

    fn decode_children(&mut self, node: &Tree) -> Result<Vec<Value>> {
        node.children.iter().map(|child| self.decode(child)).collect()
    }

    fn symbol(&self, kind: SymbolKind, path: &str) -> Result<Symbol> {
        let symbol = Symbol::new(kind, path);
        if !symbol.is_native() {
            return Err(CodecError::UnknownSymbol(path.to_string()));
        }
        if kind == SymbolKind::Class && self.env.resolve_symbol(&symbol).is_none() {
            return Err(CodecError::UnknownSymbol(path.to_string()));
        }
        Ok(symbol)
    }
}

fn invalid(kind: &'static str, text: &str) -> CodecError {
    CodecError::InvalidLiteral {
        kind,
        text: text.to_string(),
    }
}
