use graft_tree::Tree;
use tracing::trace;

use super::{CodecError, Limits, Result, OBJECT_TAG, STR_VALUE_ATTR};
use crate::value::Value;

/// Walks a value and builds its tree.
///
/// Besides the tree, the encoder collects the environment provenance that
/// the encoded instances require, which ends up in the document metadata.
#[derive(Debug)]
pub struct Encoder {
    limits: Limits,
    requires: Vec<String>,
    depth: usize,
}

impl Encoder {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            requires: Vec::new(),
            depth: 0,
        }
    }

    /// Extensions needed to interpret what was encoded so far.
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub fn into_requires(self) -> Vec<String> {
        self.requires
    }

    pub fn encode(&mut self, value: &Value) -> Result<Tree> {
        if self.depth >= self.limits.max_depth {
            return Err(CodecError::TooDeep(self.limits.max_depth));
        }
        self.depth += 1;
        let result = self.encode_inner(value);
        self.depth -= 1;
        result
    }

    fn encode_inner(&mut self, value: &Value) -> Result<Tree> {
        let object = Tree::new(OBJECT_TAG).with_attr("type", value.type_name());
        let tree = match value {
            Value::Object(instance) => {
                let ty = instance.ty();
                self.record(ty.requires());
                return ty.dump(instance, self);
            }
            Value::None => object,
            Value::Bool(b) => object.with_text(if *b { "True" } else { "False" }),
            Value::Int(i) => object.with_text(i.to_string()),
            Value::Float(f) => object.with_text(format!("{:?}", f)),
            // blank text does not survive the tree, blank strings go in an attribute
            Value::Str(s) if !s.is_empty() && s.trim().is_empty() => {
                object.with_attr(STR_VALUE_ATTR, s.as_str())
            }
            Value::Str(s) => object.with_text(s.as_str()),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
                let mut object = object;
                for item in items {
                    object.add_child(self.encode(item)?);
                }
                object
            }
            Value::Dict(pairs) => {
                let mut object = object;
                for (key, value) in pairs {
                    object.add_child(
                        Tree::new("item")
                            .with_child(Tree::new("key").with_child(self.encode(key)?))
                            .with_child(Tree::new("value").with_child(self.encode(value)?)),
                    );
                }
                object
            }
            Value::Symbol(symbol) => {
                if !symbol.is_native() {
                    return Err(CodecError::Serialization(format!(
                        "{} '{}' is outside the {} namespace",
                        symbol.kind.as_str(),
                        symbol.path,
                        crate::value::NAMESPACE
                    )));
                }
                object.with_attr("name", symbol.path.as_str())
            }
            Value::Opaque(opaque) => {
                if !self.limits.allow_opaque {
                    return Err(CodecError::Serialization(format!(
                        "opaque values are disabled ({})",
                        opaque.name()
                    )));
                }
                trace!(name = opaque.name(), "opaque fallback");
                object
                    .with_attr("name", opaque.name())
                    .with_text(opaque.to_json()?)
            }
        };
        Ok(tree)
    }

    /// Merge a type's requirements, keeping the first-seen order.
    fn record(&mut self, requires: &[String]) {
        if requires.starts_with(&self.requires) {
            self.requires = requires.to_vec();
            return;
        }
        for name in requires {
            if !self.requires.contains(name) {
                self.requires.push(name.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Symbol;

    fn encode(value: &Value) -> Result<Tree> {
        Encoder::new(Limits::default()).encode(value)
    }

    #[test]
    fn test_scalars() {
        let tree = encode(&Value::Int(42)).unwrap();
        assert_eq!(tree.tag, "object");
        assert_eq!(tree.get_attr("type"), Some("int"));
        assert_eq!(tree.text(), Some("42"));

        assert_eq!(encode(&Value::Bool(true)).unwrap().text(), Some("True"));
        assert_eq!(encode(&Value::Float(1.0)).unwrap().text(), Some("1.0"));
        assert_eq!(encode(&Value::None).unwrap().text(), None);
        assert_eq!(encode(&Value::None).unwrap().get_attr("type"), Some("NoneType"));
    }

    #[test]
    fn test_blank_strings_use_attribute() {
        let tree = encode(&Value::from(" \t\n")).unwrap();
        assert_eq!(tree.get_attr("value"), Some(" \t\n"));
        assert_eq!(tree.text(), None);

        let tree = encode(&Value::from(" x ")).unwrap();
        assert_eq!(tree.get_attr("value"), None);
        assert_eq!(tree.text(), Some(" x "));
        assert_eq!(encode(&Value::from("")).unwrap().get_attr("value"), None);
    }

    #[test]
    fn test_dict_items() {
        let tree = encode(&Value::dict([(Value::from("k"), Value::Int(1))])).unwrap();
        let item = tree.child("item").unwrap();
        assert_eq!(item.child("key").unwrap().only_child().unwrap().text(), Some("k"));
        assert_eq!(item.child("value").unwrap().only_child().unwrap().text(), Some("1"));
    }

    #[test]
    fn test_foreign_symbol_rejected() {
        let tree = encode(&Value::Symbol(Symbol::module("graft.net"))).unwrap();
        assert_eq!(tree.get_attr("name"), Some("graft.net"));
        assert!(matches!(
            encode(&Value::Symbol(Symbol::module("os"))),
            Err(CodecError::Serialization(_))
        ));
    }

    #[test]
    fn test_depth_limit() {
        let mut value = Value::Int(0);
        for _ in 0..10 {
            value = Value::List(vec![value]);
        }
        let limits = Limits {
            max_depth: 5,
            ..Limits::default()
        };
        assert!(matches!(
            Encoder::new(limits).encode(&value),
            Err(CodecError::TooDeep(5))
        ));
    }

    #[test]
    fn test_requires_merge() {
        let mut encoder = Encoder::new(Limits::default());
        encoder.record(&["labels".to_string()]);
        encoder.record(&["labels".to_string(), "status".to_string()]);
        encoder.record(&["pos".to_string()]);
        assert_eq!(encoder.requires(), ["labels", "status", "pos"]);
    }
}
