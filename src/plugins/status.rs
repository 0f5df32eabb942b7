//! Node status.
//!
//! Defines the `Status` type (a name and an optional value) and gives
//! places and transitions a `status`, settable through the `status`
//! construction option. Nodes without a status carry the empty status,
//! whose name is `None`.

use std::sync::Arc;

use graft_tree::Tree;

use super::wrong_type;
use crate::codec::{self, Decoder, Encoder};
use crate::compose::ComposeError;
use crate::environment::Environment;
use crate::extension::Extension;
use crate::net::{Net, PLACE, TRANSITION};
use crate::types::{self, ComposedType, Field, Instance, Layer, Scope, State};
use crate::value::{Options, Value};

pub const NAME: &str = "status";
pub const STATUS: &str = "Status";
pub const TAG: &str = "status";

pub const ENTRY: &str = "entry";
pub const EXIT: &str = "exit";
pub const INTERNAL: &str = "internal";
pub const BUFFER: &str = "buffer";
pub const SAFEBUFFER: &str = "safebuffer";
pub const TICK: &str = "tick";

pub struct StatusExtension;

impl Extension for StatusExtension {
    fn name(&self) -> &str {
        NAME
    }

    fn tags(&self) -> Vec<String> {
        vec![TAG.to_string()]
    }

    fn extend(&self, env: &Environment) -> Result<Vec<ComposedType>, ComposeError> {
        let none = Arc::new(status_type()).construct(Options::new())?;
        let mut types = Vec::new();
        for name in [PLACE, TRANSITION] {
            types.push(env.require(name)?.extend(NAME, NodeStatusLayer { none: none.clone() }));
        }
        types.push(status_type());
        Ok(types)
    }
}

fn status_type() -> ComposedType {
    ComposedType::define(STATUS, TAG, Scope::Extension(NAME.to_string()), StatusLayer)
}

#[derive(Debug)]
struct StatusLayer;

impl Layer for StatusLayer {
    fn fields(&self) -> Vec<Field> {
        vec![Field::optional("name", Value::None), Field::optional("value", Value::None)]
    }

    fn init(&self, options: &mut Options, state: &mut State) -> types::Result<()> {
        for key in ["name", "value"] {
            if let Some(value) = options.take(key) {
                state.insert(key.into(), value);
            }
        }
        Ok(())
    }

    fn dump(&self, instance: &Instance, tree: &mut Tree, encoder: &mut Encoder) -> codec::Result<()> {
        let name = instance.require("name")?;
        check_name(name)?;
        tree.add_child(Tree::new("name").with_child(encoder.encode(name)?));
        let value = encoder.encode(instance.require("value")?)?;
        tree.add_child(Tree::new("value").with_child(value));
        Ok(())
    }

    fn load(&self, tree: &Tree, state: &mut State, decoder: &mut Decoder<'_>) -> codec::Result<()> {
        let node = tree.child("name")?;
        // hand-written documents may carry the name as plain text
        let name = if node.children.is_empty() {
            node.text().map_or(Value::None, Value::from)
        } else {
            decoder.decode_wrapped(node)?
        };
        check_name(&name)?;
        state.insert("name".into(), name);
        state.insert("value".into(), decoder.decode_wrapped(tree.child("value")?)?);
        Ok(())
    }
}

fn check_name(name: &Value) -> types::Result<()> {
    match name {
        Value::None | Value::Str(_) => Ok(()),
        other => Err(wrong_type("name", "str", other)),
    }
}

#[derive(Debug)]
struct NodeStatusLayer {
    none: Instance,
}

impl Layer for NodeStatusLayer {
    fn fields(&self) -> Vec<Field> {
        vec![Field::optional("status", self.none.clone())]
    }

    fn init(&self, options: &mut Options, state: &mut State) -> types::Result<()> {
        match options.take("status") {
            None => {}
            Some(Value::Object(status)) if is_status(&status) => {
                state.insert("status".into(), Value::Object(status));
            }
            Some(other) => return Err(wrong_type("status", "Status", &other)),
        }
        Ok(())
    }

    fn dump(&self, instance: &Instance, tree: &mut Tree, encoder: &mut Encoder) -> codec::Result<()> {
        tree.add_child(encoder.encode(instance.require("status")?)?);
        Ok(())
    }

    fn load(&self, tree: &Tree, state: &mut State, decoder: &mut Decoder<'_>) -> codec::Result<()> {
        if let Some(node) = tree.optional_child(TAG)? {
            state.insert("status".into(), decoder.decode(node)?);
        }
        Ok(())
    }
}

fn is_status(instance: &Instance) -> bool {
    instance.ty().lineage() == (&Scope::Extension(NAME.to_string()), STATUS)
}

/// A status named `name` with an optional `value`.
pub fn new(env: &Environment, name: &str, value: impl Into<Value>) -> types::Result<Instance> {
    env.construct(
        STATUS,
        Options::new().with("name", name).with("value", value),
    )
}

pub fn entry(env: &Environment) -> types::Result<Instance> {
    new(env, ENTRY, Value::None)
}

pub fn exit(env: &Environment) -> types::Result<Instance> {
    new(env, EXIT, Value::None)
}

pub fn internal(env: &Environment) -> types::Result<Instance> {
    new(env, INTERNAL, Value::None)
}

/// The empty status, carried by nodes nobody gave a status.
pub fn empty(env: &Environment) -> types::Result<Instance> {
    env.construct(STATUS, Options::new())
}

/// Buffer place `name`: equally named buffers are merged when nets are
/// composed, their markings added.
pub fn buffer(env: &Environment, name: impl Into<Value>) -> types::Result<Instance> {
    new(env, BUFFER, name)
}

/// Like [`buffer`], but merged places must hold the same marking.
pub fn safebuffer(env: &Environment, name: impl Into<Value>) -> types::Result<Instance> {
    new(env, SAFEBUFFER, name)
}

/// Tick transition `name`: equally named ticks are merged into one
/// transition whose guard is the conjunction of theirs.
pub fn tick(env: &Environment, name: impl Into<Value>) -> types::Result<Instance> {
    new(env, TICK, name)
}

pub trait Status {
    /// The node's status instance.
    fn status(&self) -> types::Result<&Instance>;

    fn set_status(&mut self, status: Instance) -> types::Result<()>;

    /// Name of the node's status, `None` for the empty status.
    fn status_name(&self) -> types::Result<Option<&str>> {
        Ok(self.status()?.get("name").and_then(Value::as_str))
    }
}

impl Status for Instance {
    fn status(&self) -> types::Result<&Instance> {
        self.expect_extension(NAME)?;
        let status = self.require("status")?;
        status
            .as_object()
            .ok_or_else(|| wrong_type("status", "Status", status))
    }

    fn set_status(&mut self, status: Instance) -> types::Result<()> {
        self.expect_extension(NAME)?;
        if !is_status(&status) {
            return Err(wrong_type("status", "Status", &Value::Object(status)));
        }
        self.set("status", status)
    }
}

/// Names of the nodes of `net` whose status equals `status`.
pub fn nodes_with_status(net: &Instance, status: &Instance) -> types::Result<Vec<String>> {
    let mut names = Vec::new();
    for node in net.places()?.into_iter().chain(net.transitions()?) {
        if node.status()? == status {
            names.extend(node.name().map(str::to_string));
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{net, Composer};

    fn env() -> Environment {
        Composer::builtin().compose([NAME], &net::environment()).unwrap()
    }

    #[test]
    fn test_default_status_is_empty() {
        let env = env();
        let p = net::place(&env, "p", 0).unwrap();
        assert_eq!(p.status_name().unwrap(), None);
        assert_eq!(p.status().unwrap().get("value"), Some(&Value::None));
    }

    #[test]
    fn test_status_option() {
        let env = env();
        let p = env
            .construct(PLACE, Options::named("p").with("status", entry(&env).unwrap()))
            .unwrap();
        assert_eq!(p.status_name().unwrap(), Some(ENTRY));

        let err = env
            .construct(PLACE, Options::named("p").with("status", "entry"))
            .unwrap_err();
        assert!(matches!(err, types::TypeError::WrongType { .. }));
    }

    #[test]
    fn test_set_status() {
        let env = env();
        let mut t = net::transition(&env, "t").unwrap();
        t.set_status(tick(&env, "clock").unwrap()).unwrap();
        assert_eq!(t.status_name().unwrap(), Some(TICK));
        assert_eq!(t.status().unwrap().get("value"), Some(&Value::from("clock")));

        t.set_status(empty(&env).unwrap()).unwrap();
        assert_eq!(t.status_name().unwrap(), None);

        let label = net::place(&env, "p", 0).unwrap();
        assert!(t.set_status(label).is_err());
        let mut bare = net::transition(&net::environment(), "t").unwrap();
        assert!(bare.set_status(empty(&env).unwrap()).is_err());
    }

    #[test]
    fn test_names_roundtrip_verbatim() {
        let env = env();
        let names = [Value::from(""), Value::from(" entry "), Value::from("  "), Value::None];
        for name in names {
            let status = env
                .construct(STATUS, Options::new().with("name", name.clone()))
                .unwrap();
            let text = crate::dumps(&Value::Object(status.clone())).unwrap();
            let loaded = crate::loads(&text, [NAME]).unwrap();
            assert_eq!(loaded.as_object().unwrap().get("name"), Some(&name));
            assert_eq!(loaded, Value::Object(status));
        }

        let bad = env.construct(STATUS, Options::new().with("name", 3)).unwrap();
        assert!(crate::dumps(&Value::Object(bad)).is_err());
    }

    #[test]
    fn test_duplicate_status_rejected() {
        let env = env();
        let p = env
            .construct(PLACE, Options::named("p").with("status", entry(&env).unwrap()))
            .unwrap();
        let codec = crate::Codec::default();
        let mut tree = codec.encode(&Value::Object(p)).unwrap();
        let place = tree.children.iter_mut().find(|c| c.tag == "place").unwrap();
        let status = place.child(TAG).unwrap().clone();
        place.add_child(status);
        assert!(matches!(
            codec.decode(&tree, [NAME]),
            Err(codec::CodecError::Tree(graft_tree::TreeError::MultipleChildren(_)))
        ));
    }

    #[test]
    fn test_nodes_with_status() {
        let env = env();
        let mut n = net::net(&env, "n").unwrap();
        let with = |name: &str, status: Instance| {
            env.construct(PLACE, Options::named(name).with("status", status))
        };
        n.add_place(with("a", entry(&env).unwrap()).unwrap()).unwrap();
        n.add_place(with("b", exit(&env).unwrap()).unwrap()).unwrap();
        n.add_place(with("c", entry(&env).unwrap()).unwrap()).unwrap();
        assert_eq!(
            nodes_with_status(&n, &entry(&env).unwrap()).unwrap(),
            ["a", "c"]
        );
    }
}
