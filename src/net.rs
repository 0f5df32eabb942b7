//! Base environment: places, transitions and nets as plain data.
//!
//! ```text
//! <net id="n">
//!  <place id="p"><initialMarking><object type="int">1</object></initialMarking></place>
//!  <transition id="t"><guard><object type="str">True</object></guard></transition>
//!  <arc source="p" target="t"><inscription>...</inscription></arc>
//! </net>
//! ```

use std::sync::OnceLock;

use graft_tree::Tree;

use crate::codec::{self, CodecError, Decoder, Encoder};
use crate::environment::Environment;
use crate::types::{self, take_str, ComposedType, Field, Instance, Layer, Scope, State, TypeError};
use crate::value::{Options, Value};

pub const PLACE: &str = "Place";
pub const TRANSITION: &str = "Transition";
pub const PETRI_NET: &str = "PetriNet";

/// The base types, with no extension applied.
///
/// Every call returns the same types, so compositions over the base
/// environment share the composer's cache.
pub fn environment() -> Environment {
    static BASE: OnceLock<Environment> = OnceLock::new();
    BASE.get_or_init(|| {
        Environment::new([
            ComposedType::define(PLACE, "place", Scope::Base, PlaceLayer),
            ComposedType::define(TRANSITION, "transition", Scope::Base, TransitionLayer),
            ComposedType::define(PETRI_NET, "net", Scope::Base, NetLayer),
        ])
    })
    .clone()
}

pub fn place(env: &Environment, name: &str, tokens: impl Into<Value>) -> types::Result<Instance> {
    env.construct(PLACE, Options::named(name).with("tokens", tokens))
}

pub fn transition(env: &Environment, name: &str) -> types::Result<Instance> {
    env.construct(TRANSITION, Options::named(name))
}

pub fn net(env: &Environment, name: &str) -> types::Result<Instance> {
    env.construct(PETRI_NET, Options::named(name))
}

fn take_name(options: &mut Options, state: &mut State) -> types::Result<()> {
    if let Some(name) = take_str(options, "name")? {
        state.insert("name".into(), Value::Str(name));
    }
    Ok(())
}

fn name_of(instance: &Instance) -> types::Result<&str> {
    let name = instance.require("name")?;
    name.as_str().ok_or_else(|| TypeError::WrongType {
        field: "name".into(),
        expected: "str",
        got: name.type_name(),
    })
}

fn load_name(tree: &Tree, state: &mut State) -> codec::Result<()> {
    state.insert("name".into(), Value::from(tree.attr("id")?));
    Ok(())
}

#[derive(Debug)]
struct PlaceLayer;

impl Layer for PlaceLayer {
    fn fields(&self) -> Vec<Field> {
        vec![Field::required("name"), Field::optional("tokens", 0)]
    }

    fn init(&self, options: &mut Options, state: &mut State) -> types::Result<()> {
        take_name(options, state)?;
        if let Some(tokens) = options.take("tokens") {
            state.insert("tokens".into(), tokens);
        }
        Ok(())
    }

    fn dump(&self, instance: &Instance, tree: &mut Tree, encoder: &mut Encoder) -> codec::Result<()> {
        tree.set_attr("id", name_of(instance)?);
        let marking = encoder.encode(instance.require("tokens")?)?;
        tree.add_child(Tree::new("initialMarking").with_child(marking));
        Ok(())
    }

    fn load(&self, tree: &Tree, state: &mut State, decoder: &mut Decoder<'_>) -> codec::Result<()> {
        load_name(tree, state)?;
        let tokens = decoder.decode_wrapped(tree.child("initialMarking")?)?;
        state.insert("tokens".into(), tokens);
        Ok(())
    }
}

#[derive(Debug)]
struct TransitionLayer;

impl Layer for TransitionLayer {
    fn fields(&self) -> Vec<Field> {
        vec![Field::required("name"), Field::optional("guard", "True")]
    }

    fn init(&self, options: &mut Options, state: &mut State) -> types::Result<()> {
        take_name(options, state)?;
        if let Some(guard) = take_str(options, "guard")? {
            state.insert("guard".into(), Value::Str(guard));
        }
        Ok(())
    }

    fn dump(&self, instance: &Instance, tree: &mut Tree, encoder: &mut Encoder) -> codec::Result<()> {
        tree.set_attr("id", name_of(instance)?);
        let guard = encoder.encode(instance.require("guard")?)?;
        tree.add_child(Tree::new("guard").with_child(guard));
        Ok(())
    }

    fn load(&self, tree: &Tree, state: &mut State, decoder: &mut Decoder<'_>) -> codec::Result<()> {
        load_name(tree, state)?;
        let guard = decoder.decode_wrapped(tree.child("guard")?)?;
        state.insert("guard".into(), guard);
        Ok(())
    }
}

#[derive(Debug)]
struct NetLayer;

impl Layer for NetLayer {
    fn fields(&self) -> Vec<Field> {
        vec![
            Field::required("name"),
            Field::optional("places", Value::List(Vec::new())),
            Field::optional("transitions", Value::List(Vec::new())),
            Field::optional("arcs", Value::List(Vec::new())),
        ]
    }

    fn init(&self, options: &mut Options, state: &mut State) -> types::Result<()> {
        take_name(options, state)
    }

    fn dump(&self, instance: &Instance, tree: &mut Tree, encoder: &mut Encoder) -> codec::Result<()> {
        tree.set_attr("id", name_of(instance)?);
        for field in ["places", "transitions"] {
            for node in seq(instance, field)? {
                tree.add_child(encoder.encode(node)?);
            }
        }
        for arc in seq(instance, "arcs")? {
            let (source, target, inscription) = match arc.as_seq() {
                Some([Value::Str(source), Value::Str(target), inscription]) => {
                    (source, target, inscription)
                }
                _ => {
                    return Err(CodecError::Serialization(format!(
                        "malformed arc {:?}",
                        arc
                    )))
                }
            };
            tree.add_child(
                Tree::new("arc")
                    .with_attr("source", source.as_str())
                    .with_attr("target", target.as_str())
                    .with_child(Tree::new("inscription").with_child(encoder.encode(inscription)?)),
            );
        }
        Ok(())
    }

    fn load(&self, tree: &Tree, state: &mut State, decoder: &mut Decoder<'_>) -> codec::Result<()> {
        load_name(tree, state)?;
        for (tag, field) in [("place", "places"), ("transition", "transitions")] {
            let nodes = tree
                .children_named(tag)
                .map(|child| decoder.decode(child))
                .collect::<codec::Result<Vec<_>>>()?;
            state.insert(field.into(), Value::List(nodes));
        }
        let mut arcs = Vec::new();
        for arc in tree.children_named("arc") {
            arcs.push(Value::Tuple(vec![
                Value::from(arc.attr("source")?),
                Value::from(arc.attr("target")?),
                decoder.decode_wrapped(arc.child("inscription")?)?,
            ]));
        }
        state.insert("arcs".into(), Value::List(arcs));
        Ok(())
    }
}

fn seq<'a>(instance: &'a Instance, field: &str) -> types::Result<&'a [Value]> {
    let value = instance.require(field)?;
    value.as_seq().ok_or_else(|| TypeError::WrongType {
        field: field.to_string(),
        expected: "list",
        got: value.type_name(),
    })
}

fn list_mut<'a>(instance: &'a mut Instance, field: &str) -> types::Result<&'a mut Vec<Value>> {
    match instance.field_mut(field)? {
        Value::List(items) => Ok(items),
        other => Err(TypeError::WrongType {
            field: field.to_string(),
            expected: "list",
            got: other.type_name(),
        }),
    }
}

/// Building and querying net instances.
pub trait Net {
    fn add_place(&mut self, place: Instance) -> types::Result<()>;
    fn add_transition(&mut self, transition: Instance) -> types::Result<()>;
    fn add_arc(&mut self, source: &str, target: &str, inscription: impl Into<Value>) -> types::Result<()>;
    fn places(&self) -> types::Result<Vec<&Instance>>;
    fn transitions(&self) -> types::Result<Vec<&Instance>>;
    fn node_mut(&mut self, name: &str) -> types::Result<&mut Instance>;

    /// Remove the node called `name` together with its arcs.
    fn remove_node(&mut self, name: &str) -> types::Result<Instance>;

    /// Rename a node, arcs included.
    fn rename_node(&mut self, old: &str, new: &str) -> types::Result<()>;

    /// Place or transition called `name`.
    fn node(&self, name: &str) -> Option<&Instance> {
        let places = self.places().ok()?;
        let transitions = self.transitions().ok()?;
        places
            .into_iter()
            .chain(transitions)
            .find(|node| node.name() == Some(name))
    }
}

fn objects<'a>(instance: &'a Instance, field: &str) -> types::Result<Vec<&'a Instance>> {
    seq(instance, field)?
        .iter()
        .map(|value| {
            value.as_object().ok_or_else(|| TypeError::WrongType {
                field: field.to_string(),
                expected: "object",
                got: value.type_name(),
            })
        })
        .collect()
}

impl Net for Instance {
    fn add_place(&mut self, place: Instance) -> types::Result<()> {
        list_mut(self, "places")?.push(Value::Object(place));
        Ok(())
    }

    fn add_transition(&mut self, transition: Instance) -> types::Result<()> {
        list_mut(self, "transitions")?.push(Value::Object(transition));
        Ok(())
    }

    fn add_arc(&mut self, source: &str, target: &str, inscription: impl Into<Value>) -> types::Result<()> {
        list_mut(self, "arcs")?.push(Value::Tuple(vec![
            Value::from(source),
            Value::from(target),
            inscription.into(),
        ]));
        Ok(())
    }

    fn places(&self) -> types::Result<Vec<&Instance>> {
        objects(self, "places")
    }

    fn transitions(&self) -> types::Result<Vec<&Instance>> {
        objects(self, "transitions")
    }

    fn node_mut(&mut self, name: &str) -> types::Result<&mut Instance> {
        let (field, index) = locate(self, name)?;
        match &mut list_mut(self, field)?[index] {
            Value::Object(node) => Ok(node),
            other => Err(TypeError::WrongType {
                field: field.to_string(),
                expected: "object",
                got: other.type_name(),
            }),
        }
    }

    fn remove_node(&mut self, name: &str) -> types::Result<Instance> {
        let (field, index) = locate(self, name)?;
        let node = list_mut(self, field)?.remove(index);
        list_mut(self, "arcs")?.retain(|arc| {
            !matches!(arc.as_seq(), Some([source, target, _]) if source.as_str() == Some(name) || target.as_str() == Some(name))
        });
        match node {
            Value::Object(node) => Ok(node),
            other => Err(TypeError::WrongType {
                field: field.to_string(),
                expected: "object",
                got: other.type_name(),
            }),
        }
    }

    fn rename_node(&mut self, old: &str, new: &str) -> types::Result<()> {
        if old == new {
            return locate(self, old).map(|_| ());
        }
        if self.node(new).is_some() {
            return Err(TypeError::DuplicateNode(new.to_string()));
        }
        self.node_mut(old)?.set("name", new)?;
        for arc in list_mut(self, "arcs")?.iter_mut() {
            if let Value::Tuple(ends) | Value::List(ends) = arc {
                for end in ends.iter_mut().take(2) {
                    if end.as_str() == Some(old) {
                        *end = Value::from(new);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Field and index of the node called `name`.
fn locate(net: &Instance, name: &str) -> types::Result<(&'static str, usize)> {
    for field in ["places", "transitions"] {
        if let Some(index) = objects(net, field)?.iter().position(|node| node.name() == Some(name)) {
            return Ok((field, index));
        }
    }
    Err(TypeError::UnknownNode(name.to_string()))
}
