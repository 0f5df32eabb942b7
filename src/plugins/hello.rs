//! Nets that can greet.
//!
//! `PetriNet` accepts a `hello` option, a message in which `%s` stands for
//! the net name.

use graft_tree::Tree;

use super::extend_types;
use crate::codec::{self, Decoder, Encoder};
use crate::compose::ComposeError;
use crate::environment::Environment;
use crate::extension::Extension;
use crate::net::PETRI_NET;
use crate::types::{self, take_str, ComposedType, Field, Instance, Layer, State, TypeError};
use crate::value::{Options, Value};

pub const NAME: &str = "hello";
pub const DEFAULT_MESSAGE: &str = "Hello from %s";

pub struct HelloExtension;

impl Extension for HelloExtension {
    fn name(&self) -> &str {
        NAME
    }

    fn extend(&self, env: &Environment) -> Result<Vec<ComposedType>, ComposeError> {
        extend_types(env, NAME, &[PETRI_NET], |_| HelloLayer)
    }
}

#[derive(Debug)]
struct HelloLayer;

impl Layer for HelloLayer {
    fn fields(&self) -> Vec<Field> {
        vec![Field::optional("hello", DEFAULT_MESSAGE)]
    }

    fn init(&self, options: &mut Options, state: &mut State) -> types::Result<()> {
        if let Some(message) = take_str(options, "hello")? {
            state.insert("hello".into(), Value::Str(message));
        }
        Ok(())
    }

    fn dump(&self, instance: &Instance, tree: &mut Tree, encoder: &mut Encoder) -> codec::Result<()> {
        let message = instance.require("hello")?;
        if message.as_str().is_none() {
            return Err(wrong_type(message).into());
        }
        tree.add_child(Tree::new("hello").with_child(encoder.encode(message)?));
        Ok(())
    }

    fn load(&self, tree: &Tree, state: &mut State, decoder: &mut Decoder<'_>) -> codec::Result<()> {
        let Some(node) = tree.optional_child("hello")? else {
            return Ok(());
        };
        let message = decoder.decode_wrapped(node)?;
        if message.as_str().is_none() {
            return Err(wrong_type(&message).into());
        }
        state.insert("hello".into(), message);
        Ok(())
    }
}

fn wrong_type(message: &Value) -> TypeError {
    TypeError::WrongType {
        field: "hello".into(),
        expected: "str",
        got: message.type_name(),
    }
}

pub trait Hello {
    /// The greeting with the net name filled in.
    fn hello(&self) -> types::Result<String>;
}

impl Hello for Instance {
    fn hello(&self) -> types::Result<String> {
        self.expect_extension(NAME)?;
        let message = self.require("hello")?;
        let message = message.as_str().ok_or_else(|| wrong_type(message))?;
        Ok(message.replace("%s", self.name().unwrap_or_default()))
    }
}
