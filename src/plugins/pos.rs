//! Node positions.
//!
//! Places and transitions get a `pos` field, an `(x, y)` tuple of floats
//! settable with the `pos` option, written as
//! `<graphics><position x=".." y=".."/></graphics>`.

use graft_tree::Tree;

use super::{extend_types, wrong_type};
use crate::codec::{self, CodecError, Decoder, Encoder};
use crate::compose::ComposeError;
use crate::environment::Environment;
use crate::extension::Extension;
use crate::net::{PLACE, TRANSITION};
use crate::types::{self, ComposedType, Field, Instance, Layer, State};
use crate::value::{Options, Value};

pub const NAME: &str = "pos";

pub struct PosExtension;

impl Extension for PosExtension {
    fn name(&self) -> &str {
        NAME
    }

    fn extend(&self, env: &Environment) -> Result<Vec<ComposedType>, ComposeError> {
        extend_types(env, NAME, &[PLACE, TRANSITION], |_| PosLayer)
    }
}

fn point(x: f64, y: f64) -> Value {
    Value::Tuple(vec![Value::Float(x), Value::Float(y)])
}

fn coordinates(value: &Value) -> Option<(f64, f64)> {
    match value.as_seq()? {
        [x, y] => Some((x.as_float()?, y.as_float()?)),
        _ => None,
    }
}

#[derive(Debug)]
struct PosLayer;

impl Layer for PosLayer {
    fn fields(&self) -> Vec<Field> {
        vec![Field::optional("pos", point(0.0, 0.0))]
    }

    fn init(&self, options: &mut Options, state: &mut State) -> types::Result<()> {
        if let Some(pos) = options.take("pos") {
            let (x, y) = coordinates(&pos).ok_or_else(|| wrong_type("pos", "(x, y)", &pos))?;
            state.insert("pos".into(), point(x, y));
        }
        Ok(())
    }

    fn dump(&self, instance: &Instance, tree: &mut Tree, _encoder: &mut Encoder) -> codec::Result<()> {
        let pos = instance.require("pos")?;
        let (x, y) = coordinates(pos).ok_or_else(|| wrong_type("pos", "(x, y)", pos))?;
        let position = Tree::new("position")
            .with_attr("x", format!("{:?}", x))
            .with_attr("y", format!("{:?}", y));
        match tree.children.iter_mut().find(|c| c.tag == "graphics") {
            Some(graphics) => graphics.add_child(position),
            None => tree.add_child(Tree::new("graphics").with_child(position)),
        }
        Ok(())
    }

    fn load(&self, tree: &Tree, state: &mut State, _decoder: &mut Decoder<'_>) -> codec::Result<()> {
        let Some(graphics) = tree.optional_child("graphics")? else {
            return Ok(());
        };
        let Some(position) = graphics.optional_child("position")? else {
            return Ok(());
        };
        let coordinate = |axis: &str| -> codec::Result<f64> {
            let text = position.attr(axis)?;
            text.trim().parse().map_err(|_| CodecError::InvalidLiteral {
                kind: "float",
                text: text.to_string(),
            })
        };
        state.insert("pos".into(), point(coordinate("x")?, coordinate("y")?));
        Ok(())
    }
}

pub trait Pos {
    fn pos(&self) -> Option<(f64, f64)>;
    fn move_to(&mut self, x: f64, y: f64) -> types::Result<()>;

    fn shift(&mut self, dx: f64, dy: f64) -> types::Result<()> {
        let (x, y) = self.pos().unwrap_or_default();
        self.move_to(x + dx, y + dy)
    }
}

impl Pos for Instance {
    fn pos(&self) -> Option<(f64, f64)> {
        coordinates(self.get("pos")?)
    }

    fn move_to(&mut self, x: f64, y: f64) -> types::Result<()> {
        self.expect_extension(NAME)?;
        self.set("pos", point(x, y))
    }
}
