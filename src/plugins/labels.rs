//! Free-form labels on places, transitions and nets.
//!
//! Each label is written as `<label name="..">` holding the encoded value.

use graft_tree::Tree;

use super::{dict_mut, extend_types};
use crate::codec::{self, Decoder, Encoder};
use crate::compose::ComposeError;
use crate::environment::Environment;
use crate::extension::Extension;
use crate::net::{PETRI_NET, PLACE, TRANSITION};
use crate::types::{self, ComposedType, Field, Instance, Layer, State};
use crate::value::Value;

pub const NAME: &str = "labels";

pub struct LabelsExtension;

impl Extension for LabelsExtension {
    fn name(&self) -> &str {
        NAME
    }

    fn extend(&self, env: &Environment) -> Result<Vec<ComposedType>, ComposeError> {
        extend_types(env, NAME, &[PLACE, TRANSITION, PETRI_NET], |_| LabelsLayer)
    }
}

#[derive(Debug)]
struct LabelsLayer;

impl Layer for LabelsLayer {
    fn fields(&self) -> Vec<Field> {
        vec![Field::optional("labels", Value::Dict(Vec::new()))]
    }

    fn dump(&self, instance: &Instance, tree: &mut Tree, encoder: &mut Encoder) -> codec::Result<()> {
        let Some(pairs) = instance.get("labels").and_then(Value::as_dict) else {
            return Ok(());
        };
        for (key, value) in pairs {
            let key = key.as_str().ok_or_else(|| {
                codec::CodecError::Serialization(format!("label key {:?} is not a string", key))
            })?;
            tree.add_child(
                Tree::new("label")
                    .with_attr("name", key)
                    .with_child(encoder.encode(value)?),
            );
        }
        Ok(())
    }

    fn load(&self, tree: &Tree, state: &mut State, decoder: &mut Decoder<'_>) -> codec::Result<()> {
        let mut pairs = Vec::new();
        for label in tree.children_named("label") {
            pairs.push((Value::from(label.attr("name")?), decoder.decode_wrapped(label)?));
        }
        state.insert("labels".into(), Value::dict(pairs));
        Ok(())
    }
}

pub trait Labels {
    fn label(&self, name: &str) -> Option<&Value>;
    fn has_label(&self, name: &str) -> bool {
        self.label(name).is_some()
    }
    fn set_label(&mut self, name: &str, value: impl Into<Value>) -> types::Result<()>;
    /// Label names, in insertion order.
    fn label_names(&self) -> Vec<&str>;
}

impl Labels for Instance {
    fn label(&self, name: &str) -> Option<&Value> {
        self.get("labels")?
            .as_dict()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(name))
            .map(|(_, v)| v)
    }

    fn set_label(&mut self, name: &str, value: impl Into<Value>) -> types::Result<()> {
        self.expect_extension(NAME)?;
        let pairs = dict_mut(self, "labels")?;
        let value = value.into();
        match pairs.iter_mut().find(|(k, _)| k.as_str() == Some(name)) {
            Some(slot) => slot.1 = value,
            None => pairs.push((Value::from(name), value)),
        }
        Ok(())
    }

    fn label_names(&self) -> Vec<&str> {
        self.get("labels")
            .and_then(Value::as_dict)
            .map(|pairs| pairs.iter().filter_map(|(k, _)| k.as_str()).collect())
            .unwrap_or_default()
    }
}
