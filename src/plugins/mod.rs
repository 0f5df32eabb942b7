//! Built-in extensions.
//!
//! | name       | depends            | adds                                   |
//! |------------|--------------------|----------------------------------------|
//! | `hello`    |                    | net greeting                           |
//! | `labels`   |                    | labels on places, transitions and nets |
//! | `status`   |                    | `Status` type, node status             |
//! | `clusters` |                    | `Cluster` type, net clusters           |
//! | `ops`      | clusters, status   | net composition operators              |
//! | `pos`      |                    | node positions                         |

pub mod clusters;
pub mod hello;
pub mod labels;
pub mod ops;
pub mod pos;
pub mod status;

use std::sync::Arc;

use crate::compose::ComposeError;
use crate::environment::Environment;
use crate::extension::Extension;
use crate::types::{self, ComposedType, Instance, Layer, TypeError};
use crate::value::Value;

/// Every built-in extension.
pub fn all() -> Vec<Arc<dyn Extension>> {
    vec![
        Arc::new(hello::HelloExtension),
        Arc::new(labels::LabelsExtension),
        Arc::new(status::StatusExtension),
        Arc::new(clusters::ClustersExtension),
        Arc::new(ops::OpsExtension),
        Arc::new(pos::PosExtension),
    ]
}

/// Extend each of the named types with a layer built by `layer`.
fn extend_types<L, F>(
    env: &Environment,
    extension: &str,
    names: &[&str],
    mut layer: F,
) -> Result<Vec<ComposedType>, ComposeError>
where
    L: Layer + 'static,
    F: FnMut(&str) -> L,
{
    names
        .iter()
        .map(|name| Ok(env.require(name)?.extend(extension, layer(name))))
        .collect()
}

fn wrong_type(field: &str, expected: &'static str, got: &Value) -> TypeError {
    TypeError::WrongType {
        field: field.to_string(),
        expected,
        got: got.type_name(),
    }
}

fn list_mut<'a>(instance: &'a mut Instance, field: &str) -> types::Result<&'a mut Vec<Value>> {
    match instance.field_mut(field)? {
        Value::List(items) | Value::Set(items) => Ok(items),
        other => Err(wrong_type(field, "list", other)),
    }
}

fn dict_mut<'a>(instance: &'a mut Instance, field: &str) -> types::Result<&'a mut Vec<(Value, Value)>> {
    match instance.field_mut(field)? {
        Value::Dict(pairs) => Ok(pairs),
        other => Err(wrong_type(field, "dict", other)),
    }
}
