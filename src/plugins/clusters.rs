//! Hierarchical clusters of net nodes.
//!
//! A `Cluster` holds a set of node names and a list of child clusters;
//! nodes are addressed by their path of child indices from the root
//! cluster. Every `PetriNet` gets a root cluster in its `clusters` field.

use std::sync::Arc;

use graft_tree::Tree;

use super::{list_mut, wrong_type};
use crate::codec::{self, Decoder, Encoder};
use crate::compose::ComposeError;
use crate::environment::Environment;
use crate::extension::Extension;
use crate::net::PETRI_NET;
use crate::types::{self, ComposedType, Field, Instance, Layer, Scope, State};
use crate::value::{Options, Value};

pub const NAME: &str = "clusters";
pub const CLUSTER: &str = "Cluster";
pub const TAG: &str = "cluster";

pub struct ClustersExtension;

impl Extension for ClustersExtension {
    fn name(&self) -> &str {
        NAME
    }

    fn tags(&self) -> Vec<String> {
        vec![TAG.to_string()]
    }

    fn extend(&self, env: &Environment) -> Result<Vec<ComposedType>, ComposeError> {
        let empty = Arc::new(cluster_type()).construct(Options::new())?;
        Ok(vec![
            env.require(PETRI_NET)?.extend(NAME, NetClustersLayer { empty }),
            cluster_type(),
        ])
    }
}

fn cluster_type() -> ComposedType {
    ComposedType::define(CLUSTER, TAG, Scope::Extension(NAME.to_string()), ClusterLayer)
}

#[derive(Debug)]
struct ClusterLayer;

impl Layer for ClusterLayer {
    fn fields(&self) -> Vec<Field> {
        vec![
            Field::optional("nodes", Value::Set(Vec::new())),
            Field::optional("children", Value::List(Vec::new())),
        ]
    }

    fn init(&self, options: &mut Options, state: &mut State) -> types::Result<()> {
        if let Some(nodes) = options.take("nodes") {
            let items = nodes.as_seq().ok_or_else(|| wrong_type("nodes", "set", &nodes))?;
            state.insert("nodes".into(), Value::set(items.iter().cloned()));
        }
        if let Some(children) = options.take("children") {
            state.insert("children".into(), children);
        }
        Ok(())
    }

    fn dump(&self, instance: &Instance, tree: &mut Tree, encoder: &mut Encoder) -> codec::Result<()> {
        for node in nodes(instance) {
            tree.add_child(Tree::new("node").with_text(node));
        }
        for child in children(instance) {
            tree.add_child(encoder.encode(&Value::Object(child.clone()))?);
        }
        Ok(())
    }

    fn load(&self, tree: &Tree, state: &mut State, decoder: &mut Decoder<'_>) -> codec::Result<()> {
        let mut nodes = Vec::new();
        let mut children = Vec::new();
        for child in &tree.children {
            if child.tag == "node" {
                nodes.push(Value::from(child.text().unwrap_or("")));
            } else {
                children.push(decoder.decode(child)?);
            }
        }
        state.insert("nodes".into(), Value::set(nodes));
        state.insert("children".into(), Value::List(children));
        Ok(())
    }
}

#[derive(Debug)]
struct NetClustersLayer {
    empty: Instance,
}

impl Layer for NetClustersLayer {
    fn fields(&self) -> Vec<Field> {
        vec![Field::optional("clusters", self.empty.clone())]
    }

    fn dump(&self, instance: &Instance, tree: &mut Tree, encoder: &mut Encoder) -> codec::Result<()> {
        tree.add_child(encoder.encode(instance.require("clusters")?)?);
        Ok(())
    }

    fn load(&self, tree: &Tree, state: &mut State, decoder: &mut Decoder<'_>) -> codec::Result<()> {
        if let Some(node) = tree.optional_child(TAG)? {
            state.insert("clusters".into(), decoder.decode(node)?);
        }
        Ok(())
    }
}

/// Node names held directly by a cluster.
pub fn nodes(cluster: &Instance) -> Vec<&str> {
    cluster
        .get("nodes")
        .and_then(Value::as_seq)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

pub fn children(cluster: &Instance) -> Vec<&Instance> {
    cluster
        .get("children")
        .and_then(Value::as_seq)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

/// Add `name` to the cluster at `path`, creating missing clusters.
pub fn add_node(cluster: &mut Instance, name: &str, path: &[usize]) -> types::Result<()> {
    let Some((&first, rest)) = path.split_first() else {
        let nodes = list_mut(cluster, "nodes")?;
        let name = Value::from(name);
        if !nodes.contains(&name) {
            nodes.push(name);
        }
        return Ok(());
    };
    let ty = Arc::clone(cluster.ty());
    let children = list_mut(cluster, "children")?;
    while children.len() <= first {
        children.push(Value::Object(ty.construct(Options::new())?));
    }
    let got = children[first].type_name();
    match children[first].as_object_mut() {
        Some(child) => add_node(child, name, rest),
        None => Err(types::TypeError::WrongType {
            field: "children".into(),
            expected: "Cluster",
            got,
        }),
    }
}

/// Path to the cluster holding `name`, if any.
pub fn path_of(cluster: &Instance, name: &str) -> Option<Vec<usize>> {
    if nodes(cluster).contains(&name) {
        return Some(Vec::new());
    }
    children(cluster).into_iter().enumerate().find_map(|(index, child)| {
        let mut path = path_of(child, name)?;
        path.insert(0, index);
        Some(path)
    })
}

pub trait Clusters {
    /// The net's root cluster.
    fn clusters(&self) -> types::Result<&Instance>;

    /// Append an empty child to the root cluster and return its index.
    fn add_cluster(&mut self) -> types::Result<usize>;

    fn add_to_cluster(&mut self, node: &str, path: &[usize]) -> types::Result<()>;

    /// Drop `node` from whichever cluster holds it.
    fn remove_from_cluster(&mut self, node: &str) -> types::Result<()>;

    fn rename_in_cluster(&mut self, old: &str, new: &str) -> types::Result<()>;

    fn cluster_path(&self, node: &str) -> Option<Vec<usize>> {
        path_of(self.clusters().ok()?, node)
    }
}

fn root_mut(net: &mut Instance) -> types::Result<&mut Instance> {
    net.expect_extension(NAME)?;
    let value = net.field_mut("clusters")?;
    let got = value.type_name();
    value.as_object_mut().ok_or(types::TypeError::WrongType {
        field: "clusters".into(),
        expected: "Cluster",
        got,
    })
}

impl Clusters for Instance {
    fn clusters(&self) -> types::Result<&Instance> {
        self.expect_extension(NAME)?;
        let value = self.require("clusters")?;
        value
            .as_object()
            .ok_or_else(|| wrong_type("clusters", "Cluster", value))
    }

    fn add_cluster(&mut self) -> types::Result<usize> {
        let root = root_mut(self)?;
        let index = children(root).len();
        add_cluster_at(root, index)?;
        Ok(index)
    }

    fn add_to_cluster(&mut self, node: &str, path: &[usize]) -> types::Result<()> {
        add_node(root_mut(self)?, node, path)
    }

    fn remove_from_cluster(&mut self, node: &str) -> types::Result<()> {
        let name = Value::from(node);
        edit_nodes(root_mut(self)?, &mut |nodes| nodes.retain(|n| *n != name))
    }

    fn rename_in_cluster(&mut self, old: &str, new: &str) -> types::Result<()> {
        let (old, new) = (Value::from(old), Value::from(new));
        edit_nodes(root_mut(self)?, &mut |nodes| {
            if let Some(slot) = nodes.iter_mut().find(|n| **n == old) {
                *slot = new.clone();
            }
        })
    }
}

/// Apply `edit` to the node set of `cluster` and of all its descendants.
fn edit_nodes(cluster: &mut Instance, edit: &mut dyn FnMut(&mut Vec<Value>)) -> types::Result<()> {
    edit(list_mut(cluster, "nodes")?);
    for child in list_mut(cluster, "children")?.iter_mut() {
        if let Some(child) = child.as_object_mut() {
            edit_nodes(child, edit)?;
        }
    }
    Ok(())
}

fn add_cluster_at(cluster: &mut Instance, index: usize) -> types::Result<()> {
    let ty = Arc::clone(cluster.ty());
    let children = list_mut(cluster, "children")?;
    while children.len() <= index {
        children.push(Value::Object(ty.construct(Options::new())?));
    }
    Ok(())
}
