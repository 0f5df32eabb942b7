//! Net composition operators.
//!
//! Every operator first glues its operands side by side, each in a
//! cluster of its own. Nodes of the left operand are renamed `[x<op>]`,
//! those of the right one `[<op>x]`. Nodes sharing a buffer, safebuffer or
//! tick status are merged, and a status left on a single node renames it
//! after the operand nodes that carried it, as in `[b&b]`. The operators
//! then connect the operands through their entry and exit places:
//!
//! | operator    | op  | merged places                       | status     |
//! |-------------|-----|-------------------------------------|------------|
//! | `parallel`  | `\|` |                                     |            |
//! | `sequence`  | `&` | left exits with right entries       | internal   |
//! | `choice`    | `+` | entries together, exits together    | entry/exit |
//! | `iteration` | `*` | left entries and exits, right entry | entry      |
//!
//! Merged places add their markings; their arcs are joined, several
//! inscriptions between the same two nodes becoming one `tuple`.
//!
//! Operands may come from environments with fewer extensions; their
//! nodes are retyped into the current environment's types before being
//! copied into the result.

use super::clusters::{self, Clusters};
use super::extend_types;
use super::status::{self, Status, BUFFER, SAFEBUFFER, TICK};
use crate::compose::ComposeError;
use crate::environment::Environment;
use crate::extension::Extension;
use crate::net::{self, Net, PETRI_NET, PLACE, TRANSITION};
use crate::types::{self, ComposedType, Instance, Layer, TypeError};
use crate::value::Value;

pub const NAME: &str = "ops";

pub struct OpsExtension;

impl Extension for OpsExtension {
    fn name(&self) -> &str {
        NAME
    }

    fn depends(&self) -> Vec<String> {
        vec![clusters::NAME.to_string(), status::NAME.to_string()]
    }

    fn extend(&self, env: &Environment) -> Result<Vec<ComposedType>, ComposeError> {
        extend_types(env, NAME, &[PETRI_NET], |_| OpsLayer)
    }
}

/// Marks nets that support the operators; adds no state.
#[derive(Debug)]
struct OpsLayer;

impl Layer for OpsLayer {}

/// Parallel composition: both operands side by side.
pub fn parallel(env: &Environment, one: &Instance, two: &Instance) -> types::Result<Instance> {
    glue(env, "|", one, two)
}

/// Sequential composition: each exit place of `one` is merged with each
/// entry place of `two` into an internal place `[x&e]`.
pub fn sequence(env: &Environment, one: &Instance, two: &Instance) -> types::Result<Instance> {
    let mut result = glue(env, "&", one, two)?;
    let internal = status::internal(env)?;
    let entries = carrying(two, &status::entry(env)?)?;
    let mut merged = Vec::new();
    for x in carrying(one, &status::exit(env)?)? {
        for e in &entries {
            let sources = [format!("[{}&]", x), format!("[&{}]", e)];
            let target = format!("[{}&{}]", x, e);
            merge_places(&mut result, &target, &sources, internal.clone(), add_markings)?;
            merged.extend(sources);
        }
    }
    remove_all(&mut result, merged)?;
    Ok(result)
}

/// Choice: the entry places of both operands are merged pairwise into
/// `[l+r]`, and so are their exit places.
pub fn choice(env: &Environment, one: &Instance, two: &Instance) -> types::Result<Instance> {
    let mut result = glue(env, "+", one, two)?;
    for status in [status::entry(env)?, status::exit(env)?] {
        let right = carrying(two, &status)?;
        let mut merged = Vec::new();
        for l in carrying(one, &status)? {
            for r in &right {
                let sources = [format!("[{}+]", l), format!("[+{}]", r)];
                let target = format!("[{}+{}]", l, r);
                merge_places(&mut result, &target, &sources, status.clone(), add_markings)?;
                merged.extend(sources);
            }
        }
        remove_all(&mut result, merged)?;
    }
    Ok(result)
}

/// Iteration: `one` loops from its exits back to its entries, and `two`
/// leaves the loop. Every entry `e1` and exit `x1` of `one` is merged with
/// every entry `e2` of `two` into the entry place `[e1,x1*e2]`.
pub fn iteration(env: &Environment, one: &Instance, two: &Instance) -> types::Result<Instance> {
    let mut result = glue(env, "*", one, two)?;
    let entry = status::entry(env)?;
    let mut merged = Vec::new();
    let entries = carrying(one, &entry)?;
    let exits = carrying(one, &status::exit(env)?)?;
    let leaving = carrying(two, &entry)?;
    for e1 in &entries {
        for x1 in &exits {
            for e2 in &leaving {
                let sources = [format!("[{}*]", e1), format!("[{}*]", x1), format!("[*{}]", e2)];
                let target = format!("[{},{}*{}]", e1, x1, e2);
                merge_places(&mut result, &target, &sources, entry.clone(), add_markings)?;
                merged.extend(sources);
            }
        }
    }
    remove_all(&mut result, merged)?;
    Ok(result)
}

/// Give every node of `net` with status `old` the status `new`, or the
/// empty status.
pub fn hide(env: &Environment, net: &mut Instance, old: &Instance, new: Option<&Instance>) -> types::Result<()> {
    net.expect_extension(NAME)?;
    let new = match new {
        Some(status) => status.clone(),
        None => status::empty(env)?,
    };
    for name in carrying(net, old)? {
        net.node_mut(&name)?.set_status(new.clone())?;
    }
    Ok(())
}

/// Hide buffer `name` in a copy of `net`: nodes are renamed `[x/name]`
/// and statuses valued `name` lose their value.
pub fn hide_buffer(env: &Environment, net: &Instance, name: &str) -> types::Result<Instance> {
    net.expect_extension(NAME)?;
    let mut result = net.clone();
    let nodes: Vec<String> = result
        .places()?
        .into_iter()
        .chain(result.transitions()?)
        .filter_map(|node| node.name().map(str::to_string))
        .collect();
    for node in nodes {
        rename(&mut result, &node, &format!("[{}/{}]", node, name))?;
    }
    let hidden = Value::from(name);
    for old in statuses(&result)? {
        if let (Some(kind), Some(value)) = (old.name(), old.get("value")) {
            if *value == hidden {
                let new = status::new(env, kind, Value::None)?;
                hide(env, &mut result, &old, Some(&new))?;
            }
        }
    }
    Ok(result)
}

fn glue(env: &Environment, op: &str, one: &Instance, two: &Instance) -> types::Result<Instance> {
    let name = format!(
        "({}{}{})",
        one.name().unwrap_or_default(),
        op,
        two.name().unwrap_or_default()
    );
    let mut result = net::net(env, &name)?;
    result.expect_extension(NAME)?;
    let place_ty = env.require(PLACE)?;
    let transition_ty = env.require(TRANSITION)?;

    for (side, operand) in [one, two].into_iter().enumerate() {
        let renamed = |node: &str| {
            if side == 0 {
                format!("[{}{}]", node, op)
            } else {
                format!("[{}{}]", op, node)
            }
        };
        let slot = result.add_cluster()?;

        for place in operand.places()? {
            let old = place.name().unwrap_or_default();
            let mut copy = place.retype(place_ty)?;
            copy.set("name", renamed(old))?;
            result.add_place(copy)?;
            result.add_to_cluster(&renamed(old), &cluster_path(operand, slot, old))?;
        }
        for transition in operand.transitions()? {
            let old = transition.name().unwrap_or_default();
            let mut copy = transition.retype(transition_ty)?;
            copy.set("name", renamed(old))?;
            result.add_transition(copy)?;
            result.add_to_cluster(&renamed(old), &cluster_path(operand, slot, old))?;
        }
        for (source, target, inscription) in arcs(operand) {
            result.add_arc(&renamed(source), &renamed(target), inscription.clone())?;
        }
    }

    for status in statuses(&result)? {
        let nodes = carrying(&result, &status)?;
        // buffers and ticks without a value are never merged
        if nodes.len() > 1 && !matches!(status.get("value"), None | Some(Value::None)) {
            let target = format!("({})", nodes.join("+"));
            let merged = match status.name() {
                Some(BUFFER) => merge_places(&mut result, &target, &nodes, status.clone(), add_markings),
                Some(SAFEBUFFER) => merge_places(&mut result, &target, &nodes, status.clone(), same_markings),
                Some(TICK) => merge_transitions(&mut result, &target, &nodes, status.clone()),
                _ => Ok(false),
            }?;
            if merged {
                remove_all(&mut result, nodes)?;
            }
        }
        if let [only] = carrying(&result, &status)?.as_slice() {
            let name = format!(
                "[{}{}{}]",
                carrying(one, &status)?.join(","),
                op,
                carrying(two, &status)?.join(",")
            );
            if *only != name {
                rename(&mut result, only, &name)?;
            }
        }
    }
    Ok(result)
}

fn cluster_path(operand: &Instance, slot: usize, node: &str) -> Vec<usize> {
    let mut path = vec![slot];
    path.extend(operand.cluster_path(node).unwrap_or_default());
    path
}

fn arcs(net: &Instance) -> Vec<(&str, &str, &Value)> {
    net.get("arcs")
        .and_then(Value::as_seq)
        .unwrap_or_default()
        .iter()
        .filter_map(|arc| match arc.as_seq()? {
            [Value::Str(source), Value::Str(target), inscription] => {
                Some((source.as_str(), target.as_str(), inscription))
            }
            _ => None,
        })
        .collect()
}

/// Distinct non-empty statuses of the nodes of `net`.
fn statuses(net: &Instance) -> types::Result<Vec<Instance>> {
    let mut found: Vec<Instance> = Vec::new();
    for node in net.places()?.into_iter().chain(net.transitions()?) {
        if !node.is_extended_by(status::NAME) {
            continue;
        }
        let status = node.status()?;
        if status.name().is_some() && !found.contains(status) {
            found.push(status.clone());
        }
    }
    Ok(found)
}

/// Sorted names of the nodes of `net` with status `status`. Nodes
/// without the status extension have none.
fn carrying(net: &Instance, status: &Instance) -> types::Result<Vec<String>> {
    let mut names = Vec::new();
    for node in net.places()?.into_iter().chain(net.transitions()?) {
        if node.is_extended_by(status::NAME) && node.status()? == status {
            names.extend(node.name().map(str::to_string));
        }
    }
    names.sort();
    Ok(names)
}

fn rename(net: &mut Instance, old: &str, new: &str) -> types::Result<()> {
    net.rename_node(old, new)?;
    net.rename_in_cluster(old, new)
}

fn remove_all(net: &mut Instance, mut names: Vec<String>) -> types::Result<()> {
    names.sort();
    names.dedup();
    for name in names {
        net.remove_node(&name)?;
        net.remove_from_cluster(&name)?;
    }
    Ok(())
}

fn add_markings(target: &str, merged: &mut Instance, other: &Instance) -> types::Result<()> {
    let tokens = match (merged.require("tokens")?, other.require("tokens")?) {
        (Value::Int(a), Value::Int(b)) => Value::Int(a.saturating_add(*b)),
        (a, b) => match (a.as_seq(), b.as_seq()) {
            (Some(a), Some(b)) => Value::List(a.iter().chain(b).cloned().collect()),
            _ => return Err(TypeError::IncompatibleMarkings(target.to_string())),
        },
    };
    merged.set("tokens", tokens)
}

fn same_markings(target: &str, merged: &mut Instance, other: &Instance) -> types::Result<()> {
    if merged.require("tokens")? == other.require("tokens")? {
        Ok(())
    } else {
        Err(TypeError::IncompatibleMarkings(target.to_string()))
    }
}

fn conjoin_guards(_target: &str, merged: &mut Instance, other: &Instance) -> types::Result<()> {
    let guard = |node: &Instance| -> types::Result<String> {
        let guard = node.require("guard")?;
        guard
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| super::wrong_type("guard", "str", guard))
    };
    let conjunction = format!("({}) and ({})", guard(merged)?, guard(other)?);
    merged.set("guard", conjunction)
}

type Absorb = fn(&str, &mut Instance, &Instance) -> types::Result<()>;

fn merge_places(
    net: &mut Instance,
    target: &str,
    sources: &[String],
    status: Instance,
    absorb: Absorb,
) -> types::Result<bool> {
    let merged = merge(net, target, sources, status, absorb)?;
    net.add_place(merged)?;
    join_arcs(net, target, sources)?;
    Ok(true)
}

fn merge_transitions(net: &mut Instance, target: &str, sources: &[String], status: Instance) -> types::Result<bool> {
    let merged = merge(net, target, sources, status, conjoin_guards)?;
    net.add_transition(merged)?;
    join_arcs(net, target, sources)?;
    Ok(true)
}

/// A copy of the first of `sources` named `target`, with the others
/// absorbed into it. The sources stay in the net.
fn merge(
    net: &Instance,
    target: &str,
    sources: &[String],
    status: Instance,
    absorb: Absorb,
) -> types::Result<Instance> {
    if net.node(target).is_some() {
        return Err(TypeError::DuplicateNode(target.to_string()));
    }
    let node = |name: &String| net.node(name).ok_or_else(|| TypeError::UnknownNode(name.clone()));
    let (first, rest) = sources
        .split_first()
        .ok_or_else(|| TypeError::UnknownNode(target.to_string()))?;
    let mut merged = node(first)?.clone();
    merged.set("name", target)?;
    for name in rest {
        absorb(target, &mut merged, node(name)?)?;
    }
    merged.set_status(status)?;
    Ok(merged)
}

/// Copy the arcs of `sources` onto `target`, placed in the root cluster.
fn join_arcs(net: &mut Instance, target: &str, sources: &[String]) -> types::Result<()> {
    let end = |name: &str| {
        if sources.iter().any(|source| source == name) {
            target.to_string()
        } else {
            name.to_string()
        }
    };
    let mut joined: Vec<(String, String, Vec<Value>)> = Vec::new();
    for (source, dest, inscription) in arcs(net) {
        if end(source) == source && end(dest) == dest {
            continue;
        }
        let (source, dest) = (end(source), end(dest));
        match joined.iter_mut().find(|(s, d, _)| *s == source && *d == dest) {
            Some((_, _, labels)) => labels.push(inscription.clone()),
            None => joined.push((source, dest, vec![inscription.clone()])),
        }
    }
    for (source, dest, mut labels) in joined {
        let inscription = if labels.len() == 1 {
            labels.remove(0)
        } else {
            Value::Tuple(labels)
        };
        net.add_arc(&source, &dest, inscription)?;
    }
    net.add_to_cluster(target, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Options;
    use crate::Composer;

    fn env() -> Environment {
        Composer::builtin().compose([NAME], &net::environment()).unwrap()
    }

    fn place(env: &Environment, name: &str, tokens: i64, status: Instance) -> Instance {
        env.construct(PLACE, Options::named(name).with("tokens", tokens).with("status", status))
            .unwrap()
    }

    /// Entry `e`, exit `x`, buffer `b` and a transition `t` from `e` to `x`.
    fn basic(env: &Environment) -> Instance {
        let mut n = net::net(env, "basic").unwrap();
        n.add_place(place(env, "e", 0, status::entry(env).unwrap())).unwrap();
        n.add_place(place(env, "x", 0, status::exit(env).unwrap())).unwrap();
        n.add_place(place(env, "b", 1, status::buffer(env, "buf").unwrap())).unwrap();
        n.add_transition(net::transition(env, "t").unwrap()).unwrap();
        n.add_arc("e", "t", 1).unwrap();
        n.add_arc("t", "x", 2).unwrap();
        n
    }

    fn arc(source: &str, target: &str, inscription: i64) -> (String, String, Value) {
        (source.to_string(), target.to_string(), Value::Int(inscription))
    }

    fn owned_arcs(n: &Instance) -> Vec<(String, String, Value)> {
        arcs(n)
            .into_iter()
            .map(|(s, t, i)| (s.to_string(), t.to_string(), i.clone()))
            .collect()
    }

    #[test]
    fn test_parallel_keeps_operands_apart() {
        let base = net::environment();
        let env = env();

        let mut a = net::net(&base, "A").unwrap();
        a.add_place(net::place(&base, "p", 1).unwrap()).unwrap();
        a.add_transition(net::transition(&base, "t").unwrap()).unwrap();
        a.add_arc("p", "t", 1).unwrap();

        let mut b = net::net(&env, "B").unwrap();
        b.add_place(net::place(&env, "p", 0).unwrap()).unwrap();
        b.add_to_cluster("p", &[0]).unwrap();

        let n = parallel(&env, &a, &b).unwrap();
        assert_eq!(n.name(), Some("(A|B)"));
        assert_eq!(n.node("[p|]").unwrap().get("tokens"), Some(&Value::Int(1)));
        assert!(n.node("[|p]").is_some());
        assert!(n.node("[t|]").unwrap().is_extended_by(status::NAME));
        assert_eq!(n.cluster_path("[p|]"), Some(vec![0]));
        assert_eq!(n.cluster_path("[|p]"), Some(vec![1, 0]));
        assert_eq!(owned_arcs(&n), [arc("[p|]", "[t|]", 1)]);
    }

    #[test]
    fn test_parallel_merges_buffers() {
        let env = env();
        let n = parallel(&env, &basic(&env), &basic(&env)).unwrap();
        let buf = status::buffer(&env, "buf").unwrap();
        assert_eq!(carrying(&n, &buf).unwrap(), ["[b|b]"]);
        assert_eq!(n.node("[b|b]").unwrap().get("tokens"), Some(&Value::Int(2)));
        assert_eq!(n.cluster_path("[b|b]"), Some(vec![]));
        assert!(n.node("[b|]").is_none());
        assert_eq!(
            carrying(&n, &status::entry(&env).unwrap()).unwrap(),
            ["[e|]", "[|e]"]
        );
    }

    #[test]
    fn test_sequence() {
        let env = env();
        let n = sequence(&env, &basic(&env), &basic(&env)).unwrap();
        assert_eq!(n.name(), Some("(basic&basic)"));
        assert_eq!(
            carrying(&n, &status::internal(&env).unwrap()).unwrap(),
            ["[x&e]"]
        );
        assert_eq!(carrying(&n, &status::entry(&env).unwrap()).unwrap(), ["[e&]"]);
        assert_eq!(carrying(&n, &status::exit(&env).unwrap()).unwrap(), ["[&x]"]);
        assert!(n.node("[x&]").is_none());
        assert!(n.node("[&e]").is_none());

        let arcs = owned_arcs(&n);
        assert!(arcs.contains(&arc("[t&]", "[x&e]", 2)));
        assert!(arcs.contains(&arc("[x&e]", "[&t]", 1)));
        assert_eq!(arcs.len(), 4);
        assert_eq!(n.cluster_path("[x&e]"), Some(vec![]));
        assert_eq!(n.cluster_path("[x&]"), None);

        let buf = status::buffer(&env, "buf").unwrap();
        assert_eq!(carrying(&n, &buf).unwrap(), ["[b&b]"]);
    }

    #[test]
    fn test_choice() {
        let env = env();
        let n = choice(&env, &basic(&env), &basic(&env)).unwrap();
        assert_eq!(carrying(&n, &status::entry(&env).unwrap()).unwrap(), ["[e+e]"]);
        assert_eq!(carrying(&n, &status::exit(&env).unwrap()).unwrap(), ["[x+x]"]);

        let arcs = owned_arcs(&n);
        for t in ["[t+]", "[+t]"] {
            assert!(arcs.contains(&arc("[e+e]", t, 1)));
            assert!(arcs.contains(&arc(t, "[x+x]", 2)));
        }
        assert_eq!(arcs.len(), 4);
    }

    #[test]
    fn test_iteration() {
        let env = env();
        let n = iteration(&env, &basic(&env), &basic(&env)).unwrap();
        assert_eq!(
            carrying(&n, &status::entry(&env).unwrap()).unwrap(),
            ["[e,x*e]"]
        );
        assert_eq!(carrying(&n, &status::exit(&env).unwrap()).unwrap(), ["[*x]"]);

        let arcs = owned_arcs(&n);
        assert!(arcs.contains(&arc("[e,x*e]", "[t*]", 1)));
        assert!(arcs.contains(&arc("[t*]", "[e,x*e]", 2)));
        assert!(arcs.contains(&arc("[e,x*e]", "[*t]", 1)));
        assert_eq!(arcs.len(), 4);
    }

    #[test]
    fn test_arcs_between_the_same_nodes_are_joined() {
        let env = env();
        let mut one = net::net(&env, "one").unwrap();
        one.add_place(place(&env, "x1", 1, status::exit(&env).unwrap())).unwrap();
        one.add_place(place(&env, "x2", 2, status::exit(&env).unwrap())).unwrap();
        one.add_transition(net::transition(&env, "t").unwrap()).unwrap();
        one.add_arc("t", "x1", 1).unwrap();
        one.add_arc("t", "x2", 2).unwrap();
        let mut two = net::net(&env, "two").unwrap();
        two.add_place(place(&env, "e", 0, status::entry(&env).unwrap())).unwrap();

        let n = sequence(&env, &one, &two).unwrap();
        assert_eq!(
            carrying(&n, &status::internal(&env).unwrap()).unwrap(),
            ["[x1&e]", "[x2&e]"]
        );
        assert_eq!(n.node("[x2&e]").unwrap().get("tokens"), Some(&Value::Int(2)));

        let mut one = net::net(&env, "one").unwrap();
        one.add_place(place(&env, "e1", 1, status::entry(&env).unwrap())).unwrap();
        one.add_place(place(&env, "x1", 2, status::exit(&env).unwrap())).unwrap();
        one.add_transition(net::transition(&env, "t").unwrap()).unwrap();
        one.add_arc("e1", "t", 1).unwrap();
        one.add_arc("x1", "t", 3).unwrap();

        let n = iteration(&env, &one, &two).unwrap();
        assert_eq!(n.node("[e1,x1*e]").unwrap().get("tokens"), Some(&Value::Int(3)));
        assert_eq!(
            owned_arcs(&n),
            [(
                "[e1,x1*e]".to_string(),
                "[t*]".to_string(),
                Value::Tuple(vec![Value::Int(1), Value::Int(3)])
            )]
        );
    }

    #[test]
    fn test_hide() {
        let env = env();
        let mut n = parallel(&env, &basic(&env), &net::net(&env, "empty").unwrap()).unwrap();
        hide(&env, &mut n, &status::entry(&env).unwrap(), None).unwrap();
        assert_eq!(n.node("[e|]").unwrap().status_name().unwrap(), None);

        let anonymous = status::buffer(&env, Value::None).unwrap();
        hide(&env, &mut n, &status::buffer(&env, "buf").unwrap(), Some(&anonymous)).unwrap();
        let b = n.node("[b|]").unwrap().status().unwrap();
        assert_eq!(b.name(), Some(BUFFER));
        assert_eq!(b.get("value"), Some(&Value::None));
    }

    #[test]
    fn test_hide_buffer() {
        let env = env();
        let n = hide_buffer(&env, &basic(&env), "buf").unwrap();
        assert_eq!(n.name(), Some("basic"));
        let b = n.node("[b/buf]").unwrap().status().unwrap();
        assert_eq!(b.name(), Some(BUFFER));
        assert_eq!(b.get("value"), Some(&Value::None));
        assert_eq!(n.node("[e/buf]").unwrap().status_name().unwrap(), Some(status::ENTRY));
        assert_eq!(owned_arcs(&n)[0], arc("[e/buf]", "[t/buf]", 1));

        // hidden buffers are no longer merged
        let n = parallel(&env, &n, &n).unwrap();
        assert!(n.node("[[b/buf]|]").is_some());
        assert!(n.node("[|[b/buf]]").is_some());
    }

    #[test]
    fn test_safebuffers_need_equal_markings() {
        let env = env();
        let var = |tokens: i64| {
            let mut n = net::net(&env, "v").unwrap();
            n.add_place(place(&env, "v", tokens, status::safebuffer(&env, "var").unwrap()))
                .unwrap();
            n
        };
        let n = parallel(&env, &var(1), &var(1)).unwrap();
        assert_eq!(n.node("[v|v]").unwrap().get("tokens"), Some(&Value::Int(1)));

        let err = parallel(&env, &var(1), &var(3)).unwrap_err();
        assert!(matches!(err, TypeError::IncompatibleMarkings(_)));
    }

    #[test]
    fn test_ticks_merge_guards() {
        let env = env();
        let clock = |name: &str, guard: &str| {
            let mut n = net::net(&env, name).unwrap();
            let t = env
                .construct(
                    TRANSITION,
                    Options::named(name)
                        .with("guard", guard)
                        .with("status", status::tick(&env, "clock").unwrap()),
                )
                .unwrap();
            n.add_transition(t).unwrap();
            n
        };
        let n = parallel(&env, &clock("c1", "x==1"), &clock("c2", "y==2")).unwrap();
        let t = n.node("[c1|c2]").unwrap();
        assert_eq!(t.get("guard"), Some(&Value::from("(x==1) and (y==2)")));
        assert_eq!(n.transitions().unwrap().len(), 1);
    }

    #[test]
    fn test_needs_ops_environment() {
        let base = net::environment();
        let a = net::net(&base, "A").unwrap();
        assert!(parallel(&base, &a, &a).is_err());
        assert!(sequence(&base, &a, &a).is_err());
        assert!(hide_buffer(&base, &a, "buf").is_err());
    }
}
