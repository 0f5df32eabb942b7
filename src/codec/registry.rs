use std::collections::BTreeMap;
use std::sync::Arc;

use graft_tree::ROOT_TAG;

use super::{CodecError, Result, META_TAG, OBJECT_TAG};
use crate::environment::Environment;
use crate::types::ComposedType;

const RESERVED: [&str; 3] = [OBJECT_TAG, META_TAG, ROOT_TAG];

/// Tag to type dispatch table for one environment.
///
/// When several types share a tag, the one that is a subtype of all the
/// others wins. Types sharing a tag without such a most-derived member are
/// rejected rather than picked arbitrarily.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    by_tag: BTreeMap<String, Arc<ComposedType>>,
}

impl TypeRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn build(env: &Environment) -> Result<Self> {
        let mut groups: BTreeMap<&str, Vec<&Arc<ComposedType>>> = BTreeMap::new();
        for ty in env.types() {
            if RESERVED.contains(&ty.tag()) {
                return Err(CodecError::ReservedTag {
                    tag: ty.tag().to_string(),
                    ty: ty.name().to_string(),
                });
            }
            groups.entry(ty.tag()).or_default().push(ty);
        }

        let mut by_tag = BTreeMap::new();
        for (tag, types) in groups {
            let winner = types
                .iter()
                .find(|candidate| types.iter().all(|other| candidate.is_subtype_of(other)))
                .ok_or_else(|| CodecError::AmbiguousTag {
                    tag: tag.to_string(),
                    types: types.iter().map(|t| t.name().to_string()).collect(),
                })?;
            by_tag.insert(tag.to_string(), Arc::clone(*winner));
        }
        Ok(Self { by_tag })
    }

    pub fn get(&self, tag: &str) -> Option<&Arc<ComposedType>> {
        self.by_tag.get(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.by_tag.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::declare;
    use crate::types::{Layer, Scope};
    use crate::Composer;

    #[derive(Debug)]
    struct Plain;

    impl Layer for Plain {}

    fn base() -> Environment {
        Environment::new([ComposedType::define("Node", "node", Scope::Base, Plain)])
    }

    #[test]
    fn test_most_derived_wins() {
        let special = declare("special", |env| {
            Ok(vec![env.require("Node")?.derive("Special", "special", Plain)])
        })
        .build();
        let env = Composer::builtin().compose([special], &base()).unwrap();
        let registry = TypeRegistry::build(&env).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("node").unwrap().name(), "Special");
    }

    #[test]
    fn test_unrelated_types_sharing_tag() {
        let env = Environment::new([
            ComposedType::define("Node", "node", Scope::Base, Plain),
            ComposedType::define("Other", "node", Scope::Base, Plain),
        ]);
        match TypeRegistry::build(&env).unwrap_err() {
            CodecError::AmbiguousTag { tag, types } => {
                assert_eq!(tag, "node");
                assert_eq!(types, ["Node", "Other"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reserved_tag() {
        let env = Environment::new([ComposedType::define("Obj", "object", Scope::Base, Plain)]);
        assert!(matches!(
            TypeRegistry::build(&env),
            Err(CodecError::ReservedTag { .. })
        ));
    }
}
