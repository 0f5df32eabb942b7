//! Composed type environments.
//!
//! An [`Environment`] is the immutable result of applying an ordered list
//! of extensions to the base types. Its provenance (the applied extension
//! names, in order) is part of its identity: it is what the codec records
//! in a document so the same environment can be rebuilt on decode.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::types::{self, ComposedType, Instance, TypeError};
use crate::value::{Options, Symbol, SymbolKind};

/// What one applied extension contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub extension: String,
    pub conflicts: BTreeSet<String>,
    /// Names of the types the extension returned.
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Environment {
    types: BTreeMap<String, Arc<ComposedType>>,
    provenance: Vec<String>,
    bindings: Vec<Binding>,
}

impl Environment {
    /// A base environment: the given types and an empty provenance.
    pub fn new(types: impl IntoIterator<Item = ComposedType>) -> Self {
        Self {
            types: types
                .into_iter()
                .map(|ty| (ty.name().to_string(), Arc::new(ty)))
                .collect(),
            provenance: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// Applied extension names, in application order.
    pub fn provenance(&self) -> &[String] {
        &self.provenance
    }

    pub fn is_applied(&self, extension: &str) -> bool {
        self.provenance.iter().any(|p| p == extension)
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ComposedType>> {
        self.types.get(name)
    }

    pub fn require(&self, name: &str) -> types::Result<&Arc<ComposedType>> {
        self.types
            .get(name)
            .ok_or_else(|| TypeError::UnknownType(name.to_string()))
    }

    /// Current types, by name.
    pub fn types(&self) -> impl Iterator<Item = &Arc<ComposedType>> {
        self.types.values()
    }

    /// Construct an instance of the named type.
    pub fn construct(&self, name: &str, options: Options) -> types::Result<Instance> {
        self.require(name)?.construct(options)
    }

    /// Environment with `binding` applied and `types` replacing their
    /// namesakes.
    pub(crate) fn with_binding(&self, binding: Binding, types: Vec<ComposedType>) -> Self {
        let mut env = self.clone();
        for ty in types {
            env.types.insert(ty.name().to_string(), Arc::new(ty));
        }
        env.provenance.push(binding.extension.clone());
        env.bindings.push(binding);
        env
    }

    /// The type a class symbol names, if it belongs to this environment.
    pub fn resolve_symbol(&self, symbol: &Symbol) -> Option<&Arc<ComposedType>> {
        if symbol.kind != SymbolKind::Class {
            return None;
        }
        self.types.values().find(|ty| ty.path() == symbol.path)
    }

    /// Content hash over the provenance and the shape of every type.
    pub fn fingerprint(&self) -> EnvHash {
        let mut hasher = EnvHasher::new().count(self.provenance.len());
        for name in &self.provenance {
            hasher = hasher.string(name);
        }
        hasher = hasher.count(self.types.len());
        for ty in self.types.values() {
            hasher = hasher.string(ty.name()).string(ty.tag()).count(ty.provenance().len());
            for ext in ty.provenance() {
                hasher = hasher.string(ext);
            }
        }
        hasher.finish()
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        self.provenance == other.provenance
            && self.types.len() == other.types.len()
            && self.types.iter().zip(&other.types).all(|((a, ta), (b, tb))| {
                a == b && ta.provenance() == tb.provenance() && ta.lineage() == tb.lineage()
            })
    }
}

/// SHA-256 fingerprint of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvHash([u8; 32]);

impl EnvHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// First 8 hex characters.
    pub fn to_short_hex(&self) -> String {
        self.0.iter().take(4).map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Display for EnvHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_short_hex())
    }
}

struct EnvHasher {
    hasher: Sha256,
}

impl EnvHasher {
    fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    fn string(mut self, s: &str) -> Self {
        self.hasher.update((s.len() as u32).to_le_bytes());
        self.hasher.update(s.as_bytes());
        self
    }

    fn count(mut self, n: usize) -> Self {
        self.hasher.update((n as u32).to_le_bytes());
        self
    }

    fn finish(self) -> EnvHash {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&self.hasher.finalize());
        EnvHash(bytes)
    }
}
