//! Extension composition
//!
//! The [`Composer`] turns an ordered list of extension requests into an
//! [`Environment`]. For each request, in order:
//!
//! 1. **Skip** it if the environment already has it applied
//! 2. **Apply dependencies** first, depth-first; a cycle is an error
//! 3. **Check conflicts** in both directions against the applied set
//! 4. **Extend** the running environment and validate what came back
//! 5. **Record** the extension in the environment's provenance
//!
//! # Example
//!
//! ```ignore
//! use graft::{net, Composer};
//!
//! let env = Composer::global().compose(["status", "ops"], &net::environment())?;
//! assert_eq!(env.provenance(), ["status", "clusters", "ops"]);
//! ```

mod catalog;
mod error;

pub use catalog::{Catalog, DEFAULT_PREFIX};
pub use error::{ComposeError, Result};

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::environment::{Binding, EnvHash, Environment};
use crate::extension::{Extension, ExtensionRef};
use crate::types::{ComposedType, Scope};

/// Base fingerprint, base type identities, canonical requested names.
type CacheKey = (EnvHash, Vec<usize>, Vec<String>);

/// Identity of the exact types in `env`. Cached environments keep these
/// types alive, so an address cannot be reused while its entry exists.
fn type_identities(env: &Environment) -> Vec<usize> {
    env.types().map(|ty| Arc::as_ptr(ty) as usize).collect()
}

/// Builds environments from extension requests.
pub struct Composer {
    catalog: Catalog,
    cache: Mutex<HashMap<CacheKey, Environment>>,
}

impl Composer {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// A composer over [`Catalog::builtin`].
    pub fn builtin() -> Self {
        Self::new(Catalog::builtin())
    }

    /// The process-wide composer shared by [`crate::dumps`] and
    /// [`crate::loads`].
    pub fn global() -> Arc<Composer> {
        static GLOBAL: OnceLock<Arc<Composer>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Composer::builtin())))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Compose `requested` on top of `base`.
    ///
    /// Requests made only of names are memoized per base environment.
    pub fn compose<I, R>(&self, requested: I, base: &Environment) -> Result<Environment>
    where
        I: IntoIterator<Item = R>,
        R: Into<ExtensionRef>,
    {
        let requested: Vec<ExtensionRef> = requested.into_iter().map(Into::into).collect();
        let key = requested
            .iter()
            .map(|r| r.as_name().map(|n| self.catalog.canonical(n)))
            .collect::<Option<Vec<_>>>()
            .map(|names| (base.fingerprint(), type_identities(base), names));

        if let Some(key) = &key {
            if let Some(env) = self.cache.lock().get(key) {
                trace!(requested = ?key.2, "environment cache hit");
                return Ok(env.clone());
            }
        }

        let mut env = base.clone();
        for request in requested {
            let ext = match request {
                ExtensionRef::Name(name) => self.catalog.resolve(&name)?,
                ExtensionRef::Resolved(ext) => ext,
            };
            env = self.apply(ext, env, &mut Vec::new())?;
        }

        if let Some(key) = key {
            self.cache.lock().entry(key).or_insert_with(|| env.clone());
        }
        Ok(env)
    }

    /// Compose a single extension on top of `base`.
    pub fn compose_one(&self, request: impl Into<ExtensionRef>, base: &Environment) -> Result<Environment> {
        self.compose([request.into()], base)
    }

    /// Number of memoized environments.
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    fn apply(
        &self,
        ext: Arc<dyn Extension>,
        env: Environment,
        stack: &mut Vec<String>,
    ) -> Result<Environment> {
        let name = ext.name().to_string();
        if env.is_applied(&name) {
            return Ok(env);
        }
        if let Some(start) = stack.iter().position(|n| *n == name) {
            let mut cycle = stack[start..].to_vec();
            cycle.push(name);
            return Err(ComposeError::DependencyCycle { cycle });
        }

        stack.push(name.clone());
        let mut env = env;
        for dep in ext.depends() {
            let dep = self.catalog.resolve(&dep)?;
            env = self.apply(dep, env, stack)?;
        }
        stack.pop();

        let conflicts: BTreeSet<String> = ext
            .conflicts()
            .iter()
            .map(|c| self.catalog.canonical(c))
            .collect();
        let mut conflicting: BTreeSet<String> = conflicts
            .iter()
            .filter(|c| env.is_applied(c))
            .cloned()
            .collect();
        for binding in env.bindings() {
            if binding.conflicts.contains(&name) {
                conflicting.insert(binding.extension.clone());
            }
        }
        if !conflicting.is_empty() {
            return Err(ComposeError::Conflict {
                extension: name,
                conflicting: conflicting.into_iter().collect(),
            });
        }

        let types = ext.extend(&env)?;
        validate(&name, &env, &types)?;

        let mut requires = env.provenance().to_vec();
        requires.push(name.clone());
        let binding = Binding {
            extension: name.clone(),
            conflicts,
            types: types.iter().map(|t| t.name().to_string()).collect(),
        };
        debug!(extension = %name, types = ?binding.types, "applied extension");

        let types = types
            .into_iter()
            .map(|ty| ty.stamped(requires.clone()))
            .collect();
        Ok(env.with_binding(binding, types))
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Check that `extend` returned subtypes of current types or new types of
/// the extension's own.
fn validate(name: &str, env: &Environment, types: &[ComposedType]) -> Result<()> {
    let malformed = |message: String| ComposeError::MalformedDeclaration {
        extension: name.to_string(),
        message,
    };

    if types.is_empty() {
        return Err(malformed("extend returned no types".into()));
    }

    let mut seen = BTreeSet::new();
    for ty in types {
        if !seen.insert(ty.name()) {
            return Err(malformed(format!("type '{}' returned twice", ty.name())));
        }
        let extended_here = ty.provenance().last().is_some_and(|p| p == name);
        match env.get(ty.name()) {
            Some(current) => {
                if !(extended_here && ty.is_subtype_of(current)) {
                    return Err(malformed(format!(
                        "'{}' is not an extension of the current type",
                        ty.name()
                    )));
                }
            }
            None => {
                let own_scope = *ty.scope() == Scope::Extension(name.to_string());
                let derived = extended_here
                    && ty
                        .parent()
                        .is_some_and(|p| env.types().any(|t| p.is_subtype_of(t)));
                if !(own_scope || derived) {
                    return Err(malformed(format!(
                        "'{}' is unrelated to the environment",
                        ty.name()
                    )));
                }
            }
        }
    }
    Ok(())
}
