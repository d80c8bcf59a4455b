use crate::error::LensError;
use crate::lens::Lens;
use crate::lenses;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lenses by module name.
///
/// Lookups accept the module name (`Hosts`), the lens name (`Hosts.lns`) and
/// the `@Hosts` form used by transforms.
#[derive(Debug, Default, Clone)]
pub struct LensRegistry {
    lenses: BTreeMap<String, Arc<dyn Lens>>,
}

impl LensRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for lens in lenses::builtin() {
            registry.register(lens);
        }
        registry
    }

    /// Adds `lens`, replacing any lens registered under the same name.
    pub fn register(&mut self, lens: Arc<dyn Lens>) {
        log::trace!("registering lens {}", lens.name());
        self.lenses.insert(lens.name().to_string(), lens);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Lens>, LensError> {
        self.lenses
            .get(module_name(name))
            .cloned()
            .ok_or_else(|| LensError::Unknown(name.to_string()))
    }

    /// Registered lenses, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Lens>> {
        self.lenses.values()
    }
}

fn module_name(name: &str) -> &str {
    let name = name.trim();
    let name = name.strip_prefix('@').unwrap_or(name);
    name.strip_suffix(".lns").unwrap_or(name)
}
