use indexmap::IndexMap;
use std::path::Path;

use super::{
    Adapter, ClaudeAdapter, CodexAdapter, CursorAdapter, GeminiAdapter, OpenCodeAdapter,
    WindsurfAdapter,
};
use crate::error::AppError;
use crate::settings::AppSettings;

/// Name -> adapter map, built once at startup and then only read.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: IndexMap<&'static str, Box<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in adapter rooted at `home`, honouring directory overrides.
    pub fn with_builtin(home: &Path, settings: &AppSettings) -> Result<Self, AppError> {
        let mut registry = Self::new();
        registry.register(Box::new(ClaudeAdapter::new(home, settings)))?;
        registry.register(Box::new(CodexAdapter::new(home, settings)))?;
        registry.register(Box::new(GeminiAdapter::new(home, settings)))?;
        registry.register(Box::new(CursorAdapter::new(home, settings)))?;
        registry.register(Box::new(WindsurfAdapter::new(home, settings)))?;
        registry.register(Box::new(OpenCodeAdapter::new(home, settings)))?;
        Ok(registry)
    }

    pub fn register(&mut self, adapter: Box<dyn Adapter>) -> Result<(), AppError> {
        let name = adapter.name();
        if self.adapters.contains_key(name) {
            return Err(AppError::DuplicateAdapter(name.to_string()));
        }
        log::debug!("registered adapter '{name}'");
        self.adapters.insert(name, adapter);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&dyn Adapter, AppError> {
        self.adapters
            .get(name)
            .map(|a| a.as_ref())
            .ok_or_else(|| AppError::UnknownAdapter(name.to_string()))
    }

    /// All adapters in registration order.
    pub fn all(&self) -> impl Iterator<Item = &dyn Adapter> + '_ {
        self.adapters.values().map(|a| a.as_ref())
    }

    /// Adapters whose tool is present on this machine.
    pub fn detected(&self) -> impl Iterator<Item = &dyn Adapter> + '_ {
        self.all().filter(|a| a.detect())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.adapters.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
