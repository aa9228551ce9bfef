//! Loadable modules and where they come from

use futures::future::{self, BoxFuture};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::TestProgram;

/// Builds a fresh program instance.
pub type ProgramFactory = Arc<dyn Fn() -> Box<dyn TestProgram> + Send + Sync>;

/// A named resource could not be loaded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceLoadError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("failed to load resource {id}: {reason}")]
    Failed { id: String, reason: String },
}

/// A loadable unit exporting zero or more test programs by name
#[derive(Clone)]
pub struct Module {
    id: String,
    exports: Vec<(String, ProgramFactory)>,
}

impl Module {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            exports: Vec::new(),
        }
    }

    /// Export a program under `name`
    pub fn export<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn TestProgram> + Send + Sync + 'static,
    {
        self.exports.push((name.into(), Arc::new(factory)));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn exports(&self) -> impl Iterator<Item = (&str, &ProgramFactory)> {
        self.exports.iter().map(|(name, f)| (name.as_str(), f))
    }

    pub fn export_names(&self) -> Vec<&str> {
        self.exports.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("exports", &self.export_names())
            .finish()
    }
}

/// Source of modules keyed by resource identifier
pub trait ResourceLoader: Send + Sync {
    fn fetch<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Module, ResourceLoadError>>;
}

/// In-memory set of modules available to workers
#[derive(Clone, Debug, Default)]
pub struct ModuleCatalog {
    modules: BTreeMap<String, Module>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.insert(module);
        self
    }

    /// Add or replace a module
    pub fn insert(&mut self, module: Module) {
        self.modules.insert(module.id.clone(), module);
    }

    pub fn get(&self, id: &str) -> Option<&Module> {
        self.modules.get(id)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ResourceLoader for ModuleCatalog {
    fn fetch<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Module, ResourceLoadError>> {
        let result = self
            .modules
            .get(id)
            .cloned()
            .ok_or_else(|| ResourceLoadError::NotFound(id.to_string()));
        Box::pin(future::ready(result))
    }
}
