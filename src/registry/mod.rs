//! Test program resolution
//!
//! Programs are found by name at run time. Loading a resource copies the
//! module's exports into the worker's registry; resolution is a lookup that
//! either yields exactly one factory or a typed error.

mod catalog;

pub use catalog::{Module, ModuleCatalog, ProgramFactory, ResourceLoadError, ResourceLoader};

use futures::future::LocalBoxFuture;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::helper::ControllerHelper;

/// A runnable test program.
///
/// `run` is started by the harness and driven on the worker's single
/// thread, so the returned future does not need to be `Send`.
pub trait TestProgram {
    fn run(
        self: Box<Self>,
        helper: ControllerHelper,
        args: Vec<String>,
    ) -> LocalBoxFuture<'static, anyhow::Result<()>>;
}

/// A test id does not name exactly one loaded program
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no test program named {0} is loaded")]
    NotFound(String),

    #[error("test program {name} is exported by several modules: {}", modules.join(", "))]
    Ambiguous { name: String, modules: Vec<String> },
}

#[derive(Clone)]
struct Export {
    module: String,
    factory: ProgramFactory,
}

/// Name → factory mapping populated by resource loading
#[derive(Clone, Default)]
pub struct Registry {
    exports: BTreeMap<String, Vec<Export>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every export of `module`
    pub fn register(&mut self, module: &Module) {
        for (name, factory) in module.exports() {
            let entries = self.exports.entry(name.to_string()).or_default();
            if entries.iter().any(|e| e.module == module.id()) {
                continue;
            }
            entries.push(Export {
                module: module.id().to_string(),
                factory: Arc::clone(factory),
            });
        }
    }

    /// Factory for `name`, if exactly one module exports it
    pub fn resolve(&self, name: &str) -> Result<&ProgramFactory, ResolutionError> {
        match self.exports.get(name).map(Vec::as_slice) {
            None | Some([]) => Err(ResolutionError::NotFound(name.to_string())),
            Some([export]) => Ok(&export.factory),
            Some(many) => Err(ResolutionError::Ambiguous {
                name: name.to_string(),
                modules: many.iter().map(|e| e.module.clone()).collect(),
            }),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.exports.keys().map(String::as_str).collect()
    }
}

/// Module space of one worker: everything loaded so far plus its registry.
///
/// Additive for the worker's lifetime; nothing is ever unloaded.
pub struct ModuleSpace {
    loader: Arc<dyn ResourceLoader>,
    loaded: Vec<String>,
    registry: Registry,
}

impl ModuleSpace {
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            loader,
            loaded: Vec::new(),
            registry: Registry::new(),
        }
    }

    /// Load one resource. Returns `Ok(false)` if it was already loaded.
    pub async fn load(&mut self, id: &str) -> Result<bool, ResourceLoadError> {
        if self.is_loaded(id) {
            warn!("Resource {} already loaded in this worker, skipping", id);
            return Ok(false);
        }

        let module = self.loader.fetch(id).await?;
        self.registry.register(&module);
        self.loaded.push(id.to_string());

        info!("Loaded {} ({} exports)", id, module.export_names().len());
        Ok(true)
    }

    /// Load resources in order, stopping at the first failure
    pub async fn load_all(&mut self, ids: &[String]) -> Result<(), ResourceLoadError> {
        for id in ids {
            self.load(id).await?;
        }
        Ok(())
    }

    /// Resolve `name` and build a fresh instance
    pub fn instantiate(&self, name: &str) -> Result<Box<dyn TestProgram>, ResolutionError> {
        let factory = self.registry.resolve(name)?;
        debug!("Instantiating {}", name);
        Ok(factory())
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.loaded.iter().any(|l| l == id)
    }

    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    struct Noop;

    impl TestProgram for Noop {
        fn run(
            self: Box<Self>,
            _helper: ControllerHelper,
            _args: Vec<String>,
        ) -> LocalBoxFuture<'static, anyhow::Result<()>> {
            async { Ok(()) }.boxed_local()
        }
    }

    fn catalog() -> Arc<ModuleCatalog> {
        Arc::new(
            ModuleCatalog::new()
                .with_module(Module::new("a.mod").export("Alpha", || Box::new(Noop)))
                .with_module(
                    Module::new("b.mod")
                        .export("Beta", || Box::new(Noop))
                        .export("Alpha", || Box::new(Noop)),
                ),
        )
    }

    #[tokio::test]
    async fn test_resolution_requires_loading() {
        let mut space = ModuleSpace::new(catalog());
        assert!(matches!(
            space.instantiate("Alpha"),
            Err(ResolutionError::NotFound(_))
        ));

        assert_eq!(space.load("a.mod").await, Ok(true));
        assert!(space.instantiate("Alpha").is_ok());
        assert_eq!(space.loaded(), ["a.mod".to_string()]);
    }

    #[tokio::test]
    async fn test_load_stops_at_first_failure() {
        let mut space = ModuleSpace::new(catalog());
        let ids = vec!["a.mod".to_string(), "nope.mod".to_string(), "b.mod".to_string()];

        let err = space.load_all(&ids).await.unwrap_err();
        assert_eq!(err, ResourceLoadError::NotFound("nope.mod".into()));
        assert!(space.is_loaded("a.mod"));
        assert!(!space.is_loaded("b.mod"));
    }

    #[tokio::test]
    async fn test_duplicate_export_is_ambiguous() {
        let mut space = ModuleSpace::new(catalog());
        space.load("a.mod").await.unwrap();
        space.load("b.mod").await.unwrap();

        assert!(space.instantiate("Beta").is_ok());
        match space.instantiate("Alpha") {
            Err(ResolutionError::Ambiguous { modules, .. }) => {
                assert_eq!(modules, vec!["a.mod", "b.mod"]);
            }
            _ => panic!("expected ambiguity"),
        }
    }

    #[tokio::test]
    async fn test_reload_is_skipped() {
        let mut space = ModuleSpace::new(catalog());
        assert_eq!(space.load("a.mod").await, Ok(true));
        assert_eq!(space.load("a.mod").await, Ok(false));
        assert_eq!(space.loaded().len(), 1);
        assert!(space.instantiate("Alpha").is_ok());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ResolutionError::NotFound("Missing".into()).to_string(),
            "no test program named Missing is loaded"
        );
        assert_eq!(
            ResourceLoadError::NotFound("x.mod".into()).to_string(),
            "resource not found: x.mod"
        );
    }
}
