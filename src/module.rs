//! Code-load seam: modules, exports, and renderable units.
//!
//! DESIGN
//! ======
//! A loaded module exposes an optional default export and named exports.
//! Only `Export::Component` is renderable; any other export value is present
//! but not invocable, which the loader reports the same way as a missing
//! export. `ModuleSource` is the seam the host environment fulfils;
//! `ModuleTable` is the in-process fulfilment, an import map from load
//! reference to a module factory.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{ImportError, RenderError, UnmappablePath};
use crate::resolver::{ExportSelection, LoadReference, map_load_reference};

// =============================================================================
// RENDERABLE
// =============================================================================

/// Input handed to a unit for one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub identifier: String,
    pub props: serde_json::Value,
}

impl RenderContext {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self { identifier: identifier.into(), props: serde_json::Value::Null }
    }

    #[must_use]
    pub fn with_props(mut self, props: serde_json::Value) -> Self {
        self.props = props;
        self
    }
}

/// A unit that renders to markup and may fail, by error or by panic, while
/// doing so.
pub trait Renderable: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`RenderError`] when the unit cannot produce output.
    fn render(&self, ctx: &RenderContext) -> Result<String, RenderError>;
}

impl<F> Renderable for F
where
    F: Fn(&RenderContext) -> Result<String, RenderError> + Send + Sync,
{
    fn render(&self, ctx: &RenderContext) -> Result<String, RenderError> {
        self(ctx)
    }
}

// =============================================================================
// MODULE
// =============================================================================

#[derive(Clone)]
pub enum Export {
    Component(Arc<dyn Renderable>),
    /// A non-invocable export such as a constant or config object.
    Value(serde_json::Value),
}

impl Export {
    pub fn component(unit: impl Renderable + 'static) -> Self {
        Self::Component(Arc::new(unit))
    }

    #[must_use]
    pub fn as_renderable(&self) -> Option<Arc<dyn Renderable>> {
        match self {
            Self::Component(unit) => Some(Arc::clone(unit)),
            Self::Value(_) => None,
        }
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(_) => f.write_str("Component(..)"),
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    default: Option<Export>,
    named: BTreeMap<String, Export>,
}

impl Module {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_default(mut self, export: Export) -> Self {
        self.default = Some(export);
        self
    }

    #[must_use]
    pub fn with_named(mut self, name: impl Into<String>, export: Export) -> Self {
        self.named.insert(name.into(), export);
        self
    }

    #[must_use]
    pub fn default_export(&self) -> Option<&Export> {
        self.default.as_ref()
    }

    #[must_use]
    pub fn named_export(&self, name: &str) -> Option<&Export> {
        self.named.get(name)
    }

    #[must_use]
    pub fn export(&self, selection: &ExportSelection) -> Option<&Export> {
        match selection {
            ExportSelection::Default => self.default_export(),
            ExportSelection::Named(name) => self.named_export(name),
        }
    }

    pub fn export_names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }
}

// =============================================================================
// SOURCE
// =============================================================================

/// The code-load operation consumed by the loader.
#[async_trait]
pub trait ModuleSource: Send + Sync {
    /// Load (fetch and evaluate) the module at `reference`.
    ///
    /// # Errors
    ///
    /// Returns an [`ImportError`] when nothing is published at the reference
    /// or evaluating it fails.
    async fn load_module(&self, reference: &LoadReference) -> Result<Arc<Module>, ImportError>;
}

type ModuleFactory = Arc<dyn Fn() -> Result<Module, ImportError> + Send + Sync>;

/// In-process import map. Each load re-evaluates the registered factory.
#[derive(Default)]
pub struct ModuleTable {
    factories: HashMap<LoadReference, ModuleFactory>,
    loads: AtomicUsize,
}

impl ModuleTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: LoadReference, module: Module) {
        self.insert_factory(reference, move || Ok(module.clone()));
    }

    /// Register a module under the reference its registry path maps to.
    ///
    /// # Errors
    ///
    /// Returns [`UnmappablePath`] if `path` cannot be mapped.
    pub fn insert_path(&mut self, path: &str, module: Module) -> Result<LoadReference, UnmappablePath> {
        let reference = map_load_reference(path)?;
        self.insert(reference.clone(), module);
        Ok(reference)
    }

    pub fn insert_factory<F>(&mut self, reference: LoadReference, factory: F)
    where
        F: Fn() -> Result<Module, ImportError> + Send + Sync + 'static,
    {
        self.factories.insert(reference, Arc::new(factory));
    }

    #[must_use]
    pub fn contains(&self, reference: &LoadReference) -> bool {
        self.factories.contains_key(reference)
    }

    /// Number of loads served so far, successful or not.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModuleSource for ModuleTable {
    async fn load_module(&self, reference: &LoadReference) -> Result<Arc<Module>, ImportError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let factory = self
            .factories
            .get(reference)
            .ok_or_else(|| ImportError::Missing { reference: reference.to_string() })?;
        factory().map(Arc::new)
    }
}

#[cfg(test)]
#[path = "module_test.rs"]
mod tests;
