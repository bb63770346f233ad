//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::error::{ImportError, RegistryError, RenderError};
use crate::loader::LoadedModule;
use crate::module::{Export, Module, ModuleSource, ModuleTable, RenderContext, Renderable};
use crate::registry::{ComponentEntry, RegistryDocument, RegistrySource};
use crate::resolver::{ExportSelection, LoadReference};

// =============================================================================
// REGISTRY FIXTURES
// =============================================================================

pub fn entry(id: &str, path: &str, is_default_export: bool) -> ComponentEntry {
    ComponentEntry {
        id: id.to_string(),
        name: id.to_string(),
        path: path.to_string(),
        display_name: id.to_string(),
        description: None,
        is_default_export,
        has_jsx: true,
        has_hooks: false,
        dependencies: Vec::new(),
        route: None,
        installed_at: None,
        auto_installed: true,
    }
}

/// `foo` (default export), `widget` (named `Widget`), `broken` (import fails).
pub fn sample_document() -> RegistryDocument {
    let mut widget = entry("widget", "src/x/Widget.tsx", false);
    widget.name = "Widget".into();
    RegistryDocument::from_entries([
        entry("foo", "src/x/Foo.tsx", true),
        widget,
        entry("broken", "src/x/Broken.tsx", true),
    ])
}

// =============================================================================
// MODULE FIXTURES
// =============================================================================

pub fn markup_export(text: &str) -> Export {
    let markup = format!("<p>{text}</p>");
    Export::component(move |_: &RenderContext| -> Result<String, RenderError> { Ok(markup.clone()) })
}

pub struct PanickingUnit(String);

impl Renderable for PanickingUnit {
    fn render(&self, _ctx: &RenderContext) -> Result<String, RenderError> {
        panic!("{}", self.0)
    }
}

pub fn panicking_unit(message: &str) -> PanickingUnit {
    PanickingUnit(message.to_string())
}

pub fn loaded_module(identifier: &str) -> LoadedModule {
    let unit = markup_export(identifier)
        .as_renderable()
        .expect("markup export is renderable");
    LoadedModule {
        identifier: identifier.to_string(),
        entry: entry(identifier, "src/x/Foo.tsx", true),
        reference: LoadReference::new("x/Foo"),
        export: ExportSelection::Default,
        unit,
    }
}

/// Modules for [`sample_document`].
pub fn sample_modules() -> ModuleTable {
    let mut table = ModuleTable::new();
    table.insert(LoadReference::new("x/Foo"), Module::new().with_default(markup_export("foo")));
    table.insert(LoadReference::new("x/Widget"), Module::new().with_named("Widget", markup_export("widget")));
    table.insert_factory(LoadReference::new("x/Broken"), || {
        Err(ImportError::Failed { reference: "x/Broken".into(), reason: "SyntaxError: Unexpected token".into() })
    });
    table
}

// =============================================================================
// GATED MODULE SOURCE
// =============================================================================

/// Module source whose loads for gated references wait until released.
pub struct GatedModules {
    table: ModuleTable,
    gates: Mutex<HashMap<LoadReference, Arc<Semaphore>>>,
}

impl GatedModules {
    pub fn new(table: ModuleTable) -> Self {
        Self { table, gates: Mutex::new(HashMap::new()) }
    }

    pub fn gate(&self, reference: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(LoadReference::new(reference), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, reference: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(&LoadReference::new(reference)) {
            gate.add_permits(1);
        }
    }

    pub fn load_count(&self) -> usize {
        self.table.load_count()
    }
}

#[async_trait]
impl ModuleSource for GatedModules {
    async fn load_module(&self, reference: &LoadReference) -> Result<Arc<Module>, ImportError> {
        let gate = self.gates.lock().unwrap().get(reference).cloned();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }
        self.table.load_module(reference).await
    }
}

// =============================================================================
// SWITCHABLE REGISTRY
// =============================================================================

/// Registry source whose next answer can be swapped between fetches.
pub struct SwitchableRegistry {
    current: Mutex<Result<RegistryDocument, RegistryError>>,
    fetches: AtomicUsize,
}

impl SwitchableRegistry {
    pub fn new(initial: Result<RegistryDocument, RegistryError>) -> Self {
        Self { current: Mutex::new(initial), fetches: AtomicUsize::new(0) }
    }

    pub fn set(&self, next: Result<RegistryDocument, RegistryError>) {
        *self.current.lock().unwrap() = next;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistrySource for SwitchableRegistry {
    async fn fetch_registry(&self) -> Result<RegistryDocument, RegistryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.current.lock().unwrap().clone()
    }
}

pub fn unavailable(status: u16) -> RegistryError {
    RegistryError::Unavailable { status: Some(status), reason: format!("HTTP {status}") }
}
