//! BigBook component loader.
//!
//! Fetches the custom-components registry, resolves a component identifier
//! to a load reference, loads the module asynchronously with ordered visible
//! state, and renders it behind a fault boundary. The registry endpoint and
//! the module source are seams: [`registry::RegistrySource`] and
//! [`module::ModuleSource`].

pub mod boundary;
pub mod config;
pub mod error;
pub mod loader;
pub mod module;
pub mod observe;
pub mod registry;
pub mod resolver;
pub mod shell;

#[cfg(test)]
mod test_helpers;

pub use boundary::{BoundaryView, FaultBoundary};
pub use config::LoaderConfig;
pub use error::{ErrorCode, ErrorKind, LoadError, RenderError, Stage};
pub use loader::{ComponentLoader, InvocationToken, LoadState, LoadedModule};
pub use module::{Export, Module, ModuleSource, ModuleTable, RenderContext, Renderable};
pub use registry::{ComponentEntry, RegistryDocument, RegistrySource};
pub use shell::{ComponentShell, ShellView};
