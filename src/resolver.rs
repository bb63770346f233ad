//! Module resolver: identifier lookup and load-reference mapping.
//!
//! DESIGN
//! ======
//! Resolution is a pure, exact lookup: no normalization, no case folding.
//! The registry declares source-tree paths (`src/components/bigbook/custom/
//! Foo.tsx`); the loader addresses modules relative to the source root and
//! without extension (`components/bigbook/custom/Foo`). The mapping rejects
//! anything that could escape the source root.

use std::fmt;

use crate::error::{LoadError, UnmappablePath};
use crate::registry::{ComponentEntry, RegistryDocument};

/// Root every registry path must live under.
pub const SOURCE_ROOT: &str = "src/";

/// Extensions the code-load seam knows how to address.
pub const SOURCE_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js"];

// =============================================================================
// TYPES
// =============================================================================

/// Address of a module in the loader's own addressing scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadReference(String);

impl LoadReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoadReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which export of a loaded module is the component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExportSelection {
    Default,
    Named(String),
}

impl ExportSelection {
    #[must_use]
    pub fn for_entry(entry: &ComponentEntry) -> Self {
        if entry.is_default_export { Self::Default } else { Self::Named(entry.name.clone()) }
    }
}

impl fmt::Display for ExportSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default export"),
            Self::Named(name) => write!(f, "export '{name}'"),
        }
    }
}

/// Everything the loader needs to fetch one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub entry: ComponentEntry,
    pub reference: LoadReference,
    pub export: ExportSelection,
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Look up `identifier` in the registry.
///
/// # Errors
///
/// [`LoadError::ComponentNotFound`] when the identifier is not a key of
/// `document.components`.
pub fn resolve<'a>(document: &'a RegistryDocument, identifier: &str) -> Result<&'a ComponentEntry, LoadError> {
    document
        .components
        .get(identifier)
        .ok_or_else(|| LoadError::ComponentNotFound { identifier: identifier.to_string() })
}

/// Map a registry path into a load reference.
///
/// # Errors
///
/// Returns [`UnmappablePath`] for empty or absolute paths, paths outside
/// [`SOURCE_ROOT`], relative or empty segments, and unknown extensions.
pub fn map_load_reference(path: &str) -> Result<LoadReference, UnmappablePath> {
    let fail = |reason| UnmappablePath { path: path.to_string(), reason };

    if path.is_empty() {
        return Err(fail("empty path"));
    }
    if path.contains('\\') {
        return Err(fail("backslash separator"));
    }
    if path.starts_with('/') {
        return Err(fail("absolute path"));
    }
    let rest = path.strip_prefix(SOURCE_ROOT).ok_or_else(|| fail("outside the source root"))?;

    let mut segments: Vec<&str> = rest.split('/').collect();
    if segments.iter().any(|s| s.is_empty() || *s == "." || *s == "..") {
        return Err(fail("empty or relative segment"));
    }

    let Some(file) = segments.pop() else {
        return Err(fail("empty path"));
    };
    let (stem, ext) = file.rsplit_once('.').ok_or_else(|| fail("missing extension"))?;
    if stem.is_empty() || !SOURCE_EXTENSIONS.contains(&ext) {
        return Err(fail("unsupported extension"));
    }

    segments.push(stem);
    Ok(LoadReference(segments.join("/")))
}

/// Resolve `identifier` into its entry, load reference, and export selection.
///
/// # Errors
///
/// [`LoadError::ComponentNotFound`] or [`LoadError::PathMappingError`].
pub fn resolve_component(document: &RegistryDocument, identifier: &str) -> Result<Resolution, LoadError> {
    let entry = resolve(document, identifier)?;
    let reference = map_load_reference(&entry.path).map_err(|e| LoadError::from_path(identifier, e))?;
    Ok(Resolution { export: ExportSelection::for_entry(entry), reference, entry: entry.clone() })
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
