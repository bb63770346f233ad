//! Registry document model and the fetch seam.
//!
//! DESIGN
//! ======
//! The registry is a JSON document listing every installed BigBook component,
//! keyed by component identifier. It is fetched fresh on every loader
//! invocation through the `RegistrySource` trait; the HTTP client lives in
//! `http`, and `StaticRegistry` serves a fixed document for embedding and
//! tests. A cache in front of a source must be invisible to callers except
//! through the document's `version`/`lastUpdated` stamp.

pub mod http;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Version the registry server reports for an empty registry.
pub const DEFAULT_REGISTRY_VERSION: &str = "1.0.0";

// =============================================================================
// DOCUMENT
// =============================================================================

/// One installable component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentEntry {
    /// Unique key; equals this entry's key in [`RegistryDocument::components`].
    pub id: String,
    /// Export name selected when `is_default_export` is false.
    pub name: String,
    /// Source-tree relative path, e.g. `src/components/bigbook/custom/Foo.tsx`.
    pub path: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_default_export: bool,
    #[serde(default, rename = "hasJSX")]
    pub has_jsx: bool,
    #[serde(default)]
    pub has_hooks: bool,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<String>,
    #[serde(default)]
    pub auto_installed: bool,
}

/// Sidebar navigation descriptor. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub route: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Freshness pair used for cache invalidation decisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryStamp {
    pub version: String,
    pub last_updated: Option<String>,
}

/// Root registry document. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryDocument {
    pub components: BTreeMap<String, ComponentEntry>,
    #[serde(default)]
    pub routes: BTreeMap<String, String>,
    #[serde(default)]
    pub menu: Vec<MenuItem>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    DEFAULT_REGISTRY_VERSION.to_string()
}

/// A `components` key whose entry carries a different `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMismatch {
    pub key: String,
    pub id: String,
}

impl RegistryDocument {
    /// An empty registry, as served before any component is installed.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            components: BTreeMap::new(),
            routes: BTreeMap::new(),
            menu: Vec::new(),
            last_updated: None,
            version: default_version(),
        }
    }

    /// Build a document from entries, keying each by its own id.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = ComponentEntry>) -> Self {
        let mut doc = Self::empty();
        for entry in entries {
            if let Some(route) = &entry.route {
                doc.routes.insert(route.clone(), entry.id.clone());
            }
            doc.components.insert(entry.id.clone(), entry);
        }
        doc
    }

    #[must_use]
    pub fn stamp(&self) -> RegistryStamp {
        RegistryStamp { version: self.version.clone(), last_updated: self.last_updated.clone() }
    }

    /// Every key whose entry `id` differs from the key.
    #[must_use]
    pub fn key_mismatches(&self) -> Vec<KeyMismatch> {
        self.components
            .iter()
            .filter(|(key, entry)| *key != &entry.id)
            .map(|(key, entry)| KeyMismatch { key: key.clone(), id: entry.id.clone() })
            .collect()
    }

    /// Check the key/id invariant.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Malformed`] listing the mismatching keys.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let mismatches = self.key_mismatches();
        if mismatches.is_empty() {
            return Ok(());
        }
        let detail = mismatches
            .iter()
            .map(|m| format!("key '{}' has id '{}'", m.key, m.id))
            .collect::<Vec<_>>()
            .join(", ");
        Err(RegistryError::Malformed(detail))
    }
}

// =============================================================================
// SOURCE
// =============================================================================

/// The registry-fetch operation consumed by the loader.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Fetch and parse the current registry document.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unavailable`] when the transport call does not
    /// succeed, [`RegistryError::Malformed`] when the body has the wrong shape.
    async fn fetch_registry(&self) -> Result<RegistryDocument, RegistryError>;
}

/// Serves one fixed document.
#[derive(Debug, Clone)]
pub struct StaticRegistry {
    document: RegistryDocument,
}

impl StaticRegistry {
    #[must_use]
    pub fn new(document: RegistryDocument) -> Self {
        Self { document }
    }
}

#[async_trait]
impl RegistrySource for StaticRegistry {
    async fn fetch_registry(&self) -> Result<RegistryDocument, RegistryError> {
        Ok(self.document.clone())
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
