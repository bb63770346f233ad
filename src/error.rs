//! Error taxonomy for the component loading pipeline.
//!
//! DESIGN
//! ======
//! Every failure one loader invocation can surface is a `LoadError` variant.
//! Variants carry the offending identifier so the shell can name it, and hold
//! only owned strings so a `Failed` state can be cloned out of the watch
//! channel. The leaf seams (registry fetch, code load, render) have their own
//! small error types; the loader attaches the identifier when lifting them.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR CODE
// =============================================================================

/// Stable machine-readable code plus a retry hint for a failure.
pub trait ErrorCode: fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// STAGE / KIND
// =============================================================================

/// Pipeline stage a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Resolve,
    Load,
    Render,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Resolve => "resolve",
            Self::Load => "load",
            Self::Render => "render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat classification of [`LoadError`], used in failure records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    RegistryUnavailable,
    RegistryMalformed,
    ComponentNotFound,
    PathMappingError,
    ImportFailed,
    ExportNotFound,
    RenderFailure,
}

impl ErrorKind {
    #[must_use]
    pub fn stage(self) -> Stage {
        match self {
            Self::RegistryUnavailable | Self::RegistryMalformed => Stage::Fetch,
            Self::ComponentNotFound | Self::PathMappingError => Stage::Resolve,
            Self::ImportFailed | Self::ExportNotFound => Stage::Load,
            Self::RenderFailure => Stage::Render,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegistryUnavailable => "RegistryUnavailable",
            Self::RegistryMalformed => "RegistryMalformed",
            Self::ComponentNotFound => "ComponentNotFound",
            Self::PathMappingError => "PathMappingError",
            Self::ImportFailed => "ImportFailed",
            Self::ExportNotFound => "ExportNotFound",
            Self::RenderFailure => "RenderFailure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// LEAF ERRORS
// =============================================================================

/// Failure of the registry fetch seam.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Transport failure, non-2xx status, or an explicit `success: false` body.
    #[error("registry unavailable: {reason}")]
    Unavailable { status: Option<u16>, reason: String },

    /// A 2xx body that does not have the registry document's shape.
    #[error("registry malformed: {0}")]
    Malformed(String),
}

impl ErrorCode for RegistryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "E_REGISTRY_UNAVAILABLE",
            Self::Malformed(_) => "E_REGISTRY_MALFORMED",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Unavailable { status: None | Some(429 | 500..=599), .. })
    }
}

/// A registry path that cannot be mapped into the loader's addressing scheme.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot map path '{path}': {reason}")]
pub struct UnmappablePath {
    pub path: String,
    pub reason: &'static str,
}

/// Failure of the code-load seam.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    /// Nothing is published under the reference.
    #[error("no module at '{reference}'")]
    Missing { reference: String },

    /// The module exists but evaluating or fetching it failed.
    #[error("module '{reference}' failed to load: {reason}")]
    Failed { reference: String, reason: String },
}

/// Failure raised by a renderable unit during its render phase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct RenderError(pub String);

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

// =============================================================================
// LOAD ERROR
// =============================================================================

/// Terminal failure of one loader invocation (or of one render attempt).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("fetch: registry unavailable while loading '{identifier}': {reason}")]
    RegistryUnavailable { identifier: String, status: Option<u16>, reason: String },

    #[error("fetch: registry malformed while loading '{identifier}': {reason}")]
    RegistryMalformed { identifier: String, reason: String },

    #[error("resolve: component '{identifier}' not found in registry")]
    ComponentNotFound { identifier: String },

    #[error("resolve: component '{identifier}' has unmappable path '{path}': {reason}")]
    PathMappingError { identifier: String, path: String, reason: String },

    #[error("load: import of '{reference}' for component '{identifier}' failed: {reason}")]
    ImportFailed { identifier: String, reference: String, reason: String },

    #[error("load: component '{identifier}' has no renderable {export} in '{reference}'")]
    ExportNotFound { identifier: String, reference: String, export: String },

    #[error("render: component '{identifier}' failed while rendering: {message}")]
    RenderFailure { identifier: String, message: String },
}

impl LoadError {
    /// Lift a registry fetch failure into the invocation for `identifier`.
    #[must_use]
    pub fn from_registry(identifier: &str, err: RegistryError) -> Self {
        match err {
            RegistryError::Unavailable { status, reason } => {
                Self::RegistryUnavailable { identifier: identifier.to_string(), status, reason }
            }
            RegistryError::Malformed(reason) => Self::RegistryMalformed { identifier: identifier.to_string(), reason },
        }
    }

    #[must_use]
    pub fn from_path(identifier: &str, err: UnmappablePath) -> Self {
        Self::PathMappingError { identifier: identifier.to_string(), path: err.path, reason: err.reason.to_string() }
    }

    #[must_use]
    pub fn from_import(identifier: &str, reference: &str, err: ImportError) -> Self {
        Self::ImportFailed { identifier: identifier.to_string(), reference: reference.to_string(), reason: err.to_string() }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RegistryUnavailable { .. } => ErrorKind::RegistryUnavailable,
            Self::RegistryMalformed { .. } => ErrorKind::RegistryMalformed,
            Self::ComponentNotFound { .. } => ErrorKind::ComponentNotFound,
            Self::PathMappingError { .. } => ErrorKind::PathMappingError,
            Self::ImportFailed { .. } => ErrorKind::ImportFailed,
            Self::ExportNotFound { .. } => ErrorKind::ExportNotFound,
            Self::RenderFailure { .. } => ErrorKind::RenderFailure,
        }
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.kind().stage()
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::RegistryUnavailable { identifier, .. }
            | Self::RegistryMalformed { identifier, .. }
            | Self::ComponentNotFound { identifier }
            | Self::PathMappingError { identifier, .. }
            | Self::ImportFailed { identifier, .. }
            | Self::ExportNotFound { identifier, .. }
            | Self::RenderFailure { identifier, .. } => identifier,
        }
    }
}

impl ErrorCode for LoadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::RegistryUnavailable { .. } => "E_REGISTRY_UNAVAILABLE",
            Self::RegistryMalformed { .. } => "E_REGISTRY_MALFORMED",
            Self::ComponentNotFound { .. } => "E_COMPONENT_NOT_FOUND",
            Self::PathMappingError { .. } => "E_PATH_MAPPING",
            Self::ImportFailed { .. } => "E_IMPORT_FAILED",
            Self::ExportNotFound { .. } => "E_EXPORT_NOT_FOUND",
            Self::RenderFailure { .. } => "E_RENDER_FAILURE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(
            self,
            Self::RegistryUnavailable { status: None | Some(429 | 500..=599), .. } | Self::ImportFailed { .. }
        )
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
