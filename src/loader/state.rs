//! Loader lifecycle state.

use std::fmt;
use std::sync::Arc;

use crate::error::LoadError;
use crate::module::Renderable;
use crate::registry::ComponentEntry;
use crate::resolver::{ExportSelection, LoadReference};

/// Monotonic sequence number of one invocation on one loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InvocationToken(pub(crate) u64);

impl InvocationToken {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InvocationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A successfully resolved and loaded component.
#[derive(Clone)]
pub struct LoadedModule {
    pub identifier: String,
    pub entry: ComponentEntry,
    pub reference: LoadReference,
    pub export: ExportSelection,
    pub unit: Arc<dyn Renderable>,
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("identifier", &self.identifier)
            .field("reference", &self.reference)
            .field("export", &self.export)
            .finish_non_exhaustive()
    }
}

/// Visible state of a loader. Replaced as a whole on every transition.
#[derive(Debug, Clone, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading {
        identifier: String,
        token: InvocationToken,
    },
    Ready {
        identifier: String,
        token: InvocationToken,
        module: Arc<LoadedModule>,
    },
    Failed {
        identifier: String,
        token: InvocationToken,
        error: LoadError,
    },
}

impl LoadState {
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Loading { identifier, .. } | Self::Ready { identifier, .. } | Self::Failed { identifier, .. } => {
                Some(identifier)
            }
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<InvocationToken> {
        match self {
            Self::Idle => None,
            Self::Loading { token, .. } | Self::Ready { token, .. } | Self::Failed { token, .. } => Some(*token),
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready { .. } | Self::Failed { .. })
    }

    #[must_use]
    pub fn module(&self) -> Option<&Arc<LoadedModule>> {
        match self {
            Self::Ready { module, .. } => Some(module),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&LoadError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading { .. } => "loading",
            Self::Ready { .. } => "ready",
            Self::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
