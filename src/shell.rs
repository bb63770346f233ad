//! Presentation shell: navigation and retry over one loader.
//!
//! DESIGN
//! ======
//! The shell owns no load state of its own. It forwards navigation to the
//! loader, keeps a history stack for `back`, and turns the loader's visible
//! state into a `ShellView`. A `Ready` state is rendered through a
//! `FaultBoundary` that is mounted fresh for every new invocation token, so
//! a render failure in one load never sticks to the next.

use std::sync::Arc;

use tracing::{debug, info};

use crate::boundary::{FaultBoundary, fallback_markup};
use crate::error::ErrorCode;
use crate::loader::{ComponentLoader, InvocationToken, LoadState};
use crate::module::RenderContext;
use crate::observe::FailureSink;

pub const ROOT_CRUMB: &str = "Big Book";
pub const SECTION_CRUMB: &str = "Custom Components";

/// What the host should display right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellView {
    /// Nothing selected.
    Idle,
    Loading { identifier: String },
    Error { identifier: String, message: String, can_retry: bool },
    /// Rendered component markup, or the boundary's fallback.
    Ready { identifier: String, markup: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub label: String,
    /// Component identifier this crumb navigates to, if any.
    pub target: Option<String>,
}

struct Mounted {
    token: InvocationToken,
    boundary: FaultBoundary,
}

pub struct ComponentShell {
    loader: ComponentLoader,
    sink: Arc<dyn FailureSink>,
    history: Vec<String>,
    mounted: Option<Mounted>,
}

impl ComponentShell {
    pub fn new(loader: ComponentLoader, sink: Arc<dyn FailureSink>) -> Self {
        Self { loader, sink, history: Vec::new(), mounted: None }
    }

    #[must_use]
    pub fn loader(&self) -> &ComponentLoader {
        &self.loader
    }

    /// The identifier currently selected, if any.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Select `identifier` and start loading it.
    pub fn navigate(&mut self, identifier: &str) -> InvocationToken {
        if self.current() != Some(identifier) {
            self.history.push(identifier.to_string());
        }
        info!(%identifier, depth = self.history.len(), "navigating to component");
        self.loader.request_load(identifier)
    }

    /// Return to the previous component, reloading it. Leaving the first
    /// component returns the shell to `Idle` and starts nothing.
    pub fn back(&mut self) -> Option<InvocationToken> {
        self.history.pop();
        self.mounted = None;
        let previous = self.current()?.to_string();
        debug!(identifier = %previous, "navigating back");
        Some(self.loader.request_load(&previous))
    }

    /// Re-request the current component after a failed load.
    pub fn retry(&mut self) -> Option<InvocationToken> {
        if !matches!(self.loader.current_state(), LoadState::Failed { .. }) || self.history.is_empty() {
            return None;
        }
        self.loader.retry()
    }

    // -------------------------------------------------------------------------
    // Chrome
    // -------------------------------------------------------------------------

    /// Display name once loaded, the raw identifier before that.
    #[must_use]
    pub fn header(&self) -> Option<String> {
        let current = self.current()?;
        match self.loader.current_state() {
            LoadState::Ready { module, .. } if module.identifier == current => Some(module.entry.display_name.clone()),
            _ => Some(current.to_string()),
        }
    }

    #[must_use]
    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        let mut crumbs = vec![
            Breadcrumb { label: ROOT_CRUMB.to_string(), target: None },
            Breadcrumb { label: SECTION_CRUMB.to_string(), target: None },
        ];
        if let (Some(label), Some(current)) = (self.header(), self.current()) {
            crumbs.push(Breadcrumb { label, target: Some(current.to_string()) });
        }
        crumbs
    }

    // -------------------------------------------------------------------------
    // View
    // -------------------------------------------------------------------------

    pub fn view(&mut self) -> ShellView {
        if self.history.is_empty() {
            return ShellView::Idle;
        }
        match self.loader.current_state() {
            LoadState::Idle => ShellView::Idle,
            LoadState::Loading { identifier, .. } => ShellView::Loading { identifier },
            LoadState::Failed { identifier, error, .. } => ShellView::Error {
                identifier,
                can_retry: error.retryable(),
                message: error.to_string(),
            },
            LoadState::Ready { identifier, token, module } => {
                if self.mounted.as_ref().is_some_and(|m| m.token != token) {
                    self.mounted = None;
                }
                let sink = &self.sink;
                let mounted = self.mounted.get_or_insert_with(|| {
                    debug!(%identifier, %token, "mounting fresh boundary");
                    Mounted { token, boundary: FaultBoundary::new(identifier.clone(), Arc::clone(sink)) }
                });
                let ctx = RenderContext::new(identifier.clone());
                let markup = mounted.boundary.render_with(module.unit.as_ref(), &ctx, fallback_markup);
                ShellView::Ready { identifier, markup }
            }
        }
    }
}

#[cfg(test)]
#[path = "shell_test.rs"]
mod tests;
