//! Fault isolation boundary for rendering loaded components.
//!
//! DESIGN
//! ======
//! The loader covers failures in fetching and resolving code; the boundary
//! covers failures in executing code that loaded fine. A render failure is
//! either an `Err` from the unit or a panic, caught with `catch_unwind`.
//! The first failure latches the boundary into its caught state: it is
//! reported once, later renders return the same fallback without invoking
//! the unit, and only `remount` (or a fresh boundary) clears it. Fallback
//! content is produced outside the catch, so a failing fallback propagates.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::LoadError;
use crate::loader::LoadedModule;
use crate::module::{RenderContext, Renderable};
use crate::observe::{FailureRecord, FailureSink};

/// The latched failure of a boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaughtFailure {
    pub error: LoadError,
    pub error_id: String,
}

/// Result of one render attempt through a boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryView {
    Content(String),
    Fallback(CaughtFailure),
}

pub struct FaultBoundary {
    identifier: String,
    sink: Arc<dyn FailureSink>,
    caught: Option<CaughtFailure>,
}

impl FaultBoundary {
    pub fn new(identifier: impl Into<String>, sink: Arc<dyn FailureSink>) -> Self {
        Self { identifier: identifier.into(), sink, caught: None }
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[must_use]
    pub fn caught(&self) -> Option<&CaughtFailure> {
        self.caught.as_ref()
    }

    /// Render `unit`, containing any failure it raises.
    pub fn render(&mut self, unit: &dyn Renderable, ctx: &RenderContext) -> BoundaryView {
        if let Some(caught) = &self.caught {
            return BoundaryView::Fallback(caught.clone());
        }

        let message = match panic::catch_unwind(AssertUnwindSafe(|| unit.render(ctx))) {
            Ok(Ok(markup)) => return BoundaryView::Content(markup),
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
        };

        let error = LoadError::RenderFailure { identifier: self.identifier.clone(), message };
        let record = FailureRecord::from_error(&error);
        self.sink.report(&record);

        let caught = CaughtFailure { error, error_id: record.error_id };
        self.caught = Some(caught.clone());
        BoundaryView::Fallback(caught)
    }

    pub fn render_module(&mut self, module: &LoadedModule, ctx: &RenderContext) -> BoundaryView {
        self.render(module.unit.as_ref(), ctx)
    }

    /// Render `unit`, turning a caught failure into markup with `fallback`.
    pub fn render_with<F>(&mut self, unit: &dyn Renderable, ctx: &RenderContext, fallback: F) -> String
    where
        F: FnOnce(&CaughtFailure) -> String,
    {
        match self.render(unit, ctx) {
            BoundaryView::Content(markup) => markup,
            BoundaryView::Fallback(caught) => fallback(&caught),
        }
    }

    /// Clear the caught state, as a fresh mount would.
    pub fn remount(&mut self) {
        self.caught = None;
    }
}

/// Default fallback markup.
#[must_use]
pub fn fallback_markup(caught: &CaughtFailure) -> String {
    format!(
        "<div role=\"alert\" data-error-id=\"{}\">{}</div>",
        caught.error_id, caught.error
    )
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "boundary_test.rs"]
mod tests;
