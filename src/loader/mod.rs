//! Dynamic loader: async fetch and load with ordered visible state.
//!
//! DESIGN
//! ======
//! One `ComponentLoader` owns one visible `LoadState`, held in a tokio
//! `watch` channel so consumers can read it at any time or subscribe to
//! transitions. Each invocation gets a monotonically increasing token,
//! allocated inside the channel's write lock together with the `Loading`
//! transition. When an invocation settles, its result is written only if the
//! channel still shows its token; a superseded result is dropped. The
//! visible state therefore follows invocation start order, never settle
//! order.
//!
//! CACHING
//! =======
//! Modules whose selected export rendered into a `LoadedModule` are cached
//! by load reference. Failed loads are never cached, so a retry re-attempts
//! the code load. The cache is flushed whenever the current invocation
//! fetches a registry with a different `version`/`lastUpdated` stamp. An
//! invocation reads and writes the cache only while the cache still carries
//! the stamp it fetched, so a slow load under an older registry never
//! repopulates a flushed cache.
//!
//! CANCELLATION
//! ============
//! By default a superseded in-flight invocation runs to completion and its
//! result is discarded. With `abort_superseded`, the superseded spawned task
//! is aborted as well; ordering is unaffected. The in-flight slot keeps the
//! handle with the highest token, so concurrent callers on cloned loaders
//! only ever abort an older invocation.

pub mod state;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

pub use state::{InvocationToken, LoadState, LoadedModule};

use crate::boundary::panic_message;
use crate::config::{ConfigError, LoaderConfig};
use crate::error::{LoadError, RegistryError};
use crate::module::{Module, ModuleSource};
use crate::observe::{FailureRecord, FailureSink, FanoutSink, HttpSink, TracingSink};
use crate::registry::http::HttpRegistryClient;
use crate::registry::{ComponentEntry, RegistryDocument, RegistrySource, RegistryStamp};
use crate::resolver::{ExportSelection, LoadReference, resolve_component};

// =============================================================================
// BUILDER
// =============================================================================

pub struct LoaderBuilder {
    registry: Arc<dyn RegistrySource>,
    modules: Arc<dyn ModuleSource>,
    sink: Arc<dyn FailureSink>,
    abort_superseded: bool,
}

impl LoaderBuilder {
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn abort_superseded(mut self, abort: bool) -> Self {
        self.abort_superseded = abort;
        self
    }

    #[must_use]
    pub fn build(self) -> ComponentLoader {
        let (state, _) = watch::channel(LoadState::Idle);
        ComponentLoader {
            inner: Arc::new(LoaderInner {
                registry: self.registry,
                modules: self.modules,
                sink: self.sink,
                abort_superseded: self.abort_superseded,
                state,
                next_token: AtomicU64::new(0),
                last_identifier: Mutex::new(None),
                in_flight: Mutex::new(None),
                cache: Mutex::new(ModuleCache::default()),
            }),
        }
    }
}

// =============================================================================
// LOADER
// =============================================================================

#[derive(Default)]
struct ModuleCache {
    stamp: Option<RegistryStamp>,
    modules: HashMap<LoadReference, Arc<Module>>,
}

struct LoaderInner {
    registry: Arc<dyn RegistrySource>,
    modules: Arc<dyn ModuleSource>,
    sink: Arc<dyn FailureSink>,
    abort_superseded: bool,
    state: watch::Sender<LoadState>,
    next_token: AtomicU64,
    last_identifier: Mutex<Option<String>>,
    in_flight: Mutex<Option<(InvocationToken, AbortHandle)>>,
    cache: Mutex<ModuleCache>,
}

/// Shared handle to one loader instance. Clones drive the same state.
#[derive(Clone)]
pub struct ComponentLoader {
    inner: Arc<LoaderInner>,
}

impl ComponentLoader {
    /// Start building a loader; failures go to [`TracingSink`] by default.
    pub fn builder(registry: Arc<dyn RegistrySource>, modules: Arc<dyn ModuleSource>) -> LoaderBuilder {
        LoaderBuilder { registry, modules, sink: Arc::new(TracingSink), abort_superseded: false }
    }

    /// Loader against the configured HTTP registry, reporting failures to
    /// both the log and the server's client-error endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentialed HTTP client cannot be built.
    pub fn from_config(config: &LoaderConfig, modules: Arc<dyn ModuleSource>) -> Result<Self, ConfigError> {
        let registry = HttpRegistryClient::from_config(config)?;
        let sink = FanoutSink::new(vec![
            Arc::new(TracingSink),
            Arc::new(HttpSink::new(config.http_client()?, config.client_errors_url())),
        ]);
        Ok(Self::builder(Arc::new(registry), modules)
            .sink(Arc::new(sink))
            .abort_superseded(config.abort_superseded)
            .build())
    }

    // -------------------------------------------------------------------------
    // Consumer surface
    // -------------------------------------------------------------------------

    /// Start loading `identifier` in the background and return its token.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn request_load(&self, identifier: &str) -> InvocationToken {
        let token = self.begin(identifier);
        let loader = self.clone();
        let id = identifier.to_string();
        let task = tokio::spawn(async move { loader.run(token, &id).await });

        let superseded = supersede(
            &mut self.inner.in_flight.lock().unwrap_or_else(std::sync::PoisonError::into_inner),
            token,
            task.abort_handle(),
        );
        if self.inner.abort_superseded {
            if let Some(handle) = superseded {
                handle.abort();
            }
        }
        token
    }

    /// Run one invocation for `identifier` to completion on the current task.
    pub async fn invoke(&self, identifier: &str) -> InvocationToken {
        let token = self.begin(identifier);
        self.run(token, identifier).await;
        token
    }

    /// Re-request the most recently requested identifier.
    pub fn retry(&self) -> Option<InvocationToken> {
        let identifier = self
            .inner
            .last_identifier
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()?;
        info!(%identifier, "retrying component load");
        Some(self.request_load(&identifier))
    }

    #[must_use]
    pub fn current_state(&self) -> LoadState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.inner.state.subscribe()
    }

    /// Wait until invocation `token` settles or is superseded, then return
    /// the visible state.
    pub async fn settled(&self, token: InvocationToken) -> LoadState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| s.token() != Some(token) || s.is_settled()).await {
            Ok(state) => state.clone(),
            Err(_) => self.current_state(),
        }
    }

    #[must_use]
    pub fn cached_modules(&self) -> usize {
        self.cache().modules.len()
    }

    pub fn clear_cache(&self) {
        let mut cache = self.cache();
        cache.modules.clear();
        cache.stamp = None;
    }

    // -------------------------------------------------------------------------
    // Load
    // -------------------------------------------------------------------------

    /// Load the module at `reference` and select `entry`'s export for the
    /// requested `identifier`, against the registry stamp last seen.
    ///
    /// # Errors
    ///
    /// [`LoadError::ImportFailed`] when the code load fails (including a
    /// panic while evaluating the module), [`LoadError::ExportNotFound`]
    /// when the selected export is absent or not renderable.
    pub async fn load(
        &self,
        identifier: &str,
        reference: &LoadReference,
        entry: &ComponentEntry,
    ) -> Result<LoadedModule, LoadError> {
        let stamp = self.cache().stamp.clone();
        self.load_under(stamp.as_ref(), identifier, reference, entry).await
    }

    async fn load_under(
        &self,
        stamp: Option<&RegistryStamp>,
        identifier: &str,
        reference: &LoadReference,
        entry: &ComponentEntry,
    ) -> Result<LoadedModule, LoadError> {
        let cached = {
            let cache = self.cache();
            if cache.stamp.as_ref() == stamp { cache.modules.get(reference).cloned() } else { None }
        };

        let module = match cached {
            Some(module) => {
                debug!(%identifier, %reference, "module cache hit");
                module
            }
            None => match AssertUnwindSafe(self.inner.modules.load_module(reference))
                .catch_unwind()
                .await
            {
                Ok(Ok(module)) => module,
                Ok(Err(e)) => return Err(LoadError::from_import(identifier, reference.as_str(), e)),
                Err(payload) => {
                    return Err(LoadError::ImportFailed {
                        identifier: identifier.to_string(),
                        reference: reference.to_string(),
                        reason: format!("module evaluation panicked: {}", panic_message(payload.as_ref())),
                    });
                }
            },
        };

        let export = ExportSelection::for_entry(entry);
        let unit = module
            .export(&export)
            .and_then(crate::module::Export::as_renderable)
            .ok_or_else(|| LoadError::ExportNotFound {
                identifier: identifier.to_string(),
                reference: reference.to_string(),
                export: export.to_string(),
            })?;

        let mut cache = self.cache();
        if cache.stamp.as_ref() == stamp {
            cache.modules.insert(reference.clone(), module);
        } else {
            debug!(%identifier, %reference, "registry changed during load; module not cached");
        }
        drop(cache);

        Ok(LoadedModule {
            identifier: identifier.to_string(),
            entry: entry.clone(),
            reference: reference.clone(),
            export,
            unit,
        })
    }

    // -------------------------------------------------------------------------
    // Invocation internals
    // -------------------------------------------------------------------------

    fn begin(&self, identifier: &str) -> InvocationToken {
        let mut token = InvocationToken(0);
        self.inner.state.send_modify(|state| {
            token = InvocationToken(self.inner.next_token.fetch_add(1, Ordering::SeqCst) + 1);
            *state = LoadState::Loading { identifier: identifier.to_string(), token };
        });
        *self
            .inner
            .last_identifier
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(identifier.to_string());
        debug!(%identifier, %token, "invocation started");
        token
    }

    async fn run(&self, token: InvocationToken, identifier: &str) {
        let outcome = self.pipeline(token, identifier).await;
        if let Err(e) = &outcome {
            self.inner.sink.report(&FailureRecord::from_error(e));
        }
        self.settle(token, identifier, outcome);
    }

    async fn pipeline(&self, token: InvocationToken, identifier: &str) -> Result<LoadedModule, LoadError> {
        let document = self.fetch().await.map_err(|e| LoadError::from_registry(identifier, e))?;
        let stamp = document.stamp();
        // Only the current invocation may move the cache to a new stamp.
        if self.inner.state.borrow().token() == Some(token) {
            self.observe_stamp(&stamp);
        }

        let resolution = resolve_component(&document, identifier)?;
        if resolution.entry.id != identifier {
            warn!(%identifier, id = %resolution.entry.id, "registry key does not match entry id");
        }
        self.load_under(Some(&stamp), identifier, &resolution.reference, &resolution.entry)
            .await
    }

    async fn fetch(&self) -> Result<RegistryDocument, RegistryError> {
        match AssertUnwindSafe(self.inner.registry.fetch_registry())
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(RegistryError::Unavailable {
                status: None,
                reason: format!("registry source panicked: {}", panic_message(payload.as_ref())),
            }),
        }
    }

    fn settle(&self, token: InvocationToken, identifier: &str, outcome: Result<LoadedModule, LoadError>) {
        let next = match outcome {
            Ok(module) => LoadState::Ready { identifier: identifier.to_string(), token, module: Arc::new(module) },
            Err(error) => LoadState::Failed { identifier: identifier.to_string(), token, error },
        };
        let phase = next.phase();

        let applied = self.inner.state.send_if_modified(|state| {
            if state.token() == Some(token) {
                *state = next;
                true
            } else {
                false
            }
        });

        if applied {
            debug!(%identifier, %token, phase, "invocation settled");
        } else {
            debug!(%identifier, %token, phase, "superseded invocation result discarded");
        }
    }

    fn observe_stamp(&self, stamp: &RegistryStamp) {
        let mut cache = self.cache();
        if cache.stamp.as_ref() == Some(stamp) {
            return;
        }
        if !cache.modules.is_empty() {
            info!(version = %stamp.version, evicted = cache.modules.len(), "registry changed; module cache flushed");
        }
        cache.modules.clear();
        cache.stamp = Some(stamp.clone());
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, ModuleCache> {
        self.inner
            .cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Record `handle` for `token` in the in-flight slot and return the handle
/// that is now superseded: the previous one when `token` is newer, or
/// `handle` itself when the slot already holds a newer invocation.
fn supersede<H>(slot: &mut Option<(InvocationToken, H)>, token: InvocationToken, handle: H) -> Option<H> {
    match slot.take() {
        Some((current, newer)) if current > token => {
            *slot = Some((current, newer));
            Some(handle)
        }
        previous => {
            *slot = Some((token, handle));
            previous.map(|(_, h)| h)
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
