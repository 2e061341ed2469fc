use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tandem_scene::{Document, parse_str};

use super::items;
use super::{Diagnostic, LoadNotifier, LoadState, SceneEngine, SceneObject, SourceLocator};

/// Loader output shared with the loader thread.
#[derive(Default)]
struct Slot {
    /// Bumped on every `load`; a loader whose generation is stale discards its result.
    generation: u64,
    state: LoadState,
    document: Option<Document>,
    source_name: String,
}

/// Scene engine for `.tsn` documents.
///
/// Documents are read and parsed on a short-lived loader thread, so `load`
/// always returns [`LoadState::Loading`]; syntax errors surface through
/// [`status`](SceneEngine::status), instantiation errors through
/// [`create`](SceneEngine::create).
#[derive(Default)]
pub struct DocumentEngine {
    slot: Arc<Mutex<Slot>>,
    load_delay: Duration,
}

impl DocumentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds each load back by `delay`, e.g. to exercise the asynchronous path.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SceneEngine for DocumentEngine {
    fn load(&mut self, source: &SourceLocator, notify: LoadNotifier) -> Result<LoadState, Vec<Diagnostic>> {
        let name = source.display_name();
        let generation = {
            let mut slot = self.slot();
            slot.generation += 1;
            slot.state = LoadState::Loading;
            slot.document = None;
            slot.source_name = name.clone();
            slot.generation
        };

        let shared = Arc::clone(&self.slot);
        let loader_source = source.clone();
        let loader_name = name.clone();
        let delay = self.load_delay;
        let spawned = thread::Builder::new()
            .name("tandem-scene-loader".to_string())
            .spawn(move || {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                let (state, document) = match read_and_parse(&loader_source, &loader_name) {
                    Ok(doc) => (LoadState::Ready, Some(doc)),
                    Err(diag) => (LoadState::Error(vec![diag]), None),
                };

                {
                    let mut slot = shared.lock().unwrap_or_else(PoisonError::into_inner);
                    if slot.generation != generation {
                        log::trace!("scene load #{generation} superseded");
                        return;
                    }
                    slot.state = state;
                    slot.document = document;
                }
                log::debug!("scene {loader_name} loaded");
                notify.notify();
            });

        match spawned {
            Ok(_) => Ok(LoadState::Loading),
            Err(err) => {
                let diags = vec![Diagnostic::new(name, format!("cannot start loader: {err}"))];
                self.slot().state = LoadState::Error(diags.clone());
                Err(diags)
            }
        }
    }

    fn status(&self) -> LoadState {
        self.slot().state.clone()
    }

    fn create(&mut self) -> Result<SceneObject, Vec<Diagnostic>> {
        let slot = self.slot();
        match (&slot.state, &slot.document) {
            (LoadState::Ready, Some(doc)) => items::build(doc, &slot.source_name),
            (LoadState::Error(diags), _) => Err(diags.clone()),
            _ => Err(vec![Diagnostic::new(slot.source_name.clone(), "document is not loaded")]),
        }
    }
}

fn read_and_parse(source: &SourceLocator, name: &str) -> Result<Document, Diagnostic> {
    let text = match source {
        SourceLocator::File(path) => std::fs::read_to_string(path)
            .map_err(|err| Diagnostic::new(name, format!("cannot read document: {err}")))?,
        SourceLocator::Inline(src) => src.clone(),
    };
    parse_str(&text).map_err(|err| Diagnostic::from_parse(name, &err))
}
