//! Ordered, keyed registry of pipeline stages.

use std::collections::BTreeSet;

use entify_model::{Info, Result, SharedOptions, Value};
use tracing::{debug, warn};

use crate::handler::{DefaultHandler, EntityHandler, FnHandler};

/// Handler chain seeded with a [`DefaultHandler`] under [`DefaultHandler::KEY`].
pub struct EntityHandlers {
    handlers: Vec<(String, Box<dyn EntityHandler>)>,
    bypassed: BTreeSet<String>,
    options: SharedOptions,
}

impl EntityHandlers {
    pub fn new(default: DefaultHandler) -> Self {
        let options = default.options().clone();
        Self {
            handlers: vec![(DefaultHandler::KEY.to_string(), Box::new(default))],
            bypassed: BTreeSet::new(),
            options,
        }
    }

    /// Insert `handler` right after `after`. When `after` is not registered the
    /// handler is dropped. A handler already registered under `key` is
    /// replaced and moves to the new position.
    pub fn register_after<H>(&mut self, key: &str, after: &str, handler: H) -> &mut Self
    where
        H: EntityHandler + 'static,
    {
        self.insert_after(key, after, Box::new(handler));
        self
    }

    /// Closure form of [`EntityHandlers::register_after`].
    pub fn register_fn_after<F>(&mut self, key: &str, after: &str, run: F) -> &mut Self
    where
        F: FnMut(Value, Option<&Info>) -> Result<Option<Value>> + 'static,
    {
        self.insert_after(key, after, Box::new(FnHandler::new(run)));
        self
    }

    fn insert_after(&mut self, key: &str, after: &str, handler: Box<dyn EntityHandler>) {
        if key == after {
            if let Some(slot) = self.handlers.iter_mut().find(|(existing, _)| existing == key) {
                slot.1 = handler;
                debug!(key, "replaced handler in place");
            } else {
                warn!(key, after, "anchor handler not registered; handler dropped");
            }
            return;
        }
        if self.position(after).is_none() {
            warn!(key, after, "anchor handler not registered; handler dropped");
            return;
        }
        if let Some(existing) = self.position(key) {
            self.handlers.remove(existing);
        }
        if let Some(anchor) = self.position(after) {
            self.handlers.insert(anchor + 1, (key.to_string(), handler));
            debug!(key, after, "registered handler");
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.handlers.iter().position(|(existing, _)| existing == key)
    }

    /// Exclude a registered handler from the active chain. Unknown keys are ignored.
    pub fn bypass(&mut self, key: &str) -> &mut Self {
        if self.contains(key) {
            self.bypassed.insert(key.to_string());
        } else {
            debug!(key, "bypass ignored for unknown handler");
        }
        self
    }

    /// Return a bypassed handler to the active chain.
    pub fn restore(&mut self, key: &str) -> &mut Self {
        self.bypassed.remove(key);
        self
    }

    pub fn is_bypassed(&self, key: &str) -> bool {
        self.bypassed.contains(key)
    }

    /// Keys of the active handlers, in chain order.
    pub fn active_handlers(&self) -> Vec<&str> {
        self.handlers
            .iter()
            .map(|(key, _)| key.as_str())
            .filter(|key| !self.bypassed.contains(*key))
            .collect()
    }

    pub(crate) fn active_mut(
        &mut self,
    ) -> impl Iterator<Item = (&str, &mut Box<dyn EntityHandler>)> + '_ {
        let bypassed = &self.bypassed;
        self.handlers
            .iter_mut()
            .filter(move |(key, _)| !bypassed.contains(key))
            .map(|(key, handler)| (key.as_str(), handler))
    }

    /// Keys of every registered handler, bypassed ones included.
    pub fn keys(&self) -> Vec<&str> {
        self.handlers.iter().map(|(key, _)| key.as_str()).collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Remove every handler, the default one included.
    pub fn clear(&mut self) -> &mut Self {
        self.handlers.clear();
        self.bypassed.clear();
        self
    }

    /// Options of the default handler this registry was built with.
    pub fn options(&self) -> &SharedOptions {
        &self.options
    }
}
