//! Runs a handler chain over one input.

use entify_model::{Info, Result, SharedOptions, Value};
use tracing::debug;

use crate::handlers::EntityHandlers;
use crate::render::EntityRenderer;

/// Owns the input, the handler chain and the last result.
///
/// The chain runs on construction and again on every [`EntityMain::refresh`],
/// always starting from the original data, metadata and errors.
pub struct EntityMain {
    handlers: EntityHandlers,
    data: Value,
    backup_info: Option<Info>,
    backup_errors: Vec<String>,
    info: Option<Info>,
    errors: Vec<String>,
    result: Option<Value>,
}

impl EntityMain {
    pub fn new(
        handlers: EntityHandlers,
        data: Value,
        info: Option<Info>,
        errors: Option<Vec<String>>,
    ) -> Result<Self> {
        let mut entity = Self {
            handlers,
            data,
            backup_info: info,
            backup_errors: errors.unwrap_or_default(),
            info: None,
            errors: Vec::new(),
            result: None,
        };
        entity.refresh()?;
        Ok(entity)
    }

    /// Re-run the chain from the original inputs.
    pub fn refresh(&mut self) -> Result<()> {
        self.info = self.backup_info.clone();
        self.errors = self.backup_errors.clone();
        self.result = None;

        if self.data.is_empty() || !self.errors.is_empty() {
            debug!(
                empty = self.data.is_empty(),
                errors = self.errors.len(),
                "skipping handler chain"
            );
            return Ok(());
        }

        let mut value = Some(self.data.clone());
        let mut info = self.info.take();
        let mut errors = Vec::new();
        for (key, handler) in self.handlers.active_mut() {
            if let Some(current) = value.take() {
                debug!(handler = key, "running handler");
                match handler.handle(current, info.as_ref()) {
                    Ok(next) => value = next,
                    Err(err) => {
                        // leave no queued messages for the next refresh
                        handler.clear_errors();
                        self.info = self.backup_info.clone();
                        return Err(err);
                    }
                }
                if handler.needs_refresh_info() {
                    info = handler.info().cloned();
                }
            }
            if let Some(stage_errors) = handler.errors() {
                errors.extend_from_slice(stage_errors);
            }
            handler.clear_errors();
        }

        self.info = info;
        self.errors.extend(errors);
        self.result = value;
        Ok(())
    }

    /// The full result, or `None` when the chain produced nothing.
    pub fn export(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// One record of the result.
    pub fn export_one(&self, index: usize) -> Option<&Value> {
        match self.result.as_ref()? {
            Value::List(items) => items.get(index),
            record @ Value::Map(_) if index == 0 => Some(record),
            _ => None,
        }
    }

    pub fn info(&self) -> Option<&Info> {
        self.info.as_ref()
    }

    pub fn errors(&self) -> Option<&[String]> {
        if self.errors.is_empty() {
            None
        } else {
            Some(&self.errors)
        }
    }

    pub fn handlers(&self) -> &EntityHandlers {
        &self.handlers
    }

    /// Mutable access for late registration. Call [`EntityMain::refresh`] afterwards.
    pub fn handlers_mut(&mut self) -> &mut EntityHandlers {
        &mut self.handlers
    }

    pub fn options(&self) -> &SharedOptions {
        self.handlers.options()
    }

    pub fn render<R: EntityRenderer>(&self, renderer: &R) -> Result<R::Output> {
        renderer.generate(self.export(), self.info(), self.errors())
    }
}
