//! Builds a handler chain for a rules model.

use entify_model::{EntityOptions, Rules, SharedOptions, SharedTranslator, passthrough};
use entify_validate::StandardValidator;

use crate::filters::DefaultFilterLibrary;
use crate::handler::DefaultHandler;
use crate::handlers::EntityHandlers;

/// Wires a [`DefaultHandler`] with the standard validator and filter library.
#[derive(Clone)]
pub struct HandlerFactory {
    rules: Rules,
    options: EntityOptions,
    translator: SharedTranslator,
}

impl HandlerFactory {
    pub fn new(rules: Rules) -> Self {
        Self {
            rules,
            options: EntityOptions::default(),
            translator: passthrough(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: EntityOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_translator(mut self, translator: SharedTranslator) -> Self {
        self.translator = translator;
        self
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn default_handler(&self) -> DefaultHandler {
        DefaultHandler::new(
            self.rules.clone(),
            SharedOptions::new(self.options.clone()),
            Box::new(DefaultFilterLibrary::with_translator(
                self.rules.name(),
                self.translator.clone(),
            )),
            Box::new(StandardValidator::new(self.translator.clone())),
            self.translator.clone(),
        )
    }

    /// A fresh chain holding only the default handler.
    pub fn handlers(&self) -> EntityHandlers {
        EntityHandlers::new(self.default_handler())
    }
}
