//! Entry point that turns rules plus a data source into a provider.

use std::path::PathBuf;

use entify_core::{HandlerFactory, RulesLoader};
use entify_model::{EntityOptions, Rules, SharedTranslator, Value, passthrough};

use crate::array::ArrayProvider;
use crate::error::Result;
use crate::form::{FormProvider, FormRequest};

/// Name given to inline rule data.
pub const INLINE_RULES_NAME: &str = "default";

/// Where the rules for a provider come from.
#[derive(Debug, Clone)]
pub enum RulesSource {
    /// A model the loader resolves.
    Model(String),
    /// Raw rule data, checked and named [`INLINE_RULES_NAME`].
    Inline(Value),
}

impl From<&str> for RulesSource {
    fn from(model: &str) -> Self {
        Self::Model(model.to_string())
    }
}

impl From<String> for RulesSource {
    fn from(model: String) -> Self {
        Self::Model(model)
    }
}

impl From<Value> for RulesSource {
    fn from(rules: Value) -> Self {
        Self::Inline(rules)
    }
}

pub struct Entification<L> {
    loader: L,
    options: EntityOptions,
    translator: SharedTranslator,
}

impl<L: RulesLoader> Entification<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            options: EntityOptions::default(),
            translator: passthrough(),
        }
    }

    /// Options given to every default handler built from now on.
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

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn rules(&self, source: RulesSource) -> Result<Rules> {
        let rules = match source {
            RulesSource::Model(model) => self.loader.load(&model, None)?,
            RulesSource::Inline(raw) => self.loader.load(INLINE_RULES_NAME, Some(&raw))?,
        };
        Ok(rules)
    }

    fn factory(&self, source: RulesSource) -> Result<HandlerFactory> {
        Ok(HandlerFactory::new(self.rules(source)?)
            .with_options(self.options.clone())
            .with_translator(self.translator.clone()))
    }

    pub fn array_provider(
        &self,
        data: Value,
        rules: impl Into<RulesSource>,
    ) -> Result<ArrayProvider> {
        let handlers = self.factory(rules.into())?.handlers();
        Ok(ArrayProvider::new(handlers, data))
    }

    pub fn form_provider(
        &self,
        request: FormRequest,
        rules: impl Into<RulesSource>,
        upload_dir: Option<PathBuf>,
        allowed_mime: Vec<String>,
        max_size: &str,
    ) -> Result<FormProvider> {
        let handlers = self.factory(rules.into())?.handlers();
        FormProvider::new(handlers, request, upload_dir, allowed_mime, max_size)
    }
}
