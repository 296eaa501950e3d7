//! One run of a rule specification over a JSON data file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use entify_core::loader::read_rules_file;
use entify_core::{JsonRulesLoader, ModelRegistry, PageInfo, RulesLoader};
use entify_ingest::{Entification, INLINE_RULES_NAME, RulesSource};
use entify_model::{Catalog, EntityOptions, SharedTranslator, Value, passthrough};
use entify_report::{CsvRenderer, JsonRenderer};
use tracing::{debug, info, info_span};

/// Where the rule specification comes from.
#[derive(Debug, Clone)]
pub enum RulesInput {
    /// A single JSON rules file, used as inline rules.
    File(PathBuf),
    /// A named model inside a directory of `<model>.json` files.
    Model { dir: PathBuf, name: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub data: PathBuf,
    pub rules: RulesInput,
    pub options: EntityOptions,
    pub page: Option<PageRequest>,
    /// Translation catalog for user-visible messages.
    pub messages: Option<PathBuf>,
    pub format: OutputFormat,
    pub pretty: bool,
}

impl RunRequest {
    pub fn new(data: impl Into<PathBuf>, rules: RulesInput) -> Self {
        Self {
            data: data.into(),
            rules,
            options: EntityOptions::default(),
            page: None,
            messages: None,
            format: OutputFormat::default(),
            pretty: false,
        }
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub model: String,
    /// Records in the data file, before pagination.
    pub input_records: usize,
    pub exported_records: usize,
    pub pagination: Option<PageInfo>,
    pub errors: Vec<String>,
    pub rendered: String,
}

impl RunOutcome {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Read an options file. Unknown option names are rejected.
pub fn load_options(path: &Path) -> Result<EntityOptions> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read options file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse options file {}", path.display()))
}

pub fn read_data(path: &Path) -> Result<Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read data file {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parse data file {}", path.display()))?;
    Ok(Value::from(json))
}

pub fn execute(request: &RunRequest) -> Result<RunOutcome> {
    let span = info_span!("run", data = %request.data.display());
    let _guard = span.enter();

    let translator: SharedTranslator = match &request.messages {
        Some(path) => {
            let catalog = Catalog::from_json_file(path)
                .with_context(|| format!("load message catalog {}", path.display()))?;
            debug!(entries = catalog.len(), "loaded message catalog");
            Arc::new(catalog)
        }
        None => passthrough(),
    };
    let data = read_data(&request.data)?;

    match &request.rules {
        RulesInput::File(path) => {
            let raw = read_rules_file(path).context("load rules file")?;
            let entification = Entification::new(ModelRegistry::new())
                .with_options(request.options.clone())
                .with_translator(translator);
            run_with(&entification, data, RulesSource::Inline(raw), request)
        }
        RulesInput::Model { dir, name } => {
            let entification = Entification::new(JsonRulesLoader::new(dir))
                .with_options(request.options.clone())
                .with_translator(translator);
            run_with(&entification, data, RulesSource::Model(name.clone()), request)
        }
    }
}

fn run_with<L: RulesLoader>(
    entification: &Entification<L>,
    data: Value,
    source: RulesSource,
    request: &RunRequest,
) -> Result<RunOutcome> {
    let model = match &source {
        RulesSource::Model(name) => name.clone(),
        RulesSource::Inline(_) => INLINE_RULES_NAME.to_string(),
    };
    let mut provider = entification
        .array_provider(data, source)
        .with_context(|| format!("load rules for model {model}"))?;
    let input_records = provider.total();

    let pagination = match request.page {
        Some(page) => Some(
            provider
                .paginate(page.per_page, page.page)
                .context("paginate data")?
                .clone(),
        ),
        None => None,
    };

    let entity = provider.entity().context("run handler chain")?;
    let exported_records = entity.export().map_or(0, record_count);
    let rendered = match request.format {
        OutputFormat::Json => entity.render(&JsonRenderer::new().pretty(request.pretty)),
        OutputFormat::Csv => entity.render(&CsvRenderer::new()),
    }
    .context("render output")?;
    let errors = entity.errors().map(<[String]>::to_vec).unwrap_or_default();

    info!(
        model = %model,
        records = exported_records,
        errors = errors.len(),
        "run finished"
    );
    Ok(RunOutcome {
        model,
        input_records,
        exported_records,
        pagination,
        errors,
        rendered,
    })
}

fn record_count(value: &Value) -> usize {
    match value {
        Value::List(items) => items.len(),
        Value::Null => 0,
        _ => 1,
    }
}
