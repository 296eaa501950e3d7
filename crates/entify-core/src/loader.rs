//! Rule specification loaders.
//!
//! Loaders turn raw rule data (a map of field name to directive map) into
//! [`Rules`], rejecting fields that miss `validate` or `label` and directive
//! names outside the recognised set.
//!
//! Two sources are provided:
//! - [`ModelRegistry`]: models registered in code, so directives can carry closures
//! - [`JsonRulesLoader`]: one `<model>.json` file per model in a directory

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use entify_model::{Directive, EntifyError, FieldRules, Result, Rules, Value};
use indexmap::IndexMap;
use tracing::debug;

/// Resolves a model name (or inline rule data) into checked [`Rules`].
pub trait RulesLoader {
    /// When `inline` is given it is checked and used under `model`;
    /// otherwise the loader looks the model up.
    fn load(&self, model: &str, inline: Option<&Value>) -> Result<Rules>;
}

/// A rules model defined in code.
pub trait RulesModel {
    /// Raw rule data: a map of field name to directive map.
    fn rules(&self) -> Value;
}

/// A model backed by a fixed value.
#[derive(Debug, Clone)]
pub struct StaticModel(pub Value);

impl RulesModel for StaticModel {
    fn rules(&self) -> Value {
        self.0.clone()
    }
}

/// Check raw rule data and build [`Rules`] named `model`.
pub fn check_model_data(model: &str, raw: &Value) -> Result<Rules> {
    let Value::Map(entries) = raw else {
        return Err(EntifyError::ModelNotMapping {
            model: model.to_string(),
        });
    };

    let mut fields = IndexMap::with_capacity(entries.len());
    for (field, directives) in entries {
        let Value::Map(directives) = directives else {
            return Err(EntifyError::FieldNotMapping {
                model: model.to_string(),
                field: field.clone(),
            });
        };
        for required in Directive::REQUIRED {
            if !directives.contains_key(required.as_str()) {
                return Err(EntifyError::MissingDirective {
                    model: model.to_string(),
                    field: field.clone(),
                    directive: required.as_str(),
                });
            }
        }
        let mut rules = FieldRules::new();
        for (name, value) in directives {
            let directive =
                Directive::parse(name).ok_or_else(|| EntifyError::UnknownDirective {
                    model: model.to_string(),
                    field: field.clone(),
                    directive: name.clone(),
                })?;
            rules.insert(directive, value.clone());
        }
        fields.insert(field.clone(), rules);
    }

    debug!(model, fields = fields.len(), "rules checked");
    Ok(Rules::new(model, fields))
}

/// Lookup key for a model name: lowercase without underscores.
pub fn model_key(model: &str) -> String {
    model
        .chars()
        .filter(|ch| *ch != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// In-memory registry of code-defined models.
#[derive(Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, Box<dyn RulesModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model. `contact_list`, `ContactList` and `contactlist`
    /// resolve to the same entry.
    pub fn register<M>(&mut self, name: &str, model: M) -> &mut Self
    where
        M: RulesModel + 'static,
    {
        self.models.insert(model_key(name), Box::new(model));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(&model_key(name))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl RulesLoader for ModelRegistry {
    fn load(&self, model: &str, inline: Option<&Value>) -> Result<Rules> {
        if let Some(raw) = inline {
            return check_model_data(model, raw);
        }
        let found = self
            .models
            .get(&model_key(model))
            .ok_or_else(|| EntifyError::ModelNotFound {
                model: model.to_string(),
            })?;
        check_model_data(model, &found.rules())
    }
}

/// Loads `<dir>/<model>.json` files.
#[derive(Debug, Clone)]
pub struct JsonRulesLoader {
    dir: PathBuf,
}

impl JsonRulesLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self, model: &str) -> PathBuf {
        self.dir.join(format!("{model}.json"))
    }

    /// Model names with a rules file in the directory, sorted.
    pub fn available_models(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|source| EntifyError::Read {
            path: self.dir.clone(),
            source,
        })?;
        let mut models: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
            .collect();
        models.sort();
        Ok(models)
    }
}

/// Read a JSON rules file into raw rule data.
pub fn read_rules_file(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|source| EntifyError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let json: serde_json::Value =
        serde_json::from_str(&text).map_err(|source| EntifyError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Value::from(json))
}

impl RulesLoader for JsonRulesLoader {
    fn load(&self, model: &str, inline: Option<&Value>) -> Result<Rules> {
        if let Some(raw) = inline {
            return check_model_data(model, raw);
        }
        let path = self.model_path(model);
        if !path.is_file() {
            return Err(EntifyError::ModelNotFound {
                model: model.to_string(),
            });
        }
        debug!(path = %path.display(), "loading rules file");
        check_model_data(model, &read_rules_file(&path)?)
    }
}
