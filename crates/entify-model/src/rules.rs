//! Rule specifications: per-field directive maps.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::value::{Record, Value};

/// Recognised directive names. The set is closed: any other name in a rule
/// specification is a schema error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Directive {
    Validate,
    Label,
    Check,
    Default,
    Render,
    Convert,
    Hide,
    Escape,
    Allowed,
    Filter,
    String,
    Int,
    Float,
    Null,
    Array,
    Object,
    Resource,
    Callable,
    Meta,
    Unique,
}

impl Directive {
    pub const ALL: [Directive; 20] = [
        Self::Validate,
        Self::Label,
        Self::Check,
        Self::Default,
        Self::Render,
        Self::Convert,
        Self::Hide,
        Self::Escape,
        Self::Allowed,
        Self::Filter,
        Self::String,
        Self::Int,
        Self::Float,
        Self::Null,
        Self::Array,
        Self::Object,
        Self::Resource,
        Self::Callable,
        Self::Meta,
        Self::Unique,
    ];

    /// Directives every field must declare.
    pub const REQUIRED: [Directive; 2] = [Self::Validate, Self::Label];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Label => "label",
            Self::Check => "check",
            Self::Default => "default",
            Self::Render => "render",
            Self::Convert => "convert",
            Self::Hide => "hide",
            Self::Escape => "escape",
            Self::Allowed => "allowed",
            Self::Filter => "filter",
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Null => "null",
            Self::Array => "array",
            Self::Object => "object",
            Self::Resource => "resource",
            Self::Callable => "callable",
            Self::Meta => "meta",
            Self::Unique => "unique",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|directive| directive.as_str() == name)
    }

    /// Short description used by the CLI directive listing.
    pub fn description(self) -> &'static str {
        match self {
            Self::Validate => "validation rule string (required)",
            Self::Label => "human-readable field label (required)",
            Self::Check => "predicate returning true or an error message",
            Self::Default => "value filled in when the field is absent",
            Self::Render => "renderer hint, passed through",
            Self::Convert => "coerce to string, int, float, double or bool",
            Self::Hide => "drop the field from exported records",
            Self::Escape => "HTML-escape a string value",
            Self::Allowed => "strip markup except the listed tags",
            Self::Filter => "transform returning the new value",
            Self::String => "assert the value is (not) a string",
            Self::Int => "assert the value is (not) an int",
            Self::Float => "assert the value is (not) a float",
            Self::Null => "assert the value is (not) null",
            Self::Array => "assert the value is (not) a list",
            Self::Object => "assert the value is (not) a map",
            Self::Resource => "assert the value is (not) a resource",
            Self::Callable => "assert the value is (not) callable",
            Self::Meta => "free-form metadata, passed through",
            Self::Unique => "uniqueness marker, passed through",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directives declared for one field, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldRules {
    directives: IndexMap<Directive, Value>,
}

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FieldRules::insert`].
    #[must_use]
    pub fn with(mut self, directive: Directive, value: impl Into<Value>) -> Self {
        self.insert(directive, value);
        self
    }

    pub fn insert(&mut self, directive: Directive, value: impl Into<Value>) {
        self.directives.insert(directive, value.into());
    }

    pub fn get(&self, directive: Directive) -> Option<&Value> {
        self.directives.get(&directive)
    }

    pub fn contains(&self, directive: Directive) -> bool {
        self.directives.contains_key(&directive)
    }

    pub fn label(&self) -> Option<&Value> {
        self.get(Directive::Label)
    }

    /// The `validate` directive, unless absent or null.
    pub fn validate(&self) -> Option<&Value> {
        self.get(Directive::Validate).filter(|value| !value.is_null())
    }

    /// The `default` directive, unless absent or null.
    pub fn default_value(&self) -> Option<&Value> {
        self.get(Directive::Default).filter(|value| !value.is_null())
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self.get(Directive::Hide), Some(Value::Bool(true)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Directive, &Value)> {
        self.directives.iter().map(|(directive, value)| (*directive, value))
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Map(
            self.directives
                .iter()
                .map(|(directive, value)| (directive.as_str().to_string(), value.clone()))
                .collect(),
        )
    }
}

/// A named rule specification. Cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct Rules {
    name: String,
    fields: Arc<IndexMap<String, FieldRules>>,
}

impl Rules {
    /// Build rules without schema checks. Loaders validate raw data first.
    pub fn new(name: impl Into<String>, fields: IndexMap<String, FieldRules>) -> Self {
        Self {
            name: name.into(),
            fields: Arc::new(fields),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, field: &str) -> Option<&FieldRules> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRules)> {
        self.fields.iter().map(|(name, rules)| (name.as_str(), rules))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The rule specification as a value, for echoing into metadata.
    pub fn to_value(&self) -> Value {
        let fields: Record = self
            .fields
            .iter()
            .map(|(name, rules)| (name.clone(), rules.to_value()))
            .collect();
        Value::Map(fields)
    }
}
