//! Boolean switches that change default handler behavior.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Names of the boolean options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionName {
    /// Return right after default-fill when fields are missing.
    ReturnIfNotExistsErrors,
    /// Return right after validation when it failed (filters skipped).
    ReturnIfValidationErrors,
    SkipFilters,
    SkipValidation,
    /// Remove record keys that the rules do not declare.
    DeleteRedundant,
}

impl OptionName {
    pub const ALL: [OptionName; 5] = [
        Self::ReturnIfNotExistsErrors,
        Self::ReturnIfValidationErrors,
        Self::SkipFilters,
        Self::SkipValidation,
        Self::DeleteRedundant,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReturnIfNotExistsErrors => "returnIfNotExistsErrors",
            Self::ReturnIfValidationErrors => "returnIfValidationErrors",
            Self::SkipFilters => "skipFilters",
            Self::SkipValidation => "skipValidation",
            Self::DeleteRedundant => "deleteRedundant",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|option| option.as_str() == name)
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for the default handler.
///
/// Deserializes from a JSON object using the camelCase option names, so an
/// options file can be passed on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EntityOptions {
    pub return_if_not_exists_errors: bool,
    pub return_if_validation_errors: bool,
    pub skip_filters: bool,
    pub skip_validation: bool,
    pub delete_redundant: bool,
    /// Filter (directive) names that are never applied.
    pub skipped_filters: BTreeSet<String>,
}

impl Default for EntityOptions {
    fn default() -> Self {
        Self {
            return_if_not_exists_errors: true,
            return_if_validation_errors: false,
            skip_filters: false,
            skip_validation: false,
            delete_redundant: true,
            skipped_filters: BTreeSet::new(),
        }
    }
}

impl EntityOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_bool_option(&self, option: OptionName) -> bool {
        match option {
            OptionName::ReturnIfNotExistsErrors => self.return_if_not_exists_errors,
            OptionName::ReturnIfValidationErrors => self.return_if_validation_errors,
            OptionName::SkipFilters => self.skip_filters,
            OptionName::SkipValidation => self.skip_validation,
            OptionName::DeleteRedundant => self.delete_redundant,
        }
    }

    /// Lookup by name; unknown names read as `false`.
    pub fn bool_option_by_name(&self, name: &str) -> bool {
        OptionName::parse(name).is_some_and(|option| self.get_bool_option(option))
    }

    pub fn set(&mut self, option: OptionName, enabled: bool) -> &mut Self {
        let slot = match option {
            OptionName::ReturnIfNotExistsErrors => &mut self.return_if_not_exists_errors,
            OptionName::ReturnIfValidationErrors => &mut self.return_if_validation_errors,
            OptionName::SkipFilters => &mut self.skip_filters,
            OptionName::SkipValidation => &mut self.skip_validation,
            OptionName::DeleteRedundant => &mut self.delete_redundant,
        };
        *slot = enabled;
        self
    }

    pub fn set_return_if_not_exists_errors(&mut self, enabled: bool) -> &mut Self {
        self.set(OptionName::ReturnIfNotExistsErrors, enabled)
    }

    pub fn set_return_if_validation_errors(&mut self, enabled: bool) -> &mut Self {
        self.set(OptionName::ReturnIfValidationErrors, enabled)
    }

    pub fn set_skip_filters(&mut self, enabled: bool) -> &mut Self {
        self.set(OptionName::SkipFilters, enabled)
    }

    pub fn set_skip_validation(&mut self, enabled: bool) -> &mut Self {
        self.set(OptionName::SkipValidation, enabled)
    }

    pub fn set_delete_redundant(&mut self, enabled: bool) -> &mut Self {
        self.set(OptionName::DeleteRedundant, enabled)
    }

    /// Skip one or more filters, given as a comma-separated list.
    pub fn skip_filter(&mut self, filters: &str) -> &mut Self {
        self.skipped_filters.extend(
            filters
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        );
        self
    }

    pub fn is_filter_skipped(&self, filter: &str) -> bool {
        self.skipped_filters.contains(filter)
    }
}

/// Options shared between the default handler, the handler registry and the
/// entity that runs them.
///
/// Single-threaded: callers running one pipeline from several threads must
/// serialize access themselves.
#[derive(Debug, Clone, Default)]
pub struct SharedOptions(Rc<RefCell<EntityOptions>>);

impl SharedOptions {
    pub fn new(options: EntityOptions) -> Self {
        Self(Rc::new(RefCell::new(options)))
    }

    /// Copy of the current options.
    pub fn snapshot(&self) -> EntityOptions {
        self.0.borrow().clone()
    }

    pub fn get_bool_option(&self, option: OptionName) -> bool {
        self.0.borrow().get_bool_option(option)
    }

    pub fn is_filter_skipped(&self, filter: &str) -> bool {
        self.0.borrow().is_filter_skipped(filter)
    }

    /// Mutate the options in place.
    pub fn update<R>(&self, change: impl FnOnce(&mut EntityOptions) -> R) -> R {
        change(&mut *self.0.borrow_mut())
    }

    /// True when both handles point at the same options.
    pub fn shares_with(&self, other: &SharedOptions) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
