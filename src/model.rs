use serde_yaml::{Mapping, Value};
use thiserror::Error;

pub const REQUIRED_FIELDS: [&str; 6] = [
    "loaf_number",
    "date",
    "ingredients",
    "process",
    "bake",
    "results",
];

pub const BAKE_METHODS: [&str; 4] = ["dutch_oven", "steam_pan", "combo_cooker", "open_bake"];

pub const BULK_END_STATES: [&str; 4] = ["underdone", "good", "peaked", "overfermented"];

pub const FLOUR_PREFIX: &str = "flour_";

/// Stored value of `results.quality_overall` that means "not yet rated".
pub const UNRATED_SENTINEL: f64 = -1.0;

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("loaf record must be a mapping at the top level, found {found}")]
    RootNotMapping { found: &'static str },
    #[error("Section '{section}' must be a mapping, found {found}")]
    SectionNotMapping {
        section: &'static str,
        found: &'static str,
    },
    #[error("Ingredient '{name}' must be a number, found {found}")]
    NonNumericIngredient {
        name: &'static str,
        found: &'static str,
    },
    #[error("No flour specified in ingredients")]
    NoFlour,
}

/// A single loaf log, kept as an insertion-ordered YAML mapping so that
/// writing it back preserves the author's layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoafRecord {
    fields: Mapping,
}

impl LoafRecord {
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        match value {
            Value::Mapping(fields) => Ok(Self { fields }),
            other => Err(RecordError::RootNotMapping {
                found: value_kind(&other),
            }),
        }
    }

    pub fn fields(&self) -> &Mapping {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Mapping {
        &mut self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Looks up a nested section. `Ok(None)` means the key is absent.
    pub fn section(&self, name: &'static str) -> Result<Option<&Mapping>, RecordError> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(Value::Mapping(section)) => Ok(Some(section)),
            Some(other) => Err(RecordError::SectionNotMapping {
                section: name,
                found: value_kind(other),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedPercentages {
    pub hydration_pct: f64,
    pub inoculation_pct: f64,
    pub salt_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityRating {
    Unrated,
    Rated,
}

impl QualityRating {
    /// Absent, null and the `-1` sentinel all read as unrated. Any other
    /// value, numeric or not, counts as rated.
    pub fn from_results(results: &Mapping) -> Self {
        match results.get("quality_overall") {
            None | Some(Value::Null) => Self::Unrated,
            Some(value) if value.as_f64() == Some(UNRATED_SENTINEL) => Self::Unrated,
            Some(_) => Self::Rated,
        }
    }
}

/// Sums every numeric `flour_*` entry. Other keys and non-numeric values
/// under the prefix are skipped.
pub fn total_flour(ingredients: &Mapping) -> f64 {
    ingredients
        .iter()
        .filter(|(key, _)| {
            key.as_str()
                .map(|name| name.starts_with(FLOUR_PREFIX))
                .unwrap_or(false)
        })
        .filter_map(|(_, value)| numeric(value))
        .sum()
}

/// Numbers only; YAML booleans and numeric-looking strings do not count.
pub fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
}

pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
