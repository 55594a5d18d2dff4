use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::ConverterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Length,
    Weight,
    Temperature,
    Volume,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Length,
        Category::Weight,
        Category::Temperature,
        Category::Volume,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Length => "length",
            Category::Weight => "weight",
            Category::Temperature => "temperature",
            Category::Volume => "volume",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Length => "Length",
            Category::Weight => "Weight",
            Category::Temperature => "Temperature",
            Category::Volume => "Volume",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ConverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConverterError::UnknownCategoryError {
                value: s.to_string(),
            })
    }
}

/// Thermometric scales are affine, so they never go through a linear factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Thermometric {
    Celsius,
    Fahrenheit,
    Kelvin,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Scale {
    /// Multiplier to the category's base unit.
    Factor(f64),
    Thermal(Thermometric),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Unit {
    pub name: &'static str,
    pub code: &'static str,
    #[serde(skip)]
    pub scale: Scale,
}

/// Fields of the engine that carry their own validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    InputValue,
    FromUnit,
    ToUnit,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::InputValue => "inputValue",
            Field::FromUnit => "fromUnit",
            Field::ToUnit => "toUnit",
        })
    }
}

/// Per-field messages; an empty string means the field is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldErrors {
    pub input_value: String,
    pub from_unit: String,
    pub to_unit: String,
}

impl FieldErrors {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::InputValue => &self.input_value,
            Field::FromUnit => &self.from_unit,
            Field::ToUnit => &self.to_unit,
        }
    }

    pub fn set(&mut self, field: Field, message: impl Into<String>) {
        let slot = match field {
            Field::InputValue => &mut self.input_value,
            Field::FromUnit => &mut self.from_unit,
            Field::ToUnit => &mut self.to_unit,
        };
        *slot = message.into();
    }

    pub fn clear(&mut self, field: Field) {
        self.set(field, String::new());
    }

    pub fn any(&self) -> bool {
        !(self.input_value.is_empty() && self.from_unit.is_empty() && self.to_unit.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionState {
    pub category: Category,
    pub input_value: Option<String>,
    pub from_unit: Option<&'static str>,
    pub to_unit: Option<&'static str>,
    pub result: Option<f64>,
    pub in_progress: bool,
    pub errors: FieldErrors,
}

impl ConversionState {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            input_value: None,
            from_unit: None,
            to_unit: None,
            result: None,
            in_progress: false,
            errors: FieldErrors::default(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors.any()
    }

    /// Clears everything that is only meaningful within one category.
    pub(crate) fn clear_inputs(&mut self) {
        self.input_value = None;
        self.from_unit = None;
        self.to_unit = None;
        self.result = None;
        self.in_progress = false;
        self.errors = FieldErrors::default();
    }
}

impl Default for ConversionState {
    fn default() -> Self {
        Self::new(Category::default())
    }
}

/// Published to subscribers after every engine mutation.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    StateChanged(ConversionState),
    ConversionFailed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConversionOutcome {
    Converted(f64),
    /// A later convert, reset or category change cancelled this one.
    Superseded,
}
