use crate::utils::error::{ConverterError, Result};

pub const MSG_VALUE_REQUIRED: &str = "Please enter a value";
pub const MSG_INVALID_NUMBER: &str = "Please enter a valid number";
pub const MSG_TOO_LARGE: &str = "Value is too large for precise conversion";
pub const MSG_UNIT_REQUIRED: &str = "Please select a unit";

/// Largest magnitude that still converts without visible precision loss.
pub const MAX_MAGNITUDE: f64 = 1e15;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Parses the raw input text, returning the number or the message to show.
pub fn check_input_value(raw: Option<&str>) -> std::result::Result<f64, &'static str> {
    let text = match raw.map(str::trim) {
        None | Some("") => return Err(MSG_VALUE_REQUIRED),
        Some(text) => text,
    };

    let value: f64 = text.parse().map_err(|_| MSG_INVALID_NUMBER)?;
    if value.is_nan() {
        return Err(MSG_INVALID_NUMBER);
    }

    // 無限大也在這裡被擋下
    if value.abs() > MAX_MAGNITUDE {
        return Err(MSG_TOO_LARGE);
    }

    Ok(value)
}

pub fn check_unit_selected(code: Option<&str>) -> std::result::Result<(), &'static str> {
    match code {
        Some(code) if !code.is_empty() => Ok(()),
        _ => Err(MSG_UNIT_REQUIRED),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ConverterError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ConverterError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConverterError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ConverterError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}
