use crate::domain::model::{Category, Field};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConverterError {
    #[error("Validation error on {field}: {message}")]
    ValidationError { field: Field, message: String },

    #[error("Unknown unit '{code}' for category {category}")]
    UnknownUnitError { category: Category, code: String },

    #[error("Unknown category: {value}")]
    UnknownCategoryError { value: String },

    #[error("Unknown command: {input}")]
    UnknownCommandError { input: String },

    #[error("Calculation error: {message}")]
    CalculationError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Calculation,
    Configuration,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConverterError {
    pub fn validation(field: Field, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field,
            message: message.into(),
        }
    }

    pub fn calculation(message: impl Into<String>) -> Self {
        Self::CalculationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationError { .. }
            | Self::UnknownUnitError { .. }
            | Self::UnknownCategoryError { .. }
            | Self::UnknownCommandError { .. } => ErrorCategory::Validation,
            Self::CalculationError { .. } => ErrorCategory::Calculation,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Low,
            ErrorCategory::Calculation => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    /// 是否可在不重啟的情況下恢復
    pub fn is_recoverable(&self) -> bool {
        self.severity() < ErrorSeverity::High
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::ValidationError { field, .. } => {
                format!("Check the {} field and try again", field)
            }
            Self::UnknownUnitError { category, .. } => {
                format!("Run `units` to list the units available for {}", category)
            }
            Self::UnknownCategoryError { .. } => {
                "Use one of: length, weight, temperature, volume".to_string()
            }
            Self::UnknownCommandError { .. } => "Type `help` to list commands".to_string(),
            Self::CalculationError { .. } => {
                "Try a smaller value or a different unit pair".to_string()
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command line flags".to_string()
            }
            Self::IoError(_) => "Check file permissions and that the path exists".to_string(),
            Self::SerializationError(_) => {
                "The stored file is corrupt; delete it to start fresh".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ValidationError { message, .. } => message.clone(),
            Self::CalculationError { message } => {
                format!("An error occurred during conversion: {}", message)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConverterError>;
