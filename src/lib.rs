pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ConverterConfig;

pub use core::engine::{ConversionEngine, EngineOptions, PendingConversion};
pub use domain::model::{Category, ConversionOutcome, ConversionState, EngineEvent};
pub use utils::error::{ConverterError, Result};
