pub mod catalog;
pub mod conversion;
pub mod debounce;
pub mod engine;

pub use crate::domain::model::{Category, ConversionOutcome, ConversionState, EngineEvent, Unit};
pub use crate::domain::ports::ThemeStore;
pub use crate::utils::error::Result;
