// Shell layer: the pieces `main` wires together around one engine instance.

pub mod render;
pub mod repl;

use crate::core::engine::ConversionEngine;
use crate::domain::model::ConversionOutcome;
use crate::utils::error::{ConverterError, Result};

/// Feeds one value through the engine and waits for the debounced result.
pub async fn convert_once(
    engine: &ConversionEngine,
    value: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<f64> {
    engine.set_input_value(value).await;
    engine.set_from_unit(from.unwrap_or_default()).await?;
    engine.set_to_unit(to.unwrap_or_default()).await?;

    match engine.convert().await?.wait().await? {
        ConversionOutcome::Converted(result) => Ok(result),
        ConversionOutcome::Superseded => Err(ConverterError::calculation(
            "Conversion was cancelled before it finished",
        )),
    }
}
