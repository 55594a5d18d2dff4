use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, oneshot, Mutex};

use crate::core::catalog::{find_unit, unit_name, units_for};
use crate::core::conversion::{convert_units, round_to, DEFAULT_PRECISION};
use crate::core::debounce::Debouncer;
use crate::domain::model::{
    Category, ConversionOutcome, ConversionState, EngineEvent, Field, Unit,
};
use crate::utils::error::{ConverterError, Result};
use crate::utils::validation::{check_input_value, check_unit_selected};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
const EVENT_CAPACITY: usize = 64;

/// Computes a raw (unrounded) conversion between two units of one category.
pub type ConvertFn = fn(f64, &Unit, &Unit) -> Result<f64>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub default_category: Category,
    pub debounce: Duration,
    pub precision: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_category: Category::default(),
            debounce: DEFAULT_DEBOUNCE,
            precision: DEFAULT_PRECISION,
        }
    }
}

struct EngineInner {
    state: ConversionState,
    debouncer: Debouncer,
}

/// Handle to a scheduled conversion.
#[derive(Debug)]
pub struct PendingConversion {
    generation: u64,
    outcome: oneshot::Receiver<Result<f64>>,
}

impl PendingConversion {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves once the job commits, fails, or is cancelled. Inputs that no
    /// longer validate when the delay elapses resolve to the validation error.
    pub async fn wait(self) -> Result<ConversionOutcome> {
        match self.outcome.await {
            Ok(Ok(value)) => Ok(ConversionOutcome::Converted(value)),
            Ok(Err(e)) => Err(e),
            // sender dropped: the job was aborted or lost the generation check
            Err(_) => Ok(ConversionOutcome::Superseded),
        }
    }
}

/// Owns the conversion state and publishes it after every mutation.
///
/// Cloning is cheap and every clone drives the same state, so the shell can
/// hand one to the renderer and keep another for the command loop.
#[derive(Clone)]
pub struct ConversionEngine {
    inner: Arc<Mutex<EngineInner>>,
    events: broadcast::Sender<EngineEvent>,
    precision: u32,
    converter: ConvertFn,
}

impl ConversionEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self::with_converter(options, convert_units)
    }

    pub fn with_converter(options: EngineOptions, converter: ConvertFn) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(EngineInner {
                state: ConversionState::new(options.default_category),
                debouncer: Debouncer::new(options.debounce),
            })),
            events,
            precision: options.precision,
            converter,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn categories() -> [Category; 4] {
        Category::ALL
    }

    pub async fn snapshot(&self) -> ConversionState {
        self.inner.lock().await.state.clone()
    }

    pub async fn category(&self) -> Category {
        self.inner.lock().await.state.category
    }

    pub async fn has_errors(&self) -> bool {
        self.inner.lock().await.state.has_errors()
    }

    pub async fn available_units(&self) -> &'static [Unit] {
        units_for(self.category().await)
    }

    /// Display name of `code` in the active category, empty when unknown.
    pub async fn unit_name(&self, code: &str) -> &'static str {
        unit_name(self.category().await, code)
    }

    pub async fn set_category(&self, category: Category) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if inner.debouncer.cancel() {
            tracing::debug!("Pending conversion dropped by category change");
        }
        inner.state.category = category;
        inner.state.clear_inputs();
        tracing::debug!("Category set to {}", category);
        self.publish(&inner.state);
    }

    /// Stores the raw text and re-validates it. Does not convert.
    pub async fn set_input_value(&self, raw: impl Into<String>) -> bool {
        let raw = raw.into();
        let mut guard = self.inner.lock().await;
        let state = &mut guard.state;
        state.input_value = if raw.is_empty() { None } else { Some(raw) };
        let valid = run_input_validation(state).is_some();
        self.publish(state);
        valid
    }

    pub async fn set_from_unit(&self, code: &str) -> Result<()> {
        self.set_unit(UnitSide::From, code).await
    }

    pub async fn set_to_unit(&self, code: &str) -> Result<()> {
        self.set_unit(UnitSide::To, code).await
    }

    async fn set_unit(&self, side: UnitSide, code: &str) -> Result<()> {
        let code = code.trim();
        let mut guard = self.inner.lock().await;
        let state = &mut guard.state;

        let outcome = if code.is_empty() {
            *side.slot(state) = None;
            Ok(())
        } else {
            match find_unit(state.category, code) {
                Some(unit) => {
                    *side.slot(state) = Some(unit.code);
                    Ok(())
                }
                None => Err(ConverterError::UnknownUnitError {
                    category: state.category,
                    code: code.to_string(),
                }),
            }
        };

        run_unit_validation(state);
        if outcome.is_err() {
            tracing::debug!("Rejected unit '{}' for {}", code, state.category);
            state
                .errors
                .set(side.field(), format!("Unknown unit for {}: {}", state.category, code));
        }
        self.publish(state);
        outcome
    }

    pub async fn validate_input(&self) -> bool {
        let mut guard = self.inner.lock().await;
        let valid = run_input_validation(&mut guard.state).is_some();
        self.publish(&guard.state);
        valid
    }

    pub async fn validate_units(&self) -> bool {
        let mut guard = self.inner.lock().await;
        let valid = run_unit_validation(&mut guard.state);
        self.publish(&guard.state);
        valid
    }

    /// Validates, then schedules the computation after the debounce delay.
    ///
    /// Any conversion that has not fired yet is cancelled first, even when
    /// validation fails. On validation failure `result` is left untouched.
    /// The job reads the inputs again when it fires, so edits made while it
    /// waits are what gets converted.
    pub async fn convert(&self) -> Result<PendingConversion> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if inner.debouncer.cancel() {
            tracing::debug!("Superseding pending conversion");
        }

        let value_ok = run_input_validation(&mut inner.state).is_some();
        let units_ok = run_unit_validation(&mut inner.state);
        if !(value_ok && units_ok) {
            inner.state.in_progress = false;
            self.publish(&inner.state);
            return Err(first_field_error(&inner.state));
        }

        inner.state.in_progress = true;
        let (tx, rx) = oneshot::channel();
        let engine = self.clone();
        let generation = inner.debouncer.schedule(move |generation| async move {
            if let Some(outcome) = engine.fire(generation).await {
                let _ = tx.send(outcome);
            }
        });

        tracing::debug!(
            "Conversion #{} scheduled in {:?}",
            generation,
            inner.debouncer.delay()
        );
        self.publish(&inner.state);
        Ok(PendingConversion {
            generation,
            outcome: rx,
        })
    }

    /// Body of a scheduled conversion. None when a later schedule or cancel
    /// has taken over; the caller then drops its sender.
    async fn fire(&self, generation: u64) -> Option<Result<f64>> {
        let mut guard = self.inner.lock().await;
        if !guard.debouncer.is_current(generation) {
            return None;
        }
        let state = &mut guard.state;
        state.in_progress = false;

        let value = run_input_validation(state);
        let units_ok = run_unit_validation(state);
        let outcome = match (value, units_ok) {
            (Some(value), true) => self.compute(state, value),
            _ => Err(first_field_error(state)),
        };

        match &outcome {
            Ok(converted) => state.result = Some(*converted),
            Err(ConverterError::ValidationError { field, message }) => {
                tracing::debug!("Inputs no longer valid at fire time ({}: {})", field, message);
            }
            Err(e) => {
                tracing::warn!("Conversion failed: {}", e);
                let _ = self.events.send(EngineEvent::ConversionFailed {
                    message: e.user_friendly_message(),
                });
            }
        }
        self.publish(state);
        Some(outcome)
    }

    fn compute(&self, state: &ConversionState, value: f64) -> Result<f64> {
        let from = resolve_unit(state.category, state.from_unit)?;
        let to = resolve_unit(state.category, state.to_unit)?;
        let converted = round_to((self.converter)(value, from, to)?, self.precision);
        tracing::info!(
            "Converted {} {} -> {} {}",
            value,
            from.code,
            converted,
            to.code
        );
        Ok(converted)
    }

    /// Exchanges the units when both are set, reconverting if a result exists.
    pub async fn swap_units(&self) -> Result<Option<PendingConversion>> {
        let had_result = {
            let mut guard = self.inner.lock().await;
            let state = &mut guard.state;
            let (Some(from), Some(to)) = (state.from_unit, state.to_unit) else {
                return Ok(None);
            };
            state.from_unit = Some(to);
            state.to_unit = Some(from);
            run_unit_validation(state);
            self.publish(state);
            state.result.is_some()
        };

        if had_result {
            self.convert().await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Clears inputs, result and errors; keeps the category.
    pub async fn reset(&self) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        inner.debouncer.cancel();
        inner.state.clear_inputs();
        self.publish(&inner.state);
    }

    fn publish(&self, state: &ConversionState) {
        // no subscribers is fine
        let _ = self.events.send(EngineEvent::StateChanged(state.clone()));
    }
}

impl Default for ConversionEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

#[derive(Debug, Clone, Copy)]
enum UnitSide {
    From,
    To,
}

impl UnitSide {
    fn field(self) -> Field {
        match self {
            UnitSide::From => Field::FromUnit,
            UnitSide::To => Field::ToUnit,
        }
    }

    fn slot(self, state: &mut ConversionState) -> &mut Option<&'static str> {
        match self {
            UnitSide::From => &mut state.from_unit,
            UnitSide::To => &mut state.to_unit,
        }
    }
}

fn run_input_validation(state: &mut ConversionState) -> Option<f64> {
    match check_input_value(state.input_value.as_deref()) {
        Ok(value) => {
            state.errors.clear(Field::InputValue);
            Some(value)
        }
        Err(message) => {
            state.errors.set(Field::InputValue, message);
            None
        }
    }
}

fn run_unit_validation(state: &mut ConversionState) -> bool {
    let mut valid = true;
    for (field, code) in [
        (Field::FromUnit, state.from_unit),
        (Field::ToUnit, state.to_unit),
    ] {
        match check_unit_selected(code) {
            Ok(()) => state.errors.clear(field),
            Err(message) => {
                state.errors.set(field, message);
                valid = false;
            }
        }
    }
    valid
}

fn resolve_unit(category: Category, code: Option<&'static str>) -> Result<&'static Unit> {
    let code = code.unwrap_or_default();
    find_unit(category, code).ok_or_else(|| ConverterError::UnknownUnitError {
        category,
        code: code.to_string(),
    })
}

fn first_field_error(state: &ConversionState) -> ConverterError {
    [Field::InputValue, Field::FromUnit, Field::ToUnit]
        .into_iter()
        .find(|field| !state.errors.get(*field).is_empty())
        .map(|field| ConverterError::validation(field, state.errors.get(field)))
        .unwrap_or_else(|| ConverterError::validation(Field::InputValue, "Invalid input"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::{MSG_INVALID_NUMBER, MSG_UNIT_REQUIRED, MSG_VALUE_REQUIRED};

    async fn engine_with(category: Category, value: &str, from: &str, to: &str) -> ConversionEngine {
        let engine = ConversionEngine::default();
        engine.set_category(category).await;
        engine.set_input_value(value).await;
        engine.set_from_unit(from).await.unwrap();
        engine.set_to_unit(to).await.unwrap();
        engine
    }

    async fn converted(engine: &ConversionEngine) -> f64 {
        match engine.convert().await.unwrap().wait().await.unwrap() {
            ConversionOutcome::Converted(value) => value,
            ConversionOutcome::Superseded => panic!("conversion was superseded"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_convert_km_to_m() {
        let engine = engine_with(Category::Length, "1", "km", "m").await;
        assert_eq!(converted(&engine).await, 1000.0);

        let state = engine.snapshot().await;
        assert_eq!(state.result, Some(1000.0));
        assert!(!state.in_progress);
        assert!(!state.has_errors());
    }

    #[tokio::test(start_paused = true)]
    async fn test_convert_rounds_to_six_digits() {
        let engine = engine_with(Category::Length, "1", "mm", "in").await;
        // 0.03937007874...
        assert_eq!(converted(&engine).await, 0.03937);
    }

    #[tokio::test(start_paused = true)]
    async fn test_convert_temperature() {
        let engine = engine_with(Category::Temperature, "0", "C", "K").await;
        assert_eq!(converted(&engine).await, 273.15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_progress_until_debounce_fires() {
        let engine = engine_with(Category::Weight, "2", "kg", "g").await;
        let pending = engine.convert().await.unwrap();
        assert!(engine.snapshot().await.in_progress);
        assert_eq!(engine.snapshot().await.result, None);

        assert_eq!(
            pending.wait().await.unwrap(),
            ConversionOutcome::Converted(2000.0)
        );
        assert!(!engine.snapshot().await.in_progress);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_input_blocks_convert_and_keeps_result() {
        let engine = engine_with(Category::Length, "1", "km", "m").await;
        converted(&engine).await;

        assert!(!engine.set_input_value("abc").await);
        let err = engine.convert().await.unwrap_err();
        assert!(matches!(
            err,
            ConverterError::ValidationError {
                field: Field::InputValue,
                ..
            }
        ));

        let state = engine.snapshot().await;
        assert_eq!(state.errors.input_value, MSG_INVALID_NUMBER);
        assert_eq!(state.result, Some(1000.0));
        assert!(!state.in_progress);
    }

    #[tokio::test(start_paused = true)]
    async fn test_convert_reports_every_field_error() {
        let engine = ConversionEngine::default();
        assert!(engine.convert().await.is_err());

        let state = engine.snapshot().await;
        assert_eq!(state.errors.input_value, MSG_VALUE_REQUIRED);
        assert_eq!(state.errors.from_unit, MSG_UNIT_REQUIRED);
        assert_eq!(state.errors.to_unit, MSG_UNIT_REQUIRED);
        assert!(engine.has_errors().await);
    }

    #[tokio::test]
    async fn test_validate_units() {
        let engine = ConversionEngine::default();
        engine.set_from_unit("m").await.unwrap();
        assert!(!engine.validate_units().await);
        let state = engine.snapshot().await;
        assert_eq!(state.errors.from_unit, "");
        assert_eq!(state.errors.to_unit, MSG_UNIT_REQUIRED);

        engine.set_to_unit("ft").await.unwrap();
        assert!(engine.validate_units().await);
        assert!(!engine.has_errors().await);
    }

    #[tokio::test]
    async fn test_unknown_unit_rejected() {
        let engine = ConversionEngine::default();
        engine.set_from_unit("m").await.unwrap();

        let err = engine.set_from_unit("kg").await.unwrap_err();
        assert!(matches!(err, ConverterError::UnknownUnitError { .. }));

        let state = engine.snapshot().await;
        assert_eq!(state.from_unit, Some("m"));
        assert!(state.errors.from_unit.contains("kg"));
    }

    #[tokio::test]
    async fn test_empty_code_clears_unit() {
        let engine = ConversionEngine::default();
        engine.set_to_unit("km").await.unwrap();
        engine.set_to_unit("").await.unwrap();

        let state = engine.snapshot().await;
        assert_eq!(state.to_unit, None);
        assert_eq!(state.errors.to_unit, MSG_UNIT_REQUIRED);
    }

    #[tokio::test(start_paused = true)]
    async fn test_swap_recomputes_existing_result() {
        let engine = engine_with(Category::Length, "1000", "m", "km").await;
        assert_eq!(converted(&engine).await, 1.0);

        let pending = engine.swap_units().await.unwrap().expect("reconversion");
        assert_eq!(
            pending.wait().await.unwrap(),
            ConversionOutcome::Converted(1_000_000.0)
        );

        let state = engine.snapshot().await;
        assert_eq!(state.from_unit, Some("km"));
        assert_eq!(state.to_unit, Some("m"));
        assert_eq!(state.result, Some(1_000_000.0));
    }

    #[tokio::test]
    async fn test_swap_without_result_only_exchanges() {
        let engine = engine_with(Category::Volume, "1", "gal", "l").await;
        assert!(engine.swap_units().await.unwrap().is_none());

        let state = engine.snapshot().await;
        assert_eq!(state.from_unit, Some("l"));
        assert_eq!(state.to_unit, Some("gal"));
        assert_eq!(state.result, None);
    }

    #[tokio::test]
    async fn test_swap_needs_both_units() {
        let engine = ConversionEngine::default();
        engine.set_from_unit("m").await.unwrap();
        assert!(engine.swap_units().await.unwrap().is_none());
        assert_eq!(engine.snapshot().await.from_unit, Some("m"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_category_clears_state() {
        let engine = engine_with(Category::Length, "1", "km", "m").await;
        converted(&engine).await;

        engine.set_category(Category::Weight).await;
        let state = engine.snapshot().await;
        assert_eq!(state, ConversionState::new(Category::Weight));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_keeps_category() {
        let engine = engine_with(Category::Temperature, "20", "C", "F").await;
        converted(&engine).await;

        engine.reset().await;
        assert_eq!(
            engine.snapshot().await,
            ConversionState::new(Category::Temperature)
        );
    }

    #[tokio::test]
    async fn test_unit_name_uses_active_category() {
        let engine = ConversionEngine::default();
        assert_eq!(engine.unit_name("mi").await, "Miles");
        assert_eq!(engine.unit_name("oz").await, "");

        engine.set_category(Category::Weight).await;
        assert_eq!(engine.unit_name("oz").await, "Ounces");
        assert_eq!(engine.available_units().await.len(), 6);
    }

    #[tokio::test]
    async fn test_mutations_are_published() {
        let engine = ConversionEngine::default();
        let mut events = engine.subscribe();

        engine.set_input_value("12").await;
        match events.recv().await.unwrap() {
            EngineEvent::StateChanged(state) => {
                assert_eq!(state.input_value.as_deref(), Some("12"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_swap_while_waiting_converts_swapped_units() {
        let engine = engine_with(Category::Length, "1000", "m", "km").await;
        let pending = engine.convert().await.unwrap();
        assert!(engine.swap_units().await.unwrap().is_none());

        assert_eq!(
            pending.wait().await.unwrap(),
            ConversionOutcome::Converted(1_000_000.0)
        );
        let state = engine.snapshot().await;
        assert_eq!(state.from_unit, Some("km"));
        assert_eq!(state.to_unit, Some("m"));
        assert_eq!(state.result, Some(1_000_000.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unit_change_while_waiting_uses_new_unit() {
        let engine = engine_with(Category::Length, "1", "km", "m").await;
        let pending = engine.convert().await.unwrap();
        engine.set_from_unit("mi").await.unwrap();

        assert_eq!(
            pending.wait().await.unwrap(),
            ConversionOutcome::Converted(1609.344)
        );
        assert_eq!(engine.snapshot().await.result, Some(1609.344));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_edit_while_waiting_commits_nothing() {
        let engine = engine_with(Category::Length, "1", "km", "m").await;
        assert_eq!(converted(&engine).await, 1000.0);

        let pending = engine.convert().await.unwrap();
        engine.set_from_unit("mi").await.unwrap();
        assert!(!engine.set_input_value("abc").await);

        let err = pending.wait().await.unwrap_err();
        assert!(matches!(
            err,
            ConverterError::ValidationError {
                field: Field::InputValue,
                ..
            }
        ));
        let state = engine.snapshot().await;
        assert_eq!(state.result, Some(1000.0));
        assert_eq!(state.errors.input_value, MSG_INVALID_NUMBER);
        assert!(!state.in_progress);
    }

    fn fails_above_hundred(value: f64, from: &Unit, to: &Unit) -> Result<f64> {
        if value > 100.0 {
            return Err(ConverterError::calculation(
                "Calculation resulted in an invalid value",
            ));
        }
        convert_units(value, from, to)
    }

    #[tokio::test(start_paused = true)]
    async fn test_calculation_failure_keeps_result_and_engine_usable() {
        let engine = ConversionEngine::with_converter(EngineOptions::default(), fails_above_hundred);
        engine.set_input_value("1").await;
        engine.set_from_unit("km").await.unwrap();
        engine.set_to_unit("m").await.unwrap();
        assert_eq!(converted(&engine).await, 1000.0);

        let mut events = engine.subscribe();
        engine.set_input_value("500").await;
        let err = engine.convert().await.unwrap().wait().await.unwrap_err();
        assert!(matches!(err, ConverterError::CalculationError { .. }));

        let mut failures = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let EngineEvent::ConversionFailed { message } = event {
                failures.push(message);
            }
        }
        assert_eq!(
            failures,
            vec!["An error occurred during conversion: Calculation resulted in an invalid value"]
        );

        let state = engine.snapshot().await;
        assert_eq!(state.result, Some(1000.0));
        assert!(!state.in_progress);

        engine.set_input_value("2").await;
        assert_eq!(converted(&engine).await, 2000.0);
    }

    #[tokio::test]
    async fn test_set_unit_touches_only_its_own_field() {
        let engine = ConversionEngine::default();
        engine.set_input_value("3").await;
        engine.set_from_unit("yd").await.unwrap();
        engine.set_to_unit("ft").await.unwrap();
        let _ = engine.set_to_unit("kg").await;

        let state = engine.snapshot().await;
        assert_eq!(state.input_value.as_deref(), Some("3"));
        assert_eq!(state.from_unit, Some("yd"));
        assert_eq!(state.to_unit, Some("ft"));
        assert!(state.errors.from_unit.is_empty());
        assert!(state.errors.to_unit.contains("kg"));
    }
}
