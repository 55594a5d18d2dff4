use crate::core::catalog::unit_name;
use crate::domain::model::{ConversionState, EngineEvent, Field};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

const RESET: &str = "\x1b[0m";

/// Shared dark-mode flag read by the renderer on every line.
pub type ThemeFlag = Arc<AtomicBool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub result: &'static str,
    pub error: &'static str,
}

impl Palette {
    pub fn for_theme(dark: bool) -> Self {
        if dark {
            Self {
                result: "\x1b[96m",
                error: "\x1b[91m",
            }
        } else {
            Self {
                result: "\x1b[34m",
                error: "\x1b[31m",
            }
        }
    }

    pub fn plain() -> Self {
        Self {
            result: "",
            error: "",
        }
    }

    pub fn paint(&self, color: &str, text: &str) -> String {
        if color.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", color, text, RESET)
        }
    }
}

/// "1 Kilometers = 1000 Meters", or None while there is nothing to show.
pub fn format_result(state: &ConversionState) -> Option<String> {
    let result = state.result?;
    let from = state.from_unit.map(|c| unit_name(state.category, c)).unwrap_or("");
    let to = state.to_unit.map(|c| unit_name(state.category, c)).unwrap_or("");
    let value = state.input_value.as_deref().unwrap_or("").trim();
    Some(format!("{} {} = {} {}", value, from, result, to))
}

pub fn format_errors(state: &ConversionState) -> Vec<String> {
    [Field::InputValue, Field::FromUnit, Field::ToUnit]
        .into_iter()
        .filter(|field| !state.errors.get(*field).is_empty())
        .map(|field| format!("{}: {}", field, state.errors.get(field)))
        .collect()
}

/// Lines worth printing when the state moves from `prev` to `next`.
///
/// Field errors are reported by the command loop, so only results and
/// clears show up here.
pub fn describe_change(prev: &ConversionState, next: &ConversionState) -> Vec<String> {
    let mut lines = Vec::new();
    if prev.category != next.category {
        lines.push(format!("Category: {}", next.category.display_name()));
    }
    let committed = prev.in_progress && !next.in_progress && !next.has_errors();
    if next.result != prev.result || committed {
        if let Some(line) = format_result(next) {
            lines.push(line);
        }
    }
    lines
}

/// Subscribes to engine events and prints them until the engine is gone.
pub fn spawn_renderer<W>(
    mut events: broadcast::Receiver<EngineEvent>,
    initial: ConversionState,
    theme: ThemeFlag,
    color: bool,
    mut out: W,
) -> JoinHandle<()>
where
    W: Write + Send + 'static,
{
    tokio::spawn(async move {
        let mut last = initial;
        loop {
            let palette = if color {
                Palette::for_theme(theme.load(Ordering::Relaxed))
            } else {
                Palette::plain()
            };
            let lines: Vec<String> = match events.recv().await {
                Ok(EngineEvent::StateChanged(state)) => {
                    let lines = describe_change(&last, &state)
                        .into_iter()
                        .map(|line| palette.paint(palette.result, &line))
                        .collect();
                    last = state;
                    lines
                }
                Ok(EngineEvent::ConversionFailed { message }) => {
                    // the state that follows carries the old result; don't echo it
                    last.in_progress = false;
                    vec![palette.paint(palette.error, &format!("! {}", message))]
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Renderer skipped {} events", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            for line in lines {
                if writeln!(out, "{}", line).is_err() {
                    return;
                }
            }
            let _ = out.flush();
        }
        tracing::debug!("Renderer stopped");
    })
}
