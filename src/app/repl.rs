use crate::app::render::{format_errors, format_result, ThemeFlag};
use crate::config::theme::{SystemTheme, ThemeController};
use crate::core::catalog::units_for;
use crate::core::engine::{ConversionEngine, PendingConversion};
use crate::domain::model::{Category, ConversionOutcome, Field};
use crate::utils::error::{ConverterError, Result};
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::Ordering;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const HELP: &str = "\
Commands:
  category <length|weight|temperature|volume>   switch category (clears inputs)
  value <number>                                set the value to convert
  from <code> / to <code>                       pick units (see `units`)
  convert                                       convert after a short pause
  swap                                          exchange the units
  reset                                         clear inputs, keep category
  units | categories | state                    show available options / current state
  theme [toggle|system|system <dark|light>]     show or change the color theme
  help | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeAction {
    Show,
    Toggle,
    /// Forget the explicit choice and follow the system again.
    FollowSystem,
    SystemChanged(SystemTheme),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Category(Category),
    Value(String),
    From(String),
    To(String),
    Convert,
    Swap,
    Reset,
    Units,
    Categories,
    State,
    Theme(ThemeAction),
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = ConverterError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let unknown = || ConverterError::UnknownCommandError {
            input: line.to_string(),
        };

        Ok(match word.to_ascii_lowercase().as_str() {
            "category" | "cat" => Command::Category(rest.parse()?),
            "value" | "v" => Command::Value(rest.to_string()),
            "from" => Command::From(rest.to_string()),
            "to" => Command::To(rest.to_string()),
            "convert" | "c" => Command::Convert,
            "swap" => Command::Swap,
            "reset" => Command::Reset,
            "units" => Command::Units,
            "categories" => Command::Categories,
            "state" => Command::State,
            "theme" => Command::Theme(match rest {
                "" => ThemeAction::Show,
                "toggle" => ThemeAction::Toggle,
                "system" => ThemeAction::FollowSystem,
                "system dark" => ThemeAction::SystemChanged(SystemTheme::Dark),
                "system light" => ThemeAction::SystemChanged(SystemTheme::Light),
                _ => return Err(unknown()),
            }),
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            _ => return Err(unknown()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive command loop. Results arrive through the renderer; this only
/// prints direct answers and errors.
pub struct Session<W: Write> {
    engine: ConversionEngine,
    theme: ThemeController,
    theme_flag: ThemeFlag,
    system: SystemTheme,
    pending: Option<PendingConversion>,
    json: bool,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(
        engine: ConversionEngine,
        theme: ThemeController,
        theme_flag: ThemeFlag,
        system: SystemTheme,
        json: bool,
        out: W,
    ) -> Self {
        theme_flag.store(theme.is_dark(), Ordering::Relaxed);
        Self {
            engine,
            theme,
            theme_flag,
            system,
            pending: None,
            json,
            out,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn is_dark(&self) -> bool {
        self.theme.is_dark()
    }

    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<()> {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let outcome = match line.parse::<Command>() {
                Ok(command) => self.execute(command).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => {
                    if !e.is_recoverable() {
                        tracing::error!("Command failed: {} ({:?})", e, e.severity());
                    }
                    writeln!(self.out, "! {}", e.user_friendly_message())?;
                }
            }
        }

        self.finish().await?;
        Ok(())
    }

    /// Waits for the last scheduled conversion so piped input still gets its answer.
    pub async fn finish(&mut self) -> Result<Option<ConversionOutcome>> {
        let Some(pending) = self.pending.take() else {
            return Ok(None);
        };
        match pending.wait().await {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e) => {
                writeln!(self.out, "! {}", e.user_friendly_message())?;
                Ok(None)
            }
        }
    }

    pub async fn execute(&mut self, command: Command) -> Result<Flow> {
        tracing::debug!("Command: {:?}", command);
        match command {
            Command::Category(category) => self.engine.set_category(category).await,
            Command::Value(raw) => {
                if !self.engine.set_input_value(raw).await {
                    self.print_field_errors(&[Field::InputValue]).await?;
                }
            }
            Command::From(code) => self.engine.set_from_unit(&code).await?,
            Command::To(code) => self.engine.set_to_unit(&code).await?,
            Command::Convert => match self.engine.convert().await {
                Ok(pending) => self.pending = Some(pending),
                Err(ConverterError::ValidationError { .. }) => {
                    self.print_field_errors(&[Field::InputValue, Field::FromUnit, Field::ToUnit])
                        .await?
                }
                Err(e) => return Err(e),
            },
            Command::Swap => {
                if let Some(pending) = self.engine.swap_units().await? {
                    self.pending = Some(pending);
                }
                let state = self.engine.snapshot().await;
                writeln!(
                    self.out,
                    "From: {}  To: {}",
                    state.from_unit.unwrap_or("-"),
                    state.to_unit.unwrap_or("-")
                )?;
            }
            Command::Reset => self.engine.reset().await,
            Command::Units => {
                let category = self.engine.category().await;
                writeln!(self.out, "{} units:", category.display_name())?;
                for unit in units_for(category) {
                    writeln!(self.out, "  {:<5} {}", unit.code, unit.name)?;
                }
            }
            Command::Categories => {
                let active = self.engine.category().await;
                for category in ConversionEngine::categories() {
                    let marker = if category == active { "*" } else { " " };
                    writeln!(
                        self.out,
                        "{} {:<12} ({})",
                        marker,
                        category.display_name(),
                        category
                    )?;
                }
            }
            Command::State => self.print_state().await?,
            Command::Theme(action) => self.apply_theme(action).await?,
            Command::Help => writeln!(self.out, "{}", HELP)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn print_field_errors(&mut self, fields: &[Field]) -> Result<()> {
        let state = self.engine.snapshot().await;
        for field in fields {
            let message = state.errors.get(*field);
            if !message.is_empty() {
                writeln!(self.out, "! {}: {}", field, message)?;
            }
        }
        Ok(())
    }

    async fn print_state(&mut self) -> Result<()> {
        let state = self.engine.snapshot().await;
        if self.json {
            writeln!(self.out, "{}", serde_json::to_string_pretty(&state)?)?;
            return Ok(());
        }

        writeln!(self.out, "Category: {}", state.category.display_name())?;
        writeln!(
            self.out,
            "Value:    {}",
            state.input_value.as_deref().unwrap_or("-")
        )?;
        writeln!(self.out, "From:     {}", state.from_unit.unwrap_or("-"))?;
        writeln!(self.out, "To:       {}", state.to_unit.unwrap_or("-"))?;
        match (state.in_progress, format_result(&state)) {
            (true, _) => writeln!(self.out, "Result:   (converting...)")?,
            (false, Some(line)) => writeln!(self.out, "Result:   {}", line)?,
            (false, None) => writeln!(self.out, "Result:   -")?,
        }
        for line in format_errors(&state) {
            writeln!(self.out, "! {}", line)?;
        }
        Ok(())
    }

    async fn apply_theme(&mut self, action: ThemeAction) -> Result<()> {
        match action {
            ThemeAction::Show => {}
            ThemeAction::Toggle => {
                self.theme.toggle().await?;
            }
            ThemeAction::FollowSystem => self.theme.clear_preference(self.system).await?,
            ThemeAction::SystemChanged(system) => {
                self.system = system;
                if self.theme.on_system_change(system) {
                    tracing::debug!("Theme follows system change to {:?}", system);
                }
            }
        }

        self.theme_flag.store(self.theme.is_dark(), Ordering::Relaxed);
        let mode = if self.theme.is_dark() { "dark" } else { "light" };
        let source = if self.theme.is_explicit() {
            "saved"
        } else {
            "following system"
        };
        writeln!(self.out, "Theme: {} ({})", mode, source)?;
        Ok(())
    }
}
