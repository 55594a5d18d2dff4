use crate::config::theme::SystemTheme;
use crate::config::toml_config::{ConverterConfig, MAX_DEBOUNCE_MS, MAX_PRECISION};
use crate::domain::model::Category;
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Parser)]
#[command(name = "unit-converter")]
#[command(about = "Convert length, weight, temperature and volume units")]
pub struct CliConfig {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Measurement category (defaults to the configured one)
    #[arg(long, value_enum)]
    pub category: Option<Category>,

    /// Value to convert; without it the interactive prompt starts
    #[arg(long, allow_hyphen_values = true)]
    pub value: Option<String>,

    /// Source unit code, e.g. km
    #[arg(long)]
    pub from: Option<String>,

    /// Target unit code, e.g. mi
    #[arg(long)]
    pub to: Option<String>,

    #[arg(long)]
    pub debounce_ms: Option<u64>,

    #[arg(long)]
    pub precision: Option<u32>,

    /// Where the explicit theme choice is stored
    #[arg(long)]
    pub theme_file: Option<String>,

    /// Override the detected system color scheme
    #[arg(long, value_enum)]
    pub system_theme: Option<SystemTheme>,

    #[arg(long, help = "Print results and state as JSON")]
    pub json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl CliConfig {
    pub fn is_one_shot(&self) -> bool {
        self.value.is_some()
    }

    /// 載入設定檔（若有），再套用命令列覆蓋
    pub fn resolve(&self) -> Result<ConverterConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path);
                ConverterConfig::from_file(path)?
            }
            None => ConverterConfig::default(),
        };

        if let Some(category) = self.category {
            config.engine.default_category = category;
        }
        if let Some(debounce_ms) = self.debounce_ms {
            config.engine.debounce_ms = debounce_ms;
        }
        if let Some(precision) = self.precision {
            config.engine.precision = precision;
        }
        if let Some(path) = &self.theme_file {
            config.theme.path = path.clone();
        }
        if self.system_theme.is_some() {
            config.theme.system = self.system_theme;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.config {
            validate_non_empty_string("config", path)?;
        }
        if let Some(debounce_ms) = self.debounce_ms {
            validate_range("debounce_ms", debounce_ms, 0, MAX_DEBOUNCE_MS)?;
        }
        if let Some(precision) = self.precision {
            validate_range("precision", precision, 0, MAX_PRECISION)?;
        }
        Ok(())
    }
}
