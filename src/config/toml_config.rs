use crate::config::theme::SystemTheme;
use crate::core::engine::EngineOptions;
use crate::domain::model::Category;
use crate::utils::error::{ConverterError, Result};
use crate::utils::validation::{validate_path, validate_range, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_THEME_FILE: &str = "unit-converter-theme.json";
pub const MAX_DEBOUNCE_MS: u64 = 10_000;
pub const MAX_PRECISION: u32 = 12;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub engine: EngineSection,
    pub theme: ThemeSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub default_category: Category,
    pub debounce_ms: u64,
    pub precision: u32,
}

impl Default for EngineSection {
    fn default() -> Self {
        let options = EngineOptions::default();
        Self {
            default_category: options.default_category,
            debounce_ms: options.debounce.as_millis() as u64,
            precision: options.precision,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeSection {
    pub path: String,
    /// Overrides the detected system color scheme.
    pub system: Option<SystemTheme>,
}

impl Default for ThemeSection {
    fn default() -> Self {
        Self {
            path: DEFAULT_THEME_FILE.to_string(),
            system: None,
        }
    }
}

impl ConverterConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ConverterError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ConverterError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${THEME_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConverterError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_range("engine.debounce_ms", self.engine.debounce_ms, 0, MAX_DEBOUNCE_MS)?;
        validate_range("engine.precision", self.engine.precision, 0, MAX_PRECISION)?;
        validate_path("theme.path", &self.theme.path)?;
        Ok(())
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            default_category: self.engine.default_category,
            debounce: Duration::from_millis(self.engine.debounce_ms),
            precision: self.engine.precision,
        }
    }
}

impl Validate for ConverterConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
