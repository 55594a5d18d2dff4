use crate::domain::ports::ThemeStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum SystemTheme {
    Dark,
    Light,
}

impl SystemTheme {
    pub fn is_dark(&self) -> bool {
        matches!(self, SystemTheme::Dark)
    }
}

/// Reads the terminal's `COLORFGBG` ("fg;bg" or "fg;default;bg").
///
/// Background colors 0-6 and 8 are the dark half of the 16-color palette.
pub fn parse_colorfgbg(value: &str) -> Option<SystemTheme> {
    let background: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
    Some(match background {
        0..=6 | 8 => SystemTheme::Dark,
        _ => SystemTheme::Light,
    })
}

pub fn detect_system_theme() -> SystemTheme {
    std::env::var("COLORFGBG")
        .ok()
        .and_then(|v| parse_colorfgbg(&v))
        .unwrap_or(SystemTheme::Light)
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredTheme {
    dark_mode: bool,
    updated_at: DateTime<Utc>,
}

/// Keeps the explicit choice in a small JSON file.
#[derive(Debug, Clone)]
pub struct FileThemeStore {
    path: PathBuf,
}

impl FileThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ThemeStore for FileThemeStore {
    async fn load(&self) -> Result<Option<bool>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let stored: StoredTheme = serde_json::from_str(&content)?;
        tracing::debug!(
            "Loaded theme preference (dark={}) set at {}",
            stored.dark_mode,
            stored.updated_at
        );
        Ok(Some(stored.dark_mode))
    }

    async fn save(&self, dark: bool) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let stored = StoredTheme {
            dark_mode: dark,
            updated_at: Utc::now(),
        };
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(&stored)?).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryThemeStore {
    value: Mutex<Option<bool>>,
}

impl MemoryThemeStore {
    pub fn new(initial: Option<bool>) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }
}

#[async_trait]
impl ThemeStore for MemoryThemeStore {
    async fn load(&self) -> Result<Option<bool>> {
        Ok(*self.value.lock().await)
    }

    async fn save(&self, dark: bool) -> Result<()> {
        *self.value.lock().await = Some(dark);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.value.lock().await = None;
        Ok(())
    }
}

/// Dark-mode flag. An explicit choice wins over the system signal; without
/// one, system changes are followed live.
pub struct ThemeController {
    store: Box<dyn ThemeStore>,
    dark: bool,
    explicit: bool,
}

impl ThemeController {
    pub async fn load(store: Box<dyn ThemeStore>, system: SystemTheme) -> Result<Self> {
        let saved = store.load().await?;
        let controller = Self {
            store,
            dark: saved.unwrap_or(system.is_dark()),
            explicit: saved.is_some(),
        };
        tracing::debug!(
            "Theme: dark={} (explicit={})",
            controller.dark,
            controller.explicit
        );
        Ok(controller)
    }

    pub fn is_dark(&self) -> bool {
        self.dark
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Flips and persists the flag, which makes the choice explicit.
    pub async fn toggle(&mut self) -> Result<bool> {
        let dark = !self.dark;
        self.store.save(dark).await?;
        self.dark = dark;
        self.explicit = true;
        Ok(dark)
    }

    /// Returns whether the flag changed.
    pub fn on_system_change(&mut self, system: SystemTheme) -> bool {
        if self.explicit || self.dark == system.is_dark() {
            return false;
        }
        self.dark = system.is_dark();
        true
    }

    pub async fn clear_preference(&mut self, system: SystemTheme) -> Result<()> {
        self.store.clear().await?;
        self.explicit = false;
        self.dark = system.is_dark();
        Ok(())
    }
}
