use crate::utils::error::Result;
use async_trait::async_trait;

/// Persistence for the explicit dark-mode choice.
///
/// `Ok(None)` means the user never picked a theme and the system signal applies.
#[async_trait]
pub trait ThemeStore: Send + Sync {
    async fn load(&self) -> Result<Option<bool>>;
    async fn save(&self, dark: bool) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}
