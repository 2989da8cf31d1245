use async_trait::async_trait;

/// Reports which firmware image the device runs (`normal`, `large`, ...).
#[async_trait]
pub trait PlatformProbe: Send + Sync {
    /// `None` when the variant cannot be determined.
    async fn image_variant(&self) -> Option<String>;
}
