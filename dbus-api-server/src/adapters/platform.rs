use crate::ports::PlatformProbe;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Reads the image flavour Venus OS writes to `/etc/venus/image-type`.
#[derive(Debug, Clone)]
pub struct ImageTypeFile {
    path: PathBuf,
}

impl ImageTypeFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl PlatformProbe for ImageTypeFile {
    async fn image_variant(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let variant = contents.trim();
                (!variant.is_empty()).then(|| variant.to_string())
            }
            Err(err) => {
                debug!(path = %self.path.display(), %err, "image type unavailable");
                None
            }
        }
    }
}
