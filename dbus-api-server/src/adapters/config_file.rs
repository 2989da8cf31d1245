use anyhow::Context;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const TMP_SUFFIX: &str = ".tmp";

/// Opaque JSON document stored in a single file. Saves replace the whole
/// document; there is no merging.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored document, or an empty object when nothing was
    /// saved yet.
    pub async fn load(&self) -> anyhow::Result<Value> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Value::Object(Default::default()))
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading config {}", self.path.display()))
            }
        };
        serde_json::from_slice(&data)
            .with_context(|| format!("parsing config {}", self.path.display()))
    }

    pub async fn save(&self, document: &Value) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(document)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        let tmp_path = self.path.with_extension(format!(
            "{}{}",
            self.path
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("json"),
            TMP_SUFFIX
        ));
        let mut file = fs::File::create(&tmp_path)
            .await
            .with_context(|| format!("creating temp config {}", tmp_path.display()))?;
        file.write_all(&json)
            .await
            .with_context(|| format!("writing temp config {}", tmp_path.display()))?;
        file.flush().await?;
        drop(file);
        fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("renaming config to {}", self.path.display()))?;
        Ok(())
    }
}
