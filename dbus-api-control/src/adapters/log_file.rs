use crate::ports::ControlError;
use std::path::{Path, PathBuf};

/// Tail of the managed service's `multilog` file.
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
}

impl LogFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last `lines` lines, oldest first. A missing file has no lines.
    pub async fn tail(&self, lines: usize) -> Result<Vec<String>, ControlError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ControlError::Io {
                    context: format!("reading {}", self.path.display()),
                    source,
                })
            }
        };
        let text = String::from_utf8_lossy(&data);
        let mut tail: Vec<String> = text.lines().rev().take(lines).map(str::to_string).collect();
        tail.reverse();
        Ok(tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn returns_last_lines_in_order() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("current");
        tokio::fs::write(&path, "one\ntwo\nthree\nfour\n").await.unwrap();
        let log = LogFile::new(path);
        assert_eq!(log.tail(2).await.unwrap(), vec!["three", "four"]);
        assert_eq!(log.tail(10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let temp = tempdir().unwrap();
        let log = LogFile::new(temp.path().join("current"));
        assert!(log.tail(50).await.unwrap().is_empty());
    }
}
