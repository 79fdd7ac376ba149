//! Append-only JSON-lines logs: prediction history and the notification outbox.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One record per line. The mutex serializes writers within this process.
#[derive(Debug)]
pub struct JsonLines {
  path: PathBuf,
  lock: Mutex<()>,
}

impl JsonLines {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      lock: Mutex::new(()),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub async fn append<T: Serialize>(&self, record: &T) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');

    let _guard = self.lock.lock().await;
    if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
      fs::create_dir_all(dir).await?;
    }
    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)
      .await?;
    file.write_all(&line).await?;
    file.flush().await
  }

  /// The last `n` well-formed records, oldest first. A missing file is an empty log.
  pub async fn tail<T: DeserializeOwned>(&self, n: usize) -> std::io::Result<Vec<T>> {
    let contents = {
      let _guard = self.lock.lock().await;
      match fs::read_to_string(&self.path).await {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
      }
    };

    let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    let mut records = Vec::with_capacity(lines.len() - start);
    for line in &lines[start..] {
      match serde_json::from_str(line) {
        Ok(r) => records.push(r),
        Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "skipping malformed log line"),
      }
    }
    Ok(records)
  }
}
