use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::strip_doubled_scheme;
use crate::error::ToolError;

const SUFFIX_HEX_CHARS: usize = 8;

/// Output directory for generated and edited images.
#[derive(Clone, Debug)]
pub struct ImageStore {
    base_dir: PathBuf,
    base_url: String,
}

impl ImageStore {
    pub fn new(base_dir: PathBuf, base_url: String) -> Self {
        Self { base_dir, base_url }
    }

    pub fn generated_file_name(created: u64, index: usize, extension: &str) -> String {
        format!("generated_{created}_{index}.{extension}")
    }

    pub fn edited_file_name(created: u64, index: usize) -> String {
        format!("edited_{created}_{index}.png")
    }

    /// Writes `data` under `file_name` without replacing an existing file.
    /// When the name is taken, a short hash suffix is added before the extension.
    pub async fn put_new(&self, file_name: &str, data: &[u8]) -> Result<PathBuf, ToolError> {
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|err| ToolError::io("create directory", &self.base_dir, err))?;

        let path = self.base_dir.join(file_name);
        match write_new(&path, data).await {
            Ok(()) => return Ok(path),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!(path = %path.display(), "output name taken, adding suffix");
            }
            Err(err) => return Err(ToolError::io("write", path, err)),
        }

        let path = self.base_dir.join(with_suffix(file_name, &unique_suffix(file_name)));
        write_new(&path, data)
            .await
            .map_err(|err| ToolError::io("write", &path, err))?;
        Ok(path)
    }

    pub fn get_public_url(&self, path: &Path) -> String {
        let base = strip_doubled_scheme(self.base_url.trim_end_matches('/'));
        let key = path
            .strip_prefix(&self.base_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        format!("{base}/{}", key.trim_start_matches('/'))
    }
}

async fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(data).await?;
    file.flush().await
}

fn unique_suffix(file_name: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(format!("{nanos}:{file_name}").as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(SUFFIX_HEX_CHARS);
    digest
}

fn with_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{suffix}.{ext}"),
        None => format!("{file_name}_{suffix}"),
    }
}
