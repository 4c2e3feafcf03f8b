use std::path::{Path, PathBuf};
use tokio::fs;

use crate::{
    errors::{AppError, Result},
    models::UploadType,
};

/// Public URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Uploaded images on local disk, one subdirectory per [`UploadType`].
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();

        std::fs::create_dir_all(&base_path)
            .map_err(|e| AppError::Storage(format!("Failed to create storage directory: {}", e)))?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub async fn ensure_directories(&self) -> Result<()> {
        for upload_type in UploadType::ALL {
            let dir = self.base_path.join(upload_type.dir_name());
            fs::create_dir_all(&dir).await.map_err(|e| {
                AppError::Storage(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    fn get_full_path(&self, upload_type: UploadType, filename: &str) -> PathBuf {
        self.base_path.join(upload_type.dir_name()).join(filename)
    }

    /// Writes the file and returns its public URL path.
    pub async fn store_bytes(
        &self,
        upload_type: UploadType,
        filename: &str,
        data: &[u8],
    ) -> Result<String> {
        let full_path = self.get_full_path(upload_type, filename);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {}", e)))?;
        }

        fs::write(&full_path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {}", e)))?;

        tracing::debug!("Stored {} bytes at {}", data.len(), full_path.display());

        Ok(format!(
            "{}/{}/{}",
            PUBLIC_PREFIX,
            upload_type.dir_name(),
            filename
        ))
    }
}
