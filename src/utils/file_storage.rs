/// File storage for uploaded distributor reports
///
/// Each wizard session gets its own directory under the upload root so a
/// session teardown can remove its artifact without touching anyone else's
/// in-flight upload.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::middleware::error_handling::{AppError, Result};

pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to create upload directory: {}", e))
            })?;
        }

        Ok(Self { base_path })
    }

    /// Save an uploaded report and return its path relative to the upload
    /// root plus the SHA256 of the content.
    pub fn save_file(&self, session_id: Uuid, filename: &str, data: &[u8]) -> Result<(String, String)> {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let hash = format!("{:x}", hasher.finalize());

        let session_dir = self.base_path.join(session_id.to_string());
        fs::create_dir_all(&session_dir).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to create session directory: {}", e))
        })?;

        let safe_filename = sanitize_filename(filename);
        let file_path = session_dir.join(&safe_filename);

        let mut file = fs::File::create(&file_path)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create file: {}", e)))?;
        file.write_all(data)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to write file: {}", e)))?;

        let relative_path = file_path
            .strip_prefix(&self.base_path)
            .expect("session dir is under base path")
            .to_string_lossy()
            .to_string();

        Ok((relative_path, hash))
    }

    /// Absolute location of a stored report; the spreadsheet reader opens
    /// files by path so headers and single columns can be read without
    /// loading the whole artifact.
    pub fn full_path(&self, relative_path: &str) -> PathBuf {
        self.base_path.join(relative_path)
    }

    /// Delete a report and its session directory if empty.
    pub fn delete_file(&self, relative_path: &str) -> Result<()> {
        let full_path = self.base_path.join(relative_path);

        if full_path.exists() {
            fs::remove_file(&full_path)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to delete file: {}", e)))?;

            if let Some(parent) = full_path.parent() {
                let _ = fs::remove_dir(parent); // ignore if not empty
            }
        }

        Ok(())
    }

    /// Sweep session directories older than the given age. Catches artifacts
    /// orphaned by a crash or restart, which no wizard session tracks
    /// anymore.
    pub fn cleanup_stale(&self, max_age_hours: u64) -> Result<usize> {
        use std::time::{Duration, SystemTime};

        let cutoff = SystemTime::now() - Duration::from_secs(max_age_hours * 60 * 60);
        let mut deleted_count = 0;

        if let Ok(entries) = fs::read_dir(&self.base_path) {
            for entry in entries.flatten() {
                if let Ok(metadata) = entry.metadata() {
                    if let Ok(modified) = metadata.modified() {
                        if modified < cutoff && fs::remove_dir_all(entry.path()).is_ok() {
                            deleted_count += 1;
                        }
                    }
                }
            }
        }

        Ok(deleted_count)
    }
}

/// Sanitize filename to prevent directory traversal
fn sanitize_filename(filename: &str) -> String {
    filename
        .replace("..", "")
        .replace('/', "_")
        .replace('\\', "_")
        .chars()
        .take(255)
        .collect()
}
