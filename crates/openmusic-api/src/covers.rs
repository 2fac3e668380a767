use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Largest accepted cover image.
pub const MAX_COVER_BYTES: usize = 512_000;

/// Accepted content types and the extension the stored file gets.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/apng", "apng"),
    ("image/avif", "avif"),
    ("image/gif", "gif"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
];

/// File extension for an accepted image content type. Parameters such as
/// `; charset=...` are ignored.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    IMAGE_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

/// Flat directory of album cover files, served under `/uploads/images`.
pub struct CoverStorage {
    dir: PathBuf,
    public_url: String,
}

impl CoverStorage {
    pub async fn new(dir: PathBuf, public_url: impl Into<String>) -> std::io::Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Cover storage directory: {}", dir.display());
        Ok(Self {
            dir,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Public URL of a stored cover.
    pub fn url(&self, name: &str) -> String {
        format!("{}/uploads/images/{}", self.public_url, name)
    }

    /// Write a new cover for `album_id`, returning the stored file name.
    pub async fn write(&self, album_id: &str, extension: &str, data: &[u8]) -> std::io::Result<String> {
        let millis = chrono::Utc::now().timestamp_millis();
        let name = format!("{millis}_{album_id}.{extension}");

        let mut file = fs::File::create(self.file_path(&name)).await?;
        file.write_all(data).await?;
        file.flush().await?;

        info!("Stored cover {} ({} bytes)", name, data.len());
        Ok(name)
    }

    /// Remove a stored cover. A file that is already gone is not an error.
    pub async fn delete(&self, name: &str) -> std::io::Result<()> {
        match fs::remove_file(self.file_path(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Cover {} already removed", name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_image_types() {
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("image/JPEG"), Some("jpg"));
        assert_eq!(image_extension("image/webp; q=1"), Some("webp"));
        assert_eq!(image_extension("text/plain"), None);
        assert_eq!(image_extension("image/svg+xml"), None);
    }

    #[tokio::test]
    async fn write_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CoverStorage::new(dir.path().join("images"), "http://localhost:5000/")
            .await
            .unwrap();

        let name = storage.write("album-abc", "png", b"\x89PNG").await.unwrap();
        assert!(name.ends_with("_album-abc.png"));
        assert_eq!(fs::read(storage.file_path(&name)).await.unwrap(), b"\x89PNG");
        assert_eq!(
            storage.url(&name),
            format!("http://localhost:5000/uploads/images/{name}")
        );

        storage.delete(&name).await.unwrap();
        assert!(!storage.file_path(&name).exists());
        // idempotent
        storage.delete(&name).await.unwrap();
    }
}
