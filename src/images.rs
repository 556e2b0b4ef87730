use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use uuid::Uuid;

use crate::{constants::RECIPE_IMAGE_DIR, error::Error};

const INLINE_PREFIX: &str = "data:image/";
const INLINE_SEPARATOR: &str = ";base64,";

/// A decoded `data:image/<ext>;base64,<payload>` upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl InlineImage {
    pub fn parse(value: &str) -> Result<Self, Error> {
        let invalid = || Error::validation("image", "upload a valid base64 encoded image");

        let (extension, payload) = value
            .strip_prefix(INLINE_PREFIX)
            .and_then(|rest| rest.split_once(INLINE_SEPARATOR))
            .ok_or_else(invalid)?;

        if extension.is_empty()
            || extension.len() > 10
            || !extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(invalid());
        }

        let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
        if bytes.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            extension: extension.to_ascii_lowercase(),
            bytes,
        })
    }
}

/// Image field of a recipe payload: either a fresh upload or a reference
/// to an image the store already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    Inline(InlineImage),
    Stored(String),
}

impl ImageInput {
    pub fn parse(value: &str) -> Result<Self, Error> {
        if value.starts_with("data:image") {
            return Ok(Self::Inline(InlineImage::parse(value)?));
        }
        if value.trim().is_empty() {
            return Err(Error::validation("image", "this field may not be blank"));
        }
        Ok(Self::Stored(value.to_string()))
    }
}

/// Filesystem image store. Recipes only ever hold the returned reference.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, url: &str) -> Self {
        let url = if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{url}/")
        };
        Self {
            root: root.into(),
            url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url(&self, reference: &str) -> String {
        format!("{}{}", self.url, reference)
    }

    /// Turns a public URL (absolute or relative) back into a stored reference.
    pub fn reference_from<'a>(&self, value: &'a str) -> &'a str {
        match value.find(&self.url) {
            Some(position) => &value[position + self.url.len()..],
            None => value,
        }
    }

    pub async fn save(&self, image: &InlineImage) -> Result<String, Error> {
        let reference = format!("{RECIPE_IMAGE_DIR}/{}.{}", Uuid::new_v4(), image.extension);
        let path = self.root.join(&reference);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Image(format!("{e}")))?;
        }
        tokio::fs::write(&path, &image.bytes)
            .await
            .map_err(|e| Error::Image(format!("{e}")))?;

        log::debug!("Stored image {reference} ({} bytes)", image.bytes.len());
        Ok(reference)
    }

    /// Best effort; a missing file is not an error for the caller.
    pub async fn remove(&self, reference: &str) {
        if let Err(e) = tokio::fs::remove_file(self.root.join(reference)).await {
            log::warn!("Failed to remove image {reference}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent png
    const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn decodes_inline_payload() {
        let image = InlineImage::parse(&format!("data:image/PNG;base64,{PIXEL}")).unwrap();
        assert_eq!(image.extension, "png");
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(InlineImage::parse("data:image/png,abc").is_err());
        assert!(InlineImage::parse("data:image/;base64,abc=").is_err());
        assert!(InlineImage::parse("data:image/png;base64,***").is_err());
        assert!(InlineImage::parse("data:image/../x;base64,aGVsbG8=").is_err());
    }

    #[test]
    fn non_inline_values_are_references() {
        assert_eq!(
            ImageInput::parse("http://localhost/media/recipes/a.png").unwrap(),
            ImageInput::Stored("http://localhost/media/recipes/a.png".into())
        );
        assert!(ImageInput::parse("  ").is_err());
    }

    #[test]
    fn maps_urls_back_to_references() {
        let store = MediaStore::new("media", "/media");
        assert_eq!(store.url("recipes/a.png"), "/media/recipes/a.png");
        assert_eq!(
            store.reference_from("http://localhost/media/recipes/a.png"),
            "recipes/a.png"
        );
        assert_eq!(store.reference_from("recipes/a.png"), "recipes/a.png");
    }

    #[tokio::test]
    async fn saves_and_removes_files() {
        let root = std::env::temp_dir().join(format!("foodgram-media-{}", Uuid::new_v4()));
        let store = MediaStore::new(&root, "/media/");
        let image = InlineImage {
            extension: "png".into(),
            bytes: vec![1, 2, 3],
        };

        let reference = store.save(&image).await.unwrap();
        assert!(reference.starts_with("recipes/"));
        assert!(reference.ends_with(".png"));
        assert_eq!(tokio::fs::read(root.join(&reference)).await.unwrap(), vec![1, 2, 3]);

        store.remove(&reference).await;
        assert!(!root.join(&reference).exists());
        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
