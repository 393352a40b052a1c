//! Image uploads for posts and avatars.
//!
//! Uploads are checked here (type allow-list, per-kind size cap) before a
//! [`MediaStore`] sees the bytes. The store only persists and hands back a URL.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::MediaConfig;

pub const ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Invalid file type. Only JPEG, PNG, and WebP are allowed.")]
    UnsupportedType(String),

    #[error("File size too large. Maximum {max_mb}MB allowed.")]
    TooLarge { max_mb: usize },

    #[error("Image upload service is not configured")]
    Unavailable,

    #[error("Failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Post,
    Avatar,
}

impl ImageKind {
    pub fn folder(&self) -> &'static str {
        match self {
            ImageKind::Post => "posts",
            ImageKind::Avatar => "avatars",
        }
    }

    pub fn max_bytes(&self, config: &MediaConfig) -> usize {
        match self {
            ImageKind::Post => config.max_image_bytes,
            ImageKind::Avatar => config.max_avatar_bytes,
        }
    }
}

/// Check an upload against the allow-list and the size cap for its kind.
pub fn validate(
    kind: ImageKind,
    content_type: &str,
    len: usize,
    config: &MediaConfig,
) -> Result<(), MediaError> {
    if !ALLOWED_TYPES.contains(&content_type) {
        return Err(MediaError::UnsupportedType(content_type.to_string()));
    }
    let max = kind.max_bytes(config);
    if len > max {
        return Err(MediaError::TooLarge {
            max_mb: max / (1024 * 1024),
        });
    }
    Ok(())
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persist already-validated bytes and return a public URL for them.
    async fn upload(
        &self,
        bytes: Bytes,
        content_type: &str,
        folder: &str,
    ) -> Result<String, MediaError>;
}

/// Validate, then hand the bytes to the store.
pub async fn upload_image(
    store: &dyn MediaStore,
    config: &MediaConfig,
    kind: ImageKind,
    bytes: Bytes,
    content_type: &str,
) -> Result<String, MediaError> {
    validate(kind, content_type, bytes.len(), config)?;
    store.upload(bytes, content_type, kind.folder()).await
}

/// Stores uploads on local disk under `root/{folder}/{uuid}.{ext}`.
pub struct LocalMediaStore {
    root: PathBuf,
    base_url: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, base_url: impl Into<String>) -> Self {
        Self {
            root,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn upload(
        &self,
        bytes: Bytes,
        content_type: &str,
        folder: &str,
    ) -> Result<String, MediaError> {
        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!("{}.{}", uuid::Uuid::now_v7(), extension_for(content_type));
        tokio::fs::write(dir.join(&name), &bytes).await?;

        tracing::debug!(folder, %name, size = bytes.len(), "stored upload");
        Ok(format!("{}/media/{}/{}", self.base_url, folder, name))
    }
}

/// Used when media is switched off in config.
pub struct DisabledMediaStore;

#[async_trait]
impl MediaStore for DisabledMediaStore {
    async fn upload(
        &self,
        _bytes: Bytes,
        _content_type: &str,
        _folder: &str,
    ) -> Result<String, MediaError> {
        Err(MediaError::Unavailable)
    }
}

/// Resolve a request path under `root`, refusing anything that could escape it.
pub fn resolve_media_path(root: &Path, requested: &str) -> Option<PathBuf> {
    let relative = Path::new(requested);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}
