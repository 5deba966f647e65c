use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, AppResult};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi"];

/// The type tag stored alongside a post's media path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

/// A validated media attachment: stored path plus its type tag. Constructing
/// one requires both, so a post can never carry a path without a type.
#[derive(Debug, Clone)]
pub struct MediaRef {
    pub path: String,
    pub kind: MediaKind,
}

/// Map a client filename to a media kind by extension, case-insensitive.
/// Returns None for anything outside the allowed sets.
pub fn classify(filename: &str) -> Option<MediaKind> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Disk-backed storage for uploaded files. Filenames handed back are the
/// stable strings persisted in posts.media_path.
#[derive(Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persist uploaded bytes under a unique name derived from the client
    /// filename. Returns the stored filename.
    pub fn save(&self, original_name: &str, bytes: &[u8]) -> AppResult<String> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| AppError::Internal(format!("Creating uploads dir: {}", e)))?;

        let stored = format!("{}_{}", uuid::Uuid::now_v7(), sanitize(original_name));
        let path = self.root.join(&stored);
        std::fs::write(&path, bytes)
            .map_err(|e| AppError::Internal(format!("Writing {}: {}", path.display(), e)))?;

        Ok(stored)
    }

    /// Best-effort removal of a stored file. Failure is logged, never
    /// propagated: the caller's row deletion has already committed.
    pub fn remove(&self, stored: &str) {
        let Some(path) = self.resolve(stored) else {
            tracing::warn!("Refusing to remove suspicious media path: {}", stored);
            return;
        };
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!("Could not remove media file {}: {}", path.display(), e);
        }
    }

    /// Resolve a stored filename to its on-disk path. Rejects anything that
    /// is not a plain file name, so request paths cannot escape the root.
    pub fn resolve(&self, stored: &str) -> Option<PathBuf> {
        let name = Path::new(stored);
        let mut components = name.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Some(self.root.join(name)),
            _ => None,
        }
    }
}

/// Keep only the final path component, with shell-unfriendly characters
/// replaced. Mirrors what upload sanitizers conventionally allow.
fn sanitize(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");

    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if safe.trim_matches(['.', '_']).is_empty() {
        "upload".to_string()
    } else {
        safe
    }
}
