//! Named, persisted knowledge bases.
//!
//! Each session is a directory under the store root:
//!
//! ```text
//! <root>/<name>/index.sqlite    passages and embeddings
//! <root>/<name>/metadata.json   ingested videos, in order
//! ```

use crate::error::{Result, YoutubotError};
use crate::index::{KnowledgeBase, SimilarityIndex, INDEX_FILE};
use crate::source::VideoMetadata;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// File name of the video metadata inside a session directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Directory-backed store of saved sessions.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that a session name is a single, visible path component.
    pub fn validate_name(name: &str) -> Result<()> {
        let invalid = name.trim().is_empty()
            || name.contains("..")
            || name.contains('/')
            || name.contains('\\')
            || name.starts_with('.')
            || name.chars().any(char::is_control);

        if invalid {
            return Err(YoutubotError::InvalidSessionName(name.to_string()));
        }
        Ok(())
    }

    fn session_dir(&self, name: &str) -> Result<PathBuf> {
        Self::validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Whether a session with this name exists.
    pub fn exists(&self, name: &str) -> bool {
        self.session_dir(name).map(|dir| dir.is_dir()).unwrap_or(false)
    }

    /// Save a knowledge base, replacing any session with the same name.
    ///
    /// The session is written to a hidden staging directory first and moved
    /// into place once complete.
    #[instrument(skip(self, knowledge), fields(passages = knowledge.index.len()))]
    pub fn save(&self, name: &str, knowledge: &KnowledgeBase) -> Result<()> {
        let target = self.session_dir(name)?;

        if knowledge.index.is_empty() {
            return Err(YoutubotError::InvalidInput(
                "Cannot save a session without any passages".to_string(),
            ));
        }

        std::fs::create_dir_all(&self.root)?;

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.root)?;

        knowledge.index.save_to_dir(staging.path())?;
        let metadata = serde_json::to_string_pretty(&knowledge.videos)?;
        std::fs::write(staging.path().join(METADATA_FILE), metadata)?;

        if target.exists() {
            let trash = tempfile::Builder::new()
                .prefix(".replaced-")
                .tempdir_in(&self.root)?;
            let old = trash.path().join(name);

            std::fs::rename(&target, &old)?;
            if let Err(e) = std::fs::rename(staging.path(), &target) {
                warn!("Could not move new session '{}' into place, restoring previous copy", name);
                std::fs::rename(&old, &target)?;
                return Err(e.into());
            }
        } else {
            std::fs::rename(staging.path(), &target)?;
        }

        info!("Saved session '{}' with {} videos to {:?}", name, knowledge.videos.len(), target);
        Ok(())
    }

    /// Load a saved session.
    #[instrument(skip(self))]
    pub fn load(&self, name: &str) -> Result<KnowledgeBase> {
        let dir = self.session_dir(name)?;

        if !dir.is_dir() {
            return Err(YoutubotError::SessionNotFound(name.to_string()));
        }

        let malformed = |reason: String| YoutubotError::SessionMalformed {
            name: name.to_string(),
            reason,
        };

        let index = SimilarityIndex::load_from_dir(&dir).map_err(|e| malformed(e.to_string()))?;

        let metadata = std::fs::read_to_string(dir.join(METADATA_FILE))
            .map_err(|e| malformed(format!("{}: {}", METADATA_FILE, e)))?;
        let videos: Vec<VideoMetadata> =
            serde_json::from_str(&metadata).map_err(|e| malformed(format!("{}: {}", METADATA_FILE, e)))?;

        debug!("Loaded session '{}' ({} passages, {} videos)", name, index.len(), videos.len());
        Ok(KnowledgeBase::new(index, videos))
    }

    /// Names of all saved sessions, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            if Self::validate_name(&name).is_ok() && entry.path().join(INDEX_FILE).exists() {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    /// Delete a session. Returns `false` if there was nothing to delete.
    #[instrument(skip(self))]
    pub fn delete(&self, name: &str) -> Result<bool> {
        let Ok(dir) = self.session_dir(name) else {
            warn!("Refusing to delete invalid session name {:?}", name);
            return Ok(false);
        };

        if !dir.is_dir() {
            return Ok(false);
        }

        std::fs::remove_dir_all(&dir)?;
        info!("Deleted session '{}'", name);
        Ok(true)
    }
}
