use std::{
    io::{Error, ErrorKind},
    path::{Path, PathBuf},
};

use crate::types::PlaybackState;

/// Writes the playback state to the status file whenever it changes.
pub struct StatusPublisher {
    path: PathBuf,
    last_written: Option<String>,
}

impl StatusPublisher {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_written: None,
        }
    }

    /// Publishes `state`, returning whether the file was written.
    ///
    /// The content goes to a sibling temporary file first and is renamed over
    /// the destination, so readers see either the old or the new content.
    pub async fn publish(&mut self, state: &PlaybackState) -> Result<bool, Error> {
        let json = state
            .to_canonical_json()
            .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;

        if self.last_written.as_deref() == Some(json.as_str()) {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            async_fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.tmp_path();
        async_fs::write(&tmp_path, json.as_bytes()).await?;
        if let Err(e) = async_fs::rename(&tmp_path, &self.path).await {
            let _ = async_fs::remove_file(&tmp_path).await;
            return Err(e);
        }

        self.last_written = Some(json);
        Ok(true)
    }

    pub fn last_written(&self) -> Option<&str> {
        self.last_written.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Reads the last published state back from disk.
pub async fn read_published(path: &Path) -> Result<PlaybackState, String> {
    let content = async_fs::read_to_string(path)
        .await
        .map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|e| e.to_string())
}
