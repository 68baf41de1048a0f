use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::utils;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

/// An authorization handshake that was started but not yet completed.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub code_verifier: String,
    pub authorize_url: String,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
}

/// The parts of `GET /me/player` the watcher reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentPlayback {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub item: Option<PlaybackItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaybackItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<ItemArtist>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemArtist {
    #[serde(default)]
    pub name: Option<String>,
}

/// The record written to the status file.
///
/// Field names, order and types are read by external consumers and must not
/// change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub track_id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub progress_ms: u64,
    pub duration_ms: u64,
}

impl PlaybackState {
    /// Derives the published state from a playback response.
    ///
    /// No response, or a response without an item (ads, private sessions),
    /// yields the default state.
    pub fn from_playback(playback: Option<&CurrentPlayback>) -> Self {
        let Some(playback) = playback else {
            return Self::default();
        };
        let Some(item) = playback.item.as_ref() else {
            return Self::default();
        };

        Self {
            is_playing: playback.is_playing,
            track_id: item.id.clone(),
            title: item.name.clone(),
            artist: Some(utils::join_artist_names(&item.artists)),
            progress_ms: playback.progress_ms.unwrap_or(0),
            duration_ms: item.duration_ms.unwrap_or(0),
        }
    }

    /// Canonical serialization used for the status file.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// One-line description for status displays.
    pub fn song_line(&self) -> String {
        match (&self.title, &self.artist) {
            (Some(title), Some(artist)) if !artist.is_empty() => {
                format!("{} - {}", artist, title)
            }
            (Some(title), _) => title.clone(),
            _ => "Nothing playing".to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct StatusTableRow {
    pub field: String,
    pub value: String,
}
