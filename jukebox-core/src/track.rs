//! Track metadata and the disc kinds a jukebox can hold.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engine::{Emitter, SoundInstance};
use crate::error::{Error, Result};
use crate::source::AudioFileType;
use crate::world::EntityId;

/// One entry of a remote disc's track list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackData {
    /// Where the audio lives. Missing or malformed URLs make the track unplayable.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
}

impl TrackData {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            title: title.into(),
            author: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Text shown to the player for this track.
    pub fn display_name(&self) -> String {
        match self.author.as_deref() {
            Some(author) if !author.is_empty() => format!("{} - {}", author, self.title),
            _ => self.title.clone(),
        }
    }

    /// The track URL, if it is present and well formed.
    pub fn playable_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| is_valid_url(url))
    }

    /// Parses a JSON array of tracks.
    pub fn list_from_json(json: &str) -> Result<Vec<TrackData>> {
        serde_json::from_str(json).map_err(|e| Error::Other(format!("Invalid track list: {}", e)))
    }

    /// Serializes a track list to JSON.
    pub fn list_to_json(tracks: &[TrackData]) -> Result<String> {
        serde_json::to_string(tracks).map_err(|e| Error::Other(format!("Failed to encode track list: {}", e)))
    }
}

/// Checks that `url` is an absolute http(s) URL with a host.
pub fn is_valid_url(url: &str) -> bool {
    static URL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    URL_PATTERN
        .get_or_init(|| Regex::new(r"(?i)^https?://[^\s/?#@]+(?:[/?#]\S*)?$").ok())
        .as_ref()
        .map_or(false, |re| re.is_match(url))
}

/// Something that can produce a sound for an entity carrying it.
pub trait PlayableRecord: Send + Sync {
    /// Builds the sound for `track` played by `entity`, or `None` if that track
    /// does not exist or cannot be played.
    fn create_entity_sound(&self, entity: EntityId, track: usize) -> Option<SoundInstance>;
}

/// The closed set of disc kinds a jukebox slot can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disc {
    /// A disc backed by a bundled sound resource.
    LocalAudio { sound: String, display_name: String },
    /// A disc whose tracks are fetched from the network.
    RemoteTracks { tracks: Vec<TrackData> },
    Empty,
}

impl Disc {
    pub fn is_empty(&self) -> bool {
        matches!(self, Disc::Empty)
    }
}

impl PlayableRecord for Disc {
    fn create_entity_sound(&self, entity: EntityId, track: usize) -> Option<SoundInstance> {
        match self {
            Disc::LocalAudio { sound, .. } if track == 0 => {
                Some(SoundInstance::local(sound.clone(), Emitter::Entity(entity)))
            }
            Disc::LocalAudio { .. } | Disc::Empty => None,
            Disc::RemoteTracks { tracks } => {
                let data = tracks.get(track)?;
                let url = data.playable_url()?;
                Some(SoundInstance::remote(
                    url,
                    data.display_name(),
                    AudioFileType::File,
                    Emitter::Entity(entity),
                ))
            }
        }
    }
}
