//! The sound-engine seam: what a sound is, and the calls the tracker makes on it.
//!
//! The tracker only ever calls [`SoundEngine::play`] once and [`SoundEngine::stop`]
//! at most once per [`SoundId`], and learns about completion by polling
//! [`SoundEngine::state`] once per tick.

mod backend;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub use backend::KiraSoundEngine;

use crate::progress::DownloadProgressListener;
use crate::source::AudioFileType;
use crate::world::{BlockPos, EntityId};

/// Process-unique identifier of one playback handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(u64);

impl SoundId {
    /// Allocates a fresh id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SoundId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound#{}", self.0)
    }
}

/// What a sound is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emitter {
    /// Follows a moving entity.
    Entity(EntityId),
    /// Plays from the centre of a block.
    Fixed(BlockPos),
}

/// Where the audio for a sound comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioRef {
    /// A bundled resource, resolved by the engine.
    Local(String),
    /// Audio fetched through the download subsystem.
    Remote {
        url: String,
        title: String,
        file_type: AudioFileType,
    },
}

/// A sound ready to be handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundInstance {
    pub audio: AudioRef,
    pub emitter: Emitter,
}

impl SoundInstance {
    pub fn local(resource: impl Into<String>, emitter: Emitter) -> Self {
        Self {
            audio: AudioRef::Local(resource.into()),
            emitter,
        }
    }

    pub fn remote(
        url: impl Into<String>,
        title: impl Into<String>,
        file_type: AudioFileType,
        emitter: Emitter,
    ) -> Self {
        Self {
            audio: AudioRef::Remote {
                url: url.into(),
                title: title.into(),
                file_type,
            },
            emitter,
        }
    }

    /// Title of a remote sound, used for progress and failure messages.
    pub fn remote_title(&self) -> Option<&str> {
        match &self.audio {
            AudioRef::Remote { title, .. } => Some(title),
            AudioRef::Local(_) => None,
        }
    }
}

/// Engine-side view of a handle, as seen by the per-tick poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Accepted but not audible yet (downloading or decoding).
    Pending,
    Playing,
    /// Ran to the end, or was stopped, or is unknown to the engine.
    Finished,
    /// Never became audible: download, decode or device failure.
    Failed,
}

impl PlaybackState {
    /// Returns true once the handle will never produce sound again.
    pub fn is_done(self) -> bool {
        matches!(self, PlaybackState::Finished | PlaybackState::Failed)
    }
}

/// The external audio engine.
pub trait SoundEngine {
    /// Starts `sound`. Remote sounds report download progress through `progress`.
    fn play(
        &mut self,
        id: SoundId,
        sound: &SoundInstance,
        progress: Option<Box<dyn DownloadProgressListener>>,
    );

    /// Stops a sound. Unknown or finished ids are ignored.
    fn stop(&mut self, id: SoundId);

    fn state(&self, id: SoundId) -> PlaybackState;

    /// Housekeeping, called once per tick before sessions are polled.
    fn update(&mut self) {}
}
