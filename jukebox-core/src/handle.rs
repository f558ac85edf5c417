//! Playback handles and what follows them once they finish on their own.

use std::fmt;
use std::sync::Arc;

use crate::engine::{SoundId, SoundInstance};
use crate::track::{PlayableRecord, TrackData};

/// Where the next track of a sequence comes from.
#[derive(Clone)]
pub enum TrackSource {
    /// A record carried by an entity.
    Record {
        record: Arc<dyn PlayableRecord>,
        looping: bool,
    },
    /// A fixed track list played at a block.
    List(Arc<[TrackData]>),
}

impl fmt::Debug for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackSource::Record { looping, .. } => f
                .debug_struct("Record")
                .field("looping", looping)
                .finish_non_exhaustive(),
            TrackSource::List(tracks) => f.debug_tuple("List").field(&tracks.len()).finish(),
        }
    }
}

/// What the tracker does when a handle stops on its own.
#[derive(Debug, Clone)]
pub enum Continuation {
    /// The session just ends.
    Stop,
    /// Play track `next` from `source` in the same slot.
    AdvanceTrack { source: TrackSource, next: usize },
    /// Ask the album jukebox at the slot's position for its next disc.
    ChainNextDisc,
    /// Reconnect to the same stream.
    Reconnect { url: String },
}

impl Continuation {
    /// Whether this continuation still runs when the sound failed instead of finishing.
    /// Only block track lists move past a track that could not be played.
    pub fn advances_on_failure(&self) -> bool {
        matches!(
            self,
            Continuation::AdvanceTrack {
                source: TrackSource::List(_),
                ..
            }
        )
    }
}

/// A sound handed to the engine, plus the continuation to run when it ends naturally.
///
/// Whoever stops a handle deliberately calls [`SoundHandle::stop_listening`] first,
/// so a finish reported afterwards is ignored.
#[derive(Debug)]
pub struct SoundHandle {
    id: SoundId,
    sound: SoundInstance,
    on_stopped: Option<Continuation>,
}

impl SoundHandle {
    /// A fire-and-forget handle: the session ends when the sound does.
    pub fn new(sound: SoundInstance) -> Self {
        Self::with_continuation(sound, Continuation::Stop)
    }

    pub fn with_continuation(sound: SoundInstance, on_stopped: Continuation) -> Self {
        Self {
            id: SoundId::next(),
            sound,
            on_stopped: Some(on_stopped),
        }
    }

    pub fn id(&self) -> SoundId {
        self.id
    }

    pub fn sound(&self) -> &SoundInstance {
        &self.sound
    }

    /// Drops the continuation so a later natural stop does nothing. Idempotent.
    pub fn stop_listening(&mut self) {
        self.on_stopped = None;
    }

    pub fn is_listening(&self) -> bool {
        self.on_stopped.is_some()
    }

    /// Hands out the continuation exactly once.
    pub(crate) fn take_continuation(&mut self) -> Option<Continuation> {
        self.on_stopped.take()
    }
}
