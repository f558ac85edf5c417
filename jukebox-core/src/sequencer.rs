//! Playback sequences built on the session tracker.
//!
//! Each sequence plays one sound and stores what comes after it as a
//! [`Continuation`] on the handle. The tracker runs it one tick after the sound
//! ends on its own, which calls back into the functions here.

use std::sync::Arc;

use crate::engine::{Emitter, SoundEngine, SoundInstance};
use crate::handle::{Continuation, SoundHandle, TrackSource};
use crate::progress::Overlay;
use crate::source::AudioFileType;
use crate::track::{is_valid_url, Disc, PlayableRecord, TrackData};
use crate::tracker::PlaybackContext;
use crate::world::{BlockKind, BlockPos, EntityId, PlaybackKey, World};

/// Title used for radio streams.
const RADIO_TITLE: &str = "Radio";

impl<E: SoundEngine, O: Overlay> PlaybackContext<E, O> {
    /// Plays `track` of `record` on `entity`, then the following tracks in order.
    /// A looping sequence wraps to track 0 when it runs out of tracks.
    pub fn play_entity_record(
        &mut self,
        world: &dyn World,
        record: Arc<dyn PlayableRecord>,
        entity: EntityId,
        track: usize,
        looping: bool,
    ) {
        if !world.is_entity_alive(entity) {
            tracing::debug!("{} is gone, not playing track {}", entity, track);
            return;
        }

        let Some(sound) = record.create_entity_sound(entity, track) else {
            if looping && track != 0 {
                tracing::debug!("{} ran out of tracks at {}, looping", entity, track);
                self.play_entity_record(world, record, entity, 0, true);
            }
            return;
        };

        let handle = SoundHandle::with_continuation(
            sound,
            Continuation::AdvanceTrack {
                source: TrackSource::Record { record, looping },
                next: track + 1,
            },
        );
        self.set_entity_sound(entity, Some(handle));
    }

    /// Plays `tracks` from `track` onwards at `pos`, skipping tracks without a usable URL.
    pub fn play_block_record(
        &mut self,
        world: &mut dyn World,
        pos: BlockPos,
        tracks: impl Into<Arc<[TrackData]>>,
        track: usize,
    ) {
        let tracks = tracks.into();
        let mut index = track;

        loop {
            let Some(data) = tracks.get(index) else {
                tracing::debug!("Track list at {} finished", pos);
                if world.block_kind(pos).shows_proximity_indicator() {
                    world.set_record_playing_nearby(pos, self.config().proximity.radius, false);
                }
                return;
            };

            let Some(url) = data.playable_url() else {
                tracing::debug!("Skipping track {} at {}: no valid URL", index, pos);
                index += 1;
                continue;
            };

            let sound = SoundInstance::remote(url, data.display_name(), AudioFileType::File, Emitter::Fixed(pos));
            let handle = SoundHandle::with_continuation(
                sound,
                Continuation::AdvanceTrack {
                    source: TrackSource::List(Arc::clone(&tracks)),
                    next: index + 1,
                },
            );
            self.set_session(PlaybackKey::Block(pos), Some(handle));
            return;
        }
    }

    /// Plays the current disc of the album jukebox at `pos`, then moves on to the next disc.
    ///
    /// Does nothing unless the jukebox is powered, `force` is set, or it finds a disc to play.
    pub fn play_album(&mut self, world: &mut dyn World, pos: BlockPos, force: bool) {
        let BlockKind::AlbumJukebox { powered } = world.block_kind(pos) else {
            return;
        };
        let Some(jukebox) = world.album_jukebox(pos) else {
            return;
        };
        if !powered && !force && !jukebox.recalculate_playing_index(false) {
            return;
        }

        let key = PlaybackKey::Block(pos);
        self.set_session(key, None);

        if powered {
            jukebox.stop_playing();
        }

        let Some(index) = jukebox.playing_index() else {
            return;
        };
        let disc = jukebox.disc(index);
        let track = jukebox.track();

        let emitter = Emitter::Fixed(pos);
        let sound = match disc {
            Disc::LocalAudio { sound, display_name } => {
                let mut surface = self.message_surface(&*world);
                if surface.can_show_for(emitter) {
                    surface.show(format!("Now Playing: {}", display_name));
                }
                Some(SoundInstance::local(sound, emitter))
            }
            Disc::RemoteTracks { tracks } => {
                let data = tracks.get(track).or_else(|| tracks.first());
                match data.and_then(|data| data.playable_url().map(|url| (data, url))) {
                    Some((data, url)) => Some(SoundInstance::remote(
                        url,
                        data.display_name(),
                        AudioFileType::File,
                        emitter,
                    )),
                    None => {
                        tracing::warn!("Album jukebox at {} has no playable track on disc {}", pos, index);
                        None
                    }
                }
            }
            Disc::Empty => None,
        };

        if let Some(sound) = sound {
            self.set_session(key, Some(SoundHandle::with_continuation(sound, Continuation::ChainNextDisc)));
        }
    }

    /// Advances the album jukebox at `pos` and plays whatever it lands on.
    pub fn play_next_record(&mut self, world: &mut dyn World, pos: BlockPos) {
        let Some(jukebox) = world.album_jukebox(pos) else {
            tracing::debug!("No album jukebox at {} anymore", pos);
            return;
        };
        jukebox.next();
        self.play_album(world, pos, true);
    }

    /// Streams `url` from the radio at `pos`, reconnecting whenever the stream ends.
    /// A powered radio is silenced instead.
    pub fn play_radio(&mut self, world: &dyn World, url: Option<&str>, pos: BlockPos) {
        let BlockKind::Radio { powered } = world.block_kind(pos) else {
            return;
        };

        let key = PlaybackKey::Block(pos);
        self.set_session(key, None);
        if powered {
            return;
        }

        let Some(url) = url.filter(|url| is_valid_url(url)) else {
            return;
        };

        let sound = SoundInstance::remote(url, RADIO_TITLE, AudioFileType::Both, Emitter::Fixed(pos));
        let handle = SoundHandle::with_continuation(
            sound,
            Continuation::Reconnect {
                url: url.to_string(),
            },
        );
        self.set_session(key, Some(handle));
    }

    /// Swaps the record a boombox-carrying entity plays. `None` just silences it.
    pub fn play_boombox(&mut self, world: &dyn World, entity: EntityId, record: Option<Arc<dyn PlayableRecord>>) {
        self.set_entity_sound(entity, None);
        if let Some(record) = record {
            self.play_entity_record(world, record, entity, 0, true);
        }
    }
}
