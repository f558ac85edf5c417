//! The session tracker.
//!
//! A [`PlaybackContext`] owns every playback session of one loaded world, keyed by
//! [`PlaybackKey`]. It is the only place sessions are inserted or removed, and it is
//! only ever touched from the tick thread. Work arriving from download workers goes
//! through the [`TaskQueue`] and runs at the start of the next [`PlaybackContext::tick`].

use std::collections::{BTreeMap, HashMap};

use crate::config::TrackerConfig;
use crate::engine::{Emitter, PlaybackState, SoundEngine, SoundId};
use crate::handle::{Continuation, SoundHandle, TrackSource};
use crate::progress::{
    DownloadProgress, DownloadProgressListener, MarshaledProgress, MessageSurface, Overlay, ProgressEvent,
};
use crate::tasks::{Task, TaskQueue, TaskSender};
use crate::world::{EntityId, PlaybackKey, World};

/// The sound currently bound to a key.
#[derive(Debug)]
pub struct ActiveSession {
    key: PlaybackKey,
    handle: SoundHandle,
}

impl ActiveSession {
    pub fn key(&self) -> PlaybackKey {
        self.key
    }

    pub fn handle(&self) -> &SoundHandle {
        &self.handle
    }

    pub fn id(&self) -> SoundId {
        self.handle.id()
    }
}

/// Playback state of one loaded world.
pub struct PlaybackContext<E: SoundEngine, O: Overlay> {
    config: TrackerConfig,
    engine: E,
    overlay: O,
    sessions: BTreeMap<PlaybackKey, ActiveSession>,
    downloads: HashMap<SoundId, DownloadProgress>,
    tasks: TaskQueue,
}

impl<E: SoundEngine, O: Overlay> PlaybackContext<E, O> {
    pub fn new(config: TrackerConfig, engine: E, overlay: O) -> Self {
        tracing::info!("Playback context created");
        Self {
            config,
            engine,
            overlay,
            sessions: BTreeMap::new(),
            downloads: HashMap::new(),
            tasks: TaskQueue::new(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn overlay(&self) -> &O {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut O {
        &mut self.overlay
    }

    /// A sender for queuing work onto the tick thread.
    pub fn task_sender(&self) -> TaskSender {
        self.tasks.sender()
    }

    /// Replaces whatever plays at `key` with `handle`, or just stops it when `handle`
    /// is `None`. The old session is fully torn down before the new one is installed.
    pub fn set_session(&mut self, key: PlaybackKey, handle: Option<SoundHandle>) {
        if let Some(mut old) = self.sessions.remove(&key) {
            old.handle.stop_listening();
            self.engine.stop(old.handle.id());
            tracing::debug!("Stopped {} at {}", old.handle.id(), key);
        }

        let Some(handle) = handle else {
            return;
        };

        let id = handle.id();
        let progress = handle.sound().remote_title().map(|title| {
            self.downloads
                .insert(id, DownloadProgress::new(title, handle.sound().emitter));
            Box::new(MarshaledProgress::new(id, self.tasks.sender())) as Box<dyn DownloadProgressListener>
        });

        tracing::debug!("Playing {} at {}", id, key);
        self.engine.play(id, handle.sound(), progress);
        self.sessions.insert(key, ActiveSession { key, handle });
    }

    /// The session at `key`, if anything plays there.
    pub fn get_session(&self, key: PlaybackKey) -> Option<&ActiveSession> {
        self.sessions.get(&key)
    }

    pub fn is_active(&self, key: PlaybackKey) -> bool {
        self.sessions.contains_key(&key)
    }

    /// Keys with a session, in key order.
    pub fn active_keys(&self) -> Vec<PlaybackKey> {
        self.sessions.keys().copied().collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn get_entity_sound(&self, entity: EntityId) -> Option<&SoundHandle> {
        self.get_session(PlaybackKey::Entity(entity))
            .map(ActiveSession::handle)
    }

    pub fn set_entity_sound(&mut self, entity: EntityId, handle: Option<SoundHandle>) {
        self.set_session(PlaybackKey::Entity(entity), handle);
    }

    /// Stops every session and drops pending downloads' messages. Used on world unload.
    pub fn stop_all(&mut self) {
        let keys = self.active_keys();
        if !keys.is_empty() {
            tracing::info!("Stopping {} playback sessions", keys.len());
        }
        for key in keys {
            self.set_session(key, None);
        }

        let fade_ticks = self.config.messages.fade_ticks;
        for (_, mut progress) in self.downloads.drain() {
            progress.fade(&mut self.overlay, fade_ticks);
        }
        self.tasks.drain();
    }

    /// Advances one tick: engine housekeeping, then work queued before this tick,
    /// then the natural-stop poll whose continuations run on the next tick.
    pub fn tick(&mut self, world: &mut dyn World) {
        self.engine.update();

        for task in self.tasks.drain() {
            match task {
                Task::Progress { sound, event } => self.on_progress(world, sound, event),
                Task::Resume {
                    key,
                    sound,
                    continuation,
                    outcome,
                } => self.resume(world, key, sound, continuation, outcome),
            }
        }

        self.poll();
    }

    /// Queues the continuation of every listening handle the engine reports as done,
    /// in key order.
    fn poll(&mut self) {
        for (key, session) in self.sessions.iter_mut() {
            if !session.handle.is_listening() {
                continue;
            }
            let outcome = self.engine.state(session.handle.id());
            if !outcome.is_done() {
                continue;
            }
            if let Some(continuation) = session.handle.take_continuation() {
                tracing::debug!("{} at {} ended: {:?}", session.handle.id(), key, outcome);
                self.tasks.push(Task::Resume {
                    key: *key,
                    sound: session.handle.id(),
                    continuation,
                    outcome,
                });
            }
        }
    }

    fn is_current(&self, key: PlaybackKey, sound: SoundId) -> bool {
        self.sessions.get(&key).map(ActiveSession::id) == Some(sound)
    }

    fn resume(
        &mut self,
        world: &mut dyn World,
        key: PlaybackKey,
        sound: SoundId,
        continuation: Continuation,
        outcome: PlaybackState,
    ) {
        if !self.is_current(key, sound) {
            tracing::debug!("Dropping continuation of replaced {} at {}", sound, key);
            return;
        }

        let continuation = if outcome == PlaybackState::Failed && !continuation.advances_on_failure() {
            Continuation::Stop
        } else {
            continuation
        };

        match (continuation, key) {
            (Continuation::Stop, _) => {}
            (
                Continuation::AdvanceTrack {
                    source: TrackSource::Record { record, looping },
                    next,
                },
                PlaybackKey::Entity(entity),
            ) => self.play_entity_record(world, record, entity, next, looping),
            (
                Continuation::AdvanceTrack {
                    source: TrackSource::List(tracks),
                    next,
                },
                PlaybackKey::Block(pos),
            ) => self.play_block_record(world, pos, tracks, next),
            (Continuation::ChainNextDisc, PlaybackKey::Block(pos)) => self.play_next_record(world, pos),
            (Continuation::Reconnect { url }, PlaybackKey::Block(pos)) => {
                self.play_radio(world, Some(&url), pos)
            }
            (continuation, key) => {
                tracing::warn!("Continuation {:?} does not apply to {}", continuation, key);
            }
        }

        // Nothing replaced the finished sound: the session is over.
        if self.is_current(key, sound) {
            self.set_session(key, None);
        }
    }

    fn on_progress(&mut self, world: &mut dyn World, sound: SoundId, event: ProgressEvent) {
        let Some(mut progress) = self.downloads.remove(&sound) else {
            tracing::debug!("Progress for unknown {}: {:?}", sound, event);
            return;
        };

        {
            let mut surface = MessageSurface {
                overlay: &mut self.overlay,
                world: &*world,
                config: &self.config.messages,
            };
            progress.apply(&event, &mut surface);
        }

        match event {
            ProgressEvent::Success => self.on_download_success(world, sound, &mut progress),
            ProgressEvent::Failure => {
                tracing::warn!("Download failed for {}: {}", sound, progress.title());
            }
            _ => {
                self.downloads.insert(sound, progress);
            }
        }
    }

    /// Replaces the progress message once audio is ready, or clears it when the sound
    /// no longer matters.
    fn on_download_success(&mut self, world: &mut dyn World, sound: SoundId, progress: &mut DownloadProgress) {
        let emitter = progress.emitter();
        let key = match emitter {
            Emitter::Entity(entity) => PlaybackKey::Entity(entity),
            Emitter::Fixed(pos) => PlaybackKey::Block(pos),
        };
        let current = self.is_current(key, sound);
        let now_playing = format!("Now Playing: {}", progress.title());

        {
            let mut surface = MessageSurface {
                overlay: &mut self.overlay,
                world: &*world,
                config: &self.config.messages,
            };
            let visible = match emitter {
                Emitter::Entity(entity) => {
                    world.is_entity_alive(entity)
                        && world
                            .entity_position(entity)
                            .map_or(false, |point| surface.in_listener_range(point))
                }
                Emitter::Fixed(_) => surface.can_show_for(emitter),
            };

            if current && visible {
                surface.show(now_playing);
            } else {
                progress.clear(&mut surface);
            }
        }

        if let Emitter::Fixed(pos) = emitter {
            if current && world.block_kind(pos).shows_proximity_indicator() {
                world.set_record_playing_nearby(pos, self.config.proximity.radius, true);
            }
        }
    }

    pub(crate) fn message_surface<'a>(&'a mut self, world: &'a dyn World) -> MessageSurface<'a> {
        MessageSurface {
            overlay: &mut self.overlay,
            world,
            config: &self.config.messages,
        }
    }
}

impl<E: SoundEngine, O: Overlay> Drop for PlaybackContext<E, O> {
    fn drop(&mut self) {
        self.stop_all();
    }
}
