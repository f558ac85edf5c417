//! In-memory fakes of the world, overlay and engine for unit tests.

use std::collections::{HashMap, HashSet};

use crate::engine::{AudioRef, PlaybackState, SoundEngine, SoundId, SoundInstance};
use crate::progress::{DownloadProgressListener, MessageId, Overlay, ProgressEvent};
use crate::track::Disc;
use crate::world::{BlockKind, BlockPos, EntityId, Jukebox, Vec3, World};

/// Listener that records every callback.
#[derive(Debug, Default)]
pub struct RecordingListener {
    pub events: Vec<ProgressEvent>,
}

impl DownloadProgressListener for RecordingListener {
    fn progress_start_request(&mut self, label: &str) {
        self.events.push(ProgressEvent::StartRequest(label.to_string()));
    }

    fn progress_start_download(&mut self, size_mb: f32) {
        self.events.push(ProgressEvent::StartDownload(size_mb));
    }

    fn progress_stage_percentage(&mut self, percentage: u8) {
        self.events.push(ProgressEvent::Percentage(percentage));
    }

    fn progress_start_loading(&mut self) {
        self.events.push(ProgressEvent::StartLoading);
    }

    fn on_success(&mut self) {
        self.events.push(ProgressEvent::Success);
    }

    fn on_fail(&mut self) {
        self.events.push(ProgressEvent::Failure);
    }
}

#[derive(Debug, Clone)]
pub struct PostedMessage {
    pub id: MessageId,
    pub text: String,
    pub ticks: u32,
}

/// Overlay that keeps every message and its text history.
#[derive(Debug, Default)]
pub struct FakeOverlay {
    pub posted: Vec<PostedMessage>,
    texts: HashMap<MessageId, Vec<String>>,
    remaining: HashMap<MessageId, u32>,
    current: Option<MessageId>,
    next_id: u64,
}

impl FakeOverlay {
    /// Every text a message has had, oldest first.
    pub fn history(&self, id: MessageId) -> Vec<String> {
        self.texts.get(&id).cloned().unwrap_or_default()
    }

    pub fn remaining(&self, id: MessageId) -> Option<u32> {
        self.remaining.get(&id).copied()
    }

    /// Latest text of the visible message.
    pub fn current_text(&self) -> Option<String> {
        self.current
            .and_then(|id| self.texts.get(&id))
            .and_then(|texts| texts.last().cloned())
    }

    /// Texts of every posted message, in posting order.
    pub fn posted_texts(&self) -> Vec<String> {
        self.posted.iter().map(|m| m.text.clone()).collect()
    }
}

impl Overlay for FakeOverlay {
    fn post(&mut self, text: String, ticks: u32) -> MessageId {
        self.next_id += 1;
        let id = MessageId(self.next_id);
        self.posted.push(PostedMessage { id, text: text.clone(), ticks });
        self.texts.insert(id, vec![text]);
        self.remaining.insert(id, ticks);
        self.current = Some(id);
        id
    }

    fn update(&mut self, id: MessageId, text: String) {
        self.texts.entry(id).or_default().push(text);
    }

    fn current(&self) -> Option<MessageId> {
        self.current
    }

    fn set_remaining(&mut self, id: MessageId, ticks: u32) {
        self.remaining.insert(id, ticks);
    }
}

/// Album jukebox over a fixed list of discs.
#[derive(Debug, Default)]
pub struct FakeJukebox {
    pub discs: Vec<Disc>,
    pub playing: Option<usize>,
    pub track: usize,
    pub next_calls: usize,
    pub stop_calls: usize,
}

impl FakeJukebox {
    pub fn new(discs: Vec<Disc>) -> Self {
        Self {
            discs,
            ..Self::default()
        }
    }

    fn first_playable_from(&self, start: usize) -> Option<usize> {
        (start..self.discs.len()).find(|&i| !self.discs[i].is_empty())
    }
}

impl Jukebox for FakeJukebox {
    fn next(&mut self) {
        self.next_calls += 1;
        self.track = 0;
        self.playing = match self.playing {
            Some(current) => self.first_playable_from(current + 1),
            None => self.first_playable_from(0),
        };
    }

    fn recalculate_playing_index(&mut self, _force: bool) -> bool {
        if self.playing.is_none() {
            self.playing = self.first_playable_from(0);
        }
        self.playing.is_some()
    }

    fn stop_playing(&mut self) {
        self.stop_calls += 1;
        self.playing = None;
    }

    fn playing_index(&self) -> Option<usize> {
        self.playing
    }

    fn track(&self) -> usize {
        self.track
    }

    fn disc(&self, index: usize) -> Disc {
        self.discs.get(index).cloned().unwrap_or(Disc::Empty)
    }
}

/// World with an explicit listener, solid blocks, entities and block kinds.
/// Anything not listed is air, and unknown blocks are [`BlockKind::Other`].
#[derive(Debug, Default)]
pub struct FakeWorld {
    pub listener: Option<Vec3>,
    pub solid: HashSet<BlockPos>,
    pub entities: HashMap<EntityId, Vec3>,
    pub blocks: HashMap<BlockPos, BlockKind>,
    pub jukeboxes: HashMap<BlockPos, FakeJukebox>,
    /// Every `set_record_playing_nearby` call.
    pub nearby: Vec<(BlockPos, bool)>,
}

impl FakeWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jukebox(&self, pos: BlockPos) -> &FakeJukebox {
        &self.jukeboxes[&pos]
    }
}

impl World for FakeWorld {
    fn entity_position(&self, entity: EntityId) -> Option<Vec3> {
        self.entities.get(&entity).copied()
    }

    fn is_air(&self, pos: BlockPos) -> bool {
        !self.solid.contains(&pos)
    }

    fn block_kind(&self, pos: BlockPos) -> BlockKind {
        self.blocks.get(&pos).copied().unwrap_or(BlockKind::Other)
    }

    fn listener_position(&self) -> Option<Vec3> {
        self.listener
    }

    fn set_record_playing_nearby(&mut self, pos: BlockPos, _radius: f64, playing: bool) {
        self.nearby.push((pos, playing));
    }

    fn album_jukebox(&mut self, pos: BlockPos) -> Option<&mut dyn Jukebox> {
        self.jukeboxes
            .get_mut(&pos)
            .map(|jukebox| jukebox as &mut dyn Jukebox)
    }
}

/// Engine that only records calls. Sounds play until a test finishes or fails them.
#[derive(Default)]
pub struct FakeEngine {
    pub played: Vec<(SoundId, SoundInstance)>,
    pub stopped: Vec<SoundId>,
    pub updates: usize,
    states: HashMap<SoundId, PlaybackState>,
    listeners: HashMap<SoundId, Box<dyn DownloadProgressListener>>,
}

impl FakeEngine {
    pub fn play_count(&self) -> usize {
        self.played.len()
    }

    pub fn stop_count(&self) -> usize {
        self.stopped.len()
    }

    pub fn last_played(&self) -> Option<&(SoundId, SoundInstance)> {
        self.played.last()
    }

    pub fn last_id(&self) -> SoundId {
        self.played.last().map(|(id, _)| *id).expect("nothing played")
    }

    /// Remote URL or local resource name of every played sound, in order.
    pub fn played_names(&self) -> Vec<String> {
        self.played
            .iter()
            .map(|(_, sound)| match &sound.audio {
                AudioRef::Local(name) => name.clone(),
                AudioRef::Remote { url, .. } => url.clone(),
            })
            .collect()
    }

    /// Ids played and not yet stopped.
    pub fn audible(&self) -> Vec<SoundId> {
        self.played
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| !self.stopped.contains(id))
            .collect()
    }

    pub fn finish(&mut self, id: SoundId) {
        self.states.insert(id, PlaybackState::Finished);
    }

    pub fn fail(&mut self, id: SoundId) {
        self.states.insert(id, PlaybackState::Failed);
    }

    pub fn has_listener(&self, id: SoundId) -> bool {
        self.listeners.contains_key(&id)
    }

    /// The progress listener handed over with a remote sound.
    pub fn listener(&mut self, id: SoundId) -> &mut dyn DownloadProgressListener {
        self.listeners
            .get_mut(&id)
            .map(|listener| listener.as_mut())
            .expect("no listener for sound")
    }
}

impl SoundEngine for FakeEngine {
    fn play(
        &mut self,
        id: SoundId,
        sound: &SoundInstance,
        progress: Option<Box<dyn DownloadProgressListener>>,
    ) {
        self.played.push((id, sound.clone()));
        self.states.insert(id, PlaybackState::Playing);
        if let Some(listener) = progress {
            self.listeners.insert(id, listener);
        }
    }

    fn stop(&mut self, id: SoundId) {
        self.stopped.push(id);
        self.states.insert(id, PlaybackState::Finished);
    }

    fn state(&self, id: SoundId) -> PlaybackState {
        self.states.get(&id).copied().unwrap_or(PlaybackState::Finished)
    }

    fn update(&mut self) {
        self.updates += 1;
    }
}
