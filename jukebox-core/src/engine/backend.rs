//! Sound engine that plays audio through kira.
//!
//! Local sounds are decoded and started immediately. Remote sounds go through the
//! [`DownloadQueue`]; the worker decodes them and parks the result until the next
//! [`SoundEngine::update`], which starts them on the tick thread.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::sound::streaming::{StreamingSoundData, StreamingSoundHandle};
use kira::sound::{FromFileError, PlaybackState as KiraState};
use kira::{AudioManager, AudioManagerSettings, DefaultBackend, Tween};

use super::{AudioRef, PlaybackState, SoundEngine, SoundId, SoundInstance};
use crate::config::TrackerConfig;
use crate::download::{DownloadQueue, DownloadRequest};
use crate::error::{Error, Result};
use crate::progress::DownloadProgressListener;
use crate::source::{AudioData, AudioFileType, AudioSource, HttpAudioSource};

/// Extensions tried, in order, for a local resource named without one.
const RESOURCE_EXTENSIONS: &[&str] = &["ogg", "wav", "mp3", "flac"];

type Decoded = Result<DecodedSound>;

/// A finished download waiting for the tick thread, with the listener still to be told.
type ReadySound = (SoundId, Decoded, Box<dyn DownloadProgressListener>);

enum DecodedSound {
    Static(StaticSoundData),
    Streaming(StreamingSoundData<FromFileError>),
}

enum ActiveHandle {
    Static(StaticSoundHandle),
    Streaming(StreamingSoundHandle<FromFileError>),
}

impl ActiveHandle {
    fn state(&self) -> KiraState {
        match self {
            ActiveHandle::Static(handle) => handle.state(),
            ActiveHandle::Streaming(handle) => handle.state(),
        }
    }

    fn stop(&mut self) {
        match self {
            ActiveHandle::Static(handle) => handle.stop(Tween::default()),
            ActiveHandle::Streaming(handle) => handle.stop(Tween::default()),
        }
    }
}

enum Slot {
    Loading,
    Playing(ActiveHandle),
    Failed,
}

/// Listener for remote sounds played without progress reporting.
struct NoProgress;

impl DownloadProgressListener for NoProgress {
    fn progress_start_request(&mut self, _label: &str) {}
    fn progress_start_download(&mut self, _size_mb: f32) {}
    fn progress_stage_percentage(&mut self, _percentage: u8) {}
    fn progress_start_loading(&mut self) {}
    fn on_success(&mut self) {}
    fn on_fail(&mut self) {}
}

/// [`SoundEngine`] backed by a kira `AudioManager`.
///
/// Without an output device every sound reports [`PlaybackState::Failed`].
pub struct KiraSoundEngine {
    manager: Option<AudioManager<DefaultBackend>>,
    resource_dirs: Vec<PathBuf>,
    downloads: DownloadQueue,
    ready: Arc<Mutex<Vec<ReadySound>>>,
    sounds: HashMap<SoundId, Slot>,
}

impl KiraSoundEngine {
    /// Creates an engine that downloads remote audio over HTTP.
    pub fn new(config: &TrackerConfig) -> Self {
        Self::with_source(config, Arc::new(HttpAudioSource::new(&config.downloads)))
    }

    /// Creates an engine that fetches remote audio from `source`.
    pub fn with_source(config: &TrackerConfig, source: Arc<dyn AudioSource>) -> Self {
        let manager = match AudioManager::<DefaultBackend>::new(AudioManagerSettings::default()) {
            Ok(manager) => Some(manager),
            Err(e) => {
                tracing::warn!("No audio output device detected ({}). Sound playback will be disabled.", e);
                None
            }
        };

        Self {
            manager,
            resource_dirs: config.resources.dirs.clone(),
            downloads: DownloadQueue::new(source),
            ready: Arc::new(Mutex::new(Vec::new())),
            sounds: HashMap::new(),
        }
    }

    /// Returns true if an audio output device was opened.
    pub fn is_available(&self) -> bool {
        self.manager.is_some()
    }

    /// Number of sounds the engine still tracks.
    pub fn tracked_count(&self) -> usize {
        self.sounds.len()
    }

    fn play_local(&mut self, name: &str) -> Result<ActiveHandle> {
        let path = resolve_resource(&self.resource_dirs, name)?;
        let data = StaticSoundData::from_file(&path)
            .map_err(|e| Error::Decode(format!("Failed to load {}: {}", path.display(), e)))?;
        self.start(DecodedSound::Static(data))
    }

    fn start(&mut self, sound: DecodedSound) -> Result<ActiveHandle> {
        let manager = self.manager.as_mut().ok_or(Error::NoAudioDevice)?;
        match sound {
            DecodedSound::Static(data) => manager
                .play(data)
                .map(ActiveHandle::Static)
                .map_err(|e| Error::SoundPlayback(format!("{}", e))),
            DecodedSound::Streaming(data) => manager
                .play(data)
                .map(ActiveHandle::Streaming)
                .map_err(|e| Error::SoundPlayback(format!("{}", e))),
        }
    }

    fn enqueue_remote(
        &mut self,
        id: SoundId,
        url: &str,
        file_type: AudioFileType,
        listener: Box<dyn DownloadProgressListener>,
    ) {
        let ready = Arc::clone(&self.ready);
        self.sounds.insert(id, Slot::Loading);
        self.downloads.enqueue(DownloadRequest {
            sound: id,
            url: url.to_string(),
            file_type,
            listener,
            callback: Box::new(move |result, listener| {
                let decoded = result.and_then(decode);
                ready
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((id, decoded, listener));
            }),
        });
    }
}

impl SoundEngine for KiraSoundEngine {
    fn play(
        &mut self,
        id: SoundId,
        sound: &SoundInstance,
        progress: Option<Box<dyn DownloadProgressListener>>,
    ) {
        if self.manager.is_none() {
            tracing::debug!("No audio device, {} fails immediately", id);
            if let Some(mut listener) = progress {
                listener.on_fail();
            }
            self.sounds.insert(id, Slot::Failed);
            return;
        }

        match &sound.audio {
            AudioRef::Local(name) => {
                let slot = match self.play_local(name) {
                    Ok(handle) => {
                        tracing::info!("Playing {} ({})", name, id);
                        Slot::Playing(handle)
                    }
                    Err(e) => {
                        tracing::warn!("Failed to play {}: {}", name, e);
                        Slot::Failed
                    }
                };
                self.sounds.insert(id, slot);
            }
            AudioRef::Remote { url, file_type, .. } => {
                let listener = progress.unwrap_or_else(|| Box::new(NoProgress));
                self.enqueue_remote(id, url, *file_type, listener);
            }
        }
    }

    fn stop(&mut self, id: SoundId) {
        if let Some(Slot::Playing(mut handle)) = self.sounds.remove(&id) {
            handle.stop();
            tracing::debug!("Stopped {}", id);
        }
    }

    fn state(&self, id: SoundId) -> PlaybackState {
        match self.sounds.get(&id) {
            None => PlaybackState::Finished,
            Some(Slot::Loading) => PlaybackState::Pending,
            Some(Slot::Failed) => PlaybackState::Failed,
            Some(Slot::Playing(handle)) => match handle.state() {
                KiraState::Stopped => PlaybackState::Finished,
                _ => PlaybackState::Playing,
            },
        }
    }

    fn update(&mut self) {
        let ready = std::mem::take(&mut *self.ready.lock().unwrap_or_else(PoisonError::into_inner));

        for (id, decoded, mut listener) in ready {
            self.downloads.forget(id);

            if !matches!(self.sounds.get(&id), Some(Slot::Loading)) {
                tracing::debug!("Dropping download for stopped {}", id);
                match decoded {
                    Ok(_) => listener.on_success(),
                    Err(_) => listener.on_fail(),
                }
                continue;
            }

            // Success is reported only after the sound has started.
            let slot = match decoded.and_then(|sound| self.start(sound)) {
                Ok(handle) => {
                    tracing::info!("Playing remote {}", id);
                    listener.on_success();
                    Slot::Playing(handle)
                }
                Err(e) => {
                    tracing::warn!("Failed to start {}: {}", id, e);
                    listener.on_fail();
                    Slot::Failed
                }
            };
            self.sounds.insert(id, slot);
        }
    }
}

impl Drop for KiraSoundEngine {
    fn drop(&mut self) {
        for (_, slot) in self.sounds.drain() {
            if let Slot::Playing(mut handle) = slot {
                handle.stop();
            }
        }
    }
}

/// Decodes downloaded bytes. Streamed bodies are decoded lazily while playing.
fn decode(data: AudioData) -> Result<DecodedSound> {
    let cursor = Cursor::new(data.bytes);
    if data.streamed {
        StreamingSoundData::from_cursor(cursor)
            .map(DecodedSound::Streaming)
            .map_err(|e| Error::Decode(format!("{}", e)))
    } else {
        StaticSoundData::from_cursor(cursor)
            .map(DecodedSound::Static)
            .map_err(|e| Error::Decode(format!("{}", e)))
    }
}

/// Resolves a local sound name against the resource directories.
/// Search order per directory: the name as given, then each known extension.
/// Absolute paths are used as-is.
fn resolve_resource(dirs: &[PathBuf], name: &str) -> Result<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(Error::SoundFileNotFound(name.to_string()))
        };
    }

    for dir in dirs {
        let exact = dir.join(name);
        if exact.is_file() {
            return Ok(exact);
        }
        for ext in RESOURCE_EXTENSIONS {
            let candidate = dir.join(format!("{}.{}", name, ext));
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Err(Error::SoundFileNotFound(name.to_string()))
}
