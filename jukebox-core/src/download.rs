//! Background download queue for remote audio.
//!
//! Downloads are processed one at a time on a background thread so the tick thread
//! never blocks on the network. Stopping a sound does not cancel its download; the
//! result is simply ignored when it arrives.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;

use crate::engine::SoundId;
use crate::error::Result;
use crate::progress::DownloadProgressListener;
use crate::source::{AudioData, AudioFileType, AudioSource};

/// Download status for UI and debugging.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadStatus {
    /// Download is queued, waiting to start
    Queued,
    /// Download is in progress
    Downloading { url: String },
    /// Download completed successfully
    Complete,
    /// Download failed
    Failed { error: String },
}

/// Called on the worker thread with the fetch result and the request's listener.
pub type DownloadCallback =
    Box<dyn FnOnce(Result<AudioData>, Box<dyn DownloadProgressListener>) + Send + 'static>;

/// A single download request.
pub struct DownloadRequest {
    pub sound: SoundId,
    pub url: String,
    pub file_type: AudioFileType,
    pub listener: Box<dyn DownloadProgressListener>,
    pub callback: DownloadCallback,
}

/// FIFO download queue drained by a single worker thread.
pub struct DownloadQueue {
    source: Arc<dyn AudioSource>,
    queue: Arc<Mutex<VecDeque<DownloadRequest>>>,
    status_map: Arc<RwLock<HashMap<SoundId, DownloadStatus>>>,
    is_processing: Arc<Mutex<bool>>,
}

impl DownloadQueue {
    pub fn new(source: Arc<dyn AudioSource>) -> Self {
        Self {
            source,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            status_map: Arc::new(RwLock::new(HashMap::new())),
            is_processing: Arc::new(Mutex::new(false)),
        }
    }

    /// Enqueues a download and returns immediately.
    pub fn enqueue(&self, request: DownloadRequest) {
        tracing::info!("Queued download for {}: {}", request.sound, request.url);

        self.status_map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request.sound, DownloadStatus::Queued);

        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(request);

        self.start_processing();
    }

    /// Gets the current status of a sound's download.
    pub fn get_status(&self, sound: SoundId) -> Option<DownloadStatus> {
        self.status_map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&sound)
            .cloned()
    }

    /// Drops the status entry of a sound whose result has been consumed.
    pub fn forget(&self, sound: SoundId) {
        self.status_map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&sound);
    }

    /// Number of downloads waiting or running.
    pub fn pending_count(&self) -> usize {
        self.status_map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|status| matches!(status, DownloadStatus::Queued | DownloadStatus::Downloading { .. }))
            .count()
    }

    /// Starts the background processing thread if not already running.
    fn start_processing(&self) {
        {
            let mut is_processing = self.is_processing.lock().unwrap_or_else(PoisonError::into_inner);
            if *is_processing {
                return;
            }
            *is_processing = true;
        }

        let source = Arc::clone(&self.source);
        let queue = Arc::clone(&self.queue);
        let status_map = Arc::clone(&self.status_map);
        let is_processing = Arc::clone(&self.is_processing);

        let spawned = thread::Builder::new()
            .name("audio-download".into())
            .spawn(move || process_queue(source.as_ref(), &queue, &status_map, &is_processing));

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn download worker: {}", e);
            *self.is_processing.lock().unwrap_or_else(PoisonError::into_inner) = false;
        }
    }
}

fn process_queue(
    source: &dyn AudioSource,
    queue: &Mutex<VecDeque<DownloadRequest>>,
    status_map: &RwLock<HashMap<SoundId, DownloadStatus>>,
    is_processing: &Mutex<bool>,
) {
    loop {
        let request = {
            let mut queue = queue.lock().unwrap_or_else(PoisonError::into_inner);
            let next = queue.pop_front();
            if next.is_none() {
                // Cleared under the queue lock so a concurrent enqueue either sees
                // the worker running or starts a new one.
                *is_processing.lock().unwrap_or_else(PoisonError::into_inner) = false;
            }
            next
        };

        let Some(DownloadRequest { sound, url, file_type, mut listener, callback }) = request else {
            break;
        };

        status_map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sound, DownloadStatus::Downloading { url: url.clone() });

        let result = source.fetch(&url, file_type, listener.as_mut());

        {
            let status = match &result {
                Ok(_) => DownloadStatus::Complete,
                Err(e) => {
                    tracing::warn!("Download failed for {}: {}", url, e);
                    DownloadStatus::Failed { error: e.to_string() }
                }
            };
            status_map
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(sound, status);
        }

        callback(result, listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DownloadConfig;
    use crate::error::Error;
    use crate::source::HttpAudioSource;
    use crate::testing::RecordingListener;
    use std::sync::mpsc;
    use std::time::Duration;

    /// Source that answers from memory, failing for URLs containing "fail".
    struct MemorySource;

    impl AudioSource for MemorySource {
        fn fetch(
            &self,
            url: &str,
            _file_type: AudioFileType,
            progress: &mut dyn DownloadProgressListener,
        ) -> Result<AudioData> {
            progress.progress_start_loading();
            if url.contains("fail") {
                return Err(Error::Download(url.to_string(), "boom".to_string()));
            }
            Ok(AudioData { bytes: url.as_bytes().to_vec(), streamed: false })
        }
    }

    fn request(
        sound: SoundId,
        url: &str,
        tx: mpsc::Sender<(SoundId, std::result::Result<Vec<u8>, String>)>,
    ) -> DownloadRequest {
        DownloadRequest {
            sound,
            url: url.to_string(),
            file_type: AudioFileType::File,
            listener: Box::new(RecordingListener::default()),
            callback: Box::new(move |result, _listener| {
                let _ = tx.send((sound, result.map(|d| d.bytes).map_err(|e| e.to_string())));
            }),
        }
    }

    #[test]
    fn test_downloads_complete_in_order() {
        let queue = DownloadQueue::new(Arc::new(MemorySource));
        let (tx, rx) = mpsc::channel();
        let a = SoundId::next();
        let b = SoundId::next();
        let c = SoundId::next();

        queue.enqueue(request(a, "https://example.com/a", tx.clone()));
        queue.enqueue(request(b, "https://example.com/fail", tx.clone()));
        queue.enqueue(request(c, "https://example.com/c", tx));

        let results: Vec<_> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();

        assert_eq!(results[0].0, a);
        assert_eq!(results[0].1.as_deref(), Ok(&b"https://example.com/a"[..]));
        assert_eq!(results[1].0, b);
        assert!(results[1].1.is_err());
        assert_eq!(results[2].0, c);

        assert_eq!(queue.get_status(a), Some(DownloadStatus::Complete));
        assert!(matches!(queue.get_status(b), Some(DownloadStatus::Failed { .. })));
        assert_eq!(queue.pending_count(), 0);

        queue.forget(a);
        assert_eq!(queue.get_status(a), None);
    }

    #[test]
    fn test_listener_handed_back_to_callback() {
        let queue = DownloadQueue::new(Arc::new(MemorySource));
        let (tx, rx) = mpsc::channel();
        let sound = SoundId::next();

        queue.enqueue(DownloadRequest {
            sound,
            url: "https://example.com/a".to_string(),
            file_type: AudioFileType::File,
            listener: Box::new(RecordingListener::default()),
            callback: Box::new(move |_result, mut listener| {
                listener.on_success();
                let _ = tx.send(());
            }),
        });

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    /// Verifies that blocking HTTP downloads run on the worker thread and don't
    /// panic with "Cannot drop a runtime" when enqueued inside a Tokio runtime.
    #[test]
    fn test_enqueue_inside_tokio_runtime_does_not_panic() {
        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            let source = HttpAudioSource::new(&DownloadConfig {
                timeout_secs: 5,
                ..DownloadConfig::default()
            });
            let queue = DownloadQueue::new(Arc::new(source));
            let (tx, rx) = mpsc::channel();
            let sound = SoundId::next();

            // Nothing listens on the discard port; the fetch must fail, not panic.
            queue.enqueue(request(sound, "http://127.0.0.1:9/song.ogg", tx));

            let (_, result) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
            assert!(result.is_err(), "Expected download error, but should not panic");
        });
    }
}
