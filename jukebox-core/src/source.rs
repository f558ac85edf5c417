//! Audio sources: turning a track URL into audio bytes.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_LENGTH;
use serde::{Deserialize, Serialize};

use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use crate::progress::DownloadProgressListener;
use crate::track::is_valid_url;

/// What kind of response a caller is willing to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFileType {
    /// Live streams only.
    Stream,
    /// Complete files only.
    File,
    /// Either.
    Both,
}

impl AudioFileType {
    pub fn accepts_stream(self) -> bool {
        matches!(self, AudioFileType::Stream | AudioFileType::Both)
    }

    pub fn accepts_file(self) -> bool {
        matches!(self, AudioFileType::File | AudioFileType::Both)
    }
}

/// Fetched audio, still encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    pub bytes: Vec<u8>,
    /// True if the bytes are a capped slice of an unbounded stream.
    pub streamed: bool,
}

/// Resolves a URL into playable audio. Called on a download worker thread.
pub trait AudioSource: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        file_type: AudioFileType,
        progress: &mut dyn DownloadProgressListener,
    ) -> Result<AudioData>;
}

const READ_CHUNK: usize = 16 * 1024;

/// Plain HTTP(S) source with an optional on-disk cache for complete files.
pub struct HttpAudioSource {
    cache_dir: Option<PathBuf>,
    timeout: Duration,
    user_agent: String,
    max_stream_bytes: u64,
}

impl HttpAudioSource {
    pub fn new(config: &DownloadConfig) -> Self {
        if let Some(dir) = &config.cache_dir {
            let _ = fs::create_dir_all(dir);
        }

        Self {
            cache_dir: config.cache_dir.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            user_agent: config.user_agent.clone(),
            max_stream_bytes: config.max_stream_bytes,
        }
    }

    /// Returns the cached copy of `url`, if there is one.
    pub fn find_cached(&self, url: &str) -> Option<PathBuf> {
        let path = self.cache_path(url)?;
        path.exists().then_some(path)
    }

    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(cache_file_name(url)))
    }

    /// Removes every cached download. Returns how many files were deleted.
    /// Files in the cache directory that were not written by this source are kept.
    pub fn clear_cache(&self) -> usize {
        let Some(dir) = &self.cache_dir else {
            return 0;
        };
        let mut count = 0;
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if is_cache_file(&path) && fs::remove_file(&path).is_ok() {
                    count += 1;
                }
            }
        }
        count
    }

    fn store(&self, url: &str, bytes: &[u8]) {
        if let Some(path) = self.cache_path(url) {
            if let Err(e) = fs::write(&path, bytes) {
                tracing::warn!("Failed to cache {} at {}: {}", url, path.display(), e);
            }
        }
    }
}

impl AudioSource for HttpAudioSource {
    fn fetch(
        &self,
        url: &str,
        file_type: AudioFileType,
        progress: &mut dyn DownloadProgressListener,
    ) -> Result<AudioData> {
        if !is_valid_url(url) {
            return Err(Error::InvalidUrl(url.to_string()));
        }

        if file_type.accepts_file() {
            if let Some(cached) = self.find_cached(url) {
                tracing::info!("Audio already cached: {}", url);
                progress.progress_start_loading();
                let bytes = fs::read(&cached)?;
                return Ok(AudioData { bytes, streamed: false });
            }
        }

        progress.progress_start_request(&format!("Requesting {}", host_of(url)));

        // Built per fetch on the worker thread; reqwest::blocking owns an internal
        // runtime that must not be created or dropped inside an async context.
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| Error::Download(url.to_string(), format!("Failed to create HTTP client: {}", e)))?;

        let mut response = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Download(url.to_string(), e.to_string()))?;

        let length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        let data = match length {
            Some(total) => {
                progress.progress_start_download(total as f32 / 1000.0 / 1000.0);
                let bytes = read_with_progress(&mut response, total, progress)
                    .map_err(|e| Error::Download(url.to_string(), e.to_string()))?;
                AudioData { bytes, streamed: false }
            }
            None if file_type.accepts_stream() => {
                tracing::debug!("{} has no length, buffering up to {} bytes", url, self.max_stream_bytes);
                let bytes = read_capped(&mut response, self.max_stream_bytes, progress)
                    .map_err(|e| Error::Download(url.to_string(), e.to_string()))?;
                AudioData { bytes, streamed: true }
            }
            None => return Err(Error::StreamRejected(url.to_string())),
        };

        if data.bytes.is_empty() {
            return Err(Error::Download(url.to_string(), "Response body is empty".to_string()));
        }

        if !data.streamed && file_type.accepts_file() {
            self.store(url, &data.bytes);
        }

        progress.progress_start_loading();
        Ok(data)
    }
}

/// Reads `total` bytes, reporting a percentage each time it changes.
fn read_with_progress(
    reader: &mut dyn Read,
    total: u64,
    progress: &mut dyn DownloadProgressListener,
) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(total.min(64 * 1024 * 1024) as usize);
    let mut chunk = [0u8; READ_CHUNK];
    let mut last_percentage = 0u8;

    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);

        if total > 0 {
            let percentage = ((bytes.len() as u64 * 100) / total).min(100) as u8;
            if percentage != last_percentage {
                last_percentage = percentage;
                progress.progress_stage_percentage(percentage);
            }
        }
    }

    Ok(bytes)
}

/// Buffers at most `cap` bytes of an unbounded body, reporting progress against the cap.
fn read_capped(
    reader: &mut dyn Read,
    cap: u64,
    progress: &mut dyn DownloadProgressListener,
) -> std::io::Result<Vec<u8>> {
    progress.progress_start_download(cap as f32 / 1000.0 / 1000.0);
    read_with_progress(&mut reader.take(cap), cap, progress)
}

/// Host part of a URL, for request labels.
fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}

/// File name a URL is cached under.
fn cache_file_name(url: &str) -> String {
    let stripped = url.split_once("://").map_or(url, |(_, rest)| rest);
    let mut name = sanitize_filename(stripped);
    if name.len() > 120 {
        let mut cut = 120;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
    }
    format!("{}_{:08x}.audio", name, checksum(url))
}

/// Sanitizes a string for use as a filename.
fn sanitize_filename(name: &str) -> String {
    let mut result = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '&' | '=' | '%' | '#' => '_',
            ' ' => '_',
            c => c,
        })
        .collect::<String>();

    // Collapse multiple underscores
    while result.contains("__") {
        result = result.replace("__", "_");
    }

    result.trim_matches('_').to_string()
}

/// FNV-1a over the full URL, so truncated names stay distinct.
fn checksum(url: &str) -> u32 {
    url.bytes().fold(0x811c_9dc5u32, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    })
}

/// Returns true if `path` looks like a cached download.
pub fn is_cache_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "audio")
}
