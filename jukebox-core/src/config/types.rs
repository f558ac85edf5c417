//! Configuration types for the playback tracker.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete tracker configuration loaded from YAML.
///
/// Every section is optional; an empty document yields the defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub messages: MessageConfig,
    #[serde(default)]
    pub proximity: ProximityConfig,
    #[serde(default)]
    pub downloads: DownloadConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
    /// Full path to the source YAML file this config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// On-screen message behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageConfig {
    /// Maximum distance between the listener and the emitter for messages to show.
    #[serde(default = "default_message_distance")]
    pub distance: f64,
    /// Lifetime of a progress message while its download is in flight.
    #[serde(default = "default_sticky_ticks")]
    pub sticky_ticks: u32,
    /// Remaining lifetime handed to a progress message when it is cleared.
    #[serde(default = "default_short_ticks")]
    pub fade_ticks: u32,
    /// Lifetime of one-shot messages ("now playing", "download failed").
    #[serde(default = "default_short_ticks")]
    pub display_ticks: u32,
}

impl MessageConfig {
    /// Returns true if an emitter at `distance_sqr` from the listener may show messages.
    pub fn in_range(&self, distance_sqr: f64) -> bool {
        distance_sqr <= self.distance * self.distance
    }
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            distance: default_message_distance(),
            sticky_ticks: default_sticky_ticks(),
            fade_ticks: default_short_ticks(),
            display_ticks: default_short_ticks(),
        }
    }
}

fn default_message_distance() -> f64 {
    64.0
}

fn default_sticky_ticks() -> u32 {
    i16::MAX as u32
}

fn default_short_ticks() -> u32 {
    60
}

/// Proximity indicator settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProximityConfig {
    /// Radius around a jukebox within which entities are told a record is playing.
    #[serde(default = "default_proximity_radius")]
    pub radius: f64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            radius: default_proximity_radius(),
        }
    }
}

fn default_proximity_radius() -> f64 {
    3.0
}

/// Remote audio download settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    /// Directory for cached file downloads. Caching is disabled when unset.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Bytes buffered from a response without a Content-Length before playback starts.
    #[serde(default = "default_max_stream_bytes")]
    pub max_stream_bytes: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_stream_bytes: default_max_stream_bytes(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("jukebox-core/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_stream_bytes() -> u64 {
    8 * 1024 * 1024
}

/// Local audio resource lookup.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResourceConfig {
    /// Search roots for local sounds, tried in order.
    #[serde(default)]
    pub dirs: Vec<PathBuf>,
}
