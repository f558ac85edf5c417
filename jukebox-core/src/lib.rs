//! Jukebox Core - Playback session tracking for in-world music players.
//!
//! This library provides:
//! - A session tracker binding one sound at a time to an entity or block position
//! - Sequencers for entity records, block track lists, album jukeboxes and radios
//! - Download progress reporting marshaled onto the tick thread
//! - A kira-backed sound engine with a background HTTP download queue
//! - Configuration loading and validation from YAML
//!
//! # Example
//!
//! ```rust,no_run
//! use jukebox_core::prelude::*;
//!
//! struct Hud;
//!
//! impl Overlay for Hud {
//!     fn post(&mut self, text: String, _ticks: u32) -> MessageId {
//!         println!("{}", text);
//!         MessageId(0)
//!     }
//!     fn update(&mut self, _id: MessageId, text: String) {
//!         println!("{}", text);
//!     }
//!     fn current(&self) -> Option<MessageId> {
//!         None
//!     }
//!     fn set_remaining(&mut self, _id: MessageId, _ticks: u32) {}
//! }
//!
//! fn run(world: &mut dyn World) -> Result<()> {
//!     let config = ConfigLoader::new("config").load_or_default("jukebox.yaml")?;
//!     let engine = KiraSoundEngine::new(&config);
//!     let mut playback = PlaybackContext::new(config, engine, Hud);
//!
//!     let tracks = vec![TrackData::new("https://example.com/song.ogg", "Song")];
//!     playback.play_block_record(world, BlockPos::new(0, 64, 0), tracks, 0);
//!
//!     // Once per game tick:
//!     playback.tick(world);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod handle;
pub mod progress;
mod sequencer;
pub mod source;
pub mod tasks;
pub mod track;
pub mod tracker;
pub mod world;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::config::{ConfigLoader, TrackerConfig};
    pub use crate::engine::{Emitter, KiraSoundEngine, PlaybackState, SoundEngine, SoundId, SoundInstance};
    pub use crate::handle::{Continuation, SoundHandle};
    pub use crate::progress::{DownloadProgressListener, MessageId, Overlay};
    pub use crate::source::AudioFileType;
    pub use crate::track::{Disc, PlayableRecord, TrackData};
    pub use crate::tracker::{ActiveSession, PlaybackContext};
    pub use crate::world::{BlockKind, BlockPos, EntityId, Jukebox, PlaybackKey, Vec3, World};
    pub use crate::error::{Error, Result};
}
