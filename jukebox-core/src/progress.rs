//! Download progress reporting.
//!
//! Download workers talk to a [`DownloadProgressListener`]. The one the tracker hands
//! out, [`MarshaledProgress`], only forwards each callback into the tick queue; the
//! matching [`DownloadProgress`] reporter then turns the events into a single
//! on-screen message on the tick thread.

use crate::config::MessageConfig;
use crate::engine::{Emitter, SoundId};
use crate::tasks::{Task, TaskSender};
use crate::world::{BlockPos, Vec3, World};

/// Staged progress callbacks from the download subsystem. May be called from any thread.
pub trait DownloadProgressListener: Send {
    /// A network request is being made; `label` describes it.
    fn progress_start_request(&mut self, label: &str);

    /// The body download started. `size_mb` is the expected size in megabytes.
    fn progress_start_download(&mut self, size_mb: f32);

    /// Percentage (0-100) of the current stage.
    fn progress_stage_percentage(&mut self, percentage: u8);

    /// The audio is downloaded and being decoded.
    fn progress_start_loading(&mut self);

    fn on_success(&mut self);

    fn on_fail(&mut self);
}

/// One progress callback, captured as data.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    StartRequest(String),
    StartDownload(f32),
    Percentage(u8),
    StartLoading,
    Success,
    Failure,
}

/// Listener that queues every callback for the tick thread.
pub struct MarshaledProgress {
    sound: SoundId,
    tasks: TaskSender,
}

impl MarshaledProgress {
    pub fn new(sound: SoundId, tasks: TaskSender) -> Self {
        Self { sound, tasks }
    }

    fn forward(&self, event: ProgressEvent) {
        self.tasks.send(Task::Progress {
            sound: self.sound,
            event,
        });
    }
}

impl DownloadProgressListener for MarshaledProgress {
    fn progress_start_request(&mut self, label: &str) {
        self.forward(ProgressEvent::StartRequest(label.to_string()));
    }

    fn progress_start_download(&mut self, size_mb: f32) {
        self.forward(ProgressEvent::StartDownload(size_mb));
    }

    fn progress_stage_percentage(&mut self, percentage: u8) {
        self.forward(ProgressEvent::Percentage(percentage));
    }

    fn progress_start_loading(&mut self) {
        self.forward(ProgressEvent::StartLoading);
    }

    fn on_success(&mut self) {
        self.forward(ProgressEvent::Success);
    }

    fn on_fail(&mut self) {
        self.forward(ProgressEvent::Failure);
    }
}

/// Identifies a message posted to the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub u64);

/// The ephemeral on-screen message line. Only one message is visible at a time.
pub trait Overlay {
    /// Shows `text`, replacing whatever was visible, for `ticks` ticks.
    fn post(&mut self, text: String, ticks: u32) -> MessageId;

    /// Changes the text of a message in place.
    fn update(&mut self, id: MessageId, text: String);

    /// The message currently visible, if any.
    fn current(&self) -> Option<MessageId>;

    /// Shortens (or extends) how long a message stays up.
    fn set_remaining(&mut self, id: MessageId, ticks: u32);
}

/// What a progress message is allowed to touch.
pub struct MessageSurface<'a> {
    pub overlay: &'a mut dyn Overlay,
    pub world: &'a dyn World,
    pub config: &'a MessageConfig,
}

impl MessageSurface<'_> {
    /// Returns true if the listener is close enough to `point` to be told about it.
    pub fn in_listener_range(&self, point: Vec3) -> bool {
        self.world
            .listener_position()
            .map_or(false, |listener| self.config.in_range(listener.distance_sqr(point)))
    }

    /// Returns true if messages about a sound at `emitter` may be shown: the emitter is
    /// still there, nothing solid sits on top of it, and the listener is in range.
    pub fn can_show_for(&self, emitter: Emitter) -> bool {
        let Some(point) = emitter_position(self.world, emitter) else {
            return false;
        };
        self.world.is_air(BlockPos::containing(point).above()) && self.in_listener_range(point)
    }

    /// Posts a one-shot message with the configured display time.
    pub fn show(&mut self, text: String) -> MessageId {
        self.overlay.post(text, self.config.display_ticks)
    }
}

/// Where an emitter currently is.
pub fn emitter_position(world: &dyn World, emitter: Emitter) -> Option<Vec3> {
    match emitter {
        Emitter::Entity(entity) => world.entity_position(entity),
        Emitter::Fixed(pos) => Some(pos.center()),
    }
}

/// Stage of a download, as far as the reporter has heard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressStage {
    Idle,
    Requesting,
    Downloading,
    Loading,
    Succeeded,
    Failed,
}

/// Per-sound progress state feeding the overlay.
#[derive(Debug)]
pub struct DownloadProgress {
    title: String,
    emitter: Emitter,
    stage: ProgressStage,
    requesting: Option<String>,
    size_mb: f32,
    message: Option<MessageId>,
}

impl DownloadProgress {
    pub fn new(title: impl Into<String>, emitter: Emitter) -> Self {
        Self {
            title: title.into(),
            emitter,
            stage: ProgressStage::Idle,
            requesting: None,
            size_mb: 0.0,
            message: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn emitter(&self) -> Emitter {
        self.emitter
    }

    pub fn stage(&self) -> ProgressStage {
        self.stage
    }

    /// The message this reporter last posted and still owns.
    pub fn message(&self) -> Option<MessageId> {
        self.message
    }

    /// Applies one progress event. `Success` only records the stage; what to show
    /// afterwards depends on the session and is decided by the caller.
    pub fn apply(&mut self, event: &ProgressEvent, surface: &mut MessageSurface<'_>) {
        match event {
            ProgressEvent::StartRequest(label) => {
                self.stage = ProgressStage::Requesting;
                self.requesting = Some(label.clone());
                self.set_text(label.clone(), surface);
            }
            ProgressEvent::StartDownload(size_mb) => {
                self.stage = ProgressStage::Downloading;
                self.size_mb = *size_mb;
                self.requesting = None;
                self.percentage(0, surface);
            }
            ProgressEvent::Percentage(percentage) => self.percentage(*percentage, surface),
            ProgressEvent::StartLoading => {
                self.stage = ProgressStage::Loading;
                self.requesting = None;
                self.set_text(format!("Loading {}", self.title), surface);
            }
            ProgressEvent::Success => self.stage = ProgressStage::Succeeded,
            ProgressEvent::Failure => {
                self.stage = ProgressStage::Failed;
                self.message = None;
                surface.show(format!("Failed to download {}", self.title));
            }
        }
    }

    /// Lets our message fade out, unless another message has replaced it.
    pub fn clear(&mut self, surface: &mut MessageSurface<'_>) {
        self.fade(&mut *surface.overlay, surface.config.fade_ticks);
    }

    /// Same as [`DownloadProgress::clear`], for callers without a world at hand.
    pub fn fade(&mut self, overlay: &mut dyn Overlay, fade_ticks: u32) {
        if let Some(id) = self.message {
            if overlay.current() == Some(id) {
                overlay.set_remaining(id, fade_ticks);
                self.message = None;
            }
        }
    }

    fn percentage(&mut self, percentage: u8, surface: &mut MessageSurface<'_>) {
        let percentage = percentage.min(100);
        if let Some(label) = &self.requesting {
            let text = format!("{} {}%", label, percentage);
            self.set_text(text, surface);
        } else if self.size_mb != 0.0 {
            let done = f32::from(percentage) / 100.0 * self.size_mb;
            let text = format!(
                "{:.2} MB of {:.2} MB downloaded: {}",
                done, self.size_mb, self.title
            );
            self.set_text(text, surface);
        }
    }

    /// Updates our message in place, creating it first if the emitter is visible.
    fn set_text(&mut self, text: String, surface: &mut MessageSurface<'_>) {
        match self.message {
            Some(id) => surface.overlay.update(id, text),
            None => {
                if !surface.can_show_for(self.emitter) {
                    return;
                }
                let id = surface.overlay.post(text, surface.config.sticky_ticks);
                self.message = Some(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskQueue;
    use crate::testing::{FakeOverlay, FakeWorld};
    use crate::world::EntityId;

    const POS: BlockPos = BlockPos::new(0, 64, 0);

    fn near_world() -> FakeWorld {
        let mut world = FakeWorld::new();
        world.listener = Some(Vec3::new(4.0, 64.0, 4.0));
        world
    }

    #[test]
    fn test_marshaled_progress_queues_events() {
        let queue = TaskQueue::new();
        let sound = SoundId::next();
        let mut listener = MarshaledProgress::new(sound, queue.sender());

        listener.progress_start_request("Requesting example.com");
        listener.progress_start_download(2.5);
        listener.progress_stage_percentage(40);
        listener.progress_start_loading();
        listener.on_success();

        let events: Vec<ProgressEvent> = queue
            .drain()
            .into_iter()
            .map(|task| match task {
                Task::Progress { sound: s, event } => {
                    assert_eq!(s, sound);
                    event
                }
                other => panic!("unexpected task {:?}", other),
            })
            .collect();
        assert_eq!(
            events,
            vec![
                ProgressEvent::StartRequest("Requesting example.com".to_string()),
                ProgressEvent::StartDownload(2.5),
                ProgressEvent::Percentage(40),
                ProgressEvent::StartLoading,
                ProgressEvent::Success,
            ]
        );
    }

    #[test]
    fn test_stages_update_one_message_in_place() {
        let world = near_world();
        let mut overlay = FakeOverlay::default();
        let config = MessageConfig::default();
        let mut progress = DownloadProgress::new("Song", Emitter::Fixed(POS));

        {
            let mut surface = MessageSurface { overlay: &mut overlay, world: &world, config: &config };
            progress.apply(&ProgressEvent::StartRequest("Requesting example.com".into()), &mut surface);
            progress.apply(&ProgressEvent::Percentage(50), &mut surface);
            progress.apply(&ProgressEvent::StartDownload(4.0), &mut surface);
            progress.apply(&ProgressEvent::Percentage(25), &mut surface);
            progress.apply(&ProgressEvent::StartLoading, &mut surface);
        }

        assert_eq!(progress.stage(), ProgressStage::Loading);
        assert_eq!(overlay.posted.len(), 1, "only one message may be created");
        let id = progress.message().unwrap();
        assert_eq!(overlay.posted[0].ticks, config.sticky_ticks);
        assert_eq!(
            overlay.history(id),
            vec![
                "Requesting example.com",
                "Requesting example.com 50%",
                "0.00 MB of 4.00 MB downloaded: Song",
                "1.00 MB of 4.00 MB downloaded: Song",
                "Loading Song",
            ]
        );
    }

    #[test]
    fn test_percentage_without_size_is_silent() {
        let world = near_world();
        let mut overlay = FakeOverlay::default();
        let config = MessageConfig::default();
        let mut progress = DownloadProgress::new("Song", Emitter::Fixed(POS));

        let mut surface = MessageSurface { overlay: &mut overlay, world: &world, config: &config };
        progress.apply(&ProgressEvent::StartDownload(0.0), &mut surface);
        progress.apply(&ProgressEvent::Percentage(70), &mut surface);

        assert!(progress.message().is_none());
        assert!(overlay.posted.is_empty());
    }

    #[test]
    fn test_no_message_when_listener_far_away() {
        let mut world = near_world();
        world.listener = Some(Vec3::new(500.0, 64.0, 0.0));
        let mut overlay = FakeOverlay::default();
        let config = MessageConfig::default();
        let mut progress = DownloadProgress::new("Song", Emitter::Fixed(POS));

        let mut surface = MessageSurface { overlay: &mut overlay, world: &world, config: &config };
        progress.apply(&ProgressEvent::StartLoading, &mut surface);

        assert!(overlay.posted.is_empty());
    }

    #[test]
    fn test_no_message_when_block_above_is_solid() {
        let mut world = near_world();
        world.solid.insert(POS.above());
        let mut overlay = FakeOverlay::default();
        let config = MessageConfig::default();
        let mut progress = DownloadProgress::new("Song", Emitter::Fixed(POS));

        let mut surface = MessageSurface { overlay: &mut overlay, world: &world, config: &config };
        progress.apply(&ProgressEvent::StartLoading, &mut surface);

        assert!(overlay.posted.is_empty());
    }

    #[test]
    fn test_entity_emitter_follows_entity() {
        let mut world = near_world();
        let mut overlay = FakeOverlay::default();
        let config = MessageConfig::default();
        let mut progress = DownloadProgress::new("Song", Emitter::Entity(EntityId(9)));

        {
            let mut surface = MessageSurface { overlay: &mut overlay, world: &world, config: &config };
            progress.apply(&ProgressEvent::StartLoading, &mut surface);
        }
        assert!(overlay.posted.is_empty(), "missing entity cannot show messages");

        world.entities.insert(EntityId(9), Vec3::new(2.0, 64.0, 2.0));
        let mut surface = MessageSurface { overlay: &mut overlay, world: &world, config: &config };
        progress.apply(&ProgressEvent::StartLoading, &mut surface);
        assert_eq!(overlay.posted.len(), 1);
    }

    #[test]
    fn test_failure_always_shown() {
        let mut world = near_world();
        world.listener = None;
        let mut overlay = FakeOverlay::default();
        let config = MessageConfig::default();
        let mut progress = DownloadProgress::new("Song", Emitter::Fixed(POS));

        let mut surface = MessageSurface { overlay: &mut overlay, world: &world, config: &config };
        progress.apply(&ProgressEvent::Failure, &mut surface);

        assert_eq!(progress.stage(), ProgressStage::Failed);
        assert_eq!(overlay.posted.len(), 1);
        assert_eq!(overlay.posted[0].text, "Failed to download Song");
        assert_eq!(overlay.posted[0].ticks, config.display_ticks);
    }

    #[test]
    fn test_clear_fades_own_message() {
        let world = near_world();
        let mut overlay = FakeOverlay::default();
        let config = MessageConfig::default();
        let mut progress = DownloadProgress::new("Song", Emitter::Fixed(POS));

        let mut surface = MessageSurface { overlay: &mut overlay, world: &world, config: &config };
        progress.apply(&ProgressEvent::StartLoading, &mut surface);
        let id = progress.message().unwrap();
        progress.clear(&mut surface);

        assert!(progress.message().is_none());
        assert_eq!(overlay.remaining(id), Some(config.fade_ticks));
    }

    #[test]
    fn test_clear_leaves_other_message_alone() {
        let world = near_world();
        let mut overlay = FakeOverlay::default();
        let config = MessageConfig::default();
        let mut progress = DownloadProgress::new("Song", Emitter::Fixed(POS));

        let mut surface = MessageSurface { overlay: &mut overlay, world: &world, config: &config };
        progress.apply(&ProgressEvent::StartLoading, &mut surface);
        let ours = progress.message().unwrap();
        let theirs = surface.show("Someone else".to_string());
        progress.clear(&mut surface);

        assert_eq!(progress.message(), Some(ours));
        assert_eq!(overlay.remaining(ours), Some(config.sticky_ticks));
        assert_eq!(overlay.remaining(theirs), Some(config.display_ticks));
    }
}
