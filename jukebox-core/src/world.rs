//! World-facing seams: identifiers, positions, and the collaborators the tracker consults.
//!
//! The tracker never owns world state. Entities, blocks and jukebox inventories are
//! reached through the [`World`] and [`Jukebox`] traits, and every lookup is allowed
//! to come back empty because the world can change between ticks.

use std::fmt;

use crate::track::Disc;

/// Network id of an entity in the loaded world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub i32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Integer block coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The block directly above this one.
    pub fn above(self) -> Self {
        Self::new(self.x, self.y + 1, self.z)
    }

    /// Centre of the block, where block-bound sounds are emitted from.
    pub fn center(self) -> Vec3 {
        Vec3::new(
            f64::from(self.x) + 0.5,
            f64::from(self.y) + 0.5,
            f64::from(self.z) + 0.5,
        )
    }

    /// The block containing `point`.
    pub fn containing(point: Vec3) -> Self {
        Self::new(
            point.x.floor() as i32,
            point.y.floor() as i32,
            point.z.floor() as i32,
        )
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A point in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_sqr(self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

/// Identifies the single slot a playback session occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlaybackKey {
    Entity(EntityId),
    Block(BlockPos),
}

impl From<EntityId> for PlaybackKey {
    fn from(id: EntityId) -> Self {
        PlaybackKey::Entity(id)
    }
}

impl From<BlockPos> for PlaybackKey {
    fn from(pos: BlockPos) -> Self {
        PlaybackKey::Block(pos)
    }
}

impl fmt::Display for PlaybackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackKey::Entity(id) => id.fmt(f),
            PlaybackKey::Block(pos) => pos.fmt(f),
        }
    }
}

/// The kinds of block the tracker needs to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// A plain jukebox. Nearby entities are told when a record plays in it.
    Jukebox,
    /// A multi-disc jukebox. `powered` means a redstone signal is holding it silent.
    AlbumJukebox { powered: bool },
    /// A radio. `powered` means a redstone signal is holding it silent.
    Radio { powered: bool },
    Other,
}

impl BlockKind {
    /// Returns true if playback here drives the proximity indicator.
    pub fn shows_proximity_indicator(self) -> bool {
        matches!(self, BlockKind::Jukebox)
    }
}

/// Read access to the loaded world, plus the one flag the tracker is allowed to set.
pub trait World {
    /// Current position of a live entity, or `None` if it is gone.
    fn entity_position(&self, entity: EntityId) -> Option<Vec3>;

    fn is_entity_alive(&self, entity: EntityId) -> bool {
        self.entity_position(entity).is_some()
    }

    fn is_air(&self, pos: BlockPos) -> bool;

    fn block_kind(&self, pos: BlockPos) -> BlockKind;

    /// Where the local listener (the player camera) currently is.
    fn listener_position(&self) -> Option<Vec3>;

    /// Flags every living entity within `radius` of `pos` as hearing (or no longer
    /// hearing) a record.
    fn set_record_playing_nearby(&mut self, pos: BlockPos, radius: f64, playing: bool);

    /// The album jukebox at `pos`, if that block still holds one.
    fn album_jukebox(&mut self, pos: BlockPos) -> Option<&mut dyn Jukebox>;
}

/// State holder of an album jukebox. Consulted and nudged, never owned.
pub trait Jukebox {
    /// Advances to the next track or disc.
    fn next(&mut self);

    /// Re-derives the playing index from the inventory. Returns true if a disc is playable.
    fn recalculate_playing_index(&mut self, force: bool) -> bool;

    fn stop_playing(&mut self);

    /// Slot of the disc currently playing, or `None` if nothing can play.
    fn playing_index(&self) -> Option<usize>;

    /// Selected track within the playing disc.
    fn track(&self) -> usize;

    fn disc(&self, index: usize) -> Disc;
}
