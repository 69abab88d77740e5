//! The world query and mutation surface operations run against
//!
//! The map, containers and creatures are owned by the surrounding server.
//! Operations only see them through the [`World`] trait; [`MemoryWorld`] is
//! a complete in-memory implementation used by tests and demos.

mod memory;

pub use memory::MemoryWorld;

use crate::{ActorId, ContainerId, Direction, ItemType, Location, Position, Result};
use serde::{Deserialize, Serialize};

/// Upper bound on units in one stack
pub const MAX_STACK: u8 = 100;

/// A quantity of one item type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub type_id: ItemType,
    pub amount: u8,
}

impl Item {
    /// Create an item stack
    pub fn new(type_id: ItemType, amount: u8) -> Self {
        Self { type_id, amount }
    }

    /// A single unit
    pub fn single(type_id: ItemType) -> Self {
        Self::new(type_id, 1)
    }
}

/// Units taken by [`World::remove_item`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removed {
    pub item: Item,
    /// Index of the stack they came from, for [`World::restore_item`]
    pub index: usize,
}

/// Catalog properties of an item type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTraits {
    /// Several units share one stack
    pub stackable: bool,
    /// Can be moved at all
    pub movable: bool,
    /// Can be picked up into containers and slots
    pub takeable: bool,
    /// Items cannot be placed on a tile holding this
    pub blocks_things: bool,
    /// Creatures cannot enter a tile holding this
    pub blocks_creatures: bool,
    /// Weight per unit, in capacity units
    pub weight: u32,
    /// What this item turns into when rotated
    pub rotates_to: Option<ItemType>,
}

impl Default for ItemTraits {
    fn default() -> Self {
        Self {
            stackable: false,
            movable: true,
            takeable: true,
            blocks_things: false,
            blocks_creatures: false,
            weight: 1,
            rotates_to: None,
        }
    }
}

/// Trainable creature skills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    Melee,
    Distance,
    Shielding,
    Magic,
}

impl Skill {
    /// Number of skills
    pub const COUNT: usize = 4;

    /// Index of this skill in per-skill arrays
    pub fn ordinal(&self) -> usize {
        *self as usize
    }
}

/// Narrow view of the world state used by operations
///
/// Query methods must be side-effect free; policies only get `&dyn World`.
/// Mutations that can fail hand ownership of the item back to the caller,
/// so a failed placement can always be retried somewhere else.
pub trait World: Send {
    // === Creatures ===

    /// Where a creature stands
    fn creature_position(&self, id: ActorId) -> Option<Position>;

    /// Which way a creature faces
    fn creature_direction(&self, id: ActorId) -> Option<Direction>;

    /// Turn a creature; false if it does not exist
    fn set_creature_direction(&mut self, id: ActorId, direction: Direction) -> bool;

    /// Move a creature onto another tile; false if it does not exist or the
    /// tile does not exist
    fn move_creature(&mut self, id: ActorId, to: Position) -> bool;

    /// Take a creature off the map, returning where it stood
    fn remove_creature(&mut self, id: ActorId) -> Option<Position>;

    /// Weight the creature can still carry
    fn free_capacity(&self, id: ActorId) -> Option<u32>;

    /// Current level of a skill
    fn skill(&self, id: ActorId, skill: Skill) -> Option<u32>;

    /// Overwrite a skill level; false if the creature does not exist
    fn set_skill(&mut self, id: ActorId, skill: Skill, level: u32) -> bool;

    // === Tiles ===

    /// The tile exists and has ground to stand or place things on
    fn tile_has_ground(&self, at: &Position) -> bool;

    /// Something on the tile refuses more items
    fn tile_blocks_things(&self, at: &Position) -> bool;

    /// Something on the tile refuses creatures (blocking items or creatures)
    fn tile_blocks_creatures(&self, at: &Position) -> bool;

    /// Item types on the tile, topmost first
    fn tile_items(&self, at: &Position) -> Vec<ItemType>;

    /// Creatures on the tile, in arrival order
    fn tile_creatures(&self, at: &Position) -> Vec<ActorId>;

    // === Items ===

    /// Catalog entry for an item type
    fn item_traits(&self, type_id: ItemType) -> ItemTraits;

    /// The stack of `type_id` at `location` (topmost on a tile)
    fn item_at(&self, location: &Location, type_id: ItemType) -> Option<Item>;

    /// The creature carrying a container, directly or nested
    fn container_carrier(&self, id: ContainerId) -> Option<ActorId>;

    /// The tile an uncarried container lies on
    fn container_position(&self, id: ContainerId) -> Option<Position>;

    /// Take `amount` units of `type_id` from `location`, splitting stacks
    fn remove_item(&mut self, location: &Location, type_id: ItemType, amount: u8)
        -> Result<Removed>;

    /// Put an item at `location`, merging stacks where possible. On failure
    /// the item is returned untouched.
    fn add_item(&mut self, location: &Location, item: Item) -> std::result::Result<(), Item>;

    /// Put removed units back into the stack at `index`, recreating it there
    /// if it was used up. On failure the item is returned untouched.
    fn restore_item(
        &mut self,
        location: &Location,
        index: usize,
        item: Item,
    ) -> std::result::Result<(), Item>;

    /// Swap the item type of the stack at `location`; false if not found
    fn transform_item(&mut self, location: &Location, from: ItemType, to: ItemType) -> bool;
}
