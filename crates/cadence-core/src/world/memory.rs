//! In-memory world

use super::{Item, ItemTraits, Removed, Skill, World, MAX_STACK};
use crate::{ActorId, ContainerId, Direction, Error, ItemType, Location, Position, Result, Slot};
use indexmap::IndexMap;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct Tile {
    ground: bool,
    /// Bottom to top
    items: Vec<Item>,
    creatures: Vec<ActorId>,
}

#[derive(Debug, Clone)]
struct Container {
    capacity: u8,
    /// Index 0 is the front of the container
    items: Vec<Item>,
    carrier: Option<ActorId>,
    /// Set while the container lies on a tile
    position: Option<Position>,
}

#[derive(Debug, Clone)]
struct Creature {
    position: Position,
    direction: Direction,
    capacity: u32,
    slots: [Option<Item>; Slot::COUNT],
    skills: [u32; Skill::COUNT],
}

/// A complete `World` held in hash maps
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    catalog: HashMap<ItemType, ItemTraits>,
    tiles: HashMap<Position, Tile>,
    containers: HashMap<ContainerId, Container>,
    creatures: IndexMap<ActorId, Creature>,
}

impl MemoryWorld {
    /// Create an empty world
    pub fn new() -> Self {
        Self::default()
    }

    /// Register catalog traits for an item type
    pub fn define_item(&mut self, type_id: ItemType, traits: ItemTraits) {
        self.catalog.insert(type_id, traits);
    }

    /// Create a walkable tile
    pub fn add_ground(&mut self, at: Position) {
        self.tiles.entry(at).or_default().ground = true;
    }

    /// Create walkable tiles over a rectangle on one floor
    pub fn add_ground_area(&mut self, from: Position, to: Position) {
        for x in from.x.min(to.x)..=from.x.max(to.x) {
            for y in from.y.min(to.y)..=from.y.max(to.y) {
                self.add_ground(Position::new(x, y, from.z));
            }
        }
    }

    /// Put an item on top of a tile without merging or checks
    pub fn place_item(&mut self, at: Position, item: Item) {
        self.tiles.entry(at).or_default().items.push(item);
    }

    /// Add a creature standing on `at`
    pub fn spawn_creature(&mut self, id: ActorId, at: Position, capacity: u32) {
        self.tiles.entry(at).or_default().creatures.push(id);
        self.creatures.insert(
            id,
            Creature {
                position: at,
                direction: Direction::South,
                capacity,
                slots: [None; Slot::COUNT],
                skills: [10; Skill::COUNT],
            },
        );
    }

    /// Create an empty container, optionally carried by a creature
    pub fn add_container(&mut self, id: ContainerId, capacity: u8, carrier: Option<ActorId>) {
        self.containers.insert(
            id,
            Container {
                capacity,
                items: Vec::new(),
                carrier,
                position: None,
            },
        );
    }

    /// Create an empty container lying on a tile, carried by nobody
    pub fn place_container(&mut self, id: ContainerId, capacity: u8, at: Position) {
        self.containers.insert(
            id,
            Container {
                capacity,
                items: Vec::new(),
                carrier: None,
                position: Some(at),
            },
        );
    }

    /// Put an item into a creature's slot without checks
    pub fn equip(&mut self, owner: ActorId, slot: Slot, item: Item) {
        if let Some(creature) = self.creatures.get_mut(&owner) {
            creature.slots[slot.ordinal()] = Some(item);
        }
    }

    /// Items on a tile, bottom to top
    pub fn tile_stack(&self, at: &Position) -> &[Item] {
        self.tiles
            .get(at)
            .map(|tile| tile.items.as_slice())
            .unwrap_or(&[])
    }

    /// Items in a container, front to back
    pub fn container_items(&self, id: ContainerId) -> &[Item] {
        self.containers
            .get(&id)
            .map(|container| container.items.as_slice())
            .unwrap_or(&[])
    }

    /// The item in a creature's slot
    pub fn slot_item(&self, owner: ActorId, slot: Slot) -> Option<Item> {
        self.creatures
            .get(&owner)
            .and_then(|creature| creature.slots[slot.ordinal()])
    }

    /// Total units of `type_id` anywhere in the world
    pub fn count_items(&self, type_id: ItemType) -> u32 {
        let count = |items: &[Item]| -> u32 {
            items
                .iter()
                .filter(|item| item.type_id == type_id)
                .map(|item| u32::from(item.amount))
                .sum()
        };
        let on_tiles: u32 = self.tiles.values().map(|tile| count(&tile.items)).sum();
        let in_containers: u32 = self
            .containers
            .values()
            .map(|container| count(&container.items))
            .sum();
        let in_slots: u32 = self
            .creatures
            .values()
            .flat_map(|creature| creature.slots.iter().flatten())
            .filter(|item| item.type_id == type_id)
            .map(|item| u32::from(item.amount))
            .sum();
        on_tiles + in_containers + in_slots
    }

    fn weight_of(&self, item: &Item) -> u32 {
        self.item_traits(item.type_id)
            .weight
            .saturating_mul(u32::from(item.amount))
    }

    fn stack_index(&self, location: &Location, type_id: ItemType) -> Option<usize> {
        match location {
            Location::Map(at) => self
                .tiles
                .get(at)?
                .items
                .iter()
                .rposition(|item| item.type_id == type_id),
            Location::Container {
                container,
                index: Some(index),
            } => {
                let items = &self.containers.get(container)?.items;
                let index = usize::from(*index);
                (items.get(index)?.type_id == type_id).then_some(index)
            }
            Location::Container {
                container,
                index: None,
            } => self
                .containers
                .get(container)?
                .items
                .iter()
                .position(|item| item.type_id == type_id),
            Location::Inventory { owner, slot } => {
                let item = self.creatures.get(owner)?.slots[slot.ordinal()]?;
                (item.type_id == type_id).then_some(slot.ordinal())
            }
        }
    }

    fn stack_mut(&mut self, location: &Location, index: usize) -> Option<&mut Item> {
        match location {
            Location::Map(at) => self.tiles.get_mut(at)?.items.get_mut(index),
            Location::Container { container, .. } => {
                self.containers.get_mut(container)?.items.get_mut(index)
            }
            Location::Inventory { owner, .. } => {
                self.creatures.get_mut(owner)?.slots[index].as_mut()
            }
        }
    }

    fn discard_stack(&mut self, location: &Location, index: usize) {
        match location {
            Location::Map(at) => {
                if let Some(tile) = self.tiles.get_mut(at) {
                    tile.items.remove(index);
                }
            }
            Location::Container { container, .. } => {
                if let Some(container) = self.containers.get_mut(container) {
                    container.items.remove(index);
                }
            }
            Location::Inventory { owner, .. } => {
                if let Some(creature) = self.creatures.get_mut(owner) {
                    creature.slots[index] = None;
                }
            }
        }
    }
}

fn merges_into(existing: &Item, incoming: &Item, stackable: bool) -> bool {
    stackable
        && existing.type_id == incoming.type_id
        && u16::from(existing.amount) + u16::from(incoming.amount) <= u16::from(MAX_STACK)
}

impl World for MemoryWorld {
    fn creature_position(&self, id: ActorId) -> Option<Position> {
        self.creatures.get(&id).map(|creature| creature.position)
    }

    fn creature_direction(&self, id: ActorId) -> Option<Direction> {
        self.creatures.get(&id).map(|creature| creature.direction)
    }

    fn set_creature_direction(&mut self, id: ActorId, direction: Direction) -> bool {
        match self.creatures.get_mut(&id) {
            Some(creature) => {
                creature.direction = direction;
                true
            }
            None => false,
        }
    }

    fn move_creature(&mut self, id: ActorId, to: Position) -> bool {
        if !self.tile_has_ground(&to) {
            return false;
        }
        let Some(from) = self.creature_position(id) else {
            return false;
        };
        if let Some(tile) = self.tiles.get_mut(&from) {
            tile.creatures.retain(|other| *other != id);
        }
        self.tiles.entry(to).or_default().creatures.push(id);
        if let Some(creature) = self.creatures.get_mut(&id) {
            creature.position = to;
        }
        true
    }

    fn remove_creature(&mut self, id: ActorId) -> Option<Position> {
        let creature = self.creatures.shift_remove(&id)?;
        if let Some(tile) = self.tiles.get_mut(&creature.position) {
            tile.creatures.retain(|other| *other != id);
        }
        Some(creature.position)
    }

    fn free_capacity(&self, id: ActorId) -> Option<u32> {
        let creature = self.creatures.get(&id)?;
        let worn: u32 = creature
            .slots
            .iter()
            .flatten()
            .map(|item| self.weight_of(item))
            .fold(0, u32::saturating_add);
        let carried: u32 = self
            .containers
            .values()
            .filter(|container| container.carrier == Some(id))
            .flat_map(|container| container.items.iter())
            .map(|item| self.weight_of(item))
            .fold(0, u32::saturating_add);
        Some(
            creature
                .capacity
                .saturating_sub(worn.saturating_add(carried)),
        )
    }

    fn skill(&self, id: ActorId, skill: Skill) -> Option<u32> {
        self.creatures
            .get(&id)
            .map(|creature| creature.skills[skill.ordinal()])
    }

    fn set_skill(&mut self, id: ActorId, skill: Skill, level: u32) -> bool {
        match self.creatures.get_mut(&id) {
            Some(creature) => {
                creature.skills[skill.ordinal()] = level;
                true
            }
            None => false,
        }
    }

    fn tile_has_ground(&self, at: &Position) -> bool {
        self.tiles.get(at).is_some_and(|tile| tile.ground)
    }

    fn tile_blocks_things(&self, at: &Position) -> bool {
        match self.tiles.get(at) {
            Some(tile) => tile
                .items
                .iter()
                .any(|item| self.item_traits(item.type_id).blocks_things),
            None => true,
        }
    }

    fn tile_blocks_creatures(&self, at: &Position) -> bool {
        match self.tiles.get(at) {
            Some(tile) => {
                !tile.creatures.is_empty()
                    || tile
                        .items
                        .iter()
                        .any(|item| self.item_traits(item.type_id).blocks_creatures)
            }
            None => true,
        }
    }

    fn tile_items(&self, at: &Position) -> Vec<ItemType> {
        self.tile_stack(at)
            .iter()
            .rev()
            .map(|item| item.type_id)
            .collect()
    }

    fn tile_creatures(&self, at: &Position) -> Vec<ActorId> {
        self.tiles
            .get(at)
            .map(|tile| tile.creatures.clone())
            .unwrap_or_default()
    }

    fn item_traits(&self, type_id: ItemType) -> ItemTraits {
        self.catalog.get(&type_id).copied().unwrap_or_default()
    }

    fn item_at(&self, location: &Location, type_id: ItemType) -> Option<Item> {
        let index = self.stack_index(location, type_id)?;
        match location {
            Location::Map(at) => self.tiles.get(at)?.items.get(index).copied(),
            Location::Container { container, .. } => {
                self.containers.get(container)?.items.get(index).copied()
            }
            Location::Inventory { owner, .. } => self.creatures.get(owner)?.slots[index],
        }
    }

    fn container_carrier(&self, id: ContainerId) -> Option<ActorId> {
        self.containers.get(&id)?.carrier
    }

    fn container_position(&self, id: ContainerId) -> Option<Position> {
        let container = self.containers.get(&id)?;
        container.carrier.is_none().then_some(container.position).flatten()
    }

    fn remove_item(
        &mut self,
        location: &Location,
        type_id: ItemType,
        amount: u8,
    ) -> Result<Removed> {
        if amount == 0 {
            return Err(Error::InvalidOperation(format!(
                "cannot remove zero units of {} from {}",
                type_id, location
            )));
        }
        match location {
            Location::Container { container, .. } if !self.containers.contains_key(container) => {
                return Err(Error::ContainerNotFound(*container));
            }
            Location::Inventory { owner, .. } if !self.creatures.contains_key(owner) => {
                return Err(Error::ActorNotFound(*owner));
            }
            _ => {}
        }
        let index = self
            .stack_index(location, type_id)
            .ok_or(Error::ThingNotFound {
                location: *location,
                item: type_id,
            })?;
        let stack = self.stack_mut(location, index).ok_or(Error::ThingNotFound {
            location: *location,
            item: type_id,
        })?;

        if stack.amount < amount {
            return Err(Error::InsufficientAmount {
                location: *location,
                item: type_id,
                requested: amount,
                available: stack.amount,
            });
        }
        if stack.amount == amount {
            let item = *stack;
            self.discard_stack(location, index);
            return Ok(Removed { item, index });
        }
        stack.amount -= amount;
        Ok(Removed {
            item: Item::new(type_id, amount),
            index,
        })
    }

    fn add_item(&mut self, location: &Location, item: Item) -> std::result::Result<(), Item> {
        let stackable = self.item_traits(item.type_id).stackable;
        match location {
            Location::Map(at) => {
                let Some(tile) = self.tiles.get_mut(at).filter(|tile| tile.ground) else {
                    return Err(item);
                };
                let merge = tile
                    .items
                    .last()
                    .is_some_and(|top| merges_into(top, &item, stackable));
                match tile.items.last_mut() {
                    Some(top) if merge => top.amount += item.amount,
                    _ => tile.items.push(item),
                }
                Ok(())
            }
            Location::Container { container, index } => {
                let Some(container) = self.containers.get_mut(container) else {
                    return Err(item);
                };
                if let Some(existing) = container
                    .items
                    .iter_mut()
                    .find(|existing| merges_into(existing, &item, stackable))
                {
                    existing.amount += item.amount;
                    return Ok(());
                }
                if container.items.len() >= usize::from(container.capacity) {
                    return Err(item);
                }
                let at = index
                    .map(usize::from)
                    .filter(|index| *index <= container.items.len())
                    .unwrap_or(0);
                container.items.insert(at, item);
                Ok(())
            }
            Location::Inventory { owner, slot } => {
                let Some(creature) = self.creatures.get_mut(owner) else {
                    return Err(item);
                };
                let occupant = &mut creature.slots[slot.ordinal()];
                if occupant.is_none() {
                    *occupant = Some(item);
                    return Ok(());
                }
                match occupant
                    .as_mut()
                    .filter(|existing| merges_into(existing, &item, stackable))
                {
                    Some(existing) => {
                        existing.amount += item.amount;
                        Ok(())
                    }
                    None => Err(item),
                }
            }
        }
    }

    fn restore_item(
        &mut self,
        location: &Location,
        index: usize,
        item: Item,
    ) -> std::result::Result<(), Item> {
        let stackable = self.item_traits(item.type_id).stackable;
        let items = match location {
            Location::Map(at) => match self.tiles.get_mut(at).filter(|tile| tile.ground) {
                Some(tile) => &mut tile.items,
                None => return Err(item),
            },
            Location::Container { container, .. } => {
                let Some(container) = self.containers.get_mut(container) else {
                    return Err(item);
                };
                let merges = container
                    .items
                    .get(index)
                    .is_some_and(|existing| merges_into(existing, &item, stackable));
                if !merges && container.items.len() >= usize::from(container.capacity) {
                    return Err(item);
                }
                &mut container.items
            }
            // A slot holds a single stack
            Location::Inventory { .. } => return self.add_item(location, item),
        };
        let merges = items
            .get(index)
            .is_some_and(|existing| merges_into(existing, &item, stackable));
        match items.get_mut(index) {
            Some(existing) if merges => existing.amount += item.amount,
            _ => items.insert(index.min(items.len()), item),
        }
        Ok(())
    }

    fn transform_item(&mut self, location: &Location, from: ItemType, to: ItemType) -> bool {
        let Some(index) = self.stack_index(location, from) else {
            return false;
        };
        match self.stack_mut(location, index) {
            Some(stack) => {
                stack.type_id = to;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLD: ItemType = ItemType(3031);
    const TORCH: ItemType = ItemType(2920);

    fn world() -> MemoryWorld {
        let mut world = MemoryWorld::new();
        world.define_item(
            GOLD,
            ItemTraits {
                stackable: true,
                ..ItemTraits::default()
            },
        );
        world.add_ground_area(Position::new(100, 100, 7), Position::new(102, 102, 7));
        world
    }

    #[test]
    fn test_partial_stack_removal_and_merge_back() {
        let mut world = world();
        let a = Location::Map(Position::new(100, 100, 7));
        world.place_item(Position::new(100, 100, 7), Item::new(GOLD, 5));

        let taken = world.remove_item(&a, GOLD, 1).unwrap();
        assert_eq!(taken.item, Item::new(GOLD, 1));
        assert_eq!(world.item_at(&a, GOLD), Some(Item::new(GOLD, 4)));

        world.add_item(&a, taken.item).unwrap();
        assert_eq!(world.tile_stack(&Position::new(100, 100, 7)), &[Item::new(GOLD, 5)]);
    }

    #[test]
    fn test_restore_into_buried_stack() {
        let mut world = world();
        let at = Position::new(100, 100, 7);
        let a = Location::Map(at);
        world.place_item(at, Item::new(GOLD, 5));
        world.place_item(at, Item::single(TORCH));

        let taken = world.remove_item(&a, GOLD, 1).unwrap();
        assert_eq!(taken.index, 0);
        world.restore_item(&a, taken.index, taken.item).unwrap();
        assert_eq!(
            world.tile_stack(&at),
            &[Item::new(GOLD, 5), Item::single(TORCH)]
        );

        // A used-up stack comes back at its old index.
        let taken = world.remove_item(&a, GOLD, 5).unwrap();
        assert_eq!(world.tile_stack(&at), &[Item::single(TORCH)]);
        world.restore_item(&a, taken.index, taken.item).unwrap();
        assert_eq!(
            world.tile_stack(&at),
            &[Item::new(GOLD, 5), Item::single(TORCH)]
        );
    }

    #[test]
    fn test_restore_into_full_container_needs_a_merge() {
        let mut world = world();
        let bag = ContainerId(1);
        world.add_container(bag, 1, None);
        let location = Location::Container {
            container: bag,
            index: None,
        };
        world.add_item(&location, Item::single(TORCH)).unwrap();
        assert_eq!(
            world.restore_item(&location, 0, Item::new(GOLD, 2)),
            Err(Item::new(GOLD, 2))
        );
        assert_eq!(world.container_items(bag), &[Item::single(TORCH)]);
    }

    #[test]
    fn test_container_position_only_when_uncarried() {
        let mut world = world();
        world.place_container(ContainerId(1), 8, Position::new(101, 100, 7));
        world.add_container(ContainerId(2), 8, Some(ActorId(1)));
        assert_eq!(
            world.container_position(ContainerId(1)),
            Some(Position::new(101, 100, 7))
        );
        assert_eq!(world.container_position(ContainerId(2)), None);
        assert_eq!(world.container_carrier(ContainerId(1)), None);
    }

    #[test]
    fn test_heavy_items_saturate_capacity() {
        let mut world = world();
        let actor = ActorId(1);
        world.spawn_creature(actor, Position::new(101, 101, 7), 100);
        world.define_item(
            TORCH,
            ItemTraits {
                stackable: true,
                weight: u32::MAX / 2,
                ..ItemTraits::default()
            },
        );
        world.equip(actor, Slot::LeftHand, Item::new(TORCH, 100));
        world.equip(actor, Slot::RightHand, Item::new(TORCH, 100));
        assert_eq!(world.free_capacity(actor), Some(0));
    }

    #[test]
    fn test_remove_more_than_available() {
        let mut world = world();
        let a = Location::Map(Position::new(100, 100, 7));
        world.place_item(Position::new(100, 100, 7), Item::new(GOLD, 2));
        let err = world.remove_item(&a, GOLD, 3).unwrap_err();
        assert!(matches!(err, Error::InsufficientAmount { available: 2, .. }));
    }

    #[test]
    fn test_remove_from_missing_owner_or_container() {
        let mut world = world();
        let slot = Location::Inventory {
            owner: ActorId(9),
            slot: Slot::Backpack,
        };
        assert_eq!(
            world.remove_item(&slot, GOLD, 1).unwrap_err(),
            Error::ActorNotFound(ActorId(9))
        );
        let bag = Location::Container {
            container: ContainerId(4),
            index: None,
        };
        assert_eq!(
            world.remove_item(&bag, GOLD, 1).unwrap_err(),
            Error::ContainerNotFound(ContainerId(4))
        );
    }

    #[test]
    fn test_full_container_rejects_item() {
        let mut world = world();
        let bag = ContainerId(1);
        world.add_container(bag, 1, None);
        let location = Location::Container {
            container: bag,
            index: None,
        };
        world.add_item(&location, Item::single(TORCH)).unwrap();
        let rejected = world.add_item(&location, Item::new(GOLD, 1)).unwrap_err();
        assert_eq!(rejected, Item::new(GOLD, 1));
        assert_eq!(world.container_items(bag), &[Item::single(TORCH)]);
    }

    #[test]
    fn test_stackable_merges_into_full_container() {
        let mut world = world();
        let bag = ContainerId(1);
        world.add_container(bag, 1, None);
        let location = Location::Container {
            container: bag,
            index: None,
        };
        world.add_item(&location, Item::new(GOLD, 10)).unwrap();
        world.add_item(&location, Item::new(GOLD, 5)).unwrap();
        assert_eq!(world.container_items(bag), &[Item::new(GOLD, 15)]);
    }

    #[test]
    fn test_free_capacity_counts_worn_and_carried() {
        let mut world = world();
        let actor = ActorId(1);
        world.spawn_creature(actor, Position::new(101, 101, 7), 100);
        world.define_item(
            TORCH,
            ItemTraits {
                weight: 30,
                ..ItemTraits::default()
            },
        );
        world.equip(actor, Slot::LeftHand, Item::single(TORCH));
        world.add_container(ContainerId(5), 8, Some(actor));
        world
            .add_item(
                &Location::Container {
                    container: ContainerId(5),
                    index: None,
                },
                Item::new(GOLD, 10),
            )
            .unwrap();
        assert_eq!(world.free_capacity(actor), Some(60));
    }

    #[test]
    fn test_move_creature_updates_tiles() {
        let mut world = world();
        let actor = ActorId(1);
        let from = Position::new(100, 100, 7);
        let to = Position::new(101, 100, 7);
        world.spawn_creature(actor, from, 100);
        assert!(world.tile_blocks_creatures(&from));

        assert!(world.move_creature(actor, to));
        assert!(world.tile_creatures(&from).is_empty());
        assert_eq!(world.tile_creatures(&to), vec![actor]);
        assert!(!world.move_creature(actor, Position::new(500, 500, 7)));
    }

    #[test]
    fn test_tile_items_topmost_first() {
        let mut world = world();
        let at = Position::new(100, 100, 7);
        world.place_item(at, Item::single(TORCH));
        world.place_item(at, Item::new(GOLD, 1));
        assert_eq!(world.tile_items(&at), vec![GOLD, TORCH]);
    }
}
