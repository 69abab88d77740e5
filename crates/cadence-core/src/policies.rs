//! Built-in policies for movement and item operations

use crate::policy::{Policy, PolicyContext};
use crate::{ActorId, ExhaustionType, ItemType, Location, Position, World};

/// `location` is in the requestor's slots or in a container it carries
pub fn carried_by(world: &dyn World, location: &Location, requestor: ActorId) -> bool {
    match location {
        Location::Map(_) => false,
        Location::Inventory { owner, .. } => *owner == requestor,
        Location::Container { container, .. } => {
            world.container_carrier(*container) == Some(requestor)
        }
    }
}

/// The requestor stands within `dx`/`dy` tiles of `target`, on the same floor
#[derive(Debug, Clone)]
pub struct RequestorInRange {
    pub requestor: ActorId,
    pub target: Position,
    pub dx: u16,
    pub dy: u16,
}

impl RequestorInRange {
    /// Within one tile, the reach for grabbing and using
    pub fn adjacent(requestor: ActorId, target: Position) -> Self {
        Self {
            requestor,
            target,
            dx: 1,
            dy: 1,
        }
    }
}

impl Policy for RequestorInRange {
    fn name(&self) -> &'static str {
        "requestor_in_range"
    }

    fn evaluate(&self, ctx: &PolicyContext<'_>) -> bool {
        ctx.world
            .creature_position(self.requestor)
            .is_some_and(|at| at.is_within(&self.target, self.dx, self.dy))
    }

    fn message(&self) -> &str {
        "Destination is out of reach."
    }
}

/// Nothing on the tile refuses the incoming thing
#[derive(Debug, Clone)]
pub struct LocationNotObstructed {
    pub at: Position,
    /// Check against creature blocking instead of item blocking
    pub for_creature: bool,
}

impl Policy for LocationNotObstructed {
    fn name(&self) -> &'static str {
        "location_not_obstructed"
    }

    fn evaluate(&self, ctx: &PolicyContext<'_>) -> bool {
        if self.for_creature {
            !ctx.world.tile_blocks_creatures(&self.at)
        } else {
            !ctx.world.tile_blocks_things(&self.at)
        }
    }

    fn message(&self) -> &str {
        "There is not enough room."
    }
}

/// The destination tile exists and has ground
#[derive(Debug, Clone)]
pub struct LocationHasGround {
    pub at: Position,
}

impl Policy for LocationHasGround {
    fn name(&self) -> &'static str {
        "location_has_ground"
    }

    fn evaluate(&self, ctx: &PolicyContext<'_>) -> bool {
        ctx.world.tile_has_ground(&self.at)
    }
}

/// The item type may be moved at all
#[derive(Debug, Clone)]
pub struct ThingIsMovable {
    pub item: ItemType,
}

impl Policy for ThingIsMovable {
    fn name(&self) -> &'static str {
        "thing_is_movable"
    }

    fn evaluate(&self, ctx: &PolicyContext<'_>) -> bool {
        ctx.world.item_traits(self.item).movable
    }

    fn message(&self) -> &str {
        "You cannot move this object."
    }
}

/// The item type may be picked up into containers and slots
#[derive(Debug, Clone)]
pub struct ThingIsTakeable {
    pub item: ItemType,
}

impl Policy for ThingIsTakeable {
    fn name(&self) -> &'static str {
        "thing_is_takeable"
    }

    fn evaluate(&self, ctx: &PolicyContext<'_>) -> bool {
        ctx.world.item_traits(self.item).takeable
    }

    fn message(&self) -> &str {
        "You cannot take this object."
    }
}

/// The requestor can carry `amount` more units of `item`
///
/// Only moves that add to the requestor's load are checked: from anywhere
/// it does not carry into a slot or container it does.
#[derive(Debug, Clone)]
pub struct SufficientCapacity {
    pub requestor: ActorId,
    pub item: ItemType,
    pub amount: u8,
    pub from: Location,
    pub to: Location,
}

impl Policy for SufficientCapacity {
    fn name(&self) -> &'static str {
        "sufficient_capacity"
    }

    fn evaluate(&self, ctx: &PolicyContext<'_>) -> bool {
        if !carried_by(ctx.world, &self.to, self.requestor)
            || carried_by(ctx.world, &self.from, self.requestor)
        {
            return true;
        }
        let weight = ctx
            .world
            .item_traits(self.item)
            .weight
            .saturating_mul(u32::from(self.amount));
        ctx.world
            .free_capacity(self.requestor)
            .is_some_and(|free| free >= weight)
    }

    fn message(&self) -> &str {
        "This object is too heavy."
    }
}

/// The source still holds at least `amount` units of `item`
#[derive(Debug, Clone)]
pub struct ContainsThing {
    pub location: Location,
    pub item: ItemType,
    pub amount: u8,
}

impl Policy for ContainsThing {
    fn name(&self) -> &'static str {
        "contains_thing"
    }

    fn evaluate(&self, ctx: &PolicyContext<'_>) -> bool {
        ctx.world
            .item_at(&self.location, self.item)
            .is_some_and(|stack| self.amount > 0 && stack.amount >= self.amount)
    }
}

/// Items can only be thrown onto the floor the requestor stands on
#[derive(Debug, Clone)]
pub struct NotThrownAcrossFloors {
    pub requestor: ActorId,
    pub destination: Position,
}

impl Policy for NotThrownAcrossFloors {
    fn name(&self) -> &'static str {
        "not_thrown_across_floors"
    }

    fn evaluate(&self, ctx: &PolicyContext<'_>) -> bool {
        ctx.world
            .creature_position(self.requestor)
            .is_some_and(|at| at.z == self.destination.z)
    }

    fn message(&self) -> &str {
        "You cannot throw there."
    }
}

/// An inventory slot or carried container belongs to the requestor
#[derive(Debug, Clone)]
pub struct LocationOwnedByRequestor {
    pub requestor: ActorId,
    pub location: Location,
}

impl Policy for LocationOwnedByRequestor {
    fn name(&self) -> &'static str {
        "location_owned_by_requestor"
    }

    fn evaluate(&self, ctx: &PolicyContext<'_>) -> bool {
        match self.location {
            Location::Map(_) => true,
            Location::Inventory { owner, .. } => owner == self.requestor,
            Location::Container { container, .. } => ctx
                .world
                .container_carrier(container)
                .map_or(true, |carrier| carrier == self.requestor),
        }
    }
}

/// The requestor stands next to a container lying on the map
///
/// Carried containers and other locations pass; ownership is checked by
/// [`LocationOwnedByRequestor`].
#[derive(Debug, Clone)]
pub struct ContainerInReach {
    pub requestor: ActorId,
    pub location: Location,
}

impl Policy for ContainerInReach {
    fn name(&self) -> &'static str {
        "container_in_reach"
    }

    fn evaluate(&self, ctx: &PolicyContext<'_>) -> bool {
        let Location::Container { container, .. } = self.location else {
            return true;
        };
        if ctx.world.container_carrier(container).is_some() {
            return true;
        }
        match (
            ctx.world.container_position(container),
            ctx.world.creature_position(self.requestor),
        ) {
            (Some(lies), Some(stands)) => stands.is_adjacent(&lies),
            _ => false,
        }
    }

    fn message(&self) -> &str {
        "Destination is out of reach."
    }
}

/// A creature is still on the expected tile
#[derive(Debug, Clone)]
pub struct CreatureIsOnTile {
    pub creature: ActorId,
    pub at: Position,
}

impl Policy for CreatureIsOnTile {
    fn name(&self) -> &'static str {
        "creature_is_on_tile"
    }

    fn evaluate(&self, ctx: &PolicyContext<'_>) -> bool {
        ctx.world.creature_position(self.creature) == Some(self.at)
    }
}

/// The actor has no pending cooldown in a category
#[derive(Debug, Clone)]
pub struct NotExhausted {
    pub actor: ActorId,
    pub exhaustion: ExhaustionType,
    pub message: String,
}

impl Policy for NotExhausted {
    fn name(&self) -> &'static str {
        "not_exhausted"
    }

    fn evaluate(&self, ctx: &PolicyContext<'_>) -> bool {
        ctx.exhaustion
            .remaining_cooldown(self.actor, self.exhaustion, ctx.now)
            .is_zero()
    }

    fn message(&self) -> &str {
        &self.message
    }
}
