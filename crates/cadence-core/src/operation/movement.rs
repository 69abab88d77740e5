//! Moving item stacks between locations and pushing creatures

use super::{violation, OperationOutcome};
use crate::operation::ExecutionContext;
use crate::policies::{
    ContainerInReach, ContainsThing, CreatureIsOnTile, LocationHasGround, LocationNotObstructed,
    LocationOwnedByRequestor, NotThrownAcrossFloors, RequestorInRange, SufficientCapacity,
    ThingIsMovable, ThingIsTakeable,
};
use crate::rules::{RuleContext, RuleEvent};
use crate::{
    ActorId, Audience, Error, FnPolicy, Item, ItemType, Location, Notification, PolicyChain,
    Position, Removed, Result, ThingKey,
};
use indexmap::IndexSet;
use tracing::{debug, error, warn};

/// How far items can be thrown
const THROW_RANGE_X: u16 = 7;
const THROW_RANGE_Y: u16 = 5;

const NO_ROOM: &str = "There is not enough room.";

pub(super) fn perform(
    requestor: ActorId,
    thing: ThingKey,
    from: Location,
    to: Location,
    amount: u8,
    force: bool,
    ctx: &mut ExecutionContext<'_>,
) -> Result<OperationOutcome> {
    let force = force || requestor.is_system();
    match thing {
        ThingKey::Item(item) => move_item(requestor, item, from, to, amount, force, ctx),
        ThingKey::Creature(creature) => match (from, to) {
            (Location::Map(from), Location::Map(to)) => {
                Ok(push_creature(requestor, creature, from, to, force, ctx))
            }
            _ => Err(Error::InvalidOperation(format!(
                "creature {} can only move between map tiles",
                creature
            ))),
        },
    }
}

/// Policies for moving `item` from one kind of location to another
fn item_policies(
    requestor: ActorId,
    item: ItemType,
    from: Location,
    to: Location,
    amount: u8,
) -> PolicyChain {
    let mut chain = PolicyChain::new();
    if let Location::Map(at) = from {
        chain.push(RequestorInRange::adjacent(requestor, at));
    }
    for location in [from, to] {
        chain.push(ContainerInReach {
            requestor,
            location,
        });
    }
    chain.push(ThingIsMovable { item });
    chain.push(ContainsThing {
        location: from,
        item,
        amount,
    });
    chain.push(LocationOwnedByRequestor {
        requestor,
        location: from,
    });
    chain.push(LocationOwnedByRequestor {
        requestor,
        location: to,
    });
    match to {
        Location::Map(at) => {
            chain.push(LocationHasGround { at });
            chain.push(LocationNotObstructed {
                at,
                for_creature: false,
            });
            chain.push(NotThrownAcrossFloors {
                requestor,
                destination: at,
            });
            chain.push(RequestorInRange {
                requestor,
                target: at,
                dx: THROW_RANGE_X,
                dy: THROW_RANGE_Y,
            });
        }
        Location::Container { .. } | Location::Inventory { .. } => {
            chain.push(ThingIsTakeable { item });
            chain.push(SufficientCapacity {
                requestor,
                item,
                amount,
                from,
                to,
            });
        }
    }
    chain
}

fn move_item(
    requestor: ActorId,
    item: ItemType,
    from: Location,
    to: Location,
    amount: u8,
    force: bool,
    ctx: &mut ExecutionContext<'_>,
) -> Result<OperationOutcome> {
    let chain = item_policies(requestor, item, from, to, amount);
    if let Err(violation) = chain.can_be_performed(&ctx.policy_context(), force) {
        return Ok(OperationOutcome::Rejected(violation));
    }

    let Removed {
        item: moved,
        index: source_index,
    } = match ctx.world.remove_item(&from, item, amount) {
        Ok(removed) => removed,
        Err(err) => {
            debug!(requestor = %requestor, from = %from, error = %err, "movement_source_changed");
            return Ok(OperationOutcome::Aborted);
        }
    };

    let moved = match ctx.world.add_item(&to, moved) {
        Ok(()) => {
            announce_item(ctx, requestor, moved, from, to);
            fire_movement_rules(ctx, ThingKey::Item(item), requestor, from, to);
            return Ok(OperationOutcome::Performed);
        }
        Err(moved) => moved,
    };

    // The destination refused it: back into the stack it came from, or
    // anywhere in the source if that stack cannot take it.
    warn!(requestor = %requestor, item = %item, to = %to, "movement_rollback_to_source");
    let moved = match ctx
        .world
        .restore_item(&from, source_index, moved)
        .or_else(|moved| ctx.world.add_item(&from.any_index(), moved))
    {
        Ok(()) => return Ok(violation("destination_has_room", NO_ROOM)),
        Err(moved) => moved,
    };

    // The source is gone too: drop it where the requestor stands.
    if let Some(at) = ctx.world.creature_position(requestor) {
        let ground = Location::Map(at);
        warn!(requestor = %requestor, item = %item, at = %ground, "movement_rollback_to_ground");
        if ctx.world.add_item(&ground, moved).is_ok() {
            announce_item(ctx, requestor, moved, from, ground);
            fire_movement_rules(ctx, ThingKey::Item(item), requestor, from, ground);
            ctx.tell(requestor, NO_ROOM);
            return Ok(OperationOutcome::Aborted);
        }
    }

    error!(
        requestor = %requestor,
        item = %item,
        amount = moved.amount,
        from = %from,
        to = %to,
        "movement_item_lost"
    );
    Err(Error::InvalidOperation(format!(
        "{} x{} could not be placed at {}, {} or the requestor's tile",
        item, moved.amount, to, from
    )))
}

fn push_creature(
    requestor: ActorId,
    creature: ActorId,
    from: Position,
    to: Position,
    force: bool,
    ctx: &mut ExecutionContext<'_>,
) -> OperationOutcome {
    let mut chain = PolicyChain::new().with(CreatureIsOnTile { creature, at: from });
    if requestor != creature {
        chain.push(RequestorInRange::adjacent(requestor, from));
    }
    chain.push(FnPolicy::new(
        "push_distance",
        "Destination is out of reach.",
        move |_| from.is_adjacent(&to),
    ));
    chain.push(LocationHasGround { at: to });
    chain.push(LocationNotObstructed {
        at: to,
        for_creature: true,
    });
    if let Err(violation) = chain.can_be_performed(&ctx.policy_context(), force) {
        return OperationOutcome::Rejected(violation);
    }

    if !ctx.world.move_creature(creature, to) {
        return OperationOutcome::Aborted;
    }
    ctx.notify(
        Audience::spectators(from),
        Notification::CreatureMoved { creature, from, to },
    );
    fire_movement_rules(
        ctx,
        ThingKey::Creature(creature),
        requestor,
        Location::Map(from),
        Location::Map(to),
    );
    OperationOutcome::Performed
}

fn announce_item(
    ctx: &ExecutionContext<'_>,
    requestor: ActorId,
    item: Item,
    from: Location,
    to: Location,
) {
    let audience = to
        .position()
        .or_else(|| from.position())
        .or_else(|| ctx.world.creature_position(requestor))
        .map(Audience::spectators)
        .unwrap_or(Audience::Player(requestor));
    ctx.notify(audience, Notification::ThingMoved { item, from, to });
}

/// Separation rules on the tile left, then collision rules on the tile entered
///
/// Each fires for the moving thing's own key and for every item type on
/// the tile.
pub(super) fn fire_movement_rules(
    ctx: &ExecutionContext<'_>,
    subject: ThingKey,
    requestor: ActorId,
    from: Location,
    to: Location,
) -> usize {
    let mut fired = 0;
    if let Some(at) = from.position() {
        let rule = RuleContext {
            event: RuleEvent::Separation,
            thing: subject,
            subject,
            requestor,
            at: from,
            from: None,
            target: None,
        };
        fired += ctx.fire_rules(&rule, tile_keys(ctx, subject, &at));
    }
    if let Some(at) = to.position() {
        let rule = RuleContext {
            event: RuleEvent::Collision,
            thing: subject,
            subject,
            requestor,
            at: to,
            from: Some(from),
            target: None,
        };
        fired += ctx.fire_rules(&rule, tile_keys(ctx, subject, &at));
    }
    fired
}

fn tile_keys(ctx: &ExecutionContext<'_>, subject: ThingKey, at: &Position) -> IndexSet<ThingKey> {
    let mut keys = IndexSet::new();
    keys.insert(subject);
    keys.extend(ctx.world.tile_items(at).into_iter().map(ThingKey::Item));
    keys
}
