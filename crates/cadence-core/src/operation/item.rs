//! Using and rotating items, walking up to them first when needed

use super::{
    violation, FollowUps, Operation, OperationArguments, OperationKind, OperationOutcome, WalkRoute,
};
use crate::operation::ExecutionContext;
use crate::policies::{ContainsThing, LocationOwnedByRequestor};
use crate::rules::{EventRule, RuleContext, RuleEvent};
use crate::{
    ActorId, Audience, ItemType, Location, Notification, PolicyChain, Position, Result, ThingKey,
};
use std::time::Duration;
use tracing::debug;

const CANNOT_USE: &str = "You cannot use this object.";
const CANNOT_ROTATE: &str = "You cannot rotate this object.";
const OUT_OF_REACH: &str = "Destination is out of reach.";
const NO_WAY: &str = "There is no way.";

/// Things the requestor can reach without walking
fn ownership_and_contents(requestor: ActorId, at: Location, item: ItemType) -> PolicyChain {
    PolicyChain::new()
        .with(ContainsThing {
            location: at,
            item,
            amount: 1,
        })
        .with(LocationOwnedByRequestor {
            requestor,
            location: at,
        })
}

/// The tile the requestor must stand next to, if it is not already
///
/// Containers lying on the map are reached through their tile.
fn out_of_reach(ctx: &ExecutionContext<'_>, requestor: ActorId, at: Location) -> Option<Position> {
    let target = match at {
        Location::Map(position) => position,
        Location::Container { container, .. } => ctx.world.container_position(container)?,
        Location::Inventory { .. } => return None,
    };
    let standing = ctx.world.creature_position(requestor)?;
    (!standing.is_adjacent(&target)).then_some(target)
}

pub(super) fn use_item(
    operation: &Operation,
    requestor: ActorId,
    at: Location,
    item: ItemType,
    on: Option<(Location, ItemType)>,
    ctx: &mut ExecutionContext<'_>,
    follow_ups: &mut FollowUps,
) -> Result<OperationOutcome> {
    if let Err(violation) = ownership_and_contents(requestor, at, item).evaluate(&ctx.policy_context()) {
        return Ok(OperationOutcome::Rejected(violation));
    }
    if let Some(target) = out_of_reach(ctx, requestor, at) {
        return walk_then_retry(operation, requestor, target, ctx, follow_ups);
    }

    let rule = RuleContext {
        event: RuleEvent::Use,
        thing: ThingKey::Item(item),
        subject: ThingKey::Item(item),
        requestor,
        at,
        from: None,
        target: on,
    };
    if ctx.fire_rules(&rule, [ThingKey::Item(item)]) == 0 {
        return Ok(violation("item_is_usable", CANNOT_USE));
    }
    Ok(OperationOutcome::Performed)
}

pub(super) fn rotate(
    operation: &Operation,
    requestor: ActorId,
    at: Location,
    item: ItemType,
    ctx: &mut ExecutionContext<'_>,
    follow_ups: &mut FollowUps,
) -> Result<OperationOutcome> {
    let Some(rotated) = ctx.world.item_traits(item).rotates_to else {
        return Ok(violation("item_rotates", CANNOT_ROTATE));
    };
    if let Err(violation) = ownership_and_contents(requestor, at, item).evaluate(&ctx.policy_context()) {
        return Ok(OperationOutcome::Rejected(violation));
    }
    if let Some(target) = out_of_reach(ctx, requestor, at) {
        return walk_then_retry(operation, requestor, target, ctx, follow_ups);
    }

    if !ctx.world.transform_item(&at, item, rotated) {
        return Ok(OperationOutcome::Aborted);
    }
    if let Some(tile) = at.position() {
        ctx.notify(Audience::spectators(tile), Notification::TileUpdated { at: tile });
    }
    Ok(OperationOutcome::Performed)
}

/// Walk next to `target`, then run the operation again
///
/// Schedules an auto-walk and registers a single-execution collision rule on
/// the requestor: once it steps within reach of the target, the rule puts a
/// retried copy of the operation back on the schedule. The rule and the walk
/// share the operation's partition, so the rule goes away with the walk
/// however the walk ends.
fn walk_then_retry(
    operation: &Operation,
    requestor: ActorId,
    target: Position,
    ctx: &mut ExecutionContext<'_>,
    follow_ups: &mut FollowUps,
) -> Result<OperationOutcome> {
    if operation.retries() >= ctx.factory.max_path_retries() {
        return Ok(violation("requestor_in_range", OUT_OF_REACH));
    }
    let Some(from) = ctx.world.creature_position(requestor) else {
        return Ok(OperationOutcome::Aborted);
    };
    let steps = match ctx
        .pathfinder
        .find_path(&*ctx.world, requestor, from, target, 1)
    {
        Some(steps) if !steps.is_empty() => steps,
        _ => return Ok(violation("path_exists", NO_WAY)),
    };

    // Supersede any walk (and the rule waiting on it) still in flight.
    ctx.scheduler.cancel_all_for(requestor, OperationKind::AutoWalk);

    let retry = operation.retried();
    let rule = EventRule::new(
        RuleEvent::Collision,
        ThingKey::Creature(requestor),
        move |_, sink| sink.schedule_operation(retry.clone(), Duration::ZERO),
    )
    .when(move |_, world| {
        world
            .creature_position(requestor)
            .is_some_and(|at| at.is_adjacent(&target))
    })
    .once();
    ctx.rules.setup_rule(rule, operation.partition());

    debug!(
        requestor = %requestor,
        kind = %operation.kind(),
        steps = steps.len(),
        "walking_to_target"
    );
    let walk = ctx
        .factory
        .build(OperationArguments::AutoWalk {
            requestor,
            route: WalkRoute::Steps(steps),
        })?
        .with_partition(operation.partition());
    follow_ups.push(walk, Duration::ZERO);
    Ok(OperationOutcome::Deferred)
}
