//! Creature operations: walking, turning and leaving the world

use super::movement::fire_movement_rules;
use super::{
    violation, FollowUps, Operation, OperationArguments, OperationKind, OperationOutcome,
    WalkRoute,
};
use crate::operation::ExecutionContext;
use crate::policies::{LocationHasGround, LocationNotObstructed, NotExhausted};
use crate::rules::{RuleContext, RuleEvent};
use crate::{
    ActorId, Audience, Direction, ExhaustionType, Location, Notification, PolicyChain, Result,
    ThingKey,
};
use std::time::Duration;
use tracing::debug;

const NO_WAY: &str = "There is no way.";
const LOGOUT_IN_FIGHT: &str = "You may not logout during or immediately after a fight!";

/// Take one step of the route and schedule the rest
///
/// Each step is its own operation, so every step pays its walk exhaustion
/// and a new walk request can cancel the remainder between steps. Once the
/// walk stops, finished or not, rules waiting on it under its partition are
/// cleared.
pub(super) fn auto_walk(
    operation: &Operation,
    requestor: ActorId,
    route: &WalkRoute,
    ctx: &mut ExecutionContext<'_>,
    follow_ups: &mut FollowUps,
) -> Result<OperationOutcome> {
    let outcome = step(operation, requestor, route, ctx, follow_ups)?;
    let walking_on = outcome == OperationOutcome::Performed && !follow_ups.is_empty();
    if !walking_on {
        let cleared = ctx.rules.clear_all_for(operation.partition());
        if cleared > 0 {
            debug!(requestor = %requestor, partition = %operation.partition(), cleared, "walk_ended");
        }
    }
    Ok(outcome)
}

fn step(
    operation: &Operation,
    requestor: ActorId,
    route: &WalkRoute,
    ctx: &mut ExecutionContext<'_>,
    follow_ups: &mut FollowUps,
) -> Result<OperationOutcome> {
    let Some(at) = ctx.world.creature_position(requestor) else {
        return Ok(OperationOutcome::Aborted);
    };

    let steps = match route {
        WalkRoute::Steps(steps) => steps.clone(),
        WalkRoute::Towards { target, reach } => {
            match ctx
                .pathfinder
                .find_path(&*ctx.world, requestor, at, *target, *reach)
            {
                Some(steps) => steps,
                None => return Ok(violation("path_exists", NO_WAY)),
            }
        }
    };
    let Some((&direction, rest)) = steps.split_first() else {
        return Ok(OperationOutcome::Aborted);
    };

    let next = at.translate(direction);
    let chain = PolicyChain::new()
        .with(LocationHasGround { at: next })
        .with(LocationNotObstructed {
            at: next,
            for_creature: true,
        });
    if let Err(violation) = chain.evaluate(&ctx.policy_context()) {
        return Ok(OperationOutcome::Rejected(violation));
    }

    if !ctx.world.move_creature(requestor, next) {
        return Ok(OperationOutcome::Aborted);
    }
    ctx.world.set_creature_direction(requestor, direction);
    ctx.notify(
        Audience::spectators(at),
        Notification::CreatureMoved {
            creature: requestor,
            from: at,
            to: next,
        },
    );
    fire_movement_rules(
        ctx,
        ThingKey::Creature(requestor),
        requestor,
        Location::Map(at),
        Location::Map(next),
    );

    if !rest.is_empty() {
        let remaining = ctx
            .factory
            .build(OperationArguments::AutoWalk {
                requestor,
                route: WalkRoute::Steps(rest.to_vec()),
            })?
            .with_partition(operation.partition());
        follow_ups.push(remaining, Duration::ZERO);
    }
    Ok(OperationOutcome::Performed)
}

pub(super) fn turn(
    requestor: ActorId,
    direction: Direction,
    ctx: &mut ExecutionContext<'_>,
) -> OperationOutcome {
    if !ctx.world.set_creature_direction(requestor, direction) {
        return OperationOutcome::Aborted;
    }
    if let Some(at) = ctx.world.creature_position(requestor) {
        ctx.notify(
            Audience::spectators(at),
            Notification::CreatureTurned {
                creature: requestor,
                direction,
            },
        );
    }
    OperationOutcome::Performed
}

/// Take the creature out of the world, unless it is still in a fight
pub(super) fn logout(requestor: ActorId, ctx: &mut ExecutionContext<'_>) -> OperationOutcome {
    let chain = PolicyChain::new().with(NotExhausted {
        actor: requestor,
        exhaustion: ExhaustionType::Combat,
        message: LOGOUT_IN_FIGHT.to_string(),
    });
    if let Err(violation) = chain.evaluate(&ctx.policy_context()) {
        return OperationOutcome::Rejected(violation);
    }

    for kind in [
        OperationKind::AutoWalk,
        OperationKind::Attack,
        OperationKind::RestoreCredits,
        OperationKind::SpeedChange,
    ] {
        ctx.scheduler.cancel_all_for(requestor, kind);
    }

    let Some(at) = ctx.world.remove_creature(requestor) else {
        return OperationOutcome::Aborted;
    };
    let (_, events) = ctx.combatants.remove(requestor);
    debug!(requestor = %requestor, at = %at, released = events.len(), "creature_logged_out");
    ctx.exhaustion.forget(requestor);

    ctx.notify(
        Audience::spectators(at),
        Notification::CreatureRemoved {
            creature: requestor,
            at,
        },
    );
    let keys = std::iter::once(ThingKey::Creature(requestor))
        .chain(ctx.world.tile_items(&at).into_iter().map(ThingKey::Item));
    let rule = RuleContext {
        event: RuleEvent::Separation,
        thing: ThingKey::Creature(requestor),
        subject: ThingKey::Creature(requestor),
        requestor,
        at: Location::Map(at),
        from: None,
        target: None,
    };
    ctx.fire_rules(&rule, keys);
    OperationOutcome::Performed
}
