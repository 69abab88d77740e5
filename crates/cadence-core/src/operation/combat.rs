//! Attacks, credit regeneration and speed effects

use super::{violation, FollowUps, Operation, OperationArguments, OperationOutcome};
use crate::operation::ExecutionContext;
use crate::{
    ActorId, Audience, CombatEvent, CreditType, Effect, Error, Notification, Position, Result,
};
use std::time::Duration;
use tracing::debug;

const OUT_OF_RANGE: &str = "Target is out of range.";
const NO_CREDITS: &str = "You are exhausted.";

/// Resolve one attack of `requestor` on `target`
///
/// The attacker spends an attack credit; the defender spends a defense
/// credit, if it has one, to absorb part of the hit. Auto attacks keep
/// rescheduling themselves while the target lives, waiting a round when
/// out of range or out of credits instead of giving up.
pub(super) fn attack(
    operation: &Operation,
    requestor: ActorId,
    target: ActorId,
    auto: bool,
    ctx: &mut ExecutionContext<'_>,
    follow_ups: &mut FollowUps,
) -> OperationOutcome {
    let target_alive = ctx
        .combatants
        .get(target)
        .is_some_and(|combatant| combatant.is_alive());
    let Some((alive, range, has_credits)) = ctx.combatants.get(requestor).map(|attacker| {
        (
            attacker.is_alive(),
            attacker.range,
            attacker.credits.has_credits(CreditType::Attack, 1),
        )
    }) else {
        return OperationOutcome::Aborted;
    };
    if !alive {
        return OperationOutcome::Aborted;
    }
    let retargeted: Vec<CombatEvent> = ctx
        .combatants
        .set_target(requestor, target_alive.then_some(target))
        .into_iter()
        .collect();
    mirror(ctx, retargeted);
    if !target_alive {
        return OperationOutcome::Aborted;
    }

    let positions = (
        ctx.world.creature_position(requestor),
        ctx.world.creature_position(target),
    );
    let (Some(from), Some(at)) = positions else {
        return OperationOutcome::Aborted;
    };
    let blocker = if !from.is_within(&at, range, range) {
        Some(violation("target_in_range", OUT_OF_RANGE))
    } else if !has_credits {
        Some(violation("attack_credits", NO_CREDITS))
    } else {
        None
    };
    if let Some(blocked) = blocker {
        if auto {
            follow_ups.push(operation.clone(), ctx.factory.combat_round());
            return OperationOutcome::Deferred;
        }
        return blocked;
    }

    let dealt = strike(requestor, target, at, ctx);
    debug!(attacker = %requestor, target = %target, damage = dealt, "attack_resolved");

    let still_alive = ctx
        .combatants
        .get(target)
        .is_some_and(|combatant| combatant.is_alive());
    if auto && still_alive {
        follow_ups.push(operation.clone(), Duration::ZERO);
    }
    OperationOutcome::Performed
}

/// Spend credits and apply damage; returns the damage dealt
fn strike(requestor: ActorId, target: ActorId, at: Position, ctx: &mut ExecutionContext<'_>) -> u32 {
    let mut damage = 0;
    if let Some(attacker) = ctx.combatants.get_mut(requestor) {
        attacker.credits.consume_credits(CreditType::Attack, 1);
        damage = attacker.attack_power;
    }
    if let Some(defender) = ctx.combatants.get_mut(target) {
        if defender.credits.has_credits(CreditType::Defense, 1) {
            defender.credits.consume_credits(CreditType::Defense, 1);
            damage = damage.saturating_sub(defender.defense_power);
        }
    }

    let effect = if damage == 0 { Effect::Block } else { Effect::Blood };
    ctx.notify(Audience::spectators(at), Notification::EffectPlayed { at, effect });
    let events = ctx.combatants.apply_damage(target, damage, Some(requestor));
    mirror(ctx, events);
    damage
}

/// Forward combat events to the notification sink
fn mirror(ctx: &ExecutionContext<'_>, events: Vec<CombatEvent>) {
    for event in events {
        match event {
            CombatEvent::HealthChanged {
                creature,
                hitpoints,
                maximum,
            } => {
                if let Some(at) = ctx.world.creature_position(creature) {
                    ctx.notify(
                        Audience::spectators(at),
                        Notification::HealthChanged {
                            creature,
                            hitpoints,
                            maximum,
                        },
                    );
                }
            }
            CombatEvent::Died { creature, .. } => {
                if let Some(at) = ctx.world.creature_position(creature) {
                    ctx.notify(
                        Audience::spectators(at),
                        Notification::EffectPlayed {
                            at,
                            effect: Effect::Puff,
                        },
                    );
                }
            }
            CombatEvent::TargetChanged { .. } => {}
        }
    }
}

/// Regenerate one round of credits, then come back next round
pub(super) fn restore_credits(
    operation: &Operation,
    combatant: ActorId,
    ctx: &mut ExecutionContext<'_>,
    follow_ups: &mut FollowUps,
) -> OperationOutcome {
    match ctx.combatants.get_mut(combatant) {
        Some(state) if state.is_alive() => state.credits.regenerate(),
        _ => return OperationOutcome::Aborted,
    }
    follow_ups.push(operation.clone(), ctx.factory.combat_round());
    OperationOutcome::Performed
}

/// Adjust a regeneration rate; a timed change schedules its own reversal
pub(super) fn speed_change(
    combatant: ActorId,
    credit: CreditType,
    delta: i32,
    lasts: Option<Duration>,
    ctx: &mut ExecutionContext<'_>,
    follow_ups: &mut FollowUps,
) -> Result<OperationOutcome> {
    let Some(state) = ctx.combatants.get_mut(combatant) else {
        return Ok(OperationOutcome::Aborted);
    };
    let before = state.credits.counter(credit).speed();
    if delta > 0 {
        state.credits.increase_speed(credit, delta.unsigned_abs());
    } else {
        state.credits.decrease_speed(credit, delta.unsigned_abs());
    }
    let after = state.credits.counter(credit).speed();

    // Undo what was applied, which is less than `delta` when the speed saturated.
    let applied = i64::from(after) - i64::from(before);
    if let Some(lasts) = lasts.filter(|_| applied != 0) {
        let reversal = ctx.factory.build(OperationArguments::SpeedChange {
            combatant,
            credit,
            delta: i32::try_from(-applied).map_err(|_| {
                Error::InvalidOperation(format!("speed change of {} cannot be reversed", applied))
            })?,
            lasts: None,
        })?;
        follow_ups.push(reversal, lasts);
    }
    Ok(OperationOutcome::Performed)
}
