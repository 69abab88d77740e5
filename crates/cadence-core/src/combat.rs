//! Combatants and combat domain events
//!
//! Combatants live in an arena keyed by actor id. Targets are ids resolved
//! through the arena, never references into it. State changes emit
//! [`CombatEvent`] values to every subscriber, synchronously, in the order
//! they happen.

use crate::{ActorId, CombatCreditPool};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Combat state of one actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub hitpoints: u32,
    pub max_hitpoints: u32,
    pub credits: CombatCreditPool,
    /// Damage dealt per landed attack
    pub attack_power: u32,
    /// Damage absorbed per defense credit spent
    pub defense_power: u32,
    /// Melee reach in tiles
    pub range: u16,
    target: Option<ActorId>,
}

impl Combatant {
    /// A combatant at full health with the standard credit pool
    pub fn new(max_hitpoints: u32) -> Self {
        Self {
            hitpoints: max_hitpoints,
            max_hitpoints,
            credits: CombatCreditPool::standard(),
            attack_power: 10,
            defense_power: 5,
            range: 1,
            target: None,
        }
    }

    /// Set attack and defense power, builder style
    pub fn with_power(mut self, attack_power: u32, defense_power: u32) -> Self {
        self.attack_power = attack_power;
        self.defense_power = defense_power;
        self
    }

    /// Replace the credit pool, builder style
    pub fn with_credits(mut self, credits: CombatCreditPool) -> Self {
        self.credits = credits;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.hitpoints > 0
    }

    pub fn target(&self) -> Option<ActorId> {
        self.target
    }
}

/// Something that happened to a combatant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatEvent {
    HealthChanged {
        creature: ActorId,
        hitpoints: u32,
        maximum: u32,
    },
    Died {
        creature: ActorId,
        killer: Option<ActorId>,
    },
    TargetChanged {
        creature: ActorId,
        previous: Option<ActorId>,
        current: Option<ActorId>,
    },
}

type Subscriber = Box<dyn Fn(&CombatEvent) + Send>;

/// Arena of every actor that can fight
#[derive(Default)]
pub struct Combatants {
    roster: IndexMap<ActorId, Combatant>,
    subscribers: Vec<Subscriber>,
}

impl Combatants {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&mut self, subscriber: impl Fn(&CombatEvent) + Send + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Enter a combatant into play, replacing any previous entry
    pub fn insert(&mut self, id: ActorId, combatant: Combatant) -> Option<Combatant> {
        self.roster.insert(id, combatant)
    }

    /// Take a combatant out of play; anyone targeting it loses the target
    pub fn remove(&mut self, id: ActorId) -> (Option<Combatant>, Vec<CombatEvent>) {
        let removed = self.roster.shift_remove(&id);
        let events = self.release_target(id);
        (removed, events)
    }

    pub fn get(&self, id: ActorId) -> Option<&Combatant> {
        self.roster.get(&id)
    }

    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut Combatant> {
        self.roster.get_mut(&id)
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.roster.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Ids in the order they entered play
    pub fn ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.roster.keys().copied()
    }

    /// Change who a combatant is attacking
    pub fn set_target(&mut self, id: ActorId, target: Option<ActorId>) -> Option<CombatEvent> {
        let combatant = self.roster.get_mut(&id)?;
        if combatant.target == target {
            return None;
        }
        let event = CombatEvent::TargetChanged {
            creature: id,
            previous: combatant.target,
            current: target,
        };
        combatant.target = target;
        self.emit(&event);
        Some(event)
    }

    /// Subtract hit points, clamped at zero
    pub fn apply_damage(
        &mut self,
        id: ActorId,
        amount: u32,
        source: Option<ActorId>,
    ) -> Vec<CombatEvent> {
        let Some(combatant) = self.roster.get_mut(&id) else {
            return Vec::new();
        };
        if !combatant.is_alive() || amount == 0 {
            return Vec::new();
        }
        combatant.hitpoints = combatant.hitpoints.saturating_sub(amount);
        let mut events = vec![CombatEvent::HealthChanged {
            creature: id,
            hitpoints: combatant.hitpoints,
            maximum: combatant.max_hitpoints,
        }];
        if !combatant.is_alive() {
            combatant.target = None;
            events.push(CombatEvent::Died {
                creature: id,
                killer: source,
            });
        }
        for event in &events {
            self.emit(event);
        }
        if matches!(events.last(), Some(CombatEvent::Died { .. })) {
            events.extend(self.release_target(id));
        }
        events
    }

    /// Add hit points, clamped at the maximum
    pub fn heal(&mut self, id: ActorId, amount: u32) -> Option<CombatEvent> {
        let combatant = self.roster.get_mut(&id)?;
        if !combatant.is_alive() {
            return None;
        }
        let healed = combatant
            .hitpoints
            .saturating_add(amount)
            .min(combatant.max_hitpoints);
        if healed == combatant.hitpoints {
            return None;
        }
        combatant.hitpoints = healed;
        let event = CombatEvent::HealthChanged {
            creature: id,
            hitpoints: healed,
            maximum: combatant.max_hitpoints,
        };
        self.emit(&event);
        Some(event)
    }

    /// Clear `id` as a target everywhere
    fn release_target(&mut self, id: ActorId) -> Vec<CombatEvent> {
        let hunters: Vec<ActorId> = self
            .roster
            .iter()
            .filter(|(_, combatant)| combatant.target == Some(id))
            .map(|(hunter, _)| *hunter)
            .collect();
        hunters
            .into_iter()
            .filter_map(|hunter| self.set_target(hunter, None))
            .collect()
    }

    fn emit(&self, event: &CombatEvent) {
        for subscriber in &self.subscribers {
            subscriber(event);
        }
    }
}

impl fmt::Debug for Combatants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Combatants")
            .field("roster", &self.roster)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorded(combatants: &mut Combatants) -> Arc<Mutex<Vec<CombatEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        combatants.subscribe(move |event| sink.lock().unwrap().push(*event));
        log
    }

    #[test]
    fn test_damage_clamps_and_reports_death() {
        let mut combatants = Combatants::new();
        combatants.insert(ActorId(1), Combatant::new(20));
        combatants.insert(ActorId(2), Combatant::new(20));
        combatants.set_target(ActorId(2), Some(ActorId(1)));
        let log = recorded(&mut combatants);

        combatants.apply_damage(ActorId(1), 15, Some(ActorId(2)));
        let events = combatants.apply_damage(ActorId(1), 15, Some(ActorId(2)));

        assert_eq!(combatants.get(ActorId(1)).unwrap().hitpoints, 0);
        assert_eq!(
            events,
            vec![
                CombatEvent::HealthChanged {
                    creature: ActorId(1),
                    hitpoints: 0,
                    maximum: 20
                },
                CombatEvent::Died {
                    creature: ActorId(1),
                    killer: Some(ActorId(2))
                },
                CombatEvent::TargetChanged {
                    creature: ActorId(2),
                    previous: Some(ActorId(1)),
                    current: None
                },
            ]
        );
        assert_eq!(log.lock().unwrap().len(), 4);
        assert!(combatants.apply_damage(ActorId(1), 5, None).is_empty());
    }

    #[test]
    fn test_target_change_emitted_once() {
        let mut combatants = Combatants::new();
        combatants.insert(ActorId(1), Combatant::new(10));
        let log = recorded(&mut combatants);

        assert!(combatants.set_target(ActorId(1), Some(ActorId(5))).is_some());
        assert!(combatants.set_target(ActorId(1), Some(ActorId(5))).is_none());
        assert_eq!(combatants.get(ActorId(1)).unwrap().target(), Some(ActorId(5)));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_heal_clamps_at_maximum() {
        let mut combatants = Combatants::new();
        combatants.insert(ActorId(1), Combatant::new(30));
        combatants.apply_damage(ActorId(1), 10, None);
        combatants.heal(ActorId(1), 50);
        assert_eq!(combatants.get(ActorId(1)).unwrap().hitpoints, 30);
        assert!(combatants.heal(ActorId(1), 1).is_none());
    }

    #[test]
    fn test_remove_releases_hunters() {
        let mut combatants = Combatants::new();
        combatants.insert(ActorId(1), Combatant::new(10));
        combatants.insert(ActorId(2), Combatant::new(10));
        combatants.set_target(ActorId(2), Some(ActorId(1)));

        let (removed, events) = combatants.remove(ActorId(1));
        assert!(removed.is_some());
        assert_eq!(events.len(), 1);
        assert_eq!(combatants.get(ActorId(2)).unwrap().target(), None);
        assert_eq!(combatants.ids().collect::<Vec<_>>(), vec![ActorId(2)]);
    }
}
