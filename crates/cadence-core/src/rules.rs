//! Event rules
//!
//! Rules are conditional triggers matched against world events (a thing
//! arriving on a tile, leaving one, or being used). When a rule matches and
//! its condition holds, its action runs, usually scheduling a follow-up
//! operation. Rules carry an execution budget and a partition key so they
//! can be cleared together with the request chain that registered them.

use crate::operation::OperationSink;
use crate::{ActorId, ItemType, Location, PartitionKey, ThingKey, World};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// World events rules can react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleEvent {
    /// A thing arrived on a tile
    Collision,
    /// A thing left a tile
    Separation,
    /// A thing was used, possibly on another thing
    Use,
}

/// Remaining executions of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Executions {
    Unlimited,
    Limited(u32),
}

/// What happened, as seen by a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleContext {
    pub event: RuleEvent,
    /// The key this context is being matched against
    pub thing: ThingKey,
    /// The thing that moved or was used
    pub subject: ThingKey,
    /// Who caused the event
    pub requestor: ActorId,
    /// Where the event happened (destination, source, or used location)
    pub at: Location,
    /// Where a moving thing came from
    pub from: Option<Location>,
    /// The thing something was used on
    pub target: Option<(Location, ItemType)>,
}

impl RuleContext {
    /// Same event, matched against a different key
    pub fn for_thing(&self, thing: ThingKey) -> Self {
        Self {
            thing,
            ..self.clone()
        }
    }
}

type Condition = Box<dyn Fn(&RuleContext, &dyn World) -> bool + Send + Sync>;
type Action = Arc<dyn Fn(&RuleContext, &dyn OperationSink) + Send + Sync>;

/// A conditional trigger
pub struct EventRule {
    event: RuleEvent,
    thing: ThingKey,
    condition: Option<Condition>,
    action: Action,
    executions: Executions,
}

impl EventRule {
    /// A rule with no condition and unlimited executions
    pub fn new(
        event: RuleEvent,
        thing: ThingKey,
        action: impl Fn(&RuleContext, &dyn OperationSink) + Send + Sync + 'static,
    ) -> Self {
        Self {
            event,
            thing,
            condition: None,
            action: Arc::new(action),
            executions: Executions::Unlimited,
        }
    }

    /// Only fire when `condition` holds
    pub fn when(
        mut self,
        condition: impl Fn(&RuleContext, &dyn World) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }

    /// Fire at most `count` times, then remove itself. A budget of zero is
    /// never registered.
    pub fn times(mut self, count: u32) -> Self {
        self.executions = Executions::Limited(count);
        self
    }

    /// Fire at most once
    pub fn once(self) -> Self {
        self.times(1)
    }

    pub fn event(&self) -> RuleEvent {
        self.event
    }

    pub fn thing(&self) -> ThingKey {
        self.thing
    }

    pub fn executions(&self) -> Executions {
        self.executions
    }

    fn matches(&self, ctx: &RuleContext, world: &dyn World) -> bool {
        self.event == ctx.event
            && self.thing == ctx.thing
            && self.executions != Executions::Limited(0)
            && self
                .condition
                .as_ref()
                .map_or(true, |condition| condition(ctx, world))
    }

    /// Spend one execution; true when the budget is now exhausted
    fn spend(&mut self) -> bool {
        match &mut self.executions {
            Executions::Unlimited => false,
            Executions::Limited(remaining) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
        }
    }
}

impl fmt::Debug for EventRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRule")
            .field("event", &self.event)
            .field("thing", &self.thing)
            .field("conditional", &self.condition.is_some())
            .field("executions", &self.executions)
            .finish()
    }
}

/// Handle to a registered rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u64);

struct Registered {
    partition: PartitionKey,
    rule: EventRule,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    /// Registration order is firing order
    rules: IndexMap<RuleId, Registered>,
}

/// Thread-safe registry of event rules
#[derive(Default)]
pub struct EventRuleEngine {
    registry: Mutex<Registry>,
}

impl EventRuleEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule under `partition`
    ///
    /// A rule with no executions left is dropped without being registered.
    pub fn setup_rule(&self, rule: EventRule, partition: PartitionKey) -> RuleId {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.next_id += 1;
        let id = RuleId(registry.next_id);
        if rule.executions == Executions::Limited(0) {
            debug!(rule = id.0, partition = %partition, thing = %rule.thing, "rule_without_executions");
            return id;
        }
        debug!(rule = id.0, partition = %partition, thing = %rule.thing, "rule_registered");
        registry.rules.insert(id, Registered { partition, rule });
        id
    }

    /// Remove every rule registered under `partition`
    pub fn clear_all_for(&self, partition: PartitionKey) -> usize {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let before = registry.rules.len();
        registry
            .rules
            .retain(|_, registered| registered.partition != partition);
        let cleared = before - registry.rules.len();
        if cleared > 0 {
            debug!(partition = %partition, cleared, "rules_cleared");
        }
        cleared
    }

    /// Remove one rule
    pub fn remove(&self, id: RuleId) -> bool {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rules
            .shift_remove(&id)
            .is_some()
    }

    /// Whether a rule is still registered
    pub fn contains(&self, id: RuleId) -> bool {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rules
            .contains_key(&id)
    }

    /// Number of registered rules
    pub fn len(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rules
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fire every matching rule for `ctx`; returns how many fired
    ///
    /// Conditions run under the registry lock; actions run after it is
    /// released, so an action may register or clear rules itself.
    pub fn fire(&self, ctx: &RuleContext, world: &dyn World, sink: &dyn OperationSink) -> usize {
        let actions: Vec<Action> = {
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            let mut spent = Vec::new();
            let mut actions = Vec::new();
            for (id, registered) in registry.rules.iter_mut() {
                if !registered.rule.matches(ctx, world) {
                    continue;
                }
                actions.push(Arc::clone(&registered.rule.action));
                if registered.rule.spend() {
                    spent.push(*id);
                }
            }
            for id in spent {
                registry.rules.shift_remove(&id);
            }
            actions
        };

        for action in &actions {
            action(ctx, sink);
        }
        if !actions.is_empty() {
            debug!(event = ?ctx.event, thing = %ctx.thing, fired = actions.len(), "rules_fired");
        }
        actions.len()
    }

    /// Fire `ctx` once for every key in `things`
    pub fn fire_for_each(
        &self,
        ctx: &RuleContext,
        things: impl IntoIterator<Item = ThingKey>,
        world: &dyn World,
        sink: &dyn OperationSink,
    ) -> usize {
        things
            .into_iter()
            .map(|thing| self.fire(&ctx.for_thing(thing), world, sink))
            .sum()
    }
}

impl fmt::Debug for EventRuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRuleEngine")
            .field("rules", &self.len())
            .finish()
    }
}
