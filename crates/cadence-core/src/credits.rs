//! Combat credits
//!
//! Attack and defense credits are a regenerating budget: an attack spends
//! one attack credit, blocking an incoming hit spends one defense credit, and
//! a periodic regeneration operation restores `speed` credits per round.

use serde::{Deserialize, Serialize};

/// Which credit counter to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreditType {
    Attack,
    Defense,
}

/// A single clamped counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCounter {
    current: u32,
    maximum: u32,
    /// Credits restored per combat round
    speed: u32,
}

impl CreditCounter {
    /// Create a full counter
    pub fn new(maximum: u32, speed: u32) -> Self {
        Self {
            current: maximum,
            maximum,
            speed,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn maximum(&self) -> u32 {
        self.maximum
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    fn consume(&mut self, amount: u32) {
        self.current = self.current.saturating_sub(amount);
    }

    fn restore(&mut self, amount: u32) {
        self.current = self.current.saturating_add(amount).min(self.maximum);
    }
}

/// Attack and defense credits of one combatant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatCreditPool {
    attack: CreditCounter,
    defense: CreditCounter,
}

impl CombatCreditPool {
    /// Create a full pool
    pub fn new(attack: CreditCounter, defense: CreditCounter) -> Self {
        Self { attack, defense }
    }

    /// One attack and two defenses per round, the usual melee creature
    pub fn standard() -> Self {
        Self::new(CreditCounter::new(1, 1), CreditCounter::new(2, 2))
    }

    /// The counter for `credit`
    pub fn counter(&self, credit: CreditType) -> &CreditCounter {
        match credit {
            CreditType::Attack => &self.attack,
            CreditType::Defense => &self.defense,
        }
    }

    fn counter_mut(&mut self, credit: CreditType) -> &mut CreditCounter {
        match credit {
            CreditType::Attack => &mut self.attack,
            CreditType::Defense => &mut self.defense,
        }
    }

    /// Current credits of `credit`
    pub fn available(&self, credit: CreditType) -> u32 {
        self.counter(credit).current
    }

    /// Whether `amount` credits can be spent right now
    pub fn has_credits(&self, credit: CreditType, amount: u32) -> bool {
        self.available(credit) >= amount
    }

    /// Spend credits, clamping at zero
    pub fn consume_credits(&mut self, credit: CreditType, amount: u32) {
        self.counter_mut(credit).consume(amount);
    }

    /// Give back credits, clamping at the maximum
    pub fn restore_credits(&mut self, credit: CreditType, amount: u32) {
        self.counter_mut(credit).restore(amount);
    }

    /// Restore one round's worth of both counters
    pub fn regenerate(&mut self) {
        let attack = self.attack.speed;
        let defense = self.defense.speed;
        self.attack.restore(attack);
        self.defense.restore(defense);
    }

    /// Raise the regeneration rate (haste and similar effects)
    pub fn increase_speed(&mut self, credit: CreditType, amount: u32) {
        let counter = self.counter_mut(credit);
        counter.speed = counter.speed.saturating_add(amount);
    }

    /// Lower the regeneration rate, never below zero
    pub fn decrease_speed(&mut self, credit: CreditType, amount: u32) {
        let counter = self.counter_mut(credit);
        counter.speed = counter.speed.saturating_sub(amount);
    }
}

impl Default for CombatCreditPool {
    fn default() -> Self {
        Self::standard()
    }
}
