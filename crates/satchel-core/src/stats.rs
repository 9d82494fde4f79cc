//! Player-side collaborators fed by the inventory.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::equipment::EquipmentBonuses;

/// Receives healing from consumed items.
pub trait HealthSink {
    /// Restores `amount` health.
    fn heal(&mut self, amount: u32);
}

/// Receives aggregate equipment bonuses whenever equipment changes.
pub trait StatsSink {
    /// Replaces the current equipment bonuses.
    fn apply_equipment_bonuses(&mut self, bonuses: EquipmentBonuses);
}

impl<T: HealthSink + ?Sized> HealthSink for Rc<RefCell<T>> {
    fn heal(&mut self, amount: u32) {
        self.borrow_mut().heal(amount);
    }
}

impl<T: StatsSink + ?Sized> StatsSink for Rc<RefCell<T>> {
    fn apply_equipment_bonuses(&mut self, bonuses: EquipmentBonuses) {
        self.borrow_mut().apply_equipment_bonuses(bonuses);
    }
}

/// Minimal player record: health plus base and equipment-derived stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerVitals {
    /// Current health points.
    pub hp: u32,
    /// Maximum health points.
    pub max_hp: u32,
    /// Defense before equipment.
    pub base_defense: i32,
    /// Movement speed before equipment.
    pub base_speed: f32,
    /// Bonuses last pushed by the equipment register.
    pub bonuses: EquipmentBonuses,
}

impl Default for PlayerVitals {
    fn default() -> Self {
        Self {
            hp: 100,
            max_hp: 100,
            base_defense: 0,
            base_speed: 1.0,
            bonuses: EquipmentBonuses::default(),
        }
    }
}

impl PlayerVitals {
    /// Create new player vitals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set health values.
    #[must_use]
    pub fn with_health(mut self, hp: u32, max_hp: u32) -> Self {
        self.max_hp = max_hp;
        self.hp = hp.min(max_hp);
        self
    }

    /// Takes damage, bottoming out at zero.
    pub fn damage(&mut self, amount: u32) {
        self.hp = self.hp.saturating_sub(amount);
    }

    /// Effective defense.
    #[must_use]
    pub fn defense(&self) -> i32 {
        self.base_defense + self.bonuses.defense
    }

    /// Effective speed.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.base_speed + self.bonuses.speed
    }

    /// Check if player is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}

impl HealthSink for PlayerVitals {
    fn heal(&mut self, amount: u32) {
        self.hp = self.hp.saturating_add(amount).min(self.max_hp);
    }
}

impl StatsSink for PlayerVitals {
    fn apply_equipment_bonuses(&mut self, bonuses: EquipmentBonuses) {
        self.bonuses = bonuses;
    }
}
