//! Per-entity combat statistics.
//!
//! This module provides:
//! - Stat blocks (attack, defense, magic attack, magic defense)
//! - The stat record with base, equipment and buff terms and cached totals
//! - Ailment resistances and element affinities
//! - Snapshot save/load hooks

use serde::{Deserialize, Serialize};
use skirmish_common::{SchemaVersion, SnapshotError, SnapshotResult};

use crate::damage::{AttackKind, Element, ElementAffinity};
use crate::status::AilmentKind;

// ============================================================================
// Stat Blocks
// ============================================================================

/// One of the four offensive/defensive stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// Physical attack.
    Attack,
    /// Physical defense.
    Defense,
    /// Magic attack.
    MagicAttack,
    /// Magic defense.
    MagicDefense,
}

/// A set of the four stats, used for each contributing term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatBlock {
    /// Physical attack.
    pub attack: i32,
    /// Physical defense.
    pub defense: i32,
    /// Magic attack.
    pub magic_attack: i32,
    /// Magic defense.
    pub magic_defense: i32,
}

impl StatBlock {
    /// Create a stat block.
    #[must_use]
    pub const fn new(attack: i32, defense: i32, magic_attack: i32, magic_defense: i32) -> Self {
        Self {
            attack,
            defense,
            magic_attack,
            magic_defense,
        }
    }

    /// Get one stat.
    #[must_use]
    pub const fn get(&self, kind: StatKind) -> i32 {
        match kind {
            StatKind::Attack => self.attack,
            StatKind::Defense => self.defense,
            StatKind::MagicAttack => self.magic_attack,
            StatKind::MagicDefense => self.magic_defense,
        }
    }

    fn get_mut(&mut self, kind: StatKind) -> &mut i32 {
        match kind {
            StatKind::Attack => &mut self.attack,
            StatKind::Defense => &mut self.defense,
            StatKind::MagicAttack => &mut self.magic_attack,
            StatKind::MagicDefense => &mut self.magic_defense,
        }
    }
}

impl std::ops::Add for StatBlock {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            attack: self.attack + rhs.attack,
            defense: self.defense + rhs.defense,
            magic_attack: self.magic_attack + rhs.magic_attack,
            magic_defense: self.magic_defense + rhs.magic_defense,
        }
    }
}

// ============================================================================
// Resistances
// ============================================================================

/// Chance to resist each ailment, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resistances {
    /// Poison resistance.
    pub poison: i32,
    /// Stun resistance.
    pub stun: i32,
    /// Silence resistance.
    pub silence: i32,
    /// Immobilize (web) resistance.
    pub immobilize: i32,
}

impl Resistances {
    /// Resistance to one ailment, clamped to `[0, 100]`.
    #[must_use]
    pub fn get(&self, kind: AilmentKind) -> i32 {
        let raw = match kind {
            AilmentKind::Poison => self.poison,
            AilmentKind::Stun => self.stun,
            AilmentKind::Silence => self.silence,
            AilmentKind::Immobilize => self.immobilize,
        };
        raw.clamp(0, 100)
    }

    /// Immune to every ailment.
    #[must_use]
    pub const fn immune() -> Self {
        Self {
            poison: 100,
            stun: 100,
            silence: 100,
            immobilize: 100,
        }
    }
}

// ============================================================================
// Stat Record
// ============================================================================

/// Complete numeric state of a combat-capable entity.
///
/// Totals are `base + equipment + buffs` and are recomputed on every change
/// to a contributing term. Current HP/MP always stay within `[0, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRecord {
    level: u32,
    base: StatBlock,
    equipment: StatBlock,
    buffs: StatBlock,
    base_max_hp: i32,
    base_max_mp: i32,
    equipment_max_hp: i32,
    equipment_max_mp: i32,
    hp: i32,
    mp: i32,
    resistances: Resistances,
    affinity: ElementAffinity,
    auto_guard_pct: i32,
    totals: StatBlock,
    max_hp: i32,
    max_mp: i32,
}

impl Default for StatRecord {
    fn default() -> Self {
        Self::new(1, StatBlock::new(10, 5, 10, 5), 100, 50)
    }
}

impl StatRecord {
    /// Create a record at full HP/MP.
    #[must_use]
    pub fn new(level: u32, base: StatBlock, max_hp: i32, max_mp: i32) -> Self {
        let mut record = Self {
            level,
            base,
            equipment: StatBlock::default(),
            buffs: StatBlock::default(),
            base_max_hp: max_hp,
            base_max_mp: max_mp,
            equipment_max_hp: 0,
            equipment_max_mp: 0,
            hp: 0,
            mp: 0,
            resistances: Resistances::default(),
            affinity: ElementAffinity::default(),
            auto_guard_pct: 0,
            totals: StatBlock::default(),
            max_hp: 0,
            max_mp: 0,
        };
        record.recompute();
        record.hp = record.max_hp;
        record.mp = record.max_mp;
        record
    }

    /// Set resistances.
    #[must_use]
    pub fn with_resistances(mut self, resistances: Resistances) -> Self {
        self.resistances = resistances;
        self
    }

    /// Set element affinity.
    #[must_use]
    pub fn with_affinity(mut self, affinity: ElementAffinity) -> Self {
        self.affinity = affinity;
        self
    }

    /// Set auto-guard chance (clamped to `[0, 100]`).
    #[must_use]
    pub fn with_auto_guard(mut self, pct: i32) -> Self {
        self.auto_guard_pct = pct.clamp(0, 100);
        self
    }

    /// Set equipment bonuses; HP/MP are topped up by the added maximum.
    #[must_use]
    pub fn with_equipment(mut self, bonus: StatBlock, max_hp: i32, max_mp: i32) -> Self {
        self.set_equipment(bonus, max_hp, max_mp);
        self.hp = self.max_hp;
        self.mp = self.max_mp;
        self
    }

    fn recompute(&mut self) {
        self.totals = self.base + self.equipment + self.buffs;
        self.max_hp = (self.base_max_hp + self.equipment_max_hp).max(1);
        self.max_mp = (self.base_max_mp + self.equipment_max_mp).max(0);
        self.hp = self.hp.clamp(0, self.max_hp);
        self.mp = self.mp.clamp(0, self.max_mp);
    }

    // === Accessors ===

    /// Level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Current HP.
    #[must_use]
    pub const fn hp(&self) -> i32 {
        self.hp
    }

    /// Current MP.
    #[must_use]
    pub const fn mp(&self) -> i32 {
        self.mp
    }

    /// Total max HP.
    #[must_use]
    pub const fn max_hp(&self) -> i32 {
        self.max_hp
    }

    /// Total max MP.
    #[must_use]
    pub const fn max_mp(&self) -> i32 {
        self.max_mp
    }

    /// Total of one stat (base + equipment + buffs).
    #[must_use]
    pub const fn total(&self, kind: StatKind) -> i32 {
        self.totals.get(kind)
    }

    /// Base term.
    #[must_use]
    pub const fn base(&self) -> StatBlock {
        self.base
    }

    /// Equipment term.
    #[must_use]
    pub const fn equipment(&self) -> StatBlock {
        self.equipment
    }

    /// Buff term.
    #[must_use]
    pub const fn buffs(&self) -> StatBlock {
        self.buffs
    }

    /// Ailment resistances.
    #[must_use]
    pub const fn resistances(&self) -> &Resistances {
        &self.resistances
    }

    /// Element affinity table.
    #[must_use]
    pub const fn affinity(&self) -> &ElementAffinity {
        &self.affinity
    }

    /// Effectiveness of an element against this entity, in percent.
    #[must_use]
    pub fn element_percent(&self, element: Element) -> i32 {
        self.affinity.percent(element)
    }

    /// Chance to guard automatically, in percent.
    #[must_use]
    pub const fn auto_guard_pct(&self) -> i32 {
        self.auto_guard_pct
    }

    /// Attack or magic attack including buffs.
    #[must_use]
    pub const fn effective_power(&self, kind: AttackKind) -> i32 {
        match kind {
            AttackKind::Physical => self.totals.attack,
            AttackKind::Magical => self.totals.magic_attack,
        }
    }

    /// Defense or magic defense including buffs.
    #[must_use]
    pub const fn defense_against(&self, kind: AttackKind) -> i32 {
        match kind {
            AttackKind::Physical => self.totals.defense,
            AttackKind::Magical => self.totals.magic_defense,
        }
    }

    /// Check if dead.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.hp <= 0
    }

    /// HP as a fraction of max (0.0-1.0).
    #[must_use]
    pub fn hp_ratio(&self) -> f32 {
        self.hp as f32 / self.max_hp as f32
    }

    /// Whether HP is below max.
    #[must_use]
    pub const fn is_wounded(&self) -> bool {
        self.hp < self.max_hp
    }

    // === Mutation ===

    /// Replace the base term (leveling).
    pub fn set_base(&mut self, base: StatBlock, max_hp: i32, max_mp: i32) {
        self.base = base;
        self.base_max_hp = max_hp;
        self.base_max_mp = max_mp;
        self.recompute();
    }

    /// Replace the equipment term.
    pub fn set_equipment(&mut self, bonus: StatBlock, max_hp: i32, max_mp: i32) {
        self.equipment = bonus;
        self.equipment_max_hp = max_hp;
        self.equipment_max_mp = max_mp;
        self.recompute();
    }

    /// Add a delta to one buff term.
    pub fn add_buff_delta(&mut self, kind: StatKind, delta: i32) {
        *self.buffs.get_mut(kind) += delta;
        self.recompute();
    }

    /// Remove a delta previously added with [`Self::add_buff_delta`].
    pub fn remove_buff_delta(&mut self, kind: StatKind, delta: i32) {
        self.add_buff_delta(kind, -delta);
    }

    /// Subtract HP. Returns HP actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = (self.hp - amount.max(0)).clamp(0, self.max_hp);
        before - self.hp
    }

    /// Restore HP and MP. Returns the amounts actually restored.
    pub fn heal(&mut self, hp: i32, mp: i32) -> (i32, i32) {
        let (hp_before, mp_before) = (self.hp, self.mp);
        self.hp = (self.hp + hp.max(0)).clamp(0, self.max_hp);
        self.mp = (self.mp + mp.max(0)).clamp(0, self.max_mp);
        (self.hp - hp_before, self.mp - mp_before)
    }

    /// Spend MP if affordable.
    pub fn spend_mp(&mut self, cost: i32) -> bool {
        if cost > self.mp {
            return false;
        }
        self.mp = (self.mp - cost.max(0)).clamp(0, self.max_mp);
        true
    }

    /// Refill HP. MP is left alone.
    pub fn restore_hp(&mut self) {
        self.hp = self.max_hp;
    }

    // === Save hooks ===

    /// Plain data for external persistence.
    #[must_use]
    pub fn snapshot(&self) -> StatSnapshot {
        StatSnapshot {
            version: SchemaVersion::STAT_SNAPSHOT,
            level: self.level,
            base: self.base,
            equipment: self.equipment,
            base_max_hp: self.base_max_hp,
            base_max_mp: self.base_max_mp,
            equipment_max_hp: self.equipment_max_hp,
            equipment_max_mp: self.equipment_max_mp,
            hp: self.hp,
            mp: self.mp,
            resistances: self.resistances,
            affinity: self.affinity.clone(),
            auto_guard_pct: self.auto_guard_pct,
        }
    }

    /// Rebuild a record from a snapshot. Buff deltas are not persisted.
    pub fn from_snapshot(snapshot: &StatSnapshot) -> SnapshotResult<Self> {
        if !SchemaVersion::STAT_SNAPSHOT.can_read(&snapshot.version) {
            return Err(SnapshotError::VersionMismatch {
                expected: SchemaVersion::STAT_SNAPSHOT,
                actual: snapshot.version,
            });
        }

        let mut record = Self::new(
            snapshot.level,
            snapshot.base,
            snapshot.base_max_hp,
            snapshot.base_max_mp,
        )
        .with_resistances(snapshot.resistances)
        .with_affinity(snapshot.affinity.clone())
        .with_auto_guard(snapshot.auto_guard_pct);
        record.set_equipment(
            snapshot.equipment,
            snapshot.equipment_max_hp,
            snapshot.equipment_max_mp,
        );
        record.hp = snapshot.hp.clamp(0, record.max_hp);
        record.mp = snapshot.mp.clamp(0, record.max_mp);
        Ok(record)
    }

    /// Encode a snapshot as JSON.
    pub fn to_json(&self) -> SnapshotResult<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    /// Decode a record from JSON.
    pub fn from_json(json: &str) -> SnapshotResult<Self> {
        let snapshot: StatSnapshot = serde_json::from_str(json)?;
        Self::from_snapshot(&snapshot)
    }
}

/// Serializable stat fields for save/load collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
    /// Schema the snapshot was written with.
    pub version: SchemaVersion,
    /// Level.
    pub level: u32,
    /// Base term.
    pub base: StatBlock,
    /// Equipment term.
    pub equipment: StatBlock,
    /// Base max HP.
    pub base_max_hp: i32,
    /// Base max MP.
    pub base_max_mp: i32,
    /// Equipment max HP bonus.
    pub equipment_max_hp: i32,
    /// Equipment max MP bonus.
    pub equipment_max_mp: i32,
    /// Current HP.
    pub hp: i32,
    /// Current MP.
    pub mp: i32,
    /// Ailment resistances.
    pub resistances: Resistances,
    /// Element affinity.
    pub affinity: ElementAffinity,
    /// Auto-guard chance.
    pub auto_guard_pct: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StatRecord {
        StatRecord::new(3, StatBlock::new(10, 4, 8, 2), 50, 20)
    }

    #[test]
    fn test_new_record_is_full() {
        let stats = record();
        assert_eq!(stats.hp(), 50);
        assert_eq!(stats.mp(), 20);
        assert_eq!(stats.total(StatKind::Attack), 10);
    }

    #[test]
    fn test_totals_include_equipment_and_buffs() {
        let mut stats = record().with_equipment(StatBlock::new(5, 1, 0, 0), 10, 0);
        stats.add_buff_delta(StatKind::Attack, 3);

        assert_eq!(stats.total(StatKind::Attack), 18);
        assert_eq!(stats.effective_power(AttackKind::Physical), 18);
        assert_eq!(stats.defense_against(AttackKind::Physical), 5);
        assert_eq!(stats.max_hp(), 60);
        assert_eq!(stats.hp(), 60);

        stats.remove_buff_delta(StatKind::Attack, 3);
        assert_eq!(stats.total(StatKind::Attack), 15);
    }

    #[test]
    fn test_unequip_clamps_hp() {
        let mut stats = record().with_equipment(StatBlock::default(), 30, 10);
        assert_eq!(stats.hp(), 80);

        stats.set_equipment(StatBlock::default(), 0, 0);
        assert_eq!(stats.max_hp(), 50);
        assert_eq!(stats.hp(), 50);
        assert_eq!(stats.mp(), 20);
    }

    #[test]
    fn test_damage_and_heal_clamp() {
        let mut stats = record();
        assert_eq!(stats.take_damage(70), 50);
        assert_eq!(stats.hp(), 0);
        assert!(stats.is_dead());

        let (hp, mp) = stats.heal(500, 5);
        assert_eq!(hp, 50);
        assert_eq!(mp, 0);
        assert_eq!(stats.hp(), 50);
    }

    #[test]
    fn test_negative_amounts_ignored() {
        let mut stats = record();
        assert_eq!(stats.take_damage(-10), 0);
        assert_eq!(stats.heal(-10, -10), (0, 0));
        assert_eq!(stats.hp(), 50);
    }

    #[test]
    fn test_spend_mp() {
        let mut stats = record();
        assert!(stats.spend_mp(15));
        assert_eq!(stats.mp(), 5);
        assert!(!stats.spend_mp(6));
        assert_eq!(stats.mp(), 5);
    }

    #[test]
    fn test_resistance_clamped() {
        let res = Resistances {
            poison: 150,
            stun: -20,
            ..Resistances::default()
        };
        assert_eq!(res.get(AilmentKind::Poison), 100);
        assert_eq!(res.get(AilmentKind::Stun), 0);
    }

    #[test]
    fn test_snapshot_round_trip_keeps_fields() {
        let mut stats = record()
            .with_resistances(Resistances {
                stun: 40,
                ..Resistances::default()
            })
            .with_auto_guard(15);
        stats.take_damage(12);
        stats.add_buff_delta(StatKind::Defense, 10);

        let json = stats.to_json().unwrap();
        let restored = StatRecord::from_json(&json).unwrap();

        assert_eq!(restored.hp(), 38);
        assert_eq!(restored.resistances().get(AilmentKind::Stun), 40);
        assert_eq!(restored.auto_guard_pct(), 15);
        // Buffs are transient.
        assert_eq!(restored.total(StatKind::Defense), 4);
    }

    #[test]
    fn test_snapshot_version_mismatch() {
        let mut snapshot = record().snapshot();
        snapshot.version = SchemaVersion::new(2, 0, 0);
        let result = StatRecord::from_snapshot(&snapshot);
        assert!(matches!(result, Err(SnapshotError::VersionMismatch { .. })));
    }
}
