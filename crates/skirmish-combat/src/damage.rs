//! Damage resolution.
//!
//! This module provides:
//! - Attack kinds and elements
//! - Element affinity tables
//! - The resolver turning attacker power and a defender record into an outcome
//!
//! Resolution order: evasion, invulnerability, guard (explicit or auto-guard
//! roll), accuracy, then arithmetic (roll + power, variance, critical,
//! defense, element, floor at 1).

use serde::{Deserialize, Serialize};

use crate::dice::Dice;
use crate::stats::StatRecord;

// ============================================================================
// Attack Kinds and Elements
// ============================================================================

/// Physical attacks are mitigated by defense, magical ones by magic defense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    /// Weapon and body attacks.
    #[default]
    Physical,
    /// Spells.
    Magical,
}

/// Element carried by an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// No element; always neutral.
    #[default]
    None,
    /// Fire.
    Fire,
    /// Ice.
    Ice,
    /// Thunder.
    Thunder,
    /// Earth.
    Earth,
    /// Light.
    Light,
    /// Dark.
    Dark,
}

const fn neutral() -> i32 {
    100
}

/// Element effectiveness against an entity, in percent.
///
/// 100 is neutral, above 100 is a weakness, below 100 a resistance, 0 immunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementAffinity {
    /// Fire effectiveness.
    #[serde(default = "neutral")]
    pub fire: i32,
    /// Ice effectiveness.
    #[serde(default = "neutral")]
    pub ice: i32,
    /// Thunder effectiveness.
    #[serde(default = "neutral")]
    pub thunder: i32,
    /// Earth effectiveness.
    #[serde(default = "neutral")]
    pub earth: i32,
    /// Light effectiveness.
    #[serde(default = "neutral")]
    pub light: i32,
    /// Dark effectiveness.
    #[serde(default = "neutral")]
    pub dark: i32,
}

impl Default for ElementAffinity {
    fn default() -> Self {
        Self {
            fire: 100,
            ice: 100,
            thunder: 100,
            earth: 100,
            light: 100,
            dark: 100,
        }
    }
}

impl ElementAffinity {
    /// Set one element's effectiveness (builder pattern).
    #[must_use]
    pub fn with(mut self, element: Element, percent: i32) -> Self {
        match element {
            Element::None => {},
            Element::Fire => self.fire = percent,
            Element::Ice => self.ice = percent,
            Element::Thunder => self.thunder = percent,
            Element::Earth => self.earth = percent,
            Element::Light => self.light = percent,
            Element::Dark => self.dark = percent,
        }
        self
    }

    /// Effectiveness of an element, never negative.
    #[must_use]
    pub fn percent(&self, element: Element) -> i32 {
        let raw = match element {
            Element::None => 100,
            Element::Fire => self.fire,
            Element::Ice => self.ice,
            Element::Thunder => self.thunder,
            Element::Earth => self.earth,
            Element::Light => self.light,
            Element::Dark => self.dark,
        };
        raw.max(0)
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Classification of a resolved hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitTag {
    /// Normal hit.
    Hit,
    /// Critical hit (double damage).
    Critical,
    /// Attack missed.
    Miss,
    /// Defender evaded.
    Evaded,
    /// Defender guarded.
    Guarded,
    /// Defender could not be hurt.
    Invulnerable,
}

impl HitTag {
    /// Check if damage was actually dealt.
    #[must_use]
    pub const fn is_real_hit(self) -> bool {
        matches!(self, Self::Hit | Self::Critical)
    }
}

/// Result of one resolved hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    /// Damage applied after mitigation (0 when negated).
    pub damage: i32,
    /// Outcome classification.
    pub tag: HitTag,
    /// HP returned to the attacker, if the attack drains.
    pub drain: Option<i32>,
}

impl AttackOutcome {
    /// A fully negated outcome.
    #[must_use]
    pub const fn negated(tag: HitTag) -> Self {
        Self {
            damage: 0,
            tag,
            drain: None,
        }
    }

    /// Floating text for this outcome.
    #[must_use]
    pub fn popup_text(&self) -> String {
        match self.tag {
            HitTag::Hit => self.damage.to_string(),
            HitTag::Critical => format!("{}!", self.damage),
            HitTag::Miss => "Miss".to_string(),
            HitTag::Evaded => "Evade".to_string(),
            HitTag::Guarded => "Guard".to_string(),
            HitTag::Invulnerable => "Immune".to_string(),
        }
    }
}

// ============================================================================
// Request and Stance
// ============================================================================

/// Attack-side parameters of a hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitRequest {
    /// Physical or magical.
    pub kind: AttackKind,
    /// Element of the attack.
    pub element: Element,
    /// Low end of the damage roll.
    pub roll_min: i32,
    /// High end of the damage roll.
    pub roll_max: i32,
    /// Critical chance in percent.
    pub crit_chance: i32,
    /// Variance band in percent.
    pub variance_pct: i32,
    /// Hit chance in percent (100 never misses).
    pub accuracy: i32,
    /// Percent of damage returned to the attacker (0 = none).
    pub drain_pct: i32,
}

impl Default for HitRequest {
    fn default() -> Self {
        Self {
            kind: AttackKind::Physical,
            element: Element::None,
            roll_min: 0,
            roll_max: 0,
            crit_chance: 0,
            variance_pct: 0,
            accuracy: 100,
            drain_pct: 0,
        }
    }
}

impl HitRequest {
    /// Create a request of the given kind with no roll, crit or variance.
    #[must_use]
    pub fn new(kind: AttackKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Set element.
    #[must_use]
    pub fn with_element(mut self, element: Element) -> Self {
        self.element = element;
        self
    }

    /// Set damage roll range.
    #[must_use]
    pub fn with_roll(mut self, min: i32, max: i32) -> Self {
        self.roll_min = min;
        self.roll_max = max;
        self
    }

    /// Set crit chance.
    #[must_use]
    pub fn with_crit(mut self, chance: i32) -> Self {
        self.crit_chance = chance;
        self
    }

    /// Set variance.
    #[must_use]
    pub fn with_variance(mut self, pct: i32) -> Self {
        self.variance_pct = pct;
        self
    }

    /// Set accuracy.
    #[must_use]
    pub fn with_accuracy(mut self, pct: i32) -> Self {
        self.accuracy = pct;
        self
    }

    /// Set drain percentage.
    #[must_use]
    pub fn with_drain(mut self, pct: i32) -> Self {
        self.drain_pct = pct;
        self
    }
}

/// Defensive state of the defender at the moment of the hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseStance {
    /// Actively guarding.
    pub guarding: bool,
    /// Mid-evade.
    pub evading: bool,
    /// Invulnerable (i-frames, cutscene).
    pub invulnerable: bool,
}

// ============================================================================
// Resolver
// ============================================================================

/// Tuning for the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageConfig {
    /// Critical multiplier in percent.
    pub crit_multiplier_pct: i32,
    /// Minimum damage of a real hit.
    pub min_damage: i32,
}

impl Default for DamageConfig {
    fn default() -> Self {
        Self {
            crit_multiplier_pct: 200,
            min_damage: 1,
        }
    }
}

/// Resolves hits.
#[derive(Debug, Clone, Default)]
pub struct DamageResolver {
    /// Configuration.
    pub config: DamageConfig,
}

impl DamageResolver {
    /// Create a resolver with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with config.
    #[must_use]
    pub fn with_config(config: DamageConfig) -> Self {
        Self { config }
    }

    /// Resolve one hit. Does not mutate the defender.
    pub fn resolve(
        &self,
        attacker_power: i32,
        defender: &StatRecord,
        request: &HitRequest,
        stance: DefenseStance,
        dice: &mut dyn Dice,
    ) -> AttackOutcome {
        if stance.evading {
            return AttackOutcome::negated(HitTag::Evaded);
        }
        if stance.invulnerable {
            return AttackOutcome::negated(HitTag::Invulnerable);
        }
        if stance.guarding || roll_under(dice, defender.auto_guard_pct()) {
            return AttackOutcome::negated(HitTag::Guarded);
        }
        let accuracy = request.accuracy.clamp(0, 100);
        if accuracy < 100 && dice.percent() >= accuracy as f32 {
            return AttackOutcome::negated(HitTag::Miss);
        }

        let rolled = dice
            .range_i32(request.roll_min, request.roll_max)
            .saturating_add(attacker_power);

        let variance = request.variance_pct.clamp(1, 100);
        let factor = dice.range_i32(100 - variance, 100 + variance);
        let mut amount = (rolled as f32 * factor as f32 / 100.0).round() as i32;

        let critical = roll_under(dice, request.crit_chance);
        if critical {
            amount = amount.saturating_mul(self.config.crit_multiplier_pct) / 100;
        }

        let mitigated = amount.saturating_sub(defender.defense_against(request.kind));
        let element_pct = defender.element_percent(request.element);
        let scaled = (mitigated as f32 * element_pct as f32 / 100.0).floor() as i32;
        let damage = scaled.max(self.config.min_damage);

        let drain = (request.drain_pct > 0)
            .then(|| (damage.saturating_mul(request.drain_pct.clamp(0, 100)) / 100).max(1));

        AttackOutcome {
            damage,
            tag: if critical {
                HitTag::Critical
            } else {
                HitTag::Hit
            },
            drain,
        }
    }
}

/// Percentage roll: lands when the chance is positive and a `[0, 100)` draw
/// is at most the chance. Chances are clamped to `[0, 100]`.
pub fn roll_under(dice: &mut dyn Dice, chance: i32) -> bool {
    let chance = chance.clamp(0, 100);
    if chance <= 0 {
        return false;
    }
    dice.percent() <= chance as f32
}
