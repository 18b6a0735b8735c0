//! Attack and skill descriptors.
//!
//! This module provides:
//! - Movement policies applied while an attack is being cast
//! - Effect shapes (melee arc, projectile, area, heal, hook)
//! - Status payloads rolled on real hits
//! - Combo chains and skills with their costs, cooldowns and multi-hit tails

use serde::{Deserialize, Serialize};
use skirmish_common::{Tag, TagSet};

use crate::config::AnimationCatalog;
use crate::damage::{AttackKind, Element, HitRequest};
use crate::error::{ConfigError, ConfigResult};
use crate::status::AilmentKind;

// ============================================================================
// Movement and Shapes
// ============================================================================

/// How the attacker may move while casting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MovementPolicy {
    /// Rooted in place.
    #[default]
    Stationary,
    /// Pushed forward along the facing, steering locked.
    DashForward {
        /// Forward speed (units/second).
        speed: f32,
    },
    /// Free to move.
    FreeMove,
}

impl MovementPolicy {
    /// Whether the attacker may steer.
    #[must_use]
    pub const fn allows_steering(self) -> bool {
        matches!(self, Self::FreeMove)
    }

    /// Forward speed imposed by the policy.
    #[must_use]
    pub const fn forced_speed(self) -> f32 {
        match self {
            Self::DashForward { speed } => speed,
            _ => 0.0,
        }
    }
}

/// Which candidates an area burst includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TagRule {
    /// Candidate carries any of the listed tags.
    #[default]
    Any,
    /// Candidate carries every listed tag.
    All,
}

impl TagRule {
    /// Check a candidate's tags against the wanted set.
    #[must_use]
    pub const fn admits(self, candidate: TagSet, wanted: TagSet) -> bool {
        match self {
            Self::Any => candidate.intersects(wanted),
            Self::All => !wanted.is_empty() && candidate.contains_all(wanted),
        }
    }
}

/// Geometry of the hits an attack delivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectShape {
    /// Every hostile within reach and arc in front of the attacker.
    Melee {
        /// Reach (units).
        reach: f32,
        /// Full arc width (degrees).
        arc_degrees: f32,
    },
    /// A travelling projectile.
    Projectile {
        /// Speed (units/second).
        speed: f32,
        /// Collision radius.
        radius: f32,
        /// Lifetime (seconds).
        lifetime: f32,
        /// Keep going after the first hit.
        #[serde(default)]
        pierce: bool,
    },
    /// Burst hitting every admitted candidate in a radius.
    Area {
        /// Burst radius.
        radius: f32,
        /// Center on the current target instead of the attacker.
        #[serde(default)]
        centered_on_target: bool,
        /// Tags to include. Empty means the attacker's hostile tags.
        #[serde(default)]
        tags: Vec<Tag>,
        /// How `tags` are matched.
        #[serde(default)]
        rule: TagRule,
    },
    /// Heal allies by a percent of their max HP.
    Heal {
        /// Burst radius.
        radius: f32,
        /// Percent of max HP restored.
        percent: i32,
    },
    /// Hit the target in reach and pull it in front of the attacker.
    Hook {
        /// Reach (units).
        reach: f32,
        /// Distance in front of the attacker the target ends up at.
        pull_to: f32,
    },
}

impl Default for EffectShape {
    fn default() -> Self {
        Self::Melee {
            reach: 2.0,
            arc_degrees: 90.0,
        }
    }
}

impl EffectShape {
    /// Distance at which an agent should stop and attack.
    #[must_use]
    pub fn engage_range(&self) -> f32 {
        match self {
            Self::Melee { reach, .. } | Self::Hook { reach, .. } => *reach,
            Self::Projectile {
                speed, lifetime, ..
            } => speed * lifetime,
            Self::Area { radius, .. } | Self::Heal { radius, .. } => *radius,
        }
    }

    fn validate(&self, profile: &str, attack: &str) -> ConfigResult<()> {
        let positive = |value: f32, what: &str| {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::invalid(
                    profile,
                    format!("attack '{attack}': {what} must be positive, got {value}"),
                ))
            }
        };
        match self {
            Self::Melee { reach, arc_degrees } => {
                positive(*reach, "reach")?;
                positive(*arc_degrees, "arc_degrees")
            },
            Self::Projectile {
                speed,
                radius,
                lifetime,
                ..
            } => {
                positive(*speed, "speed")?;
                positive(*radius, "radius")?;
                positive(*lifetime, "lifetime")
            },
            Self::Area { radius, rule, tags, .. } => {
                if *rule == TagRule::All && tags.is_empty() {
                    return Err(ConfigError::invalid(
                        profile,
                        format!("attack '{attack}': rule 'all' needs a tag list"),
                    ));
                }
                positive(*radius, "radius")
            },
            Self::Heal { radius, percent } => {
                if *percent <= 0 {
                    return Err(ConfigError::invalid(
                        profile,
                        format!("attack '{attack}': heal percent must be positive"),
                    ));
                }
                positive(*radius, "radius")
            },
            Self::Hook { reach, pull_to } => {
                positive(*reach, "reach")?;
                if *pull_to < 0.0 {
                    return Err(ConfigError::invalid(
                        profile,
                        format!("attack '{attack}': pull_to must not be negative"),
                    ));
                }
                Ok(())
            },
        }
    }
}

/// Ailment an attack may inflict on a real hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    /// Ailment kind.
    pub kind: AilmentKind,
    /// Chance to attempt the ailment (percent), before the target's resistance roll.
    #[serde(default = "always")]
    pub chance: i32,
    /// Duration (seconds).
    pub duration: f32,
}

const fn always() -> i32 {
    100
}

/// Extra timed sub-hit after the primary hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubHit {
    /// Wind-up before this sub-hit lands (seconds).
    pub cast: f32,
    /// Pause after it (seconds).
    #[serde(default)]
    pub delay: f32,
}

// ============================================================================
// Attack Descriptor
// ============================================================================

/// Everything needed to execute and resolve one attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackDescriptor {
    /// Display/log name.
    pub name: String,
    /// Physical or magical.
    pub kind: AttackKind,
    /// Element.
    pub element: Element,
    /// Multiplier on the attacker's effective power, in percent.
    pub power_pct: i32,
    /// Low end of the damage roll.
    pub roll_min: i32,
    /// High end of the damage roll.
    pub roll_max: i32,
    /// Critical chance (percent).
    pub crit_chance: i32,
    /// Variance band (percent).
    pub variance_pct: i32,
    /// Hit chance (percent).
    pub accuracy: i32,
    /// Percent of damage drained back to the attacker.
    pub drain_pct: i32,
    /// Cast time before the primary hit (seconds).
    pub cast_time: f32,
    /// Animation key requested when the attack starts.
    pub animation: String,
    /// Effect key spawned at the hit point.
    pub effect: Option<String>,
    /// Sound key played at the hit point.
    pub sound: Option<String>,
    /// Hit geometry.
    pub shape: EffectShape,
    /// Ailment rolled on real hits.
    pub status: Option<StatusPayload>,
    /// Real hits flinch the target.
    pub flinch: bool,
    /// Movement while casting.
    pub movement: MovementPolicy,
    /// Extra sub-hits after the primary hit.
    pub tail: Vec<SubHit>,
}

impl Default for AttackDescriptor {
    fn default() -> Self {
        Self {
            name: String::from("attack"),
            kind: AttackKind::Physical,
            element: Element::None,
            power_pct: 100,
            roll_min: 0,
            roll_max: 0,
            crit_chance: 0,
            variance_pct: 0,
            accuracy: 100,
            drain_pct: 0,
            cast_time: 0.3,
            animation: String::from("attack"),
            effect: None,
            sound: None,
            shape: EffectShape::default(),
            status: None,
            flinch: false,
            movement: MovementPolicy::Stationary,
            tail: Vec::new(),
        }
    }
}

impl AttackDescriptor {
    /// Create a melee attack with an animation key.
    #[must_use]
    pub fn new(name: impl Into<String>, animation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            animation: animation.into(),
            ..Self::default()
        }
    }

    /// Set shape.
    #[must_use]
    pub fn with_shape(mut self, shape: EffectShape) -> Self {
        self.shape = shape;
        self
    }

    /// Set cast time.
    #[must_use]
    pub fn with_cast_time(mut self, seconds: f32) -> Self {
        self.cast_time = seconds;
        self
    }

    /// Set kind and element.
    #[must_use]
    pub fn with_kind(mut self, kind: AttackKind, element: Element) -> Self {
        self.kind = kind;
        self.element = element;
        self
    }

    /// Set status payload.
    #[must_use]
    pub fn with_status(mut self, status: StatusPayload) -> Self {
        self.status = Some(status);
        self
    }

    /// Set flinch flag.
    #[must_use]
    pub fn with_flinch(mut self, flinch: bool) -> Self {
        self.flinch = flinch;
        self
    }

    /// Set drain percentage.
    #[must_use]
    pub fn with_drain(mut self, pct: i32) -> Self {
        self.drain_pct = pct;
        self
    }

    /// Set movement policy.
    #[must_use]
    pub fn with_movement(mut self, movement: MovementPolicy) -> Self {
        self.movement = movement;
        self
    }

    /// Add a sub-hit.
    #[must_use]
    pub fn with_sub_hit(mut self, cast: f32, delay: f32) -> Self {
        self.tail.push(SubHit { cast, delay });
        self
    }

    /// Scale an effective power by `power_pct`.
    #[must_use]
    pub const fn scaled_power(&self, effective_power: i32) -> i32 {
        effective_power.saturating_mul(self.power_pct) / 100
    }

    /// Resolver parameters for this attack.
    #[must_use]
    pub fn hit_request(&self) -> HitRequest {
        HitRequest {
            kind: self.kind,
            element: self.element,
            roll_min: self.roll_min,
            roll_max: self.roll_max,
            crit_chance: self.crit_chance,
            variance_pct: self.variance_pct,
            accuracy: self.accuracy,
            drain_pct: self.drain_pct,
        }
    }

    /// Check the descriptor against load-time rules.
    pub fn validate(&self, profile: &str, catalog: &dyn AnimationCatalog) -> ConfigResult<()> {
        let name = self.name.as_str();
        if !catalog.contains(&self.animation) {
            return Err(ConfigError::invalid(
                profile,
                format!("attack '{name}': unknown animation '{}'", self.animation),
            ));
        }
        if self.roll_min > self.roll_max {
            return Err(ConfigError::invalid(
                profile,
                format!(
                    "attack '{name}': damage range {}..{} is inverted",
                    self.roll_min, self.roll_max
                ),
            ));
        }
        if self.power_pct < 0 {
            return Err(ConfigError::invalid(
                profile,
                format!("attack '{name}': power_pct must not be negative"),
            ));
        }
        let timings = std::iter::once(self.cast_time)
            .chain(self.tail.iter().flat_map(|hit| [hit.cast, hit.delay]));
        for timing in timings {
            if timing < 0.0 || !timing.is_finite() {
                return Err(ConfigError::invalid(
                    profile,
                    format!("attack '{name}': negative or invalid timing {timing}"),
                ));
            }
        }
        if let Some(status) = &self.status {
            if !(0..=100).contains(&status.chance) || status.duration < 0.0 {
                return Err(ConfigError::invalid(
                    profile,
                    format!("attack '{name}': status payload out of range"),
                ));
            }
        }
        self.shape.validate(profile, name)
    }
}

// ============================================================================
// Combos and Skills
// ============================================================================

/// Basic-attack combo chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboChain {
    /// Steps in order; the step counter loops back to 0 after the last.
    pub steps: Vec<AttackDescriptor>,
    /// Short wait after a non-final step, during which the next step may be input.
    pub combo_delay: f32,
    /// Long recovery after the final step.
    pub full_recovery: f32,
}

impl Default for ComboChain {
    fn default() -> Self {
        Self {
            steps: vec![AttackDescriptor::default()],
            combo_delay: 0.3,
            full_recovery: 0.8,
        }
    }
}

impl ComboChain {
    /// Create a chain.
    #[must_use]
    pub fn new(steps: Vec<AttackDescriptor>, combo_delay: f32, full_recovery: f32) -> Self {
        Self {
            steps,
            combo_delay,
            full_recovery,
        }
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the chain has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check the chain against load-time rules.
    pub fn validate(&self, profile: &str, catalog: &dyn AnimationCatalog) -> ConfigResult<()> {
        if self.steps.is_empty() {
            return Err(ConfigError::invalid(profile, "combo chain has zero steps"));
        }
        if self.combo_delay < 0.0 || self.full_recovery < 0.0 {
            return Err(ConfigError::invalid(profile, "combo delays must not be negative"));
        }
        self.steps
            .iter()
            .try_for_each(|step| step.validate(profile, catalog))
    }
}

/// A skill: an attack gated by MP, cooldown, silence and an optional item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDescriptor {
    /// The attack executed.
    pub attack: AttackDescriptor,
    /// Base MP cost.
    #[serde(default)]
    pub mp_cost: i32,
    /// Cooldown in sequencer intervals.
    #[serde(default)]
    pub cooldown: u32,
    /// Recovery after the last hit (seconds).
    #[serde(default)]
    pub recovery: f32,
    /// Item key required to cast.
    #[serde(default)]
    pub requires: Option<String>,
}

impl SkillDescriptor {
    /// Create a skill.
    #[must_use]
    pub fn new(attack: AttackDescriptor, mp_cost: i32, cooldown: u32) -> Self {
        Self {
            attack,
            mp_cost,
            cooldown,
            recovery: 0.5,
            requires: None,
        }
    }

    /// Require an item.
    #[must_use]
    pub fn requiring(mut self, item: impl Into<String>) -> Self {
        self.requires = Some(item.into());
        self
    }

    /// MP cost after a percentage reduction: `ceil(base * (100 - reduction) / 100)`.
    #[must_use]
    pub fn cost_with_reduction(&self, reduction_pct: i32) -> i32 {
        let factor = 100 - reduction_pct.clamp(0, 100);
        let scaled = self.mp_cost.max(0) * factor;
        (scaled + 99) / 100
    }

    /// Check the skill against load-time rules.
    pub fn validate(&self, profile: &str, catalog: &dyn AnimationCatalog) -> ConfigResult<()> {
        if self.mp_cost < 0 {
            return Err(ConfigError::invalid(
                profile,
                format!("skill '{}': negative MP cost", self.attack.name),
            ));
        }
        if self.recovery < 0.0 {
            return Err(ConfigError::invalid(
                profile,
                format!("skill '{}': negative recovery", self.attack.name),
            ));
        }
        self.attack.validate(profile, catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnyAnimation;

    #[test]
    fn test_cost_with_reduction_rounds_up() {
        let skill = SkillDescriptor::new(AttackDescriptor::default(), 15, 3);
        assert_eq!(skill.cost_with_reduction(0), 15);
        assert_eq!(skill.cost_with_reduction(10), 14);
        assert_eq!(skill.cost_with_reduction(50), 8);
        assert_eq!(skill.cost_with_reduction(100), 0);
        assert_eq!(skill.cost_with_reduction(250), 0);
    }

    #[test]
    fn test_tag_rule() {
        let wanted = TagSet::of(&[Tag::Monster, Tag::Boss]);
        let grunt = TagSet::single(Tag::Monster);
        let boss = TagSet::of(&[Tag::Monster, Tag::Boss]);

        assert!(TagRule::Any.admits(grunt, wanted));
        assert!(!TagRule::All.admits(grunt, wanted));
        assert!(TagRule::All.admits(boss, wanted));
        assert!(!TagRule::All.admits(boss, TagSet::EMPTY));
    }

    #[test]
    fn test_validation_errors() {
        let inverted = AttackDescriptor {
            roll_min: 5,
            roll_max: 2,
            ..AttackDescriptor::default()
        };
        assert!(inverted.validate("p", &AnyAnimation).is_err());

        let negative = AttackDescriptor::default().with_sub_hit(-0.1, 0.0);
        assert!(negative.validate("p", &AnyAnimation).is_err());

        let no_anim = AttackDescriptor::new("slash", "");
        assert!(no_anim.validate("p", &AnyAnimation).is_err());

        let empty = ComboChain::new(Vec::new(), 0.2, 0.5);
        assert!(matches!(
            empty.validate("p", &AnyAnimation),
            Err(ConfigError::Invalid { .. })
        ));

        assert!(ComboChain::default().validate("p", &AnyAnimation).is_ok());
    }

    #[test]
    fn test_shape_from_toml() {
        let text = r#"
            name = "fireball"
            animation = "cast"
            kind = "magical"
            element = "fire"
            shape = { type = "projectile", speed = 12.0, radius = 0.5, lifetime = 2.0 }
            status = { kind = "poison", duration = 2.1 }
        "#;
        let attack: AttackDescriptor = toml::from_str(text).unwrap();
        assert_eq!(attack.kind, AttackKind::Magical);
        assert_eq!(attack.accuracy, 100);
        assert!((attack.shape.engage_range() - 24.0).abs() < f32::EPSILON);
        assert_eq!(attack.status.map(|s| s.chance), Some(100));
        assert!(matches!(
            attack.shape,
            EffectShape::Projectile { pierce: false, .. }
        ));
    }

    #[test]
    fn test_scaled_power_and_request() {
        let attack = AttackDescriptor {
            power_pct: 150,
            crit_chance: 12,
            ..AttackDescriptor::default()
        };
        assert_eq!(attack.scaled_power(10), 15);
        assert_eq!(attack.hit_request().crit_chance, 12);
        assert_eq!(attack.hit_request().accuracy, 100);
        assert_eq!(attack.scaled_power(i32::MAX), i32::MAX / 100);
    }
}
