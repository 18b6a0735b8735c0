//! # Skirmish Combat
//!
//! Combat resolution and AI decision core.
//!
//! This crate provides:
//! - Stat records with buff and equipment terms
//! - Damage resolution (guard, evasion, crits, variance, elements, drain)
//! - Timed status effects (poison, stun, silence, immobilize, buffs)
//! - Target perception with tag filtering
//! - AI agents (idle, patrol, chase, engage, flee, turrets)
//! - Attack sequencing (combos, skills, cooldowns, multi-hit tails)
//! - Hit delivery shapes and projectiles
//! - TOML combat profiles
//! - A tick-driven combat world with an outbound presenter
//!
//! Everything is single-threaded and advanced by explicit `tick(dt)` calls.
//! Randomness is injected through [`Dice`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod agent;
pub mod attack;
pub mod combatant;
pub mod config;
pub mod context;
pub mod damage;
pub mod delivery;
pub mod dice;
pub mod error;
pub mod perception;
pub mod presenter;
pub mod projectile;
pub mod sequencer;
pub mod stats;
pub mod status;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::*;
    pub use crate::attack::*;
    pub use crate::combatant::*;
    pub use crate::config::*;
    pub use crate::context::*;
    pub use crate::damage::*;
    pub use crate::delivery::*;
    pub use crate::dice::*;
    pub use crate::error::*;
    pub use crate::perception::*;
    pub use crate::presenter::*;
    pub use crate::projectile::*;
    pub use crate::sequencer::*;
    pub use crate::stats::*;
    pub use crate::status::*;
    pub use crate::world::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_hit() {
        let resolver = DamageResolver::new();
        let defender = StatRecord::new(1, StatBlock::new(0, 2, 0, 0), 50, 0);
        let mut dice = ScriptedDice::constant(50.0);

        let outcome = resolver.resolve(
            10,
            &defender,
            &HitRequest::new(AttackKind::Physical),
            DefenseStance::default(),
            &mut dice,
        );
        assert_eq!(outcome.damage, 8);
        assert_eq!(outcome.tag, HitTag::Hit);
    }

    #[test]
    fn test_profile_to_world() {
        let profile = CombatProfile::new("grunt", 30).with_tags(vec![skirmish_common::Tag::Monster]);
        assert!(profile.validate(&AnyAnimation).is_ok());

        let mut world = CombatWorld::new(7);
        let id = world.spawn(&profile, glam::Vec3::ZERO);
        assert_eq!(world.get(id).map(|c| c.stats.hp()), Some(30));
        assert_eq!(world.len(), 1);
    }
}
