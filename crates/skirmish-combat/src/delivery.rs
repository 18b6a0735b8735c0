//! Hit delivery.
//!
//! Turns a sequencer spawn point into concrete targets according to the
//! attack's [`EffectShape`]. Planning only reads the spatial query; the world
//! applies the result.

use glam::Vec3;
use skirmish_common::{EntityId, TagSet};

use crate::attack::{AttackDescriptor, EffectShape};
use crate::perception::{find_nearest_valid, revalidate, Candidate, PerceptionQuery, SpatialQuery};

/// The attacker side of one spawn point.
#[derive(Debug, Clone, Copy)]
pub struct Strike<'a> {
    /// Attacker handle.
    pub attacker: EntityId,
    /// Attacker position.
    pub position: Vec3,
    /// Attacker facing (unit, horizontal).
    pub facing: Vec3,
    /// Attacker's own tags.
    pub own_tags: TagSet,
    /// Tags the attacker hits.
    pub hostile_tags: TagSet,
    /// Current target, if any. Re-validated here.
    pub target: Option<EntityId>,
    /// Attack being delivered.
    pub attack: &'a AttackDescriptor,
}

/// What a spawn point does.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Resolve a hit on each entity, in order.
    Hits(Vec<EntityId>),
    /// Launch a projectile.
    Projectile {
        /// Launch point.
        origin: Vec3,
        /// Velocity.
        velocity: Vec3,
        /// Collision radius.
        radius: f32,
        /// Lifetime.
        lifetime: f32,
        /// Keep going after a hit.
        pierce: bool,
    },
    /// Heal each entity by a percent of its max HP.
    Heal {
        /// Healed entities (caster included).
        targets: Vec<EntityId>,
        /// Percent of max HP.
        percent: i32,
    },
    /// Hit one entity and pull it.
    Hook {
        /// Hooked entity.
        target: EntityId,
        /// Where it ends up.
        destination: Vec3,
    },
    /// Nothing in reach.
    Nothing,
}

/// Plan the delivery of a spawn point.
pub fn plan<S: SpatialQuery + ?Sized>(strike: &Strike<'_>, space: &S) -> Delivery {
    match &strike.attack.shape {
        EffectShape::Melee { reach, arc_degrees } => {
            let query = hostile_query(strike, strike.position, *reach);
            let half_arc = (arc_degrees * 0.5).to_radians();
            let min_dot = half_arc.cos();
            let hits: Vec<EntityId> = space
                .candidates_near(strike.position, *reach)
                .iter()
                .filter(|c| query.admit(c).is_some())
                .filter(|c| *arc_degrees >= 360.0 || within_arc(strike, c, min_dot))
                .map(|c| c.id)
                .collect();
            hits_or_nothing(hits)
        },
        EffectShape::Projectile {
            speed,
            radius,
            lifetime,
            pierce,
        } => {
            let direction = current_target(strike, space, f32::INFINITY)
                .map(|c| flat(c.position - strike.position))
                .filter(|d| *d != Vec3::ZERO)
                .unwrap_or(strike.facing);
            Delivery::Projectile {
                origin: strike.position,
                velocity: direction * *speed,
                radius: *radius,
                lifetime: *lifetime,
                pierce: *pierce,
            }
        },
        EffectShape::Area {
            radius,
            centered_on_target,
            tags,
            rule,
        } => {
            let center = if *centered_on_target {
                current_target(strike, space, f32::INFINITY).map_or(strike.position, |c| c.position)
            } else {
                strike.position
            };
            let wanted = if tags.is_empty() {
                strike.hostile_tags
            } else {
                TagSet::of(tags)
            };
            let query = PerceptionQuery::new(center, wanted, *radius).excluding(strike.attacker);
            let hits: Vec<EntityId> = space
                .candidates_near(center, *radius)
                .iter()
                .filter(|c| query.admit(c).is_some() && rule.admits(c.tags, wanted))
                .map(|c| c.id)
                .collect();
            hits_or_nothing(hits)
        },
        EffectShape::Heal { radius, percent } => {
            let query = PerceptionQuery::new(strike.position, strike.own_tags, *radius);
            let mut targets: Vec<EntityId> = space
                .candidates_near(strike.position, *radius)
                .iter()
                .filter(|c| c.id != strike.attacker && query.admit(c).is_some())
                .map(|c| c.id)
                .collect();
            targets.insert(0, strike.attacker);
            Delivery::Heal {
                targets,
                percent: *percent,
            }
        },
        EffectShape::Hook { reach, pull_to } => {
            let query = hostile_query(strike, strike.position, *reach);
            let target = current_target(strike, space, *reach)
                .map(|c| c.id)
                .or_else(|| find_nearest_valid(space, &query));
            match target {
                Some(target) => Delivery::Hook {
                    target,
                    destination: strike.position + strike.facing * *pull_to,
                },
                None => Delivery::Nothing,
            }
        },
    }
}

fn hostile_query(strike: &Strike<'_>, origin: Vec3, radius: f32) -> PerceptionQuery {
    PerceptionQuery::new(origin, strike.hostile_tags, radius).excluding(strike.attacker)
}

fn current_target<S: SpatialQuery + ?Sized>(strike: &Strike<'_>, space: &S, radius: f32) -> Option<Candidate> {
    let query = hostile_query(strike, strike.position, radius);
    strike.target.and_then(|id| revalidate(space, &query, id))
}

fn within_arc(strike: &Strike<'_>, candidate: &Candidate, min_dot: f32) -> bool {
    let to = flat(candidate.position - strike.position);
    // Overlapping the attacker counts as in front.
    to == Vec3::ZERO || strike.facing.dot(to) >= min_dot
}

fn flat(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z).normalize_or_zero()
}

fn hits_or_nothing(hits: Vec<EntityId>) -> Delivery {
    if hits.is_empty() {
        Delivery::Nothing
    } else {
        Delivery::Hits(hits)
    }
}
